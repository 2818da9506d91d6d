//! Command-line interface definition and dispatch for reel.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; `ask` and `chat` share the same dispatch setup.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::config::Config;
use crate::dispatch::{DispatchLimits, Dispatcher, TurnOutcome};
use crate::lookup::{LiveLookup, MovieLookup};
use crate::output::StdoutRenderer;
use crate::provider::{self, CompletionError, GenerationParams, ModelSelection, Provider};
use crate::session::ChatSession;
use crate::{chat, logging};

/// Top-level CLI structure for reel.
#[derive(Parser)]
#[command(name = "reel", about = "A movie assistant for the terminal")]
pub struct Cli {
    /// Log dispatch decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the reel CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Ask a one-shot question
    Ask {
        /// The question to ask
        prompt: Vec<String>,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
        /// Provider to use (anthropic, openai, openrouter, ollama)
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// Start an interactive chat session
    Chat {
        /// Provider to use (anthropic, openai, openrouter, ollama)
        #[arg(long)]
        provider: Option<String>,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Query the movie data services directly
    Lookup {
        #[command(subcommand)]
        action: LookupAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `lookup` command.
#[derive(Subcommand)]
pub enum LookupAction {
    /// List movies currently in theaters
    NowPlaying,
    /// Show showtimes for a movie near a location
    Showtimes { title: String, location: String },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current config
    Show,
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    logging::init(cli.verbose);

    match cli.command {
        Commands::Ask {
            prompt,
            model,
            provider: provider_name,
        } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("No prompt provided. Usage: reel ask \"your question here\"");
            }

            let config = Config::load()?;
            let selection =
                provider::resolve_model(provider_name.as_deref(), model.as_deref(), &config)?;
            let backend = Backend::new(&config, &selection)?;
            let dispatcher = backend.dispatcher();

            println!(
                "{} [model: {}]",
                "reel".bold().cyan(),
                selection.model.yellow(),
            );
            println!();
            println!("{} {}", ">".green().bold(), prompt);
            println!();

            let mut session = ChatSession::new(config.system_prompt());
            let mut renderer = StdoutRenderer::new(cli.verbose);
            let outcome = session.send(&dispatcher, &prompt, &mut renderer).await;
            // The renderer has already reported any failure.
            match ask_exit_code(&outcome) {
                0 => Ok(()),
                code => std::process::exit(code),
            }
        }
        Commands::Chat {
            provider: provider_name,
            model,
        } => {
            let config = Config::load()?;
            let selection =
                provider::resolve_model(provider_name.as_deref(), model.as_deref(), &config)?;
            let backend = Backend::new(&config, &selection)?;
            chat::run_chat(&backend.dispatcher(), &config.system_prompt(), &selection.model).await
        }
        Commands::Lookup { action } => {
            let config = Config::load()?;
            let lookup = LiveLookup::from_config(&config)?;
            let text = match action {
                LookupAction::NowPlaying => lookup.now_playing().await?,
                LookupAction::Showtimes { title, location } => {
                    lookup.showtimes(&title, &location).await?
                }
            };
            println!("{}", text);
            Ok(())
        }
        Commands::Config { action } => {
            let config = Config::load()?;
            match action {
                ConfigAction::Show => {
                    let path = Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!();
                    let toml_str = toml::to_string_pretty(&config)?;
                    println!("{}", toml_str);
                }
            }
            Ok(())
        }
    }
}

/// Process exit code for a finished `reel ask` turn.
fn ask_exit_code(outcome: &Result<TurnOutcome, CompletionError>) -> i32 {
    match outcome {
        Ok(TurnOutcome::Completed { .. }) => 0,
        Ok(TurnOutcome::Aborted { .. }) | Err(_) => 1,
    }
}

/// Everything a [`Dispatcher`] borrows, built once per process.
struct Backend {
    provider: Provider,
    lookup: LiveLookup,
    params: GenerationParams,
    limits: DispatchLimits,
}

impl Backend {
    fn new(config: &Config, selection: &ModelSelection) -> Result<Self> {
        Ok(Self {
            provider: Provider::from_config(config, selection)?,
            lookup: LiveLookup::from_config(config)?,
            params: GenerationParams::from_config(config, selection),
            limits: DispatchLimits::from_config(config),
        })
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.provider, &self.lookup, &self.params, self.limits.clone())
    }
}

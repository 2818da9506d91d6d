//! Entry point for reel, a movie assistant for the terminal.
//!
//! This binary loads environment variables, parses CLI arguments via [`cli`],
//! and dispatches to the appropriate subcommand handler.

mod calls;
mod chat;
mod cli;
mod config;
mod constants;
mod dispatch;
mod format;
mod logging;
mod lookup;
mod message;
mod output;
mod provider;
mod session;
mod transcript;

use anyhow::Result;

/// Runs the reel CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    cli::run(cli).await
}

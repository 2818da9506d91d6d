//! Diagnostic logging setup.
//!
//! Logs go to stderr through `tracing-subscriber` so they never mix with the
//! streamed reply on stdout. `REEL_LOG` takes any `EnvFilter` directive;
//! without it, `--verbose` enables debug output for reel and everything else
//! stays at `warn`.

use tracing_subscriber::EnvFilter;

use crate::constants::LOG_ENV;

/// Installs the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,reel=debug"
    } else {
        "warn"
    }
}

//! Tracing setup for the command-line binary.
//!
//! Progress and warnings are written to stderr so stdout stays clean for
//! command results. The filter comes from `RUST_LOG` when set:
//!
//! ```bash
//! RUST_LOG=para_cli=debug para-cli create "docs/**/*.md"
//! ```

use std::io::IsTerminal;

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `verbose` lowers the default level to
/// `debug`; an explicit `RUST_LOG` always wins.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(verbose)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    Ok(())
}

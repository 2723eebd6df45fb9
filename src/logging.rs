//! Logging configuration using tracing
//!
//! Logs go to stderr so streamed command output on stdout stays clean.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `--verbose` wins over `RUST_LOG`
fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("ftdesk=debug,warn");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ftdesk=info,warn"))
}

/// Initialize the logging system
pub fn init(verbose: bool, json: bool) -> anyhow::Result<()> {
    let filter = filter(verbose);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

//! Logging configuration.
//!
//! Both binaries log to stderr so that stdout stays free for piping.
//! `RUST_LOG` overrides the default level.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Builds the filter: `RUST_LOG` if set, else `verbose` selects `debug` for
/// this crate, else [`DEFAULT_FILTER`].
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(format!(
                "{DEFAULT_FILTER},{}=debug",
                env!("CARGO_CRATE_NAME")
            ))
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    })
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

//! Tracing initialisation for test binaries and the `dockertest` CLI.
//!
//! Runner operations emit `tracing` events (command lines and captured
//! output at TRACE, lifecycle at DEBUG). Nothing is printed until a
//! subscriber is installed; [`init_tracing`] installs one.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives read before falling back to `RUST_LOG`.
pub const LOG_ENV: &str = "DOCKERTEST_LOG";

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON log lines.
/// * `level`: default verbosity when neither `DOCKERTEST_LOG` nor
///   `RUST_LOG` is set.
///
/// Log lines go to stderr so they never mix with captured tool output a
/// caller prints on stdout. Only the first call in a process takes effect,
/// so integration tests may call this from every test function.
pub fn init_tracing(json: bool, level: Level) {
    let registry = tracing_subscriber::registry().with(env_filter(level));

    let installed = if json {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
    };
    installed.ok();
}

/// Filter used by [`init_tracing`]: `DOCKERTEST_LOG`, then `RUST_LOG`, then
/// `level`.
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

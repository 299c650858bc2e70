//! Logging and tracing initialization.

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber. `RUST_LOG` takes precedence over `config.level`.
///
/// Calling this more than once is harmless; later calls leave the first subscriber in place.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

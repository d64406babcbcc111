//! Logging setup

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
///
/// Returns false if a subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = std::env::var("RUST_LOG").map_or_else(
        |_| filter_or_info(&config.level),
        |value| filter_or_info(&value),
    );

    let installed = if config.json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_thread_names(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_ansi(config.ansi)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    match installed {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %err, "subscriber already installed");
            false
        }
    }
}

fn filter_or_info(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

use ringside_core::config::{LogFormat, LoggingConfig};
use tracing::Level;

/// Installs the global subscriber. Output goes to stderr so stdout carries only the
/// command payload. Repeated calls keep the first subscriber.
pub fn init(config: &LoggingConfig) {
    let log_level = config.level.trim().parse::<Level>().unwrap_or(Level::INFO);

    let installed = match config.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .compact()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .pretty()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .json()
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!(event_name = "logging.already_initialized", "subscriber already set");
    }
}

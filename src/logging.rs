use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Env var naming a log file. When unset, logs go to stderr.
pub const LOG_FILE_ENV: &str = "FLUX_STORE_LOG";

/// Initialize tracing.
///
/// The filter comes from `RUST_LOG` when set, otherwise from the config.
/// Set `FLUX_STORE_LOG` to a file path to log to a file instead of stderr;
/// the file gets a unique name, `{path}.{timestamp}.{pid}`, so concurrent
/// runs don't clobber each other.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let result = match std::env::var(LOG_FILE_ENV).ok() {
        Some(log_path) => {
            let unique_path = unique_log_path(&log_path);
            let Ok(file) = std::fs::File::create(&unique_path) else {
                eprintln!("Warning: Failed to create log file: {}", unique_path);
                return;
            };

            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_level(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .try_init()
        }
        None => {
            let stderr_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_target(false);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()
        }
    };

    if let Err(e) = result {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
}

fn unique_log_path(base: &str) -> String {
    let pid = std::process::id();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{}.{}.{}", base, timestamp, pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_log_path_appends_pid() {
        let path = unique_log_path("/tmp/flux.log");
        assert!(path.starts_with("/tmp/flux.log."));
        assert!(path.ends_with(&format!(".{}", std::process::id())));
    }
}

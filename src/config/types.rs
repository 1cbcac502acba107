use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Logging settings. `RUST_LOG` takes precedence over `filter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive (default: "info").
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// Settings for the demo store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Items the demo store starts with (default: [1, 2, 3]).
    #[serde(default = "default_initial_items")]
    pub initial_items: Vec<i64>,
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_initial_items() -> Vec<i64> {
    vec![1, 2, 3]
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            initial_items: default_initial_items(),
        }
    }
}

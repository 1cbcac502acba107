mod loader;
mod types;

pub use loader::{ConfigError, MAX_INITIAL_ITEMS};
pub use types::{Config, DemoConfig, LoggingConfig};

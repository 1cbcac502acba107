//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use flux_store::config::Config;
use flux_store::flux::{Action, Dispatcher, StoreRegistry};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

/// Shared call log for handlers and listeners.
pub type CallLog = Rc<RefCell<Vec<String>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Register a handler that appends `name` to `log` and succeeds.
pub fn recording_handler(dispatcher: &Dispatcher, action_type: &'static str, name: &str, log: &CallLog) {
    let log = log.clone();
    let entry = name.to_string();
    dispatcher
        .register(action_type, name, move |_: &Action| {
            log.borrow_mut().push(entry.clone());
            Ok(())
        })
        .expect("register handler");
}

/// Registry over a fresh dispatcher with the given demo items.
pub fn registry_with_items(items: Vec<i64>) -> StoreRegistry {
    let mut config = Config::default();
    config.demo.initial_items = items;
    StoreRegistry::new(Dispatcher::new(), config)
}

/// Create a temporary config file with the given TOML content.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}

//! Command-line access to Advocate reports.

pub mod config;
pub mod output;

pub use config::{load_config, resolve_config_path};

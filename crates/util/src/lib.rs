//! Configuration and path helpers shared by the Taskflow binary.

pub mod config;
mod path_processing;

pub use config::{ConfigError, LoadedConfig, TaskflowConfig, default_config_path};
pub use path_processing::{expand_tilde, resolve_under};

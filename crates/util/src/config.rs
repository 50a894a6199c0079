//! Taskflow configuration.
//!
//! A small JSON file under the standard configuration directory
//! (`~/.config/taskflow/config.json` on most platforms) plus environment
//! overrides. Command-line flags are applied on top by the binary.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use taskflow_types::{UnknownValidationMode, ValidationMode};
use thiserror::Error;
use tracing::warn;

use crate::{expand_tilde, resolve_under};

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "TASKFLOW_CONFIG_PATH";
/// Environment variable overriding [`TaskflowConfig::validation_mode`].
pub const VALIDATION_MODE_ENV: &str = "TASKFLOW_VALIDATION_MODE";
/// Environment variable overriding [`TaskflowConfig::log_filter`].
pub const LOG_FILTER_ENV: &str = "TASKFLOW_LOG";

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid value for {variable}: {source}")]
    InvalidEnvironment {
        variable: &'static str,
        #[source]
        source: UnknownValidationMode,
    },
}

/// Persisted settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskflowConfig {
    /// Schema policy applied when loading workflow documents.
    pub validation_mode: ValidationMode,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    /// Directory searched for relative workflow paths that do not exist as given.
    pub workflow_dir: Option<PathBuf>,
}

/// Settings read from disk, plus the parse failure that forced defaults, if any.
///
/// Configuration is read before the binary installs its subscriber, so the
/// failure is held here and reported by [`LoadedConfig::log_problems`].
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TaskflowConfig,
    pub path: PathBuf,
    pub parse_error: Option<String>,
}

impl LoadedConfig {
    /// Logs a warning for a file that existed but could not be parsed.
    pub fn log_problems(&self) {
        if let Some(error) = &self.parse_error {
            warn!(
                path = %self.path.display(),
                error = %error,
                "Failed to parse taskflow config; using defaults"
            );
        }
    }
}

impl TaskflowConfig {
    /// Reads the default configuration file and applies environment overrides.
    pub fn load() -> Result<LoadedConfig, ConfigError> {
        let mut loaded = Self::load_from(&default_config_path())?;
        loaded.config = loaded.config.apply_environment()?;
        Ok(loaded)
    }

    /// Reads `path`. A missing file yields defaults; an unparsable one yields
    /// defaults and records the parse error.
    pub fn load_from(path: &Path) -> Result<LoadedConfig, ConfigError> {
        let (config, parse_error) = match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => (config, None),
                Err(error) => (Self::default(), Some(error.to_string())),
            },
            Err(error) if error.kind() == io::ErrorKind::NotFound => (Self::default(), None),
            Err(error) => return Err(ConfigError::Io(error)),
        };

        Ok(LoadedConfig {
            config,
            path: path.to_path_buf(),
            parse_error,
        })
    }

    /// Applies `TASKFLOW_VALIDATION_MODE` and `TASKFLOW_LOG` when set and non-blank.
    pub fn apply_environment(mut self) -> Result<Self, ConfigError> {
        if let Some(raw) = non_blank_var(VALIDATION_MODE_ENV) {
            self.validation_mode = raw.parse().map_err(|source| ConfigError::InvalidEnvironment {
                variable: VALIDATION_MODE_ENV,
                source,
            })?;
        }
        if let Some(filter) = non_blank_var(LOG_FILTER_ENV) {
            self.log_filter = Some(filter);
        }
        Ok(self)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolves a workflow file argument against [`TaskflowConfig::workflow_dir`].
    pub fn resolve_workflow_path(&self, path: &Path) -> PathBuf {
        let base = self
            .workflow_dir
            .as_ref()
            .map(|dir| expand_tilde(&dir.to_string_lossy()));
        resolve_under(path, base.as_deref())
    }
}

/// Configuration file location, honoring [`CONFIG_PATH_ENV`].
pub fn default_config_path() -> PathBuf {
    if let Some(path) = non_blank_var(CONFIG_PATH_ENV) {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskflow")
        .join(CONFIG_FILE_NAME)
}

fn non_blank_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let loaded = TaskflowConfig::load_from(&dir.path().join("absent.json")).expect("load");
        assert!(loaded.parse_error.is_none());
        let config = loaded.config;
        assert_eq!(config, TaskflowConfig::default());
        assert_eq!(config.validation_mode, ValidationMode::FailFast);
    }

    #[test]
    fn invalid_json_yields_defaults_and_records_the_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").expect("write");

        let loaded = TaskflowConfig::load_from(&path).expect("load");
        assert_eq!(loaded.config, TaskflowConfig::default());
        assert!(loaded.parse_error.is_some());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    struct CapturedWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedWriter;

        fn make_writer(&'a self) -> Self::Writer {
            CapturedWriter {
                buffer: self.buffer.clone(),
            }
        }
    }

    impl io::Write for CapturedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut buffer = self
                .buffer
                .lock()
                .map_err(|_| io::Error::other("log buffer mutex poisoned"))?;
            buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn parse_failure_is_logged_once_a_subscriber_exists() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").expect("write");
        let loaded = TaskflowConfig::load_from(&path).expect("load");

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || loaded.log_problems());

        let output = String::from_utf8_lossy(&logs.buffer.lock().expect("log buffer")).into_owned();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("Failed to parse taskflow config; using defaults"), "{output}");
        assert!(output.contains("config.json"), "{output}");
    }

    #[test]
    fn saved_config_is_read_back() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");
        let config = TaskflowConfig {
            validation_mode: ValidationMode::WarnOnly,
            log_filter: Some("taskflow_engine=debug".into()),
            workflow_dir: Some(PathBuf::from("quests")),
        };

        config.save_to(&path).expect("save");
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"warn-only\""), "{raw}");
        assert_eq!(TaskflowConfig::load_from(&path).expect("load").config, config);
    }

    #[test]
    fn default_path_honors_env_override() {
        let override_path = "~/custom/taskflow.json";
        temp_env::with_var(CONFIG_PATH_ENV, Some(override_path), || {
            assert_eq!(default_config_path(), expand_tilde(override_path));
        });
    }

    #[test]
    fn environment_overrides_file_values() {
        temp_env::with_vars(
            [(VALIDATION_MODE_ENV, Some("warn")), (LOG_FILTER_ENV, Some("debug"))],
            || {
                let config = TaskflowConfig::default().apply_environment().expect("overrides");
                assert_eq!(config.validation_mode, ValidationMode::WarnOnly);
                assert_eq!(config.log_filter.as_deref(), Some("debug"));
            },
        );
    }

    #[test]
    fn invalid_validation_mode_is_rejected() {
        temp_env::with_var(VALIDATION_MODE_ENV, Some("sometimes"), || {
            let error = TaskflowConfig::default().apply_environment().expect_err("invalid mode");
            assert!(error.to_string().contains(VALIDATION_MODE_ENV));
        });
    }

    #[test]
    fn load_reads_file_from_env_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"validation_mode":"none"}"#).expect("write");

        temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, Some(path.to_string_lossy().into_owned())),
                (VALIDATION_MODE_ENV, None),
                (LOG_FILTER_ENV, None),
            ],
            || {
                let config = TaskflowConfig::load().expect("load").config;
                assert_eq!(config.validation_mode, ValidationMode::None);
                assert_eq!(config.log_filter, None);
            },
        );
    }
}

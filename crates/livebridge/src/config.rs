//! Configuration loading and typed config structures for the bridge.
//!
//! The canonical configuration lives in `livebridge.yaml` next to the
//! binary's working directory. Every field has a default suited to a
//! local deployment (loopback endpoint, debug logging on, watcher
//! disabled), so the file is optional.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override carried an unusable value.
    #[error("invalid value for {variable}: {message}")]
    Env {
        /// Name of the offending environment variable.
        variable: String,
        /// What was wrong with it.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BridgeConfig {
    /// Listening endpoint settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Execution context settings.
    #[serde(default)]
    pub context: ContextSection,

    /// Reload watcher settings.
    #[serde(default)]
    pub watch: WatchSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Listening endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 9010,
        }
    }
}

/// Execution context settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextSection {
    /// Extension script loaded into every fresh context. A positional
    /// CLI argument takes precedence over this value.
    pub extension: Option<String>,
}

/// Reload watcher settings. The watcher only runs when `dir` is set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Directory tree to watch recursively for script changes.
    pub dir: Option<String>,
    /// File suffix that triggers a context rebuild.
    pub suffix: String,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            dir: None,
            suffix: String::from(".rhai"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Enables the per-request/per-response event log and lowers the
    /// default tracing filter to `debug`.
    pub debug: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { debug: true }
    }
}

impl BridgeConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// A missing file yields the defaults. The environment variable
    /// `LIVEBRIDGE_PORT` overrides `server.port`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read
    /// or parsed, or when an environment override is unusable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Ok(port) = std::env::var("LIVEBRIDGE_PORT") {
            config.server.port = port.parse().map_err(|e| ConfigError::Env {
                variable: String::from("LIVEBRIDGE_PORT"),
                message: format!("{e}"),
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_suit_a_local_deployment() {
        let config = BridgeConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9010);
        assert!(config.logging.debug);
        assert!(config.watch.dir.is_none());
        assert_eq!(config.watch.suffix, ".rhai");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = BridgeConfig::load(Path::new("/nonexistent/livebridge.yaml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn yaml_overrides_selected_fields() {
        use std::io::Write as _;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 9999\nwatch:\n  dir: scripts\nlogging:\n  debug: false"
        )
        .unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.watch.dir.as_deref(), Some("scripts"));
        assert!(!config.logging.debug);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        use std::io::Write as _;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [not, a, mapping]").unwrap();
        assert!(BridgeConfig::load(file.path()).is_err());
    }
}

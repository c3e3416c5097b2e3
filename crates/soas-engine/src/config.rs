use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine settings, loaded from TOML or YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Server URL used when neither the call nor the description names one
    pub default_server: Option<String>,
    /// Whole-request timeout; unset means no limit, which long streams need
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_server: None,
            timeout_ms: None,
            connect_timeout_ms: 10_000,
            user_agent: format!("soas/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file, falling back to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: EngineConfig = if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {:?}", path))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {:?}", path))?
        };

        tracing::info!("Loaded configuration from: {:?}", path);
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_load_toml_with_partial_fields() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "default_server = \"http://localhost:9000\"\ntimeout_ms = 1500").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.default_server.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.connect_timeout_ms, 10_000);
    }

    #[test]
    fn test_load_yaml() {
        let mut file = Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "user_agent: geocoder-batch\nconnect_timeout_ms: 250").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.user_agent, "geocoder-batch");
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "timeout_ms = \"soon\"").unwrap();

        let err = EngineConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML config"));
    }
}

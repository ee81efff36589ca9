use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse engine config failed")]
    Parse {
        #[source]
        source: toml::de::Error,
    },
}

/// Engine settings, delivered by the host as TOML text. A broken config
/// is rejected as a whole; the previous values stay in effect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Surface a notice when a key sequence dead-ends.
    pub notify_unmatched: bool,
    /// Mirror yanks and deletes to the system clipboard and adopt
    /// externally copied text on paste.
    pub sync_clipboard: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            notify_unmatched: true,
            sync_clipboard: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse { source })
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;

    #[test]
    fn from_toml_should_fill_missing_fields_with_defaults() {
        let config = EngineConfig::from_toml("notify_unmatched = false").unwrap();
        assert!(!config.notify_unmatched);
        assert!(config.sync_clipboard);
    }

    #[test]
    fn from_toml_should_reject_malformed_text() {
        assert!(EngineConfig::from_toml("notify_unmatched = ").is_err());
    }
}

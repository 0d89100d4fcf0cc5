//! Registrar configuration.

use serde::Deserialize;

/// Storage key used when none is configured.
pub const DEFAULT_REGISTRY_KEY: &str = "RESOURCE_PROVIDER_REGISTRAR";

/// Inbox capacity used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid buffer size: {0}")]
    InvalidBufferSize(String),
    #[error("Registry key must not be empty")]
    EmptyRegistryKey,
}

/// Settings shared by both registrar strategies.
///
/// `registry_key` is only used by the versioned-store strategy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    /// Storage key of the persisted registry document.
    pub registry_key: String,
    /// Capacity of the actor inbox.
    pub buffer_size: usize,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            registry_key: DEFAULT_REGISTRY_KEY.to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl RegistrarConfig {
    pub fn with_registry_key(mut self, key: impl Into<String>) -> Self {
        self.registry_key = key.into();
        self
    }

    /// Reads `REGISTRAR_KEY` and `REGISTRAR_BUFFER_SIZE`, keeping defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(key) = lookup("REGISTRAR_KEY") {
            config.registry_key = key;
        }
        if let Some(size) = lookup("REGISTRAR_BUFFER_SIZE") {
            config.buffer_size = size
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidBufferSize(size.clone()))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry_key.is_empty() {
            return Err(ConfigError::EmptyRegistryKey);
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize("0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = RegistrarConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, RegistrarConfig::default());
        assert_eq!(config.registry_key, "RESOURCE_PROVIDER_REGISTRAR");
    }

    #[test]
    fn test_overrides_from_vars() {
        let config = RegistrarConfig::from_vars(vars(&[
            ("REGISTRAR_KEY", "rp-registry"),
            ("REGISTRAR_BUFFER_SIZE", " 8 "),
        ]))
        .unwrap();
        assert_eq!(config.registry_key, "rp-registry");
        assert_eq!(config.buffer_size, 8);
    }

    #[test]
    fn test_rejects_bad_buffer_size() {
        let result = RegistrarConfig::from_vars(vars(&[("REGISTRAR_BUFFER_SIZE", "lots")]));
        assert_eq!(result, Err(ConfigError::InvalidBufferSize("lots".to_string())));

        let result = RegistrarConfig::from_vars(vars(&[("REGISTRAR_BUFFER_SIZE", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: RegistrarConfig =
            serde_json::from_str(r#"{ "registry_key": "custom" }"#).unwrap();
        assert_eq!(config.registry_key, "custom");
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    }
}

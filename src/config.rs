//! Configuration
//!
//! Loaded from YAML; every field has a default so an empty document is a
//! valid configuration.
//!
//! ```yaml
//! store:
//!   base_iri: "http://example.org/"
//!   capture_initial_prefixes: true
//! editor:
//!   debounce_ms: 500
//!   capture_prefixes: false
//! ```

use oxiri::Iri;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed YAML or unknown field
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Base IRI is not an absolute IRI
    #[error("Invalid base IRI {iri}: {reason}")]
    InvalidBaseIri { iri: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Base IRI used to resolve relative IRIs in parsed documents
    pub base_iri: Option<String>,
    /// Capture prefixes of the document the store is created from
    pub capture_initial_prefixes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_iri: None,
            capture_initial_prefixes: true,
        }
    }
}

/// Editor session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Quiet period after the last keystroke before the text is parsed
    pub debounce_ms: u64,
    /// Capture prefixes from edited text
    pub capture_prefixes: bool,
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            capture_prefixes: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub editor: EditorConfig,
}

impl Config {
    /// Parse and validate a YAML configuration
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        // serde_yaml rejects an empty document for a struct
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML configuration file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> ConfigResult<()> {
        if let Some(iri) = &self.store.base_iri {
            Iri::parse(iri.as_str()).map_err(|e| ConfigError::InvalidBaseIri {
                iri: iri.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

// crates/issuance-provisioner/src/config.rs
// ============================================================================
// Module: Authority Configuration
// Description: Loading and validation of global claims and provisioner lists.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, serde_json, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML or JSON file with strict size and path
//! limits. Provisioner entries stay as raw documents until validation, where
//! each is decoded by its `type` and initialized. The first invalid
//! provisioner fails the whole configuration.
//! Security posture: config inputs are untrusted and may carry secrets; error
//! messages never echo challenge values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::claims::Claimer;
use crate::claims::Claims;
use crate::provisioner::InitConfig;
use crate::provisioner::Provisioner;
use crate::provisioner::ProvisionerError;
use crate::provisioner::ProvisionerInterface;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "issuance.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ISSUANCE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured provisioners.
pub const MAX_PROVISIONERS: usize = 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML or JSON parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// A provisioner entry failed to decode or initialize.
    #[error("invalid config: provisioner {index} ({name:?}): {source}")]
    Provisioner {
        /// Zero-based position in the provisioner list.
        index: usize,
        /// Provisioner name when the entry carries one.
        name: String,
        /// Underlying provisioner error.
        #[source]
        source: ProvisionerError,
    },
}

// ============================================================================
// SECTION: Authority Configuration
// ============================================================================

/// Whole-file authority configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorityConfig {
    /// Global claims merged under each provisioner's overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
    /// Raw provisioner documents in configuration order.
    #[serde(default)]
    pub provisioners: Vec<Value>,
}

impl AuthorityConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Files ending in `.json` are parsed as JSON; anything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let is_json = resolved
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        if is_json { Self::from_json_str(content) } else { Self::from_toml_str(content) }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates global claims and every provisioner entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.initialized_provisioners().map(|_| ())
    }

    /// Returns the init inputs shared by every provisioner.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the global claims are inconsistent.
    pub fn init_config(&self) -> Result<InitConfig, ConfigError> {
        let defaults = Claims::global_defaults();
        let claims =
            self.claims.as_ref().map_or_else(|| defaults.clone(), |own| own.merged_over(&defaults));
        Claimer::new(None, &claims).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(InitConfig {
            claims,
        })
    }

    /// Decodes every provisioner entry without initializing it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Provisioner`] for the first entry that fails to
    /// decode.
    pub fn provisioners(&self) -> Result<Vec<Provisioner>, ConfigError> {
        if self.provisioners.len() > MAX_PROVISIONERS {
            return Err(ConfigError::Invalid(format!(
                "too many provisioners (max {MAX_PROVISIONERS})"
            )));
        }
        self.provisioners
            .iter()
            .enumerate()
            .map(|(index, document)| {
                Provisioner::from_value(document.clone()).map_err(|source| {
                    ConfigError::Provisioner {
                        index,
                        name: document_name(document),
                        source,
                    }
                })
            })
            .collect()
    }

    /// Decodes and initializes every provisioner entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid global claims or the first
    /// provisioner that fails to decode or initialize.
    pub fn initialized_provisioners(&self) -> Result<Vec<Provisioner>, ConfigError> {
        let init = self.init_config()?;
        let mut provisioners = self.provisioners()?;
        for (index, provisioner) in provisioners.iter_mut().enumerate() {
            provisioner.init(&init).map_err(|source| ConfigError::Provisioner {
                index,
                name: provisioner.name().to_string(),
                source,
            })?;
        }
        Ok(provisioners)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the `name` field of a raw provisioner document.
fn document_name(document: &Value) -> String {
    document.get("name").and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

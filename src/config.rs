use serde::Deserialize;
use std::{fs, path::Path};

use crate::definition::Scope;
use crate::errors::ConfigError;
use crate::logging::LoggingConfig;

// Defaults
const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 128;

/// Container Configuration
///
/// Loaded from TOML, every field is optional:
///
/// ```toml
/// default_scope = "prototype"
/// max_resolution_depth = 64
///
/// [logging]
/// level = "debug"
/// format = "compact"
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ContainerConfig {
    /// Scope of create/factory definitions that did not choose one
    pub default_scope: Scope,
    /// Maximum nesting of entry lookups within one `get` call
    pub max_resolution_depth: usize,
    pub logging: LoggingConfig,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            default_scope: Scope::Singleton,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            logging: LoggingConfig::default(),
        }
    }
}

impl ContainerConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(display.clone(), e))?;
        Self::parse(&content, &display)
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: ContainerConfig =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(origin.to_string(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_resolution_depth".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.logging.level()?;
        Ok(())
    }

    pub fn with_default_scope(mut self, scope: Scope) -> Self {
        self.default_scope = scope;
        self
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }
}

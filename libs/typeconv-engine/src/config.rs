use std::path::Path;

use serde::Deserialize;
use typeconv_api::DEFAULT_MAX_DEPTH;

use crate::error::EngineError;

/// Environment variable naming the TOML file `global()` reads.
pub const CONFIG_ENV: &str = "TYPECONV_CONFIG";

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Nesting limit for one top-level conversion.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// Which converter sources take part in discovery, by name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// When set, only these sources are consulted.
    #[serde(default)]
    pub include: Option<Vec<String>>,

    /// Sources skipped even if included.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl DiscoveryConfig {
    pub fn allows(&self, source: &str) -> bool {
        let included = match &self.include {
            Some(names) => names.iter().any(|n| n == source),
            None => true,
        };
        included && !self.exclude.iter().any(|n| n == source)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|e| e.with_context(path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `TYPECONV_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, EngineError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.max_depth == 0 {
            return Err(EngineError::Config("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

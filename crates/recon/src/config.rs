use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ReconError;
use crate::normalize::FieldAliases;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Optional `stocktake.toml`. Every section may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StocktakeConfig {
    #[serde(default)]
    pub aliases: FieldAliases,
    #[serde(default)]
    pub store: StoreConfig,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite database holding items and counts. Relative paths resolve
    /// against the config file's directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

impl StocktakeConfig {
    /// Parse and validate a TOML config string.
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: Self = toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ReconError> {
        for (field, aliases) in self.aliases.lists() {
            if aliases.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "aliases.{field} must list at least one column header"
                )));
            }
            if aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "aliases.{field} contains a blank header"
                )));
            }
        }
        Ok(())
    }
}

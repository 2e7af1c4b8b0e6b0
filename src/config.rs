//! Bridge configuration
//!
//! Loaded from TOML and validated on load, so a bad parameter fails at
//! startup instead of surfacing in the middle of DDL generation.
//!
//! ```toml
//! [types]
//! decimal_precision = 18
//! decimal_scale = 4
//! datetime_precision = 3
//! fallback_type = "String"
//!
//! [json]
//! max_dynamic_paths = 1024
//!
//! [engine]
//! family = "ReplacingMergeTree"
//! settings = { index_granularity = "8192" }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ast::JsonParams;
use crate::error::{ChError, ChResult};
use crate::migrate::engine::{EngineFamily, EngineSpec};
use crate::parser::parse_type;
use crate::transpiler::traits::is_plain_identifier;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "QAIL_CH_CONFIG";

/// Main bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub types: TypeConfig,
    pub json: JsonConfig,
    pub engine: EngineDefaults,
}

/// Defaults for native types without an explicit store type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeConfig {
    /// Precision for native decimals
    pub decimal_precision: u8,
    /// Scale for native decimals
    pub decimal_scale: u8,
    /// Fractional digits for native timestamps
    pub datetime_precision: u8,
    /// Time zone attached to offset-aware timestamps
    pub timezone: String,
    /// Store type used when a type cannot be resolved
    pub fallback_type: String,
    /// Map native strings to `LowCardinality(String)`
    pub low_cardinality_strings: bool,
}

impl Default for TypeConfig {
    fn default() -> Self {
        Self {
            decimal_precision: 18,
            decimal_scale: 4,
            datetime_precision: 3,
            timezone: "UTC".to_string(),
            fallback_type: "String".to_string(),
            low_cardinality_strings: false,
        }
    }
}

impl TypeConfig {
    pub fn validate(&self) -> ChResult<()> {
        if !(1..=76).contains(&self.decimal_precision) {
            return Err(ChError::invalid(format!(
                "decimal_precision must be in 1..=76, got {}",
                self.decimal_precision
            )));
        }
        if self.decimal_scale > self.decimal_precision {
            return Err(ChError::invalid(format!(
                "decimal_scale {} exceeds decimal_precision {}",
                self.decimal_scale, self.decimal_precision
            )));
        }
        if self.datetime_precision > 9 {
            return Err(ChError::invalid(format!(
                "datetime_precision must be at most 9, got {}",
                self.datetime_precision
            )));
        }
        if self.timezone.trim().is_empty() {
            return Err(ChError::invalid("timezone must not be empty"));
        }
        if parse_type(&self.fallback_type).is_none() {
            return Err(ChError::invalid(format!(
                "fallback_type '{}' is not a valid store type",
                self.fallback_type
            )));
        }
        Ok(())
    }
}

/// Limits for native JSON columns. Unset limits are left to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    pub max_dynamic_paths: Option<u32>,
    pub max_dynamic_types: Option<u32>,
}

impl JsonConfig {
    pub fn validate(&self) -> ChResult<()> {
        if let Some(n) = self.max_dynamic_types.filter(|n| *n > 254) {
            return Err(ChError::invalid(format!(
                "max_dynamic_types must be at most 254, got {}",
                n
            )));
        }
        Ok(())
    }

    pub fn params(&self) -> JsonParams {
        JsonParams {
            max_dynamic_paths: self.max_dynamic_paths,
            max_dynamic_types: self.max_dynamic_types,
            ..Default::default()
        }
    }
}

/// Engine applied to tables that do not declare one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineDefaults {
    pub family: EngineFamily,
    pub settings: IndexMap<String, String>,
}

impl EngineDefaults {
    pub fn validate(&self) -> ChResult<()> {
        if let Some(key) = self.settings.keys().find(|k| !is_plain_identifier(k)) {
            return Err(ChError::invalid(format!("invalid setting name '{}'", key)));
        }
        Ok(())
    }

    /// Engine for a table. Without an explicit spec the default family is
    /// used; an explicit spec keeps its family and only gains the default
    /// settings it does not set itself.
    pub fn apply(&self, spec: Option<&EngineSpec>) -> EngineSpec {
        let mut spec = match spec {
            Some(spec) => spec.clone(),
            None => EngineSpec::new(self.family.clone()),
        };
        for (key, value) in &self.settings {
            if !spec.settings.contains_key(key) {
                spec.settings.insert(key.clone(), value.clone());
            }
        }
        spec
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> ChResult<()> {
        self.types.validate()?;
        self.json.validate()?;
        self.engine.validate()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> ChResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ChResult<Self> {
        if !path.exists() {
            return Err(ChError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// `~/.config/qail/clickhouse.toml` (platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qail").join("clickhouse.toml"))
    }

    /// Load from an explicit path, then `QAIL_CH_CONFIG`, then the default
    /// location, falling back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> ChResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(BridgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = BridgeConfig::from_toml(
            r#"
[types]
decimal_precision = 38
decimal_scale = 10

[json]
max_dynamic_paths = 256

[engine]
family = "ReplacingMergeTree"
settings = { index_granularity = "8192" }
"#,
        )
        .unwrap();
        assert_eq!(config.types.decimal_precision, 38);
        assert_eq!(config.types.datetime_precision, 3);
        assert_eq!(config.json.params().max_dynamic_paths, Some(256));
        assert_eq!(config.engine.family, EngineFamily::ReplacingMergeTree);
    }

    #[test]
    fn test_out_of_range_is_rejected_on_load() {
        for doc in [
            "[types]\ndecimal_precision = 0",
            "[types]\ndecimal_precision = 10\ndecimal_scale = 11",
            "[types]\ndatetime_precision = 12",
            "[types]\nfallback_type = \"Array(\"",
            "[json]\nmax_dynamic_types = 300",
            "[engine]\nsettings = { \"bad key\" = \"1\" }",
        ] {
            assert!(
                matches!(
                    BridgeConfig::from_toml(doc),
                    Err(ChError::InvalidConfiguration(_))
                ),
                "{} should be rejected",
                doc
            );
        }
    }

    #[test]
    fn test_bad_toml_and_engine_name() {
        assert!(matches!(
            BridgeConfig::from_toml("[types"),
            Err(ChError::Toml(_))
        ));
        assert!(BridgeConfig::from_toml("[engine]\nfamily = \"Merge Tree\"").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = BridgeConfig::from_file(Path::new("/nonexistent/qail/clickhouse.toml"));
        assert!(matches!(err, Err(ChError::Config(_))));
    }

    #[test]
    fn test_engine_defaults_apply() {
        let defaults = EngineDefaults {
            family: EngineFamily::ReplacingMergeTree,
            settings: IndexMap::from([("index_granularity".to_string(), "8192".to_string())]),
        };
        let spec = defaults.apply(None);
        assert_eq!(spec.family, EngineFamily::ReplacingMergeTree);
        assert_eq!(spec.settings["index_granularity"], "8192");

        let explicit = EngineSpec::new(EngineFamily::MergeTree).setting("index_granularity", 1024);
        let spec = defaults.apply(Some(&explicit));
        assert_eq!(spec.family, EngineFamily::MergeTree);
        assert_eq!(spec.settings["index_granularity"], "1024");
    }
}

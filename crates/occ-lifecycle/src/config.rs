//! Lifecycle configuration.
//!
//! Loaded from environment variables or a YAML file. Unset values fall
//! back to defaults; malformed values are errors rather than silently
//! ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use occ_state::InspectionPolicy;

/// Largest accepted UTC offset magnitude, in minutes.
const MAX_OFFSET_MINUTES: u32 = 18 * 60;

/// Operator-tunable rules for the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Whether inspectors may force maintenance without reported damage.
    pub allow_maintenance_override: bool,
    /// Whether reported damage must be described.
    pub require_damage_notes: bool,
    /// Offset of the site's local calendar from UTC, used to decide what
    /// "today" is when validating inspection dates.
    pub utc_offset_minutes: i32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        let policy = InspectionPolicy::default();
        Self {
            allow_maintenance_override: policy.allow_maintenance_override,
            require_damage_notes: policy.require_damage_notes,
            utc_offset_minutes: 0,
        }
    }
}

impl LifecycleConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `OCC_ALLOW_MAINTENANCE_OVERRIDE` (default: `true`)
    /// - `OCC_REQUIRE_DAMAGE_NOTES` (default: `false`)
    /// - `OCC_UTC_OFFSET_MINUTES` (default: `0`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            allow_maintenance_override: env_bool(
                &lookup,
                "OCC_ALLOW_MAINTENANCE_OVERRIDE",
                defaults.allow_maintenance_override,
            )?,
            require_damage_notes: env_bool(
                &lookup,
                "OCC_REQUIRE_DAMAGE_NOTES",
                defaults.require_damage_notes,
            )?,
            utc_offset_minutes: match lookup("OCC_UTC_OFFSET_MINUTES") {
                None => defaults.utc_offset_minutes,
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    var: "OCC_UTC_OFFSET_MINUTES".into(),
                    value: raw,
                })?,
            },
        };
        config.validate()
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Yaml(e.to_string()))?;
        config.validate()
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&raw)
    }

    /// Inspection rules derived from this configuration.
    pub fn inspection_policy(&self) -> InspectionPolicy {
        InspectionPolicy {
            allow_maintenance_override: self.allow_maintenance_override,
            require_damage_notes: self.require_damage_notes,
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.utc_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::InvalidValue {
                var: "utc_offset_minutes".into(),
                value: self.utc_offset_minutes.to_string(),
            });
        }
        Ok(self)
    }
}

fn env_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw,
        }),
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },
    #[error("cannot read config file {0}")]
    Io(String),
    #[error("invalid config YAML: {0}")]
    Yaml(String),
}

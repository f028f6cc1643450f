//! Build configuration for Doxograph.
//!
//! Loaded from a TOML file when given; CLI flags override file values,
//! which override defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DoxographError, Result};

/// Policy applied when a second entity registers an already-bound refid.
///
/// The original extractor output re-lists member ids under both their scope
/// and their group compound, so `Replace` (last write wins, with a warning)
/// is the default. `Error` fails the build on the first collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateIdPolicy {
    #[default]
    Replace,
    Error,
}

/// Top-level build config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Prefix applied to every generated page link (e.g. `api/`).
    #[serde(default)]
    pub link_prefix: String,

    /// What to do when two compounds register the same refid.
    #[serde(default)]
    pub on_duplicate_id: DuplicateIdPolicy,
}

/// Load a [`BuildConfig`] from a TOML file.
pub fn load_config_from(path: &Path) -> Result<BuildConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| DoxographError::io(path, e))?;
    toml::from_str(&raw)
        .map_err(|e| DoxographError::config(format!("invalid config {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.link_prefix, "");
        assert_eq!(config.on_duplicate_id, DuplicateIdPolicy::Replace);
    }

    #[test]
    fn parses_toml_with_partial_fields() {
        let config: BuildConfig = toml::from_str(r#"link_prefix = "api/""#).expect("parse");
        assert_eq!(config.link_prefix, "api/");
        assert_eq!(config.on_duplicate_id, DuplicateIdPolicy::Replace);

        let config: BuildConfig =
            toml::from_str(r#"on_duplicate_id = "error""#).expect("parse");
        assert_eq!(config.on_duplicate_id, DuplicateIdPolicy::Error);
    }
}

// src/config.rs
// Viewer configuration: JSON file, then environment overrides

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use territory_merkle::{Layout, MerkleBuilder, OddNodeRule};

pub const CONFIG_PATH_VAR: &str = "TERRITORY_VIEWER_CONFIG";
pub const ODD_NODE_VAR: &str = "TERRITORY_ODD_NODE";
pub const STRICT_PREFIX_VAR: &str = "TERRITORY_STRICT_PREFIX";
pub const LAYOUT_VAR: &str = "TERRITORY_LAYOUT";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub odd_node: OddNodeRule,
    pub strict_prefix: bool,
    pub layout: Layout,
    pub full_hashes: bool,
    pub color: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            odd_node: OddNodeRule::Promote,
            strict_prefix: false,
            layout: Layout::RootFirst,
            full_hashes: false,
            color: true,
        }
    }
}

impl ViewerConfig {
    /// Resolve the config file (explicit path, `$TERRITORY_VIEWER_CONFIG`, then the
    /// per-user config dir), fall back to defaults, then apply env overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();

        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => env(CONFIG_PATH_VAR).map(PathBuf::from),
        };

        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };

        config.apply_overrides(env)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded viewer config from {}", path.display());
        Ok(config)
    }

    /// `~/.config/territory/viewer.json` on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("territory").join("viewer.json"))
    }

    pub fn apply_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var(ODD_NODE_VAR) {
            self.odd_node = v
                .parse::<OddNodeRule>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid {}", ODD_NODE_VAR))?;
        }
        if let Some(v) = var(STRICT_PREFIX_VAR) {
            self.strict_prefix = parse_bool(&v)
                .with_context(|| format!("Invalid {}", STRICT_PREFIX_VAR))?;
        }
        if let Some(v) = var(LAYOUT_VAR) {
            self.layout = v
                .parse::<Layout>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid {}", LAYOUT_VAR))?;
        }
        Ok(())
    }

    pub fn builder(&self) -> MerkleBuilder {
        MerkleBuilder::new()
            .with_odd_node_rule(self.odd_node)
            .with_strict_prefix(self.strict_prefix)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.odd_node == OddNodeRule::Duplicate {
            warnings.push(
                "odd_node = duplicate: roots of odd-sized blocks will differ from the dashboard"
                    .to_string(),
            );
        }
        warnings
    }

    pub fn print_summary(&self) {
        for w in self.validate() {
            warn!("Config: {}", w);
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "odd_node": "duplicate", "layout": "leaves-first" }}"#).unwrap();

        let config = ViewerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.odd_node, OddNodeRule::Duplicate);
        assert_eq!(config.layout, Layout::LeavesFirst);
        assert!(!config.strict_prefix);
        assert!(config.color);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(ViewerConfig::from_file(file.path()).is_err());
        assert!(ViewerConfig::from_file(Path::new("/nonexistent/viewer.json")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ViewerConfig::default();
        config
            .apply_overrides(vars(&[
                (ODD_NODE_VAR, "duplicate"),
                (STRICT_PREFIX_VAR, "yes"),
                (LAYOUT_VAR, "leaves-first"),
            ]))
            .unwrap();

        assert_eq!(config.odd_node, OddNodeRule::Duplicate);
        assert!(config.strict_prefix);
        assert_eq!(config.layout, Layout::LeavesFirst);
        assert_eq!(config.builder().odd_node_rule(), OddNodeRule::Duplicate);
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn test_invalid_override() {
        let mut config = ViewerConfig::default();
        assert!(config
            .apply_overrides(vars(&[(STRICT_PREFIX_VAR, "maybe")]))
            .is_err());
        assert!(config
            .apply_overrides(vars(&[(ODD_NODE_VAR, "triple")]))
            .is_err());
    }

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(ViewerConfig::default().validate().is_empty());
    }
}

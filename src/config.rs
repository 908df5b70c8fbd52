use crate::error::{HunterError, Result};
use crate::hunter::{NamingTables, ResolverConfig, SelectorConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration, loadable from a JSON file
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HunterConfig {
    pub naming: NamingTables,
    pub selector: SelectorConfig,
    pub resolver: ResolverConfig,

    /// How long a persisted session stays restorable
    pub snapshot_ttl_secs: u64,

    /// Key the session snapshot is stored under
    pub storage_key: String,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            naming: NamingTables::default(),
            selector: SelectorConfig::default(),
            resolver: ResolverConfig::default(),
            snapshot_ttl_secs: 3600,
            storage_key: "elementHunterData".to_string(),
        }
    }
}

impl HunterConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| HunterError::Config(e.to_string()))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| HunterError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&raw)?;
        log::info!("⚙️  Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn snapshot_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.snapshot_ttl_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override() {
        let config = HunterConfig::from_json(
            r#"{"snapshot_ttl_secs": 60, "resolver": {"overlay_id": "hud"}}"#,
        )
        .unwrap();
        assert_eq!(config.snapshot_ttl_secs, 60);
        assert_eq!(config.resolver.overlay_id, "hud");
        assert!(!config.resolver.important_classes.is_empty());
        assert_eq!(config.storage_key, "elementHunterData");
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(
            HunterConfig::from_json("{not json"),
            Err(HunterError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = HunterConfig::from_file("/nonexistent/element-hunter.json").await;
        assert!(matches!(result, Err(HunterError::Config(_))));
    }
}

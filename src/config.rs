use crate::model::ResourceType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_REFRESH_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub last_namespace: Option<String>,
    pub last_resource_type: ResourceType,
    pub refresh_interval_secs: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            last_namespace: None,
            last_resource_type: ResourceType::default(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
        }
    }
}

impl Preferences {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load(path) {
            Ok(preferences) => preferences,
            Err(error) => {
                warn!("using default preferences: {error:#}");
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let parsed: Preferences = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(parsed)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let raw = serde_yaml::to_string(self).context("failed to serialize config")?;
        fs::write(path, raw).with_context(|| format!("failed to write config {}", path.display()))
    }
}

pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("KUBEDECK_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    std::env::var("HOME")
        .ok()
        .filter(|home| !home.trim().is_empty())
        .map(|home| PathBuf::from(home).join(".config/kubedeck/config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_REFRESH_SECS, Preferences, discover_config_path};
    use crate::model::ResourceType;
    use std::path::Path;

    #[test]
    fn save_then_load_restores_namespace_and_resource_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.yaml");
        let preferences = Preferences {
            last_namespace: Some("payments".to_string()),
            last_resource_type: ResourceType::StatefulSets,
            refresh_interval_secs: 9,
        };

        preferences.save(&path).unwrap();
        let loaded = Preferences::load_or_default(Some(&path));

        assert_eq!(loaded, preferences);
    }

    #[test]
    fn unparsable_file_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "last_resource_type: [not, a, type]").unwrap();

        let loaded = Preferences::load_or_default(Some(&path));

        assert_eq!(loaded, Preferences::default());
        assert_eq!(loaded.refresh_interval_secs, DEFAULT_REFRESH_SECS);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "last_namespace: dev\n").unwrap();

        let loaded = Preferences::load_or_default(Some(&path));

        assert_eq!(loaded.last_namespace.as_deref(), Some("dev"));
        assert_eq!(loaded.last_resource_type, ResourceType::Deployments);
        assert_eq!(loaded.refresh_interval_secs, DEFAULT_REFRESH_SECS);
    }

    #[test]
    fn zero_refresh_interval_is_clamped() {
        let preferences = Preferences {
            refresh_interval_secs: 0,
            ..Preferences::default()
        };
        assert_eq!(preferences.refresh_interval().as_secs(), 1);
    }

    #[test]
    fn explicit_path_wins() {
        let path = discover_config_path(Some(Path::new("/tmp/kubedeck.yaml")));
        assert_eq!(path.as_deref(), Some(Path::new("/tmp/kubedeck.yaml")));
    }
}

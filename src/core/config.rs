//! Application configuration management

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::recents::JsonRecentsStore;
use crate::document::CharStyle;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Recent books index location, `None` for the shared default
    pub recents_path: Option<PathBuf>,
    /// Editor settings
    pub editor: EditorConfig,
    /// UI settings
    pub ui: UiConfig,
}

/// Editor-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Family of new text
    pub font_family: String,
    /// Point size of new text
    pub font_size: f32,
    /// Undo steps kept per document
    pub undo_depth: usize,
}

/// UI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Initial window width
    pub window_width: f32,
    /// Initial window height
    pub window_height: f32,
    /// Dark or light visuals
    pub dark_mode: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            font_family: "Times New Roman".to_string(),
            font_size: 12.0,
            undo_depth: 200,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_width: 1280.0,
            window_height: 720.0,
            dark_mode: false,
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "bookwright", "Bookwright")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Self::load_from(&path)
    }

    /// Load configuration from `path`. A missing file is created with the
    /// defaults; an unreadable one is reported and left alone.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                tracing::warn!("Could not write default config: {}", e);
            }
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `path`
    fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Where the recent books index lives
    pub fn recents_path(&self) -> Result<PathBuf> {
        self.recents_path
            .clone()
            .or_else(JsonRecentsStore::default_path)
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
    }

    /// Style of newly typed text
    pub fn default_char_style(&self) -> CharStyle {
        CharStyle {
            family: Some(self.editor.font_family.clone()),
            size: Some(self.editor.font_size),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"editor": {"font_size": 14.0}}"#).unwrap();
        assert_eq!(config.editor.font_size, 14.0);
        assert_eq!(config.editor.font_family, "Times New Roman");
        assert_eq!(config.ui.window_width, 1280.0);
        assert!(config.recents_path.is_none());
    }

    #[test]
    fn test_recents_override_wins() {
        let config = AppConfig {
            recents_path: Some(PathBuf::from("/tmp/recents.json")),
            ..Default::default()
        };
        assert_eq!(config.recents_path().unwrap(), PathBuf::from("/tmp/recents.json"));
    }

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("conf").join("config.json");

        let config = AppConfig::load_from(&path).unwrap();

        assert_eq!(config.editor.undo_depth, 200);
        let written: AppConfig =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.ui.window_height, 720.0);
    }

    #[test]
    fn test_malformed_config_is_left_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }
}

//! Builder settings persisted in the platform config directory
//! (`<config>/layout-builder/settings.json`).

use crate::{
    error::Result,
    grid::{DEFAULT_COLS, DEFAULT_ROWS},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_USER_MODULE: &str = "user_callbacks";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Size of the grid a new document starts with.
    pub grid_rows: usize,
    pub grid_cols: usize,
    /// Module name of the hand-edited callback file.
    pub user_module: String,
    /// Subdirectory for the regenerated artifacts; `None` writes them next
    /// to the user module.
    pub internal_dir: Option<String>,
    pub merge_stubs: bool,
    pub state_defaults: bool,
    pub syntax_highlighting: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid_rows: DEFAULT_ROWS,
            grid_cols: DEFAULT_COLS,
            user_module: DEFAULT_USER_MODULE.to_owned(),
            internal_dir: None,
            merge_stubs: true,
            state_defaults: true,
            syntax_highlighting: true,
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("layout-builder");
        path.push("settings.json");
        path
    }

    /// Reads settings from `path`. A missing or malformed file yields the
    /// defaults.
    pub fn load_from(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::debug!("No settings at {} ({e}); using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring malformed settings {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("layout-builder-settings-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = scratch("partial.json");
        fs::write(&path, r#"{ "user_module": "callbacks", "grid_cols": 3 }"#).unwrap();
        let s = Settings::load_from(&path);
        assert_eq!(s.user_module, "callbacks");
        assert_eq!(s.grid_cols, 3);
        assert_eq!(s.grid_rows, DEFAULT_ROWS);
        assert!(s.merge_stubs);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_malformed_or_missing_file_gives_defaults() {
        let path = scratch("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        let _ = fs::remove_file(&path);
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = scratch("dir");
        let path = dir.join("settings.json");
        let s = Settings {
            internal_dir: Some("generated".into()),
            ..Settings::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), s);
        let _ = fs::remove_dir_all(dir);
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Storage name of the persisted preferences.
pub const STORAGE_NAME: &str = "fenav-preferences";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Browsing preferences kept between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub view: ViewMode,
    /// Selected category id, `all` for everything.
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "all".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            view: ViewMode::default(),
            category: default_category(),
        }
    }
}

/// JSON file holding [`Preferences`].
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{STORAGE_NAME}.json")),
        }
    }

    /// `$FENAV_HOME`, else `$HOME/.config/fenav`, else the working directory.
    pub fn default_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os("FENAV_HOME") {
            return PathBuf::from(dir);
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config").join("fenav"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored preferences; defaults when the file is missing or unreadable.
    pub fn load(&self) -> Preferences {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return Preferences::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            eprintln!(
                "Ignoring unreadable preferences at {}: {e}",
                self.path.display()
            );
            Preferences::default()
        })
    }

    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

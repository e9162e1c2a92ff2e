use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Durable user preferences. One flag today: the session reads it once at
/// startup and writes it back on every toggle.
pub trait PreferenceStore {
    fn edit_mode_enabled(&self) -> bool;
    fn set_edit_mode_enabled(&mut self, enabled: bool) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PrefsData {
    #[serde(rename = "editModeEnabled", default)]
    edit_mode_enabled: bool,
}

/// Preference store backed by a small JSON file.
pub struct JsonPreferences {
    path: PathBuf,
    data: PrefsData,
}

impl JsonPreferences {
    /// Reads preferences from `path`. A missing or unreadable file yields
    /// defaults; a malformed one is logged and overwritten on next save.
    pub fn load_or_default(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(data) => data,
                Err(err) => {
                    warn!("[prefs] ignoring malformed {}: {err}", path.display());
                    PrefsData::default()
                }
            },
            Err(_) => PrefsData::default(),
        };
        Self { path: path.to_path_buf(), data }
    }

    fn save(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, text)
            .with_context(|| format!("writing preferences to {}", self.path.display()))?;
        Ok(())
    }
}

impl PreferenceStore for JsonPreferences {
    fn edit_mode_enabled(&self) -> bool {
        self.data.edit_mode_enabled
    }

    fn set_edit_mode_enabled(&mut self, enabled: bool) -> Result<()> {
        self.data.edit_mode_enabled = enabled;
        self.save()
    }
}

/// In-memory store for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    edit_mode_enabled: bool,
}

impl MemoryPreferences {
    pub fn new(edit_mode_enabled: bool) -> Self {
        Self { edit_mode_enabled }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn edit_mode_enabled(&self) -> bool {
        self.edit_mode_enabled
    }

    fn set_edit_mode_enabled(&mut self, enabled: bool) -> Result<()> {
        self.edit_mode_enabled = enabled;
        Ok(())
    }
}

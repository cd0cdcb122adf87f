// Grid settings
// Loaded from ~/.config/gridkit/settings.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::theme::ThemeSource;

/// Whether clipboard export includes the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardCopyMode {
    #[default]
    IncludeHeader,
    ExcludeHeader,
}

impl ClipboardCopyMode {
    pub fn includes_header(&self) -> bool {
        matches!(self, ClipboardCopyMode::IncludeHeader)
    }
}

/// Grid behavior and appearance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Default data row height in device-independent pixels
    pub row_height: f32,

    /// Column header height
    pub header_height: f32,

    /// Group header row height
    pub group_header_height: f32,

    /// Extra rows materialized above/below the viewport
    pub virtualization_buffer_rows: usize,

    /// Shade every other row
    pub alternating_rows: bool,

    /// Clipboard export header behavior
    pub copy_mode: ClipboardCopyMode,

    /// Double-click begins cell edit (single-click selects only)
    pub double_click_edit: bool,

    /// Commit the active edit when focus leaves the grid
    pub commit_on_focus_loss: bool,

    /// Theme selection
    pub theme: ThemeSource,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            row_height: 24.0,
            header_height: 28.0,
            group_header_height: 26.0,
            virtualization_buffer_rows: 4,
            alternating_rows: true,
            copy_mode: ClipboardCopyMode::IncludeHeader,
            double_click_edit: true,
            commit_on_focus_loss: true,
            theme: ThemeSource::Auto,
        }
    }
}

impl GridSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridkit");
        config_dir.join("settings.toml")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path (tests use a temp dir)
    pub fn load_from(path: &PathBuf) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("Error parsing {}: {}", path.display(), e);
                    eprintln!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let text = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, text).map_err(|e| e.to_string())
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

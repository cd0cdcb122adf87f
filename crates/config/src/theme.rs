// Theme configuration
// Supports: built-in themes and custom JSON themes

use crate::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Theme source - where to load theme from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ThemeSource {
    /// Follow the host environment; resolves to Dark when no preference
    /// is known
    Auto,
    /// Built-in dark theme
    Dark,
    /// Built-in light theme
    Light,
    /// Custom theme from file path
    Custom(String),
}

impl Default for ThemeSource {
    fn default() -> Self {
        ThemeSource::Auto
    }
}

/// JSON-serializable theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub name: String,
    #[serde(default)]
    pub is_dark: bool,
    pub colors: ThemeColorsConfig,
}

/// JSON color definitions (hex strings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeColorsConfig {
    // Base colors
    pub background: String,
    pub foreground: String,
    #[serde(default = "default_foreground_muted")]
    pub foreground_muted: String,

    // Grid
    #[serde(default = "default_gridline")]
    pub gridline: String,
    #[serde(default = "default_header_background")]
    pub header_background: String,
    #[serde(default = "default_group_header_background")]
    pub group_header_background: String,

    // Selection & validation
    pub accent: String,
    #[serde(default = "default_selection_alpha")]
    pub selection_alpha: f32,
    #[serde(default = "default_invalid")]
    pub invalid: String,
}

fn default_foreground_muted() -> String { "#64748b".into() }
fn default_gridline() -> String { "#334155".into() }
fn default_header_background() -> String { "#1e293b".into() }
fn default_group_header_background() -> String { "#1e293b".into() }
fn default_selection_alpha() -> f32 { 0.2 }
fn default_invalid() -> String { "#ef4444".into() }

/// Runtime theme palette used by grid hosts
#[derive(Debug, Clone, Copy)]
pub struct GridTheme {
    pub bg: Color,
    pub bg_header: Color,
    pub bg_row: Color,
    /// Alternating row shade (even/odd banding)
    pub bg_row_alt: Color,
    pub bg_group_header: Color,
    pub text: Color,
    pub text_dim: Color,
    pub gridline: Color,
    pub accent: Color,
    pub selected: Color,
    pub selected_border: Color,
    /// Border/fill for cells and rows that failed edit validation
    pub invalid: Color,
}

impl GridTheme {
    /// Built-in dark theme
    pub fn dark() -> Self {
        GridTheme {
            bg: Color::from_rgb(0.008, 0.024, 0.090),             // #020617
            bg_header: Color::from_rgb(0.118, 0.161, 0.231),      // #1e293b
            bg_row: Color::from_rgb(0.059, 0.090, 0.165),         // #0f172a
            bg_row_alt: Color::from_rgb(0.078, 0.110, 0.184),
            bg_group_header: Color::from_rgb(0.118, 0.161, 0.231),// #1e293b
            text: Color::from_rgb(0.945, 0.961, 0.976),           // #f1f5f9
            text_dim: Color::from_rgb(0.392, 0.439, 0.529),       // #64748b
            gridline: Color::from_rgb(0.200, 0.255, 0.333),       // #334155
            accent: Color::from_rgb(0.231, 0.510, 0.965),         // #3b82f6
            selected: Color::from_rgba(0.231, 0.510, 0.965, 0.2), // #3b82f6 @ 20%
            selected_border: Color::from_rgb(0.231, 0.510, 0.965),// #3b82f6
            invalid: Color::from_rgb(0.937, 0.267, 0.267),        // #ef4444
        }
    }

    /// Built-in light theme
    pub fn light() -> Self {
        GridTheme {
            bg: Color::from_rgb(0.973, 0.980, 0.988),             // #f8fafc
            bg_header: Color::from_rgb(0.886, 0.910, 0.941),      // #e2e8f0
            bg_row: Color::from_rgb(1.0, 1.0, 1.0),
            bg_row_alt: Color::from_rgb(0.945, 0.961, 0.976),     // #f1f5f9
            bg_group_header: Color::from_rgb(0.886, 0.910, 0.941),// #e2e8f0
            text: Color::from_rgb(0.059, 0.090, 0.165),           // #0f172a
            text_dim: Color::from_rgb(0.278, 0.333, 0.412),       // #475569
            gridline: Color::from_rgb(0.796, 0.835, 0.882),       // #cbd5e1
            accent: Color::from_rgb(0.231, 0.510, 0.965),         // #3b82f6
            selected: Color::from_rgba(0.231, 0.510, 0.965, 0.15),// #3b82f6 @ 15%
            selected_border: Color::from_rgb(0.231, 0.510, 0.965),// #3b82f6
            invalid: Color::from_rgb(0.863, 0.149, 0.149),        // #dc2626
        }
    }

    /// Parse hex color string ("#RRGGBB")
    pub fn hex_to_color(hex: &str) -> Option<Color> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()? as f32 / 255.0;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()? as f32 / 255.0;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()? as f32 / 255.0;
        Some(Color::from_rgb(r, g, b))
    }

    /// Lighten a color by mixing with white
    fn lighten(color: Color, amount: f32) -> Color {
        Color::from_rgb(
            color.r + (1.0 - color.r) * amount,
            color.g + (1.0 - color.g) * amount,
            color.b + (1.0 - color.b) * amount,
        )
    }

    /// Darken a color by mixing with black
    fn darken(color: Color, amount: f32) -> Color {
        Color::from_rgb(
            color.r * (1.0 - amount),
            color.g * (1.0 - amount),
            color.b * (1.0 - amount),
        )
    }

    /// Create GridTheme from a ThemeConfig (JSON theme)
    pub fn from_config(config: &ThemeColorsConfig, is_dark: bool) -> Self {
        let bg = Self::hex_to_color(&config.background).unwrap_or(
            if is_dark { Color::from_rgb(0.008, 0.024, 0.090) }
            else { Color::from_rgb(0.973, 0.980, 0.988) }
        );
        let fg = Self::hex_to_color(&config.foreground).unwrap_or(
            if is_dark { Color::from_rgb(0.945, 0.961, 0.976) }
            else { Color::from_rgb(0.059, 0.090, 0.165) }
        );
        let accent = Self::hex_to_color(&config.accent).unwrap_or(
            Color::from_rgb(0.231, 0.510, 0.965)
        );
        let text_dim = Self::hex_to_color(&config.foreground_muted).unwrap_or(
            Color::from_rgb(0.392, 0.439, 0.529)
        );
        let gridline = Self::hex_to_color(&config.gridline).unwrap_or(
            if is_dark { Self::lighten(bg, 0.10) } else { Self::darken(bg, 0.10) }
        );
        let header_bg = Self::hex_to_color(&config.header_background).unwrap_or(
            if is_dark { Self::lighten(bg, 0.06) } else { Self::darken(bg, 0.03) }
        );
        let group_header_bg = Self::hex_to_color(&config.group_header_background)
            .unwrap_or(header_bg);
        let invalid = Self::hex_to_color(&config.invalid).unwrap_or(
            Color::from_rgb(0.937, 0.267, 0.267)
        );

        // Row backgrounds derive from base with a subtle offset
        let row_bg = if is_dark { Self::lighten(bg, 0.03) } else { bg };
        let row_alt_bg = if is_dark { Self::lighten(bg, 0.05) } else { Self::darken(bg, 0.02) };

        GridTheme {
            bg,
            bg_header: header_bg,
            bg_row: row_bg,
            bg_row_alt: row_alt_bg,
            bg_group_header: group_header_bg,
            text: fg,
            text_dim,
            gridline,
            accent,
            selected: Color::from_rgba(accent.r, accent.g, accent.b, config.selection_alpha),
            selected_border: accent,
            invalid,
        }
    }

    /// Resolve a semantic color name from a conditional-format style hint.
    /// Unknown names fall back to None; the host decides what to do then.
    pub fn resolve_named(&self, name: &str) -> Option<Color> {
        match name {
            "accent" | "selection" => Some(self.accent),
            "invalid" | "error" | "negative" => Some(self.invalid),
            "muted" | "dim" => Some(self.text_dim),
            "text" | "foreground" => Some(self.text),
            "background" => Some(self.bg),
            "header" => Some(self.bg_header),
            other => Self::hex_to_color(other),
        }
    }
}

/// Theme manager - handles loading and switching themes
pub struct ThemeManager {
    source: ThemeSource,
    current: GridTheme,
    current_name: String,
}

impl ThemeManager {
    /// Create a new theme manager with the given source
    pub fn new(source: ThemeSource) -> Self {
        let (current, current_name) = Self::load_theme(&source);
        ThemeManager { source, current, current_name }
    }

    /// Get current theme colors
    pub fn theme(&self) -> GridTheme {
        self.current
    }

    /// Get current theme name
    pub fn name(&self) -> &str {
        &self.current_name
    }

    /// Get current source
    pub fn source(&self) -> &ThemeSource {
        &self.source
    }

    /// Set theme source and reload
    pub fn set_source(&mut self, source: ThemeSource) {
        self.source = source;
        let (theme, name) = Self::load_theme(&self.source);
        self.current = theme;
        self.current_name = name;
    }

    /// Reload current theme
    pub fn reload(&mut self) {
        let (theme, name) = Self::load_theme(&self.source);
        self.current = theme;
        self.current_name = name;
    }

    /// Load theme from source
    fn load_theme(source: &ThemeSource) -> (GridTheme, String) {
        match source {
            // No OS preference lookup in the headless model; hosts that know
            // better call set_source with a concrete choice
            ThemeSource::Auto => (GridTheme::dark(), "Dark".into()),
            ThemeSource::Dark => (GridTheme::dark(), "Dark".into()),
            ThemeSource::Light => (GridTheme::light(), "Light".into()),
            ThemeSource::Custom(path) => match Self::load_custom_theme(path) {
                Some((theme, name)) => (theme, name),
                None => {
                    eprintln!("Failed to load custom theme: {}", path);
                    (GridTheme::dark(), "Dark (fallback)".into())
                }
            },
        }
    }

    /// Load a custom theme from JSON file
    fn load_custom_theme(path: &str) -> Option<(GridTheme, String)> {
        // Expand ~ to home directory
        let expanded = if path.starts_with("~/") {
            let home = std::env::var("HOME").ok()?;
            path.replacen("~", &home, 1)
        } else {
            path.to_string()
        };

        let content = fs::read_to_string(&expanded).ok()?;
        let config: ThemeConfig = serde_json::from_str(&content).ok()?;
        let theme = GridTheme::from_config(&config.colors, config.is_dark);
        Some((theme, config.name))
    }

    /// List available themes (built-in + custom)
    pub fn list_themes() -> Vec<(String, ThemeSource)> {
        let mut themes = vec![
            ("Auto".into(), ThemeSource::Auto),
            ("Dark".into(), ThemeSource::Dark),
            ("Light".into(), ThemeSource::Light),
        ];

        // Add custom themes from config directory
        if let Some(theme_dir) = Self::custom_themes_dir() {
            if let Ok(entries) = fs::read_dir(&theme_dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().map(|e| e == "json").unwrap_or(false) {
                        if let Ok(content) = fs::read_to_string(&path) {
                            if let Ok(config) = serde_json::from_str::<ThemeConfig>(&content) {
                                let path_str = path.to_string_lossy().to_string();
                                themes.push((config.name, ThemeSource::Custom(path_str)));
                            }
                        }
                    }
                }
            }
        }

        themes
    }

    /// Get the custom themes directory path
    pub fn custom_themes_dir() -> Option<PathBuf> {
        let config_dir = dirs::config_dir()?;
        Some(config_dir.join("gridkit").join("themes"))
    }
}

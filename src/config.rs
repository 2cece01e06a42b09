//! Configuration management for Typing Input
//!
//! Provides persistent configuration that is loaded from and saved to a
//! platform-specific config file.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/typing-input/config.toml` |
//! | macOS | `~/Library/Application Support/typing-input/config.toml` |
//! | Windows | `%APPDATA%\typing-input\config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use typing_input::Config;
//!
//! // Load existing config or use defaults
//! let mut config = Config::load().unwrap_or_default();
//!
//! // Rebind an action
//! config.shortcuts.bind("Next", "Ctrl+N");
//!
//! // Save to disk
//! config.save().expect("Failed to save config");
//! ```

use crate::shortcut::ShortcutMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_DIR: &str = "typing-input";

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("Could not determine config directory")]
    NoConfigDir,
    /// IO error reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse config file
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Returns the application's config directory, creating it if needed.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let app_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?.join(APP_DIR);

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir)
}

/// Returns the path to the config file.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Action name -> shortcut string, in priority order
    #[serde(default = "ShortcutMap::defaults")]
    pub shortcuts: ShortcutMap,
    /// Deferred work and suppression timing
    #[serde(default)]
    pub timing: TimingConfig,
    /// Touch device handling
    #[serde(default)]
    pub mobile: MobileConfig,
    /// Playground UI settings
    #[serde(default)]
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shortcuts: ShortcutMap::defaults(),
            timing: TimingConfig::default(),
            mobile: MobileConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

/// Timing of suppression windows and deferred proxy work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long a synthetic key blocks its native duplicate
    pub suppression_window_ms: u64,
    /// Delay before the proxy input is cleared after a dispatch
    pub clear_delay_ms: u64,
    /// Delay before the proxy input is focused after a pointer interaction
    pub focus_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            suppression_window_ms: 150,
            clear_delay_ms: 0,
            focus_delay_ms: 60,
        }
    }
}

impl TimingConfig {
    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }

    pub fn clear_delay(&self) -> Duration {
        Duration::from_millis(self.clear_delay_ms)
    }

    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }
}

/// Touch device handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileConfig {
    /// Force touch handling on or off instead of detecting it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub touch_override: Option<bool>,
    /// Route fragment where the proxy input may take focus
    pub typing_route: String,
    /// Class of the active typing surface
    pub typing_surface_class: String,
    /// Sub-regions with their own input handling
    pub excluded_classes: Vec<String>,
}

impl Default for MobileConfig {
    fn default() -> Self {
        Self {
            touch_override: None,
            typing_route: "/practice".to_string(),
            typing_surface_class: "typing-word".to_string(),
            excluded_classes: vec!["sentence".to_string(), "phrase".to_string()],
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Refresh rate for UI updates (in Hz)
    pub refresh_rate_hz: u32,
    /// Color theme (dark/light)
    pub theme: Theme,
    /// Words offered by the playground
    pub practice_words: Vec<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 60,
            theme: Theme::Dark,
            practice_words: ["keyboard", "ice cream", "composition", "o'clock", "well-known"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

/// Color theme options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        for shadowed in config.shortcuts.shadowed() {
            log::warn!("shortcut conflict in {}: {}", path.display(), shadowed);
        }
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get UI refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.ui.refresh_rate_hz.max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_config_path(tag: &str) -> PathBuf {
        env::temp_dir().join(format!("typing-input-test-{}-{}.toml", tag, std::process::id()))
    }

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.timing.suppression_window_ms, 150);
        assert_eq!(config.timing.clear_delay_ms, 0);
        assert_eq!(config.timing.focus_delay_ms, 60);
        assert_eq!(config.mobile.typing_route, "/practice");
        assert_eq!(config.mobile.typing_surface_class, "typing-word");
        assert_eq!(config.mobile.excluded_classes, vec!["sentence", "phrase"]);
        assert_eq!(config.ui.theme, Theme::Dark);
    }

    #[test]
    fn empty_document_gives_default_shortcuts() {
        let config: Config = toml::from_str("").expect("empty config");
        assert_eq!(config.shortcuts, ShortcutMap::defaults());
        assert_eq!(Config::default().shortcuts, ShortcutMap::defaults());
    }

    #[test]
    fn config_refresh_interval() {
        let config = Config::default();
        assert_eq!(config.refresh_interval().as_micros(), 16666);
    }

    #[test]
    fn config_save_and_load_roundtrip() {
        let path = temp_config_path("roundtrip");

        let mut config = Config::default();
        config.shortcuts.bind("Next", "Ctrl+N");
        config.timing.focus_delay_ms = 80;
        config.ui.theme = Theme::Light;

        config.save_to(&path).expect("Failed to save config");
        let loaded = Config::load_from(&path).expect("Failed to load config");

        assert_eq!(loaded.shortcuts, config.shortcuts);
        assert_eq!(loaded.timing.focus_delay_ms, 80);
        assert_eq!(loaded.ui.theme, Theme::Light);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn config_load_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn config_deserializes_from_toml() {
        let toml_str = r#"
[shortcuts]
Next = "Ctrl+➡"
Skip = "Ctrl+➡"
ShowWord = "Escape"

[timing]
suppression_window_ms = 200

[mobile]
touch_override = true
typing_route = "/words"

[ui]
refresh_rate_hz = 144
theme = "Light"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");

        assert_eq!(config.shortcuts.len(), 3);
        assert_eq!(config.shortcuts.resolve("Ctrl+➡"), Some("Next"));
        assert_eq!(config.shortcuts.shadowed().len(), 1);
        assert_eq!(config.timing.suppression_window_ms, 200);
        assert_eq!(config.timing.focus_delay_ms, 60);
        assert_eq!(config.mobile.touch_override, Some(true));
        assert_eq!(config.mobile.typing_route, "/words");
        assert_eq!(config.mobile.typing_surface_class, "typing-word");
        assert_eq!(config.ui.refresh_rate_hz, 144);
        assert_eq!(config.ui.theme, Theme::Light);
    }

    #[test]
    fn config_parse_error_is_reported() {
        let path = temp_config_path("broken");
        fs::write(&path, "[timing\nsuppression_window_ms = ").expect("write temp file");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::NoConfigDir;
        assert_eq!(err.to_string(), "Could not determine config directory");

        let io_err = ConfigError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(io_err.to_string().contains("IO error"));
    }

    #[test]
    fn timing_durations() {
        let timing = TimingConfig::default();
        assert_eq!(timing.suppression_window(), Duration::from_millis(150));
        assert_eq!(timing.clear_delay(), Duration::ZERO);
        assert_eq!(timing.focus_delay(), Duration::from_millis(60));
    }
}

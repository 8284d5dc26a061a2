//! Configuration for espterm-host.
//!
//! Loaded from `~/.espterm/config.toml`. Every section and field is
//! optional; missing values take their defaults.
//!
//! ```toml
//! [screen]
//! width = 80
//! height = 24
//! theme = 0
//! default_fg = "7"          # palette index or "#rrggbb"
//! default_bg = "#101010"
//! cursor_shape = 1          # DECSCUSR value
//! crlf = false              # LF also returns the carriage
//!
//! [static]
//! font_stack = "Inconsolata"
//! font_size = 12
//!
//! [title]
//! text = "ESPTerm"
//!
//! [buttons]
//! labels = ["1", "2", "3", "4", "5"]
//! messages = ["01,121", "01,110", "", "", "05"]
//! count = 5
//!
//! [session]
//! shell = "/bin/bash"
//! args = ["-l"]
//! tick_ms = 30
//! heartbeat_ms = 1000
//! max_connections = 1
//! restart_on_exit = true
//! debug = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::term::style::TRUECOLOR_OFFSET;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screen: ScreenConfig,
    #[serde(rename = "static")]
    pub static_opts: StaticConfig,
    pub title: TitleConfig,
    pub buttons: ButtonsConfig,
    pub session: SessionConfig,
}

/// Screen geometry, theme and default colors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u16,
    pub height: u16,
    pub theme: u32,
    pub default_fg: String,
    pub default_bg: String,
    pub cursor_shape: u8,
    pub crlf: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            theme: 0,
            default_fg: "7".to_string(),
            default_bg: "0".to_string(),
            cursor_shape: 1,
            crlf: false,
        }
    }
}

impl ScreenConfig {
    pub fn default_fg_wire(&self) -> u32 {
        parse_color(&self.default_fg).unwrap_or(7)
    }

    pub fn default_bg_wire(&self) -> u32 {
        parse_color(&self.default_bg).unwrap_or(0)
    }
}

/// Font settings, sent separately from the screen options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub font_stack: String,
    pub font_size: u32,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            font_stack: "Inconsolata".to_string(),
            font_size: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    pub text: String,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            text: "ESPTerm".to_string(),
        }
    }
}

/// Action buttons shown under the screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonsConfig {
    pub labels: Vec<String>,
    /// Comma separated decimal byte values written to the shell
    pub messages: Vec<String>,
    pub count: usize,
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self {
            labels: ["1", "2", "3", "4", "5"].iter().map(|s| s.to_string()).collect(),
            messages: ["01,121", "01,110", "", "", "05"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            count: 5,
        }
    }
}

impl ButtonsConfig {
    /// Labels of the buttons actually shown.
    pub fn visible_labels(&self) -> Vec<String> {
        self.labels.iter().take(self.count).cloned().collect()
    }

    /// Bytes for the 1-based button `index`, or `None` if it has no message.
    pub fn message_bytes(&self, index: u32) -> Option<Vec<u8>> {
        let slot = (index as usize).checked_sub(1)?;
        if slot >= self.count {
            return None;
        }
        let bytes: Vec<u8> = self
            .messages
            .get(slot)?
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect();
        (!bytes.is_empty()).then_some(bytes)
    }
}

/// Shell process and session timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub shell: String,
    pub args: Vec<String>,
    pub tick_ms: u64,
    pub heartbeat_ms: u64,
    pub max_connections: usize,
    pub restart_on_exit: bool,
    /// Adds the diagnostic topic to update frames
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            args: Vec::new(),
            tick_ms: 30,
            heartbeat_ms: 1000,
            max_connections: 1,
            restart_on_exit: true,
            debug: false,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms.max(1))
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        let dir = config_dir().ok_or(ConfigError::NoHomeDir)?;
        fs::create_dir_all(&dir)?;
        self.save_to(&dir.join("config.toml"))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.espterm`
pub fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".espterm"))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

/// Parse a palette index (`"0"`..`"255"`) or `#rrggbb` into a color wire
/// value.
pub fn parse_color(value: &str) -> Option<u32> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        return u32::from_str_radix(hex, 16)
            .ok()
            .map(|rgb| rgb + TRUECOLOR_OFFSET);
    }
    value.parse::<u8>().ok().map(u32::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!((config.screen.width, config.screen.height), (80, 24));
        assert_eq!(config.session.tick_interval(), Duration::from_millis(30));
        assert_eq!(config.session.heartbeat_interval(), Duration::from_secs(1));
        assert_eq!(config.session.max_connections, 1);
        assert_eq!(config.title.text, "ESPTerm");
        assert_eq!(config.static_opts.font_stack, "Inconsolata");
        assert_eq!(config.buttons.visible_labels().len(), 5);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r##"
            [screen]
            width = 100
            default_bg = "#1a1b26"

            [static]
            font_size = 16

            [buttons]
            count = 2
            "##,
        )
        .unwrap();
        assert_eq!(config.screen.width, 100);
        assert_eq!(config.screen.height, 24);
        assert_eq!(config.screen.default_bg_wire(), 0x1a1b26 + 256);
        assert_eq!(config.static_opts.font_size, 16);
        assert_eq!(config.static_opts.font_stack, "Inconsolata");
        assert_eq!(config.buttons.visible_labels(), vec!["1", "2"]);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("7"), Some(7));
        assert_eq!(parse_color("#FFFFFF"), Some(0xFFFFFF + 256));
        assert_eq!(parse_color("#fff"), None);
        assert_eq!(parse_color("300"), None);
        assert_eq!(parse_color("red"), None);

        let screen = ScreenConfig {
            default_fg: "bogus".to_string(),
            ..ScreenConfig::default()
        };
        assert_eq!(screen.default_fg_wire(), 7);
    }

    #[test]
    fn test_button_messages() {
        let buttons = ButtonsConfig::default();
        assert_eq!(buttons.message_bytes(1), Some(vec![1, 121]));
        assert_eq!(buttons.message_bytes(2), Some(vec![1, 110]));
        assert_eq!(buttons.message_bytes(3), None);
        assert_eq!(buttons.message_bytes(5), Some(vec![5]));
        assert_eq!(buttons.message_bytes(0), None);
        assert_eq!(buttons.message_bytes(6), None);

        let buttons = ButtonsConfig {
            count: 1,
            ..ButtonsConfig::default()
        };
        assert_eq!(buttons.message_bytes(2), None);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("espterm-config-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.screen.theme = 4;
        config.session.args = vec!["-l".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_errors() {
        let path = std::env::temp_dir().join("espterm-config-missing.toml");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Io(_))));

        let bad: Result<Config, _> = toml::from_str("[screen]\nwidth = \"wide\"");
        assert!(bad.is_err());
    }
}

//! Configuration system for NextWM
//!
//! Loads configuration from TOML file at `~/.config/nextwm/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::focus::FocusPolicy;
use crate::wm::workspace::NameDisplay;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub focus: FocusConfig,
    pub workspaces: WorkspacesConfig,
    pub icons: IconsConfig,
    pub cycling: CyclingConfig,
    pub decorations: DecorationsConfig,
    pub keybindings: KeybindingsConfig,
    pub commands: CommandsConfig,
    pub helper: HelperConfig,
    pub session: SessionConfig,
    /// Per-class attribute overrides
    #[serde(rename = "window", skip_serializing_if = "Vec::is_empty")]
    pub windows: Vec<WindowRule>,
}

impl Config {
    /// Load configuration from `path` or the default location
    ///
    /// A missing file is created with defaults; a file that does not parse
    /// falls back to defaults with a warning.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config = match Self::parse(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse {:?}, using defaults: {:#}", config_path, e);
                return Ok(Self::default());
            }
        };

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nextwm");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }

    /// Per-class rules matching a window, in file order
    pub fn rules_for<'a>(
        &'a self,
        instance: Option<&'a str>,
        class: Option<&'a str>,
    ) -> impl Iterator<Item = &'a WindowRule> + 'a {
        self.windows.iter().filter(move |rule| rule.matches(instance, class))
    }
}

/// Focus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// "click", "sloppy" or "follow"
    pub mode: FocusPolicy,
    /// Raise windows while cycling through them
    pub circulate_raise: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            mode: FocusPolicy::ClickToFocus,
            circulate_raise: true,
        }
    }
}

/// Workspace configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspacesConfig {
    /// Workspaces created at startup
    pub initial_count: usize,
    /// Wrap around when switching past the first or last workspace
    pub cycle: bool,
    /// Create a workspace when switching past the last one
    pub advance: bool,
    /// Disable the per-workspace clip
    pub no_clip: bool,
    /// Where the workspace name flashes after a switch
    pub name_display: NameDisplay,
    /// Keep the pager's window map up to date
    pub enable_pager: bool,
}

impl Default for WorkspacesConfig {
    fn default() -> Self {
        Self {
            initial_count: 4,
            cycle: false,
            advance: false,
            no_clip: false,
            name_display: NameDisplay::Center,
            enable_pager: false,
        }
    }
}

/// Miniwindow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconsConfig {
    /// Show miniwindows on every workspace
    pub sticky_icons: bool,
    /// Rearrange miniwindows whenever one is added or removed
    pub auto_arrange: bool,
    /// Miniwindow size in pixels
    pub icon_size: u32,
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            sticky_icons: false,
            auto_arrange: true,
            icon_size: 64,
        }
    }
}

/// Window cycling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CyclingConfig {
    /// Skip miniaturized and hidden windows when stepping
    pub ignore_minimized: bool,
    /// Keep cycling while Shift is released
    pub strict_windoze_cycle: bool,
    /// Start on the first panel entry instead of the next window
    pub panel_only_open: bool,
    /// Draw the switch panel
    pub show_panel: bool,
    /// List one entry per application instead of every window
    pub by_application: bool,
}

impl Default for CyclingConfig {
    fn default() -> Self {
        Self {
            ignore_minimized: false,
            strict_windoze_cycle: true,
            panel_only_open: false,
            show_panel: true,
            by_application: false,
        }
    }
}

/// Frame decoration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationsConfig {
    /// Titlebar height in pixels
    pub titlebar_height: u32,
    /// Resizebar height in pixels
    pub resizebar_height: u32,
    /// Frame border width in pixels
    pub border_width: u32,
    /// Titlebar color of the focused window (hex: 0xRRGGBB)
    pub focused_color: u32,
    /// Titlebar color of other windows (hex: 0xRRGGBB)
    pub unfocused_color: u32,
    /// Border color (hex: 0xRRGGBB)
    pub border_color: u32,
    /// Title text color (hex: 0xRRGGBB)
    pub text_color: u32,
}

impl Default for DecorationsConfig {
    fn default() -> Self {
        Self {
            titlebar_height: 22,
            resizebar_height: 8,
            border_width: 1,
            focused_color: 0x000000,
            unfocused_color: 0xaaaaaa,
            border_color: 0x000000,
            text_color: 0xffffff,
        }
    }
}

/// Keyboard shortcuts, as chords like "Mod1+Tab"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub focus_next: String,
    pub focus_prev: String,
    pub group_next: String,
    pub group_prev: String,
    pub workspace_next: String,
    pub workspace_prev: String,
    pub last_workspace: String,
    /// Runs `commands.run`
    pub run: String,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            focus_next: "Mod1+Tab".to_string(),
            focus_prev: "Mod1+Shift+Tab".to_string(),
            group_next: "Mod1+grave".to_string(),
            group_prev: "Mod1+Shift+grave".to_string(),
            workspace_next: "Control+Right".to_string(),
            workspace_prev: "Control+Left".to_string(),
            last_workspace: "Control+Escape".to_string(),
            run: "Mod4+Return".to_string(),
        }
    }
}

/// Commands bound to keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub run: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            run: "xterm".to_string(),
        }
    }
}

/// Background helper configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    /// Program reading workspace/background messages on stdin
    pub command: Option<String>,
}

/// Session state configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where workspace names and clips are saved
    pub state_file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let dir = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            state_file: dir.join("nextwm").join("session.json"),
        }
    }
}

/// Attribute overrides for windows of one class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowRule {
    /// WM_CLASS class to match ("*" matches all)
    pub class: String,
    /// WM_CLASS instance to match, any when unset
    pub instance: Option<String>,
    pub no_titlebar: Option<bool>,
    pub no_resizebar: Option<bool>,
    pub no_border: Option<bool>,
    pub no_focusable: Option<bool>,
    pub omnipresent: Option<bool>,
    pub floating: Option<bool>,
    pub sunken: Option<bool>,
    pub skip_window_list: Option<bool>,
    pub skip_switchpanel: Option<bool>,
    pub start_hidden: Option<bool>,
    pub start_miniaturized: Option<bool>,
    pub start_maximized: Option<bool>,
    pub dont_save_session: Option<bool>,
    pub emulate_appicon: Option<bool>,
    pub shared_appicon: Option<bool>,
    pub kill_close: Option<bool>,
}

impl WindowRule {
    pub fn matches(&self, instance: Option<&str>, class: Option<&str>) -> bool {
        let class_ok = self.class == "*" || class == Some(self.class.as_str());
        let instance_ok = match &self.instance {
            Some(wanted) => instance == Some(wanted.as_str()),
            None => true,
        };
        class_ok && instance_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [focus]
            mode = "sloppy"

            [workspaces]
            initial_count = 2
            cycle = true
            "#,
        )
        .unwrap();
        assert_eq!(config.focus.mode, FocusPolicy::SloppyFocus);
        assert!(config.focus.circulate_raise);
        assert_eq!(config.workspaces.initial_count, 2);
        assert!(config.workspaces.cycle);
        assert_eq!(config.decorations, DecorationsConfig::default());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), Config::default());
    }

    #[test]
    fn test_window_rules_match_by_class_and_instance() {
        let config = Config::parse(
            r#"
            [[window]]
            class = "XTerm"
            omnipresent = true

            [[window]]
            class = "Firefox"
            instance = "Navigator"
            no_titlebar = true
            "#,
        )
        .unwrap();
        assert_eq!(config.rules_for(Some("xterm"), Some("XTerm")).count(), 1);
        assert_eq!(config.rules_for(Some("Toolkit"), Some("Firefox")).count(), 0);
        assert_eq!(config.rules_for(Some("Navigator"), Some("Firefox")).count(), 1);
    }

    #[test]
    fn test_bad_file_is_an_error_for_parse() {
        assert!(Config::parse("[focus]\nmode = 3").is_err());
    }
}

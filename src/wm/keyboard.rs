//! Keyboard Module
//!
//! Parses the configured chords ("Mod1+Shift+Tab"), grabs them on the root
//! and maps key presses back to actions.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::KeybindingsConfig;
use crate::wm::error::log_and_ignore;
use crate::wm::screen::Screen;

/// Modifier bits of the core protocol key state
pub mod modmask {
    pub const SHIFT: u16 = 1 << 0;
    pub const LOCK: u16 = 1 << 1;
    pub const CONTROL: u16 = 1 << 2;
    pub const MOD1: u16 = 1 << 3;
    pub const MOD2: u16 = 1 << 4;
    pub const MOD3: u16 = 1 << 5;
    pub const MOD4: u16 = 1 << 6;
    pub const MOD5: u16 = 1 << 7;
}

/// Lock and NumLock don't change what a chord means
pub const IGNORED_MODIFIERS: u16 = modmask::LOCK | modmask::MOD2;

/// Keysym constants from X11/keysymdef.h
pub mod keysym {
    pub const TAB: u32 = 0xff09;
    pub const RETURN: u32 = 0xff0d;
    pub const ESCAPE: u32 = 0xff1b;
    pub const HOME: u32 = 0xff50;
    pub const LEFT: u32 = 0xff51;
    pub const UP: u32 = 0xff52;
    pub const RIGHT: u32 = 0xff53;
    pub const DOWN: u32 = 0xff54;
    pub const END: u32 = 0xff57;
    pub const SHIFT_L: u32 = 0xffe1;
    pub const SHIFT_R: u32 = 0xffe2;
    pub const F1: u32 = 0xffbe;
}

/// What a bound key does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardAction {
    FocusNext,
    FocusPrev,
    GroupNext,
    GroupPrev,
    WorkspaceNext,
    WorkspacePrev,
    LastWorkspace,
    Run,
}

/// A key with its modifiers, before keycode resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub keysym: u32,
    pub modifiers: u16,
}

impl KeyChord {
    /// Parse "Mod1+Shift+Tab"; the last part is the key
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts: Vec<&str> = text.split('+').map(str::trim).collect();
        let key = parts.pop().filter(|key| !key.is_empty())?;
        let modifiers = parts
            .iter()
            .map(|name| modifier_mask(name))
            .try_fold(0u16, |acc, mask| mask.map(|mask| acc | mask))?;
        Some(Self {
            keysym: keysym_from_name(key)?,
            modifiers,
        })
    }
}

fn modifier_mask(name: &str) -> Option<u16> {
    match name.to_ascii_lowercase().as_str() {
        "shift" => Some(modmask::SHIFT),
        "control" | "ctrl" => Some(modmask::CONTROL),
        "mod1" | "alt" | "meta" => Some(modmask::MOD1),
        "mod2" => Some(modmask::MOD2),
        "mod3" => Some(modmask::MOD3),
        "mod4" | "super" | "hyper" => Some(modmask::MOD4),
        "mod5" => Some(modmask::MOD5),
        _ => None,
    }
}

/// Keysym for a key name, Latin-1 printables plus the usual function keys
pub fn keysym_from_name(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_graphic() {
            return Some(c.to_ascii_lowercase() as u32);
        }
    }
    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        return (1..=35).contains(&n).then(|| keysym::F1 + n - 1);
    }
    let sym = match name {
        "Tab" => keysym::TAB,
        "Return" | "Enter" => keysym::RETURN,
        "Escape" => keysym::ESCAPE,
        "Home" => keysym::HOME,
        "End" => keysym::END,
        "Left" => keysym::LEFT,
        "Right" => keysym::RIGHT,
        "Up" => keysym::UP,
        "Down" => keysym::DOWN,
        "Page_Up" | "Prior" => 0xff55,
        "Page_Down" | "Next" => 0xff56,
        "BackSpace" => 0xff08,
        "Delete" => 0xffff,
        "Insert" => 0xff63,
        "space" => 0x20,
        "grave" => 0x60,
        "minus" => 0x2d,
        "equal" => 0x3d,
        "comma" => 0x2c,
        "period" => 0x2e,
        "slash" => 0x2f,
        "Shift_L" => keysym::SHIFT_L,
        "Shift_R" => keysym::SHIFT_R,
        _ => return None,
    };
    Some(sym)
}

/// A chord resolved against the server's keymap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub keycode: u8,
    pub modifiers: u16,
}

impl KeyBinding {
    pub fn matches(&self, keycode: u8, state: u16) -> bool {
        self.keycode == keycode && self.modifiers == state & !IGNORED_MODIFIERS & 0xff
    }
}

/// Configured shortcuts
pub struct KeyboardManager {
    chords: Vec<(KeyChord, KeyboardAction)>,
    /// Filled by `grab_keys` once keycodes are known
    bindings: HashMap<KeyBinding, KeyboardAction>,
}

impl KeyboardManager {
    pub fn new(config: &KeybindingsConfig) -> Self {
        let entries = [
            (&config.focus_next, KeyboardAction::FocusNext),
            (&config.focus_prev, KeyboardAction::FocusPrev),
            (&config.group_next, KeyboardAction::GroupNext),
            (&config.group_prev, KeyboardAction::GroupPrev),
            (&config.workspace_next, KeyboardAction::WorkspaceNext),
            (&config.workspace_prev, KeyboardAction::WorkspacePrev),
            (&config.last_workspace, KeyboardAction::LastWorkspace),
            (&config.run, KeyboardAction::Run),
        ];
        let mut chords = Vec::new();
        for (text, action) in entries {
            if text.is_empty() {
                continue;
            }
            match KeyChord::parse(text) {
                Some(chord) => chords.push((chord, action)),
                None => warn!("Ignoring unparsable key binding {:?} for {:?}", text, action),
            }
        }
        Self {
            chords,
            bindings: HashMap::new(),
        }
    }

    pub fn chord(&self, action: KeyboardAction) -> Option<KeyChord> {
        self.chords.iter().find(|(_, a)| *a == action).map(|(chord, _)| *chord)
    }

    /// The resolved binding for an action, once keys are grabbed
    pub fn binding(&self, action: KeyboardAction) -> Option<KeyBinding> {
        self.bindings.iter().find(|(_, a)| **a == action).map(|(binding, _)| *binding)
    }

    /// Action bound to a key press
    pub fn lookup(&self, keycode: u8, state: u16) -> Option<KeyboardAction> {
        self.bindings
            .iter()
            .find(|(binding, _)| binding.matches(keycode, state))
            .map(|(_, action)| *action)
    }
}

impl Screen {
    /// Resolve configured chords and grab them on the root
    pub fn grab_keys(&mut self) {
        let mut resolved = HashMap::new();
        for (chord, action) in self.keyboard.chords.clone() {
            let Some(keycode) = self.conn.keysym_to_keycode(chord.keysym) else {
                warn!("No keycode for keysym {:#x} ({:?})", chord.keysym, action);
                continue;
            };
            // Grab with every combination of the ignored modifiers
            for extra in [0, modmask::LOCK, modmask::MOD2, modmask::LOCK | modmask::MOD2] {
                log_and_ignore(self.conn.grab_key(keycode, chord.modifiers | extra), "grab key");
            }
            resolved.insert(
                KeyBinding {
                    keycode,
                    modifiers: chord.modifiers,
                },
                action,
            );
        }
        debug!("Grabbed {} key bindings", resolved.len());
        self.keyboard.bindings = resolved;
    }

    /// Run the action bound to a key, if any; returns whether it was bound
    pub fn handle_key_binding(&mut self, keycode: u8, state: u16) -> bool {
        let Some(action) = self.keyboard.lookup(keycode, state) else {
            return false;
        };
        debug!("Key action {:?}", action);
        match action {
            KeyboardAction::FocusNext => self.start_cycle(true, false),
            KeyboardAction::FocusPrev => self.start_cycle(false, false),
            KeyboardAction::GroupNext => self.start_cycle(true, true),
            KeyboardAction::GroupPrev => self.start_cycle(false, true),
            KeyboardAction::WorkspaceNext => self.relative_switch_workspace(1),
            KeyboardAction::WorkspacePrev => self.relative_switch_workspace(-1),
            KeyboardAction::LastWorkspace => self.switch_to_last_workspace(),
            KeyboardAction::Run => {
                let command = self.config.commands.run.clone();
                if let Err(e) = self.execute_shell_command(&command) {
                    warn!("Run command failed: {:#}", e);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::{FakeConn, screen_with};

    #[test]
    fn test_parse_chords() {
        assert_eq!(
            KeyChord::parse("Mod1+Shift+Tab"),
            Some(KeyChord {
                keysym: keysym::TAB,
                modifiers: modmask::MOD1 | modmask::SHIFT
            })
        );
        assert_eq!(
            KeyChord::parse("Control+Right").map(|c| c.keysym),
            Some(keysym::RIGHT)
        );
        assert_eq!(KeyChord::parse("F12").map(|c| c.keysym), Some(keysym::F1 + 11));
        assert_eq!(KeyChord::parse("Mod4+A").map(|c| c.keysym), Some('a' as u32));
        assert_eq!(KeyChord::parse("Hyperdrive+Tab"), None);
        assert_eq!(KeyChord::parse("Mod1+"), None);
    }

    #[test]
    fn test_lookup_ignores_lock_and_numlock() {
        let binding = KeyBinding {
            keycode: 23,
            modifiers: modmask::MOD1,
        };
        assert!(binding.matches(23, modmask::MOD1 | modmask::LOCK | modmask::MOD2));
        assert!(!binding.matches(23, modmask::MOD1 | modmask::SHIFT));
        assert!(!binding.matches(24, modmask::MOD1));
    }

    #[test]
    fn test_bad_binding_is_skipped() {
        let config = KeybindingsConfig {
            run: "Nonsense+Key+".to_string(),
            ..Default::default()
        };
        let keyboard = KeyboardManager::new(&config);
        assert!(keyboard.chord(KeyboardAction::Run).is_none());
        assert!(keyboard.chord(KeyboardAction::FocusNext).is_some());
    }

    #[test]
    fn test_grab_keys_resolves_bindings() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        screen.grab_keys();
        let binding = screen.keyboard.binding(KeyboardAction::WorkspaceNext).unwrap();
        assert_eq!(binding.modifiers, modmask::CONTROL);
        assert!(fake.grabbed_keys().contains(&(binding.keycode, modmask::CONTROL | modmask::LOCK)));
        assert_eq!(
            screen.keyboard.lookup(binding.keycode, modmask::CONTROL | modmask::MOD2),
            Some(KeyboardAction::WorkspaceNext)
        );
    }

    #[test]
    fn test_workspace_binding_switches() {
        let (mut screen, _fake) = screen_with(FakeConn::new());
        screen.grab_keys();
        let binding = screen.keyboard.binding(KeyboardAction::WorkspaceNext).unwrap();
        assert!(screen.handle_key_binding(binding.keycode, binding.modifiers));
        assert_eq!(screen.current_workspace(), 1);
        assert!(!screen.handle_key_binding(binding.keycode, 0));
    }
}

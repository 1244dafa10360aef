//! Client Flags
//!
//! Bitfield flags for window attributes, protocol support and maximize
//! state. Runtime state that is not a bitfield in X terms lives in
//! [`WindowState`] as named booleans.

use bitflags::bitflags;

bitflags! {
    /// Window attributes, settable by the client (hints) or the user (config)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attributes: u32 {
        const NO_TITLEBAR           = 1 << 0;
        const NO_RESIZABLE          = 1 << 1;
        const NO_CLOSABLE           = 1 << 2;
        const NO_MINIATURIZABLE     = 1 << 3;
        const NO_BORDER             = 1 << 4;
        const NO_MOVABLE            = 1 << 5;
        const NO_RESIZEBAR          = 1 << 6;
        const NO_CLOSE_BUTTON       = 1 << 7;
        const NO_MINIATURIZE_BUTTON = 1 << 8;
        const KILL_CLOSE            = 1 << 9;
        const NO_SHADEABLE          = 1 << 10;
        const OMNIPRESENT           = 1 << 11;
        const SKIP_WINDOW_LIST      = 1 << 12;
        const SKIP_SWITCHPANEL      = 1 << 13;
        const FLOATING              = 1 << 14;
        const SUNKEN                = 1 << 15;
        const NO_FOCUSABLE          = 1 << 16;
        const START_HIDDEN          = 1 << 17;
        const START_MINIATURIZED    = 1 << 18;
        const START_MAXIMIZED       = 1 << 19;
        const DONT_SAVE_SESSION     = 1 << 20;
        const EMULATE_APPICON       = 1 << 21;
        const SHARED_APPICON        = 1 << 22;
    }
}

/// Attribute values plus which of them were explicitly set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeSet {
    pub values: Attributes,
    pub defined: Attributes,
}

impl AttributeSet {
    pub fn set(&mut self, attr: Attributes, on: bool) {
        self.values.set(attr, on);
        self.defined.insert(attr);
    }

    /// The value if defined here
    pub fn get(&self, attr: Attributes) -> Option<bool> {
        self.defined.contains(attr).then(|| self.values.contains(attr))
    }
}

/// Resolve an attribute: the user setting wins when defined
pub fn resolve(user: &AttributeSet, client: &AttributeSet, attr: Attributes) -> bool {
    user.get(attr).unwrap_or(client.values.contains(attr))
}

bitflags! {
    /// WM_PROTOCOLS the client participates in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Protocols: u32 {
        const DELETE_WINDOW      = 1 << 0;
        const TAKE_FOCUS         = 1 << 1;
        const SAVE_YOURSELF      = 1 << 2;
        const MINIATURIZE_WINDOW = 1 << 3;
    }
}

bitflags! {
    /// Maximize sub-mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MaxFlags: u32 {
        const HORIZONTAL = 1 << 0;
        const VERTICAL   = 1 << 1;
        const LEFTHALF   = 1 << 2;
        const RIGHTHALF  = 1 << 3;
        const TOPHALF    = 1 << 4;
        const BOTTOMHALF = 1 << 5;
        const MAXIMUS    = 1 << 6;
        /// Maximize was requested from the keyboard
        const KEYBOARD   = 1 << 7;
        /// Maximize over the whole screen, not the current head
        const IGNORE_XINERAMA = 1 << 8;
    }
}

impl MaxFlags {
    /// The seven directional bits
    pub const DIRECTIONS: MaxFlags = MaxFlags::HORIZONTAL
        .union(MaxFlags::VERTICAL)
        .union(MaxFlags::LEFTHALF)
        .union(MaxFlags::RIGHTHALF)
        .union(MaxFlags::TOPHALF)
        .union(MaxFlags::BOTTOMHALF)
        .union(MaxFlags::MAXIMUS);

    /// Bits invalidated by a width change
    pub const WIDTH_FAMILY: MaxFlags = MaxFlags::HORIZONTAL
        .union(MaxFlags::TOPHALF)
        .union(MaxFlags::BOTTOMHALF)
        .union(MaxFlags::MAXIMUS);

    /// Bits invalidated by a height change
    pub const HEIGHT_FAMILY: MaxFlags = MaxFlags::VERTICAL
        .union(MaxFlags::LEFTHALF)
        .union(MaxFlags::RIGHTHALF)
        .union(MaxFlags::MAXIMUS);

    pub fn is_maximized(&self) -> bool {
        self.intersects(Self::DIRECTIONS)
    }
}

/// Per-window runtime state
///
/// The axes are independent; shaded + maximized, miniaturized + omnipresent
/// and so on are all legal combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowState {
    pub mapped: bool,
    pub focused: bool,
    pub miniaturized: bool,
    pub hidden: bool,
    pub shaded: bool,
    pub maximized: MaxFlags,
    pub fullscreen: bool,
    pub omnipresent: bool,
    pub urgent: bool,
    pub selected: bool,
    /// One of the WM's own windows (dialogs, panels)
    pub internal: bool,
    /// Owner of the focused transient
    pub semi_focused: bool,
    /// Being moved to another workspace right now
    pub changing_workspace: bool,
    /// Title comes from _NET_WM_NAME, ignore WM_NAME
    pub net_has_title: bool,
    pub is_gnustep: bool,
}

/// Stacking level of a frame (WindowMaker levels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum StackLevel {
    Desktop = -1000,
    Sunken = -1,
    #[default]
    Normal = 0,
    Floating = 3,
    Docked = 5,
    Submenu = 15,
    MainMenu = 20,
    Fullscreen = 50,
    OutsideMenus = 100,
}

impl StackLevel {
    /// Nearest level for a raw GNUstep/WindowMaker level number
    pub fn from_raw(level: i32) -> Self {
        match level {
            i32::MIN..=-2 => StackLevel::Desktop,
            -1 => StackLevel::Sunken,
            0..=2 => StackLevel::Normal,
            3..=4 => StackLevel::Floating,
            5..=14 => StackLevel::Docked,
            15..=19 => StackLevel::Submenu,
            20..=49 => StackLevel::MainMenu,
            50..=99 => StackLevel::Fullscreen,
            _ => StackLevel::OutsideMenus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_attribute_overrides_client() {
        let mut user = AttributeSet::default();
        let mut client = AttributeSet::default();
        client.set(Attributes::NO_TITLEBAR, true);
        assert!(resolve(&user, &client, Attributes::NO_TITLEBAR));

        user.set(Attributes::NO_TITLEBAR, false);
        assert!(!resolve(&user, &client, Attributes::NO_TITLEBAR));
        assert!(!resolve(&user, &client, Attributes::OMNIPRESENT));
    }

    #[test]
    fn test_max_families_share_only_maximus() {
        assert_eq!(
            MaxFlags::WIDTH_FAMILY & MaxFlags::HEIGHT_FAMILY,
            MaxFlags::MAXIMUS
        );
        assert!(!(MaxFlags::KEYBOARD).is_maximized());
        assert!((MaxFlags::LEFTHALF | MaxFlags::KEYBOARD).is_maximized());
    }

    #[test]
    fn test_level_from_raw() {
        assert_eq!(StackLevel::from_raw(0), StackLevel::Normal);
        assert_eq!(StackLevel::from_raw(3), StackLevel::Floating);
        assert_eq!(StackLevel::from_raw(-5), StackLevel::Desktop);
        assert!(StackLevel::Floating > StackLevel::Normal);
    }
}

//! Hints Module
//!
//! Decoding of ICCCM / EWMH / GNUstep window properties into plain
//! structs, and the normal-hints sanitizing rules. Nothing in here talks
//! to the server; the client layer feeds raw property words in.

use bitflags::bitflags;
use tracing::warn;

use crate::shared::Geometry;
use crate::wm::xconn::{NONE, Xid};

/// Smallest width/height a managed window may be given
pub const MIN_WINDOW_SIZE: i32 = 5;

bitflags! {
    /// XSizeHints.flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SizeHintsFlags: u32 {
        const US_POSITION = 1 << 0;
        const US_SIZE = 1 << 1;
        const P_POSITION = 1 << 2;
        const P_SIZE = 1 << 3;
        const P_MIN_SIZE = 1 << 4;
        const P_MAX_SIZE = 1 << 5;
        const P_RESIZE_INC = 1 << 6;
        const P_ASPECT = 1 << 7;
        const P_BASE_SIZE = 1 << 8;
        const P_WIN_GRAVITY = 1 << 9;
    }
}

bitflags! {
    /// XWMHints.flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WmHintsFlags: u32 {
        const INPUT = 1 << 0;
        const STATE = 1 << 1;
        const ICON_PIXMAP = 1 << 2;
        const ICON_WINDOW = 1 << 3;
        const ICON_POSITION = 1 << 4;
        const ICON_MASK = 1 << 5;
        const WINDOW_GROUP = 1 << 6;
        const URGENCY = 1 << 8;
    }
}

/// Window gravity (ICCCM win_gravity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    Forget,
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Gravity {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => Gravity::Forget,
            1 => Gravity::NorthWest,
            2 => Gravity::North,
            3 => Gravity::NorthEast,
            4 => Gravity::West,
            5 => Gravity::Center,
            6 => Gravity::East,
            7 => Gravity::SouthWest,
            8 => Gravity::South,
            9 => Gravity::SouthEast,
            10 => Gravity::Static,
            _ => return None,
        })
    }

    /// Direction of the reference point relative to the window center
    pub fn offsets(self) -> (i32, i32) {
        match self {
            Gravity::Forget | Gravity::Center | Gravity::Static => (0, 0),
            Gravity::NorthWest => (-1, -1),
            Gravity::North => (0, -1),
            Gravity::NorthEast => (1, -1),
            Gravity::West => (-1, 0),
            Gravity::East => (1, 0),
            Gravity::SouthWest => (-1, 1),
            Gravity::South => (0, 1),
            Gravity::SouthEast => (1, 1),
        }
    }
}

/// Size hints (XSizeHints equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeHints {
    pub flags: SizeHintsFlags,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub min_aspect: (i32, i32),
    pub max_aspect: (i32, i32),
    pub base_width: i32,
    pub base_height: i32,
    pub win_gravity: Gravity,
}

/// Word count of the current XSizeHints layout
pub const SIZE_HINTS_WORDS: usize = 18;
/// Word count of the pre-ICCCM layout (no base size, no gravity)
pub const OLD_SIZE_HINTS_WORDS: usize = 15;

impl SizeHints {
    /// Decode WM_NORMAL_HINTS words
    ///
    /// Returns the hints and whether the property used the pre-ICCCM
    /// layout. Anything shorter than that layout is rejected.
    pub fn from_values(values: &[u32]) -> Option<(Self, bool)> {
        if values.len() < OLD_SIZE_HINTS_WORDS {
            warn!("WM_NORMAL_HINTS too short ({} words)", values.len());
            return None;
        }
        let v = |i: usize| values[i] as i32;
        let pre_icccm = values.len() < SIZE_HINTS_WORDS;

        let mut hints = SizeHints {
            flags: SizeHintsFlags::from_bits_truncate(values[0]),
            x: v(1),
            y: v(2),
            width: v(3),
            height: v(4),
            min_width: v(5),
            min_height: v(6),
            max_width: v(7),
            max_height: v(8),
            width_inc: v(9),
            height_inc: v(10),
            min_aspect: (v(11), v(12)),
            max_aspect: (v(13), v(14)),
            ..Default::default()
        };

        if pre_icccm {
            hints.flags.remove(SizeHintsFlags::P_BASE_SIZE | SizeHintsFlags::P_WIN_GRAVITY);
        } else {
            hints.base_width = v(15);
            hints.base_height = v(16);
            match Gravity::from_u32(values[17]) {
                Some(gravity) => hints.win_gravity = gravity,
                None => {
                    warn!("Bad win_gravity {} in WM_NORMAL_HINTS", values[17]);
                    hints.flags.remove(SizeHintsFlags::P_WIN_GRAVITY);
                }
            }
        }

        Some((hints, pre_icccm))
    }

    pub fn has(&self, flag: SizeHintsFlags) -> bool {
        self.flags.contains(flag)
    }

    /// True when the client cannot be resized at all
    pub fn is_fixed_size(&self) -> bool {
        self.min_width == self.max_width && self.min_height == self.max_height
    }
}

/// Inputs to [`normalize_size_hints`] besides the raw hints
#[derive(Debug, Clone, Copy)]
pub struct NormalHintsContext {
    /// Current window geometry from GetGeometry
    pub attributes: Geometry,
    pub screen_width: u32,
    pub screen_height: u32,
    /// Caller wants the client-requested initial geometry
    pub geometry: bool,
    /// Session restore in progress
    pub startup: bool,
    pub pre_icccm: bool,
}

/// Fill in defaults and fix inconsistent size hints
///
/// Returns the sanitized hints and the geometry the window should get.
pub fn normalize_size_hints(raw: Option<SizeHints>, ctx: &NormalHintsContext) -> (SizeHints, Geometry) {
    let mut hints = raw.unwrap_or_default();
    let mut geometry = ctx.attributes;

    if !hints.has(SizeHintsFlags::P_WIN_GRAVITY) {
        hints.win_gravity = Gravity::NorthWest;
    }
    if !hints.has(SizeHintsFlags::P_MIN_SIZE) {
        hints.min_width = MIN_WINDOW_SIZE;
        hints.min_height = MIN_WINDOW_SIZE;
    }
    if !hints.has(SizeHintsFlags::P_BASE_SIZE) {
        hints.base_width = 0;
        hints.base_height = 0;
    }
    if !hints.has(SizeHintsFlags::P_MAX_SIZE) {
        hints.max_width = ctx.screen_width as i32 * 2;
        hints.max_height = ctx.screen_height as i32 * 2;
    }

    if hints.min_width <= 0 {
        hints.min_width = MIN_WINDOW_SIZE;
    }
    if hints.min_height <= 0 {
        hints.min_height = MIN_WINDOW_SIZE;
    }
    if hints.max_width < hints.min_width {
        hints.max_width = hints.min_width;
    }
    if hints.max_height < hints.min_height {
        hints.max_height = hints.min_height;
    }

    if !hints.has(SizeHintsFlags::P_RESIZE_INC) {
        hints.width_inc = 1;
        hints.height_inc = 1;
    } else {
        hints.width_inc = hints.width_inc.max(1);
        hints.height_inc = hints.height_inc.max(1);
    }

    if hints.has(SizeHintsFlags::P_ASPECT) {
        hints.min_aspect = (hints.min_aspect.0.max(1), hints.min_aspect.1.max(1));
        hints.max_aspect = (hints.max_aspect.0.max(1), hints.max_aspect.1.max(1));
    }

    if hints.min_height > hints.max_height {
        hints.min_height = hints.max_height;
    }
    if hints.min_width > hints.max_width {
        hints.min_width = hints.max_width;
    }

    if ctx.pre_icccm && !ctx.startup && ctx.geometry {
        if hints.flags.intersects(SizeHintsFlags::US_POSITION | SizeHintsFlags::P_POSITION) {
            geometry.x = hints.x;
            geometry.y = hints.y;
        }
        if hints.flags.intersects(SizeHintsFlags::US_SIZE | SizeHintsFlags::P_SIZE) {
            geometry.width = hints.width.max(1) as u32;
            geometry.height = hints.height.max(1) as u32;
        }
    }

    (hints, geometry)
}

/// WM hints (XWMHints equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    pub flags: WmHintsFlags,
    pub input: bool,
    pub initial_state: u32,
    pub icon_pixmap: Xid,
    pub icon_window: Xid,
    pub icon_x: i32,
    pub icon_y: i32,
    pub icon_mask: Xid,
    pub window_group: Xid,
}

impl WmHints {
    /// Decode WM_HINTS words (9-word XWMHints)
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 9 {
            warn!("WM_HINTS too short ({} words)", values.len());
            return None;
        }
        Some(WmHints {
            flags: WmHintsFlags::from_bits_truncate(values[0]),
            input: values[1] != 0,
            initial_state: values[2],
            icon_pixmap: values[3],
            icon_window: values[4],
            icon_x: values[5] as i32,
            icon_y: values[6] as i32,
            icon_mask: values[7],
            window_group: values[8],
        })
    }

    /// Group leader, if the hint names one
    pub fn group(&self) -> Option<Xid> {
        (self.flags.contains(WmHintsFlags::WINDOW_GROUP) && self.window_group != NONE)
            .then_some(self.window_group)
    }

    pub fn is_urgent(&self) -> bool {
        self.flags.contains(WmHintsFlags::URGENCY)
    }

    /// ICCCM: clients that omit the input hint accept focus
    pub fn accepts_input(&self) -> bool {
        !self.flags.contains(WmHintsFlags::INPUT) || self.input
    }

    pub fn has_icon(&self) -> bool {
        self.flags
            .intersects(WmHintsFlags::ICON_PIXMAP | WmHintsFlags::ICON_WINDOW)
    }

    pub fn starts_iconic(&self) -> bool {
        self.flags.contains(WmHintsFlags::STATE) && self.initial_state == WmState::Iconic as u32
    }
}

/// ICCCM WM_STATE values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum WmState {
    #[default]
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

impl WmState {
    /// WM_STATE property contents: state and icon window
    pub fn encode(self, icon_window: Xid) -> [u32; 2] {
        [self as u32, icon_window]
    }

    pub fn decode(values: &[u32]) -> Option<Self> {
        match values.first()? {
            0 => Some(WmState::Withdrawn),
            1 => Some(WmState::Normal),
            3 => Some(WmState::Iconic),
            _ => None,
        }
    }
}

/// Text property to string (STRING or UTF8_STRING, NUL terminated or not)
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text = String::from_utf8_lossy(&bytes[..end]).into_owned();
    (!text.is_empty()).then_some(text)
}

/// WM_CLASS to (instance, class)
pub fn decode_class(bytes: &[u8]) -> Option<(String, String)> {
    let mut parts = bytes.split(|&b| b == 0).map(|part| String::from_utf8_lossy(part).into_owned());
    let instance = parts.next()?;
    let class = parts.next().unwrap_or_default();
    if instance.is_empty() && class.is_empty() {
        return None;
    }
    Some((instance, class))
}

/// WM_COMMAND argv (NUL separated)
pub fn decode_command(bytes: &[u8]) -> Option<Vec<String>> {
    let argv: Vec<String> = bytes
        .split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect();
    (!argv.is_empty()).then_some(argv)
}

/// Space reserved at the screen edges by docks and panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Strut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Strut {
    /// `_NET_WM_STRUT` or the first four words of `_NET_WM_STRUT_PARTIAL`
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 4 {
            return None;
        }
        Some(Strut {
            left: values[0],
            right: values[1],
            top: values[2],
            bottom: values[3],
        })
    }

    pub fn is_empty(&self) -> bool {
        self.left == 0 && self.right == 0 && self.top == 0 && self.bottom == 0
    }
}

bitflags! {
    /// GNUstep window style mask (NSWindow styleMask)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GnustepStyle: u32 {
        const TITLED = 1 << 0;
        const CLOSABLE = 1 << 1;
        const MINIATURIZABLE = 1 << 2;
        const RESIZABLE = 1 << 3;
    }
}

/// `_GNUSTEP_WM_ATTR` contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GnustepAttributes {
    pub style: Option<GnustepStyle>,
    pub level: Option<i32>,
    pub extra_flags: u32,
}

const GS_WINDOW_STYLE_ATTR: u32 = 1 << 0;
const GS_WINDOW_LEVEL_ATTR: u32 = 1 << 1;
const GS_EXTRA_FLAGS_ATTR: u32 = 1 << 7;

impl GnustepAttributes {
    pub fn from_values(values: &[u32]) -> Option<Self> {
        if values.len() < 9 {
            warn!("_GNUSTEP_WM_ATTR too short ({} words)", values.len());
            return None;
        }
        let flags = values[0];
        Some(GnustepAttributes {
            style: (flags & GS_WINDOW_STYLE_ATTR != 0).then(|| GnustepStyle::from_bits_truncate(values[1])),
            level: (flags & GS_WINDOW_LEVEL_ATTR != 0).then_some(values[2] as i32),
            extra_flags: if flags & GS_EXTRA_FLAGS_ATTR != 0 { values[8] } else { 0 },
        })
    }
}

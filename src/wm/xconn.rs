//! X Connection Seam
//!
//! Every request the window manager core sends to the X server goes
//! through [`XConn`]. The real implementation lives in [`crate::wm::x11`];
//! tests drive the core with a recording fake.

use anyhow::Result;
use bitflags::bitflags;

use crate::shared::Geometry;

/// X resource id (window, pixmap, atom)
pub type Xid = u32;

/// Interned atom
pub type Atom = u32;

/// The X "None" resource
pub const NONE: Xid = 0;

/// AnyPropertyType for property reads
pub const ANY_PROPERTY_TYPE: Atom = 0;

/// Predefined atoms (xproto AtomEnum values)
pub mod predefined {
    use super::Atom;

    pub const ATOM: Atom = 4;
    pub const CARDINAL: Atom = 6;
    pub const STRING: Atom = 31;
    pub const WINDOW: Atom = 33;
    pub const WM_COMMAND: Atom = 34;
    pub const WM_HINTS: Atom = 35;
    pub const WM_ICON_NAME: Atom = 37;
    pub const WM_NAME: Atom = 39;
    pub const WM_NORMAL_HINTS: Atom = 40;
    pub const WM_SIZE_HINTS: Atom = 41;
    pub const WM_CLASS: Atom = 67;
    pub const WM_TRANSIENT_FOR: Atom = 68;
}

bitflags! {
    /// Which fields of a configure request are meaningful (CW* value mask)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigMask: u16 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const WIDTH = 1 << 2;
        const HEIGHT = 1 << 3;
        const BORDER_WIDTH = 1 << 4;
        const SIBLING = 1 << 5;
        const STACK_MODE = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMode {
    Above,
    Below,
    TopIf,
    BottomIf,
    Opposite,
}

/// Changes for a ConfigureWindow request; `None` fields are left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_width: Option<u32>,
    pub sibling: Option<Xid>,
    pub stack_mode: Option<StackMode>,
}

impl WindowChanges {
    pub fn geometry(g: Geometry) -> Self {
        Self {
            x: Some(g.x),
            y: Some(g.y),
            width: Some(g.width),
            height: Some(g.height),
            ..Default::default()
        }
    }
}

/// A ConfigureRequest as sent by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigureRequest {
    pub window: Xid,
    pub mask: ConfigMask,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
    pub sibling: Xid,
    pub stack_mode: Option<StackMode>,
}

impl ConfigureRequest {
    /// The request as plain changes, honoring the value mask
    pub fn to_changes(&self) -> WindowChanges {
        let mask = self.mask;
        WindowChanges {
            x: mask.contains(ConfigMask::X).then_some(self.x),
            y: mask.contains(ConfigMask::Y).then_some(self.y),
            width: mask.contains(ConfigMask::WIDTH).then_some(self.width),
            height: mask.contains(ConfigMask::HEIGHT).then_some(self.height),
            border_width: mask.contains(ConfigMask::BORDER_WIDTH).then_some(self.border_width),
            sibling: mask.contains(ConfigMask::SIBLING).then_some(self.sibling),
            stack_mode: if mask.contains(ConfigMask::STACK_MODE) {
                self.stack_mode
            } else {
                None
            },
        }
    }
}

/// Subset of GetWindowAttributes + GetGeometry the core needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub geometry: Geometry,
    pub border_width: u32,
    pub override_redirect: bool,
    pub viewable: bool,
}

/// Keyboard event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub window: Xid,
    pub root: Xid,
    pub keycode: u8,
    pub state: u16,
    pub time: u32,
}

/// Pointer event (button press/release, motion, crossing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerEvent {
    pub window: Xid,
    pub root: Xid,
    pub root_x: i32,
    pub root_y: i32,
    pub event_x: i32,
    pub event_y: i32,
    pub state: u16,
    pub detail: u8,
    pub time: u32,
}

/// X events the core reacts to, already decoded from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEvent {
    MapRequest { window: Xid },
    MapNotify { window: Xid },
    UnmapNotify { window: Xid, event: Xid },
    DestroyNotify { window: Xid },
    ConfigureRequest(ConfigureRequest),
    PropertyNotify { window: Xid, atom: Atom, deleted: bool },
    ClientMessage { window: Xid, message_type: Atom, format: u8, data: [u32; 5] },
    KeyPress(KeyEvent),
    KeyRelease(KeyEvent),
    ButtonPress(PointerEvent),
    ButtonRelease(PointerEvent),
    MotionNotify(PointerEvent),
    EnterNotify(PointerEvent),
    LeaveNotify(PointerEvent),
    FocusIn { window: Xid },
    Expose { window: Xid },
}

impl XEvent {
    /// The window the event is reported on
    pub fn window(&self) -> Xid {
        match self {
            XEvent::MapRequest { window }
            | XEvent::MapNotify { window }
            | XEvent::UnmapNotify { window, .. }
            | XEvent::DestroyNotify { window }
            | XEvent::PropertyNotify { window, .. }
            | XEvent::ClientMessage { window, .. }
            | XEvent::FocusIn { window }
            | XEvent::Expose { window } => *window,
            XEvent::ConfigureRequest(req) => req.window,
            XEvent::KeyPress(key) | XEvent::KeyRelease(key) => key.window,
            XEvent::ButtonPress(ptr)
            | XEvent::ButtonRelease(ptr)
            | XEvent::MotionNotify(ptr)
            | XEvent::EnterNotify(ptr)
            | XEvent::LeaveNotify(ptr) => ptr.window,
        }
    }
}

/// Parameters for windows the WM creates itself (frames, icons, overlays)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSpec {
    pub geometry: Geometry,
    pub border_width: u32,
    pub background: u32,
    pub border_color: u32,
    /// Overlays (switch panel, workspace name) bypass management
    pub override_redirect: bool,
}

/// Requests the core needs from the X server
///
/// Methods that target client windows must tolerate the window being
/// gone already; implementations report that as an error and callers log
/// it instead of failing the operation.
pub trait XConn {
    /// Root window of the managed screen
    fn root(&self) -> Xid;

    /// Size of the managed screen in pixels
    fn screen_size(&self) -> (u32, u32);

    fn intern_atom(&self, name: &str) -> Result<Atom>;

    fn window_exists(&self, window: Xid) -> bool;

    fn get_window_attributes(&self, window: Xid) -> Result<Option<WindowAttributes>>;

    /// 32-bit property contents, or `None` if unset or of a different format
    fn get_property32(&self, window: Xid, property: Atom, ty: Atom) -> Result<Option<Vec<u32>>>;

    /// 8-bit property contents, or `None` if unset or of a different format
    fn get_property8(&self, window: Xid, property: Atom, ty: Atom) -> Result<Option<Vec<u8>>>;

    fn change_property32(&self, window: Xid, property: Atom, ty: Atom, data: &[u32]) -> Result<()>;

    fn change_property8(&self, window: Xid, property: Atom, ty: Atom, data: &[u8]) -> Result<()>;

    fn delete_property(&self, window: Xid, property: Atom) -> Result<()>;

    /// Create a child of the root window
    fn create_surface(&self, spec: &SurfaceSpec) -> Result<Xid>;

    fn destroy_window(&self, window: Xid) -> Result<()>;

    fn reparent(&self, window: Xid, parent: Xid, x: i32, y: i32) -> Result<()>;

    /// Select the events the WM needs on a client window
    fn watch_client(&self, window: Xid) -> Result<()>;

    fn map(&self, window: Xid) -> Result<()>;

    fn unmap(&self, window: Xid) -> Result<()>;

    fn configure(&self, window: Xid, changes: &WindowChanges) -> Result<()>;

    /// Restack `windows`, topmost first (XRestackWindows)
    fn restack(&self, windows: &[Xid]) -> Result<()>;

    /// Children of the root, bottom to top
    fn stacking_order(&self) -> Result<Vec<Xid>>;

    /// Focus a window, or the pointer root when `None`
    fn set_input_focus(&self, window: Option<Xid>, time: u32) -> Result<()>;

    /// Top-level child of the root under the pointer, with root coordinates
    fn query_pointer(&self) -> Result<Option<(Xid, i32, i32)>>;

    fn grab_keyboard(&self) -> Result<bool>;

    fn ungrab_keyboard(&self) -> Result<()>;

    fn grab_key(&self, keycode: u8, modifiers: u16) -> Result<()>;

    fn keysym_to_keycode(&self, keysym: u32) -> Option<u8>;

    fn send_client_message(&self, window: Xid, message_type: Atom, data: [u32; 5]) -> Result<()>;

    /// Synthetic ConfigureNotify telling a client where it ended up (ICCCM 4.1.5)
    fn send_configure_notify(&self, window: Xid, geometry: Geometry, border_width: u32) -> Result<()>;

    fn kill_client(&self, window: Xid) -> Result<()>;

    fn set_border_width(&self, window: Xid, width: u32) -> Result<()>;

    fn set_background(&self, window: Xid, color: u32) -> Result<()>;

    /// Clear a surface and draw one line of text at (x, baseline y)
    fn draw_text(&self, window: Xid, x: i32, y: i32, text: &str, fg: u32, bg: u32) -> Result<()>;

    /// Fill a rectangle of a surface
    fn fill_rect(&self, window: Xid, rect: Geometry, color: u32) -> Result<()>;

    /// Width and height in pixels of `text` in the WM font
    fn text_extents(&self, text: &str) -> (u32, u32);

    /// Events already received but not yet handled
    fn pending_events(&self) -> Result<Vec<XEvent>>;

    fn flush(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_changes_honors_mask() {
        let req = ConfigureRequest {
            window: 7,
            mask: ConfigMask::X | ConfigMask::HEIGHT | ConfigMask::STACK_MODE,
            x: 10,
            y: 20,
            width: 300,
            height: 200,
            border_width: 1,
            sibling: 0,
            stack_mode: Some(StackMode::Above),
        };
        let changes = req.to_changes();
        assert_eq!(changes.x, Some(10));
        assert_eq!(changes.y, None);
        assert_eq!(changes.width, None);
        assert_eq!(changes.height, Some(200));
        assert_eq!(changes.border_width, None);
        assert_eq!(changes.stack_mode, Some(StackMode::Above));
    }

    #[test]
    fn test_event_window() {
        let ev = XEvent::KeyPress(KeyEvent {
            window: 42,
            ..Default::default()
        });
        assert_eq!(ev.window(), 42);
    }
}

//! Window Record
//!
//! The in-process model of one managed client window. Records are owned
//! by the screen's window table and addressed by client window id, which
//! stays unique for as long as the window is managed.

use crate::shared::Geometry;
use crate::wm::client_flags::{AttributeSet, Attributes, Protocols, StackLevel, WindowState, resolve};
use crate::wm::hints::{SizeHints, Strut, WmHints, WmState};
use crate::wm::icons::Icon;
use crate::wm::xconn::{NONE, Xid};

/// Handle of a managed window (its client window id)
pub type WindowId = Xid;

/// Decoration sizes around the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameExtents {
    /// Titlebar height (0 without titlebar)
    pub top: u32,
    /// Resizebar height (0 without resizebar)
    pub bottom: u32,
    pub border: u32,
}

/// Decoration preferences the extents are derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecorationSizes {
    pub titlebar_height: u32,
    pub resizebar_height: u32,
    pub border_width: u32,
}

/// One managed client window
#[derive(Debug, Clone)]
pub struct WindowRecord {
    pub client: Xid,
    /// WM-created parent of the client
    pub frame: Xid,
    /// Frame position on the root
    pub frame_x: i32,
    pub frame_y: i32,
    /// Client size (not counting decorations)
    pub width: u32,
    pub height: u32,
    /// Geometry to go back to after maximize/fullscreen
    pub old_geometry: Geometry,
    /// Geometry and level from before fullscreen
    pub before_fullscreen: Option<(Geometry, StackLevel)>,
    pub old_border_width: u32,
    pub extents: FrameExtents,
    pub workspace: usize,
    pub level: StackLevel,

    pub normal_hints: SizeHints,
    pub wm_hints: Option<WmHints>,
    pub protocols: Protocols,
    pub wm_instance: Option<String>,
    pub wm_class: Option<String>,
    pub title: Option<String>,
    pub icon_title: Option<String>,
    /// WM_COMMAND argv, used to relaunch
    pub command: Option<Vec<String>>,
    pub client_flags: AttributeSet,
    pub user_flags: AttributeSet,
    pub state: WindowState,
    /// ICCCM state last written to WM_STATE
    pub wm_state: WmState,

    pub transient_for: Option<Xid>,
    pub client_leader: Option<Xid>,
    /// Leader window of the owning application
    pub main_window: Option<Xid>,
    pub group_id: Option<Xid>,
    /// Synthetic leader shared with other windows of the same class
    pub fake_group: Option<Xid>,

    /// Miniwindow, present only while miniaturized
    pub icon: Option<Icon>,
    pub colormap_windows: Vec<Xid>,
    pub strut: Option<Strut>,
}

impl WindowRecord {
    pub fn new(client: Xid, geometry: Geometry, workspace: usize) -> Self {
        Self {
            client,
            frame: NONE,
            frame_x: geometry.x,
            frame_y: geometry.y,
            width: geometry.width,
            height: geometry.height,
            old_geometry: geometry,
            before_fullscreen: None,
            old_border_width: 0,
            extents: FrameExtents::default(),
            workspace,
            level: StackLevel::Normal,
            normal_hints: SizeHints::default(),
            wm_hints: None,
            protocols: Protocols::empty(),
            wm_instance: None,
            wm_class: None,
            title: None,
            icon_title: None,
            command: None,
            client_flags: AttributeSet::default(),
            user_flags: AttributeSet::default(),
            state: WindowState::default(),
            wm_state: WmState::Withdrawn,
            transient_for: None,
            client_leader: None,
            main_window: None,
            group_id: None,
            fake_group: None,
            icon: None,
            colormap_windows: Vec::new(),
            strut: None,
        }
    }

    /// Resolved attribute (user setting over client hint)
    pub fn wflag(&self, attr: Attributes) -> bool {
        resolve(&self.user_flags, &self.client_flags, attr)
    }

    pub fn is_omnipresent(&self) -> bool {
        self.state.omnipresent || self.wflag(Attributes::OMNIPRESENT)
    }

    pub fn is_focusable(&self) -> bool {
        !self.wflag(Attributes::NO_FOCUSABLE)
    }

    /// Mapped, or shaded (a shaded frame stays on screen)
    pub fn is_visible(&self) -> bool {
        self.state.mapped || self.state.shaded
    }

    pub fn has_titlebar(&self) -> bool {
        !self.state.fullscreen && !self.wflag(Attributes::NO_TITLEBAR)
    }

    pub fn has_resizebar(&self) -> bool {
        !self.state.fullscreen && !self.wflag(Attributes::NO_RESIZEBAR)
    }

    pub fn has_border(&self) -> bool {
        !self.state.fullscreen && !self.wflag(Attributes::NO_BORDER)
    }

    pub fn is_movable(&self) -> bool {
        !self.state.fullscreen && !self.wflag(Attributes::NO_MOVABLE)
    }

    pub fn is_resizable(&self) -> bool {
        !self.state.fullscreen && !self.wflag(Attributes::NO_RESIZABLE) && !self.normal_hints.is_fixed_size()
    }

    pub fn is_gnustep(&self) -> bool {
        self.state.is_gnustep || self.wm_class.as_deref() == Some("GNUstep")
    }

    /// Recompute decoration extents from the current predicates
    pub fn update_extents(&mut self, sizes: &DecorationSizes) {
        self.extents = FrameExtents {
            top: if self.has_titlebar() { sizes.titlebar_height } else { 0 },
            bottom: if self.has_resizebar() && self.is_resizable() {
                sizes.resizebar_height
            } else {
                0
            },
            border: if self.has_border() { sizes.border_width } else { 0 },
        };
    }

    /// Frame position with client size
    pub fn client_geometry(&self) -> Geometry {
        Geometry::new(self.frame_x, self.frame_y, self.width, self.height)
    }

    /// Frame rectangle as it is on screen
    pub fn frame_geometry(&self) -> Geometry {
        let height = if self.state.shaded {
            self.extents.top.max(1)
        } else {
            self.height + self.extents.top + self.extents.bottom
        };
        Geometry::new(self.frame_x, self.frame_y, self.width, height)
    }

    /// Title to show, falling back to the class names
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.wm_instance.as_deref())
            .or(self.wm_class.as_deref())
            .unwrap_or("")
    }

    /// Same application class, for group cycling
    ///
    /// GNUstep apps all share the class "GNUstep", so their instance names
    /// must match as well.
    pub fn same_class(&self, other: &WindowRecord) -> bool {
        let (Some(mine), Some(theirs)) = (self.wm_class.as_deref(), other.wm_class.as_deref()) else {
            return false;
        };
        if other.is_gnustep() && self.wm_instance != other.wm_instance {
            return false;
        }
        mine == theirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZES: DecorationSizes = DecorationSizes {
        titlebar_height: 22,
        resizebar_height: 8,
        border_width: 1,
    };

    fn record() -> WindowRecord {
        let mut win = WindowRecord::new(0x200001, Geometry::new(0, 0, 400, 300), 0);
        win.normal_hints.max_width = 4000;
        win.normal_hints.max_height = 4000;
        win
    }

    #[test]
    fn test_fullscreen_overrides_all_decorations() {
        let mut win = record();
        win.user_flags.set(Attributes::NO_TITLEBAR, false);
        win.user_flags.set(Attributes::NO_BORDER, false);
        win.state.fullscreen = true;
        assert!(!win.has_titlebar());
        assert!(!win.has_resizebar());
        assert!(!win.has_border());
        assert!(!win.is_movable());
        assert!(!win.is_resizable());

        win.update_extents(&SIZES);
        assert_eq!(win.extents, FrameExtents::default());
    }

    #[test]
    fn test_extents_follow_flags() {
        let mut win = record();
        win.update_extents(&SIZES);
        assert_eq!(win.extents, FrameExtents { top: 22, bottom: 8, border: 1 });
        assert_eq!(win.frame_geometry().height, 330);

        win.client_flags.set(Attributes::NO_RESIZEBAR, true);
        win.update_extents(&SIZES);
        assert_eq!(win.extents.bottom, 0);
    }

    #[test]
    fn test_shaded_frame_is_titlebar_only() {
        let mut win = record();
        win.update_extents(&SIZES);
        win.state.shaded = true;
        assert_eq!(win.frame_geometry().height, 22);
        assert_eq!(win.client_geometry().height, 300);
    }

    #[test]
    fn test_omnipresent_from_state_or_attribute() {
        let mut win = record();
        assert!(!win.is_omnipresent());
        win.client_flags.set(Attributes::OMNIPRESENT, true);
        assert!(win.is_omnipresent());
        win.client_flags.set(Attributes::OMNIPRESENT, false);
        win.state.omnipresent = true;
        assert!(win.is_omnipresent());
    }

    #[test]
    fn test_same_class_for_gnustep_needs_instance() {
        let mut a = record();
        a.wm_class = Some("GNUstep".into());
        a.wm_instance = Some("TextEdit".into());
        let mut b = a.clone();
        b.wm_instance = Some("Terminal".into());
        assert!(!a.same_class(&b));
        b.wm_instance = Some("TextEdit".into());
        assert!(a.same_class(&b));

        let mut c = record();
        c.wm_class = Some("XTerm".into());
        assert!(!a.same_class(&c));
        c.wm_class = None;
        assert!(!c.same_class(&a));
    }
}

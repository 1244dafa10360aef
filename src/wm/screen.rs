//! Screen Context
//!
//! All per-screen window manager state in one value. The main loop owns
//! the `Screen` and every core operation takes it by `&mut`, so there is
//! exactly one writer for the window table, the focus order and the
//! workspace list.

use anyhow::Result;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::application::ApplicationRegistry;
use crate::wm::atoms::Atoms;
use crate::wm::client::{PropertyHandler, property_handlers};
use crate::wm::cycle::CycleSession;
use crate::wm::error::{log_and_ignore, log_warn};
use crate::wm::focus::FocusList;
use crate::wm::hints::{Strut, WmState};
use crate::wm::keyboard::KeyboardManager;
use crate::wm::notify::NotificationCenter;
use crate::wm::process::ProcessRegistry;
use crate::wm::stacking::StackingManager;
use crate::wm::window::{DecorationSizes, WindowRecord};
use crate::wm::workspace::{NameOverlay, WorkspaceManager};
use crate::wm::xconn::{Atom, XConn, Xid, predefined};

/// Re-entrancy and mode guards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenFlags {
    /// Initial setup or session restore in progress; switches are ignored
    pub startup: bool,
    /// Focus and crossing events are side effects of our own mapping
    pub ignore_focus_events: bool,
    /// A cycling session owns the keyboard
    pub doing_alt_tab: bool,
    /// Workspace switches requested from outside are ignored
    pub ignore_workspace_change: bool,
    /// A client asked for the configuration to be reloaded
    pub reconfigure: bool,
}

/// Per-screen window manager state
pub struct Screen {
    pub conn: Box<dyn XConn>,
    pub atoms: Atoms,
    pub root: Xid,
    pub width: u32,
    pub height: u32,
    pub config: Config,

    /// Managed windows by client id
    pub windows: HashMap<Xid, WindowRecord>,
    /// Frame and miniwindow ids back to their client
    pub frames: HashMap<Xid, Xid>,
    pub focus: FocusList,
    /// Window holding input focus (None = root)
    pub focused: Option<Xid>,

    pub workspaces: WorkspaceManager,
    pub stacking: StackingManager,
    pub apps: ApplicationRegistry,
    pub processes: ProcessRegistry,
    pub notifications: NotificationCenter,
    pub keyboard: KeyboardManager,

    /// Screen minus struts of docks and panels
    pub usable_area: Geometry,
    pub flags: ScreenFlags,
    /// Active cycling session; it sees every event first
    pub cycle: Option<CycleSession>,
    pub name_overlay: NameOverlay,
    /// Pager snapshot: window to workspace
    pub workspace_map: HashMap<Xid, usize>,

    pub(crate) property_handlers: HashMap<Atom, PropertyHandler>,
}

impl Screen {
    /// Set up the screen: atoms, root properties, initial workspaces
    pub fn new(conn: Box<dyn XConn>, config: Config) -> Result<Self> {
        let atoms = Atoms::new(conn.as_ref())?;
        let root = conn.root();
        let (width, height) = conn.screen_size();
        let keyboard = KeyboardManager::new(&config.keybindings);

        let mut screen = Screen {
            property_handlers: property_handlers(&atoms),
            conn,
            atoms,
            root,
            width,
            height,
            config,
            windows: HashMap::new(),
            frames: HashMap::new(),
            focus: FocusList::new(),
            focused: None,
            workspaces: WorkspaceManager::new(),
            stacking: StackingManager::new(),
            apps: ApplicationRegistry::new(),
            processes: ProcessRegistry::new(),
            notifications: NotificationCenter::new(),
            keyboard,
            usable_area: Geometry::new(0, 0, width, height),
            flags: ScreenFlags::default(),
            cycle: None,
            name_overlay: NameOverlay::default(),
            workspace_map: HashMap::new(),
        };

        screen.init_root_properties();

        screen.flags.startup = true;
        let count = screen.config.workspaces.initial_count.max(1);
        screen.make_workspaces(count);
        screen.flags.startup = false;

        screen.update_usable_area();
        screen.update_desktop_properties();

        info!("Screen {}x{} ready with {} workspaces", width, height, screen.workspaces.count());
        Ok(screen)
    }

    /// Restore the session, take over existing windows, grab keys
    pub fn start(&mut self) -> Result<()> {
        self.flags.startup = true;

        self.restore_workspace_state();
        self.grab_keys();
        self.start_helper();

        let existing = self.conn.stacking_order()?;
        for window in existing {
            if self.window_for(window).is_some() || !self.should_adopt(window) {
                continue;
            }
            if let Err(e) = self.manage_window(window) {
                debug!("Not adopting {:#x}: {:#}", window, e);
            }
        }

        self.flags.startup = false;

        let pointer = log_warn(self.conn.query_pointer(), "query pointer")
            .flatten()
            .and_then(|(window, _, _)| self.window_for(window));
        let target = pointer.or_else(|| self.focus.head());
        self.set_focus_to(target);
        self.commit_stacking();
        self.update_desktop_properties();
        log_and_ignore(self.conn.flush(), "flush");
        Ok(())
    }

    /// Top-level windows that were mapped or iconic before we started
    fn should_adopt(&self, window: Xid) -> bool {
        let Some(attrs) = log_warn(self.conn.get_window_attributes(window), "window attributes").flatten() else {
            return false;
        };
        if attrs.override_redirect {
            return false;
        }
        if attrs.viewable {
            return true;
        }
        let state = log_warn(
            self.conn.get_property32(window, self.atoms.wm_state, self.atoms.wm_state),
            "read WM_STATE",
        )
        .flatten();
        state.as_deref().and_then(WmState::decode) == Some(WmState::Iconic)
    }

    /// Give every client back to the root and save the session
    pub fn shutdown(&mut self) {
        info!("Releasing {} windows", self.windows.len());
        self.cancel_cycle();
        self.save_workspace_state();
        self.stop_helper();
        for window in self.focus.to_vec() {
            self.unmanage_window(window, true);
        }
        log_and_ignore(self.conn.set_input_focus(None, 0), "focus root");
        log_and_ignore(self.conn.flush(), "flush");
    }

    /// Swap in a reloaded configuration
    ///
    /// Key bindings are regrabbed and every frame is refitted to the new
    /// decoration sizes. The workspace count is left alone.
    pub fn apply_config(&mut self, config: Config) {
        info!("Applying reloaded configuration");
        self.keyboard = KeyboardManager::new(&config.keybindings);
        self.config = config;
        // TODO: ungrab chords that are no longer configured
        self.grab_keys();
        let windows: Vec<Xid> = self.windows.keys().copied().collect();
        for window in windows {
            self.update_decorations(window);
            self.paint_frame(window);
        }
        self.update_usable_area();
    }

    /// Expire timed decorations (workspace name, urgent bounce)
    pub fn tick(&mut self, now: Instant) {
        self.expire_workspace_name(now);
        self.apps.expire_bounces(now, &self.windows);
    }

    /// Managed window for a client, frame or miniwindow id
    pub fn window_for(&self, xid: Xid) -> Option<Xid> {
        if self.windows.contains_key(&xid) {
            Some(xid)
        } else {
            self.frames.get(&xid).copied()
        }
    }

    pub fn current_workspace(&self) -> usize {
        self.workspaces.current()
    }

    pub fn decoration_sizes(&self) -> DecorationSizes {
        let deco = &self.config.decorations;
        DecorationSizes {
            titlebar_height: deco.titlebar_height,
            resizebar_height: deco.resizebar_height,
            border_width: deco.border_width,
        }
    }

    /// Handle whatever the X server already queued for us
    pub fn process_pending_events(&mut self) {
        let events = log_warn(self.conn.pending_events(), "read pending events").unwrap_or_default();
        for event in events {
            self.handle_event(event);
        }
    }

    /// Recompute the area not covered by struts and publish it
    pub fn update_usable_area(&mut self) {
        let reserved = self
            .windows
            .values()
            .filter_map(|win| win.strut)
            .fold(Strut::default(), |acc, strut| Strut {
                left: acc.left.max(strut.left),
                right: acc.right.max(strut.right),
                top: acc.top.max(strut.top),
                bottom: acc.bottom.max(strut.bottom),
            });

        let width = self.width.saturating_sub(reserved.left + reserved.right);
        let height = self.height.saturating_sub(reserved.top + reserved.bottom);
        self.usable_area = Geometry::new(reserved.left as i32, reserved.top as i32, width, height);

        let area = self.usable_area;
        let workarea: Vec<u32> = (0..self.workspaces.count())
            .flat_map(|_| [area.x as u32, area.y as u32, area.width, area.height])
            .collect();
        log_and_ignore(
            self.conn
                .change_property32(self.root, self.atoms.net_workarea, predefined::CARDINAL, &workarea),
            "set _NET_WORKAREA",
        );
    }
}

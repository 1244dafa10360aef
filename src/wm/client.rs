//! Client Synchronization
//!
//! Keeps window records and the client's X properties in step: property
//! notifications update the record through a table of per-atom handlers,
//! configure requests are applied to the frame, and ICCCM messages go
//! back to the client.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::shared::Geometry;
use crate::wm::atoms::Atoms;
use crate::wm::client_flags::{Attributes, MaxFlags, Protocols, StackLevel};
use crate::wm::error::{log_and_ignore, log_warn};
use crate::wm::hints::{
    GnustepAttributes, GnustepStyle, NormalHintsContext, SizeHints, WmHints, WmState, decode_command, decode_text,
    normalize_size_hints,
};
use crate::wm::screen::Screen;
use crate::wm::xconn::{ANY_PROPERTY_TYPE, Atom, ConfigMask, ConfigureRequest, NONE, WindowChanges, Xid, predefined};

/// Reacts to a change of one property on a managed window
pub type PropertyHandler = fn(&mut Screen, Xid);

/// Handlers for the ICCCM and WindowMaker atoms
///
/// Atoms missing from the table fall through to the EWMH layer.
pub fn property_handlers(atoms: &Atoms) -> HashMap<Atom, PropertyHandler> {
    let mut table: HashMap<Atom, PropertyHandler> = HashMap::new();
    table.insert(predefined::WM_NAME, on_name);
    table.insert(predefined::WM_ICON_NAME, on_icon_name);
    table.insert(predefined::WM_COMMAND, on_command);
    table.insert(predefined::WM_HINTS, on_wm_hints);
    table.insert(predefined::WM_NORMAL_HINTS, on_normal_hints);
    table.insert(predefined::WM_TRANSIENT_FOR, on_transient_for);
    table.insert(atoms.wm_protocols, on_protocols);
    table.insert(atoms.wm_colormap_windows, on_colormap_windows);
    table.insert(atoms.wmaker_menu, on_wmaker_menu);
    table.insert(atoms.gnustep_wm_attr, on_gnustep_attributes);
    table
}

/// How a WM_HINTS change moves the window between applications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupTransition {
    Unchanged,
    /// Leave the group for a different one
    SwitchGroup(Xid),
    /// Group hint dropped; fall back to WM_CLIENT_LEADER
    AdoptClientLeader,
    /// Group hint dropped and there is no client leader
    Ungrouped,
    /// First group hint, no application to leave
    JoinGroup(Xid),
    /// A fake group owns the window; leave it alone
    FakeGroup,
}

fn group_transition(
    old_group: Option<Xid>,
    new_group: Option<Xid>,
    current_group_id: Option<Xid>,
    has_client_leader: bool,
    fake_group: bool,
) -> GroupTransition {
    if fake_group {
        return GroupTransition::FakeGroup;
    }
    match (old_group, new_group) {
        (Some(_), Some(new)) if current_group_id != Some(new) => GroupTransition::SwitchGroup(new),
        (Some(_), None) if has_client_leader => GroupTransition::AdoptClientLeader,
        (Some(_), None) => GroupTransition::Ungrouped,
        (None, Some(new)) if has_client_leader => GroupTransition::SwitchGroup(new),
        (None, Some(new)) => GroupTransition::JoinGroup(new),
        _ => GroupTransition::Unchanged,
    }
}

impl Screen {
    /// Dispatch a PropertyNotify on a managed window
    pub fn check_property(&mut self, window: Xid, atom: Atom) {
        if !self.windows.contains_key(&window) {
            return;
        }
        match self.property_handlers.get(&atom).copied() {
            Some(handler) => handler(self, window),
            None => self.check_net_property(window, atom),
        }
    }

    // ------------------------------------------------------------------
    // Property readers
    // ------------------------------------------------------------------

    pub(crate) fn read_text(&self, window: Xid, atom: Atom) -> Option<String> {
        log_warn(self.conn.get_property8(window, atom, ANY_PROPERTY_TYPE), "read text property")
            .flatten()
            .and_then(|bytes| decode_text(&bytes))
    }

    pub(crate) fn read_wm_hints(&self, window: Xid) -> Option<WmHints> {
        log_warn(
            self.conn.get_property32(window, predefined::WM_HINTS, predefined::WM_HINTS),
            "read WM_HINTS",
        )
        .flatten()
        .and_then(|words| WmHints::from_values(&words))
    }

    pub(crate) fn read_protocols(&self, window: Xid) -> Protocols {
        let atoms = log_warn(
            self.conn.get_property32(window, self.atoms.wm_protocols, predefined::ATOM),
            "read WM_PROTOCOLS",
        )
        .flatten()
        .unwrap_or_default();
        atoms.iter().fold(Protocols::empty(), |acc, &atom| {
            acc | match atom {
                a if a == self.atoms.wm_delete_window => Protocols::DELETE_WINDOW,
                a if a == self.atoms.wm_take_focus => Protocols::TAKE_FOCUS,
                a if a == self.atoms.wm_save_yourself => Protocols::SAVE_YOURSELF,
                a if a == self.atoms.wmaker_wm_miniaturize_window => Protocols::MINIATURIZE_WINDOW,
                _ => Protocols::empty(),
            }
        })
    }

    /// WM_TRANSIENT_FOR; a None or self owner means the root
    pub(crate) fn read_transient_for(&self, window: Xid) -> Option<Xid> {
        let words = log_warn(
            self.conn.get_property32(window, predefined::WM_TRANSIENT_FOR, predefined::WINDOW),
            "read WM_TRANSIENT_FOR",
        )
        .flatten()?;
        let owner = words.first().copied().unwrap_or(NONE);
        if owner == NONE || owner == window {
            Some(self.root)
        } else {
            Some(owner)
        }
    }

    pub(crate) fn read_client_leader(&self, window: Xid) -> Option<Xid> {
        log_warn(
            self.conn.get_property32(window, self.atoms.wm_client_leader, predefined::WINDOW),
            "read WM_CLIENT_LEADER",
        )
        .flatten()
        .and_then(|words| words.first().copied())
        .filter(|&leader| leader != NONE)
    }

    pub(crate) fn read_command(&self, window: Xid) -> Option<Vec<String>> {
        log_warn(
            self.conn.get_property8(window, predefined::WM_COMMAND, ANY_PROPERTY_TYPE),
            "read WM_COMMAND",
        )
        .flatten()
        .and_then(|bytes| decode_command(&bytes))
    }

    pub(crate) fn read_gnustep_attributes(&self, window: Xid) -> Option<GnustepAttributes> {
        log_warn(
            self.conn
                .get_property32(window, self.atoms.gnustep_wm_attr, self.atoms.gnustep_wm_attr),
            "read _GNUSTEP_WM_ATTR",
        )
        .flatten()
        .and_then(|words| GnustepAttributes::from_values(&words))
    }

    /// Read and sanitize WM_NORMAL_HINTS into the record
    ///
    /// Returns the geometry the window should get. With `geometry` set
    /// (first map only), pre-ICCCM clients have their hinted position and
    /// size honored; afterwards the window is never resized from here.
    pub fn get_normal_hints(&mut self, window: Xid, geometry: bool) -> Option<Geometry> {
        let attrs = log_warn(self.conn.get_window_attributes(window), "window attributes").flatten()?;
        let raw = log_warn(
            self.conn
                .get_property32(window, predefined::WM_NORMAL_HINTS, predefined::WM_SIZE_HINTS),
            "read WM_NORMAL_HINTS",
        )
        .flatten()
        .and_then(|words| SizeHints::from_values(&words));

        let pre_icccm = raw.is_some_and(|(_, pre)| pre);
        let ctx = NormalHintsContext {
            attributes: attrs.geometry,
            screen_width: self.width,
            screen_height: self.height,
            geometry,
            startup: self.flags.startup,
            pre_icccm,
        };
        let (hints, result) = normalize_size_hints(raw.map(|(hints, _)| hints), &ctx);
        if let Some(win) = self.windows.get_mut(&window) {
            win.normal_hints = hints;
        }
        Some(result)
    }

    /// Write WM_STATE and remember it
    pub fn set_wm_state(&mut self, window: Xid, state: WmState) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        win.wm_state = state;
        let icon = win.icon.as_ref().map_or(NONE, |icon| icon.window);
        log_and_ignore(
            self.conn
                .change_property32(window, self.atoms.wm_state, self.atoms.wm_state, &state.encode(icon)),
            "set WM_STATE",
        );
    }

    /// Send a WM_PROTOCOLS client message
    pub fn send_protocol(&self, window: Xid, protocol: Atom, time: u32) {
        log_and_ignore(
            self.conn
                .send_client_message(window, self.atoms.wm_protocols, [protocol, time, 0, 0, 0]),
            "send WM_PROTOCOLS message",
        );
    }

    /// Ask the client to close, or kill it when it does not take part
    pub fn close_window(&mut self, window: Xid) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if win.protocols.contains(Protocols::DELETE_WINDOW) && !win.wflag(Attributes::KILL_CLOSE) {
            debug!("Sending WM_DELETE_WINDOW to {:#x}", window);
            self.send_protocol(window, self.atoms.wm_delete_window, 0);
        } else {
            self.kill_window(window);
        }
    }

    pub fn kill_window(&mut self, window: Xid) {
        debug!("Killing client of {:#x}", window);
        log_and_ignore(self.conn.kill_client(window), "kill client");
    }

    /// Give the client back to the root at the frame position
    pub(crate) fn restore_client(&mut self, window: Xid) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let (x, y, border) = (win.frame_x, win.frame_y, win.old_border_width);
        log_and_ignore(self.conn.reparent(window, self.root, x, y), "reparent to root");
        log_and_ignore(self.conn.set_border_width(window, border), "restore border width");
    }

    /// Apply a ConfigureRequest
    ///
    /// Unmanaged windows get the request as is. For managed ones the
    /// frame is restacked and moved; geometry is left alone while shaded,
    /// and the maximize bits of each axis whose size really changed are
    /// dropped.
    pub fn configure_client(&mut self, req: &ConfigureRequest) {
        let Some(win) = self.windows.get(&req.window) else {
            log_and_ignore(self.conn.configure(req.window, &req.to_changes()), "configure unmanaged");
            return;
        };
        let frame = win.frame;

        if req.mask.contains(ConfigMask::STACK_MODE) {
            let sibling = req.mask.contains(ConfigMask::SIBLING).then(|| {
                self.windows
                    .get(&req.sibling)
                    .map_or(req.sibling, |sibling| sibling.frame)
            });
            log_and_ignore(
                self.conn.configure(
                    frame,
                    &WindowChanges {
                        sibling,
                        stack_mode: req.stack_mode,
                        ..Default::default()
                    },
                ),
                "restack frame",
            );
            self.remake_stack_list();
        }

        let Some(win) = self.windows.get_mut(&req.window) else {
            return;
        };
        if req.mask.contains(ConfigMask::BORDER_WIDTH) {
            win.old_border_width = req.border_width;
        }
        if win.state.shaded {
            debug!("Ignoring geometry request of shaded {:#x}", req.window);
            return;
        }
        if !req
            .mask
            .intersects(ConfigMask::X | ConfigMask::Y | ConfigMask::WIDTH | ConfigMask::HEIGHT)
        {
            return;
        }

        let (_, ofs_y) = win.normal_hints.win_gravity.offsets();
        let nx = if req.mask.contains(ConfigMask::X) { req.x } else { win.frame_x };
        let ny = if req.mask.contains(ConfigMask::Y) {
            req.y - if ofs_y < 0 { 0 } else { win.extents.top as i32 }
        } else {
            win.frame_y
        };
        let nwidth = if req.mask.contains(ConfigMask::WIDTH) { req.width } else { win.width };
        let nheight = if req.mask.contains(ConfigMask::HEIGHT) { req.height } else { win.height };
        let (nwidth, nheight) = constrain_size(&win.normal_hints, nwidth, nheight);

        if nwidth != win.old_geometry.width {
            win.state.maximized.remove(MaxFlags::WIDTH_FAMILY);
        }
        if nheight != win.old_geometry.height {
            win.state.maximized.remove(MaxFlags::HEIGHT_FAMILY);
        }

        self.configure_window(req.window, nx, ny, nwidth, nheight);
        if let Some(win) = self.windows.get_mut(&req.window) {
            win.old_geometry = Geometry::new(nx, ny, nwidth, nheight);
        }
    }

    /// Derive attributes from `_GNUSTEP_WM_ATTR`
    pub(crate) fn apply_gnustep_attributes(&mut self, window: Xid, attrs: GnustepAttributes) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if let Some(style) = attrs.style {
            let flags = &mut win.client_flags;
            flags.set(Attributes::NO_TITLEBAR, !style.contains(GnustepStyle::TITLED));
            flags.set(Attributes::NO_CLOSABLE, !style.contains(GnustepStyle::CLOSABLE));
            flags.set(Attributes::NO_CLOSE_BUTTON, !style.contains(GnustepStyle::CLOSABLE));
            flags.set(Attributes::NO_MINIATURIZABLE, !style.contains(GnustepStyle::MINIATURIZABLE));
            flags.set(
                Attributes::NO_MINIATURIZE_BUTTON,
                !style.contains(GnustepStyle::MINIATURIZABLE),
            );
            flags.set(Attributes::NO_RESIZABLE, !style.contains(GnustepStyle::RESIZABLE));
            flags.set(Attributes::NO_RESIZEBAR, !style.contains(GnustepStyle::RESIZABLE));
        }
        if let Some(level) = attrs.level {
            win.level = StackLevel::from_raw(level);
        }
        win.state.is_gnustep = true;
    }
}

/// Clamp a requested client size to the size hints
fn constrain_size(hints: &SizeHints, width: u32, height: u32) -> (u32, u32) {
    let clamp = |value: u32, min: i32, max: i32| -> u32 {
        let (min, max) = (min.max(1) as u32, max.max(1) as u32);
        value.clamp(min.min(max), max)
    };
    (
        clamp(width, hints.min_width, hints.max_width),
        clamp(height, hints.min_height, hints.max_height),
    )
}

fn on_name(screen: &mut Screen, window: Xid) {
    if screen.windows.get(&window).is_some_and(|win| win.state.net_has_title) {
        return;
    }
    let title = screen.read_text(window, predefined::WM_NAME);
    if let Some(win) = screen.windows.get_mut(&window) {
        win.title = title;
    }
    screen.paint_frame(window);
}

fn on_icon_name(screen: &mut Screen, window: Xid) {
    let title = screen.read_text(window, predefined::WM_ICON_NAME);
    if let Some(win) = screen.windows.get_mut(&window) {
        win.icon_title = title.clone();
        if let Some(icon) = win.icon.as_mut() {
            icon.title = title;
        }
    }
    screen.paint_icon(window);
}

fn on_command(screen: &mut Screen, window: Xid) {
    let command = screen.read_command(window);
    let Some(win) = screen.windows.get_mut(&window) else {
        return;
    };
    win.command = command.clone();
    let main_window = win.main_window.unwrap_or(window);
    if let Some(app) = screen.apps.get_mut(main_window) {
        app.command = command;
    }
}

fn on_wm_hints(screen: &mut Screen, window: Xid) {
    let hints = screen.read_wm_hints(window);
    let Some(win) = screen.windows.get(&window) else {
        return;
    };
    let transition = group_transition(
        win.wm_hints.and_then(|h| h.group()),
        hints.and_then(|h| h.group()),
        win.group_id,
        win.client_leader.is_some(),
        win.fake_group.is_some(),
    );
    let main_window = win.main_window;
    let client_leader = win.client_leader;
    debug!("WM_HINTS of {:#x}: {:?}", window, transition);

    match transition {
        GroupTransition::Unchanged | GroupTransition::FakeGroup => {}
        GroupTransition::SwitchGroup(group) => {
            screen.application_destroy(main_window);
            set_group(screen, window, Some(group), Some(group));
            screen.application_create(window);
        }
        GroupTransition::AdoptClientLeader => {
            screen.application_destroy(main_window);
            set_group(screen, window, client_leader, None);
            screen.application_create(window);
        }
        GroupTransition::Ungrouped => {
            screen.application_destroy(main_window);
            set_group(screen, window, None, None);
        }
        GroupTransition::JoinGroup(group) => {
            set_group(screen, window, Some(group), Some(group));
            screen.application_create(window);
        }
    }

    let Some(win) = screen.windows.get_mut(&window) else {
        return;
    };
    win.wm_hints = hints;
    match hints {
        Some(hints) => win.state.urgent = hints.is_urgent(),
        None => win.group_id = None,
    }
    let main_window = win.main_window;
    if let (Some(_), Some(main)) = (hints, main_window) {
        screen
            .apps
            .bounce_while_urgent(main, &screen.windows, std::time::Instant::now());
    }
    screen.paint_frame(window);
}

fn set_group(screen: &mut Screen, window: Xid, main_window: Option<Xid>, group_id: Option<Xid>) {
    if let Some(win) = screen.windows.get_mut(&window) {
        win.main_window = main_window;
        win.group_id = group_id;
    }
}

fn on_normal_hints(screen: &mut Screen, window: Xid) {
    screen.get_normal_hints(window, false);
    screen.update_decorations(window);
}

fn on_transient_for(screen: &mut Screen, window: Xid) {
    let owner = screen.read_transient_for(window);
    let Some(win) = screen.windows.get_mut(&window) else {
        return;
    };
    let old_owner = win.transient_for;
    if old_owner == owner {
        return;
    }
    win.transient_for = owner;
    let has_owner = owner.is_some();
    win.user_flags.set(Attributes::NO_MINIATURIZABLE, has_owner);
    win.user_flags.set(Attributes::NO_MINIATURIZE_BUTTON, has_owner);

    // The highlight moves with the owner whichever window holds focus
    let mut repaint = Vec::new();
    if let Some(old) = old_owner.and_then(|o| screen.windows.get_mut(&o)) {
        if old.state.semi_focused {
            old.state.semi_focused = false;
            repaint.extend(old_owner);
        }
    }
    if let Some(new) = owner.and_then(|o| screen.windows.get_mut(&o)) {
        if !new.state.semi_focused {
            new.state.semi_focused = true;
            repaint.extend(owner);
        }
    }
    for window in repaint {
        screen.paint_frame(window);
    }
}

fn on_protocols(screen: &mut Screen, window: Xid) {
    let protocols = screen.read_protocols(window);
    if let Some(win) = screen.windows.get_mut(&window) {
        win.protocols = protocols;
        win.client_flags
            .set(Attributes::KILL_CLOSE, !protocols.contains(Protocols::DELETE_WINDOW));
    }
}

fn on_colormap_windows(screen: &mut Screen, window: Xid) {
    let colormap_windows = log_warn(
        screen
            .conn
            .get_property32(window, screen.atoms.wm_colormap_windows, predefined::WINDOW),
        "read WM_COLORMAP_WINDOWS",
    )
    .flatten()
    .unwrap_or_default();
    if let Some(win) = screen.windows.get_mut(&window) {
        win.colormap_windows = colormap_windows;
    }
    if screen.focused == Some(window) {
        screen.install_colormaps(window);
    }
}

fn on_wmaker_menu(screen: &mut Screen, window: Xid) {
    let has_menu = log_warn(
        screen
            .conn
            .get_property32(window, screen.atoms.wmaker_menu, screen.atoms.wmaker_menu),
        "read _WINDOWMAKER_MENU",
    )
    .flatten()
    .is_some();
    let Some(win) = screen.windows.get(&window) else {
        return;
    };
    if let Some(leader) = win.fake_group {
        screen.dissolve_fake_group(leader);
    }
    let main_window = screen.windows.get(&window).and_then(|win| win.main_window);
    if let Some(app) = main_window.and_then(|main| screen.apps.get_mut(main)) {
        app.has_menu = has_menu;
    }
}

fn on_gnustep_attributes(screen: &mut Screen, window: Xid) {
    let Some(attrs) = screen.read_gnustep_attributes(window) else {
        warn!("Ignoring malformed _GNUSTEP_WM_ATTR on {:#x}", window);
        return;
    };
    screen.apply_gnustep_attributes(window, attrs);
    screen.update_decorations(window);
}

impl Screen {
    /// Colormap installation is left to the server default
    pub(crate) fn install_colormaps(&self, window: Xid) {
        if let Some(win) = self.windows.get(&window) {
            debug!("{:#x} has {} colormap windows", window, win.colormap_windows.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::hints::WmHintsFlags;
    use crate::wm::testing::{FakeConn, Request, screen_with};

    fn hints_words(flags: WmHintsFlags, group: Xid) -> Vec<u32> {
        vec![flags.bits(), 1, 1, 0, 0, 0, 0, 0, group]
    }

    #[test]
    fn test_group_transition_table() {
        use GroupTransition::*;
        assert_eq!(group_transition(Some(1), Some(2), Some(1), true, false), SwitchGroup(2));
        assert_eq!(group_transition(Some(1), Some(1), Some(1), true, false), Unchanged);
        assert_eq!(group_transition(Some(1), None, Some(1), true, false), AdoptClientLeader);
        assert_eq!(group_transition(Some(1), None, Some(1), false, false), Ungrouped);
        assert_eq!(group_transition(None, Some(2), None, true, false), SwitchGroup(2));
        assert_eq!(group_transition(None, Some(2), None, false, false), JoinGroup(2));
        assert_eq!(group_transition(None, None, None, false, false), Unchanged);
        assert_eq!(group_transition(Some(1), Some(2), Some(1), false, true), FakeGroup);
    }

    #[test]
    fn test_unmanaged_configure_passes_through() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let w = fake.add_client(0x100, "popup");
        let req = ConfigureRequest {
            window: w,
            mask: ConfigMask::WIDTH,
            width: 640,
            ..Default::default()
        };
        screen.configure_client(&req);
        assert!(fake.requests().contains(&Request::Configure(w, req.to_changes())));
        assert_eq!(fake.geometry(w).unwrap().width, 640);
    }

    #[test]
    fn test_shaded_window_keeps_geometry() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();
        screen.windows.get_mut(&a).unwrap().state.shaded = true;
        let before = screen.windows[&a].client_geometry();

        screen.configure_client(&ConfigureRequest {
            window: a,
            mask: ConfigMask::WIDTH | ConfigMask::HEIGHT | ConfigMask::BORDER_WIDTH,
            width: 800,
            height: 600,
            border_width: 3,
            ..Default::default()
        });
        assert_eq!(screen.windows[&a].client_geometry(), before);
        assert_eq!(screen.windows[&a].old_border_width, 3);
    }

    #[test]
    fn test_width_change_clears_horizontal_family_only() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();
        {
            let win = screen.windows.get_mut(&a).unwrap();
            win.state.maximized = MaxFlags::HORIZONTAL | MaxFlags::VERTICAL | MaxFlags::LEFTHALF;
            win.old_geometry = Geometry::new(10, 10, 400, 300);
        }

        screen.configure_client(&ConfigureRequest {
            window: a,
            mask: ConfigMask::WIDTH,
            width: 500,
            ..Default::default()
        });
        let win = &screen.windows[&a];
        assert_eq!(win.state.maximized, MaxFlags::VERTICAL | MaxFlags::LEFTHALF);
        assert_eq!(win.width, 500);
        assert_eq!(win.old_geometry.width, 500);
    }

    #[test]
    fn test_move_of_maximized_window_clears_maximize() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();
        {
            let win = screen.windows.get_mut(&a).unwrap();
            win.state.maximized = MaxFlags::HORIZONTAL | MaxFlags::VERTICAL;
            win.old_geometry = Geometry::new(10, 10, 200, 150);
        }

        screen.configure_client(&ConfigureRequest {
            window: a,
            mask: ConfigMask::X | ConfigMask::Y,
            x: 50,
            y: 60,
            ..Default::default()
        });
        let win = &screen.windows[&a];
        assert!(win.state.maximized.is_empty());
        assert_eq!((win.width, win.height), (400, 300));
        assert_eq!(win.old_geometry, Geometry::new(50, 60, 400, 300));
    }

    #[test]
    fn test_configure_position_for_northwest_gravity() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();
        screen.configure_client(&ConfigureRequest {
            window: a,
            mask: ConfigMask::X | ConfigMask::Y,
            x: 100,
            y: 120,
            ..Default::default()
        });
        let win = &screen.windows[&a];
        assert_eq!((win.frame_x, win.frame_y), (100, 120));
        assert_eq!(win.width, 400);
    }

    #[test]
    fn test_title_ignored_once_net_title_present() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();

        fake.set_property8(a, predefined::WM_NAME, b"plain");
        screen.check_property(a, predefined::WM_NAME);
        assert_eq!(screen.windows[&a].title.as_deref(), Some("plain"));

        let net_wm_name = screen.atoms.net_wm_name;
        fake.set_property8(a, net_wm_name, "ünicode".as_bytes());
        screen.check_property(a, net_wm_name);
        assert_eq!(screen.windows[&a].title.as_deref(), Some("ünicode"));

        fake.set_property8(a, predefined::WM_NAME, b"ignored");
        screen.check_property(a, predefined::WM_NAME);
        assert_eq!(screen.windows[&a].title.as_deref(), Some("ünicode"));
    }

    #[test]
    fn test_wm_hints_group_changes_move_application() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        let g1 = fake.add_client(0x300, "g1");
        let g2 = fake.add_client(0x400, "g2");
        screen.manage_window(a).unwrap();

        fake.set_property32(a, predefined::WM_HINTS, &hints_words(WmHintsFlags::WINDOW_GROUP, g1));
        screen.check_property(a, predefined::WM_HINTS);
        assert_eq!(screen.windows[&a].main_window, Some(g1));
        assert!(screen.apps.get(g1).is_some());

        fake.set_property32(a, predefined::WM_HINTS, &hints_words(WmHintsFlags::WINDOW_GROUP, g2));
        screen.check_property(a, predefined::WM_HINTS);
        assert_eq!(screen.windows[&a].group_id, Some(g2));
        assert!(screen.apps.get(g1).is_none());
        assert!(screen.apps.get(g2).is_some());

        fake.set_property32(a, predefined::WM_HINTS, &hints_words(WmHintsFlags::URGENCY, 0));
        screen.check_property(a, predefined::WM_HINTS);
        assert_eq!(screen.windows[&a].main_window, None);
        assert!(screen.apps.get(g2).is_none());
        assert!(screen.windows[&a].state.urgent);
    }

    #[test]
    fn test_transient_for_sets_miniaturize_flags() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let owner = fake.add_client(0x100, "owner");
        let dialog = fake.add_client(0x200, "dialog");
        screen.manage_window(owner).unwrap();
        screen.manage_window(dialog).unwrap();

        fake.set_property32(dialog, predefined::WM_TRANSIENT_FOR, &[owner]);
        screen.check_property(dialog, predefined::WM_TRANSIENT_FOR);
        assert_eq!(screen.windows[&dialog].transient_for, Some(owner));
        assert!(screen.windows[&dialog].wflag(Attributes::NO_MINIATURIZABLE));

        fake.set_property32(dialog, predefined::WM_TRANSIENT_FOR, &[dialog]);
        screen.check_property(dialog, predefined::WM_TRANSIENT_FOR);
        assert_eq!(screen.windows[&dialog].transient_for, Some(screen.root));

        fake.remove_property(dialog, predefined::WM_TRANSIENT_FOR);
        screen.check_property(dialog, predefined::WM_TRANSIENT_FOR);
        assert_eq!(screen.windows[&dialog].transient_for, None);
        assert!(!screen.windows[&dialog].wflag(Attributes::NO_MINIATURIZE_BUTTON));
    }

    #[test]
    fn test_transient_owner_change_moves_highlight() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let first = fake.add_client(0x100, "first");
        let second = fake.add_client(0x200, "second");
        let dialog = fake.add_client(0x300, "dialog");
        for w in [first, second, dialog] {
            screen.manage_window(w).unwrap();
        }
        screen.set_focus_to(Some(first));

        fake.set_property32(dialog, predefined::WM_TRANSIENT_FOR, &[first]);
        screen.check_property(dialog, predefined::WM_TRANSIENT_FOR);
        assert!(screen.windows[&first].state.semi_focused);

        fake.set_property32(dialog, predefined::WM_TRANSIENT_FOR, &[second]);
        screen.check_property(dialog, predefined::WM_TRANSIENT_FOR);
        assert!(!screen.windows[&first].state.semi_focused);
        assert!(screen.windows[&second].state.semi_focused);
        assert_eq!(screen.focused, Some(first));
    }

    #[test]
    fn test_command_of_group_member_reaches_application() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        let leader = fake.add_client(0x300, "leader");
        screen.manage_window(a).unwrap();
        fake.set_property32(a, predefined::WM_HINTS, &hints_words(WmHintsFlags::WINDOW_GROUP, leader));
        screen.check_property(a, predefined::WM_HINTS);
        assert_eq!(screen.windows[&a].main_window, Some(leader));

        fake.set_property8(a, predefined::WM_COMMAND, b"editor\0--new\0");
        screen.check_property(a, predefined::WM_COMMAND);
        let expected = Some(vec!["editor".to_string(), "--new".to_string()]);
        assert_eq!(screen.windows[&a].command, expected);
        assert_eq!(screen.apps.get(leader).unwrap().command, expected);
    }

    #[test]
    fn test_protocols_without_delete_mean_kill_close() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();

        fake.set_property32(a, screen.atoms.wm_protocols, &[screen.atoms.wm_take_focus]);
        screen.check_property(a, screen.atoms.wm_protocols);
        assert!(screen.windows[&a].wflag(Attributes::KILL_CLOSE));
        screen.close_window(a);
        assert!(fake.requests().contains(&Request::Kill(a)));

        let protocols = [screen.atoms.wm_delete_window];
        fake.set_property32(a, screen.atoms.wm_protocols, &protocols);
        screen.check_property(a, screen.atoms.wm_protocols);
        fake.clear_requests();
        screen.close_window(a);
        let delete = screen.atoms.wm_delete_window;
        assert!(matches!(
            fake.requests().as_slice(),
            [Request::ClientMessage(w, _, data)] if *w == a && data[0] == delete
        ));
    }

    #[test]
    fn test_normal_hints_never_resize() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();

        let mut words = vec![0u32; 18];
        words[0] = (crate::wm::hints::SizeHintsFlags::P_MIN_SIZE).bits();
        words[5] = 0;
        words[6] = 600;
        fake.set_property32(a, predefined::WM_NORMAL_HINTS, &words);
        screen.check_property(a, predefined::WM_NORMAL_HINTS);
        let win = &screen.windows[&a];
        assert_eq!(win.normal_hints.min_width, crate::wm::hints::MIN_WINDOW_SIZE);
        assert_eq!(win.normal_hints.min_height, 600);
        assert_eq!(win.height, 300);
    }
}

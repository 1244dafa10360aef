//! EWMH (Extended Window Manager Hints) implementation
//!
//! Root window properties for pagers and panels, the per-client `_NET_*`
//! properties, and the client messages other programs send us.

use tracing::{debug, info};

use crate::shared::Geometry;
use crate::wm::client_flags::{Attributes, MaxFlags};
use crate::wm::error::{log_and_ignore, log_warn};
use crate::wm::hints::{Strut, WmState};
use crate::wm::screen::Screen;
use crate::wm::workspace::ALL_WORKSPACES;
use crate::wm::xconn::{Atom, NONE, SurfaceSpec, Xid, predefined};

/// `_NET_WM_STATE` client message actions
const NET_WM_STATE_REMOVE: u32 = 0;
const NET_WM_STATE_ADD: u32 = 1;
const NET_WM_STATE_TOGGLE: u32 = 2;

/// Payload of `_WINDOWMAKER_COMMAND` asking for a configuration reload
const RECONFIGURE_COMMAND: &str = "Reconfigure";

/// Decode a format-8 client message payload into text
fn message_text(data: &[u32; 5]) -> Option<String> {
    let bytes: Vec<u8> = data.iter().flat_map(|word| word.to_ne_bytes()).collect();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).ok().map(str::to_string)
}

impl Screen {
    /// Advertise EWMH support on the root
    pub fn init_root_properties(&mut self) {
        let spec = SurfaceSpec {
            geometry: Geometry::new(-100, -100, 1, 1),
            border_width: 0,
            background: 0,
            border_color: 0,
            override_redirect: true,
        };
        let check = log_warn(self.conn.create_surface(&spec), "create supporting window").unwrap_or(NONE);
        if check != NONE {
            for window in [self.root, check] {
                log_and_ignore(
                    self.conn.change_property32(
                        window,
                        self.atoms.net_supporting_wm_check,
                        predefined::WINDOW,
                        &[check],
                    ),
                    "set _NET_SUPPORTING_WM_CHECK",
                );
            }
            log_and_ignore(
                self.conn
                    .change_property8(check, self.atoms.net_wm_name, self.atoms.utf8_string, b"NextWM"),
                "name supporting window",
            );
        }
        log_and_ignore(
            self.conn.change_property32(
                self.root,
                self.atoms.net_supported,
                predefined::ATOM,
                &self.atoms.supported(),
            ),
            "set _NET_SUPPORTED",
        );
        debug!("EWMH root properties set (check window {:#x})", check);
    }

    /// Update _NET_CLIENT_LIST with managed windows, oldest first
    pub fn update_client_list(&mut self) {
        let clients: Vec<Xid> = self.focus.iter().rev().copied().collect();
        log_and_ignore(
            self.conn
                .change_property32(self.root, self.atoms.net_client_list, predefined::WINDOW, &clients),
            "set _NET_CLIENT_LIST",
        );
    }

    /// Update _NET_WM_DESKTOP for a window
    pub fn update_net_wm_desktop(&mut self, window: Xid) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let desktop = if win.is_omnipresent() {
            ALL_WORKSPACES
        } else {
            win.workspace as u32
        };
        log_and_ignore(
            self.conn
                .change_property32(window, self.atoms.net_wm_desktop, predefined::CARDINAL, &[desktop]),
            "set _NET_WM_DESKTOP",
        );
    }

    /// Update _NET_FRAME_EXTENTS for a window
    pub fn update_frame_extents(&mut self, window: Xid) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let e = win.extents;
        log_and_ignore(
            self.conn.change_property32(
                window,
                self.atoms.net_frame_extents,
                predefined::CARDINAL,
                &[e.border, e.border, e.top + e.border, e.bottom + e.border],
            ),
            "set _NET_FRAME_EXTENTS",
        );
    }

    /// Rewrite _NET_WM_STATE from the window's state
    pub fn update_net_wm_state(&mut self, window: Xid) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let a = &self.atoms;
        let max = win.state.maximized;
        let mut states = Vec::new();
        if win.state.fullscreen {
            states.push(a.net_wm_state_fullscreen);
        }
        if max.intersects(MaxFlags::VERTICAL | MaxFlags::LEFTHALF | MaxFlags::RIGHTHALF | MaxFlags::MAXIMUS) {
            states.push(a.net_wm_state_maximized_vert);
        }
        if max.intersects(MaxFlags::HORIZONTAL | MaxFlags::TOPHALF | MaxFlags::BOTTOMHALF | MaxFlags::MAXIMUS) {
            states.push(a.net_wm_state_maximized_horz);
        }
        if win.state.shaded {
            states.push(a.net_wm_state_shaded);
        }
        if win.is_omnipresent() {
            states.push(a.net_wm_state_sticky);
        }
        if win.state.miniaturized || win.state.hidden {
            states.push(a.net_wm_state_hidden);
        }
        if win.wflag(Attributes::SKIP_WINDOW_LIST) {
            states.push(a.net_wm_state_skip_pager);
            states.push(a.net_wm_state_skip_taskbar);
        }
        log_and_ignore(
            self.conn
                .change_property32(window, self.atoms.net_wm_state, predefined::ATOM, &states),
            "set _NET_WM_STATE",
        );
    }

    /// Space reserved by a dock or panel, partial strut first
    pub(crate) fn read_strut(&self, window: Xid) -> Option<Strut> {
        [self.atoms.net_wm_strut_partial, self.atoms.net_wm_strut]
            .into_iter()
            .find_map(|atom| {
                log_warn(self.conn.get_property32(window, atom, predefined::CARDINAL), "read strut")
                    .flatten()
                    .and_then(|values| Strut::from_values(&values))
            })
            .filter(|strut| !strut.is_empty())
    }

    pub(crate) fn read_net_desktop(&self, window: Xid) -> Option<u32> {
        log_warn(
            self.conn
                .get_property32(window, self.atoms.net_wm_desktop, predefined::CARDINAL),
            "read _NET_WM_DESKTOP",
        )
        .flatten()
        .and_then(|values| values.first().copied())
    }

    /// Property changes in the `_NET_*` namespace
    pub fn check_net_property(&mut self, window: Xid, atom: Atom) {
        if atom == self.atoms.net_wm_name {
            let title = self.read_text(window, atom);
            let Some(win) = self.windows.get_mut(&window) else {
                return;
            };
            win.state.net_has_title = title.is_some();
            if title.is_some() {
                win.title = title;
            }
            self.paint_frame(window);
        } else if atom == self.atoms.net_wm_icon_name {
            if let Some(title) = self.read_text(window, atom) {
                if let Some(win) = self.windows.get_mut(&window) {
                    win.icon_title = Some(title.clone());
                    if let Some(icon) = win.icon.as_mut() {
                        icon.title = Some(title);
                    }
                }
                self.paint_icon(window);
            }
        } else if atom == self.atoms.net_wm_strut || atom == self.atoms.net_wm_strut_partial {
            let strut = self.read_strut(window);
            if let Some(win) = self.windows.get_mut(&window) {
                win.strut = strut;
            }
            self.update_usable_area();
        } else {
            debug!("Ignoring property {} on {:#x}", atom, window);
        }
    }

    /// Client messages for the root or a managed window
    ///
    /// Malformed or unknown messages are dropped.
    pub fn handle_client_message(&mut self, window: Xid, message_type: Atom, format: u8, data: [u32; 5]) {
        let a = &self.atoms;
        if message_type == a.net_current_desktop {
            self.switch_workspace(data[0] as usize);
        } else if message_type == a.net_number_of_desktops {
            self.set_number_of_desktops(data[0] as usize);
        } else if message_type == a.wmaker_command {
            self.handle_wmaker_command(format, &data);
        } else if !self.windows.contains_key(&window) {
            debug!("Client message {} for unmanaged {:#x}", message_type, window);
        } else if message_type == a.net_active_window {
            self.make_visible(window);
            self.set_focus_to(Some(window));
            self.raise_window(window);
            self.commit_stacking();
        } else if message_type == a.net_close_window {
            self.close_window(window);
        } else if message_type == a.net_wm_desktop {
            if data[0] == ALL_WORKSPACES {
                self.set_omnipresent(window, true);
            } else {
                self.set_omnipresent(window, false);
                self.change_workspace(window, data[0] as usize);
            }
        } else if message_type == a.net_wm_state {
            let action = data[0];
            for property in [data[1], data[2]] {
                if property != NONE {
                    self.change_net_wm_state(window, action, property);
                }
            }
            self.update_net_wm_state(window);
        } else if message_type == a.wm_change_state {
            if data[0] == WmState::Iconic as u32 {
                self.iconify(window);
            }
        } else if message_type == a.wmaker_wm_miniaturize_window {
            self.iconify(window);
        } else {
            debug!("Unknown client message {} on {:#x}", message_type, window);
        }
    }

    fn handle_wmaker_command(&mut self, format: u8, data: &[u32; 5]) {
        if format != 8 {
            debug!("Ignoring _WINDOWMAKER_COMMAND with format {}", format);
            return;
        }
        match message_text(data) {
            Some(command) if command == RECONFIGURE_COMMAND => {
                info!("Reconfigure requested");
                self.flags.reconfigure = true;
            }
            other => debug!("Ignoring _WINDOWMAKER_COMMAND {:?}", other),
        }
    }

    /// Grow or shrink the workspace list from the end
    fn set_number_of_desktops(&mut self, count: usize) {
        let count = count.max(1);
        while self.workspaces.count() < count {
            if self.new_workspace().is_err() {
                break;
            }
        }
        while self.workspaces.count() > count {
            let last = self.workspaces.count() - 1;
            if let Err(e) = self.delete_workspace(last) {
                debug!("Keeping workspace {}: {}", last, e);
                break;
            }
        }
    }

    fn change_net_wm_state(&mut self, window: Xid, action: u32, property: Atom) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let a = &self.atoms;
        let max = win.state.maximized;
        let current = if property == a.net_wm_state_fullscreen {
            win.state.fullscreen
        } else if property == a.net_wm_state_maximized_vert {
            max.contains(MaxFlags::VERTICAL)
        } else if property == a.net_wm_state_maximized_horz {
            max.contains(MaxFlags::HORIZONTAL)
        } else if property == a.net_wm_state_shaded {
            win.state.shaded
        } else if property == a.net_wm_state_sticky {
            win.is_omnipresent()
        } else if property == a.net_wm_state_hidden {
            win.state.miniaturized
        } else if property == a.net_wm_state_skip_pager || property == a.net_wm_state_skip_taskbar {
            win.wflag(Attributes::SKIP_WINDOW_LIST)
        } else {
            debug!("Unsupported _NET_WM_STATE {} on {:#x}", property, window);
            return;
        };
        let on = match action {
            NET_WM_STATE_REMOVE => false,
            NET_WM_STATE_ADD => true,
            NET_WM_STATE_TOGGLE => !current,
            _ => return,
        };
        if on == current {
            return;
        }

        if property == a.net_wm_state_fullscreen {
            self.fullscreen(window, on);
        } else if property == a.net_wm_state_maximized_vert || property == a.net_wm_state_maximized_horz {
            let axis = if property == a.net_wm_state_maximized_vert {
                MaxFlags::VERTICAL
            } else {
                MaxFlags::HORIZONTAL
            };
            let remaining = if on { max | axis } else { max - axis };
            self.unmaximize(window);
            self.maximize(window, remaining);
        } else if property == a.net_wm_state_shaded {
            if on {
                self.shade(window);
            } else {
                self.unshade(window);
            }
        } else if property == a.net_wm_state_sticky {
            self.set_omnipresent(window, on);
        } else if property == a.net_wm_state_hidden {
            if on {
                self.iconify(window);
            } else {
                self.deiconify(window);
            }
        } else if let Some(win) = self.windows.get_mut(&window) {
            win.user_flags.set(Attributes::SKIP_WINDOW_LIST, on);
        }
    }
}

//! Window State Transitions
//!
//! Map, miniaturize, shade, maximize, fullscreen, hide. The state axes in
//! [`WindowState`](crate::wm::client_flags::WindowState) are independent,
//! so each transition only touches its own axis plus what has to be on
//! screen because of it.

use tracing::debug;

use crate::shared::Geometry;
use crate::wm::client_flags::{Attributes, MaxFlags, StackLevel};
use crate::wm::error::log_and_ignore;
use crate::wm::hints::WmState;
use crate::wm::screen::Screen;
use crate::wm::window::FrameExtents;
use crate::wm::xconn::Xid;

/// Client size that fits a frame of `width` x `height`
fn client_size(extents: &FrameExtents, width: u32, height: u32) -> (u32, u32) {
    (
        width.saturating_sub(2 * extents.border).max(1),
        height
            .saturating_sub(extents.top + extents.bottom + 2 * extents.border)
            .max(1),
    )
}

/// Frame rectangle for the maximize directions in `flags`
///
/// Halves combine into quadrants; a half along one axis fills the other
/// axis completely.
pub fn maximized_frame(flags: MaxFlags, current: Geometry, area: Geometry) -> Geometry {
    let half_width = area.width / 2;
    let half_height = area.height / 2;

    let (x, width) = if flags.contains(MaxFlags::LEFTHALF) {
        (area.x, half_width)
    } else if flags.contains(MaxFlags::RIGHTHALF) {
        (area.x + half_width as i32, area.width - half_width)
    } else if flags.intersects(MaxFlags::HORIZONTAL | MaxFlags::TOPHALF | MaxFlags::BOTTOMHALF) {
        (area.x, area.width)
    } else {
        (current.x, current.width)
    };

    let (y, height) = if flags.contains(MaxFlags::TOPHALF) {
        (area.y, half_height)
    } else if flags.contains(MaxFlags::BOTTOMHALF) {
        (area.y + half_height as i32, area.height - half_height)
    } else if flags.intersects(MaxFlags::VERTICAL | MaxFlags::LEFTHALF | MaxFlags::RIGHTHALF) {
        (area.y, area.height)
    } else {
        (current.y, current.height)
    };

    Geometry::new(x, y, width, height)
}

/// Grow `frame` inside `area` until it touches one of `others`
///
/// Horizontal growth goes first, then the vertical edges are pushed out
/// against windows overlapping the new horizontal span.
pub fn maximus_frame(frame: Geometry, others: &[Geometry], area: Geometry) -> Geometry {
    let mut left = area.x;
    let mut right = area.right();
    for other in others {
        if other.y >= frame.bottom() || other.bottom() <= frame.y {
            continue;
        }
        if other.right() <= frame.x {
            left = left.max(other.right());
        } else if other.x >= frame.right() {
            right = right.min(other.x);
        }
    }

    let mut top = area.y;
    let mut bottom = area.bottom();
    for other in others {
        if other.x >= right || other.right() <= left {
            continue;
        }
        if other.bottom() <= frame.y {
            top = top.max(other.bottom());
        } else if other.y >= frame.bottom() {
            bottom = bottom.min(other.y);
        }
    }

    Geometry::new(
        left,
        top,
        (right - left).max(1) as u32,
        (bottom - top).max(1) as u32,
    )
}

impl Screen {
    /// Show a window: client and frame mapped, WM_STATE Normal
    pub fn map_window(&mut self, window: Xid) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        win.state.mapped = true;
        let frame = win.frame;
        log_and_ignore(self.conn.map(window), "map client");
        log_and_ignore(self.conn.map(frame), "map frame");
        self.set_wm_state(window, WmState::Normal);
        self.paint_frame(window);
    }

    /// Take a window off screen, keeping its record
    ///
    /// Only the frame is unmapped, so no UnmapNotify for the client has to
    /// be told apart from a withdraw.
    pub fn unmap_window(&mut self, window: Xid) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        win.state.mapped = false;
        let frame = win.frame;
        log_and_ignore(self.conn.unmap(frame), "unmap frame");
        self.set_wm_state(window, WmState::Iconic);
    }

    /// Move focus away from `window` if it has it
    pub(crate) fn focus_away_from(&mut self, window: Xid) {
        if self.focused == Some(window) {
            let next = self.focus_candidate();
            self.set_focus_to(next);
        }
    }

    /// Turn a window into its miniwindow
    pub fn iconify(&mut self, window: Xid) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if win.state.miniaturized || win.state.fullscreen {
            return;
        }
        debug!("Miniaturizing {:#x}", window);
        if let Some(win) = self.windows.get_mut(&window) {
            win.state.miniaturized = true;
        }
        log_and_ignore(self.create_icon(window), "create miniwindow");
        self.unmap_window(window);
        if self.icon_should_show(window) {
            self.set_icon_mapped(window, true);
        }
        self.focus_away_from(window);
        if self.config.icons.auto_arrange {
            self.arrange_icons(false);
        }
        self.update_net_wm_state(window);
    }

    /// Bring a window back from its miniwindow
    pub fn deiconify(&mut self, window: Xid) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if !win.state.miniaturized {
            return;
        }
        let on_screen = win.is_omnipresent() || win.workspace == self.current_workspace();
        let hidden = win.state.hidden;
        debug!("Deminiaturizing {:#x}", window);

        if let Some(win) = self.windows.get_mut(&window) {
            win.state.miniaturized = false;
        }
        self.destroy_icon(window);
        if on_screen && !hidden {
            self.map_window(window);
            self.raise_window(window);
            self.commit_stacking();
            if !self.flags.startup {
                self.set_focus_to(Some(window));
            }
        } else {
            self.set_wm_state(window, WmState::Normal);
        }
        if self.config.icons.auto_arrange {
            self.arrange_icons(false);
        }
        self.update_net_wm_state(window);
    }

    /// Roll the window up into its titlebar
    pub fn shade(&mut self, window: Xid) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.state.shaded || !win.has_titlebar() || win.wflag(Attributes::NO_SHADEABLE) {
            return;
        }
        win.state.shaded = true;
        let (x, y, width, height) = (win.frame_x, win.frame_y, win.width, win.height);
        self.configure_window(window, x, y, width, height);
        self.set_wm_state(window, WmState::Iconic);
        self.update_net_wm_state(window);
    }

    pub fn unshade(&mut self, window: Xid) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if !win.state.shaded {
            return;
        }
        win.state.shaded = false;
        let (x, y, width, height) = (win.frame_x, win.frame_y, win.width, win.height);
        self.configure_window(window, x, y, width, height);
        self.set_wm_state(window, WmState::Normal);
        self.update_net_wm_state(window);
    }

    /// Maximize in the given directions
    ///
    /// The pre-maximize geometry is saved once; maximizing again in other
    /// directions keeps the original so [`Screen::unmaximize`] always goes
    /// back to where the window started.
    pub fn maximize(&mut self, window: Xid, flags: MaxFlags) {
        let directions = flags & MaxFlags::DIRECTIONS;
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if directions.is_empty() || win.state.fullscreen || !win.is_resizable() {
            return;
        }
        let area = if flags.contains(MaxFlags::IGNORE_XINERAMA) {
            Geometry::new(0, 0, self.width, self.height)
        } else {
            self.usable_area
        };
        let current = win.frame_geometry();
        let extents = win.extents;

        let frame = if directions.contains(MaxFlags::MAXIMUS) {
            let others: Vec<Geometry> = self
                .windows
                .values()
                .filter(|other| other.client != window && other.is_visible())
                .filter(|other| other.is_omnipresent() || other.workspace == self.current_workspace())
                .map(|other| other.frame_geometry())
                .collect();
            maximus_frame(current, &others, area)
        } else {
            maximized_frame(directions, current, area)
        };
        let (width, height) = client_size(&extents, frame.width, frame.height);

        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if !win.state.maximized.is_maximized() {
            win.old_geometry = win.client_geometry();
        }
        win.state.maximized = flags;
        debug!("Maximizing {:#x} {:?} to {:?}", window, directions, frame);
        self.configure_window(window, frame.x, frame.y, width, height);
        self.update_net_wm_state(window);
    }

    /// Return to the geometry saved by the first maximize
    pub fn unmaximize(&mut self, window: Xid) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if !win.state.maximized.is_maximized() {
            return;
        }
        win.state.maximized = MaxFlags::empty();
        let old = win.old_geometry;
        self.configure_window(window, old.x, old.y, old.width, old.height);
        self.update_net_wm_state(window);
    }

    /// Toggle maximize in `flags`; maximized windows are restored
    pub fn toggle_maximize(&mut self, window: Xid, flags: MaxFlags) {
        let maximized = self
            .windows
            .get(&window)
            .is_some_and(|win| win.state.maximized.intersects(flags & MaxFlags::DIRECTIONS));
        if maximized {
            self.unmaximize(window);
        } else {
            self.maximize(window, flags);
        }
    }

    /// Base stacking level from the window's attributes
    fn attribute_level(&self, window: Xid) -> StackLevel {
        match self.windows.get(&window) {
            Some(win) if win.wflag(Attributes::FLOATING) => StackLevel::Floating,
            Some(win) if win.wflag(Attributes::SUNKEN) => StackLevel::Sunken,
            _ => StackLevel::Normal,
        }
    }

    /// Cover the whole screen with no decorations, or come back from it
    pub fn fullscreen(&mut self, window: Xid, on: bool) {
        let base_level = self.attribute_level(window);
        let (width, height) = (self.width, self.height);
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.state.fullscreen == on {
            return;
        }

        let target = if on {
            win.before_fullscreen = Some((win.client_geometry(), win.level));
            win.state.fullscreen = true;
            win.level = StackLevel::Fullscreen;
            Geometry::new(0, 0, width, height)
        } else {
            let (geometry, level) = win.before_fullscreen.take().unwrap_or((win.old_geometry, base_level));
            win.state.fullscreen = false;
            win.level = level;
            geometry
        };

        self.update_decorations(window);
        self.configure_window(window, target.x, target.y, target.width, target.height);
        self.raise_window(window);
        self.commit_stacking();
        self.update_frame_extents(window);
        self.update_net_wm_state(window);
    }

    /// Stick a window to every workspace, or pin it to the current one
    pub fn set_omnipresent(&mut self, window: Xid, on: bool) {
        let current = self.current_workspace();
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.state.omnipresent == on {
            return;
        }
        win.state.omnipresent = on;
        if win.is_visible() || on {
            win.workspace = current;
        }
        self.update_net_wm_desktop(window);
        self.update_net_wm_state(window);
    }

    pub fn select(&mut self, window: Xid, on: bool) {
        if let Some(win) = self.windows.get_mut(&window) {
            win.state.selected = on;
        }
        self.paint_frame(window);
    }

    /// Move a window to workspace `workspace`
    pub fn change_workspace(&mut self, window: Xid, workspace: usize) {
        if workspace >= self.workspaces.count() {
            return;
        }
        let current = self.current_workspace();
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.workspace == workspace {
            return;
        }
        win.workspace = workspace;
        let mapped = win.state.mapped;
        let showable = !win.state.miniaturized && !win.state.hidden;
        let omnipresent = win.is_omnipresent();
        debug!("Moving {:#x} to workspace {}", window, workspace);

        if workspace != current && mapped && !omnipresent {
            self.unmap_window(window);
            self.focus_away_from(window);
        } else if workspace == current && !mapped && showable {
            self.map_window(window);
        }
        if self.config.workspaces.enable_pager {
            self.workspace_map.insert(window, workspace);
        }
        self.update_net_wm_desktop(window);
    }

    /// Make a window reachable: its workspace, deiconified, unhidden, unshaded
    pub fn make_visible(&mut self, window: Xid) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let workspace = win.workspace;
        let on_screen = win.is_omnipresent() || workspace == self.current_workspace();
        if !on_screen {
            self.switch_workspace(workspace);
        }
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let (miniaturized, hidden, shaded) = (win.state.miniaturized, win.state.hidden, win.state.shaded);
        if hidden {
            self.unhide_application(window);
        }
        if miniaturized {
            self.deiconify(window);
        }
        if shaded {
            self.unshade(window);
        }
    }

    /// Windows belonging to the same application as `window`
    fn application_windows(&self, window: Xid) -> Vec<Xid> {
        let main = self.windows.get(&window).and_then(|win| win.main_window);
        match main {
            Some(main) => self
                .focus
                .iter()
                .copied()
                .filter(|w| self.windows.get(w).is_some_and(|win| win.main_window == Some(main)))
                .collect(),
            None => vec![window],
        }
    }

    /// Hide every window of the application owning `window`
    pub fn hide_application(&mut self, window: Xid) {
        let members = self.application_windows(window);
        let main = self.windows.get(&window).and_then(|win| win.main_window);
        for &member in &members {
            let Some(win) = self.windows.get_mut(&member) else {
                continue;
            };
            if win.state.hidden {
                continue;
            }
            win.state.hidden = true;
            if win.is_visible() {
                self.unmap_window(member);
            }
            self.set_icon_mapped(member, false);
            self.update_net_wm_state(member);
        }
        if let Some(app) = main.and_then(|main| self.apps.get_mut(main)) {
            app.hidden = true;
        }
        if self.focused.is_some_and(|focused| members.contains(&focused)) {
            let next = self.focus_candidate();
            self.set_focus_to(next);
        }
    }

    /// Bring back the hidden windows of an application on this workspace
    pub fn unhide_application(&mut self, window: Xid) {
        let members = self.application_windows(window);
        let main = self.windows.get(&window).and_then(|win| win.main_window);
        let current = self.current_workspace();
        for &member in &members {
            let Some(win) = self.windows.get_mut(&member) else {
                continue;
            };
            if !win.state.hidden {
                continue;
            }
            win.state.hidden = false;
            let on_screen = win.is_omnipresent() || win.workspace == current;
            let miniaturized = win.state.miniaturized;
            if on_screen && !miniaturized {
                self.map_window(member);
            } else if miniaturized && self.icon_should_show(member) {
                self.set_icon_mapped(member, true);
            }
            self.update_net_wm_state(member);
        }
        let last_focused = main
            .and_then(|main| self.apps.get_mut(main))
            .and_then(|app| {
                app.hidden = false;
                app.last_focused
            });
        let target = last_focused
            .filter(|&w| self.can_focus(w))
            .or_else(|| members.iter().copied().find(|&w| self.can_focus(w)));
        if target.is_some() && !self.flags.startup {
            self.set_focus_to(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::{FakeConn, screen_with};
    use crate::wm::xconn::XConn;

    fn screen_with_clients(names: &[(u32, &str)]) -> (Screen, FakeConn) {
        let (mut screen, fake) = screen_with(FakeConn::new());
        for &(id, name) in names {
            fake.add_client(id, name);
            screen.manage_window(id).unwrap();
        }
        (screen, fake)
    }

    #[test]
    fn test_maximized_frame_halves_and_quadrants() {
        let area = Geometry::new(0, 0, 1000, 800);
        let current = Geometry::new(100, 100, 200, 200);
        assert_eq!(
            maximized_frame(MaxFlags::HORIZONTAL, current, area),
            Geometry::new(0, 100, 1000, 200)
        );
        assert_eq!(
            maximized_frame(MaxFlags::RIGHTHALF, current, area),
            Geometry::new(500, 0, 500, 800)
        );
        assert_eq!(
            maximized_frame(MaxFlags::LEFTHALF | MaxFlags::BOTTOMHALF, current, area),
            Geometry::new(0, 400, 500, 400)
        );
    }

    #[test]
    fn test_maximus_stops_at_neighbours() {
        let area = Geometry::new(0, 0, 1000, 800);
        let frame = Geometry::new(400, 300, 100, 100);
        let others = [
            Geometry::new(0, 250, 200, 200),
            Geometry::new(700, 0, 300, 800),
            Geometry::new(450, 600, 100, 100),
        ];
        assert_eq!(maximus_frame(frame, &others, area), Geometry::new(200, 0, 500, 600));
    }

    #[test]
    fn test_unmaximize_restores_exact_geometry() {
        let (mut screen, _fake) = screen_with_clients(&[(0x100, "a")]);
        let before = screen.windows[&0x100].client_geometry();

        screen.maximize(0x100, MaxFlags::VERTICAL);
        screen.maximize(0x100, MaxFlags::VERTICAL | MaxFlags::HORIZONTAL);
        let win = &screen.windows[&0x100];
        assert_eq!(win.frame_geometry().height + 2 * win.extents.border, 768);
        assert_eq!(win.old_geometry, before);

        screen.unmaximize(0x100);
        let win = &screen.windows[&0x100];
        assert_eq!(win.client_geometry(), before);
        assert!(!win.state.maximized.is_maximized());
    }

    #[test]
    fn test_shade_keeps_client_geometry() {
        let (mut screen, fake) = screen_with_clients(&[(0x100, "a")]);
        let frame = screen.windows[&0x100].frame;
        screen.shade(0x100);
        assert_eq!(fake.geometry(frame).unwrap().height, 22);
        assert_eq!(screen.windows[&0x100].height, 300);
        assert!(screen.windows[&0x100].is_visible());

        screen.unshade(0x100);
        assert_eq!(fake.geometry(frame).unwrap().height, 330);
        assert_eq!(screen.windows[&0x100].wm_state, WmState::Normal);
    }

    #[test]
    fn test_icon_only_mapped_where_it_belongs() {
        let (mut screen, fake) = screen_with_clients(&[(0x100, "a"), (0x200, "b")]);
        screen.change_workspace(0x200, 1);
        assert!(!screen.windows[&0x200].state.mapped);

        screen.iconify(0x100);
        let icon = screen.windows[&0x100].icon.clone().unwrap();
        assert!(icon.mapped);
        assert!(fake.is_mapped(icon.window));

        screen.iconify(0x200);
        assert!(!screen.windows[&0x200].icon.as_ref().unwrap().mapped);

        screen.deiconify(0x100);
        assert!(screen.windows[&0x100].icon.is_none());
        assert!(!fake.window_exists(icon.window));
        assert!(screen.windows[&0x100].state.mapped);
        assert_eq!(screen.focused, Some(0x100));
    }

    #[test]
    fn test_fullscreen_round_trip() {
        let (mut screen, _fake) = screen_with_clients(&[(0x100, "a")]);
        let before = screen.windows[&0x100].client_geometry();

        screen.fullscreen(0x100, true);
        let win = &screen.windows[&0x100];
        assert_eq!(win.client_geometry(), Geometry::new(0, 0, 1024, 768));
        assert_eq!(win.level, StackLevel::Fullscreen);
        assert_eq!(win.extents, FrameExtents::default());

        screen.fullscreen(0x100, false);
        let win = &screen.windows[&0x100];
        assert_eq!(win.client_geometry(), before);
        assert_eq!(win.level, StackLevel::Normal);
        assert_eq!(win.extents.top, 22);
    }

    #[test]
    fn test_hide_and_unhide_application() {
        let (mut screen, _fake) = screen_with_clients(&[(0x100, "a"), (0x200, "b")]);
        for w in [0x100, 0x200] {
            screen.windows.get_mut(&w).unwrap().main_window = Some(0x100);
        }
        screen.set_focus_to(Some(0x200));

        screen.hide_application(0x100);
        assert!(screen.windows[&0x100].state.hidden);
        assert!(!screen.windows[&0x200].state.mapped);
        assert_eq!(screen.focused, None);

        screen.unhide_application(0x200);
        assert!(screen.windows[&0x200].state.mapped);
        assert!(!screen.windows[&0x100].state.hidden);
    }

    #[test]
    fn test_omnipresent_updates_net_desktop() {
        let (mut screen, fake) = screen_with_clients(&[(0x100, "a")]);
        screen.set_omnipresent(0x100, true);
        assert_eq!(
            fake.property32(0x100, screen.atoms.net_wm_desktop),
            Some(vec![crate::wm::workspace::ALL_WORKSPACES])
        );
        screen.set_omnipresent(0x100, false);
        assert_eq!(fake.property32(0x100, screen.atoms.net_wm_desktop), Some(vec![0]));
    }

    #[test]
    fn test_make_visible_switches_and_restores() {
        let (mut screen, _fake) = screen_with_clients(&[(0x100, "a")]);
        screen.change_workspace(0x100, 2);
        screen.iconify(0x100);

        screen.make_visible(0x100);
        assert_eq!(screen.current_workspace(), 2);
        let win = &screen.windows[&0x100];
        assert!(!win.state.miniaturized);
        assert!(win.state.mapped);
    }
}

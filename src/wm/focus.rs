//! Focus Module
//!
//! Keeps the focus-order list and moves input focus between managed
//! windows. The list holds every managed window exactly once, most
//! recently focused first; walking it front to back visits windows from
//! the newest focus to the oldest.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::wm::error::log_and_ignore;
use crate::wm::notify::Notification;
use crate::wm::screen::Screen;
use crate::wm::xconn::{NONE, Xid, predefined};

/// Focus policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusPolicy {
    /// Click to focus
    #[serde(rename = "click")]
    ClickToFocus,
    /// Focus follows mouse, the root takes focus when the pointer leaves
    #[serde(rename = "follow")]
    FocusFollowsMouse,
    /// Sloppy focus (focus on enter, keep it on the root)
    #[serde(rename = "sloppy")]
    SloppyFocus,
}

/// Managed windows in focus order, most recent first
#[derive(Debug, Default, Clone)]
pub struct FocusList {
    order: VecDeque<Xid>,
}

impl FocusList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a newly managed window at the head
    pub fn push_front(&mut self, window: Xid) {
        self.order.retain(|&w| w != window);
        self.order.push_front(window);
    }

    pub fn remove(&mut self, window: Xid) -> bool {
        let before = self.order.len();
        self.order.retain(|&w| w != window);
        self.order.len() != before
    }

    pub fn move_to_front(&mut self, window: Xid) {
        if self.remove(window) {
            self.order.push_front(window);
        }
    }

    pub fn contains(&self, window: Xid) -> bool {
        self.order.contains(&window)
    }

    /// Most recently focused window
    pub fn head(&self) -> Option<Xid> {
        self.order.front().copied()
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, Xid> {
        self.order.iter()
    }

    /// Snapshot for walks that mutate windows along the way
    pub fn to_vec(&self) -> Vec<Xid> {
        self.order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Screen {
    /// Whether `window` may take focus right now
    ///
    /// Shaded windows count as visible, but only on the current workspace.
    pub fn can_focus(&self, window: Xid) -> bool {
        let current = self.current_workspace();
        self.focus.contains(window)
            && self.windows.get(&window).is_some_and(|win| {
                let on_screen = win.is_omnipresent() || win.workspace == current;
                on_screen && win.is_visible() && win.is_focusable()
            })
    }

    /// Give input focus to `target`, or to the root with `None`
    ///
    /// An invalid target (not managed, not on screen, not focusable)
    /// leaves focus on the root.
    pub fn set_focus_to(&mut self, target: Option<Xid>) {
        let target = match target {
            Some(window) if self.can_focus(window) => Some(window),
            Some(window) => {
                debug!("Window {:#x} cannot take focus, focusing root", window);
                None
            }
            None => None,
        };

        let old = self.focused;
        if let Some(old) = old.filter(|&old| Some(old) != target) {
            self.unfocus_window(old);
        }

        let Some(window) = target else {
            log_and_ignore(self.conn.set_input_focus(None, 0), "focus root");
            log_and_ignore(
                self.conn.change_property32(self.root, self.atoms.net_active_window, predefined::WINDOW, &[NONE]),
                "clear _NET_ACTIVE_WINDOW",
            );
            self.focused = None;
            if old.is_some() {
                self.notifications.post(Notification::WindowFocused(None));
            }
            return;
        };

        self.focus.move_to_front(window);
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        win.state.focused = true;
        let accepts_input = win.wm_hints.is_none_or(|hints| hints.accepts_input());
        let takes_focus = win.protocols.contains(crate::wm::client_flags::Protocols::TAKE_FOCUS);
        let owner = win.transient_for;
        let main_window = win.main_window;

        if takes_focus {
            self.send_protocol(window, self.atoms.wm_take_focus, 0);
        }
        if accepts_input {
            log_and_ignore(self.conn.set_input_focus(Some(window), 0), "set input focus");
        }
        log_and_ignore(
            self.conn.change_property32(self.root, self.atoms.net_active_window, predefined::WINDOW, &[window]),
            "set _NET_ACTIVE_WINDOW",
        );

        if let Some(owner) = owner.and_then(|owner| self.windows.get_mut(&owner)) {
            owner.state.semi_focused = true;
        }
        if let Some(app) = main_window.and_then(|main| self.apps.get_mut(main)) {
            app.last_focused = Some(window);
        }

        self.focused = Some(window);
        self.paint_frame(window);
        if let Some(owner) = owner {
            self.paint_frame(owner);
        }

        if old != Some(window) {
            debug!("Focus moved to {:#x}", window);
            self.notifications.post(Notification::WindowFocused(Some(window)));
        }
    }

    fn unfocus_window(&mut self, window: Xid) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        win.state.focused = false;
        let owner = win.transient_for;
        if let Some(owner) = owner.and_then(|owner| self.windows.get_mut(&owner)) {
            owner.state.semi_focused = false;
        }
        self.paint_frame(window);
        if let Some(owner) = owner {
            self.paint_frame(owner);
        }
    }

    /// Show `window` as focused without moving input focus
    ///
    /// Used while cycling, so the X focus only moves when the cycle ends.
    pub fn highlight_window(&mut self, window: Xid, previous: Option<Xid>) {
        if let Some(previous) = previous.filter(|&p| p != window) {
            if let Some(win) = self.windows.get_mut(&previous) {
                win.state.focused = false;
            }
            self.paint_frame(previous);
        }
        if let Some(win) = self.windows.get_mut(&window) {
            win.state.focused = true;
        }
        self.paint_frame(window);
    }

    /// Pointer entered a window (or the root with `None`)
    pub fn handle_enter(&mut self, window: Option<Xid>) {
        if self.flags.ignore_focus_events || self.flags.doing_alt_tab {
            return;
        }
        match (self.config.focus.mode, window) {
            (FocusPolicy::ClickToFocus, _) => {}
            (_, Some(window)) => {
                if self.focused != Some(window) {
                    self.set_focus_to(Some(window));
                }
            }
            (FocusPolicy::FocusFollowsMouse, None) => self.set_focus_to(None),
            (FocusPolicy::SloppyFocus, None) => {}
        }
    }

    /// A click on a managed window
    pub fn handle_click(&mut self, window: Xid) {
        if self.flags.doing_alt_tab {
            return;
        }
        if self.focused != Some(window) {
            self.set_focus_to(Some(window));
        }
        self.raise_window(window);
        self.commit_stacking();
    }

    /// A client grabbed focus itself; follow it in our bookkeeping
    pub fn handle_focus_in(&mut self, window: Xid) {
        if self.flags.ignore_focus_events || self.flags.doing_alt_tab {
            return;
        }
        if self.focused != Some(window) && self.can_focus(window) {
            self.set_focus_to(Some(window));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::{FakeConn, screen_with};

    #[test]
    fn test_focus_list_order() {
        let mut list = FocusList::new();
        list.push_front(1);
        list.push_front(2);
        list.push_front(3);
        assert_eq!(list.to_vec(), vec![3, 2, 1]);

        list.move_to_front(1);
        assert_eq!(list.to_vec(), vec![1, 3, 2]);
        assert!(list.remove(3));
        assert!(!list.remove(3));
        assert_eq!(list.head(), Some(1));
        list.move_to_front(42);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_set_focus_moves_to_front_and_sets_active() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        let b = fake.add_client(0x200, "b");
        screen.manage_window(a).unwrap();
        screen.manage_window(b).unwrap();

        screen.set_focus_to(Some(a));
        assert_eq!(screen.focused, Some(a));
        assert_eq!(screen.focus.head(), Some(a));
        assert!(screen.windows[&a].state.focused);
        assert_eq!(fake.input_focus(), Some(a));
        assert_eq!(
            fake.property32(screen.root, screen.atoms.net_active_window),
            Some(vec![a])
        );

        screen.set_focus_to(Some(b));
        assert!(!screen.windows[&a].state.focused);
        assert_eq!(screen.focus.to_vec(), vec![b, a]);
    }

    #[test]
    fn test_unfocusable_target_falls_back_to_root() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();
        screen.set_focus_to(Some(a));

        screen.unmap_window(a);
        screen.set_focus_to(Some(a));
        assert_eq!(screen.focused, None);
        assert_eq!(fake.input_focus(), None);

        screen.set_focus_to(Some(0xdead));
        assert_eq!(screen.focused, None);
    }

    #[test]
    fn test_click_mode_ignores_enter() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        let b = fake.add_client(0x200, "b");
        screen.manage_window(a).unwrap();
        screen.manage_window(b).unwrap();
        screen.set_focus_to(Some(a));

        screen.handle_enter(Some(b));
        assert_eq!(screen.focused, Some(a));

        screen.config.focus.mode = FocusPolicy::SloppyFocus;
        screen.handle_enter(Some(b));
        assert_eq!(screen.focused, Some(b));
        screen.handle_enter(None);
        assert_eq!(screen.focused, Some(b));

        screen.config.focus.mode = FocusPolicy::FocusFollowsMouse;
        screen.handle_enter(None);
        assert_eq!(screen.focused, None);
    }
}

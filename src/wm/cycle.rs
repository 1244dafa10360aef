//! Cycle Module
//!
//! Window cycling (Alt+Tab). A session starts on a cycling binding, sees
//! every event before normal dispatch while the binding's modifier is
//! held, and ends on release, Return, Escape, a click on the panel or an
//! unrelated key.

use tracing::debug;

use crate::wm::client_flags::Attributes;
use crate::wm::error::{log_and_ignore, log_warn};
use crate::wm::keyboard::{KeyBinding, KeyboardAction, keysym};
use crate::wm::screen::Screen;
use crate::wm::switchpanel::SwitchPanel;
use crate::wm::xconn::{XConn, XEvent, Xid};

/// What a key press means inside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKey {
    /// Step to the next (or previous with `back`) entry
    Step { back: bool },
    First,
    Last,
    Cancel,
    Confirm,
    /// Shift: changes direction of the binding but does nothing alone
    Modifier,
    /// Ends the session; the key is then handled normally
    Other,
}

/// Keycodes the session reacts to, resolved when it starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleKeys {
    left: Option<u8>,
    right: Option<u8>,
    home: Option<u8>,
    end: Option<u8>,
    escape: Option<u8>,
    enter: Option<u8>,
    shift_l: Option<u8>,
    shift_r: Option<u8>,
    next: Option<KeyBinding>,
    prev: Option<KeyBinding>,
}

impl CycleKeys {
    pub fn resolve(conn: &dyn XConn, next: Option<KeyBinding>, prev: Option<KeyBinding>) -> Self {
        let code = |sym| conn.keysym_to_keycode(sym);
        Self {
            left: code(keysym::LEFT),
            right: code(keysym::RIGHT),
            home: code(keysym::HOME),
            end: code(keysym::END),
            escape: code(keysym::ESCAPE),
            enter: code(keysym::RETURN),
            shift_l: code(keysym::SHIFT_L),
            shift_r: code(keysym::SHIFT_R),
            next,
            prev,
        }
    }

    fn is(key: Option<u8>, keycode: u8) -> bool {
        key == Some(keycode)
    }

    fn is_shift(&self, keycode: u8) -> bool {
        Self::is(self.shift_l, keycode) || Self::is(self.shift_r, keycode)
    }

    pub fn classify_press(&self, keycode: u8, state: u16) -> CycleKey {
        if self.next.is_some_and(|b| b.matches(keycode, state)) || Self::is(self.right, keycode) {
            CycleKey::Step { back: false }
        } else if self.prev.is_some_and(|b| b.matches(keycode, state)) || Self::is(self.left, keycode) {
            CycleKey::Step { back: true }
        } else if Self::is(self.home, keycode) {
            CycleKey::First
        } else if Self::is(self.end, keycode) {
            CycleKey::Last
        } else if Self::is(self.escape, keycode) {
            CycleKey::Cancel
        } else if Self::is(self.enter, keycode) {
            CycleKey::Confirm
        } else if self.is_shift(keycode) {
            CycleKey::Modifier
        } else {
            CycleKey::Other
        }
    }

    /// Whether releasing `keycode` ends the session
    ///
    /// Releasing the binding's modifier does; the arrows, Return, and the
    /// bound keys themselves don't. Shift only ends it without
    /// `strict_windoze_cycle`.
    pub fn release_ends(&self, keycode: u8, strict: bool) -> bool {
        if self.is_shift(keycode) {
            return !strict;
        }
        let bound = [self.next, self.prev]
            .iter()
            .flatten()
            .any(|binding| binding.keycode == keycode);
        !(bound
            || Self::is(self.left, keycode)
            || Self::is(self.right, keycode)
            || Self::is(self.enter, keycode))
    }
}

/// One Alt+Tab session
#[derive(Debug, Clone)]
pub struct CycleSession {
    /// Window focused before the session
    start: Option<Xid>,
    class_only: bool,
    keys: CycleKeys,
    panel: SwitchPanel,
    grabbed: bool,
    cancelled: bool,
    /// Stacking model from before the session, for Escape
    stacking_before: Vec<Xid>,
}

impl CycleSession {
    pub fn selected(&self) -> Option<Xid> {
        self.panel.selected()
    }

    pub fn start_window(&self) -> Option<Xid> {
        self.start
    }

    pub fn panel(&self) -> &SwitchPanel {
        &self.panel
    }

    /// Drop a window that stopped being managed mid-session
    pub fn forget(&mut self, window: Xid) {
        self.panel.remove(window);
        if self.start == Some(window) {
            self.start = None;
        }
        self.stacking_before.retain(|&w| w != window);
    }
}

impl Screen {
    /// Windows offered by a session started on `current`, most recently
    /// focused first
    pub fn cycle_candidates(&self, current: Xid, class_only: bool) -> Vec<Xid> {
        let workspace = self.current_workspace();
        let Some(reference) = self.windows.get(&current) else {
            return Vec::new();
        };
        let mut seen_apps = Vec::new();
        let mut candidates = Vec::new();
        for &window in self.focus.iter() {
            let Some(win) = self.windows.get(&window) else {
                continue;
            };
            let here = win.workspace == workspace || win.is_omnipresent();
            let reachable =
                win.state.mapped || win.state.shaded || win.state.miniaturized || win.state.hidden;
            if !here || !reachable || !win.is_focusable() || win.wflag(Attributes::SKIP_SWITCHPANEL) {
                continue;
            }
            if class_only {
                if window != current && !reference.same_class(win) {
                    continue;
                }
            } else if self.config.cycling.by_application {
                if let Some(main) = win.main_window {
                    if seen_apps.contains(&main) {
                        continue;
                    }
                    seen_apps.push(main);
                }
            }
            candidates.push(window);
        }
        candidates
    }

    /// Begin cycling from the focused window
    ///
    /// With one candidate or none there is no session: the single window
    /// (if any) is switched to directly.
    pub fn start_cycle(&mut self, next: bool, class_only: bool) {
        if self.flags.doing_alt_tab || self.cycle.is_some() {
            return;
        }
        let Some(current) = self.focused.or_else(|| self.focus.head()) else {
            return;
        };
        let candidates = self.cycle_candidates(current, class_only);
        if candidates.len() <= 1 {
            if let Some(&only) = candidates.first() {
                self.switch_window(only, class_only);
            }
            return;
        }

        let (next_action, prev_action) = if class_only {
            (KeyboardAction::GroupNext, KeyboardAction::GroupPrev)
        } else {
            (KeyboardAction::FocusNext, KeyboardAction::FocusPrev)
        };
        let next_binding = self.keyboard.binding(next_action);
        let prev_binding = self.keyboard.binding(prev_action);
        let binding = if next { next_binding } else { prev_binding };
        let has_modifier = binding.is_some_and(|b| b.modifiers != 0);
        let grabbed = has_modifier && log_warn(self.conn.grab_keyboard(), "grab keyboard").unwrap_or(false);
        self.flags.doing_alt_tab = true;

        let mut session = CycleSession {
            start: Some(current),
            class_only,
            keys: CycleKeys::resolve(self.conn.as_ref(), next_binding, prev_binding),
            panel: SwitchPanel::new(candidates, Some(current), self.width),
            grabbed,
            cancelled: false,
            stacking_before: self.stacking.requested().to_vec(),
        };
        if !class_only && self.config.cycling.show_panel {
            self.show_switch_panel(&mut session.panel);
        }

        let current_mapped = self.windows.get(&current).is_some_and(|win| win.state.mapped);
        let selected = if current_mapped && !self.config.cycling.panel_only_open {
            if self.windows.get(&current).is_some_and(|win| win.is_gnustep()) {
                session.panel.select_first(false);
            }
            let skip = self.cycle_skip();
            session.panel.select_next(!next, skip)
        } else {
            session.panel.select_first(false)
        };
        self.cycle_select(&session, selected, Some(current));
        debug!("Cycling started at {:#x} ({} entries)", current, session.panel.len());

        if has_modifier {
            self.cycle = Some(session);
        } else {
            self.finish_cycle(session);
        }
    }

    /// Entries that stepping passes over
    fn cycle_skip(&self) -> impl Fn(Xid) -> bool + '_ {
        let ignore = self.config.cycling.ignore_minimized;
        move |window| {
            ignore
                && self
                    .windows
                    .get(&window)
                    .is_some_and(|win| win.state.miniaturized || win.state.hidden)
        }
    }

    /// Show a new selection: highlight, raise live, redraw the panel
    fn cycle_select(&mut self, session: &CycleSession, selected: Option<Xid>, previous: Option<Xid>) {
        let Some(window) = selected else {
            return;
        };
        self.highlight_window(window, previous);
        let gnustep = self.windows.get(&window).is_some_and(|win| win.is_gnustep());
        if self.config.focus.circulate_raise && !gnustep {
            self.raise_window(window);
            self.commit_stacking();
            let frame = self.windows.get(&window).map(|win| win.frame);
            if let (Some(panel), Some(frame)) = (session.panel.window, frame) {
                log_and_ignore(self.conn.restack(&[panel, frame]), "keep switch panel on top");
            }
        }
        self.paint_switch_panel(&session.panel);
    }

    /// Route an event through the running session
    ///
    /// Returns true when the session consumed it. Unrelated events return
    /// false and are handled normally; a key that ends the session also
    /// returns false so it reaches its usual handler.
    pub fn cycle_event(&mut self, event: &XEvent) -> bool {
        let Some(mut session) = self.cycle.take() else {
            return false;
        };
        let mut done = false;
        let mut consumed = true;

        match event {
            XEvent::KeyPress(key) => match session.keys.classify_press(key.keycode, key.state) {
                CycleKey::Step { back } => {
                    let previous = session.panel.selected();
                    let selected = {
                        let skip = self.cycle_skip();
                        session.panel.select_next(back, skip)
                    };
                    self.cycle_select(&session, selected, previous);
                }
                edge @ (CycleKey::First | CycleKey::Last) => {
                    let previous = session.panel.selected();
                    let selected = session.panel.select_first(edge == CycleKey::Last);
                    self.cycle_select(&session, selected, previous);
                }
                CycleKey::Cancel => {
                    session.cancelled = true;
                    done = true;
                }
                CycleKey::Confirm => done = true,
                CycleKey::Modifier => {}
                CycleKey::Other => {
                    done = true;
                    consumed = false;
                }
            },
            XEvent::KeyRelease(key) => {
                done = session.keys.release_ends(key.keycode, self.config.cycling.strict_windoze_cycle);
            }
            XEvent::MotionNotify(ptr) | XEvent::ButtonRelease(ptr) => {
                if Some(ptr.window) == session.panel.window {
                    let previous = session.panel.selected();
                    if let Some(selected) = session.panel.select_at(ptr.event_x) {
                        self.cycle_select(&session, Some(selected), previous);
                    }
                    if matches!(event, XEvent::ButtonRelease(_)) && session.panel.tile_at(ptr.event_x).is_some() {
                        done = true;
                    }
                }
            }
            XEvent::EnterNotify(_) | XEvent::LeaveNotify(_) => {}
            _ => consumed = false,
        }

        if done || session.panel.is_empty() {
            self.finish_cycle(session);
        } else {
            self.cycle = Some(session);
        }
        consumed
    }

    /// End any running session as if Escape was pressed
    pub fn cancel_cycle(&mut self) {
        if let Some(mut session) = self.cycle.take() {
            session.cancelled = true;
            self.finish_cycle(session);
        }
    }

    fn finish_cycle(&mut self, mut session: CycleSession) {
        if session.grabbed {
            log_and_ignore(self.conn.ungrab_keyboard(), "ungrab keyboard");
        }
        self.destroy_switch_panel(&mut session.panel);

        let start = session.start.filter(|w| self.windows.contains_key(w));
        if session.cancelled {
            let before: Vec<Xid> = session
                .stacking_before
                .iter()
                .copied()
                .filter(|w| self.windows.contains_key(w))
                .collect();
            self.stacking.replace(before);
            self.commit_stacking();
            if let Some(selected) = session.panel.selected().filter(|&w| Some(w) != start) {
                if let Some(win) = self.windows.get_mut(&selected) {
                    win.state.focused = false;
                }
                self.paint_frame(selected);
            }
            self.set_focus_to(start);
        } else if let Some(selected) = session.panel.selected() {
            self.switch_window(selected, session.class_only);
        }

        self.flags.doing_alt_tab = false;
        debug!("Cycling finished (cancelled: {})", session.cancelled);
    }

    /// Bring a window forward and focus it, unhiding its application
    pub fn switch_window(&mut self, window: Xid, class_only: bool) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let mapped = win.state.mapped;
        let app_hidden = win
            .main_window
            .and_then(|main| self.apps.get(main))
            .is_some_and(|app| app.hidden);
        if app_hidden && !class_only {
            self.unhide_application(window);
        }
        self.raise_window(window);
        self.commit_stacking();
        if !mapped {
            self.make_visible(window);
        }
        self.set_focus_to(Some(window));
    }
}

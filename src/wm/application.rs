//! Applications
//!
//! Windows sharing a leader (WM_HINTS window group, WM_CLIENT_LEADER or
//! a synthetic fake leader) form one application. Entries are reference
//! counted by the windows that name the leader as their main window.

use anyhow::Result;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::shared::Geometry;
use crate::wm::client_flags::Attributes;
use crate::wm::error::log_and_ignore;
use crate::wm::screen::Screen;
use crate::wm::window::WindowRecord;
use crate::wm::xconn::{NONE, SurfaceSpec, XConn, Xid};

/// How long one round of the urgent bounce lasts
pub const BOUNCE_DURATION: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub main_window: Xid,
    refcount: usize,
    pub last_workspace: usize,
    pub last_focused: Option<Xid>,
    pub hidden: bool,
    /// The app has no icon window of its own; we show one for it
    pub emulated_appicon: bool,
    /// A WindowMaker application menu is attached to the leader
    pub has_menu: bool,
    /// WM_COMMAND of the leader, for relaunching
    pub command: Option<Vec<String>>,
    /// Bouncing for attention until this instant
    pub bounce_until: Option<Instant>,
}

impl Application {
    fn new(main_window: Xid, workspace: usize) -> Self {
        Self {
            main_window,
            refcount: 1,
            last_workspace: workspace,
            last_focused: None,
            hidden: false,
            emulated_appicon: false,
            has_menu: false,
            command: None,
            bounce_until: None,
        }
    }

    pub fn refcount(&self) -> usize {
        self.refcount
    }

    pub fn is_bouncing(&self) -> bool {
        self.bounce_until.is_some()
    }
}

/// Synthetic leader shared by windows of one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeGroup {
    pub leader: Xid,
    /// Leader the first member named, if any
    pub orig_leader: Option<Xid>,
    pub retain_count: usize,
}

#[derive(Debug, Default)]
pub struct ApplicationRegistry {
    apps: HashMap<Xid, Application>,
    /// By "instance.class"
    fake_groups: HashMap<String, FakeGroup>,
}

impl ApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more window for the leader `main_window`
    ///
    /// Rejects None, the root and leaders that no longer exist.
    pub fn create(&mut self, conn: &dyn XConn, main_window: Xid, workspace: usize) -> Option<&mut Application> {
        if main_window == NONE || main_window == conn.root() {
            return None;
        }
        if let Some(app) = self.apps.get_mut(&main_window) {
            app.refcount += 1;
            return self.apps.get_mut(&main_window);
        }
        if !conn.window_exists(main_window) {
            debug!("Leader {:#x} is gone, no application", main_window);
            return None;
        }
        debug!("New application for leader {:#x}", main_window);
        Some(
            self.apps
                .entry(main_window)
                .or_insert_with(|| Application::new(main_window, workspace)),
        )
    }

    /// Drop one reference; returns true when the application went away
    pub fn destroy(&mut self, main_window: Xid) -> bool {
        let Some(app) = self.apps.get_mut(&main_window) else {
            return false;
        };
        app.refcount = app.refcount.saturating_sub(1);
        if app.refcount == 0 {
            self.apps.remove(&main_window);
            debug!("Application {:#x} destroyed", main_window);
            return true;
        }
        false
    }

    pub fn get(&self, main_window: Xid) -> Option<&Application> {
        self.apps.get(&main_window)
    }

    pub fn get_mut(&mut self, main_window: Xid) -> Option<&mut Application> {
        self.apps.get_mut(&main_window)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Application> {
        self.apps.values()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn fake_group(&self, key: &str) -> Option<&FakeGroup> {
        self.fake_groups.get(key)
    }

    /// Start bouncing `main_window` if any of its windows is urgent
    pub fn bounce_while_urgent(&mut self, main_window: Xid, windows: &HashMap<Xid, WindowRecord>, now: Instant) {
        let urgent = windows
            .values()
            .any(|win| win.main_window == Some(main_window) && win.state.urgent);
        if let Some(app) = self.apps.get_mut(&main_window) {
            app.bounce_until = urgent.then_some(now + BOUNCE_DURATION);
        }
    }

    /// Stop bouncing applications whose round is over and that are no
    /// longer urgent; still-urgent ones start another round
    pub fn expire_bounces(&mut self, now: Instant, windows: &HashMap<Xid, WindowRecord>) {
        for app in self.apps.values_mut() {
            let Some(until) = app.bounce_until else {
                continue;
            };
            if now < until {
                continue;
            }
            let urgent = windows
                .values()
                .any(|win| win.main_window == Some(app.main_window) && win.state.urgent);
            app.bounce_until = urgent.then_some(now + BOUNCE_DURATION);
        }
    }
}

/// Key for fake-group sharing
pub fn class_key(win: &WindowRecord) -> Option<String> {
    let instance = win.wm_instance.as_deref()?;
    let class = win.wm_class.as_deref()?;
    Some(format!("{instance}.{class}"))
}

impl Screen {
    /// Register `window` with the application named by its main window
    pub(crate) fn application_create(&mut self, window: Xid) {
        let workspace = self.current_workspace();
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let Some(main) = win.main_window else {
            return;
        };
        let emulate = win.wflag(Attributes::EMULATE_APPICON);
        let command = self.windows.get(&main).and_then(|leader| leader.command.clone());
        if let Some(app) = self.apps.create(self.conn.as_ref(), main, workspace) {
            app.emulated_appicon |= emulate;
            if app.command.is_none() {
                app.command = command;
            }
        }
    }

    pub(crate) fn application_destroy(&mut self, main_window: Option<Xid>) {
        if let Some(main) = main_window {
            self.apps.destroy(main);
        }
    }

    /// Leader for a shared-appicon window, created on first use
    pub(crate) fn join_fake_group(&mut self, window: Xid) -> Result<Option<Xid>> {
        let Some(win) = self.windows.get(&window) else {
            return Ok(None);
        };
        if !win.wflag(Attributes::SHARED_APPICON) {
            return Ok(None);
        }
        let Some(key) = class_key(win) else {
            return Ok(None);
        };
        let orig_leader = win.main_window;

        let leader = match self.apps.fake_groups.get_mut(&key) {
            Some(group) if group.leader != NONE => {
                group.retain_count += 1;
                group.leader
            }
            _ => {
                let leader = self.conn.create_surface(&SurfaceSpec {
                    geometry: Geometry::new(-10, -10, 1, 1),
                    border_width: 0,
                    background: 0,
                    border_color: 0,
                    override_redirect: true,
                })?;
                self.apps.fake_groups.insert(
                    key.clone(),
                    FakeGroup {
                        leader,
                        orig_leader,
                        retain_count: 1,
                    },
                );
                leader
            }
        };

        if let Some(win) = self.windows.get_mut(&window) {
            win.fake_group = Some(leader);
            win.main_window = Some(leader);
        }
        debug!("{:#x} joined fake group {} ({:#x})", window, key, leader);
        Ok(Some(leader))
    }

    /// A member of a fake group is going away
    pub(crate) fn leave_fake_group(&mut self, window: Xid) {
        let Some(leader) = self.windows.get(&window).and_then(|win| win.fake_group) else {
            return;
        };
        let Some((key, group)) = self.apps.fake_groups.iter_mut().find(|(_, g)| g.leader == leader) else {
            return;
        };
        group.retain_count = group.retain_count.saturating_sub(1);
        if group.retain_count == 0 {
            let key = key.clone();
            self.apps.fake_groups.remove(&key);
            log_and_ignore(self.conn.destroy_window(leader), "destroy fake leader");
        }
    }

    /// Split a fake group back into the members' own applications
    ///
    /// Each member falls back to its window group, then its client
    /// leader, then itself when it emulates an appicon.
    pub(crate) fn dissolve_fake_group(&mut self, leader: Xid) {
        self.application_destroy(Some(leader));

        let members: Vec<Xid> = self
            .focus
            .iter()
            .copied()
            .filter(|w| self.windows.get(w).is_some_and(|win| win.fake_group == Some(leader)))
            .collect();

        for window in members {
            let Some(win) = self.windows.get_mut(&window) else {
                continue;
            };
            win.client_flags.set(Attributes::SHARED_APPICON, false);
            win.user_flags.set(Attributes::SHARED_APPICON, false);
            win.fake_group = None;
            win.main_window = win
                .group_id
                .or(win.client_leader)
                .or_else(|| win.wflag(Attributes::EMULATE_APPICON).then_some(win.client));
            if win.main_window.is_some() {
                self.application_create(window);
            }
        }

        self.apps.fake_groups.retain(|_, group| group.leader != leader);
        log_and_ignore(self.conn.destroy_window(leader), "destroy fake leader");
        if self.config.icons.auto_arrange {
            self.arrange_icons(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::{FakeConn, screen_with};

    #[test]
    fn test_refcounted_create_destroy() {
        let fake = FakeConn::new();
        let leader = fake.add_client(0x100, "leader");
        let mut apps = ApplicationRegistry::new();

        assert!(apps.create(&fake, leader, 0).is_some());
        assert!(apps.create(&fake, leader, 0).is_some());
        assert_eq!(apps.get(leader).unwrap().refcount(), 2);

        assert!(!apps.destroy(leader));
        assert!(apps.destroy(leader));
        assert!(apps.get(leader).is_none());
        assert!(!apps.destroy(leader));
    }

    #[test]
    fn test_create_rejects_bad_leaders() {
        let fake = FakeConn::new();
        let mut apps = ApplicationRegistry::new();
        assert!(apps.create(&fake, NONE, 0).is_none());
        assert!(apps.create(&fake, fake.root(), 0).is_none());
        assert!(apps.create(&fake, 0xdead, 0).is_none());
        assert!(apps.is_empty());
    }

    #[test]
    fn test_bounce_follows_urgency() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();
        screen.windows.get_mut(&a).unwrap().main_window = Some(a);
        screen.application_create(a);

        let now = Instant::now();
        screen.windows.get_mut(&a).unwrap().state.urgent = true;
        screen.apps.bounce_while_urgent(a, &screen.windows, now);
        assert!(screen.apps.get(a).unwrap().is_bouncing());

        screen.windows.get_mut(&a).unwrap().state.urgent = false;
        screen.apps.expire_bounces(now + BOUNCE_DURATION, &screen.windows);
        assert!(!screen.apps.get(a).unwrap().is_bouncing());
    }

    #[test]
    fn test_fake_group_shared_and_dissolved() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "term");
        let b = fake.add_client(0x200, "term");
        for w in [a, b] {
            screen.manage_window(w).unwrap();
            screen.windows.get_mut(&w).unwrap().user_flags.set(Attributes::SHARED_APPICON, true);
        }

        let leader = screen.join_fake_group(a).unwrap().unwrap();
        assert_eq!(screen.join_fake_group(b).unwrap(), Some(leader));
        assert_eq!(screen.apps.fake_group("term.Term").unwrap().retain_count, 2);

        screen.windows.get_mut(&b).unwrap().group_id = Some(0x200);
        screen.dissolve_fake_group(leader);
        assert_eq!(screen.windows[&a].fake_group, None);
        assert_eq!(screen.windows[&a].main_window, None);
        assert_eq!(screen.windows[&b].main_window, Some(0x200));
        assert!(screen.apps.fake_group("term.Term").is_none());
        assert!(!fake.window_exists(leader));
    }
}

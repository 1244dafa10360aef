//! Manage and unmanage
//!
//! Turning a raw top-level client into a framed, tracked window and back.

use anyhow::Result;
use tracing::{debug, info};

use crate::config::WindowRule;
use crate::wm::client_flags::{AttributeSet, Attributes, MaxFlags, Protocols, StackLevel};
use crate::wm::error::{WmError, log_and_ignore, log_warn};
use crate::wm::hints::{WmState, decode_class};
use crate::wm::screen::Screen;
use crate::wm::window::WindowRecord;
use crate::wm::workspace::ALL_WORKSPACES;
use crate::wm::xconn::{ANY_PROPERTY_TYPE, Xid, predefined};

/// Fold the matching config rules into the user attribute layer
fn apply_rules<'a>(flags: &mut AttributeSet, rules: impl Iterator<Item = &'a WindowRule>) {
    for rule in rules {
        let settings = [
            (Attributes::NO_TITLEBAR, rule.no_titlebar),
            (Attributes::NO_RESIZEBAR, rule.no_resizebar),
            (Attributes::NO_BORDER, rule.no_border),
            (Attributes::NO_FOCUSABLE, rule.no_focusable),
            (Attributes::OMNIPRESENT, rule.omnipresent),
            (Attributes::FLOATING, rule.floating),
            (Attributes::SUNKEN, rule.sunken),
            (Attributes::SKIP_WINDOW_LIST, rule.skip_window_list),
            (Attributes::SKIP_SWITCHPANEL, rule.skip_switchpanel),
            (Attributes::START_HIDDEN, rule.start_hidden),
            (Attributes::START_MINIATURIZED, rule.start_miniaturized),
            (Attributes::START_MAXIMIZED, rule.start_maximized),
            (Attributes::DONT_SAVE_SESSION, rule.dont_save_session),
            (Attributes::EMULATE_APPICON, rule.emulate_appicon),
            (Attributes::SHARED_APPICON, rule.shared_appicon),
            (Attributes::KILL_CLOSE, rule.kill_close),
        ];
        for (attr, value) in settings {
            if let Some(value) = value {
                flags.set(attr, value);
            }
        }
    }
}

impl Screen {
    /// Start managing a top-level client window
    ///
    /// Windows that vanished before we got to them are reported as
    /// [`WmError::WindowGone`] and left alone. Override-redirect windows
    /// are ignored.
    pub fn manage_window(&mut self, window: Xid) -> Result<()> {
        if self.windows.contains_key(&window) || window == self.root {
            return Ok(());
        }
        let Some(attrs) = log_warn(self.conn.get_window_attributes(window), "window attributes").flatten() else {
            return Err(WmError::WindowGone(window).into());
        };
        if attrs.override_redirect {
            return Ok(());
        }
        if self.conn.watch_client(window).is_err() {
            return Err(WmError::WindowGone(window).into());
        }

        let current = self.current_workspace();
        let mut win = WindowRecord::new(window, attrs.geometry, current);
        win.old_border_width = attrs.border_width;

        let net_title = self.read_text(window, self.atoms.net_wm_name);
        win.state.net_has_title = net_title.is_some();
        win.title = net_title.or_else(|| self.read_text(window, predefined::WM_NAME));
        win.icon_title = self
            .read_text(window, self.atoms.net_wm_icon_name)
            .or_else(|| self.read_text(window, predefined::WM_ICON_NAME));
        if let Some((instance, class)) = log_warn(
            self.conn.get_property8(window, predefined::WM_CLASS, ANY_PROPERTY_TYPE),
            "read WM_CLASS",
        )
        .flatten()
        .and_then(|bytes| decode_class(&bytes))
        {
            win.wm_instance = Some(instance);
            win.wm_class = Some(class);
        }
        win.command = self.read_command(window);
        win.wm_hints = self.read_wm_hints(window);
        win.protocols = self.read_protocols(window);
        win.client_flags.set(
            Attributes::KILL_CLOSE,
            !win.protocols.contains(Protocols::DELETE_WINDOW),
        );
        win.transient_for = self.read_transient_for(window);
        win.client_leader = self.read_client_leader(window);
        win.strut = self.read_strut(window);
        apply_rules(
            &mut win.user_flags,
            self.config
                .rules_for(win.wm_instance.as_deref(), win.wm_class.as_deref()),
        );
        if win.transient_for.is_some() {
            win.user_flags.set(Attributes::NO_MINIATURIZABLE, true);
            win.user_flags.set(Attributes::NO_MINIATURIZE_BUTTON, true);
        }

        win.group_id = win.wm_hints.and_then(|hints| hints.group());
        win.main_window = win
            .group_id
            .or(win.client_leader)
            .or_else(|| win.wflag(Attributes::EMULATE_APPICON).then_some(window));
        win.state.urgent = win.wm_hints.is_some_and(|hints| hints.is_urgent());

        win.level = if win.wflag(Attributes::FLOATING) {
            StackLevel::Floating
        } else if win.wflag(Attributes::SUNKEN) {
            StackLevel::Sunken
        } else {
            StackLevel::Normal
        };

        let owner_workspace = win
            .transient_for
            .and_then(|owner| self.windows.get(&owner))
            .map(|owner| {
                if owner.is_omnipresent() {
                    ALL_WORKSPACES
                } else {
                    owner.workspace as u32
                }
            });
        match owner_workspace.or_else(|| self.read_net_desktop(window)) {
            Some(ALL_WORKSPACES) => win.state.omnipresent = true,
            Some(ws) if (ws as usize) < self.workspaces.count() => win.workspace = ws as usize,
            Some(ws) => debug!("{:#x} asked for missing workspace {}", window, ws),
            None => {}
        }
        if win.is_omnipresent() {
            win.workspace = current;
        }

        self.windows.insert(window, win);

        if let Some(geometry) = self.get_normal_hints(window, true) {
            if let Some(win) = self.windows.get_mut(&window) {
                win.frame_x = geometry.x;
                win.frame_y = geometry.y;
                win.width = geometry.width.max(1);
                win.height = geometry.height.max(1);
                win.old_geometry = win.client_geometry();
            }
        }
        if let Some(attrs) = self.read_gnustep_attributes(window) {
            self.apply_gnustep_attributes(window, attrs);
        }

        if let Err(e) = self.create_frame(window) {
            self.windows.remove(&window);
            debug!("Could not frame {:#x}: {:#}", window, e);
            return Err(WmError::WindowGone(window).into());
        }

        self.focus.push_front(window);
        self.stacking.add_window(window);

        log_and_ignore(self.join_fake_group(window).map(|_| ()), "join fake group");
        self.application_create(window);

        let (workspace, on_screen, iconic, hidden, maximized) = {
            let win = &self.windows[&window];
            let app_hidden = win
                .main_window
                .and_then(|main| self.apps.get(main))
                .is_some_and(|app| app.hidden);
            (
                win.workspace,
                win.is_omnipresent() || win.workspace == current,
                win.wm_hints.is_some_and(|hints| hints.starts_iconic()) || win.wflag(Attributes::START_MINIATURIZED),
                win.wflag(Attributes::START_HIDDEN) || app_hidden,
                win.wflag(Attributes::START_MAXIMIZED),
            )
        };

        self.update_net_wm_desktop(window);
        self.update_frame_extents(window);

        if maximized {
            self.maximize(window, MaxFlags::HORIZONTAL | MaxFlags::VERTICAL);
        }
        if iconic {
            self.iconify(window);
        } else if hidden {
            if let Some(win) = self.windows.get_mut(&window) {
                win.state.hidden = true;
            }
            self.set_wm_state(window, WmState::Iconic);
        } else if on_screen {
            self.map_window(window);
        } else {
            log_and_ignore(self.conn.map(window), "map client");
            self.set_wm_state(window, WmState::Normal);
        }

        self.update_client_list();
        if self.windows.get(&window).is_some_and(|win| win.strut.is_some()) {
            self.update_usable_area();
        }
        info!(
            "Managing {:#x} ({}) on workspace {}",
            window,
            self.windows[&window].display_title(),
            workspace
        );
        Ok(())
    }

    /// Stop managing a window
    ///
    /// With `restore` the client is handed back to the root as it was
    /// (shutdown); otherwise the client withdrew or died and only our
    /// resources go away.
    pub fn unmanage_window(&mut self, window: Xid, restore: bool) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let was_focused = self.focused == Some(window);
        let was_mapped = win.state.mapped || win.state.shaded;
        let main_window = win.main_window;
        let had_strut = win.strut.is_some();
        debug!("Unmanaging {:#x}", window);

        if let Some(cycle) = self.cycle.as_mut() {
            cycle.forget(window);
        }
        self.leave_fake_group(window);
        self.application_destroy(main_window);
        self.destroy_icon(window);

        if self.conn.window_exists(window) {
            self.restore_client(window);
            if restore {
                log_and_ignore(self.conn.map(window), "map restored client");
            } else {
                log_and_ignore(
                    self.conn.delete_property(window, self.atoms.net_wm_desktop),
                    "drop _NET_WM_DESKTOP",
                );
                self.set_wm_state(window, WmState::Withdrawn);
            }
        }
        self.destroy_frame(window);

        self.windows.remove(&window);
        self.focus.remove(window);
        self.stacking.remove_window(window);
        self.workspace_map.remove(&window);
        for other in self.windows.values_mut() {
            if other.transient_for == Some(window) {
                other.transient_for = Some(self.root);
            }
        }

        if was_focused {
            self.focused = None;
            if !restore {
                let next = self.focus_candidate();
                self.set_focus_to(next);
            }
        }
        if !restore {
            self.update_client_list();
            if had_strut {
                self.update_usable_area();
            }
            if was_mapped {
                self.commit_stacking();
            }
        }
    }

    /// Best window to take over focus: the most recent one on screen
    pub(crate) fn focus_candidate(&self) -> Option<Xid> {
        self.focus.iter().copied().find(|&w| self.can_focus(w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::hints::WmHintsFlags;
    use crate::wm::testing::{FakeConn, screen_with};
    use crate::wm::xconn::XConn;

    #[test]
    fn test_manage_reads_class_and_maps() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "xterm");
        screen.manage_window(a).unwrap();

        let win = &screen.windows[&a];
        assert_eq!(win.wm_instance.as_deref(), Some("xterm"));
        assert_eq!(win.wm_class.as_deref(), Some("Xterm"));
        assert_eq!(win.title.as_deref(), Some("xterm"));
        assert!(win.state.mapped);
        assert_eq!(win.wm_state, WmState::Normal);
        assert!(fake.is_mapped(win.frame));
        assert!(screen.focus.contains(a));
        assert_eq!(
            fake.property32(screen.root, screen.atoms.net_client_list),
            Some(vec![a])
        );
    }

    #[test]
    fn test_manage_vanished_window_fails_quietly() {
        let (mut screen, _fake) = screen_with(FakeConn::new());
        let err = screen.manage_window(0xdead).unwrap_err();
        assert!(matches!(err.downcast_ref::<WmError>(), Some(WmError::WindowGone(0xdead))));
        assert!(screen.windows.is_empty());
        assert!(screen.focus.is_empty());
    }

    #[test]
    fn test_config_rule_applies_user_flags() {
        let fake = FakeConn::new();
        let mut config = crate::wm::testing::test_config();
        config.windows.push(WindowRule {
            class: "Xclock".into(),
            no_titlebar: Some(true),
            omnipresent: Some(true),
            ..Default::default()
        });
        let (mut screen, fake) = crate::wm::testing::screen_with_config(fake, config);
        let a = fake.add_client(0x100, "xclock");
        screen.manage_window(a).unwrap();
        let win = &screen.windows[&a];
        assert!(!win.has_titlebar());
        assert!(win.is_omnipresent());
        assert_eq!(win.extents.top, 0);
    }

    #[test]
    fn test_iconic_hint_starts_miniaturized() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        fake.set_property32(a, predefined::WM_HINTS, &[WmHintsFlags::STATE.bits(), 0, 3, 0, 0, 0, 0, 0, 0]);
        screen.manage_window(a).unwrap();
        let win = &screen.windows[&a];
        assert!(win.state.miniaturized);
        assert!(!win.state.mapped);
        assert!(win.icon.is_some());
        assert_eq!(win.wm_state, WmState::Iconic);
    }

    #[test]
    fn test_net_wm_desktop_places_window() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        fake.set_property32(a, screen.atoms.net_wm_desktop, &[2]);
        screen.manage_window(a).unwrap();
        assert_eq!(screen.windows[&a].workspace, 2);
        assert!(!screen.windows[&a].state.mapped);

        let b = fake.add_client(0x200, "b");
        fake.set_property32(b, screen.atoms.net_wm_desktop, &[ALL_WORKSPACES]);
        screen.manage_window(b).unwrap();
        assert!(screen.windows[&b].is_omnipresent());
        assert!(screen.windows[&b].state.mapped);
    }

    #[test]
    fn test_unmanage_keeps_focus_list_in_sync() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        let b = fake.add_client(0x200, "b");
        screen.manage_window(a).unwrap();
        screen.manage_window(b).unwrap();
        screen.set_focus_to(Some(b));

        fake.destroy(b);
        screen.unmanage_window(b, false);
        assert!(!screen.focus.contains(b));
        assert!(!screen.windows.contains_key(&b));
        assert_eq!(screen.focused, Some(a));
        assert_eq!(screen.focus.len(), screen.windows.len());
    }

    #[test]
    fn test_focus_skips_shaded_window_on_other_workspace() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        let b = fake.add_client(0x200, "b");
        screen.manage_window(a).unwrap();
        screen.manage_window(b).unwrap();
        screen.shade(a);
        screen.change_workspace(b, 1);
        screen.switch_workspace(1);
        assert_eq!(screen.focused, Some(b));
        assert!(!screen.can_focus(a));

        fake.destroy(b);
        screen.unmanage_window(b, false);
        assert_eq!(screen.focused, None);
    }

    #[test]
    fn test_withdrawn_client_goes_back_to_root() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();
        let frame = screen.windows[&a].frame;

        screen.unmanage_window(a, false);
        assert_eq!(fake.parent(a), Some(screen.root));
        assert!(!fake.window_exists(frame));
        assert_eq!(
            fake.property32(a, screen.atoms.wm_state),
            Some(WmState::Withdrawn.encode(0).to_vec())
        );
    }
}

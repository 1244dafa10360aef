//! Workspace Module
//!
//! Manages virtual desktops: creation and deletion, names, switching, the
//! per-workspace clip and the session state they are saved to.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use nextwm_ipc::helper::HelperMessage;

use crate::shared::Geometry;
use crate::wm::error::{WmError, log_and_ignore, log_warn};
use crate::wm::focus::FocusPolicy;
use crate::wm::notify::Notification;
use crate::wm::screen::Screen;
use crate::wm::xconn::{NONE, SurfaceSpec, WindowChanges, Xid, predefined};

/// Special `_NET_WM_DESKTOP` value for omnipresent windows
pub const ALL_WORKSPACES: u32 = 0xFFFFFFFF;

/// Hard limit on the number of workspaces
pub const MAX_WORKSPACES: usize = 100;

/// Longest workspace name, in characters
pub const MAX_WORKSPACENAME_WIDTH: usize = 32;

/// How long the workspace name stays up before fading
pub const WORKSPACE_NAME_DELAY: Duration = Duration::from_millis(400);
pub const WORKSPACE_NAME_FADE_DELAY: Duration = Duration::from_millis(30);
pub const WORKSPACE_NAME_FADE_STEPS: u32 = 10;

/// Distance of the workspace name from the screen edges
const NAME_PADDING: i32 = 32;

/// Where the workspace name flashes after a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameDisplay {
    None,
    #[default]
    Center,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl NameDisplay {
    /// Top-left corner of a `width` x `height` label on the screen
    pub fn position(self, screen: (u32, u32), width: u32, height: u32) -> Option<(i32, i32)> {
        let (sw, sh) = (screen.0 as i32, screen.1 as i32);
        let (w, h) = (width as i32, height as i32);
        let center_x = (sw - w) / 2;
        let left = NAME_PADDING;
        let right = sw - w - NAME_PADDING;
        let top = NAME_PADDING;
        let bottom = sh - h - NAME_PADDING;
        match self {
            NameDisplay::None => None,
            NameDisplay::Center => Some((center_x, (sh - h) / 2)),
            NameDisplay::Top => Some((center_x, top)),
            NameDisplay::Bottom => Some((center_x, bottom)),
            NameDisplay::TopLeft => Some((left, top)),
            NameDisplay::TopRight => Some((right, top)),
            NameDisplay::BottomLeft => Some((left, bottom)),
            NameDisplay::BottomRight => Some((right, bottom)),
        }
    }
}

/// Per-workspace clip (dock) state, kept opaque
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Clip {
    pub state: serde_json::Value,
    pub mapped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pub name: String,
    pub clip: Option<Clip>,
}

/// Default name of the workspace at `index`
pub fn default_name(index: usize) -> String {
    format!("Workspace {}", index + 1)
}

/// Workspace list plus the current and previous workspace
#[derive(Debug, Default)]
pub struct WorkspaceManager {
    workspaces: Vec<Workspace>,
    current: usize,
    last: usize,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.workspaces.len()
    }

    /// Current workspace index (0-based)
    pub fn current(&self) -> usize {
        self.current
    }

    /// Workspace visited before the current one
    pub fn last(&self) -> usize {
        self.last
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.workspaces.get(index).map(|ws| ws.name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.workspaces.iter().map(|ws| ws.name.as_str())
    }

    pub fn get(&self, index: usize) -> Option<&Workspace> {
        self.workspaces.get(index)
    }

    /// Index for a 1-based number or an exact workspace name
    pub fn workspace_number(&self, text: &str) -> Option<usize> {
        let text = text.trim();
        if let Ok(number) = text.parse::<usize>() {
            return (1..=self.count()).contains(&number).then(|| number - 1);
        }
        self.workspaces.iter().position(|ws| ws.name == text)
    }

    fn push(&mut self, workspace: Workspace) -> usize {
        self.workspaces.push(workspace);
        self.workspaces.len() - 1
    }

    fn remove(&mut self, index: usize) -> Workspace {
        self.workspaces.remove(index)
    }

    fn set_name(&mut self, index: usize, name: String) {
        if let Some(ws) = self.workspaces.get_mut(index) {
            ws.name = name;
        }
    }

    fn switch_to(&mut self, index: usize) {
        self.last = self.current;
        self.current = index;
    }
}

/// Workspace name label shown after a switch
#[derive(Debug, Default)]
pub struct NameOverlay {
    window: Option<Xid>,
    hide_at: Option<Instant>,
}

impl NameOverlay {
    pub fn is_shown(&self) -> bool {
        self.hide_at.is_some()
    }

    /// When the loop timer must fire next
    pub fn deadline(&self) -> Option<Instant> {
        self.hide_at
    }
}

/// Session file contents
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionState {
    #[serde(rename = "Workspaces", default)]
    workspaces: Vec<SavedWorkspace>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum SavedWorkspace {
    Entry {
        #[serde(rename = "Name", default)]
        name: Option<String>,
        #[serde(rename = "Clip", default, skip_serializing_if = "Option::is_none")]
        clip: Option<serde_json::Value>,
    },
    /// Older files stored bare names
    Legacy(String),
}

impl SavedWorkspace {
    fn name(&self) -> Option<&str> {
        match self {
            SavedWorkspace::Entry { name, .. } => name.as_deref(),
            SavedWorkspace::Legacy(name) => Some(name),
        }
    }

    fn clip(&self) -> Option<&serde_json::Value> {
        match self {
            SavedWorkspace::Entry { clip, .. } => clip.as_ref(),
            SavedWorkspace::Legacy(_) => None,
        }
    }
}

impl Screen {
    /// Append a workspace
    pub fn new_workspace(&mut self) -> Result<usize> {
        if self.workspaces.count() >= MAX_WORKSPACES {
            return Err(WmError::WorkspaceLimit.into());
        }
        let index = self.workspaces.count();
        let clip = (!self.config.workspaces.no_clip).then(Clip::default);
        self.workspaces.push(Workspace {
            name: default_name(index),
            clip,
        });
        debug!("Created workspace {}", index);

        self.update_desktop_properties();
        self.notifications.post(Notification::WorkspaceCreated(index));
        Ok(index)
    }

    pub fn make_workspaces(&mut self, count: usize) {
        for _ in 0..count {
            if let Err(e) = self.new_workspace() {
                warn!("{}", e);
                break;
            }
        }
    }

    /// Delete a workspace that no window lives on
    ///
    /// The first workspace can never be deleted. Deleting the current
    /// workspace switches to the one before it first. Windows on later
    /// workspaces move down one index with their workspace.
    pub fn delete_workspace(&mut self, index: usize) -> Result<()> {
        if index == 0 || index >= self.workspaces.count() {
            return Err(WmError::InvalidWorkspace(index).into());
        }
        let occupied = self
            .focus
            .iter()
            .filter_map(|w| self.windows.get(w))
            .any(|win| !win.is_omnipresent() && win.workspace == index);
        if occupied {
            return Err(WmError::WorkspaceOccupied(index).into());
        }

        if self.workspaces.current() == index {
            self.force_switch_workspace(index - 1);
        }

        self.workspaces.remove(index);
        for win in self.windows.values_mut() {
            if !win.is_omnipresent() && win.workspace > index {
                win.workspace -= 1;
            }
        }
        let count = self.workspaces.count();
        info!("Deleted workspace {}, {} left", index, count);
        self.notifications.post(Notification::WorkspaceDestroyed(count - 1));

        if self.workspaces.current() >= count {
            self.force_switch_workspace(count - 1);
        } else if self.workspaces.current() > index {
            let current = self.workspaces.current() - 1;
            self.workspaces.current = current;
        }
        let last = self.workspaces.last();
        if last == index {
            self.workspaces.last = 0;
        } else if last > index {
            self.workspaces.last = last - 1;
        }
        let moved: Vec<Xid> = self.windows.keys().copied().collect();
        for window in moved {
            self.update_net_wm_desktop(window);
        }
        self.update_desktop_properties();
        self.update_usable_area();
        Ok(())
    }

    /// Rename a workspace; blank names fall back to the default
    pub fn rename_workspace(&mut self, index: usize, name: &str) {
        if index >= self.workspaces.count() {
            return;
        }
        let trimmed = name.trim();
        let name = if trimmed.is_empty() {
            default_name(index)
        } else {
            trimmed.chars().take(MAX_WORKSPACENAME_WIDTH).collect()
        };
        if self.workspaces.name(index) == Some(name.as_str()) {
            return;
        }
        debug!("Workspace {} is now {:?}", index, name);
        self.workspaces.set_name(index, name);
        self.update_desktop_properties();
        self.notifications.post(Notification::WorkspaceNameChanged(index));
    }

    /// Switch workspace unless already there or still starting up
    pub fn switch_workspace(&mut self, workspace: usize) {
        if self.flags.startup || self.flags.ignore_focus_events || self.flags.ignore_workspace_change {
            return;
        }
        if workspace != self.workspaces.current() {
            self.force_switch_workspace(workspace);
        }
    }

    /// Move `amount` workspaces from the current one
    pub fn relative_switch_workspace(&mut self, amount: i32) {
        let count = self.workspaces.count() as i64;
        let target = self.workspaces.current() as i64 + amount as i64;
        let ws = &self.config.workspaces;

        let next = if amount < 0 {
            if target >= 0 {
                Some(target)
            } else if ws.cycle {
                Some((count + target).rem_euclid(count.max(1)))
            } else {
                None
            }
        } else if amount > 0 {
            if target < count {
                Some(target)
            } else if ws.advance {
                Some(target.min(MAX_WORKSPACES as i64 - 1))
            } else if ws.cycle {
                Some(target % count.max(1))
            } else {
                None
            }
        } else {
            None
        };

        if let Some(next) = next {
            self.switch_workspace(next as usize);
        }
    }

    pub fn switch_to_last_workspace(&mut self) {
        let last = self.workspaces.last();
        self.switch_workspace(last);
    }

    /// Switch to `workspace` unconditionally
    ///
    /// Windows are decided on in one walk over the focus list, most
    /// recently focused first; the unmaps are applied after the walk, and
    /// the focus and crossing events they cause are swallowed before focus
    /// is settled.
    pub fn force_switch_workspace(&mut self, workspace: usize) {
        if workspace >= MAX_WORKSPACES {
            return;
        }
        if self.config.workspaces.enable_pager {
            self.update_workspace_map();
        }
        self.send_helper_message(HelperMessage::change_workspace(workspace));

        if workspace >= self.workspaces.count() {
            self.make_workspaces(workspace + 1 - self.workspaces.count());
        }
        if workspace >= self.workspaces.count() {
            return;
        }

        self.workspaces.switch_to(workspace);
        self.clip_update_for_workspace_change();
        info!("Switched to workspace {}", workspace);

        if let Some(head) = self.focus.head() {
            self.settle_windows_for_switch(workspace, head);
        }

        if !self.config.icons.sticky_icons {
            self.arrange_icons(false);
        }
        self.update_usable_area();
        self.commit_stacking();
        self.update_desktop_properties();
        self.show_workspace_name(workspace);
        self.notifications.post(Notification::WorkspaceChanged(workspace));
    }

    fn settle_windows_for_switch(&mut self, workspace: usize, head: Xid) {
        let sticky_icons = self.config.icons.sticky_icons;
        let mut foc = self.windows.get(&head).and_then(|win| {
            let stays = win.is_omnipresent() && win.is_visible() && win.is_focusable();
            (stays || win.state.changing_workspace).then_some(head)
        });
        let mut foc2 = None;
        let mut to_unmap = Vec::new();

        for window in self.focus.to_vec() {
            let Some(win) = self.windows.get(&window) else {
                continue;
            };
            let selected = win.state.selected;
            let omnipresent = win.is_omnipresent();
            let visible = win.is_visible();
            let miniaturized = win.state.miniaturized;
            let changing_workspace = win.state.changing_workspace;
            let on_target = win.workspace == workspace;
            let hidden = win.state.hidden;
            let mapped = win.state.mapped;
            let focusable = win.is_focusable();
            let main_window = win.main_window;

            if !on_target && !selected {
                if visible && !omnipresent && !changing_workspace {
                    to_unmap.push(window);
                }
                if !sticky_icons && miniaturized && !omnipresent {
                    self.set_icon_mapped(window, false);
                }
                if omnipresent {
                    if let Some(win) = self.windows.get_mut(&window) {
                        win.workspace = workspace;
                    }
                    if let Some(app) = main_window.and_then(|main| self.apps.get_mut(main)) {
                        app.last_workspace = workspace;
                    }
                    if foc2.is_none() && visible {
                        foc2 = Some(window);
                    }
                }
            } else if selected {
                self.change_workspace(window, workspace);
                if !miniaturized && foc.is_none() {
                    foc = Some(window);
                }
            } else if !hidden {
                if !(mapped || miniaturized) {
                    self.map_window(window);
                    if foc.is_none() && focusable {
                        foc = Some(window);
                    }
                }
                if !sticky_icons && miniaturized && !omnipresent {
                    self.set_icon_mapped(window, true);
                }
            }
        }

        for window in to_unmap {
            self.unmap_window(window);
        }

        self.flags.ignore_focus_events = true;
        self.process_pending_events();
        self.flags.ignore_focus_events = false;

        let mut foc = foc.or(foc2).filter(|&w| self.focus.contains(w));
        let head_mapped = self.windows.get(&head).is_some_and(|win| win.state.mapped);
        if foc.is_none() && head_mapped {
            foc = Some(head);
        }

        match self.config.focus.mode {
            FocusPolicy::ClickToFocus => self.set_focus_to(foc),
            mode => {
                let pointer = log_warn(self.conn.query_pointer(), "query pointer")
                    .flatten()
                    .and_then(|(window, _, _)| self.window_for(window));
                match pointer {
                    None if mode == FocusPolicy::SloppyFocus => self.set_focus_to(foc),
                    pointer => self.set_focus_to(pointer),
                }
            }
        }
    }

    /// Snapshot window placement for the pager
    pub fn update_workspace_map(&mut self) {
        self.workspace_map = self
            .windows
            .iter()
            .map(|(&window, win)| (window, win.workspace))
            .collect();
    }

    /// Show the current workspace's clip and hide the others
    pub fn clip_update_for_workspace_change(&mut self) {
        let current = self.workspaces.current();
        for (index, ws) in self.workspaces.workspaces.iter_mut().enumerate() {
            if let Some(clip) = ws.clip.as_mut() {
                clip.mapped = index == current;
            }
        }
    }

    /// Flash the workspace name; reshowing restarts the timer
    pub fn show_workspace_name(&mut self, workspace: usize) {
        let display = self.config.workspaces.name_display;
        if display == NameDisplay::None || self.workspaces.count() < 2 {
            return;
        }
        let Some(name) = self.workspaces.name(workspace).map(str::to_string) else {
            return;
        };
        let (text_width, text_height) = self.conn.text_extents(&name);
        let (width, height) = (text_width + 4, text_height + 4);
        let Some((x, y)) = display.position((self.width, self.height), width, height) else {
            return;
        };

        let window = match self.name_overlay.window {
            Some(window) => window,
            None => {
                let spec = SurfaceSpec {
                    geometry: Geometry::new(x, y, width, height),
                    border_width: 0,
                    background: 0x000000,
                    border_color: 0x000000,
                    override_redirect: true,
                };
                let Some(window) = log_warn(self.conn.create_surface(&spec), "create workspace name") else {
                    return;
                };
                self.name_overlay.window = Some(window);
                window
            }
        };
        log_and_ignore(
            self.conn
                .configure(window, &WindowChanges::geometry(Geometry::new(x, y, width, height))),
            "place workspace name",
        );
        log_and_ignore(self.conn.map(window), "map workspace name");
        log_and_ignore(
            self.conn.draw_text(window, 2, text_height as i32, &name, 0xffffff, 0x000000),
            "draw workspace name",
        );
        self.name_overlay.hide_at =
            Some(Instant::now() + WORKSPACE_NAME_DELAY + WORKSPACE_NAME_FADE_DELAY * WORKSPACE_NAME_FADE_STEPS);
    }

    /// Take the workspace name down once its time is up
    pub fn expire_workspace_name(&mut self, now: Instant) {
        let Some(hide_at) = self.name_overlay.hide_at else {
            return;
        };
        if now < hide_at {
            return;
        }
        self.name_overlay.hide_at = None;
        if let Some(window) = self.name_overlay.window {
            log_and_ignore(self.conn.unmap(window), "unmap workspace name");
        }
    }

    /// Publish the desktop count, current desktop, names and client list
    pub fn update_desktop_properties(&mut self) {
        let root = self.root;
        let count = self.workspaces.count() as u32;
        let current = self.workspaces.current() as u32;
        log_and_ignore(
            self.conn
                .change_property32(root, self.atoms.net_number_of_desktops, predefined::CARDINAL, &[count]),
            "set _NET_NUMBER_OF_DESKTOPS",
        );
        log_and_ignore(
            self.conn
                .change_property32(root, self.atoms.net_current_desktop, predefined::CARDINAL, &[current]),
            "set _NET_CURRENT_DESKTOP",
        );

        let mut names = Vec::new();
        for name in self.workspaces.names() {
            names.extend_from_slice(name.as_bytes());
            names.push(0);
        }
        log_and_ignore(
            self.conn
                .change_property8(root, self.atoms.net_desktop_names, self.atoms.utf8_string, &names),
            "set _NET_DESKTOP_NAMES",
        );
        self.update_client_list();
        let active = self.focused.unwrap_or(NONE);
        log_and_ignore(
            self.conn
                .change_property32(root, self.atoms.net_active_window, predefined::WINDOW, &[active]),
            "set _NET_ACTIVE_WINDOW",
        );
    }

    /// Save workspace names and clips to the session file
    pub fn save_workspace_state(&self) {
        if let Err(e) = self.write_workspace_state() {
            warn!("Failed to save workspace state: {:#}", e);
        }
    }

    fn write_workspace_state(&self) -> Result<()> {
        let path = &self.config.session.state_file;
        let old = read_session(path).unwrap_or_default();

        let workspaces = (0..self.workspaces.count())
            .filter_map(|index| self.workspaces.get(index).map(|ws| (index, ws)))
            .map(|(index, ws)| {
                let clip = if self.config.workspaces.no_clip {
                    old.workspaces.get(index).and_then(|saved| saved.clip().cloned())
                } else {
                    ws.clip.as_ref().map(|clip| clip.state.clone())
                };
                SavedWorkspace::Entry {
                    name: Some(ws.name.clone()),
                    clip,
                }
            })
            .collect();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let text = serde_json::to_string_pretty(&SessionState { workspaces })
            .context("Failed to serialize workspace state")?;
        fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
        debug!("Saved {} workspaces to {:?}", self.workspaces.count(), path);
        Ok(())
    }

    /// Restore workspace names and clips from the session file
    ///
    /// A missing file leaves the defaults; entries beyond the current
    /// count create workspaces, up to the limit.
    pub fn restore_workspace_state(&mut self) {
        let path = self.config.session.state_file.clone();
        if !path.exists() {
            debug!("No session state at {:?}", path);
            return;
        }
        let state = match read_session(&path) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring session state: {:#}", e);
                return;
            }
        };

        for (index, saved) in state.workspaces.iter().enumerate().take(MAX_WORKSPACES) {
            if index >= self.workspaces.count() && self.new_workspace().is_err() {
                break;
            }
            if let Some(name) = saved.name().filter(|name| !name.trim().is_empty()) {
                self.rename_workspace(index, name);
            }
            if self.config.workspaces.no_clip {
                continue;
            }
            if let Some(value) = saved.clip() {
                if let Some(ws) = self.workspaces.workspaces.get_mut(index) {
                    ws.clip = Some(Clip {
                        state: value.clone(),
                        mapped: false,
                    });
                }
            }
        }
        self.clip_update_for_workspace_change();
        info!("Restored {} workspaces from {:?}", state.workspaces.len(), path);
    }
}

fn read_session(path: &std::path::Path) -> Result<SessionState> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&text).context("Failed to parse session state")
}

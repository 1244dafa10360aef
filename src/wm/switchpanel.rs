//! Switch Panel
//!
//! The row of tiles shown while cycling. The panel keeps the candidate
//! list and the selection; the screen draws it on an override-redirect
//! surface centred on the screen.

use tracing::debug;

use crate::shared::Geometry;
use crate::wm::error::{log_and_ignore, log_warn};
use crate::wm::screen::Screen;
use crate::wm::xconn::{SurfaceSpec, Xid};

pub const ICON_TILE_SIZE: u32 = 64;
pub const BORDER_SPACE: u32 = 10;
pub const LABEL_HEIGHT: u32 = 25;
/// Horizontal room kept free when the tiles don't fit the screen
const SCREEN_BORDER_SPACING: u32 = 2 * 20;
/// Inset of the selection highlight inside a tile
const TILE_INSET: u32 = 6;

/// Candidate list and selection state of one cycling session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPanel {
    windows: Vec<Xid>,
    current: Option<usize>,
    first_visible: usize,
    visible_count: usize,
    /// Surface, when the panel is drawn
    pub window: Option<Xid>,
}

impl SwitchPanel {
    /// Panel over `windows`, selecting `current` if it is listed
    pub fn new(windows: Vec<Xid>, current: Option<Xid>, screen_width: u32) -> Self {
        let count = windows.len();
        let visible_count = if count as u32 * ICON_TILE_SIZE > screen_width {
            (screen_width.saturating_sub(SCREEN_BORDER_SPACING) / ICON_TILE_SIZE).max(1) as usize
        } else {
            count
        };
        let current = current.and_then(|window| windows.iter().position(|&w| w == window));
        let mut panel = Self {
            windows,
            current,
            first_visible: 0,
            visible_count,
            window: None,
        };
        panel.scroll_to_current();
        panel
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[Xid] {
        &self.windows
    }

    pub fn selected(&self) -> Option<Xid> {
        self.current.map(|index| self.windows[index])
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.current
    }

    /// Indices of the tiles currently on the panel
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        self.first_visible..(self.first_visible + self.visible_count).min(self.windows.len())
    }

    /// Step one tile, wrapping; `skip` entries are passed over unless
    /// every other entry is skipped too
    pub fn select_next(&mut self, back: bool, skip: impl Fn(Xid) -> bool) -> Option<Xid> {
        let count = self.windows.len();
        let orig = self.current?;
        let mut index = orig;
        loop {
            index = if back { (index + count - 1) % count } else { (index + 1) % count };
            if index == orig || !skip(self.windows[index]) {
                break;
            }
        }
        self.current = Some(index);
        self.scroll_to_current();
        self.selected()
    }

    /// Jump to the first tile, or the last with `last`
    pub fn select_first(&mut self, last: bool) -> Option<Xid> {
        if self.windows.is_empty() {
            return None;
        }
        self.current = Some(if last { self.windows.len() - 1 } else { 0 });
        self.scroll_to_current();
        self.selected()
    }

    /// Index of the tile under panel-relative x
    pub fn tile_at(&self, x: i32) -> Option<usize> {
        let offset = x - BORDER_SPACE as i32;
        if offset < 0 {
            return None;
        }
        let slot = offset as usize / ICON_TILE_SIZE as usize;
        let index = self.first_visible + slot;
        (slot < self.visible_count && index < self.windows.len()).then_some(index)
    }

    /// Select the tile under panel-relative x; `Some` only when the
    /// selection moved
    pub fn select_at(&mut self, x: i32) -> Option<Xid> {
        let index = self.tile_at(x)?;
        if self.current == Some(index) {
            return None;
        }
        self.current = Some(index);
        self.selected()
    }

    /// Drop a window that went away; the selection stays on the same entry
    /// or moves to its neighbour
    pub fn remove(&mut self, window: Xid) {
        let Some(index) = self.windows.iter().position(|&w| w == window) else {
            return;
        };
        self.windows.remove(index);
        self.visible_count = self.visible_count.min(self.windows.len());
        self.current = match self.current {
            _ if self.windows.is_empty() => None,
            Some(current) if current > index => Some(current - 1),
            Some(current) => Some(current.min(self.windows.len() - 1)),
            None => None,
        };
        self.first_visible = self.first_visible.min(self.windows.len().saturating_sub(self.visible_count));
        self.scroll_to_current();
    }

    fn scroll_to_current(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        if current < self.first_visible {
            self.first_visible = current;
        } else if current >= self.first_visible + self.visible_count {
            self.first_visible = current + 1 - self.visible_count;
        }
    }

    /// Panel rectangle centred on `screen`
    pub fn geometry(&self, screen: Geometry) -> Geometry {
        let width = self.visible_count as u32 * ICON_TILE_SIZE + 2 * BORDER_SPACE;
        let height = ICON_TILE_SIZE + LABEL_HEIGHT + 2 * BORDER_SPACE;
        Geometry::new(
            screen.x + (screen.width as i32 - width as i32) / 2,
            screen.y + (screen.height as i32 - height as i32) / 2,
            width,
            height,
        )
    }
}

impl Screen {
    /// Create the panel surface and draw it
    pub(crate) fn show_switch_panel(&mut self, panel: &mut SwitchPanel) {
        let area = Geometry::new(0, 0, self.width, self.height);
        let spec = SurfaceSpec {
            geometry: panel.geometry(area),
            border_width: 1,
            background: self.config.decorations.unfocused_color,
            border_color: self.config.decorations.border_color,
            override_redirect: true,
        };
        let Some(window) = log_warn(self.conn.create_surface(&spec), "create switch panel") else {
            return;
        };
        log_and_ignore(self.conn.map(window), "map switch panel");
        panel.window = Some(window);
        self.paint_switch_panel(panel);
        debug!("Switch panel with {} entries", panel.len());
    }

    /// Redraw tiles and the label of the selected entry
    pub(crate) fn paint_switch_panel(&self, panel: &SwitchPanel) {
        let Some(surface) = panel.window else {
            return;
        };
        let deco = &self.config.decorations;
        let label = panel
            .selected()
            .and_then(|window| self.windows.get(&window))
            .map(|win| {
                if win.is_gnustep() {
                    win.wm_instance.clone()
                } else {
                    win.wm_class.clone()
                }
                .unwrap_or_else(|| win.display_title().to_string())
            })
            .unwrap_or_default();
        let label_y = (BORDER_SPACE + ICON_TILE_SIZE + LABEL_HEIGHT / 2 + 4) as i32;
        log_and_ignore(
            self.conn
                .draw_text(surface, BORDER_SPACE as i32, label_y, &label, deco.text_color, deco.unfocused_color),
            "draw switch panel label",
        );

        for (slot, index) in panel.visible_range().enumerate() {
            let window = panel.windows[index];
            let x = (BORDER_SPACE + slot as u32 * ICON_TILE_SIZE) as i32;
            let tile = Geometry::new(
                x + TILE_INSET as i32,
                (BORDER_SPACE + TILE_INSET) as i32,
                ICON_TILE_SIZE - 2 * TILE_INSET,
                ICON_TILE_SIZE - 2 * TILE_INSET,
            );
            let dim = self
                .windows
                .get(&window)
                .is_some_and(|win| win.state.miniaturized || win.state.hidden);
            let color = if Some(index) == panel.selected_index() {
                deco.focused_color
            } else if dim {
                deco.border_color
            } else {
                deco.unfocused_color
            };
            log_and_ignore(self.conn.fill_rect(surface, tile, color), "draw switch panel tile");
        }
    }

    pub(crate) fn destroy_switch_panel(&mut self, panel: &mut SwitchPanel) {
        let Some(surface) = panel.window.take() else {
            return;
        };
        // Unmapping uncovers windows; their crossing events are ours
        self.flags.ignore_focus_events = true;
        log_and_ignore(self.conn.unmap(surface), "unmap switch panel");
        self.process_pending_events();
        self.flags.ignore_focus_events = false;
        log_and_ignore(self.conn.destroy_window(surface), "destroy switch panel");
    }
}

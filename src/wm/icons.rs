//! Miniwindows
//!
//! The icon a window turns into when miniaturized. Each one is owned by
//! its window record: created on iconify, destroyed on deiconify or when
//! the window goes away.

use anyhow::Result;
use tracing::debug;

use crate::shared::Geometry;
use crate::wm::error::log_and_ignore;
use crate::wm::screen::Screen;
use crate::wm::xconn::{SurfaceSpec, Xid};

/// A miniwindow on the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub window: Xid,
    pub x: i32,
    pub y: i32,
    pub mapped: bool,
    pub title: Option<String>,
}

/// Slot `index` of the icon row along the bottom of `area`, filling left
/// to right and then upwards
pub fn icon_slot(area: Geometry, icon_size: u32, index: usize) -> (i32, i32) {
    let size = icon_size.max(1);
    let per_row = (area.width / size).max(1) as usize;
    let column = (index % per_row) as i32;
    let row = (index / per_row) as i32;
    (
        area.x + column * size as i32,
        area.bottom() - (row + 1) * size as i32,
    )
}

impl Screen {
    /// Whether a miniaturized window's icon belongs on screen now
    pub fn icon_should_show(&self, window: Xid) -> bool {
        self.windows.get(&window).is_some_and(|win| {
            win.is_omnipresent() || self.config.icons.sticky_icons || win.workspace == self.current_workspace()
        })
    }

    /// Create the miniwindow for `window`
    pub(crate) fn create_icon(&mut self, window: Xid) -> Result<()> {
        let size = self.config.icons.icon_size;
        let background = self.config.decorations.unfocused_color;
        let border_color = self.config.decorations.border_color;
        let Some(win) = self.windows.get(&window) else {
            return Ok(());
        };
        if win.icon.is_some() {
            return Ok(());
        }
        let title = win.icon_title.clone().or_else(|| win.title.clone());

        let surface = self.conn.create_surface(&SurfaceSpec {
            geometry: Geometry::new(0, 0, size, size),
            border_width: 1,
            background,
            border_color,
            override_redirect: false,
        })?;
        self.frames.insert(surface, window);
        if let Some(win) = self.windows.get_mut(&window) {
            win.icon = Some(Icon {
                window: surface,
                x: 0,
                y: 0,
                mapped: false,
                title,
            });
        }
        debug!("Created miniwindow {:#x} for {:#x}", surface, window);
        Ok(())
    }

    pub(crate) fn destroy_icon(&mut self, window: Xid) {
        let Some(icon) = self.windows.get_mut(&window).and_then(|win| win.icon.take()) else {
            return;
        };
        self.frames.remove(&icon.window);
        log_and_ignore(self.conn.destroy_window(icon.window), "destroy miniwindow");
    }

    pub(crate) fn set_icon_mapped(&mut self, window: Xid, mapped: bool) {
        let Some(icon) = self.windows.get_mut(&window).and_then(|win| win.icon.as_mut()) else {
            return;
        };
        if icon.mapped == mapped {
            return;
        }
        icon.mapped = mapped;
        let surface = icon.window;
        if mapped {
            log_and_ignore(self.conn.map(surface), "map miniwindow");
            self.paint_icon(window);
        } else {
            log_and_ignore(self.conn.unmap(surface), "unmap miniwindow");
        }
    }

    /// Redraw the miniwindow title
    pub fn paint_icon(&self, window: Xid) {
        let Some(icon) = self.windows.get(&window).and_then(|win| win.icon.as_ref()) else {
            return;
        };
        if !icon.mapped {
            return;
        }
        let deco = &self.config.decorations;
        let title = icon.title.as_deref().unwrap_or("");
        let (_, text_height) = self.conn.text_extents(title);
        log_and_ignore(
            self.conn
                .draw_text(icon.window, 2, text_height as i32, title, deco.text_color, deco.unfocused_color),
            "draw miniwindow title",
        );
    }

    /// Lay the miniwindows out along the bottom of the usable area
    ///
    /// Only icons that are shown get a slot; with `arrange_all` the
    /// hidden ones are placed as well so they never overlap later.
    pub fn arrange_icons(&mut self, arrange_all: bool) {
        let area = self.usable_area;
        let size = self.config.icons.icon_size;

        let mut iconified: Vec<Xid> = self
            .focus
            .iter()
            .copied()
            .filter(|w| self.windows.get(w).is_some_and(|win| win.icon.is_some()))
            .filter(|&w| arrange_all || self.icon_should_show(w))
            .collect();
        iconified.sort_unstable();

        for (index, window) in iconified.into_iter().enumerate() {
            let (x, y) = icon_slot(area, size, index);
            let Some(icon) = self.windows.get_mut(&window).and_then(|win| win.icon.as_mut()) else {
                continue;
            };
            if (icon.x, icon.y) == (x, y) {
                continue;
            }
            icon.x = x;
            icon.y = y;
            let surface = icon.window;
            log_and_ignore(
                self.conn.configure(
                    surface,
                    &crate::wm::xconn::WindowChanges {
                        x: Some(x),
                        y: Some(y),
                        ..Default::default()
                    },
                ),
                "move miniwindow",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_slots_fill_bottom_row_first() {
        let area = Geometry::new(0, 0, 200, 400);
        assert_eq!(icon_slot(area, 64, 0), (0, 336));
        assert_eq!(icon_slot(area, 64, 2), (128, 336));
        assert_eq!(icon_slot(area, 64, 3), (0, 272));
    }

    #[test]
    fn test_icon_slots_respect_area_offset() {
        let area = Geometry::new(50, 20, 1000, 700);
        assert_eq!(icon_slot(area, 64, 1), (114, 656));
    }
}

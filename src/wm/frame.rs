//! Window frames
//!
//! The WM-owned parent window around each client: titlebar on top,
//! resizebar at the bottom, border around. Sizes come from the window's
//! decoration predicates so a fullscreen window gets a bare frame.

use anyhow::Result;
use tracing::debug;

use crate::shared::Geometry;
use crate::wm::error::log_and_ignore;
use crate::wm::screen::Screen;
use crate::wm::xconn::{SurfaceSpec, WindowChanges, Xid};

impl Screen {
    /// Create the frame for a managed window and reparent the client into it
    pub(crate) fn create_frame(&mut self, window: Xid) -> Result<()> {
        let sizes = self.decoration_sizes();
        let border_color = self.config.decorations.border_color;
        let background = self.config.decorations.unfocused_color;
        let Some(win) = self.windows.get_mut(&window) else {
            return Ok(());
        };
        win.update_extents(&sizes);
        let spec = SurfaceSpec {
            geometry: win.frame_geometry(),
            border_width: win.extents.border,
            background,
            border_color,
            override_redirect: false,
        };
        let top = win.extents.top as i32;

        let frame = self.conn.create_surface(&spec)?;
        win.frame = frame;
        self.frames.insert(frame, window);

        self.conn.set_border_width(window, 0)?;
        self.conn.reparent(window, frame, 0, top)?;
        debug!("Framed {:#x} in {:#x}", window, frame);
        Ok(())
    }

    /// Drop the frame of a window already given back to the root
    pub(crate) fn destroy_frame(&mut self, window: Xid) {
        let Some(frame) = self.windows.get(&window).map(|win| win.frame) else {
            return;
        };
        self.frames.remove(&frame);
        log_and_ignore(self.conn.destroy_window(frame), "destroy frame");
    }

    /// Move and resize a window; `width`/`height` are the client size
    pub fn configure_window(&mut self, window: Xid, x: i32, y: i32, width: u32, height: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        let resized = win.width != width || win.height != height;
        win.frame_x = x;
        win.frame_y = y;
        win.width = width.max(1);
        win.height = height.max(1);

        let frame_geometry = win.frame_geometry();
        let top = win.extents.top as i32;
        let (frame, client, shaded) = (win.frame, win.client, win.state.shaded);
        let client_geometry = Geometry::new(x, y + top, win.width, win.height);

        log_and_ignore(
            self.conn.configure(frame, &WindowChanges::geometry(frame_geometry)),
            "configure frame",
        );
        if resized && !shaded {
            log_and_ignore(
                self.conn.configure(
                    client,
                    &WindowChanges {
                        x: Some(0),
                        y: Some(top),
                        width: Some(client_geometry.width),
                        height: Some(client_geometry.height),
                        ..Default::default()
                    },
                ),
                "configure client",
            );
        }
        log_and_ignore(
            self.conn.send_configure_notify(client, client_geometry, 0),
            "send ConfigureNotify",
        );
        self.paint_frame(window);
    }

    /// Recompute decoration sizes after a flag change and refit the frame
    pub fn update_decorations(&mut self, window: Xid) {
        let sizes = self.decoration_sizes();
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        let before = win.extents;
        win.update_extents(&sizes);
        if win.extents == before {
            return;
        }
        let (frame, client, border, top) = (win.frame, win.client, win.extents.border, win.extents.top as i32);
        let (x, y, width, height) = (win.frame_x, win.frame_y, win.width, win.height);

        log_and_ignore(self.conn.set_border_width(frame, border), "frame border");
        log_and_ignore(
            self.conn.configure(
                client,
                &WindowChanges {
                    x: Some(0),
                    y: Some(top),
                    ..Default::default()
                },
            ),
            "move client in frame",
        );
        self.configure_window(window, x, y, width, height);
    }

    /// Redraw the titlebar
    pub fn paint_frame(&self, window: Xid) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if win.extents.top == 0 || !win.is_visible() {
            return;
        }
        let deco = &self.config.decorations;
        let color = if win.state.focused {
            deco.focused_color
        } else {
            deco.unfocused_color
        };
        let bar = Geometry::new(0, 0, win.width, win.extents.top);
        log_and_ignore(self.conn.fill_rect(win.frame, bar, color), "paint titlebar");

        let title = win.display_title();
        let (text_width, text_height) = self.conn.text_extents(title);
        let x = (win.width.saturating_sub(text_width) / 2) as i32;
        let y = ((win.extents.top + text_height) / 2) as i32;
        log_and_ignore(
            self.conn.draw_text(win.frame, x, y, title, deco.text_color, color),
            "draw title",
        );
    }
}

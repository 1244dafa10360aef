//! Events Module
//!
//! Routes decoded X events to the core. A running cycling session sees
//! every event first.

use tracing::{debug, warn};

use crate::wm::screen::Screen;
use crate::wm::xconn::{PointerEvent, XEvent, Xid};

impl Screen {
    /// Handle one event from the server
    pub fn handle_event(&mut self, event: XEvent) {
        if self.cycle.is_some() && self.cycle_event(&event) {
            return;
        }
        match event {
            XEvent::MapRequest { window } => self.handle_map_request(window),
            XEvent::MapNotify { .. } => {}
            XEvent::UnmapNotify { window, event } => self.handle_unmap_notify(window, event),
            XEvent::DestroyNotify { window } => {
                if self.windows.contains_key(&window) {
                    debug!("Window {:#x} destroyed", window);
                    self.unmanage_window(window, false);
                }
            }
            XEvent::ConfigureRequest(req) => self.configure_client(&req),
            XEvent::PropertyNotify { window, atom, .. } => {
                if window != self.root {
                    self.check_property(window, atom);
                }
            }
            XEvent::ClientMessage {
                window,
                message_type,
                format,
                data,
            } => self.handle_client_message(window, message_type, format, data),
            XEvent::KeyPress(key) => {
                self.handle_key_binding(key.keycode, key.state);
            }
            XEvent::ButtonPress(ptr) => self.handle_button_press(&ptr),
            XEvent::EnterNotify(ptr) => {
                let window = if ptr.window == self.root {
                    None
                } else {
                    self.window_for(ptr.window)
                };
                self.handle_enter(window);
            }
            XEvent::FocusIn { window } => {
                if let Some(window) = self.window_for(window) {
                    self.handle_focus_in(window);
                }
            }
            XEvent::Expose { window } => self.handle_expose(window),
            XEvent::KeyRelease(_) | XEvent::ButtonRelease(_) | XEvent::MotionNotify(_) | XEvent::LeaveNotify(_) => {}
        }
    }

    fn handle_map_request(&mut self, window: Xid) {
        if let Some(win) = self.windows.get(&window) {
            if win.state.miniaturized {
                self.deiconify(window);
            } else if !win.state.mapped && (win.workspace == self.current_workspace() || win.is_omnipresent()) {
                self.map_window(window);
            }
            return;
        }
        if let Err(e) = self.manage_window(window) {
            warn!("Failed to manage {:#x}: {:#}", window, e);
            return;
        }
        if !self.flags.startup && self.can_focus(window) {
            self.set_focus_to(Some(window));
            self.raise_window(window);
            self.commit_stacking();
        }
    }

    /// A client withdrawing itself
    ///
    /// Only unmaps reported on the frame count. Reparenting an already
    /// mapped client produces an unmap reported on the root, which is ours.
    fn handle_unmap_notify(&mut self, window: Xid, event: Xid) {
        let Some(frame) = self.windows.get(&window).map(|win| win.frame) else {
            return;
        };
        if event != frame {
            return;
        }
        debug!("Window {:#x} withdrawn", window);
        self.unmanage_window(window, false);
    }

    fn handle_button_press(&mut self, ptr: &PointerEvent) {
        let Some(window) = self.window_for(ptr.window) else {
            return;
        };
        let on_icon = self
            .windows
            .get(&window)
            .and_then(|win| win.icon.as_ref())
            .is_some_and(|icon| icon.window == ptr.window);
        if on_icon {
            self.deiconify(window);
        } else {
            self.handle_click(window);
        }
    }

    fn handle_expose(&mut self, xid: Xid) {
        let Some(window) = self.window_for(xid) else {
            return;
        };
        let is_frame = self.windows.get(&window).is_some_and(|win| win.frame == xid);
        if is_frame {
            self.paint_frame(window);
        } else {
            self.paint_icon(window);
        }
    }
}

//! X11 Connection
//!
//! [`XConn`] over an x11rb `RustConnection`: takes the WM_Sn selection,
//! redirects the root and translates wire events into [`XEvent`].

use anyhow::{Context, Result, bail};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    self, AtomEnum, ChangeGCAux, ChangeWindowAttributesAux, Char2b, ClientMessageEvent, ConfigureNotifyEvent,
    ConfigureWindowAux, ConnectionExt as _, CreateGCAux, CreateWindowAux, EventMask, GrabMode, GrabStatus,
    InputFocus, ModMask, PropMode, Property, Rectangle, SetMode, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, CURRENT_TIME, NONE};

use crate::shared::Geometry;
use crate::wm::xconn::{
    Atom, ConfigMask, ConfigureRequest, KeyEvent, PointerEvent, StackMode, SurfaceSpec, WindowAttributes,
    WindowChanges, XConn, XEvent, Xid,
};

/// PointerRoot as a focus target
const POINTER_ROOT: Xid = 1;

/// How long `--replace` waits for the previous manager to let go
const REPLACE_TIMEOUT: Duration = Duration::from_secs(15);

/// Keysyms per keycode as returned by GetKeyboardMapping
struct KeyMap {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<u32>,
}

impl KeyMap {
    fn keycode(&self, keysym: u32) -> Option<u8> {
        if self.per_keycode == 0 {
            return None;
        }
        self.keysyms
            .chunks(self.per_keycode)
            .position(|syms| syms.contains(&keysym))
            .and_then(|index| u8::try_from(index + self.min_keycode as usize).ok())
    }
}

pub struct X11Conn {
    conn: Arc<RustConnection>,
    screen_num: usize,
    root: Xid,
    width: u32,
    height: u32,
    /// Selection owner window, kept alive for as long as we manage
    owner: Xid,
    font: xproto::Font,
    gc: xproto::Gcontext,
    keymap: RefCell<Option<KeyMap>>,
    atom_cache: RefCell<HashMap<String, Atom>>,
}

impl X11Conn {
    /// Connect to `display` and become its window manager
    pub fn connect(display: Option<&str>, replace: bool) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display).context("Failed to connect to the X server")?;
        let conn = Arc::new(conn);
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let (width, height) = (screen.width_in_pixels as u32, screen.height_in_pixels as u32);
        info!("Connected to screen {} ({}x{})", screen_num, width, height);

        let owner = acquire_selection(&conn, screen_num, root, replace)?;
        select_root_events(&conn, root)?;

        let font = conn.generate_id()?;
        conn.open_font(font, b"fixed")?
            .check()
            .context("Failed to open the 'fixed' font")?;
        let gc = conn.generate_id()?;
        conn.create_gc(gc, root, &CreateGCAux::new().font(font).graphics_exposures(0))?;
        conn.flush()?;

        Ok(Self {
            conn,
            screen_num,
            root,
            width,
            height,
            owner,
            font,
            gc,
            keymap: RefCell::new(None),
            atom_cache: RefCell::new(HashMap::new()),
        })
    }

    /// The underlying connection, for the event stream
    pub fn connection(&self) -> Arc<RustConnection> {
        self.conn.clone()
    }

    pub fn screen_num(&self) -> usize {
        self.screen_num
    }

    /// Drop the cached keymap after a MappingNotify
    pub fn refresh_keymap(&self) {
        self.keymap.borrow_mut().take();
    }

    fn load_keymap(&self) -> Result<KeyMap> {
        let setup = self.conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = self.conn.get_keyboard_mapping(min, max - min + 1)?.reply()?;
        Ok(KeyMap {
            min_keycode: min,
            per_keycode: reply.keysyms_per_keycode as usize,
            keysyms: reply.keysyms,
        })
    }
}

impl Drop for X11Conn {
    fn drop(&mut self) {
        let _ = self.conn.free_gc(self.gc);
        let _ = self.conn.close_font(self.font);
        let _ = self.conn.destroy_window(self.owner);
        let _ = self.conn.flush();
    }
}

/// Own WM_Sn, waiting for the previous owner to exit with `replace`
fn acquire_selection(conn: &RustConnection, screen_num: usize, root: Xid, replace: bool) -> Result<Xid> {
    let selection = conn
        .intern_atom(false, format!("WM_S{}", screen_num).as_bytes())?
        .reply()
        .context("Failed to intern WM selection atom")?
        .atom;
    let previous = conn
        .get_selection_owner(selection)?
        .reply()
        .context("Failed to get current WM selection owner")?
        .owner;
    if previous != NONE {
        if !replace {
            bail!(
                "Another window manager is already running (window {:#x}). Use --replace to replace it.",
                previous
            );
        }
        info!("Replacing window manager owning {:#x}", previous);
        conn.change_window_attributes(
            previous,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
        )?;
    }

    let owner = conn.generate_id()?;
    conn.create_window(
        COPY_DEPTH_FROM_PARENT,
        owner,
        root,
        -100,
        -100,
        1,
        1,
        0,
        WindowClass::INPUT_OUTPUT,
        0,
        &CreateWindowAux::new().override_redirect(1),
    )?;
    conn.set_selection_owner(owner, selection, CURRENT_TIME)?
        .check()
        .context("Failed to set WM selection owner")?;
    let now = conn.get_selection_owner(selection)?.reply()?.owner;
    if now != owner {
        bail!("Failed to acquire WM selection (owner is {:#x})", now);
    }

    if previous != NONE {
        let start = Instant::now();
        loop {
            match conn.get_window_attributes(previous)?.reply() {
                Err(ReplyError::X11Error(_)) => {
                    info!("Previous window manager exited");
                    break;
                }
                Err(e) => return Err(e.into()),
                Ok(_) if start.elapsed() >= REPLACE_TIMEOUT => {
                    warn!("Timeout waiting for previous window manager, proceeding anyway");
                    break;
                }
                Ok(_) => std::thread::sleep(Duration::from_millis(100)),
            }
        }
    }
    debug!("Own WM_S{} through {:#x}", screen_num, owner);
    Ok(owner)
}

fn select_root_events(conn: &RustConnection, root: Xid) -> Result<()> {
    let current = conn.get_window_attributes(root)?.reply()?.your_event_mask;
    let mask = EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::BUTTON_PRESS
        | EventMask::ENTER_WINDOW
        | EventMask::PROPERTY_CHANGE
        | EventMask::FOCUS_CHANGE
        | EventMask::KEY_PRESS;
    conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(current | mask))?
        .check()
        .context("Failed to redirect the root window - is another window manager running?")?;
    Ok(())
}

/// Reply, with server-side errors (usually a vanished window) as `None`
fn optional<R>(reply: std::result::Result<R, ReplyError>) -> Result<Option<R>> {
    match reply {
        Ok(reply) => Ok(Some(reply)),
        Err(ReplyError::X11Error(e)) => {
            debug!("X error: {:?}", e.error_kind);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Core fonts only carry Latin-1
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .take(255)
        .collect()
}

fn to_x_stack_mode(mode: StackMode) -> xproto::StackMode {
    match mode {
        StackMode::Above => xproto::StackMode::ABOVE,
        StackMode::Below => xproto::StackMode::BELOW,
        StackMode::TopIf => xproto::StackMode::TOP_IF,
        StackMode::BottomIf => xproto::StackMode::BOTTOM_IF,
        StackMode::Opposite => xproto::StackMode::OPPOSITE,
    }
}

fn from_x_stack_mode(mode: xproto::StackMode) -> Option<StackMode> {
    match mode {
        xproto::StackMode::ABOVE => Some(StackMode::Above),
        xproto::StackMode::BELOW => Some(StackMode::Below),
        xproto::StackMode::TOP_IF => Some(StackMode::TopIf),
        xproto::StackMode::BOTTOM_IF => Some(StackMode::BottomIf),
        xproto::StackMode::OPPOSITE => Some(StackMode::Opposite),
        _ => None,
    }
}

/// Decode a wire event; `None` for events the core ignores
pub fn translate_event(event: Event) -> Option<XEvent> {
    let translated = match event {
        Event::MapRequest(e) => XEvent::MapRequest { window: e.window },
        Event::MapNotify(e) => XEvent::MapNotify { window: e.window },
        Event::UnmapNotify(e) => XEvent::UnmapNotify {
            window: e.window,
            event: e.event,
        },
        Event::DestroyNotify(e) => XEvent::DestroyNotify { window: e.window },
        Event::ConfigureRequest(e) => {
            let mask = ConfigMask::from_bits_truncate(u16::from(e.value_mask));
            XEvent::ConfigureRequest(ConfigureRequest {
                window: e.window,
                mask,
                x: e.x as i32,
                y: e.y as i32,
                width: e.width as u32,
                height: e.height as u32,
                border_width: e.border_width as u32,
                sibling: e.sibling,
                stack_mode: if mask.contains(ConfigMask::STACK_MODE) {
                    from_x_stack_mode(e.stack_mode)
                } else {
                    None
                },
            })
        }
        Event::PropertyNotify(e) => XEvent::PropertyNotify {
            window: e.window,
            atom: e.atom,
            deleted: e.state == Property::DELETE,
        },
        Event::ClientMessage(e) => XEvent::ClientMessage {
            window: e.window,
            message_type: e.type_,
            format: e.format,
            data: e.data.as_data32(),
        },
        Event::KeyPress(e) | Event::KeyRelease(e) => {
            let key = KeyEvent {
                window: e.event,
                root: e.root,
                keycode: e.detail,
                state: u16::from(e.state),
                time: e.time,
            };
            if e.response_type & 0x7f == xproto::KEY_PRESS_EVENT {
                XEvent::KeyPress(key)
            } else {
                XEvent::KeyRelease(key)
            }
        }
        Event::ButtonPress(e) | Event::ButtonRelease(e) => {
            let ptr = PointerEvent {
                window: e.event,
                root: e.root,
                root_x: e.root_x as i32,
                root_y: e.root_y as i32,
                event_x: e.event_x as i32,
                event_y: e.event_y as i32,
                state: u16::from(e.state),
                detail: e.detail,
                time: e.time,
            };
            if e.response_type & 0x7f == xproto::BUTTON_PRESS_EVENT {
                XEvent::ButtonPress(ptr)
            } else {
                XEvent::ButtonRelease(ptr)
            }
        }
        Event::MotionNotify(e) => XEvent::MotionNotify(PointerEvent {
            window: e.event,
            root: e.root,
            root_x: e.root_x as i32,
            root_y: e.root_y as i32,
            event_x: e.event_x as i32,
            event_y: e.event_y as i32,
            state: u16::from(e.state),
            detail: u8::from(e.detail),
            time: e.time,
        }),
        Event::EnterNotify(e) | Event::LeaveNotify(e) => {
            let ptr = PointerEvent {
                window: e.event,
                root: e.root,
                root_x: e.root_x as i32,
                root_y: e.root_y as i32,
                event_x: e.event_x as i32,
                event_y: e.event_y as i32,
                state: u16::from(e.state),
                detail: u8::from(e.detail),
                time: e.time,
            };
            if e.response_type & 0x7f == xproto::ENTER_NOTIFY_EVENT {
                XEvent::EnterNotify(ptr)
            } else {
                XEvent::LeaveNotify(ptr)
            }
        }
        Event::FocusIn(e) => XEvent::FocusIn { window: e.event },
        Event::Expose(e) if e.count == 0 => XEvent::Expose { window: e.window },
        Event::Error(e) => {
            debug!("Async X error {:?} on {:#x}", e.error_kind, e.bad_value);
            return None;
        }
        _ => return None,
    };
    Some(translated)
}

impl XConn for X11Conn {
    fn root(&self) -> Xid {
        self.root
    }

    fn screen_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        if let Some(&atom) = self.atom_cache.borrow().get(name) {
            return Ok(atom);
        }
        let atom = self
            .conn
            .intern_atom(false, name.as_bytes())?
            .reply()
            .with_context(|| format!("Failed to intern {}", name))?
            .atom;
        self.atom_cache.borrow_mut().insert(name.to_string(), atom);
        Ok(atom)
    }

    fn window_exists(&self, window: Xid) -> bool {
        self.conn
            .get_window_attributes(window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .is_some()
    }

    fn get_window_attributes(&self, window: Xid) -> Result<Option<WindowAttributes>> {
        let attrs = self.conn.get_window_attributes(window)?;
        let geometry = self.conn.get_geometry(window)?;
        let (Some(attrs), Some(geometry)) = (optional(attrs.reply())?, optional(geometry.reply())?) else {
            return Ok(None);
        };
        Ok(Some(WindowAttributes {
            geometry: Geometry::new(
                geometry.x as i32,
                geometry.y as i32,
                geometry.width as u32,
                geometry.height as u32,
            ),
            border_width: geometry.border_width as u32,
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == xproto::MapState::VIEWABLE,
        }))
    }

    fn get_property32(&self, window: Xid, property: Atom, ty: Atom) -> Result<Option<Vec<u32>>> {
        let cookie = self.conn.get_property(false, window, property, ty, 0, u32::MAX / 4)?;
        let Some(reply) = optional(cookie.reply())? else {
            return Ok(None);
        };
        if reply.type_ == u32::from(AtomEnum::NONE) {
            return Ok(None);
        }
        Ok(reply.value32().map(|values| values.collect()))
    }

    fn get_property8(&self, window: Xid, property: Atom, ty: Atom) -> Result<Option<Vec<u8>>> {
        let cookie = self.conn.get_property(false, window, property, ty, 0, u32::MAX / 4)?;
        let Some(reply) = optional(cookie.reply())? else {
            return Ok(None);
        };
        if reply.type_ == u32::from(AtomEnum::NONE) {
            return Ok(None);
        }
        Ok(reply.value8().map(|values| values.collect()))
    }

    fn change_property32(&self, window: Xid, property: Atom, ty: Atom, data: &[u32]) -> Result<()> {
        self.conn.change_property32(PropMode::REPLACE, window, property, ty, data)?;
        Ok(())
    }

    fn change_property8(&self, window: Xid, property: Atom, ty: Atom, data: &[u8]) -> Result<()> {
        self.conn.change_property8(PropMode::REPLACE, window, property, ty, data)?;
        Ok(())
    }

    fn delete_property(&self, window: Xid, property: Atom) -> Result<()> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn create_surface(&self, spec: &SurfaceSpec) -> Result<Xid> {
        let window = self.conn.generate_id()?;
        let g = spec.geometry;
        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::POINTER_MOTION
            | EventMask::ENTER_WINDOW
            | EventMask::LEAVE_WINDOW
            | EventMask::EXPOSURE;
        self.conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            self.root,
            g.x as i16,
            g.y as i16,
            g.width.max(1) as u16,
            g.height.max(1) as u16,
            spec.border_width as u16,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new()
                .background_pixel(spec.background)
                .border_pixel(spec.border_color)
                .override_redirect(u32::from(spec.override_redirect))
                .event_mask(mask),
        )?;
        Ok(window)
    }

    fn destroy_window(&self, window: Xid) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn reparent(&self, window: Xid, parent: Xid, x: i32, y: i32) -> Result<()> {
        self.conn.reparent_window(window, parent, x as i16, y as i16)?;
        Ok(())
    }

    fn watch_client(&self, window: Xid) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::PROPERTY_CHANGE | EventMask::FOCUS_CHANGE | EventMask::ENTER_WINDOW),
        )?;
        // Clients survive a crash of ours
        self.conn.change_save_set(SetMode::INSERT, window)?;
        Ok(())
    }

    fn map(&self, window: Xid) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap(&self, window: Xid) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn configure(&self, window: Xid, changes: &WindowChanges) -> Result<()> {
        let aux = ConfigureWindowAux::new()
            .x(changes.x)
            .y(changes.y)
            .width(changes.width)
            .height(changes.height)
            .border_width(changes.border_width)
            .sibling(changes.sibling)
            .stack_mode(changes.stack_mode.map(to_x_stack_mode));
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn restack(&self, windows: &[Xid]) -> Result<()> {
        for pair in windows.windows(2) {
            let aux = ConfigureWindowAux::new()
                .sibling(pair[0])
                .stack_mode(xproto::StackMode::BELOW);
            self.conn.configure_window(pair[1], &aux)?;
        }
        Ok(())
    }

    fn stacking_order(&self) -> Result<Vec<Xid>> {
        Ok(self.conn.query_tree(self.root)?.reply()?.children)
    }

    fn set_input_focus(&self, window: Option<Xid>, time: u32) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window.unwrap_or(POINTER_ROOT), time)?;
        Ok(())
    }

    fn query_pointer(&self) -> Result<Option<(Xid, i32, i32)>> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok((reply.child != NONE).then_some((reply.child, reply.root_x as i32, reply.root_y as i32)))
    }

    fn grab_keyboard(&self) -> Result<bool> {
        let reply = self
            .conn
            .grab_keyboard(false, self.root, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        self.conn.ungrab_keyboard(CURRENT_TIME)?;
        Ok(())
    }

    fn grab_key(&self, keycode: u8, modifiers: u16) -> Result<()> {
        self.conn.grab_key(
            false,
            self.root,
            ModMask::from(modifiers),
            keycode,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
        )?;
        Ok(())
    }

    fn keysym_to_keycode(&self, keysym: u32) -> Option<u8> {
        let mut keymap = self.keymap.borrow_mut();
        if keymap.is_none() {
            match self.load_keymap() {
                Ok(loaded) => *keymap = Some(loaded),
                Err(e) => {
                    warn!("Failed to read the keyboard mapping: {:#}", e);
                    return None;
                }
            }
        }
        keymap.as_ref().and_then(|map| map.keycode(keysym))
    }

    fn send_client_message(&self, window: Xid, message_type: Atom, data: [u32; 5]) -> Result<()> {
        let event = ClientMessageEvent::new(32, window, message_type, data);
        self.conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn send_configure_notify(&self, window: Xid, geometry: Geometry, border_width: u32) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: xproto::CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: geometry.x as i16,
            y: geometry.y as i16,
            width: geometry.width as u16,
            height: geometry.height as u16,
            border_width: border_width as u16,
            override_redirect: false,
        };
        self.conn.send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn kill_client(&self, window: Xid) -> Result<()> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn set_border_width(&self, window: Xid, width: u32) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().border_width(width))?;
        Ok(())
    }

    fn set_background(&self, window: Xid, color: u32) -> Result<()> {
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().background_pixel(color))?;
        self.conn.clear_area(true, window, 0, 0, 0, 0)?;
        Ok(())
    }

    fn draw_text(&self, window: Xid, x: i32, y: i32, text: &str, fg: u32, bg: u32) -> Result<()> {
        self.conn.clear_area(false, window, 0, 0, 0, 0)?;
        self.conn
            .change_gc(self.gc, &ChangeGCAux::new().foreground(fg).background(bg))?;
        self.conn
            .image_text8(window, self.gc, x as i16, y as i16, &latin1(text))?;
        Ok(())
    }

    fn fill_rect(&self, window: Xid, rect: Geometry, color: u32) -> Result<()> {
        self.conn.change_gc(self.gc, &ChangeGCAux::new().foreground(color))?;
        self.conn.poly_fill_rectangle(
            window,
            self.gc,
            &[Rectangle {
                x: rect.x as i16,
                y: rect.y as i16,
                width: rect.width as u16,
                height: rect.height as u16,
            }],
        )?;
        Ok(())
    }

    fn text_extents(&self, text: &str) -> (u32, u32) {
        let chars: Vec<Char2b> = latin1(text)
            .into_iter()
            .map(|byte2| Char2b { byte1: 0, byte2 })
            .collect();
        match self
            .conn
            .query_text_extents(self.font, &chars)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
        {
            Some(reply) => (
                reply.overall_width.max(0) as u32,
                (reply.font_ascent + reply.font_descent).max(0) as u32,
            ),
            None => (6 * chars.len() as u32, 13),
        }
    }

    fn pending_events(&self) -> Result<Vec<XEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.conn.poll_for_event()? {
            if let Event::MappingNotify(_) = event {
                self.refresh_keymap();
                continue;
            }
            events.extend(translate_event(event));
        }
        Ok(events)
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{PropertyNotifyEvent, UnmapNotifyEvent};

    #[test]
    fn test_keymap_lookup() {
        let map = KeyMap {
            min_keycode: 8,
            per_keycode: 2,
            keysyms: vec![0x61, 0x41, 0xff09, 0xfe20, 0x62, 0x42],
        };
        assert_eq!(map.keycode(0x61), Some(8));
        assert_eq!(map.keycode(0xfe20), Some(9));
        assert_eq!(map.keycode(0x42), Some(10));
        assert_eq!(map.keycode(0x63), None);
    }

    #[test]
    fn test_translate_unmap_keeps_event_window() {
        let event = Event::UnmapNotify(UnmapNotifyEvent {
            response_type: xproto::UNMAP_NOTIFY_EVENT,
            sequence: 0,
            event: 0x10,
            window: 0x20,
            from_configure: false,
        });
        assert_eq!(
            translate_event(event),
            Some(XEvent::UnmapNotify {
                window: 0x20,
                event: 0x10
            })
        );
    }

    #[test]
    fn test_translate_property_delete() {
        let event = Event::PropertyNotify(PropertyNotifyEvent {
            response_type: xproto::PROPERTY_NOTIFY_EVENT,
            sequence: 0,
            window: 0x20,
            atom: 39,
            time: 0,
            state: Property::DELETE,
        });
        assert_eq!(
            translate_event(event),
            Some(XEvent::PropertyNotify {
                window: 0x20,
                atom: 39,
                deleted: true
            })
        );
    }

    #[test]
    fn test_translate_client_message() {
        let event = Event::ClientMessage(ClientMessageEvent::new(32, 0x20u32, 300u32, [1u32, 2, 3, 4, 5]));
        assert_eq!(
            translate_event(event),
            Some(XEvent::ClientMessage {
                window: 0x20,
                message_type: 300,
                format: 32,
                data: [1, 2, 3, 4, 5]
            })
        );
    }

    #[test]
    fn test_latin1_replaces_wide_chars() {
        assert_eq!(latin1("café ☃"), vec![b'c', b'a', b'f', 0xe9, b' ', b'?']);
    }
}

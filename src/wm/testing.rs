//! Recording X connection for unit tests
//!
//! `FakeConn` keeps a tiny model of the server (windows, properties,
//! stacking, focus) and a log of the requests the core issued. Clones
//! share state, so a test keeps one handle while the screen owns another.

use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::screen::Screen;
use crate::wm::xconn::{
    Atom, NONE, StackMode, SurfaceSpec, WindowAttributes, WindowChanges, XConn, XEvent, Xid, predefined,
};

pub const ROOT: Xid = 1;
pub const SCREEN_WIDTH: u32 = 1024;
pub const SCREEN_HEIGHT: u32 = 768;

/// A request as the fake saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Map(Xid),
    Unmap(Xid),
    Configure(Xid, WindowChanges),
    Restack(Vec<Xid>),
    Focus(Option<Xid>),
    ClientMessage(Xid, Atom, [u32; 5]),
    Kill(Xid),
    Destroy(Xid),
    Reparent(Xid, Xid),
    DrawText(Xid, String),
    GrabKeyboard,
    UngrabKeyboard,
}

#[derive(Debug, Clone)]
struct FakeWindow {
    attrs: WindowAttributes,
    parent: Xid,
    props32: HashMap<Atom, Vec<u32>>,
    props8: HashMap<Atom, Vec<u8>>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: Xid,
    atoms: HashMap<String, Atom>,
    windows: HashMap<Xid, FakeWindow>,
    /// Children of the root, bottom to top
    stacking: Vec<Xid>,
    focus: Option<Xid>,
    pointer: Option<(Xid, i32, i32)>,
    keyboard_grabbed: bool,
    grabbed_keys: Vec<(u8, u16)>,
    pending: VecDeque<XEvent>,
    log: Vec<Request>,
}

#[derive(Debug, Clone)]
pub struct FakeConn {
    state: Rc<RefCell<FakeState>>,
}

impl FakeConn {
    pub fn new() -> Self {
        let mut state = FakeState {
            next_id: 0x0040_0000,
            ..Default::default()
        };
        state.windows.insert(
            ROOT,
            FakeWindow {
                attrs: WindowAttributes {
                    geometry: Geometry::new(0, 0, SCREEN_WIDTH, SCREEN_HEIGHT),
                    border_width: 0,
                    override_redirect: false,
                    viewable: true,
                },
                parent: NONE,
                props32: HashMap::new(),
                props8: HashMap::new(),
            },
        );
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Add a top-level window with the given attributes
    pub fn add_window(&self, id: Xid, attrs: WindowAttributes) -> Xid {
        let mut state = self.state.borrow_mut();
        state.windows.insert(
            id,
            FakeWindow {
                attrs,
                parent: ROOT,
                props32: HashMap::new(),
                props8: HashMap::new(),
            },
        );
        state.stacking.push(id);
        id
    }

    /// Add an unmapped 400x300 client at (10, 10) with WM_NAME and WM_CLASS
    pub fn add_client(&self, id: Xid, name: &str) -> Xid {
        self.add_window(
            id,
            WindowAttributes {
                geometry: Geometry::new(10, 10, 400, 300),
                border_width: 1,
                override_redirect: false,
                viewable: false,
            },
        );
        let class = {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        };
        self.set_property8(id, predefined::WM_NAME, name.as_bytes());
        self.set_property8(id, predefined::WM_CLASS, format!("{name}\0{class}\0").as_bytes());
        id
    }

    pub fn set_property32(&self, window: Xid, atom: Atom, data: &[u32]) {
        if let Some(win) = self.state.borrow_mut().windows.get_mut(&window) {
            win.props32.insert(atom, data.to_vec());
        }
    }

    pub fn set_property8(&self, window: Xid, atom: Atom, data: &[u8]) {
        if let Some(win) = self.state.borrow_mut().windows.get_mut(&window) {
            win.props8.insert(atom, data.to_vec());
        }
    }

    pub fn remove_property(&self, window: Xid, atom: Atom) {
        if let Some(win) = self.state.borrow_mut().windows.get_mut(&window) {
            win.props32.remove(&atom);
            win.props8.remove(&atom);
        }
    }

    pub fn property32(&self, window: Xid, atom: Atom) -> Option<Vec<u32>> {
        self.state.borrow().windows.get(&window)?.props32.get(&atom).cloned()
    }

    pub fn property8(&self, window: Xid, atom: Atom) -> Option<Vec<u8>> {
        self.state.borrow().windows.get(&window)?.props8.get(&atom).cloned()
    }

    pub fn atom(&self, name: &str) -> Atom {
        self.intern_atom(name).unwrap_or(NONE)
    }

    pub fn set_mapped(&self, window: Xid, mapped: bool) {
        if let Some(win) = self.state.borrow_mut().windows.get_mut(&window) {
            win.attrs.viewable = mapped;
        }
    }

    pub fn is_mapped(&self, window: Xid) -> bool {
        self.state
            .borrow()
            .windows
            .get(&window)
            .is_some_and(|win| win.attrs.viewable)
    }

    pub fn geometry(&self, window: Xid) -> Option<Geometry> {
        Some(self.state.borrow().windows.get(&window)?.attrs.geometry)
    }

    pub fn parent(&self, window: Xid) -> Option<Xid> {
        Some(self.state.borrow().windows.get(&window)?.parent)
    }

    /// Simulate the client destroying its window
    pub fn destroy(&self, window: Xid) {
        let mut state = self.state.borrow_mut();
        state.windows.remove(&window);
        state.stacking.retain(|&w| w != window);
    }

    pub fn input_focus(&self) -> Option<Xid> {
        self.state.borrow().focus
    }

    pub fn set_pointer(&self, pointer: Option<(Xid, i32, i32)>) {
        self.state.borrow_mut().pointer = pointer;
    }

    pub fn keyboard_grabbed(&self) -> bool {
        self.state.borrow().keyboard_grabbed
    }

    pub fn grabbed_keys(&self) -> Vec<(u8, u16)> {
        self.state.borrow().grabbed_keys.clone()
    }

    /// Queue an event for the next `pending_events`
    pub fn queue_event(&self, event: XEvent) {
        self.state.borrow_mut().pending.push_back(event);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().log.clone()
    }

    pub fn clear_requests(&self) {
        self.state.borrow_mut().log.clear();
    }

    pub fn count(&self, pred: impl Fn(&Request) -> bool) -> usize {
        self.state.borrow().log.iter().filter(|r| pred(r)).count()
    }

    fn record(&self, request: Request) {
        self.state.borrow_mut().log.push(request);
    }

    fn require(&self, window: Xid) -> Result<()> {
        if self.state.borrow().windows.contains_key(&window) {
            Ok(())
        } else {
            bail!("BadWindow {:#x}", window)
        }
    }

    fn restack_above(stacking: &mut Vec<Xid>, window: Xid, sibling: Option<Xid>, above: bool) {
        stacking.retain(|&w| w != window);
        let index = match sibling.and_then(|s| stacking.iter().position(|&w| w == s)) {
            Some(pos) if above => pos + 1,
            Some(pos) => pos,
            None if above => stacking.len(),
            None => 0,
        };
        stacking.insert(index, window);
    }
}

impl Default for FakeConn {
    fn default() -> Self {
        Self::new()
    }
}

impl XConn for FakeConn {
    fn root(&self) -> Xid {
        ROOT
    }

    fn screen_size(&self) -> (u32, u32) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        let mut state = self.state.borrow_mut();
        let next = 100 + state.atoms.len() as Atom;
        Ok(*state.atoms.entry(name.to_string()).or_insert(next))
    }

    fn window_exists(&self, window: Xid) -> bool {
        self.state.borrow().windows.contains_key(&window)
    }

    fn get_window_attributes(&self, window: Xid) -> Result<Option<WindowAttributes>> {
        Ok(self.state.borrow().windows.get(&window).map(|win| win.attrs))
    }

    fn get_property32(&self, window: Xid, property: Atom, _ty: Atom) -> Result<Option<Vec<u32>>> {
        self.require(window)?;
        Ok(self.property32(window, property))
    }

    fn get_property8(&self, window: Xid, property: Atom, _ty: Atom) -> Result<Option<Vec<u8>>> {
        self.require(window)?;
        Ok(self.property8(window, property))
    }

    fn change_property32(&self, window: Xid, property: Atom, _ty: Atom, data: &[u32]) -> Result<()> {
        self.require(window)?;
        self.set_property32(window, property, data);
        Ok(())
    }

    fn change_property8(&self, window: Xid, property: Atom, _ty: Atom, data: &[u8]) -> Result<()> {
        self.require(window)?;
        self.set_property8(window, property, data);
        Ok(())
    }

    fn delete_property(&self, window: Xid, property: Atom) -> Result<()> {
        self.require(window)?;
        self.remove_property(window, property);
        Ok(())
    }

    fn create_surface(&self, spec: &SurfaceSpec) -> Result<Xid> {
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_id += 1;
            state.next_id
        };
        self.add_window(
            id,
            WindowAttributes {
                geometry: spec.geometry,
                border_width: spec.border_width,
                override_redirect: spec.override_redirect,
                viewable: false,
            },
        );
        Ok(id)
    }

    fn destroy_window(&self, window: Xid) -> Result<()> {
        self.require(window)?;
        self.record(Request::Destroy(window));
        let children: Vec<Xid> = self
            .state
            .borrow()
            .windows
            .iter()
            .filter(|(_, win)| win.parent == window)
            .map(|(&id, _)| id)
            .collect();
        self.destroy(window);
        for child in children {
            self.destroy(child);
        }
        Ok(())
    }

    fn reparent(&self, window: Xid, parent: Xid, x: i32, y: i32) -> Result<()> {
        self.require(window)?;
        self.record(Request::Reparent(window, parent));
        let mut state = self.state.borrow_mut();
        state.stacking.retain(|&w| w != window);
        if parent == ROOT {
            state.stacking.push(window);
        }
        if let Some(win) = state.windows.get_mut(&window) {
            win.parent = parent;
            win.attrs.geometry.x = x;
            win.attrs.geometry.y = y;
        }
        Ok(())
    }

    fn watch_client(&self, window: Xid) -> Result<()> {
        self.require(window)
    }

    fn map(&self, window: Xid) -> Result<()> {
        self.require(window)?;
        self.record(Request::Map(window));
        self.set_mapped(window, true);
        Ok(())
    }

    fn unmap(&self, window: Xid) -> Result<()> {
        self.require(window)?;
        self.record(Request::Unmap(window));
        self.set_mapped(window, false);
        Ok(())
    }

    fn configure(&self, window: Xid, changes: &WindowChanges) -> Result<()> {
        self.require(window)?;
        self.record(Request::Configure(window, *changes));
        let mut state = self.state.borrow_mut();
        if let Some(win) = state.windows.get_mut(&window) {
            let g = &mut win.attrs.geometry;
            g.x = changes.x.unwrap_or(g.x);
            g.y = changes.y.unwrap_or(g.y);
            g.width = changes.width.unwrap_or(g.width);
            g.height = changes.height.unwrap_or(g.height);
            if let Some(border) = changes.border_width {
                win.attrs.border_width = border;
            }
        }
        if let Some(mode) = changes.stack_mode {
            let above = matches!(mode, StackMode::Above | StackMode::TopIf);
            Self::restack_above(&mut state.stacking, window, changes.sibling, above);
        }
        Ok(())
    }

    fn restack(&self, windows: &[Xid]) -> Result<()> {
        self.record(Request::Restack(windows.to_vec()));
        let Some((&first, rest)) = windows.split_first() else {
            return Ok(());
        };
        let mut state = self.state.borrow_mut();
        state.stacking.retain(|w| !rest.contains(w));
        if let Some(index) = state.stacking.iter().position(|&w| w == first) {
            state.stacking.splice(index..index, rest.iter().rev().copied());
        }
        Ok(())
    }

    fn stacking_order(&self) -> Result<Vec<Xid>> {
        Ok(self.state.borrow().stacking.clone())
    }

    fn set_input_focus(&self, window: Option<Xid>, _time: u32) -> Result<()> {
        self.record(Request::Focus(window));
        self.state.borrow_mut().focus = window;
        Ok(())
    }

    fn query_pointer(&self) -> Result<Option<(Xid, i32, i32)>> {
        Ok(self.state.borrow().pointer)
    }

    fn grab_keyboard(&self) -> Result<bool> {
        self.record(Request::GrabKeyboard);
        self.state.borrow_mut().keyboard_grabbed = true;
        Ok(true)
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        self.record(Request::UngrabKeyboard);
        self.state.borrow_mut().keyboard_grabbed = false;
        Ok(())
    }

    fn grab_key(&self, keycode: u8, modifiers: u16) -> Result<()> {
        self.state.borrow_mut().grabbed_keys.push((keycode, modifiers));
        Ok(())
    }

    fn keysym_to_keycode(&self, keysym: u32) -> Option<u8> {
        Some((keysym & 0xff) as u8)
    }

    fn send_client_message(&self, window: Xid, message_type: Atom, data: [u32; 5]) -> Result<()> {
        self.require(window)?;
        self.record(Request::ClientMessage(window, message_type, data));
        Ok(())
    }

    fn send_configure_notify(&self, window: Xid, _geometry: Geometry, _border_width: u32) -> Result<()> {
        self.require(window)
    }

    fn kill_client(&self, window: Xid) -> Result<()> {
        self.require(window)?;
        self.record(Request::Kill(window));
        Ok(())
    }

    fn set_border_width(&self, window: Xid, width: u32) -> Result<()> {
        self.require(window)?;
        if let Some(win) = self.state.borrow_mut().windows.get_mut(&window) {
            win.attrs.border_width = width;
        }
        Ok(())
    }

    fn set_background(&self, window: Xid, _color: u32) -> Result<()> {
        self.require(window)
    }

    fn draw_text(&self, window: Xid, _x: i32, _y: i32, text: &str, _fg: u32, _bg: u32) -> Result<()> {
        self.require(window)?;
        self.record(Request::DrawText(window, text.to_string()));
        Ok(())
    }

    fn fill_rect(&self, window: Xid, _rect: Geometry, _color: u32) -> Result<()> {
        self.require(window)
    }

    fn text_extents(&self, text: &str) -> (u32, u32) {
        (text.chars().count() as u32 * 7, 13)
    }

    fn pending_events(&self) -> Result<Vec<XEvent>> {
        Ok(self.state.borrow_mut().pending.drain(..).collect())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

static STATE_FILES: AtomicUsize = AtomicUsize::new(0);

/// Config for tests: three workspaces, session file in a private temp path
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.workspaces.initial_count = 3;
    let n = STATE_FILES.fetch_add(1, Ordering::Relaxed);
    config.session.state_file =
        std::env::temp_dir().join(format!("nextwm-test-{}-{}.json", std::process::id(), n));
    config
}

/// A screen driving `fake`, plus a handle for inspecting it
pub fn screen_with(fake: FakeConn) -> (Screen, FakeConn) {
    screen_with_config(fake, test_config())
}

pub fn screen_with_config(fake: FakeConn, config: Config) -> (Screen, FakeConn) {
    let handle = fake.clone();
    let screen = Screen::new(Box::new(fake), config).expect("screen setup");
    (screen, handle)
}

//! Stacking Module
//!
//! Manages window z-order and stacking levels. Raise and lower requests
//! only touch the model; the X server sees the result when the caller
//! commits, as one restack of every frame.

use std::collections::HashMap;
use tracing::debug;

use crate::wm::client_flags::StackLevel;
use crate::wm::error::{log_and_ignore, log_warn};
use crate::wm::screen::Screen;
use crate::wm::window::WindowRecord;
use crate::wm::xconn::{Xid, predefined};

/// Stacking manager
#[derive(Debug, Default)]
pub struct StackingManager {
    /// Requested order of managed windows (bottom to top)
    order: Vec<Xid>,
    /// Frame order last sent to the server (top to bottom)
    committed: Vec<Xid>,
}

impl StackingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new window on top
    pub fn add_window(&mut self, window: Xid) {
        if !self.order.contains(&window) {
            self.order.push(window);
        }
    }

    pub fn remove_window(&mut self, window: Xid) {
        self.order.retain(|&w| w != window);
    }

    /// Move to the top of its level
    pub fn raise(&mut self, window: Xid) {
        self.remove_window(window);
        self.order.push(window);
    }

    /// Move to the bottom of its level
    pub fn lower(&mut self, window: Xid) {
        self.remove_window(window);
        self.order.insert(0, window);
    }

    /// Put `window` right above (or below) `sibling`
    pub fn place_next_to(&mut self, window: Xid, sibling: Xid, above: bool) {
        if window == sibling {
            return;
        }
        self.remove_window(window);
        match self.order.iter().position(|&w| w == sibling) {
            Some(pos) if above => self.order.insert(pos + 1, window),
            Some(pos) => self.order.insert(pos, window),
            None if above => self.order.push(window),
            None => self.order.insert(0, window),
        }
    }

    /// Requested order, bottom to top
    pub fn requested(&self) -> &[Xid] {
        &self.order
    }

    /// Final order, bottom to top: by level, then by request order
    pub fn resolved(&self, windows: &HashMap<Xid, WindowRecord>) -> Vec<Xid> {
        let mut order: Vec<Xid> = self
            .order
            .iter()
            .copied()
            .filter(|w| windows.contains_key(w))
            .collect();
        order.sort_by_key(|w| windows.get(w).map_or(StackLevel::Normal, |win| win.level));
        order
    }

    /// Replace the model with an order read back from the server
    pub fn replace(&mut self, order: Vec<Xid>) {
        self.order = order;
    }

    /// Record what was sent; false if it matches the last commit
    fn mark_committed(&mut self, frames: Vec<Xid>) -> bool {
        if self.committed == frames {
            return false;
        }
        self.committed = frames;
        true
    }

    fn forget_committed(&mut self) {
        self.committed.clear();
    }
}

impl Screen {
    pub fn raise_window(&mut self, window: Xid) {
        if self.windows.contains_key(&window) {
            debug!("Raising {:#x}", window);
            self.stacking.raise(window);
        }
    }

    pub fn lower_window(&mut self, window: Xid) {
        if self.windows.contains_key(&window) {
            debug!("Lowering {:#x}", window);
            self.stacking.lower(window);
        }
    }

    /// Send the requested stacking to the server
    ///
    /// One restack for the whole frame list, skipped when nothing moved
    /// since the last commit.
    pub fn commit_stacking(&mut self) {
        let order = self.stacking.resolved(&self.windows);
        let frames: Vec<Xid> = order
            .iter()
            .rev()
            .filter_map(|w| self.windows.get(w).map(|win| win.frame))
            .collect();
        if !self.stacking.mark_committed(frames.clone()) {
            return;
        }
        self.stacking.replace(order.clone());
        log_and_ignore(self.conn.restack(&frames), "restack frames");
        log_and_ignore(
            self.conn.change_property32(
                self.root,
                self.atoms.net_client_list_stacking,
                predefined::WINDOW,
                &order,
            ),
            "set _NET_CLIENT_LIST_STACKING",
        );
    }

    /// Rebuild the model from the server after a client-driven restack
    pub fn remake_stack_list(&mut self) {
        let Some(server_order) = log_warn(self.conn.stacking_order(), "query stacking order") else {
            return;
        };
        let mut order: Vec<Xid> = Vec::with_capacity(self.windows.len());
        for xid in server_order {
            let window = self.frames.get(&xid).copied();
            if let Some(window) = window.filter(|w| self.windows.get(w).is_some_and(|win| win.frame == xid)) {
                order.push(window);
            }
        }
        for &window in self.stacking.requested() {
            if !order.contains(&window) {
                order.push(window);
            }
        }
        self.stacking.replace(order);
        self.stacking.forget_committed();
        log_and_ignore(
            self.conn.change_property32(
                self.root,
                self.atoms.net_client_list_stacking,
                predefined::WINDOW,
                self.stacking.requested(),
            ),
            "set _NET_CLIENT_LIST_STACKING",
        );
    }
}

//! Notifications
//!
//! Events the core posts for the outside world (pager, dock, session
//! tools, the user). The main loop drains the queue after each dispatch
//! and fans the values out to IPC clients and the desktop notifier.

use std::collections::VecDeque;

use nextwm_ipc::WmEvent;

use crate::wm::workspace::WorkspaceManager;
use crate::wm::xconn::Xid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    WorkspaceCreated(usize),
    WorkspaceDestroyed(usize),
    WorkspaceChanged(usize),
    WorkspaceNameChanged(usize),
    WindowFocused(Option<Xid>),
    /// Non-blocking message for the user
    Alert { title: String, message: String },
}

impl Notification {
    /// Wire form for IPC clients
    pub fn to_event(&self, workspaces: &WorkspaceManager) -> WmEvent {
        let total = workspaces.count() as u32;
        match self {
            Notification::WorkspaceCreated(index) => WmEvent::WorkspaceCreated {
                index: *index as u32,
                total,
            },
            Notification::WorkspaceDestroyed(index) => WmEvent::WorkspaceDestroyed {
                index: *index as u32,
                total,
            },
            Notification::WorkspaceChanged(current) => WmEvent::WorkspaceChanged {
                current: *current as u32,
                total,
            },
            Notification::WorkspaceNameChanged(index) => WmEvent::WorkspaceRenamed {
                index: *index as u32,
                name: workspaces.name(*index).unwrap_or_default().to_string(),
            },
            Notification::WindowFocused(id) => WmEvent::WindowFocused { id: *id },
            Notification::Alert { title, message } => WmEvent::Alert {
                title: title.clone(),
                message: message.clone(),
            },
        }
    }
}

/// FIFO of pending notifications
#[derive(Debug, Default)]
pub struct NotificationCenter {
    queue: VecDeque<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, notification: Notification) {
        self.queue.push_back(notification);
    }

    pub fn alert(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.post(Notification::Alert {
            title: title.into(),
            message: message.into(),
        });
    }

    /// Take everything posted so far, oldest first
    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_is_fifo() {
        let mut center = NotificationCenter::new();
        center.post(Notification::WorkspaceCreated(1));
        center.alert("Run Error", "Could not execute command: foo");
        assert_eq!(center.len(), 2);

        let drained = center.drain();
        assert_eq!(drained[0], Notification::WorkspaceCreated(1));
        assert!(matches!(drained[1], Notification::Alert { ref title, .. } if title == "Run Error"));
        assert!(center.is_empty());
    }
}

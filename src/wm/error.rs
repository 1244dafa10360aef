//! Error types for the window manager core

use anyhow::Result;
use thiserror::Error;
use tracing::warn;

use crate::wm::xconn::Xid;

#[derive(Debug, Error)]
pub enum WmError {
    #[error("window {0:#x} no longer exists")]
    WindowGone(Xid),

    #[error("invalid workspace index {0}")]
    InvalidWorkspace(usize),

    #[error("workspace {0} still has windows on it")]
    WorkspaceOccupied(usize),

    #[error("maximum number of workspaces reached")]
    WorkspaceLimit,

    #[error("could not execute command: {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("window {0:#x} has no command to relaunch")]
    NoCommand(Xid),

    #[error("X connection error: {0}")]
    Connection(String),
}

/// Log a failed request and keep its value when it succeeded
///
/// Requests on client windows race with the client exiting; a failure is
/// treated as the window being gone already.
pub fn log_warn<T>(result: Result<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}: {:#}", what, e);
            None
        }
    }
}

/// Log a failed request and carry on
pub fn log_and_ignore(result: Result<()>, what: &str) {
    let _ = log_warn(result, what);
}

//! Control socket
//!
//! Pagers and session tools connect to a Unix socket, receive [`WmEvent`]s
//! and send [`WmCommand`]s. Commands are applied to the screen on the main
//! loop by [`apply_command`].

use anyhow::{Context, Result};
use nextwm_ipc::{FramedMessage, WmCommand, WmEvent};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::wm::Screen;

/// Events are dropped for peers lagging further behind than this
const EVENT_BACKLOG: usize = 256;

/// Handle kept by the main loop
pub struct IpcHandle {
    path: PathBuf,
    event_tx: broadcast::Sender<WmEvent>,
    pub command_rx: mpsc::Receiver<WmCommand>,
}

impl IpcHandle {
    /// Broadcast an event to every connected tool
    pub fn broadcast(&self, event: WmEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }
}

impl Drop for IpcHandle {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Bind the socket at `path` and accept peers in the background
pub fn start(path: &Path) -> Result<IpcHandle> {
    if path.exists() {
        std::fs::remove_file(path).with_context(|| format!("Failed to remove stale socket {:?}", path))?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(path).with_context(|| format!("Failed to bind {:?}", path))?;
    info!("IPC server listening on {:?}", path);

    let (event_tx, _) = broadcast::channel(EVENT_BACKLOG);
    let (command_tx, command_rx) = mpsc::channel(EVENT_BACKLOG);

    let accept_events = event_tx.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    debug!("IPC peer connected");
                    tokio::spawn(handle_peer(stream, accept_events.subscribe(), command_tx.clone()));
                }
                Err(e) => {
                    error!("IPC accept error: {}", e);
                    break;
                }
            }
        }
    });

    Ok(IpcHandle {
        path: path.to_path_buf(),
        event_tx,
        command_rx,
    })
}

async fn handle_peer(
    stream: UnixStream,
    mut events: broadcast::Receiver<WmEvent>,
    commands: mpsc::Sender<WmCommand>,
) {
    let (mut reader, mut writer) = stream.into_split();

    let reader_task = tokio::spawn(async move {
        loop {
            let payload = match FramedMessage::read_from(&mut reader).await {
                Ok(Some(payload)) => payload,
                Ok(None) => break,
                Err(e) => {
                    warn!("Dropping IPC peer: {:#}", e);
                    break;
                }
            };
            match FramedMessage::decode_command(&payload) {
                Ok(command) => {
                    debug!("IPC command: {:?}", command);
                    if commands.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Failed to decode IPC command: {:#}", e),
            }
        }
    });

    let writer_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match FramedMessage::new(&event) {
                    Ok(msg) => {
                        if writer.write_all(&msg.encode()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to encode event: {:#}", e),
                },
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => warn!("IPC peer lagged {} events", n),
            }
        }
    });

    tokio::select! {
        _ = reader_task => {}
        _ = writer_task => {}
    }
    debug!("IPC peer disconnected");
}

/// Apply one command from a tool
pub fn apply_command(screen: &mut Screen, command: WmCommand) {
    match command {
        WmCommand::SwitchWorkspace { index } => screen.switch_workspace(index as usize),
        WmCommand::RelativeWorkspace { amount } => screen.relative_switch_workspace(amount),
        WmCommand::LastWorkspace => screen.switch_to_last_workspace(),
        WmCommand::NewWorkspace => {
            if let Err(e) = screen.new_workspace() {
                warn!("Cannot add workspace: {:#}", e);
            }
        }
        WmCommand::DeleteWorkspace { index } => {
            if let Err(e) = screen.delete_workspace(index as usize) {
                warn!("Cannot delete workspace {}: {:#}", index, e);
            }
        }
        WmCommand::RenameWorkspace { index, name } => screen.rename_workspace(index as usize, &name),
        WmCommand::FocusWindow { id } => match screen.window_for(id) {
            Some(window) => {
                screen.make_visible(window);
                screen.set_focus_to(Some(window));
                screen.raise_window(window);
                screen.commit_stacking();
            }
            None => debug!("FocusWindow for unmanaged {:#x}", id),
        },
        WmCommand::CloseWindow { id } => match screen.window_for(id) {
            Some(window) => screen.close_window(window),
            None => debug!("CloseWindow for unmanaged {:#x}", id),
        },
        WmCommand::Exec { command } => {
            if let Err(e) = screen.execute_shell_command(&command) {
                warn!("Exec failed: {:#}", e);
            }
        }
        WmCommand::Relaunch { id } => match screen.window_for(id) {
            Some(window) => {
                if let Err(e) = screen.relaunch_window(window) {
                    warn!("Relaunch failed: {:#}", e);
                }
            }
            None => debug!("Relaunch for unmanaged {:#x}", id),
        },
        WmCommand::Reconfigure => screen.flags.reconfigure = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::{FakeConn, screen_with};

    #[test]
    fn test_workspace_commands() {
        let (mut screen, _fake) = screen_with(FakeConn::new());
        apply_command(&mut screen, WmCommand::NewWorkspace);
        assert_eq!(screen.workspaces.count(), 4);
        apply_command(&mut screen, WmCommand::SwitchWorkspace { index: 3 });
        assert_eq!(screen.current_workspace(), 3);
        apply_command(&mut screen, WmCommand::LastWorkspace);
        assert_eq!(screen.current_workspace(), 0);
        apply_command(
            &mut screen,
            WmCommand::RenameWorkspace {
                index: 1,
                name: "Mail".into(),
            },
        );
        assert_eq!(screen.workspaces.name(1), Some("Mail"));
    }

    #[test]
    fn test_focus_command_reveals_window() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        let b = fake.add_client(0x200, "b");
        screen.manage_window(a).unwrap();
        screen.manage_window(b).unwrap();
        screen.iconify(a);
        apply_command(&mut screen, WmCommand::FocusWindow { id: a });
        assert!(!screen.windows[&a].state.miniaturized);
        assert_eq!(screen.focused, Some(a));
    }

    #[test]
    fn test_reconfigure_sets_flag() {
        let (mut screen, _fake) = screen_with(FakeConn::new());
        apply_command(&mut screen, WmCommand::Reconfigure);
        assert!(screen.flags.reconfigure);
    }

    #[tokio::test]
    async fn test_socket_round_trip() {
        let dir = std::env::temp_dir().join(format!("nextwm-ipc-test-{}", std::process::id()));
        let path = dir.join("nextwm.sock");
        let mut handle = start(&path).unwrap();

        let mut peer = UnixStream::connect(&path).await.unwrap();
        let msg = FramedMessage::new(&WmCommand::LastWorkspace).unwrap();
        peer.write_all(&msg.encode()).await.unwrap();
        assert_eq!(handle.command_rx.recv().await, Some(WmCommand::LastWorkspace));

        handle.broadcast(WmEvent::WindowFocused { id: Some(7) });
        let payload = FramedMessage::read_from(&mut peer).await.unwrap().unwrap();
        assert_eq!(
            FramedMessage::decode_event(&payload).unwrap(),
            WmEvent::WindowFocused { id: Some(7) }
        );
        drop(handle);
        assert!(!path.exists());
    }
}

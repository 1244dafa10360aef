//! NextWM IPC Protocol
//!
//! Wire formats shared between `nextwm` and the processes it talks to:
//! pagers and session tools over the control socket, and the background
//! helper over its stdin pipe (see [`helper`]).

pub mod helper;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest frame accepted from a socket peer
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Socket path for IPC communication
pub fn socket_path() -> std::path::PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .unwrap_or_else(|_| format!("/run/user/{}", unsafe { libc::getuid() }));
    std::path::PathBuf::from(runtime_dir).join("nextwm.sock")
}

// ============================================================================
// WM → Tool Events
// ============================================================================

/// Events broadcast by the window manager to connected tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WmEvent {
    /// A workspace was appended
    WorkspaceCreated { index: u32, total: u32 },

    /// A workspace was removed (index is the new last index)
    WorkspaceDestroyed { index: u32, total: u32 },

    /// The current workspace changed
    WorkspaceChanged { current: u32, total: u32 },

    /// A workspace was renamed
    WorkspaceRenamed { index: u32, name: String },

    /// A window received focus (None = root)
    WindowFocused { id: Option<u32> },

    /// Something went wrong that the user should know about
    Alert { title: String, message: String },
}

// ============================================================================
// Tool → WM Commands
// ============================================================================

/// Commands accepted by the window manager on the control socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WmCommand {
    /// Switch to a workspace by index
    SwitchWorkspace { index: u32 },

    /// Move relative to the current workspace
    RelativeWorkspace { amount: i32 },

    /// Switch back to the previously used workspace
    LastWorkspace,

    /// Append a workspace
    NewWorkspace,

    /// Delete a workspace (fails if occupied)
    DeleteWorkspace { index: u32 },

    /// Rename a workspace
    RenameWorkspace { index: u32, name: String },

    /// Focus a client window
    FocusWindow { id: u32 },

    /// Politely close a client window
    CloseWindow { id: u32 },

    /// Run a shell command
    Exec { command: String },

    /// Start another instance of a client's application
    Relaunch { id: u32 },

    /// Reload the configuration file
    Reconfigure,
}

// ============================================================================
// Message Framing
// ============================================================================

/// A framed message with length prefix for reliable socket reads
#[derive(Debug)]
pub struct FramedMessage {
    pub data: Vec<u8>,
}

impl FramedMessage {
    /// Create a new framed message from serializable data
    pub fn new<T: Serialize>(msg: &T) -> anyhow::Result<Self> {
        let data = serde_json::to_vec(msg)?;
        Ok(Self { data })
    }

    /// Encode message with length prefix (4 bytes, big-endian)
    pub fn encode(&self) -> Vec<u8> {
        let len = self.data.len() as u32;
        let mut buf = Vec::with_capacity(4 + self.data.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Decode a WM event from bytes
    pub fn decode_event(data: &[u8]) -> anyhow::Result<WmEvent> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Decode a command from bytes
    pub fn decode_command(data: &[u8]) -> anyhow::Result<WmCommand> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Read one frame payload from a stream
    ///
    /// Returns `Ok(None)` on a clean end of stream.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> anyhow::Result<Option<Vec<u8>>> {
        let mut len_buf = [0u8; 4];
        if reader.read_exact(&mut len_buf).await.is_err() {
            return Ok(None);
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            anyhow::bail!("Message too large: {} bytes", len);
        }
        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await?;
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_prefixes_big_endian_length() {
        let msg = FramedMessage::new(&WmCommand::LastWorkspace).unwrap();
        let encoded = msg.encode();
        let len = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]) as usize;
        assert_eq!(len, encoded.len() - 4);
        assert_eq!(&encoded[4..], msg.data.as_slice());
    }

    #[test]
    fn test_event_is_tagged() {
        let event = WmEvent::WorkspaceChanged { current: 2, total: 3 };
        let msg = FramedMessage::new(&event).unwrap();
        let text = String::from_utf8(msg.data.clone()).unwrap();
        assert!(text.contains("\"type\":\"WorkspaceChanged\""));

        let decoded = FramedMessage::decode_event(&msg.data).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_command_from_tool_json() {
        let raw = br#"{"type":"RenameWorkspace","index":1,"name":"Mail"}"#;
        let cmd = FramedMessage::decode_command(raw).unwrap();
        assert_eq!(
            cmd,
            WmCommand::RenameWorkspace {
                index: 1,
                name: "Mail".into()
            }
        );
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let raw = br#"{"type":"SelfDestruct"}"#;
        assert!(FramedMessage::decode_command(raw).is_err());
    }

    #[tokio::test]
    async fn test_read_from_stream() {
        let msg = FramedMessage::new(&WmCommand::NewWorkspace).unwrap();
        let mut bytes = msg.encode();
        bytes.extend_from_slice(&FramedMessage::new(&WmCommand::Reconfigure).unwrap().encode());
        let mut reader = bytes.as_slice();

        let first = FramedMessage::read_from(&mut reader).await.unwrap().unwrap();
        assert_eq!(FramedMessage::decode_command(&first).unwrap(), WmCommand::NewWorkspace);
        let second = FramedMessage::read_from(&mut reader).await.unwrap().unwrap();
        assert_eq!(FramedMessage::decode_command(&second).unwrap(), WmCommand::Reconfigure);
        assert!(FramedMessage::read_from(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_from_rejects_oversized_frame() {
        let bytes = ((MAX_FRAME_LEN as u32) + 1).to_be_bytes();
        let mut reader = &bytes[..];
        assert!(FramedMessage::read_from(&mut reader).await.is_err());
    }
}

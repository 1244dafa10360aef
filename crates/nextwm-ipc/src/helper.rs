//! Background helper protocol
//!
//! Messages written to the helper's stdin. Each message is
//! `<len:4 ascii><kind:1>[<workspace:4 ascii>]<payload>`, where `len`
//! counts everything after the length field. Numbers are right-aligned
//! decimal, space padded, like C's `%4i`.

use thiserror::Error;

/// Largest value the 4-character length field can hold
pub const MAX_LEN: usize = 9999;

/// Message kinds understood by the helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperKind {
    /// Workspace changed; the workspace field is 1-based
    ChangeWorkspace,
    /// Set the background texture of a workspace
    SetTexture,
    /// Forget the texture of a workspace
    UnsetTexture,
    /// Set the directory list used to look up pixmaps
    PixmapPath,
    /// Exit
    Kill,
}

impl HelperKind {
    pub fn as_byte(self) -> u8 {
        match self {
            HelperKind::ChangeWorkspace => b'C',
            HelperKind::SetTexture => b'S',
            HelperKind::UnsetTexture => b'U',
            HelperKind::PixmapPath => b'P',
            HelperKind::Kill => b'K',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            b'C' => HelperKind::ChangeWorkspace,
            b'S' => HelperKind::SetTexture,
            b'U' => HelperKind::UnsetTexture,
            b'P' => HelperKind::PixmapPath,
            b'K' => HelperKind::Kill,
            _ => return None,
        })
    }

    /// Whether messages of this kind carry a workspace field
    pub fn has_workspace(self) -> bool {
        matches!(
            self,
            HelperKind::ChangeWorkspace | HelperKind::SetTexture | HelperKind::UnsetTexture
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HelperError {
    #[error("helper message too long ({0} bytes)")]
    TooLong(usize),
    #[error("workspace {0} does not fit the 4-character field")]
    BadWorkspace(i32),
    #[error("truncated helper message")]
    Truncated,
    #[error("malformed number field {0:?}")]
    BadNumber(String),
    #[error("unknown helper message kind {0:#x}")]
    UnknownKind(u8),
}

/// A decoded helper message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperMessage {
    pub kind: HelperKind,
    pub workspace: Option<i32>,
    pub payload: Vec<u8>,
}

impl HelperMessage {
    pub fn new(kind: HelperKind, workspace: Option<i32>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            workspace,
            payload: payload.into(),
        }
    }

    /// The "switched to workspace `index`" notification (0-based index in)
    pub fn change_workspace(index: usize) -> Self {
        Self::new(HelperKind::ChangeWorkspace, Some(index as i32 + 1), Vec::new())
    }

    pub fn encode(&self) -> Result<Vec<u8>, HelperError> {
        encode(self.kind, self.workspace, &self.payload)
    }
}

/// Frame a helper message
pub fn encode(kind: HelperKind, workspace: Option<i32>, payload: &[u8]) -> Result<Vec<u8>, HelperError> {
    let len = payload.len() + if workspace.is_some() { 4 } else { 0 } + 1;
    if len > MAX_LEN {
        return Err(HelperError::TooLong(len));
    }

    let mut buf = Vec::with_capacity(len + 4);
    buf.extend_from_slice(format!("{:>4}", len).as_bytes());
    buf.push(kind.as_byte());
    if let Some(ws) = workspace {
        let field = format!("{:>4}", ws);
        if field.len() != 4 {
            return Err(HelperError::BadWorkspace(ws));
        }
        buf.extend_from_slice(field.as_bytes());
    }
    buf.extend_from_slice(payload);
    Ok(buf)
}

fn parse_field(field: &[u8]) -> Result<i32, HelperError> {
    let text = String::from_utf8_lossy(field);
    text.trim()
        .parse()
        .map_err(|_| HelperError::BadNumber(text.into_owned()))
}

/// Decode one message from the front of `data`
///
/// Returns the message and the number of bytes consumed.
pub fn decode(data: &[u8]) -> Result<(HelperMessage, usize), HelperError> {
    if data.len() < 5 {
        return Err(HelperError::Truncated);
    }
    let len = parse_field(&data[..4])?;
    if len < 1 {
        return Err(HelperError::BadNumber(len.to_string()));
    }
    let len = len as usize;
    if data.len() < len + 4 {
        return Err(HelperError::Truncated);
    }

    let kind = HelperKind::from_byte(data[4]).ok_or(HelperError::UnknownKind(data[4]))?;
    let body = &data[5..len + 4];
    let (workspace, payload) = if kind.has_workspace() {
        if body.len() < 4 {
            return Err(HelperError::Truncated);
        }
        (Some(parse_field(&body[..4])?), &body[4..])
    } else {
        (None, body)
    };

    Ok((HelperMessage::new(kind, workspace, payload), len + 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_workspace_layout() {
        let bytes = HelperMessage::change_workspace(2).encode().unwrap();
        // len = 0 payload + 4 workspace + 1 kind
        assert_eq!(bytes, b"   5C   3".to_vec());
        assert_eq!(bytes.len(), 5 + 4);
    }

    #[test]
    fn test_pixmap_path_has_no_workspace() {
        let bytes = encode(HelperKind::PixmapPath, None, b"/usr/share/pixmaps").unwrap();
        assert_eq!(&bytes[..4], b"  19");
        assert_eq!(bytes[4], b'P');
        assert_eq!(&bytes[5..], b"/usr/share/pixmaps");
    }

    #[test]
    fn test_texture_decode() {
        let bytes = encode(HelperKind::SetTexture, Some(0), b"(solid, black)").unwrap();
        let (msg, used) = decode(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(msg.kind, HelperKind::SetTexture);
        assert_eq!(msg.workspace, Some(0));
        assert_eq!(msg.payload, b"(solid, black)".to_vec());
    }

    #[test]
    fn test_decode_stream_of_two() {
        let mut stream = encode(HelperKind::Kill, None, b"").unwrap();
        stream.extend(HelperMessage::change_workspace(0).encode().unwrap());

        let (first, used) = decode(&stream).unwrap();
        assert_eq!(first.kind, HelperKind::Kill);
        let (second, _) = decode(&stream[used..]).unwrap();
        assert_eq!(second.workspace, Some(1));
    }

    #[test]
    fn test_too_long_is_rejected() {
        let payload = vec![b'x'; MAX_LEN];
        assert_eq!(
            encode(HelperKind::PixmapPath, None, &payload),
            Err(HelperError::TooLong(MAX_LEN + 1))
        );
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(decode(b"  12S   1ab"), Err(HelperError::Truncated));
        assert_eq!(decode(b"  1"), Err(HelperError::Truncated));
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(decode(b"   1Z"), Err(HelperError::UnknownKind(b'Z')));
    }
}

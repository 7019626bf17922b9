//! Common data types and message validation rules.

use serde::{Deserialize, Serialize};

use crate::codec::{CodecResult, Decode, Encode, Reader, Writer};

/// Maximum accepted chat message length in bytes. Longer messages are
/// trimmed, not rejected.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Username used for operator messages originating from the server itself.
pub const SERVER_SENTINEL: &str = "SERVER";

/// Display color used for senders missing from the roster.
pub const FALLBACK_COLOR: u32 = 0xFFFF_FFFF;

/// Port assumed when a connection target has no explicit port suffix.
pub const DEFAULT_PORT: u16 = 8192;

/// A connected, authenticated participant.
///
/// The username is unique among currently connected users; uniqueness is
/// enforced by the server at authentication time with a case-sensitive
/// exact match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// 32-bit RGB value; the most significant 8 bits are ignored.
    pub color: u32,
    pub username: String,
}

impl Encode for UserInfo {
    fn encode(&self, w: &mut Writer<'_>) {
        w.write_u32(self.color);
        w.write_string(&self.username);
    }
}

impl Decode for UserInfo {
    fn decode(r: &mut Reader<'_>) -> CodecResult<Self> {
        Ok(Self {
            color: r.read_u32()?,
            username: r.read_string()?,
        })
    }
}

/// One chat message as recorded in history. Immutable once created;
/// appended in arrival order, never reordered.
///
/// The serde field names match the on-disk history document records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "User")]
    pub username: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl ChatMessage {
    pub fn new(username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            message: message.into(),
        }
    }
}

impl Encode for ChatMessage {
    fn encode(&self, w: &mut Writer<'_>) {
        w.write_string(&self.username);
        w.write_string(&self.message);
    }
}

impl Decode for ChatMessage {
    fn decode(r: &mut Reader<'_>) -> CodecResult<Self> {
        Ok(Self {
            username: r.read_string()?,
            message: r.read_string()?,
        })
    }
}

/// Validate a chat message in place.
///
/// Empty and whitespace-only messages are rejected. Messages longer than
/// [`MAX_MESSAGE_LEN`] bytes are trimmed to fit (backing off to the nearest
/// character boundary) rather than rejected.
pub fn validate_message(message: &mut String) -> bool {
    if message.is_empty() {
        return false;
    }

    if message.chars().all(char::is_whitespace) {
        return false;
    }

    if message.len() > MAX_MESSAGE_LEN {
        let mut cut = MAX_MESSAGE_LEN;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }

    true
}

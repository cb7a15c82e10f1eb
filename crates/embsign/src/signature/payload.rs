//! Canonical signing payload.
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ magic  (8 bytes, big-endian)       │
//! │ length (8 bytes, big-endian)       │
//! │ offset (8 bytes, big-endian)       │
//! ├────────────────────────────────────┤
//! │ message (entire buffer, including  │
//! │ the placeholder bytes)             │
//! └────────────────────────────────────┘
//! ```
//!
//! Both the length and the placeholder offset are committed to, so a
//! signature cannot be moved to another offset or reused on a truncated or
//! extended buffer.

/// `"\0EMBSIGN"` as a big-endian integer.
pub const PAYLOAD_MAGIC: u64 = 0x0045_4d42_5349_474e;

/// Size of the payload header in bytes (magic + length + offset).
pub const HEADER_LEN: usize = 24;

/// Fixed header prepended to the message before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    /// Always [`PAYLOAD_MAGIC`]
    pub magic: u64,
    /// Length of the message in bytes
    pub length: u64,
    /// Offset of the placeholder within the message
    pub offset: u64,
}

impl PayloadHeader {
    /// Header for `message` with the placeholder at `offset`.
    pub fn new(message: &[u8], offset: u64) -> Self {
        Self {
            magic: PAYLOAD_MAGIC,
            length: message.len() as u64,
            offset,
        }
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..8].copy_from_slice(&self.magic.to_be_bytes());
        out[8..16].copy_from_slice(&self.length.to_be_bytes());
        out[16..24].copy_from_slice(&self.offset.to_be_bytes());
        out
    }
}

/// Builds the byte sequence that is actually signed.
pub fn signing_payload(message: &[u8], offset: u64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(HEADER_LEN + message.len());
    payload.extend_from_slice(&PayloadHeader::new(message, offset).to_bytes());
    payload.extend_from_slice(message);
    payload
}

//! Presence text stored on-chain as a zero-padded `bytes32`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of the on-chain status slot
pub const STATUS_WIDTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("status is {len} bytes, limit is 32")]
    TooLong { len: usize },
    #[error("status may not contain NUL")]
    EmbeddedNul,
    #[error("status bytes are not UTF-8")]
    InvalidUtf8,
    #[error("status hex must be 32 bytes")]
    BadHex,
    #[error("no status preset named {0:?}")]
    UnknownPreset(String),
}

/// Fixed-width encoded status
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusBytes(pub [u8; STATUS_WIDTH]);

impl StatusBytes {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, StatusError> {
        let raw = s.trim();
        let raw = raw.strip_prefix("0x").unwrap_or(raw);
        let bytes = hex::decode(raw).map_err(|_| StatusError::BadHex)?;
        let array: [u8; STATUS_WIDTH] =
            bytes.as_slice().try_into().map_err(|_| StatusError::BadHex)?;
        Ok(StatusBytes(array))
    }
}

impl fmt::Debug for StatusBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusBytes({})", self.to_hex())
    }
}

/// Encode text into the status slot, padding with zero bytes
pub fn encode_status(text: &str) -> Result<StatusBytes, StatusError> {
    let raw = text.as_bytes();
    if raw.len() > STATUS_WIDTH {
        return Err(StatusError::TooLong { len: raw.len() });
    }
    // NUL is the padding byte, so text containing it could not be recovered
    if raw.contains(&0) {
        return Err(StatusError::EmbeddedNul);
    }
    let mut bytes = [0u8; STATUS_WIDTH];
    bytes[..raw.len()].copy_from_slice(raw);
    Ok(StatusBytes(bytes))
}

/// Decode a status slot, dropping trailing padding
pub fn decode_status(bytes: &StatusBytes) -> Result<String, StatusError> {
    let end = bytes.0.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    std::str::from_utf8(&bytes.0[..end])
        .map(str::to_owned)
        .map_err(|_| StatusError::InvalidUtf8)
}

/// Statuses offered by the game UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusPreset {
    Normal,
    Focus,
    DoNotDisturb,
}

impl StatusPreset {
    pub const ALL: [StatusPreset; 3] = [
        StatusPreset::Normal,
        StatusPreset::Focus,
        StatusPreset::DoNotDisturb,
    ];

    pub fn text(self) -> &'static str {
        match self {
            StatusPreset::Normal => "Normal",
            StatusPreset::Focus => "Focus",
            StatusPreset::DoNotDisturb => "Do not disturb",
        }
    }
}

impl FromStr for StatusPreset {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        StatusPreset::ALL
            .into_iter()
            .find(|p| p.text().eq_ignore_ascii_case(s))
            .ok_or_else(|| StatusError::UnknownPreset(s.to_owned()))
    }
}

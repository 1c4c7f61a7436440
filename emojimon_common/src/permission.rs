use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("unknown permission level {0}")]
    UnknownLevel(u32),
    #[error("unrecognized permission level {0:?}")]
    UnknownLabel(String),
}

/// Who may open a chat with the owner of this setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum PermissionLevel {
    /// Anyone
    #[default]
    Public = 0,
    /// Accounts that follow the owner
    Follower = 1,
    /// Mutual follows, kept distinct from Friend on the wire
    Following = 2,
    /// Mutual follows only
    Friend = 3,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::Public,
        PermissionLevel::Follower,
        PermissionLevel::Following,
        PermissionLevel::Friend,
    ];

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            PermissionLevel::Public => "Public",
            PermissionLevel::Follower => "Follower",
            PermissionLevel::Following => "Following",
            PermissionLevel::Friend => "Friend",
        }
    }
}

impl TryFrom<u32> for PermissionLevel {
    type Error = PermissionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PermissionLevel::ALL
            .into_iter()
            .find(|level| level.as_u32() == value)
            .ok_or(PermissionError::UnknownLevel(value))
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = PermissionError;

    /// Accepts a label (case-insensitive) or the numeric level
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(level) = PermissionLevel::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(s))
        {
            return Ok(level);
        }
        let raw = s
            .parse::<u32>()
            .map_err(|_| PermissionError::UnknownLabel(s.to_owned()))?;
        PermissionLevel::try_from(raw)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Relationship facts between a sender and a receiver, as read from the social contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChatRelation {
    /// The sender follows the receiver
    pub sender_follows: bool,
    /// The receiver follows the sender
    pub receiver_follows: bool,
    /// A block exists in either direction
    pub blocked: bool,
    /// The receiver's setting
    pub receiver_level: PermissionLevel,
}

/// Whether the sender may message the receiver. A block always wins.
pub fn chat_permitted(relation: ChatRelation) -> bool {
    if relation.blocked {
        return false;
    }
    match relation.receiver_level {
        PermissionLevel::Public => true,
        PermissionLevel::Follower => relation.sender_follows,
        PermissionLevel::Following | PermissionLevel::Friend => {
            relation.sender_follows && relation.receiver_follows
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors while parsing a hex identifier
#[derive(Debug, Error, PartialEq)]
pub enum IdParseError {
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

// Fixed-width byte identifier rendered as 0x-prefixed hex
macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.trim();
                let raw = raw.strip_prefix("0x").unwrap_or(raw);
                let bytes = hex::decode(raw)?;
                let array: [u8; $len] = bytes.as_slice().try_into().map_err(|_| {
                    IdParseError::WrongLength { expected: $len, actual: bytes.len() }
                })?;
                Ok($name(array))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }
    };
}

hex_id!(
    /// Opaque key of a game object in the world tables
    Entity, 32
);
hex_id!(
    /// Account address (20 bytes)
    Address, 20
);
hex_id!(
    /// Hash of a submitted transaction
    TxHash, 32
);

impl Entity {
    /// Key of the entity owned by an account: the address left-padded to 32 bytes
    pub fn from_address(address: Address) -> Self {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(&address.0);
        Entity(bytes)
    }

    /// Low 20 bytes of the key, i.e. the owning account for player entities
    pub fn as_address(&self) -> Address {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&self.0[12..]);
        Address(bytes)
    }
}

impl From<Address> for Entity {
    fn from(address: Address) -> Self {
        Entity::from_address(address)
    }
}

/// Grid cell occupied by an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by a delta, without wrapping
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Active monster encounter of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encounter {
    pub monster: Entity,
    /// Catch attempts made so far
    pub catch_attempts: u32,
}

/// Active chat of a player with another player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatWith {
    pub peer: Entity,
}

impl ChatWith {
    pub fn peer_address(&self) -> Address {
        self.peer.as_address()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MonsterType {
    Eagle = 1,
    Rat = 2,
    Caterpillar = 3,
}

impl MonsterType {
    pub const ALL: [MonsterType; 3] = [
        MonsterType::Eagle,
        MonsterType::Rat,
        MonsterType::Caterpillar,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| *m as u8 == value)
    }

    pub fn name(self) -> &'static str {
        match self {
            MonsterType::Eagle => "Eagle",
            MonsterType::Rat => "Rat",
            MonsterType::Caterpillar => "Caterpillar",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            MonsterType::Eagle => "🦅",
            MonsterType::Rat => "🐀",
            MonsterType::Caterpillar => "🐛",
        }
    }
}

/// Outcome of a throwBall, written by the world after the transaction lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MonsterCatchResult {
    Missed = 0,
    Caught = 1,
    Fled = 2,
}

impl MonsterCatchResult {
    /// Whether the encounter is over after this attempt
    pub fn ends_encounter(self) -> bool {
        !matches!(self, MonsterCatchResult::Missed)
    }
}

impl fmt::Display for MonsterCatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MonsterCatchResult::Missed => "missed",
            MonsterCatchResult::Caught => "caught",
            MonsterCatchResult::Fled => "fled",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_entity_key() {
        let address: Address = "0x1832A8533cBD5E769483d62825e5a249033fA6dc".parse().unwrap();
        let entity = Entity::from_address(address);
        assert_eq!(&entity.0[..12], &[0u8; 12]);
        assert_eq!(entity.as_address(), address);
    }

    #[test]
    fn chat_peer_is_low_twenty_bytes() {
        let key: Entity = "0x000000000000000000000000864215f6080b2f4551eae20330a470e085192d44"
            .parse()
            .unwrap();
        let chat = ChatWith { peer: key };
        assert_eq!(chat.peer_address().to_hex(), "0x864215f6080b2f4551eae20330a470e085192d44");
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = "0xdeadbeef".parse::<Address>().unwrap_err();
        assert_eq!(err, IdParseError::WrongLength { expected: 20, actual: 4 });
        assert!("0xzz".parse::<TxHash>().is_err());
    }

    #[test]
    fn monster_type_lookup() {
        assert_eq!(MonsterType::from_u8(2), Some(MonsterType::Rat));
        assert_eq!(MonsterType::from_u8(0), None);
        assert!(MonsterCatchResult::Caught.ends_encounter());
        assert!(!MonsterCatchResult::Missed.ends_encounter());
    }
}

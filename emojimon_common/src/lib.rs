//! Shared emojimon types: identifiers, component values, grid arithmetic,
//! chat permissions and the status codec. No I/O lives here.

pub mod types;
pub mod grid;
pub mod permission;
pub mod status;

pub use grid::{GridError, MapConfig, TerrainType};
pub use permission::{chat_permitted, ChatRelation, PermissionError, PermissionLevel};
pub use status::{
    decode_status, encode_status, StatusBytes, StatusError, StatusPreset, STATUS_WIDTH,
};
pub use types::{
    Address, ChatWith, Encounter, Entity, IdParseError, MonsterCatchResult, MonsterType, Position,
    TxHash,
};

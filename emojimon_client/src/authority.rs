//! Boundaries to the remote world and the social contract. Both are reachable
//! only through submit-then-confirm; confirmations come back on the
//! transaction stream, not through these calls.

use crate::error::ClientError;
use async_trait::async_trait;
use emojimon_common::{Address, StatusBytes, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// World system call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldCall {
    Move { x: i32, y: i32 },
    Spawn { x: i32, y: i32 },
    ThrowBall,
    Flee,
    LeaveChat,
}

impl WorldCall {
    /// Name of the system function on the world contract
    pub fn name(&self) -> &'static str {
        match self {
            WorldCall::Move { .. } => "move",
            WorldCall::Spawn { .. } => "spawn",
            WorldCall::ThrowBall => "throwBall",
            WorldCall::Flee => "flee",
            WorldCall::LeaveChat => "leaveChat",
        }
    }

    pub fn args(&self) -> Vec<i32> {
        match *self {
            WorldCall::Move { x, y } | WorldCall::Spawn { x, y } => vec![x, y],
            WorldCall::ThrowBall | WorldCall::Flee | WorldCall::LeaveChat => Vec::new(),
        }
    }
}

impl fmt::Display for WorldCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.name(), self.args())
    }
}

/// Handle returned once a transaction is accepted for inclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub hash: TxHash,
}

/// Fee parameters attached to social contract writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOptions {
    pub gas_limit: u64,
    pub max_priority_fee_per_gas: u64,
    pub max_fee_per_gas: u64,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            gas_limit: 1_000_000,
            max_priority_fee_per_gas: 0,
            max_fee_per_gas: 0,
        }
    }
}

#[async_trait]
pub trait WorldAuthority: Send + Sync {
    /// Send a system call; rejects synchronously if the world refuses it
    async fn submit(&self, call: WorldCall) -> Result<Submission, ClientError>;
}

/// Social plugin contract: follow graph, block list, chat permission, status
#[async_trait]
pub trait SocialAuthority: Send + Sync {
    async fn follow(
        &self,
        follower: Address,
        following: Address,
        options: TxOptions,
    ) -> Result<Submission, ClientError>;
    async fn unfollow(
        &self,
        follower: Address,
        following: Address,
        options: TxOptions,
    ) -> Result<Submission, ClientError>;
    async fn is_following(&self, follower: Address, following: Address)
    -> Result<bool, ClientError>;

    async fn block_user(
        &self,
        blocker: Address,
        blocked: Address,
        options: TxOptions,
    ) -> Result<Submission, ClientError>;
    async fn unblock_user(
        &self,
        blocker: Address,
        blocked: Address,
        options: TxOptions,
    ) -> Result<Submission, ClientError>;
    async fn is_blocked(&self, blocker: Address, blocked: Address) -> Result<bool, ClientError>;

    async fn set_permission(
        &self,
        user: Address,
        permission: u32,
        options: TxOptions,
    ) -> Result<Submission, ClientError>;
    async fn get_permission(&self, user: Address) -> Result<u32, ClientError>;

    /// The contract's own verdict on whether `sender` may message `receiver`
    async fn can_chat(&self, sender: Address, receiver: Address) -> Result<bool, ClientError>;

    async fn set_metadata(
        &self,
        user: Address,
        metadata: StatusBytes,
        options: TxOptions,
    ) -> Result<Submission, ClientError>;
    async fn get_metadata(&self, user: Address) -> Result<StatusBytes, ClientError>;
}

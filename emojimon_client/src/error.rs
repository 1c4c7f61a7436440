use emojimon_common::{GridError, PermissionError, StatusError, TxHash};
use std::fmt;
use thiserror::Error;

/// Local guard that stopped a command before anything was written or sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    AlreadySpawned,
    NotSpawned,
    Obstructed,
    InEncounter,
    InChat,
    NoEncounter,
    NoChat,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Precondition::AlreadySpawned => "already spawned",
            Precondition::NotSpawned => "not spawned yet",
            Precondition::Obstructed => "target space is obstructed",
            Precondition::InEncounter => "cannot do that during an encounter",
            Precondition::InChat => "cannot do that while chatting",
            Precondition::NoEncounter => "no active encounter",
            Precondition::NoChat => "no active chat",
        };
        f.write_str(text)
    }
}

/// Errors surfaced by client operations. None are retried automatically.
#[derive(Debug, Error, PartialEq)]
pub enum ClientError {
    #[error("no player account configured")]
    NoPlayer,
    #[error("precondition failed: {0}")]
    PreconditionFailed(Precondition),
    #[error("map config not yet loaded or initialized")]
    ConfigNotReady,
    #[error("transaction rejected: {0}")]
    SubmissionRejected(String),
    #[error("expected {0} after confirmation, found none")]
    MissingResult(&'static str),
    #[error("confirmation for {0} will never arrive")]
    ConfirmationLost(TxHash),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error("invalid map: {0}")]
    InvalidMap(GridError),
    #[error("remote call failed: {0}")]
    Remote(String),
}

impl From<GridError> for ClientError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::EmptyGrid => ClientError::ConfigNotReady,
            other => ClientError::InvalidMap(other),
        }
    }
}

impl From<Precondition> for ClientError {
    fn from(p: Precondition) -> Self {
        ClientError::PreconditionFailed(p)
    }
}

impl ClientError {
    /// True for aborts that happened before any store write or submission
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ClientError::PreconditionFailed(_) | ClientError::NoPlayer | ClientError::ConfigNotReady
        )
    }
}

//! State behind the chat screen shown while the player shares a cell with
//! another player.

use crate::error::ClientError;
use crate::social::SocialGate;
use crate::system_calls::SystemCalls;
use crate::tx_stream::Receipt;
use emojimon_common::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoom {
    pub peer: Address,
    /// The local player follows the peer
    pub is_following: bool,
    /// The local player blocks the peer
    pub is_blocked: bool,
    pub can_chat: bool,
    /// Peer's status line
    pub status: String,
}

impl ChatRoom {
    /// Load follow, block, permission and status for the peer
    pub async fn open(
        social: &SocialGate,
        me: Address,
        peer: Address,
    ) -> Result<Self, ClientError> {
        let is_following = social.is_following_user(me, peer).await?;
        let is_blocked = social.is_blocked_user(me, peer).await?;
        let can_chat = social.can_chat_with_player(peer).await?;
        let status = social.get_metadata(peer).await?;
        log::debug!(
            "chat with {}: following={} blocked={} can_chat={}",
            peer, is_following, is_blocked, can_chat
        );
        Ok(Self {
            peer,
            is_following,
            is_blocked,
            can_chat,
            status,
        })
    }

    pub async fn refresh_can_chat(&mut self, social: &SocialGate) -> Result<bool, ClientError> {
        self.can_chat = social.can_chat_with_player(self.peer).await?;
        Ok(self.can_chat)
    }

    /// Follow or unfollow the peer; the flag flips only once the write is confirmed
    pub async fn toggle_follow(&mut self, social: &SocialGate) -> Result<Receipt, ClientError> {
        let receipt = if self.is_following {
            social.unfollow_user(self.peer).await?
        } else {
            social.follow_user(self.peer).await?
        };
        self.is_following = !self.is_following;
        self.refresh_can_chat(social).await?;
        Ok(receipt)
    }

    pub async fn toggle_block(&mut self, social: &SocialGate) -> Result<Receipt, ClientError> {
        let receipt = if self.is_blocked {
            social.unblock(self.peer).await?
        } else {
            social.block(self.peer).await?
        };
        self.is_blocked = !self.is_blocked;
        self.refresh_can_chat(social).await?;
        Ok(receipt)
    }

    pub fn can_send(&self) -> bool {
        self.can_chat
    }

    pub async fn leave(self, calls: &SystemCalls) -> Result<Receipt, ClientError> {
        calls.leave_chat().await
    }
}

//! Follow graph, block list, chat permission and status, backed by the
//! social plugin contract. Writes resolve once their own transaction is
//! confirmed; reads go straight to the contract.

use crate::authority::{Submission, TxOptions};
use crate::client::Network;
use crate::error::ClientError;
use crate::tx_stream::Receipt;
use emojimon_common::{decode_status, encode_status, Address, PermissionLevel};

#[derive(Clone)]
pub struct SocialGate {
    network: Network,
    options: TxOptions,
}

impl SocialGate {
    pub fn new(network: Network, options: TxOptions) -> Self {
        Self { network, options }
    }

    fn me(&self) -> Result<Address, ClientError> {
        self.network.player.ok_or(ClientError::NoPlayer)
    }

    async fn confirm(
        &self,
        what: &str,
        submission: Result<Submission, ClientError>,
    ) -> Result<Receipt, ClientError> {
        let submission =
            submission.inspect_err(|e| log::warn!("{} was not accepted: {}", what, e))?;
        let receipt = self.network.tx_reduced.wait_for(submission.hash).await?;
        log::info!("{} confirmed in {}", what, receipt.hash);
        Ok(receipt)
    }

    pub async fn follow_user(&self, target: Address) -> Result<Receipt, ClientError> {
        let me = self.me()?;
        let submitted = self.network.social.follow(me, target, self.options).await;
        self.confirm("follow", submitted).await
    }

    pub async fn unfollow_user(&self, target: Address) -> Result<Receipt, ClientError> {
        let me = self.me()?;
        let submitted = self.network.social.unfollow(me, target, self.options).await;
        self.confirm("unfollow", submitted).await
    }

    pub async fn is_following_user(
        &self,
        follower: Address,
        following: Address,
    ) -> Result<bool, ClientError> {
        self.network.social.is_following(follower, following).await
    }

    pub async fn block(&self, target: Address) -> Result<Receipt, ClientError> {
        let me = self.me()?;
        let submitted = self.network.social.block_user(me, target, self.options).await;
        self.confirm("block", submitted).await
    }

    pub async fn unblock(&self, target: Address) -> Result<Receipt, ClientError> {
        let me = self.me()?;
        let submitted = self.network.social.unblock_user(me, target, self.options).await;
        self.confirm("unblock", submitted).await
    }

    pub async fn is_blocked_user(
        &self,
        blocker: Address,
        blocked: Address,
    ) -> Result<bool, ClientError> {
        self.network.social.is_blocked(blocker, blocked).await
    }

    pub async fn set_permission_setting(
        &self,
        level: PermissionLevel,
    ) -> Result<Receipt, ClientError> {
        let me = self.me()?;
        let submitted = self
            .network
            .social
            .set_permission(me, level.as_u32(), self.options)
            .await;
        self.confirm("setPermission", submitted).await
    }

    pub async fn get_permission_setting(
        &self,
        user: Address,
    ) -> Result<PermissionLevel, ClientError> {
        let raw = self.network.social.get_permission(user).await?;
        Ok(PermissionLevel::try_from(raw)?)
    }

    /// Whether the local player may message `receiver`, as decided by the contract
    pub async fn can_chat_with_player(&self, receiver: Address) -> Result<bool, ClientError> {
        let me = self.me()?;
        self.network.social.can_chat(me, receiver).await
    }

    /// Publish a status line; text that does not fit is refused before sending
    pub async fn set_metadata(&self, text: &str) -> Result<Receipt, ClientError> {
        let me = self.me()?;
        let encoded = encode_status(text)?;
        let submitted = self.network.social.set_metadata(me, encoded, self.options).await;
        self.confirm("setMetadata", submitted).await
    }

    pub async fn get_metadata(&self, user: Address) -> Result<String, ClientError> {
        let raw = self.network.social.get_metadata(user).await?;
        Ok(decode_status(&raw)?)
    }
}

/**
 * Emojimon Client Wiring
 *
 * Builds the explicit context every system call receives: who the player is,
 * the local component store, the two remote authorities and the stream of
 * confirmed transactions.
 */
use crate::authority::{SocialAuthority, WorldAuthority};
use crate::config::{ClientConfig, ConfigError};
use crate::devnet::{Devnet, DEFAULT_MAP};
use crate::error::ClientError;
use crate::store::{new_shared_store, SharedStore};
use crate::tx_stream::TxStream;
use emojimon_common::{Address, Entity, MapConfig};
use std::sync::Arc;

#[derive(Clone)]
pub struct Network {
    pub player: Option<Address>,
    pub store: SharedStore,
    pub world: Arc<dyn WorldAuthority>,
    pub social: Arc<dyn SocialAuthority>,
    pub tx_reduced: Arc<TxStream>,
}

impl Network {
    pub fn player_entity(&self) -> Option<Entity> {
        self.player.map(Entity::from_address)
    }

    pub fn require_player(&self) -> Result<(Address, Entity), ClientError> {
        let player = self.player.ok_or(ClientError::NoPlayer)?;
        Ok((player, Entity::from_address(player)))
    }
}

/// Connect to a fresh in-process world on the default map
pub fn create_devnet_network(config: &ClientConfig) -> Result<(Network, Arc<Devnet>), ConfigError> {
    let map = MapConfig::parse_ascii(DEFAULT_MAP).map_err(|e| ConfigError::Invalid {
        var: "map",
        value: e.to_string(),
    })?;
    create_devnet_network_with_map(config, map)
}

/// Connect to a fresh in-process world on the given map
pub fn create_devnet_network_with_map(
    config: &ClientConfig,
    map: MapConfig,
) -> Result<(Network, Arc<Devnet>), ConfigError> {
    let player = config.player()?;
    let store = new_shared_store();
    let tx_reduced = Arc::new(TxStream::new(config.confirmation_history));
    let devnet = Arc::new(Devnet::new(
        config.devnet.clone(),
        map,
        player,
        store.clone(),
        tx_reduced.clone(),
    ));
    let network = Network {
        player: Some(player),
        store,
        world: devnet.clone(),
        social: devnet.clone(),
        tx_reduced,
    };
    log::info!("connected to local world as {}", player);
    Ok((network, devnet))
}

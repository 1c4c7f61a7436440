/**
 * World System Calls
 *
 * Every player command follows the same shape:
 * 1. check local preconditions without touching the store
 * 2. layer optimistic overrides for what the command will change
 * 3. submit and wait for this submission's own confirmation
 * 4. drop the overrides, whatever happened in 3
 */
use crate::authority::WorldCall;
use crate::client::Network;
use crate::error::{ClientError, Precondition};
use crate::store::{
    lock_store, ClientComponents, ComponentKind, ComponentValue, OverrideGuard, QueryFragment, View,
};
use crate::tx_stream::Receipt;
use emojimon_common::{Address, Entity, MonsterCatchResult, MonsterType, Position};

/// What the player is currently locked into, if anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    Free,
    Encounter { monster: Entity },
    Chat { peer: Address },
}

/// Encounter takes precedence when the world reports both
pub fn engagement(store: &ClientComponents, player: &Entity) -> Engagement {
    let encounter = store.encounter.get(player);
    let chat = store.chat_with.get(player);
    if encounter.is_some() && chat.is_some() {
        log::warn!("{} is flagged in both an encounter and a chat", player);
    }
    match (encounter, chat) {
        (Some(e), _) => Engagement::Encounter { monster: e.monster },
        (None, Some(c)) => Engagement::Chat { peer: c.peer_address() },
        (None, None) => Engagement::Free,
    }
}

/// Whether an obstruction sits on the cell in committed state
pub fn is_obstructed(store: &ClientComponents, pos: Position) -> bool {
    !store
        .run_query(
            &[QueryFragment::Has(ComponentKind::Obstruction), QueryFragment::HasPosition(pos)],
            View::Committed,
        )
        .is_empty()
}

/// Wrap onto the map held in the store
pub fn wrap_position(store: &ClientComponents, x: i32, y: i32) -> Result<Position, ClientError> {
    let map = store.map().ok_or(ClientError::ConfigNotReady)?;
    Ok(map.wrap(x, y)?)
}

fn abort(precondition: Precondition) -> ClientError {
    log::warn!("command aborted: {}", precondition);
    precondition.into()
}

#[derive(Clone)]
pub struct SystemCalls {
    network: Network,
}

impl SystemCalls {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn wrap_position(&self, x: i32, y: i32) -> Result<Position, ClientError> {
        wrap_position(&lock_store(&self.network.store), x, y)
    }

    pub fn is_obstructed(&self, pos: Position) -> bool {
        is_obstructed(&lock_store(&self.network.store), pos)
    }

    /// Player position as the UI should draw it, overrides included
    pub fn player_position(&self) -> Option<Position> {
        let player = self.network.player_entity()?;
        lock_store(&self.network.store).position.get(&player).copied()
    }

    pub fn is_spawned(&self) -> bool {
        let Some(player) = self.network.player_entity() else {
            return false;
        };
        lock_store(&self.network.store).player.get(&player) == Some(&true)
    }

    pub fn engagement(&self) -> Engagement {
        match self.network.player_entity() {
            Some(player) => engagement(&lock_store(&self.network.store), &player),
            None => Engagement::Free,
        }
    }

    /// Monster of the active encounter
    pub fn encounter_monster(&self) -> Option<MonsterType> {
        let player = self.network.player_entity()?;
        let store = lock_store(&self.network.store);
        let encounter = store.encounter.get(&player)?;
        store.monster.get(&encounter.monster).copied()
    }

    /// Move to an absolute cell (wrapped onto the map)
    pub async fn move_to(&self, x: i32, y: i32) -> Result<Receipt, ClientError> {
        let (_, player) = self.network.require_player()?;
        let target = {
            let store = lock_store(&self.network.store);
            if store.player.get_committed(&player) != Some(&true) {
                return Err(abort(Precondition::NotSpawned));
            }
            match engagement(&store, &player) {
                Engagement::Free => {}
                Engagement::Encounter { .. } => return Err(abort(Precondition::InEncounter)),
                Engagement::Chat { .. } => return Err(abort(Precondition::InChat)),
            }
            let target = wrap_position(&store, x, y)?;
            if is_obstructed(&store, target) {
                return Err(abort(Precondition::Obstructed));
            }
            target
        };

        let mut overrides = OverrideGuard::new(&self.network.store);
        overrides.apply(player, ComponentValue::Position(target));

        let result = self.send_and_confirm(WorldCall::Move { x: target.x, y: target.y }).await;
        drop(overrides);
        result
    }

    /// Step relative to the committed position. Not spawned yet is a no-op.
    pub async fn move_by(&self, dx: i32, dy: i32) -> Result<Option<Receipt>, ClientError> {
        let (_, player) = self.network.require_player()?;
        let current = lock_store(&self.network.store).position.get_committed(&player).copied();
        let Some(current) = current else {
            log::warn!("cannot moveBy without a player position, not yet spawned?");
            return Ok(None);
        };
        let target = current.offset(dx, dy);
        self.move_to(target.x, target.y).await.map(Some)
    }

    pub async fn spawn(&self, x: i32, y: i32) -> Result<Receipt, ClientError> {
        let (_, player) = self.network.require_player()?;
        let target = {
            let store = lock_store(&self.network.store);
            if store.player.get(&player) == Some(&true) {
                return Err(abort(Precondition::AlreadySpawned));
            }
            let target = wrap_position(&store, x, y)?;
            if is_obstructed(&store, target) {
                return Err(abort(Precondition::Obstructed));
            }
            target
        };

        let mut overrides = OverrideGuard::new(&self.network.store);
        overrides.apply(player, ComponentValue::Position(target));
        overrides.apply(player, ComponentValue::Player(true));

        let result = self.send_and_confirm(WorldCall::Spawn { x: target.x, y: target.y }).await;
        drop(overrides);
        result
    }

    /// Throw a ball at the current encounter and report what the world decided
    pub async fn throw_ball(&self) -> Result<MonsterCatchResult, ClientError> {
        let (_, player) = self.network.require_player()?;
        if !lock_store(&self.network.store).encounter.has(&player, View::Effective) {
            return Err(abort(Precondition::NoEncounter));
        }

        self.send_and_confirm(WorldCall::ThrowBall).await?;

        let attempt = lock_store(&self.network.store)
            .monster_catch_attempt
            .get(&player)
            .copied();
        match attempt {
            Some(result) => {
                log::info!("catch attempt: {}", result);
                Ok(result)
            }
            None => {
                log::warn!("throwBall confirmed but no catch attempt recorded");
                Err(ClientError::MissingResult("MonsterCatchAttempt"))
            }
        }
    }

    pub async fn flee_encounter(&self) -> Result<Receipt, ClientError> {
        self.network.require_player()?;
        self.send_and_confirm(WorldCall::Flee).await
    }

    pub async fn leave_chat(&self) -> Result<Receipt, ClientError> {
        let (_, player) = self.network.require_player()?;
        if !lock_store(&self.network.store).chat_with.has(&player, View::Effective) {
            return Err(abort(Precondition::NoChat));
        }
        self.send_and_confirm(WorldCall::LeaveChat).await
    }

    async fn send_and_confirm(&self, call: WorldCall) -> Result<Receipt, ClientError> {
        log::info!("submitting {}", call);
        let submission = self.network.world.submit(call).await.inspect_err(|e| {
            log::warn!("{} was not accepted: {}", call.name(), e);
        })?;
        let receipt = self.network.tx_reduced.wait_for(submission.hash).await?;
        log::info!("{} confirmed in {}", call.name(), receipt.hash);
        Ok(receipt)
    }
}

/**
 * Local World Authority
 *
 * An in-process stand-in for the chain: it owns the authoritative tables,
 * validates submissions the way the world systems do, and only makes their
 * effects visible to the client when a transaction is mined. Mining syncs
 * the changed components into the client's committed tier and then
 * publishes each hash on the transaction stream.
 */
use crate::authority::{SocialAuthority, Submission, TxOptions, WorldAuthority, WorldCall};
use crate::config::DevnetConfig;
use crate::error::ClientError;
use crate::store::{
    lock_store, ClientComponents, ComponentKind, ComponentUpdate, ComponentValue, SharedStore,
    SINGLETON_ENTITY,
};
use crate::tx_stream::TxStream;
use async_trait::async_trait;
use emojimon_common::{
    chat_permitted, Address, ChatRelation, ChatWith, Encounter, Entity, MapConfig,
    MonsterCatchResult, MonsterType, PermissionLevel, Position, StatusBytes, TerrainType, TxHash,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Starter map: `.` ground, `T` tall grass, `O` boulder
pub const DEFAULT_MAP: &[&str] = &[
    "O..T....TT..",
    "..TTT.......",
    "..TT...OO...",
    "....O.......",
    "............",
    "..TTT....O..",
    "..TT........",
    "......TTT...",
    "..O...TT....",
    "............",
];

/// Catch attempts after which a monster that was not caught runs away
const MAX_CATCH_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy)]
enum SocialWrite {
    Follow { follower: Address, following: Address },
    Unfollow { follower: Address, following: Address },
    Block { blocker: Address, blocked: Address },
    Unblock { blocker: Address, blocked: Address },
    Permission { user: Address, level: u32 },
    Metadata { user: Address, metadata: StatusBytes },
}

#[derive(Debug, Clone, Copy)]
enum Transaction {
    World { sender: Address, call: WorldCall },
    Social(SocialWrite),
}

struct World {
    components: ClientComponents,
    rng: StdRng,
    pending: VecDeque<(TxHash, Transaction)>,
    follows: HashSet<(Address, Address)>,
    blocks: HashSet<(Address, Address)>,
    permissions: HashMap<Address, u32>,
    metadata: HashMap<Address, StatusBytes>,
}

impl World {
    fn random_bytes(&mut self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.rng.fill(&mut bytes[..]);
        bytes
    }

    fn commit(&mut self, update: ComponentUpdate, out: &mut Vec<ComponentUpdate>) {
        self.components.apply(update.clone());
        out.push(update);
    }

    fn set(&mut self, entity: Entity, value: ComponentValue, out: &mut Vec<ComponentUpdate>) {
        self.commit(ComponentUpdate::Set { entity, value }, out);
    }

    fn remove(&mut self, entity: Entity, kind: ComponentKind, out: &mut Vec<ComponentUpdate>) {
        if self.components.has(kind, &entity, crate::store::View::Committed) {
            self.commit(ComponentUpdate::Remove { entity, kind }, out);
        }
    }

    fn map(&self) -> Result<MapConfig, ClientError> {
        self.components.map().cloned().ok_or(ClientError::ConfigNotReady)
    }

    fn obstructed(&self, pos: Position) -> bool {
        crate::system_calls::is_obstructed(&self.components, pos)
    }

    /// Other spawned player standing on the cell
    fn player_at(&self, pos: Position, except: &Entity) -> Option<Entity> {
        self.components
            .players()
            .into_iter()
            .find(|(entity, at)| entity != except && *at == pos)
            .map(|(entity, _)| entity)
    }

    fn spawned(&self, player: &Entity) -> bool {
        self.components.player.get_committed(player) == Some(&true)
    }

    /// Same checks as the world systems; runs when a call is submitted
    fn validate(&self, sender: Address, call: WorldCall) -> Result<(), String> {
        let player = Entity::from_address(sender);
        let engaged = || {
            if self.components.encounter.get_committed(&player).is_some() {
                Err("cannot move during an encounter".to_string())
            } else if self.components.chat_with.get_committed(&player).is_some() {
                Err("cannot move while chatting".to_string())
            } else {
                Ok(())
            }
        };
        match call {
            WorldCall::Spawn { x, y } => {
                if self.spawned(&player) {
                    return Err("already spawned".into());
                }
                let map = self.map().map_err(|e| e.to_string())?;
                let target = map.wrap(x, y).map_err(|e| e.to_string())?;
                if self.obstructed(target) {
                    return Err("this space is obstructed".into());
                }
            }
            WorldCall::Move { x, y } => {
                if !self.spawned(&player) {
                    return Err("not spawned".into());
                }
                engaged()?;
                let map = self.map().map_err(|e| e.to_string())?;
                let target = map.wrap(x, y).map_err(|e| e.to_string())?;
                let from = self
                    .components
                    .position
                    .get_committed(&player)
                    .copied()
                    .ok_or_else(|| "no position".to_string())?;
                if !map.are_adjacent(from, target).map_err(|e| e.to_string())? {
                    return Err("can only move to adjacent spaces".into());
                }
                if self.obstructed(target) {
                    return Err("this space is obstructed".into());
                }
            }
            WorldCall::ThrowBall | WorldCall::Flee => {
                if self.components.encounter.get_committed(&player).is_none() {
                    return Err("not in encounter".into());
                }
            }
            WorldCall::LeaveChat => {
                if self.components.chat_with.get_committed(&player).is_none() {
                    return Err("not in chat".into());
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self, tx: Transaction, encounter_chance: f64, out: &mut Vec<ComponentUpdate>) {
        match tx {
            Transaction::World { sender, call } => {
                let player = Entity::from_address(sender);
                self.execute_call(player, call, encounter_chance, out)
            }
            Transaction::Social(write) => self.execute_social(write),
        }
    }

    fn execute_call(
        &mut self,
        player: Entity,
        call: WorldCall,
        encounter_chance: f64,
        out: &mut Vec<ComponentUpdate>,
    ) {
        let Ok(map) = self.map() else {
            log::warn!("world has no map, {} reverted", call);
            return;
        };
        match call {
            WorldCall::Spawn { x, y } => {
                let Ok(target) = map.wrap(x, y) else { return };
                self.set(player, ComponentValue::Player(true), out);
                self.set(player, ComponentValue::Position(target), out);
                self.set(player, ComponentValue::EncounterTrigger, out);
            }
            WorldCall::Move { x, y } => {
                let Ok(target) = map.wrap(x, y) else { return };
                self.set(player, ComponentValue::Position(target), out);

                if let Some(other) = self.player_at(target, &player) {
                    self.set(player, ComponentValue::ChatWith(ChatWith { peer: other }), out);
                    self.set(other, ComponentValue::ChatWith(ChatWith { peer: player }), out);
                    return;
                }

                let triggers = self.components.encounter_trigger.get_committed(&player).is_some();
                if triggers
                    && map.terrain_at(target.x, target.y) == TerrainType::TallGrass
                    && self.rng.random_bool(encounter_chance)
                {
                    let monster = Entity(self.random_bytes());
                    let kind = MonsterType::ALL[self.rng.random_range(0..MonsterType::ALL.len())];
                    self.set(monster, ComponentValue::Monster(kind), out);
                    let encounter = Encounter {
                        monster,
                        catch_attempts: 0,
                    };
                    self.set(player, ComponentValue::Encounter(encounter), out);
                    log::info!("a wild {} appears at {}", kind.name(), target);
                }
            }
            WorldCall::ThrowBall => {
                let encounter = self.components.encounter.get_committed(&player).copied();
                let Some(encounter) = encounter else {
                    log::warn!("throwBall mined without an encounter");
                    return;
                };
                let attempts = encounter.catch_attempts + 1;
                let result = if self.rng.random_bool(0.5) {
                    MonsterCatchResult::Caught
                } else if attempts >= MAX_CATCH_ATTEMPTS {
                    MonsterCatchResult::Fled
                } else {
                    MonsterCatchResult::Missed
                };
                self.set(player, ComponentValue::MonsterCatchAttempt(result), out);
                if result.ends_encounter() {
                    self.remove(player, ComponentKind::Encounter, out);
                    if result == MonsterCatchResult::Fled {
                        self.remove(encounter.monster, ComponentKind::Monster, out);
                    }
                } else {
                    let updated = Encounter { catch_attempts: attempts, ..encounter };
                    self.set(player, ComponentValue::Encounter(updated), out);
                }
            }
            WorldCall::Flee => {
                if let Some(encounter) = self.components.encounter.get_committed(&player).copied() {
                    self.remove(encounter.monster, ComponentKind::Monster, out);
                    self.remove(player, ComponentKind::Encounter, out);
                }
            }
            WorldCall::LeaveChat => {
                if let Some(chat) = self.components.chat_with.get_committed(&player).copied() {
                    self.remove(chat.peer, ComponentKind::ChatWith, out);
                    self.remove(player, ComponentKind::ChatWith, out);
                }
            }
        }
    }

    fn execute_social(&mut self, write: SocialWrite) {
        match write {
            SocialWrite::Follow { follower, following } => {
                self.follows.insert((follower, following));
            }
            SocialWrite::Unfollow { follower, following } => {
                self.follows.remove(&(follower, following));
            }
            SocialWrite::Block { blocker, blocked } => {
                self.blocks.insert((blocker, blocked));
            }
            SocialWrite::Unblock { blocker, blocked } => {
                self.blocks.remove(&(blocker, blocked));
            }
            SocialWrite::Permission { user, level } => {
                self.permissions.insert(user, level);
            }
            SocialWrite::Metadata { user, metadata } => {
                self.metadata.insert(user, metadata);
            }
        }
    }

    fn relation(&self, sender: Address, receiver: Address) -> ChatRelation {
        let level = self.permissions.get(&receiver).copied().unwrap_or_default();
        ChatRelation {
            sender_follows: self.follows.contains(&(sender, receiver)),
            receiver_follows: self.follows.contains(&(receiver, sender)),
            blocked: self.blocks.contains(&(sender, receiver))
                || self.blocks.contains(&(receiver, sender)),
            receiver_level: PermissionLevel::try_from(level).unwrap_or_default(),
        }
    }
}

pub struct Devnet {
    config: DevnetConfig,
    signer: Address,
    state: Mutex<World>,
    client_store: SharedStore,
    tx_reduced: Arc<TxStream>,
}

impl Devnet {
    /// Start a world on `map` and push its initial state to the client
    pub fn new(
        config: DevnetConfig,
        map: MapConfig,
        signer: Address,
        client_store: SharedStore,
        tx_reduced: Arc<TxStream>,
    ) -> Self {
        let mut world = World {
            components: ClientComponents::new(),
            rng: StdRng::seed_from_u64(config.seed),
            pending: VecDeque::new(),
            follows: HashSet::new(),
            blocks: HashSet::new(),
            permissions: HashMap::new(),
            metadata: HashMap::new(),
        };

        let mut snapshot = Vec::new();
        let boulders: Vec<Position> = map
            .terrain_cells()
            .into_iter()
            .filter(|(_, terrain)| *terrain == TerrainType::Boulder)
            .map(|(pos, _)| pos)
            .collect();
        world.set(SINGLETON_ENTITY, ComponentValue::MapConfig(map), &mut snapshot);
        for pos in boulders {
            let rock = Entity(world.random_bytes());
            world.set(rock, ComponentValue::Obstruction, &mut snapshot);
            world.set(rock, ComponentValue::Position(pos), &mut snapshot);
        }

        let devnet = Self {
            config,
            signer,
            state: Mutex::new(world),
            client_store,
            tx_reduced,
        };
        devnet.sync(snapshot);
        devnet
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn encounter_chance(&self) -> f64 {
        let chance = self.config.encounter_chance;
        if (0.0..=1.0).contains(&chance) { chance } else { 0.0 }
    }

    fn sync(&self, updates: Vec<ComponentUpdate>) {
        if updates.is_empty() {
            return;
        }
        let mut store = lock_store(&self.client_store);
        for update in updates {
            store.apply(update);
        }
    }

    fn enqueue(&self, state: &mut World, tx: Transaction) -> TxHash {
        let hash = TxHash(state.random_bytes());
        state.pending.push_back((hash, tx));
        log::debug!("queued {}", hash);
        hash
    }

    /// Queue the transaction and mine right away when auto confirming
    fn accept(&self, tx: Transaction) -> Submission {
        let hash = {
            let mut state = self.lock();
            self.enqueue(&mut state, tx)
        };
        if self.config.auto_confirm {
            self.mine();
        }
        Submission { hash }
    }

    fn require_signer(&self, sender: Address) -> Result<(), ClientError> {
        if sender != self.signer {
            return Err(ClientError::SubmissionRejected(format!(
                "{} cannot sign for {}",
                self.signer, sender
            )));
        }
        Ok(())
    }

    /// Mine every queued transaction in submission order
    pub fn mine(&self) -> usize {
        let mut mined = 0;
        while self.mine_one().is_some() {
            mined += 1;
        }
        mined
    }

    /// Mine the oldest queued transaction
    pub fn mine_one(&self) -> Option<TxHash> {
        let chance = self.encounter_chance();
        let (hash, updates) = {
            let mut state = self.lock();
            let (hash, tx) = state.pending.pop_front()?;
            let mut updates = Vec::new();
            state.execute(tx, chance, &mut updates);
            (hash, updates)
        };
        self.sync(updates);
        self.tx_reduced.publish(hash);
        Some(hash)
    }

    /// Transactions accepted but not yet mined
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Authoritative position of a player
    pub fn position_of(&self, address: Address) -> Option<Position> {
        self.lock().components.position.get_committed(&Entity::from_address(address)).copied()
    }

    /// Place another player on the map directly, outside any transaction
    pub fn add_player(&self, address: Address, pos: Position) {
        let entity = Entity::from_address(address);
        let mut updates = Vec::new();
        {
            let mut state = self.lock();
            state.set(entity, ComponentValue::Player(true), &mut updates);
            state.set(entity, ComponentValue::Position(pos), &mut updates);
            state.set(entity, ComponentValue::EncounterTrigger, &mut updates);
        }
        self.sync(updates);
    }

    /// Put a player straight into an encounter with a monster of the given kind
    pub fn start_encounter(&self, address: Address, kind: MonsterType) -> Entity {
        let player = Entity::from_address(address);
        let mut updates = Vec::new();
        let monster = {
            let mut state = self.lock();
            let monster = Entity(state.random_bytes());
            state.set(monster, ComponentValue::Monster(kind), &mut updates);
            let encounter = Encounter {
                monster,
                catch_attempts: 0,
            };
            state.set(player, ComponentValue::Encounter(encounter), &mut updates);
            monster
        };
        self.sync(updates);
        monster
    }

    pub fn seed_follow(&self, follower: Address, following: Address) {
        self.lock().follows.insert((follower, following));
    }

    pub fn seed_block(&self, blocker: Address, blocked: Address) {
        self.lock().blocks.insert((blocker, blocked));
    }

    pub fn seed_permission(&self, user: Address, level: PermissionLevel) {
        self.lock().permissions.insert(user, level.as_u32());
    }

    pub fn seed_metadata(&self, user: Address, metadata: StatusBytes) {
        self.lock().metadata.insert(user, metadata);
    }

    fn social_write(&self, sender: Address, write: SocialWrite) -> Result<Submission, ClientError> {
        self.require_signer(sender)?;
        Ok(self.accept(Transaction::Social(write)))
    }
}

#[async_trait]
impl WorldAuthority for Devnet {
    async fn submit(&self, call: WorldCall) -> Result<Submission, ClientError> {
        let hash = {
            let mut state = self.lock();
            state.validate(self.signer, call).map_err(|reason| {
                log::warn!("{} reverted: {}", call, reason);
                ClientError::SubmissionRejected(reason)
            })?;
            self.enqueue(&mut state, Transaction::World { sender: self.signer, call })
        };
        if self.config.auto_confirm {
            self.mine();
        }
        Ok(Submission { hash })
    }
}

#[async_trait]
impl SocialAuthority for Devnet {
    async fn follow(
        &self,
        follower: Address,
        following: Address,
        _options: TxOptions,
    ) -> Result<Submission, ClientError> {
        if follower == following {
            return Err(ClientError::SubmissionRejected("cannot follow yourself".into()));
        }
        self.social_write(follower, SocialWrite::Follow { follower, following })
    }

    async fn unfollow(
        &self,
        follower: Address,
        following: Address,
        _options: TxOptions,
    ) -> Result<Submission, ClientError> {
        self.social_write(follower, SocialWrite::Unfollow { follower, following })
    }

    async fn is_following(
        &self,
        follower: Address,
        following: Address,
    ) -> Result<bool, ClientError> {
        Ok(self.lock().follows.contains(&(follower, following)))
    }

    async fn block_user(
        &self,
        blocker: Address,
        blocked: Address,
        _options: TxOptions,
    ) -> Result<Submission, ClientError> {
        if blocker == blocked {
            return Err(ClientError::SubmissionRejected("cannot block yourself".into()));
        }
        self.social_write(blocker, SocialWrite::Block { blocker, blocked })
    }

    async fn unblock_user(
        &self,
        blocker: Address,
        blocked: Address,
        _options: TxOptions,
    ) -> Result<Submission, ClientError> {
        self.social_write(blocker, SocialWrite::Unblock { blocker, blocked })
    }

    async fn is_blocked(&self, blocker: Address, blocked: Address) -> Result<bool, ClientError> {
        Ok(self.lock().blocks.contains(&(blocker, blocked)))
    }

    async fn set_permission(
        &self,
        user: Address,
        permission: u32,
        _options: TxOptions,
    ) -> Result<Submission, ClientError> {
        PermissionLevel::try_from(permission)
            .map_err(|e| ClientError::SubmissionRejected(e.to_string()))?;
        self.social_write(user, SocialWrite::Permission { user, level: permission })
    }

    async fn get_permission(&self, user: Address) -> Result<u32, ClientError> {
        Ok(self.lock().permissions.get(&user).copied().unwrap_or_default())
    }

    async fn can_chat(&self, sender: Address, receiver: Address) -> Result<bool, ClientError> {
        Ok(chat_permitted(self.lock().relation(sender, receiver)))
    }

    async fn set_metadata(
        &self,
        user: Address,
        metadata: StatusBytes,
        _options: TxOptions,
    ) -> Result<Submission, ClientError> {
        self.social_write(user, SocialWrite::Metadata { user, metadata })
    }

    async fn get_metadata(&self, user: Address) -> Result<StatusBytes, ClientError> {
        Ok(self.lock().metadata.get(&user).copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::create_devnet_network_with_map;
    use crate::config::ClientConfig;
    use crate::store::View;
    use futures::executor::block_on;

    fn address(n: u8) -> Address {
        Address([n; 20])
    }

    fn setup(rows: &[&str], chance: f64) -> (crate::client::Network, Arc<Devnet>) {
        let mut config = ClientConfig::default();
        config.devnet.encounter_chance = chance;
        let map = MapConfig::parse_ascii(rows).unwrap();
        create_devnet_network_with_map(&config, map).unwrap()
    }

    #[test]
    fn default_map_parses_with_boulder_at_origin() {
        let map = MapConfig::parse_ascii(DEFAULT_MAP).unwrap();
        assert_eq!((map.width, map.height), (12, 10));
        assert_eq!(map.terrain_at(0, 0), TerrainType::Boulder);
    }

    #[test]
    fn rejects_invalid_world_calls() {
        let (network, devnet) = setup(&[".....", ".....", "..O..", "....."], 0.0);
        let me = network.player.unwrap();

        let moved = block_on(devnet.submit(WorldCall::Move { x: 1, y: 1 }));
        assert!(matches!(moved, Err(ClientError::SubmissionRejected(_))));

        block_on(devnet.submit(WorldCall::Spawn { x: 1, y: 1 })).unwrap();
        assert_eq!(devnet.position_of(me), Some(Position::new(1, 1)));
        assert!(block_on(devnet.submit(WorldCall::Spawn { x: 3, y: 3 })).is_err());

        // two cells away
        assert!(block_on(devnet.submit(WorldCall::Move { x: 3, y: 1 })).is_err());
        // boulder
        block_on(devnet.submit(WorldCall::Move { x: 2, y: 1 })).unwrap();
        assert!(block_on(devnet.submit(WorldCall::Move { x: 2, y: 2 })).is_err());
        // around the edge of the torus
        block_on(devnet.submit(WorldCall::Move { x: 2, y: 0 })).unwrap();
        block_on(devnet.submit(WorldCall::Move { x: 2, y: -1 })).unwrap();
        assert_eq!(devnet.position_of(me), Some(Position::new(2, 3)));
        assert!(block_on(devnet.submit(WorldCall::ThrowBall)).is_err());
        assert!(block_on(devnet.submit(WorldCall::LeaveChat)).is_err());
    }

    #[test]
    fn nothing_is_visible_until_mined() {
        let mut config = ClientConfig::default();
        config.devnet.auto_confirm = false;
        let map = MapConfig::parse_ascii(&["....", "...."]).unwrap();
        let (network, devnet) = create_devnet_network_with_map(&config, map).unwrap();
        let me = network.player_entity().unwrap();

        let submission = block_on(devnet.submit(WorldCall::Spawn { x: 1, y: 0 })).unwrap();
        assert_eq!(devnet.pending(), 1);
        assert!(!network.tx_reduced.is_confirmed(&submission.hash));
        assert!(lock_store(&network.store).position.get(&me).is_none());

        assert_eq!(devnet.mine(), 1);
        assert!(network.tx_reduced.is_confirmed(&submission.hash));
        let committed = lock_store(&network.store).position.get_committed(&me).copied();
        assert_eq!(committed, Some(Position::new(1, 0)));
    }

    #[test]
    fn tall_grass_starts_encounter_and_ball_resolves_it() {
        let (network, devnet) = setup(&[".T..", "...."], 1.0);
        let me = network.player_entity().unwrap();
        block_on(devnet.submit(WorldCall::Spawn { x: 0, y: 0 })).unwrap();
        block_on(devnet.submit(WorldCall::Move { x: 1, y: 0 })).unwrap();

        let encounter = lock_store(&network.store).encounter.get_committed(&me).copied().unwrap();
        assert!(lock_store(&network.store).monster.has(&encounter.monster, View::Committed));
        assert!(block_on(devnet.submit(WorldCall::Move { x: 2, y: 0 })).is_err());

        let mut outcome = MonsterCatchResult::Missed;
        for _ in 0..MAX_CATCH_ATTEMPTS {
            block_on(devnet.submit(WorldCall::ThrowBall)).unwrap();
            outcome = *lock_store(&network.store).monster_catch_attempt.get_committed(&me).unwrap();
            if outcome.ends_encounter() {
                break;
            }
        }
        assert!(outcome.ends_encounter());
        assert!(!lock_store(&network.store).encounter.has(&me, View::Committed));
    }

    #[test]
    fn flee_clears_encounter_and_monster() {
        let (network, devnet) = setup(&["...."], 0.0);
        let me = network.player.unwrap();
        block_on(devnet.submit(WorldCall::Spawn { x: 0, y: 0 })).unwrap();
        let monster = devnet.start_encounter(me, MonsterType::Rat);
        block_on(devnet.submit(WorldCall::Flee)).unwrap();
        let store = lock_store(&network.store);
        assert!(!store.encounter.has(&Entity::from_address(me), View::Committed));
        assert!(!store.monster.has(&monster, View::Committed));
    }

    #[test]
    fn stepping_onto_player_opens_chat_for_both() {
        let (network, devnet) = setup(&["...."], 0.0);
        let me = network.player_entity().unwrap();
        let other = address(7);
        devnet.add_player(other, Position::new(1, 0));
        block_on(devnet.submit(WorldCall::Spawn { x: 0, y: 0 })).unwrap();
        block_on(devnet.submit(WorldCall::Move { x: 1, y: 0 })).unwrap();
        {
            let store = lock_store(&network.store);
            assert_eq!(store.chat_with.get_committed(&me).map(|c| c.peer_address()), Some(other));
            let theirs = store.chat_with.get_committed(&Entity::from_address(other));
            assert_eq!(theirs.map(|c| c.peer), Some(me));
        }
        block_on(devnet.submit(WorldCall::LeaveChat)).unwrap();
        let store = lock_store(&network.store);
        assert!(!store.chat_with.has(&me, View::Committed));
        assert!(!store.chat_with.has(&Entity::from_address(other), View::Committed));
    }

    #[test]
    fn social_writes_need_the_signer() {
        let (network, devnet) = setup(&["...."], 0.0);
        let me = network.player.unwrap();
        let options = TxOptions::default();
        assert!(block_on(devnet.follow(address(1), address(2), options)).is_err());
        assert!(block_on(devnet.follow(me, me, options)).is_err());
        assert!(block_on(devnet.set_permission(me, 4, options)).is_err());

        block_on(devnet.follow(me, address(2), options)).unwrap();
        assert!(block_on(devnet.is_following(me, address(2))).unwrap());
        assert!(!block_on(devnet.is_following(address(2), me)).unwrap());
    }

    #[test]
    fn can_chat_follows_permission_rules() {
        let (network, devnet) = setup(&["...."], 0.0);
        let me = network.player.unwrap();
        let peer = address(3);
        assert!(block_on(devnet.can_chat(me, peer)).unwrap());

        devnet.seed_permission(peer, PermissionLevel::Follower);
        assert!(!block_on(devnet.can_chat(me, peer)).unwrap());
        devnet.seed_follow(me, peer);
        assert!(block_on(devnet.can_chat(me, peer)).unwrap());

        devnet.seed_permission(peer, PermissionLevel::Following);
        assert!(!block_on(devnet.can_chat(me, peer)).unwrap());
        devnet.seed_follow(peer, me);
        assert!(block_on(devnet.can_chat(me, peer)).unwrap());

        devnet.seed_block(peer, me);
        assert!(!block_on(devnet.can_chat(me, peer)).unwrap());
    }
}

//! End-to-end flows: system calls against the local world, observed through
//! the client store and the transaction stream.

use crate::authority::{Submission, TxOptions, WorldAuthority, WorldCall};
use crate::chat_room::ChatRoom;
use crate::client::{create_devnet_network_with_map, Network};
use crate::config::ClientConfig;
use crate::devnet::Devnet;
use crate::error::{ClientError, Precondition};
use crate::social::SocialGate;
use crate::store::{lock_store, ComponentKind, ComponentUpdate, View, SINGLETON_ENTITY};
use crate::system_calls::{Engagement, SystemCalls};
use crate::tx_stream::{Receipt, TxStream};
use async_trait::async_trait;
use emojimon_common::{
    Address, Encounter, Entity, MapConfig, MonsterCatchResult, MonsterType, PermissionLevel,
    Position, TxHash,
};
use futures::executor::{block_on, LocalPool};
use futures::task::{noop_waker_ref, LocalSpawnExt};
use futures::FutureExt;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn world(
    rows: &[&str],
    auto_confirm: bool,
    encounter_chance: f64,
) -> (Network, Arc<Devnet>, SystemCalls) {
    init();
    let mut config = ClientConfig::default();
    config.devnet.auto_confirm = auto_confirm;
    config.devnet.encounter_chance = encounter_chance;
    let map = MapConfig::parse_ascii(rows).unwrap();
    let (network, devnet) = create_devnet_network_with_map(&config, map).unwrap();
    let calls = SystemCalls::new(network.clone());
    (network, devnet, calls)
}

fn open_field(width: usize, height: usize) -> Vec<String> {
    vec![".".repeat(width); height]
}

fn rows(lines: &[String]) -> Vec<&str> {
    lines.iter().map(String::as_str).collect()
}

fn refused<T>(precondition: Precondition) -> Result<T, ClientError> {
    Err(ClientError::PreconditionFailed(precondition))
}

fn overrides(network: &Network) -> usize {
    lock_store(&network.store).pending_overrides()
}

#[test]
fn spawn_shows_override_until_confirmed() {
    let mut field = open_field(10, 10);
    field[0] = "O.........".to_string();
    let (network, devnet, calls) = world(&rows(&field), false, 0.0);
    let me = network.player_entity().unwrap();

    assert_eq!(block_on(calls.spawn(0, 0)), refused(Precondition::Obstructed));
    assert!(lock_store(&network.store).position.get(&me).is_none());
    assert_eq!(devnet.pending(), 0);
    assert!(!calls.is_spawned());

    let mut pool = LocalPool::new();
    let outcome: Rc<RefCell<Option<Result<Receipt, ClientError>>>> = Rc::new(RefCell::new(None));
    {
        let calls = calls.clone();
        let outcome = outcome.clone();
        pool.spawner()
            .spawn_local(async move {
                let result = calls.spawn(1, 1).await;
                *outcome.borrow_mut() = Some(result);
            })
            .unwrap();
    }
    pool.run_until_stalled();

    {
        let store = lock_store(&network.store);
        assert_eq!(store.position.get(&me), Some(&Position::new(1, 1)));
        assert_eq!(store.player.get(&me), Some(&true));
        assert_eq!(store.position.get_committed(&me), None);
        assert_eq!(store.pending_overrides(), 2);
    }
    assert!(calls.is_spawned());
    assert!(outcome.borrow().is_none());

    assert_eq!(devnet.mine(), 1);
    pool.run_until_stalled();

    let receipt = outcome.borrow_mut().take().unwrap().unwrap();
    assert!(network.tx_reduced.is_confirmed(&receipt.hash));
    let store = lock_store(&network.store);
    assert_eq!(store.pending_overrides(), 0);
    assert_eq!(store.position.get_committed(&me), Some(&Position::new(1, 1)));
    assert_eq!(store.position.get(&me), Some(&Position::new(1, 1)));
}

#[test]
fn spawning_twice_is_refused_locally() {
    let field = open_field(4, 4);
    let (network, devnet, calls) = world(&rows(&field), true, 0.0);
    block_on(calls.spawn(1, 1)).unwrap();
    assert_eq!(block_on(calls.spawn(2, 2)), refused(Precondition::AlreadySpawned));
    assert_eq!(devnet.position_of(network.player.unwrap()), Some(Position::new(1, 1)));
    assert_eq!(overrides(&network), 0);
}

#[test]
fn move_during_encounter_changes_nothing() {
    let field = open_field(6, 6);
    let (network, devnet, calls) = world(&rows(&field), true, 0.0);
    let me = network.player.unwrap();
    block_on(calls.spawn(1, 1)).unwrap();
    devnet.start_encounter(me, MonsterType::Eagle);
    assert_eq!(calls.encounter_monster(), Some(MonsterType::Eagle));

    assert_eq!(block_on(calls.move_by(1, 0)), refused(Precondition::InEncounter));
    assert_eq!(overrides(&network), 0);
    assert_eq!(devnet.pending(), 0);
    assert_eq!(calls.player_position(), Some(Position::new(1, 1)));
    assert_eq!(devnet.position_of(me), Some(Position::new(1, 1)));
}

#[test]
fn obstruction_blocks_spawn_and_move() {
    let field = [".....", ".....", ".....", "..O..", "....."];
    let (network, devnet, calls) = world(&field, true, 0.0);

    assert!(calls.is_obstructed(Position::new(2, 3)));
    assert_eq!(block_on(calls.spawn(2, 3)), refused(Precondition::Obstructed));
    // same cell, one lap around the torus
    assert_eq!(block_on(calls.spawn(7, -2)), refused(Precondition::Obstructed));
    assert_eq!(overrides(&network), 0);

    block_on(calls.spawn(2, 2)).unwrap();
    assert_eq!(block_on(calls.move_by(0, 1)), refused(Precondition::Obstructed));
    assert_eq!(block_on(calls.move_to(2, 3)), refused(Precondition::Obstructed));
    assert_eq!(overrides(&network), 0);
    assert_eq!(devnet.position_of(network.player.unwrap()), Some(Position::new(2, 2)));
}

#[test]
fn rejected_submission_leaves_no_override() {
    let field = open_field(6, 6);
    let (network, devnet, calls) = world(&rows(&field), true, 0.0);
    block_on(calls.spawn(1, 1)).unwrap();

    let result = block_on(calls.move_to(3, 3));
    assert!(matches!(result, Err(ClientError::SubmissionRejected(_))));
    assert_eq!(overrides(&network), 0);
    assert_eq!(calls.player_position(), Some(Position::new(1, 1)));
    assert_eq!(devnet.pending(), 0);
}

#[test]
fn abandoned_command_cleans_up() {
    let field = open_field(6, 6);
    let (network, devnet, calls) = world(&rows(&field), false, 0.0);

    let mut spawn = Box::pin(calls.spawn(1, 1));
    let mut cx = Context::from_waker(noop_waker_ref());
    assert!(spawn.poll_unpin(&mut cx).is_pending());
    assert_eq!(overrides(&network), 2);
    assert_eq!(network.tx_reduced.pending_waiters(), 1);

    drop(spawn);
    assert_eq!(overrides(&network), 0);
    assert_eq!(network.tx_reduced.pending_waiters(), 0);

    // the transaction itself still lands
    assert_eq!(devnet.mine(), 1);
    assert_eq!(calls.player_position(), Some(Position::new(1, 1)));
}

#[test]
fn concurrent_moves_resolve_on_their_own_hash() {
    let field = open_field(6, 6);
    let (network, devnet, calls) = world(&rows(&field), false, 0.0);
    let me = network.player_entity().unwrap();
    let mut spawn = Box::pin(calls.spawn(1, 1));
    let mut cx = Context::from_waker(noop_waker_ref());
    assert!(spawn.poll_unpin(&mut cx).is_pending());
    devnet.mine();
    block_on(spawn).unwrap();

    let right = Position::new(2, 1);
    let down = Position::new(1, 2);
    let mut pool = LocalPool::new();
    let done: Rc<RefCell<Vec<(Position, TxHash)>>> = Rc::new(RefCell::new(Vec::new()));
    for target in [right, down] {
        let calls = calls.clone();
        let done = done.clone();
        pool.spawner()
            .spawn_local(async move {
                let receipt = calls.move_to(target.x, target.y).await.unwrap();
                done.borrow_mut().push((target, receipt.hash));
            })
            .unwrap();
    }
    pool.run_until_stalled();
    assert_eq!(devnet.pending(), 2);
    assert_eq!(overrides(&network), 2);
    assert!(done.borrow().is_empty());

    let first = devnet.mine_one().unwrap();
    pool.run_until_stalled();
    let (landed, hash) = {
        let done = done.borrow();
        assert_eq!(done.len(), 1);
        done[0]
    };
    assert_eq!(hash, first);
    let still_pending = if landed == right { down } else { right };
    {
        let store = lock_store(&network.store);
        assert_eq!(store.position.get_committed(&me), Some(&landed));
        // the other command's override still shadows the committed value
        assert_eq!(store.position.get(&me), Some(&still_pending));
        assert_eq!(store.pending_overrides(), 1);
    }

    let second = devnet.mine_one().unwrap();
    pool.run_until_stalled();
    assert_ne!(first, second);
    assert_eq!(*done.borrow(), vec![(landed, first), (still_pending, second)]);
    assert_eq!(overrides(&network), 0);
    assert_eq!(calls.player_position(), Some(still_pending));
}

#[test]
fn move_by_before_spawn_is_a_no_op() {
    let field = open_field(4, 4);
    let (network, devnet, calls) = world(&rows(&field), true, 0.0);
    assert_eq!(block_on(calls.move_by(1, 0)), Ok(None));
    assert_eq!(block_on(calls.move_to(1, 0)), refused(Precondition::NotSpawned));
    assert_eq!(overrides(&network), 0);
    assert_eq!(devnet.pending(), 0);
}

#[test]
fn missing_player_or_map_aborts() {
    let field = open_field(4, 4);
    let (mut network, _devnet, calls) = world(&rows(&field), true, 0.0);

    lock_store(&network.store).apply(ComponentUpdate::Remove {
        entity: SINGLETON_ENTITY,
        kind: ComponentKind::MapConfig,
    });
    assert_eq!(block_on(calls.spawn(1, 1)), Err(ClientError::ConfigNotReady));
    assert_eq!(calls.wrap_position(1, 1), Err(ClientError::ConfigNotReady));

    network.player = None;
    let anonymous = SystemCalls::new(network);
    assert_eq!(block_on(anonymous.spawn(1, 1)), Err(ClientError::NoPlayer));
    assert_eq!(block_on(anonymous.flee_encounter()), Err(ClientError::NoPlayer));
}

#[test]
fn throw_and_flee_need_an_encounter() {
    let field = open_field(4, 4);
    let (_network, _devnet, calls) = world(&rows(&field), true, 0.0);
    block_on(calls.spawn(0, 0)).unwrap();
    assert_eq!(block_on(calls.throw_ball()), refused(Precondition::NoEncounter));
    assert_eq!(block_on(calls.leave_chat()), refused(Precondition::NoChat));
    assert!(matches!(block_on(calls.flee_encounter()), Err(ClientError::SubmissionRejected(_))));
}

#[test]
fn tall_grass_encounter_until_resolved() {
    let (network, _devnet, calls) = world(&["TT..", "...."], true, 1.0);
    let me = network.player_entity().unwrap();
    block_on(calls.spawn(2, 0)).unwrap();
    block_on(calls.move_by(-1, 0)).unwrap();
    assert!(matches!(calls.engagement(), Engagement::Encounter { .. }));
    assert!(calls.encounter_monster().is_some());

    let mut last = MonsterCatchResult::Missed;
    for _ in 0..3 {
        last = block_on(calls.throw_ball()).unwrap();
        if last.ends_encounter() {
            break;
        }
    }
    assert!(last.ends_encounter());
    assert_eq!(calls.engagement(), Engagement::Free);
    assert!(!lock_store(&network.store).encounter.has(&me, View::Committed));
}

#[test]
fn flee_ends_encounter() {
    let field = open_field(4, 4);
    let (network, devnet, calls) = world(&rows(&field), true, 0.0);
    block_on(calls.spawn(0, 0)).unwrap();
    devnet.start_encounter(network.player.unwrap(), MonsterType::Caterpillar);
    block_on(calls.flee_encounter()).unwrap();
    assert_eq!(calls.engagement(), Engagement::Free);
    block_on(calls.move_by(1, 0)).unwrap();
    assert_eq!(calls.player_position(), Some(Position::new(1, 0)));
}

/// World that confirms everything and writes nothing
struct SilentWorld {
    tx_reduced: Arc<TxStream>,
}

#[async_trait]
impl WorldAuthority for SilentWorld {
    async fn submit(&self, _call: WorldCall) -> Result<Submission, ClientError> {
        let hash = TxHash(rand::random());
        self.tx_reduced.publish(hash);
        Ok(Submission { hash })
    }
}

#[test]
fn catch_result_must_follow_confirmation() {
    let field = open_field(4, 4);
    let (mut network, _devnet, _calls) = world(&rows(&field), true, 0.0);
    network.world = Arc::new(SilentWorld { tx_reduced: network.tx_reduced.clone() });
    let me = network.player_entity().unwrap();
    let encounter = Encounter {
        monster: Entity([7; 32]),
        catch_attempts: 0,
    };
    lock_store(&network.store).encounter.set(me, encounter);

    let calls = SystemCalls::new(network);
    let missing: Result<MonsterCatchResult, ClientError> =
        Err(ClientError::MissingResult("MonsterCatchAttempt"));
    assert_eq!(block_on(calls.throw_ball()), missing);
}

#[test]
fn bumping_into_player_opens_chat() {
    let field = open_field(6, 6);
    let (network, devnet, calls) = world(&rows(&field), true, 0.0);
    let me = network.player.unwrap();
    let peer = Address([0x42; 20]);
    devnet.add_player(peer, Position::new(2, 1));
    devnet.seed_permission(peer, PermissionLevel::Friend);

    block_on(calls.spawn(1, 1)).unwrap();
    block_on(calls.move_by(1, 0)).unwrap();
    assert_eq!(calls.engagement(), Engagement::Chat { peer });
    assert_eq!(block_on(calls.move_by(1, 0)), refused(Precondition::InChat));

    let social = SocialGate::new(network.clone(), TxOptions::default());
    let mut room = block_on(ChatRoom::open(&social, me, peer)).unwrap();
    assert!(!room.can_send());

    block_on(room.toggle_follow(&social)).unwrap();
    assert!(!room.can_send());
    devnet.seed_follow(peer, me);
    assert!(block_on(room.refresh_can_chat(&social)).unwrap());

    block_on(room.leave(&calls)).unwrap();
    assert_eq!(calls.engagement(), Engagement::Free);
    let store = lock_store(&network.store);
    assert!(!store.chat_with.has(&Entity::from_address(peer), View::Committed));
}

#[test]
fn block_supersedes_follow_and_permission() {
    let field = open_field(4, 4);
    let (network, devnet, _calls) = world(&rows(&field), true, 0.0);
    let me = network.player.unwrap();
    let peer = Address([0x11; 20]);
    let social = SocialGate::new(network, TxOptions::default());

    block_on(social.follow_user(peer)).unwrap();
    devnet.seed_follow(peer, me);
    for level in PermissionLevel::ALL {
        devnet.seed_permission(peer, level);
        assert!(block_on(social.can_chat_with_player(peer)).unwrap(), "{}", level);

        block_on(social.block(peer)).unwrap();
        assert!(block_on(social.is_blocked_user(me, peer)).unwrap());
        assert!(!block_on(social.can_chat_with_player(peer)).unwrap(), "{}", level);
        block_on(social.unblock(peer)).unwrap();
        assert!(block_on(social.can_chat_with_player(peer)).unwrap(), "{}", level);
    }

    // a block from the other side counts too
    devnet.seed_block(peer, me);
    for level in PermissionLevel::ALL {
        devnet.seed_permission(peer, level);
        assert!(!block_on(social.can_chat_with_player(peer)).unwrap(), "{}", level);
    }
}

#[test]
fn over_long_status_never_reaches_the_contract() {
    let field = open_field(4, 4);
    let (network, _devnet, _calls) = world(&rows(&field), false, 0.0);
    let social = SocialGate::new(network.clone(), TxOptions::default());
    let long = "a".repeat(40);
    let mut write = Box::pin(social.set_metadata(&long));
    let mut cx = Context::from_waker(noop_waker_ref());
    match write.poll_unpin(&mut cx) {
        Poll::Ready(Err(ClientError::Status(_))) => {}
        other => panic!("unexpected {:?}", other.map(|r| r.map(|receipt| receipt.hash))),
    }
    assert_eq!(network.tx_reduced.pending_waiters(), 0);
}

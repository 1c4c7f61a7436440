/**
 * Client-side mirror of the world tables
 *
 * Committed values arrive from the chain. Overrides are layered on top by
 * in-flight commands so the player sees the result before it is confirmed;
 * each one is keyed by a fresh OverrideId and removed exactly once.
 */
use emojimon_common::{
    ChatWith, Encounter, Entity, MapConfig, MonsterCatchResult, MonsterType, Position,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// MUD singleton key, holder of MapConfig
pub const SINGLETON_ENTITY: Entity = Entity([0u8; 32]);

/// Token identifying one optimistic override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverrideId(pub u64);

impl OverrideId {
    pub fn fresh() -> Self {
        OverrideId(rand::random())
    }
}

impl fmt::Display for OverrideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Position,
    Player,
    Obstruction,
    Encounter,
    EncounterTrigger,
    Monster,
    MonsterCatchAttempt,
    ChatWith,
    MapConfig,
}

/// A value for any component table
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentValue {
    Position(Position),
    Player(bool),
    Obstruction,
    Encounter(Encounter),
    EncounterTrigger,
    Monster(MonsterType),
    MonsterCatchAttempt(MonsterCatchResult),
    ChatWith(ChatWith),
    MapConfig(MapConfig),
}

impl ComponentValue {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentValue::Position(_) => ComponentKind::Position,
            ComponentValue::Player(_) => ComponentKind::Player,
            ComponentValue::Obstruction => ComponentKind::Obstruction,
            ComponentValue::Encounter(_) => ComponentKind::Encounter,
            ComponentValue::EncounterTrigger => ComponentKind::EncounterTrigger,
            ComponentValue::Monster(_) => ComponentKind::Monster,
            ComponentValue::MonsterCatchAttempt(_) => ComponentKind::MonsterCatchAttempt,
            ComponentValue::ChatWith(_) => ComponentKind::ChatWith,
            ComponentValue::MapConfig(_) => ComponentKind::MapConfig,
        }
    }
}

/// Committed change pushed by the chain sync
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentUpdate {
    Set { entity: Entity, value: ComponentValue },
    Remove { entity: Entity, kind: ComponentKind },
}

/// Which tier a read sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Overrides shadow committed values
    Effective,
    /// Only values confirmed by the chain
    Committed,
}

/// Query predicate, ANDed with the others in a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFragment {
    Has(ComponentKind),
    HasPosition(Position),
}

struct PendingOverride<T> {
    id: OverrideId,
    entity: Entity,
    value: T,
}

/// One component: committed values plus an ordered override list
pub struct ComponentTable<T> {
    kind: ComponentKind,
    committed: HashMap<Entity, T>,
    overrides: Vec<PendingOverride<T>>,
}

impl<T> ComponentTable<T> {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            committed: HashMap::new(),
            overrides: Vec::new(),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Latest override for the entity, else the committed value
    pub fn get(&self, entity: &Entity) -> Option<&T> {
        self.overrides
            .iter()
            .rev()
            .find(|o| o.entity == *entity)
            .map(|o| &o.value)
            .or_else(|| self.committed.get(entity))
    }

    pub fn get_committed(&self, entity: &Entity) -> Option<&T> {
        self.committed.get(entity)
    }

    pub fn read(&self, entity: &Entity, view: View) -> Option<&T> {
        match view {
            View::Effective => self.get(entity),
            View::Committed => self.get_committed(entity),
        }
    }

    pub fn has(&self, entity: &Entity, view: View) -> bool {
        self.read(entity, view).is_some()
    }

    pub fn set(&mut self, entity: Entity, value: T) {
        self.committed.insert(entity, value);
    }

    pub fn remove(&mut self, entity: &Entity) -> Option<T> {
        self.committed.remove(entity)
    }

    pub fn add_override(&mut self, id: OverrideId, entity: Entity, value: T) {
        self.overrides.push(PendingOverride { id, entity, value });
    }

    /// Drop an override; the next read falls back to whatever sits beneath it
    pub fn remove_override(&mut self, id: OverrideId) -> bool {
        let before = self.overrides.len();
        self.overrides.retain(|o| o.id != id);
        self.overrides.len() != before
    }

    pub fn has_override(&self, id: OverrideId) -> bool {
        self.overrides.iter().any(|o| o.id == id)
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Entities that carry this component in the given view
    pub fn entities(&self, view: View) -> HashSet<Entity> {
        let mut out: HashSet<Entity> = self.committed.keys().copied().collect();
        if view == View::Effective {
            out.extend(self.overrides.iter().map(|o| o.entity));
        }
        out
    }
}

/// All component tables the client reads
pub struct ClientComponents {
    pub position: ComponentTable<Position>,
    pub player: ComponentTable<bool>,
    pub obstruction: ComponentTable<()>,
    pub encounter: ComponentTable<Encounter>,
    pub encounter_trigger: ComponentTable<()>,
    pub monster: ComponentTable<MonsterType>,
    pub monster_catch_attempt: ComponentTable<MonsterCatchResult>,
    pub chat_with: ComponentTable<ChatWith>,
    pub map_config: ComponentTable<MapConfig>,
}

impl Default for ClientComponents {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientComponents {
    pub fn new() -> Self {
        Self {
            position: ComponentTable::new(ComponentKind::Position),
            player: ComponentTable::new(ComponentKind::Player),
            obstruction: ComponentTable::new(ComponentKind::Obstruction),
            encounter: ComponentTable::new(ComponentKind::Encounter),
            encounter_trigger: ComponentTable::new(ComponentKind::EncounterTrigger),
            monster: ComponentTable::new(ComponentKind::Monster),
            monster_catch_attempt: ComponentTable::new(ComponentKind::MonsterCatchAttempt),
            chat_with: ComponentTable::new(ComponentKind::ChatWith),
            map_config: ComponentTable::new(ComponentKind::MapConfig),
        }
    }

    /// Whether the entity has a component of the given kind
    pub fn has(&self, kind: ComponentKind, entity: &Entity, view: View) -> bool {
        match kind {
            ComponentKind::Position => self.position.has(entity, view),
            ComponentKind::Player => self.player.has(entity, view),
            ComponentKind::Obstruction => self.obstruction.has(entity, view),
            ComponentKind::Encounter => self.encounter.has(entity, view),
            ComponentKind::EncounterTrigger => self.encounter_trigger.has(entity, view),
            ComponentKind::Monster => self.monster.has(entity, view),
            ComponentKind::MonsterCatchAttempt => self.monster_catch_attempt.has(entity, view),
            ComponentKind::ChatWith => self.chat_with.has(entity, view),
            ComponentKind::MapConfig => self.map_config.has(entity, view),
        }
    }

    fn entities_with(&self, kind: ComponentKind, view: View) -> HashSet<Entity> {
        match kind {
            ComponentKind::Position => self.position.entities(view),
            ComponentKind::Player => self.player.entities(view),
            ComponentKind::Obstruction => self.obstruction.entities(view),
            ComponentKind::Encounter => self.encounter.entities(view),
            ComponentKind::EncounterTrigger => self.encounter_trigger.entities(view),
            ComponentKind::Monster => self.monster.entities(view),
            ComponentKind::MonsterCatchAttempt => self.monster_catch_attempt.entities(view),
            ComponentKind::ChatWith => self.chat_with.entities(view),
            ComponentKind::MapConfig => self.map_config.entities(view),
        }
    }

    /// Entities matching every fragment
    pub fn run_query(&self, fragments: &[QueryFragment], view: View) -> HashSet<Entity> {
        let mut candidates = match fragments.first() {
            Some(QueryFragment::Has(kind)) => self.entities_with(*kind, view),
            Some(QueryFragment::HasPosition(_)) => self.position.entities(view),
            None => return HashSet::new(),
        };
        for fragment in fragments {
            candidates.retain(|entity| match fragment {
                QueryFragment::Has(kind) => self.has(*kind, entity, view),
                QueryFragment::HasPosition(pos) => self.position.read(entity, view) == Some(pos),
            });
        }
        candidates
    }

    /// Apply one committed change from the chain
    pub fn apply(&mut self, update: ComponentUpdate) {
        match update {
            ComponentUpdate::Set { entity, value } => match value {
                ComponentValue::Position(v) => self.position.set(entity, v),
                ComponentValue::Player(v) => self.player.set(entity, v),
                ComponentValue::Obstruction => self.obstruction.set(entity, ()),
                ComponentValue::Encounter(v) => self.encounter.set(entity, v),
                ComponentValue::EncounterTrigger => self.encounter_trigger.set(entity, ()),
                ComponentValue::Monster(v) => self.monster.set(entity, v),
                ComponentValue::MonsterCatchAttempt(v) => self.monster_catch_attempt.set(entity, v),
                ComponentValue::ChatWith(v) => self.chat_with.set(entity, v),
                ComponentValue::MapConfig(v) => self.map_config.set(entity, v),
            },
            ComponentUpdate::Remove { entity, kind } => match kind {
                ComponentKind::Position => {
                    self.position.remove(&entity);
                }
                ComponentKind::Player => {
                    self.player.remove(&entity);
                }
                ComponentKind::Obstruction => {
                    self.obstruction.remove(&entity);
                }
                ComponentKind::Encounter => {
                    self.encounter.remove(&entity);
                }
                ComponentKind::EncounterTrigger => {
                    self.encounter_trigger.remove(&entity);
                }
                ComponentKind::Monster => {
                    self.monster.remove(&entity);
                }
                ComponentKind::MonsterCatchAttempt => {
                    self.monster_catch_attempt.remove(&entity);
                }
                ComponentKind::ChatWith => {
                    self.chat_with.remove(&entity);
                }
                ComponentKind::MapConfig => {
                    self.map_config.remove(&entity);
                }
            },
        }
    }

    /// Layer a tentative value over the committed one
    pub fn add_override(&mut self, id: OverrideId, entity: Entity, value: ComponentValue) {
        match value {
            ComponentValue::Position(v) => self.position.add_override(id, entity, v),
            ComponentValue::Player(v) => self.player.add_override(id, entity, v),
            ComponentValue::Obstruction => self.obstruction.add_override(id, entity, ()),
            ComponentValue::Encounter(v) => self.encounter.add_override(id, entity, v),
            ComponentValue::EncounterTrigger => self.encounter_trigger.add_override(id, entity, ()),
            ComponentValue::Monster(v) => self.monster.add_override(id, entity, v),
            ComponentValue::MonsterCatchAttempt(v) => {
                self.monster_catch_attempt.add_override(id, entity, v)
            }
            ComponentValue::ChatWith(v) => self.chat_with.add_override(id, entity, v),
            ComponentValue::MapConfig(v) => self.map_config.add_override(id, entity, v),
        }
    }

    /// Remove an override from whichever table holds it
    pub fn remove_override(&mut self, id: OverrideId) -> bool {
        // ids are unique, so at most one table matches
        self.position.remove_override(id)
            || self.player.remove_override(id)
            || self.obstruction.remove_override(id)
            || self.encounter.remove_override(id)
            || self.encounter_trigger.remove_override(id)
            || self.monster.remove_override(id)
            || self.monster_catch_attempt.remove_override(id)
            || self.chat_with.remove_override(id)
            || self.map_config.remove_override(id)
    }

    pub fn has_override(&self, id: OverrideId) -> bool {
        self.position.has_override(id)
            || self.player.has_override(id)
            || self.obstruction.has_override(id)
            || self.encounter.has_override(id)
            || self.encounter_trigger.has_override(id)
            || self.monster.has_override(id)
            || self.monster_catch_attempt.has_override(id)
            || self.chat_with.has_override(id)
            || self.map_config.has_override(id)
    }

    /// Number of overrides currently layered over all tables
    pub fn pending_overrides(&self) -> usize {
        self.position.override_count()
            + self.player.override_count()
            + self.obstruction.override_count()
            + self.encounter.override_count()
            + self.encounter_trigger.override_count()
            + self.monster.override_count()
            + self.monster_catch_attempt.override_count()
            + self.chat_with.override_count()
            + self.map_config.override_count()
    }

    /// Committed map config, if loaded and non-empty
    pub fn map(&self) -> Option<&MapConfig> {
        self.map_config
            .get_committed(&SINGLETON_ENTITY)
            .filter(|config| config.is_ready())
    }

    /// Players with a position, for renderers
    pub fn players(&self) -> Vec<(Entity, Position)> {
        let mut out: Vec<(Entity, Position)> = self
            .run_query(
                &[
                    QueryFragment::Has(ComponentKind::Player),
                    QueryFragment::Has(ComponentKind::Position),
                ],
                View::Effective,
            )
            .into_iter()
            .filter(|e| self.player.get(e) == Some(&true))
            .filter_map(|e| self.position.get(&e).map(|p| (e, *p)))
            .collect();
        out.sort_by_key(|(e, _)| *e);
        out
    }
}

/// Store shared between the command executor, the sync feed and the UI
pub type SharedStore = Arc<Mutex<ClientComponents>>;

pub fn new_shared_store() -> SharedStore {
    Arc::new(Mutex::new(ClientComponents::new()))
}

/// Lock the store, recovering from poisoning so cleanup always runs
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, ClientComponents> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Overrides owned by one command; all of them are removed when this drops,
/// whether the command confirmed, failed or was abandoned mid-flight.
pub struct OverrideGuard {
    store: SharedStore,
    ids: Vec<OverrideId>,
}

impl OverrideGuard {
    pub fn new(store: &SharedStore) -> Self {
        Self {
            store: store.clone(),
            ids: Vec::new(),
        }
    }

    /// Add one override under a fresh token
    pub fn apply(&mut self, entity: Entity, value: ComponentValue) -> OverrideId {
        let id = OverrideId::fresh();
        log::debug!("override {} on {:?} for {}", id, value.kind(), entity);
        lock_store(&self.store).add_override(id, entity, value);
        self.ids.push(id);
        id
    }

    pub fn ids(&self) -> &[OverrideId] {
        &self.ids
    }
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        let mut store = lock_store(&self.store);
        for id in self.ids.drain(..) {
            if !store.remove_override(id) {
                log::warn!("override {} was already gone at cleanup", id);
            } else {
                log::debug!("override {} removed", id);
            }
        }
    }
}

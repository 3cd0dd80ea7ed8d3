//! Agent directory with identity, role, and spatial indices.
//!
//! Agents live in a single arena addressed by a stable slot handle. The
//! by-id, by-role, and spatial bucket indices only hold handles, and all of
//! them are updated together under one lock per mutating call.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use tracing::trace;

use crate::agent::Agent;
use crate::bus::{Command, Event};
use crate::types::{AgentId, Position, Role};

/// Default bucket edge length, in grid cells.
pub const DEFAULT_BUCKET_SIZE: i32 = 10;
/// Default ring bound for [`SpatialRegistry::find_nearest_idle`].
pub const DEFAULT_SEARCH_RADIUS: u32 = 3;

type Handle = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct BucketKey {
    x: i32,
    y: i32,
}

#[derive(Debug, Default)]
struct RegistryState {
    // Removed agents leave a tombstone so handles stay stable.
    arena: Vec<Option<Agent>>,
    by_id: HashMap<AgentId, Handle>,
    by_role: [Vec<Handle>; 3],
    buckets: HashMap<BucketKey, Vec<Handle>>,
}

pub struct SpatialRegistry {
    bucket_size: i32,
    inner: Mutex<RegistryState>,
}

impl SpatialRegistry {
    pub fn new() -> Self {
        Self::with_bucket_size(DEFAULT_BUCKET_SIZE)
    }

    /// Registry with a custom bucket edge. Values below 1 are clamped to 1.
    pub fn with_bucket_size(bucket_size: i32) -> Self {
        Self {
            bucket_size: bucket_size.max(1),
            inner: Mutex::new(RegistryState::default()),
        }
    }

    pub fn bucket_size(&self) -> i32 {
        self.bucket_size
    }

    /// Add an agent; fails if its id is already present.
    pub fn register(&self, agent: Agent) -> bool {
        let mut guard = self.inner.lock().expect("registry mutex poisoned");
        if guard.by_id.contains_key(&agent.id()) {
            return false;
        }
        let handle = guard.arena.len();
        let key = self.bucket_of(agent.position());
        guard.by_id.insert(agent.id(), handle);
        guard.by_role[agent.role().index()].push(handle);
        guard.buckets.entry(key).or_default().push(handle);
        guard.arena.push(Some(agent));
        true
    }

    /// Unlink an agent from every index.
    pub fn remove(&self, id: AgentId) -> bool {
        let mut guard = self.inner.lock().expect("registry mutex poisoned");
        let Some(handle) = guard.by_id.remove(&id) else {
            return false;
        };
        let Some(agent) = guard.arena[handle].take() else {
            return false;
        };
        guard.by_role[agent.role().index()].retain(|h| *h != handle);
        let key = self.bucket_of(agent.position());
        unlink_bucket(&mut guard.buckets, key, handle);
        true
    }

    /// Record a new last known position and move the agent between buckets.
    pub fn update_position(&self, id: AgentId, position: Position) -> bool {
        let mut guard = self.inner.lock().expect("registry mutex poisoned");
        let Some(&handle) = guard.by_id.get(&id) else {
            return false;
        };
        self.reposition(&mut guard, handle, position);
        true
    }

    /// Apply a command to its addressed agent, re-index the agent if it
    /// moved, and return the events it published. `None` if no such agent.
    pub fn deliver(&self, command: &Command) -> Option<Vec<Event>> {
        let mut guard = self.inner.lock().expect("registry mutex poisoned");
        let handle = *guard.by_id.get(&command.target())?;
        let agent = guard.arena[handle].as_mut()?;
        let before = agent.position();
        let events = agent.handle(command);
        let after = agent.position();
        if after != before {
            self.rebucket(&mut guard, handle, before, after);
        }
        Some(events)
    }

    pub fn by_id(&self, id: AgentId) -> Option<Agent> {
        let guard = self.inner.lock().expect("registry mutex poisoned");
        let handle = *guard.by_id.get(&id)?;
        guard.arena[handle].clone()
    }

    /// Agents of `role` in registration order.
    pub fn by_role(&self, role: Role) -> Vec<Agent> {
        let guard = self.inner.lock().expect("registry mutex poisoned");
        guard.by_role[role.index()]
            .iter()
            .filter_map(|&handle| guard.arena[handle].clone())
            .collect()
    }

    pub fn count_by_role(&self, role: Role) -> usize {
        let guard = self.inner.lock().expect("registry mutex poisoned");
        guard.by_role[role.index()].len()
    }

    /// Every registered agent in registration order.
    pub fn all(&self) -> Vec<Agent> {
        let guard = self.inner.lock().expect("registry mutex poisoned");
        guard.arena.iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("registry mutex poisoned");
        guard.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nearest idle agent of `role` to `target`.
    ///
    /// Rings of buckets are scanned outwards by Chebyshev distance; the first
    /// ring holding any candidate settles the answer by squared Euclidean
    /// distance. Past `search_radius` rings a linear scan over the role
    /// index takes over, so a far-away agent is still found.
    pub fn find_nearest_idle(
        &self,
        role: Role,
        target: Position,
        search_radius: u32,
    ) -> Option<Agent> {
        let guard = self.inner.lock().expect("registry mutex poisoned");
        if guard.by_role[role.index()].is_empty() {
            return None;
        }

        let center = self.bucket_of(target);
        // Only occupied buckets can hold candidates, so rings are built from
        // them rather than walked cell by cell. Within a ring, buckets are
        // visited in (x, y) order.
        let mut rings: BTreeMap<i64, Vec<BucketKey>> = BTreeMap::new();
        for (key, members) in &guard.buckets {
            let ring = chebyshev(*key, center);
            if !members.is_empty() && ring <= i64::from(search_radius) {
                rings.entry(ring).or_default().push(*key);
            }
        }
        let mut best: Option<(i64, Handle)> = None;

        for (ring, mut keys) in rings {
            keys.sort_unstable_by_key(|key| (key.x, key.y));
            for key in keys {
                let Some(members) = guard.buckets.get(&key) else {
                    continue;
                };
                for &handle in members {
                    consider(&guard.arena, handle, role, target, &mut best);
                }
            }
            if best.is_some() {
                trace!(%role, %target, ring, "nearest idle found by ring search");
                break;
            }
        }

        if best.is_none() {
            for &handle in &guard.by_role[role.index()] {
                consider(&guard.arena, handle, role, target, &mut best);
            }
            if best.is_some() {
                trace!(%role, %target, "nearest idle found by fallback scan");
            }
        }

        best.and_then(|(_, handle)| guard.arena[handle].clone())
    }

    fn reposition(&self, state: &mut RegistryState, handle: Handle, position: Position) {
        let Some(agent) = state.arena[handle].as_mut() else {
            return;
        };
        let old = agent.position();
        agent.set_position(position);
        self.rebucket(state, handle, old, position);
    }

    fn rebucket(&self, state: &mut RegistryState, handle: Handle, old: Position, new: Position) {
        let old_key = self.bucket_of(old);
        let new_key = self.bucket_of(new);
        if old_key != new_key {
            unlink_bucket(&mut state.buckets, old_key, handle);
            state.buckets.entry(new_key).or_default().push(handle);
        }
    }

    fn bucket_of(&self, position: Position) -> BucketKey {
        BucketKey {
            x: position.x.div_euclid(self.bucket_size),
            y: position.y.div_euclid(self.bucket_size),
        }
    }
}

impl Default for SpatialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpatialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialRegistry")
            .field("bucket_size", &self.bucket_size)
            .field("agents", &self.len())
            .finish()
    }
}

fn chebyshev(a: BucketKey, b: BucketKey) -> i64 {
    let dx = (i64::from(a.x) - i64::from(b.x)).abs();
    let dy = (i64::from(a.y) - i64::from(b.y)).abs();
    dx.max(dy)
}

fn consider(
    arena: &[Option<Agent>],
    handle: Handle,
    role: Role,
    target: Position,
    best: &mut Option<(i64, Handle)>,
) {
    let Some(agent) = arena[handle].as_ref() else {
        return;
    };
    if agent.role() != role || !agent.is_idle() {
        return;
    }
    let dist = agent.position().distance_sq(target);
    // Strict comparison keeps the first candidate seen on ties.
    if best.is_none_or(|(best_dist, _)| dist < best_dist) {
        *best = Some((dist, handle));
    }
}

fn unlink_bucket(buckets: &mut HashMap<BucketKey, Vec<Handle>>, key: BucketKey, handle: Handle) {
    if let Some(members) = buckets.get_mut(&key) {
        members.retain(|h| *h != handle);
        if members.is_empty() {
            buckets.remove(&key);
        }
    }
}

//! Entity and component id allocation
//!
//! Ids live in three ranges. Replicated ids are handed out by an authority,
//! unacked ids are provisional replicated ids created by a client until the
//! authority acknowledges them, and local ids are never replicated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeBounds;

/// Identifier of an entity, unique within its scene
pub type EntityId = u32;

/// Identifier of a component, unique within its entity
pub type ComponentId = u32;

/// First id of the replicated range
pub const FIRST_REPLICATED_ID: u32 = 1;

/// First id of the unacked range
pub const FIRST_UNACKED_ID: u32 = 0x4000_0000;

/// First id of the local range
pub const FIRST_LOCAL_ID: u32 = 0x8000_0000;

/// True if an id belongs to the replicated or unacked range
pub const fn is_replicated_id(id: u32) -> bool {
    id < FIRST_LOCAL_ID
}

/// True if an id belongs to the local range
pub const fn is_local_id(id: u32) -> bool {
    id >= FIRST_LOCAL_ID
}

/// True if an id belongs to the unacked range
pub const fn is_unacked_id(id: u32) -> bool {
    id >= FIRST_UNACKED_ID && id < FIRST_LOCAL_ID
}

/// What happens to ids once their owner is removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdReusePolicy {
    /// Counters only move forward until cleared
    #[default]
    Monotonic,
    /// Released ids are handed out again before the counters advance
    ReuseFreed,
}

/// Allocates ids in the replicated, unacked and local ranges
///
/// The generator does not know which ids are live; callers probe the returned
/// id and allocate again on collision.
#[derive(Debug, Clone)]
pub struct UniqueIdGenerator {
    id: u32,
    unacked_id: u32,
    local_id: u32,
    policy: IdReusePolicy,
    freed: BTreeSet<u32>,
}

impl Default for UniqueIdGenerator {
    fn default() -> Self {
        Self::new(IdReusePolicy::Monotonic)
    }
}

impl UniqueIdGenerator {
    /// Create a generator with every counter at the start of its range
    pub const fn new(policy: IdReusePolicy) -> Self {
        Self {
            id: FIRST_REPLICATED_ID - 1,
            unacked_id: FIRST_UNACKED_ID - 1,
            local_id: FIRST_LOCAL_ID - 1,
            policy,
            freed: BTreeSet::new(),
        }
    }

    /// Reuse policy in effect
    pub const fn policy(&self) -> IdReusePolicy {
        self.policy
    }

    /// Next replicated id
    pub fn allocate_replicated(&mut self) -> u32 {
        if let Some(id) = self.take_freed(FIRST_REPLICATED_ID..FIRST_UNACKED_ID) {
            return id;
        }
        self.id = if self.id + 1 >= FIRST_UNACKED_ID { FIRST_REPLICATED_ID } else { self.id + 1 };
        self.id
    }

    /// Next unacked id
    pub fn allocate_unacked(&mut self) -> u32 {
        if let Some(id) = self.take_freed(FIRST_UNACKED_ID..FIRST_LOCAL_ID) {
            return id;
        }
        self.unacked_id = if self.unacked_id + 1 >= FIRST_LOCAL_ID {
            FIRST_UNACKED_ID
        } else {
            self.unacked_id + 1
        };
        self.unacked_id
    }

    /// Next local id
    pub fn allocate_local(&mut self) -> u32 {
        if let Some(id) = self.take_freed(FIRST_LOCAL_ID..=u32::MAX) {
            return id;
        }
        self.local_id = if self.local_id == u32::MAX { FIRST_LOCAL_ID } else { self.local_id + 1 };
        self.local_id
    }

    /// Move the replicated counter so the next id follows `id`
    ///
    /// Used when an id is assigned manually, to skip probing ids that are
    /// already taken. Ids outside the replicated range are ignored.
    pub fn reset_replicated_id(&mut self, id: u32) {
        if id < FIRST_UNACKED_ID {
            self.id = self.id.max(id);
        }
    }

    /// Hand an id back for reuse
    pub fn release(&mut self, id: u32) {
        if self.policy == IdReusePolicy::ReuseFreed && id != 0 {
            self.freed.insert(id);
        }
    }

    /// Forget a released id because it was assigned manually
    pub fn claim(&mut self, id: u32) {
        self.freed.remove(&id);
    }

    /// Return every counter to the start of its range
    pub fn reset(&mut self) {
        *self = Self::new(self.policy);
    }

    fn take_freed(&mut self, range: impl RangeBounds<u32>) -> Option<u32> {
        let id = self.freed.range(range).next().copied()?;
        self.freed.remove(&id);
        Some(id)
    }
}

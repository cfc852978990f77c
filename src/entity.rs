// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Entity identifiers, location metadata and the id generator.

use std::sync::atomic::{AtomicU64, Ordering};

/// First id handed out by a fresh generator (0 is reserved)
pub const FIRST_ENTITY_ID: u64 = 1;

/// Opaque 64-bit entity identity
///
/// An entity belongs to exactly one archetype for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

/// All-ones marker for "no entity"
pub const INVALID_ENTITY_ID: EntityId = EntityId(u64::MAX);

impl EntityId {
    pub const INVALID: EntityId = INVALID_ENTITY_ID;

    pub fn from_raw(raw: u64) -> Self {
        EntityId(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != INVALID_ENTITY_ID
    }
}

/// Entity location in a pool (chunk index, slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub chunk: u32,
    pub slot: u32,
}

/// Monotonic entity id allocator
///
/// Safe to call from any thread. Worlds exchanging entities with
/// caller-chosen ids should share one generator via `Arc`.
#[derive(Debug)]
pub struct EntityIdGen {
    next: AtomicU64,
}

impl EntityIdGen {
    pub fn new() -> Self {
        Self::starting_at(EntityId(FIRST_ENTITY_ID))
    }

    pub fn starting_at(first: EntityId) -> Self {
        Self {
            next: AtomicU64::new(first.raw()),
        }
    }

    pub fn next_id(&self) -> EntityId {
        EntityId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EntityIdGen {
    fn default() -> Self {
        Self::new()
    }
}

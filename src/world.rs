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

//! World: pool registry, entity map and phase orchestration

use std::sync::Arc;

use ahash::AHashMap;
use smallvec::SmallVec;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::component::{component_id, Bundle, Component, ComponentId, MAX_BUNDLE_COMPONENTS};
use crate::entity::{EntityId, EntityIdGen};
use crate::error::{EcsError, Result};
use crate::event::BoxedEvent;
use crate::pool::ArchetypePool;
use crate::signature::Signature;
use crate::system::{BoxedSystem, SystemId};

/// Handle to a registered pool; wraps the signature hash, unique per world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(pub u64);

struct SystemEntry {
    id: SystemId,
    system: BoxedSystem,
    /// Reserved for a future concurrent dispatcher
    done: bool,
    /// Superset-match result per pool signature hash
    matches: AHashMap<u64, bool>,
}

/// Central ECS world
///
/// Owns every archetype pool and the global entity map; runs the system
/// and event phases. All operations are single-threaded except
/// `remove_entity` and id allocation.
pub struct World {
    /// Pools in creation order; dispatch iterates this
    pools: Vec<ArchetypePool>,

    /// Signature hash to pool index
    pool_index: AHashMap<u64, usize>,

    /// Owning pool index per live entity
    entity_to_pool: AHashMap<EntityId, usize>,

    /// Systems in registration order (the execution order)
    systems: Vec<SystemEntry>,

    next_system_id: u32,

    id_gen: Arc<EntityIdGen>,
}

impl World {
    /// Create a new, empty world with its own id generator.
    pub fn new() -> Self {
        Self::with_id_gen(Arc::new(EntityIdGen::new()))
    }

    /// Create a world over a shared id generator
    ///
    /// Worlds that exchange entities with caller-chosen ids must share one
    /// generator so ids stay unique across them.
    pub fn with_id_gen(id_gen: Arc<EntityIdGen>) -> Self {
        Self {
            pools: Vec::new(),
            pool_index: AHashMap::new(),
            entity_to_pool: AHashMap::new(),
            systems: Vec::new(),
            next_system_id: 0,
            id_gen,
        }
    }

    pub fn id_gen(&self) -> &Arc<EntityIdGen> {
        &self.id_gen
    }

    /// Register the pool for bundle `B`, or return the existing one
    pub fn add_pool<B: Bundle>(&mut self) -> Result<PoolId> {
        let infos = B::component_infos();
        let signature = Signature::from_infos(&infos);
        let hash = signature.hash();
        if self.pool_index.contains_key(&hash) {
            return Ok(PoolId(hash));
        }
        let pool = ArchetypePool::new(signature, &infos, Arc::clone(&self.id_gen))?;
        self.pools.push(pool);
        self.pool_index.insert(hash, self.pools.len() - 1);
        Ok(PoolId(hash))
    }

    /// Create an entity in the pool for bundle `B`
    ///
    /// With `auto_create_pool` false, a missing pool is an error instead.
    pub fn create_entity<B: Bundle>(&mut self, auto_create_pool: bool) -> Result<EntityId> {
        let infos = B::component_infos();
        let hash = Signature::from_infos(&infos).hash();
        let pool_idx = match self.pool_index.get(&hash) {
            Some(&idx) => idx,
            None => {
                if !auto_create_pool {
                    return Err(EcsError::PoolNotFound);
                }
                self.add_pool::<B>()?;
                self.pool_index[&hash]
            }
        };
        let entity = self.pools[pool_idx].create_entity();
        self.entity_to_pool.insert(entity, pool_idx);
        Ok(entity)
    }

    /// Create an entity with initial component values
    pub fn add_entity<B: Bundle>(&mut self, bundle: B) -> Result<EntityId> {
        let entity = self.id_gen.next_id();
        self.add_entity_with_id(entity, bundle)
    }

    /// Insert with a caller-chosen id (cross-world transfer, deterministic
    /// tests)
    ///
    /// The id must be valid and must not be live in this world.
    pub fn add_entity_with_id<B: Bundle>(&mut self, entity: EntityId, bundle: B) -> Result<EntityId> {
        debug_assert!(entity.is_valid());
        debug_assert!(
            !self.entity_to_pool.contains_key(&entity),
            "entity id already live in this world"
        );

        #[cfg(feature = "profiling")]
        let span = info_span!("world.add_entity", pool_count = self.pools.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let infos = B::component_infos();
        let hash = Signature::from_infos(&infos).hash();
        let pool_idx = match self.pool_index.get(&hash) {
            Some(&idx) => idx,
            None => {
                self.add_pool::<B>()?;
                self.pool_index[&hash]
            }
        };
        let pool = &mut self.pools[pool_idx];
        let location = pool.alloc_row(entity);
        let ptrs = pool.row_ptrs(location);
        unsafe {
            bundle.write_components(&ptrs);
        }
        self.entity_to_pool.insert(entity, pool_idx);
        Ok(entity)
    }

    /// Check whether an entity is live in this world
    pub fn has_entity(&self, entity: EntityId) -> bool {
        self.entity_to_pool.contains_key(&entity)
    }

    /// Stage an entity for removal; storage is reclaimed at `flush`
    ///
    /// Callable from any thread.
    pub fn remove_entity(&self, entity: EntityId) -> bool {
        match self.entity_to_pool.get(&entity) {
            Some(&idx) => self.pools[idx].remove_entity(entity),
            None => false,
        }
    }

    /// Get immutable reference to a component on an entity
    ///
    /// None if the entity is unknown or its archetype lacks `T`.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        let &pool_idx = self.entity_to_pool.get(&entity)?;
        let ptr = self.pools[pool_idx].component_ptr(entity, component_id::<T>())?;
        Some(unsafe { &*(ptr as *const T) })
    }

    /// Get mutable reference to a component on an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        let &pool_idx = self.entity_to_pool.get(&entity)?;
        let ptr = self.pools[pool_idx].component_ptr(entity, component_id::<T>())?;
        Some(unsafe { &mut *(ptr as *mut T) })
    }

    /// Overwrite one component field
    pub fn set_component<T: Component>(&mut self, entity: EntityId, value: T) -> bool {
        match self.get_component_mut::<T>(entity) {
            Some(field) => {
                *field = value;
                true
            }
            None => false,
        }
    }

    /// Register a system; execution follows registration order
    pub fn add_system(&mut self, system: BoxedSystem) -> SystemId {
        let id = SystemId(self.next_system_id);
        self.next_system_id += 1;
        self.systems.push(SystemEntry {
            id,
            system,
            done: false,
            matches: AHashMap::new(),
        });
        id
    }

    pub fn remove_system(&mut self, id: SystemId) -> bool {
        let before = self.systems.len();
        self.systems.retain(|entry| entry.id != id);
        self.systems.len() != before
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// True when every system completed the last dispatch pass
    pub fn systems_done(&self) -> bool {
        self.systems.iter().all(|entry| entry.done)
    }

    /// Run every system over every matching pool, chunk by chunk
    ///
    /// A pool matches when its signature is a superset of the system's
    /// required set; the result is cached per (system, pool).
    pub fn run_systems(&mut self) {
        #[cfg(feature = "profiling")]
        let span = info_span!(
            "world.run_systems",
            systems = self.systems.len(),
            pools = self.pools.len()
        );
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let Self { pools, systems, .. } = self;

        for entry in systems.iter_mut() {
            entry.done = false;
        }

        for entry in systems.iter_mut() {
            let required: SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]> =
                SmallVec::from_slice(entry.system.required_components());
            for pool in pools.iter_mut() {
                let hash = pool.signature().hash();
                let matched = *entry
                    .matches
                    .entry(hash)
                    .or_insert_with(|| pool.signature().contains_all(&required));
                if !matched {
                    continue;
                }
                for chunk_idx in 0..pool.chunk_count() {
                    if let Some(mut view) = pool.chunk_view(chunk_idx, &required) {
                        entry.system.execute(&mut view);
                    }
                }
            }
            entry.done = true;
        }
    }

    /// Queue an event on the entity's pool; ownership transfers
    pub fn push_event(&mut self, entity: EntityId, event: BoxedEvent) -> bool {
        match self.entity_to_pool.get(&entity) {
            Some(&idx) => {
                self.pools[idx].push_event(entity, event);
                true
            }
            None => false,
        }
    }

    /// Drain every pool's event queues
    pub fn run_events(&mut self) {
        for pool in &mut self.pools {
            pool.run_events();
        }
    }

    /// Apply all staged removals across pools
    pub fn flush(&mut self) {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.flush", pools = self.pools.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let Self {
            pools,
            entity_to_pool,
            ..
        } = self;
        for pool in pools.iter_mut() {
            for entity in pool.flush() {
                entity_to_pool.remove(&entity);
            }
        }
    }

    pub fn pool(&self, id: PoolId) -> Option<&ArchetypePool> {
        self.pool_index.get(&id.0).map(|&idx| &self.pools[idx])
    }

    /// Pool owning `entity`, if it is live
    pub fn pool_for_entity(&self, entity: EntityId) -> Option<&ArchetypePool> {
        self.entity_to_pool
            .get(&entity)
            .map(|&idx| &self.pools[idx])
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entity_to_pool.len()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(dead_code)]
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Rotation {
        x: f32,
        y: f32,
        z: f32,
        w: f32,
    }

    #[test]
    fn test_create_remove_flush() {
        let mut world = World::new();

        let entity = world
            .create_entity::<(Position, Rotation)>(true)
            .unwrap();
        assert!(world.has_entity(entity));

        assert!(world.remove_entity(entity));
        assert!(world.has_entity(entity), "removal is deferred");
        world.flush();
        assert!(!world.has_entity(entity));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_pool_registration_is_idempotent() {
        let mut world = World::new();
        let first = world.add_pool::<(Position, Rotation)>().unwrap();
        let second = world.add_pool::<(Position, Rotation)>().unwrap();
        assert_eq!(first, second);
        assert_eq!(world.pool_count(), 1);
    }

    #[test]
    fn test_declared_order_separates_pools() {
        let mut world = World::new();
        world.add_pool::<(Position, Rotation)>().unwrap();
        world.add_pool::<(Rotation, Position)>().unwrap();
        assert_eq!(world.pool_count(), 2);
    }

    #[test]
    fn test_create_without_pool_fails_when_not_auto() {
        let mut world = World::new();
        assert_eq!(
            world.create_entity::<(Position,)>(false),
            Err(EcsError::PoolNotFound)
        );

        world.add_pool::<(Position,)>().unwrap();
        assert!(world.create_entity::<(Position,)>(false).is_ok());
    }

    #[test]
    fn test_set_get_component() {
        let mut world = World::new();
        let entity = world
            .add_entity((Position {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },))
            .unwrap();

        assert_eq!(
            world.get_component::<Position>(entity),
            Some(&Position {
                x: 1.0,
                y: 2.0,
                z: 3.0
            })
        );
        assert!(world.set_component(
            entity,
            Position {
                x: 9.0,
                y: 9.0,
                z: 9.0
            }
        ));
        assert_eq!(world.get_component::<Position>(entity).unwrap().x, 9.0);
        assert!(world.get_component::<Rotation>(entity).is_none());
    }

    #[test]
    fn test_add_entity_with_caller_chosen_id() {
        let id_gen = Arc::new(EntityIdGen::new());
        let mut source = World::with_id_gen(Arc::clone(&id_gen));
        let mut target = World::with_id_gen(id_gen);

        let entity = source
            .add_entity((Position {
                x: 5.0,
                y: 0.0,
                z: 0.0,
            },))
            .unwrap();
        let moved = target
            .add_entity_with_id(
                entity,
                (Position {
                    x: 5.0,
                    y: 0.0,
                    z: 0.0,
                },),
            )
            .unwrap();

        assert_eq!(moved, entity);
        assert_eq!(target.get_component::<Position>(entity).unwrap().x, 5.0);
    }
}

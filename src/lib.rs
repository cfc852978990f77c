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

//! Chunked ECS - Data-oriented Entity Component System
//!
//! Archetype pools with chunked SoA storage, deferred removal with
//! compaction, chunk-wise system dispatch and per-entity events.

pub mod chunk;
pub mod component;
pub mod entity;
pub mod error;
pub mod event;
pub mod pool;
pub mod signature;
pub mod system;
pub mod utils;
pub mod world;

// Re-exports for convenience
pub use chunk::{ColumnLayout, ColumnTable, CACHE_LINE_SIZE, CHUNK_SIZE, MIN_ELEMENTS_PER_CHUNK};
pub use component::{
    component_id, component_info, Bundle, Component, ComponentId, ComponentInfo,
    MAX_BUNDLE_COMPONENTS,
};
pub use entity::{EntityId, EntityIdGen, EntityLocation, FIRST_ENTITY_ID, INVALID_ENTITY_ID};
pub use error::{EcsError, Result};
pub use event::{BoxedEvent, EntityEvent, EntityView};
pub use pool::ArchetypePool;
pub use signature::Signature;
pub use system::{BoxedSystem, ChunkView, System, SystemId};
pub use world::{PoolId, World};

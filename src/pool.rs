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

//! Archetype pool: chunk chain, locator maps, deferred removal and
//! per-entity event queues.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::chunk::{Chunk, ColumnTable};
use crate::component::{ComponentId, ComponentInfo, MAX_BUNDLE_COMPONENTS};
use crate::entity::{EntityId, EntityIdGen, EntityLocation};
use crate::error::Result;
use crate::event::{BoxedEvent, EntityView};
use crate::signature::Signature;
use crate::system::ChunkView;

/// A removal staged by `remove_entity`, applied at the next `flush`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRemove {
    entity: EntityId,
    chunk: u32,
    slot: u32,
}

/// Storage for one archetype
///
/// Chunks fill left to right; only the last non-empty chunk may be
/// partial, except transiently between a staged removal and `flush`.
pub struct ArchetypePool {
    signature: Signature,
    table: ColumnTable,
    chunks: Vec<Chunk>,
    entity_to_slot: FxHashMap<EntityId, EntityLocation>,
    /// Sorted by (chunk, slot), deduplicated; the one cross-thread entry point
    pending_remove: Mutex<Vec<PendingRemove>>,
    events: FxHashMap<EntityId, Vec<BoxedEvent>>,
    id_gen: Arc<EntityIdGen>,
}

impl ArchetypePool {
    pub(crate) fn new(
        signature: Signature,
        infos: &[ComponentInfo],
        id_gen: Arc<EntityIdGen>,
    ) -> Result<Self> {
        let table = ColumnTable::new(infos)?;
        Ok(Self {
            signature,
            table,
            chunks: Vec::new(),
            entity_to_slot: FxHashMap::default(),
            pending_remove: Mutex::new(Vec::new()),
            events: FxHashMap::default(),
            id_gen,
        })
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Rows per chunk for this archetype
    pub fn capacity_per_chunk(&self) -> u32 {
        self.table.capacity()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Live rows in chunk `chunk`
    pub fn chunk_len(&self, chunk: usize) -> u32 {
        self.chunks.get(chunk).map_or(0, Chunk::count)
    }

    pub fn entity_count(&self) -> usize {
        self.entity_to_slot.len()
    }

    pub fn pending_remove_count(&self) -> usize {
        self.pending_remove.lock().len()
    }

    pub fn has_entity(&self, entity: EntityId) -> bool {
        self.entity_to_slot.contains_key(&entity)
    }

    pub fn location_of(&self, entity: EntityId) -> Option<EntityLocation> {
        self.entity_to_slot.get(&entity).copied()
    }

    /// Allocate an id and a slot for it
    pub(crate) fn create_entity(&mut self) -> EntityId {
        let entity = self.id_gen.next_id();
        self.alloc_row(entity);
        entity
    }

    /// Place `entity` in the first non-full chunk, appending one if needed
    pub(crate) fn alloc_row(&mut self, entity: EntityId) -> EntityLocation {
        let capacity = self.table.capacity();
        let chunk_idx = match self.chunks.iter().position(|c| c.count() < capacity) {
            Some(idx) => idx,
            None => {
                self.chunks.push(Chunk::new(&self.table));
                self.chunks.len() - 1
            }
        };
        let slot = self.chunks[chunk_idx].push_row(entity);
        let location = EntityLocation {
            chunk: chunk_idx as u32,
            slot,
        };
        self.entity_to_slot.insert(entity, location);
        location
    }

    /// Field pointers for one row, one per column in declared order
    pub(crate) fn row_ptrs(
        &mut self,
        location: EntityLocation,
    ) -> SmallVec<[*mut u8; MAX_BUNDLE_COMPONENTS]> {
        let chunk = &self.chunks[location.chunk as usize];
        (0..self.table.column_count())
            .map(|column| chunk.field_ptr(&self.table, column, location.slot))
            .collect()
    }

    /// Pointer to one live field, or None if the entity or column is unknown
    ///
    /// Valid until the next structural mutation of this pool.
    pub(crate) fn component_ptr(&self, entity: EntityId, component: ComponentId) -> Option<*mut u8> {
        let location = self.entity_to_slot.get(&entity)?;
        let column = self.table.column_index(component)?;
        Some(self.chunks[location.chunk as usize].field_ptr(&self.table, column, location.slot))
    }

    /// Stage a removal; storage is untouched until `flush`
    ///
    /// Callable from any thread. Repeated staging of the same entity
    /// collapses to one entry.
    pub fn remove_entity(&self, entity: EntityId) -> bool {
        let Some(&location) = self.entity_to_slot.get(&entity) else {
            return false;
        };
        let mut queue = self.pending_remove.lock();
        match queue.binary_search_by_key(&(location.chunk, location.slot), |p| (p.chunk, p.slot)) {
            Ok(_) => {} // already staged
            Err(pos) => queue.insert(
                pos,
                PendingRemove {
                    entity,
                    chunk: location.chunk,
                    slot: location.slot,
                },
            ),
        }
        true
    }

    /// Apply all staged removals and restore chunk density
    ///
    /// Returns the removed ids so the world can drop its own entries.
    pub(crate) fn flush(&mut self) -> Vec<EntityId> {
        let pending = std::mem::take(&mut *self.pending_remove.lock());
        if pending.is_empty() {
            return Vec::new();
        }

        let mut removed = Vec::with_capacity(pending.len());
        let mut start = 0;
        while start < pending.len() {
            let chunk_idx = pending[start].chunk;
            let end = pending[start..]
                .iter()
                .position(|p| p.chunk != chunk_idx)
                .map_or(pending.len(), |offset| start + offset);
            self.compact_chunk(chunk_idx as usize, &pending[start..end], &mut removed);
            start = end;
        }

        self.merge_partial_chunks();
        self.release_empty_tail();
        removed
    }

    /// Swap-with-tail bulk removal within one chunk
    ///
    /// Donors are scanned from the tail, skipping slots in the remove set;
    /// each vacated slot below the surviving prefix receives the highest
    /// unused survivor. One count decrement per removal, O(removals) moves.
    fn compact_chunk(
        &mut self,
        chunk_idx: usize,
        removals: &[PendingRemove],
        removed: &mut Vec<EntityId>,
    ) {
        let chunk = &mut self.chunks[chunk_idx];
        let count = chunk.count() as usize;
        debug_assert!(removals.len() <= count);
        let new_count = count - removals.len();
        let in_remove_set =
            |slot: u32| removals.binary_search_by_key(&slot, |p| p.slot).is_ok();

        let mut donor = count;
        for pending in removals {
            self.entity_to_slot.remove(&pending.entity);
            removed.push(pending.entity);

            let slot = pending.slot as usize;
            if slot >= new_count {
                // Trimmed with the tail, no donor needed.
                continue;
            }
            donor -= 1;
            while in_remove_set(donor as u32) {
                donor -= 1;
            }
            debug_assert!(donor >= new_count);
            chunk.copy_row(&self.table, slot as u32, donor as u32);
            let moved = chunk.entity_at(donor as u32);
            chunk.set_entity_at(slot as u32, moved);
            self.entity_to_slot.insert(
                moved,
                EntityLocation {
                    chunk: chunk_idx as u32,
                    slot: slot as u32,
                },
            );
        }
        chunk.truncate_rows(new_count as u32);
    }

    /// Pull head rows from later chunks into earlier partial ones until
    /// every chunk but the last non-empty one is full again
    fn merge_partial_chunks(&mut self) {
        let capacity = self.table.capacity();
        let mut dst = 0;
        while dst + 1 < self.chunks.len() {
            if self.chunks[dst].count() == capacity {
                dst += 1;
                continue;
            }
            let Some(src) = (dst + 1..self.chunks.len()).find(|&i| self.chunks[i].count() > 0)
            else {
                break;
            };

            let (head, tail) = self.chunks.split_at_mut(src);
            let dst_chunk = &mut head[dst];
            let src_chunk = &mut tail[0];
            let moving = (capacity - dst_chunk.count()).min(src_chunk.count());
            for row in 0..moving {
                let entity = src_chunk.entity_at(row);
                let slot = dst_chunk.push_row(entity);
                dst_chunk.copy_row_from(&self.table, slot, src_chunk, row);
                self.entity_to_slot.insert(
                    entity,
                    EntityLocation {
                        chunk: dst as u32,
                        slot,
                    },
                );
            }
            src_chunk.shift_rows_down(&self.table, moving);
            for row in 0..src_chunk.count() {
                self.entity_to_slot.insert(
                    src_chunk.entity_at(row),
                    EntityLocation {
                        chunk: src as u32,
                        slot: row,
                    },
                );
            }
        }
    }

    /// Free trailing empty chunks; the root chunk always stays
    fn release_empty_tail(&mut self) {
        while self.chunks.len() > 1 && self.chunks.last().is_some_and(|c| c.count() == 0) {
            self.chunks.pop();
        }
    }

    /// Queue an event; ownership transfers to the pool
    pub(crate) fn push_event(&mut self, entity: EntityId, event: BoxedEvent) {
        self.events.entry(entity).or_default().push(event);
    }

    /// Drain every queue, delivering to entities that are still live
    ///
    /// FIFO per entity; every event is destroyed after this call whether
    /// or not it was delivered.
    pub(crate) fn run_events(&mut self) {
        if self.events.is_empty() {
            return;
        }
        let queues = std::mem::take(&mut self.events);
        for (entity, queue) in queues {
            let location = self.entity_to_slot.get(&entity).copied();
            for mut event in queue {
                let Some(location) = location else {
                    continue; // dropped undelivered
                };
                let chunk = &self.chunks[location.chunk as usize];
                let required: SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]> =
                    SmallVec::from_slice(event.required_components());
                let mut fields: SmallVec<[(ComponentId, *mut u8); MAX_BUNDLE_COMPONENTS]> =
                    SmallVec::new();
                let mut resolved = true;
                for &id in &required {
                    match self.table.column_index(id) {
                        Some(column) => fields.push((
                            id,
                            chunk.field_ptr(&self.table, column, location.slot),
                        )),
                        None => {
                            resolved = false;
                            break;
                        }
                    }
                }
                debug_assert!(
                    resolved,
                    "event requires a component outside the archetype"
                );
                if resolved {
                    let mut view = EntityView::new(fields);
                    event.execute(&mut view);
                }
            }
        }
    }

    /// Column base pointers for one chunk, in the caller's required order
    ///
    /// None if the chunk is empty or a required component is missing.
    pub(crate) fn chunk_view(
        &mut self,
        chunk_idx: usize,
        required: &[ComponentId],
    ) -> Option<ChunkView<'_>> {
        let chunk = self.chunks.get(chunk_idx)?;
        if chunk.count() == 0 {
            return None;
        }
        let mut columns: SmallVec<[(ComponentId, *mut u8); MAX_BUNDLE_COMPONENTS]> =
            SmallVec::new();
        for &id in required {
            let column = self.table.column_index(id)?;
            columns.push((id, chunk.column_ptr(&self.table, column)));
        }
        Some(ChunkView::new(chunk.count(), columns))
    }
}

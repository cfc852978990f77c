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

//! Fixed-size SoA chunks and the erased column layout shared by a pool.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::component::{ComponentId, ComponentInfo, MAX_BUNDLE_COMPONENTS};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::utils::align_to;

/// Chunk size in bytes; half of a typical 32 KiB L1 data cache
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Alignment of chunk allocations
pub const CACHE_LINE_SIZE: usize = 64;

/// Archetypes that fit 50 or fewer rows per chunk are rejected
pub const MIN_ELEMENTS_PER_CHUNK: u32 = 51;

/// Bytes reserved for the block header (next pointer + live count)
const CHUNK_HEADER_BYTES: usize =
    std::mem::size_of::<*const u8>() + std::mem::size_of::<u32>();

/// One column's placement inside a chunk
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub id: ComponentId,
    pub offset: usize,
    pub size: usize,
}

/// Erased SoA layout for one archetype, shared by all of its chunks
///
/// Column access is `base + offset + slot * size`; the table is computed
/// once at pool registration.
#[derive(Debug, Clone)]
pub struct ColumnTable {
    columns: SmallVec<[ColumnLayout; MAX_BUNDLE_COMPONENTS]>,
    capacity: u32,
    entity_size: usize,
}

impl ColumnTable {
    /// Compute the layout, rejecting archetypes too large for a chunk
    pub fn new(infos: &[ComponentInfo]) -> Result<Self> {
        // Zero-sized tuples would divide by zero; one byte per row is the floor.
        let entity_size = infos.iter().map(|info| info.size).sum::<usize>().max(1);
        let mut capacity = ((CHUNK_SIZE - CHUNK_HEADER_BYTES) / entity_size) as u32;
        // Alignment padding can push the placed layout past the block.
        while capacity >= MIN_ELEMENTS_PER_CHUNK {
            let (columns, total) = Self::place_columns(infos, capacity);
            if total <= CHUNK_SIZE {
                return Ok(Self {
                    columns,
                    capacity,
                    entity_size,
                });
            }
            capacity -= 1;
        }
        Err(EcsError::ArchetypeTooLarge {
            entity_size,
            capacity,
        })
    }

    fn place_columns(
        infos: &[ComponentInfo],
        capacity: u32,
    ) -> (SmallVec<[ColumnLayout; MAX_BUNDLE_COMPONENTS]>, usize) {
        let mut columns = SmallVec::new();
        let mut offset = 0usize;
        for info in infos {
            offset = align_to(offset, info.align.max(1));
            columns.push(ColumnLayout {
                id: info.id,
                offset,
                size: info.size,
            });
            offset += info.size * capacity as usize;
        }
        (columns, offset)
    }

    /// Rows per chunk for this archetype
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn entity_size(&self) -> usize {
        self.entity_size
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> &ColumnLayout {
        &self.columns[index]
    }

    pub fn columns(&self) -> &[ColumnLayout] {
        &self.columns
    }

    /// Column index for a component id; tables are tiny, a scan wins
    pub fn column_index(&self, id: ComponentId) -> Option<usize> {
        self.columns.iter().position(|column| column.id == id)
    }
}

fn block_layout() -> Layout {
    // CHUNK_SIZE and CACHE_LINE_SIZE are valid layout arguments.
    Layout::from_size_align(CHUNK_SIZE, CACHE_LINE_SIZE).unwrap()
}

/// A fixed, cache-line-aligned block holding one archetype's columns in
/// SoA form
///
/// Live rows occupy slots `[0, count)`; storage above `count` is
/// uninitialised. The slot-to-entity reverse map travels with the block.
pub struct Chunk {
    data: NonNull<u8>,
    count: u32,
    entities: Vec<EntityId>,
}

// Column data is plain bytes owned exclusively by the chunk.
unsafe impl Send for Chunk {}
unsafe impl Sync for Chunk {}

impl Chunk {
    pub(crate) fn new(table: &ColumnTable) -> Self {
        let layout = block_layout();
        let raw = unsafe { alloc(layout) };
        let Some(data) = NonNull::new(raw) else {
            handle_alloc_error(layout)
        };
        Self {
            data,
            count: 0,
            entities: Vec::with_capacity(table.capacity() as usize),
        }
    }

    /// Live row count
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_full(&self, table: &ColumnTable) -> bool {
        self.count >= table.capacity()
    }

    /// Entity occupying `slot`; defined for `slot < count`
    pub fn entity_at(&self, slot: u32) -> EntityId {
        self.entities[slot as usize]
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Base pointer of a column; the live prefix holds `count` values
    pub fn column_ptr(&self, table: &ColumnTable, column: usize) -> *mut u8 {
        let layout = table.column(column);
        unsafe { self.data.as_ptr().add(layout.offset) }
    }

    /// Pointer to one field of one row
    pub fn field_ptr(&self, table: &ColumnTable, column: usize, slot: u32) -> *mut u8 {
        let layout = table.column(column);
        debug_assert!(slot < table.capacity());
        unsafe {
            self.data
                .as_ptr()
                .add(layout.offset + layout.size * slot as usize)
        }
    }

    pub(crate) fn push_row(&mut self, entity: EntityId) -> u32 {
        let slot = self.count;
        self.entities.push(entity);
        self.count += 1;
        slot
    }

    pub(crate) fn set_entity_at(&mut self, slot: u32, entity: EntityId) {
        self.entities[slot as usize] = entity;
    }

    pub(crate) fn truncate_rows(&mut self, new_count: u32) {
        debug_assert!(new_count <= self.count);
        self.entities.truncate(new_count as usize);
        self.count = new_count;
    }

    /// Per-column byte copy of one row onto another within this chunk
    ///
    /// Defined for distinct live slots; the reverse map is left to the
    /// caller.
    pub(crate) fn copy_row(&mut self, table: &ColumnTable, dst: u32, src: u32) {
        debug_assert_ne!(dst, src);
        debug_assert!(dst < self.count && src < self.count);
        for column in 0..table.column_count() {
            let size = table.column(column).size;
            if size == 0 {
                continue;
            }
            let src_ptr = self.field_ptr(table, column, src);
            let dst_ptr = self.field_ptr(table, column, dst);
            unsafe { std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, size) };
        }
    }

    /// Per-column byte copy of a row from another chunk of the same pool
    pub(crate) fn copy_row_from(
        &mut self,
        table: &ColumnTable,
        dst: u32,
        src_chunk: &Chunk,
        src: u32,
    ) {
        for column in 0..table.column_count() {
            let size = table.column(column).size;
            if size == 0 {
                continue;
            }
            let src_ptr = src_chunk.field_ptr(table, column, src);
            let dst_ptr = self.field_ptr(table, column, dst);
            unsafe { std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, size) };
        }
    }

    /// Drop the first `by` rows and slide the rest to the front
    pub(crate) fn shift_rows_down(&mut self, table: &ColumnTable, by: u32) {
        if by == 0 {
            return;
        }
        debug_assert!(by <= self.count);
        let remaining = self.count - by;
        if remaining > 0 {
            for column in 0..table.column_count() {
                let size = table.column(column).size;
                if size == 0 {
                    continue;
                }
                let src = self.field_ptr(table, column, by);
                let dst = self.field_ptr(table, column, 0);
                // Regions may overlap.
                unsafe { std::ptr::copy(src, dst, size * remaining as usize) };
            }
        }
        self.entities.drain(0..by as usize);
        self.count = remaining;
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        unsafe { dealloc(self.data.as_ptr(), block_layout()) };
    }
}

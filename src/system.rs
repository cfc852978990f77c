//! System trait and chunk-wise column access

use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::component::{component_id, Component, ComponentId, MAX_BUNDLE_COMPONENTS};

/// System ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub u32);

/// A callable invoked chunk-wise on every pool whose signature is a
/// superset of its required set
pub trait System: Send + Sync {
    /// Get system name
    fn name(&self) -> &'static str;

    /// Required component ids; fixed for the system's lifetime
    fn required_components(&self) -> &[ComponentId];

    /// Process one chunk's rows
    ///
    /// Column slices are contiguous, mutable and exactly `view.len()` rows
    /// long, in the order `required_components` declared them. Structural
    /// changes must be staged via `remove_entity` and applied with `flush`
    /// after the system phase.
    fn execute(&mut self, view: &mut ChunkView);
}

/// Boxed system
pub type BoxedSystem = Box<dyn System>;

/// Mutable column views for one chunk
///
/// Each column may be taken once per invocation; the stored component id
/// must match the requested type. Violations are programming faults and
/// panic.
pub struct ChunkView<'a> {
    len: u32,
    columns: SmallVec<[(ComponentId, *mut u8); MAX_BUNDLE_COMPONENTS]>,
    taken: u16,
    _marker: PhantomData<&'a mut u8>,
}

impl<'a> ChunkView<'a> {
    pub(crate) fn new(
        len: u32,
        columns: SmallVec<[(ComponentId, *mut u8); MAX_BUNDLE_COMPONENTS]>,
    ) -> Self {
        debug_assert!(columns.len() <= 16);
        Self {
            len,
            columns,
            taken: 0,
            _marker: PhantomData,
        }
    }

    /// Live row count in this chunk
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shared view of required column `index`
    pub fn column<T: Component>(&mut self, index: usize) -> &'a [T] {
        let ptr = self.take::<T>(index);
        unsafe { std::slice::from_raw_parts(ptr as *const T, self.len as usize) }
    }

    /// Mutable view of required column `index`
    pub fn column_mut<T: Component>(&mut self, index: usize) -> &'a mut [T] {
        let ptr = self.take::<T>(index);
        unsafe { std::slice::from_raw_parts_mut(ptr as *mut T, self.len as usize) }
    }

    fn take<T: Component>(&mut self, index: usize) -> *mut u8 {
        let (id, ptr) = self.columns[index];
        assert_eq!(
            id,
            component_id::<T>(),
            "column {index} does not hold {}",
            std::any::type_name::<T>()
        );
        let bit = 1u16 << index;
        assert_eq!(self.taken & bit, 0, "column {index} taken twice");
        // A duplicated id would alias another live borrow.
        for (other, &(other_id, _)) in self.columns.iter().enumerate() {
            if other != index && other_id == id {
                assert_eq!(
                    self.taken & (1u16 << other),
                    0,
                    "column {index} aliases column {other}"
                );
            }
        }
        self.taken |= bit;
        ptr
    }
}

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

//! Component identity and Bundle trait
//!
//! Components are plain data attached to entities.
//! Bundles group multiple components into an archetype tuple.

use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use smallvec::{smallvec, SmallVec};

/// Maximum number of components supported by Bundle implementations
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// Marker trait for components
///
/// Components must be trivially copyable plain values with no borrowed data;
/// removal and compaction move them by raw byte copy.
pub trait Component: Copy + Send + Sync + 'static {}

/// Automatically implement Component for all valid types
impl<T: Copy + Send + Sync + 'static> Component for T {}

/// Stable 64-bit component identifier, unique within a process run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Raw id value, as folded into signature hashes
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Component id plus the size and alignment needed for column layout
#[derive(Debug, Clone, Copy)]
pub struct ComponentInfo {
    pub id: ComponentId,
    pub size: usize,
    pub align: usize,
}

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);
static COMPONENT_IDS: Lazy<RwLock<AHashMap<TypeId, ComponentId>>> =
    Lazy::new(|| RwLock::new(AHashMap::new()));

/// Id for `T`, assigned from a process-wide counter on first use
///
/// The mapping is process-wide so that worlds sharing an id generator agree
/// on component identity.
pub fn component_id<T: Component>() -> ComponentId {
    let type_id = TypeId::of::<T>();
    if let Some(&id) = COMPONENT_IDS.read().get(&type_id) {
        return id;
    }
    let mut ids = COMPONENT_IDS.write();
    *ids.entry(type_id)
        .or_insert_with(|| ComponentId(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed)))
}

/// Full layout info for `T`
pub fn component_info<T: Component>() -> ComponentInfo {
    ComponentInfo {
        id: component_id::<T>(),
        size: std::mem::size_of::<T>(),
        align: std::mem::align_of::<T>(),
    }
}

/// Tuple of components defining an archetype
///
/// Declaration order is part of the archetype's identity and fixes the
/// column order inside a chunk.
pub trait Bundle: Send + Sync + 'static {
    /// Component ids, sizes and alignments in declared order
    fn component_infos() -> SmallVec<[ComponentInfo; MAX_BUNDLE_COMPONENTS]>
    where
        Self: Sized;

    /// Write components to raw column pointers, one per component in
    /// declared order
    ///
    /// # Safety
    /// Caller must ensure pointers are valid and properly aligned
    unsafe fn write_components(self, ptrs: &[*mut u8]);
}

// DO NOT implement Bundle for T: Component
// This conflicts with tuple implementations
// Instead, implement only for tuples

// Macro for tuple Bundle implementations
macro_rules! impl_bundle {
    ($($T:ident),*) => {
        impl<$($T: Component),*> Bundle for ($($T,)*) {
            fn component_infos() -> SmallVec<[ComponentInfo; MAX_BUNDLE_COMPONENTS]> {
                smallvec![$(component_info::<$T>()),*]
            }

            #[allow(non_snake_case)]
            unsafe fn write_components(self, ptrs: &[*mut u8]) {
                let ($($T,)*) = self;
                let mut i = 0;
                $(
                    std::ptr::write(ptrs[i] as *mut $T, $T);
                    i += 1;
                )*
                let _ = i; // Suppress unused warning
            }
        }
    };
}

// Implement for tuples of 1-8 components
impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

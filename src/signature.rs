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

//! Archetype signatures
//!
//! A signature is the ordered component-id list of an archetype plus a
//! 64-bit fold hash. Pools are distinct iff their hashes differ.

use smallvec::SmallVec;

use crate::component::{ComponentId, ComponentInfo, MAX_BUNDLE_COMPONENTS};

const K_MUL: u64 = 0x9ddfea08eb382d69;

/// Fold one value into a running signature hash
pub fn hash_combine(seed: u64, value: u64) -> u64 {
    let mut a = (value ^ seed).wrapping_mul(K_MUL);
    a ^= a >> 47;
    let mut b = (seed ^ a).wrapping_mul(K_MUL);
    b ^= b >> 47;
    b.wrapping_mul(K_MUL)
}

/// Canonical archetype signature
///
/// Declared order is part of the pool's identity and determines column
/// order inside a chunk; ids are never sorted.
#[derive(Debug, Clone)]
pub struct Signature {
    ids: SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>,
    hash: u64,
}

impl Signature {
    pub fn from_ids(ids: &[ComponentId]) -> Self {
        let mut hash = 0u64;
        for id in ids {
            hash = hash_combine(hash, id.raw());
        }
        Self {
            ids: SmallVec::from_slice(ids),
            hash,
        }
    }

    pub fn from_infos(infos: &[ComponentInfo]) -> Self {
        let ids: SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]> =
            infos.iter().map(|info| info.id).collect();
        Self::from_ids(&ids)
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn ids(&self) -> &[ComponentId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.ids.contains(&id)
    }

    /// Superset check used by system and event matching
    pub fn contains_all(&self, required: &[ComponentId]) -> bool {
        required.iter().all(|id| self.contains(*id))
    }

    /// Column index of `id` in declared order
    pub fn position(&self, id: ComponentId) -> Option<usize> {
        self.ids.iter().position(|&existing| existing == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::component_id;

    #[derive(Debug, Clone, Copy)]
    struct Position {
        _x: f32,
    }

    #[derive(Debug, Clone, Copy)]
    struct Rotation {
        _x: f32,
    }

    #[test]
    fn test_hash_is_deterministic() {
        let ids = [component_id::<Position>(), component_id::<Rotation>()];
        assert_eq!(
            Signature::from_ids(&ids).hash(),
            Signature::from_ids(&ids).hash()
        );
    }

    #[test]
    fn test_declared_order_is_identity() {
        let forward = [component_id::<Position>(), component_id::<Rotation>()];
        let backward = [component_id::<Rotation>(), component_id::<Position>()];
        assert_ne!(
            Signature::from_ids(&forward).hash(),
            Signature::from_ids(&backward).hash()
        );
    }

    #[test]
    fn test_contains_all() {
        let signature =
            Signature::from_ids(&[component_id::<Position>(), component_id::<Rotation>()]);
        assert!(signature.contains_all(&[component_id::<Position>()]));
        assert!(signature.contains_all(&[component_id::<Rotation>(), component_id::<Position>()]));

        #[derive(Debug, Clone, Copy)]
        struct Weapon {
            _range: f32,
        }
        assert!(!signature.contains_all(&[component_id::<Weapon>()]));
    }

    #[test]
    fn test_fold_matches_reference_mix() {
        // Spot-check one fold step against the closed form.
        let seed = 0u64;
        let value = 7u64;
        let mut a = (value ^ seed).wrapping_mul(K_MUL);
        a ^= a >> 47;
        let mut b = (seed ^ a).wrapping_mul(K_MUL);
        b ^= b >> 47;
        assert_eq!(hash_combine(seed, value), b.wrapping_mul(K_MUL));
    }
}

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

//! Error types

use std::fmt;

/// ECS error type
///
/// Unknown entities and missing components surface as `None`/`false` at
/// the world boundary, not as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// No pool registered for the requested signature
    PoolNotFound,

    /// Component tuple too large to fit enough rows into one chunk
    ArchetypeTooLarge { entity_size: usize, capacity: u32 },
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::PoolNotFound => write!(f, "No pool registered for signature"),
            EcsError::ArchetypeTooLarge {
                entity_size,
                capacity,
            } => {
                write!(
                    f,
                    "Archetype too large: {entity_size} bytes per entity yields {capacity} rows per chunk (minimum 51)"
                )
            }
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;

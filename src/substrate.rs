// Copyright 2025 Verchain Contributors
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

//! Key-Value Substrate
//!
//! The engine stores all state through a durable string-key to byte-value
//! mapping scoped to a single object. The substrate carries no versioning
//! logic of its own; hosts provide their own implementation, and
//! [`MemorySubstrate`] is the in-process one used for lightweight hosting
//! and tests.

use dashmap::DashMap;
use std::path::Path;
use thiserror::Error;

/// Substrate failures, propagated unchanged through the layers above.
#[derive(Debug, Error)]
pub enum SubstrateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Durable key-value mapping scoped to one versioned object.
pub trait Substrate {
    /// Fetch the value under `key`, or `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SubstrateError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), SubstrateError>;

    /// Whether `key` currently holds a value.
    fn exists(&self, key: &str) -> Result<bool, SubstrateError>;
}

/// In-memory substrate with optional file snapshots.
#[derive(Debug, Default)]
pub struct MemorySubstrate {
    entries: DashMap<String, Vec<u8>>,
}

impl MemorySubstrate {
    /// Create an empty substrate.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total stored value bytes across all keys.
    pub fn total_value_bytes(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    /// Write a snapshot of every key to `path`.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SubstrateError> {
        let entries: Vec<(String, Vec<u8>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let data = bincode::serialize(&entries)
            .map_err(|e| SubstrateError::Serialization(e.to_string()))?;

        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load a snapshot previously written by [`save_to_file`].
    ///
    /// [`save_to_file`]: MemorySubstrate::save_to_file
    pub fn load_from_file(path: &Path) -> Result<Self, SubstrateError> {
        let data = std::fs::read(path)?;
        let entries: Vec<(String, Vec<u8>)> = bincode::deserialize(&data)
            .map_err(|e| SubstrateError::Serialization(e.to_string()))?;

        let substrate = Self::new();
        for (key, value) in entries {
            substrate.entries.insert(key, value);
        }
        Ok(substrate)
    }
}

impl Substrate for MemorySubstrate {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SubstrateError> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SubstrateError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, SubstrateError> {
        Ok(self.entries.contains_key(key))
    }
}

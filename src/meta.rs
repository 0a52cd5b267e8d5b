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

//! Metadata Store Accessor
//!
//! Typed access to the engine's control keys on the substrate:
//!
//! | key        | value                                    |
//! |------------|------------------------------------------|
//! | `VER`      | decimal text of the current version id   |
//! | `VER:<i>`  | encoded [`VersionRecord`] for version `i`|
//! | `DIRT_NUM` | decimal text of the dirty-version count  |
//!
//! This layer adds no retries and no rollback; substrate failures propagate
//! unchanged, and a key that is required but missing is its own error.

use crate::record::{DecodeError, VersionRecord};
use crate::substrate::{Substrate, SubstrateError};
use thiserror::Error;

const KEY_VERSION: &str = "VER";
const KEY_DIRTY: &str = "DIRT_NUM";

/// Metadata access failures.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("substrate error: {0}")]
    Substrate(#[from] SubstrateError),

    #[error("record decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("required key {0:?} is missing")]
    MissingKey(String),

    #[error("key {key:?} holds an invalid counter: {value:?}")]
    InvalidCounter { key: String, value: String },
}

/// Accessor over one object's control keys.
#[derive(Debug)]
pub struct MetaStore<S: Substrate> {
    substrate: S,
}

impl<S: Substrate> MetaStore<S> {
    pub fn new(substrate: S) -> Self {
        Self { substrate }
    }

    /// The wrapped substrate.
    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    /// Whether this object has ever been written.
    pub fn initialized(&self) -> Result<bool, MetaError> {
        Ok(self.substrate.exists(KEY_VERSION)?)
    }

    /// The most recently written version id, or `None` before the first
    /// write.
    pub fn current_version(&self) -> Result<Option<u64>, MetaError> {
        match self.substrate.get(KEY_VERSION)? {
            Some(raw) => Ok(Some(parse_counter(KEY_VERSION, &raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_current_version(&self, version: u64) -> Result<(), MetaError> {
        self.substrate
            .set(KEY_VERSION, version.to_string().as_bytes())?;
        Ok(())
    }

    /// Versions written since the last batch compaction. Only maintained
    /// under the batched policy; required to exist once that policy has
    /// performed its first write.
    pub fn dirty_count(&self) -> Result<u64, MetaError> {
        let raw = self
            .substrate
            .get(KEY_DIRTY)?
            .ok_or_else(|| MetaError::MissingKey(KEY_DIRTY.to_string()))?;
        parse_counter(KEY_DIRTY, &raw)
    }

    pub fn set_dirty_count(&self, count: u64) -> Result<(), MetaError> {
        self.substrate
            .set(KEY_DIRTY, count.to_string().as_bytes())?;
        Ok(())
    }

    /// Fetch and decode the record for `version`, or `None` if absent.
    pub fn record(&self, version: u64) -> Result<Option<VersionRecord>, MetaError> {
        match self.substrate.get(&record_key(version))? {
            Some(raw) => Ok(Some(VersionRecord::decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_record(&self, version: u64, record: &VersionRecord) -> Result<(), MetaError> {
        self.substrate.set(&record_key(version), &record.encode())?;
        Ok(())
    }
}

fn record_key(version: u64) -> String {
    format!("VER:{}", version)
}

fn parse_counter(key: &str, raw: &[u8]) -> Result<u64, MetaError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| MetaError::InvalidCounter {
            key: key.to_string(),
            value: String::from_utf8_lossy(raw).into_owned(),
        })
}

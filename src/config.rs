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

//! Engine configuration
//!
//! One engine, three re-encoding strategies selected at write time.

use serde::{Deserialize, Serialize};

/// How superseded versions are re-encoded as deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompactionPolicy {
    /// Re-encode each superseded version against its successor at write
    /// time, whenever the delta is smaller than the full payload.
    ImmediateDelta,
    /// Immediate-delta, but refuse a delta once it would extend a
    /// consecutive-delta run past `max_chain_len`, bounding worst-case
    /// read cost.
    CappedChain,
    /// Defer re-encoding; every `max_dirty` writes, re-encode the dirty
    /// window with a minimum-spanning-tree delta plan.
    BatchedMst,
}

/// Configuration for a [`VersionEngine`].
///
/// [`VersionEngine`]: crate::engine::VersionEngine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Re-encoding strategy.
    pub policy: CompactionPolicy,
    /// Batch window size under [`CompactionPolicy::BatchedMst`]; also the
    /// compaction trigger threshold.
    pub max_dirty: usize,
    /// Maximum consecutive-delta run under [`CompactionPolicy::CappedChain`].
    pub max_chain_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: CompactionPolicy::BatchedMst,
            max_dirty: 8,
            max_chain_len: 4,
        }
    }
}

impl EngineConfig {
    /// Immediate-delta re-encoding on every write.
    pub fn immediate_delta() -> Self {
        Self {
            policy: CompactionPolicy::ImmediateDelta,
            ..Default::default()
        }
    }

    /// Immediate-delta with a bounded chain length.
    pub fn capped_chain(max_chain_len: usize) -> Self {
        Self {
            policy: CompactionPolicy::CappedChain,
            max_chain_len,
            ..Default::default()
        }
    }

    /// Batched MST compaction with the given window size.
    pub fn batched_mst(max_dirty: usize) -> Self {
        Self {
            policy: CompactionPolicy::BatchedMst,
            max_dirty,
            ..Default::default()
        }
    }
}

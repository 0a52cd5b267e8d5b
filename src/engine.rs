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

//! Version Engine
//!
//! The high-level facade over one versioned object: appends new versions,
//! reconstructs any historical version by folding its delta chain, lists the
//! version range, and re-encodes superseded versions according to the
//! configured [`CompactionPolicy`].
//!
//! Execution is synchronous request/response against the substrate. The host
//! guarantees at most one in-flight write per object; multi-key updates are
//! not transactional, and a write aborted mid-way leaves a readable,
//! chain-correct but suboptimally encoded state.

use crate::compactor::{plan_window, PlannedEncoding};
use crate::config::{CompactionPolicy, EngineConfig};
use crate::meta::{MetaError, MetaStore};
use crate::patch::{diff, PatchError, PatchScript};
use crate::record::{RecordKind, VersionRecord};
use crate::substrate::Substrate;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Engine operation failures. Every error aborts the operation with no
/// partial output.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown version {0}")]
    UnknownVersion(u64),

    #[error("object has never been written")]
    NoSuchObject,

    #[error("invalid version id argument {0:?}")]
    InvalidVersionId(String),

    #[error("delta chain from version {start} is corrupt: {reason}")]
    CorruptChain { start: u64, reason: String },

    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("metadata error: {0}")]
    Meta(#[from] MetaError),
}

/// Versioned storage engine for a single object.
pub struct VersionEngine<S: Substrate> {
    meta: MetaStore<S>,
    config: EngineConfig,
}

impl<S: Substrate> VersionEngine<S> {
    /// Create an engine over `substrate` with the given configuration.
    pub fn new(substrate: S, config: EngineConfig) -> Self {
        Self {
            meta: MetaStore::new(substrate),
            config,
        }
    }

    /// Create an engine with the default configuration.
    pub fn with_defaults(substrate: S) -> Self {
        Self::new(substrate, EngineConfig::default())
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying substrate.
    pub fn substrate(&self) -> &S {
        self.meta.substrate()
    }

    /// The most recently written version id, or `None` before the first
    /// write.
    pub fn current_version(&self) -> Result<Option<u64>, EngineError> {
        Ok(self.meta.current_version()?)
    }

    /// The stored record for `version`, or `None` if absent. Exposes how a
    /// version is currently encoded without reconstructing it.
    pub fn record(&self, version: u64) -> Result<Option<VersionRecord>, EngineError> {
        Ok(self.meta.record(version)?)
    }

    // === Write ingestion ===

    /// Append `content` as a new version, returning its id.
    ///
    /// The new version is always stored full; depending on policy, the
    /// version it supersedes may be re-encoded as a delta against it, or
    /// dirty accounting may trigger a batch compaction of the recent window.
    pub fn put(&self, content: &[u8]) -> Result<u64, EngineError> {
        let prev = match self.meta.current_version()? {
            Some(prev) => prev,
            None => {
                self.meta.set_record(0, &VersionRecord::full(content.to_vec()))?;
                self.meta.set_current_version(0)?;
                if self.config.policy == CompactionPolicy::BatchedMst {
                    self.meta.set_dirty_count(0)?;
                }
                debug!(version = 0, bytes = content.len(), "stored initial version");
                return Ok(0);
            }
        };

        match self.config.policy {
            CompactionPolicy::ImmediateDelta => {
                self.reencode_superseded(prev, content, None)?;
            }
            CompactionPolicy::CappedChain => {
                self.reencode_superseded(prev, content, Some(self.config.max_chain_len))?;
            }
            CompactionPolicy::BatchedMst => {
                self.account_dirty(prev)?;
            }
        }

        let next = prev + 1;
        self.meta.set_record(next, &VersionRecord::full(content.to_vec()))?;
        self.meta.set_current_version(next)?;
        debug!(version = next, bytes = content.len(), "stored version");
        Ok(next)
    }

    /// Re-encode the superseded version `prev` as a delta against the
    /// version about to be written (`prev + 1`), when the delta is strictly
    /// smaller than the full payload and the optional chain cap allows it.
    fn reencode_superseded(
        &self,
        prev: u64,
        new_content: &[u8],
        chain_cap: Option<usize>,
    ) -> Result<(), EngineError> {
        if prev == 0 {
            // Version 0 stays a full anchor under every policy.
            return Ok(());
        }

        if let Some(max_run) = chain_cap {
            let run = self.delta_run_below(prev)?;
            if run + 1 > max_run {
                debug!(version = prev, run, max_run, "chain cap reached, keeping full");
                return Ok(());
            }
        }

        let prev_content = self.reconstruct(prev)?;
        let patch = diff(new_content, &prev_content).to_bytes()?;
        if patch.len() < prev_content.len() {
            self.meta
                .set_record(prev, &VersionRecord::delta(prev + 1, patch))?;
            debug!(version = prev, base = prev + 1, "re-encoded superseded version as delta");
        } else {
            warn!(
                version = prev,
                patch_len = patch.len(),
                full_len = prev_content.len(),
                "delta not smaller than full payload, keeping full"
            );
        }
        Ok(())
    }

    /// Number of consecutive delta records immediately below `version`.
    fn delta_run_below(&self, version: u64) -> Result<usize, EngineError> {
        let mut run = 0;
        let mut id = version;
        while id > 0 {
            id -= 1;
            match self.meta.record(id)? {
                Some(rec) if !rec.is_full() => run += 1,
                _ => break,
            }
        }
        Ok(run)
    }

    /// Bump the dirty counter; on reaching the window size, compact the
    /// window ending at `prev` and reset the counter.
    fn account_dirty(&self, prev: u64) -> Result<(), EngineError> {
        let dirty = self.meta.dirty_count()? + 1;
        let window = self.config.max_dirty as u64;

        if dirty < window {
            self.meta.set_dirty_count(dirty)?;
            return Ok(());
        }

        let start = (prev + 1).saturating_sub(window);
        let k = (prev + 1 - start) as usize;
        self.compact_window(start, k)?;
        self.meta.set_dirty_count(0)?;
        Ok(())
    }

    /// Re-encode the `k` versions starting at `start` with an MST delta
    /// plan, writing all records back as one logical batch.
    fn compact_window(&self, start: u64, k: usize) -> Result<(), EngineError> {
        let mut contents = Vec::with_capacity(k);
        for offset in 0..k as u64 {
            contents.push(self.reconstruct(start + offset)?);
        }

        let mut plan = plan_window(&contents)?;
        if start == 0 && !plan.is_empty() {
            // Version 0 stays a full anchor under every policy.
            plan[0] = PlannedEncoding::Full;
        }

        let full_bytes: usize = contents.iter().map(|c| c.len()).sum();
        let mut encoded_bytes = 0usize;

        for (offset, encoding) in plan.iter().enumerate() {
            let id = start + offset as u64;
            let record = match encoding {
                PlannedEncoding::Full => VersionRecord::full(contents[offset].clone()),
                PlannedEncoding::Delta { parent, patch } => {
                    VersionRecord::delta(start + *parent as u64, patch.clone())
                }
            };
            encoded_bytes += record.payload.len();
            self.meta.set_record(id, &record)?;
        }

        info!(
            start,
            window = k,
            full_bytes,
            encoded_bytes,
            "compacted dirty window"
        );
        Ok(())
    }

    // === Read reconstruction ===

    /// Reconstruct the content of `version`, or of the current version when
    /// omitted.
    pub fn read(&self, version: Option<u64>) -> Result<Vec<u8>, EngineError> {
        match version {
            Some(id) => self.reconstruct(id),
            None => {
                let current = self.meta.current_version()?.ok_or(EngineError::NoSuchObject)?;
                self.reconstruct(current)
            }
        }
    }

    /// Walk the delta chain from `version` to its full anchor, then fold the
    /// collected patches back in LIFO order.
    fn reconstruct(&self, version: u64) -> Result<Vec<u8>, EngineError> {
        let record = self
            .meta
            .record(version)?
            .ok_or(EngineError::UnknownVersion(version))?;

        let mut base = match record.kind {
            RecordKind::Full => return Ok(record.payload),
            RecordKind::Delta { base } => base,
        };

        // The chain cannot be longer than the number of versions ever
        // written; anything beyond that is a corrupted store.
        let limit = self.meta.current_version()?.map_or(1, |c| c + 1);
        let mut patches = vec![record.payload];

        let mut content = loop {
            if patches.len() as u64 > limit {
                return Err(EngineError::CorruptChain {
                    start: version,
                    reason: format!("no full anchor within {} records", limit),
                });
            }

            let rec = self
                .meta
                .record(base)?
                .ok_or_else(|| EngineError::CorruptChain {
                    start: version,
                    reason: format!("dangling base pointer to version {}", base),
                })?;

            match rec.kind {
                RecordKind::Full => break rec.payload,
                RecordKind::Delta { base: next } => {
                    patches.push(rec.payload);
                    base = next;
                }
            }
        };

        trace!(version, depth = patches.len(), "folding delta chain");
        while let Some(raw) = patches.pop() {
            let patch = PatchScript::from_bytes(&raw)?;
            content = patch.apply(&content)?;
        }
        Ok(content)
    }

    // === Operation surface ===

    /// `get` operation: `version_id` is decimal text; empty means the
    /// current version.
    pub fn get(&self, version_id: &[u8]) -> Result<Vec<u8>, EngineError> {
        if version_id.is_empty() {
            return self.read(None);
        }

        let id = std::str::from_utf8(version_id)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| {
                EngineError::InvalidVersionId(String::from_utf8_lossy(version_id).into_owned())
            })?;
        self.read(Some(id))
    }

    /// All version ids in ascending order.
    pub fn list_versions(&self) -> Result<Vec<u64>, EngineError> {
        let current = self.meta.current_version()?.ok_or(EngineError::NoSuchObject)?;
        Ok((0..=current).collect())
    }

    /// `lsver` operation: newline-terminated decimal ids, ascending.
    pub fn lsver(&self) -> Result<String, EngineError> {
        let current = self.meta.current_version()?.ok_or(EngineError::NoSuchObject)?;
        let mut out = String::new();
        for id in 0..=current {
            out.push_str(&id.to_string());
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::MemorySubstrate;

    fn engine(config: EngineConfig) -> VersionEngine<MemorySubstrate> {
        VersionEngine::new(MemorySubstrate::new(), config)
    }

    #[test]
    fn test_first_write_initializes() {
        let eng = engine(EngineConfig::batched_mst(3));
        assert_eq!(eng.put(b"hello").unwrap(), 0);
        assert_eq!(eng.current_version().unwrap(), Some(0));

        let rec = eng.record(0).unwrap().unwrap();
        assert!(rec.is_full());
        assert_eq!(rec.payload, b"hello");
    }

    #[test]
    fn test_current_and_historical_reads() {
        let eng = engine(EngineConfig::immediate_delta());
        eng.put(b"hello").unwrap();
        eng.put(b"hello world").unwrap();

        assert_eq!(eng.get(b"").unwrap(), b"hello world");
        assert_eq!(eng.get(b"0").unwrap(), b"hello");
        assert_eq!(eng.get(b"1").unwrap(), b"hello world");
    }

    #[test]
    fn test_immediate_delta_reencodes_superseded() {
        let eng = engine(EngineConfig::immediate_delta());
        let base = "a line of text that repeats; ".repeat(10);
        eng.put(base.as_bytes()).unwrap();
        eng.put(format!("{}v1", base).as_bytes()).unwrap();
        eng.put(format!("{}v2", base).as_bytes()).unwrap();

        // Version 0 stays full; version 1 was superseded and should now be
        // a delta pointing forward at version 2.
        assert!(eng.record(0).unwrap().unwrap().is_full());
        let rec1 = eng.record(1).unwrap().unwrap();
        assert_eq!(rec1.kind, RecordKind::Delta { base: 2 });
        assert!(eng.record(2).unwrap().unwrap().is_full());

        assert_eq!(eng.get(b"1").unwrap(), format!("{}v1", base).as_bytes());
    }

    #[test]
    fn test_small_content_stays_full() {
        // Deltas between tiny unrelated contents are larger than the
        // contents themselves; the size comparison must keep them full.
        let eng = engine(EngineConfig::immediate_delta());
        eng.put(b"aaaa").unwrap();
        eng.put(b"bbbb").unwrap();
        eng.put(b"cccc").unwrap();

        assert!(eng.record(1).unwrap().unwrap().is_full());
        assert_eq!(eng.get(b"1").unwrap(), b"bbbb");
    }

    #[test]
    fn test_capped_chain_bounds_delta_run() {
        let eng = engine(EngineConfig::capped_chain(2));
        let base = "shared prefix shared prefix shared prefix ".repeat(5);
        for i in 0..6 {
            eng.put(format!("{}rev{}", base, i).as_bytes()).unwrap();
        }

        // No run of consecutive deltas may exceed the cap.
        let mut run = 0;
        let mut longest = 0;
        for id in 0..=5 {
            if eng.record(id).unwrap().unwrap().is_full() {
                run = 0;
            } else {
                run += 1;
                longest = longest.max(run);
            }
        }
        assert!(longest <= 2, "delta run of {} exceeds cap", longest);

        for i in 0..6u64 {
            assert_eq!(
                eng.read(Some(i)).unwrap(),
                format!("{}rev{}", base, i).as_bytes()
            );
        }
    }

    #[test]
    fn test_batched_compaction_trigger_and_reset() {
        let eng = engine(EngineConfig::batched_mst(3));
        let body = "the same long body of content in every version ".repeat(4);

        eng.put(format!("{}r0", body).as_bytes()).unwrap();
        eng.put(format!("{}r1", body).as_bytes()).unwrap();
        eng.put(format!("{}r2", body).as_bytes()).unwrap();

        // No compaction yet: all three records still full.
        for id in 0..=2 {
            assert!(eng.record(id).unwrap().unwrap().is_full());
        }

        // Fourth write reaches the threshold and compacts versions 0..=2.
        eng.put(format!("{}r3", body).as_bytes()).unwrap();
        let deltas = (0..=2)
            .filter(|&id| !eng.record(id).unwrap().unwrap().is_full())
            .count();
        assert!(deltas > 0, "window of similar contents produced no deltas");
        assert!(eng.record(0).unwrap().unwrap().is_full());
        assert!(eng.record(3).unwrap().unwrap().is_full());

        for i in 0..=3u64 {
            assert_eq!(
                eng.read(Some(i)).unwrap(),
                format!("{}r{}", body, i).as_bytes()
            );
        }
    }

    #[test]
    fn test_unknown_version() {
        let eng = engine(EngineConfig::immediate_delta());
        eng.put(b"a").unwrap();
        eng.put(b"b").unwrap();
        eng.put(b"c").unwrap();

        assert!(matches!(
            eng.get(b"99"),
            Err(EngineError::UnknownVersion(99))
        ));
    }

    #[test]
    fn test_invalid_version_id_argument() {
        let eng = engine(EngineConfig::immediate_delta());
        eng.put(b"a").unwrap();

        assert!(matches!(
            eng.get(b"not-a-number"),
            Err(EngineError::InvalidVersionId(_))
        ));
        assert!(matches!(
            eng.get(&[0xFF, 0xFE]),
            Err(EngineError::InvalidVersionId(_))
        ));
    }

    #[test]
    fn test_never_written_object() {
        let eng = engine(EngineConfig::immediate_delta());
        assert!(matches!(eng.lsver(), Err(EngineError::NoSuchObject)));
        assert!(matches!(eng.read(None), Err(EngineError::NoSuchObject)));
        assert!(matches!(
            eng.read(Some(0)),
            Err(EngineError::UnknownVersion(0))
        ));
    }

    #[test]
    fn test_lsver_format() {
        let eng = engine(EngineConfig::immediate_delta());
        eng.put(b"a").unwrap();
        eng.put(b"b").unwrap();
        eng.put(b"c").unwrap();

        assert_eq!(eng.lsver().unwrap(), "0\n1\n2\n");
        assert_eq!(eng.list_versions().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_corrupt_chain_cycle_is_bounded() {
        let eng = engine(EngineConfig::immediate_delta());
        eng.put(b"a").unwrap();
        eng.put(b"b").unwrap();
        eng.put(b"c").unwrap();

        // Hand-craft a cycle between versions 1 and 2.
        let patch = diff(b"x", b"y").to_bytes().unwrap();
        eng.substrate()
            .set("VER:1", &VersionRecord::delta(2, patch.clone()).encode())
            .unwrap();
        eng.substrate()
            .set("VER:2", &VersionRecord::delta(1, patch).encode())
            .unwrap();

        assert!(matches!(
            eng.read(Some(1)),
            Err(EngineError::CorruptChain { .. })
        ));
    }

    #[test]
    fn test_dangling_base_is_corrupt_chain() {
        let eng = engine(EngineConfig::immediate_delta());
        eng.put(b"a").unwrap();

        let patch = diff(b"x", b"y").to_bytes().unwrap();
        eng.substrate()
            .set("VER:0", &VersionRecord::delta(7, patch).encode())
            .unwrap();

        assert!(matches!(
            eng.read(Some(0)),
            Err(EngineError::CorruptChain { .. })
        ));
    }

    #[test]
    fn test_mismatched_patch_surfaces_apply_error() {
        let eng = engine(EngineConfig::immediate_delta());
        let body = "some content long enough to delta cleanly ".repeat(5);
        eng.put(format!("{}one", body).as_bytes()).unwrap();
        eng.put(format!("{}two", body).as_bytes()).unwrap();
        eng.put(format!("{}three", body).as_bytes()).unwrap();

        // Corrupt the anchor so version 1's patch no longer applies.
        eng.substrate()
            .set("VER:2", &VersionRecord::full(b"wrong anchor".to_vec()).encode())
            .unwrap();

        assert!(matches!(
            eng.read(Some(1)),
            Err(EngineError::Patch(_))
        ));
    }
}

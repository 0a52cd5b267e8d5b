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

//! Diff/Patch Adapter
//!
//! Thin wrapper over the `similar` diff primitive, used directionally:
//! [`diff`] produces a [`PatchScript`] such that applying it to `from`
//! yields `to`. Unchanged and deleted regions are encoded as lengths only,
//! insertions carry literal bytes, so the serialized script length is
//! proportional to edit distance rather than content size.
//!
//! `diff(a, b)` and `diff(b, a)` are not guaranteed to be the same length.

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffOp};
use thiserror::Error;

/// Patch application and codec failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("malformed patch script: {0}")]
    Malformed(String),

    #[error("patch serialization failed: {0}")]
    Serialization(String),

    #[error("patch expects source of {expected} bytes, got {actual}")]
    SourceMismatch { expected: u64, actual: u64 },

    #[error("patch op reads past end of source (offset {offset}, len {len})")]
    OutOfRange { offset: u64, len: u64 },

    #[error("patch left {remaining} unconsumed source bytes")]
    UnconsumedSource { remaining: u64 },
}

/// One edit operation against the source buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum PatchOp {
    /// Copy `len` bytes from the source cursor to the output.
    Copy { len: u64 },
    /// Advance the source cursor by `len` bytes without emitting.
    Skip { len: u64 },
    /// Emit literal bytes.
    Insert { data: Vec<u8> },
}

/// An ordered edit script transforming one byte string into another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchScript {
    /// Length the source buffer must have for the ops to be meaningful.
    source_len: u64,
    ops: Vec<PatchOp>,
}

/// Compute a patch such that `patch.apply(from) == to`.
pub fn diff(from: &[u8], to: &[u8]) -> PatchScript {
    // Myers, not patience: a byte alphabet has no unique elements for
    // patience to anchor on.
    let raw = capture_diff_slices(Algorithm::Myers, from, to);

    let mut ops = Vec::with_capacity(raw.len());
    for op in raw {
        match op {
            DiffOp::Equal { len, .. } => ops.push(PatchOp::Copy { len: len as u64 }),
            DiffOp::Delete { old_len, .. } => ops.push(PatchOp::Skip {
                len: old_len as u64,
            }),
            DiffOp::Insert {
                new_index, new_len, ..
            } => ops.push(PatchOp::Insert {
                data: to[new_index..new_index + new_len].to_vec(),
            }),
            DiffOp::Replace {
                old_len,
                new_index,
                new_len,
                ..
            } => {
                ops.push(PatchOp::Skip {
                    len: old_len as u64,
                });
                ops.push(PatchOp::Insert {
                    data: to[new_index..new_index + new_len].to_vec(),
                });
            }
        }
    }

    PatchScript {
        source_len: from.len() as u64,
        ops,
    }
}

impl PatchScript {
    /// Apply this patch to `from`, producing the target byte string.
    ///
    /// Fails when `from` does not match the source the patch was computed
    /// against: wrong length, an op reading past the end, or leftover
    /// source bytes after the last op.
    pub fn apply(&self, from: &[u8]) -> Result<Vec<u8>, PatchError> {
        if from.len() as u64 != self.source_len {
            return Err(PatchError::SourceMismatch {
                expected: self.source_len,
                actual: from.len() as u64,
            });
        }

        let mut out = Vec::with_capacity(from.len());
        let mut cursor: usize = 0;

        for op in &self.ops {
            match op {
                PatchOp::Copy { len } => {
                    let len = *len as usize;
                    let end = cursor.checked_add(len).filter(|&e| e <= from.len()).ok_or(
                        PatchError::OutOfRange {
                            offset: cursor as u64,
                            len: len as u64,
                        },
                    )?;
                    out.extend_from_slice(&from[cursor..end]);
                    cursor = end;
                }
                PatchOp::Skip { len } => {
                    let len = *len as usize;
                    let end = cursor.checked_add(len).filter(|&e| e <= from.len()).ok_or(
                        PatchError::OutOfRange {
                            offset: cursor as u64,
                            len: len as u64,
                        },
                    )?;
                    cursor = end;
                }
                PatchOp::Insert { data } => out.extend_from_slice(data),
            }
        }

        if cursor != from.len() {
            return Err(PatchError::UnconsumedSource {
                remaining: (from.len() - cursor) as u64,
            });
        }

        Ok(out)
    }

    /// Serialize to the wire form stored inside delta records.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PatchError> {
        bincode::serialize(self).map_err(|e| PatchError::Serialization(e.to_string()))
    }

    /// Parse a patch from its wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PatchError> {
        bincode::deserialize(bytes).map_err(|e| PatchError::Malformed(e.to_string()))
    }
}

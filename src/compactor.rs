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

//! Batch Delta Compactor
//!
//! Given a window of consecutive version contents, chooses for each one
//! either a full encoding or a delta against one other window member,
//! minimizing total stored bytes with a minimum-spanning-tree heuristic:
//!
//! 1. Build a complete weighted graph; the weight between `i` and `j` is the
//!    serialized patch length of `diff(ci, cj)`, computed once per unordered
//!    pair and treated as symmetric even though the diff primitive is not:
//!    the tree only estimates costs, and the stored patch is recomputed
//!    directionally in step 4.
//! 2. Pick the anchor (tree root): smallest raw content length, smallest
//!    window index among ties.
//! 3. Run array-based Prim's over the graph, giving every non-anchor node a
//!    parent.
//! 4. For each parented node, compute the real directional patch from its
//!    parent's content; keep it only when strictly smaller than the node's
//!    full payload, otherwise encode full. The anchor is always full.
//!
//! `O(k^2)` diffs for the graph, `O(k^2)` for Prim's, `O(k)` directional
//! diffs; `k` is the configured window size, so cost per invocation is
//! bounded regardless of history length.

use crate::patch::{diff, PatchError};
use tracing::debug;

/// Chosen encoding for one window member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedEncoding {
    /// Store the content verbatim.
    Full,
    /// Store a patch transforming the parent member's content into this
    /// member's content. `parent` is a window index, not a version id.
    Delta { parent: usize, patch: Vec<u8> },
}

impl PlannedEncoding {
    /// Stored payload size for this choice, given the member's content.
    pub fn payload_len(&self, content: &[u8]) -> usize {
        match self {
            PlannedEncoding::Full => content.len(),
            PlannedEncoding::Delta { patch, .. } => patch.len(),
        }
    }
}

/// Compute the delta plan for a window of consecutive version contents.
///
/// The result has one entry per window member. Exactly one member — the
/// anchor — is guaranteed `Full`; every `Delta` entry's patch is strictly
/// smaller than that member's content, so the plan never stores more bytes
/// than full copies would.
pub fn plan_window(contents: &[Vec<u8>]) -> Result<Vec<PlannedEncoding>, PatchError> {
    let k = contents.len();
    if k == 0 {
        return Ok(Vec::new());
    }
    if k == 1 {
        return Ok(vec![PlannedEncoding::Full]);
    }

    // Pairwise patch lengths, mirrored across the diagonal. The diagonal
    // holds the cost of a full encoding.
    let mut weight = vec![vec![0usize; k]; k];
    for i in 0..k {
        weight[i][i] = contents[i].len();
        for j in i + 1..k {
            let w = diff(&contents[i], &contents[j]).to_bytes()?.len();
            weight[i][j] = w;
            weight[j][i] = w;
        }
    }

    let anchor = select_anchor(contents);

    // Array-based Prim's; no priority queue needed at window scale.
    let mut key = vec![usize::MAX; k];
    let mut parent: Vec<Option<usize>> = vec![None; k];
    let mut in_tree = vec![false; k];
    key[anchor] = 0;

    for _ in 0..k {
        let u = match min_key_node(&key, &in_tree) {
            Some(u) => u,
            None => break,
        };
        in_tree[u] = true;

        for v in 0..k {
            if !in_tree[v] && weight[u][v] < key[v] {
                key[v] = weight[u][v];
                parent[v] = Some(u);
            }
        }
    }

    let mut plan = Vec::with_capacity(k);
    for i in 0..k {
        match parent[i] {
            None => plan.push(PlannedEncoding::Full),
            Some(p) => {
                // The graph weight was an approximation; the stored patch is
                // the real directional one.
                let patch = diff(&contents[p], &contents[i]).to_bytes()?;
                if patch.len() < contents[i].len() {
                    plan.push(PlannedEncoding::Delta { parent: p, patch });
                } else {
                    debug!(
                        member = i,
                        patch_len = patch.len(),
                        full_len = contents[i].len(),
                        "delta larger than full payload, keeping full"
                    );
                    plan.push(PlannedEncoding::Full);
                }
            }
        }
    }

    Ok(plan)
}

/// Smallest raw content length, smallest index among ties.
fn select_anchor(contents: &[Vec<u8>]) -> usize {
    let mut anchor = 0;
    for (i, content) in contents.iter().enumerate().skip(1) {
        if content.len() < contents[anchor].len() {
            anchor = i;
        }
    }
    anchor
}

fn min_key_node(key: &[usize], in_tree: &[bool]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for v in 0..key.len() {
        if in_tree[v] || key[v] == usize::MAX {
            continue;
        }
        if best.map_or(true, |b| key[v] < key[b]) {
            best = Some(v);
        }
    }
    best
}

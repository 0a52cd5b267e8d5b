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

//! Property tests: whatever is written must read back byte-identical at
//! every version id, under every compaction policy.

use proptest::prelude::*;
use verchain::{EngineConfig, MemorySubstrate, VersionEngine};

fn write_all_then_read_all(config: EngineConfig, writes: &[Vec<u8>]) {
    let engine = VersionEngine::new(MemorySubstrate::new(), config);

    for content in writes {
        engine.put(content).unwrap();
    }

    for (id, content) in writes.iter().enumerate() {
        assert_eq!(
            engine.read(Some(id as u64)).unwrap(),
            *content,
            "version {} corrupted",
            id
        );
    }
}

/// Sequences of related contents: successive edits of a shared body, the
/// shape delta encoding is built for.
fn edit_sequences() -> impl Strategy<Value = Vec<Vec<u8>>> {
    (any::<Vec<u8>>(), prop::collection::vec(any::<Vec<u8>>(), 1..12)).prop_map(
        |(body, edits)| {
            edits
                .into_iter()
                .map(|edit| {
                    let mut content = body.clone();
                    content.extend_from_slice(&edit);
                    content
                })
                .collect()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip_immediate_delta(writes in prop::collection::vec(any::<Vec<u8>>(), 1..10)) {
        write_all_then_read_all(EngineConfig::immediate_delta(), &writes);
    }

    #[test]
    fn prop_roundtrip_capped_chain(writes in prop::collection::vec(any::<Vec<u8>>(), 1..10)) {
        write_all_then_read_all(EngineConfig::capped_chain(2), &writes);
    }

    #[test]
    fn prop_roundtrip_batched_mst(writes in prop::collection::vec(any::<Vec<u8>>(), 1..10)) {
        write_all_then_read_all(EngineConfig::batched_mst(3), &writes);
    }

    #[test]
    fn prop_roundtrip_related_edits(writes in edit_sequences()) {
        write_all_then_read_all(EngineConfig::immediate_delta(), &writes);
        write_all_then_read_all(EngineConfig::batched_mst(4), &writes);
    }
}

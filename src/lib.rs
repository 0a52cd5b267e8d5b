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

//! Verchain - Versioned Delta-Chain Object Storage
//!
//! Versioned storage for opaque binary objects: every write creates a new
//! version, old versions remain retrievable, and storage cost is kept low by
//! encoding most versions as small patches against a neighboring version.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        VersionEngine                           │
//! │   put ─► write ingestor ──► policy dispatch ─► batch compactor │
//! │   get ─► read reconstructor (chain walk + LIFO patch fold)     │
//! │   lsver ─► listing                                             │
//! ├────────────────────────────────────────────────────────────────┤
//! │  VersionRecord codec      PatchScript (similar-backed diffs)   │
//! ├────────────────────────────────────────────────────────────────┤
//! │  MetaStore  (VER / VER:<i> / DIRT_NUM key layout)              │
//! ├────────────────────────────────────────────────────────────────┤
//! │  Substrate trait  (host-provided KV; MemorySubstrate in-proc)  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Properties
//!
//! - **Always-full tip**: the newest version is stored verbatim; superseded
//!   versions are re-encoded as deltas pointing *forward* at the version
//!   that replaced them.
//! - **Anchored chains**: version 0 is always a full snapshot, and every
//!   delta chain terminates at a full anchor; reads fold patches in LIFO
//!   order, costing patch-size work per hop rather than object-size work.
//! - **Three policies, one engine**: immediate re-encoding, immediate with a
//!   bounded chain length, or deferred batch re-encoding with a
//!   minimum-spanning-tree delta plan over the dirty window.
//! - **Host-serialized writes**: one writer per object at a time; multi-key
//!   updates are not transactional, and an aborted batch leaves a readable
//!   but suboptimally encoded state.
//!
//! ## Usage
//!
//! ```rust
//! use verchain::{EngineConfig, MemorySubstrate, VersionEngine};
//!
//! let engine = VersionEngine::new(MemorySubstrate::new(), EngineConfig::immediate_delta());
//! engine.put(b"hello").unwrap();
//! engine.put(b"hello world").unwrap();
//!
//! assert_eq!(engine.get(b"").unwrap(), b"hello world");
//! assert_eq!(engine.get(b"0").unwrap(), b"hello");
//! assert_eq!(engine.lsver().unwrap(), "0\n1\n");
//! ```

pub mod compactor;
pub mod config;
pub mod engine;
pub mod meta;
pub mod patch;
pub mod record;
pub mod substrate;

pub use compactor::{plan_window, PlannedEncoding};
pub use config::{CompactionPolicy, EngineConfig};
pub use engine::{EngineError, VersionEngine};
pub use meta::{MetaError, MetaStore};
pub use patch::{diff, PatchError, PatchScript};
pub use record::{DecodeError, RecordKind, VersionRecord};
pub use substrate::{MemorySubstrate, Substrate, SubstrateError};

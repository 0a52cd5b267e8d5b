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

//! Version Record Codec
//!
//! A [`VersionRecord`] is the unit of stored history: either a full snapshot
//! of an object's content or a patch against another version. Records are
//! framed as a one-line ASCII header (`F`, or `D<base-id>`) followed by a
//! single `\n` separator and the payload verbatim.
//!
//! The payload may contain arbitrary bytes, including newlines; decoding
//! splits at the *first* separator only and never reinterprets payload bytes.

use thiserror::Error;

/// Codec failures for stored version records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record has no header separator")]
    MissingSeparator,

    #[error("record header is empty")]
    EmptyHeader,

    #[error("unknown record kind {0:?}")]
    UnknownKind(char),

    #[error("invalid delta base id {0:?}")]
    InvalidBase(String),
}

/// How a record's payload is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Payload is the raw object content.
    Full,
    /// Payload is a patch transforming the reconstructed content of `base`
    /// into this record's content. `base` may be a *newer* version id than
    /// this record's own; the base relation is a reference, not an index.
    Delta { base: u64 },
}

/// One stored historical state of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub kind: RecordKind,
    pub payload: Vec<u8>,
}

impl VersionRecord {
    /// Create a full-snapshot record.
    pub fn full(payload: Vec<u8>) -> Self {
        Self {
            kind: RecordKind::Full,
            payload,
        }
    }

    /// Create a delta record against `base`.
    pub fn delta(base: u64, payload: Vec<u8>) -> Self {
        Self {
            kind: RecordKind::Delta { base },
            payload,
        }
    }

    /// Whether this record is a full snapshot.
    pub fn is_full(&self) -> bool {
        matches!(self.kind, RecordKind::Full)
    }

    /// Serialize to the stored wire form.
    pub fn encode(&self) -> Vec<u8> {
        let header = match self.kind {
            RecordKind::Full => "F".to_string(),
            RecordKind::Delta { base } => format!("D{}", base),
        };

        let mut out = Vec::with_capacity(header.len() + 1 + self.payload.len());
        out.extend_from_slice(header.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse a record from its stored wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let sep = bytes
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(DecodeError::MissingSeparator)?;

        let header = &bytes[..sep];
        let payload = bytes[sep + 1..].to_vec();

        match header.first().copied() {
            None => Err(DecodeError::EmptyHeader),
            Some(b'F') => Ok(Self {
                kind: RecordKind::Full,
                payload,
            }),
            Some(b'D') => {
                let digits = std::str::from_utf8(&header[1..])
                    .map_err(|_| DecodeError::InvalidBase(format!("{:?}", &header[1..])))?;
                let base = digits
                    .parse::<u64>()
                    .map_err(|_| DecodeError::InvalidBase(digits.to_string()))?;
                Ok(Self {
                    kind: RecordKind::Delta { base },
                    payload,
                })
            }
            Some(other) => Err(DecodeError::UnknownKind(other as char)),
        }
    }
}

//! Snapshot codec.
//!
//! Layout (little endian):
//!
//! ```text
//! magic "NQIX" | version u16 | payload length u64 | blake3(payload) 32 bytes | payload
//! ```
//!
//! The payload is JSON. Every decode failure maps to `Error::CorruptIndex`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use newsqa_core::error::{Error, Result};
use newsqa_core::types::Metric;

use crate::index::{IndexEntry, VectorIndex};

pub const MAGIC: &[u8; 4] = b"NQIX";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 8 + 32;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    dim: usize,
    metric: Metric,
    embedder_id: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    entries: &'a [IndexEntry],
}

#[derive(Deserialize)]
struct SnapshotOwned {
    dim: usize,
    metric: Metric,
    embedder_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

pub fn encode(index: &VectorIndex) -> Result<Vec<u8>> {
    let body = SnapshotRef {
        dim: index.dim(),
        metric: index.metric(),
        embedder_id: index.embedder_id(),
        created_at: index.created_at(),
        updated_at: index.updated_at(),
        entries: index.entries(),
    };
    let payload = serde_json::to_vec(&body).map_err(|e| Error::Storage(e.into()))?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(blake3::hash(&payload).as_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<VectorIndex> {
    if bytes.len() < HEADER_LEN {
        let len = bytes.len();
        return Err(corrupt(format!("{len} bytes is shorter than the {HEADER_LEN}-byte header")));
    }
    let (magic, rest) = bytes.split_at(4);
    if magic != MAGIC {
        return Err(corrupt("not a newsqa index snapshot (bad magic)"));
    }
    let (version, rest) = rest.split_at(2);
    let version = u16::from_le_bytes([version[0], version[1]]);
    if version != VERSION {
        return Err(corrupt(format!("unsupported snapshot version {version}")));
    }
    let (len, rest) = rest.split_at(8);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(len);
    let declared = u64::from_le_bytes(len_bytes);
    let (checksum, payload) = rest.split_at(32);
    if declared != payload.len() as u64 {
        let actual = payload.len();
        return Err(corrupt(format!("payload is {actual} bytes, header declares {declared}")));
    }
    if blake3::hash(payload).as_bytes() != checksum {
        return Err(corrupt("checksum mismatch"));
    }

    let body: SnapshotOwned =
        serde_json::from_slice(payload).map_err(|e| corrupt(format!("payload: {e}")))?;
    if body.dim == 0 {
        return Err(corrupt("dimension is zero"));
    }
    if body.entries.is_empty() {
        return Err(corrupt("snapshot holds no entries"));
    }
    let wrong_width = body.entries.iter().enumerate().find(|(_, e)| e.vector.len() != body.dim);
    if let Some((i, entry)) = wrong_width {
        return Err(corrupt(format!(
            "entry {i} has {} components, index dimension is {}",
            entry.vector.len(),
            body.dim
        )));
    }
    if body.entries.iter().any(|e| e.vector.iter().any(|x| !x.is_finite())) {
        return Err(corrupt("non-finite vector component"));
    }

    Ok(VectorIndex::from_parts(
        body.dim,
        body.metric,
        body.embedder_id,
        body.entries,
        body.created_at,
        body.updated_at,
    ))
}

fn corrupt(reason: impl Into<String>) -> Error {
    Error::CorruptIndex(reason.into())
}

//! Canonical internal-key encoding for the data column family.
//!
//! Payload blobs are addressed by `(ns_key, sub_key, version)`. The version
//! component isolates generations: a re-created key gets a fresh version, so
//! its internal keys can never alias a previous incarnation's blobs.
//!
//! Key format: `{slot_id:2BE}?{ns_key_len:4BE}{ns_key}{version:8BE}{sub_key}`
//!
//! The slot id prefix is present only when slot-id encoding is enabled
//! (cluster deployments route keys by slot). Big-endian prefixes keep keys
//! of one namespace-key contiguous and ordered by version then sub key.

use xxhash_rust::xxh64::xxh64;

/// Number of cluster slots keys are partitioned into.
pub const SLOT_COUNT: u16 = 16384;

/// Returns the cluster slot for a namespaced key.
#[inline]
pub fn slot_id(ns_key: &[u8]) -> u16 {
    (xxh64(ns_key, 0) % u64::from(SLOT_COUNT)) as u16
}

/// An internal key identifying one payload blob of a versioned data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalKey<'a> {
    ns_key: &'a [u8],
    sub_key: &'a [u8],
    version: u64,
    slot_id_encoded: bool,
}

impl<'a> InternalKey<'a> {
    /// Creates an internal key for `(ns_key, sub_key, version)`.
    pub fn new(ns_key: &'a [u8], sub_key: &'a [u8], version: u64, slot_id_encoded: bool) -> Self {
        Self { ns_key, sub_key, version, slot_id_encoded }
    }

    /// Serializes to the canonical byte encoding.
    pub fn encode(&self) -> Vec<u8> {
        let slot_len = if self.slot_id_encoded { 2 } else { 0 };
        let mut out = Vec::with_capacity(slot_len + 4 + self.ns_key.len() + 8 + self.sub_key.len());
        if self.slot_id_encoded {
            out.extend_from_slice(&slot_id(self.ns_key).to_be_bytes());
        }
        out.extend_from_slice(&(self.ns_key.len() as u32).to_be_bytes());
        out.extend_from_slice(self.ns_key);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(self.sub_key);
        out
    }
}

//! Chain metadata record and its wire encoding.
//!
//! One record per user key describes the whole chain: error target, base
//! capacity, growth factor, filter count, aggregate size and bytes. The
//! record is framed by the prefix common to all persistent data types
//! (flags carrying the type tag, expiry, version) followed by the
//! chain-specific suffix, all in network byte order:
//!
//! ```text
//! flags:1 | expire_ms:8 | version:8 |
//! size:8 | base_capacity:4 | bloom_bytes:8 | n_filters:2 | expansion:2 | error_rate:8
//! ```
//!
//! The version participates in blob internal keys, so a destructive
//! re-creation (which mints a fresh version) orphans the previous
//! incarnation's blobs instead of resurrecting them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Tag identifying the persistent data type a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    /// Scaling Bloom filter chain.
    BloomFilter = 9,
}

/// Default false-positive target for auto-created chains.
pub const BF_DEFAULT_ERROR_RATE: f64 = 0.01;

/// Default base capacity for auto-created chains.
pub const BF_DEFAULT_INIT_CAPACITY: u32 = 100;

/// Default growth factor for auto-created chains.
pub const BF_DEFAULT_EXPANSION: u16 = 2;

/// Serialized record length in bytes.
pub const ENCODED_LEN: usize = 1 + 8 + 8 + 8 + 4 + 8 + 2 + 2 + 8;

/// Metadata describing one Bloom filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomChainMetadata {
    /// Expiry in unix milliseconds; 0 means never. Enforced by the generic
    /// key layer, carried opaquely here.
    pub expire: u64,
    /// Monotonic generation stamp; part of every blob internal key.
    pub version: u64,
    /// Count of distinct items applied to some filter.
    pub size: u64,
    /// Item capacity of filter #0.
    pub base_capacity: u32,
    /// Sum of the per-filter blob byte sizes.
    pub bloom_bytes: u64,
    /// Number of filters in the chain.
    pub n_filters: u16,
    /// Geometric growth factor; 0 disables scaling.
    pub expansion: u16,
    /// False-positive target of each filter in the chain.
    pub error_rate: f64,
}

impl BloomChainMetadata {
    /// Creates the metadata for a fresh single-filter chain.
    ///
    /// `bloom_bytes` starts at 0; the caller accounts for filter blobs as it
    /// creates them.
    pub fn new(capacity: u32, error_rate: f64, expansion: u16) -> Self {
        Self {
            expire: 0,
            version: generate_version(),
            size: 0,
            base_capacity: capacity,
            bloom_bytes: 0,
            n_filters: 1,
            expansion,
            error_rate,
        }
    }

    /// Whether the chain appends new filters once full.
    #[inline]
    pub fn is_scaling(&self) -> bool {
        self.expansion != 0
    }

    /// Aggregate item capacity: Σ `base_capacity · expansion^i` over the
    /// current filters, saturating instead of wrapping.
    ///
    /// `expansion == 1` is accepted; every filter then has the base
    /// capacity and the sum degenerates to `base_capacity · n_filters`.
    pub fn capacity(&self) -> u64 {
        if !self.is_scaling() {
            return u64::from(self.base_capacity);
        }
        let mut total = 0u64;
        let mut filter_capacity = u64::from(self.base_capacity);
        for _ in 0..self.n_filters {
            total = total.saturating_add(filter_capacity);
            filter_capacity = filter_capacity.saturating_mul(u64::from(self.expansion));
        }
        total
    }

    /// Item capacity of the filter that would be appended next:
    /// `base_capacity · expansion^n_filters`, saturating to u32.
    pub fn next_filter_capacity(&self) -> u32 {
        let mut capacity = u64::from(self.base_capacity);
        for _ in 0..self.n_filters {
            capacity = capacity.saturating_mul(u64::from(self.expansion));
        }
        capacity.min(u64::from(u32::MAX)) as u32
    }

    /// Serializes to the fixed wire layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENCODED_LEN);
        out.push(DataType::BloomFilter as u8);
        out.extend_from_slice(&self.expire.to_be_bytes());
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.size.to_be_bytes());
        out.extend_from_slice(&self.base_capacity.to_be_bytes());
        out.extend_from_slice(&self.bloom_bytes.to_be_bytes());
        out.extend_from_slice(&self.n_filters.to_be_bytes());
        out.extend_from_slice(&self.expansion.to_be_bytes());
        out.extend_from_slice(&self.error_rate.to_be_bytes());
        out
    }

    /// Deserializes and validates a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptedMetadata`] on wrong length, wrong type tag,
    /// or field values outside their invariants (`n_filters ≥ 1`,
    /// `error_rate ∈ (0, 1)`, `base_capacity ≥ 1`).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ENCODED_LEN {
            return Err(corrupted(format!(
                "record length {} (expected {ENCODED_LEN})",
                bytes.len()
            )));
        }
        if bytes[0] != DataType::BloomFilter as u8 {
            return Err(corrupted(format!("type tag {} is not a bloom filter", bytes[0])));
        }

        let metadata = Self {
            expire: read_u64(bytes, 1),
            version: read_u64(bytes, 9),
            size: read_u64(bytes, 17),
            base_capacity: u32::from_be_bytes(bytes[25..29].try_into().unwrap()),
            bloom_bytes: read_u64(bytes, 29),
            n_filters: u16::from_be_bytes(bytes[37..39].try_into().unwrap()),
            expansion: u16::from_be_bytes(bytes[39..41].try_into().unwrap()),
            error_rate: f64::from_be_bytes(bytes[41..49].try_into().unwrap()),
        };

        if metadata.n_filters == 0 {
            return Err(corrupted("zero filters".to_string()));
        }
        if metadata.base_capacity == 0 {
            return Err(corrupted("zero base capacity".to_string()));
        }
        if !(metadata.error_rate > 0.0 && metadata.error_rate < 1.0) {
            return Err(corrupted(format!("error rate {} out of (0, 1)", metadata.error_rate)));
        }
        Ok(metadata)
    }
}

#[inline]
fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    u64::from_be_bytes(bytes[offset..offset + 8].try_into().unwrap())
}

fn corrupted(reason: String) -> Error {
    Error::CorruptedMetadata { reason }
}

/// Mints a monotonic version stamp: microsecond timestamp in the high bits,
/// a wrapping counter in the low 11 so stamps within one microsecond still
/// differ.
fn generate_version() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);
    (micros << 11) | (COUNTER.fetch_add(1, Ordering::Relaxed) & 0x7ff)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let metadata = BloomChainMetadata {
            expire: 0,
            version: 0x0123_4567_89ab_cdef,
            size: 42,
            base_capacity: 100,
            bloom_bytes: 128,
            n_filters: 3,
            expansion: 2,
            error_rate: 0.01,
        };

        let decoded = BloomChainMetadata::decode(&metadata.encode()).expect("should decode");
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_encoded_length_is_fixed() {
        let metadata = BloomChainMetadata::new(100, 0.01, 2);
        assert_eq!(metadata.encode().len(), ENCODED_LEN);
    }

    #[test]
    fn test_decode_rejects_truncated_record() {
        let mut bytes = BloomChainMetadata::new(100, 0.01, 2).encode();
        bytes.pop();
        assert!(BloomChainMetadata::decode(&bytes).is_err());
        assert!(BloomChainMetadata::decode(&[]).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_type_tag() {
        let mut bytes = BloomChainMetadata::new(100, 0.01, 2).encode();
        bytes[0] = 0;
        assert!(BloomChainMetadata::decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_invariant_violations() {
        // n_filters = 0
        let mut zero_filters = BloomChainMetadata::new(100, 0.01, 2);
        zero_filters.n_filters = 0;
        assert!(BloomChainMetadata::decode(&zero_filters.encode()).is_err());

        // base_capacity = 0
        let mut zero_capacity = BloomChainMetadata::new(100, 0.01, 2);
        zero_capacity.base_capacity = 0;
        assert!(BloomChainMetadata::decode(&zero_capacity.encode()).is_err());

        // error_rate out of range
        for bad_rate in [0.0, 1.0, 1.5, -0.1, f64::NAN] {
            let mut bad = BloomChainMetadata::new(100, 0.01, 2);
            bad.error_rate = bad_rate;
            assert!(
                BloomChainMetadata::decode(&bad.encode()).is_err(),
                "rate {bad_rate} must be rejected"
            );
        }
    }

    #[test]
    fn test_capacity_geometric_sum() {
        let mut metadata = BloomChainMetadata::new(2, 0.01, 2);
        assert_eq!(metadata.capacity(), 2);

        metadata.n_filters = 2;
        assert_eq!(metadata.capacity(), 2 + 4);

        metadata.n_filters = 3;
        assert_eq!(metadata.capacity(), 2 + 4 + 8);
    }

    #[test]
    fn test_capacity_non_scaling() {
        let mut metadata = BloomChainMetadata::new(50, 0.01, 0);
        assert!(!metadata.is_scaling());
        assert_eq!(metadata.capacity(), 50);

        // n_filters above 1 cannot happen for a non-scaling chain, but the
        // sum must still not grow.
        metadata.n_filters = 2;
        assert_eq!(metadata.capacity(), 50);
    }

    #[test]
    fn test_capacity_expansion_one_is_linear() {
        let mut metadata = BloomChainMetadata::new(10, 0.01, 1);
        metadata.n_filters = 5;
        assert_eq!(metadata.capacity(), 50);
    }

    #[test]
    fn test_capacity_saturates_instead_of_wrapping() {
        let mut metadata = BloomChainMetadata::new(u32::MAX, 0.01, u16::MAX);
        metadata.n_filters = u16::MAX;
        assert_eq!(metadata.capacity(), u64::MAX);
        assert_eq!(metadata.next_filter_capacity(), u32::MAX);
    }

    #[test]
    fn test_next_filter_capacity() {
        let mut metadata = BloomChainMetadata::new(2, 0.01, 2);
        assert_eq!(metadata.next_filter_capacity(), 4);
        metadata.n_filters = 2;
        assert_eq!(metadata.next_filter_capacity(), 8);
    }

    #[test]
    fn test_versions_are_distinct() {
        let a = BloomChainMetadata::new(100, 0.01, 2);
        let b = BloomChainMetadata::new(100, 0.01, 2);
        assert_ne!(a.version, b.version);
    }

    proptest! {
        #[test]
        fn prop_round_trip_bit_for_bit(
            expire in any::<u64>(),
            version in any::<u64>(),
            size in any::<u64>(),
            base_capacity in 1u32..,
            bloom_bytes in any::<u64>(),
            n_filters in 1u16..,
            expansion in any::<u16>(),
            // Strictly inside (0, 1).
            error_rate in 1e-12f64..1.0,
        ) {
            let metadata = BloomChainMetadata {
                expire, version, size, base_capacity,
                bloom_bytes, n_filters, expansion, error_rate,
            };
            let decoded = BloomChainMetadata::decode(&metadata.encode()).unwrap();
            prop_assert_eq!(decoded, metadata);
        }
    }
}

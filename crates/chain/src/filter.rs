//! Block-split Bloom filter.
//!
//! The bit array is partitioned into 256-bit (32-byte) blocks. An item maps
//! to exactly one block; within it, each of the eight 32-bit words receives
//! one bit chosen by a fixed odd salt constant. Probing a block touches one
//! cache line, and the whole per-block pass vectorizes to a single 256-bit
//! SIMD op on capable targets.
//!
//! The item hash and the salts are on-disk-visible: a reader must agree with
//! the writer that produced a blob, so neither may change without a format
//! version bump.

use xxhash_rust::xxh64::xxh64;

/// Bytes per block.
pub const BYTES_PER_BLOCK: u32 = 32;

/// Bits per block.
const BITS_PER_BLOCK: u32 = 256;

/// Largest supported filter size: the greatest multiple of 32 fitting u32.
const MAX_BYTES: u32 = u32::MAX / BYTES_PER_BLOCK * BYTES_PER_BLOCK;

/// The eight odd salt constants of the Parquet block-split Bloom filter.
/// Stable across versions; serialized blobs depend on them.
const SALT: [u32; 8] = [
    0x47b6137b, 0x44974d91, 0x8824ad5b, 0xa2b7289d, 0x705495c7, 0x2df1424b, 0x9efc4947, 0x5c6bfb31,
];

/// Returns the filter byte size for `capacity` items at false-positive rate
/// `error_rate`, rounded up to whole blocks (minimum one block).
///
/// Bits per item is `-log2(p) / ln 2`; the result is always a multiple of
/// 32 bytes and saturates rather than wrapping for extreme inputs.
pub fn optimal_num_bytes(capacity: u32, error_rate: f64) -> u32 {
    let bits_per_item = -error_rate.log2() / std::f64::consts::LN_2;
    let num_blocks =
        (f64::from(capacity) * bits_per_item / f64::from(BITS_PER_BLOCK)).ceil().max(1.0);
    let num_bytes = (num_blocks * f64::from(BYTES_PER_BLOCK)).min(f64::from(MAX_BYTES));
    num_bytes as u32
}

/// Hashes an item for insertion or probing.
///
/// XXH64 with seed 0. This is the only per-item computation; block and bit
/// selection are arithmetic on the returned value.
#[inline]
pub fn hash(item: &[u8]) -> u64 {
    xxh64(item, 0)
}

/// A block-split Bloom filter over an owned byte buffer.
///
/// The buffer length is fixed at construction; capacity grows only by
/// chaining additional filters, never by resizing one.
#[derive(Debug, Clone)]
pub struct BlockSplitBloomFilter {
    data: Vec<u8>,
}

impl BlockSplitBloomFilter {
    /// Creates a zeroed filter of `num_bytes` bytes.
    pub fn new(num_bytes: u32) -> Self {
        debug_assert!(num_bytes >= BYTES_PER_BLOCK && num_bytes % BYTES_PER_BLOCK == 0);
        Self { data: vec![0u8; num_bytes as usize] }
    }

    /// Wraps an existing serialized bit array.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        debug_assert!(data.len() >= BYTES_PER_BLOCK as usize);
        debug_assert!(data.len() % BYTES_PER_BLOCK as usize == 0);
        Self { data }
    }

    /// The serialized bit array.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the filter, returning the bit array.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Sets the eight bits for a previously hashed item.
    pub fn insert_hash(&mut self, hash: u64) {
        let offset = self.block_offset(hash);
        let key = hash as u32;
        for (w, salt) in SALT.iter().enumerate() {
            let pos = offset + w * 4;
            let word = self.load_word(pos) | word_mask(key, *salt);
            self.data[pos..pos + 4].copy_from_slice(&word.to_le_bytes());
        }
    }

    /// Tests the eight bits for a previously hashed item.
    ///
    /// Returns true only if all eight are set.
    pub fn check_hash(&self, hash: u64) -> bool {
        let offset = self.block_offset(hash);
        let key = hash as u32;
        SALT.iter().enumerate().all(|(w, salt)| {
            let mask = word_mask(key, *salt);
            self.load_word(offset + w * 4) & mask == mask
        })
    }

    /// Byte offset of the block an item hash maps to.
    ///
    /// Scales the upper 32 hash bits into `[0, num_blocks)` via the
    /// high half of a 64-bit multiply.
    #[inline]
    fn block_offset(&self, hash: u64) -> usize {
        let num_blocks = (self.data.len() / BYTES_PER_BLOCK as usize) as u64;
        let index = ((hash >> 32) * num_blocks) >> 32;
        index as usize * BYTES_PER_BLOCK as usize
    }

    /// Loads the little-endian word at `pos`.
    #[inline]
    fn load_word(&self, pos: usize) -> u32 {
        u32::from_le_bytes(self.data[pos..pos + 4].try_into().unwrap())
    }
}

/// Single-bit mask for one word of a block: bit `(key * salt) >> 27`.
#[inline]
fn word_mask(key: u32, salt: u32) -> u32 {
    1 << (key.wrapping_mul(salt) >> 27)
}

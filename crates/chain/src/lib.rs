//! bloomchain: scaling Bloom filter chains over a transactional key-value
//! store.
//!
//! A chain answers probabilistic set-membership queries with a tunable
//! false-positive rate and grows capacity automatically: when inserts exceed
//! the aggregate capacity, a new block-split Bloom filter of geometrically
//! larger capacity is appended instead of overflowing. All state persists
//! through the engine in [`bloomchain_store`]: one compact metadata record
//! per user key plus one blob per filter, mutated atomically via write
//! batches under a per-key lock, read through snapshots.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//!
//! use bloomchain::{AddResult, BloomChain};
//! use bloomchain_store::Storage;
//!
//! let chain = BloomChain::new(Arc::new(Storage::default()), b"ns".to_vec());
//!
//! chain.reserve(b"users", 1000, 0.01, 2)?;
//! assert_eq!(chain.add(b"users", b"alice")?, AddResult::Ok);
//! assert_eq!(chain.add(b"users", b"alice")?, AddResult::Exists);
//! assert!(chain.exists(b"users", b"alice")?);
//! # Ok::<(), bloomchain::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod error;
pub mod filter;
pub mod metadata;

pub use chain::{AddResult, BloomChain, BloomFilterInfo};
pub use error::{Error, Result};
pub use filter::BlockSplitBloomFilter;
pub use metadata::BloomChainMetadata;

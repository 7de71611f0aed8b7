//! bloomchain-store: the transactional key-value engine consumed by the
//! bloomchain data type.
//!
//! The engine provides the four primitives a persistent data type needs:
//!
//! - **Column families**: fixed metadata/data separation ([`ColumnFamily`])
//! - **Snapshot reads**: lock-free point-in-time views ([`Snapshot`])
//! - **Atomic write batches**: all-or-nothing commits carrying replication
//!   log data ([`WriteBatch`], [`LogData`])
//! - **Per-key locking**: striped exclusive locks for read-modify-write
//!   operations ([`LockManager`])
//!
//! plus the canonical versioned [`InternalKey`] encoding that addresses
//! per-type payload blobs in the data column family.
//!
//! ## Quick start
//!
//! ```
//! use bloomchain_store::{ColumnFamily, Storage, StorageConfig, WriteBatch};
//!
//! let storage = Storage::open(StorageConfig::default());
//!
//! let mut batch = WriteBatch::new();
//! batch.put(ColumnFamily::Metadata, b"key".to_vec(), b"value".to_vec());
//! storage.write(batch)?;
//!
//! let value = storage.get(ColumnFamily::Metadata, b"key")?;
//! assert_eq!(value.as_deref(), Some(b"value".as_slice()));
//! # Ok::<(), bloomchain_store::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod cf;
pub mod db;
pub mod error;
pub mod keys;
pub mod lock;

pub use batch::{LogData, WriteBatch};
pub use cf::ColumnFamily;
pub use db::{Snapshot, Storage, StorageConfig};
pub use error::{Error, Result};
pub use keys::{InternalKey, SLOT_COUNT, slot_id};
pub use lock::{LockGuard, LockManager};

//! Bloom filter chain operations.
//!
//! A chain is an ordered list of block-split Bloom filters representing one
//! logical set. Inserts land in the newest filter; when the aggregate size
//! would exceed the aggregate capacity, a scaling chain appends a filter of
//! geometrically larger capacity instead of overflowing. Probes walk the
//! chain newest to oldest, short-circuiting on the first hit.
//!
//! Every mutating operation holds the per-key lock for its whole duration
//! and commits one atomic write batch; readers work from a snapshot taken
//! at entry, so a concurrent append never perturbs the observed filter set.

use std::sync::Arc;

use bloomchain_store::{ColumnFamily, InternalKey, LogData, Snapshot, Storage, WriteBatch};
use snafu::ResultExt;

use crate::error::{Error, Result, StorageSnafu};
use crate::filter::{self, BlockSplitBloomFilter, BYTES_PER_BLOCK};
use crate::metadata::{
    BloomChainMetadata, DataType, BF_DEFAULT_ERROR_RATE, BF_DEFAULT_EXPANSION,
    BF_DEFAULT_INIT_CAPACITY,
};

/// Per-item outcome of an add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    /// The item was inserted.
    Ok,
    /// The item was (probably) already present; nothing changed.
    Exists,
    /// The chain is non-scaling and full; nothing changed.
    Full,
}

/// Summary of a chain as reported by [`BloomChain::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomFilterInfo {
    /// Aggregate item capacity across all filters.
    pub capacity: u64,
    /// Sum of the per-filter blob byte sizes.
    pub bloom_bytes: u64,
    /// Number of filters in the chain.
    pub n_filters: u16,
    /// Count of distinct items inserted.
    pub size: u64,
    /// Geometric growth factor; 0 means non-scaling.
    pub expansion: u16,
}

/// Scaling Bloom filter chains over a storage engine.
///
/// Cheap to clone; operations are safe to invoke concurrently from multiple
/// threads. Writers of the same user key serialize on the per-key lock.
#[derive(Clone)]
pub struct BloomChain {
    storage: Arc<Storage>,
    namespace: Vec<u8>,
}

impl BloomChain {
    /// Creates a handle operating in `namespace`.
    pub fn new(storage: Arc<Storage>, namespace: impl Into<Vec<u8>>) -> Self {
        Self { storage, namespace: namespace.into() }
    }

    /// Creates an empty chain with explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless `0 < error_rate < 1` and
    /// `capacity ≥ 1`, and [`Error::KeyExists`] if the key already holds a
    /// chain.
    pub fn reserve(
        &self,
        user_key: &[u8],
        capacity: u32,
        error_rate: f64,
        expansion: u16,
    ) -> Result<()> {
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(Error::InvalidArgument {
                message: "error rate must be in (0, 1)".to_string(),
            });
        }
        if capacity == 0 {
            return Err(Error::InvalidArgument {
                message: "capacity must be at least 1".to_string(),
            });
        }

        let ns_key = self.ns_key(user_key);
        let _guard = self.storage.lock_manager().lock_guard(&ns_key);

        if self.read_metadata(&ns_key)?.is_some() {
            return Err(Error::KeyExists);
        }
        self.create_chain(&ns_key, capacity, error_rate, expansion)?;
        Ok(())
    }

    /// Adds one item. See [`madd`](Self::madd).
    pub fn add(&self, user_key: &[u8], item: &[u8]) -> Result<AddResult> {
        let results = self.madd(user_key, &[item])?;
        Ok(results[0])
    }

    /// Adds a batch of items, returning one [`AddResult`] per item in input
    /// order.
    ///
    /// A missing chain is auto-created with default parameters. Duplicates
    /// report [`AddResult::Exists`]; a full non-scaling chain reports
    /// [`AddResult::Full`] per item. A scaling chain at capacity appends a
    /// geometrically larger filter and keeps inserting. All modified state
    /// commits in one atomic batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptedMetadata`] / [`Error::CorruptedChain`] if
    /// stored state fails validation, or [`Error::Storage`] on engine
    /// failure.
    pub fn madd(&self, user_key: &[u8], items: &[&[u8]]) -> Result<Vec<AddResult>> {
        let ns_key = self.ns_key(user_key);
        let _guard = self.storage.lock_manager().lock_guard(&ns_key);

        let mut metadata = match self.read_metadata(&ns_key)? {
            Some(metadata) => metadata,
            None => self.create_chain(
                &ns_key,
                BF_DEFAULT_INIT_CAPACITY,
                BF_DEFAULT_ERROR_RATE,
                BF_DEFAULT_EXPANSION,
            )?,
        };

        let mut bf_key_list = self.blob_key_list(&ns_key, &metadata);
        let snapshot = self.storage.latest_snapshot();
        let mut filters = self.read_filters(&snapshot, &bf_key_list)?;

        let item_hashes: Vec<u64> = items.iter().map(|item| filter::hash(item)).collect();

        let origin_size = metadata.size;
        let mut batch = WriteBatch::new();
        batch.put_log_data(LogData::new(DataType::BloomFilter as u8, &["insert"]).encode());

        let mut results = Vec::with_capacity(items.len());
        for &item_hash in &item_hashes {
            if filters.iter().rev().any(|f| f.check_hash(item_hash)) {
                results.push(AddResult::Exists);
                continue;
            }

            if metadata.size + 1 > metadata.capacity() {
                if !metadata.is_scaling() {
                    results.push(AddResult::Full);
                    continue;
                }
                // The current newest filter may carry inserts from earlier
                // items in this batch; stage it before it stops being the
                // write target.
                let newest = filters.last().unwrap();
                batch.put(
                    ColumnFamily::Data,
                    bf_key_list.last().unwrap().clone(),
                    newest.data().to_vec(),
                );
                self.append_filter(&ns_key, &mut metadata, &mut bf_key_list, &mut filters);
            }

            filters.last_mut().unwrap().insert_hash(item_hash);
            results.push(AddResult::Ok);
            metadata.size += 1;
        }

        if metadata.size != origin_size {
            batch.put(ColumnFamily::Metadata, ns_key, metadata.encode());
            // Inserts only ever target the newest filter, so older blobs are
            // clean unless an append staged them above.
            batch.put(
                ColumnFamily::Data,
                bf_key_list.last().unwrap().clone(),
                filters.last().unwrap().data().to_vec(),
            );
            self.storage.write(batch).context(StorageSnafu)?;
        }
        Ok(results)
    }

    /// Tests one item. See [`mexists`](Self::mexists).
    pub fn exists(&self, user_key: &[u8], item: &[u8]) -> Result<bool> {
        let results = self.mexists(user_key, &[item])?;
        Ok(results[0])
    }

    /// Tests a batch of items, returning one bool per item in input order.
    ///
    /// A missing chain yields all-false. No lock is taken: the snapshot
    /// captured at entry keeps the observed filter set consistent, and the
    /// answer is monotonic with respect to interleaved inserts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptedMetadata`] / [`Error::CorruptedChain`] if
    /// stored state fails validation, or [`Error::Storage`] on engine
    /// failure.
    pub fn mexists(&self, user_key: &[u8], items: &[&[u8]]) -> Result<Vec<bool>> {
        let ns_key = self.ns_key(user_key);
        let snapshot = self.storage.latest_snapshot();

        let raw = snapshot.get(ColumnFamily::Metadata, &ns_key).context(StorageSnafu)?;
        let metadata = match raw {
            Some(bytes) => BloomChainMetadata::decode(&bytes)?,
            None => return Ok(vec![false; items.len()]),
        };

        let bf_key_list = self.blob_key_list(&ns_key, &metadata);
        let filters = self.read_filters(&snapshot, &bf_key_list)?;

        Ok(items
            .iter()
            .map(|item| {
                let item_hash = filter::hash(item);
                filters.iter().rev().any(|f| f.check_hash(item_hash))
            })
            .collect())
    }

    /// Reports capacity, size and shape of a chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the chain does not exist.
    pub fn info(&self, user_key: &[u8]) -> Result<BloomFilterInfo> {
        let ns_key = self.ns_key(user_key);
        let metadata = self.read_metadata(&ns_key)?.ok_or(Error::NotFound)?;

        Ok(BloomFilterInfo {
            capacity: metadata.capacity(),
            bloom_bytes: metadata.bloom_bytes,
            n_filters: metadata.n_filters,
            size: metadata.size,
            expansion: metadata.expansion,
        })
    }

    /// Namespaced key for a user key.
    fn ns_key(&self, user_key: &[u8]) -> Vec<u8> {
        let mut ns_key = Vec::with_capacity(self.namespace.len() + user_key.len());
        ns_key.extend_from_slice(&self.namespace);
        ns_key.extend_from_slice(user_key);
        ns_key
    }

    /// Reads and decodes the chain metadata, `None` if absent.
    fn read_metadata(&self, ns_key: &[u8]) -> Result<Option<BloomChainMetadata>> {
        let raw = self.storage.get(ColumnFamily::Metadata, ns_key).context(StorageSnafu)?;
        raw.map(|bytes| BloomChainMetadata::decode(&bytes)).transpose()
    }

    /// Internal key of the blob for filter `index`.
    fn blob_key(&self, ns_key: &[u8], metadata: &BloomChainMetadata, index: u16) -> Vec<u8> {
        let sub_key = index.to_be_bytes();
        InternalKey::new(ns_key, &sub_key, metadata.version, self.storage.is_slot_id_encoded())
            .encode()
    }

    /// Blob keys for all current filters, oldest first.
    fn blob_key_list(&self, ns_key: &[u8], metadata: &BloomChainMetadata) -> Vec<Vec<u8>> {
        (0..metadata.n_filters).map(|i| self.blob_key(ns_key, metadata, i)).collect()
    }

    /// Snapshot-reads every filter blob listed in the metadata.
    fn read_filters(
        &self,
        snapshot: &Snapshot,
        bf_key_list: &[Vec<u8>],
    ) -> Result<Vec<BlockSplitBloomFilter>> {
        bf_key_list
            .iter()
            .enumerate()
            .map(|(index, key)| {
                let blob = snapshot
                    .get(ColumnFamily::Data, key)
                    .context(StorageSnafu)?
                    .ok_or_else(|| Error::CorruptedChain {
                        reason: format!("missing filter #{index}"),
                    })?;
                if blob.len() < BYTES_PER_BLOCK as usize
                    || blob.len() % BYTES_PER_BLOCK as usize != 0
                {
                    return Err(Error::CorruptedChain {
                        reason: format!("filter #{index} has invalid length {}", blob.len()),
                    });
                }
                Ok(BlockSplitBloomFilter::from_bytes(blob))
            })
            .collect()
    }

    /// Creates a single-filter chain and commits it.
    ///
    /// Caller must hold the per-key lock and have verified absence.
    fn create_chain(
        &self,
        ns_key: &[u8],
        capacity: u32,
        error_rate: f64,
        expansion: u16,
    ) -> Result<BloomChainMetadata> {
        let mut metadata = BloomChainMetadata::new(capacity, error_rate, expansion);
        let num_bytes = filter::optimal_num_bytes(capacity, error_rate);
        metadata.bloom_bytes = u64::from(num_bytes);

        let mut batch = WriteBatch::new();
        batch.put_log_data(LogData::new(DataType::BloomFilter as u8, &["createBloomChain"]).encode());
        batch.put(ColumnFamily::Metadata, ns_key.to_vec(), metadata.encode());
        batch.put(
            ColumnFamily::Data,
            self.blob_key(ns_key, &metadata, 0),
            BlockSplitBloomFilter::new(num_bytes).into_bytes(),
        );
        self.storage.write(batch).context(StorageSnafu)?;

        tracing::debug!(capacity, error_rate, expansion, "created bloom chain");
        Ok(metadata)
    }

    /// Appends a geometrically larger filter to the in-memory working state.
    ///
    /// The new blob reaches storage with the final commit; the metadata
    /// update travels in the same batch.
    fn append_filter(
        &self,
        ns_key: &[u8],
        metadata: &mut BloomChainMetadata,
        bf_key_list: &mut Vec<Vec<u8>>,
        filters: &mut Vec<BlockSplitBloomFilter>,
    ) {
        let num_bytes =
            filter::optimal_num_bytes(metadata.next_filter_capacity(), metadata.error_rate);
        metadata.n_filters += 1;
        metadata.bloom_bytes += u64::from(num_bytes);

        bf_key_list.push(self.blob_key(ns_key, metadata, metadata.n_filters - 1));
        filters.push(BlockSplitBloomFilter::new(num_bytes));

        tracing::debug!(n_filters = metadata.n_filters, num_bytes, "appended bloom filter");
    }
}

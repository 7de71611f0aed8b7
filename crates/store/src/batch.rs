//! Write batches and replication log data.
//!
//! A [`WriteBatch`] collects ordered puts plus opaque log-data entries and is
//! applied atomically by [`Storage::write`](crate::Storage::write). Log data
//! is not stored under any key; it rides along with the commit for
//! replication consumers.

use crate::cf::ColumnFamily;
use crate::error::{Error, Result};

/// A single put staged in a write batch.
#[derive(Debug, Clone)]
pub(crate) struct PutOp {
    pub(crate) cf: ColumnFamily,
    pub(crate) key: Vec<u8>,
    pub(crate) value: Vec<u8>,
}

/// An atomically-committed set of mutations.
///
/// Ops are applied in insertion order; a later put to the same key wins.
#[derive(Debug, Default)]
pub struct WriteBatch {
    pub(crate) ops: Vec<PutOp>,
    pub(crate) log_data: Vec<Vec<u8>>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a put into the given column family.
    pub fn put(&mut self, cf: ColumnFamily, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(PutOp { cf, key, value });
    }

    /// Attaches an opaque log-data entry to this batch.
    ///
    /// The engine does not interpret the bytes; they are surfaced to
    /// replication consumers in commit order.
    pub fn put_log_data(&mut self, data: Vec<u8>) {
        self.log_data.push(data);
    }

    /// Returns true if the batch stages no puts and carries no log data.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.log_data.is_empty()
    }

    /// Number of staged puts.
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Structured payload of a log-data entry: a data-type tag plus argument
/// tokens describing the mutation.
///
/// Wire format: `tag (1 byte)` followed by `0x20`-separated tokens. Tokens
/// must not contain `0x20`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogData {
    /// Data-type tag of the mutating component.
    pub tag: u8,
    /// Argument tokens, e.g. the mutation name.
    pub args: Vec<Vec<u8>>,
}

impl LogData {
    /// Creates a log-data payload from a tag and string tokens.
    pub fn new(tag: u8, args: &[&str]) -> Self {
        Self { tag, args: args.iter().map(|a| a.as_bytes().to_vec()).collect() }
    }

    /// Serializes to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.args.iter().map(|a| a.len() + 1).sum::<usize>());
        out.push(self.tag);
        for arg in &self.args {
            out.push(b' ');
            out.extend_from_slice(arg);
        }
        out
    }

    /// Deserializes from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] if the input is empty or the token list
    /// is malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, rest) = bytes.split_first().ok_or_else(|| Error::Corrupted {
            reason: "empty log data entry".to_string(),
        })?;
        let args = match rest.split_first() {
            None => Vec::new(),
            Some((&b' ', tokens)) => tokens.split(|&b| b == b' ').map(<[u8]>::to_vec).collect(),
            Some(_) => {
                return Err(Error::Corrupted {
                    reason: "log data tokens missing separator".to_string(),
                })
            }
        };
        Ok(Self { tag, args })
    }
}

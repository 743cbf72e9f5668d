//! The mempool as transaction verification sees it.
//!
//! The mempool container itself belongs to the peer. Verification only
//! needs a read-only snapshot of its entries, scanned linearly: the pool is
//! expected to stay small, and a scan keeps the snapshot a plain sequence.

use std::sync::Arc;

use bittern_chain::{
    transaction::{self, Transaction},
    transparent,
};

/// One transaction waiting in the mempool.
#[derive(Clone, Debug)]
pub struct Entry {
    /// The transaction's hash, precomputed on entry.
    pub hash: transaction::Hash,
    /// The transaction itself.
    pub transaction: Arc<Transaction>,
    /// Hashes of mempool transactions this one spends from.
    pub depends_on: Vec<transaction::Hash>,
}

impl Entry {
    /// Create an entry for `transaction`, computing its hash.
    pub fn new(transaction: Arc<Transaction>, depends_on: Vec<transaction::Hash>) -> Self {
        Entry {
            hash: transaction.hash(),
            transaction,
            depends_on,
        }
    }
}

/// A cheaply-cloneable, read-only snapshot of the mempool.
///
/// The snapshot is borrowed by a verification for its full duration; the
/// peer takes a fresh snapshot per submitted transaction.
#[derive(Clone, Debug, Default)]
pub struct Snapshot(Arc<Vec<Entry>>);

impl Snapshot {
    /// Create a snapshot of the given entries.
    pub fn new(entries: Vec<Entry>) -> Self {
        Snapshot(Arc::new(entries))
    }

    /// A snapshot of an empty mempool.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Is the snapshot empty?
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Does the snapshot contain a transaction with this hash?
    pub fn contains(&self, hash: &transaction::Hash) -> bool {
        self.find(hash).is_some()
    }

    /// Find the entry with this hash, if one exists.
    pub fn find(&self, hash: &transaction::Hash) -> Option<&Entry> {
        self.0.iter().find(|entry| entry.hash == *hash)
    }

    /// Does any transaction in the snapshot already spend this output?
    pub fn spends(&self, outpoint: &transparent::OutPoint) -> bool {
        self.0.iter().any(|entry| {
            entry
                .transaction
                .inputs
                .iter()
                .any(|input| input.outpoint == *outpoint)
        })
    }

    /// Iterate over the snapshot's entries.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.0.iter()
    }
}

impl From<Vec<Entry>> for Snapshot {
    fn from(entries: Vec<Entry>) -> Self {
        Snapshot::new(entries)
    }
}

/// The successful outcome of verifying a loose transaction: it may be
/// admitted to the mempool.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Admission {
    /// The verified transaction's hash.
    pub hash: transaction::Hash,
    /// The indices of the inputs whose parent transactions are themselves
    /// still waiting in the mempool.
    ///
    /// The mempool uses these to record the new entry's dependencies.
    pub unconfirmed_inputs: Vec<u32>,
}

//! Transactions and transaction-related structures.
#![allow(clippy::unit_arg)]

mod hash;
mod serialize;


pub use hash::Hash;

use chrono::{DateTime, Utc};

use crate::{block, transparent};

/// The lock time boundary: values below it are block heights, values at or
/// above it are unix timestamps.
pub const LOCK_TIME_THRESHOLD: u32 = 500_000_000;

/// A Bitcoin transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction version number.
    pub version: u32,
    /// The transparent inputs spent by this transaction.
    pub inputs: Vec<transparent::Input>,
    /// The transparent outputs created by this transaction.
    pub outputs: Vec<transparent::Output>,
    /// The earliest time or block height this transaction may be added to the
    /// chain.
    pub lock_time: u32,
}

impl Transaction {
    /// Compute the hash of this transaction.
    pub fn hash(&self) -> Hash {
        Hash::from(self)
    }

    /// Returns true if this transaction is a coinbase transaction: its only
    /// input references the null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].outpoint.is_null()
    }

    /// Returns true if this transaction is final at `height` and
    /// `block_time`, so it may be included in a block there.
    ///
    /// A zero lock time is always final. Otherwise the lock time is compared
    /// against the block height (below [`LOCK_TIME_THRESHOLD`]) or the block
    /// time (at or above it); a lock time strictly below the cutoff is
    /// final. Failing that, the transaction is still final if every input
    /// has opted out of lock-time enforcement with a maximum sequence
    /// number.
    pub fn is_final(&self, height: block::Height, block_time: DateTime<Utc>) -> bool {
        if self.lock_time == 0 {
            return true;
        }

        let cutoff: i64 = if self.lock_time < LOCK_TIME_THRESHOLD {
            height.0 as i64
        } else {
            block_time.timestamp()
        };
        if (self.lock_time as i64) < cutoff {
            return true;
        }

        self.inputs.iter().all(|input| input.sequence == u32::MAX)
    }

    /// The sum of this transaction's output values.
    ///
    /// Accumulated in 128 bits, so it cannot overflow even for value-invalid
    /// transactions.
    pub fn outputs_value(&self) -> u128 {
        self.outputs
            .iter()
            .map(|output| output.value as u128)
            .sum()
    }
}

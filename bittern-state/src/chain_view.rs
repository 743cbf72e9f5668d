use std::sync::Arc;

use chrono::{DateTime, Utc};

use bittern_chain::{
    block,
    transaction::{self, Transaction},
    transparent,
    work::difficulty::CompactDifficulty,
};

/// A synchronous, logically frozen view of the best chain below a block
/// being verified.
///
/// A view used to verify a block at height `h` covers the chain up to and
/// including height `h - 1`, and must not change for the duration of the
/// verification. Because the view is frozen, block verification never
/// suspends, and independent verifications can run in parallel on
/// independent views.
pub trait ChainView {
    /// The `bits` field of the best chain's tip block, i.e. the block
    /// immediately before the one being verified.
    fn previous_block_bits(&self) -> CompactDifficulty;

    /// The number of seconds between the blocks `interval` blocks ago and at
    /// the tip.
    ///
    /// Used by difficulty retargeting; `interval` is the retargeting
    /// interval, so callers only ask when that much history exists.
    fn actual_timespan(&self, interval: u32) -> i64;

    /// The median of the timestamps of the last 11 blocks (or as many as
    /// exist).
    ///
    /// Used to prevent trivial backdating of block timestamps.
    fn median_time_past(&self) -> DateTime<Utc>;

    /// Does a confirmed transaction with the given hash exist?
    fn transaction_exists(&self, hash: &transaction::Hash) -> bool;

    /// Look up a confirmed transaction and its confirmation height.
    fn transaction(&self, hash: &transaction::Hash)
        -> Option<(Arc<Transaction>, block::Height)>;

    /// Is the given transparent output spent by a confirmed transaction?
    ///
    /// Spends by transactions inside the block currently being verified are
    /// not visible here; the block verifier tracks those itself.
    fn is_output_spent(&self, outpoint: &transparent::OutPoint) -> bool;
}

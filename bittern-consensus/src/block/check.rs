//! Consensus check functions for blocks.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use bittern_chain::{
    block::{self, Block, Header, MAX_BLOCK_SIZE},
    serialization::BitcoinSerialize,
    transaction::Transaction,
    work::difficulty::{CompactDifficulty, ExpandedDifficulty},
};
use bittern_state::ChainView;

use crate::{
    error::BlockError,
    parameters::{MAX_BLOCK_SIGOPS, RETARGETING_INTERVAL, TARGET_TIMESPAN},
    transaction::check as tx_check,
};

/// Check that the block has at least one transaction, no more transactions
/// than could fit in a maximum-size block, and a serialized size within the
/// maximum block size.
pub fn size_is_valid(block: &Block) -> Result<(), BlockError> {
    if block.transactions.is_empty()
        || block.transactions.len() > MAX_BLOCK_SIZE
        || block.bitcoin_serialized_size() > MAX_BLOCK_SIZE
    {
        return Err(BlockError::SizeLimit);
    }
    Ok(())
}

/// Check that the header hash satisfies the difficulty threshold the header
/// declares.
///
/// The declared threshold must itself be well-formed and no easier than the
/// proof-of-work limit; then the header hash, read as a little-endian
/// 256-bit integer, must not exceed it.
pub fn difficulty_is_valid(header: &Header, hash: &block::Hash) -> Result<(), BlockError> {
    let difficulty_threshold = header
        .difficulty_threshold
        .to_expanded()
        .ok_or(BlockError::InvalidProofOfWork)?;

    if difficulty_threshold > ExpandedDifficulty::target_difficulty_limit() {
        return Err(BlockError::InvalidProofOfWork);
    }

    if hash > &difficulty_threshold {
        return Err(BlockError::InvalidProofOfWork);
    }

    Ok(())
}

/// Check that the header time is not more than 2 hours in the future of the
/// node's clock (`now`).
///
/// This is a non-deterministic rule: clocks vary between nodes, and a block
/// rejected by this rule at one point in time may later be accepted. `now`
/// is always injected, so the rest of block validation stays deterministic.
pub fn time_is_valid_at(
    header: &Header,
    now: DateTime<Utc>,
    height: &block::Height,
    hash: &block::Hash,
) -> Result<(), BlockError> {
    header
        .time_is_valid_at(now, height, hash)
        .map_err(|_| BlockError::TimeTooFarAhead)
}

/// Check that the first transaction is a coinbase, and no other transaction
/// is.
pub fn coinbase_is_first(block: &Block) -> Result<(), BlockError> {
    let first = block
        .transactions
        .first()
        .ok_or(BlockError::SizeLimit)?;
    if !first.is_coinbase() {
        return Err(BlockError::CoinbasePosition);
    }
    let mut rest = block.transactions.iter().skip(1);
    if rest.any(|tx| tx.is_coinbase()) {
        return Err(BlockError::CoinbaseAfterFirst);
    }
    Ok(())
}

/// Check every transaction's context-free rules, and that no two
/// transactions share a hash.
///
/// The duplicate check also guards the merkle root's known duplication
/// tolerance (CVE-2012-2459): the transaction lists it can confuse always
/// contain a repeated hash.
pub fn transactions_are_valid_and_unique(block: &Block) -> Result<(), BlockError> {
    let mut unique_hashes = HashSet::new();
    for tx in &block.transactions {
        tx_check::check_transaction(tx)?;
        unique_hashes.insert(tx.hash());
    }
    if unique_hashes.len() != block.transactions.len() {
        return Err(BlockError::DuplicateTransaction);
    }
    Ok(())
}

/// The legacy signature-operation count of one transaction: every input and
/// output script counted with inaccurate multisig charging.
///
/// The inaccurate count is the protocol's per-block accounting unit; the
/// accurate count only supplements it for pay-to-script-hash spends during
/// block connection.
pub fn transaction_legacy_sigop_count(tx: &Transaction) -> usize {
    let mut total_sigs = 0;
    for input in &tx.inputs {
        total_sigs += input.unlock_script.sigop_count(false);
    }
    for output in &tx.outputs {
        total_sigs += output.lock_script.sigop_count(false);
    }
    total_sigs
}

/// Check that the block's legacy signature-operation count is within the
/// per-block limit.
pub fn sigops_are_in_limit(block: &Block) -> Result<(), BlockError> {
    let total_sigs: usize = block
        .transactions
        .iter()
        .map(|tx| transaction_legacy_sigop_count(tx))
        .sum();
    if total_sigs > MAX_BLOCK_SIGOPS {
        return Err(BlockError::TooManySigops);
    }
    Ok(())
}

/// Check that the merkle root of the block's transactions matches the root
/// the header commits to.
pub fn merkle_root_is_valid(block: &Block) -> Result<(), BlockError> {
    let actual: block::merkle::Root = block.transactions.iter().collect();
    if actual != block.header.merkle_root {
        return Err(BlockError::BadMerkleRoot {
            actual,
            expected: block.header.merkle_root,
        });
    }
    Ok(())
}

/// The difficulty threshold required of a block at `height`, given the
/// chain below it.
///
/// The genesis block takes the proof-of-work limit. Off-interval blocks
/// inherit the previous block's threshold. At each retargeting interval,
/// the previous threshold is rescaled by the interval's actual duration,
/// clamped to a quarter and four times the intended timespan, and capped at
/// the proof-of-work limit.
///
/// The rescale multiplies a 256-bit target by a 32-bit span before
/// dividing, so it runs in 256-bit arithmetic.
pub fn work_required<C: ChainView>(height: block::Height, view: &C) -> CompactDifficulty {
    if height == block::Height(0) {
        return ExpandedDifficulty::target_difficulty_limit().to_compact();
    }

    let previous_bits = view.previous_block_bits();
    if height.0 % RETARGETING_INTERVAL != 0 {
        return previous_bits;
    }

    let actual_timespan = view
        .actual_timespan(RETARGETING_INTERVAL)
        .clamp(TARGET_TIMESPAN / 4, TARGET_TIMESPAN * 4);

    let previous_target = previous_bits
        .to_expanded()
        .expect("the chain's accepted difficulty thresholds expand");

    let mut retarget = previous_target * (actual_timespan as u64) / (TARGET_TIMESPAN as u64);

    let limit = ExpandedDifficulty::target_difficulty_limit();
    if retarget > limit {
        retarget = limit;
    }

    retarget.to_compact()
}

/// Check that the header declares exactly the difficulty the retargeting
/// rules require at `height`.
pub fn difficulty_threshold_is_required<C: ChainView>(
    header: &Header,
    height: block::Height,
    view: &C,
) -> Result<(), BlockError> {
    if header.difficulty_threshold != work_required(height, view) {
        return Err(BlockError::WrongDifficulty);
    }
    Ok(())
}

/// Check that the header time is strictly later than the median time of the
/// preceding blocks.
pub fn time_is_past_median(header: &Header, view: &impl ChainView) -> Result<(), BlockError> {
    if header.time <= view.median_time_past() {
        return Err(BlockError::TimeTooEarly);
    }
    Ok(())
}

/// Check that every transaction is final at the block's height and time.
pub fn transactions_are_final(block: &Block, height: block::Height) -> Result<(), BlockError> {
    for tx in &block.transactions {
        if !tx.is_final(height, block.header.time) {
            return Err(BlockError::NonFinalTransaction);
        }
    }
    Ok(())
}

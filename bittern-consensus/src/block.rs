//! Block verification.
//!
//! Verification occurs in three phases:
//!   - context-free checks, which only need the block itself,
//!   - contextual acceptance, which needs the claimed height and a view of
//!     the chain below the block, and
//!   - full connection, which checks every spend against the transaction
//!     history.
//!
//! All three phases are synchronous: the chain view is a frozen snapshot,
//! so verification never suspends, and independent blocks can be verified
//! in parallel on independent views.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};

use bittern_chain::{
    amount::MAX_MONEY,
    block::{self, Block},
    transaction::Transaction,
    transparent,
};
use bittern_state::ChainView;

use crate::{
    checkpoint::CheckpointList,
    error::BlockError,
    parameters::{
        BIP16_SWITCHOVER_HEIGHT, BIP16_SWITCHOVER_TIMESTAMP, COINBASE_MATURITY, MAX_BLOCK_SIGOPS,
    },
    script::ScriptEngine,
};

pub mod check;
pub mod subsidy;

#[cfg(test)]
mod tests;

/// The two heights exempt from the duplicate-transaction-hash rule.
///
/// These blocks were mined before the rule activated, and each duplicates
/// the coinbase of an earlier block.
const DUPLICATE_TX_EXEMPT_HEIGHTS: [block::Height; 2] =
    [block::Height(91_842), block::Height(91_880)];

/// A verifier for one block at one claimed height.
///
/// The verifier borrows the block and a [`ChainView`] frozen at the height
/// below it, and owns nothing mutable across calls; dropping it after
/// [`verify_at`](Self::verify_at) leaves no trace of a rejected block.
pub struct BlockVerifier<'a, C> {
    height: block::Height,
    block: &'a Block,
    view: &'a C,
    engine: &'a dyn ScriptEngine,
    checkpoints: CheckpointList,
}

impl<'a, C> BlockVerifier<'a, C>
where
    C: ChainView,
{
    /// Create a verifier for `block` at `height`.
    ///
    /// `view` must be a frozen snapshot of the chain up to `height - 1`,
    /// and `engine` executes the scripts of the spends the block makes.
    pub fn new(
        height: block::Height,
        block: &'a Block,
        view: &'a C,
        engine: &'a dyn ScriptEngine,
    ) -> Self {
        Self {
            height,
            block,
            view,
            engine,
            checkpoints: CheckpointList::hard_coded(),
        }
    }

    /// Verify the block against the node's wall clock.
    pub fn verify(&self) -> Result<(), BlockError> {
        self.verify_at(Utc::now())
    }

    /// Verify the block, reading the wall clock as `now`.
    ///
    /// Runs the three phases in order and returns the first rule the block
    /// breaks, or `Ok(())` if it may extend the chain at its height.
    pub fn verify_at(&self, now: DateTime<Utc>) -> Result<(), BlockError> {
        let hash = self.block.hash();

        let span = tracing::debug_span!("block", height = self.height.0, %hash);
        let _entered = span.enter();

        self.check_block(now, &hash)?;
        self.accept_block(&hash)?;
        self.connect_block()?;

        tracing::trace!("verified block");
        metrics::counter!("block.verified.block.count").increment(1);
        Ok(())
    }

    /// Context-free checks: everything that can be decided from the block's
    /// own bytes (plus the clock).
    fn check_block(&self, now: DateTime<Utc>, hash: &block::Hash) -> Result<(), BlockError> {
        check::size_is_valid(self.block)?;
        check::difficulty_is_valid(&self.block.header, hash)?;
        check::time_is_valid_at(&self.block.header, now, &self.height, hash)?;
        check::coinbase_is_first(self.block)?;
        check::transactions_are_valid_and_unique(self.block)?;
        check::sigops_are_in_limit(self.block)?;
        check::merkle_root_is_valid(self.block)?;
        Ok(())
    }

    /// Contextual checks: the block against the chain's recent history and
    /// the checkpoint table.
    fn accept_block(&self, hash: &block::Hash) -> Result<(), BlockError> {
        check::difficulty_threshold_is_required(&self.block.header, self.height, self.view)?;
        check::time_is_past_median(&self.block.header, self.view)?;
        check::transactions_are_final(self.block, self.height)?;

        if let Some(required) = self.checkpoints.hash(self.height) {
            if *hash != required {
                return Err(BlockError::CheckpointMismatch);
            }
        }
        Ok(())
    }

    /// Full connection: spend every non-coinbase input against the
    /// transaction history, account signature operations and fees, and
    /// bound the coinbase claim.
    fn connect_block(&self) -> Result<(), BlockError> {
        // A transaction hash may not shadow an earlier transaction that
        // still has unspent outputs. Two early blocks predate the rule and
        // are exempt.
        if !DUPLICATE_TX_EXEMPT_HEIGHTS.contains(&self.height) {
            for tx in &self.block.transactions {
                self.check_not_duplicate_or_spent(tx)?;
            }
        }

        let mut fees: u64 = 0;
        let mut total_sigops: usize = 0;
        // Outputs spent by this block's own earlier inputs. The chain view
        // is frozen below this block, so these spends are tracked here.
        let mut spent_in_block: HashSet<transparent::OutPoint> = HashSet::new();

        for tx in self.block.transactions.iter().skip(1) {
            total_sigops += check::transaction_legacy_sigop_count(tx);
            if total_sigops > MAX_BLOCK_SIGOPS {
                return Err(BlockError::TooManySigops);
            }

            let mut value_in: u64 = 0;
            for input_index in 0..tx.inputs.len() {
                self.connect_input(
                    tx,
                    input_index,
                    &mut value_in,
                    &mut total_sigops,
                    &mut spent_in_block,
                )
                .map_err(|_| BlockError::InvalidInputs)?;
            }

            fees = crate::transaction::check::tally_fees(tx, value_in, fees)
                .ok_or(BlockError::FeesOutOfRange)?;
        }

        let coinbase_value = self.block.transactions[0].outputs_value();
        let subsidy = subsidy::block_subsidy(self.height);
        if coinbase_value > subsidy as u128 + fees as u128 {
            return Err(BlockError::CoinbaseTooLarge);
        }

        Ok(())
    }

    /// The duplicate-hash rule for one transaction: if a confirmed
    /// transaction already has this hash, every one of its outputs must be
    /// spent.
    fn check_not_duplicate_or_spent(&self, tx: &Transaction) -> Result<(), BlockError> {
        let tx_hash = tx.hash();
        if !self.view.transaction_exists(&tx_hash) {
            return Ok(());
        }
        for output_index in 0..tx.outputs.len() {
            let outpoint = transparent::OutPoint {
                hash: tx_hash,
                index: output_index as u32,
            };
            if !self.view.is_output_spent(&outpoint) {
                return Err(BlockError::DuplicateOrSpent);
            }
        }
        Ok(())
    }

    /// Connect one input: fetch its parent output from the history, account
    /// its pay-to-script-hash signature operations, enforce value range,
    /// coinbase maturity and the script, and reject double spends.
    ///
    /// All failures collapse into a unit error; the caller reports them as
    /// failed input connection.
    fn connect_input(
        &self,
        tx: &Transaction,
        input_index: usize,
        value_in: &mut u64,
        total_sigops: &mut usize,
        spent_in_block: &mut HashSet<transparent::OutPoint>,
    ) -> Result<(), ()> {
        let input = &tx.inputs[input_index];
        let outpoint = input.outpoint;

        let (parent, parent_height) = self.view.transaction(&outpoint.hash).ok_or(())?;
        let parent_output = parent.outputs.get(outpoint.index as usize).ok_or(())?;

        // Signature operations count
        *total_sigops +=
            transparent::script_hash_sigop_count(&parent_output.lock_script, &input.unlock_script);
        if *total_sigops > MAX_BLOCK_SIGOPS {
            return Err(());
        }

        let output_value = parent_output.value;
        if output_value > MAX_MONEY {
            return Err(());
        }

        // Check coinbase maturity has been reached
        if parent.is_coinbase() {
            debug_assert!(
                parent_height <= self.height,
                "confirmed parents are below the block being connected"
            );
            let depth_difference = self.height.0.saturating_sub(parent_height.0);
            if depth_difference < COINBASE_MATURITY {
                return Err(());
            }
        }

        // Pay-to-script-hash evaluation switches on by header timestamp.
        let bip16_active = self.block.header.time
            >= Utc
                .timestamp_opt(BIP16_SWITCHOVER_TIMESTAMP, 0)
                .single()
                .expect("the switchover timestamp is representable");
        debug_assert!(
            !bip16_active || self.height >= BIP16_SWITCHOVER_HEIGHT,
            "headers past the switchover timestamp are above the switchover height"
        );

        if !self.engine.run(
            &parent_output.lock_script,
            &input.unlock_script,
            tx,
            input_index,
            bip16_active,
        ) {
            return Err(());
        }

        // Search for double spends: in the chain, and by this block's own
        // earlier inputs.
        if self.view.is_output_spent(&outpoint) || !spent_in_block.insert(outpoint) {
            return Err(());
        }

        *value_in = value_in.checked_add(output_value).ok_or(())?;
        if *value_in > MAX_MONEY {
            return Err(());
        }

        Ok(())
    }
}

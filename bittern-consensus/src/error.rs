//! Errors that can occur when checking consensus rules.
//!
//! Each error variant corresponds to a consensus rule, so enumerating
//! all possible verification failures enumerates the consensus rules we
//! implement, and ensures that we don't reject blocks or transactions
//! for a non-enumerated reason.

use thiserror::Error;

use bittern_chain::block;

use crate::BoxError;

/// A consensus rule rejection of a single transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// The transaction carries no inputs or no outputs.
    #[error("transaction has no inputs or no outputs")]
    Empty,

    /// An output value, or the running sum of output values, exceeds the
    /// money range.
    #[error("transaction output values are out of the money range")]
    OutputValueOverflow,

    /// A coinbase unlock script must serialize to between 2 and 100 bytes.
    #[error("coinbase transaction unlock script size is out of range")]
    InvalidCoinbaseScriptSize,

    /// Only coinbase transactions may reference the null outpoint.
    #[error("non-coinbase transaction input references the null outpoint")]
    PreviousOutputNull,

    /// Coinbase transactions only make sense inside blocks.
    #[error("coinbase transactions are not admitted to the mempool")]
    Coinbase,

    /// The transaction violates the local standardness policy.
    #[error("transaction is not standard")]
    NotStandard,

    /// The transaction is already known, in the mempool or in the chain.
    #[error("transaction already exists in the mempool or in the chain")]
    Duplicate,

    /// An input's previous output is already spent, in the chain or by
    /// another mempool transaction.
    #[error("transaction input is already spent")]
    DoubleSpend,

    /// An input references a parent transaction that is neither confirmed
    /// nor waiting in the mempool.
    #[error("transaction input {index} references an unknown parent transaction")]
    InputNotFound {
        /// The index of the offending input.
        index: u32,
    },

    /// An input failed to connect: a missing parent output, an out-of-range
    /// value, an immature coinbase spend, or a failing script.
    #[error("transaction inputs failed to connect")]
    InvalidInputs,
}

/// A consensus rule rejection of a block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// A transaction in the block failed a transaction-level rule.
    #[error("block contains an invalid transaction")]
    Transaction(#[from] TransactionError),

    /// The block has no transactions, too many transactions, or serializes
    /// to more than the maximum block size.
    #[error("block transaction count or serialized size is out of range")]
    SizeLimit,

    /// The header hash does not satisfy the difficulty threshold the header
    /// itself declares, or that threshold is malformed or too easy.
    #[error("block header hash does not satisfy its difficulty threshold")]
    InvalidProofOfWork,

    /// The header timestamp is more than two hours in the future of the
    /// validating node's clock.
    #[error("block timestamp is too far in the future")]
    TimeTooFarAhead,

    /// The first transaction in a block must be a coinbase transaction.
    #[error("first transaction must be coinbase")]
    CoinbasePosition,

    /// Only the first transaction in a block may be a coinbase transaction.
    #[error("coinbase transaction found after the first position")]
    CoinbaseAfterFirst,

    /// The block contains two transactions with the same hash.
    #[error("block contains duplicate transactions")]
    DuplicateTransaction,

    /// The block exceeds the signature-operation limit.
    #[error("block exceeds the signature operation limit")]
    TooManySigops,

    /// The header's merkle root does not commit to the block's
    /// transactions.
    #[error("block has mismatched merkle root")]
    BadMerkleRoot {
        /// The root computed from the block's transactions.
        actual: block::merkle::Root,
        /// The root the header commits to.
        expected: block::merkle::Root,
    },

    /// The header's difficulty threshold does not match the difficulty the
    /// retargeting rules require at this height.
    #[error("block difficulty threshold does not match the required difficulty")]
    WrongDifficulty,

    /// The header timestamp is not later than the median time of the
    /// preceding blocks.
    #[error("block timestamp is not past the median time of recent blocks")]
    TimeTooEarly,

    /// Every transaction in a block must be final at the block's height and
    /// time.
    #[error("block contains a non-final transaction")]
    NonFinalTransaction,

    /// The block hash must match the hard-coded checkpoint for its height.
    #[error("block hash does not match the checkpoint for its height")]
    CheckpointMismatch,

    /// The block repeats the hash of an earlier transaction that still has
    /// unspent outputs.
    #[error("block duplicates an earlier transaction that is not fully spent")]
    DuplicateOrSpent,

    /// A transaction's inputs failed to connect against the chain history.
    #[error("block transaction inputs failed to connect")]
    InvalidInputs,

    /// A transaction's input value is below its output value, or the
    /// accumulated fees left the money range.
    #[error("block transaction fees are out of range")]
    FeesOutOfRange,

    /// The coinbase transaction claims more than the block subsidy plus the
    /// block's transaction fees.
    #[error("coinbase transaction value is larger than the subsidy plus fees")]
    CoinbaseTooLarge,
}

/// An error while verifying a loose transaction for mempool admission.
///
/// Consensus rejections and chain-oracle failures are different conditions:
/// a rejected transaction stays rejected, while an oracle failure (for
/// example, a peer shutting down mid-query) says nothing about the
/// transaction itself.
#[derive(Error, Debug)]
pub enum VerifyTransactionError {
    /// The transaction violates a consensus rule.
    #[error(transparent)]
    Transaction {
        /// The specific rule violation.
        #[from]
        source: TransactionError,
    },

    /// The chain oracle failed while the transaction was being verified.
    ///
    /// The underlying error is propagated verbatim, so a shutdown error
    /// injected by the embedding peer survives a downcast.
    #[error("unable to query the chain state during transaction verification")]
    State {
        /// The oracle's error.
        source: BoxError,
    },
}

impl VerifyTransactionError {
    /// Was this a consensus rejection of the transaction?
    ///
    /// Callers that treat every consensus rejection uniformly branch on
    /// this instead of matching each rule variant. (Every [`BlockError`] is
    /// a consensus rejection, so blocks need no such predicate.)
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, VerifyTransactionError::Transaction { .. })
    }

    /// The consensus rejection, if this was one.
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            VerifyTransactionError::Transaction { source } => Some(source),
            VerifyTransactionError::State { .. } => None,
        }
    }
}

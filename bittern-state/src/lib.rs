//! Chain state interfaces for the Bittern consensus validation core.
//!
//! The validators never own chain storage. Instead they speak to two
//! oracles defined here:
//!
//!   - an asynchronous chain oracle, a [`tower::Service`] answering
//!     [`Request`]s with [`Response`]s, used by mempool transaction
//!     verification, and
//!   - [`ChainView`], a synchronous, logically frozen snapshot of the chain
//!     below a block being verified, used by block verification.
//!
//! Persistent storage is provided by the embedding peer; this crate only
//! ships [`in_memory`], an in-memory implementation of both interfaces.

#![allow(clippy::try_err)]

pub mod in_memory;

mod chain_view;

pub use chain_view::ChainView;

use std::sync::Arc;

use bittern_chain::{
    block,
    transaction::{self, Transaction},
    transparent,
};

/// A boxed [`std::error::Error`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A query about the best chain, asked of the asynchronous chain oracle.
///
/// "Not found" outcomes are not service errors: they are `None` payloads in
/// the matching [`Response`] variant. A service error means the oracle
/// itself failed (for example, because the peer is shutting down), and
/// callers propagate it verbatim.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    /// Returns [`Response::Tip`] with the current best chain tip.
    Tip,

    /// Looks up a transaction in the best chain by hash.
    ///
    /// Returns [`Response::Transaction`], with `None` if the transaction is
    /// not confirmed.
    Transaction(transaction::Hash),

    /// Looks up the confirmation height of a transaction by hash.
    ///
    /// Returns [`Response::TransactionHeight`], with `None` if the
    /// transaction is not confirmed.
    TransactionHeight(transaction::Hash),

    /// Asks whether a transparent output is already spent by a confirmed
    /// transaction.
    ///
    /// Returns [`Response::Spend`], with `None` if the output is unspent
    /// and the spender's hash otherwise.
    Spend(transparent::OutPoint),
}

/// A response to a chain oracle [`Request`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// The response to a `Tip` request.
    Tip(Option<(block::Height, block::Hash)>),

    /// The response to a `Transaction` request.
    Transaction(Option<Arc<Transaction>>),

    /// The response to a `TransactionHeight` request.
    TransactionHeight(Option<block::Height>),

    /// The response to a `Spend` request.
    Spend(Option<transaction::Hash>),
}

//! Consensus handling for Bittern.
//!
//! [`transaction::Verifier`] verifies loose transactions against the chain
//! oracle and a mempool snapshot, deciding mempool admission.
//!
//! [`block::BlockVerifier`] verifies a candidate block at a claimed height
//! against a frozen view of the chain below it, in three phases:
//! context-free checks, contextual acceptance, and full connection against
//! the transaction history.
//!
//! Transaction verification is provided via a `tower::Service`, to support
//! backpressure and batch verification; block verification is synchronous,
//! because its chain view never suspends.

#![warn(missing_docs)]
#![allow(clippy::try_err)]

pub mod block;
pub mod checkpoint;
pub mod error;
pub mod mempool;
pub mod parameters;
pub mod script;
pub mod transaction;

pub use block::BlockVerifier;
pub use checkpoint::CheckpointList;
pub use error::{BlockError, TransactionError, VerifyTransactionError};
pub use script::ScriptEngine;

/// A boxed [`std::error::Error`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

//! Transparent transfer functionality: outpoints, inputs, outputs, scripts.
#![allow(clippy::unit_arg)]

mod opcodes;
mod script;
mod serialize;

pub use script::{script_hash_sigop_count, Operation, Script, ScriptType};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

use crate::transaction;

/// OutPoint
///
/// A particular transaction output reference.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct OutPoint {
    /// References the transaction that contains the UTXO being spent.
    pub hash: transaction::Hash,

    /// Identifies which UTXO from that transaction is referenced; the
    /// first output is 0, etc.
    pub index: u32,
}

impl OutPoint {
    /// The null outpoint: an all-ones index and a zero hash.
    ///
    /// Only the single input of a coinbase transaction references the null
    /// outpoint.
    pub const NULL: OutPoint = OutPoint {
        hash: transaction::Hash([0; 32]),
        index: u32::MAX,
    };

    /// Returns true if this is the null outpoint.
    pub fn is_null(&self) -> bool {
        *self == OutPoint::NULL
    }
}

/// A transparent input to a transaction.
///
/// A coinbase input is an `Input` whose `outpoint` is the null outpoint; its
/// unlock script carries free data inserted by the miner instead of an
/// authorization.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// The previous output transaction reference.
    pub outpoint: OutPoint,
    /// The script that authorizes spending `outpoint`.
    pub unlock_script: Script,
    /// The sequence number for the output.
    pub sequence: u32,
}

/// A transparent output from a transaction.
///
/// The most fundamental building block of a transaction is a transaction
/// output -- the coins you own in your "wallet" are in fact a subset of
/// unspent transaction outputs (or "UTXO"s) of the global UTXO set.
///
/// UTXOs are indivisible, discrete units of value which can only be consumed
/// in their entirety. Thus, if I want to send you 1 BTC and I only own one
/// UTXO worth 2 BTC, I would construct a transaction that spends my UTXO and
/// sends 1 BTC to you and 1 BTC back to me (just like receiving change).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
pub struct Output {
    /// Transaction value, in satoshis.
    // At https://en.bitcoin.it/wiki/Protocol_documentation#tx, this is an i64.
    pub value: u64,

    /// The lock script defines the conditions under which this output can be
    /// spent.
    pub lock_script: Script,
}

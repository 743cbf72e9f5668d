//! Bitcoin script for Bittern.
//!
//! Bittern never executes scripts: execution is delegated to an external
//! engine. This module carries the analysis surface the consensus rules need
//! on their own: tokenization into operations, output classification, and
//! signature-operation counting.

use std::fmt;

use super::opcodes::*;

/// An encoding of a Bitcoin script.
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[cfg_attr(
    any(test, feature = "proptest-impl"),
    derive(proptest_derive::Arbitrary)
)]
pub struct Script(
    /// # Correctness
    ///
    /// Consensus-critical serialization uses [`BitcoinSerialize`][1].
    /// [`serde`]-based hex serialization must only be used for RPCs and
    /// testing.
    ///
    /// [1]: crate::serialization::BitcoinSerialize
    #[serde(with = "hex")]
    pub(super) Vec<u8>,
);

/// A tokenized script operation: an opcode, plus the data it pushes.
///
/// Non-push opcodes carry empty data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Operation {
    /// The raw opcode byte.
    pub opcode: u8,
    /// The pushed data, empty for non-push opcodes.
    pub data: Vec<u8>,
}

/// The classification of a lock script, as far as the consensus rules need
/// to distinguish.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScriptType {
    /// Pay-to-script-hash: `OP_HASH160 <20 bytes> OP_EQUAL`.
    ScriptHash,
    /// Pay-to-public-key-hash:
    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`.
    PublicKeyHash,
    /// Anything else.
    NonStandard,
}

impl Script {
    /// Create a new Bitcoin script from its raw bytes.
    /// The raw bytes must not contain the length prefix.
    pub fn new(raw_bytes: &[u8]) -> Self {
        Script(raw_bytes.to_vec())
    }

    /// Return the raw bytes of the script without the length prefix.
    ///
    /// # Correctness
    ///
    /// These raw bytes do not have a length prefix.
    /// The Bitcoin serialization format requires a length prefix; use
    /// `bitcoin_serialize` and `bitcoin_deserialize` to create byte data
    /// with a length prefix.
    pub fn as_raw_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Tokenize this script into a sequence of operations.
    ///
    /// Tokenization stops at a truncated push; the operations before it are
    /// still returned, matching how signature operations are counted for
    /// malformed scripts.
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::new();
        let bytes = &self.0;
        let mut i = 0;

        while i < bytes.len() {
            let opcode = bytes[i];
            i += 1;

            let push_len = match opcode {
                1..=MAX_DIRECT_PUSH => opcode as usize,
                OP_PUSHDATA1 => {
                    if i + 1 > bytes.len() {
                        return ops;
                    }
                    let len = bytes[i] as usize;
                    i += 1;
                    len
                }
                OP_PUSHDATA2 => {
                    if i + 2 > bytes.len() {
                        return ops;
                    }
                    let len = u16::from_le_bytes([bytes[i], bytes[i + 1]]) as usize;
                    i += 2;
                    len
                }
                OP_PUSHDATA4 => {
                    if i + 4 > bytes.len() {
                        return ops;
                    }
                    let len = u32::from_le_bytes([
                        bytes[i],
                        bytes[i + 1],
                        bytes[i + 2],
                        bytes[i + 3],
                    ]) as usize;
                    i += 4;
                    len
                }
                _ => 0,
            };

            if i + push_len > bytes.len() {
                return ops;
            }
            let data = bytes[i..i + push_len].to_vec();
            i += push_len;

            ops.push(Operation { opcode, data });
        }

        ops
    }

    /// Classify this script as a lock script.
    pub fn script_type(&self) -> ScriptType {
        let bytes = &self.0;

        if bytes.len() == 23
            && bytes[0] == OP_HASH160
            && bytes[1] == 0x14
            && bytes[22] == OP_EQUAL
        {
            return ScriptType::ScriptHash;
        }

        if bytes.len() == 25
            && bytes[0] == OP_DUP
            && bytes[1] == OP_HASH160
            && bytes[2] == 0x14
            && bytes[23] == OP_EQUALVERIFY
            && bytes[24] == OP_CHECKSIG
        {
            return ScriptType::PublicKeyHash;
        }

        ScriptType::NonStandard
    }

    /// Count the signature operations in this script.
    ///
    /// `OP_CHECKSIG` and `OP_CHECKSIGVERIFY` count as one.
    /// `OP_CHECKMULTISIG` and `OP_CHECKMULTISIGVERIFY` count as the last
    /// small integer (1..=16) pushed before them if `accurate` is set and
    /// one was pushed, and as 20 otherwise.
    pub fn sigop_count(&self, accurate: bool) -> usize {
        let mut total_sigs = 0;
        let mut last_number = 0;

        for op in self.operations() {
            match op.opcode {
                OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                    total_sigs += 1;
                }
                OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                    if accurate && last_number != 0 {
                        total_sigs += last_number;
                    } else {
                        total_sigs += 20;
                    }
                }
                _ => {}
            }
            if (OP_1..=OP_16).contains(&op.opcode) {
                last_number = (op.opcode - OP_1 + 1) as usize;
            }
        }

        total_sigs
    }
}

/// Count the signature operations in a spend, accounting for
/// pay-to-script-hash evaluation.
///
/// For a P2SH lock script, the operations that actually execute come from
/// the script carried in the unlock script's last push, so that script is
/// the one counted. Everything else counts the lock script directly, with
/// accurate multisig counting.
pub fn script_hash_sigop_count(lock_script: &Script, unlock_script: &Script) -> usize {
    if lock_script.script_type() != ScriptType::ScriptHash {
        return lock_script.sigop_count(true);
    }
    let operations = unlock_script.operations();
    match operations.last() {
        Some(last_push) => Script::new(&last_push.data).sigop_count(true),
        None => 0,
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Script")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

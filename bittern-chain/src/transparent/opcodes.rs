//! Script opcodes used by script analysis.
//!
//! Only the opcodes the consensus rules inspect are named here; script
//! execution itself is outside this crate.

/// The last single-byte direct data push.
pub const MAX_DIRECT_PUSH: u8 = 0x4b;

/// The next byte gives the push length.
pub const OP_PUSHDATA1: u8 = 0x4c;

/// The next two bytes (LE) give the push length.
pub const OP_PUSHDATA2: u8 = 0x4d;

/// The next four bytes (LE) give the push length.
pub const OP_PUSHDATA4: u8 = 0x4e;

/// Pushes the number 1 onto the stack.
pub const OP_1: u8 = 0x51;

/// Pushes the number 16 onto the stack.
pub const OP_16: u8 = 0x60;

/// Duplicates the top stack item. Used to recognize P2PKH outputs.
pub const OP_DUP: u8 = 0x76;

/// Byte-equality check. Used to recognize P2SH outputs.
pub const OP_EQUAL: u8 = 0x87;

/// Byte-equality check that fails the script. Used to recognize P2PKH
/// outputs.
pub const OP_EQUALVERIFY: u8 = 0x88;

/// RIPEMD160(SHA256(x)) hash. Used to recognize P2SH and P2PKH outputs.
pub const OP_HASH160: u8 = 0xa9;

/// Signature check.
pub const OP_CHECKSIG: u8 = 0xac;

/// Signature check that fails the script.
pub const OP_CHECKSIGVERIFY: u8 = 0xad;

/// Multiple signature check.
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Multiple signature check that fails the script.
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

//! Consensus-critical serialization.
//!
//! This module contains four traits: `BitcoinSerialize` and
//! `BitcoinDeserialize`, analogs of the Serde `Serialize` and `Deserialize`
//! traits but intended for the consensus-critical Bitcoin wire formats, and
//! `WriteBitcoinExt` and `ReadBitcoinExt`, extension traits for `io::Read`
//! and `io::Write` with utility functions for reading and writing data
//! (e.g., the Bitcoin variable-integer format).

mod bitcoin_deserialize;
mod bitcoin_serialize;
mod error;
mod read_bitcoin;
mod write_bitcoin;

pub mod sha256d;

pub use bitcoin_deserialize::{bitcoin_deserialize_bytes, BitcoinDeserialize};
pub use bitcoin_serialize::{bitcoin_serialize_bytes, BitcoinSerialize};
pub use error::SerializationError;
pub use read_bitcoin::ReadBitcoinExt;
pub use write_bitcoin::WriteBitcoinExt;

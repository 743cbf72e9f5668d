//! Consensus serialization for blocks and block headers.

use std::{io, sync::Arc};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{TimeZone, Utc};

use crate::serialization::{
    BitcoinDeserialize, BitcoinSerialize, ReadBitcoinExt, SerializationError,
};
use crate::transaction::Transaction;
use crate::work::difficulty::CompactDifficulty;

use super::{merkle, Block, Hash, Header};

/// The maximum serialized size of a block, in bytes.
///
/// This is a consensus rule: blocks serializing to more bytes are invalid.
/// It also bounds the transaction count of a valid block.
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

impl BitcoinSerialize for Header {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_all(&self.previous_block_hash.0)?;
        writer.write_all(&self.merkle_root.0)?;
        writer.write_u32::<LittleEndian>(self.time.timestamp() as u32)?;
        writer.write_u32::<LittleEndian>(self.difficulty_threshold.bits())?;
        writer.write_u32::<LittleEndian>(self.nonce)?;
        Ok(())
    }
}

impl BitcoinDeserialize for Header {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let version = reader.read_u32::<LittleEndian>()?;
        let previous_block_hash = Hash(reader.read_32_bytes()?);
        let merkle_root = merkle::Root(reader.read_32_bytes()?);
        let timestamp = reader.read_u32::<LittleEndian>()?;
        let time = Utc
            .timestamp_opt(timestamp as i64, 0)
            .single()
            .ok_or(SerializationError::Parse("out-of-range header timestamp"))?;
        let difficulty_threshold = CompactDifficulty::from_bits(reader.read_u32::<LittleEndian>()?);
        let nonce = reader.read_u32::<LittleEndian>()?;

        Ok(Header {
            version,
            previous_block_hash,
            merkle_root,
            time,
            difficulty_threshold,
            nonce,
        })
    }
}

impl BitcoinSerialize for Block {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.header.bitcoin_serialize(&mut writer)?;
        self.transactions.bitcoin_serialize(&mut writer)?;
        Ok(())
    }
}

impl BitcoinDeserialize for Block {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Block {
            header: Header::bitcoin_deserialize(&mut reader)?,
            transactions: Vec::<Arc<Transaction>>::bitcoin_deserialize(&mut reader)?,
        })
    }
}

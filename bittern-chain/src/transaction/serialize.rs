//! Consensus serialization for transactions.

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use crate::transparent;

use super::Transaction;

impl BitcoinSerialize for Transaction {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_u32::<LittleEndian>(self.version)?;
        self.inputs.bitcoin_serialize(&mut writer)?;
        self.outputs.bitcoin_serialize(&mut writer)?;
        writer.write_u32::<LittleEndian>(self.lock_time)?;
        Ok(())
    }
}

impl BitcoinDeserialize for Transaction {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Transaction {
            version: reader.read_u32::<LittleEndian>()?,
            inputs: Vec::<transparent::Input>::bitcoin_deserialize(&mut reader)?,
            outputs: Vec::<transparent::Output>::bitcoin_deserialize(&mut reader)?,
            lock_time: reader.read_u32::<LittleEndian>()?,
        })
    }
}

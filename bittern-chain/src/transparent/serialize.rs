//! Consensus serialization for transparent transfers.

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::serialization::{
    BitcoinDeserialize, BitcoinSerialize, ReadBitcoinExt, SerializationError,
};
use crate::transaction;

use super::{Input, OutPoint, Output, Script};

impl BitcoinSerialize for OutPoint {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_all(&self.hash.0)?;
        writer.write_u32::<LittleEndian>(self.index)?;
        Ok(())
    }
}

impl BitcoinDeserialize for OutPoint {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(OutPoint {
            hash: transaction::Hash(reader.read_32_bytes()?),
            index: reader.read_u32::<LittleEndian>()?,
        })
    }
}

impl BitcoinSerialize for Script {
    fn bitcoin_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        crate::serialization::bitcoin_serialize_bytes(&self.0, writer)
    }
}

impl BitcoinDeserialize for Script {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        crate::serialization::bitcoin_deserialize_bytes(reader).map(Script)
    }
}

impl BitcoinSerialize for Input {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.outpoint.bitcoin_serialize(&mut writer)?;
        self.unlock_script.bitcoin_serialize(&mut writer)?;
        writer.write_u32::<LittleEndian>(self.sequence)?;
        Ok(())
    }
}

impl BitcoinDeserialize for Input {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Input {
            outpoint: OutPoint::bitcoin_deserialize(&mut reader)?,
            unlock_script: Script::bitcoin_deserialize(&mut reader)?,
            sequence: reader.read_u32::<LittleEndian>()?,
        })
    }
}

impl BitcoinSerialize for Output {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_u64::<LittleEndian>(self.value)?;
        self.lock_script.bitcoin_serialize(&mut writer)?;
        Ok(())
    }
}

impl BitcoinDeserialize for Output {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Output {
            value: reader.read_u64::<LittleEndian>()?,
            lock_script: Script::bitcoin_deserialize(&mut reader)?,
        })
    }
}

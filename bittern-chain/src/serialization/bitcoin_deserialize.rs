use std::io;

use super::{ReadBitcoinExt, SerializationError};

/// Consensus-critical deserialization for Bitcoin.
///
/// This trait provides a generic deserialization for consensus-critical
/// formats, such as transactions and blocks. It is intended for use only in
/// consensus-critical contexts; in other contexts, such as internal storage,
/// it would be preferable to use Serde.
pub trait BitcoinDeserialize: Sized {
    /// Try to read `self` from the given `reader`.
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError>;
}

impl<T: BitcoinDeserialize> BitcoinDeserialize for Vec<T> {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = reader.read_compactsize()?;
        // The maximum block size bounds the element count of every
        // consensus-serialized vec, so a valid length always fits in memory.
        let len = usize::try_from(len)?;
        let mut vec = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            vec.push(T::bitcoin_deserialize(&mut reader)?);
        }
        Ok(vec)
    }
}

impl<T: BitcoinDeserialize> BitcoinDeserialize for std::sync::Arc<T> {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        T::bitcoin_deserialize(reader).map(std::sync::Arc::new)
    }
}

/// Read a compactsize-prefixed byte string.
pub fn bitcoin_deserialize_bytes<R: io::Read>(
    mut reader: R,
) -> Result<Vec<u8>, SerializationError> {
    let len = reader.read_compactsize()?;
    let len = usize::try_from(len)?;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

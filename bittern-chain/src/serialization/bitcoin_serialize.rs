use std::io;

use super::WriteBitcoinExt;

/// Consensus-critical serialization for Bitcoin.
///
/// This trait provides a generic serialization for consensus-critical
/// formats, such as transactions and blocks. It is intended for use only in
/// consensus-critical contexts; in other contexts, such as internal storage,
/// it would be preferable to use Serde.
pub trait BitcoinSerialize: Sized {
    /// Write `self` to the given `writer` using the canonical format.
    ///
    /// This function has a `bitcoin_` prefix to alert the reader that the
    /// serialization in use is consensus-critical serialization, rather than
    /// some other kind of serialization.
    ///
    /// Notice that the error type is [`std::io::Error`]; this indicates that
    /// serialization MUST be infallible up to errors in the underlying
    /// writer. In other words, any type implementing `BitcoinSerialize` must
    /// make illegal states unrepresentable.
    fn bitcoin_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error>;

    /// Helper function to construct a vec to serialize the current struct into
    fn bitcoin_serialize_to_vec(&self) -> Result<Vec<u8>, io::Error> {
        let mut data = Vec::new();
        self.bitcoin_serialize(&mut data)?;
        Ok(data)
    }

    /// Return the size of `self` in its canonical format, without
    /// serializing it into a buffer.
    fn bitcoin_serialized_size(&self) -> usize {
        let mut writer = CountingWriter::default();
        self.bitcoin_serialize(&mut writer)
            .expect("writes to a counting writer are infallible");
        writer.len
    }
}

impl<T: BitcoinSerialize> BitcoinSerialize for Vec<T> {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_compactsize(self.len() as u64)?;
        for x in self {
            x.bitcoin_serialize(&mut writer)?;
        }
        Ok(())
    }
}

impl<T: BitcoinSerialize> BitcoinSerialize for std::sync::Arc<T> {
    fn bitcoin_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        self.as_ref().bitcoin_serialize(writer)
    }
}

/// Serialize a byte slice as a compactsize-prefixed byte string.
pub fn bitcoin_serialize_bytes<W: io::Write>(
    bytes: &[u8],
    mut writer: W,
) -> Result<(), io::Error> {
    writer.write_compactsize(bytes.len() as u64)?;
    writer.write_all(bytes)
}

/// An `io::Write` that only measures the data written through it.
#[derive(Default)]
struct CountingWriter {
    len: usize,
}

impl io::Write for CountingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.len += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

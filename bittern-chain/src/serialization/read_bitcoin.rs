use std::io;

use byteorder::{LittleEndian, ReadBytesExt};

use super::SerializationError;

/// Extends [`io::Read`] with methods for reading Bitcoin types.
pub trait ReadBitcoinExt: io::Read {
    /// Read a Bitcoin-encoded variable-length integer ("compactsize").
    ///
    /// Non-canonical encodings (a longer form than the value requires) are
    /// rejected, because the consensus formats require the shortest form.
    #[inline]
    fn read_compactsize(&mut self) -> Result<u64, SerializationError> {
        let flag_byte = self.read_u8()?;
        match flag_byte {
            n @ 0x00..=0xfc => Ok(n as u64),
            0xfd => {
                let n = self.read_u16::<LittleEndian>()?;
                if n < 0xfd {
                    return Err(SerializationError::Parse("non-canonical compactsize"));
                }
                Ok(n as u64)
            }
            0xfe => {
                let n = self.read_u32::<LittleEndian>()?;
                if n <= 0xffff {
                    return Err(SerializationError::Parse("non-canonical compactsize"));
                }
                Ok(n as u64)
            }
            0xff => {
                let n = self.read_u64::<LittleEndian>()?;
                if n <= 0xffff_ffff {
                    return Err(SerializationError::Parse("non-canonical compactsize"));
                }
                Ok(n)
            }
        }
    }

    /// Convenience method to read a `[u8; 32]`.
    #[inline]
    fn read_32_bytes(&mut self) -> io::Result<[u8; 32]> {
        let mut bytes = [0; 32];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

/// Mark all types implementing `Read` as implementing the extension.
impl<R: io::Read + ?Sized> ReadBitcoinExt for R {}

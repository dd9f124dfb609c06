use std::io::{Read, Seek, SeekFrom};

use crate::error::ExfatError;

/// A random-access byte source backing an exFAT image.
///
/// The volume reader owns one of these and every walker borrows it
/// transiently. Any `Read + Seek` implementor (a file, an in-memory cursor)
/// qualifies.
pub trait ReadSeek: Read + Seek {
    /// Fills `buffer` completely from the current position.
    ///
    /// A short read is never returned; running out of bytes surfaces as
    /// [`ExfatError::Truncated`].
    fn fill(&mut self, buffer: &mut [u8]) -> Result<(), ExfatError> {
        self.read_exact(buffer).map_err(ExfatError::from_read)
    }

    /// Seeks forward by `count` bytes relative to the current position.
    fn skip(&mut self, count: u64) -> Result<(), ExfatError> {
        let count = i64::try_from(count).map_err(|_| ExfatError::OffsetOverflow)?;
        self.seek(SeekFrom::Current(count))?;
        Ok(())
    }

    /// Seeks to the absolute byte offset `offset`.
    fn seek_to(&mut self, offset: u64) -> Result<(), ExfatError> {
        self.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Reads and throws away `count` bytes.
    ///
    /// Unlike [`ReadSeek::skip`], a source that ends before `count` bytes
    /// were consumed surfaces as [`ExfatError::Truncated`].
    fn discard(&mut self, mut count: u64) -> Result<(), ExfatError> {
        let mut scratch = [0u8; 4096];
        while count > 0 {
            let take = count.min(scratch.len() as u64) as usize;
            self.fill(&mut scratch[..take])?;
            count -= take as u64;
        }
        Ok(())
    }

    /// Returns the current absolute byte offset.
    fn position(&mut self) -> Result<u64, ExfatError> {
        Ok(self.stream_position()?)
    }
}

impl<T: Read + Seek> ReadSeek for T {}

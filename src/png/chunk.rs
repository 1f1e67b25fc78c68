//! PNG chunk stream walking.

use crate::error::{Error, Result};

/// PNG file signature (magic bytes).
pub const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// A single chunk, borrowing its payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Four ASCII type bytes, e.g. `IHDR`.
    pub kind: [u8; 4],
    /// The chunk payload.
    pub data: &'a [u8],
    /// The trailing CRC-32, read but not validated.
    pub crc: u32,
}

/// Walks the chunk sequence of a PNG byte stream.
///
/// Construction validates the eight signature bytes; iteration then yields
/// chunks in file order until IEND or until the input runs out. A chunk cut
/// short by the end of the buffer fails with [`Error::TruncatedStream`].
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> ChunkReader<'a> {
    /// Check the signature and position the walker at the first chunk.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < SIGNATURE.len() || data[..SIGNATURE.len()] != SIGNATURE {
            return Err(Error::BadSignature);
        }
        Ok(Self {
            data,
            pos: SIGNATURE.len(),
            done: false,
        })
    }

    /// The next chunk, or `None` after IEND or at the end of the input.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk<'a>>> {
        if self.done || self.pos == self.data.len() {
            return Ok(None);
        }
        if self.pos + 12 > self.data.len() {
            return Err(Error::TruncatedStream);
        }

        let length = u32::from_be_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ]) as usize;
        let data_start = self.pos + 8;
        let crc_start = data_start
            .checked_add(length)
            .ok_or(Error::TruncatedStream)?;
        let end = crc_start + 4;
        if end > self.data.len() {
            return Err(Error::TruncatedStream);
        }

        let kind = [
            self.data[self.pos + 4],
            self.data[self.pos + 5],
            self.data[self.pos + 6],
            self.data[self.pos + 7],
        ];
        let chunk = Chunk {
            kind,
            data: &self.data[data_start..crc_start],
            crc: u32::from_be_bytes([
                self.data[crc_start],
                self.data[crc_start + 1],
                self.data[crc_start + 2],
                self.data[crc_start + 3],
            ]),
        };

        self.pos = end;
        if kind == *b"IEND" {
            self.done = true;
        }
        Ok(Some(chunk))
    }
}

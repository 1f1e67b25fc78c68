//! Canonical Huffman decode tables.
//!
//! A table is a flat array of `1 << max_bits` entries, so a single peek of
//! `max_bits` bits resolves any code word in O(1). Each populated slot holds
//! the decoded symbol and the true bit length of its code; empty slots are
//! forward-filled with the previous populated entry, so a peek whose prefix
//! is a valid code always lands on that code's entry or on a sibling slot
//! carrying the same (symbol, length). [`HuffmanTable::invert_bits`]
//! permutes the table by bit reversal so the LSB-first DEFLATE reader can
//! index it without reversing each peek.

use crate::bits::BitReader;
use crate::error::{Error, Result};

/// Maximum code length for DEFLATE Huffman codes.
pub const MAX_BITS: u8 = 15;

/// A decoded symbol and the true bit length of its code word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Code {
    /// The alphabet symbol this code word maps to.
    pub symbol: u16,
    /// Length of the code word in bits; 0 marks an unassigned slot.
    pub bits: u8,
}

/// Canonical Huffman lookup table built from per-symbol code lengths.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    codes: Vec<Code>,
    max_bits: u8,
}

impl HuffmanTable {
    /// Build a table from a code-length vector, one length per alphabet
    /// symbol in symbol order; length 0 means the symbol is absent.
    ///
    /// Codes are assigned per RFC 1951 section 3.2.2: lexicographically
    /// smallest code first within each length, lengths ascending.
    /// Oversubscribed length vectors fail with [`Error::MalformedHuffman`].
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        let max_bits = lengths.iter().copied().max().unwrap_or(0);
        if max_bits > MAX_BITS {
            return Err(Error::MalformedHuffman(format!(
                "code length {max_bits} exceeds {MAX_BITS} bits"
            )));
        }
        if max_bits == 0 {
            // No symbols at all; any decode against this table fails.
            return Ok(Self {
                codes: vec![Code::default()],
                max_bits: 0,
            });
        }

        let mut length_count = [0u32; MAX_BITS as usize + 1];
        for &len in lengths {
            length_count[usize::from(len)] += 1;
        }
        length_count[0] = 0;

        // Smallest code of each length.
        let mut next_code = [0u32; MAX_BITS as usize + 1];
        let mut code = 0u32;
        for bits in 1..=usize::from(max_bits) {
            code = (code + length_count[bits - 1]) << 1;
            next_code[bits] = code;
            if code + length_count[bits] > 1 << bits {
                return Err(Error::MalformedHuffman(format!(
                    "oversubscribed code lengths at {bits} bits"
                )));
            }
        }

        let mut codes = vec![Code::default(); 1 << max_bits];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let code = next_code[usize::from(len)];
            next_code[usize::from(len)] += 1;
            codes[(code << (max_bits - len)) as usize] = Code {
                symbol: symbol as u16,
                bits: len,
            };
        }

        // Forward-fill: short codes own every slot sharing their prefix.
        let mut last = codes[0];
        for slot in codes.iter_mut() {
            if slot.bits == 0 {
                *slot = last;
            } else {
                last = *slot;
            }
        }

        Ok(Self { codes, max_bits })
    }

    /// Width of the peek this table expects, in bits.
    pub fn max_bits(&self) -> u8 {
        self.max_bits
    }

    /// A copy of the table permuted by bit reversal, indexable by an
    /// LSB-first peek of `max_bits` bits.
    pub fn invert_bits(&self) -> Self {
        if self.max_bits == 0 {
            return self.clone();
        }
        let mut codes = vec![Code::default(); self.codes.len()];
        for (index, &code) in self.codes.iter().enumerate() {
            codes[usize::from(reverse_bits(index as u16, self.max_bits))] = code;
        }
        Self {
            codes,
            max_bits: self.max_bits,
        }
    }

    fn entry(&self, peek: u16) -> Code {
        self.codes[usize::from(peek) & (self.codes.len() - 1)]
    }

    /// Decode one symbol: peek `max_bits` bits, look up the slot, then
    /// advance the reader by the entry's true code length.
    ///
    /// The table must have been [inverted](HuffmanTable::invert_bits) to
    /// match the reader's LSB-first bit order.
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        if self.max_bits == 0 {
            return Err(Error::MalformedHuffman("empty alphabet".into()));
        }
        let code = self.entry(reader.peek_bits(self.max_bits));
        if code.bits == 0 {
            return Err(Error::MalformedHuffman("unassigned code word".into()));
        }
        reader.advance(code.bits)?;
        Ok(code.symbol)
    }
}

/// Reverse the low `width` bits of `value`.
fn reverse_bits(value: u16, width: u8) -> u16 {
    value.reverse_bits() >> (16 - width)
}

//! zlib-framed DEFLATE decompression (RFC 1950 / RFC 1951).
//!
//! Consumes the concatenated IDAT payload of a PNG and emits the filtered
//! scanline stream. Handles stored, fixed-Huffman, and dynamic-Huffman
//! blocks, including the code-length alphabet used to transmit dynamic
//! tables. The ADLER32 trailer is left unread.

use crate::bits::BitReader;
use crate::error::{Error, Result};
use crate::huffman::HuffmanTable;

/// Length code base values (codes 257-285).
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Extra bits for length codes.
const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance code base values (codes 0-29).
const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits for distance codes.
const DISTANCE_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Transmission order of the code-length alphabet (RFC 1951 section 3.2.7).
const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// The static literal/length table: lengths 8 for 0-143, 9 for 144-255,
/// 7 for 256-279, 8 for 280-287.
fn fixed_literal_table() -> Result<HuffmanTable> {
    let mut lengths = [0u8; 288];
    lengths[..144].fill(8);
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths[280..].fill(8);
    Ok(HuffmanTable::from_lengths(&lengths)?.invert_bits())
}

/// The static distance table: all 30 symbols at 5 bits.
fn fixed_distance_table() -> Result<HuffmanTable> {
    Ok(HuffmanTable::from_lengths(&[5u8; 30])?.invert_bits())
}

/// Inflate a zlib-framed DEFLATE stream.
///
/// `size_hint` pre-sizes the output buffer when the decompressed length is
/// known up front, as it is for PNG scanline data.
pub fn inflate_zlib(data: &[u8], size_hint: Option<usize>) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(data);

    let cm = reader.read_bits(4)?;
    let cinfo = reader.read_bits(4)?;
    if cm != 8 {
        return Err(Error::UnsupportedZlib(format!("compression method {cm}")));
    }
    if cinfo > 7 {
        return Err(Error::UnsupportedZlib(format!("window size {cinfo}")));
    }

    let fcheck = reader.read_bits(5)?;
    let fdict = reader.read_bits(1)?;
    let flevel = reader.read_bits(2)?;
    if fdict != 0 {
        return Err(Error::UnsupportedZlib("preset dictionary".into()));
    }
    let cmf = (cinfo << 4) | cm;
    let flg = (flevel << 6) | (fdict << 5) | fcheck;
    if ((u32::from(cmf) << 8) | u32::from(flg)) % 31 != 0 {
        return Err(Error::UnsupportedZlib("header check failed".into()));
    }

    let mut output = Vec::with_capacity(size_hint.unwrap_or(data.len().saturating_mul(4)));
    loop {
        let bfinal = reader.read_bits(1)?;
        let btype = reader.read_bits(2)?;
        match btype {
            0 => inflate_stored(&mut reader, &mut output)?,
            1 => {
                let literal = fixed_literal_table()?;
                let distance = fixed_distance_table()?;
                inflate_block(&mut reader, &mut output, &literal, &distance)?;
            }
            2 => {
                let (literal, distance) = read_dynamic_tables(&mut reader)?;
                inflate_block(&mut reader, &mut output, &literal, &distance)?;
            }
            _ => return Err(Error::MalformedBlock("reserved block type".into())),
        }
        if bfinal == 1 {
            break;
        }
    }
    // The four ADLER32 trailer bytes stay unread.
    Ok(output)
}

/// Copy a stored block verbatim.
fn inflate_stored(reader: &mut BitReader<'_>, output: &mut Vec<u8>) -> Result<()> {
    reader.align_to_byte();

    let len = reader.read_bits(16)?;
    let nlen = reader.read_bits(16)?;
    if len != !nlen {
        return Err(Error::MalformedBlock("stored block LEN/NLEN mismatch".into()));
    }

    output.extend_from_slice(reader.read_bytes(usize::from(len))?);
    Ok(())
}

/// Read the HLIT/HDIST/HCLEN header of a dynamic block and build its
/// literal/length and distance tables, both inverted to LSB-first form.
fn read_dynamic_tables(reader: &mut BitReader<'_>) -> Result<(HuffmanTable, HuffmanTable)> {
    let hlit = usize::from(reader.read_bits(5)?) + 257;
    let hdist = usize::from(reader.read_bits(5)?) + 1;
    let hclen = usize::from(reader.read_bits(4)?) + 4;

    let mut code_lengths = [0u8; 19];
    for &slot in CODE_LENGTH_ORDER.iter().take(hclen) {
        code_lengths[slot] = reader.read_bits(3)? as u8;
    }
    let code_table = HuffmanTable::from_lengths(&code_lengths)?.invert_bits();

    // One combined vector; the first HLIT entries describe the
    // literal/length alphabet and the rest the distance alphabet.
    let mut lengths = vec![0u8; hlit + hdist];
    let mut filled = 0;
    while filled < lengths.len() {
        let symbol = code_table.decode(reader)?;
        match symbol {
            0..=15 => {
                lengths[filled] = symbol as u8;
                filled += 1;
            }
            16 => {
                if filled == 0 {
                    return Err(Error::MalformedHuffman("repeat with no previous length".into()));
                }
                let repeat = usize::from(reader.read_bits(2)?) + 3;
                if filled + repeat > lengths.len() {
                    return Err(Error::MalformedHuffman("repeat past end of alphabet".into()));
                }
                let previous = lengths[filled - 1];
                lengths[filled..filled + repeat].fill(previous);
                filled += repeat;
            }
            17 => {
                let repeat = usize::from(reader.read_bits(3)?) + 3;
                if filled + repeat > lengths.len() {
                    return Err(Error::MalformedHuffman("repeat past end of alphabet".into()));
                }
                filled += repeat;
            }
            18 => {
                let repeat = usize::from(reader.read_bits(7)?) + 11;
                if filled + repeat > lengths.len() {
                    return Err(Error::MalformedHuffman("repeat past end of alphabet".into()));
                }
                filled += repeat;
            }
            _ => {
                return Err(Error::MalformedHuffman(format!(
                    "code-length symbol {symbol}"
                )))
            }
        }
    }

    let literal = HuffmanTable::from_lengths(&lengths[..hlit])?.invert_bits();
    let distance = HuffmanTable::from_lengths(&lengths[hlit..])?.invert_bits();
    Ok((literal, distance))
}

/// The literal/length/distance loop shared by fixed and dynamic blocks.
fn inflate_block(
    reader: &mut BitReader<'_>,
    output: &mut Vec<u8>,
    literal: &HuffmanTable,
    distance: &HuffmanTable,
) -> Result<()> {
    loop {
        let symbol = literal.decode(reader)?;
        match symbol {
            0..=255 => output.push(symbol as u8),
            256 => break,
            257..=285 => {
                let index = usize::from(symbol - 257);
                let length = usize::from(LENGTH_BASE[index])
                    + usize::from(reader.read_bits(LENGTH_EXTRA[index])?);

                let symbol = distance.decode(reader)?;
                if usize::from(symbol) >= DISTANCE_BASE.len() {
                    return Err(Error::BadBackReference(format!("distance symbol {symbol}")));
                }
                let index = usize::from(symbol);
                let dist = usize::from(DISTANCE_BASE[index])
                    + usize::from(reader.read_bits(DISTANCE_EXTRA[index])?);
                if dist > output.len() {
                    return Err(Error::BadBackReference(format!(
                        "distance {dist} with only {} bytes of output",
                        output.len()
                    )));
                }

                // Byte-by-byte on purpose: with dist < length the tail of
                // the run reads bytes written earlier in the same run.
                let start = output.len() - dist;
                for i in 0..length {
                    let byte = output[start + i];
                    output.push(byte);
                }
            }
            _ => {
                return Err(Error::BadBackReference(format!(
                    "literal/length symbol {symbol}"
                )))
            }
        }
    }
    Ok(())
}

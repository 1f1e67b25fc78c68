//! Synthetic PNG generation.
//!
//! The decoder has no sibling encoder, so tests assemble files by hand:
//! pack samples into scanlines, filter them, deflate with the reference
//! zlib implementation, and wrap everything in chunks with real CRCs so
//! the files also satisfy stricter reference decoders.

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

pub use unpng::png::chunk::SIGNATURE;

/// CRC-32/ISO-HDLC over chunk type + payload, byte at a time.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

/// Write a PNG chunk (length, type, data, CRC32) to the output buffer.
pub fn write_chunk(output: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    let mut crc_data = Vec::with_capacity(4 + data.len());
    crc_data.extend_from_slice(chunk_type);
    crc_data.extend_from_slice(data);

    output.extend_from_slice(&(data.len() as u32).to_be_bytes());
    output.extend_from_slice(chunk_type);
    output.extend_from_slice(data);
    output.extend_from_slice(&crc32(&crc_data).to_be_bytes());
}

/// The 13-byte IHDR payload.
pub fn ihdr_payload(width: u32, height: u32, depth: u8, color_type: u8, interlace: u8) -> Vec<u8> {
    let mut payload = Vec::with_capacity(13);
    payload.extend_from_slice(&width.to_be_bytes());
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(&[depth, color_type, 0, 0, interlace]);
    payload
}

/// Deflate with the reference encoder, default level.
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Assemble a complete PNG file around a pre-filtered scanline stream.
pub fn build_png(
    width: u32,
    height: u32,
    depth: u8,
    color_type: u8,
    interlace: u8,
    filtered: &[u8],
    plte: Option<&[u8]>,
    trns: Option<&[u8]>,
) -> Vec<u8> {
    let mut png = SIGNATURE.to_vec();
    write_chunk(
        &mut png,
        b"IHDR",
        &ihdr_payload(width, height, depth, color_type, interlace),
    );
    if let Some(plte) = plte {
        write_chunk(&mut png, b"PLTE", plte);
    }
    if let Some(trns) = trns {
        write_chunk(&mut png, b"tRNS", trns);
    }
    write_chunk(&mut png, b"IDAT", &zlib(filtered));
    write_chunk(&mut png, b"IEND", &[]);
    png
}

/// Prefix every `row_bytes`-sized scanline with filter byte 0.
pub fn stream_unfiltered(raw: &[u8], row_bytes: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + raw.len() / row_bytes.max(1) + 1);
    for row in raw.chunks(row_bytes) {
        out.push(0);
        out.extend_from_slice(row);
    }
    out
}

/// Forward-filter one scanline, returning the filter byte plus the
/// filtered bytes. Inverse of the decoder's reconstruction.
pub fn filter_row(filter: u8, row: &[u8], prev: &[u8], bpp: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(row.len() + 1);
    out.push(filter);
    for i in 0..row.len() {
        let a = if i >= bpp { row[i - bpp] } else { 0 };
        let b = prev[i];
        let c = if i >= bpp { prev[i - bpp] } else { 0 };
        let predicted = match filter {
            0 => 0,
            1 => a,
            2 => b,
            3 => ((u16::from(a) + u16::from(b)) / 2) as u8,
            4 => paeth(a, b, c),
            other => panic!("filter {other}"),
        };
        out.push(row[i].wrapping_sub(predicted));
    }
    out
}

/// Filter a whole image, picking the filter per row from `filters`
/// (cycled when shorter than the image).
pub fn filter_image(raw: &[u8], row_bytes: usize, bpp: usize, filters: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut prev = vec![0u8; row_bytes];
    for (y, row) in raw.chunks(row_bytes).enumerate() {
        out.extend_from_slice(&filter_row(filters[y % filters.len()], row, &prev, bpp));
        prev = row.to_vec();
    }
    out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i32::from(a) + i32::from(b) - i32::from(c);
    let pa = (p - i32::from(a)).abs();
    let pb = (p - i32::from(b)).abs();
    let pc = (p - i32::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Pack one sample per entry into a bit-packed row, MSB first.
pub fn pack_bits(samples: &[u8], depth: u8) -> Vec<u8> {
    assert!(matches!(depth, 1 | 2 | 4));
    let per_byte = 8 / usize::from(depth);
    let mut out = vec![0u8; samples.len().div_ceil(per_byte)];
    for (i, &sample) in samples.iter().enumerate() {
        let shift = 8 - usize::from(depth) * (i % per_byte + 1);
        out[i / per_byte] |= (sample & ((1 << depth) - 1)) << shift;
    }
    out
}

/// Adam7 pass origins and strides, used to interleave test images the way
/// an encoder would.
pub const ADAM7: [(usize, usize, usize, usize); 7] = [
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2),
];

fn pass_extent(extent: usize, start: usize, stride: usize) -> usize {
    if extent > start {
        (extent - start).div_ceil(stride)
    } else {
        0
    }
}

/// Interleave a byte-aligned image (`sample_bytes` per pixel) into the
/// seven-pass Adam7 stream, every row filtered with None.
pub fn adam7_stream(raw: &[u8], width: usize, height: usize, sample_bytes: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for (start_col, start_row, col_stride, row_stride) in ADAM7 {
        let pass_width = pass_extent(width, start_col, col_stride);
        let pass_height = pass_extent(height, start_row, row_stride);
        for y in 0..pass_height {
            out.push(0);
            for x in 0..pass_width {
                let col = start_col + x * col_stride;
                let row = start_row + y * row_stride;
                let i = (row * width + col) * sample_bytes;
                out.extend_from_slice(&raw[i..i + sample_bytes]);
            }
        }
    }
    out
}

/// Interleave a one-channel sub-byte image into the Adam7 stream, packing
/// each pass row independently.
pub fn adam7_stream_packed(samples: &[u8], width: usize, height: usize, depth: u8) -> Vec<u8> {
    let mut out = Vec::new();
    for (start_col, start_row, col_stride, row_stride) in ADAM7 {
        let pass_width = pass_extent(width, start_col, col_stride);
        let pass_height = pass_extent(height, start_row, row_stride);
        for y in 0..pass_height {
            let row: Vec<u8> = (0..pass_width)
                .map(|x| samples[(start_row + y * row_stride) * width + start_col + x * col_stride])
                .collect();
            out.push(0);
            out.extend_from_slice(&pack_bits(&row, depth));
        }
    }
    out
}

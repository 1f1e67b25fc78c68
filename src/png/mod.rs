//! PNG decoding.
//!
//! [`decode`] walks the chunk stream, inflates the concatenated IDAT
//! payload, and runs the pixel pipeline, yielding an 8-bit RGBA raster
//! regardless of the source bit depth and color type.

pub mod chunk;
pub mod header;
mod pixels;

use crate::error::{Error, Result};
use crate::inflate::inflate_zlib;
use chunk::ChunkReader;
use header::{ColorType, ImageInfo};
use pixels::{Palette, TransparentKey};

/// A decoded image: 8-bit RGBA, row-major, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes in R, G, B, A order. Alpha is 255
    /// wherever the source specified none.
    pub data: Vec<u8>,
}

/// Decode a PNG byte stream into 8-bit RGBA pixels.
///
/// IHDR, IDAT, and IEND are always honoured; PLTE feeds indexed color and
/// tRNS feeds transparency for color types 0, 2, and 3. Other chunk types
/// are skipped. Chunk CRCs and the zlib ADLER32 trailer are not verified.
pub fn decode(data: &[u8]) -> Result<Image> {
    let mut chunks = ChunkReader::new(data)?;

    let mut info: Option<ImageInfo> = None;
    let mut idat: Vec<u8> = Vec::new();
    let mut palette: Option<Palette> = None;
    let mut trns: Option<&[u8]> = None;

    let mut first = true;
    while let Some(chunk) = chunks.next_chunk()? {
        if first {
            if &chunk.kind != b"IHDR" {
                return Err(Error::BadHeader("first chunk is not IHDR".into()));
            }
            first = false;
        }
        match &chunk.kind {
            b"IHDR" => {
                if info.is_none() {
                    info = Some(ImageInfo::parse(chunk.data)?);
                }
            }
            b"PLTE" => palette = Some(Palette::from_plte(chunk.data)),
            b"tRNS" => trns = Some(chunk.data),
            b"IDAT" => idat.extend_from_slice(chunk.data),
            b"IEND" => {}
            _ => {
                // Ancillary and unknown chunk types are skipped.
            }
        }
    }

    let info = info.ok_or_else(|| Error::BadHeader("missing IHDR".into()))?;
    if idat.is_empty() {
        return Err(Error::TruncatedStream);
    }

    // tRNS means a per-index alpha table for indexed color and a
    // transparent source color for gray and truecolor; images that already
    // carry an alpha channel cannot have one.
    let mut key: Option<TransparentKey> = None;
    if let Some(payload) = trns {
        match info.color_type {
            ColorType::Indexed => {
                if let Some(palette) = palette.as_mut() {
                    palette.apply_trns(payload);
                }
            }
            ColorType::Grayscale => key = Some(TransparentKey::gray(payload)?),
            ColorType::Rgb => key = Some(TransparentKey::rgb(payload)?),
            ColorType::GrayscaleAlpha | ColorType::Rgba => {}
        }
    }

    let expected = pixels::filtered_stream_len(&info)
        .ok_or_else(|| Error::BadHeader("image dimensions overflow".into()))?;
    let raw = inflate_zlib(&idat, Some(expected))?;
    let data = pixels::assemble(&info, &raw, palette.as_ref(), key.as_ref())?;

    Ok(Image {
        width: info.width,
        height: info.height,
        data,
    })
}

/// Read a complete PNG from `reader` and decode it.
///
/// Convenience wrapper over [`decode`] for callers holding a stream rather
/// than a byte slice; read failures surface as [`Error::TruncatedStream`].
pub fn decode_from_reader<R: std::io::Read>(reader: &mut R) -> Result<Image> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|_| Error::TruncatedStream)?;
    decode(&bytes)
}

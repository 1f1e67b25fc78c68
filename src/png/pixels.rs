//! Scanline filter reversal and pixel assembly.
//!
//! Takes the inflated IDAT stream and produces the final RGBA raster in a
//! single oversized buffer: pass rows are unfiltered and scattered into a
//! narrow layout of one unpacked sample per byte group, 16-bit samples are
//! truncated to their high byte, and the narrow layout is then expanded to
//! four bytes per pixel in place. The expansion walks from the back because
//! the write cursor runs ahead of the read cursor.

use super::header::{ColorType, ImageInfo, Interlace};
use crate::error::{Error, Result};

/// Palette tables for indexed color, one entry per possible index.
/// Alpha defaults to opaque and is overwritten from tRNS when present.
pub(crate) struct Palette {
    red: [u8; 256],
    green: [u8; 256],
    blue: [u8; 256],
    alpha: [u8; 256],
}

impl Palette {
    /// Populate the color tables from a PLTE payload of RGB triplets.
    /// Entries beyond the payload stay black; extra payload is ignored.
    pub(crate) fn from_plte(data: &[u8]) -> Self {
        let mut palette = Self {
            red: [0; 256],
            green: [0; 256],
            blue: [0; 256],
            alpha: [0xFF; 256],
        };
        for (i, rgb) in data.chunks_exact(3).take(256).enumerate() {
            palette.red[i] = rgb[0];
            palette.green[i] = rgb[1];
            palette.blue[i] = rgb[2];
        }
        palette
    }

    /// Overwrite leading alpha entries from a tRNS payload.
    pub(crate) fn apply_trns(&mut self, data: &[u8]) {
        for (alpha, &value) in self.alpha.iter_mut().zip(data) {
            *alpha = value;
        }
    }
}

/// A source color that decodes as fully transparent, for color types 0
/// and 2. Values are 16 bits per channel regardless of sample depth.
pub(crate) enum TransparentKey {
    /// Gray level from a grayscale tRNS chunk.
    Gray(u16),
    /// RGB triple from a truecolor tRNS chunk.
    Rgb(u16, u16, u16),
}

impl TransparentKey {
    /// Parse the 2-byte grayscale tRNS payload.
    pub(crate) fn gray(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(Error::TruncatedStream);
        }
        Ok(Self::Gray(u16::from_be_bytes([data[0], data[1]])))
    }

    /// Parse the 6-byte truecolor tRNS payload.
    pub(crate) fn rgb(data: &[u8]) -> Result<Self> {
        if data.len() < 6 {
            return Err(Error::TruncatedStream);
        }
        Ok(Self::Rgb(
            u16::from_be_bytes([data[0], data[1]]),
            u16::from_be_bytes([data[2], data[3]]),
            u16::from_be_bytes([data[4], data[5]]),
        ))
    }
}

/// One interlace pass: origin and stride of its pixel subgrid.
struct Pass {
    start_col: u32,
    start_row: u32,
    col_stride: u32,
    row_stride: u32,
}

impl Pass {
    const fn new(start_col: u32, start_row: u32, col_stride: u32, row_stride: u32) -> Self {
        Self {
            start_col,
            start_row,
            col_stride,
            row_stride,
        }
    }

    fn width(&self, image_width: u32) -> u32 {
        span(image_width, self.start_col, self.col_stride)
    }

    fn height(&self, image_height: u32) -> u32 {
        span(image_height, self.start_row, self.row_stride)
    }
}

/// Pixels of an axis covered by a pass starting at `start` with `stride`.
fn span(extent: u32, start: u32, stride: u32) -> u32 {
    if extent > start {
        (extent - start).div_ceil(stride)
    } else {
        0
    }
}

/// The seven Adam7 passes in transmission order.
const ADAM7: [Pass; 7] = [
    Pass::new(0, 0, 8, 8),
    Pass::new(4, 0, 8, 8),
    Pass::new(0, 4, 4, 8),
    Pass::new(2, 0, 4, 4),
    Pass::new(0, 2, 2, 4),
    Pass::new(1, 0, 2, 2),
    Pass::new(0, 1, 1, 2),
];

/// A non-interlaced image is a single pass covering everything.
const SEQUENTIAL: [Pass; 1] = [Pass::new(0, 0, 1, 1)];

fn passes(interlace: Interlace) -> &'static [Pass] {
    match interlace {
        Interlace::None => &SEQUENTIAL,
        Interlace::Adam7 => &ADAM7,
    }
}

/// Expansion factors from depth-d samples to 8 bits.
fn sample_scale(depth: u8) -> u8 {
    match depth {
        1 => 0xFF,
        2 => 0x55,
        4 => 0x11,
        _ => 0x01,
    }
}

/// Total bytes of filtered scanline data the image requires: for each
/// non-empty pass, one filter byte plus the packed row, per row.
///
/// `None` when the total overflows `usize`.
pub(crate) fn filtered_stream_len(info: &ImageInfo) -> Option<usize> {
    let mut total = 0usize;
    for pass in passes(info.interlace) {
        let width = pass.width(info.width);
        let height = pass.height(info.height) as usize;
        if width == 0 || height == 0 {
            continue;
        }
        let row = 1 + info.scanline_bytes(width);
        total = total.checked_add(height.checked_mul(row)?)?;
    }
    Some(total)
}

/// Reconstruct the RGBA raster from the inflated scanline stream.
pub(crate) fn assemble(
    info: &ImageInfo,
    raw: &[u8],
    palette: Option<&Palette>,
    key: Option<&TransparentKey>,
) -> Result<Vec<u8>> {
    let width = info.width as usize;
    let height = info.height as usize;
    let channels = info.color_type.channels();
    let sample_bytes = channels * info.bytes_per_sample();

    let overflow = || Error::BadHeader("image dimensions overflow".into());
    let pixel_count = width.checked_mul(height).ok_or_else(overflow)?;
    let rgba_len = pixel_count.checked_mul(4).ok_or_else(overflow)?;
    let narrow_len = pixel_count.checked_mul(sample_bytes).ok_or_else(overflow)?;

    // The narrow layout and the final RGBA layout share this allocation.
    let mut out = vec![0u8; rgba_len.max(narrow_len)];

    let bpp = info.bytes_per_pixel();
    let mut cursor = 0usize;
    for pass in passes(info.interlace) {
        let pass_width = pass.width(info.width) as usize;
        let pass_height = pass.height(info.height) as usize;
        if pass_width == 0 || pass_height == 0 {
            // Empty passes consume no bytes at all.
            continue;
        }

        let row_bytes = info.scanline_bytes(pass_width as u32);
        let mut previous = vec![0u8; row_bytes];
        let mut current = vec![0u8; row_bytes];
        for pass_row in 0..pass_height {
            let next = cursor + 1 + row_bytes;
            if next > raw.len() {
                return Err(Error::TruncatedStream);
            }
            let filter = raw[cursor];
            current.copy_from_slice(&raw[cursor + 1..next]);
            cursor = next;

            unfilter_row(filter, &mut current, &previous, bpp)?;
            place_row(&mut out, &current, info, pass, pass_row, pass_width);
            std::mem::swap(&mut current, &mut previous);
        }
    }

    if info.bytes_per_sample() == 2 {
        // Keep the high byte of each 16-bit sample; the read cursor stays
        // ahead of the write cursor, so this is safe in place.
        for i in 0..pixel_count * channels {
            out[i] = out[2 * i];
        }
    }

    expand_to_rgba(&mut out, pixel_count, info.color_type, palette)?;
    if let Some(key) = key {
        apply_transparent_key(&mut out[..rgba_len], key, info.bit_depth);
    }
    out.truncate(rgba_len);
    Ok(out)
}

/// Reverse one scanline's filter in place. `previous` is the reconstructed
/// row above within the same pass, or zeros for the first row.
fn unfilter_row(filter: u8, row: &mut [u8], previous: &[u8], bpp: usize) -> Result<()> {
    match filter {
        0 => {}
        1 => {
            // Sub: add the byte bpp to the left.
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        2 => {
            // Up: add the byte above.
            for i in 0..row.len() {
                row[i] = row[i].wrapping_add(previous[i]);
            }
        }
        3 => {
            // Average of left and above, floored, summed at 9 bits.
            for i in 0..row.len() {
                let left = if i >= bpp {
                    u16::from(row[i - bpp])
                } else {
                    0
                };
                let above = u16::from(previous[i]);
                row[i] = row[i].wrapping_add(((left + above) / 2) as u8);
            }
        }
        4 => {
            for i in 0..row.len() {
                let a = if i >= bpp { row[i - bpp] } else { 0 };
                let b = previous[i];
                let c = if i >= bpp { previous[i - bpp] } else { 0 };
                row[i] = row[i].wrapping_add(paeth(a, b, c));
            }
        }
        other => return Err(Error::BadFilter(other)),
    }
    Ok(())
}

/// The Paeth predictor: whichever of left, above, upper-left lies closest
/// to their linear combination, ties resolved to left, then above.
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

/// Scatter one unfiltered pass row into the narrow layout.
fn place_row(
    out: &mut [u8],
    row: &[u8],
    info: &ImageInfo,
    pass: &Pass,
    pass_row: usize,
    pass_width: usize,
) {
    let width = info.width as usize;
    let y = pass.start_row as usize + pass_row * pass.row_stride as usize;

    if info.bit_depth >= 8 {
        let sample_bytes = info.color_type.channels() * info.bytes_per_sample();
        for x in 0..pass_width {
            let col = pass.start_col as usize + x * pass.col_stride as usize;
            let dst = (y * width + col) * sample_bytes;
            out[dst..dst + sample_bytes]
                .copy_from_slice(&row[x * sample_bytes..(x + 1) * sample_bytes]);
        }
    } else {
        // Packed samples, MSB first; padding bits at the row's end are
        // skipped because the bit cursor restarts on every row. Palette
        // indices are stored raw, gray levels are expanded to 8 bits.
        let depth = usize::from(info.bit_depth);
        let scale = if info.color_type == ColorType::Indexed {
            1
        } else {
            sample_scale(info.bit_depth)
        };
        for x in 0..pass_width {
            let bit = x * depth;
            let sample = (row[bit / 8] >> (8 - depth - bit % 8)) & ((1 << depth) - 1);
            let col = pass.start_col as usize + x * pass.col_stride as usize;
            out[y * width + col] = sample * scale;
        }
    }
}

/// Expand the narrow layout (one to four bytes per pixel) to RGBA in
/// place, walking from the back so writes never clobber unread samples.
fn expand_to_rgba(
    buf: &mut [u8],
    pixel_count: usize,
    color_type: ColorType,
    palette: Option<&Palette>,
) -> Result<()> {
    match color_type {
        ColorType::Rgba => {
            // Already four bytes per pixel in place.
        }
        ColorType::Grayscale => {
            for i in (0..pixel_count).rev() {
                let g = buf[i];
                buf[i * 4..i * 4 + 4].copy_from_slice(&[g, g, g, 0xFF]);
            }
        }
        ColorType::GrayscaleAlpha => {
            for i in (0..pixel_count).rev() {
                let g = buf[i * 2];
                let a = buf[i * 2 + 1];
                buf[i * 4..i * 4 + 4].copy_from_slice(&[g, g, g, a]);
            }
        }
        ColorType::Rgb => {
            for i in (0..pixel_count).rev() {
                let (r, g, b) = (buf[i * 3], buf[i * 3 + 1], buf[i * 3 + 2]);
                buf[i * 4..i * 4 + 4].copy_from_slice(&[r, g, b, 0xFF]);
            }
        }
        ColorType::Indexed => {
            let palette = palette
                .ok_or_else(|| Error::BadHeader("indexed image without a PLTE chunk".into()))?;
            for i in (0..pixel_count).rev() {
                let index = usize::from(buf[i]);
                buf[i * 4..i * 4 + 4].copy_from_slice(&[
                    palette.red[index],
                    palette.green[index],
                    palette.blue[index],
                    palette.alpha[index],
                ]);
            }
        }
    }
    Ok(())
}

/// Zero the alpha of every pixel matching the transparent key.
fn apply_transparent_key(rgba: &mut [u8], key: &TransparentKey, depth: u8) {
    match *key {
        TransparentKey::Gray(gray) => {
            let gray = scale_key(gray, depth);
            for pixel in rgba.chunks_exact_mut(4) {
                if pixel[0] == gray {
                    pixel[3] = 0;
                }
            }
        }
        TransparentKey::Rgb(r, g, b) => {
            let want = [scale_key(r, depth), scale_key(g, depth), scale_key(b, depth)];
            for pixel in rgba.chunks_exact_mut(4) {
                if pixel[..3] == want {
                    pixel[3] = 0;
                }
            }
        }
    }
}

/// Bring a 16-bit tRNS key to the 8-bit domain the raster uses: scaled up
/// for packed depths, truncated to the high byte at depth 16.
fn scale_key(key: u16, depth: u8) -> u8 {
    match depth {
        16 => (key >> 8) as u8,
        8 => key as u8,
        _ => (key as u8 & ((1 << depth) - 1)) * sample_scale(depth),
    }
}

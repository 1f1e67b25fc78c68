//! IHDR parsing and validation.

use crate::error::{Error, Result};

/// Maximum dimension for decoded images (16 million pixels per side).
/// Guards against decompression bombs hiding behind a tiny IDAT.
pub const MAX_DIMENSION: u32 = 1 << 24;

/// PNG color type values from the specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    /// One gray sample per pixel.
    Grayscale = 0,
    /// Red, green, blue.
    Rgb = 2,
    /// One palette index per pixel.
    Indexed = 3,
    /// Gray sample plus alpha.
    GrayscaleAlpha = 4,
    /// Red, green, blue, alpha.
    Rgba = 6,
}

impl TryFrom<u8> for ColorType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ColorType::Grayscale),
            2 => Ok(ColorType::Rgb),
            3 => Ok(ColorType::Indexed),
            4 => Ok(ColorType::GrayscaleAlpha),
            6 => Ok(ColorType::Rgba),
            _ => Err(Error::BadHeader(format!("color type {value}"))),
        }
    }
}

impl ColorType {
    /// Samples per pixel for this color type.
    pub fn channels(self) -> usize {
        match self {
            ColorType::Grayscale | ColorType::Indexed => 1,
            ColorType::GrayscaleAlpha => 2,
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }
}

/// PNG interlace methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interlace {
    /// Scanlines in top-to-bottom order.
    None = 0,
    /// Seven-pass Adam7 interleaving.
    Adam7 = 1,
}

/// Validated IHDR contents.
///
/// Construction via [`ImageInfo::parse`] guarantees nonzero dimensions and a
/// legal (bit depth, color type) combination; compression and filter method
/// are checked to be zero and not retained.
#[derive(Debug, Clone, Copy)]
pub struct ImageInfo {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Bits per sample: 1, 2, 4, 8, or 16.
    pub bit_depth: u8,
    /// How samples map to pixels.
    pub color_type: ColorType,
    /// Scanline transmission order.
    pub interlace: Interlace,
}

impl ImageInfo {
    /// Parse and validate the 13-byte IHDR payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() != 13 {
            return Err(Error::BadHeader(format!(
                "IHDR length {} instead of 13",
                payload.len()
            )));
        }

        let width = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let height = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
        let bit_depth = payload[8];
        let color_type = ColorType::try_from(payload[9])?;
        let compression = payload[10];
        let filter = payload[11];
        let interlace = payload[12];

        if width == 0 || height == 0 {
            return Err(Error::BadHeader(format!("image size {width}x{height}")));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::BadHeader(format!(
                "image size {width}x{height} exceeds {MAX_DIMENSION} per side"
            )));
        }
        if compression != 0 {
            return Err(Error::BadHeader(format!("compression method {compression}")));
        }
        if filter != 0 {
            return Err(Error::BadHeader(format!("filter method {filter}")));
        }
        let interlace = match interlace {
            0 => Interlace::None,
            1 => Interlace::Adam7,
            other => return Err(Error::BadHeader(format!("interlace method {other}"))),
        };

        let depth_ok = match color_type {
            ColorType::Grayscale => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
            ColorType::Indexed => matches!(bit_depth, 1 | 2 | 4 | 8),
            ColorType::Rgb | ColorType::GrayscaleAlpha | ColorType::Rgba => {
                matches!(bit_depth, 8 | 16)
            }
        };
        if !depth_ok {
            return Err(Error::BadHeader(format!(
                "bit depth {bit_depth} for color type {color_type:?}"
            )));
        }

        Ok(Self {
            width,
            height,
            bit_depth,
            color_type,
            interlace,
        })
    }

    /// Bytes per sample in the decoded stream: 2 at depth 16, otherwise 1.
    pub(crate) fn bytes_per_sample(&self) -> usize {
        if self.bit_depth == 16 {
            2
        } else {
            1
        }
    }

    /// Bytes per pixel once samples are unpacked to whole bytes.
    /// Also the filter predictor offset; never below one byte even for
    /// packed sub-byte depths.
    pub(crate) fn bytes_per_pixel(&self) -> usize {
        (self.color_type.channels() * self.bytes_per_sample()).max(1)
    }

    /// Packed scanline bytes for a row of `width` pixels, excluding the
    /// filter byte.
    pub(crate) fn scanline_bytes(&self, width: u32) -> usize {
        (self.color_type.channels() * usize::from(self.bit_depth) * width as usize).div_ceil(8)
    }
}

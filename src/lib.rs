//! # unpng
//!
//! A self-contained PNG decoder. The crate carries its own chunk parser,
//! its own zlib/DEFLATE inflater, per-scanline filter reversal, sub-byte
//! sample unpacking, Adam7 de-interleaving, and palette/transparency
//! expansion, and depends on no external image or compression library.
//!
//! Whatever the source bit depth and color type, the output is a canonical
//! 8-bit RGBA raster.
//!
//! ## Example
//!
//! ```no_run
//! let bytes = std::fs::read("image.png")?;
//! let image = unpng::decode(&bytes)?;
//!
//! assert_eq!(image.data.len(), (image.width * image.height * 4) as usize);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bits;
pub mod error;
pub mod huffman;
pub mod inflate;
pub mod png;

pub use error::{Error, Result};
pub use png::{decode, decode_from_reader, Image};

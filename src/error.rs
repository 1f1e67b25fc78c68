//! Error types for the unpng library.

use std::fmt;

/// Result type alias for unpng operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during PNG decoding.
///
/// Every component surfaces its own kind directly; no recovery is attempted
/// and no partial image is emitted on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The first eight bytes do not match the PNG signature.
    BadSignature,
    /// The input ended mid-field, mid-chunk, mid-block, or mid-scanline.
    TruncatedStream,
    /// IHDR missing, wrong length, or fields outside the PNG enumerations.
    BadHeader(String),
    /// The zlib framing is invalid or uses unsupported options.
    UnsupportedZlib(String),
    /// A DEFLATE block header or stored-block length check failed.
    MalformedBlock(String),
    /// A code-length vector does not form a valid prefix code, or a decoded
    /// symbol fell outside its alphabet.
    MalformedHuffman(String),
    /// An LZ77 back-reference points before the start of the output, or a
    /// length/distance symbol is out of range.
    BadBackReference(String),
    /// A scanline filter byte outside 0..=4.
    BadFilter(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadSignature => write!(f, "not a PNG file"),
            Error::TruncatedStream => write!(f, "unexpected end of stream"),
            Error::BadHeader(msg) => write!(f, "invalid image header: {msg}"),
            Error::UnsupportedZlib(msg) => write!(f, "unsupported zlib stream: {msg}"),
            Error::MalformedBlock(msg) => write!(f, "malformed DEFLATE block: {msg}"),
            Error::MalformedHuffman(msg) => write!(f, "malformed Huffman code: {msg}"),
            Error::BadBackReference(msg) => write!(f, "invalid back-reference: {msg}"),
            Error::BadFilter(filter) => write!(f, "invalid filter type: {filter}"),
        }
    }
}

impl std::error::Error for Error {}

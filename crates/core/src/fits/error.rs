//! Error types for FITS reading and writing.

use thiserror::Error;

/// Errors that can occur while reading or writing FITS files.
#[derive(Debug, Error)]
pub enum FitsError {
    /// I/O error while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The FITS parser or header writer rejected the file.
    #[error("FITS codec error: {0:?}")]
    Codec(fitsio::error::Error),

    /// The header block is malformed.
    #[error("Invalid FITS header: {reason}")]
    InvalidHeader { reason: String },

    /// A mandatory structural keyword is absent.
    #[error("Missing required keyword: {keyword}")]
    MissingKeyword { keyword: String },

    /// BITPIX is not one of the values allowed by the standard.
    #[error("Unsupported BITPIX: {0}")]
    UnsupportedBitpix(i64),

    /// The file ends before the data unit declared by the header.
    #[error("Truncated data unit: expected {expected} bytes, found {found}")]
    TruncatedData { expected: usize, found: usize },
}

impl From<fitsio::error::Error> for FitsError {
    fn from(err: fitsio::error::Error) -> Self {
        Self::Codec(err)
    }
}

impl FitsError {
    /// Creates an invalid header error.
    pub fn invalid_header(reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            reason: reason.into(),
        }
    }

    /// Creates a missing keyword error.
    pub fn missing_keyword(keyword: impl Into<String>) -> Self {
        Self::MissingKeyword {
            keyword: keyword.into(),
        }
    }
}

//! Reading and writing whole primary HDUs.

use std::borrow::Cow;
use std::path::Path;

use fitsio::hdu::parse_fits;
use fitsio::header::serialize_header;
use tracing::warn;

use super::error::FitsError;
use super::header::FitsHeader;

/// FITS logical record size.
pub const BLOCK_LEN: usize = 2880;

/// Length of one header record.
const RECORD_LEN: usize = 80;

/// A primary HDU: header plus the raw data unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitsFile {
    header: FitsHeader,
    data: Vec<u8>,
}

impl FitsFile {
    /// Creates a file from a header and data bytes.
    ///
    /// Fails when the data length does not match what the header declares.
    pub fn new(header: FitsHeader, data: Vec<u8>) -> Result<Self, FitsError> {
        let expected = header.data_len()?;
        if data.len() != expected {
            return Err(FitsError::invalid_header(format!(
                "header declares {} data bytes, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self { header, data })
    }

    /// Decodes the primary HDU from an in-memory file.
    ///
    /// Header bytes outside printable ASCII are replaced with `?` before
    /// parsing. Any extensions after the primary data unit are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FitsError> {
        let bytes = sanitize_header(bytes);
        let parsed = parse_fits(&bytes)?;
        let primary = parsed.primary();

        let header = FitsHeader::from_raw(&primary.cards);
        let start = primary.data_start;
        let available = bytes.len().saturating_sub(start);
        if available < primary.data_len {
            return Err(FitsError::TruncatedData {
                expected: primary.data_len,
                found: available,
            });
        }
        let data = bytes[start..start + primary.data_len].to_vec();
        Ok(Self { header, data })
    }

    /// Encodes the HDU with standard block padding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FitsError> {
        let mut out = serialize_header(&self.header.to_raw());
        if !self.data.is_empty() {
            let start = out.len();
            out.extend_from_slice(&self.data);
            out.resize(start + self.data.len().div_ceil(BLOCK_LEN) * BLOCK_LEN, 0);
        }
        Ok(out)
    }

    /// Reads the primary HDU of the file at `path`.
    pub async fn read(path: &Path) -> Result<Self, FitsError> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(&bytes)
    }

    /// Writes the HDU to `path`, replacing any existing file.
    pub async fn write(&self, path: &Path) -> Result<(), FitsError> {
        tokio::fs::write(path, self.to_bytes()?).await?;
        Ok(())
    }

    pub fn header(&self) -> &FitsHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut FitsHeader {
        &mut self.header
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the header while keeping the data unit.
    pub fn with_header(self, header: FitsHeader) -> Result<Self, FitsError> {
        Self::new(header, self.data)
    }
}

/// Replaces non-printable bytes in the header records, up to END, with `?`.
fn sanitize_header(bytes: &[u8]) -> Cow<'_, [u8]> {
    let mut cleaned: Option<Vec<u8>> = None;
    for (idx, record) in bytes.chunks(RECORD_LEN).enumerate() {
        if record.iter().any(|b| !(0x20..=0x7e).contains(b)) {
            let owned = cleaned.get_or_insert_with(|| bytes.to_vec());
            let start = idx * RECORD_LEN;
            let mut replaced = 0;
            for b in &mut owned[start..start + record.len()] {
                if !(0x20..=0x7e).contains(b) {
                    *b = b'?';
                    replaced += 1;
                }
            }
            let keyword = String::from_utf8_lossy(&owned[start..start + record.len().min(8)])
                .trim_end()
                .to_string();
            warn!(
                keyword = %keyword,
                replaced,
                "Replaced non-ASCII bytes in header card"
            );
        }
        if record.starts_with(b"END     ") {
            break;
        }
    }
    match cleaned {
        Some(owned) => Cow::Owned(owned),
        None => Cow::Borrowed(bytes),
    }
}

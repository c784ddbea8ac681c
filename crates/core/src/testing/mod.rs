//! Testing utilities and mock implementations.
//!
//! This module provides a mock of the external astrometry tools and FITS
//! fixtures, so the whole pipeline can run without WCSTools installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use wcsync_core::testing::{fixtures, MockAstrometryTools};
//!
//! let root = TempDir::new()?;
//! fixtures::write_dataset(root.path(), &[("V", 3)]).await?;
//!
//! let tools = MockAstrometryTools::new();
//! let pipeline = AstrometryPipeline::new(config, tools.clone());
//! ```

mod mock_tools;

pub use mock_tools::MockAstrometryTools;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::fits::{Card, FitsError, FitsFile, FitsHeader, FitsValue};

    /// Frame width and height in pixels.
    pub const FRAME_SIZE: usize = 4;

    /// A small 16-bit frame with the given extra cards appended.
    pub fn frame(cards: &[Card]) -> Result<FitsFile, FitsError> {
        let mut header = FitsHeader::primary(16, &[FRAME_SIZE, FRAME_SIZE])?;
        header.push(Card::new("BZERO", FitsValue::Float(32768.0), None));
        header.push(Card::new("EXPTIME", FitsValue::Float(30.0), Some("seconds")));
        for card in cards {
            header.push(card.clone());
        }
        // Ramp so data corruption is visible.
        let data = (0..FRAME_SIZE * FRAME_SIZE * 2).map(|i| i as u8).collect();
        FitsFile::new(header, data)
    }

    /// A raw frame for a filter, as it comes out of ISR.
    pub fn raw_frame(filter: &str, index: usize) -> Result<FitsFile, FitsError> {
        frame(&[
            Card::new("FILTER", FitsValue::Text(filter.to_string()), None),
            Card::new("FRAMENUM", FitsValue::Integer(index as i64), None),
            Card::commentary("HISTORY", "bias and flat corrected"),
        ])
    }

    /// Reference solution with a TAN projection centred on RA 10, Dec 41.2.
    pub fn reference_image() -> Result<FitsFile, FitsError> {
        frame(&[
            Card::new("CTYPE1", FitsValue::Text("RA---TAN".into()), None),
            Card::new("CTYPE2", FitsValue::Text("DEC--TAN".into()), None),
            Card::new("CRVAL1", FitsValue::Float(10.0), Some("RA of reference point")),
            Card::new("CRVAL2", FitsValue::Float(41.2), Some("Dec of reference point")),
            Card::new("CRPIX1", FitsValue::Float(2.0), None),
            Card::new("CRPIX2", FitsValue::Float(2.0), None),
            Card::new("CDELT1", FitsValue::Float(-0.000277), None),
            Card::new("CDELT2", FitsValue::Float(0.000277), None),
            Card::new("EQUINOX", FitsValue::Float(2000.0), None),
            Card::commentary("COMMENT", "solved by astrometry.net"),
            Card::commentary("HISTORY", "WCS from reference solve"),
        ])
    }

    /// Writes `<root>/ISR_Images` with the reference image and `count` raw
    /// frames per filter. Returns the ISR directory.
    pub async fn write_dataset(
        root: &Path,
        filters: &[(&str, usize)],
    ) -> Result<PathBuf, FitsError> {
        let isr = root.join("ISR_Images");
        tokio::fs::create_dir_all(&isr).await?;
        reference_image()?.write(&isr.join("new-image.fits")).await?;
        for (filter, count) in filters {
            let dir = isr.join(filter);
            tokio::fs::create_dir_all(&dir).await?;
            for index in 1..=*count {
                let path = dir.join(format!("frame{:03}.fits", index));
                raw_frame(filter, index)?.write(&path).await?;
            }
        }
        Ok(isr)
    }
}

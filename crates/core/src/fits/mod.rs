//! Primary-HDU access on top of the `fitsio` parser and header writer.
//!
//! Headers are kept as ordered cards so that rewriting a file changes only
//! the cards that were explicitly touched. Long strings keep their
//! `CONTINUE` records attached. The data unit is carried as raw big-endian
//! bytes and never decoded.
//!
//! # Example
//!
//! ```ignore
//! use wcsync_core::fits::{Card, FitsFile, FitsValue};
//!
//! let mut image = FitsFile::read(Path::new("/data/ISR_Images/V/frame01.fits")).await?;
//! image
//!     .header_mut()
//!     .set(Card::new("CRVAL1", FitsValue::Float(10.0), None));
//! image.write(Path::new("/data/ISR_Images/V/WCS/wcs1.fits")).await?;
//! ```

mod card;
mod error;
mod file;
mod header;

pub use card::{Card, FitsValue, KEYWORD_LEN};
pub use error::FitsError;
pub use file::{FitsFile, BLOCK_LEN};
pub use header::FitsHeader;

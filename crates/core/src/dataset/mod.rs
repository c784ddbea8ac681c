//! On-disk layout of a calibrated dataset.
//!
//! ```text
//! <root>/ISR_Images/new-image.fits        reference image
//! <root>/ISR_Images/new-image.tab         star table written by the detector
//! <root>/ISR_Images/<filter>/*.fits       calibrated frames
//! <root>/ISR_Images/<filter>/WCS/         merged frames (wcs1.fits ...)
//! <root>/ISR_Images/<filter>/WCS/accurate_WCS/
//! ```

mod layout;

pub use layout::{discover_images, DatasetLayout};

//! Sorter module for relocating refined frames.
//!
//! After refinement the fitter leaves a `w.fits`-suffixed file for every
//! frame it could solve. The sorter moves exactly those files into the
//! accurate-WCS directory and reports what stayed behind.
//!
//! # Features
//!
//! - Atomic moves via rename when source and destination share a filesystem
//! - Fallback to SHA-256 verified copy plus source removal across devices
//! - Refuses to reuse an existing destination directory
//!
//! # Example
//!
//! ```ignore
//! use wcsync_core::sorter::FileSorter;
//!
//! let sorter = FileSorter::new();
//! let result = sorter
//!     .sort_accepted(wcs_dir, &wcs_dir.join("accurate_WCS"), "w.fits")
//!     .await?;
//! println!("{} accepted, {} left behind", result.accepted.len(), result.rejected.len());
//! ```

mod error;
mod fs_sorter;

pub use error::SortError;
pub use fs_sorter::{copy_verified, move_file, CopyReceipt, FileSorter, SortResult};

//! External astrometry tools.
//!
//! This module provides the `AstrometryTools` trait and the WCSTools-backed
//! implementation that shells out to `imstar` (star detection) and `imwcs`
//! (WCS refinement against a star list).
//!
//! Every invocation receives absolute paths and its own working directory;
//! the process-wide current directory is never touched.
//!
//! # Example
//!
//! ```ignore
//! use wcsync_core::tools::{AstrometryTools, DetectionJob, ToolsConfig, WcsTools};
//!
//! let tools = WcsTools::new(ToolsConfig::default());
//! tools.validate().await?;
//!
//! let job = DetectionJob {
//!     image: PathBuf::from("/data/ISR_Images/new-image.fits"),
//!     working_dir: PathBuf::from("/data/ISR_Images"),
//!     threshold: 700,
//! };
//! let run = tools.detect_stars(&job).await?;
//! println!("imstar finished in {} ms", run.duration_ms);
//! ```

mod config;
mod error;
mod traits;
mod types;
mod wcstools;

pub use config::ToolsConfig;
pub use error::ToolError;
pub use traits::AstrometryTools;
pub(crate) use types::refined_path;
pub use types::{DetectionJob, RefineJob, ToolKind, ToolRun};
pub use wcstools::WcsTools;

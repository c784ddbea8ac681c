//! Types for the tools module.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which external program ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// `imstar`: finds stars and writes the star table.
    StarDetector,
    /// `imwcs`: fits a WCS against a star table.
    WcsFitter,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::StarDetector => write!(f, "imstar"),
            ToolKind::WcsFitter => write!(f, "imwcs"),
        }
    }
}

/// Star detection on the reference image.
#[derive(Debug, Clone)]
pub struct DetectionJob {
    /// Absolute path to the reference image.
    pub image: PathBuf,
    /// Working directory of the child process.
    pub working_dir: PathBuf,
    /// Minimum peak value for a star.
    pub threshold: u32,
}

impl DetectionJob {
    /// Where the detector writes its star table: the image path with `.tab`.
    pub fn star_table_path(&self) -> PathBuf {
        self.image.with_extension("tab")
    }
}

/// WCS refinement of one image.
#[derive(Debug, Clone)]
pub struct RefineJob {
    /// Absolute path to the image to refine.
    pub image: PathBuf,
    /// Absolute path to the star table.
    pub star_table: PathBuf,
    /// Working directory of the child process.
    pub working_dir: PathBuf,
    /// Value passed with `-i`.
    pub iterations: u32,
    /// Suffix the fitter gives its output, replacing `.fits`.
    pub refined_suffix: String,
}

impl RefineJob {
    /// Path of the corrected file: with suffix `w.fits`, `wcs3.fits` becomes
    /// `wcs3w.fits`.
    pub fn refined_path(&self) -> PathBuf {
        refined_path(&self.image, &self.refined_suffix)
    }
}

pub(crate) fn refined_path(image: &Path, suffix: &str) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    image.with_file_name(format!("{}{}", stem, suffix))
}

/// Record of one finished tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolRun {
    pub tool: ToolKind,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    /// Last lines of standard output.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_tail: Vec<String>,
}

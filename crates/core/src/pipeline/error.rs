//! Error types for the pipeline module.

use std::path::PathBuf;
use thiserror::Error;

use crate::fits::FitsError;
use crate::sorter::SortError;
use crate::star_table::StarTableError;
use crate::tools::ToolError;

/// Errors that abort an astrometry run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The dataset root or ISR directory is missing.
    #[error("Dataset directory not found: {path}")]
    DatasetNotFound { path: PathBuf },

    /// The reference image is missing.
    #[error("Reference image not found: {path}")]
    ReferenceNotFound { path: PathBuf },

    /// A requested filter has no directory.
    #[error("Filter directory not found: {path}")]
    FilterDirNotFound { path: PathBuf },

    /// An output directory from an earlier run is still present.
    #[error("Output directory already exists: {path}")]
    OutputExists { path: PathBuf },

    /// The detector finished without writing a star table.
    #[error("Star table not found after detection: {path}")]
    StarTableMissing { path: PathBuf },

    /// The star table lists no stars.
    #[error("Star table lists no stars: {path}")]
    EmptyStarTable { path: PathBuf },

    /// The star table could not be parsed.
    #[error("Invalid star table {path}: {source}")]
    StarTable {
        path: PathBuf,
        #[source]
        source: StarTableError,
    },

    /// A FITS file could not be read or written.
    #[error("FITS error in {path}: {source}")]
    Fits {
        path: PathBuf,
        #[source]
        source: FitsError,
    },

    /// An external tool failed.
    #[error("{stage} failed for {path}: {source}")]
    Tool {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    /// Moving or copying output files failed.
    #[error("File sorting failed: {0}")]
    Sort(#[from] SortError),

    /// The image discovery pattern was rejected.
    #[error("Invalid image pattern for {path}: {source}")]
    Pattern {
        path: PathBuf,
        #[source]
        source: glob::PatternError,
    },

    /// Filesystem error outside the cases above.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn fits(path: impl Into<PathBuf>, source: FitsError) -> Self {
        Self::Fits {
            path: path.into(),
            source,
        }
    }

    pub fn tool(stage: &'static str, path: impl Into<PathBuf>, source: ToolError) -> Self {
        Self::Tool {
            stage,
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

//! Types for the pipeline module.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::merge::CopiedKeyword;
use crate::tools::ToolRun;

/// Result of one astrometry run over a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct AstrometryReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Absolute dataset root.
    pub root: PathBuf,
    pub reference: ReferenceSolve,
    /// One entry per filter, in the order given.
    pub filters: Vec<FilterReport>,
    pub duration_ms: u64,
}

impl AstrometryReport {
    /// Total number of refined frames across all filters.
    pub fn accepted_count(&self) -> usize {
        self.filters.iter().map(|f| f.accepted.len()).sum()
    }

    /// Total number of failed refinements across all filters.
    pub fn failed_count(&self) -> usize {
        self.filters
            .iter()
            .flat_map(|f| f.refinements.iter())
            .filter(|r| !r.succeeded())
            .count()
    }
}

/// Star detection on the reference image.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceSolve {
    pub image: PathBuf,
    pub star_table: PathBuf,
    pub star_count: usize,
    pub detection: ToolRun,
}

/// Everything done for one filter.
#[derive(Debug, Clone, Serialize)]
pub struct FilterReport {
    pub filter: String,
    pub merged: Vec<MergedImage>,
    pub refinements: Vec<RefinementOutcome>,
    /// Refined frames, at their location in the accurate directory.
    pub accepted: Vec<PathBuf>,
    /// Merged frames without a refined counterpart.
    pub rejected: Vec<PathBuf>,
}

/// A frame written with the reference keywords added.
#[derive(Debug, Clone, Serialize)]
pub struct MergedImage {
    /// Original frame, left untouched.
    pub source: PathBuf,
    /// Merged copy (`wcs<n>.fits`).
    pub output: PathBuf,
    pub copied: Vec<CopiedKeyword>,
}

/// Outcome of refining one merged frame.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefinementOutcome {
    Refined { image: PathBuf, run: ToolRun },
    Failed { image: PathBuf, error: String },
}

impl RefinementOutcome {
    pub fn image(&self) -> &PathBuf {
        match self {
            Self::Refined { image, .. } | Self::Failed { image, .. } => image,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Refined { .. })
    }
}

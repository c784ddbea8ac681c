//! Trait definitions for the tools module.

use async_trait::async_trait;

use super::error::ToolError;
use super::types::{DetectionJob, RefineJob, ToolRun};

/// The pair of external programs the pipeline drives.
#[async_trait]
pub trait AstrometryTools: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Detects stars in the reference image.
    ///
    /// On success the star table sits next to the image
    /// (see [`DetectionJob::star_table_path`]) and the image header carries
    /// a preliminary WCS.
    async fn detect_stars(&self, job: &DetectionJob) -> Result<ToolRun, ToolError>;

    /// Refines the WCS of one image against the star table.
    ///
    /// A successful refinement writes [`RefineJob::refined_path`].
    async fn refine_wcs(&self, job: &RefineJob) -> Result<ToolRun, ToolError>;

    /// Validates that the tools are installed and runnable.
    async fn validate(&self) -> Result<(), ToolError>;
}

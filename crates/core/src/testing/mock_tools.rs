//! Mock astrometry tools for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fits::{Card, FitsFile};
use crate::tools::{AstrometryTools, DetectionJob, RefineJob, ToolError, ToolKind, ToolRun};

/// Mock implementation of the AstrometryTools trait.
///
/// Provides controllable behavior for testing:
/// - Record detection and refinement jobs for assertions
/// - Write a star table with a chosen number of stars
/// - Fail refinement for chosen file names
/// - Fail the next detection with a given error
///
/// A successful refinement writes `<stem><suffix>` beside the input with a
/// HISTORY card added, the way the real fitter does.
///
/// # Example
///
/// ```rust,ignore
/// use wcsync_core::testing::MockAstrometryTools;
///
/// let tools = MockAstrometryTools::new();
/// tools.set_star_count(12).await;
/// tools.fail_refinement_of("wcs2.fits").await;
///
/// let pipeline = AstrometryPipeline::new(config, tools.clone());
/// pipeline.run(&root, &filters).await?;
///
/// assert_eq!(tools.detection_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockAstrometryTools {
    detections: Arc<RwLock<Vec<DetectionJob>>>,
    refinements: Arc<RwLock<Vec<RefineJob>>>,
    /// Stars written to each detection's table.
    star_count: Arc<RwLock<usize>>,
    /// Whether detection writes a star table at all.
    write_star_table: Arc<RwLock<bool>>,
    /// File names whose refinement fails.
    failing: Arc<RwLock<HashSet<String>>>,
    /// If set, the next detection fails with this error.
    next_detection_error: Arc<RwLock<Option<ToolError>>>,
}

impl Default for MockAstrometryTools {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAstrometryTools {
    /// Create a new mock that detects 25 stars and refines everything.
    pub fn new() -> Self {
        Self {
            detections: Arc::new(RwLock::new(Vec::new())),
            refinements: Arc::new(RwLock::new(Vec::new())),
            star_count: Arc::new(RwLock::new(25)),
            write_star_table: Arc::new(RwLock::new(true)),
            failing: Arc::new(RwLock::new(HashSet::new())),
            next_detection_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn recorded_detections(&self) -> Vec<DetectionJob> {
        self.detections.read().await.clone()
    }

    pub async fn recorded_refinements(&self) -> Vec<RefineJob> {
        self.refinements.read().await.clone()
    }

    pub async fn detection_count(&self) -> usize {
        self.detections.read().await.len()
    }

    pub async fn refinement_count(&self) -> usize {
        self.refinements.read().await.len()
    }

    /// Set how many stars detection reports.
    pub async fn set_star_count(&self, count: usize) {
        *self.star_count.write().await = count;
    }

    /// Make detection succeed without writing a star table.
    pub async fn set_write_star_table(&self, write: bool) {
        *self.write_star_table.write().await = write;
    }

    /// Make refinement of the named file fail.
    pub async fn fail_refinement_of(&self, file_name: &str) {
        self.failing.write().await.insert(file_name.to_string());
    }

    /// Configure the next detection to fail with the given error.
    pub async fn set_next_detection_error(&self, error: ToolError) {
        *self.next_detection_error.write().await = Some(error);
    }

    fn run(tool: ToolKind, args: Vec<String>) -> ToolRun {
        ToolRun {
            tool,
            program: tool.to_string().into(),
            args,
            exit_code: Some(0),
            duration_ms: 1,
            output_tail: Vec::new(),
        }
    }

    fn star_table(count: usize) -> String {
        let mut table = String::from("catalog\tmock\nradecsys\tFK5\n");
        table.push_str("num\tra\tdec\tmag\tx\ty\n");
        table.push_str("---\t--\t---\t---\t-\t-\n");
        for i in 1..=count {
            table.push_str(&format!(
                "{}\t10.{:04}\t41.{:04}\t{:.2}\t{:.1}\t{:.1}\n",
                i,
                i,
                i,
                12.0 + i as f64 * 0.1,
                i as f64 * 10.0,
                i as f64 * 7.5
            ));
        }
        table
    }
}

#[async_trait]
impl AstrometryTools for MockAstrometryTools {
    fn name(&self) -> &str {
        "mock"
    }

    async fn detect_stars(&self, job: &DetectionJob) -> Result<ToolRun, ToolError> {
        self.detections.write().await.push(job.clone());
        if let Some(error) = self.next_detection_error.write().await.take() {
            return Err(error);
        }
        if !job.image.exists() {
            return Err(ToolError::InputNotFound {
                path: job.image.clone(),
            });
        }

        if *self.write_star_table.read().await {
            let count = *self.star_count.read().await;
            tokio::fs::write(job.star_table_path(), Self::star_table(count)).await?;
        }

        Ok(Self::run(
            ToolKind::StarDetector,
            vec![
                "-vhi".to_string(),
                job.threshold.to_string(),
                "-tw".to_string(),
                job.image.to_string_lossy().to_string(),
            ],
        ))
    }

    async fn refine_wcs(&self, job: &RefineJob) -> Result<ToolRun, ToolError> {
        self.refinements.write().await.push(job.clone());
        for path in [&job.image, &job.star_table] {
            if !path.exists() {
                return Err(ToolError::InputNotFound { path: path.clone() });
            }
        }

        let name = job
            .image
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.failing.read().await.contains(&name) {
            return Err(ToolError::failed(
                ToolKind::WcsFitter,
                Some(1),
                format!("{}: not enough stars matched", name),
            ));
        }

        let mut image = FitsFile::read(&job.image)
            .await
            .map_err(|e| ToolError::failed(ToolKind::WcsFitter, Some(1), e.to_string()))?;
        image
            .header_mut()
            .push(Card::commentary("HISTORY", "WCS refined by mock fitter"));
        image
            .write(&job.refined_path())
            .await
            .map_err(|e| ToolError::failed(ToolKind::WcsFitter, Some(1), e.to_string()))?;

        Ok(Self::run(
            ToolKind::WcsFitter,
            vec![
                "-wv".to_string(),
                "-i".to_string(),
                job.iterations.to_string(),
                "-c".to_string(),
                job.star_table.to_string_lossy().to_string(),
                job.image.to_string_lossy().to_string(),
            ],
        ))
    }

    async fn validate(&self) -> Result<(), ToolError> {
        Ok(())
    }
}

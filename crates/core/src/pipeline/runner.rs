//! Pipeline runner implementation.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::dataset::{discover_images, DatasetLayout};
use crate::fits::{FitsFile, FitsHeader};
use crate::merge::HeaderMerger;
use crate::sorter::{copy_verified, FileSorter};
use crate::star_table::StarTable;
use crate::tools::{refined_path, AstrometryTools, DetectionJob, RefineJob, WcsTools};

use super::error::PipelineError;
use super::types::{AstrometryReport, FilterReport, MergedImage, RefinementOutcome, ReferenceSolve};

/// Runs the astrometry steps over a dataset with a given tool backend.
pub struct AstrometryPipeline<T: AstrometryTools> {
    config: Config,
    tools: T,
    merger: HeaderMerger,
    sorter: FileSorter,
}

impl<T: AstrometryTools> AstrometryPipeline<T> {
    pub fn new(config: Config, tools: T) -> Self {
        let merger = HeaderMerger::new(&config.merge.skip_keywords);
        Self {
            config,
            tools,
            merger,
            sorter: FileSorter::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Solves the reference image, then merges, refines and sorts the
    /// frames of every filter in order.
    ///
    /// Nothing is written before the dataset and every filter directory
    /// have been checked.
    pub async fn run(
        &self,
        root: &Path,
        filters: &[String],
    ) -> Result<AstrometryReport, PipelineError> {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();

        let root = std::path::absolute(root).map_err(|e| PipelineError::io(root, e))?;
        let layout = DatasetLayout::new(&root, &self.config.dataset);
        info!(
            run_id = %run_id,
            root = %root.display(),
            filters = ?filters,
            tools = self.tools.name(),
            "Starting astrometry run"
        );

        self.check_layout(&layout, filters)?;

        let reference = self.solve_reference(&layout).await?;
        let reference_header = FitsFile::read(&reference.image)
            .await
            .map_err(|e| PipelineError::fits(&reference.image, e))?
            .header()
            .clone();

        let mut reports = Vec::with_capacity(filters.len());
        for filter in filters {
            let report = self
                .process_filter(&layout, filter, &reference_header, &reference.star_table)
                .await?;
            reports.push(report);
        }

        // Every filter now holds its own copy.
        fs::remove_file(&reference.star_table)
            .await
            .map_err(|e| PipelineError::io(&reference.star_table, e))?;

        let report = AstrometryReport {
            run_id,
            started_at,
            root,
            reference,
            filters: reports,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            run_id = %run_id,
            accepted = report.accepted_count(),
            failed = report.failed_count(),
            duration_ms = report.duration_ms,
            "Astrometry run complete"
        );
        Ok(report)
    }

    fn check_layout(&self, layout: &DatasetLayout, filters: &[String]) -> Result<(), PipelineError> {
        let isr_dir = layout.isr_dir();
        if !isr_dir.is_dir() {
            return Err(PipelineError::DatasetNotFound { path: isr_dir });
        }
        let reference = layout.reference_image();
        if !reference.is_file() {
            return Err(PipelineError::ReferenceNotFound { path: reference });
        }
        for filter in filters {
            let filter_dir = layout.filter_dir(filter);
            if !filter_dir.is_dir() {
                return Err(PipelineError::FilterDirNotFound { path: filter_dir });
            }
            let wcs_dir = layout.wcs_dir(filter);
            if wcs_dir.exists() {
                return Err(PipelineError::OutputExists { path: wcs_dir });
            }
        }
        Ok(())
    }

    async fn solve_reference(&self, layout: &DatasetLayout) -> Result<ReferenceSolve, PipelineError> {
        let job = DetectionJob {
            image: layout.reference_image(),
            working_dir: layout.isr_dir(),
            threshold: self.config.detection.threshold,
        };
        info!("Detecting stars in {}", job.image.display());
        let detection = self
            .tools
            .detect_stars(&job)
            .await
            .map_err(|e| PipelineError::tool("Star detection", &job.image, e))?;

        let star_table = job.star_table_path();
        if !star_table.is_file() {
            return Err(PipelineError::StarTableMissing { path: star_table });
        }
        let table = StarTable::read(&star_table)
            .await
            .map_err(|e| PipelineError::StarTable {
                path: star_table.clone(),
                source: e,
            })?;
        if table.is_empty() {
            return Err(PipelineError::EmptyStarTable { path: star_table });
        }
        // The fitter needs numeric x/y for every star.
        let positions = table
            .pixel_positions()
            .map_err(|e| PipelineError::StarTable {
                path: star_table.clone(),
                source: e,
            })?;
        let (min, max) = positions.iter().fold(
            ((f64::MAX, f64::MAX), (f64::MIN, f64::MIN)),
            |(min, max), &(x, y)| ((min.0.min(x), min.1.min(y)), (max.0.max(x), max.1.max(y))),
        );
        debug!(?min, ?max, "Star field extent");
        info!(stars = table.star_count(), "Reference solved");

        Ok(ReferenceSolve {
            image: job.image,
            star_table,
            star_count: table.star_count(),
            detection,
        })
    }

    async fn process_filter(
        &self,
        layout: &DatasetLayout,
        filter: &str,
        reference: &FitsHeader,
        star_table: &Path,
    ) -> Result<FilterReport, PipelineError> {
        let filter_dir = layout.filter_dir(filter);
        let wcs_dir = layout.wcs_dir(filter);
        let images = discover_images(&filter_dir).map_err(|e| PipelineError::Pattern {
            path: filter_dir.clone(),
            source: e,
        })?;
        info!(filter = %filter, images = images.len(), "Processing filter");

        fs::create_dir(&wcs_dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                PipelineError::OutputExists {
                    path: wcs_dir.clone(),
                }
            } else {
                PipelineError::io(&wcs_dir, e)
            }
        })?;

        let mut merged = Vec::with_capacity(images.len());
        for (index, source) in images.into_iter().enumerate() {
            let output = layout.merged_image(filter, index + 1);
            merged.push(self.merge_image(reference, source, output).await?);
        }

        let filter_table = layout.filter_star_table(filter);
        let receipt = copy_verified(star_table, &filter_table).await?;
        debug!(
            filter = %filter,
            bytes = receipt.bytes,
            sha256 = %receipt.sha256,
            "Copied star table"
        );

        let to_refine = if self.config.refine.refine_last_image {
            merged.len()
        } else {
            merged.len().saturating_sub(1)
        };
        let mut refinements = Vec::with_capacity(to_refine);
        for image in merged.iter().take(to_refine) {
            let job = RefineJob {
                image: image.output.clone(),
                star_table: filter_table.clone(),
                working_dir: wcs_dir.clone(),
                iterations: self.config.refine.iterations,
                refined_suffix: self.config.refine.accepted_suffix.clone(),
            };
            refinements.push(self.refine(job).await?);
        }

        let sorted = self
            .sorter
            .sort_accepted(
                &wcs_dir,
                &layout.accurate_dir(filter),
                &self.config.refine.accepted_suffix,
            )
            .await?;

        let rejected: Vec<PathBuf> = merged
            .iter()
            .filter(|image| {
                !has_refined(
                    &sorted.accepted,
                    &image.output,
                    &self.config.refine.accepted_suffix,
                )
            })
            .map(|image| image.output.clone())
            .collect();
        if !rejected.is_empty() {
            warn!(
                filter = %filter,
                rejected = rejected.len(),
                "Some frames were not refined"
            );
        }

        Ok(FilterReport {
            filter: filter.to_string(),
            merged,
            refinements,
            accepted: sorted.accepted,
            rejected,
        })
    }

    async fn merge_image(
        &self,
        reference: &FitsHeader,
        source: PathBuf,
        output: PathBuf,
    ) -> Result<MergedImage, PipelineError> {
        let mut image = FitsFile::read(&source)
            .await
            .map_err(|e| PipelineError::fits(&source, e))?;
        let copied = self.merger.merge(reference, image.header_mut());
        image
            .write(&output)
            .await
            .map_err(|e| PipelineError::fits(&output, e))?;
        debug!(
            source = %source.display(),
            output = %output.display(),
            copied = copied.len(),
            "Merged header"
        );
        Ok(MergedImage {
            source,
            output,
            copied,
        })
    }

    async fn refine(&self, job: RefineJob) -> Result<RefinementOutcome, PipelineError> {
        match self.tools.refine_wcs(&job).await {
            Ok(run) => Ok(RefinementOutcome::Refined {
                image: job.image,
                run,
            }),
            Err(e) if self.config.refine.strict => {
                Err(PipelineError::tool("WCS refinement", job.image, e))
            }
            Err(e) => {
                warn!("WCS refinement failed for {}: {}", job.image.display(), e);
                Ok(RefinementOutcome::Failed {
                    image: job.image,
                    error: e.to_string(),
                })
            }
        }
    }
}

/// Whether the refined counterpart of `merged` is among the accepted files.
fn has_refined(accepted: &[PathBuf], merged: &Path, suffix: &str) -> bool {
    let Some(name) = refined_path(merged, suffix).file_name().map(|n| n.to_os_string()) else {
        return false;
    };
    accepted
        .iter()
        .any(|path| path.file_name() == Some(name.as_os_str()))
}

/// Runs the pipeline with default settings and the WCSTools programs found
/// on `PATH`.
pub async fn perform_astrometry<S: AsRef<str>>(
    dirtarget: impl AsRef<Path>,
    filters: &[S],
) -> Result<AstrometryReport, PipelineError> {
    let filters: Vec<String> = filters.iter().map(|f| f.as_ref().to_string()).collect();
    let pipeline = AstrometryPipeline::new(Config::default(), WcsTools::with_defaults());
    pipeline.run(dirtarget.as_ref(), &filters).await
}

//! End-to-end pipeline tests against the mock tools.
//!
//! Each test builds a small dataset under a temp directory, runs the full
//! pipeline and checks what ended up on disk.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wcsync_core::config::Config;
use wcsync_core::fits::{Card, FitsFile, FitsValue};
use wcsync_core::pipeline::{AstrometryPipeline, PipelineError};
use wcsync_core::star_table::StarTableError;
use wcsync_core::testing::{fixtures, MockAstrometryTools};
use wcsync_core::tools::{ToolError, ToolKind};

fn filters(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn pipeline(config: Config) -> (AstrometryPipeline<MockAstrometryTools>, MockAstrometryTools) {
    let tools = MockAstrometryTools::new();
    (AstrometryPipeline::new(config, tools.clone()), tools)
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().unwrap().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

// =============================================================================
// Header propagation
// =============================================================================

#[tokio::test]
async fn test_reference_keywords_reach_merged_frames() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 2)]).await.unwrap();
    let (pipeline, _) = pipeline(Config::default());

    pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let merged = FitsFile::read(&isr.join("V/WCS/wcs2.fits")).await.unwrap();
    let header = merged.header();
    assert_eq!(header.get_float("CRVAL1"), Some(10.0));
    assert_eq!(header.get_float("CRVAL2"), Some(41.2));
    assert_eq!(header.get_text("CTYPE1").as_deref(), Some("RA---TAN"));
    // Present in the frame, so the frame's value wins
    assert_eq!(header.get_float("EXPTIME"), Some(30.0));
    assert_eq!(
        header.value("FILTER"),
        Some(FitsValue::Text("V".to_string()))
    );
    assert_eq!(header.get_int("FRAMENUM"), Some(2));
}

#[tokio::test]
async fn test_commentary_is_never_copied() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 1)]).await.unwrap();
    let (pipeline, _) = pipeline(Config::default());

    let report = pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let merged = FitsFile::read(&isr.join("V/WCS/wcs1.fits")).await.unwrap();
    assert_eq!(merged.header().commentary("COMMENT").count(), 0);
    let history: Vec<&str> = merged
        .header()
        .commentary("HISTORY")
        .filter_map(|c| c.comment())
        .collect();
    assert_eq!(history.len(), 1);
    assert!(history[0].contains("bias and flat corrected"));

    let copied = &report.filters[0].merged[0].copied;
    assert!(copied.iter().all(|c| c.keyword != "COMMENT" && c.keyword != "HISTORY"));
    assert!(copied.iter().any(|c| c.keyword == "CRVAL1"));
}

#[tokio::test]
async fn test_originals_and_pixel_data_are_untouched() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 1)]).await.unwrap();
    let original = std::fs::read(isr.join("V/frame001.fits")).unwrap();
    let (pipeline, _) = pipeline(Config::default());

    pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    assert_eq!(std::fs::read(isr.join("V/frame001.fits")).unwrap(), original);
    let source = FitsFile::read(&isr.join("V/frame001.fits")).await.unwrap();
    let merged = FitsFile::read(&isr.join("V/WCS/wcs1.fits")).await.unwrap();
    assert_eq!(merged.data(), source.data());
    assert!(!source.header().contains("CRVAL1"));
}

#[tokio::test]
async fn test_configured_skip_keywords() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 1)]).await.unwrap();
    let mut config = Config::default();
    config.merge.skip_keywords.push("EQUINOX".to_string());
    let (pipeline, _) = pipeline(config);

    pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let merged = FitsFile::read(&isr.join("V/WCS/wcs1.fits")).await.unwrap();
    assert!(!merged.header().contains("EQUINOX"));
    assert!(merged.header().contains("CDELT1"));
}

#[tokio::test]
async fn test_long_string_reference_keyword_is_copied_whole() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 1)]).await.unwrap();
    let reference_path = isr.join("new-image.fits");
    let mut reference = FitsFile::read(&reference_path).await.unwrap();
    reference.header_mut().push(
        Card::new("PLTSOLVD", FitsValue::Text("solved with a &".into()), None)
            .continued("long description"),
    );
    reference.write(&reference_path).await.unwrap();
    let (pipeline, _) = pipeline(Config::default());

    pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let merged_path = isr.join("V/WCS/wcs1.fits");
    let merged = FitsFile::read(&merged_path).await.unwrap();
    assert_eq!(
        merged.header().get_text("PLTSOLVD").as_deref(),
        Some("solved with a long description")
    );

    let bytes = std::fs::read(&merged_path).unwrap();
    let records: Vec<&[u8]> = bytes.chunks(80).collect();
    let head = records
        .iter()
        .position(|r| r.starts_with(b"PLTSOLVD"))
        .unwrap();
    assert!(records[head + 1].starts_with(b"CONTINUE"));
    assert_eq!(
        records.iter().filter(|r| r.starts_with(b"CONTINUE")).count(),
        1
    );
}

#[tokio::test]
async fn test_non_ascii_frame_header_is_read() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 1)]).await.unwrap();
    let frame_path = isr.join("V/frame001.fits");
    let mut frame = FitsFile::read(&frame_path).await.unwrap();
    frame
        .header_mut()
        .push(Card::new("OBSERVER", FitsValue::Text("Josx".into()), None));
    let mut bytes = frame.to_bytes().unwrap();
    let at = bytes
        .chunks(80)
        .position(|r| r.starts_with(b"OBSERVER"))
        .unwrap()
        * 80;
    let x = at + bytes[at..at + 80].iter().position(|b| *b == b'x').unwrap();
    bytes[x] = 0xe9;
    std::fs::write(&frame_path, &bytes).unwrap();
    let (pipeline, _) = pipeline(Config::default());

    pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let merged = FitsFile::read(&isr.join("V/WCS/wcs1.fits")).await.unwrap();
    assert_eq!(merged.header().get_text("OBSERVER").as_deref(), Some("Jos?"));
    assert_eq!(merged.header().get_float("CRVAL1"), Some(10.0));
}

// =============================================================================
// Refinement and sorting
// =============================================================================

#[tokio::test]
async fn test_every_frame_is_merged_and_all_but_last_refined() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 4)]).await.unwrap();
    let (pipeline, tools) = pipeline(Config::default());

    let report = pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let wcs = isr.join("V/WCS");
    assert_eq!(
        file_names(&wcs),
        vec!["new-image.tab", "wcs1.fits", "wcs2.fits", "wcs3.fits", "wcs4.fits"]
    );
    assert_eq!(
        file_names(&wcs.join("accurate_WCS")),
        vec!["wcs1w.fits", "wcs2w.fits", "wcs3w.fits"]
    );
    assert_eq!(tools.refinement_count().await, 3);

    let filter = &report.filters[0];
    assert_eq!(filter.merged.len(), 4);
    assert_eq!(filter.accepted.len(), 3);
    assert_eq!(filter.rejected, vec![wcs.join("wcs4.fits")]);
}

#[tokio::test]
async fn test_refine_last_image() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 2)]).await.unwrap();
    let mut config = Config::default();
    config.refine.refine_last_image = true;
    let (pipeline, _) = pipeline(config);

    let report = pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    assert_eq!(
        file_names(&isr.join("V/WCS/accurate_WCS")),
        vec!["wcs1w.fits", "wcs2w.fits"]
    );
    assert!(report.filters[0].rejected.is_empty());
}

#[tokio::test]
async fn test_configured_refined_suffix_names_outputs() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 3)]).await.unwrap();
    let mut config = Config::default();
    config.refine.accepted_suffix = "_wcs.fits".to_string();
    let (pipeline, _) = pipeline(config);

    let report = pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let wcs = isr.join("V/WCS");
    assert_eq!(
        file_names(&wcs.join("accurate_WCS")),
        vec!["wcs1_wcs.fits", "wcs2_wcs.fits"]
    );
    assert_eq!(report.filters[0].rejected, vec![wcs.join("wcs3.fits")]);
}

#[tokio::test]
async fn test_refined_frames_keep_merged_header() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 2)]).await.unwrap();
    let (pipeline, _) = pipeline(Config::default());

    pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let refined = FitsFile::read(&isr.join("V/WCS/accurate_WCS/wcs1w.fits"))
        .await
        .unwrap();
    assert_eq!(refined.header().get_float("CRVAL1"), Some(10.0));
    assert!(refined
        .header()
        .commentary("HISTORY")
        .any(|c| c.comment().is_some_and(|t| t.contains("mock fitter"))));
}

#[tokio::test]
async fn test_refinement_jobs_use_absolute_paths() {
    let temp = TempDir::new().unwrap();
    fixtures::write_dataset(temp.path(), &[("V", 3)]).await.unwrap();
    let (pipeline, tools) = pipeline(Config::default());

    pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let detections = tools.recorded_detections().await;
    assert_eq!(detections.len(), 1);
    assert!(detections[0].image.is_absolute());
    assert_eq!(detections[0].threshold, 700);

    for job in tools.recorded_refinements().await {
        assert!(job.image.is_absolute());
        assert!(job.star_table.is_absolute());
        assert_eq!(job.star_table.parent(), Some(job.working_dir.as_path()));
        assert_eq!(job.iterations, 100);
    }
}

#[tokio::test]
async fn test_failed_refinement_is_recorded() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 4)]).await.unwrap();
    let (pipeline, tools) = pipeline(Config::default());
    tools.fail_refinement_of("wcs2.fits").await;

    let report = pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let filter = &report.filters[0];
    assert_eq!(filter.refinements.len(), 3);
    assert!(!filter.refinements[1].succeeded());
    assert_eq!(report.failed_count(), 1);
    assert_eq!(
        file_names(&isr.join("V/WCS/accurate_WCS")),
        vec!["wcs1w.fits", "wcs3w.fits"]
    );
    assert_eq!(
        filter.rejected,
        vec![isr.join("V/WCS/wcs2.fits"), isr.join("V/WCS/wcs4.fits")]
    );
}

#[tokio::test]
async fn test_strict_mode_aborts_on_failed_refinement() {
    let temp = TempDir::new().unwrap();
    fixtures::write_dataset(temp.path(), &[("V", 3)]).await.unwrap();
    let mut config = Config::default();
    config.refine.strict = true;
    let (pipeline, tools) = pipeline(config);
    tools.fail_refinement_of("wcs1.fits").await;

    let result = pipeline.run(temp.path(), &filters(&["V"])).await;

    match result {
        Err(PipelineError::Tool { source, path, .. }) => {
            assert!(matches!(source, ToolError::Failed { .. }));
            assert!(path.ends_with("wcs1.fits"));
        }
        other => panic!("expected tool error, got {:?}", other.map(|r| r.run_id)),
    }
    assert_eq!(tools.refinement_count().await, 1);
}

// =============================================================================
// Star table handling
// =============================================================================

#[tokio::test]
async fn test_star_table_reaches_every_filter() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("B", 2), ("V", 2), ("R", 2)])
        .await
        .unwrap();
    let (pipeline, _) = pipeline(Config::default());

    let report = pipeline
        .run(temp.path(), &filters(&["B", "V", "R"]))
        .await
        .unwrap();

    let tables: Vec<Vec<u8>> = ["B", "V", "R"]
        .iter()
        .map(|f| std::fs::read(isr.join(f).join("WCS/new-image.tab")).unwrap())
        .collect();
    assert!(tables.windows(2).all(|w| w[0] == w[1]));
    assert!(!isr.join("new-image.tab").exists());
    assert_eq!(report.reference.star_count, 25);
    assert_eq!(report.accepted_count(), 3);
}

#[tokio::test]
async fn test_empty_star_table_fails() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 2)]).await.unwrap();
    let (pipeline, tools) = pipeline(Config::default());
    tools.set_star_count(0).await;

    let result = pipeline.run(temp.path(), &filters(&["V"])).await;

    assert!(matches!(result, Err(PipelineError::EmptyStarTable { .. })));
    assert!(!isr.join("V/WCS").exists());
}

#[tokio::test]
async fn test_star_table_without_positions_fails() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 2)]).await.unwrap();
    std::fs::write(
        isr.join("new-image.tab"),
        "num\tra\tdec\tmag\tx\ty\n---\t--\t---\t---\t-\t-\n1\t10.0\t41.2\t12.1\tn/a\t7.5\n",
    )
    .unwrap();
    let (pipeline, tools) = pipeline(Config::default());
    tools.set_write_star_table(false).await;

    let result = pipeline.run(temp.path(), &filters(&["V"])).await;

    assert!(matches!(
        result,
        Err(PipelineError::StarTable {
            source: StarTableError::InvalidValue { ref column, row: 1, .. },
            ..
        }) if column == "x"
    ));
    assert!(!isr.join("V/WCS").exists());
}

#[tokio::test]
async fn test_missing_star_table_fails() {
    let temp = TempDir::new().unwrap();
    fixtures::write_dataset(temp.path(), &[("V", 2)]).await.unwrap();
    let (pipeline, tools) = pipeline(Config::default());
    tools.set_write_star_table(false).await;

    let result = pipeline.run(temp.path(), &filters(&["V"])).await;
    assert!(matches!(result, Err(PipelineError::StarTableMissing { .. })));
}

#[tokio::test]
async fn test_detection_failure_is_fatal() {
    let temp = TempDir::new().unwrap();
    fixtures::write_dataset(temp.path(), &[("V", 2)]).await.unwrap();
    let (pipeline, tools) = pipeline(Config::default());
    tools
        .set_next_detection_error(ToolError::failed(
            ToolKind::StarDetector,
            Some(2),
            "cannot read image",
        ))
        .await;

    let result = pipeline.run(temp.path(), &filters(&["V"])).await;
    assert!(matches!(
        result,
        Err(PipelineError::Tool {
            stage: "Star detection",
            ..
        })
    ));
    assert_eq!(tools.refinement_count().await, 0);
}

// =============================================================================
// Layout checks
// =============================================================================

#[tokio::test]
async fn test_existing_output_directory_fails_before_detection() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("B", 1), ("V", 1)])
        .await
        .unwrap();
    std::fs::create_dir(isr.join("V/WCS")).unwrap();
    let (pipeline, tools) = pipeline(Config::default());

    let result = pipeline.run(temp.path(), &filters(&["B", "V"])).await;

    match result {
        Err(PipelineError::OutputExists { path }) => assert_eq!(path, isr.join("V/WCS")),
        other => panic!("expected OutputExists, got {:?}", other.map(|r| r.run_id)),
    }
    assert_eq!(tools.detection_count().await, 0);
    assert!(!isr.join("B/WCS").exists());
}

#[tokio::test]
async fn test_second_run_is_rejected() {
    let temp = TempDir::new().unwrap();
    fixtures::write_dataset(temp.path(), &[("V", 2)]).await.unwrap();
    let (pipeline, _) = pipeline(Config::default());

    pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();
    let second = pipeline.run(temp.path(), &filters(&["V"])).await;
    assert!(matches!(second, Err(PipelineError::OutputExists { .. })));
}

#[tokio::test]
async fn test_missing_filter_and_reference() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 1)]).await.unwrap();
    let (pipeline, _) = pipeline(Config::default());

    let missing_filter = pipeline.run(temp.path(), &filters(&["V", "I"])).await;
    assert!(matches!(
        missing_filter,
        Err(PipelineError::FilterDirNotFound { path }) if path == isr.join("I")
    ));

    std::fs::remove_file(isr.join("new-image.fits")).unwrap();
    let missing_reference = pipeline.run(temp.path(), &filters(&["V"])).await;
    assert!(matches!(
        missing_reference,
        Err(PipelineError::ReferenceNotFound { .. })
    ));
}

#[tokio::test]
async fn test_empty_filter_directory() {
    let temp = TempDir::new().unwrap();
    let isr = fixtures::write_dataset(temp.path(), &[("V", 0)]).await.unwrap();
    let (pipeline, tools) = pipeline(Config::default());

    let report = pipeline.run(temp.path(), &filters(&["V"])).await.unwrap();

    let filter = &report.filters[0];
    assert!(filter.merged.is_empty());
    assert!(filter.refinements.is_empty());
    assert!(isr.join("V/WCS/accurate_WCS").is_dir());
    assert_eq!(tools.refinement_count().await, 0);
}

#[tokio::test]
async fn test_relative_root_is_resolved() {
    let temp = TempDir::new().unwrap();
    fixtures::write_dataset(temp.path(), &[("V", 1)]).await.unwrap();
    let (pipeline, _) = pipeline(Config::default());

    let cwd = std::env::current_dir().unwrap();
    let relative: PathBuf = relative_to(temp.path(), &cwd);
    let report = pipeline.run(&relative, &filters(&["V"])).await.unwrap();
    assert!(report.root.is_absolute());
}

/// `target` expressed relative to `base` through the filesystem root.
fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let mut relative = PathBuf::new();
    for _ in base.components().skip(1) {
        relative.push("..");
    }
    relative.join(target.strip_prefix("/").unwrap())
}

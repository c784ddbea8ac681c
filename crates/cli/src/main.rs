use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sha2::{Digest, Sha256};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wcsync_core::{
    load_config, load_config_with_env, validate_config, AstrometryPipeline, AstrometryReport,
    AstrometryTools, Config, WcsTools,
};

/// Attach refined WCS solutions to calibrated FITS frames.
#[derive(Debug, Parser)]
#[command(name = "wcsync", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "WCSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Filter subdirectory to process (repeatable, replaces dataset.filters)
    #[arg(short, long = "filter", value_name = "NAME")]
    filters: Vec<String>,

    /// Abort on the first failed refinement
    #[arg(long)]
    strict: bool,

    /// Also refine the last frame of each filter
    #[arg(long)]
    refine_last: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Dataset root (replaces dataset.root)
    dataset: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_config_with_env().context("Failed to load config from environment")?,
    };
    apply_overrides(&mut config, &args);
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Configuration loaded (hash {})", &config_hash[..16]);

    let root = config
        .dataset
        .root()
        .map(PathBuf::from)
        .context("No dataset root given")?;
    let filters = config.dataset.filters.clone();

    let tools = WcsTools::new(config.tools.clone());
    tools.validate().await.context("WCSTools are not available")?;
    info!(
        "Using {} ({:?}, {:?})",
        tools.name(),
        config.tools.imstar_path,
        config.tools.imwcs_path
    );

    let pipeline = AstrometryPipeline::new(config, tools);
    let report = pipeline
        .run(&root, &filters)
        .await
        .with_context(|| format!("Astrometry failed for {:?}", root))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

/// Command-line flags win over file and environment values.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(dataset) = &args.dataset {
        config.dataset.root = Some(dataset.clone());
    }
    if !args.filters.is_empty() {
        config.dataset.filters = args.filters.clone();
    }
    if args.strict {
        config.refine.strict = true;
    }
    if args.refine_last {
        config.refine.refine_last_image = true;
    }
}

fn print_summary(report: &AstrometryReport) {
    println!("Run {} ({} ms)", report.run_id, report.duration_ms);
    println!(
        "Reference: {} ({} stars)",
        report.reference.image.display(),
        report.reference.star_count
    );
    for filter in &report.filters {
        let failed = filter.refinements.iter().filter(|r| !r.succeeded()).count();
        println!(
            "  {}: {} merged, {} refined, {} failed, {} without refined copy",
            filter.filter,
            filter.merged.len(),
            filter.accepted.len(),
            failed,
            filter.rejected.len()
        );
    }
}

pub mod config;
pub mod dataset;
pub mod fits;
pub mod merge;
pub mod pipeline;
pub mod sorter;
pub mod star_table;
pub mod testing;
pub mod tools;

pub use config::{
    load_config, load_config_from_str, load_config_with_env, validate_config, Config,
    ConfigError,
};
pub use fits::{Card, FitsError, FitsFile, FitsHeader, FitsValue};
pub use merge::{HeaderMerger, KeywordDiff};
pub use pipeline::{
    perform_astrometry, AstrometryPipeline, AstrometryReport, FilterReport, PipelineError,
    RefinementOutcome,
};
pub use star_table::{StarTable, StarTableError};
pub use tools::{AstrometryTools, ToolError, ToolsConfig, WcsTools};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::tools::ToolsConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub refine: RefineConfig,
}

/// Dataset location and directory naming
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetConfig {
    /// Dataset root (the directory holding the ISR directory)
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Filter subdirectory names, processed in order
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default = "default_isr_dir")]
    pub isr_dir: String,
    #[serde(default = "default_reference_image")]
    pub reference_image: String,
    #[serde(default = "default_wcs_dir")]
    pub wcs_dir: String,
    #[serde(default = "default_accurate_dir")]
    pub accurate_dir: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: None,
            filters: Vec::new(),
            isr_dir: default_isr_dir(),
            reference_image: default_reference_image(),
            wcs_dir: default_wcs_dir(),
            accurate_dir: default_accurate_dir(),
        }
    }
}

impl DatasetConfig {
    /// Root directory, if configured
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

fn default_isr_dir() -> String {
    "ISR_Images".to_string()
}

fn default_reference_image() -> String {
    "new-image.fits".to_string()
}

fn default_wcs_dir() -> String {
    "WCS".to_string()
}

fn default_accurate_dir() -> String {
    "accurate_WCS".to_string()
}

/// Star detection parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionConfig {
    /// Minimum peak value for a detected star (default: 700)
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> u32 {
    700
}

/// Header propagation parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeConfig {
    /// Keywords never copied from the reference header
    #[serde(default = "default_skip_keywords")]
    pub skip_keywords: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            skip_keywords: default_skip_keywords(),
        }
    }
}

fn default_skip_keywords() -> Vec<String> {
    vec!["COMMENT".to_string(), "HISTORY".to_string()]
}

/// WCS refinement and sorting parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefineConfig {
    /// Value passed to the fitter's `-i` flag (default: 100)
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// File name suffix marking a successful refinement
    #[serde(default = "default_accepted_suffix")]
    pub accepted_suffix: String,
    /// Also refine the last numbered image of each filter
    #[serde(default)]
    pub refine_last_image: bool,
    /// Abort the run on the first refinement failure
    #[serde(default)]
    pub strict: bool,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            accepted_suffix: default_accepted_suffix(),
            refine_last_image: false,
            strict: false,
        }
    }
}

fn default_iterations() -> u32 {
    100
}

fn default_accepted_suffix() -> String {
    "w.fits".to_string()
}

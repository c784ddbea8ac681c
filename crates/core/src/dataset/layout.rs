use std::path::{Path, PathBuf};

use crate::config::DatasetConfig;

/// Resolves every path the pipeline reads or writes.
///
/// All returned paths are absolute when the root is absolute; callers make
/// the root absolute once up front.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
    isr_dir: String,
    reference_image: String,
    wcs_dir: String,
    accurate_dir: String,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>, config: &DatasetConfig) -> Self {
        Self {
            root: root.into(),
            isr_dir: config.isr_dir.clone(),
            reference_image: config.reference_image.clone(),
            wcs_dir: config.wcs_dir.clone(),
            accurate_dir: config.accurate_dir.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn isr_dir(&self) -> PathBuf {
        self.root.join(&self.isr_dir)
    }

    pub fn reference_image(&self) -> PathBuf {
        self.isr_dir().join(&self.reference_image)
    }

    /// Star table the detector writes beside the reference image.
    pub fn star_table(&self) -> PathBuf {
        self.reference_image().with_extension("tab")
    }

    pub fn filter_dir(&self, filter: &str) -> PathBuf {
        self.isr_dir().join(filter)
    }

    pub fn wcs_dir(&self, filter: &str) -> PathBuf {
        self.filter_dir(filter).join(&self.wcs_dir)
    }

    pub fn accurate_dir(&self, filter: &str) -> PathBuf {
        self.wcs_dir(filter).join(&self.accurate_dir)
    }

    /// Copy of the star table inside a filter's WCS directory.
    pub fn filter_star_table(&self, filter: &str) -> PathBuf {
        let name = self
            .star_table()
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        self.wcs_dir(filter).join(name)
    }

    /// Merged frame number `n` (1-based) of a filter.
    pub fn merged_image(&self, filter: &str, n: usize) -> PathBuf {
        self.wcs_dir(filter).join(format!("wcs{}.fits", n))
    }
}

/// Lists the `*.fits` files directly inside `dir`, sorted by path.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>, glob::PatternError> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{}/*.fits", escaped);
    let mut images: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    images.sort();
    Ok(images)
}

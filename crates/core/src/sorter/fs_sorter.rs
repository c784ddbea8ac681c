//! File system sorter implementation.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info};

use super::error::SortError;

/// Buffer size for copies.
const BUFFER_SIZE: usize = 1024 * 1024;

/// Outcome of a verified copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReceipt {
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the copied content.
    pub sha256: String,
}

/// Outcome of one sorting pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SortResult {
    /// Files moved, at their new location.
    pub accepted: Vec<PathBuf>,
    /// FITS files left behind because they lack the accepted suffix.
    pub rejected: Vec<PathBuf>,
    pub duration_ms: u64,
}

/// Moves refined frames into their output directory.
#[derive(Debug, Clone, Default)]
pub struct FileSorter;

impl FileSorter {
    pub fn new() -> Self {
        Self
    }

    /// Moves every regular file in `dir` whose name ends in `suffix` into
    /// `destination`, which must not exist yet.
    pub async fn sort_accepted(
        &self,
        dir: &Path,
        destination: &Path,
        suffix: &str,
    ) -> Result<SortResult, SortError> {
        let start = Instant::now();

        // Collect before creating the destination so it is never scanned.
        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();

        fs::create_dir(destination).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                SortError::DestinationExists {
                    path: destination.to_path_buf(),
                }
            } else {
                SortError::DirectoryCreationFailed {
                    path: destination.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let mut result = SortResult::default();
        for name in names {
            let source = dir.join(&name);
            if name.ends_with(suffix) {
                let target = destination.join(&name);
                move_file(&source, &target).await?;
                debug!("Accepted {}", name);
                result.accepted.push(target);
            } else if name.ends_with(".fits") {
                result.rejected.push(source);
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            accepted = result.accepted.len(),
            rejected = result.rejected.len(),
            "Sorted {}",
            dir.display()
        );
        Ok(result)
    }
}

/// Attempts to move a file atomically (rename).
async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(true),
        Err(e) => {
            // Cross-filesystem moves fail with EXDEV (18 on Linux)
            if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                Ok(false)
            } else {
                Err(e)
            }
        }
    }
}

/// Moves `source` to `destination`, refusing to overwrite.
pub async fn move_file(source: &Path, destination: &Path) -> Result<(), SortError> {
    if !source.exists() {
        return Err(SortError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }
    if destination.exists() {
        return Err(SortError::DestinationExists {
            path: destination.to_path_buf(),
        });
    }

    let moved = try_atomic_move(source, destination)
        .await
        .map_err(|e| SortError::move_failed(source.to_path_buf(), destination.to_path_buf(), e))?;
    if !moved {
        debug!(
            "Rename across devices, copying {} instead",
            source.display()
        );
        copy_verified(source, destination).await?;
        fs::remove_file(source).await.map_err(|e| {
            SortError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;
    }
    Ok(())
}

/// Copies `source` to `destination` and checks the copy's SHA-256.
pub async fn copy_verified(source: &Path, destination: &Path) -> Result<CopyReceipt, SortError> {
    let source_file = File::open(source).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SortError::SourceNotFound {
                path: source.to_path_buf(),
            }
        } else {
            SortError::Io(e)
        }
    })?;
    let dest_file = File::create(destination)
        .await
        .map_err(|e| SortError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e))?;

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, source_file);
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, dest_file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut bytes = 0u64;

    loop {
        let read = reader
            .read(&mut buffer)
            .await
            .map_err(|e| SortError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        writer
            .write_all(&buffer[..read])
            .await
            .map_err(|e| SortError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e))?;
        bytes += read as u64;
    }
    writer
        .flush()
        .await
        .map_err(|e| SortError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e))?;

    let expected = format!("{:x}", hasher.finalize());
    let actual = sha256_file(destination).await?;
    if actual != expected {
        return Err(SortError::ChecksumMismatch {
            path: destination.to_path_buf(),
            expected,
            actual,
        });
    }

    Ok(CopyReceipt {
        bytes,
        sha256: expected,
    })
}

async fn sha256_file(path: &Path) -> Result<String, SortError> {
    let file = File::open(path).await?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

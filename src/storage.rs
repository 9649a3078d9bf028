//! Persist an [`OutputTree`] to disk.
//!
//! A tree is never written into its final directory directly. Files go into
//! a staging sibling first; once every file is on disk the staging directory
//! is swapped in with two renames. A failed or interrupted write leaves the
//! previous site (or nothing) in place, and rerunning the same write is
//! always safe.
//!
//! ```text
//! out/            <- previous site, still served
//! .out.staging/   <- new files written here
//!
//! rename out -> .out.previous
//! rename .out.staging -> out
//! remove .out.previous
//! ```

use crate::error::DeckError;
use crate::output::{OutputFile, OutputTree};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Files written concurrently while staging.
const WRITE_CONCURRENCY: usize = 8;

/// Summary of a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub files: usize,
    pub bytes: u64,
}

fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf, DeckError> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DeckError::InvalidConfig(format!("Invalid output directory '{}'", dir.display())))?;
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(format!(".{name}.{suffix}")))
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> DeckError + '_ {
    move |source| DeckError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

async fn remove_dir_if_exists(path: &Path) -> Result<(), DeckError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(write_err(path)(e)),
    }
}

async fn write_one(root: &Path, rel: &str, file: &OutputFile) -> Result<(), DeckError> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_err(parent))?;
    }
    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(write_err(&path))?;
    debug!("Staged {} ({} bytes)", rel, file.bytes.len());
    Ok(())
}

/// Write `tree` so that `dir` holds exactly its files.
///
/// Anything previously in `dir` is replaced as a whole.
pub async fn write_tree(tree: &OutputTree, dir: &Path) -> Result<WriteReport, DeckError> {
    if let Some(bad) = tree.first_unsafe_path() {
        return Err(DeckError::UnsafeOutputPath {
            path: bad.to_string(),
        });
    }

    let staging = sibling(dir, "staging")?;
    let previous = sibling(dir, "previous")?;

    remove_dir_if_exists(&staging).await?;
    tokio::fs::create_dir_all(&staging)
        .await
        .map_err(write_err(&staging))?;

    let staged = stream::iter(tree.files().map(|(rel, file)| {
        let staging = staging.as_path();
        async move { write_one(staging, rel, file).await }
    }))
    .buffer_unordered(WRITE_CONCURRENCY)
    .try_collect::<Vec<()>>()
    .await;

    if let Err(e) = staged {
        warn!("Write to {} failed, discarding staged files", dir.display());
        let _ = tokio::fs::remove_dir_all(&staging).await;
        return Err(e);
    }

    swap_into_place(&staging, &previous, dir).await?;

    let report = WriteReport {
        files: tree.len(),
        bytes: tree.total_bytes(),
    };
    info!(
        "Wrote {} files ({} bytes) to {}",
        report.files,
        report.bytes,
        dir.display()
    );
    Ok(report)
}

async fn swap_into_place(staging: &Path, previous: &Path, dir: &Path) -> Result<(), DeckError> {
    remove_dir_if_exists(previous).await?;

    let had_previous = match tokio::fs::rename(dir, previous).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            let _ = tokio::fs::remove_dir_all(staging).await;
            return Err(write_err(dir)(e));
        }
    };

    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_err(parent))?;
    }

    if let Err(e) = tokio::fs::rename(staging, dir).await {
        if had_previous {
            let _ = tokio::fs::rename(previous, dir).await;
        }
        let _ = tokio::fs::remove_dir_all(staging).await;
        return Err(write_err(dir)(e));
    }

    if had_previous {
        if let Err(e) = tokio::fs::remove_dir_all(previous).await {
            warn!("Could not remove {}: {}", previous.display(), e);
        }
    }
    Ok(())
}

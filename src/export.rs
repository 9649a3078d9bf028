//! Hand a generated site to the archive and deploy collaborators.
//!
//! Both consume a directory written by [`crate::storage::write_tree`]
//! verbatim: [`archive_dir`] zips it for download, [`deploy_manifest`]
//! lists every file by content hash, which is what hash-addressed upload
//! APIs ask for before accepting file bodies. The upload itself is not
//! part of this crate.

use crate::error::DeckError;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;

/// Relative paths (forward slashes) of every regular file under `dir`, in
/// byte order.
pub fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, DeckError> {
    if !dir.is_dir() {
        return Err(DeckError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| DeckError::ArchiveFailed {
            path: dir.to_path_buf(),
            detail: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| DeckError::Internal(format!("strip prefix: {e}")))?;
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((rel, entry.path().to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Zip every file under `dir` into `zip_path`.
///
/// Entries are sorted and carry a fixed timestamp, so archiving the same
/// tree twice yields identical bytes. The archive is written next to its
/// destination and renamed into place. Returns the number of entries.
pub fn archive_dir(dir: &Path, zip_path: &Path) -> Result<usize, DeckError> {
    let files = list_files(dir)?;
    let failed = |detail: String| DeckError::ArchiveFailed {
        path: zip_path.to_path_buf(),
        detail,
    };

    let tmp_path = zip_path.with_extension("zip.tmp");
    let file = File::create(&tmp_path).map_err(|e| DeckError::OutputWriteFailed {
        path: tmp_path.clone(),
        source: e,
    })?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let write_all = |zip: &mut zip::ZipWriter<BufWriter<File>>| -> Result<(), DeckError> {
        for (rel, path) in &files {
            let data = std::fs::read(path).map_err(|e| failed(format!("{rel}: {e}")))?;
            zip.start_file(rel.as_str(), options)
                .map_err(|e| failed(format!("{rel}: {e}")))?;
            zip.write_all(&data)
                .map_err(|e| failed(format!("{rel}: {e}")))?;
            debug!("Archived {} ({} bytes)", rel, data.len());
        }
        Ok(())
    };

    let result = write_all(&mut zip).and_then(|()| {
        zip.finish()
            .map_err(|e| failed(e.to_string()))?
            .flush()
            .map_err(|e| failed(e.to_string()))
    });
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, zip_path).map_err(|e| DeckError::OutputWriteFailed {
        path: zip_path.to_path_buf(),
        source: e,
    })?;
    info!(
        "Archived {} files from {} into {}",
        files.len(),
        dir.display(),
        zip_path.display()
    );
    Ok(files.len())
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Map every file under `dir` to the SHA-256 of its contents.
pub fn deploy_manifest(dir: &Path) -> Result<BTreeMap<String, String>, DeckError> {
    let mut manifest = BTreeMap::new();
    for (rel, path) in list_files(dir)? {
        let data = std::fs::read(&path).map_err(|e| DeckError::ArchiveFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        manifest.insert(rel, sha256_hex(&data));
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("js")).unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>hi</p>").unwrap();
        std::fs::write(dir.path().join("js/slideshow.js"), "x").unwrap();
        dir
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn manifest_uses_relative_forward_slash_paths() {
        let dir = site();
        let m = deploy_manifest(dir.path()).unwrap();
        let keys: Vec<_> = m.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["index.html", "js/slideshow.js"]);
        assert_eq!(m["js/slideshow.js"], sha256_hex(b"x"));
    }

    #[test]
    fn archive_is_reproducible() {
        let dir = site();
        let out = tempfile::tempdir().unwrap();
        let a = out.path().join("a.zip");
        let b = out.path().join("b.zip");
        assert_eq!(archive_dir(dir.path(), &a).unwrap(), 2);
        archive_dir(dir.path(), &b).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
        assert!(!out.path().join("a.zip.tmp").exists());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let out = tempfile::tempdir().unwrap();
        let err = deploy_manifest(&out.path().join("nope")).unwrap_err();
        assert!(matches!(err, DeckError::FileNotFound { .. }));
    }
}

//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! pdfium wants a file-system path, so URLs are downloaded into a `TempDir`
//! that lives as long as the [`ResolvedInput`]. The `%PDF` magic bytes are
//! checked up front so callers get [`DeckError::NotAPdf`] instead of an
//! opaque pdfium failure.

use crate::error::DeckError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input — either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in a temp directory kept alive here.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// `Err(NotAPdf)` unless `bytes` start with `%PDF`. Inputs shorter than the
/// magic are let through for pdfium to reject.
pub fn check_magic(bytes: &[u8], path: &Path) -> Result<(), DeckError> {
    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(DeckError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Resolve the input string to a local PDF file path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, DeckError> {
    if input.trim().is_empty() {
        return Err(DeckError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, DeckError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(DeckError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() {
                check_magic(&magic, &path)?;
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DeckError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(DeckError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, DeckError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| DeckError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DeckError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = filename_from_url(url);
    let temp_dir = TempDir::new().map_err(|e| DeckError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            DeckError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    check_magic(&bytes, &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| DeckError::OutputWriteFailed {
            path: file_path.clone(),
            source: e,
        })?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last URL path segment if it looks like a file name, else `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_path() {
        assert_eq!(filename_from_url("https://x.example/a/deck.pdf?x=1"), "deck.pdf");
        assert_eq!(filename_from_url("https://x.example/a/"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://x.example/download"), "downloaded.pdf");
    }

    #[test]
    fn magic_check() {
        let p = Path::new("x.pdf");
        assert!(check_magic(b"%PDF-1.7", p).is_ok());
        assert!(check_magic(b"%P", p).is_ok());
        assert!(matches!(
            check_magic(b"<html>", p),
            Err(DeckError::NotAPdf { magic, .. }) if &magic == b"<htm"
        ));
    }

    #[tokio::test]
    async fn local_resolution_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.pdf");
        let err = resolve_input(missing.to_str().unwrap(), 5).await.err().unwrap();
        assert!(matches!(err, DeckError::FileNotFound { .. }));

        let html = dir.path().join("page.pdf");
        std::fs::write(&html, "<html></html>").unwrap();
        let err = resolve_input(html.to_str().unwrap(), 5).await.err().unwrap();
        assert!(matches!(err, DeckError::NotAPdf { .. }));

        let pdf = dir.path().join("ok.pdf");
        std::fs::write(&pdf, "%PDF-1.4\n").unwrap();
        let resolved = resolve_input(pdf.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.path(), pdf.as_path());

        assert!(matches!(
            resolve_input("  ", 5).await.err().unwrap(),
            DeckError::InvalidInput { .. }
        ));
    }
}

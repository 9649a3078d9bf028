//! Error types for the pdfdeck library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DeckError`] — **Fatal**: a collaborator around the template core
//!   cannot proceed (unreadable PDF, storage write failed, job not ready).
//!   Returned as `Err(DeckError)` from the `build_*`, storage, store, and
//!   export functions.
//!
//! * [`AssemblyWarning`] — **Non-fatal**: one input was inconsistent (a
//!   hotspot points at a page that does not exist, a page fragment is
//!   missing) and the generator degraded gracefully. Warnings travel inside
//!   [`crate::output::OutputTree`]; [`crate::template::generate`] itself
//!   never fails.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfdeck library.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.\n\
Pre-built binaries: https://github.com/bblanchon/pdfium-binaries\n"
    )]
    PdfiumBindingFailed(String),

    // ── Storage errors ────────────────────────────────────────────────────
    /// Could not create or write a file of the output tree.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output tree entry would escape the target directory.
    #[error("Refusing to write '{path}': output paths must be relative and stay inside the site root")]
    UnsafeOutputPath { path: String },

    /// Zip archive could not be produced.
    #[error("Failed to archive '{path}': {detail}")]
    ArchiveFailed { path: PathBuf, detail: String },

    // ── Job errors ────────────────────────────────────────────────────────
    /// No job with this identifier exists in the store.
    #[error("Job '{id}' not found")]
    JobNotFound { id: String },

    /// The caller asked for a step whose prerequisite has not run yet.
    #[error("Job '{id}' is not ready: {reason}")]
    JobNotReady { id: String, reason: String },

    /// The job store file exists but cannot be parsed.
    #[error("Job store '{path}' is unreadable: {detail}")]
    StoreCorrupt { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal inconsistency found while assembling a deck.
///
/// The generator substitutes a placeholder or drops the offending item,
/// records one of these, and carries on.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AssemblyWarning {
    /// Hotspot references a page outside `0..page_count`; no overlay emitted.
    #[error("Hotspot '{id}' references page index {page_index} but the deck has {page_count} pages; skipped")]
    HotspotOutOfRange {
        id: String,
        page_index: i64,
        page_count: usize,
    },

    /// No fragment was supplied for this page; a placeholder was rendered.
    #[error("Page {page}: no fragment supplied, rendered placeholder")]
    MissingPage { page: usize },

    /// Two fragments claim the same page number; the first one wins.
    #[error("Page {page}: duplicate fragment ignored")]
    DuplicatePage { page: usize },

    /// The requested page count exceeded the deck size limit.
    #[error("Page count {requested} exceeds the limit of {max}; clamped")]
    PageCountClamped { requested: usize, max: usize },

    /// A fragment's page number lies outside `1..=page_count`.
    #[error("Page {page}: outside 1..={page_count}, fragment ignored")]
    PageOutOfRange { page: usize, page_count: usize },
}

/// Rejection of a lead-capture submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Field '{field}' is required")]
    MissingField { field: String },

    #[error("Field '{field}' is not a valid email address")]
    InvalidEmail { field: String },
}

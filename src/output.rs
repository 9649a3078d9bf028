//! Output types: the generated site tree and build results.
//!
//! An [`OutputTree`] is the in-memory form of a generated site: relative
//! path → file bytes, plus any [`AssemblyWarning`]s raised along the way.
//! Persisting it is [`crate::storage`]'s job; archiving or deploying the
//! persisted directory is [`crate::export`]'s.
//!
//! Paths use forward slashes, never start with `/`, and never contain `..`,
//! so the tree can be unpacked anywhere.

use crate::error::AssemblyWarning;
use crate::model::TemplateKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entry point of every generated site.
pub const INDEX_PATH: &str = "index.html";

/// One file of a generated site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

impl OutputFile {
    pub fn text(contents: impl Into<String>, media_type: &'static str) -> Self {
        Self {
            bytes: contents.into().into_bytes(),
            media_type,
        }
    }

    pub fn binary(bytes: Vec<u8>, media_type: &'static str) -> Self {
        Self { bytes, media_type }
    }

    /// Contents as UTF-8, if they are.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// A complete, relocatable static site.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputTree {
    pub template: TemplateKind,
    files: BTreeMap<String, OutputFile>,
    pub warnings: Vec<AssemblyWarning>,
}

impl OutputTree {
    pub fn new(template: TemplateKind) -> Self {
        Self {
            template,
            files: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, file: OutputFile) {
        self.files.insert(path.into(), file);
    }

    pub fn get(&self, path: &str) -> Option<&OutputFile> {
        self.files.get(path)
    }

    /// Text contents of `path`, if present and UTF-8.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(OutputFile::as_str)
    }

    pub fn index_html(&self) -> Option<&str> {
        self.text(INDEX_PATH)
    }

    /// Files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &OutputFile)> {
        self.files.iter().map(|(p, f)| (p.as_str(), f))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.values().map(|f| f.bytes.len() as u64).sum()
    }

    /// The first path that would escape a site root, if any.
    pub fn first_unsafe_path(&self) -> Option<&str> {
        self.paths().find(|p| !is_relative_safe(p))
    }
}

/// A path is safe when it is relative, non-empty, and has no `..`, `.` or
/// empty segments.
pub fn is_relative_safe(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && !path.contains(':')
        && path
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

/// Media type for a site file, from its extension.
pub fn media_type_for(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Metadata read from a PDF without rendering it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Timing and volume figures for one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages rasterised and placed in the deck.
    pub rendered_pages: usize,
    /// Selected pages that could not be rasterised (placeholders used).
    pub failed_pages: usize,
    pub file_count: usize,
    pub total_bytes: u64,
    pub warning_count: usize,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a full PDF → site build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub tree: OutputTree,
    pub metadata: DocumentInfo,
    pub stats: BuildStats,
}

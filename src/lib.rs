//! # pdfdeck
//!
//! Turn PDF pages into self-contained interactive sites: a slideshow, a
//! flip-book, or a scrolling document, optionally gated behind a
//! lead-capture form.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Render    rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode    PNG assets + <img> page fragments
//!  ├─ 4. Generate  fragments + hotspots + gate policy → static site tree
//!  └─ 5. Output    atomic write, zip archive, content-hash manifest
//! ```
//!
//! Step 4 is a pure function, [`generate`], and can be driven without a PDF
//! at all from fragments produced elsewhere.
//!
//! ## Quick Start
//!
//! ```rust
//! use pdfdeck::{generate, Hotspot, LeadGatePolicy, Page, TemplateJob, TemplateKind};
//!
//! let mut job = TemplateJob::new(TemplateKind::Flipbook, "Quarterly review");
//! job.pages = vec![Page::new(1, "<p>Hello</p>"), Page::new(2, "<p>Numbers</p>")];
//! job.hotspots.push(Hotspot {
//!     id: "cta".into(),
//!     page_index: 0,
//!     top: 80.0,
//!     left: 10.0,
//!     width: 30.0,
//!     height: 8.0,
//!     url: "https://example.com/signup".into(),
//!     label: Some("Sign up".into()),
//! });
//! job.lead_gate = LeadGatePolicy::enabled(1);
//!
//! let site = generate(&job);
//! assert!(site.index_html().unwrap().contains("Quarterly review"));
//! assert!(site.warnings.is_empty());
//! ```
//!
//! Building from a PDF needs a pdfium library (`PDFIUM_LIB_PATH` or a system
//! install):
//!
//! ```rust,no_run
//! use pdfdeck::{build_deck_to_dir, BuildConfig, TemplateJob};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stats = build_deck_to_dir(
//!         "slides.pdf",
//!         &TemplateJob::default(),
//!         "site/",
//!         &BuildConfig::default(),
//!     )
//!     .await?;
//!     eprintln!("{} pages, {} files", stats.rendered_pages, stats.file_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfdeck` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfdeck = { version = "0.4", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod dom;
pub mod error;
pub mod export;
pub mod fragment;
pub mod gate;
pub mod geometry;
pub mod model;
pub mod nav;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;
pub mod store;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BuildConfig, BuildConfigBuilder, PageSelection};
pub use convert::{
    build_deck, build_deck_from_bytes, build_deck_sync, build_deck_to_dir,
    generate_from_fragments, inspect,
};
pub use error::{AssemblyWarning, DeckError, SubmissionError};
pub use export::{archive_dir, deploy_manifest};
pub use gate::{Gate, GateState, GateStore, MemoryGateStore};
pub use model::{
    FieldKind, Hotspot, LeadField, LeadGatePolicy, Page, TemplateJob, TemplateKind, MAX_PAGES,
};
pub use nav::{FlipCursor, NavOutcome, ScrollSpy, SlideCursor};
pub use output::{BuildOutput, BuildStats, DocumentInfo, OutputFile, OutputTree};
pub use progress::{BuildProgressCallback, NoopProgressCallback, ProgressCallback};
pub use storage::write_tree;
pub use store::{JobRecord, JobStatus, JobStore};
pub use template::{generate, LayoutStrategy};

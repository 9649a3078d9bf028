//! Progress-callback trait for per-page build events.
//!
//! Inject an [`Arc<dyn BuildProgressCallback>`] via
//! [`crate::config::BuildConfigBuilder::progress_callback`] to receive events
//! as pages are rasterised. The CLI forwards them to an `indicatif` bar.
//!
//! # Example
//!
//! ```rust
//! use pdfdeck::{BuildConfig, BuildProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl BuildProgressCallback for CountingCallback {
//!     fn on_page_rendered(&self, _page_num: usize, _total: usize, _bytes: usize) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = BuildConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { rendered: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the build pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Rendering happens on a blocking worker thread, so
/// implementations must be `Send + Sync`.
pub trait BuildProgressCallback: Send + Sync {
    /// Called once before any page is rendered.
    ///
    /// * `total_pages` — number of selected pages
    fn on_build_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is rasterised.
    ///
    /// * `page_num` — 1-indexed page number in the source PDF
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page image has been encoded.
    ///
    /// * `png_bytes` — size of the encoded asset
    fn on_page_rendered(&self, page_num: usize, total_pages: usize, png_bytes: usize) {
        let _ = (page_num, total_pages, png_bytes);
    }

    /// Called when a page could not be rendered. A placeholder takes its
    /// place in the deck.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the site tree has been assembled.
    ///
    /// * `rendered` — pages rasterised without error
    /// * `file_count` — files in the generated tree
    fn on_build_complete(&self, rendered: usize, file_count: usize) {
        let _ = (rendered, file_count);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl BuildProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BuildConfig`].
pub type ProgressCallback = Arc<dyn BuildProgressCallback>;

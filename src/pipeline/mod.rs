//! Pipeline stages for PDF → deck builds.
//!
//! Each submodule implements one transformation step:
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ template::generate
//! (URL/path)  (pdfium)  (PNG)     (static site tree)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`] — rasterise selected pages and extract their text; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`] — PNG-encode each page image into a site asset
//!
//! The stages produce page fragments; turning fragments into a site is
//! [`crate::template`]'s job and involves no I/O.

pub mod encode;
pub mod input;
pub mod render;

//! PDF rasterisation: render selected pages and pull out their text.
//!
//! pdfium is a C++ library with thread-local state, so every call runs on
//! a `spawn_blocking` thread. The library is located through
//! `PDFIUM_LIB_PATH` (a file or the directory holding it) and falls back to
//! the system search path.
//!
//! The longest edge of every render is capped by `max_rendered_pixels`
//! regardless of physical page size, which keeps memory bounded for poster
//! sized pages.

use crate::config::BuildConfig;
use crate::error::DeckError;
use crate::output::DocumentInfo;
use crate::pipeline::encode::encode_png;
use crate::progress::ProgressCallback;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the pdfium library (or its directory).
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// One rasterised page, ready to become a site asset.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 0-based page index in the source PDF.
    pub index: usize,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Plain text extracted by pdfium; `None` for image-only pages.
    pub text: Option<String>,
}

/// Everything the render stage produced for one document.
#[derive(Debug, Clone, Default)]
pub struct RenderOutcome {
    pub total_pages: usize,
    pub pages: Vec<RenderedPage>,
    /// `(0-based index, reason)` for selected pages that failed to render.
    pub failures: Vec<(usize, String)>,
}

/// Bind to pdfium, honouring [`PDFIUM_LIB_ENV`].
pub fn bind_pdfium() -> Result<Pdfium, DeckError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_ENV) {
        Some(raw) => {
            let path = PathBuf::from(raw);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib).map_err(|e| {
                DeckError::PdfiumBindingFailed(format!("{}: {e}", lib.display()))
            })?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| DeckError::PdfiumBindingFailed(e.to_string()))?,
    };
    Ok(Pdfium::new(bindings))
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, DeckError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.to_ascii_lowercase().contains("password") {
            if password.is_some() {
                DeckError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                DeckError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            DeckError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Rasterise the selected pages of a PDF to PNG.
///
/// Per-page failures are collected in [`RenderOutcome::failures`] rather
/// than aborting the build; the deck shows a placeholder for those pages.
pub async fn render_pages(
    pdf_path: &Path,
    config: &BuildConfig,
    page_indices: &[usize],
) -> Result<RenderOutcome, DeckError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();
    let indices = page_indices.to_vec();
    let progress = config.progress_callback.clone();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(
            &path,
            dpi,
            max_pixels,
            password.as_deref(),
            &indices,
            progress.as_ref(),
        )
    })
    .await
    .map_err(|e| DeckError::Internal(format!("Render task panicked: {e}")))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    page_indices: &[usize],
    progress: Option<&ProgressCallback>,
) -> Result<RenderOutcome, DeckError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut outcome = RenderOutcome {
        total_pages,
        ..RenderOutcome::default()
    };

    for &idx in page_indices {
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                idx + 1,
                total_pages
            );
            continue;
        }
        if let Some(cb) = progress {
            cb.on_page_start(idx + 1, total_pages);
        }

        let rendered = pages
            .get(idx as u16)
            .map_err(|e| format!("{:?}", e))
            .and_then(|page| {
                let image = page
                    .render_with_config(&render_config)
                    .map_err(|e| format!("{:?}", e))?
                    .as_image();
                let text = page
                    .text()
                    .ok()
                    .map(|t| t.all())
                    .filter(|t| !t.trim().is_empty());
                Ok((image, text))
            })
            .and_then(|(image, text): (DynamicImage, Option<String>)| {
                let png = encode_png(&image).map_err(|e| e.to_string())?;
                Ok(RenderedPage {
                    index: idx,
                    png,
                    width: image.width(),
                    height: image.height(),
                    text,
                })
            });

        match rendered {
            Ok(page) => {
                debug!(
                    "Rendered page {} → {}x{} px, {} bytes",
                    idx + 1,
                    page.width,
                    page.height,
                    page.png.len()
                );
                if let Some(cb) = progress {
                    cb.on_page_rendered(idx + 1, total_pages, page.png.len());
                }
                outcome.pages.push(page);
            }
            Err(detail) => {
                let err = DeckError::RasterisationFailed {
                    page: idx + 1,
                    detail,
                };
                warn!("{}", err);
                if let Some(cb) = progress {
                    cb.on_page_error(idx + 1, total_pages, &err.to_string());
                }
                outcome.failures.push((idx, err.to_string()));
            }
        }
    }

    Ok(outcome)
}

/// Number of pages in a PDF.
pub async fn page_count(pdf_path: &Path, password: Option<&str>) -> Result<usize, DeckError> {
    extract_metadata(pdf_path, password)
        .await
        .map(|m| m.page_count)
}

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentInfo, DeckError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| DeckError::Internal(format!("Metadata task panicked: {e}")))?
}

fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentInfo, DeckError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(DocumentInfo {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

//! Top-level entry points: PDF → deck, and fragments → deck.
//!
//! [`build_deck`] runs the whole pipeline for one PDF: resolve the input,
//! rasterise the selected pages, turn each into an image fragment and hand
//! the job to [`crate::template::generate`]. The result stays in memory;
//! [`build_deck_to_dir`] additionally persists it through
//! [`crate::storage::write_tree`].
//!
//! [`generate_from_fragments`] skips rasterisation and assembles a deck from
//! `page-N.html` files produced by some other converter.

use crate::config::BuildConfig;
use crate::error::DeckError;
use crate::fragment::{image_fragment, load_fragments_dir, page_image_path};
use crate::model::{Page, TemplateJob};
use crate::output::{media_type_for, BuildOutput, BuildStats, DocumentInfo, OutputFile, OutputTree};
use crate::pipeline::render::{RenderOutcome, RenderedPage};
use crate::pipeline::{input, render};
use crate::storage;
use crate::template;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Convert a PDF file or URL into a deck.
///
/// Selected pages become deck pages 1..=N in selection order, so hotspot
/// indices in `job` refer to positions in the deck, not in the source PDF.
/// A page that fails to rasterise is shown as a placeholder.
///
/// # Errors
/// Fatal input and PDF errors only: file not found, not a PDF, wrong
/// password, an empty page selection, or every selected page failing.
pub async fn build_deck(
    input_str: impl AsRef<str>,
    job: &TemplateJob,
    config: &BuildConfig,
) -> Result<BuildOutput, DeckError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting build: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Extract metadata ─────────────────────────────────────────
    let metadata = render::extract_metadata(&pdf_path, config.password.as_deref()).await?;
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    // ── Step 3: Compute page indices ─────────────────────────────────────
    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(DeckError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }
    debug!("Selected {} pages", page_indices.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_build_start(page_indices.len());
    }

    // ── Step 4: Rasterise pages ──────────────────────────────────────────
    let render_start = Instant::now();
    let outcome = render::render_pages(&pdf_path, config, &page_indices).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {} pages in {}ms",
        outcome.pages.len(),
        render_duration_ms
    );

    if outcome.pages.is_empty() {
        let detail = outcome
            .failures
            .first()
            .map(|(_, e)| e.clone())
            .unwrap_or_else(|| "no page could be rendered".to_string());
        return Err(DeckError::RasterisationFailed {
            page: page_indices[0] + 1,
            detail,
        });
    }

    // ── Step 5: Assemble the site ────────────────────────────────────────
    let deck_job = job_for_render(job, &metadata, &page_indices, &outcome);
    let mut tree = template::generate(&deck_job);
    add_page_assets(&mut tree, &page_indices, &outcome.pages);

    let stats = BuildStats {
        total_pages,
        rendered_pages: outcome.pages.len(),
        failed_pages: outcome.failures.len(),
        file_count: tree.len(),
        total_bytes: tree.total_bytes(),
        warning_count: tree.warnings.len(),
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Build complete: {}/{} pages, {} files, {}ms total",
        stats.rendered_pages,
        page_indices.len(),
        stats.file_count,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_build_complete(stats.rendered_pages, stats.file_count);
    }

    Ok(BuildOutput {
        tree,
        metadata,
        stats,
    })
}

/// Build a deck and write it to `out_dir`, replacing whatever was there.
pub async fn build_deck_to_dir(
    input_str: impl AsRef<str>,
    job: &TemplateJob,
    out_dir: impl AsRef<Path>,
    config: &BuildConfig,
) -> Result<BuildStats, DeckError> {
    let output = build_deck(input_str, job, config).await?;
    storage::write_tree(&output.tree, out_dir.as_ref()).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`build_deck`].
///
/// Creates a temporary tokio runtime internally.
pub fn build_deck_sync(
    input_str: impl AsRef<str>,
    job: &TemplateJob,
    config: &BuildConfig,
) -> Result<BuildOutput, DeckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeckError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(build_deck(input_str, job, config))
}

/// Build a deck from PDF bytes held in memory.
///
/// The bytes are written to a managed temp file that is removed on return.
pub async fn build_deck_from_bytes(
    bytes: &[u8],
    job: &TemplateJob,
    config: &BuildConfig,
) -> Result<BuildOutput, DeckError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| DeckError::Internal(format!("tempfile: {e}")))?;
    input::check_magic(bytes, tmp.path())?;
    tmp.write_all(bytes)
        .map_err(|e| DeckError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    build_deck(&path, job, config).await
}

/// Extract PDF metadata without rendering.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentInfo, DeckError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    render::extract_metadata(resolved.path(), None).await
}

/// Assemble a deck from a directory of pre-rendered fragments.
///
/// `page-N.html` files (with optional `page-N.txt` text) fill in any pages
/// the job does not already carry. An `assets/` directory next to them is
/// copied into the tree unchanged so relative image references keep
/// working.
pub async fn generate_from_fragments(
    fragments_dir: impl AsRef<Path>,
    job: &TemplateJob,
) -> Result<OutputTree, DeckError> {
    let dir = fragments_dir.as_ref();
    let loaded = load_fragments_dir(dir).await?;
    info!("Loaded {} fragments from {}", loaded.len(), dir.display());

    let mut job = job.clone();
    let known: std::collections::BTreeSet<usize> = job.pages.iter().map(|p| p.index).collect();
    job.pages
        .extend(loaded.into_iter().filter(|p| !known.contains(&p.index)));
    job.pages.sort_by_key(|p| p.index);

    let mut tree = template::generate(&job);
    let assets = dir.join("assets");
    if assets.is_dir() {
        let assets_owned = assets.clone();
        let files = tokio::task::spawn_blocking(move || read_assets(&assets_owned))
            .await
            .map_err(|e| DeckError::Internal(format!("Asset task panicked: {e}")))??;
        debug!("Copying {} assets from {}", files.len(), assets.display());
        for (rel, bytes) in files {
            let media_type = media_type_for(&rel);
            tree.insert(rel, OutputFile::binary(bytes, media_type));
        }
    }
    Ok(tree)
}

/// Every file under `assets_dir`, keyed by its site path (`assets/...`).
fn read_assets(assets_dir: &Path) -> Result<Vec<(String, Vec<u8>)>, DeckError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(assets_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| DeckError::Internal(format!("walk assets: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(assets_dir) else {
            continue;
        };
        let rel: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let site_path = format!("assets/{}", rel.join("/"));
        let bytes = std::fs::read(entry.path()).map_err(|e| DeckError::OutputWriteFailed {
            path: entry.path().to_path_buf(),
            source: e,
        })?;
        files.push((site_path, bytes));
    }
    Ok(files)
}

/// Deck position (1-based) of a rendered PDF page.
fn deck_number(page_indices: &[usize], pdf_index: usize) -> Option<usize> {
    page_indices
        .binary_search(&pdf_index)
        .ok()
        .map(|pos| pos + 1)
}

/// The caller's job with image fragments for every rendered page.
///
/// The PDF title is used when the job has none; the page count is the
/// number of selected pages so failed renders become placeholders.
fn job_for_render(
    job: &TemplateJob,
    metadata: &DocumentInfo,
    page_indices: &[usize],
    outcome: &RenderOutcome,
) -> TemplateJob {
    let mut deck = job.clone();
    if deck.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        deck.title = metadata.title.clone();
    }
    deck.page_count = Some(page_indices.len());
    deck.pages = outcome
        .pages
        .iter()
        .filter_map(|r| {
            let number = deck_number(page_indices, r.index)?;
            let page = Page::new(number, image_fragment(number, r.width, r.height));
            Some(match &r.text {
                Some(t) => page.with_text(t.clone()),
                None => page,
            })
        })
        .collect();
    for (idx, reason) in &outcome.failures {
        warn!("Page {} will be a placeholder: {}", idx + 1, reason);
    }
    deck
}

fn add_page_assets(tree: &mut OutputTree, page_indices: &[usize], pages: &[RenderedPage]) {
    for r in pages {
        if let Some(number) = deck_number(page_indices, r.index) {
            tree.insert(
                page_image_path(number),
                OutputFile::binary(r.png.clone(), "image/png"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TemplateKind;

    fn rendered(index: usize) -> RenderedPage {
        RenderedPage {
            index,
            png: vec![0x89, b'P', b'N', b'G'],
            width: 10,
            height: 20,
            text: Some(format!("PDF page {}", index + 1)),
        }
    }

    #[test]
    fn selected_pages_are_renumbered_for_the_deck() {
        let indices = vec![2, 4, 7];
        let outcome = RenderOutcome {
            total_pages: 10,
            pages: vec![rendered(2), rendered(7)],
            failures: vec![(4, "boom".into())],
        };
        let meta = DocumentInfo {
            title: Some("From PDF".into()),
            ..DocumentInfo::default()
        };
        let job = job_for_render(&TemplateJob::default(), &meta, &indices, &outcome);
        assert_eq!(job.page_count, Some(3));
        assert_eq!(job.title.as_deref(), Some("From PDF"));
        let numbers: Vec<_> = job.pages.iter().map(|p| p.index).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(job.pages[1].text.as_deref(), Some("PDF page 8"));
        assert!(job.pages[1].fragment_html.contains("assets/pages/page-3.png"));

        let mut tree = template::generate(&job);
        add_page_assets(&mut tree, &indices, &outcome.pages);
        assert!(tree.get("assets/pages/page-1.png").is_some());
        assert!(tree.get("assets/pages/page-2.png").is_none());
        assert!(tree.get("assets/pages/page-3.png").is_some());
        assert!(tree.index_html().unwrap().contains("Page 2</div>"));
    }

    #[test]
    fn explicit_title_wins_over_pdf_metadata() {
        let meta = DocumentInfo {
            title: Some("From PDF".into()),
            ..DocumentInfo::default()
        };
        let job = TemplateJob::new(TemplateKind::Flipbook, "Mine");
        let deck = job_for_render(&job, &meta, &[0], &RenderOutcome::default());
        assert_eq!(deck.title.as_deref(), Some("Mine"));
    }

    #[tokio::test]
    async fn fragments_directory_becomes_a_site() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page-1.html"), "<p>one</p>").unwrap();
        std::fs::write(dir.path().join("page-2.html"), "<p>two</p>").unwrap();
        std::fs::create_dir_all(dir.path().join("assets/pages")).unwrap();
        std::fs::write(dir.path().join("assets/pages/page-1.png"), b"png").unwrap();

        let mut job = TemplateJob::new(TemplateKind::Documentation, "Frag");
        job.pages = vec![Page::new(2, "<p>override</p>")];
        let tree = generate_from_fragments(dir.path(), &job).await.unwrap();

        let html = tree.index_html().unwrap();
        assert!(html.contains("<p>one</p>"));
        assert!(html.contains("<p>override</p>"));
        assert!(!html.contains("<p>two</p>"));
        let asset = tree.get("assets/pages/page-1.png").unwrap();
        assert_eq!(asset.media_type, "image/png");
        assert!(tree.warnings.is_empty());
    }

    #[tokio::test]
    async fn bytes_that_are_not_a_pdf_are_rejected() {
        let err = build_deck_from_bytes(b"<html>", &TemplateJob::default(), &BuildConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeckError::NotAPdf { .. }));
    }
}

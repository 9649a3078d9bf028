//! Template generation: one [`TemplateJob`] in, one [`OutputTree`] out.
//!
//! The pipeline is shared by all three variants and owns everything that
//! must behave identically across them:
//!
//! 1. **Resolve** title, site id and page count, falling back to defaults.
//! 2. **Place** each fragment on its 1-based page, substituting a visible
//!    placeholder for missing pages.
//! 3. **Overlay** hotspots on their 0-based page as percentage rectangles.
//! 4. **Mark** pages past the free-page threshold as locked and wrap them in
//!    a gate shield.
//! 5. **Assemble** the document, stylesheet and runtime script.
//!
//! A [`LayoutStrategy`] supplies only the per-variant pieces: the element
//! that wraps each page, the container, the navigation chrome and the
//! embedded CSS/JS. Escaping happens once, in [`crate::dom`].
//!
//! Generation never fails. Inconsistent input is repaired and reported as
//! [`AssemblyWarning`]s on the returned tree.

pub mod flipbook;
pub mod scroll;
pub mod slideshow;

use crate::dom::{script_json, Document, Element, Node};
use crate::error::AssemblyWarning;
use crate::fragment::unwrap_document;
use crate::gate::storage_key;
use crate::geometry::PercentRect;
use crate::model::{Hotspot, LeadGatePolicy, Page, TemplateJob, TemplateKind, MAX_PAGES};
use crate::nav::SCROLL_OFFSET_PX;
use crate::output::{OutputFile, OutputTree, INDEX_PATH};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub use flipbook::Flipbook;
pub use scroll::ScrollDoc;
pub use slideshow::Slideshow;

/// Relative path of the combined stylesheet.
pub const STYLESHEET_PATH: &str = "css/deck.css";

/// Directory holding the runtime script.
pub const SCRIPT_DIR: &str = "js";

const BASE_CSS: &str = include_str!("styles/base.css");
const GATE_JS: &str = include_str!("runtime/gate.js");
const TELEMETRY_JS: &str = include_str!("runtime/telemetry.js");

/// What a strategy knows about one page while wrapping it.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    /// 0-based position in the deck.
    pub index: usize,
    /// 1-based display number.
    pub number: usize,
    pub page_count: usize,
    pub locked: bool,
    /// Extracted plain text, when the page source supplied any.
    pub text: Option<&'a str>,
}

/// Deck-wide facts available to a strategy's chrome.
#[derive(Debug, Clone, Copy)]
pub struct DeckContext<'a> {
    pub title: &'a str,
    pub page_count: usize,
    pub pages: &'a [PageView<'a>],
    pub gate_enabled: bool,
}

/// The per-variant half of the renderer.
pub trait LayoutStrategy: Sync {
    fn kind(&self) -> TemplateKind;

    /// Class added to `<body>` next to `pdfdeck`.
    fn body_class(&self) -> &'static str;

    /// Variant stylesheet, appended after the shared base rules.
    fn stylesheet(&self) -> &'static str;

    /// File name of the runtime script under [`SCRIPT_DIR`].
    fn script_name(&self) -> &'static str;

    /// Navigation runtime for this variant.
    fn runtime(&self) -> &'static str;

    /// Wrap one page body (surface, or gate shield around it) in the
    /// variant's unit element. Page numbering and lock marking are applied
    /// to the returned element afterwards.
    fn page_unit(&self, page: &PageView<'_>, body: Element) -> Element;

    /// The element holding every unit in page order.
    fn container(&self, units: Vec<Element>) -> Element;

    /// Navigation controls placed after the container.
    fn chrome(&self, ctx: &DeckContext<'_>) -> Vec<Node>;
}

/// The strategy for a template kind.
pub fn strategy_for(kind: TemplateKind) -> &'static dyn LayoutStrategy {
    match kind {
        TemplateKind::Presentation => &Slideshow,
        TemplateKind::Flipbook => &Flipbook,
        TemplateKind::Documentation => &ScrollDoc,
    }
}

/// Generate the static site for `job`.
pub fn generate(job: &TemplateJob) -> OutputTree {
    render_with(strategy_for(job.template), job)
}

/// Config block read by the runtime scripts.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeConfig<'a> {
    template: &'static str,
    site_id: &'a str,
    page_count: usize,
    free_pages: usize,
    gate_enabled: bool,
    storage_key: String,
    webhook_url: Option<&'a str>,
    analytics_endpoint: Option<&'a str>,
    scroll_offset: f64,
}

/// Run the shared pipeline with an explicit strategy.
///
/// The tree's `template` is taken from the strategy, so a job whose
/// template name fell back to the default reports the variant actually
/// produced.
pub fn render_with(strategy: &dyn LayoutStrategy, job: &TemplateJob) -> OutputTree {
    let title = job.resolved_title();
    let site_id = job.resolved_site_id();
    let count = job.resolved_page_count();
    let policy = &job.lead_gate;
    let mut warnings = Vec::new();
    let requested = job.requested_page_count();
    if requested > count {
        warnings.push(AssemblyWarning::PageCountClamped {
            requested,
            max: MAX_PAGES,
        });
    }

    let fragments = collect_fragments(&job.pages, count, &mut warnings);
    let hotspots = bucket_hotspots(&job.hotspots, count, &mut warnings);

    let views: Vec<PageView<'_>> = (0..count)
        .map(|index| PageView {
            index,
            number: index + 1,
            page_count: count,
            locked: policy.is_locked(index),
            text: fragments
                .get(&(index + 1))
                .and_then(|p| p.text.as_deref())
                .filter(|t| !t.trim().is_empty()),
        })
        .collect();

    let units: Vec<Element> = views
        .iter()
        .map(|view| {
            let content = match fragments.get(&view.number) {
                Some(page) => page_content(page, job.extract_body),
                None => {
                    warnings.push(AssemblyWarning::MissingPage { page: view.number });
                    placeholder(view.number)
                }
            };
            let surface = page_surface(view, content, &hotspots[view.index]);
            let body = if view.locked { gate_shield(surface) } else { surface };
            mark_unit(strategy.page_unit(view, body), view)
        })
        .collect();

    let ctx = DeckContext {
        title,
        page_count: count,
        pages: &views,
        gate_enabled: policy.enabled,
    };

    let mut doc = Document::new("en");
    doc.head = head(title);
    doc.body = body(strategy, &ctx, units, job, site_id);

    let mut tree = OutputTree::new(strategy.kind());
    tree.insert(INDEX_PATH, OutputFile::text(doc.to_html(), "text/html"));
    tree.insert(
        STYLESHEET_PATH,
        OutputFile::text(stylesheet(strategy, job.custom_css.as_deref()), "text/css"),
    );
    tree.insert(
        format!("{SCRIPT_DIR}/{}", strategy.script_name()),
        OutputFile::text(runtime_script(strategy, job), "text/javascript"),
    );

    for w in &warnings {
        warn!("{}", w);
    }
    debug!(
        "Generated {} deck '{}': {} pages, {} files, {} warnings",
        strategy.kind(),
        title,
        count,
        tree.len(),
        warnings.len()
    );
    tree.warnings = warnings;
    tree
}

/// Map 1-based page numbers to pages. The first entry for a number wins;
/// numbers outside `1..=count` are dropped.
fn collect_fragments<'a>(
    pages: &'a [Page],
    count: usize,
    warnings: &mut Vec<AssemblyWarning>,
) -> BTreeMap<usize, &'a Page> {
    let mut by_number = BTreeMap::new();
    for page in pages {
        if page.index == 0 || page.index > count {
            warnings.push(AssemblyWarning::PageOutOfRange {
                page: page.index,
                page_count: count,
            });
            continue;
        }
        if by_number.contains_key(&page.index) {
            warnings.push(AssemblyWarning::DuplicatePage { page: page.index });
            continue;
        }
        by_number.insert(page.index, page);
    }
    by_number
}

/// Group hotspots by 0-based page, preserving document order.
fn bucket_hotspots<'a>(
    hotspots: &'a [Hotspot],
    count: usize,
    warnings: &mut Vec<AssemblyWarning>,
) -> Vec<Vec<&'a Hotspot>> {
    let mut buckets = vec![Vec::new(); count];
    for h in hotspots {
        match h.page_in(count) {
            Some(i) => buckets[i].push(h),
            None => warnings.push(AssemblyWarning::HotspotOutOfRange {
                id: h.id.clone(),
                page_index: h.page_index,
                page_count: count,
            }),
        }
    }
    buckets
}

fn page_content(page: &Page, extract_body: bool) -> Element {
    let markup = if extract_body {
        unwrap_document(&page.fragment_html)
    } else {
        page.fragment_html.clone()
    };
    Element::new("div")
        .class("page-content")
        .child(Node::raw(markup))
}

/// Visible stand-in for a page whose fragment is missing.
fn placeholder(number: usize) -> Element {
    Element::new("div").class("page-content").child(
        Element::new("div")
            .class("page-placeholder")
            .text(format!("Page {number}")),
    )
}

/// Anchor overlay for one hotspot.
pub fn hotspot_overlay(h: &Hotspot) -> Element {
    let label = h.display_label();
    Element::new("a")
        .class("hotspot")
        .attr("href", &h.url)
        .attr("target", "_blank")
        .attr("rel", "noopener noreferrer")
        .attr("title", label)
        .attr("aria-label", label)
        .attr("data-hotspot-id", &h.id)
        .attr("style", PercentRect::from_hotspot(h).to_style())
}

fn page_surface(view: &PageView<'_>, content: Element, hotspots: &[&Hotspot]) -> Element {
    Element::new("div")
        .class("page-surface")
        .child(content)
        .children(hotspots.iter().map(|h| hotspot_overlay(h)))
        .child(
            Element::new("span")
                .class("page-number")
                .text(view.number.to_string()),
        )
}

/// Wrapper that lets the runtime intercept clicks on a locked page.
fn gate_shield(surface: Element) -> Element {
    Element::new("div")
        .class("gate-shield")
        .flag("data-gate-shield")
        .child(surface)
        .child(
            Element::new("button")
                .class("gate-cta")
                .attr("type", "button")
                .flag("data-gate-open")
                .text("Unlock to keep reading"),
        )
}

fn mark_unit(mut unit: Element, view: &PageView<'_>) -> Element {
    unit.set_attr("data-page", Some(view.number.to_string()));
    unit.set_attr("data-index", Some(view.index.to_string()));
    unit.set_attr("aria-label", Some(format!("Page {}", view.number)));
    if view.locked {
        unit.add_class("locked");
        unit.set_attr("data-locked", Some("true".to_string()));
    }
    unit
}

fn head(title: &str) -> Vec<Node> {
    vec![
        Element::new("meta").attr("charset", "utf-8").into(),
        Element::new("meta")
            .attr("name", "viewport")
            .attr("content", "width=device-width, initial-scale=1")
            .into(),
        Element::new("meta")
            .attr("name", "generator")
            .attr("content", "pdfdeck")
            .into(),
        Element::new("title").text(title).into(),
        Element::new("link")
            .attr("rel", "stylesheet")
            .attr("href", STYLESHEET_PATH)
            .into(),
    ]
}

fn body(
    strategy: &dyn LayoutStrategy,
    ctx: &DeckContext<'_>,
    units: Vec<Element>,
    job: &TemplateJob,
    site_id: &str,
) -> Element {
    let policy = &job.lead_gate;
    let mut body = Element::new("body")
        .class("pdfdeck")
        .class(strategy.body_class());
    if policy.enabled {
        body.add_class("gate-locked");
    }

    body.push(
        Element::new("header")
            .class("deck-header")
            .child(Element::new("h1").class("deck-title").text(ctx.title)),
    );
    body.push(strategy.container(units));
    for node in strategy.chrome(ctx) {
        body.push(node);
    }
    if policy.enabled {
        body.push(gate_modal(policy));
    }

    let config = RuntimeConfig {
        template: strategy.kind().name(),
        site_id,
        page_count: ctx.page_count,
        free_pages: policy.effective_free_pages(),
        gate_enabled: policy.enabled,
        storage_key: storage_key(site_id),
        webhook_url: policy.webhook_url.as_deref(),
        analytics_endpoint: job.analytics_endpoint.as_deref(),
        scroll_offset: SCROLL_OFFSET_PX,
    };
    let json = script_json(&config).unwrap_or_else(|e| {
        warn!("Failed to serialise runtime config: {}", e);
        "{}".to_string()
    });
    body.push(
        Element::new("script")
            .id("pdfdeck-config")
            .attr("type", "application/json")
            .child(Node::raw(json)),
    );
    body.push(
        Element::new("script").attr("src", format!("{SCRIPT_DIR}/{}", strategy.script_name())),
    );
    body
}

/// The single lead-capture dialog. Hidden until the runtime opens it.
fn gate_modal(policy: &LeadGatePolicy) -> Element {
    let mut form = Element::new("form")
        .id("lead-gate-form")
        .class("gate-form")
        .child(
            Element::new("h2")
                .id("lead-gate-heading")
                .text(policy.heading_text()),
        )
        .child(
            Element::new("p")
                .class("gate-description")
                .text(policy.description_text()),
        );

    for field in &policy.fields {
        let input_id = format!("gate-field-{}", field.name);
        let mut input = Element::new("input")
            .id(&input_id)
            .attr("name", &field.name)
            .attr("type", field.kind.input_type());
        if field.required {
            input = input.flag("required");
        }
        form.push(
            Element::new("div")
                .class("gate-field")
                .child(Element::new("label").attr("for", &input_id).text(&field.label))
                .child(input),
        );
    }

    form.push(
        Element::new("div")
            .class("gate-actions")
            .child(
                Element::new("button")
                    .class("gate-submit")
                    .attr("type", "submit")
                    .text("Unlock"),
            )
            .child(
                Element::new("button")
                    .class("gate-dismiss")
                    .attr("type", "button")
                    .flag("data-gate-close")
                    .text("Not now"),
            ),
    );

    Element::new("div")
        .id("lead-gate")
        .class("gate-modal")
        .flag("hidden")
        .attr("role", "dialog")
        .attr("aria-modal", "true")
        .attr("aria-labelledby", "lead-gate-heading")
        .child(form)
}

/// Previous / counter / next controls shared by the paged variants.
pub(crate) fn paging_controls(page_count: usize) -> Element {
    let mut next = Element::new("button")
        .id("next-btn")
        .class("nav-btn")
        .attr("type", "button")
        .attr("aria-label", "Next page");
    if page_count <= 1 {
        next = next.flag("disabled");
    }
    Element::new("nav")
        .class("deck-controls")
        .attr("aria-label", "Page navigation")
        .child(
            Element::new("button")
                .id("prev-btn")
                .class("nav-btn")
                .attr("type", "button")
                .attr("aria-label", "Previous page")
                .flag("disabled")
                .text("\u{2039}"),
        )
        .child(
            Element::new("span")
                .id("page-counter")
                .text(format!("1 / {page_count}")),
        )
        .child(next.text("\u{203a}"))
}

/// Base rules, then variant rules, then the job's own stylesheet last so it
/// wins the cascade.
fn stylesheet(strategy: &dyn LayoutStrategy, custom_css: Option<&str>) -> String {
    let mut css = String::with_capacity(BASE_CSS.len() + strategy.stylesheet().len() + 256);
    css.push_str(BASE_CSS);
    css.push('\n');
    css.push_str(strategy.stylesheet());
    if let Some(custom) = custom_css.filter(|c| !c.trim().is_empty()) {
        css.push_str("\n/* custom */\n");
        css.push_str(custom);
        css.push('\n');
    }
    css
}

/// Telemetry (if configured), then the gate (if enabled), then navigation.
/// The navigation script looks up the globals the first two install.
fn runtime_script(strategy: &dyn LayoutStrategy, job: &TemplateJob) -> String {
    let mut parts = Vec::with_capacity(3);
    if job.analytics_endpoint.is_some() {
        parts.push(TELEMETRY_JS);
    }
    if job.lead_gate.enabled {
        parts.push(GATE_JS);
    }
    parts.push(strategy.runtime());
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LeadGatePolicy;

    fn job_with_pages(kind: TemplateKind, n: usize) -> TemplateJob {
        let mut job = TemplateJob::new(kind, "Deck");
        job.pages = (1..=n)
            .map(|i| Page::new(i, format!("<p>page {i}</p>")))
            .collect();
        job
    }

    #[test]
    fn strategies_match_their_kind() {
        for kind in TemplateKind::ALL {
            assert_eq!(strategy_for(kind).kind(), kind);
        }
    }

    #[test]
    fn missing_pages_get_placeholders_and_warnings() {
        let mut job = job_with_pages(TemplateKind::Presentation, 1);
        job.page_count = Some(3);
        let tree = generate(&job);
        let html = tree.index_html().unwrap();
        assert!(html.contains("<p>page 1</p>"));
        assert!(html.contains("<div class=\"page-placeholder\">Page 2</div>"));
        assert!(html.contains("<div class=\"page-placeholder\">Page 3</div>"));
        assert_eq!(
            tree.warnings,
            vec![
                AssemblyWarning::MissingPage { page: 2 },
                AssemblyWarning::MissingPage { page: 3 },
            ]
        );
    }

    #[test]
    fn duplicate_and_stray_pages_are_reported() {
        let mut job = job_with_pages(TemplateKind::Presentation, 2);
        job.pages.push(Page::new(2, "<p>second copy</p>"));
        job.pages.push(Page::new(0, "<p>zero</p>"));
        job.page_count = Some(2);
        job.pages.push(Page::new(7, "<p>seven</p>"));
        let tree = generate(&job);
        let html = tree.index_html().unwrap();
        assert!(html.contains("<p>page 2</p>"));
        assert!(!html.contains("second copy"));
        assert!(!html.contains("seven"));
        assert!(tree
            .warnings
            .contains(&AssemblyWarning::DuplicatePage { page: 2 }));
        assert!(tree.warnings.contains(&AssemblyWarning::PageOutOfRange {
            page: 7,
            page_count: 2
        }));
        assert!(tree.warnings.contains(&AssemblyWarning::PageOutOfRange {
            page: 0,
            page_count: 2
        }));
    }

    #[test]
    fn body_extraction_is_optional() {
        let mut job = TemplateJob::new(TemplateKind::Presentation, "T");
        job.pages = vec![Page::new(
            1,
            "<html><head><title>inner</title></head><body><p>x</p></body></html>",
        )];
        let html = generate(&job).index_html().unwrap().to_string();
        assert!(html.contains("<div class=\"page-content\"><p>x</p></div>"));
        assert!(!html.contains("inner"));

        job.extract_body = false;
        let html = generate(&job).index_html().unwrap().to_string();
        assert!(html.contains("<title>inner</title>"));
    }

    #[test]
    fn custom_css_comes_last() {
        let mut job = job_with_pages(TemplateKind::Flipbook, 1);
        job.custom_css = Some(".leaf { background: <red> }".into());
        let tree = generate(&job);
        let css = tree.text(STYLESHEET_PATH).unwrap();
        assert!(css.trim_end().ends_with(".leaf { background: <red> }"));
        assert!(css.starts_with(BASE_CSS));
    }

    #[test]
    fn runtime_script_composition() {
        let mut job = job_with_pages(TemplateKind::Documentation, 2);
        let tree = generate(&job);
        let js = tree.text("js/scroll.js").unwrap();
        assert!(!js.contains("PdfDeckGate ="));
        assert!(!js.contains("PdfDeckTelemetry ="));

        job.lead_gate = LeadGatePolicy::enabled(1);
        job.analytics_endpoint = Some("https://collect.example/e".into());
        let tree = generate(&job);
        let js = tree.text("js/scroll.js").unwrap();
        let telemetry = js.find("window.PdfDeckTelemetry =").unwrap();
        let gate = js.find("window.PdfDeckGate =").unwrap();
        let nav = js.find("doc-section").unwrap();
        assert!(telemetry < gate && gate < nav);
    }

    #[test]
    fn runtime_config_is_embedded() {
        let mut job = job_with_pages(TemplateKind::Presentation, 4);
        job.site_id = Some("acme</script>".into());
        job.lead_gate = LeadGatePolicy::enabled(2);
        let html = generate(&job).index_html().unwrap().to_string();
        let start = html.find("<script id=\"pdfdeck-config\" type=\"application/json\">").unwrap();
        let rest = &html[start..];
        let json = &rest[rest.find('>').unwrap() + 1..rest.find("</script>").unwrap()];
        let cfg: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(cfg["template"], "presentation");
        assert_eq!(cfg["pageCount"], 4);
        assert_eq!(cfg["freePages"], 2);
        assert_eq!(cfg["gateEnabled"], true);
        assert_eq!(cfg["storageKey"], "pdfdeck:acme</script>:unlocked");
        assert_eq!(cfg["scrollOffset"], SCROLL_OFFSET_PX);
    }

    #[test]
    fn gate_fields_follow_policy() {
        let mut job = job_with_pages(TemplateKind::Presentation, 2);
        let mut policy = LeadGatePolicy::enabled(1);
        policy.fields.push(crate::model::LeadField {
            name: "phone".into(),
            label: "Phone \"mobile\"".into(),
            kind: crate::model::FieldKind::Tel,
            required: false,
        });
        job.lead_gate = policy;
        let html = generate(&job).index_html().unwrap().to_string();
        assert!(html.contains(
            "<input id=\"gate-field-email\" name=\"email\" type=\"email\" required>"
        ));
        assert!(html.contains("<input id=\"gate-field-phone\" name=\"phone\" type=\"tel\">"));
        assert!(html.contains("Phone &quot;mobile&quot;"));
    }
}

//! Input data model for deck generation.
//!
//! Everything here deserialises from the camelCase JSON used by job files and
//! the flat job store, so a job written by one tool can be regenerated by
//! another without translation.
//!
//! ## Index conventions
//!
//! * [`Page::index`] is **1-based** (page 1 is the first page of the PDF).
//! * [`Hotspot::page_index`] and the lead-gate threshold are **0-based**.
//!
//! The asymmetry mirrors what users see (page numbers) versus what the
//! runtime scripts count (array positions). Conversions between the two are
//! confined to the template pipeline.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Title used when a job has none, or only whitespace.
pub const DEFAULT_TITLE: &str = "Presentation";

/// Site identifier used when a job has none.
pub const DEFAULT_SITE_ID: &str = "deck";

/// Number of free pages when a gate policy omits `freePages`.
pub const DEFAULT_FREE_PAGES: usize = 3;

/// Largest deck `generate` will lay out. Larger page counts are clamped.
pub const MAX_PAGES: usize = 10_000;

/// One rendered PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-based page number.
    pub index: usize,
    /// Pre-rendered markup for the page. Trusted and inserted verbatim.
    pub fragment_html: String,
    /// Plain text extracted from the page, if the rasteriser produced any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Page {
    pub fn new(index: usize, fragment_html: impl Into<String>) -> Self {
        Self {
            index,
            fragment_html: fragment_html.into(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// A clickable rectangle painted over one page.
///
/// Coordinates are percentages (0–100) of the page box, anchored top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub id: String,
    /// 0-based page reference. Signed so that malformed negative values in
    /// job files deserialise and are then excluded instead of failing the job.
    pub page_index: i64,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Hotspot {
    /// Tooltip / accessible text; falls back to the destination URL.
    pub fn display_label(&self) -> &str {
        match self.label.as_deref() {
            Some(l) if !l.trim().is_empty() => l,
            _ => &self.url,
        }
    }

    /// The 0-based page this hotspot belongs to, if it exists in a deck of
    /// `page_count` pages.
    pub fn page_in(&self, page_count: usize) -> Option<usize> {
        usize::try_from(self.page_index)
            .ok()
            .filter(|&i| i < page_count)
    }
}

/// Input kinds offered by the lead-capture form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Tel,
}

impl FieldKind {
    /// Value of the `<input type=…>` attribute.
    pub fn input_type(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
        }
    }
}

/// One field collected by the lead-capture form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadField {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default = "default_true")]
    pub required: bool,
}

impl LeadField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_free_pages() -> usize {
    DEFAULT_FREE_PAGES
}

fn default_fields() -> Vec<LeadField> {
    vec![
        LeadField::new("name", "Name", FieldKind::Text),
        LeadField::new("email", "Email", FieldKind::Email),
    ]
}

/// How many leading pages are readable before the contact form is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadGatePolicy {
    #[serde(default)]
    pub enabled: bool,
    /// Pages at 0-based index `>= free_pages` are gated. Values below 1 are
    /// treated as 1.
    #[serde(default = "default_free_pages")]
    pub free_pages: usize,
    #[serde(default = "default_fields")]
    pub fields: Vec<LeadField>,
    /// Endpoint that receives a best-effort POST of each submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for LeadGatePolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            free_pages: DEFAULT_FREE_PAGES,
            fields: default_fields(),
            webhook_url: None,
            heading: None,
            description: None,
        }
    }
}

impl LeadGatePolicy {
    /// An enabled policy with `free_pages` readable pages and default fields.
    pub fn enabled(free_pages: usize) -> Self {
        Self {
            enabled: true,
            free_pages,
            ..Self::default()
        }
    }

    /// Free-page threshold with the `>= 1` floor applied.
    pub fn effective_free_pages(&self) -> usize {
        self.free_pages.max(1)
    }

    /// Whether the page at 0-based `index` renders locked.
    ///
    /// Always `false` when the policy is disabled.
    pub fn is_locked(&self, index: usize) -> bool {
        self.enabled && index >= self.effective_free_pages()
    }

    pub fn heading_text(&self) -> &str {
        self.heading.as_deref().unwrap_or("Continue reading")
    }

    pub fn description_text(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or("Share your details to unlock the rest of this document.")
    }
}

/// The three interaction models a deck can be generated as.
///
/// Unknown names deserialise to [`TemplateKind::Presentation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum TemplateKind {
    /// Slideshow: one page per viewport.
    #[default]
    Presentation,
    /// Two-sided leaves that flip over.
    Flipbook,
    /// All pages in one vertical scrolling document.
    Documentation,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 3] = [
        TemplateKind::Presentation,
        TemplateKind::Flipbook,
        TemplateKind::Documentation,
    ];

    /// Parse a template name, falling back to `Presentation` for anything
    /// unrecognised.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "flipbook" | "flip-book" => TemplateKind::Flipbook,
            "documentation" | "document" | "scroll" => TemplateKind::Documentation,
            _ => TemplateKind::Presentation,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::Presentation => "presentation",
            TemplateKind::Flipbook => "flipbook",
            TemplateKind::Documentation => "documentation",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for TemplateKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for TemplateKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(TemplateKind::from_name(&name))
    }
}

/// A single deck generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateJob {
    #[serde(default)]
    pub template: TemplateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Identifies the generated site; keys the viewer's unlock flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    /// Explicit page count. When absent the highest page index is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
    #[serde(default)]
    pub lead_gate: LeadGatePolicy,
    /// Raw stylesheet appended after every default rule. Trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
    /// Endpoint receiving batched viewer telemetry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_endpoint: Option<String>,
    /// Strip `<html>`/`<head>` wrappers from fragments that carry them.
    #[serde(default = "default_true")]
    pub extract_body: bool,
}

impl Default for TemplateJob {
    fn default() -> Self {
        Self {
            template: TemplateKind::default(),
            title: None,
            site_id: None,
            page_count: None,
            pages: Vec::new(),
            hotspots: Vec::new(),
            lead_gate: LeadGatePolicy::default(),
            custom_css: None,
            analytics_endpoint: None,
            extract_body: true,
        }
    }
}

impl TemplateJob {
    pub fn new(template: TemplateKind, title: impl Into<String>) -> Self {
        Self {
            template,
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Display title with the `"Presentation"` fallback.
    pub fn resolved_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => DEFAULT_TITLE,
        }
    }

    pub fn resolved_site_id(&self) -> &str {
        match self.site_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => DEFAULT_SITE_ID,
        }
    }

    /// Page count as asked for: explicit value, else the highest page index,
    /// else 1. Not bounded; see [`TemplateJob::resolved_page_count`].
    pub fn requested_page_count(&self) -> usize {
        self.page_count
            .filter(|&n| n > 0)
            .or_else(|| self.pages.iter().map(|p| p.index).max())
            .filter(|&n| n > 0)
            .unwrap_or(1)
    }

    /// [`TemplateJob::requested_page_count`] clamped to [`MAX_PAGES`].
    pub fn resolved_page_count(&self) -> usize {
        self.requested_page_count().min(MAX_PAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_template_falls_back_to_presentation() {
        assert_eq!(TemplateKind::from_name("carousel"), TemplateKind::Presentation);
        assert_eq!(TemplateKind::from_name(""), TemplateKind::Presentation);
        assert_eq!(TemplateKind::from_name(" FlipBook "), TemplateKind::Flipbook);
        assert_eq!(TemplateKind::from_name("documentation"), TemplateKind::Documentation);
    }

    #[test]
    fn job_deserialises_with_defaults() {
        let job: TemplateJob = serde_json::from_str(
            r#"{"template":"magazine","pages":[{"index":1,"fragmentHtml":"<p>Hi</p>"}]}"#,
        )
        .unwrap();
        assert_eq!(job.template, TemplateKind::Presentation);
        assert_eq!(job.resolved_title(), "Presentation");
        assert_eq!(job.resolved_page_count(), 1);
        assert!(!job.lead_gate.enabled);
        assert_eq!(job.lead_gate.free_pages, 3);
        assert_eq!(job.lead_gate.fields.len(), 2);
        assert!(job.extract_body);
    }

    #[test]
    fn page_count_precedence_inside_job() {
        let mut job = TemplateJob::default();
        assert_eq!(job.resolved_page_count(), 1);
        job.pages = vec![Page::new(1, "a"), Page::new(4, "d")];
        assert_eq!(job.resolved_page_count(), 4);
        job.page_count = Some(6);
        assert_eq!(job.resolved_page_count(), 6);
        job.page_count = Some(0);
        assert_eq!(job.resolved_page_count(), 4);
    }

    #[test]
    fn page_count_is_bounded() {
        let job: TemplateJob = serde_json::from_str(
            r#"{"pageCount":18446744073709551615,"pages":[{"index":1,"fragmentHtml":"<p>Hi</p>"}]}"#,
        )
        .unwrap();
        assert_eq!(job.requested_page_count(), usize::MAX);
        assert_eq!(job.resolved_page_count(), MAX_PAGES);

        let mut job = TemplateJob::default();
        job.pages = vec![Page::new(usize::MAX, "x")];
        assert_eq!(job.resolved_page_count(), MAX_PAGES);
    }

    #[test]
    fn blank_title_uses_default() {
        let job = TemplateJob::new(TemplateKind::Flipbook, "   ");
        assert_eq!(job.resolved_title(), DEFAULT_TITLE);
        assert_eq!(job.resolved_site_id(), DEFAULT_SITE_ID);
    }

    #[test]
    fn hotspot_label_and_range() {
        let h: Hotspot = serde_json::from_str(
            r#"{"id":"h1","pageIndex":-1,"top":1,"left":2,"width":3,"height":4,"url":"https://a.example"}"#,
        )
        .unwrap();
        assert_eq!(h.display_label(), "https://a.example");
        assert_eq!(h.page_in(5), None);

        let h = Hotspot {
            page_index: 4,
            label: Some("Docs".into()),
            ..h
        };
        assert_eq!(h.display_label(), "Docs");
        assert_eq!(h.page_in(5), Some(4));
        assert_eq!(h.page_in(4), None);
    }

    #[test]
    fn gate_policy_locking() {
        let p = LeadGatePolicy::enabled(3);
        assert!(!p.is_locked(2));
        assert!(p.is_locked(3));

        let zero = LeadGatePolicy::enabled(0);
        assert!(!zero.is_locked(0));
        assert!(zero.is_locked(1));

        let off = LeadGatePolicy {
            enabled: false,
            free_pages: 1,
            ..LeadGatePolicy::default()
        };
        assert!(!off.is_locked(99));
    }
}

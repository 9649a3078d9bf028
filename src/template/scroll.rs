//! Scroll document: every page in one vertical flow with a table of
//! contents and a reading-progress bar.

use super::{DeckContext, LayoutStrategy, PageView};
use crate::dom::{Element, Node};
use crate::model::TemplateKind;

/// Longest snippet of page text shown in a table-of-contents entry.
pub const TOC_SNIPPET_CHARS: usize = 60;

pub struct ScrollDoc;

/// Anchor id of a page's section.
pub fn section_id(number: usize) -> String {
    format!("page-{number}")
}

/// Table-of-contents label: the page number, plus the first non-empty line
/// of the page's text when there is one.
pub fn toc_label(page: &PageView<'_>) -> String {
    let snippet = page
        .text
        .and_then(|t| t.lines().map(str::trim).find(|l| !l.is_empty()))
        .map(|line| {
            if line.chars().count() > TOC_SNIPPET_CHARS {
                let cut: String = line.chars().take(TOC_SNIPPET_CHARS).collect();
                format!("{}\u{2026}", cut.trim_end())
            } else {
                line.to_string()
            }
        });
    match snippet {
        Some(s) => format!("Page {} \u{00b7} {}", page.number, s),
        None => format!("Page {}", page.number),
    }
}

impl LayoutStrategy for ScrollDoc {
    fn kind(&self) -> TemplateKind {
        TemplateKind::Documentation
    }

    fn body_class(&self) -> &'static str {
        "template-documentation"
    }

    fn stylesheet(&self) -> &'static str {
        include_str!("styles/scroll.css")
    }

    fn script_name(&self) -> &'static str {
        "scroll.js"
    }

    fn runtime(&self) -> &'static str {
        include_str!("runtime/scroll.js")
    }

    fn page_unit(&self, page: &PageView<'_>, body: Element) -> Element {
        Element::new("section")
            .class("doc-section")
            .id(section_id(page.number))
            .child(body)
    }

    fn container(&self, units: Vec<Element>) -> Element {
        Element::new("main").class("doc").id("deck").children(units)
    }

    fn chrome(&self, ctx: &DeckContext<'_>) -> Vec<Node> {
        let progress = Element::new("div")
            .class("doc-progress")
            .attr("aria-hidden", "true")
            .child(Element::new("div").id("doc-progress-bar"));

        let entries = ctx.pages.iter().map(|p| {
            let mut link = Element::new("a")
                .attr("href", format!("#{}", section_id(p.number)))
                .attr("data-target", p.index);
            if p.locked {
                link.add_class("toc-locked");
            }
            Element::new("li").child(link.text(toc_label(p)))
        });
        let toc = Element::new("nav")
            .class("doc-toc")
            .attr("aria-label", "Contents")
            .child(Element::new("ol").children(entries));

        vec![progress.into(), toc.into()]
    }
}

//! Slideshow: one page per viewport, linear cursor, dots for direct jumps.

use super::{paging_controls, DeckContext, LayoutStrategy, PageView};
use crate::dom::{Element, Node};
use crate::model::TemplateKind;

pub struct Slideshow;

impl LayoutStrategy for Slideshow {
    fn kind(&self) -> TemplateKind {
        TemplateKind::Presentation
    }

    fn body_class(&self) -> &'static str {
        "template-presentation"
    }

    fn stylesheet(&self) -> &'static str {
        include_str!("styles/slideshow.css")
    }

    fn script_name(&self) -> &'static str {
        "slideshow.js"
    }

    fn runtime(&self) -> &'static str {
        include_str!("runtime/slideshow.js")
    }

    fn page_unit(&self, page: &PageView<'_>, body: Element) -> Element {
        let first = page.index == 0;
        let mut slide = Element::new("section").class("slide");
        if first {
            slide.add_class("active");
        }
        slide
            .attr("aria-hidden", if first { "false" } else { "true" })
            .child(body)
    }

    fn container(&self, units: Vec<Element>) -> Element {
        Element::new("main").class("slides").id("deck").children(units)
    }

    fn chrome(&self, ctx: &DeckContext<'_>) -> Vec<Node> {
        let dots = Element::new("div")
            .class("dots")
            .attr("role", "tablist")
            .children(ctx.pages.iter().map(|p| {
                let mut dot = Element::new("button")
                    .class("dot")
                    .attr("type", "button")
                    .attr("data-target", p.index)
                    .attr("aria-label", format!("Go to page {}", p.number));
                if p.index == 0 {
                    dot.add_class("active");
                }
                dot
            }));
        vec![paging_controls(ctx.page_count).into(), dots.into()]
    }
}

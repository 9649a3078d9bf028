//! Flip-book: each page is the front of a leaf stacked over the next.
//!
//! Leaves start unflipped, stacked with the first page on top.

use super::{paging_controls, DeckContext, LayoutStrategy, PageView};
use crate::dom::{Element, Node};
use crate::model::TemplateKind;

pub struct Flipbook;

impl LayoutStrategy for Flipbook {
    fn kind(&self) -> TemplateKind {
        TemplateKind::Flipbook
    }

    fn body_class(&self) -> &'static str {
        "template-flipbook"
    }

    fn stylesheet(&self) -> &'static str {
        include_str!("styles/flipbook.css")
    }

    fn script_name(&self) -> &'static str {
        "flipbook.js"
    }

    fn runtime(&self) -> &'static str {
        include_str!("runtime/flipbook.js")
    }

    fn page_unit(&self, page: &PageView<'_>, body: Element) -> Element {
        let mut leaf = Element::new("div").class("leaf");
        if page.index == 0 {
            leaf.add_class("current");
        }
        leaf.attr("style", format!("z-index:{}", page.page_count - page.index))
            .child(Element::new("div").class("leaf-front").child(body))
            .child(
                Element::new("div")
                    .class("leaf-back")
                    .attr("aria-hidden", "true"),
            )
    }

    fn container(&self, units: Vec<Element>) -> Element {
        Element::new("div")
            .class("book-stage")
            .child(Element::new("div").class("book").id("deck").children(units))
    }

    fn chrome(&self, ctx: &DeckContext<'_>) -> Vec<Node> {
        vec![paging_controls(ctx.page_count).into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Page, TemplateJob};
    use crate::template::generate;

    #[test]
    fn leaves_stack_first_page_on_top() {
        let mut job = TemplateJob::new(TemplateKind::Flipbook, "F");
        job.pages = (1..=3).map(|i| Page::new(i, format!("<p>{i}</p>"))).collect();
        let html = generate(&job).index_html().unwrap().to_string();
        assert!(html.contains("<div class=\"leaf current\" style=\"z-index:3\""));
        assert!(html.contains("<div class=\"leaf\" style=\"z-index:2\""));
        assert!(html.contains("<div class=\"leaf\" style=\"z-index:1\""));
        assert_eq!(html.matches("class=\"leaf-front\"").count(), 3);
        assert!(html.contains("<div class=\"book\" id=\"deck\">"));
        assert!(!html.contains("class=\"dots\""));
    }
}

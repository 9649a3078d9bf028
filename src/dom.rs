//! A small typed HTML document model.
//!
//! Generated markup is built as a tree of [`Node`]s and serialised exactly
//! once by [`Node::render`]. All free text and every attribute value is
//! escaped there, in one place, so no call site can forget to. Content that
//! must reach the output untouched (pre-rendered page fragments, the custom
//! stylesheet, runtime scripts) has to be wrapped in [`Node::raw`]
//! explicitly.
//!
//! Serialisation is deterministic: attributes keep insertion order and no
//! timestamps or random identifiers are ever introduced.

use serde::Serialize;
use std::borrow::Cow;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

/// Elements followed by a newline in the serialised output, for readability.
const BLOCK_ELEMENTS: &[&str] = &[
    "html", "head", "body", "header", "main", "nav", "section", "div", "form", "footer",
    "script", "style", "link", "meta", "title", "label", "aside", "ol", "li",
];

/// Escape text for use in element content or a quoted attribute value.
///
/// Borrows when nothing needs escaping.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['<', '>', '&', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Serialise a value as JSON that is safe inside a `<script>` element.
///
/// `<`, `>` and `&` are emitted as unicode escapes so neither `</script>` nor
/// `<!--` can appear in the payload. The result is still valid JSON.
pub fn script_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Text content, escaped on render.
    Text(String),
    /// Trusted markup, emitted verbatim.
    Raw(String),
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn raw(s: impl Into<String>) -> Self {
        Node::Raw(s.into())
    }

    pub fn render(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.render(out),
            Node::Text(t) => out.push_str(&escape(t)),
            Node::Raw(r) => out.push_str(r),
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

/// An HTML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, Option<String>)>,
    classes: Vec<String>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            classes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Set an attribute. A later call with the same name replaces the value
    /// in place, keeping the original position.
    pub fn attr(mut self, name: &'static str, value: impl ToString) -> Self {
        self.set_attr(name, Some(value.to_string()));
        self
    }

    /// A valueless boolean attribute (`hidden`, `required`, …).
    pub fn flag(mut self, name: &'static str) -> Self {
        self.set_attr(name, None);
        self
    }

    pub fn id(self, id: impl ToString) -> Self {
        self.attr("id", id)
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !class.is_empty() && !self.classes.contains(&class) {
            self.classes.push(class);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn set_attr(&mut self, name: &'static str, value: Option<String>) {
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn text(self, s: impl Into<String>) -> Self {
        self.child(Node::text(s))
    }

    pub fn render(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        if !self.classes.is_empty() {
            out.push_str(" class=\"");
            out.push_str(&escape(&self.classes.join(" ")));
            out.push('"');
        }
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            if let Some(v) = value {
                out.push_str("=\"");
                out.push_str(&escape(v));
                out.push('"');
            }
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&self.tag) {
            self.end_line(out);
            return;
        }

        let block_children = self
            .children
            .iter()
            .any(|c| matches!(c, Node::Element(e) if BLOCK_ELEMENTS.contains(&e.tag)));
        if block_children {
            out.push('\n');
        }
        for child in &self.children {
            child.render(out);
        }
        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
        self.end_line(out);
    }

    fn end_line(&self, out: &mut String) {
        if BLOCK_ELEMENTS.contains(&self.tag) {
            out.push('\n');
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

/// A complete HTML5 document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub lang: String,
    pub head: Vec<Node>,
    pub body: Element,
}

impl Document {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            head: Vec::new(),
            body: Element::new("body"),
        }
    }

    pub fn to_html(&self) -> String {
        let html = Element::new("html")
            .attr("lang", &self.lang)
            .child(Element::new("head").children(self.head.iter().cloned()))
            .child(self.body.clone());
        let mut out = String::from("<!DOCTYPE html>\n");
        html.render(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_borrows_clean_input() {
        assert!(matches!(escape("hello"), Cow::Borrowed(_)));
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let el = Element::new("a")
            .attr("href", "https://x.example/?a=1&b=\"2\"")
            .attr("title", "<b>")
            .text("Tom & Jerry <3");
        assert_eq!(
            el.to_html(),
            "<a href=\"https://x.example/?a=1&amp;b=&quot;2&quot;\" title=\"&lt;b&gt;\">Tom &amp; Jerry &lt;3</a>"
        );
    }

    #[test]
    fn raw_nodes_pass_through() {
        let el = Element::new("span").child(Node::raw("<em>ok</em>"));
        assert_eq!(el.to_html(), "<span><em>ok</em></span>");
    }

    #[test]
    fn void_elements_and_flags() {
        let el = Element::new("input").attr("name", "email").flag("required");
        assert_eq!(el.to_html(), "<input name=\"email\" required>");
    }

    #[test]
    fn classes_are_deduplicated_and_attrs_replaced_in_place() {
        let mut el = Element::new("span")
            .class("page")
            .class("page")
            .attr("data-a", 1)
            .attr("data-b", 2)
            .attr("data-a", 3);
        el.add_class("locked");
        assert!(el.has_class("locked"));
        assert_eq!(el.get_attr("data-a"), Some("3"));
        assert_eq!(
            el.to_html(),
            "<span class=\"page locked\" data-a=\"3\" data-b=\"2\"></span>"
        );
    }

    #[test]
    fn document_has_doctype_and_lang() {
        let mut doc = Document::new("en");
        doc.head.push(Element::new("title").text("T").into());
        doc.body.push(Element::new("main").text("x"));
        let html = doc.to_html();
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<title>T</title>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn script_json_cannot_close_the_script() {
        #[derive(Serialize)]
        struct Cfg<'a> {
            url: &'a str,
        }
        let s = script_json(&Cfg {
            url: "</script><script>alert(1)</script>&",
        })
        .unwrap();
        assert!(!s.contains("</script>"));
        assert!(!s.contains('<'));
        let back: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(back["url"], "</script><script>alert(1)</script>&");
    }
}

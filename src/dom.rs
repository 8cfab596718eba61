//! Staging DOM – a small mutable element tree for rendered resume HTML.
//!
//! The parser is a hand-written recursive descent over the markup produced
//! by the composer and the bundled templates. It keeps every element (known
//! or not), treats `<style>` / `<script>` bodies as raw text, and knows the
//! HTML void elements. Elements can be looked up by class and have single
//! `style` properties overwritten in place, which is all print
//! normalization needs.

use std::collections::HashMap;

const VOID_ELEMENTS: [&str; 12] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 2] = ["style", "script"];

/// A node in the staging tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element with a lowercase tag name, attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class_name))
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    /// The `style` attribute split into `(property, value)` pairs.
    pub fn style_declarations(&self) -> Vec<(String, String)> {
        self.inline_style()
            .map(parse_declarations)
            .unwrap_or_default()
    }

    /// Overwrite (or append) one inline style property.
    pub fn set_style_property(&mut self, property: &str, value: &str) {
        let mut decls = self.style_declarations();
        match decls.iter_mut().find(|(p, _)| p == property) {
            Some(existing) => existing.1 = value.to_string(),
            None => decls.push((property.to_string(), value.to_string())),
        }
        let style = decls
            .iter()
            .map(|(p, v)| format!("{p}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.attributes.insert("style".to_string(), style);
    }

    /// Set a style property on this element and every descendant element.
    pub fn set_style_property_deep(&mut self, property: &str, value: &str) {
        self.set_style_property(property, value);
        for child in &mut self.children {
            if let DomNode::Element(e) = child {
                e.set_style_property_deep(property, value);
            }
        }
    }

    /// Child-index path to the first descendant (depth-first, document
    /// order) carrying `class_name`.
    pub fn find_by_class(&self, class_name: &str) -> Option<Vec<usize>> {
        for (i, child) in self.children.iter().enumerate() {
            if let DomNode::Element(e) = child {
                if e.has_class(class_name) {
                    return Some(vec![i]);
                }
                if let Some(mut rest) = e.find_by_class(class_name) {
                    rest.insert(0, i);
                    return Some(rest);
                }
            }
        }
        None
    }

    pub fn at_path(&self, path: &[usize]) -> Option<&ElementNode> {
        let Some((&first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self.children.get(first)? {
            DomNode::Element(e) => e.at_path(rest),
            DomNode::Text(_) => None,
        }
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut ElementNode> {
        let Some((&first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self.children.get_mut(first)? {
            DomNode::Element(e) => e.at_path_mut(rest),
            DomNode::Text(_) => None,
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// Split a CSS declaration block (`a: b; c: d`) into trimmed pairs.
pub fn parse_declarations(block: &str) -> Vec<(String, String)> {
    block
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            if prop.is_empty() {
                None
            } else {
                Some((prop, value.to_string()))
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser { input: html, pos: 0 };
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        while !self.eof() && !self.starts_with("</") {
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_past("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            self.skip_past(">");
            return None;
        }
        if self.starts_with("<") && self.peek_is_tag_start() {
            return Some(self.parse_element());
        }
        Some(self.parse_text())
    }

    fn peek_is_tag_start(&self) -> bool {
        self.rest()[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A lone '<' that does not open a tag is literal text.
        self.advance_char();
        self.pos = match self.rest().find('<') {
            Some(i) => self.pos + i,
            None => self.input.len(),
        };
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.pos += 1; // '<'
        let tag = self.parse_name().to_ascii_lowercase();
        let mut elem = ElementNode::new(&tag);

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            if key.is_empty() {
                // Stray character inside the tag; skip it.
                self.advance_char();
                continue;
            }
            elem.attributes.insert(key.to_ascii_lowercase(), value);
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.pos += 1;
        }
        if VOID_ELEMENTS.contains(&tag.as_str()) {
            return DomNode::Element(elem);
        }

        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let close = format!("</{tag}");
            let end = find_ascii_ci(self.rest(), &close).map_or(self.input.len(), |i| self.pos + i);
            let body = &self.input[self.pos..end];
            if !body.is_empty() {
                elem.children.push(DomNode::Text(body.to_string()));
            }
            self.pos = end;
        } else {
            elem.children = self.parse_nodes();
        }

        if self.starts_with("</") {
            self.skip_past(">");
        }
        DomNode::Element(elem)
    }

    fn parse_name(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.rest().chars().next() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name().to_string();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let end = self.rest().find(q).map_or(self.input.len(), |i| self.pos + i);
                let raw = &self.input[self.pos..end];
                self.pos = (end + 1).min(self.input.len());
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while let Some(c) = self.rest().chars().next() {
                    if c.is_whitespace() || c == '>' {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
                decode_entities(&self.input[start..self.pos])
            }
        };
        (key, value)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn skip_past(&mut self, marker: &str) {
        self.pos = match self.rest().find(marker) {
            Some(i) => self.pos + i + marker.len(),
            None => self.input.len(),
        };
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.rest().chars().next() {
            self.pos += c.len_utf8();
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Decode named entities used in resumes plus numeric references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &tail[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{00A0}'),
                "bull" => Some('\u{2022}'),
                "middot" => Some('\u{00B7}'),
                "ndash" => Some('\u{2013}'),
                "mdash" => Some('\u{2014}'),
                "copy" => Some('\u{00A9}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Children of `<body>` if present (looking through `<html>`), otherwise
/// every top-level node except `<head>`.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == "body" {
                return e.children.clone();
            }
            if e.tag == "html" {
                return body_children(&e.children);
            }
        }
    }
    nodes
        .iter()
        .filter(|n| !matches!(n, DomNode::Element(e) if e.tag == "head"))
        .cloned()
        .collect()
}

/// Concatenated bodies of every `<style>` element in the tree.
pub fn collect_style_text(nodes: &[DomNode]) -> String {
    let mut css = String::new();
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == "style" {
                css.push_str(&e.text_content());
                css.push('\n');
            } else {
                css.push_str(&collect_style_text(&e.children));
            }
        }
    }
    css
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(nodes: &[DomNode]) -> &ElementNode {
        nodes
            .iter()
            .find_map(|n| match n {
                DomNode::Element(e) => Some(e),
                DomNode::Text(_) => None,
            })
            .expect("no element")
    }

    #[test]
    fn parse_nested_with_classes() {
        let nodes = parse_html(r#"<div class="resume-container main"><p>Hi</p></div>"#);
        let div = first_element(&nodes);
        assert_eq!(div.tag, "div");
        assert_eq!(div.classes(), vec!["resume-container", "main"]);
        assert!(div.has_class("main"));
        assert!(!div.has_class("resume"));
        assert_eq!(div.text_content(), "Hi");
    }

    #[test]
    fn void_and_self_closing_elements() {
        let nodes = parse_html(r#"<p>a<br>b<img src="x.png"/>c</p>"#);
        let p = first_element(&nodes);
        assert_eq!(p.children.len(), 5);
        assert_eq!(p.text_content(), "abc");
    }

    #[test]
    fn style_body_is_raw_text() {
        let nodes = parse_html("<style>.a > .b { color: red; }</style><p>x</p>");
        assert_eq!(collect_style_text(&nodes).trim(), ".a > .b { color: red; }");
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn body_children_unwraps_document() {
        let nodes = parse_html(
            "<!DOCTYPE html><html><head><title>T</title></head><body><main>m</main></body></html>",
        );
        let body = body_children(&nodes);
        assert_eq!(body.len(), 1);
        assert!(matches!(&body[0], DomNode::Element(e) if e.tag == "main"));
    }

    #[test]
    fn find_and_mutate_by_class() {
        let mut root = ElementNode::new("div");
        root.children = parse_html(
            r#"<header></header><section><div class="resume-container" style="margin: 0 auto; color: #333">x</div></section>"#,
        );
        let path = root.find_by_class("resume-container").unwrap();
        assert_eq!(path, vec![1, 0]);

        let target = root.at_path_mut(&path).unwrap();
        target.set_style_property("margin", "0");
        target.set_style_property("break-inside", "avoid");
        assert_eq!(
            target.inline_style(),
            Some("margin: 0; color: #333; break-inside: avoid")
        );
    }

    #[test]
    fn deep_style_reaches_descendants() {
        let mut root = ElementNode::new("div");
        root.children = parse_html("<ul><li>a</li><li><span>b</span></li></ul>");
        root.set_style_property_deep("page-break-inside", "avoid");
        let span = root.at_path(&[0, 1, 0]).unwrap();
        assert_eq!(span.inline_style(), Some("page-break-inside: avoid"));
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(
            decode_entities("Tom &amp; Jerry &bull; &#169; &#x2014; &unknown; & done"),
            "Tom & Jerry \u{2022} \u{a9} \u{2014} &unknown; & done"
        );
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let nodes = parse_html("<p>a < b</p>");
        assert_eq!(first_element(&nodes).text_content(), "a < b");
    }

    #[test]
    fn unicode_text_survives() {
        let nodes = parse_html("<p>Zoë • Ünïcode</p>");
        assert_eq!(first_element(&nodes).text_content(), "Zoë • Ünïcode");
    }

    #[test]
    fn multibyte_text_around_tags() {
        let nodes = parse_html("é<b>ñ</b>ü");
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[0], DomNode::Text(t) if t == "é"));
        assert!(matches!(&nodes[2], DomNode::Text(t) if t == "ü"));

        let nodes = parse_html("<p>1 < ö</p>");
        assert_eq!(first_element(&nodes).text_content(), "1 < ö");
    }
}

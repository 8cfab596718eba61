//! Offscreen staging – hosts rendered HTML in a detached container, applies
//! style overrides and lays it out for measuring and painting.

use std::sync::Arc;

use crate::dom::{body_children, collect_style_text, parse_html, ElementNode};
use crate::error::Result;
use crate::fonts::TextMetrics;
use crate::layout::{layout_element, PositionedBox};
use crate::pagination::{mm_to_px, ContentSize};
use crate::raster::{StagingHost, StagingSurface};
use crate::style::{resolve_style, ComputedStyle, Stylesheet};

/// Creates staging containers and tracks how many are attached.
#[derive(Debug, Default)]
pub struct OffscreenHost {
    metrics: Arc<TextMetrics>,
    live: usize,
}

impl OffscreenHost {
    pub fn new(metrics: TextMetrics) -> Self {
        log::debug!(
            "staging text measured with {}",
            if metrics.has_font_file() { "font file metrics" } else { "heuristic metrics" }
        );
        Self {
            metrics: Arc::new(metrics),
            live: 0,
        }
    }

    /// Containers attached and not yet disposed.
    pub fn live_containers(&self) -> usize {
        self.live
    }
}

impl StagingHost for OffscreenHost {
    type Surface = StagedDocument;

    fn attach(&mut self, html: &str, width_mm: f32) -> Result<StagedDocument> {
        let nodes = parse_html(html);
        let sheet = Stylesheet::parse(&collect_style_text(&nodes));

        let mut container = ElementNode::new("div");
        container.set_style_property("position", "fixed");
        container.set_style_property("top", "0");
        container.set_style_property("left", "-9999px");
        container.set_style_property("width", &format!("{width_mm}mm"));
        container.set_style_property("background-color", "white");
        container.children = body_children(&nodes);

        self.live += 1;
        log::trace!(
            "attached staging container #{} ({} stylesheet rules)",
            self.live,
            sheet.len()
        );
        Ok(StagedDocument {
            container,
            sheet,
            metrics: Arc::clone(&self.metrics),
            width_px: mm_to_px(width_mm),
            focus: None,
            layout: None,
        })
    }

    fn dispose(&mut self, surface: &mut StagedDocument) {
        surface.container.children.clear();
        surface.layout = None;
        surface.focus = None;
        self.live = self.live.saturating_sub(1);
    }
}

/// A staged document: the container element, its stylesheet and the most
/// recent layout of the content root.
#[derive(Debug)]
pub struct StagedDocument {
    container: ElementNode,
    sheet: Stylesheet,
    metrics: Arc<TextMetrics>,
    width_px: f32,
    /// Child-index path from the container to the content root.
    focus: Option<Vec<usize>>,
    layout: Option<PositionedBox>,
}

impl StagedDocument {
    /// Layout from the last `settle`, if any.
    pub fn layout(&self) -> Option<&PositionedBox> {
        self.layout.as_ref()
    }

    pub fn container(&self) -> &ElementNode {
        &self.container
    }

    pub fn content_root(&self) -> Option<&ElementNode> {
        self.focus
            .as_deref()
            .and_then(|path| self.container.at_path(path))
    }

    fn content_root_mut(&mut self) -> Option<&mut ElementNode> {
        let path = self.focus.as_deref()?;
        self.container.at_path_mut(path)
    }

    /// Style inherited by the content root from the container and every
    /// ancestor in between.
    fn inherited_style(&self, path: &[usize]) -> ComputedStyle {
        let mut style = resolve_style(&self.container, None, &self.sheet);
        let mut element = &self.container;
        for &index in path.iter().take(path.len().saturating_sub(1)) {
            match element.children.get(index) {
                Some(crate::dom::DomNode::Element(child)) => {
                    style = resolve_style(child, Some(&style), &self.sheet);
                    element = child;
                }
                _ => break,
            }
        }
        style
    }
}

impl StagingSurface for StagedDocument {
    fn settle(&mut self) -> Result<()> {
        let root = match &self.focus {
            Some(path) => {
                let parent = self.inherited_style(path);
                match self.container.at_path(path) {
                    Some(element) => layout_element(
                        element,
                        &parent,
                        &self.sheet,
                        &self.metrics,
                        self.width_px,
                    )?,
                    None => return Ok(()),
                }
            }
            None => layout_element(
                &self.container,
                &ComputedStyle::default(),
                &self.sheet,
                &self.metrics,
                self.width_px,
            )?,
        };
        self.layout = Some(root);
        Ok(())
    }

    fn focus(&mut self, class_name: &str) -> bool {
        self.focus = self.container.find_by_class(class_name);
        self.focus.is_some()
    }

    fn set_root_style(&mut self, property: &str, value: &str) {
        match self.content_root_mut() {
            Some(root) => root.set_style_property(property, value),
            None => log::warn!("no content root focused; ignoring {property}: {value}"),
        }
    }

    fn set_style_all(&mut self, property: &str, value: &str) {
        if let Some(root) = self.content_root_mut() {
            root.set_style_property_deep(property, value);
        }
    }

    fn measure(&self) -> ContentSize {
        self.layout
            .as_ref()
            .map(|root| ContentSize {
                width_px: root.width,
                height_px: root.height,
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::normalize_for_print;

    const DOC: &str = r#"<!DOCTYPE html><html><head><style>
        .resume-container { max-width: 400px; margin: 0 auto; padding: 20px; box-shadow: 0 0 4px #000; }
        h1 { margin: 0; }
    </style></head><body><div class="resume-container"><h1>Ann Lee</h1><p>Engineer</p></div></body></html>"#;

    #[test]
    fn attach_and_dispose_track_live_containers() {
        let mut host = OffscreenHost::default();
        let mut doc = host.attach(DOC, 210.0).unwrap();
        assert_eq!(host.live_containers(), 1);
        let style = doc.container().inline_style().unwrap();
        assert!(style.contains("left: -9999px"));
        assert!(style.contains("width: 210mm"));
        host.dispose(&mut doc);
        assert_eq!(host.live_containers(), 0);
        assert!(doc.container().children.is_empty());
    }

    #[test]
    fn focus_finds_content_root() {
        let mut host = OffscreenHost::default();
        let mut doc = host.attach(DOC, 210.0).unwrap();
        assert!(!doc.focus("missing"));
        assert!(doc.focus("resume-container"));
        assert_eq!(doc.content_root().map(|e| e.tag.as_str()), Some("div"));
    }

    #[test]
    fn normalization_widens_root_to_container() {
        let mut host = OffscreenHost::default();
        let mut doc = host.attach(DOC, 210.0).unwrap();
        assert!(doc.focus("resume-container"));

        doc.settle().unwrap();
        let before = doc.measure();
        assert!((before.width_px - 400.0).abs() < 0.5);

        normalize_for_print(&mut doc);
        doc.settle().unwrap();
        let after = doc.measure();
        assert!((after.width_px - mm_to_px(210.0)).abs() < 0.5);
        assert!(after.height_px > 0.0);

        let root = doc.content_root().unwrap();
        assert!(root.inline_style().unwrap().contains("max-width: none"));
        let h1 = root.at_path(&[0]).unwrap();
        assert!(h1.inline_style().unwrap().contains("page-break-inside: avoid"));
    }

    #[test]
    fn unfocused_settle_lays_out_container() {
        let mut host = OffscreenHost::default();
        let mut doc = host.attach("<p>loose text</p>", 100.0).unwrap();
        assert_eq!(doc.measure(), ContentSize::default());
        doc.settle().unwrap();
        let size = doc.measure();
        assert!((size.width_px - mm_to_px(100.0)).abs() < 0.5);
        assert!(size.height_px > 0.0);
    }
}

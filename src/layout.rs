//! Layout engine – uses Taffy to lay out a staged element tree, then
//! converts the result into nested positioned boxes.
//!
//! Block elements become flex columns (vertical stacking), flex containers
//! keep their direction. An element whose children are all inline is laid
//! out as a single text leaf; Taffy sizes it through a measure function that
//! word-wraps against whatever width the flex algorithm offers.

use std::collections::{HashMap, HashSet};

use taffy::{
    AvailableSpace, LengthPercentage, LengthPercentageAuto, NodeId, Rect, Size, Style, TaffyTree,
};

use crate::dom::{DomNode, ElementNode};
use crate::error::{Error, Result};
use crate::fonts::{collapse_whitespace, TextMetrics};
use crate::style::{self as css, resolve_style, ComputedStyle, Stylesheet, TextAlign};

/// Class marking an explicit page break (legacy break mode).
pub const LEGACY_BREAK_CLASS: &str = "html2pdf__page-break";

/// One wrapped line of text, offset from the content box's left edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x_offset: f32,
    pub width: f32,
}

/// A positioned box in content coordinates (px, origin at the content
/// root's top-left corner).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub lines: Vec<TextLine>,
    /// List marker drawn in the left gutter.
    pub marker: Option<String>,
    pub legacy_break: bool,
    pub children: Vec<PositionedBox>,
}

impl PositionedBox {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Top-left corner of the content box.
    pub fn content_origin(&self) -> (f32, f32) {
        let s = &self.style;
        (
            self.x + s.padding_left + s.border_width,
            self.y + s.padding_top + s.border_width,
        )
    }

    /// All text in the subtree, one line per entry.
    pub fn text_lines(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.lines.iter().map(|l| l.text.as_str()).collect();
        for child in &self.children {
            out.extend(child.text_lines());
        }
        out
    }
}

struct TextRun {
    text: String,
    font_size: f32,
    bold: bool,
    line_height_px: f32,
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    metrics: &'a TextMetrics,
    sheet: &'a Stylesheet,
    node_styles: HashMap<NodeId, ComputedStyle>,
    runs: HashMap<NodeId, TextRun>,
    markers: HashMap<NodeId, String>,
    legacy_breaks: HashSet<NodeId>,
}

fn layout_error(e: taffy::TaffyError) -> Error {
    Error::Rasterization(format!("layout failed: {e}"))
}

impl<'a> LayoutBuilder<'a> {
    fn new(metrics: &'a TextMetrics, sheet: &'a Stylesheet) -> Self {
        // Boxes are painted in points, so keep fractional pixel sizes.
        let mut taffy = TaffyTree::new();
        taffy.disable_rounding();
        Self {
            taffy,
            metrics,
            sheet,
            node_styles: HashMap::new(),
            runs: HashMap::new(),
            markers: HashMap::new(),
            legacy_breaks: HashSet::new(),
        }
    }

    /// True when every child is text or an inline element with inline
    /// content. Hidden children don't count.
    fn is_inline_content(&self, element: &ElementNode, style: &ComputedStyle) -> bool {
        element.children.iter().all(|child| match child {
            DomNode::Text(_) => true,
            DomNode::Element(e) => {
                let s = resolve_style(e, Some(style), self.sheet);
                match s.display {
                    css::Display::None => true,
                    css::Display::Inline => self.is_inline_content(e, &s),
                    _ => false,
                }
            }
        })
    }

    fn inline_text(&self, element: &ElementNode, style: &ComputedStyle, out: &mut String) {
        for child in &element.children {
            match child {
                DomNode::Text(t) => out.push_str(t),
                DomNode::Element(e) if e.tag == "br" => out.push(' '),
                DomNode::Element(e) => {
                    let s = resolve_style(e, Some(style), self.sheet);
                    if s.display != css::Display::None {
                        self.inline_text(e, &s, out);
                    }
                }
            }
        }
    }

    fn text_leaf(&mut self, text: &str, style: ComputedStyle) -> Result<NodeId> {
        let node = self
            .taffy
            .new_leaf(computed_to_taffy(&style, true))
            .map_err(layout_error)?;
        if !text.is_empty() {
            self.runs.insert(
                node,
                TextRun {
                    text: text.to_string(),
                    font_size: style.font_size,
                    bold: style.is_bold(),
                    line_height_px: style.line_height_px(),
                },
            );
        }
        self.node_styles.insert(node, style);
        Ok(node)
    }

    fn build_element(
        &mut self,
        element: &ElementNode,
        style: ComputedStyle,
    ) -> Result<Option<NodeId>> {
        if style.display == css::Display::None {
            return Ok(None);
        }

        let node = if style.display != css::Display::Flex
            && self.is_inline_content(element, &style)
        {
            let mut raw = String::new();
            self.inline_text(element, &style, &mut raw);
            let text = collapse_whitespace(&raw);
            self.text_leaf(text.trim(), style)?
        } else {
            let mut child_ids = Vec::new();
            let mut ordinal = 0u32;
            for child in &element.children {
                match child {
                    DomNode::Text(t) => {
                        let text = collapse_whitespace(t);
                        let text = text.trim();
                        if !text.is_empty() {
                            child_ids.push(self.text_leaf(text, style.inherited())?);
                        }
                    }
                    DomNode::Element(e) => {
                        let child_style = resolve_style(e, Some(&style), self.sheet);
                        let draws_marker =
                            e.tag == "li" && child_style.list_marker && child_style.display == css::Display::ListItem;
                        let Some(id) = self.build_element(e, child_style)? else {
                            continue;
                        };
                        if draws_marker {
                            ordinal += 1;
                            let marker = if element.tag == "ol" {
                                format!("{ordinal}.")
                            } else {
                                "\u{2022}".to_string()
                            };
                            self.markers.insert(id, marker);
                        }
                        child_ids.push(id);
                    }
                }
            }
            let node = self
                .taffy
                .new_with_children(computed_to_taffy(&style, false), &child_ids)
                .map_err(layout_error)?;
            self.node_styles.insert(node, style);
            node
        };

        if element.has_class(LEGACY_BREAK_CLASS) {
            self.legacy_breaks.insert(node);
        }
        Ok(Some(node))
    }

    fn compute(&mut self, root: NodeId, width_px: f32) -> Result<()> {
        let runs = &self.runs;
        let metrics = self.metrics;
        self.taffy
            .compute_layout_with_measure(
                root,
                Size {
                    width: AvailableSpace::Definite(width_px),
                    height: AvailableSpace::MaxContent,
                },
                |known, available, node, _context, _style| {
                    let Some(run) = runs.get(&node) else {
                        return Size::ZERO;
                    };
                    let limit = known.width.unwrap_or(match available.width {
                        AvailableSpace::Definite(w) => w,
                        AvailableSpace::MinContent => 0.0,
                        AvailableSpace::MaxContent => f32::INFINITY,
                    });
                    let lines = metrics.wrap(&run.text, run.font_size, run.bold, limit);
                    let widest = lines
                        .iter()
                        .map(|l| metrics.text_width(l, run.font_size, run.bold))
                        .fold(0.0f32, f32::max);
                    Size {
                        width: known.width.unwrap_or(widest),
                        height: known
                            .height
                            .unwrap_or(lines.len() as f32 * run.line_height_px),
                    }
                },
            )
            .map_err(layout_error)
    }

    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox> {
        let layout = self.taffy.layout(node).map_err(layout_error)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let lines = match self.runs.get(&node) {
            Some(run) => {
                let inner = (layout.size.width
                    - style.padding_left
                    - style.padding_right
                    - 2.0 * style.border_width)
                    .max(0.0);
                // Small slack so a width that exactly fits its widest line
                // does not re-wrap on rounding.
                self.metrics
                    .wrap(&run.text, run.font_size, run.bold, inner + 0.5)
                    .into_iter()
                    .map(|text| {
                        let width = self.metrics.text_width(&text, run.font_size, run.bold);
                        let x_offset = match style.text_align {
                            TextAlign::Left => 0.0,
                            TextAlign::Center => ((inner - width) / 2.0).max(0.0),
                            TextAlign::Right => (inner - width).max(0.0),
                        };
                        TextLine {
                            text,
                            x_offset,
                            width,
                        }
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        let children = self
            .taffy
            .children(node)
            .map_err(layout_error)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<Result<Vec<_>>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style,
            lines,
            marker: self.markers.get(&node).cloned(),
            legacy_break: self.legacy_breaks.contains(&node),
            children,
        })
    }
}

fn computed_to_taffy(s: &ComputedStyle, leaf: bool) -> Style {
    let mut ts = Style::default();

    match s.display {
        css::Display::Flex => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = match s.flex_direction {
                css::FlexDirection::Row => taffy::FlexDirection::Row,
                css::FlexDirection::Column => taffy::FlexDirection::Column,
            };
            ts.flex_wrap = match s.flex_wrap {
                css::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                css::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
            };
            ts.justify_content = Some(match s.justify_content {
                css::JustifyContent::Start => taffy::JustifyContent::Start,
                css::JustifyContent::End => taffy::JustifyContent::End,
                css::JustifyContent::Center => taffy::JustifyContent::Center,
                css::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                css::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
            });
            ts.align_items = Some(match s.align_items {
                css::AlignItems::Start => taffy::AlignItems::Start,
                css::AlignItems::End => taffy::AlignItems::End,
                css::AlignItems::Center => taffy::AlignItems::Center,
                css::AlignItems::Baseline => taffy::AlignItems::Baseline,
                css::AlignItems::Stretch => taffy::AlignItems::Stretch,
            });
        }
        css::Display::None => ts.display = taffy::Display::None,
        // Block-level and stray inline boxes stack vertically.
        _ => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Column;
        }
    }

    ts.size = Size {
        width: dim_to_taffy(s.width),
        height: dim_to_taffy(s.height),
    };
    // Containers may shrink below their content; text keeps its longest word.
    ts.min_size = Size {
        width: if !leaf && (s.flex_shrink > 0.0 || s.flex_grow > 0.0) {
            taffy::Dimension::Length(0.0)
        } else {
            dim_to_taffy(s.min_width)
        },
        height: taffy::Dimension::Auto,
    };
    ts.max_size = Size {
        width: dim_to_taffy(s.max_width),
        height: taffy::Dimension::Auto,
    };

    ts.flex_grow = s.flex_grow;
    ts.flex_shrink = s.flex_shrink;
    ts.flex_basis = dim_to_taffy(s.flex_basis);

    ts.margin = Rect {
        top: LengthPercentageAuto::Length(s.margin_top),
        right: LengthPercentageAuto::Length(s.margin_right),
        bottom: LengthPercentageAuto::Length(s.margin_bottom),
        left: LengthPercentageAuto::Length(s.margin_left),
    };
    ts.padding = Rect {
        top: LengthPercentage::Length(s.padding_top),
        right: LengthPercentage::Length(s.padding_right),
        bottom: LengthPercentage::Length(s.padding_bottom),
        left: LengthPercentage::Length(s.padding_left),
    };
    ts.border = Rect {
        top: LengthPercentage::Length(s.border_width),
        right: LengthPercentage::Length(s.border_width),
        bottom: LengthPercentage::Length(s.border_width.max(s.border_bottom_width)),
        left: LengthPercentage::Length(s.border_width),
    };
    ts.gap = Size {
        width: LengthPercentage::Length(s.gap),
        height: LengthPercentage::Length(s.gap),
    };
    ts
}

fn dim_to_taffy(d: css::Dimension) -> taffy::Dimension {
    match d {
        css::Dimension::Auto => taffy::Dimension::Auto,
        css::Dimension::Px(v) => taffy::Dimension::Length(v),
        css::Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

/// Lay out `element` inside a container `width_px` wide. The returned
/// root box sits at the origin; its size is the element's natural size.
pub fn layout_element(
    element: &ElementNode,
    parent_style: &ComputedStyle,
    sheet: &Stylesheet,
    metrics: &TextMetrics,
    width_px: f32,
) -> Result<PositionedBox> {
    let mut builder = LayoutBuilder::new(metrics, sheet);
    let style = resolve_style(element, Some(parent_style), sheet);
    let content = match builder.build_element(element, style)? {
        Some(node) => node,
        None => builder.text_leaf("", parent_style.inherited())?,
    };

    let container = builder
        .taffy
        .new_with_children(
            Style {
                display: taffy::Display::Flex,
                flex_direction: taffy::FlexDirection::Column,
                size: Size {
                    width: taffy::Dimension::Length(width_px),
                    height: taffy::Dimension::Auto,
                },
                ..Default::default()
            },
            &[content],
        )
        .map_err(layout_error)?;

    builder.compute(container, width_px)?;

    let origin = builder.taffy.layout(content).map_err(layout_error)?.location;
    let root = builder.extract(content, -origin.x, -origin.y)?;
    log::trace!(
        "laid out <{}> at {:.1} x {:.1} px",
        element.tag,
        root.width,
        root.height
    );
    Ok(root)
}

//! Style resolver – maps template `<style>` rules and inline styles to a
//! flat [`ComputedStyle`] consumed by the layout engine.
//!
//! Only the subset of CSS that resume templates actually use is understood:
//! box model, flex containers, typography, colours and the page-break
//! properties. Selectors are matched on their last compound (`tag`,
//! `.class`, `tag.class`), which is enough for the flat class-based
//! stylesheets of the bundled templates.

use crate::dom::{parse_declarations, ElementNode};
use crate::pagination::PX_TO_MM;

/// Root font size used for `rem`.
pub const ROOT_FONT_SIZE: f32 = 16.0;

/// Fully resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Dimension,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub max_width: Dimension,

    // Spacing (px)
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    pub border_width: f32,
    pub border_bottom_width: f32,
    pub border_color: Color,

    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,

    pub background_color: Color,

    pub break_before: bool,
    pub break_after: bool,
    pub break_inside_avoid: bool,

    /// Whether list items draw a marker.
    pub list_marker: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: Dimension::Auto,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            max_width: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_width: 0.0,
            border_bottom_width: 0.0,
            border_color: Color::BLACK,
            font_size: ROOT_FONT_SIZE,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            background_color: Color::TRANSPARENT,
            break_before: false,
            break_after: false,
            break_inside_avoid: false,
            list_marker: true,
        }
    }
}

impl ComputedStyle {
    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }

    pub fn line_height_px(&self) -> f32 {
        self.font_size * self.line_height
    }

    /// Copy of the inherited text properties with every box property reset.
    pub fn inherited(&self) -> Self {
        Self {
            font_size: self.font_size,
            font_weight: self.font_weight,
            font_style: self.font_style,
            color: self.color,
            text_align: self.text_align,
            line_height: self.line_height,
            list_marker: self.list_marker,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    InlineBlock,
    ListItem,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Baseline,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            _ => None,
        }
    }

    /// Parse `#hex`, `rgb()`/`rgba()` or one of a few named colours.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with('#') {
            return Self::from_hex(value);
        }
        let lower = value.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|a| a.strip_suffix(')'))
        {
            let parts: Vec<f32> = args
                .split(',')
                .filter_map(|p| p.trim().parse().ok())
                .collect();
            return match parts.as_slice() {
                [r, g, b] => Some(Self::rgb(r / 255.0, g / 255.0, b / 255.0)),
                [r, g, b, a] => Some(Self {
                    a: *a,
                    ..Self::rgb(r / 255.0, g / 255.0, b / 255.0)
                }),
                _ => None,
            };
        }
        match lower.as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "transparent" | "none" => Some(Self::TRANSPARENT),
            "gray" | "grey" => Some(Self::rgb(0.5, 0.5, 0.5)),
            "red" => Some(Self::rgb(1.0, 0.0, 0.0)),
            "navy" => Some(Self::rgb(0.0, 0.0, 0.5)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stylesheet
// ---------------------------------------------------------------------------

/// The last compound of a selector: optional tag plus required classes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(selector: &str) -> Option<Self> {
        let last = selector
            .split(|c: char| c.is_whitespace() || c == '>' || c == '+' || c == '~')
            .filter(|s| !s.is_empty())
            .last()?;
        if last.contains(':') || last.contains('[') || last.contains('#') {
            return None;
        }
        let mut parts = last.split('.');
        let tag = parts
            .next()
            .filter(|t| !t.is_empty() && *t != "*")
            .map(str::to_ascii_lowercase);
        let classes: Vec<String> = parts.map(str::to_string).collect();
        if classes.iter().any(String::is_empty) {
            return None;
        }
        Some(Self { tag, classes })
    }

    fn matches(&self, element: &ElementNode) -> bool {
        self.tag.as_deref().map_or(true, |t| t == element.tag)
            && self.classes.iter().all(|c| element.has_class(c))
    }

    fn specificity(&self) -> (usize, usize) {
        (self.classes.len(), usize::from(self.tag.is_some()))
    }
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Compound,
    declarations: Vec<(String, String)>,
    order: usize,
}

/// Rules collected from a document's `<style>` elements.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut rules = Vec::new();
        let mut rest = css.as_str();
        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let after = &rest[open + 1..];
            if prelude.starts_with('@') {
                // At-rules (media queries, font faces, page rules) are skipped.
                rest = skip_block(after);
                continue;
            }
            let close = after.find('}').unwrap_or(after.len());
            let declarations = parse_declarations(&after[..close]);
            for selector in prelude.split(',') {
                if let Some(compound) = Compound::parse(selector.trim()) {
                    rules.push(Rule {
                        selector: compound,
                        declarations: declarations.clone(),
                        order: rules.len(),
                    });
                }
            }
            rest = after.get(close + 1..).unwrap_or("");
        }
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Declarations matching `element`, lowest precedence first.
    fn matching(&self, element: &ElementNode) -> Vec<&(String, String)> {
        let mut hits: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|r| r.selector.matches(element))
            .collect();
        hits.sort_by_key(|r| (r.selector.specificity(), r.order));
        hits.iter().flat_map(|r| r.declarations.iter()).collect()
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = rest[start + 2..]
            .find("*/")
            .map_or("", |end| &rest[start + 2 + end + 2..]);
    }
    out.push_str(rest);
    out
}

/// Skip past the block whose opening brace has just been consumed.
fn skip_block(s: &str) -> &str {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &s[i + 1..];
                }
            }
            _ => {}
        }
    }
    ""
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element, inheriting text properties from its
/// parent. Precedence: tag defaults, stylesheet rules, inline `style`.
pub fn resolve_style(
    element: &ElementNode,
    parent: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> ComputedStyle {
    let mut style = parent.map(ComputedStyle::inherited).unwrap_or_default();
    apply_tag_defaults(&mut style, &element.tag);

    for (prop, val) in sheet.matching(element) {
        apply_css_property(&mut style, prop, val);
    }
    for (prop, val) in element.style_declarations() {
        apply_css_property(&mut style, &prop, &val);
    }
    style
}

fn apply_tag_defaults(s: &mut ComputedStyle, tag: &str) {
    let heading = |s: &mut ComputedStyle, em: f32, margin_em: f32| {
        s.font_size *= em;
        s.font_weight = FontWeight::Bold;
        s.margin_top = s.font_size * margin_em;
        s.margin_bottom = s.font_size * margin_em;
    };
    match tag {
        "h1" => heading(s, 2.0, 0.67),
        "h2" => heading(s, 1.5, 0.83),
        "h3" => heading(s, 1.17, 1.0),
        "h4" => heading(s, 1.0, 1.33),
        "p" => {
            s.margin_top = s.font_size;
            s.margin_bottom = s.font_size;
        }
        "ul" | "ol" => {
            s.margin_top = s.font_size;
            s.margin_bottom = s.font_size;
            s.padding_left = 40.0;
        }
        "li" => s.display = Display::ListItem,
        "strong" | "b" => {
            s.display = Display::Inline;
            s.font_weight = FontWeight::Bold;
        }
        "em" | "i" => {
            s.display = Display::Inline;
            s.font_style = FontStyle::Italic;
        }
        "span" | "a" | "small" | "label" | "code" | "abbr" | "time" => {
            s.display = Display::Inline
        }
        "head" | "style" | "script" | "title" | "meta" | "link" | "template" | "br" => {
            s.display = Display::None
        }
        _ => {}
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    let val = val.trim_end_matches("!important").trim();
    let em = s.font_size;
    match prop {
        "display" => {
            s.display = match val {
                "flex" | "inline-flex" => Display::Flex,
                "block" | "grid" => Display::Block,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "list-item" => Display::ListItem,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val {
                "column" | "column-reverse" => FlexDirection::Column,
                _ => FlexDirection::Row,
            }
        }
        "flex-wrap" => {
            s.flex_wrap = if val == "wrap" {
                FlexWrap::Wrap
            } else {
                FlexWrap::NoWrap
            }
        }
        "flex" => apply_flex_shorthand(s, val),
        "flex-grow" => s.flex_grow = val.parse().unwrap_or(s.flex_grow),
        "flex-shrink" => s.flex_shrink = val.parse().unwrap_or(s.flex_shrink),
        "flex-basis" => s.flex_basis = parse_dimension(val, em),
        "justify-content" => {
            s.justify_content = match val {
                "flex-end" | "end" | "right" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" | "space-evenly" => JustifyContent::SpaceAround,
                _ => JustifyContent::Start,
            }
        }
        "align-items" => {
            s.align_items = match val {
                "flex-start" | "start" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                "baseline" => AlignItems::Baseline,
                _ => AlignItems::Stretch,
            }
        }
        "gap" | "column-gap" | "row-gap" => {
            if let Some(px) = parse_length(first_token(val), em) {
                s.gap = px;
            }
        }
        "width" => s.width = parse_dimension(val, em),
        "height" => s.height = parse_dimension(val, em),
        "min-width" => s.min_width = parse_dimension(val, em),
        "max-width" => s.max_width = parse_dimension(val, em),
        "margin" => {
            let [t, r, b, l] = parse_box_shorthand(val, em);
            (s.margin_top, s.margin_right, s.margin_bottom, s.margin_left) = (t, r, b, l);
        }
        "margin-top" => set_length(&mut s.margin_top, val, em),
        "margin-right" => set_length(&mut s.margin_right, val, em),
        "margin-bottom" => set_length(&mut s.margin_bottom, val, em),
        "margin-left" => set_length(&mut s.margin_left, val, em),
        "padding" => {
            let [t, r, b, l] = parse_box_shorthand(val, em);
            (s.padding_top, s.padding_right, s.padding_bottom, s.padding_left) = (t, r, b, l);
        }
        "padding-top" => set_length(&mut s.padding_top, val, em),
        "padding-right" => set_length(&mut s.padding_right, val, em),
        "padding-bottom" => set_length(&mut s.padding_bottom, val, em),
        "padding-left" => set_length(&mut s.padding_left, val, em),
        "border" => {
            let (width, color) = parse_border(val, em);
            s.border_width = width;
            s.border_color = color.unwrap_or(s.border_color);
        }
        "border-bottom" => {
            let (width, color) = parse_border(val, em);
            s.border_bottom_width = width;
            s.border_color = color.unwrap_or(s.border_color);
        }
        "border-width" => set_length(&mut s.border_width, first_token(val), em),
        "border-color" => s.border_color = Color::parse(val).unwrap_or(s.border_color),
        "font-size" => {
            if let Some(px) = parse_font_size(val, em) {
                s.font_size = px;
            }
        }
        "font-weight" => {
            s.font_weight = match val {
                "bold" | "bolder" => FontWeight::Bold,
                _ => match val.parse::<u16>() {
                    Ok(n) if n >= 600 => FontWeight::Bold,
                    _ => FontWeight::Normal,
                },
            }
        }
        "font-style" => {
            s.font_style = if val == "italic" || val == "oblique" {
                FontStyle::Italic
            } else {
                FontStyle::Normal
            }
        }
        "color" => s.color = Color::parse(val).unwrap_or(s.color),
        "background-color" => {
            s.background_color = Color::parse(val).unwrap_or(s.background_color)
        }
        "background" => {
            if let Some(c) = val.split_whitespace().find_map(Color::parse) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "line-height" => {
            if val == "normal" {
                s.line_height = 1.2;
            } else if let Ok(factor) = val.parse::<f32>() {
                s.line_height = factor;
            } else if let Some(px) = parse_length(val, em) {
                if s.font_size > 0.0 {
                    s.line_height = px / s.font_size;
                }
            }
        }
        "break-before" | "page-break-before" => s.break_before = is_forced_break(val),
        "break-after" | "page-break-after" => s.break_after = is_forced_break(val),
        "break-inside" | "page-break-inside" => s.break_inside_avoid = val == "avoid",
        "list-style" | "list-style-type" => s.list_marker = !val.split_whitespace().any(|v| v == "none"),
        _ => {}
    }
}

fn is_forced_break(val: &str) -> bool {
    matches!(val, "always" | "page" | "left" | "right")
}

fn apply_flex_shorthand(s: &mut ComputedStyle, val: &str) {
    let parts: Vec<&str> = val.split_whitespace().collect();
    match parts.as_slice() {
        ["none"] => {
            s.flex_grow = 0.0;
            s.flex_shrink = 0.0;
        }
        ["auto"] => {
            s.flex_grow = 1.0;
            s.flex_shrink = 1.0;
            s.flex_basis = Dimension::Auto;
        }
        [grow] => {
            if let Ok(g) = grow.parse() {
                s.flex_grow = g;
                s.flex_shrink = 1.0;
                s.flex_basis = Dimension::Px(0.0);
            } else {
                s.flex_basis = parse_dimension(grow, s.font_size);
            }
        }
        [grow, shrink] => {
            s.flex_grow = grow.parse().unwrap_or(0.0);
            s.flex_shrink = shrink.parse().unwrap_or(1.0);
            s.flex_basis = Dimension::Px(0.0);
        }
        [grow, shrink, basis, ..] => {
            s.flex_grow = grow.parse().unwrap_or(0.0);
            s.flex_shrink = shrink.parse().unwrap_or(1.0);
            s.flex_basis = parse_dimension(basis, s.font_size);
        }
        [] => {}
    }
}

fn first_token(val: &str) -> &str {
    val.split_whitespace().next().unwrap_or("")
}

fn set_length(slot: &mut f32, val: &str, em: f32) {
    if let Some(px) = parse_length(val, em) {
        *slot = px;
    }
}

/// Parse a CSS length into px. `auto` resolves to zero.
pub fn parse_length(val: &str, em: f32) -> Option<f32> {
    let val = val.trim();
    if val == "auto" || val == "0" {
        return Some(0.0);
    }
    let (number, unit) = split_unit(val);
    let n: f32 = number.parse().ok()?;
    match unit {
        "px" | "" => Some(n),
        "mm" => Some(n / PX_TO_MM),
        "cm" => Some(n * 10.0 / PX_TO_MM),
        "in" => Some(n * 96.0),
        "pt" => Some(n * 96.0 / 72.0),
        "em" => Some(n * em),
        "rem" => Some(n * ROOT_FONT_SIZE),
        _ => None,
    }
}

fn parse_font_size(val: &str, parent: f32) -> Option<f32> {
    match val {
        "small" => Some(13.0),
        "medium" => Some(16.0),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "smaller" => Some(parent * 0.83),
        "larger" => Some(parent * 1.2),
        _ => match split_unit(val) {
            (n, "%") => n.parse::<f32>().ok().map(|p| parent * p / 100.0),
            _ => parse_length(val, parent),
        },
    }
}

fn split_unit(val: &str) -> (&str, &str) {
    let idx = val
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(val.len());
    (&val[..idx], &val[idx..])
}

pub fn parse_dimension(val: &str, em: f32) -> Dimension {
    let val = val.trim();
    match val {
        "auto" | "none" | "" => Dimension::Auto,
        _ => match split_unit(val) {
            (n, "%") => n.parse().map(Dimension::Percent).unwrap_or(Dimension::Auto),
            _ => parse_length(val, em).map_or(Dimension::Auto, Dimension::Px),
        },
    }
}

/// `[top, right, bottom, left]` from a 1–4 value shorthand.
fn parse_box_shorthand(val: &str, em: f32) -> [f32; 4] {
    let parts: Vec<f32> = val
        .split_whitespace()
        .filter_map(|p| parse_length(p, em))
        .collect();
    match parts.as_slice() {
        [a] => [*a; 4],
        [v, h] => [*v, *h, *v, *h],
        [t, h, b] => [*t, *h, *b, *h],
        [t, r, b, l, ..] => [*t, *r, *b, *l],
        [] => [0.0; 4],
    }
}

fn parse_border(val: &str, em: f32) -> (f32, Option<Color>) {
    if val == "none" || val == "0" {
        return (0.0, None);
    }
    let mut width = None;
    let mut color = None;
    for part in val.split_whitespace() {
        if let Some(c) = Color::parse(part) {
            color = Some(c);
        } else if let Some(px) = parse_length(part, em) {
            width = Some(px);
        } else if part == "thin" {
            width = Some(1.0);
        }
    }
    (width.unwrap_or(1.0), color)
}

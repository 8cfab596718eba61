//! PDF rasterizer – paints a laid-out staging document into PDF bytes with
//! `printpdf` (v0.8 ops-based API).
//!
//! Content coordinates are CSS px with the content root at the origin.
//! One px is 0.75 pt, multiplied by the fit scale so the content fits the
//! printable width. Pages are cut between boxes according to the requested
//! page-break modes; boxes straddling a cut have their decoration clipped to
//! each page.

use std::path::Path;

use printpdf::*;

use crate::error::{Error, Result};
use crate::layout::PositionedBox;
use crate::pagination::PX_TO_MM;
use crate::raster::{PageBreakMode, RasterOptions, Rasterizer};
use crate::staging::StagedDocument;
use crate::style::Color as CssColor;

const PT_PER_MM: f32 = 72.0 / 25.4;
const PT_PER_PX: f32 = 0.75;

/// Rounding slack when comparing content positions, in px.
const SLACK_PX: f32 = 0.5;

/// Rasterizer for documents staged by [`crate::staging::OffscreenHost`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRasterizer;

impl Rasterizer<StagedDocument> for PdfRasterizer {
    fn rasterize(&mut self, surface: &StagedDocument, options: &RasterOptions) -> Result<Vec<u8>> {
        let root = surface.layout().ok_or_else(|| {
            Error::Rasterization("staged document has not been laid out".to_string())
        })?;
        render_pdf(root, options)
    }

    fn planned_pages(&self, surface: &StagedDocument, options: &RasterOptions) -> Option<usize> {
        let root = surface.layout()?;
        Some(page_starts(root, page_height_px(options), options).len())
    }
}

/// Maps content px onto one PDF page.
struct PageFrame {
    page_height_pt: f32,
    margin_left_pt: f32,
    margin_top_pt: f32,
    /// pt per content px.
    k: f32,
    /// Content range shown on this page.
    start: f32,
    end: f32,
}

impl PageFrame {
    fn x(&self, px: f32) -> Pt {
        Pt(self.margin_left_pt + px * self.k)
    }

    fn y(&self, px: f32) -> Pt {
        Pt(self.page_height_pt - self.margin_top_pt - (px - self.start) * self.k)
    }

    fn shows(&self, top: f32) -> bool {
        top >= self.start - SLACK_PX && top < self.end - SLACK_PX
    }
}

/// Height of one page's printable area in content px.
pub fn page_height_px(options: &RasterOptions) -> f32 {
    let [_, height_mm] = options.page.format;
    let printable_mm = (height_mm - options.margin.vertical()).max(1.0);
    printable_mm / PX_TO_MM / options.fit_scale.max(f32::EPSILON)
}

/// Content y offsets at which each page starts. Always at least `[0.0]`.
pub fn page_starts(root: &PositionedBox, page_height: f32, options: &RasterOptions) -> Vec<f32> {
    let avoid_all = options.breaks(PageBreakMode::AvoidAll);
    let css = options.breaks(PageBreakMode::Css);
    let legacy = options.breaks(PageBreakMode::Legacy);

    let mut blocks = Vec::new();
    collect_blocks(root, page_height, (avoid_all, css, legacy), &mut blocks);
    blocks.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut starts = vec![0.0f32];
    let mut start = 0.0f32;
    let mut break_after: Option<f32> = None;

    for block in blocks {
        let forced = (css && block.style.break_before)
            || (legacy && block.legacy_break)
            || break_after.is_some_and(|at| block.y >= at - SLACK_PX);
        let overflows = block.bottom() > start + page_height + SLACK_PX;
        if (forced || overflows) && block.y > start + SLACK_PX {
            start = block.y;
            starts.push(start);
            break_after = None;
        }
        // A single box taller than a page is sliced mechanically.
        while block.bottom() > start + page_height + SLACK_PX {
            start += page_height;
            starts.push(start);
        }
        if css && block.style.break_after {
            break_after = Some(block.bottom());
        }
    }
    starts
}

/// Boxes pagination may not split: whole boxes where breaking inside is
/// avoided, the box fits a page and holds no forced break; leaves otherwise.
fn collect_blocks<'b>(
    b: &'b PositionedBox,
    page_height: f32,
    modes: (bool, bool, bool),
    out: &mut Vec<&'b PositionedBox>,
) {
    let (avoid_all, css, legacy) = modes;
    let keep_whole = (avoid_all || b.style.break_inside_avoid)
        && b.height <= page_height
        && !holds_forced_break(b, css, legacy);
    if keep_whole || b.children.is_empty() {
        out.push(b);
    } else {
        for child in &b.children {
            collect_blocks(child, page_height, modes, out);
        }
    }
}

fn holds_forced_break(b: &PositionedBox, css: bool, legacy: bool) -> bool {
    b.children.iter().any(|c| {
        (css && (c.style.break_before || c.style.break_after))
            || (legacy && c.legacy_break)
            || holds_forced_break(c, css, legacy)
    })
}

/// Paint `root` into a PDF document.
pub fn render_pdf(root: &PositionedBox, options: &RasterOptions) -> Result<Vec<u8>> {
    let [width_mm, height_mm] = options.page.format;
    if !(width_mm > 0.0 && height_mm > 0.0) {
        return Err(Error::Rasterization(format!(
            "invalid page format {width_mm} x {height_mm} mm"
        )));
    }

    let page_height = page_height_px(options);
    let starts = page_starts(root, page_height, options);
    log::debug!(
        "painting {} page(s), {:.1} px of content per page",
        starts.len(),
        page_height
    );

    let k = PT_PER_PX * options.fit_scale;
    let mut pages = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts
            .get(i + 1)
            .copied()
            .unwrap_or(f32::INFINITY)
            .min(start + page_height);
        let frame = PageFrame {
            page_height_pt: height_mm * PT_PER_MM,
            margin_left_pt: options.margin.left * PT_PER_MM,
            margin_top_pt: options.margin.top * PT_PER_MM,
            k,
            start,
            end,
        };
        let mut ops = Vec::new();
        paint_box(&mut ops, root, &frame);
        pages.push(PdfPage::new(Mm(width_mm), Mm(height_mm), ops));
    }

    let title = Path::new(&options.filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("resume");
    let mut doc = PdfDocument::new(title);
    doc.with_pages(pages);
    let save_options = PdfSaveOptions {
        optimize: options.page.compress,
        ..Default::default()
    };
    Ok(doc.save(&save_options, &mut Vec::new()))
}

fn rgb(c: CssColor) -> Color {
    Color::Rgb(Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
        icc_profile: None,
    })
}

fn point(x: Pt, y: Pt) -> LinePoint {
    LinePoint {
        p: Point { x, y },
        bezier: false,
    }
}

fn fill_rect(ops: &mut Vec<Op>, frame: &PageFrame, x: f32, top: f32, width: f32, bottom: f32, color: CssColor) {
    let (x1, x2) = (frame.x(x), frame.x(x + width));
    let (y1, y2) = (frame.y(bottom), frame.y(top));
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

fn stroke(ops: &mut Vec<Op>, points: Vec<LinePoint>, closed: bool, thickness: f32, color: CssColor) {
    ops.push(Op::SetOutlineColor { col: rgb(color) });
    ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
    ops.push(Op::DrawLine {
        line: Line {
            points,
            is_closed: closed,
        },
    });
}

fn paint_box(ops: &mut Vec<Op>, b: &PositionedBox, frame: &PageFrame) {
    if b.bottom() <= frame.start || b.y >= frame.end {
        return;
    }
    let s = &b.style;
    let top = b.y.max(frame.start);
    let bottom = b.bottom().min(frame.end);

    if !s.background_color.is_transparent() && bottom > top {
        fill_rect(ops, frame, b.x, top, b.width, bottom, s.background_color);
    }

    if s.border_width > 0.0 && bottom > top {
        let (x1, x2) = (frame.x(b.x), frame.x(b.x + b.width));
        let (y1, y2) = (frame.y(bottom), frame.y(top));
        stroke(
            ops,
            vec![point(x1, y2), point(x2, y2), point(x2, y1), point(x1, y1)],
            true,
            s.border_width * frame.k,
            s.border_color,
        );
    } else if s.border_bottom_width > 0.0 {
        let line_y = b.bottom() - s.border_bottom_width / 2.0;
        if frame.shows(line_y) {
            let y = frame.y(line_y);
            stroke(
                ops,
                vec![point(frame.x(b.x), y), point(frame.x(b.x + b.width), y)],
                false,
                s.border_bottom_width * frame.k,
                s.border_color,
            );
        }
    }

    paint_text(ops, b, frame);

    for child in &b.children {
        paint_box(ops, child, frame);
    }
}

fn paint_text(ops: &mut Vec<Op>, b: &PositionedBox, frame: &PageFrame) {
    let s = &b.style;
    let font = match (s.is_bold(), s.is_italic()) {
        (true, true) => BuiltinFont::HelveticaBoldOblique,
        (true, false) => BuiltinFont::HelveticaBold,
        (false, true) => BuiltinFont::HelveticaOblique,
        (false, false) => BuiltinFont::Helvetica,
    };
    let (content_x, content_y) = b.content_origin();
    let line_height = s.line_height_px();
    // Baseline ≈ half-leading + 0.8 × font size below the line top.
    let baseline = (line_height - s.font_size) / 2.0 + s.font_size * 0.8;

    if let Some(marker) = &b.marker {
        if frame.shows(content_y) {
            write_text(
                ops,
                frame,
                (content_x - s.font_size, content_y + baseline),
                marker,
                s.font_size,
                BuiltinFont::Helvetica,
                s.color,
            );
        }
    }

    for (i, line) in b.lines.iter().enumerate() {
        let line_top = content_y + i as f32 * line_height;
        if line.text.is_empty() || !frame.shows(line_top) {
            continue;
        }
        write_text(
            ops,
            frame,
            (content_x + line.x_offset, line_top + baseline),
            &line.text,
            s.font_size,
            font,
            s.color,
        );
    }
}

fn write_text(
    ops: &mut Vec<Op>,
    frame: &PageFrame,
    (x, baseline_y): (f32, f32),
    text: &str,
    font_size: f32,
    font: BuiltinFont,
    color: CssColor,
) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: frame.x(x),
            y: frame.y(baseline_y),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(font_size * frame.k),
        font,
    });
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winansi_text(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Replace characters the builtin fonts cannot show with `?`. printpdf
/// encodes the remaining text to WinAnsiEncoding when writing the stream.
fn to_winansi_text(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{00A0}' => ' ',
            '\u{20AC}' | '\u{2026}' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}'
            | '\u{2022}' | '\u{2013}' | '\u{2014}' | '\u{2122}' => c,
            c if (c as u32) < 256 => c,
            _ => '?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::TextMetrics;
    use crate::layout::layout_element;
    use crate::pagination::{compute_geometry, ContentSize, PageMode};
    use crate::pipeline::ExportConfig;
    use crate::style::{ComputedStyle, Stylesheet};

    fn boxed(y: f32, height: f32) -> PositionedBox {
        PositionedBox {
            x: 0.0,
            y,
            width: 100.0,
            height,
            style: ComputedStyle::default(),
            lines: Vec::new(),
            marker: None,
            legacy_break: false,
            children: Vec::new(),
        }
    }

    fn column(children: Vec<PositionedBox>) -> PositionedBox {
        let height = children.iter().map(PositionedBox::bottom).fold(0.0, f32::max);
        PositionedBox {
            children,
            ..boxed(0.0, height)
        }
    }

    fn options(mode: PageMode, height_px: f32) -> RasterOptions {
        let mut config = ExportConfig::default();
        config.page.mode = mode;
        let content = ContentSize {
            width_px: 600.0,
            height_px,
        };
        let geometry = compute_geometry(content, &config.page);
        config.raster_options("test.pdf", &geometry, content)
    }

    #[test]
    fn single_page_content_is_one_page() {
        let root = column(vec![boxed(0.0, 500.0), boxed(500.0, 700.0)]);
        let opts = options(PageMode::SinglePage, root.height);
        assert_eq!(page_starts(&root, page_height_px(&opts), &opts), vec![0.0]);
    }

    #[test]
    fn whole_boxes_move_to_next_page() {
        let root = column(vec![boxed(0.0, 60.0), boxed(60.0, 60.0), boxed(120.0, 60.0)]);
        let opts = options(PageMode::Fixed, root.height);
        assert_eq!(page_starts(&root, 100.0, &opts), vec![0.0, 60.0, 120.0]);
    }

    #[test]
    fn oversized_box_is_sliced() {
        let root = column(vec![boxed(0.0, 250.0)]);
        let opts = options(PageMode::Fixed, root.height);
        assert_eq!(page_starts(&root, 100.0, &opts), vec![0.0, 100.0, 200.0]);
    }

    #[test]
    fn css_and_legacy_breaks_force_pages() {
        let mut forced = boxed(20.0, 10.0);
        forced.style.break_before = true;
        let mut marker = boxed(40.0, 0.0);
        marker.legacy_break = true;
        let root = column(vec![boxed(0.0, 20.0), forced, boxed(30.0, 10.0), marker]);
        let mut opts = options(PageMode::Fixed, root.height);
        assert_eq!(page_starts(&root, 1000.0, &opts), vec![0.0, 20.0, 40.0]);

        opts.pagebreak = vec![PageBreakMode::AvoidAll];
        assert_eq!(page_starts(&root, 1000.0, &opts), vec![0.0]);
    }

    #[test]
    fn renders_laid_out_content() {
        let mut root = crate::dom::ElementNode::new("div");
        root.children = crate::dom::parse_html(
            "<h1>Ann Lee</h1><p style=\"background:#eee; border-bottom: 1px solid #999\">Résumé • 2020–2021</p><ul><li>one</li></ul>",
        );
        let laid_out = layout_element(
            &root,
            &ComputedStyle::default(),
            &Stylesheet::default(),
            &TextMetrics::heuristic(),
            700.0,
        )
        .unwrap();
        for mode in [PageMode::SinglePage, PageMode::Fixed] {
            let bytes = render_pdf(&laid_out, &options(mode, laid_out.height)).unwrap();
            assert!(bytes.len() > 100);
            assert_eq!(&bytes[0..5], b"%PDF-");
        }
    }

    #[test]
    fn planned_pages_include_moved_boxes() {
        use crate::raster::{StagingHost, StagingSurface};
        use crate::staging::OffscreenHost;

        let block = r#"<div style="height: 700px"></div>"#;
        let html = format!(r#"<div class="resume-container">{}</div>"#, block.repeat(3));
        let mut host = OffscreenHost::default();
        let mut doc = host.attach(&html, 210.0).unwrap();
        assert!(doc.focus("resume-container"));
        doc.settle().unwrap();

        let opts = options(PageMode::Fixed, doc.measure().height_px);
        let estimate = (doc.measure().height_px / page_height_px(&opts)).ceil() as usize;
        assert_eq!(estimate, 2);
        assert_eq!(PdfRasterizer.planned_pages(&doc, &opts), Some(3));
    }

    #[test]
    fn text_keeps_winansi_characters() {
        assert_eq!(to_winansi_text("José • 2020–2021"), "José • 2020–2021");
        assert_eq!(to_winansi_text("a\u{00A0}b"), "a b");
        assert_eq!(to_winansi_text("日本"), "??");
    }

    #[test]
    fn rejects_empty_page_format() {
        let mut opts = options(PageMode::Fixed, 10.0);
        opts.page.format = [0.0, 297.0];
        let err = render_pdf(&boxed(0.0, 10.0), &opts).unwrap_err();
        assert!(matches!(err, Error::Rasterization(_)));
    }

    #[test]
    fn page_height_accounts_for_margins_and_scale() {
        let mut opts = options(PageMode::Fixed, 10.0);
        opts.fit_scale = 0.5;
        let expected = (297.0 - 10.0) / PX_TO_MM / 0.5;
        assert!((page_height_px(&opts) - expected).abs() < 0.01);
    }
}

//! Pagination sizing – converts measured content into output page geometry.
//!
//! Two modes are supported:
//! - **Single page**: one page of standard width whose height grows with the
//!   content, so no entry is ever cut by a page boundary.
//! - **Fixed**: conventional A4 pages; content is scaled to the printable
//!   width and flows over as many pages as it needs.
//!
//! Everything here is pure arithmetic on millimetres and CSS pixels.

use serde::{Deserialize, Serialize};

/// Millimetres per CSS pixel (96 px per inch).
pub const PX_TO_MM: f32 = 0.264583;

pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// Default margin applied on every side of the page.
pub const DEFAULT_MARGIN_MM: f32 = 5.0;

/// Extra height added to a single dynamic page.
pub const PAGE_PADDING_MM: f32 = 10.0;

/// Content height never drops below this before padding is added.
pub const MIN_CONTENT_HEIGHT_MM: f32 = 1.0;

pub fn px_to_mm(px: f32) -> f32 {
    px * PX_TO_MM
}

pub fn mm_to_px(mm: f32) -> f32 {
    mm / PX_TO_MM
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageMode {
    /// One page, standard width, height fitted to the content.
    #[default]
    SinglePage,
    /// Standard A4 pages.
    Fixed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Per-side margins in millimetres. Serialized as `[top, right, bottom, left]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const fn uniform(mm: f32) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(DEFAULT_MARGIN_MM)
    }
}

impl From<[f32; 4]> for Margins {
    fn from([top, right, bottom, left]: [f32; 4]) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

impl From<Margins> for [f32; 4] {
    fn from(m: Margins) -> Self {
        [m.top, m.right, m.bottom, m.left]
    }
}

/// Natural size of the staged content, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContentSize {
    pub width_px: f32,
    pub height_px: f32,
}

/// Inputs to the geometry computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageSpec {
    pub mode: PageMode,
    pub orientation: Orientation,
    /// Page width for single-page mode (portrait width in fixed mode).
    pub page_width_mm: f32,
    /// Page height in fixed mode.
    pub page_height_mm: f32,
    pub margins: Margins,
    pub padding_mm: f32,
    pub min_content_height_mm: f32,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            mode: PageMode::SinglePage,
            orientation: Orientation::Portrait,
            page_width_mm: A4_WIDTH_MM,
            page_height_mm: A4_HEIGHT_MM,
            margins: Margins::default(),
            padding_mm: PAGE_PADDING_MM,
            min_content_height_mm: MIN_CONTENT_HEIGHT_MM,
        }
    }
}

/// Output page geometry. Derived per export, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub mode: PageMode,
    pub orientation: Orientation,
    pub width_mm: f32,
    pub height_mm: f32,
    pub margins: Margins,
    /// Factor applied to content so it fits the printable width (≤ 1).
    pub scale: f32,
    /// Pages the scaled content height needs. The rasterizer may emit more
    /// when it moves unbreakable boxes to the next page.
    pub page_count: usize,
}

impl PageGeometry {
    pub fn printable_width_mm(&self) -> f32 {
        self.width_mm - self.margins.horizontal()
    }

    pub fn printable_height_mm(&self) -> f32 {
        self.height_mm - self.margins.vertical()
    }
}

/// Compute the page geometry for content of the given size.
pub fn compute_geometry(content: ContentSize, spec: &PageSpec) -> PageGeometry {
    let content_width_mm = px_to_mm(content.width_px.max(0.0));
    let content_height_mm = px_to_mm(content.height_px.max(0.0));

    match spec.mode {
        PageMode::SinglePage => {
            let width_mm = spec.page_width_mm;
            let height_mm =
                content_height_mm.max(spec.min_content_height_mm) + spec.padding_mm;
            PageGeometry {
                mode: PageMode::SinglePage,
                orientation: Orientation::Portrait,
                width_mm,
                height_mm,
                margins: spec.margins,
                scale: fit_scale(content_width_mm, width_mm - spec.margins.horizontal()),
                page_count: 1,
            }
        }
        PageMode::Fixed => {
            let (width_mm, height_mm) = match spec.orientation {
                Orientation::Portrait => (spec.page_width_mm, spec.page_height_mm),
                Orientation::Landscape => (spec.page_height_mm, spec.page_width_mm),
            };
            let scale = fit_scale(content_width_mm, width_mm - spec.margins.horizontal());
            let printable_height = (height_mm - spec.margins.vertical()).max(f32::EPSILON);
            let pages = (content_height_mm * scale / printable_height).ceil() as usize;
            PageGeometry {
                mode: PageMode::Fixed,
                orientation: spec.orientation,
                width_mm,
                height_mm,
                margins: spec.margins,
                scale,
                page_count: pages.max(1),
            }
        }
    }
}

fn fit_scale(content_width_mm: f32, printable_width_mm: f32) -> f32 {
    if content_width_mm <= printable_width_mm || content_width_mm <= 0.0 {
        1.0
    } else {
        (printable_width_mm / content_width_mm).max(0.0)
    }
}

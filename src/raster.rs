//! PDF export adapter – stages rendered HTML, normalizes it for print,
//! measures it, computes page geometry and hands it to a rasterizer.
//!
//! The adapter owns only geometry and the staging lifecycle. Drawing and
//! encoding are delegated to a [`Rasterizer`]; hosting and measuring the
//! content is delegated to a [`StagingHost`] and its [`StagingSurface`].
//!
//! ## Staging lifecycle
//! 1. `attach` – create the container off-screen at the staging width
//! 2. `settle` – wait for layout
//! 3. hand the surface to the rasterizer
//! 4. `dispose` – always, including every failure after step 1

use std::ops::{Deref, DerefMut};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pagination::{compute_geometry, ContentSize, Margins, Orientation, PageGeometry};
use crate::pipeline::ExportConfig;

// ---------------------------------------------------------------------------
// Rasterizer options
// ---------------------------------------------------------------------------

/// How the rasterizer should treat page breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageBreakMode {
    /// Never split an element across pages if it can be avoided.
    AvoidAll,
    /// Honour `break-before` / `break-after` style declarations.
    Css,
    /// Honour explicit `html2pdf__page-break` marker elements.
    Legacy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    #[default]
    Jpeg,
    Png,
    Webp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageOptions {
    #[serde(rename = "type")]
    pub kind: ImageType,
    pub quality: f32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            kind: ImageType::Jpeg,
            quality: 0.98,
        }
    }
}

/// Page geometry as the rasterizer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFormat {
    pub unit: &'static str,
    /// `[width, height]` in `unit`.
    pub format: [f32; 2],
    pub orientation: Orientation,
    pub compress: bool,
}

/// Configuration record passed through to the rasterizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterOptions {
    /// Per-side margins in mm, `[top, right, bottom, left]`.
    pub margin: Margins,
    pub filename: String,
    pub image: ImageOptions,
    /// Render resolution multiplier.
    pub scale: f32,
    pub use_cors: bool,
    /// Width of the measured content, in CSS px.
    pub window_width: f32,
    /// Factor that fits the content into the printable width.
    pub fit_scale: f32,
    pub page: PageFormat,
    pub pagebreak: Vec<PageBreakMode>,
}

impl RasterOptions {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn breaks(&self, mode: PageBreakMode) -> bool {
        self.pagebreak.contains(&mode)
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// A staged, measurable rendering of a document.
pub trait StagingSurface {
    /// Block until layout reflects every change made so far.
    fn settle(&mut self) -> Result<()>;

    /// Select the first element carrying `class_name` as the content root.
    /// Returns `false` when no such element exists.
    fn focus(&mut self, class_name: &str) -> bool;

    /// Set a style property on the content root.
    fn set_root_style(&mut self, property: &str, value: &str);

    /// Set a style property on the content root and all of its descendants.
    fn set_style_all(&mut self, property: &str, value: &str);

    /// Natural size of the content root (scroll width / height).
    fn measure(&self) -> ContentSize;
}

/// Creates and disposes staging containers.
pub trait StagingHost {
    type Surface: StagingSurface;

    /// Create a container `width_mm` wide, attach it off-screen and load
    /// `html` into it.
    fn attach(&mut self, html: &str, width_mm: f32) -> Result<Self::Surface>;

    /// Detach the container and release everything it holds.
    fn dispose(&mut self, surface: &mut Self::Surface);
}

/// Turns a staged surface into PDF bytes.
pub trait Rasterizer<S: ?Sized> {
    fn rasterize(&mut self, surface: &S, options: &RasterOptions) -> Result<Vec<u8>>;

    /// Pages `rasterize` will emit, when the rasterizer can tell in advance.
    fn planned_pages(&self, _surface: &S, _options: &RasterOptions) -> Option<usize> {
        None
    }
}

/// Scope guard that disposes its surface on drop.
pub struct Staged<'h, H: StagingHost> {
    host: &'h mut H,
    surface: H::Surface,
}

impl<'h, H: StagingHost> Staged<'h, H> {
    pub fn attach(host: &'h mut H, html: &str, width_mm: f32) -> Result<Self> {
        let surface = host.attach(html, width_mm)?;
        log::debug!("staging container attached ({width_mm} mm wide)");
        Ok(Self { host, surface })
    }
}

impl<H: StagingHost> Deref for Staged<'_, H> {
    type Target = H::Surface;

    fn deref(&self) -> &Self::Target {
        &self.surface
    }
}

impl<H: StagingHost> DerefMut for Staged<'_, H> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.surface
    }
}

impl<H: StagingHost> Drop for Staged<'_, H> {
    fn drop(&mut self) {
        self.host.dispose(&mut self.surface);
        log::debug!("staging container disposed");
    }
}

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

/// Result of a successful export.
#[derive(Debug, Clone)]
pub struct Export {
    pub bytes: Vec<u8>,
    /// Pages actually emitted. Keeping boxes whole can push this above
    /// `geometry.page_count`, which is the count the content height alone
    /// would need.
    pub pages: usize,
    pub geometry: PageGeometry,
    pub options: RasterOptions,
}

/// Apply the print-time style overrides: strip decoration from the content
/// root and ask the rasterizer to avoid breaking inside any element.
pub fn normalize_for_print<S: StagingSurface + ?Sized>(surface: &mut S) {
    surface.set_root_style("box-shadow", "none");
    surface.set_root_style("border-radius", "0");
    surface.set_root_style("max-width", "none");
    surface.set_root_style("margin", "0");
    surface.set_style_all("break-inside", "avoid");
    surface.set_style_all("page-break-inside", "avoid");
}

pub struct PdfExporter<'a> {
    config: &'a ExportConfig,
}

impl<'a> PdfExporter<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Stage `html`, size the page and rasterize it.
    ///
    /// The staging container is disposed before this returns, whether the
    /// export succeeded or not.
    pub fn export<H, R>(
        &self,
        html: &str,
        filename: &str,
        host: &mut H,
        rasterizer: &mut R,
    ) -> Result<Export>
    where
        H: StagingHost,
        R: Rasterizer<H::Surface>,
    {
        let cfg = self.config;
        let mut staged = Staged::attach(host, html, cfg.staging_width_mm)?;

        if !cfg.settle_delay().is_zero() {
            thread::sleep(cfg.settle_delay());
        }
        staged.settle()?;

        if !staged.focus(&cfg.content_class) {
            return Err(Error::Rasterization(format!(
                "content container '.{}' not found",
                cfg.content_class
            )));
        }

        normalize_for_print(&mut *staged);
        staged.settle()?;

        let content = staged.measure();
        let geometry = compute_geometry(content, &cfg.page);
        let options = cfg.raster_options(filename, &geometry, content);
        let pages = rasterizer
            .planned_pages(&*staged, &options)
            .unwrap_or(geometry.page_count);
        log::info!(
            "rasterizing '{}': {:.1} x {:.1} mm, {} page(s)",
            filename,
            geometry.width_mm,
            geometry.height_mm,
            pages
        );
        log::debug!("rasterizer options: {}", options.to_json());

        let bytes = rasterizer
            .rasterize(&*staged, &options)
            .map_err(|e| match e {
                Error::Rasterization(_) => e,
                other => Error::Rasterization(other.to_string()),
            })?;

        Ok(Export {
            bytes,
            pages,
            geometry,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{PageMode, PX_TO_MM};

    #[derive(Default)]
    struct MockHost {
        live: usize,
        disposed: usize,
    }

    #[derive(Default)]
    struct MockSurface {
        has_root: bool,
        height_px: f32,
        settles: usize,
        root_styles: Vec<(String, String)>,
        all_styles: Vec<(String, String)>,
    }

    impl StagingSurface for MockSurface {
        fn settle(&mut self) -> Result<()> {
            self.settles += 1;
            Ok(())
        }
        fn focus(&mut self, class_name: &str) -> bool {
            self.has_root && class_name == "resume-container"
        }
        fn set_root_style(&mut self, property: &str, value: &str) {
            self.root_styles.push((property.into(), value.into()));
        }
        fn set_style_all(&mut self, property: &str, value: &str) {
            self.all_styles.push((property.into(), value.into()));
        }
        fn measure(&self) -> ContentSize {
            ContentSize {
                width_px: 700.0,
                height_px: self.height_px,
            }
        }
    }

    impl StagingHost for MockHost {
        type Surface = MockSurface;
        fn attach(&mut self, html: &str, _width_mm: f32) -> Result<MockSurface> {
            self.live += 1;
            Ok(MockSurface {
                has_root: html.contains("resume-container"),
                height_px: 1000.0,
                ..MockSurface::default()
            })
        }
        fn dispose(&mut self, _surface: &mut MockSurface) {
            self.live -= 1;
            self.disposed += 1;
        }
    }

    struct Recorder {
        seen: Option<RasterOptions>,
        normalized: bool,
    }

    impl Rasterizer<MockSurface> for Recorder {
        fn rasterize(&mut self, surface: &MockSurface, options: &RasterOptions) -> Result<Vec<u8>> {
            self.normalized = surface
                .all_styles
                .contains(&("break-inside".into(), "avoid".into()));
            self.seen = Some(options.clone());
            Ok(b"%PDF-mock".to_vec())
        }
    }

    struct Failing;

    impl Rasterizer<MockSurface> for Failing {
        fn rasterize(&mut self, _: &MockSurface, _: &RasterOptions) -> Result<Vec<u8>> {
            Err(Error::Io(std::io::Error::other("disk full")))
        }
    }

    const HTML: &str = "<div class=\"resume-container\">x</div>";

    #[test]
    fn export_sizes_single_page_and_disposes() {
        let config = ExportConfig::default();
        let mut host = MockHost::default();
        let mut rasterizer = Recorder {
            seen: None,
            normalized: false,
        };
        let export = PdfExporter::new(&config)
            .export(HTML, "ann.pdf", &mut host, &mut rasterizer)
            .unwrap();

        assert_eq!(export.bytes, b"%PDF-mock");
        assert!((export.geometry.height_mm - (1000.0 * PX_TO_MM + 10.0)).abs() < 1e-3);
        assert_eq!(host.live, 0);
        assert_eq!(host.disposed, 1);
        assert!(rasterizer.normalized);

        let options = rasterizer.seen.unwrap();
        assert_eq!(options.filename, "ann.pdf");
        assert_eq!(options.page.format, [210.0, export.geometry.height_mm]);
        assert_eq!(options.margin, Margins::uniform(5.0));
        assert_eq!(options.window_width, 700.0);
        assert!(options.breaks(PageBreakMode::AvoidAll));
    }

    #[test]
    fn rasterizer_failure_still_disposes() {
        let config = ExportConfig::default();
        let mut host = MockHost::default();
        let err = PdfExporter::new(&config)
            .export(HTML, "x.pdf", &mut host, &mut Failing)
            .unwrap_err();
        assert!(matches!(err, Error::Rasterization(ref m) if m.contains("disk full")));
        assert_eq!(host.live, 0);
        assert_eq!(host.disposed, 1);
    }

    #[test]
    fn missing_content_root_fails_after_cleanup() {
        let config = ExportConfig::default();
        let mut host = MockHost::default();
        let err = PdfExporter::new(&config)
            .export("<div>no root</div>", "x.pdf", &mut host, &mut Failing)
            .unwrap_err();
        assert!(matches!(err, Error::Rasterization(ref m) if m.contains("resume-container")));
        assert_eq!(host.live, 0);
    }

    #[test]
    fn normalization_targets_root_and_descendants() {
        let mut surface = MockSurface::default();
        normalize_for_print(&mut surface);
        let root: Vec<&str> = surface.root_styles.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(root, vec!["box-shadow", "border-radius", "max-width", "margin"]);
        assert_eq!(
            surface.all_styles,
            vec![
                ("break-inside".to_string(), "avoid".to_string()),
                ("page-break-inside".to_string(), "avoid".to_string()),
            ]
        );
    }

    #[test]
    fn fixed_mode_uses_a4_format() {
        let mut config = ExportConfig::default();
        config.page.mode = PageMode::Fixed;
        let mut host = MockHost::default();
        let mut rasterizer = Recorder {
            seen: None,
            normalized: false,
        };
        let export = PdfExporter::new(&config)
            .export(HTML, "x.pdf", &mut host, &mut rasterizer)
            .unwrap();
        assert_eq!(export.options.page.format, [210.0, 297.0]);
        assert_eq!(export.geometry.page_count, 1);
        assert_eq!(export.pages, 1);
    }

    #[test]
    fn options_json_uses_wire_names() {
        let config = ExportConfig::default();
        let geometry = compute_geometry(ContentSize::default(), &config.page);
        let json = config
            .raster_options("r.pdf", &geometry, ContentSize::default())
            .to_json();
        for key in ["\"useCors\"", "\"windowWidth\"", "\"avoid-all\"", "\"type\": \"jpeg\""] {
            assert!(json.contains(key), "{key} missing from {json}");
        }
    }
}

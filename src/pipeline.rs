//! Pipeline – export configuration and one-call HTML → PDF helpers that wire
//! the exporter to the built-in offscreen staging host and PDF rasterizer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fonts::TextMetrics;
use crate::pagination::{ContentSize, PageGeometry, PageSpec, A4_WIDTH_MM};
use crate::raster::{Export, ImageOptions, PageBreakMode, PageFormat, PdfExporter, RasterOptions};
use crate::render::PdfRasterizer;
use crate::staging::OffscreenHost;

/// Class of the element whose box is measured and printed.
pub const CONTENT_CLASS: &str = "resume-container";

/// Configuration for PDF export.
///
/// Every field has a default, so a JSON file only needs the keys it
/// overrides:
///
/// ```json
/// { "page": { "mode": "fixed" }, "settleDelayMs": 100 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    pub page: PageSpec,
    /// Width of the off-screen staging container.
    pub staging_width_mm: f32,
    /// Class of the content root inside the staged document.
    pub content_class: String,
    /// Pause after attaching, before the first layout pass.
    pub settle_delay_ms: u64,
    /// Render resolution multiplier handed to the rasterizer.
    pub render_scale: f32,
    pub image: ImageOptions,
    pub use_cors: bool,
    pub compress: bool,
    pub pagebreak: Vec<PageBreakMode>,
    /// Optional TTF used for staging text metrics.
    pub font_path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page: PageSpec::default(),
            staging_width_mm: A4_WIDTH_MM,
            content_class: CONTENT_CLASS.to_string(),
            settle_delay_ms: 0,
            render_scale: 2.0,
            image: ImageOptions::default(),
            use_cors: true,
            compress: true,
            pagebreak: vec![
                PageBreakMode::AvoidAll,
                PageBreakMode::Css,
                PageBreakMode::Legacy,
            ],
            font_path: None,
        }
    }
}

impl ExportConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::debug!("loaded export config from {}", path.display());
        Ok(config)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Rasterizer options for one export.
    pub fn raster_options(
        &self,
        filename: &str,
        geometry: &PageGeometry,
        content: ContentSize,
    ) -> RasterOptions {
        RasterOptions {
            margin: geometry.margins,
            filename: filename.to_string(),
            image: self.image,
            scale: self.render_scale,
            use_cors: self.use_cors,
            window_width: content.width_px,
            fit_scale: geometry.scale,
            page: PageFormat {
                unit: "mm",
                format: [geometry.width_mm, geometry.height_mm],
                orientation: geometry.orientation,
                compress: self.compress,
            },
            pagebreak: self.pagebreak.clone(),
        }
    }

    /// Text metrics for staging: the configured font, or the heuristic.
    pub fn text_metrics(&self) -> Result<TextMetrics> {
        match &self.font_path {
            Some(path) => TextMetrics::from_file(path).map_err(|e| match e {
                Error::Io(io) => Error::Rasterization(format!(
                    "cannot read font {}: {io}",
                    path.display()
                )),
                other => other,
            }),
            None => Ok(TextMetrics::heuristic()),
        }
    }
}

/// Full pipeline: rendered HTML → PDF, using the built-in staging host and
/// rasterizer.
pub fn export_pdf(html: &str, filename: &str, config: &ExportConfig) -> Result<Export> {
    let mut host = OffscreenHost::new(config.text_metrics()?);
    let mut rasterizer = PdfRasterizer;
    PdfExporter::new(config).export(html, filename, &mut host, &mut rasterizer)
}

/// Convenience: PDF bytes with the default configuration.
pub fn generate_pdf_from_html(html: &str) -> Result<Vec<u8>> {
    Ok(export_pdf(html, "resume.pdf", &ExportConfig::default())?.bytes)
}

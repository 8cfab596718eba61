//! # resume-forge – resume templates → HTML → PDF
//!
//! Populates `{{placeholder}}` HTML resume templates from a JSON resume
//! record and exports the result as a PDF. The stages are:
//!
//! 1. **Bind** – scalar fields ([`fields`]) and repeatable sections
//!    ([`sections`]) become placeholder bindings
//! 2. **Compose** – single-pass substitution into a template ([`composer`])
//! 3. **Stage** – the rendered HTML is parsed ([`dom`]), styled ([`style`])
//!    and laid out with Taffy ([`layout`]) in an offscreen container
//!    ([`staging`])
//! 4. **Size** – content is measured and a page geometry chosen
//!    ([`pagination`])
//! 5. **Rasterize** – boxes are cut into pages and drawn with printpdf
//!    ([`render`]), driven by the exporter in [`raster`]
//!
//! [`session::ResumeSession`] ties templates, data and output together.

pub mod composer;
pub mod dom;
pub mod error;
pub mod fields;
pub mod fonts;
pub mod layout;
pub mod pagination;
pub mod pipeline;
pub mod placeholder;
pub mod raster;
pub mod record;
pub mod render;
pub mod sections;
pub mod session;
pub mod staging;
pub mod style;
pub mod templates;

pub use composer::{render, render_with, RenderOptions, RenderedDocument, TemplateDocument};
pub use error::{Error, Result};
pub use fields::Escape;
pub use pagination::{compute_geometry, ContentSize, PageGeometry, PageMode, PageSpec};
pub use pipeline::{export_pdf, generate_pdf_from_html, ExportConfig};
pub use raster::{Export, PdfExporter, Rasterizer, StagingHost, StagingSurface};
pub use record::ResumeRecord;
pub use session::{generate_batch, ResumeSession};
pub use templates::{BuiltinTemplates, DirTemplates, TemplateSet, TemplateSource};

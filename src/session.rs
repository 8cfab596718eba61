//! Session – owns the loaded templates, the selected template and the
//! current resume data, and drives preview, PDF export, print and batch
//! generation.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::composer::{render_with, RenderOptions, RenderedDocument, TemplateDocument};
use crate::error::Result;
use crate::pipeline::{export_pdf, ExportConfig};
use crate::raster::Export;
use crate::record::ResumeRecord;
use crate::templates::{TemplateSet, TemplateSource, DEFAULT_TEMPLATE};

/// Pause between documents in [`generate_batch`].
pub const BATCH_DELAY: Duration = Duration::from_millis(1000);

/// Receives rendered HTML for display.
pub trait PreviewSink {
    fn inject(&mut self, html: &str) -> Result<()>;
}

/// Replaces the buffer contents.
impl PreviewSink for String {
    fn inject(&mut self, html: &str) -> Result<()> {
        self.clear();
        self.push_str(html);
        Ok(())
    }
}

/// Writes each preview to a file, overwriting the previous one.
#[derive(Debug, Clone)]
pub struct FilePreview {
    path: PathBuf,
}

impl FilePreview {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreviewSink for FilePreview {
    fn inject(&mut self, html: &str) -> Result<()> {
        fs::write(&self.path, html)?;
        log::debug!("preview written to {}", self.path.display());
        Ok(())
    }
}

/// Print fallback: somewhere to open a document for native printing.
pub trait PrintWindow {
    fn open(&mut self, html: &str) -> Result<()>;
}

/// Writes a standalone page that opens the print dialog once loaded.
#[derive(Debug, Clone)]
pub struct HtmlPrintPage {
    path: PathBuf,
}

const PRINT_SCRIPT: &str = "<script>window.onload = function () { window.print(); };</script>";

impl HtmlPrintPage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `html` with the print trigger inserted before `</body>`, or appended
    /// when there is no body end tag.
    pub fn printable(html: &str) -> String {
        match html.rfind("</body>") {
            Some(at) => format!("{}{}\n{}", &html[..at], PRINT_SCRIPT, &html[at..]),
            None => format!("{html}\n{PRINT_SCRIPT}\n"),
        }
    }
}

impl PrintWindow for HtmlPrintPage {
    fn open(&mut self, html: &str) -> Result<()> {
        fs::write(&self.path, Self::printable(html))?;
        log::info!("print page written to {}", self.path.display());
        Ok(())
    }
}

/// Rendering state for one caller.
#[derive(Debug, Clone)]
pub struct ResumeSession {
    templates: TemplateSet,
    current: String,
    data: Option<ResumeRecord>,
    render_options: RenderOptions,
    export_config: ExportConfig,
}

impl ResumeSession {
    /// Load every template from `source`. Fails without a session if any
    /// template cannot be fetched.
    pub fn init(source: &dyn TemplateSource) -> Result<Self> {
        Ok(Self::with_templates(TemplateSet::load(source)?))
    }

    /// Start from an already loaded set. The default template is selected
    /// when present, otherwise the first one.
    pub fn with_templates(templates: TemplateSet) -> Self {
        let current = if templates.contains(DEFAULT_TEMPLATE) {
            DEFAULT_TEMPLATE.to_string()
        } else {
            templates
                .names()
                .first()
                .map_or_else(|| DEFAULT_TEMPLATE.to_string(), |n| n.to_string())
        };
        Self {
            templates,
            current,
            data: None,
            render_options: RenderOptions::default(),
            export_config: ExportConfig::default(),
        }
    }

    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    pub fn with_export_config(mut self, config: ExportConfig) -> Self {
        self.export_config = config;
        self
    }

    pub fn export_config(&self) -> &ExportConfig {
        &self.export_config
    }

    pub fn set_resume_data(&mut self, data: ResumeRecord) {
        self.data = Some(data);
    }

    /// Replace the data from JSON text; a literal `null` clears it.
    pub fn set_resume_json(&mut self, json: &str) -> Result<()> {
        self.data = ResumeRecord::from_json_optional(json)?;
        Ok(())
    }

    pub fn clear_resume_data(&mut self) {
        self.data = None;
    }

    pub fn resume_data(&self) -> Option<&ResumeRecord> {
        self.data.as_ref()
    }

    /// Select a template by name. An unknown name is logged and leaves the
    /// current selection unchanged.
    pub fn set_template(&mut self, name: &str) -> bool {
        match self.templates.get(name) {
            Ok(_) => {
                log::debug!("template switched from {} to {name}", self.current);
                self.current = name.to_string();
                true
            }
            Err(e) => {
                log::error!("{e}; keeping {}", self.current);
                false
            }
        }
    }

    pub fn current_template(&self) -> &str {
        &self.current
    }

    pub fn available_templates(&self) -> Vec<&str> {
        self.templates.names()
    }

    /// Register a custom template, replacing any with the same name.
    pub fn add_template(&mut self, name: impl Into<String>, template: TemplateDocument) {
        let name = name.into();
        log::debug!("registering template {name}");
        self.templates.insert(name, template);
    }

    /// Render the current template with the current data.
    pub fn generate_html(&self) -> Result<RenderedDocument> {
        self.render_record(self.data.as_ref())
    }

    fn render_record(&self, data: Option<&ResumeRecord>) -> Result<RenderedDocument> {
        let template = self.templates.get(&self.current)?;
        let rendered = render_with(template, data, &self.render_options)?;
        let residual = rendered.residual_placeholders();
        if !residual.is_empty() {
            log::warn!(
                "{} left unfilled in {}: {}",
                residual.len(),
                self.current,
                residual.join(", ")
            );
        }
        Ok(rendered)
    }

    pub fn preview(&self, sink: &mut impl PreviewSink) -> Result<()> {
        sink.inject(self.generate_html()?.as_str())
    }

    /// Export the current document without writing it anywhere.
    pub fn export(&self, filename: &str) -> Result<Export> {
        let html = self.generate_html()?;
        export_pdf(html.as_str(), filename, &self.export_config)
    }

    /// Export the current document to `path`.
    pub fn generate_pdf(&self, path: &Path) -> Result<Export> {
        let html = self.generate_html()?;
        write_pdf(html.as_str(), path, &self.export_config)
    }

    pub fn print(&self, window: &mut impl PrintWindow) -> Result<()> {
        window.open(self.generate_html()?.as_str())
    }
}

fn write_pdf(html: &str, path: &Path, config: &ExportConfig) -> Result<Export> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("resume.pdf");
    let export = export_pdf(html, filename, config)?;
    fs::write(path, &export.bytes)?;
    log::info!(
        "wrote {} ({} bytes, {} page(s))",
        path.display(),
        export.bytes.len(),
        export.pages
    );
    Ok(export)
}

/// Render and export each record with the session's current template into
/// `out_dir`, as `<name>-resume.pdf`, pausing `delay` between documents.
///
/// Stops at the first failure; files already written are kept.
pub fn generate_batch(
    session: &ResumeSession,
    records: &[ResumeRecord],
    out_dir: &Path,
    delay: Duration,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        let path = out_dir.join(record.pdf_file_name());
        let html = session.render_record(Some(record))?;
        write_pdf(html.as_str(), &path, &session.export_config).map_err(|e| {
            log::error!("batch stopped at {} of {}: {e}", i + 1, records.len());
            e
        })?;
        written.push(path);
    }
    log::info!("batch wrote {} file(s) to {}", written.len(), out_dir.display());
    Ok(written)
}

impl From<TemplateSet> for ResumeSession {
    fn from(templates: TemplateSet) -> Self {
        Self::with_templates(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fields::Escape;
    use crate::templates::BuiltinTemplates;

    fn ann_lee() -> ResumeRecord {
        ResumeRecord::from_json(
            r#"{
                "personalInfo": {"name": "Ann Lee", "email": "ann@example.com"},
                "summary": "Builds reliable systems.",
                "experience": [{"title": "Eng", "company": "Acme",
                                "date": "2020-2021", "description": "Built things"}]
            }"#,
        )
        .unwrap()
    }

    fn custom_session() -> ResumeSession {
        let mut set = TemplateSet::default();
        set.insert("plain", TemplateDocument::from(
            r#"<div class="resume-container"><h1>{{name}}</h1>{{experience}}</div>"#,
        ));
        ResumeSession::with_templates(set)
    }

    #[test]
    fn init_selects_default_template() {
        let session = ResumeSession::init(&BuiltinTemplates).unwrap();
        assert_eq!(session.current_template(), "template1");
        assert_eq!(session.available_templates(), vec!["template1", "template2"]);
    }

    #[test]
    fn first_template_selected_without_default() {
        assert_eq!(custom_session().current_template(), "plain");
    }

    #[test]
    fn unknown_template_keeps_current() {
        let mut session = ResumeSession::init(&BuiltinTemplates).unwrap();
        assert!(session.set_template("template2"));
        assert!(!session.set_template("fancy"));
        assert_eq!(session.current_template(), "template2");
    }

    #[test]
    fn render_without_data_fails() {
        let mut session = ResumeSession::init(&BuiltinTemplates).unwrap();
        assert!(matches!(session.generate_html(), Err(Error::MissingData)));
        session.set_resume_data(ann_lee());
        assert!(session.generate_html().is_ok());
        session.set_resume_json("null").unwrap();
        assert!(matches!(session.generate_html(), Err(Error::MissingData)));
    }

    #[test]
    fn preview_replaces_buffer() {
        let mut session = custom_session();
        session.set_resume_data(ann_lee());
        let mut buffer = String::from("stale");
        session.preview(&mut buffer).unwrap();
        assert!(buffer.starts_with("<div class=\"resume-container\"><h1>Ann Lee</h1>"));
        assert!(buffer.contains("Built things"));
        assert!(!buffer.contains("stale"));
    }

    #[test]
    fn escaping_follows_render_options() {
        let mut session = custom_session().with_render_options(RenderOptions {
            escape: Escape::Html,
        });
        session.set_resume_json(r#"{"personalInfo": {"name": "A <b> & C"}}"#).unwrap();
        let html = session.generate_html().unwrap();
        assert!(html.as_str().contains("<h1>A &lt;b&gt; &amp; C</h1>"));
    }

    #[test]
    fn added_template_can_be_selected() {
        let mut session = ResumeSession::init(&BuiltinTemplates).unwrap();
        session.add_template("mini", TemplateDocument::from("<p>{{title}}</p>"));
        assert!(session.set_template("mini"));
        session.set_resume_json(r#"{"personalInfo": {"title": "Engineer"}}"#).unwrap();
        assert_eq!(session.generate_html().unwrap().as_str(), "<p>Engineer</p>");
    }

    #[test]
    fn file_preview_and_print_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ResumeSession::init(&BuiltinTemplates).unwrap();
        session.set_resume_data(ann_lee());

        let mut preview = FilePreview::new(dir.path().join("preview.html"));
        session.preview(&mut preview).unwrap();
        let written = fs::read_to_string(preview.path()).unwrap();
        assert!(written.contains("Ann Lee"));

        let mut page = HtmlPrintPage::new(dir.path().join("print.html"));
        session.print(&mut page).unwrap();
        let printable = fs::read_to_string(page.path()).unwrap();
        let script = printable.find("window.print()").unwrap();
        assert!(script < printable.rfind("</body>").unwrap());
    }

    #[test]
    fn print_script_appended_to_fragments() {
        let page = HtmlPrintPage::printable("<p>hi</p>");
        assert!(page.starts_with("<p>hi</p>\n<script>"));
    }

    #[test]
    fn generate_pdf_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = custom_session();
        session.set_resume_data(ann_lee());
        let path = dir.path().join("ann.pdf");
        let export = session.generate_pdf(&path).unwrap();
        assert_eq!(export.options.filename, "ann.pdf");
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..5], b"%PDF-");
        assert_eq!(bytes, export.bytes);
    }

    #[test]
    fn batch_names_files_after_people() {
        let dir = tempfile::tempdir().unwrap();
        let session = custom_session();
        let mut bob = ann_lee();
        bob.personal_info.name = "Bob  van Dyke".into();
        let paths = generate_batch(
            &session,
            &[ann_lee(), bob],
            dir.path(),
            Duration::ZERO,
        )
        .unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Ann-Lee-resume.pdf", "Bob-van-Dyke-resume.pdf"]);
        assert!(paths.iter().all(|p| p.exists()));
    }

    #[test]
    fn batch_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = TemplateSet::default();
        set.insert("bare", TemplateDocument::from("<p>{{name}}</p>"));
        let session = ResumeSession::from(set);
        let err = generate_batch(&session, &[ann_lee()], dir.path(), Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, Error::Rasterization(_)));
        assert!(!dir.path().join("Ann-Lee-resume.pdf").exists());
    }
}

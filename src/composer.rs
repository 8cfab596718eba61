//! Template composer – turns a template plus a resume record into HTML.
//!
//! Bindings are gathered in a fixed order (scalars, professional links,
//! experience, projects, education, skills, languages, certifications,
//! achievements, volunteer) and then substituted in a single pass.

use std::fmt;

use crate::error::{Error, Result};
use crate::fields::{bind_scalars, Escape};
use crate::placeholder::{placeholder_names, substitute, Bindings};
use crate::record::ResumeRecord;
use crate::sections::bind_sections;

/// An immutable template body containing `{{name}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    body: String,
}

impl TemplateDocument {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    /// Placeholder names referenced by the template, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        placeholder_names(&self.body)
    }
}

impl From<&str> for TemplateDocument {
    fn from(body: &str) -> Self {
        Self::new(body)
    }
}

impl From<String> for TemplateDocument {
    fn from(body: String) -> Self {
        Self::new(body)
    }
}

/// The HTML produced by one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    html: String,
}

impl RenderedDocument {
    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }

    /// Placeholders still present after rendering (unknown names, or
    /// sections whose data was empty).
    pub fn residual_placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in placeholder_names(&self.html) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

impl fmt::Display for RenderedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html)
    }
}

/// Per-render options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub escape: Escape,
}

/// Render `template` with `data` using default options.
pub fn render(template: &TemplateDocument, data: Option<&ResumeRecord>) -> Result<RenderedDocument> {
    render_with(template, data, &RenderOptions::default())
}

/// Render `template` with `data`.
///
/// Fails only when `data` is `None`; every missing substructure of the record
/// degrades to its default.
pub fn render_with(
    template: &TemplateDocument,
    data: Option<&ResumeRecord>,
    options: &RenderOptions,
) -> Result<RenderedDocument> {
    let record = data.ok_or(Error::MissingData)?;
    let bindings = collect_bindings(record, options.escape);
    log::debug!("rendering template with {} bindings", bindings.len());
    Ok(RenderedDocument {
        html: substitute(template.as_str(), &bindings),
    })
}

/// Gather every binding for `record` in composition order.
pub fn collect_bindings(record: &ResumeRecord, escape: Escape) -> Bindings {
    let mut bindings = Bindings::new();
    bind_scalars(record, escape, &mut bindings);
    bind_sections(record, escape, &mut bindings);
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Experience;

    fn ann_lee() -> ResumeRecord {
        ResumeRecord::from_json(
            r#"{
                "personalInfo": {"name": "Ann Lee"},
                "experience": [{"title": "Eng", "company": "Acme",
                                "date": "2020-2021", "description": "Built things"}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn missing_data_is_an_error() {
        let tpl = TemplateDocument::from("{{name}}");
        assert!(matches!(render(&tpl, None), Err(Error::MissingData)));
    }

    #[test]
    fn end_to_end_single_experience() {
        let tpl = TemplateDocument::from("<h1>{{name}}</h1><section>{{experience}}</section>");
        let out = render(&tpl, Some(&ann_lee())).unwrap();
        let html = out.as_str();
        assert_eq!(html.matches("Ann Lee").count(), 1);
        assert_eq!(html.matches("experience-item").count(), 1);
        for text in ["Eng", "Acme", "2020-2021", "Built things"] {
            assert!(html.contains(text), "missing {text}");
        }
        assert!(out.residual_placeholders().is_empty());
    }

    #[test]
    fn empty_section_placeholder_survives() {
        let tpl = TemplateDocument::from("<ul>{{languages}}</ul>{{experience}}");
        let mut record = ann_lee();
        record.experience.clear();
        let out = render(&tpl, Some(&record)).unwrap();
        assert_eq!(out.as_str(), "<ul>{{languages}}</ul>{{experience}}");
        assert_eq!(out.residual_placeholders(), vec!["languages", "experience"]);
    }

    #[test]
    fn rendering_is_idempotent() {
        let tpl = TemplateDocument::from("{{name}} {{experience}} {{unknown}}");
        let record = ann_lee();
        let first = render(&tpl, Some(&record)).unwrap();
        let second = render(&tpl, Some(&record)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn data_values_cannot_inject_placeholders() {
        let tpl = TemplateDocument::from("{{experience}}|{{email}}");
        let mut record = ResumeRecord::default();
        record.personal_info.email = "ann@example.com".into();
        record.experience.push(Experience {
            title: "{{email}}".into(),
            ..Experience::default()
        });
        let out = render(&tpl, Some(&record)).unwrap();
        assert!(out.as_str().contains("{{email}}</h3>"));
        assert!(out.as_str().ends_with("|ann@example.com"));
    }

    #[test]
    fn escaping_is_opt_in() {
        let tpl = TemplateDocument::from("{{name}}");
        let mut record = ResumeRecord::default();
        record.personal_info.name = "<script>".into();
        let raw = render(&tpl, Some(&record)).unwrap();
        assert_eq!(raw.as_str(), "<script>");
        let options = RenderOptions {
            escape: Escape::Html,
        };
        let escaped = render_with(&tpl, Some(&record), &options).unwrap();
        assert_eq!(escaped.as_str(), "&lt;script&gt;");
    }

    #[test]
    fn template_lists_its_placeholders() {
        let tpl = TemplateDocument::from("{{name}}<p>{{summary}}</p>");
        assert_eq!(tpl.placeholders(), vec!["name", "summary"]);
    }
}

//! Resume templates – the two bundled layouts, the [`TemplateSource`]
//! seam, a directory-backed source and the loaded [`TemplateSet`].
//!
//! Both bundled templates wrap their content in `.resume-container` and use
//! class-based `<style>` rules only, so they render the same in a browser
//! and through the offscreen staging layout.

use std::fs;
use std::path::{Path, PathBuf};

use crate::composer::TemplateDocument;
use crate::error::{Error, Result};

/// Name of the template selected when nothing else is asked for.
pub const DEFAULT_TEMPLATE: &str = "template1";

/// Where named templates come from.
pub trait TemplateSource {
    /// Template names this source can provide, in display order.
    fn names(&self) -> Vec<String>;

    /// Retrieve the template body called `name`.
    fn fetch(&self, name: &str) -> Result<String>;
}

/// The templates compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateSource for BuiltinTemplates {
    fn names(&self) -> Vec<String> {
        vec!["template1".to_string(), "template2".to_string()]
    }

    fn fetch(&self, name: &str) -> Result<String> {
        match name {
            "template1" => Ok(sidebar_template().to_string()),
            "template2" => Ok(two_column_template().to_string()),
            other => Err(Error::TemplateNotFound(other.to_string())),
        }
    }
}

/// Templates stored as `<dir>/<name>.html`.
#[derive(Debug, Clone)]
pub struct DirTemplates {
    dir: PathBuf,
    names: Vec<String>,
}

impl DirTemplates {
    pub fn new<I, S>(dir: impl Into<PathBuf>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dir: dir.into(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Every `*.html` file in `dir`, sorted by name.
    pub fn scan(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        log::debug!("found {} template(s) in {}", names.len(), dir.display());
        Ok(Self { dir, names })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.html"))
    }
}

impl TemplateSource for DirTemplates {
    fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn fetch(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.path_of(name))?)
    }
}

/// Named templates loaded from a source, in source order.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<(String, TemplateDocument)>,
}

impl TemplateSet {
    /// Fetch every template `source` names. Any failure fails the whole load;
    /// no partial set is returned.
    pub fn load(source: &dyn TemplateSource) -> Result<Self> {
        let mut set = Self::default();
        for name in source.names() {
            let body = source.fetch(&name).map_err(|e| Error::TemplateLoad {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            set.insert(name, TemplateDocument::new(body));
        }
        log::info!("loaded {} template(s): {}", set.len(), set.names().join(", "));
        Ok(set)
    }

    /// The bundled templates.
    pub fn builtin() -> Self {
        let mut set = Self::default();
        set.insert("template1", TemplateDocument::new(sidebar_template()));
        set.insert("template2", TemplateDocument::new(two_column_template()));
        set
    }

    pub fn get(&self, name: &str) -> Result<&TemplateDocument> {
        self.templates
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, doc)| doc)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.iter().any(|(n, _)| n == name)
    }

    /// Add a template, replacing any existing one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, template: TemplateDocument) {
        let name = name.into();
        match self.templates.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = template,
            None => self.templates.push((name, template)),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Bundled templates
// ---------------------------------------------------------------------------

/// Sidebar layout: contact details, links, grouped skills and languages in a
/// dark left column; everything else in the main column.
pub fn sidebar_template() -> &'static str {
    r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{{name}} - Resume</title>
<style>
  body { margin: 0; font-family: Helvetica, Arial, sans-serif; color: #333333; background-color: #f0f2f5; }
  .resume-container { display: flex; max-width: 900px; margin: 20px auto; background-color: #ffffff; box-shadow: 0 2px 12px rgba(0, 0, 0, 0.15); border-radius: 6px; }
  .sidebar { width: 250px; flex-shrink: 0; padding: 32px 22px; background-color: #2c3e50; color: #ecf0f1; font-size: 13px; }
  .avatar { width: 72px; height: 72px; margin-bottom: 16px; background-color: #3498db; color: #ffffff; font-size: 28px; font-weight: bold; text-align: center; line-height: 2.57; }
  .name { margin: 0 0 4px 0; font-size: 24px; color: #ffffff; }
  .headline { margin: 0 0 20px 0; font-size: 14px; color: #bdc3c7; }
  .sidebar-title { margin: 22px 0 8px 0; padding-bottom: 4px; font-size: 13px; color: #ffffff; border-bottom: 1px solid #3498db; }
  .contact-line { margin: 0 0 4px 0; }
  .link-item { display: flex; gap: 6px; margin-bottom: 4px; }
  .skill-group { margin-bottom: 10px; }
  .skill-group-title { margin: 0 0 4px 0; font-size: 13px; color: #3498db; }
  .skill-list { margin: 0; padding-left: 16px; }
  .skill-item { margin-bottom: 2px; }
  .language-list { margin: 0; padding: 0; list-style: none; }
  .language-item { display: flex; justify-content: space-between; margin-bottom: 4px; }
  .proficiency { color: #bdc3c7; }
  .main { flex: 1; padding: 32px 30px; font-size: 14px; }
  .section { margin-bottom: 18px; }
  .section-title { margin: 0 0 10px 0; padding-bottom: 4px; font-size: 17px; color: #2c3e50; border-bottom: 2px solid #3498db; }
  .summary { margin: 0; line-height: 1.5; }
  .entry-header { display: flex; justify-content: space-between; align-items: baseline; gap: 12px; }
  .entry-title { margin: 0; font-size: 15px; color: #2c3e50; }
  .entry-date { font-size: 12px; color: #7f8c8d; }
  .entry-company { margin: 2px 0 0 0; font-style: italic; color: #555555; }
  .entry-description { margin: 4px 0 0 0; line-height: 1.45; }
  .experience-item { margin-bottom: 14px; }
  .project-item { margin-bottom: 14px; }
  .education-item { margin-bottom: 12px; }
  .volunteer-item { margin-bottom: 12px; }
  .project-tech { display: flex; flex-wrap: wrap; gap: 4px; margin-top: 4px; }
  .tech-tag { padding: 1px 6px; font-size: 11px; background-color: #eaf2f8; color: #2c3e50; }
  .project-links { display: flex; gap: 10px; margin-top: 4px; font-size: 12px; }
  .project-link { color: #3498db; }
  .cert-list { margin: 0; padding: 0; list-style: none; }
  .certification-item { margin-bottom: 8px; }
  .cert-name { font-weight: bold; }
  .cert-issuer { font-size: 12px; color: #7f8c8d; }
  .achievement-card { margin-bottom: 10px; padding: 8px 10px; background-color: #f7f9fb; border-bottom: 1px solid #dfe6ec; }
  .achievement-title { margin: 0; font-size: 14px; }
  .achievement-desc { margin: 2px 0 0 0; }
  .volunteer-role { margin: 0; font-size: 15px; color: #2c3e50; }
  .volunteer-org { margin: 2px 0 0 0; font-style: italic; color: #555555; }
</style>
</head>
<body>
<div class="resume-container">
  <aside class="sidebar">
    <div class="avatar">{{initials}}</div>
    <h1 class="name">{{name}}</h1>
    <p class="headline">{{title}}</p>

    <h2 class="sidebar-title">Contact</h2>
    <p class="contact-line">{{email}}</p>
    <p class="contact-line">{{phone}}</p>
    <p class="contact-line">{{location}}</p>
    <p class="contact-line">{{website}}</p>

    <h2 class="sidebar-title">Links</h2>
    <div class="links">{{professionalLinks}}</div>

    <h2 class="sidebar-title">Skills</h2>
    <div class="skills">{{skillsGrouped}}</div>

    <h2 class="sidebar-title">Languages</h2>
    <ul class="language-list">{{languages}}</ul>
  </aside>

  <main class="main">
    <section class="section">
      <h2 class="section-title">Profile</h2>
      <p class="summary">{{summary}}</p>
    </section>
    <section class="section">
      <h2 class="section-title">Experience</h2>
      {{experience}}
    </section>
    <section class="section">
      <h2 class="section-title">Projects</h2>
      {{projects}}
    </section>
    <section class="section">
      <h2 class="section-title">Education</h2>
      {{education}}
    </section>
    <section class="section">
      <h2 class="section-title">Certifications</h2>
      <ul class="cert-list">{{certifications}}</ul>
    </section>
    <section class="section">
      <h2 class="section-title">Achievements</h2>
      {{achievements}}
    </section>
    <section class="section">
      <h2 class="section-title">Volunteer</h2>
      {{volunteer}}
    </section>
  </main>
</div>
</body>
</html>
"##
}

/// Two-column layout: a centered header band, experience and projects on
/// the left, flat skills and the shorter sections on the right.
pub fn two_column_template() -> &'static str {
    r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{{name}} - Resume</title>
<style>
  body { margin: 0; font-family: Georgia, serif; color: #222222; background-color: #eeeeee; }
  .resume-container { max-width: 850px; margin: 24px auto; padding: 36px 40px; background-color: #ffffff; box-shadow: 0 0 8px rgba(0, 0, 0, 0.2); font-size: 14px; }
  .header { padding-bottom: 14px; margin-bottom: 18px; text-align: center; border-bottom: 3px solid #8e44ad; }
  .monogram { margin: 0 0 6px 0; font-size: 13px; font-weight: bold; color: #8e44ad; }
  .name { margin: 0; font-size: 30px; color: #4a235a; }
  .headline { margin: 4px 0 10px 0; font-size: 16px; color: #8e44ad; }
  .contact { display: flex; justify-content: center; flex-wrap: wrap; gap: 14px; font-size: 12px; color: #555555; }
  .links { display: flex; justify-content: center; flex-wrap: wrap; gap: 14px; margin-top: 6px; font-size: 12px; }
  .link-item { display: flex; gap: 4px; }
  .summary { margin: 0 0 18px 0; line-height: 1.5; }
  .columns { display: flex; gap: 28px; }
  .column-main { flex: 2; }
  .column-side { flex: 1; }
  .section { margin-bottom: 18px; }
  .section-title { margin: 0 0 8px 0; padding-bottom: 3px; font-size: 15px; color: #4a235a; border-bottom: 1px solid #d2b4de; }
  .entry-header { display: flex; justify-content: space-between; align-items: baseline; gap: 10px; }
  .entry-title { margin: 0; font-size: 15px; }
  .entry-date { font-size: 12px; color: #888888; }
  .entry-company { margin: 2px 0 0 0; color: #8e44ad; }
  .entry-description { margin: 4px 0 0 0; line-height: 1.45; }
  .experience-item { margin-bottom: 14px; }
  .project-item { margin-bottom: 14px; }
  .education-item { margin-bottom: 10px; }
  .volunteer-item { margin-bottom: 10px; }
  .project-tech { display: flex; flex-wrap: wrap; gap: 4px; margin-top: 4px; }
  .tech-tag { padding: 1px 5px; font-size: 11px; border: 1px solid #d2b4de; color: #4a235a; }
  .project-links { display: flex; gap: 10px; margin-top: 4px; font-size: 12px; }
  .project-link { color: #8e44ad; }
  .skill-list { margin: 0; padding-left: 16px; }
  .skill-item { margin-bottom: 3px; }
  .plain-list { margin: 0; padding: 0; list-style: none; }
  .language-item { display: flex; justify-content: space-between; margin-bottom: 4px; }
  .proficiency { color: #888888; }
  .certification-item { margin-bottom: 8px; }
  .cert-name { font-weight: bold; }
  .cert-issuer { font-size: 12px; color: #888888; }
  .achievement-card { margin-bottom: 8px; }
  .achievement-title { margin: 0; font-size: 14px; }
  .achievement-desc { margin: 2px 0 0 0; }
  .volunteer-role { margin: 0; font-size: 14px; }
  .volunteer-org { margin: 2px 0 0 0; color: #8e44ad; }
</style>
</head>
<body>
<div class="resume-container">
  <header class="header">
    <div class="monogram">{{initials}}</div>
    <h1 class="name">{{name}}</h1>
    <p class="headline">{{title}}</p>
    <div class="contact">
      <span>{{email}}</span>
      <span>{{phone}}</span>
      <span>{{location}}</span>
      <span>{{website}}</span>
    </div>
    <div class="links">{{professionalLinks}}</div>
  </header>

  <p class="summary">{{summary}}</p>

  <div class="columns">
    <div class="column-main">
      <section class="section">
        <h2 class="section-title">Experience</h2>
        {{experience}}
      </section>
      <section class="section">
        <h2 class="section-title">Projects</h2>
        {{projects}}
      </section>
      <section class="section">
        <h2 class="section-title">Volunteer</h2>
        {{volunteer}}
      </section>
    </div>
    <div class="column-side">
      <section class="section">
        <h2 class="section-title">Skills</h2>
        <ul class="skill-list">{{skillsFlat}}</ul>
      </section>
      <section class="section">
        <h2 class="section-title">Education</h2>
        {{education}}
      </section>
      <section class="section">
        <h2 class="section-title">Languages</h2>
        <ul class="plain-list">{{languages}}</ul>
      </section>
      <section class="section">
        <h2 class="section-title">Certifications</h2>
        <ul class="plain-list">{{certifications}}</ul>
      </section>
      <section class="section">
        <h2 class="section-title">Achievements</h2>
        {{achievements}}
      </section>
    </div>
  </div>
</div>
</body>
</html>
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::SCALAR_FIELDS;
    use crate::sections::SECTION_PLACEHOLDERS;

    struct FlakySource;

    impl TemplateSource for FlakySource {
        fn names(&self) -> Vec<String> {
            vec!["ok".into(), "broken".into()]
        }
        fn fetch(&self, name: &str) -> Result<String> {
            match name {
                "ok" => Ok("<p>{{name}}</p>".into()),
                _ => Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "gone",
                ))),
            }
        }
    }

    #[test]
    fn builtin_templates_cover_every_placeholder() {
        for (name, skills, other) in [
            ("template1", "skillsGrouped", "skillsFlat"),
            ("template2", "skillsFlat", "skillsGrouped"),
        ] {
            let body = BuiltinTemplates.fetch(name).unwrap();
            let doc = TemplateDocument::new(body);
            let used = doc.placeholders();
            assert!(doc.as_str().contains("class=\"resume-container\""));
            for field in SCALAR_FIELDS {
                assert!(used.contains(&field), "{name} lacks {{{{{field}}}}}");
            }
            for section in SECTION_PLACEHOLDERS {
                if section == other {
                    assert!(!used.contains(&section), "{name} uses {section}");
                } else {
                    assert!(used.contains(&section), "{name} lacks {section}");
                }
            }
            assert!(used.contains(&skills));
        }
    }

    #[test]
    fn builtin_set_matches_builtin_source() {
        let loaded = TemplateSet::load(&BuiltinTemplates).unwrap();
        let builtin = TemplateSet::builtin();
        assert_eq!(loaded.names(), vec!["template1", "template2"]);
        assert_eq!(loaded.names(), builtin.names());
        assert_eq!(
            loaded.get("template2").unwrap(),
            builtin.get("template2").unwrap()
        );
    }

    #[test]
    fn load_is_all_or_nothing() {
        let err = TemplateSet::load(&FlakySource).unwrap_err();
        match err {
            Error::TemplateLoad { name, reason } => {
                assert_eq!(name, "broken");
                assert!(reason.contains("gone"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_template_is_not_found() {
        let set = TemplateSet::builtin();
        assert!(matches!(set.get("template9"), Err(Error::TemplateNotFound(n)) if n == "template9"));
        assert!(matches!(
            BuiltinTemplates.fetch("template9"),
            Err(Error::TemplateNotFound(_))
        ));
    }

    #[test]
    fn insert_replaces_by_name() {
        let mut set = TemplateSet::builtin();
        set.insert("template1", TemplateDocument::from("{{name}}"));
        set.insert("custom", TemplateDocument::from("{{title}}"));
        assert_eq!(set.names(), vec!["template1", "template2", "custom"]);
        assert_eq!(set.get("template1").unwrap().as_str(), "{{name}}");
    }

    #[test]
    fn directory_source_reads_html_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("modern.html"), "<h1>{{name}}</h1>").unwrap();
        fs::write(dir.path().join("classic.html"), "<h2>{{name}}</h2>").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let source = DirTemplates::scan(dir.path()).unwrap();
        assert_eq!(source.names(), vec!["classic", "modern"]);
        let set = TemplateSet::load(&source).unwrap();
        assert_eq!(set.get("modern").unwrap().as_str(), "<h1>{{name}}</h1>");

        let missing = DirTemplates::new(dir.path(), ["modern", "absent"]);
        assert!(matches!(
            TemplateSet::load(&missing),
            Err(Error::TemplateLoad { name, .. }) if name == "absent"
        ));
    }
}

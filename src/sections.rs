//! Section renderer – expands each repeatable resume section into HTML
//! fragments and binds the concatenation to the section's placeholder.
//!
//! An empty section produces no binding, so its placeholder survives in the
//! rendered document. Templates should only reference sections they intend
//! to populate.

use std::fmt::Write as _;

use crate::fields::Escape;
use crate::placeholder::Bindings;
use crate::record::{
    Achievement, Certification, Education, Experience, Language, ProfessionalLink, Project,
    ResumeRecord, SkillGroup, Skills, Volunteer,
};

/// Placeholder names of the repeatable sections, in composition order.
pub const SECTION_PLACEHOLDERS: [&str; 10] = [
    "professionalLinks",
    "experience",
    "projects",
    "education",
    "skillsGrouped",
    "skillsFlat",
    "languages",
    "certifications",
    "achievements",
    "volunteer",
];

/// Separator between organization and date in volunteer entries.
const VOLUNTEER_SEPARATOR: &str = " \u{2022} ";

/// Bind every non-empty section of `record`, in composition order.
pub fn bind_sections(record: &ResumeRecord, escape: Escape, bindings: &mut Bindings) {
    bind_list(bindings, "professionalLinks", &record.professional_links, |out, link| {
        professional_link(out, link, escape)
    });
    bind_list(bindings, "experience", &record.experience, |out, exp| {
        experience(out, exp, escape)
    });
    bind_list(bindings, "projects", &record.projects, |out, project| {
        self::project(out, project, escape)
    });
    bind_list(bindings, "education", &record.education, |out, edu| {
        education(out, edu, escape)
    });
    bind_skills(bindings, &record.skills, escape);
    bind_list(bindings, "languages", &record.languages, |out, lang| {
        language(out, lang, escape)
    });
    bind_list(bindings, "certifications", &record.certifications, |out, cert| {
        certification(out, cert, escape)
    });
    bind_list(bindings, "achievements", &record.achievements, |out, item| {
        achievement(out, item, escape)
    });
    bind_list(bindings, "volunteer", &record.volunteer, |out, vol| {
        volunteer(out, vol, escape)
    });
}

/// Bind the two skill shapes independently; each only when non-empty.
pub fn bind_skills(bindings: &mut Bindings, skills: &Skills, escape: Escape) {
    bind_list(bindings, "skillsGrouped", &skills.grouped, |out, group| {
        skill_group(out, group, escape)
    });
    bind_list(bindings, "skillsFlat", &skills.flat, |out, skill| {
        skill_item(out, skill, escape)
    });
}

fn bind_list<T>(
    bindings: &mut Bindings,
    placeholder: &'static str,
    items: &[T],
    mut fragment: impl FnMut(&mut String, &T),
) {
    if items.is_empty() {
        log::debug!("section '{placeholder}' is empty; placeholder left in place");
        return;
    }
    let mut html = String::new();
    for item in items {
        fragment(&mut html, item);
    }
    log::debug!("section '{placeholder}': {} entries", items.len());
    bindings.bind(placeholder, html);
}

// ---------------------------------------------------------------------------
// Fragment shapes
// ---------------------------------------------------------------------------

fn professional_link(out: &mut String, link: &ProfessionalLink, e: Escape) {
    let _ = write!(
        out,
        "\n<div class=\"link-item\">\n  <span>{}</span>\n  <span>{}</span>\n</div>\n",
        e.apply(&link.icon),
        e.apply(&link.url),
    );
}

fn experience(out: &mut String, exp: &Experience, e: Escape) {
    let _ = write!(
        out,
        "\n<div class=\"experience-item\">\n  <div class=\"entry-header\">\n    \
         <h3 class=\"job-title entry-title\">{}</h3>\n    \
         <span class=\"date entry-date\">{}</span>\n  </div>\n  \
         <p class=\"company entry-company\">{}</p>\n  \
         <p class=\"description entry-description\">{}</p>\n</div>\n",
        e.apply(&exp.title),
        e.apply(&exp.date),
        e.apply(&exp.company),
        e.apply(&exp.description),
    );
}

fn project(out: &mut String, project: &Project, e: Escape) {
    let _ = write!(
        out,
        "\n<div class=\"project-item project-entry\">\n  <div class=\"entry-header\">\n    \
         <h3 class=\"project-title entry-title\">{}</h3>\n    \
         <span class=\"date entry-date\">{}</span>\n  </div>\n",
        e.apply(&project.title),
        e.apply(&project.date),
    );
    if !project.tech.is_empty() {
        out.push_str("  <div class=\"project-tech\">");
        for tech in &project.tech {
            let _ = write!(out, "<span class=\"tech-tag\">{}</span>", e.apply(tech));
        }
        out.push_str("</div>\n");
    }
    let _ = write!(
        out,
        "  <p class=\"description entry-description\">{}</p>\n",
        e.apply(&project.description),
    );
    if !project.links.is_empty() {
        out.push_str("  <div class=\"project-links\">");
        for link in &project.links {
            let _ = write!(
                out,
                "<a href=\"{}\" class=\"project-link\">{} {}</a>",
                e.apply(&link.url),
                e.apply(&link.icon),
                e.apply(&link.label),
            );
        }
        out.push_str("</div>\n");
    }
    out.push_str("</div>\n");
}

fn education(out: &mut String, edu: &Education, e: Escape) {
    let _ = write!(
        out,
        "\n<div class=\"education-item education-entry\">\n  <div class=\"entry-header\">\n    \
         <h3 class=\"degree entry-title\">{}</h3>\n    \
         <span class=\"date entry-date\">{}</span>\n  </div>\n  \
         <p class=\"school entry-company\">{}</p>\n  \
         <p class=\"description entry-description\">{}</p>\n</div>\n",
        e.apply(&edu.degree),
        e.apply(&edu.date),
        e.apply(&edu.school),
        e.apply(&edu.description),
    );
}

fn skill_group(out: &mut String, group: &SkillGroup, e: Escape) {
    let _ = write!(
        out,
        "\n<div class=\"skill-group\">\n  <h4 class=\"skill-group-title\">{}</h4>\n  \
         <ul class=\"skill-list\">",
        e.apply(&group.category),
    );
    for item in &group.items {
        skill_item(out, item, e);
    }
    out.push_str("</ul>\n</div>\n");
}

fn skill_item(out: &mut String, skill: &str, e: Escape) {
    let _ = write!(out, "<li class=\"skill-item\">{}</li>", e.apply(skill));
}

fn language(out: &mut String, lang: &Language, e: Escape) {
    let _ = write!(
        out,
        "\n<li class=\"language-item\">\n  <span class=\"language-name\">{}</span>\n  \
         <span class=\"proficiency language-level\">{}</span>\n</li>\n",
        e.apply(&lang.name),
        e.apply(&lang.level),
    );
}

fn certification(out: &mut String, cert: &Certification, e: Escape) {
    let _ = write!(
        out,
        "\n<li class=\"certification-item\">\n  <div class=\"cert-name\">{}</div>\n  \
         <div class=\"cert-issuer\">{} ({})</div>\n</li>\n",
        e.apply(&cert.name),
        e.apply(&cert.issuer),
        e.apply(&cert.year),
    );
}

fn achievement(out: &mut String, item: &Achievement, e: Escape) {
    let _ = write!(
        out,
        "\n<div class=\"achievement-card\">\n  <h4 class=\"achievement-title\">{}</h4>\n  \
         <p class=\"achievement-desc\">{}</p>\n</div>\n",
        e.apply(&item.title),
        e.apply(&item.description),
    );
}

fn volunteer(out: &mut String, vol: &Volunteer, e: Escape) {
    let _ = write!(
        out,
        "\n<div class=\"volunteer-item volunteer-entry\">\n  \
         <h3 class=\"volunteer-role\">{}</h3>\n  \
         <p class=\"volunteer-org\">{}{}{}</p>\n  \
         <p class=\"description entry-description\">{}</p>\n</div>\n",
        e.apply(&vol.role),
        e.apply(&vol.organization),
        VOLUNTEER_SEPARATOR,
        e.apply(&vol.date),
        e.apply(&vol.description),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProjectLink;

    fn bound(record: &ResumeRecord) -> Bindings {
        let mut b = Bindings::new();
        bind_sections(record, Escape::None, &mut b);
        b
    }

    fn assert_in_order(haystack: &str, needles: &[&str]) {
        let mut from = 0;
        for needle in needles {
            let pos = haystack[from..]
                .find(needle)
                .unwrap_or_else(|| panic!("'{needle}' not found in order in {haystack}"));
            from += pos + needle.len();
        }
    }

    #[test]
    fn empty_record_binds_nothing() {
        assert!(bound(&ResumeRecord::default()).is_empty());
    }

    #[test]
    fn experience_fields_in_fragment_order() {
        let mut record = ResumeRecord::default();
        record.experience.push(Experience {
            title: "Eng".into(),
            company: "Acme".into(),
            date: "2020-2021".into(),
            description: "Built things".into(),
        });
        let b = bound(&record);
        let html = b.get("experience").unwrap();
        assert_eq!(html.matches("experience-item").count(), 1);
        assert_in_order(html, &["Eng", "2020-2021", "Acme", "Built things"]);
    }

    #[test]
    fn list_order_is_preserved() {
        let mut record = ResumeRecord::default();
        for title in ["first", "second", "third"] {
            record.achievements.push(Achievement {
                title: title.into(),
                description: String::new(),
            });
        }
        let b = bound(&record);
        assert_in_order(b.get("achievements").unwrap(), &["first", "second", "third"]);
    }

    #[test]
    fn project_optional_blocks() {
        let mut record = ResumeRecord::default();
        record.projects.push(Project {
            title: "Bare".into(),
            ..Project::default()
        });
        record.projects.push(Project {
            title: "Full".into(),
            tech: vec!["Rust".into(), "Wasm".into()],
            links: vec![ProjectLink {
                icon: "gh".into(),
                label: "Source".into(),
                url: "https://example.com/full".into(),
            }],
            ..Project::default()
        });
        let b = bound(&record);
        let html = b.get("projects").unwrap();
        assert_eq!(html.matches("project-tech").count(), 1);
        assert_eq!(html.matches("project-links").count(), 1);
        assert!(html.contains(
            "<a href=\"https://example.com/full\" class=\"project-link\">gh Source</a>"
        ));
        assert_in_order(html, &["Bare", "Full", "tech-tag\">Rust", "tech-tag\">Wasm"]);
    }

    #[test]
    fn professional_links_are_not_anchors() {
        let mut record = ResumeRecord::default();
        record.professional_links.push(ProfessionalLink {
            icon: "in".into(),
            url: "linkedin.com/in/ann".into(),
        });
        let b = bound(&record);
        let html = b.get("professionalLinks").unwrap();
        assert!(!html.contains("<a "));
        assert_in_order(html, &["<span>in</span>", "<span>linkedin.com/in/ann</span>"]);
    }

    #[test]
    fn flat_only_skills_leave_grouped_unbound() {
        let mut record = ResumeRecord::default();
        record.skills.flat = vec!["Rust".into(), "Go".into(), "SQL".into()];
        let b = bound(&record);
        assert!(!b.contains("skillsGrouped"));
        assert_eq!(
            b.get("skillsFlat"),
            Some(
                "<li class=\"skill-item\">Rust</li><li class=\"skill-item\">Go</li>\
                 <li class=\"skill-item\">SQL</li>"
            )
        );
    }

    #[test]
    fn grouped_skills_nest_items() {
        let mut record = ResumeRecord::default();
        record.skills.grouped.push(SkillGroup {
            category: "Languages".into(),
            items: vec!["Rust".into(), "C".into()],
        });
        let b = bound(&record);
        let html = b.get("skillsGrouped").unwrap();
        assert!(!b.contains("skillsFlat"));
        assert_in_order(html, &["Languages", "<ul class=\"skill-list\">", "Rust", "C", "</ul>"]);
    }

    #[test]
    fn joined_fields_use_fixed_separators() {
        let mut record = ResumeRecord::default();
        record.certifications.push(Certification {
            name: "CKA".into(),
            issuer: "CNCF".into(),
            year: "2021".into(),
        });
        record.volunteer.push(Volunteer {
            role: "Mentor".into(),
            organization: "Code Club".into(),
            date: "2019".into(),
            description: String::new(),
        });
        let b = bound(&record);
        assert!(b.get("certifications").unwrap().contains("CNCF (2021)"));
        assert!(b.get("volunteer").unwrap().contains("Code Club \u{2022} 2019"));
    }

    #[test]
    fn missing_sub_fields_render_empty() {
        let mut record = ResumeRecord::default();
        record.languages.push(Language {
            name: "German".into(),
            level: String::new(),
        });
        let b = bound(&record);
        assert!(b
            .get("languages")
            .unwrap()
            .contains("<span class=\"proficiency language-level\"></span>"));
    }

    #[test]
    fn escape_applies_inside_fragments() {
        let mut record = ResumeRecord::default();
        record.skills.flat = vec!["C & C++".into()];
        let mut b = Bindings::new();
        bind_sections(&record, Escape::Html, &mut b);
        assert!(b.get("skillsFlat").unwrap().contains("C &amp; C++"));
    }
}

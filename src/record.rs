//! Resume data model – the JSON record handed to the composer.
//!
//! Deserialization is deliberately forgiving: `null` means "absent" for every
//! field, and scalar numbers or booleans (e.g. `"year": 2021`) are kept as
//! their JSON text so they can be interpolated like any other string.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Root value object for one resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeRecord {
    #[serde(deserialize_with = "nullable")]
    pub personal_info: PersonalInfo,
    #[serde(deserialize_with = "text")]
    pub summary: String,
    #[serde(deserialize_with = "nullable")]
    pub professional_links: Vec<ProfessionalLink>,
    #[serde(deserialize_with = "nullable")]
    pub experience: Vec<Experience>,
    #[serde(deserialize_with = "nullable")]
    pub projects: Vec<Project>,
    #[serde(deserialize_with = "nullable")]
    pub education: Vec<Education>,
    #[serde(deserialize_with = "nullable")]
    pub skills: Skills,
    #[serde(deserialize_with = "nullable")]
    pub languages: Vec<Language>,
    #[serde(deserialize_with = "nullable")]
    pub certifications: Vec<Certification>,
    #[serde(deserialize_with = "nullable")]
    pub achievements: Vec<Achievement>,
    #[serde(deserialize_with = "nullable")]
    pub volunteer: Vec<Volunteer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(deserialize_with = "text")]
    pub email: String,
    #[serde(deserialize_with = "text")]
    pub phone: String,
    #[serde(deserialize_with = "text")]
    pub location: String,
    #[serde(deserialize_with = "text")]
    pub website: String,
    #[serde(deserialize_with = "text")]
    pub initials: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfessionalLink {
    #[serde(deserialize_with = "text")]
    pub icon: String,
    #[serde(deserialize_with = "text")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(deserialize_with = "text")]
    pub company: String,
    #[serde(deserialize_with = "text")]
    pub date: String,
    #[serde(deserialize_with = "text")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(deserialize_with = "text")]
    pub date: String,
    #[serde(deserialize_with = "text_list")]
    pub tech: Vec<String>,
    #[serde(deserialize_with = "text")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub links: Vec<ProjectLink>,
}

/// Project links render as real anchors, unlike [`ProfessionalLink`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLink {
    #[serde(deserialize_with = "text")]
    pub icon: String,
    #[serde(deserialize_with = "text")]
    pub label: String,
    #[serde(deserialize_with = "text")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    #[serde(deserialize_with = "text")]
    pub degree: String,
    #[serde(deserialize_with = "text")]
    pub school: String,
    #[serde(deserialize_with = "text")]
    pub date: String,
    #[serde(deserialize_with = "text")]
    pub description: String,
}

/// Skills come in two independent shapes; templates pick one or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skills {
    #[serde(deserialize_with = "nullable")]
    pub grouped: Vec<SkillGroup>,
    #[serde(deserialize_with = "text_list")]
    pub flat: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillGroup {
    #[serde(deserialize_with = "text")]
    pub category: String,
    #[serde(deserialize_with = "text_list")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Language {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certification {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub issuer: String,
    #[serde(deserialize_with = "text")]
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Achievement {
    #[serde(deserialize_with = "text")]
    pub title: String,
    #[serde(deserialize_with = "text")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Volunteer {
    #[serde(deserialize_with = "text")]
    pub role: String,
    #[serde(deserialize_with = "text")]
    pub organization: String,
    #[serde(deserialize_with = "text")]
    pub date: String,
    #[serde(deserialize_with = "text")]
    pub description: String,
}

impl ResumeRecord {
    /// Parse a record from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse JSON text that may be the literal `null`.
    pub fn from_json_optional(json: &str) -> Result<Option<Self>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the fields a generated resume cannot do without.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.summary.trim().is_empty() {
            missing.push("summary".to_string());
        }
        if self.experience.is_empty() {
            missing.push("experience".to_string());
        }
        if self.personal_info.name.trim().is_empty() {
            missing.push("personalInfo.name".to_string());
        }
        if self.personal_info.email.trim().is_empty() {
            missing.push("personalInfo.email".to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(missing))
        }
    }

    /// Default PDF file name for batch output: whitespace runs become `-`.
    pub fn pdf_file_name(&self) -> String {
        let stem = self
            .personal_info
            .name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        if stem.is_empty() {
            "resume.pdf".to_string()
        } else {
            format!("{stem}-resume.pdf")
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient field deserializers
// ---------------------------------------------------------------------------

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Option::<Value>::deserialize(deserializer)?))
}

fn text_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Option<Value>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().map(value_to_text).collect())
}

fn value_to_text(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_record() {
        let json = r#"{
            "personalInfo": {"name": "Ann Lee", "email": "ann@example.com"},
            "summary": "Engineer",
            "professionalLinks": [{"icon": "in", "url": "linkedin.com/in/ann"}],
            "skills": {"flat": ["Rust", "SQL"]}
        }"#;
        let record = ResumeRecord::from_json(json).unwrap();
        assert_eq!(record.personal_info.name, "Ann Lee");
        assert_eq!(record.personal_info.phone, "");
        assert_eq!(record.professional_links[0].url, "linkedin.com/in/ann");
        assert_eq!(record.skills.flat, vec!["Rust", "SQL"]);
        assert!(record.skills.grouped.is_empty());
    }

    #[test]
    fn nulls_become_defaults() {
        let json = r#"{
            "personalInfo": {"name": null, "title": "Dev"},
            "summary": null,
            "experience": null,
            "skills": null,
            "projects": [{"title": "P", "tech": null, "links": null}]
        }"#;
        let record = ResumeRecord::from_json(json).unwrap();
        assert_eq!(record.personal_info.name, "");
        assert_eq!(record.summary, "");
        assert!(record.experience.is_empty());
        assert!(record.projects[0].tech.is_empty());
        assert!(record.projects[0].links.is_empty());
    }

    #[test]
    fn numeric_scalars_are_kept_as_text() {
        let json = r#"{"certifications": [{"name": "CKA", "issuer": "CNCF", "year": 2021}]}"#;
        let record = ResumeRecord::from_json(json).unwrap();
        assert_eq!(record.certifications[0].year, "2021");
    }

    #[test]
    fn literal_null_is_absent_record() {
        assert!(ResumeRecord::from_json_optional("null").unwrap().is_none());
        assert!(ResumeRecord::from_json_optional("{}").unwrap().is_some());
    }

    #[test]
    fn malformed_json_is_invalid_data() {
        let err = ResumeRecord::from_json("{\"summary\": ").unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn validate_reports_every_missing_field() {
        let err = ResumeRecord::default().validate().unwrap_err();
        match err {
            Error::Validation(fields) => assert_eq!(
                fields,
                vec![
                    "summary",
                    "experience",
                    "personalInfo.name",
                    "personalInfo.email"
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pdf_file_name_dashes_whitespace() {
        let mut record = ResumeRecord::default();
        record.personal_info.name = "Jane  van Smith".into();
        assert_eq!(record.pdf_file_name(), "Jane-van-Smith-resume.pdf");
        record.personal_info.name.clear();
        assert_eq!(record.pdf_file_name(), "resume.pdf");
    }
}

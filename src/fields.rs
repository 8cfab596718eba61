//! Field substitution – binds the scalar placeholders of a resume.

use std::borrow::Cow;

use crate::placeholder::Bindings;
use crate::record::ResumeRecord;

/// The scalar placeholders every template may reference.
pub const SCALAR_FIELDS: [&str; 8] = [
    "name", "title", "email", "phone", "location", "website", "initials", "summary",
];

/// How interpolated values are treated before they reach the document.
///
/// Values are trusted by default; callers rendering untrusted input should
/// switch to [`Escape::Html`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Escape {
    #[default]
    None,
    Html,
}

impl Escape {
    pub fn apply<'a>(self, value: &'a str) -> Cow<'a, str> {
        match self {
            Escape::None => Cow::Borrowed(value),
            Escape::Html => escape_html(value),
        }
    }
}

fn escape_html(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 16);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Bind all scalar fields; absent values bind to the empty string.
pub fn bind_scalars(record: &ResumeRecord, escape: Escape, bindings: &mut Bindings) {
    let info = &record.personal_info;
    let values = [
        &info.name,
        &info.title,
        &info.email,
        &info.phone,
        &info.location,
        &info.website,
        &info.initials,
        &record.summary,
    ];
    for (name, value) in SCALAR_FIELDS.into_iter().zip(values) {
        bindings.bind(name, escape.apply(value));
    }
}

//! Placeholder tokenizer – single-pass `{{name}}` substitution.
//!
//! A template is scanned once from left to right. Every well-formed token
//! whose name has a binding is replaced by the bound value; every other token
//! is copied through untouched. Substituted values are never re-scanned, so a
//! value containing `{{...}}` text cannot trigger a second substitution.

use std::collections::HashMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Placeholder name → resolved fragment.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<&'static str, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`. A later bind of the same name replaces the earlier value.
    pub fn bind(&mut self, name: &'static str, value: impl Into<String>) {
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One lexical piece of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text, copied as is.
    Text(&'a str),
    /// A `{{name}}` token; `raw` is the full token including braces.
    Placeholder { name: &'a str, raw: &'a str },
}

/// Split a template into literal runs and placeholder tokens.
pub fn tokenize(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find(OPEN) {
        let open = cursor + offset;
        let name_start = open + OPEN.len();
        let Some(close_offset) = template[name_start..].find(CLOSE) else {
            break;
        };
        let name_end = name_start + close_offset;
        let name = &template[name_start..name_end];

        if is_placeholder_name(name) {
            if literal_start < open {
                tokens.push(Token::Text(&template[literal_start..open]));
            }
            let token_end = name_end + CLOSE.len();
            tokens.push(Token::Placeholder {
                name,
                raw: &template[open..token_end],
            });
            cursor = token_end;
            literal_start = token_end;
        } else {
            // Not a token; resume scanning right after this `{` so that
            // inputs like `{{{name}}` still find the inner token.
            cursor = open + 1;
        }
    }

    if literal_start < template.len() {
        tokens.push(Token::Text(&template[literal_start..]));
    }
    tokens
}

/// Names of every placeholder in `template`, in order of appearance.
pub fn placeholder_names(template: &str) -> Vec<&str> {
    tokenize(template)
        .into_iter()
        .filter_map(|t| match t {
            Token::Placeholder { name, .. } => Some(name),
            Token::Text(_) => None,
        })
        .collect()
}

/// Replace every bound placeholder in one pass; unbound ones stay literal.
pub fn substitute(template: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(template.len());
    for token in tokenize(template) {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::Placeholder { name, raw } => match bindings.get(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(raw),
            },
        }
    }
    out
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

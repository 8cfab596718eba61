//! Text measurement using `ttf-parser`.
//!
//! Without a font file the metrics fall back to an average-advance
//! heuristic tuned for Helvetica, which is also what the PDF output draws
//! with. Loading a TTF gives exact glyph advances for staging layout.

use std::path::Path;

use crate::error::{Error, Result};

/// A parsed font file.
#[derive(Debug, Clone)]
struct FontFile {
    /// Raw bytes, re-parsed on demand (ttf-parser is zero-copy).
    bytes: Vec<u8>,
    units_per_em: f32,
}

/// Measures text runs in CSS pixels.
#[derive(Debug, Clone, Default)]
pub struct TextMetrics {
    font: Option<FontFile>,
}

impl TextMetrics {
    /// Heuristic metrics, no font file.
    pub fn heuristic() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| Error::Rasterization(format!("failed to parse font: {e}")))?;
        let units_per_em = face.units_per_em() as f32;
        log::debug!(
            "loaded font with {} glyphs, {} units/em",
            face.number_of_glyphs(),
            units_per_em
        );
        Ok(Self {
            font: Some(FontFile {
                bytes,
                units_per_em,
            }),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn has_font_file(&self) -> bool {
        self.font.is_some()
    }

    /// Width of `text` at `font_size` px.
    pub fn text_width(&self, text: &str, font_size: f32, bold: bool) -> f32 {
        let heuristic = || {
            // Average advance ≈ 0.5 em for proportional fonts; bold ~10 % wider.
            let avg = if bold { 0.55 } else { 0.5 };
            text.chars().count() as f32 * font_size * avg
        };
        let Some(font) = &self.font else {
            return heuristic();
        };
        let Ok(face) = ttf_parser::Face::parse(&font.bytes, 0) else {
            return heuristic();
        };
        let scale = font_size / font.units_per_em;
        let bold_factor = if bold { 1.05 } else { 1.0 };
        text.chars()
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map_or(font_size * 0.5, |adv| adv as f32 * scale)
            })
            .sum::<f32>()
            * bold_factor
    }

    /// Greedy word wrap to `max_width` px. Collapses whitespace runs the way
    /// HTML does; a single word wider than the line stays on its own line.
    pub fn wrap(&self, text: &str, font_size: f32, bold: bool, max_width: f32) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if self.text_width(&candidate, font_size, bold) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// Collapse whitespace runs into single spaces, keeping a leading or
/// trailing space if the input had one.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() && ch != '\u{00A0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

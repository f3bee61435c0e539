//! Font registration and text measurement using `ttf-parser`.
//!
//! Fonts are registered by name from caller-supplied bytes; bold text
//! resolves to the `<name>-Bold` variant when one is registered. Layout
//! measures with real glyph advances when font bytes are available and
//! falls back to an average-width heuristic otherwise (drawing always goes
//! through the built-in PDF fonts, see [`crate::canvas`]).

use std::collections::HashMap;

use crate::content::FontWeight;
use crate::error::{Error, Result};

/// Baseline-to-baseline distance as a multiple of the font size, matching
/// the metrics of the built-in faces used for drawing.
pub const LINE_HEIGHT_FACTOR: f32 = 1.15;

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
}

/// Registry of measured fonts, keyed by registered name.
#[derive(Default)]
pub struct FontManager {
    fonts: HashMap<String, FontData>,
}

impl FontManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a TTF/OTF font under `name`.
    pub fn register(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| Error::Configuration(format!("failed to parse font {name:?}: {e}")))?;

        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            bytes,
        };
        self.fonts.insert(name.to_string(), data);
        Ok(())
    }

    /// Resolve a family + weight to a registered name: bold prefers
    /// `<family>-Bold` when registered, otherwise the family itself.
    pub fn resolve(&self, family: &str, weight: FontWeight) -> String {
        if weight == FontWeight::Bold {
            let bold = format!("{family}-Bold");
            if self.fonts.contains_key(&bold) || !self.fonts.contains_key(family) {
                return bold;
            }
        }
        family.to_string()
    }

    /// Measure the width of a single line at a given font size in points.
    ///
    /// With registered bytes we sum glyph advances; otherwise an average
    /// character width heuristic (0.5 × size, bold ~10 % wider).
    pub fn measure_width(&self, text: &str, family: &str, weight: FontWeight, size: f32) -> f32 {
        let name = self.resolve(family, weight);
        let Some(data) = self.fonts.get(&name).or_else(|| self.fonts.get(family)) else {
            let avg = if weight == FontWeight::Bold { 0.55 } else { 0.5 };
            return text.chars().count() as f32 * size * avg;
        };

        if let Ok(face) = ttf_parser::Face::parse(&data.bytes, 0) {
            let scale = size / data.units_per_em;
            let mut width = 0.0f32;
            for ch in text.chars() {
                if let Some(gid) = face.glyph_index(ch) {
                    width += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale;
                } else {
                    width += size * 0.5;
                }
            }
            width
        } else {
            text.chars().count() as f32 * size * 0.5
        }
    }

    /// Baseline-to-baseline line height in points.
    pub fn line_height(&self, size: f32, line_gap: Option<f32>) -> f32 {
        size * LINE_HEIGHT_FACTOR + line_gap.unwrap_or(0.0)
    }

    /// Word-wrap `text` to fit `max_width` points. Returns at least one
    /// line.
    pub fn wrap_text(
        &self,
        text: &str,
        family: &str,
        weight: FontWeight,
        size: f32,
        max_width: f32,
    ) -> Vec<String> {
        if max_width <= 0.0 || text.is_empty() {
            return vec![text.to_string()];
        }

        let mut lines: Vec<String> = Vec::new();
        for paragraph in text.split('\n') {
            let words: Vec<&str> = paragraph.split_whitespace().collect();
            if words.is_empty() {
                lines.push(String::new());
                continue;
            }

            let mut current_line = String::new();
            for word in &words {
                let candidate = if current_line.is_empty() {
                    word.to_string()
                } else {
                    format!("{} {}", current_line, word)
                };
                let w = self.measure_width(&candidate, family, weight, size);
                if w > max_width && !current_line.is_empty() {
                    lines.push(current_line);
                    current_line = word.to_string();
                } else {
                    current_line = candidate;
                }
            }
            if !current_line.is_empty() {
                lines.push(current_line);
            }
        }

        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    /// Height one string occupies after wrapping: line count × line
    /// height, plus any paragraph gap.
    pub fn measure_height(
        &self,
        text: &str,
        family: &str,
        weight: FontWeight,
        size: f32,
        width: Option<f32>,
        line_gap: Option<f32>,
        paragraph_gap: Option<f32>,
    ) -> f32 {
        let line_count = match width {
            Some(w) => self.wrap_text(text, family, weight, size, w).len(),
            None => text.split('\n').count().max(1),
        };
        line_count as f32 * self.line_height(size, line_gap) + paragraph_gap.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_text_width() {
        let mgr = FontManager::new();
        let w = mgr.measure_width("Hello", "Helvetica", FontWeight::Normal, 16.0);
        // 5 chars × 16 × 0.5 = 40
        assert!((w - 40.0).abs() < 0.1);
    }

    #[test]
    fn bold_is_wider_than_normal() {
        let mgr = FontManager::new();
        let normal = mgr.measure_width("Sample", "Helvetica", FontWeight::Normal, 12.0);
        let bold = mgr.measure_width("Sample", "Helvetica", FontWeight::Bold, 12.0);
        assert!(bold > normal);
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::new();
        let lines = mgr.wrap_text(
            "Hello world foo bar",
            "Helvetica",
            FontWeight::Normal,
            16.0,
            60.0,
        );
        assert!(lines.len() >= 2, "Expected wrapping, got {:?}", lines);
    }

    #[test]
    fn measure_height_scales_with_wrapping() {
        let mgr = FontManager::new();
        let one =
            mgr.measure_height("word", "Helvetica", FontWeight::Normal, 12.0, None, None, None);
        let many = mgr.measure_height(
            "several words that will not fit on a single narrow line",
            "Helvetica",
            FontWeight::Normal,
            12.0,
            Some(80.0),
            None,
            None,
        );
        assert!(many > one * 2.0);
    }

    #[test]
    fn bold_resolution_prefers_registered_family() {
        let mgr = FontManager::new();
        assert_eq!(
            mgr.resolve("Times-Roman", FontWeight::Bold),
            "Times-Roman-Bold"
        );
        assert_eq!(mgr.resolve("Times-Roman", FontWeight::Normal), "Times-Roman");
    }

    #[test]
    fn register_rejects_garbage_bytes() {
        let mut mgr = FontManager::new();
        let err = mgr.register("Broken", vec![0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}

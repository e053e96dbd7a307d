// inspection-report: text measurement for the built-in Helvetica faces

use serde::{Deserialize, Serialize};

/// Millimetres per point
const MM_PER_PT: f32 = 25.4 / 72.0;

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths (1/1000 em) for ASCII 32..=126
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for characters outside the tables
const FALLBACK_WIDTH: u16 = 556;

/// Line height as a multiple of the font size
pub const LINE_HEIGHT_FACTOR: f32 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
}

fn glyph_width(c: char, style: FontStyle) -> u16 {
    let table = match style {
        FontStyle::Regular => &HELVETICA_WIDTHS,
        FontStyle::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    match c as u32 {
        code @ 32..=126 => table[(code - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in mm at `font_size` points.
pub fn text_width(text: &str, font_size: f32, style: FontStyle) -> f32 {
    let units: u32 = text.chars().map(|c| glyph_width(c, style) as u32).sum();
    units as f32 * font_size / 1000.0 * MM_PER_PT
}

/// Height of one text line in mm at `font_size` points.
pub fn line_height(font_size: f32) -> f32 {
    font_size * LINE_HEIGHT_FACTOR * MM_PER_PT
}

/// Greedy word wrap to `max_width` mm. Explicit newlines are kept, and words
/// longer than a line are split by character.
pub fn wrap_text(text: &str, font_size: f32, style: FontStyle, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if text_width(&candidate, font_size, style) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if text_width(word, font_size, style) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    let mut next = current.clone();
                    next.push(c);
                    if !current.is_empty() && text_width(&next, font_size, style) > max_width {
                        lines.push(std::mem::replace(&mut current, c.to_string()));
                    } else {
                        current = next;
                    }
                }
            }
        }
        lines.push(current);
    }

    // Drop trailing empty lines from a trailing newline
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_scales_with_font_size() {
        let small = text_width("Staff Inspeksi", 10.0, FontStyle::Regular);
        let large = text_width("Staff Inspeksi", 20.0, FontStyle::Regular);
        assert!((large - 2.0 * small).abs() < 1e-4);
    }

    #[test]
    fn bold_is_wider() {
        let regular = text_width("Haries Istyawan", 10.0, FontStyle::Regular);
        let bold = text_width("Haries Istyawan", 10.0, FontStyle::Bold);
        assert!(bold > regular);
    }

    #[test]
    fn known_width() {
        // "AA" in Helvetica is 2 * 667 units
        let w = text_width("AA", 72.0, FontStyle::Regular);
        assert!((w - 1.334 * 25.4).abs() < 1e-3);
    }

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap_text("Lubang pada lajur kiri", 10.0, FontStyle::Regular, 20.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 10.0, FontStyle::Regular) <= 20.0);
        }
        assert_eq!(lines.join(" "), "Lubang pada lajur kiri");
    }

    #[test]
    fn wrap_splits_long_words() {
        let lines = wrap_text("AAAAAAAAAAAAAAAAAAAA", 10.0, FontStyle::Regular, 10.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "AAAAAAAAAAAAAAAAAAAA");
    }

    #[test]
    fn wrap_keeps_explicit_newlines() {
        let lines = wrap_text("KM 10\nJalur A", 6.0, FontStyle::Regular, 100.0);
        assert_eq!(lines, vec!["KM 10".to_string(), "Jalur A".to_string()]);
    }

    #[test]
    fn wrap_empty_is_single_empty_line() {
        assert_eq!(wrap_text("", 6.0, FontStyle::Regular, 10.0), vec![String::new()]);
    }
}

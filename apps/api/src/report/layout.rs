//! Static font metrics and word-wrapping for report pagination.
//!
//! Character widths are in em units (relative to font size), covering ASCII
//! 0x20..=0x7E; index = (char as usize) - 32. The tables are the standard
//! Helvetica/Helvetica-Bold AFM widths (oblique shares the regular widths),
//! matching the builtin fonts the PDF is composed with, so measured wrap
//! points agree with what the viewer renders.

use crate::report::markup::{Span, SpanStyle};

// ────────────────────────────────────────────────────────────────────────────
// Page geometry
// ────────────────────────────────────────────────────────────────────────────

/// A4 portrait with 1-inch margins, all distances in millimetres.
pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 25.4;

pub const PT_TO_MM: f32 = 0.352_778;

/// Usable text width in points.
pub fn text_width_pt() -> f32 {
    (PAGE_WIDTH_MM - 2.0 * MARGIN_MM) / PT_TO_MM
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric tables
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for one font face.
pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters (codepoints > 0x7E).
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Rendered width of a string in em units.
    /// Non-ASCII characters fall back to `average_char_width`.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Rendered width in points at the given font size.
    pub fn measure_pt(&self, s: &str, size_pt: f32) -> f32 {
        self.measure_str(s) * size_pt
    }
}

/// Helvetica (regular) — AFM widths / 1000.
static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.513,
    space_width: 0.278,
};

/// Helvetica-Bold — AFM widths / 1000.
static HELVETICA_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.333, 0.474, 0.556, 0.556, 0.889, 0.722, 0.238, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.333, 0.333, 0.584, 0.584, 0.584, 0.611, 0.975,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.722, 0.722, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.556, 0.722, 0.611, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.333, 0.278, 0.333, 0.584, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.611, 0.556, 0.611, 0.556, 0.333, 0.611, 0.611, 0.278, 0.278, 0.556, 0.278, 0.889,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.611, 0.611, 0.611, 0.611, 0.389, 0.556, 0.333, 0.611, 0.556, 0.778, 0.556, 0.556, 0.500,
        // {      |      }      ~
        0.389, 0.280, 0.389, 0.584,
    ],
    average_char_width: 0.536,
    space_width: 0.278,
};

/// Metric table for a span style. Oblique shares the regular widths.
pub fn metrics_for(style: SpanStyle) -> &'static FontMetricTable {
    match style {
        SpanStyle::Bold => &HELVETICA_BOLD_TABLE,
        SpanStyle::Regular | SpanStyle::Italic => &HELVETICA_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Word wrapping
// ────────────────────────────────────────────────────────────────────────────

/// One word carrying the style of the span it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledWord {
    pub text: String,
    pub style: SpanStyle,
}

impl StyledWord {
    pub fn width_pt(&self, size_pt: f32) -> f32 {
        metrics_for(self.style).measure_pt(&self.text, size_pt)
    }
}

/// Explodes spans into style-tagged words.
fn words(spans: &[Span]) -> Vec<StyledWord> {
    spans
        .iter()
        .flat_map(|span| {
            span.text.split_whitespace().map(|w| StyledWord {
                text: w.to_string(),
                style: span.style,
            })
        })
        .collect()
}

/// Greedy word-wraps styled spans at `max_width_pt` for the given font size.
/// A word wider than the whole line gets a line of its own rather than being
/// broken mid-word.
pub fn wrap_spans(spans: &[Span], size_pt: f32, max_width_pt: f32) -> Vec<Vec<StyledWord>> {
    let words = words(spans);
    if words.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<Vec<StyledWord>> = Vec::new();
    let mut current: Vec<StyledWord> = Vec::new();
    let mut current_width = 0.0_f32;

    for word in words {
        let word_w = word.width_pt(size_pt);
        let space_w = if current.is_empty() {
            0.0
        } else {
            metrics_for(word.style).space_width * size_pt
        };

        if !current.is_empty() && current_width + space_w + word_w > max_width_pt {
            lines.push(std::mem::take(&mut current));
            current_width = word_w;
        } else {
            current_width += space_w + word_w;
        }
        current.push(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

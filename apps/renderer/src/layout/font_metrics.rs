//! Static font-metric tables used to estimate how canvas text wraps.
//!
//! Character widths are in em units (relative to font size). The browser-side
//! drawing surface uses real glyph metrics; these tables only need to be close
//! enough to tell a one-line textbox from a three-line one.
//!
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};

/// Fabric's default line height multiplier.
pub const DEFAULT_LINE_HEIGHT: f64 = 1.16;

/// Fabric's default font size, used when an object declares none.
pub const DEFAULT_FONT_SIZE: f64 = 40.0;

// ────────────────────────────────────────────────────────────────────────────
// Font classes
// ────────────────────────────────────────────────────────────────────────────

/// Broad width class of a CSS font-family stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontClass {
    /// Arial, Helvetica, Inter, Lato, generic `sans-serif`.
    Sans,
    /// Times New Roman, Georgia, Garamond, generic `serif`.
    Serif,
    /// Oswald, Arial Narrow and other condensed faces.
    Condensed,
}

impl FontClass {
    /// Classifies a `fontFamily` value such as `"Times New Roman, serif"`.
    /// Anything unrecognised measures as sans.
    pub fn from_family(family: &str) -> Self {
        let family = family.to_ascii_lowercase();
        if ["condensed", "narrow", "oswald", "compressed"]
            .iter()
            .any(|k| family.contains(k))
        {
            return FontClass::Condensed;
        }
        let serif_named = ["times", "georgia", "garamond", "palatino", "cambria", "baskerville"]
            .iter()
            .any(|k| family.contains(k));
        let generic_serif = family
            .split(',')
            .any(|f| f.trim().trim_matches(|c| c == '"' || c == '\'') == "serif");
        if serif_named || generic_serif {
            FontClass::Serif
        } else {
            FontClass::Sans
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for a font class.
///
/// `widths[i]` = width of ASCII character `(i + 32)` at 1em.
///
/// Width array slot layout:
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters (codepoints > 0x7E).
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    fn char_width(&self, c: char) -> f32 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32]
        } else {
            self.average_char_width
        }
    }

    /// Measures the rendered width of a string in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars().map(|c| self.char_width(c)).sum()
    }

    /// Counts the lines `text` occupies when wrapped at `max_width_em`.
    ///
    /// Explicit newlines always break. Within a paragraph words wrap greedily; a
    /// word wider than the line takes a line of its own unless `by_grapheme` is
    /// set, in which case wrapping happens between any two characters.
    /// Empty text occupies zero lines.
    pub fn wrapped_lines(&self, text: &str, max_width_em: f32, by_grapheme: bool) -> u32 {
        if text.trim().is_empty() {
            return 0;
        }
        text.split('\n')
            .map(|paragraph| {
                if by_grapheme {
                    self.char_wrap(paragraph, max_width_em)
                } else {
                    self.word_wrap(paragraph, max_width_em)
                }
            })
            .sum()
    }

    fn word_wrap(&self, paragraph: &str, max_width: f32) -> u32 {
        let mut line_count = 1u32;
        let mut current_width = 0.0_f32;
        let mut first = true;

        for word in paragraph.split_whitespace() {
            let word_w = self.measure_str(word);
            let space_w = if first { 0.0 } else { self.space_width };

            if !first && current_width + space_w + word_w > max_width {
                line_count += 1;
                current_width = word_w;
            } else {
                current_width += space_w + word_w;
                first = false;
            }
        }
        line_count
    }

    fn char_wrap(&self, paragraph: &str, max_width: f32) -> u32 {
        let mut line_count = 1u32;
        let mut current_width = 0.0_f32;

        for c in paragraph.chars() {
            let w = self.char_width(c);
            if current_width > 0.0 && current_width + w > max_width {
                line_count += 1;
                current_width = w;
            } else {
                current_width += w;
            }
        }
        line_count
    }
}

/// Estimated height of `text` laid out in a box `width_px` wide.
pub fn estimate_text_height(
    text: &str,
    width_px: f64,
    font_size: f64,
    line_height: f64,
    class: FontClass,
    by_grapheme: bool,
) -> f64 {
    if font_size <= 0.0 || width_px <= 0.0 {
        return 0.0;
    }
    let metrics = get_metrics(class);
    let max_width_em = (width_px / font_size) as f32;
    let lines = metrics.wrapped_lines(text, max_width_em, by_grapheme);
    f64::from(lines) * font_size * line_height
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

/// Humanist sans-serif (Arial/Helvetica class).
static SANS_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.28, 0.28, 0.36, 0.56, 0.56, 0.89, 0.67, 0.19, 0.33, 0.33, 0.39, 0.58, 0.28, 0.33, 0.28, 0.28,
        // 0     1     2     3     4     5     6     7     8     9
        0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
        // :     ;     <     =     >     ?     @
        0.28, 0.28, 0.58, 0.58, 0.58, 0.56, 1.02,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.67, 0.67, 0.72, 0.72, 0.67, 0.61, 0.78, 0.72, 0.28, 0.50, 0.67, 0.56, 0.83,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.72, 0.78, 0.67, 0.78, 0.72, 0.67, 0.61, 0.72, 0.67, 0.94, 0.67, 0.67, 0.61,
        // [     \     ]     ^     _     `
        0.28, 0.28, 0.28, 0.47, 0.56, 0.33,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.56, 0.56, 0.50, 0.56, 0.56, 0.28, 0.56, 0.56, 0.22, 0.22, 0.50, 0.22, 0.83,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.56, 0.56, 0.56, 0.56, 0.33, 0.50, 0.28, 0.56, 0.50, 0.72, 0.50, 0.50, 0.50,
        // {     |     }     ~
        0.33, 0.26, 0.33, 0.58,
    ],
    average_char_width: 0.55,
    space_width: 0.28,
};

/// Transitional serif (Times New Roman class). Approx. 90% of sans.
static SERIF_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.25, 0.33, 0.41, 0.50, 0.50, 0.83, 0.78, 0.18, 0.33, 0.33, 0.50, 0.56, 0.25, 0.33, 0.25, 0.28,
        // 0     1     2     3     4     5     6     7     8     9
        0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50, 0.50,
        // :     ;     <     =     >     ?     @
        0.28, 0.28, 0.56, 0.56, 0.56, 0.44, 0.92,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.72, 0.67, 0.67, 0.72, 0.61, 0.56, 0.72, 0.72, 0.33, 0.39, 0.72, 0.61, 0.89,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.72, 0.72, 0.56, 0.72, 0.67, 0.56, 0.61, 0.72, 0.72, 0.94, 0.72, 0.72, 0.61,
        // [     \     ]     ^     _     `
        0.33, 0.28, 0.33, 0.47, 0.50, 0.33,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.44, 0.50, 0.44, 0.50, 0.44, 0.33, 0.50, 0.50, 0.28, 0.28, 0.50, 0.28, 0.78,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.50, 0.50, 0.50, 0.50, 0.33, 0.39, 0.28, 0.50, 0.50, 0.72, 0.50, 0.50, 0.44,
        // {     |     }     ~
        0.48, 0.20, 0.48, 0.54,
    ],
    average_char_width: 0.48,
    space_width: 0.25,
};

/// Condensed display sans-serif (Oswald class). Approx. 68% of sans.
static CONDENSED_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.17, 0.20, 0.26, 0.38, 0.38, 0.61, 0.46, 0.15, 0.23, 0.23, 0.27, 0.40, 0.19, 0.23, 0.19, 0.21,
        // 0     1     2     3     4     5     6     7     8     9
        0.38, 0.38, 0.38, 0.38, 0.38, 0.38, 0.38, 0.38, 0.38, 0.38,
        // :     ;     <     =     >     ?     @
        0.19, 0.19, 0.40, 0.40, 0.40, 0.34, 0.69,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.46, 0.41, 0.41, 0.46, 0.38, 0.34, 0.46, 0.46, 0.17, 0.27, 0.41, 0.36, 0.53,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.46, 0.49, 0.38, 0.49, 0.41, 0.34, 0.38, 0.46, 0.46, 0.61, 0.41, 0.41, 0.38,
        // [     \     ]     ^     _     `
        0.19, 0.21, 0.19, 0.32, 0.38, 0.23,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.38, 0.38, 0.34, 0.38, 0.38, 0.21, 0.38, 0.38, 0.15, 0.15, 0.36, 0.15, 0.56,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.38, 0.38, 0.38, 0.38, 0.23, 0.30, 0.27, 0.38, 0.34, 0.49, 0.34, 0.34, 0.30,
        // {     |     }     ~
        0.23, 0.18, 0.23, 0.40,
    ],
    average_char_width: 0.35,
    space_width: 0.17,
};

/// Returns the static metric table for a font class.
pub fn get_metrics(class: FontClass) -> &'static FontMetricTable {
    match class {
        FontClass::Sans => &SANS_TABLE,
        FontClass::Serif => &SERIF_TABLE,
        FontClass::Condensed => &CONDENSED_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_str_empty_returns_zero() {
        assert_eq!(get_metrics(FontClass::Sans).measure_str(""), 0.0);
    }

    #[test]
    fn test_measure_str_ascii_characters() {
        let metrics = get_metrics(FontClass::Sans);
        // "Go" = G(0.78) + o(0.56) = 1.34
        let width = metrics.measure_str("Go");
        assert!((width - 1.34).abs() < 1e-3, "Go width should be ~1.34, got {width}");
    }

    #[test]
    fn test_measure_str_non_ascii_falls_back() {
        let metrics = get_metrics(FontClass::Serif);
        let width = metrics.measure_str("é");
        assert!((width - metrics.average_char_width).abs() < 1e-4);
    }

    #[test]
    fn test_from_family_classification() {
        assert_eq!(FontClass::from_family("Arial"), FontClass::Sans);
        assert_eq!(FontClass::from_family("Helvetica, sans-serif"), FontClass::Sans);
        assert_eq!(FontClass::from_family("Times New Roman, serif"), FontClass::Serif);
        assert_eq!(FontClass::from_family("'Georgia'"), FontClass::Serif);
        assert_eq!(FontClass::from_family("Oswald"), FontClass::Condensed);
    }

    #[test]
    fn test_wrapped_lines_empty_is_zero() {
        assert_eq!(get_metrics(FontClass::Sans).wrapped_lines("   ", 10.0, false), 0);
    }

    #[test]
    fn test_wrapped_lines_short_text_is_one_line() {
        assert_eq!(get_metrics(FontClass::Sans).wrapped_lines("Rust", 40.0, false), 1);
    }

    #[test]
    fn test_wrapped_lines_counts_explicit_newlines() {
        let lines = get_metrics(FontClass::Sans).wrapped_lines("one\ntwo\nthree", 40.0, false);
        assert_eq!(lines, 3);
    }

    #[test]
    fn test_wrapped_lines_long_text_wraps() {
        let text = "word ".repeat(40);
        let lines = get_metrics(FontClass::Sans).wrapped_lines(&text, 20.0, false);
        assert!(lines >= 5, "expected several lines, got {lines}");
    }

    #[test]
    fn test_long_word_breaks_only_by_grapheme() {
        let metrics = get_metrics(FontClass::Sans);
        let word = "x".repeat(60);
        assert_eq!(metrics.wrapped_lines(&word, 10.0, false), 1);
        assert!(metrics.wrapped_lines(&word, 10.0, true) > 1);
    }

    #[test]
    fn test_condensed_narrower_than_sans() {
        let text = "Senior Product Designer";
        assert!(
            get_metrics(FontClass::Condensed).measure_str(text)
                < get_metrics(FontClass::Sans).measure_str(text)
        );
    }

    #[test]
    fn test_estimate_text_height_scales_with_lines() {
        let one = estimate_text_height("PROFILE", 700.0, 16.0, 1.0, FontClass::Sans, false);
        assert!((one - 16.0).abs() < 1e-9);
        let text = "Collaborated with cross-functional teams to ideate and prototype innovative solutions";
        let narrow = estimate_text_height(text, 120.0, 12.0, 1.2, FontClass::Sans, false);
        assert!(narrow > 12.0 * 1.2 * 2.0);
    }
}

//! Standard Type1 fonts for directly drawn pages.
//!
//! Direct drawing never embeds a font program: pages reference the PDF
//! base-14 fonts with `WinAnsiEncoding` and text is reduced to printable
//! ASCII first, so widths can be measured from the built-in AFM tables
//! below.

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

/// Bold glyphs are measured from the regular table with this allowance.
const BOLD_WIDTH_FACTOR: f32 = 1.08;

/// Courier is monospaced.
const COURIER_WIDTH: u16 = 600;

/// The fonts registered on every directly drawn page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Regular,
    Bold,
    Mono,
}

impl StandardFont {
    pub const ALL: [Self; 3] = [Self::Regular, Self::Bold, Self::Mono];

    /// Resource name used in content streams.
    pub const fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Mono => "F3",
        }
    }

    pub const fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
            Self::Mono => "Courier",
        }
    }

    /// Width of already-transliterated text at `size` points.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.bytes().map(|b| u32::from(self.glyph_width(b))).sum();
        #[allow(clippy::cast_precision_loss)]
        let width = units as f32 * size / 1000.0;
        if self == Self::Bold {
            width * BOLD_WIDTH_FACTOR
        } else {
            width
        }
    }

    fn glyph_width(self, byte: u8) -> u16 {
        if self == Self::Mono {
            return COURIER_WIDTH;
        }
        match byte {
            32..=126 => HELVETICA_WIDTHS[usize::from(byte - 32)],
            _ => HELVETICA_WIDTHS[0],
        }
    }
}

/// Reduce text to what the standard fonts can draw.
///
/// Accented Latin and Turkish letters lose their diacritics, typographic
/// quotes and dashes become their ASCII forms, tabs become four spaces and
/// everything else outside printable ASCII (except `\n`) is dropped.
pub fn to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' '..='~' | '\n' => out.push(c),
            '\t' => out.push_str("    "),
            '\r' => {}
            _ => {
                if let Some(replacement) = transliterate(c) {
                    out.push_str(replacement);
                }
            }
        }
    }
    out
}

fn transliterate(c: char) -> Option<&'static str> {
    let s = match c {
        'ç' | 'ć' | 'č' => "c",
        'Ç' | 'Ć' | 'Č' => "C",
        'ğ' => "g",
        'Ğ' => "G",
        'ı' | 'ì' | 'í' | 'î' | 'ï' => "i",
        'İ' | 'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'ö' | 'ò' | 'ó' | 'ô' | 'õ' | 'ø' => "o",
        'Ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ø' => "O",
        'ş' | 'ś' | 'š' => "s",
        'Ş' | 'Ś' | 'Š' => "S",
        'ü' | 'ù' | 'ú' | 'û' => "u",
        'Ü' | 'Ù' | 'Ú' | 'Û' => "U",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ą' => "A",
        'è' | 'é' | 'ê' | 'ë' | 'ę' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ę' => "E",
        'ñ' | 'ń' => "n",
        'Ñ' | 'Ń' => "N",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        'ž' | 'ź' | 'ż' => "z",
        'Ž' | 'Ź' | 'Ż' => "Z",
        'ł' => "l",
        'Ł' => "L",
        'đ' => "d",
        'Đ' => "D",
        'ř' => "r",
        'Ř' => "R",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => "'",
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' | '«' | '»' => "\"",
        '\u{2013}' | '\u{2014}' | '\u{2212}' => "-",
        '\u{2026}' => "...",
        '\u{2022}' | '\u{00B7}' => "*",
        '\u{00A0}' | '\u{2007}' | '\u{202F}' => " ",
        _ => return None,
    };
    Some(s)
}

/// Escape a transliterated string for a PDF literal `( ... )`.
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        if matches!(c, '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_ascii_transliterates_turkish() {
        assert_eq!(to_ascii("Çalışma Şubesi ğüö"), "Calisma Subesi guo");
    }

    #[test]
    fn test_to_ascii_normalises_punctuation_and_strips_rest() {
        assert_eq!(to_ascii("\u{201C}Hi\u{201D} \u{2013} 5€ ©2024"), "\"Hi\" - 5 2024");
        assert_eq!(to_ascii("a\tb\r\nc"), "a    b\nc");
        assert_eq!(to_ascii("日本"), "");
    }

    #[test]
    fn test_widths() {
        let size = 10.0;
        assert!((StandardFont::Regular.text_width("M", size) - 8.33).abs() < 0.01);
        assert!((StandardFont::Mono.text_width("iiii", size) - 24.0).abs() < 0.01);
        assert!(
            StandardFont::Bold.text_width("Total", size)
                > StandardFont::Regular.text_width("Total", size)
        );
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal(r"a(b)\c"), r"a\(b\)\\c");
    }
}

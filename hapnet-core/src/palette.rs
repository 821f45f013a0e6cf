use egui::Color32;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("expected six hex digits, got {0:?}")]
    Invalid(String),
}

/// Parses a `rrggbb` colour string, with or without a leading `#`.
pub fn parse_color(input: &str) -> Result<Color32, ColorParseError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorParseError::Invalid(input.to_owned()));
    }
    let channel = |range| u8::from_str_radix(&digits[range], 16).expect("checked hex");
    Ok(Color32::from_rgb(channel(0..2), channel(2..4), channel(4..6)))
}

/// An indexed colour table with a fallback past its end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub label: &'static str,
    colors: &'static [Color32],
    pub default: Color32,
    pub highlight: Color32,
}

const MAGENTA: Color32 = Color32::from_rgb(0xff, 0x00, 0xff);

const SPRING_COLORS: &[Color32] = &[
    Color32::from_rgb(0xfd, 0x7f, 0x6f),
    Color32::from_rgb(0x7e, 0xb0, 0xd5),
    Color32::from_rgb(0xb2, 0xe0, 0x61),
    Color32::from_rgb(0xbd, 0x7e, 0xbe),
    Color32::from_rgb(0xff, 0xb5, 0x5a),
    Color32::from_rgb(0xff, 0xee, 0x65),
    Color32::from_rgb(0xbe, 0xb9, 0xdb),
    Color32::from_rgb(0xfd, 0xcc, 0xe5),
    Color32::from_rgb(0x8b, 0xd3, 0xc7),
];

const PASTEL_COLORS: &[Color32] = &[
    Color32::from_rgb(0xfb, 0xb4, 0xae),
    Color32::from_rgb(0xb3, 0xcd, 0xe3),
    Color32::from_rgb(0xcc, 0xeb, 0xc5),
    Color32::from_rgb(0xde, 0xcb, 0xe4),
    Color32::from_rgb(0xfe, 0xd9, 0xa6),
    Color32::from_rgb(0xff, 0xff, 0xcc),
    Color32::from_rgb(0xe5, 0xd8, 0xbd),
    Color32::from_rgb(0xfd, 0xda, 0xec),
];

const SET1_COLORS: &[Color32] = &[
    Color32::from_rgb(0xe4, 0x1a, 0x1c),
    Color32::from_rgb(0x37, 0x7e, 0xb8),
    Color32::from_rgb(0x4d, 0xaf, 0x4a),
    Color32::from_rgb(0x98, 0x4e, 0xa3),
    Color32::from_rgb(0xff, 0x7f, 0x00),
    Color32::from_rgb(0xff, 0xff, 0x33),
    Color32::from_rgb(0xa6, 0x56, 0x28),
    Color32::from_rgb(0xf7, 0x81, 0xbf),
];

const TAB10_COLORS: &[Color32] = &[
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
    Color32::from_rgb(0xbc, 0xbd, 0x22),
    Color32::from_rgb(0x17, 0xbe, 0xcf),
];

const RETRO_METRO_COLORS: &[Color32] = &[
    Color32::from_rgb(0xea, 0x55, 0x45),
    Color32::from_rgb(0xf4, 0x6a, 0x9b),
    Color32::from_rgb(0xef, 0x9b, 0x20),
    Color32::from_rgb(0xed, 0xbf, 0x33),
    Color32::from_rgb(0xed, 0xe1, 0x5b),
    Color32::from_rgb(0xbd, 0xcf, 0x32),
    Color32::from_rgb(0x87, 0xbc, 0x45),
    Color32::from_rgb(0x27, 0xae, 0xef),
    Color32::from_rgb(0xb3, 0x3d, 0xc6),
];

const SPECTRUM_COLORS: &[Color32] = &[
    Color32::from_rgb(0x0f, 0xb5, 0xae),
    Color32::from_rgb(0x40, 0x46, 0xca),
    Color32::from_rgb(0xf6, 0x85, 0x11),
    Color32::from_rgb(0xde, 0x3d, 0x82),
    Color32::from_rgb(0x7e, 0x84, 0xfa),
    Color32::from_rgb(0x72, 0xe0, 0x6a),
    Color32::from_rgb(0x14, 0x7a, 0xf3),
    Color32::from_rgb(0x73, 0x26, 0xd3),
    Color32::from_rgb(0xe8, 0xc6, 0x00),
    Color32::from_rgb(0xcb, 0x5d, 0x00),
    Color32::from_rgb(0x00, 0x8f, 0x5d),
    Color32::from_rgb(0xbc, 0xe9, 0x31),
];

impl Palette {
    /// Colour at `index`, falling back to the palette default.
    #[must_use]
    pub fn color(&self, index: usize) -> Color32 {
        self.colors.get(index).copied().unwrap_or(self.default)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[must_use]
    pub fn all() -> [Self; 6] {
        [
            Self::spring(),
            Self::pastel(),
            Self::set1(),
            Self::tab10(),
            Self::retro_metro(),
            Self::spectrum(),
        ]
    }

    #[must_use]
    pub fn spring() -> Self {
        Self {
            label: "Spring",
            colors: SPRING_COLORS,
            default: Color32::GRAY,
            highlight: MAGENTA,
        }
    }

    #[must_use]
    pub fn pastel() -> Self {
        Self {
            label: "Pastel",
            colors: PASTEL_COLORS,
            default: Color32::from_rgb(0xf2, 0xf2, 0xf2),
            highlight: MAGENTA,
        }
    }

    #[must_use]
    pub fn set1() -> Self {
        Self {
            label: "Set1",
            colors: SET1_COLORS,
            default: Color32::from_rgb(0x99, 0x99, 0x99),
            highlight: Color32::from_rgb(0xf7, 0x81, 0xbf),
        }
    }

    #[must_use]
    pub fn tab10() -> Self {
        Self {
            label: "Tab10",
            colors: TAB10_COLORS,
            default: Color32::from_rgb(0xc7, 0xc7, 0xc7),
            highlight: Color32::from_rgb(0xe3, 0x77, 0xc2),
        }
    }

    #[must_use]
    pub fn retro_metro() -> Self {
        Self {
            label: "Retro Metro",
            colors: RETRO_METRO_COLORS,
            default: Color32::GRAY,
            highlight: Color32::from_rgb(0xf4, 0x6a, 0x9b),
        }
    }

    #[must_use]
    pub fn spectrum() -> Self {
        Self {
            label: "Spectrum",
            colors: SPECTRUM_COLORS,
            default: Color32::GRAY,
            highlight: Color32::from_rgb(0xde, 0x3d, 0x82),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::spring()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_and_without_marker() {
        assert_eq!(
            parse_color("#fd7f6f"),
            Ok(Color32::from_rgb(0xfd, 0x7f, 0x6f))
        );
        assert_eq!(
            parse_color("fd7f6f"),
            Ok(Color32::from_rgb(0xfd, 0x7f, 0x6f))
        );
        assert_eq!(
            parse_color("  #fd7f6f "),
            Ok(Color32::from_rgb(0xfd, 0x7f, 0x6f))
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_color("zzzzzz").is_err());
        assert!(parse_color("#fff").is_err());
        assert!(parse_color("").is_err());
        assert!(parse_color("#fd7f6f00").is_err());
    }

    #[test]
    fn every_builtin_table_is_populated() {
        for palette in Palette::all() {
            assert!(!palette.is_empty(), "{} has no colors", palette.label);
            assert_ne!(palette.color(0), palette.default);
        }
    }

    #[test]
    fn index_past_end_falls_back() {
        let palette = Palette::spring();
        assert_eq!(palette.color(0), Color32::from_rgb(0xfd, 0x7f, 0x6f));
        assert_eq!(palette.color(palette.len()), palette.default);
        assert_eq!(palette.color(1000), palette.default);
    }
}

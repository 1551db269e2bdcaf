//! Color parsing and luminance helpers
//!
//! Colors in schemes are `#rrggbb` strings. Tab colors picked in the GUI may
//! also arrive as CSS `rgb()` / `rgba()` strings, so [`Rgb::parse`] accepts
//! all three forms.

use std::fmt;

/// Fallback palette used when a scheme entry does not parse
pub const FALLBACK_PALETTE: [&str; 16] = [
    "#000000", "#800000", "#008000", "#808000", "#000080", "#800080", "#008080", "#c0c0c0",
    "#808080", "#ff0000", "#00ff00", "#ffff00", "#0000ff", "#ff00ff", "#00ffff", "#ffffff",
];

/// An opaque sRGB color with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Creates a color from channels
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb`, `#rrggbb`, `rgb(r, g, b)` or `rgba(r, g, b, a)`.
    /// The alpha of `rgba()` is ignored.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let inner = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let mut channels = inner.split(',').map(str::trim);
        let mut next = || -> Option<u8> {
            let v: f64 = channels.next()?.parse().ok()?;
            Some(v.round().clamp(0.0, 255.0) as u8)
        };
        Some(Self::new(next()?, next()?, next()?))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => Some(Self::new(
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|d| d * 17);
                Some(Self::new(digit(0)?, digit(1)?, digit(2)?))
            }
            _ => None,
        }
    }

    /// Channels scaled to `0.0..=1.0`
    #[must_use]
    pub fn to_unit(self) -> (f64, f64, f64) {
        (
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }

    /// Perceptual luminance (Y of YIQ), `0.0` black to `1.0` white
    #[must_use]
    pub fn yiq_luminance(self) -> f64 {
        let (r, g, b) = self.to_unit();
        0.299 * r + 0.587 * g + 0.114 * b
    }

    /// Rec. 709 relative luminance
    #[must_use]
    pub fn rec709_luminance(self) -> f64 {
        let (r, g, b) = self.to_unit();
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }

    /// `true` when the YIQ luminance is below one half
    #[must_use]
    pub fn is_dark(self) -> bool {
        self.yiq_luminance() < 0.5
    }

    /// CSS `rgba()` string with the given alpha
    #[must_use]
    pub fn to_rgba_css(self, alpha: f64) -> String {
        format!("rgba({}, {}, {}, {alpha})", self.r, self.g, self.b)
    }

    /// CSS `rgb()` string
    #[must_use]
    pub fn to_rgb_css(self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Background alpha for a user transparency percentage.
///
/// Darker backgrounds get up to a 30% boost so that the same slider value
/// looks similarly see-through on dark and light schemes, then the value is
/// mapped through a `x^1.6` curve. Unparsable colors are treated as black.
#[must_use]
pub fn adaptive_alpha(base_color: &str, transparency: f64) -> f64 {
    let luminance = Rgb::parse(base_color).map_or(0.0, Rgb::yiq_luminance);
    let adjusted = (transparency * (1.0 + 0.3 * (1.0 - luminance))).min(100.0);
    transparency_curve(adjusted)
}

/// The plain `1 - (t/100)^1.6` curve without luminance boost
#[must_use]
pub fn transparency_curve(transparency: f64) -> f64 {
    (1.0 - (transparency.max(0.0) / 100.0).powf(1.6)).clamp(0.0, 1.0)
}

/// Black or white text for a colored background (tab colors).
/// Unparsable input yields white.
#[must_use]
pub fn contrasting_text_color(background: &str) -> &'static str {
    match Rgb::parse(background) {
        Some(rgb) if rgb.rec709_luminance() > 0.5 => "#000000",
        _ => "#FFFFFF",
    }
}

/// Resolves a 16-entry palette. Unparsable and missing entries take the
/// matching [`FALLBACK_PALETTE`] color.
#[must_use]
pub fn resolve_palette(palette: &[String]) -> [Rgb; 16] {
    std::array::from_fn(|i| {
        palette
            .get(i)
            .and_then(|entry| Rgb::parse(entry))
            .or_else(|| Rgb::parse(FALLBACK_PALETTE[i]))
            .unwrap_or_default()
    })
}

impl Default for Rgb {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_forms() {
        assert_eq!(Rgb::parse("#ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::parse("#f80"), Some(Rgb::new(255, 136, 0)));
        assert_eq!(Rgb::parse("rgb(1, 2, 3)"), Some(Rgb::new(1, 2, 3)));
        assert_eq!(Rgb::parse("rgba(10,20,30,0.5)"), Some(Rgb::new(10, 20, 30)));
        assert_eq!(Rgb::parse("blue"), None);
        assert_eq!(Rgb::parse("#12345"), None);
    }

    #[test]
    fn display_is_lower_hex() {
        assert_eq!(Rgb::new(0xab, 0xcd, 0x01).to_string(), "#abcd01");
    }

    #[test]
    fn alpha_is_opaque_without_transparency() {
        assert!((adaptive_alpha("#000000", 0.0) - 1.0).abs() < f64::EPSILON);
        assert!(adaptive_alpha("#000000", 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dark_backgrounds_get_boosted() {
        let dark = adaptive_alpha("#000000", 40.0);
        let light = adaptive_alpha("#ffffff", 40.0);
        assert!(dark < light);
        let expected_light = 1.0 - 0.4_f64.powf(1.6);
        assert!((light - expected_light).abs() < 1e-9);
    }

    #[test]
    fn contrasting_text() {
        assert_eq!(contrasting_text_color("#ffffff"), "#000000");
        assert_eq!(contrasting_text_color("rgb(0, 0, 128)"), "#FFFFFF");
        assert_eq!(contrasting_text_color("nonsense"), "#FFFFFF");
    }

    #[test]
    fn palette_fallbacks() {
        let palette = vec!["#111111".to_string(), "bogus".to_string()];
        let resolved = resolve_palette(&palette);
        assert_eq!(resolved[0], Rgb::new(0x11, 0x11, 0x11));
        assert_eq!(resolved[1], Rgb::new(0x80, 0, 0));
        for (color, fallback) in resolved.iter().zip(FALLBACK_PALETTE).skip(2) {
            assert_eq!(Some(*color), Rgb::parse(fallback), "{fallback}");
        }
        assert_ne!(resolved[15], Rgb::new(0, 0, 0));
    }
}

//! Paint value parsing for artwork markup.

use super::SerializableColor;
use peniko::Color;
use peniko::color::{DynamicColor, parse_color as parse_css_color};

/// Parse a paint value.
///
/// Returns `Some(None)` for `none`, `Some(Some(color))` for any CSS color
/// (hex, `rgb()`, `hsl()`, named colors, `transparent`, ...) and `None` when
/// the value cannot be interpreted, e.g. `url(#gradient)` or `currentColor`.
pub fn parse_color(value: &str) -> Option<Option<SerializableColor>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    let parsed = parse_css_color(&value.to_ascii_lowercase()).ok()?;
    Some(Some(to_serializable(parsed)))
}

fn to_serializable(color: DynamicColor) -> SerializableColor {
    let srgb: Color = color.to_alpha_color();
    srgb.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        assert_eq!(
            parse_color("#f00"),
            Some(Some(SerializableColor::new(255, 0, 0, 255)))
        );
        assert_eq!(
            parse_color("#1a2b3c"),
            Some(Some(SerializableColor::new(0x1a, 0x2b, 0x3c, 255)))
        );
        assert_eq!(
            parse_color("#1a2b3c80"),
            Some(Some(SerializableColor::new(0x1a, 0x2b, 0x3c, 0x80)))
        );
        assert_eq!(parse_color("#12"), None);
    }

    #[test]
    fn test_none_and_named() {
        assert_eq!(parse_color("none"), Some(None));
        assert_eq!(parse_color(" White "), Some(Some(SerializableColor::white())));
        assert_eq!(
            parse_color("lightgray"),
            Some(Some(SerializableColor::new(211, 211, 211, 255)))
        );
        assert_eq!(
            parse_color("silver"),
            Some(Some(SerializableColor::new(192, 192, 192, 255)))
        );
        assert_eq!(parse_color("transparent").map(|c| c.map(|c| c.a)), Some(Some(0)));
        assert_eq!(parse_color("chartreuse-ish"), None);
    }

    #[test]
    fn test_functional_notations() {
        assert_eq!(
            parse_color("rgb(10, 20, 30)"),
            Some(Some(SerializableColor::new(10, 20, 30, 255)))
        );
        assert_eq!(
            parse_color("rgba(10,20,30,0.5)"),
            Some(Some(SerializableColor::new(10, 20, 30, 128)))
        );
        assert_eq!(
            parse_color("hsl(0, 100%, 50%)"),
            Some(Some(SerializableColor::new(255, 0, 0, 255)))
        );
    }

    #[test]
    fn test_unsupported_paints() {
        assert_eq!(parse_color("url(#grad)"), None);
        assert_eq!(parse_color("currentColor"), None);
    }
}

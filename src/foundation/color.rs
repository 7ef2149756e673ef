use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::math::premul_rgba8;

/// Straight-alpha RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(self) -> bool {
        self.a == 0
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_rgba8_premul(self) -> [u8; 4] {
        premul_rgba8(self.r, self.g, self.b, self.a)
    }

    /// Same color with its alpha scaled by `opacity` in `[0, 1]`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let op = opacity.clamp(0.0, 1.0);
        Self {
            a: ((self.a as f32) * op).round() as u8,
            ..self
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            RgbaObj {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "one")]
                a: f64,
            },
            Arr(Vec<f64>),
        }

        fn one() -> f64 {
            1.0
        }

        fn unit_to_u8(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => parse_color(&s).map_err(serde::de::Error::custom),
            Repr::RgbaObj { r, g, b, a } => Ok(Self::rgba(
                unit_to_u8(r),
                unit_to_u8(g),
                unit_to_u8(b),
                unit_to_u8(a),
            )),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgb(unit_to_u8(*r), unit_to_u8(*g), unit_to_u8(*b))),
                [r, g, b, a] => Ok(Self::rgba(
                    unit_to_u8(*r),
                    unit_to_u8(*g),
                    unit_to_u8(*b),
                    unit_to_u8(*a),
                )),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

fn parse_color(s: &str) -> Result<Color, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("transparent") {
        return Ok(Color::TRANSPARENT);
    }
    let hex = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    if !hex.is_ascii() {
        return Err(format!("invalid color \"{s}\""));
    }

    match hex.len() {
        3 => {
            let nibble = |i: usize| -> Result<u8, String> {
                let v = hex_byte(&hex[i..i + 1])?;
                Ok(v * 17)
            };
            Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?))
        }
        6 => Ok(Color::rgb(
            hex_byte(&hex[0..2])?,
            hex_byte(&hex[2..4])?,
            hex_byte(&hex[4..6])?,
        )),
        8 => Ok(Color::rgba(
            hex_byte(&hex[0..2])?,
            hex_byte(&hex[2..4])?,
            hex_byte(&hex[4..6])?,
            hex_byte(&hex[6..8])?,
        )),
        _ => Err(
            "color must be #RGB, #RRGGBB, #RRGGBBAA or \"transparent\" (case-insensitive)"
                .to_owned(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hex_forms() {
        let c: Color = serde_json::from_value(json!("#ff0000")).unwrap();
        assert_eq!(c, Color::rgb(255, 0, 0));

        let c: Color = serde_json::from_value(json!("#0000ff80")).unwrap();
        assert_eq!(c, Color::rgba(0, 0, 255, 128));

        let c: Color = serde_json::from_value(json!("#FFF")).unwrap();
        assert_eq!(c, Color::WHITE);
    }

    #[test]
    fn parses_transparent_keyword() {
        let c: Color = "Transparent".parse().unwrap();
        assert!(c.is_transparent());
    }

    #[test]
    fn parses_unit_object_and_array() {
        let c: Color = serde_json::from_value(json!({"r": 1.0, "g": 0.0, "b": 0.0})).unwrap();
        assert_eq!(c, Color::rgb(255, 0, 0));

        let c: Color = serde_json::from_value(json!([0.0, 0.0, 0.0, 0.0])).unwrap();
        assert_eq!(c, Color::TRANSPARENT);
    }

    #[test]
    fn rejects_garbage() {
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
        assert!(serde_json::from_value::<Color>(json!([1.0])).is_err());
    }

    #[test]
    fn serializes_as_hex() {
        assert_eq!(
            serde_json::to_value(Color::rgb(1, 2, 255)).unwrap(),
            json!("#0102ff")
        );
        assert_eq!(Color::rgba(0, 0, 0, 0x80).to_string(), "#00000080");
    }

    #[test]
    fn with_opacity_scales_alpha() {
        assert_eq!(Color::WHITE.with_opacity(0.5).a, 128);
        assert_eq!(Color::WHITE.with_opacity(2.0).a, 255);
    }
}

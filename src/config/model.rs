use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::presets::FONTS;
use crate::foundation::color::Color;
use crate::foundation::error::{LoopError, LoopResult};

/// Case mapping applied to every line before measuring and drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
}

impl TextTransform {
    pub fn apply(self, line: &str) -> String {
        match self {
            Self::None => line.to_owned(),
            Self::Uppercase => line.to_uppercase(),
            Self::Lowercase => line.to_lowercase(),
        }
    }
}

/// Direction the text band travels across the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Left,
    Right,
}

/// Everything needed to draw one frame of the loop.
///
/// Immutable during a frame. Updates arrive as whole-object replacements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    /// Raw text; line breaks split it into stacked lines.
    pub text: String,
    pub font_family: String,
    /// Font size in logical px.
    pub font_size: f64,
    /// Extra advance per character in logical px (may be negative).
    pub letter_spacing: f64,
    /// Line height as a multiple of `font_size`.
    pub line_height: f64,
    pub text_transform: TextTransform,

    pub text_color: Color,
    #[serde(alias = "backgroundColor")]
    pub bg_color: Color,
    pub shadow_color: Color,
    pub shadow_blur: f64,
    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
    /// Global alpha in `[0, 1]`.
    pub opacity: f64,

    /// Stroke outlines instead of filling glyphs.
    pub is_outline: bool,

    /// Logical px advanced per frame.
    pub speed: f64,
    pub direction: Direction,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            text: "INFINITE LOOP ".to_owned(),
            font_family: FONTS[0].family.to_owned(),
            font_size: 120.0,
            letter_spacing: 0.0,
            line_height: 1.2,
            text_transform: TextTransform::None,
            text_color: Color::WHITE,
            bg_color: Color::BLACK,
            shadow_color: Color::BLACK,
            shadow_blur: 0.0,
            shadow_offset_x: 4.0,
            shadow_offset_y: 4.0,
            opacity: 1.0,
            is_outline: false,
            speed: 2.0,
            direction: Direction::Left,
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(s: &str) -> LoopResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> LoopResult<Self> {
        use anyhow::Context as _;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> LoopResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Raw lines of `text`. Empty lines are kept; they still occupy a line slot.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }

    pub fn validate(&self) -> LoopResult<()> {
        let finite = [
            ("fontSize", self.font_size),
            ("letterSpacing", self.letter_spacing),
            ("lineHeight", self.line_height),
            ("shadowBlur", self.shadow_blur),
            ("shadowOffsetX", self.shadow_offset_x),
            ("shadowOffsetY", self.shadow_offset_y),
            ("opacity", self.opacity),
            ("speed", self.speed),
        ];
        for (name, v) in finite {
            if !v.is_finite() {
                return Err(LoopError::validation(format!("{name} must be finite")));
            }
        }

        if self.font_size <= 0.0 {
            return Err(LoopError::validation("fontSize must be > 0"));
        }
        if self.line_height <= 0.0 {
            return Err(LoopError::validation("lineHeight must be > 0"));
        }
        if self.speed < 0.0 {
            return Err(LoopError::validation("speed must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(LoopError::validation("opacity must be in [0, 1]"));
        }
        if self.shadow_blur < 0.0 {
            return Err(LoopError::validation("shadowBlur must be >= 0"));
        }
        Ok(())
    }

    /// Clamp every numeric field into the range the settings form offers.
    ///
    /// Non-finite values fall back to the default for that field.
    pub fn clamped(&self) -> Self {
        let d = Self::default();
        let clamp = |v: f64, lo: f64, hi: f64, fallback: f64| {
            if v.is_finite() { v.clamp(lo, hi) } else { fallback }
        };
        Self {
            font_size: clamp(self.font_size, 20.0, 400.0, d.font_size),
            letter_spacing: clamp(self.letter_spacing, -20.0, 100.0, d.letter_spacing),
            line_height: clamp(self.line_height, 0.5, 3.0, d.line_height),
            shadow_blur: clamp(self.shadow_blur, 0.0, 50.0, d.shadow_blur),
            shadow_offset_x: clamp(self.shadow_offset_x, -50.0, 50.0, d.shadow_offset_x),
            shadow_offset_y: clamp(self.shadow_offset_y, -50.0, 50.0, d.shadow_offset_y),
            speed: clamp(self.speed, 0.0, 50.0, d.speed),
            opacity: clamp(self.opacity, 0.0, 1.0, d.opacity),
            ..self.clone()
        }
    }

    /// Copy of this config with `text` replaced.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

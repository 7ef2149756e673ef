use std::borrow::Cow;
use std::path::Path;

use crate::foundation::error::{LoopError, LoopResult};
use crate::layout::metrics::{TextMeasurer, TextStyle};

/// One glyph positioned relative to the line's layout origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionedGlyph {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// Glyphs sharing one font face and size.
#[derive(Clone, Debug)]
pub struct ShapedRun {
    /// Identity of the font blob, stable for the lifetime of the engine.
    pub font_id: u64,
    pub font_index: u32,
    pub font_bytes: parley::fontique::Blob<u8>,
    pub font_size: f32,
    pub glyphs: Vec<PositionedGlyph>,
}

/// A single shaped line.
#[derive(Clone, Debug, Default)]
pub struct ShapedLine {
    pub runs: Vec<ShapedRun>,
    /// Full advance including trailing whitespace.
    pub width: f32,
    /// Vertical middle of the glyph box in layout coordinates.
    pub middle: f32,
}

/// Stateful helper building Parley layouts for single lines of text.
///
/// Text is shaped bold with the configured family stack, size and letter spacing.
/// Families resolve against system fonts plus anything registered through
/// [`TextEngine::register_font_bytes`].
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register font bytes and return the family names they provide.
    pub fn register_font_bytes(&mut self, font_bytes: Vec<u8>) -> LoopResult<Vec<String>> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes), None);
        if families.is_empty() {
            return Err(LoopError::validation(
                "no font families registered from font bytes",
            ));
        }

        let names = families
            .iter()
            .filter_map(|(id, _)| {
                self.font_ctx
                    .collection
                    .family_name(*id)
                    .map(str::to_owned)
            })
            .collect::<Vec<_>>();
        tracing::debug!(families = ?names, "registered font");
        Ok(names)
    }

    pub fn register_font_file(&mut self, path: &Path) -> LoopResult<Vec<String>> {
        use anyhow::Context as _;
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        self.register_font_bytes(bytes)
    }

    fn layout_line(&mut self, text: &str, style: &TextStyle) -> parley::Layout<()> {
        let size = if style.font_size.is_finite() && style.font_size > 0.0 {
            style.font_size as f32
        } else {
            1.0
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(style.font_family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::BOLD,
        ));
        builder.push_default(parley::style::StyleProperty::LetterSpacing(
            style.letter_spacing as f32,
        ));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    /// Shape `text` as one line and collect its glyph runs.
    pub fn shape_line(&mut self, text: &str, style: &TextStyle) -> ShapedLine {
        let layout = self.layout_line(text, style);

        let mut shaped = ShapedLine {
            runs: Vec::new(),
            width: layout.full_width(),
            middle: 0.0,
        };

        for (line_index, line) in layout.lines().enumerate() {
            if line_index == 0 {
                let m = line.metrics();
                shaped.middle = m.baseline + (m.descent - m.ascent) / 2.0;
            }
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let font = run.run().font();
                shaped.runs.push(ShapedRun {
                    font_id: font.data.id(),
                    font_index: font.index,
                    font_bytes: font.data.clone(),
                    font_size: run.run().font_size(),
                    glyphs: run
                        .positioned_glyphs()
                        .map(|g| PositionedGlyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        })
                        .collect(),
                });
            }
        }

        shaped
    }
}

impl TextMeasurer for TextEngine {
    fn measure(&mut self, text: &str, style: &TextStyle) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        f64::from(self.layout_line(text, style).full_width())
    }
}

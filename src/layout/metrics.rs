use crate::config::model::RenderConfig;

/// Width used for the repeating unit when the measured text has no extent.
pub const FALLBACK_UNIT_WIDTH: f64 = 100.0;

/// Appended to each line before measuring; reserves the gap between consecutive repetitions.
pub const LOOP_SEPARATOR: &str = " ";

/// Font selection and spacing used to measure and draw a line.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// CSS-like family stack, e.g. `"Inter", sans-serif`.
    pub font_family: String,
    pub font_size: f64,
    pub letter_spacing: f64,
}

impl TextStyle {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            font_family: config.font_family.clone(),
            font_size: config.font_size,
            letter_spacing: config.letter_spacing,
        }
    }
}

/// Text measurement capability. A pure query apart from internal caches.
pub trait TextMeasurer {
    /// Advance width of `text` in logical px.
    fn measure(&mut self, text: &str, style: &TextStyle) -> f64;
}

/// Font-free measurer: every character advances `advance_em * font_size + letter_spacing`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedAdvanceMeasurer {
    pub advance_em: f64,
}

impl FixedAdvanceMeasurer {
    pub fn new(advance_em: f64) -> Self {
        Self { advance_em }
    }
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        Self { advance_em: 0.5 }
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn measure(&mut self, text: &str, style: &TextStyle) -> f64 {
        let n = text.chars().count() as f64;
        n * (self.advance_em * style.font_size + style.letter_spacing)
    }
}

/// Derived per-frame geometry of the repeating block.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutResult {
    /// Lines after the configured text transform.
    pub transformed_lines: Vec<String>,
    /// Period of the loop: widest line plus separator, in logical px.
    pub unit_width: f64,
    pub line_height_px: f64,
    pub block_height: f64,
    /// Middle-baseline y of the first line.
    pub start_y: f64,
}

impl LayoutResult {
    /// Middle-baseline y of line `index`.
    pub fn line_y(&self, index: usize) -> f64 {
        self.start_y + (index as f64) * self.line_height_px
    }
}

/// Apply `config.text_transform` to every raw line of `config.text`.
pub fn transformed_lines(config: &RenderConfig) -> Vec<String> {
    config
        .lines()
        .map(|line| config.text_transform.apply(line))
        .collect()
}

/// Width of one repeating unit for `lines`, with the zero-width fallback applied.
///
/// Empty lines are not measured: a block made only of empty lines has no extent and takes the
/// fallback width.
pub fn unit_width<M: TextMeasurer + ?Sized>(
    lines: &[String],
    style: &TextStyle,
    measurer: &mut M,
) -> f64 {
    let mut max_width = 0.0f64;
    let mut probe = String::new();
    for line in lines.iter().filter(|l| !l.is_empty()) {
        probe.clear();
        probe.push_str(line);
        probe.push_str(LOOP_SEPARATOR);
        let w = measurer.measure(&probe, style);
        if w > max_width {
            max_width = w;
        }
    }

    if max_width > 0.0 && max_width.is_finite() {
        max_width
    } else {
        FALLBACK_UNIT_WIDTH
    }
}

/// Compute the layout of the repeating block on a `surface_width` x `surface_height` surface.
///
/// Never fails: degenerate input (empty text, zero-width glyphs) falls back to
/// [`FALLBACK_UNIT_WIDTH`].
pub fn compute_layout<M: TextMeasurer + ?Sized>(
    config: &RenderConfig,
    _surface_width: f64,
    surface_height: f64,
    measurer: &mut M,
) -> LayoutResult {
    let transformed_lines = transformed_lines(config);
    let style = TextStyle::from_config(config);
    let unit_width = unit_width(&transformed_lines, &style, measurer);

    let line_height_px = config.font_size * config.line_height;
    let block_height = line_height_px * transformed_lines.len() as f64;
    let start_y = (surface_height - block_height) / 2.0 + line_height_px / 2.0;

    LayoutResult {
        transformed_lines,
        unit_width,
        line_height_px,
        block_height,
        start_y,
    }
}

use crate::compositor::scroll::{ScrollState, visible_block_xs};
use crate::config::model::RenderConfig;
use crate::foundation::color::Color;
use crate::foundation::core::SurfaceDesc;
use crate::foundation::error::LoopResult;
use crate::layout::metrics::{LayoutResult, TextMeasurer, TextStyle};
use crate::render::backend::FrameRGBA;

/// Line width used when glyphs are stroked instead of filled, in logical px.
pub const OUTLINE_STROKE_WIDTH: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PaintMode {
    Fill,
    Stroke { width: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shadow {
    pub color: Color,
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Shadow {
    pub const NONE: Self = Self {
        color: Color::TRANSPARENT,
        blur: 0.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// A shadow paints something only when it has color and is displaced or blurred.
    pub fn is_visible(&self) -> bool {
        !self.color.is_transparent()
            && (self.blur > 0.0 || self.offset_x != 0.0 || self.offset_y != 0.0)
    }
}

/// Transient paint state applied before drawing text.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintStyle {
    pub text: TextStyle,
    pub mode: PaintMode,
    pub color: Color,
    pub shadow: Shadow,
    /// Global alpha in `[0, 1]`.
    pub opacity: f64,
}

impl PaintStyle {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            text: TextStyle::from_config(config),
            mode: if config.is_outline {
                PaintMode::Stroke {
                    width: OUTLINE_STROKE_WIDTH,
                }
            } else {
                PaintMode::Fill
            },
            color: config.text_color,
            shadow: Shadow {
                color: config.shadow_color,
                blur: config.shadow_blur,
                offset_x: config.shadow_offset_x,
                offset_y: config.shadow_offset_y,
            },
            opacity: config.opacity,
        }
    }
}

/// A 2D drawing target in logical pixels.
///
/// Text positions use a middle baseline: `y` is the vertical middle of the line's glyph box.
pub trait Surface: TextMeasurer {
    fn desc(&self) -> SurfaceDesc;

    /// Re-attach at a new size / pixel density.
    fn resize(&mut self, desc: SurfaceDesc) -> LoopResult<()>;

    /// Fill the whole visible rectangle.
    fn clear(&mut self, color: Color);

    fn apply_style(&mut self, style: &PaintStyle);

    fn draw_text(&mut self, text: &str, x: f64, y: f64);

    /// Drop shadow and alpha so they cannot leak into the next clear.
    fn reset_paint_state(&mut self);

    /// Finish the current paint and hand out its pixels, if this surface has any.
    fn present(&mut self) -> Option<FrameRGBA>;
}

/// Paint one frame and return the advanced scroll state.
///
/// Sequence: clear, apply style, advance the offset, draw every visible repetition of the
/// block, reset transient paint state. `config` is only read.
pub fn render_frame<S: Surface + ?Sized>(
    config: &RenderConfig,
    layout: &LayoutResult,
    state: ScrollState,
    surface: &mut S,
) -> ScrollState {
    let surface_width = surface.desc().logical_width();

    surface.clear(config.bg_color);
    surface.apply_style(&PaintStyle::from_config(config));

    let state = state.advance(config.speed, config.direction, layout.unit_width);

    for block_x in visible_block_xs(state.offset, layout.unit_width, surface_width) {
        for (line_index, line) in layout.transformed_lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            surface.draw_text(line, block_x, layout.line_y(line_index));
        }
    }

    surface.reset_paint_state();
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Direction;
    use crate::layout::metrics::compute_layout;
    use crate::render::recording::{RecordingSurface, SurfaceCommand};

    fn surface(width: u32, height: u32) -> RecordingSurface {
        RecordingSurface::new(SurfaceDesc::new(width, height, 1.0).unwrap())
    }

    fn frame(config: &RenderConfig, state: ScrollState, s: &mut RecordingSurface) -> ScrollState {
        let desc = s.desc();
        let layout = compute_layout(
            config,
            desc.logical_width(),
            desc.logical_height(),
            s,
        );
        render_frame(config, &layout, state, s)
    }

    #[test]
    fn paint_sequence_is_clear_style_text_reset() {
        let config = RenderConfig::default();
        let mut s = surface(640, 360);
        let _ = frame(&config, ScrollState::new(), &mut s);

        let cmds = s.commands();
        assert_eq!(cmds.first(), Some(&SurfaceCommand::Clear(config.bg_color)));
        assert!(matches!(cmds.get(1), Some(SurfaceCommand::Style(_))));
        assert_eq!(cmds.last(), Some(&SurfaceCommand::ResetPaint));
        assert!(
            cmds[2..cmds.len() - 1]
                .iter()
                .all(|c| matches!(c, SurfaceCommand::Text { .. }))
        );
    }

    #[test]
    fn draws_each_visible_block_at_offset_multiples() {
        // "AB " at 100px with 0.5em advance = 150px unit.
        let config = RenderConfig {
            font_size: 100.0,
            speed: 10.0,
            ..RenderConfig::default().with_text("AB")
        };
        let mut s = surface(400, 200);
        let state = frame(&config, ScrollState::new(), &mut s);
        assert_eq!(state.offset, -10.0);

        let xs: Vec<f64> = s.texts().map(|(_, x, _)| x).collect();
        assert_eq!(xs, vec![-10.0, 140.0, 290.0]);
    }

    #[test]
    fn multi_line_blocks_stack_lines() {
        let config = RenderConfig {
            font_size: 100.0,
            line_height: 1.2,
            speed: 0.0,
            ..RenderConfig::default().with_text("A\nBB")
        };
        let mut s = surface(100, 480);
        let _ = frame(&config, ScrollState::new(), &mut s);
        let texts: Vec<(String, f64, f64)> = s.texts().map(|(t, x, y)| (t.to_owned(), x, y)).collect();
        assert_eq!(
            texts,
            vec![("A".to_owned(), 0.0, 180.0), ("BB".to_owned(), 0.0, 300.0)]
        );
    }

    #[test]
    fn empty_text_still_animates_with_fallback_unit() {
        let config = RenderConfig {
            speed: 30.0,
            ..RenderConfig::default().with_text("")
        };
        let mut s = surface(300, 100);
        let mut state = ScrollState::new();
        for _ in 0..4 {
            state = frame(&config, state, &mut s);
        }
        assert_eq!(state.unit_width, Some(100.0));
        // -120 wrapped by one fallback unit.
        assert!((state.offset - (-20.0)).abs() < 1e-9);
        assert_eq!(s.texts().count(), 0);
    }

    #[test]
    fn culling_never_changes_what_is_visible() {
        let config = RenderConfig {
            font_size: 40.0,
            speed: 3.3,
            direction: Direction::Right,
            ..RenderConfig::default().with_text("loop")
        };
        let mut s = surface(500, 100);
        let mut state = ScrollState::new();
        for _ in 0..200 {
            s.clear_log();
            state = frame(&config, state, &mut s);
            let unit = state.unit_width.unwrap();
            let xs: Vec<f64> = s.texts().map(|(_, x, _)| x).collect();
            // Leftmost drawn block covers x=0, the rightmost reaches past the right edge.
            let first = xs.first().copied().unwrap();
            let last = xs.last().copied().unwrap();
            assert!(first <= 0.0 && first + unit > 0.0);
            assert!(last + unit >= 500.0);
        }
    }

    #[test]
    fn outline_mode_strokes_with_fixed_width() {
        let config = RenderConfig {
            is_outline: true,
            ..RenderConfig::default()
        };
        let style = PaintStyle::from_config(&config);
        assert_eq!(
            style.mode,
            PaintMode::Stroke {
                width: OUTLINE_STROKE_WIDTH
            }
        );
        assert_eq!(PaintStyle::from_config(&RenderConfig::default()).mode, PaintMode::Fill);
    }

    #[test]
    fn shadow_visibility() {
        let mut shadow = PaintStyle::from_config(&RenderConfig::default()).shadow;
        assert!(shadow.is_visible());
        shadow.offset_x = 0.0;
        shadow.offset_y = 0.0;
        assert!(!shadow.is_visible());
        shadow.blur = 3.0;
        assert!(shadow.is_visible());
        assert!(!Shadow::NONE.is_visible());
    }

    #[test]
    fn config_is_not_mutated_by_rendering() {
        let config = RenderConfig::default();
        let before = config.clone();
        let mut s = surface(320, 200);
        let _ = frame(&config, ScrollState::new(), &mut s);
        assert_eq!(config, before);
    }
}

use crate::compositor::frame::{PaintStyle, Surface};
use crate::foundation::color::Color;
use crate::foundation::core::SurfaceDesc;
use crate::foundation::error::LoopResult;
use crate::layout::metrics::{FixedAdvanceMeasurer, TextMeasurer, TextStyle};
use crate::render::backend::FrameRGBA;

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCommand {
    Clear(Color),
    Style(PaintStyle),
    Text { text: String, x: f64, y: f64 },
    ResetPaint,
}

/// Surface that records paint commands instead of rasterizing.
///
/// Measures with a [`FixedAdvanceMeasurer`] unless another measurer is supplied.
pub struct RecordingSurface<M: TextMeasurer = FixedAdvanceMeasurer> {
    desc: SurfaceDesc,
    measurer: M,
    commands: Vec<SurfaceCommand>,
    frames_presented: u64,
}

impl RecordingSurface<FixedAdvanceMeasurer> {
    pub fn new(desc: SurfaceDesc) -> Self {
        Self::with_measurer(desc, FixedAdvanceMeasurer::default())
    }
}

impl<M: TextMeasurer> RecordingSurface<M> {
    pub fn with_measurer(desc: SurfaceDesc, measurer: M) -> Self {
        Self {
            desc,
            measurer,
            commands: Vec::new(),
            frames_presented: 0,
        }
    }

    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.commands
    }

    pub fn clear_log(&mut self) {
        self.commands.clear();
    }

    /// Text draws as `(text, x, y)`.
    pub fn texts(&self) -> impl Iterator<Item = (&str, f64, f64)> {
        self.commands.iter().filter_map(|c| match c {
            SurfaceCommand::Text { text, x, y } => Some((text.as_str(), *x, *y)),
            _ => None,
        })
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl<M: TextMeasurer> TextMeasurer for RecordingSurface<M> {
    fn measure(&mut self, text: &str, style: &TextStyle) -> f64 {
        self.measurer.measure(text, style)
    }
}

impl<M: TextMeasurer> Surface for RecordingSurface<M> {
    fn desc(&self) -> SurfaceDesc {
        self.desc
    }

    fn resize(&mut self, desc: SurfaceDesc) -> LoopResult<()> {
        desc.validate()?;
        self.desc = desc;
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(SurfaceCommand::Clear(color));
    }

    fn apply_style(&mut self, style: &PaintStyle) {
        self.commands.push(SurfaceCommand::Style(style.clone()));
    }

    fn draw_text(&mut self, text: &str, x: f64, y: f64) {
        self.commands.push(SurfaceCommand::Text {
            text: text.to_owned(),
            x,
            y,
        });
    }

    fn reset_paint_state(&mut self) {
        self.commands.push(SurfaceCommand::ResetPaint);
    }

    fn present(&mut self) -> Option<FrameRGBA> {
        self.frames_presented += 1;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_call_order() {
        let mut s = RecordingSurface::new(SurfaceDesc::default());
        s.clear(Color::BLACK);
        s.draw_text("hi", 1.0, 2.0);
        s.reset_paint_state();
        assert_eq!(s.commands().len(), 3);
        assert_eq!(s.texts().collect::<Vec<_>>(), vec![("hi", 1.0, 2.0)]);
        s.clear_log();
        assert!(s.commands().is_empty());
    }

    #[test]
    fn resize_validates() {
        let mut s = RecordingSurface::new(SurfaceDesc::default());
        assert!(
            s.resize(SurfaceDesc {
                width: 0,
                height: 1,
                scale: 1.0
            })
            .is_err()
        );
        let d = SurfaceDesc::new(10, 20, 2.0).unwrap();
        s.resize(d).unwrap();
        assert_eq!(s.desc(), d);
    }
}

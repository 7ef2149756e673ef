use std::collections::HashMap;

use crate::compositor::frame::{PaintMode, PaintStyle, Shadow, Surface};
use crate::foundation::color::Color;
use crate::foundation::core::{Affine, SurfaceDesc};
use crate::foundation::error::{LoopError, LoopResult};
use crate::layout::metrics::{TextMeasurer, TextStyle};
use crate::render::backend::FrameRGBA;
use crate::render::blur::{blur_rgba8_premul, shadow_blur_params};
use crate::render::composite::{fill_in_place, over_in_place};
use crate::text::engine::{ShapedLine, TextEngine};

/// CPU raster surface powered by `vello_cpu`.
///
/// The backing pixmap is `logical size x scale`; drawing coordinates stay logical. Each frame is
/// assembled from three layers: the opaque background, a blurred shadow layer and the text
/// layer. Global opacity is baked into both text and shadow layers while they are drawn.
pub struct CpuSurface {
    desc: SurfaceDesc,
    width: u16,
    height: u16,
    engine: TextEngine,
    font_cache: HashMap<(u64, u32), vello_cpu::peniko::FontData>,
    shape_cache: HashMap<String, ShapedLine>,

    background: [u8; 4],
    style: Option<PaintStyle>,
    text_ctx: vello_cpu::RenderContext,
    shadow_ctx: vello_cpu::RenderContext,
    opacity_layers: bool,
    text_dirty: bool,
    shadow_dirty: bool,
    shadow_blur_px: f64,
}

impl CpuSurface {
    pub fn new(desc: SurfaceDesc) -> LoopResult<Self> {
        Self::with_engine(desc, TextEngine::new())
    }

    pub fn with_engine(desc: SurfaceDesc, engine: TextEngine) -> LoopResult<Self> {
        let (width, height) = physical_u16(&desc)?;
        Ok(Self {
            desc,
            width,
            height,
            engine,
            font_cache: HashMap::new(),
            shape_cache: HashMap::new(),
            background: [0, 0, 0, 0],
            style: None,
            text_ctx: vello_cpu::RenderContext::new(width, height),
            shadow_ctx: vello_cpu::RenderContext::new(width, height),
            opacity_layers: false,
            text_dirty: false,
            shadow_dirty: false,
            shadow_blur_px: 0.0,
        })
    }

    /// Text engine, e.g. to register extra font files.
    ///
    /// Shaped lines are dropped, since the caller may change which fonts resolve.
    pub fn engine_mut(&mut self) -> &mut TextEngine {
        self.shape_cache.clear();
        &mut self.engine
    }

    fn begin_layers(&mut self) {
        self.text_ctx = vello_cpu::RenderContext::new(self.width, self.height);
        self.shadow_ctx = vello_cpu::RenderContext::new(self.width, self.height);
        self.opacity_layers = false;
        self.text_dirty = false;
        self.shadow_dirty = false;
        self.shadow_blur_px = 0.0;
    }

    fn pop_opacity_layers(&mut self) {
        if self.opacity_layers {
            self.text_ctx.pop_layer();
            self.shadow_ctx.pop_layer();
            self.opacity_layers = false;
        }
    }

    fn font_for(&mut self, run: &crate::text::engine::ShapedRun) -> vello_cpu::peniko::FontData {
        self.font_cache
            .entry((run.font_id, run.font_index))
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(run.font_bytes.data().to_vec()),
                    run.font_index,
                )
            })
            .clone()
    }

    fn render_layer(&self, ctx: &mut vello_cpu::RenderContext) -> vello_cpu::Pixmap {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        pixmap
    }
}

impl TextMeasurer for CpuSurface {
    fn measure(&mut self, text: &str, style: &TextStyle) -> f64 {
        self.engine.measure(text, style)
    }
}

impl Surface for CpuSurface {
    fn desc(&self) -> SurfaceDesc {
        self.desc
    }

    fn resize(&mut self, desc: SurfaceDesc) -> LoopResult<()> {
        let (width, height) = physical_u16(&desc)?;
        tracing::debug!(
            logical_w = desc.width,
            logical_h = desc.height,
            scale = desc.scale,
            "cpu surface attached"
        );
        self.desc = desc;
        self.width = width;
        self.height = height;
        self.begin_layers();
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.background = color.to_rgba8_premul();
        self.begin_layers();
    }

    fn apply_style(&mut self, style: &PaintStyle) {
        self.pop_opacity_layers();
        if self.style.as_ref().map(|s| &s.text) != Some(&style.text) {
            self.shape_cache.clear();
        }

        if style.opacity < 1.0 {
            let op = style.opacity.clamp(0.0, 1.0) as f32;
            self.text_ctx.push_opacity_layer(op);
            self.shadow_ctx.push_opacity_layer(op);
            self.opacity_layers = true;
        }

        if let PaintMode::Stroke { width } = style.mode {
            let stroke = vello_cpu::kurbo::Stroke::new(width);
            self.text_ctx.set_stroke(stroke.clone());
            self.shadow_ctx.set_stroke(stroke);
        }

        let c = style.color;
        self.text_ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
        let s = style.shadow.color;
        self.shadow_ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(s.r, s.g, s.b, s.a));

        self.style = Some(style.clone());
    }

    fn draw_text(&mut self, text: &str, x: f64, y: f64) {
        let Some(style) = self.style.clone() else {
            return;
        };

        if !self.shape_cache.contains_key(text) {
            let shaped = self.engine.shape_line(text, &style.text);
            self.shape_cache.insert(text.to_owned(), shaped);
        }
        let Some(shaped) = self.shape_cache.get(text).cloned() else {
            return;
        };

        let device = self.desc.device_transform();
        let origin_y = y - f64::from(shaped.middle);
        let shadow = style.shadow;
        let draw_shadow = shadow.is_visible();

        for run in &shaped.runs {
            let font = self.font_for(run);
            let glyphs = || {
                run.glyphs.iter().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                })
            };

            if draw_shadow {
                let t = device * Affine::translate((x + shadow.offset_x, origin_y + shadow.offset_y));
                self.shadow_ctx.set_transform(affine_to_cpu(t));
                let builder = self.shadow_ctx.glyph_run(&font).font_size(run.font_size);
                match style.mode {
                    PaintMode::Fill => builder.fill_glyphs(glyphs()),
                    PaintMode::Stroke { .. } => builder.stroke_glyphs(glyphs()),
                }
                self.shadow_dirty = true;
            }

            let t = device * Affine::translate((x, origin_y));
            self.text_ctx.set_transform(affine_to_cpu(t));
            let builder = self.text_ctx.glyph_run(&font).font_size(run.font_size);
            match style.mode {
                PaintMode::Fill => builder.fill_glyphs(glyphs()),
                PaintMode::Stroke { .. } => builder.stroke_glyphs(glyphs()),
            }
            self.text_dirty = true;
        }

        if draw_shadow {
            self.shadow_blur_px = self.shadow_blur_px.max(shadow.blur * self.desc.scale);
        }
    }

    fn reset_paint_state(&mut self) {
        self.pop_opacity_layers();
        if let Some(style) = self.style.as_mut() {
            style.shadow = Shadow::NONE;
            style.opacity = 1.0;
        }
    }

    fn present(&mut self) -> Option<FrameRGBA> {
        self.pop_opacity_layers();

        let mut frame = vello_cpu::Pixmap::new(self.width, self.height);
        let dst = frame.data_as_u8_slice_mut();
        fill_in_place(dst, self.background);

        let composite = |dst: &mut [u8], layer: &[u8]| {
            if let Err(e) = over_in_place(dst, layer, 1.0) {
                tracing::warn!(error = %e, "layer composite failed");
            }
        };

        if self.shadow_dirty {
            let mut ctx = std::mem::replace(
                &mut self.shadow_ctx,
                vello_cpu::RenderContext::new(self.width, self.height),
            );
            let layer = self.render_layer(&mut ctx);
            let bytes = layer.data_as_u8_slice();
            match shadow_blur_params(self.shadow_blur_px) {
                Some((radius, sigma)) => match blur_rgba8_premul(
                    bytes,
                    u32::from(self.width),
                    u32::from(self.height),
                    radius,
                    sigma,
                ) {
                    Ok(blurred) => composite(&mut *dst, &blurred),
                    Err(e) => tracing::warn!(error = %e, "shadow blur failed"),
                },
                None => composite(&mut *dst, bytes),
            }
        }

        if self.text_dirty {
            let mut ctx = std::mem::replace(
                &mut self.text_ctx,
                vello_cpu::RenderContext::new(self.width, self.height),
            );
            let layer = self.render_layer(&mut ctx);
            composite(&mut *dst, layer.data_as_u8_slice());
        }

        self.text_dirty = false;
        self.shadow_dirty = false;

        Some(FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: frame.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn physical_u16(desc: &SurfaceDesc) -> LoopResult<(u16, u16)> {
    desc.validate()?;
    let (w, h) = desc.physical_size();
    let w: u16 = w
        .try_into()
        .map_err(|_| LoopError::render("surface width exceeds u16"))?;
    let h: u16 = h
        .try_into()
        .map_err(|_| LoopError::render("surface height exceeds u16"))?;
    Ok((w, h))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

use crate::foundation::error::{LoopError, LoopResult};

pub use kurbo::{Affine, Point};

/// Monotonic 0-based tick counter within one animation session.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> LoopResult<Self> {
        if den == 0 {
            return Err(LoopError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(LoopError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        (self.num as f64) / (self.den as f64)
    }

    /// Duration of one frame.
    pub fn frame_interval(self) -> std::time::Duration {
        std::time::Duration::from_secs_f64((self.den as f64) / (self.num as f64))
    }

    /// Number of whole frames covering `secs` seconds (rounded up).
    pub fn frames_for_secs(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        (secs * self.as_f64()).ceil() as u64
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 60, den: 1 }
    }
}

/// Drawing surface geometry.
///
/// `width`/`height` are logical (density-independent) pixels. All layout and compositing
/// math happens in logical pixels; `scale` maps them to the physical pixmap.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceDesc {
    pub width: u32,
    pub height: u32,
    /// Device pixel ratio.
    pub scale: f64,
}

impl SurfaceDesc {
    pub fn new(width: u32, height: u32, scale: f64) -> LoopResult<Self> {
        let desc = Self {
            width,
            height,
            scale,
        };
        desc.validate()?;
        Ok(desc)
    }

    pub fn validate(&self) -> LoopResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LoopError::validation(
                "surface width/height must be non-zero",
            ));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(LoopError::validation(
                "surface scale must be finite and > 0",
            ));
        }
        let (pw, ph) = self.physical_size();
        if pw > u32::from(u16::MAX) || ph > u32::from(u16::MAX) {
            return Err(LoopError::validation(format!(
                "physical surface size {pw}x{ph} exceeds u16"
            )));
        }
        Ok(())
    }

    pub fn logical_width(&self) -> f64 {
        f64::from(self.width)
    }

    pub fn logical_height(&self) -> f64 {
        f64::from(self.height)
    }

    /// Backing pixmap size: logical size times the device pixel ratio.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (f64::from(self.width) * self.scale).ceil() as u32,
            (f64::from(self.height) * self.scale).ceil() as u32,
        )
    }

    /// Transform from logical to physical pixel coordinates.
    pub fn device_transform(&self) -> Affine {
        Affine::scale(self.scale)
    }
}

impl Default for SurfaceDesc {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            scale: 1.0,
        }
    }
}

/// A rendered frame as RGBA8 pixels at physical resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data.get(i..i + 4).map(|px| [px[0], px[1], px[2], px[3]])
    }

    /// Convert premultiplied pixels to straight alpha, as image files expect.
    pub fn into_straight_alpha(mut self) -> Self {
        if !self.premultiplied {
            return self;
        }
        for px in self.data.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        self.premultiplied = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_reads_row_major() {
        let f = FrameRGBA {
            width: 2,
            height: 1,
            data: vec![1, 2, 3, 4, 5, 6, 7, 8],
            premultiplied: true,
        };
        assert_eq!(f.pixel(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(f.pixel(2, 0), None);
    }

    #[test]
    fn straight_alpha_undoes_premultiplication() {
        let f = FrameRGBA {
            width: 2,
            height: 1,
            data: vec![64, 0, 0, 128, 10, 20, 30, 255],
            premultiplied: true,
        }
        .into_straight_alpha();
        assert!(!f.premultiplied);
        assert_eq!(f.pixel(0, 0), Some([128, 0, 0, 128]));
        assert_eq!(f.pixel(1, 0), Some([10, 20, 30, 255]));
    }
}

//! RGBA32 premultiplied pixel format with runtime-selectable blending.
//!
//! `PixfmtRgba32` wraps a [`RenderingBuffer`] and blends premultiplied
//! source pixels through a [`BlendMode`]. Writes outside the buffer are
//! clipped silently, so callers can blend stamps that hang over an edge.

use crate::color::Rgba8;
use crate::comp_op::{blend_pix, BlendMode, PremulRgba};
use crate::rendering_buffer::RenderingBuffer;

pub struct PixfmtRgba32<'a> {
    rbuf: &'a mut RenderingBuffer,
    mode: BlendMode,
}

impl<'a> PixfmtRgba32<'a> {
    pub fn new(rbuf: &'a mut RenderingBuffer) -> Self {
        Self {
            rbuf,
            mode: BlendMode::Normal,
        }
    }

    pub fn with_mode(rbuf: &'a mut RenderingBuffer, mode: BlendMode) -> Self {
        Self { rbuf, mode }
    }

    pub fn width(&self) -> u32 {
        self.rbuf.width()
    }

    pub fn height(&self) -> u32 {
        self.rbuf.height()
    }

    pub fn mode(&self) -> BlendMode {
        self.mode
    }

    /// Clear the entire buffer to a solid (straight-alpha) color.
    pub fn clear(&mut self, c: &Rgba8) {
        let p = c.premultiplied();
        for px in self.rbuf.data_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&[p.r, p.g, p.b, p.a]);
        }
    }

    /// Straight-alpha color of pixel (x, y); transparent outside the buffer.
    pub fn pixel(&self, x: i32, y: i32) -> Rgba8 {
        self.premul_pixel(x, y).to_color()
    }

    pub fn premul_pixel(&self, x: i32, y: i32) -> PremulRgba {
        if !self.rbuf.in_bounds(x, y) {
            return PremulRgba::TRANSPARENT;
        }
        PremulRgba::get_pix(self.rbuf.pix(x as u32, y as u32))
    }

    /// Blend a premultiplied source into pixel (x, y) with the current mode.
    #[inline]
    pub fn blend_pixel(&mut self, x: i32, y: i32, s: &PremulRgba) {
        if !self.rbuf.in_bounds(x, y) {
            return;
        }
        blend_pix(self.mode, self.rbuf.pix_mut(x as u32, y as u32), s);
    }

    /// Blend `c` scaled by `coverage(px, py)` over every pixel, where the
    /// closure receives pixel-center coordinates. Zero coverage is skipped.
    pub fn blend_coverage<F>(&mut self, c: &PremulRgba, mut coverage: F)
    where
        F: FnMut(f64, f64) -> f64,
    {
        let (w, h) = (self.width() as i32, self.height() as i32);
        for y in 0..h {
            for x in 0..w {
                let k = coverage(x as f64 + 0.5, y as f64 + 0.5);
                if k > 0.0 || matches!(self.mode, BlendMode::DestinationIn) {
                    self.blend_pixel(x, y, &c.scaled(k.clamp(0.0, 1.0)));
                }
            }
        }
    }

    /// Anti-aliased filled disc centred at (cx, cy).
    pub fn blend_disc(&mut self, cx: f64, cy: f64, r: f64, c: &PremulRgba) {
        if r <= 0.0 {
            return;
        }
        let x1 = (cx - r - 1.0).floor().max(0.0) as i32;
        let y1 = (cy - r - 1.0).floor().max(0.0) as i32;
        let x2 = ((cx + r + 1.0).ceil() as i32).min(self.width() as i32 - 1);
        let y2 = ((cy + r + 1.0).ceil() as i32).min(self.height() as i32 - 1);
        for y in y1..=y2 {
            for x in x1..=x2 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                let cover = disc_coverage((dx * dx + dy * dy).sqrt(), r);
                if cover > 0.0 {
                    self.blend_pixel(x, y, &c.scaled(cover));
                }
            }
        }
    }
}

/// One-pixel anti-aliased edge coverage for a disc of radius `r` at distance `d`.
#[inline]
pub fn disc_coverage(d: f64, r: f64) -> f64 {
    (r - d + 0.5).clamp(0.0, 1.0)
}

/// Bilinear sample of a premultiplied buffer at continuous coordinates
/// (pixel centres sit at `i + 0.5`). Outside the buffer is transparent.
pub fn sample_bilinear(rbuf: &RenderingBuffer, x: f64, y: f64) -> PremulRgba {
    let fx = x - 0.5;
    let fy = y - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (x0, y0) = (x0 as i32, y0 as i32);

    let texel = |xi: i32, yi: i32| -> PremulRgba {
        if rbuf.in_bounds(xi, yi) {
            PremulRgba::get_pix(rbuf.pix(xi as u32, yi as u32))
        } else {
            PremulRgba::TRANSPARENT
        }
    };

    let weights = [
        ((1.0 - tx) * (1.0 - ty), texel(x0, y0)),
        (tx * (1.0 - ty), texel(x0 + 1, y0)),
        ((1.0 - tx) * ty, texel(x0, y0 + 1)),
        (tx * ty, texel(x0 + 1, y0 + 1)),
    ];
    let mut out = PremulRgba::TRANSPARENT;
    for (w, p) in weights {
        out.r += p.r * w;
        out.g += p.g * w;
        out.b += p.b * w;
        out.a += p.a * w;
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

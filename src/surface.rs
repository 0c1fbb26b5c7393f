//! Raster surface abstraction.
//!
//! The brush engine paints into whatever the host binds as its target. The
//! host's canvas only has to draw a transformed image, hand back a copy of a
//! rectangular region, and fill itself. [`RenderingBuffer`] implements the
//! trait directly so the engine works on plain memory too.

use crate::basics::{PointD, RectD};
use crate::color::Rgba8;
use crate::comp_op::{blend_pix, BlendMode};
use crate::pixfmt_rgba::{sample_bilinear, PixfmtRgba32};
use crate::rendering_buffer::RenderingBuffer;
use crate::trans_affine::TransAffine;

/// A mutable drawing target.
pub trait RasterSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Composite `image` (premultiplied RGBA) through `mtx`, scaling every
    /// source pixel by `alpha`.
    fn draw_image(&mut self, image: &RenderingBuffer, mtx: &TransAffine, alpha: f64, mode: BlendMode);

    /// Copy of the `w` x `h` region whose top-left corner is (x, y). Pixels
    /// outside the surface read as transparent.
    fn read_region(&self, x: i32, y: i32, w: u32, h: u32) -> RenderingBuffer;

    /// Overwrite every pixel with `c`.
    fn fill(&mut self, c: &Rgba8);

    fn clear(&mut self) {
        self.fill(&Rgba8::TRANSPARENT);
    }
}

impl RasterSurface for RenderingBuffer {
    fn width(&self) -> u32 {
        RenderingBuffer::width(self)
    }

    fn height(&self) -> u32 {
        RenderingBuffer::height(self)
    }

    fn draw_image(&mut self, image: &RenderingBuffer, mtx: &TransAffine, alpha: f64, mode: BlendMode) {
        draw_transformed(self, image, mtx, alpha, mode);
    }

    fn read_region(&self, x: i32, y: i32, w: u32, h: u32) -> RenderingBuffer {
        let mut out = RenderingBuffer::new(w, h);
        for dy in 0..h {
            for dx in 0..w {
                let (sx, sy) = (x + dx as i32, y + dy as i32);
                if self.in_bounds(sx, sy) {
                    out.pix_mut(dx, dy)
                        .copy_from_slice(self.pix(sx as u32, sy as u32));
                }
            }
        }
        out
    }

    fn fill(&mut self, c: &Rgba8) {
        PixfmtRgba32::new(self).clear(c);
    }
}

/// Destination-space bounding box of `image` placed through `mtx`.
pub fn transformed_bounds(image: &RenderingBuffer, mtx: &TransAffine) -> RectD {
    let (w, h) = (image.width() as f64, image.height() as f64);
    let corners = [
        mtx.transform(PointD::new(0.0, 0.0)),
        mtx.transform(PointD::new(w, 0.0)),
        mtx.transform(PointD::new(w, h)),
        mtx.transform(PointD::new(0.0, h)),
    ];
    let mut r = RectD::new(corners[0].x, corners[0].y, corners[0].x, corners[0].y);
    for c in &corners[1..] {
        r.add_point(*c);
    }
    r
}

/// Resample `image` into `dst` through `mtx` with bilinear filtering.
///
/// Only the destination pixels under the transformed image bounds are
/// visited; each pixel centre is mapped back into image space and sampled.
pub fn draw_transformed(
    dst: &mut RenderingBuffer,
    image: &RenderingBuffer,
    mtx: &TransAffine,
    alpha: f64,
    mode: BlendMode,
) {
    if image.width() == 0 || image.height() == 0 || dst.width() == 0 || dst.height() == 0 {
        return;
    }
    let mut inv = *mtx;
    if inv.invert().is_none() {
        return;
    }
    let alpha = alpha.clamp(0.0, 1.0);

    let (x1, y1, x2, y2) = match mode {
        // Masking operators affect pixels outside the image too.
        BlendMode::SourceIn | BlendMode::DestinationIn => {
            (0, 0, dst.width() as i32 - 1, dst.height() as i32 - 1)
        }
        _ => {
            let b = transformed_bounds(image, mtx);
            (
                (b.x1.floor() as i32).max(0),
                (b.y1.floor() as i32).max(0),
                (b.x2.ceil() as i32).min(dst.width() as i32 - 1),
                (b.y2.ceil() as i32).min(dst.height() as i32 - 1),
            )
        }
    };

    for y in y1..=y2 {
        for x in x1..=x2 {
            let src = inv.transform(PointD::new(x as f64 + 0.5, y as f64 + 0.5));
            let s = sample_bilinear(image, src.x, src.y).scaled(alpha);
            blend_pix(mode, dst.pix_mut(x as u32, y as u32), &s);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, c: Rgba8) -> RenderingBuffer {
        let mut rb = RenderingBuffer::new(w, h);
        rb.fill(&c);
        rb
    }

    #[test]
    fn test_identity_draw_copies_pixels() {
        let img = solid(4, 4, Rgba8::new_opaque(10, 20, 30));
        let mut dst = RenderingBuffer::new(8, 8);
        dst.draw_image(&img, &TransAffine::new_translation(2.0, 2.0), 1.0, BlendMode::Normal);
        assert_eq!(dst.pix(3, 3), &[10, 20, 30, 255]);
        assert_eq!(dst.pix(0, 0), &[0, 0, 0, 0]);
        assert_eq!(dst.pix(7, 7), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_alpha_scales_source() {
        let img = solid(4, 4, Rgba8::new_opaque(255, 255, 255));
        let mut dst = RenderingBuffer::new(4, 4);
        dst.draw_image(&img, &TransAffine::new(), 0.5, BlendMode::Normal);
        let a = dst.pix(1, 1)[3];
        assert!((127..=128).contains(&a), "alpha {a}");
    }

    #[test]
    fn test_draw_hanging_off_edge_is_clipped() {
        let img = solid(10, 10, Rgba8::BLACK);
        let mut dst = RenderingBuffer::new(5, 5);
        dst.draw_image(&img, &TransAffine::new_translation(-3.0, -3.0), 1.0, BlendMode::Normal);
        assert_eq!(dst.pix(0, 0)[3], 255);
        assert_eq!(dst.pix(4, 4)[3], 255);
    }

    #[test]
    fn test_singular_matrix_draws_nothing() {
        let img = solid(4, 4, Rgba8::BLACK);
        let mut dst = RenderingBuffer::new(4, 4);
        dst.draw_image(&img, &TransAffine::new_scaling_uniform(0.0), 1.0, BlendMode::Normal);
        assert!(dst.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_erase_mode_removes_paint() {
        let mut dst = solid(4, 4, Rgba8::new_opaque(200, 0, 0));
        let img = solid(4, 4, Rgba8::BLACK);
        dst.draw_image(&img, &TransAffine::new(), 1.0, BlendMode::Erase);
        assert_eq!(dst.pix(2, 2)[3], 0);
    }

    #[test]
    fn test_read_region_pads_outside() {
        let mut src = RenderingBuffer::new(4, 4);
        src.pix_mut(0, 0).copy_from_slice(&[1, 2, 3, 4]);
        let region = src.read_region(-1, -1, 3, 3);
        assert_eq!(region.pix(1, 1), &[1, 2, 3, 4]);
        assert_eq!(region.pix(0, 0), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_transformed_bounds_rotated() {
        let img = RenderingBuffer::new(10, 10);
        let m = TransAffine::new_stamp_placement(10.0, 10.0, 1.0, std::f64::consts::FRAC_PI_4, PointD::new(0.0, 0.0));
        let b = transformed_bounds(&img, &m);
        let half_diag = 50f64.sqrt();
        assert!((b.x2 - half_diag).abs() < 1e-9);
        assert!((b.y1 + half_diag).abs() < 1e-9);
    }
}

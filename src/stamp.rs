//! Brush tip rendering.
//!
//! Each stroke stamp is drawn from a small premultiplied [`StampBuffer`].
//! The four tip strategies share the [`RenderStamp`] capability and are
//! selected by [`StampEngine`]. Standard tips depend only on their
//! [`StampKey`] and are cached; Hairy and Binary tips are re-rolled and
//! Smudge tips re-sampled for every stamp.

use std::f64::consts::TAU;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::basics::PointD;
use crate::blur::recursive_blur_rgba32;
use crate::color::Rgba8;
use crate::comp_op::{BlendMode, PremulRgba};
use crate::glyph_raster_bin::{GlyphRasterBin, MONO_5X7};
use crate::pixfmt_rgba::{disc_coverage, PixfmtRgba32};
use crate::rendering_buffer::RenderingBuffer;
use crate::surface::{draw_transformed, RasterSurface};
use crate::texture::Texture;
use crate::trans_affine::TransAffine;

/// Payload used by Binary tips when the configured one is empty.
pub const DEFAULT_BINARY_PAYLOAD: &str = "01";
/// Drawn by Binary tips for payload characters the embedded font lacks.
pub const MISSING_GLYPH: char = '?';

// ============================================================================
// StampEngine
// ============================================================================

/// Which tip strategy a brush uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StampEngine {
    #[default]
    Standard,
    Hairy,
    Smudge,
    Binary,
}

impl StampEngine {
    pub fn strategy(self) -> &'static dyn RenderStamp {
        match self {
            StampEngine::Standard => &StandardStamp,
            StampEngine::Hairy => &HairyStamp,
            StampEngine::Smudge => &SmudgeStamp,
            StampEngine::Binary => &BinaryStamp,
        }
    }
}

// ============================================================================
// StampBuffer
// ============================================================================

/// A rendered brush tip.
#[derive(Debug, Clone, PartialEq)]
pub struct StampBuffer {
    pub image: RenderingBuffer,
    /// Buffer pixels per canvas pixel.
    pub pixel_scale: f64,
    /// Brush size (canvas pixels) the tip was rendered for.
    pub rendered_size: f64,
}

impl StampBuffer {
    /// Transparent buffer for a tip of `size` canvas pixels with `padding`
    /// buffer pixels on every side.
    pub fn blank(size: f64, pixel_scale: f64, padding: u32) -> Self {
        let dim = (size * pixel_scale).ceil().max(1.0) as u32 + padding * 2;
        Self {
            image: RenderingBuffer::new(dim, dim),
            pixel_scale,
            rendered_size: size,
        }
    }

    pub fn center(&self) -> PointD {
        PointD::new(
            self.image.width() as f64 * 0.5,
            self.image.height() as f64 * 0.5,
        )
    }

    /// Tip radius in buffer pixels.
    pub fn radius(&self) -> f64 {
        self.rendered_size * self.pixel_scale * 0.5
    }

    /// Transform that draws this tip centred on `at` at `size` canvas
    /// pixels, rotated by `rotation` radians.
    pub fn placement(&self, at: PointD, size: f64, rotation: f64) -> TransAffine {
        let scale = if self.rendered_size > 0.0 {
            size / (self.rendered_size * self.pixel_scale)
        } else {
            0.0
        };
        TransAffine::new_stamp_placement(
            self.image.width() as f64,
            self.image.height() as f64,
            scale,
            rotation,
            at,
        )
    }
}

/// Inputs that determine a cached tip. Any change forces a rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct StampKey {
    pub engine: StampEngine,
    pub size: f64,
    pub hardness: f64,
    pub color: Rgba8,
    pub texture: Option<String>,
    pub texture_ready: bool,
    pub pixel_scale: f64,
}

/// Dirty-checked holder for the cached tip.
#[derive(Debug, Default)]
pub struct StampCache {
    key: Option<StampKey>,
    buffer: Option<StampBuffer>,
    rebuilds: u64,
}

impl StampCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self, key: &StampKey) -> bool {
        self.key.as_ref() != Some(key) || self.buffer.is_none()
    }

    /// The cached tip for `key`, rendering it with `build` when dirty.
    pub fn get_or_rebuild<F>(&mut self, key: StampKey, build: F) -> &StampBuffer
    where
        F: FnOnce() -> StampBuffer,
    {
        if self.is_dirty(&key) {
            debug!(engine = ?key.engine, size = key.size, "rebuilding stamp buffer");
            self.rebuilds += 1;
            self.key = Some(key);
            self.buffer = None;
        }
        self.buffer.get_or_insert_with(build)
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.buffer = None;
    }

    /// Number of rebuilds so far.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

// ============================================================================
// RenderStamp
// ============================================================================

/// Target pixels a Smudge tip picks up.
pub struct SmudgeSource<'a> {
    pub surface: &'a dyn RasterSurface,
    pub at: PointD,
}

/// Everything a strategy may read while rendering one tip.
pub struct StampContext<'a> {
    pub size: f64,
    pub hardness: f64,
    pub color: Rgba8,
    pub pixel_scale: f64,
    pub padding: u32,
    pub bristle_count: u32,
    pub payload: &'a str,
    pub texture: Option<&'a Texture>,
    pub smudge: Option<SmudgeSource<'a>>,
    pub rng: &'a mut dyn RngCore,
}

/// A brush tip strategy.
pub trait RenderStamp {
    fn render(&self, ctx: &mut StampContext<'_>) -> StampBuffer;

    /// `true` when every stamp needs a fresh tip.
    fn per_stamp(&self) -> bool {
        false
    }
}

/// Alpha of a soft round tip at distance `d` from its centre.
///
/// Full strength out to `hardness * r`, then a linear fade reaching zero at
/// `r`, with a one-pixel anti-aliased rim.
pub fn radial_falloff(d: f64, r: f64, hardness: f64) -> f64 {
    if r <= 0.0 {
        return 0.0;
    }
    let rim = disc_coverage(d, r);
    let hard = hardness.clamp(0.0, 1.0) * r;
    if d <= hard {
        return rim;
    }
    if r - hard < 1e-9 {
        return 0.0;
    }
    ((r - d) / (r - hard)).clamp(0.0, 1.0).min(rim)
}

/// Paint `ctx.color` through a radial falloff centred in `stamp`.
fn fill_radial(stamp: &mut StampBuffer, color: &Rgba8, hardness: f64) {
    let c = stamp.center();
    let r = stamp.radius();
    let src = PremulRgba::from_color(color);
    PixfmtRgba32::new(&mut stamp.image).blend_coverage(&src, |x, y| {
        radial_falloff(PointD::new(x, y).distance(c), r, hardness)
    });
}

// ============================================================================
// Strategies
// ============================================================================

/// Soft round tip, or the shape texture tinted with the active colour.
pub struct StandardStamp;

impl RenderStamp for StandardStamp {
    fn render(&self, ctx: &mut StampContext<'_>) -> StampBuffer {
        let mut stamp = StampBuffer::blank(ctx.size, ctx.pixel_scale, ctx.padding);
        match ctx.texture {
            Some(tex) if tex.width() > 0 && tex.height() > 0 => {
                let (tw, th) = (tex.width() as f64, tex.height() as f64);
                let fit = ctx.size * ctx.pixel_scale / tw.max(th);
                let mtx = TransAffine::new_stamp_placement(tw, th, fit, 0.0, stamp.center());
                draw_transformed(&mut stamp.image, tex.image(), &mtx, 1.0, BlendMode::Normal);
                // Texture keeps the shape, the colour replaces its hue.
                let tint = PremulRgba::from_color(&ctx.color);
                PixfmtRgba32::with_mode(&mut stamp.image, BlendMode::SourceIn)
                    .blend_coverage(&tint, |_, _| 1.0);
            }
            _ => fill_radial(&mut stamp, &ctx.color, ctx.hardness),
        }
        stamp
    }
}

/// Scattered bristles inside the tip radius.
pub struct HairyStamp;

/// Bristle centres and radii for a tip of `radius`, uniform over the disk.
pub fn scatter_bristles<R: Rng + ?Sized>(
    rng: &mut R,
    count: u32,
    radius: f64,
    bristle_max: f64,
) -> Vec<(PointD, f64)> {
    (0..count)
        .map(|_| {
            let r = radius * rng.random::<f64>().sqrt();
            let theta = rng.random::<f64>() * TAU;
            let size = bristle_max * rng.random::<f64>();
            (PointD::new(r * theta.cos(), r * theta.sin()), size)
        })
        .collect()
}

impl RenderStamp for HairyStamp {
    fn render(&self, ctx: &mut StampContext<'_>) -> StampBuffer {
        let bristle_max = ctx.size / 10.0 * ctx.pixel_scale;
        let padding = ctx.padding + bristle_max.ceil() as u32;
        let mut stamp = StampBuffer::blank(ctx.size, ctx.pixel_scale, padding);
        let c = stamp.center();
        let bristles = scatter_bristles(&mut *ctx.rng, ctx.bristle_count, stamp.radius(), bristle_max);
        let src = PremulRgba::from_color(&ctx.color);
        let mut pf = PixfmtRgba32::new(&mut stamp.image);
        for (offset, r) in bristles {
            pf.blend_disc(c.x + offset.x, c.y + offset.y, r, &src);
        }
        stamp
    }

    fn per_stamp(&self) -> bool {
        true
    }
}

/// Picks up target pixels under a soft round mask.
pub struct SmudgeStamp;

impl RenderStamp for SmudgeStamp {
    fn render(&self, ctx: &mut StampContext<'_>) -> StampBuffer {
        let mut stamp = StampBuffer::blank(ctx.size, 1.0, ctx.padding);
        let Some(source) = &ctx.smudge else {
            return stamp;
        };
        let (w, h) = (stamp.image.width(), stamp.image.height());
        let x = (source.at.x - w as f64 * 0.5).round() as i32;
        let y = (source.at.y - h as f64 * 0.5).round() as i32;
        stamp.image = source.surface.read_region(x, y, w, h);

        let c = stamp.center();
        let r = stamp.radius();
        let hardness = ctx.hardness;
        let mask = PremulRgba::from_color(&Rgba8::new_opaque(255, 255, 255));
        PixfmtRgba32::with_mode(&mut stamp.image, BlendMode::DestinationIn)
            .blend_coverage(&mask, |px, py| {
                radial_falloff(PointD::new(px, py).distance(c), r, hardness)
            });
        stamp
    }

    fn per_stamp(&self) -> bool {
        true
    }
}

/// One random payload character in a bold monospace glyph with a glow.
pub struct BinaryStamp;

impl BinaryStamp {
    pub fn pick_char<R: Rng + ?Sized>(rng: &mut R, payload: &str) -> char {
        let payload = if payload.is_empty() {
            DEFAULT_BINARY_PAYLOAD
        } else {
            payload
        };
        let n = payload.chars().count();
        payload
            .chars()
            .nth(rng.random_range(0..n))
            .unwrap_or('0')
    }
}

impl RenderStamp for BinaryStamp {
    fn render(&self, ctx: &mut StampContext<'_>) -> StampBuffer {
        let glow = ctx.size * 0.25 * ctx.pixel_scale;
        let padding = ctx.padding + (glow * 2.0).ceil() as u32;
        let mut stamp = StampBuffer::blank(ctx.size, ctx.pixel_scale, padding);

        let glyphs = GlyphRasterBin::new(&MONO_5X7);
        let mut ch = Self::pick_char(&mut *ctx.rng, ctx.payload);
        if !glyphs.has_glyph(ch) {
            ch = MISSING_GLYPH;
        }
        let Some(mask) = glyphs.prepare(ch).filter(|m| m.ink() > 0) else {
            return stamp;
        };
        let glyph = mask.to_buffer(&ctx.color);
        let (gw, gh) = (mask.width as f64, mask.height as f64);
        let scale = ctx.size * ctx.pixel_scale / gh;
        let c = stamp.center();
        for dx in [0.0, 1.0] {
            let mtx = TransAffine::new_stamp_placement(gw, gh, scale, 0.0, PointD::new(c.x + dx, c.y));
            draw_transformed(&mut stamp.image, &glyph, &mtx, 1.0, BlendMode::Normal);
        }

        let mut halo = stamp.image.clone();
        recursive_blur_rgba32(&mut halo, glow);
        draw_transformed(
            &mut stamp.image,
            &halo,
            &TransAffine::new(),
            1.0,
            BlendMode::DestinationOver,
        );
        stamp
    }

    fn per_stamp(&self) -> bool {
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

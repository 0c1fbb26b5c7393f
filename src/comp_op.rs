//! Blend modes for compositing stamps onto a surface.
//!
//! Every formula operates on premultiplied RGBA in f64 `[0, 1]` working
//! space. The source coverage and opacity are already folded into the
//! source color's channels by the caller, so each function sees a single
//! premultiplied source pixel `s` and the destination pixel `d`.
//!
//! The user-facing modes mirror the HTML canvas `globalCompositeOperation`
//! names. `SourceIn`, `DestinationIn` and `DestinationOver` are used
//! internally when building stamps (recoloring textures, masking smudge
//! samples, placing glow under a glyph).

use serde::{Deserialize, Serialize};

use crate::color::Rgba8;

// ============================================================================
// BlendMode
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Dca' = Sca + Dca.(1 - Sa)
    #[default]
    #[serde(alias = "source-over")]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    /// Removes destination coverage: Dca' = Dca.(1 - Sa)
    #[serde(alias = "destination-out")]
    Erase,
    /// Dca' = Sca.Da
    SourceIn,
    /// Dca' = Dca.Sa
    DestinationIn,
    /// Dca' = Dca + Sca.(1 - Da)
    DestinationOver,
}

// ============================================================================
// Premultiplied f64 RGBA working space
// ============================================================================

/// Premultiplied RGBA in f64 [0, 1] working space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PremulRgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl PremulRgba {
    pub const TRANSPARENT: PremulRgba = PremulRgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Premultiply a straight-alpha color.
    pub fn from_color(c: &Rgba8) -> Self {
        let a = Rgba8::to_double(c.a);
        Self {
            r: Rgba8::to_double(c.r) * a,
            g: Rgba8::to_double(c.g) * a,
            b: Rgba8::to_double(c.b) * a,
            a,
        }
    }

    /// Read an already premultiplied pixel.
    #[inline]
    pub fn get_pix(p: &[u8]) -> Self {
        Self {
            r: Rgba8::to_double(p[0]),
            g: Rgba8::to_double(p[1]),
            b: Rgba8::to_double(p[2]),
            a: Rgba8::to_double(p[3]),
        }
    }

    /// Write back to a pixel, clamping into range.
    #[inline]
    pub fn set_pix(&self, p: &mut [u8]) {
        p[0] = Rgba8::from_double(self.r);
        p[1] = Rgba8::from_double(self.g);
        p[2] = Rgba8::from_double(self.b);
        p[3] = Rgba8::from_double(self.a);
    }

    /// Scale all four channels (opacity / coverage).
    #[inline]
    pub fn scaled(&self, k: f64) -> Self {
        Self {
            r: self.r * k,
            g: self.g * k,
            b: self.b * k,
            a: self.a * k,
        }
    }

    /// Straight-alpha 8-bit color.
    pub fn to_color(&self) -> Rgba8 {
        if self.a <= 0.0 {
            return Rgba8::TRANSPARENT;
        }
        Rgba8 {
            r: Rgba8::from_double(self.r / self.a),
            g: Rgba8::from_double(self.g / self.a),
            b: Rgba8::from_double(self.b / self.a),
            a: Rgba8::from_double(self.a),
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Blend premultiplied source `s` into pixel `p` (RGBA, premultiplied).
#[inline]
pub fn blend_pix(mode: BlendMode, p: &mut [u8], s: &PremulRgba) {
    if s.a <= 0.0 && !matches!(mode, BlendMode::SourceIn | BlendMode::DestinationIn) {
        return;
    }
    let d = PremulRgba::get_pix(p);
    let out = match mode {
        BlendMode::Normal => src_over(&d, s),
        BlendMode::Multiply => separable(&d, s, |dc, sc, da, sa| {
            sc * dc + sc * (1.0 - da) + dc * (1.0 - sa)
        }),
        BlendMode::Screen => separable(&d, s, |dc, sc, _, _| sc + dc - sc * dc),
        BlendMode::Overlay => separable(&d, s, |dc, sc, da, sa| {
            hard_light_calc(sc, dc, sa, da)
        }),
        BlendMode::Darken => separable(&d, s, |dc, sc, da, sa| {
            (sc * da).min(dc * sa) + sc * (1.0 - da) + dc * (1.0 - sa)
        }),
        BlendMode::Lighten => separable(&d, s, |dc, sc, da, sa| {
            (sc * da).max(dc * sa) + sc * (1.0 - da) + dc * (1.0 - sa)
        }),
        BlendMode::ColorDodge => separable(&d, s, color_dodge_calc),
        BlendMode::ColorBurn => separable(&d, s, color_burn_calc),
        BlendMode::HardLight => separable(&d, s, |dc, sc, da, sa| {
            hard_light_calc(dc, sc, da, sa)
        }),
        BlendMode::SoftLight => separable(&d, s, soft_light_calc),
        BlendMode::Difference => separable(&d, s, |dc, sc, da, sa| {
            sc + dc - 2.0 * (sc * da).min(dc * sa)
        }),
        BlendMode::Exclusion => separable(&d, s, |dc, sc, _, _| {
            sc + dc - 2.0 * sc * dc
        }),
        BlendMode::Erase => d.scaled(1.0 - s.a),
        BlendMode::SourceIn => s.scaled(d.a),
        BlendMode::DestinationIn => d.scaled(s.a),
        BlendMode::DestinationOver => {
            let d1a = 1.0 - d.a;
            PremulRgba {
                r: d.r + s.r * d1a,
                g: d.g + s.g * d1a,
                b: d.b + s.b * d1a,
                a: d.a + s.a * d1a,
            }
        }
    };
    out.set_pix(p);
}

// ---- SrcOver: Dca' = Sca + Dca.(1 - Sa)
#[inline]
fn src_over(d: &PremulRgba, s: &PremulRgba) -> PremulRgba {
    let s1a = 1.0 - s.a;
    PremulRgba {
        r: s.r + d.r * s1a,
        g: s.g + d.g * s1a,
        b: s.b + d.b * s1a,
        a: s.a + d.a * s1a,
    }
}

/// Apply a per-channel formula `f(Dca, Sca, Da, Sa)`; alpha is always
/// `Da' = Sa + Da - Sa.Da`.
#[inline]
fn separable<F>(d: &PremulRgba, s: &PremulRgba, f: F) -> PremulRgba
where
    F: Fn(f64, f64, f64, f64) -> f64,
{
    PremulRgba {
        r: f(d.r, s.r, d.a, s.a).clamp(0.0, 1.0),
        g: f(d.g, s.g, d.a, s.a).clamp(0.0, 1.0),
        b: f(d.b, s.b, d.a, s.a).clamp(0.0, 1.0),
        a: (s.a + d.a - s.a * d.a).clamp(0.0, 1.0),
    }
}

// ---- HardLight (Overlay is HardLight with source and destination swapped)
#[inline]
fn hard_light_calc(dca: f64, sca: f64, da: f64, sa: f64) -> f64 {
    let d1a = 1.0 - da;
    let s1a = 1.0 - sa;
    if 2.0 * sca < sa {
        2.0 * sca * dca + sca * d1a + dca * s1a
    } else {
        sa * da - 2.0 * (da - dca) * (sa - sca) + sca * d1a + dca * s1a
    }
}

// ---- ColorDodge
#[inline]
fn color_dodge_calc(dca: f64, sca: f64, da: f64, sa: f64) -> f64 {
    let d1a = 1.0 - da;
    let s1a = 1.0 - sa;
    if da <= 0.0 {
        return sca;
    }
    if sca < sa {
        sa * da * (1.0f64).min((dca / da) * sa / (sa - sca)) + sca * d1a + dca * s1a
    } else if dca > 0.0 {
        sa * da + sca * d1a + dca * s1a
    } else {
        sca * d1a
    }
}

// ---- ColorBurn
#[inline]
fn color_burn_calc(dca: f64, sca: f64, da: f64, sa: f64) -> f64 {
    let d1a = 1.0 - da;
    let s1a = 1.0 - sa;
    if da <= 0.0 {
        return sca;
    }
    if sca > 0.0 {
        sa * da * (1.0 - (1.0f64).min((1.0 - dca / da) * sa / sca)) + sca * d1a + dca * s1a
    } else if dca > da {
        sa * da + dca * s1a
    } else {
        dca * s1a
    }
}

// ---- SoftLight
#[inline]
fn soft_light_calc(dca: f64, sca: f64, da: f64, sa: f64) -> f64 {
    let d1a = 1.0 - da;
    let s1a = 1.0 - sa;
    if da <= 0.0 {
        return sca;
    }
    let m = dca / da;
    if 2.0 * sca <= sa {
        dca * (sa + (2.0 * sca - sa) * (1.0 - m)) + sca * d1a + dca * s1a
    } else if 4.0 * dca <= da {
        let g = ((16.0 * m - 12.0) * m + 4.0) * m - m;
        dca * sa + da * (2.0 * sca - sa) * g + sca * d1a + dca * s1a
    } else {
        dca * sa + da * (2.0 * sca - sa) * (m.sqrt() - m) + sca * d1a + dca * s1a
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pix(c: Rgba8) -> [u8; 4] {
        let p = c.premultiplied();
        [p.r, p.g, p.b, p.a]
    }

    fn src(c: Rgba8) -> PremulRgba {
        PremulRgba::from_color(&c)
    }

    #[test]
    fn test_normal_opaque_replaces() {
        let mut p = pix(Rgba8::new_opaque(0, 0, 255));
        blend_pix(BlendMode::Normal, &mut p, &src(Rgba8::new_opaque(255, 0, 0)));
        assert_eq!(p, [255, 0, 0, 255]);
    }

    #[test]
    fn test_normal_half_alpha_on_white() {
        let mut p = pix(Rgba8::new_opaque(255, 255, 255));
        blend_pix(BlendMode::Normal, &mut p, &src(Rgba8::new_opaque(0, 0, 0)).scaled(0.5));
        assert!((p[0] as i32 - 128).abs() <= 1, "r={}", p[0]);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn test_multiply_white_is_identity() {
        let mut p = pix(Rgba8::new_opaque(100, 150, 200));
        blend_pix(BlendMode::Multiply, &mut p, &src(Rgba8::new_opaque(255, 255, 255)));
        assert_eq!(p, [100, 150, 200, 255]);
    }

    #[test]
    fn test_screen_black_with_gray() {
        let mut p = pix(Rgba8::BLACK);
        blend_pix(BlendMode::Screen, &mut p, &src(Rgba8::new_opaque(128, 128, 128)));
        assert!(p[0] > 120 && p[0] < 140, "r={}", p[0]);
    }

    #[test]
    fn test_difference_same_color_is_black() {
        let mut p = pix(Rgba8::new_opaque(255, 255, 255));
        blend_pix(BlendMode::Difference, &mut p, &src(Rgba8::new_opaque(255, 255, 255)));
        assert!(p[0] < 5 && p[1] < 5 && p[2] < 5);
    }

    #[test]
    fn test_erase_clears_coverage() {
        let mut p = pix(Rgba8::new_opaque(10, 20, 30));
        blend_pix(BlendMode::Erase, &mut p, &src(Rgba8::BLACK));
        assert_eq!(p, [0, 0, 0, 0]);

        let mut p = pix(Rgba8::new_opaque(200, 200, 200));
        blend_pix(BlendMode::Erase, &mut p, &src(Rgba8::BLACK).scaled(0.5));
        assert!((p[3] as i32 - 128).abs() <= 1, "a={}", p[3]);
    }

    #[test]
    fn test_source_in_takes_destination_alpha() {
        let mut p = [0, 0, 0, 128];
        blend_pix(BlendMode::SourceIn, &mut p, &src(Rgba8::new_opaque(255, 0, 0)));
        assert!((p[0] as i32 - 128).abs() <= 1);
        assert!((p[3] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_destination_in_masks() {
        let mut p = pix(Rgba8::new_opaque(200, 100, 50));
        blend_pix(BlendMode::DestinationIn, &mut p, &PremulRgba::TRANSPARENT);
        assert_eq!(p, [0, 0, 0, 0]);
    }

    #[test]
    fn test_destination_over_keeps_opaque_destination() {
        let mut p = pix(Rgba8::new_opaque(0, 255, 0));
        blend_pix(BlendMode::DestinationOver, &mut p, &src(Rgba8::new_opaque(255, 0, 0)));
        assert_eq!(p, [0, 255, 0, 255]);
    }

    #[test]
    fn test_all_modes_no_panic() {
        let modes = [
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::HardLight,
            BlendMode::SoftLight,
            BlendMode::Difference,
            BlendMode::Exclusion,
            BlendMode::Erase,
            BlendMode::SourceIn,
            BlendMode::DestinationIn,
            BlendMode::DestinationOver,
        ];
        let s = src(Rgba8::new(128, 64, 32, 200)).scaled(0.5);
        for &m in &modes {
            let mut p = pix(Rgba8::new(100, 150, 200, 180));
            blend_pix(m, &mut p, &s);
            let mut empty = [0u8; 4];
            blend_pix(m, &mut empty, &s);
        }
    }

    #[test]
    fn test_serde_names() {
        let m: BlendMode = serde_json::from_str("\"source-over\"").unwrap();
        assert_eq!(m, BlendMode::Normal);
        let m: BlendMode = serde_json::from_str("\"destination-out\"").unwrap();
        assert_eq!(m, BlendMode::Erase);
        let m: BlendMode = serde_json::from_str("\"color-dodge\"").unwrap();
        assert_eq!(m, BlendMode::ColorDodge);
        assert_eq!(serde_json::to_string(&BlendMode::HardLight).unwrap(), "\"hard-light\"");
    }
}

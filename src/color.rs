//! Color types and operations.
//!
//! `Rgba8` is the 8-bit straight-alpha color the host hands to the brush
//! engine. Pixel buffers store premultiplied values; [`Rgba8::premultiplied`]
//! converts between the two.

use std::fmt;

use crate::basics::uround;
use crate::error::ColorParseError;

/// RGBA color with u8 components (straight, non-premultiplied alpha).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BASE_SHIFT: u32 = 8;
    pub const BASE_SCALE: u32 = 1 << Self::BASE_SHIFT;
    pub const BASE_MASK: u32 = Self::BASE_SCALE - 1;
    pub const BASE_MSB: u32 = 1 << (Self::BASE_SHIFT - 1);

    pub const BLACK: Rgba8 = Rgba8 { r: 0, g: 0, b: 0, a: 255 };
    pub const TRANSPARENT: Rgba8 = Rgba8 { r: 0, g: 0, b: 0, a: 0 };

    pub fn new(r: u32, g: u32, b: u32, a: u32) -> Self {
        Self {
            r: r as u8,
            g: g as u8,
            b: b as u8,
            a: a as u8,
        }
    }

    pub fn new_opaque(r: u32, g: u32, b: u32) -> Self {
        Self::new(r, g, b, Self::BASE_MASK)
    }

    pub fn to_double(a: u8) -> f64 {
        a as f64 / Self::BASE_MASK as f64
    }

    pub fn from_double(a: f64) -> u8 {
        uround(a.clamp(0.0, 1.0) * Self::BASE_MASK as f64) as u8
    }

    /// Fixed-point multiply, exact over u8.
    /// `(a * b + 128) >> 8`, with rounding correction.
    #[inline]
    pub fn multiply(a: u8, b: u8) -> u8 {
        let t: u32 = a as u32 * b as u32 + Self::BASE_MSB;
        (((t >> Self::BASE_SHIFT) + t) >> Self::BASE_SHIFT) as u8
    }

    /// Interpolate p to q by a.
    #[inline]
    pub fn lerp(p: u8, q: u8, a: u8) -> u8 {
        let t = (q as i32 - p as i32) * a as i32 + Self::BASE_MSB as i32 - (p > q) as i32;
        (p as i32 + (((t >> Self::BASE_SHIFT) + t) >> Self::BASE_SHIFT)) as u8
    }

    /// The same color with its channels premultiplied by alpha.
    pub fn premultiplied(&self) -> Rgba8 {
        Rgba8 {
            r: Self::multiply(self.r, self.a),
            g: Self::multiply(self.g, self.a),
            b: Self::multiply(self.b, self.a),
            a: self.a,
        }
    }

    /// Perceptual brightness `0.299 r + 0.587 g + 0.114 b` on a 0..255 scale.
    pub fn brightness(&self) -> f64 {
        0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Result<Self, ColorParseError> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || ColorParseError::InvalidHex(s.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let nibble = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| invalid())
                };
                Ok(Rgba8 {
                    r: nibble(0)?,
                    g: nibble(1)?,
                    b: nibble(2)?,
                    a: 255,
                })
            }
            6 => Ok(Rgba8 {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: 255,
            }),
            8 => Ok(Rgba8 {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Rgba8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply() {
        assert_eq!(Rgba8::multiply(255, 255), 255);
        assert_eq!(Rgba8::multiply(255, 0), 0);
        assert_eq!(Rgba8::multiply(128, 255), 128);
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(Rgba8::lerp(10, 200, 0), 10);
        assert_eq!(Rgba8::lerp(10, 200, 255), 200);
    }

    #[test]
    fn test_premultiplied() {
        let c = Rgba8::new(255, 128, 0, 128).premultiplied();
        assert_eq!(c.r, 128);
        assert_eq!(c.g, 64);
        assert_eq!(c.b, 0);
        assert_eq!(c.a, 128);
    }

    #[test]
    fn test_brightness() {
        assert!((Rgba8::new_opaque(255, 255, 255).brightness() - 255.0).abs() < 1e-9);
        assert_eq!(Rgba8::BLACK.brightness(), 0.0);
        assert!((Rgba8::new_opaque(255, 0, 0).brightness() - 76.245).abs() < 1e-9);
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(Rgba8::from_hex("#ff8000").unwrap(), Rgba8::new_opaque(255, 128, 0));
        assert_eq!(Rgba8::from_hex("0f0").unwrap(), Rgba8::new_opaque(0, 255, 0));
        assert_eq!(Rgba8::from_hex("#00000080").unwrap(), Rgba8::new(0, 0, 0, 128));
        assert!(Rgba8::from_hex("#12345").is_err());
        assert!(Rgba8::from_hex("#gg0000").is_err());
    }

    #[test]
    fn test_display_round_trips_through_hex() {
        let c = Rgba8::new(1, 2, 3, 4);
        assert_eq!(c.to_string(), "#01020304");
        assert_eq!(Rgba8::from_hex(&c.to_string()).unwrap(), c);
    }
}

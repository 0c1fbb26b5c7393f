//! Foundation types shared by every engine: points, rectangles, rounding.
//!
//! `PointD` is the plane coordinate used throughout the crate (brush samples,
//! Bézier control points, bone joints). It is a plain value type.

use core::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

// ============================================================================
// Rounding
// ============================================================================

/// Round a non-negative double to the nearest unsigned integer (half up).
#[inline]
pub fn uround(v: f64) -> u32 {
    (v + 0.5) as u32
}

// ============================================================================
// PointD
// ============================================================================

/// A point in the drawing plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointD {
    pub x: f64,
    pub y: f64,
}

impl PointD {
    pub const ORIGIN: PointD = PointD { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length of the vector from the origin.
    #[inline]
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline]
    pub fn distance(self, other: PointD) -> f64 {
        (other - self).length()
    }

    /// Midpoint between `self` and `other`.
    #[inline]
    pub fn midpoint(self, other: PointD) -> PointD {
        PointD::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Linear interpolation toward `other` by `k` (`k = 0` is `self`).
    #[inline]
    pub fn lerp(self, other: PointD, k: f64) -> PointD {
        PointD::new(self.x + (other.x - self.x) * k, self.y + (other.y - self.y) * k)
    }

    /// Angle of the vector from `self` to `other`, in radians.
    #[inline]
    pub fn angle_to(self, other: PointD) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

impl Add for PointD {
    type Output = PointD;
    fn add(self, rhs: PointD) -> PointD {
        PointD::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for PointD {
    type Output = PointD;
    fn sub(self, rhs: PointD) -> PointD {
        PointD::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for PointD {
    type Output = PointD;
    fn mul(self, rhs: f64) -> PointD {
        PointD::new(self.x * rhs, self.y * rhs)
    }
}

// ============================================================================
// RectD
// ============================================================================

/// An axis-aligned rectangle defined by two corner points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectD {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl RectD {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Grow the rectangle to include `p`.
    pub fn add_point(&mut self, p: PointD) {
        self.x1 = self.x1.min(p.x);
        self.y1 = self.y1.min(p.y);
        self.x2 = self.x2.max(p.x);
        self.y2 = self.y2.max(p.y);
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Returns `true` if this rectangle overlaps with `r` (touching counts).
    pub fn overlaps(&self, r: &Self) -> bool {
        !(r.x1 > self.x2 || r.x2 < self.x1 || r.y1 > self.y2 || r.y2 < self.y1)
    }

    /// Union (bounding box) of two rectangles.
    pub fn unite(&self, r: &Self) -> Self {
        RectD::new(
            self.x1.min(r.x1),
            self.y1.min(r.y1),
            self.x2.max(r.x2),
            self.y2.max(r.y2),
        )
    }

    /// Returns `true` if the point (x, y) is inside the rectangle.
    pub fn hit_test(&self, x: f64, y: f64) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }
}

// ============================================================================
// Tests
// ============================================================================

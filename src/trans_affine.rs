//! Affine transformation matrix.
//!
//! Places a stamp image onto the target surface: centre the stamp on the
//! origin, scale it to the dynamic size, rotate it, then move it to the
//! stroke position.

use crate::basics::PointD;

/// Below this determinant magnitude a matrix is treated as singular.
pub const AFFINE_EPSILON: f64 = 1e-14;

/// 2D affine transformation matrix.
///
/// ```text
///   | sx  shx tx |
///   | shy  sy ty |
///   |  0    0  1 |
/// ```
///
/// Transform: `x' = x*sx + y*shx + tx`, `y' = x*shy + y*sy + ty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransAffine {
    pub sx: f64,
    pub shy: f64,
    pub shx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for TransAffine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransAffine {
    // ====================================================================
    // Construction
    // ====================================================================

    /// Identity matrix.
    pub fn new() -> Self {
        Self::new_custom(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn new_custom(sx: f64, shy: f64, shx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            sx,
            shy,
            shx,
            sy,
            tx,
            ty,
        }
    }

    pub fn new_rotation(a: f64) -> Self {
        let (sa, ca) = a.sin_cos();
        Self::new_custom(ca, sa, -sa, ca, 0.0, 0.0)
    }

    pub fn new_scaling_uniform(s: f64) -> Self {
        Self::new_custom(s, 0.0, 0.0, s, 0.0, 0.0)
    }

    pub fn new_translation(x: f64, y: f64) -> Self {
        Self::new_custom(1.0, 0.0, 0.0, 1.0, x, y)
    }

    /// Placement of a `w` x `h` stamp image so that its centre lands on
    /// `at`, drawn `scale` times larger and rotated by `rotation` radians.
    pub fn new_stamp_placement(w: f64, h: f64, scale: f64, rotation: f64, at: PointD) -> Self {
        let mut m = Self::new_translation(-w * 0.5, -h * 0.5);
        m.multiply(&Self::new_scaling_uniform(scale))
            .multiply(&Self::new_rotation(rotation))
            .multiply(&Self::new_translation(at.x, at.y));
        m
    }

    // ====================================================================
    // Operations (mutate self)
    // ====================================================================

    /// Post-multiply: `self = self * m` (apply `m` after `self`).
    pub fn multiply(&mut self, m: &TransAffine) -> &mut Self {
        let t0 = self.sx * m.sx + self.shy * m.shx;
        let t2 = self.shx * m.sx + self.sy * m.shx;
        let t4 = self.tx * m.sx + self.ty * m.shx + m.tx;
        self.shy = self.sx * m.shy + self.shy * m.sy;
        self.sy = self.shx * m.shy + self.sy * m.sy;
        self.ty = self.tx * m.shy + self.ty * m.sy + m.ty;
        self.sx = t0;
        self.shx = t2;
        self.tx = t4;
        self
    }

    /// Invert in place. Returns `None` (leaving `self` untouched) when the
    /// matrix is singular.
    pub fn invert(&mut self) -> Option<&mut Self> {
        let det = self.determinant();
        if det.abs() < AFFINE_EPSILON {
            return None;
        }
        let d = 1.0 / det;
        let t0 = self.sy * d;
        self.sy = self.sx * d;
        self.shy = -self.shy * d;
        self.shx = -self.shx * d;
        let t4 = -self.tx * t0 - self.ty * self.shx;
        self.ty = -self.tx * self.shy - self.ty * self.sy;
        self.sx = t0;
        self.tx = t4;
        Some(self)
    }

    // ====================================================================
    // Transformations
    // ====================================================================

    #[inline]
    pub fn transform(&self, p: PointD) -> PointD {
        PointD::new(
            p.x * self.sx + p.y * self.shx + self.tx,
            p.x * self.shy + p.y * self.sy + self.ty,
        )
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.sx * self.sy - self.shy * self.shx
    }

    /// Average scale factor.
    pub fn scale(&self) -> f64 {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let x = s * self.sx + s * self.shx;
        let y = s * self.shy + s * self.sy;
        (x * x + y * y).sqrt()
    }
}

// ============================================================================
// Tests
// ============================================================================

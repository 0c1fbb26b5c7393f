//! Line projection and interpolation.

use crate::basics::PointD;

/// Coinciding points maximal distance (epsilon).
pub const VERTEX_DIST_EPSILON: f64 = 1e-14;

/// Parameter `u` of the projection of `p` onto the infinite line `a → b`.
///
/// `u = 0` is `a`, `u = 1` is `b`; values outside `[0, 1]` lie beyond the
/// endpoints. Returns 0 if the line is degenerate.
#[inline]
pub fn calc_line_point_u(a: PointD, b: PointD, p: PointD) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < VERTEX_DIST_EPSILON {
        return 0.0;
    }
    ((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq
}

/// Orthogonal projection of `p` onto the infinite line through `a` and `b`.
///
/// A degenerate line (coincident endpoints) projects everything onto `a`.
#[inline]
pub fn project_on_line(a: PointD, b: PointD, p: PointD) -> PointD {
    a.lerp(b, calc_line_point_u(a, b, p))
}

/// Linear interpolation between two scalars.
#[inline]
pub fn lerp(a: f64, b: f64, k: f64) -> f64 {
    a + (b - a) * k
}

// ============================================================================
// Tests
// ============================================================================

//! Cubic Bézier curves.
//!
//! A [`CubicBezier`] is the 4-point segment between two path anchors. De
//! Casteljau subdivision splits it into two cubic halves that retrace the
//! original exactly.

use serde::{Deserialize, Serialize};

use crate::basics::{PointD, RectD};

/// Parameter step used when a curve is sampled coarsely.
pub const CURVE_SAMPLE_STEP: f64 = 0.1;

/// Cubic Bézier segment: anchor `p1`, controls `c1`/`c2`, anchor `p2`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CubicBezier {
    pub p1: PointD,
    pub c1: PointD,
    pub c2: PointD,
    pub p2: PointD,
}

impl CubicBezier {
    pub const fn new(p1: PointD, c1: PointD, c2: PointD, p2: PointD) -> Self {
        Self { p1, c1, c2, p2 }
    }

    /// A straight segment from `a` to `b` with controls at the thirds.
    pub fn line(a: PointD, b: PointD) -> Self {
        Self::new(a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b)
    }

    pub fn points(&self) -> [PointD; 4] {
        [self.p1, self.c1, self.c2, self.p2]
    }

    /// Point at parameter `t`. Values outside `[0, 1]` extrapolate the
    /// polynomial.
    pub fn evaluate(&self, t: f64) -> PointD {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        PointD::new(
            a * self.p1.x + b * self.c1.x + c * self.c2.x + d * self.p2.x,
            a * self.p1.y + b * self.c1.y + c * self.c2.y + d * self.p2.y,
        )
    }

    /// De Casteljau split at `t = 0.5`.
    pub fn subdivide(&self) -> (CubicBezier, CubicBezier) {
        self.subdivide_at(0.5)
    }

    /// De Casteljau split at an arbitrary `t`. The left half covers
    /// `[0, t]`, the right half `[t, 1]`.
    pub fn subdivide_at(&self, t: f64) -> (CubicBezier, CubicBezier) {
        let p12 = self.p1.lerp(self.c1, t);
        let p23 = self.c1.lerp(self.c2, t);
        let p34 = self.c2.lerp(self.p2, t);
        let p123 = p12.lerp(p23, t);
        let p234 = p23.lerp(p34, t);
        let p1234 = p123.lerp(p234, t);
        (
            CubicBezier::new(self.p1, p12, p123, p1234),
            CubicBezier::new(p1234, p234, p34, self.p2),
        )
    }

    /// The piece of the curve between `t0` and `t1` (`t0 < t1`).
    pub fn segment(&self, t0: f64, t1: f64) -> CubicBezier {
        if t0 <= 0.0 {
            return self.subdivide_at(t1).0;
        }
        let (_, right) = self.subdivide_at(t0);
        if t1 >= 1.0 {
            return right;
        }
        right.subdivide_at((t1 - t0) / (1.0 - t0)).0
    }

    /// Bounding box of the control polygon; it always contains the curve.
    pub fn bounds(&self) -> RectD {
        let mut r = RectD::new(self.p1.x, self.p1.y, self.p1.x, self.p1.y);
        r.add_point(self.c1);
        r.add_point(self.c2);
        r.add_point(self.p2);
        r
    }

    /// Nearest coarse sample to `p`: `(t, distance)` over `t = 0, step, .., 1`.
    pub fn nearest_sample(&self, p: PointD, step: f64) -> (f64, f64) {
        let n = (1.0 / step).round().max(1.0) as u32;
        (0..=n)
            .map(|i| {
                let t = i as f64 / n as f64;
                (t, self.evaluate(t).distance(p))
            })
            .fold((0.0, f64::INFINITY), |best, s| if s.1 < best.1 { s } else { best })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn s_curve() -> CubicBezier {
        CubicBezier::new(
            PointD::new(0.0, 0.0),
            PointD::new(30.0, 80.0),
            PointD::new(70.0, -40.0),
            PointD::new(100.0, 20.0),
        )
    }

    #[test]
    fn test_evaluate_endpoints() {
        let c = s_curve();
        assert!(c.evaluate(0.0).distance(c.p1) < EPS);
        assert!(c.evaluate(1.0).distance(c.p2) < EPS);
    }

    #[test]
    fn test_evaluate_line_midpoint() {
        let c = CubicBezier::line(PointD::new(0.0, 0.0), PointD::new(10.0, 4.0));
        assert!(c.evaluate(0.5).distance(PointD::new(5.0, 2.0)) < EPS);
    }

    #[test]
    fn test_evaluate_extrapolates() {
        let c = CubicBezier::line(PointD::new(0.0, 0.0), PointD::new(10.0, 0.0));
        assert!(c.evaluate(2.0).distance(PointD::new(20.0, 0.0)) < EPS);
    }

    #[test]
    fn test_subdivide_retraces_curve() {
        let c = s_curve();
        let (left, right) = c.subdivide();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!(left.evaluate(t).distance(c.evaluate(t * 0.5)) < EPS);
            assert!(right.evaluate(t).distance(c.evaluate(0.5 + t * 0.5)) < EPS);
        }
        assert_eq!(left.p2, right.p1);
    }

    #[test]
    fn test_subdivide_at_arbitrary_t() {
        let c = s_curve();
        let (left, right) = c.subdivide_at(0.3);
        assert!(left.evaluate(1.0).distance(c.evaluate(0.3)) < EPS);
        assert!(left.evaluate(0.5).distance(c.evaluate(0.15)) < EPS);
        assert!(right.evaluate(0.5).distance(c.evaluate(0.65)) < EPS);
    }

    #[test]
    fn test_segment() {
        let c = s_curve();
        let mid = c.segment(0.2, 0.6);
        assert!(mid.evaluate(0.0).distance(c.evaluate(0.2)) < EPS);
        assert!(mid.evaluate(1.0).distance(c.evaluate(0.6)) < EPS);
        assert!(mid.evaluate(0.5).distance(c.evaluate(0.4)) < EPS);
        assert_eq!(c.segment(0.0, 1.0), c.subdivide_at(1.0).0);
    }

    #[test]
    fn test_bounds_contain_samples() {
        let c = s_curve();
        let b = c.bounds();
        for i in 0..=20 {
            let p = c.evaluate(i as f64 / 20.0);
            assert!(b.hit_test(p.x, p.y));
        }
    }

    #[test]
    fn test_nearest_sample() {
        let c = CubicBezier::line(PointD::new(0.0, 0.0), PointD::new(100.0, 0.0));
        let (t, d) = c.nearest_sample(PointD::new(31.0, 5.0), CURVE_SAMPLE_STEP);
        assert!((t - 0.3).abs() < EPS);
        assert!((d - (1.0f64 + 25.0).sqrt()).abs() < EPS);
    }
}

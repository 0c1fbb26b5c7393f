//! Perspective guides: fisheye projection and grid / ruler snapping.
//!
//! Only fisheye grids constrain points. Linear grids carry their vanishing
//! points for the host to draw, and straight-edge snapping is the separate
//! [`snap_to_ruler`] primitive.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::basics::PointD;
use crate::math::project_on_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    #[default]
    Linear,
    Fisheye,
}

/// A perspective aid. `radius > 0` is expected for fisheye grids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveGrid {
    #[serde(rename = "type")]
    pub kind: GridKind,
    #[serde(default)]
    pub vanishing_points: Vec<PointD>,
    pub center: PointD,
    pub radius: f64,
}

impl PerspectiveGrid {
    pub fn fisheye(center: PointD, radius: f64) -> Self {
        Self {
            kind: GridKind::Fisheye,
            vanishing_points: Vec::new(),
            center,
            radius,
        }
    }

    pub fn linear(vanishing_points: Vec<PointD>) -> Self {
        Self {
            kind: GridKind::Linear,
            vanishing_points,
            ..Default::default()
        }
    }
}

// ============================================================================
// Fisheye transform
// ============================================================================

/// Spherical fisheye mapping around `center`.
///
/// The polar distance `d` becomes the angle `phi = d / radius * pi/2`, and
/// the point is re-projected at `radius * sin(phi)` along its original
/// direction, so distant points bend toward the rim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransFisheye {
    pub center: PointD,
    pub radius: f64,
}

impl TransFisheye {
    pub fn new(center: PointD, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn transform(&self, p: PointD) -> PointD {
        let d = p - self.center;
        let dist = d.length();
        if dist == 0.0 {
            return self.center;
        }
        let phi = dist / self.radius * FRAC_PI_2;
        let r = self.radius * phi.sin();
        let angle = d.y.atan2(d.x);
        PointD::new(
            self.center.x + r * angle.cos(),
            self.center.y + r * angle.sin(),
        )
    }
}

pub fn project_fisheye(point: PointD, center: PointD, radius: f64) -> PointD {
    TransFisheye::new(center, radius).transform(point)
}

// ============================================================================
// Snapping
// ============================================================================

/// Clamp onto a fisheye grid's circle; every other grid passes through.
pub fn snap_to_grid(point: PointD, grid: &PerspectiveGrid) -> PointD {
    if grid.kind != GridKind::Fisheye {
        return point;
    }
    let d = point - grid.center;
    let dist = d.length();
    if dist <= grid.radius {
        return point;
    }
    let angle = d.y.atan2(d.x);
    PointD::new(
        grid.center.x + grid.radius * angle.cos(),
        grid.center.y + grid.radius * angle.sin(),
    )
}

/// Orthogonal projection onto the infinite line through `p1` and `p2`.
/// A degenerate ruler (`p1 == p2`) snaps to `p1`.
pub fn snap_to_ruler(point: PointD, p1: PointD, p2: PointD) -> PointD {
    project_on_line(p1, p2, point)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_fisheye_center_is_fixed() {
        let c = PointD::new(10.0, 20.0);
        assert_eq!(project_fisheye(c, c, 50.0), c);
    }

    #[test]
    fn test_fisheye_rim_maps_to_rim() {
        let c = PointD::new(0.0, 0.0);
        let p = project_fisheye(PointD::new(100.0, 0.0), c, 100.0);
        assert!(p.distance(PointD::new(100.0, 0.0)) < EPS);
    }

    #[test]
    fn test_fisheye_bends_outward_and_keeps_direction() {
        let c = PointD::new(0.0, 0.0);
        let p = project_fisheye(PointD::new(30.0, 40.0), c, 100.0);
        // dist 50 -> phi = pi/4 -> r = 100 * sin(pi/4)
        let expected = 100.0 * std::f64::consts::FRAC_1_SQRT_2;
        assert!((p.length() - expected).abs() < EPS);
        assert!((p.y.atan2(p.x) - 40f64.atan2(30.0)).abs() < EPS);
    }

    #[test]
    fn test_fisheye_far_points_curve_back() {
        let c = PointD::new(0.0, 0.0);
        let p = project_fisheye(PointD::new(150.0, 0.0), c, 100.0);
        assert!(p.x < 100.0);
    }

    #[test]
    fn test_snap_to_grid_fisheye_clamps() {
        let grid = PerspectiveGrid::fisheye(PointD::new(0.0, 0.0), 10.0);
        let outside = snap_to_grid(PointD::new(0.0, 25.0), &grid);
        assert!(outside.distance(PointD::new(0.0, 10.0)) < EPS);
        let inside = PointD::new(3.0, 4.0);
        assert_eq!(snap_to_grid(inside, &grid), inside);
    }

    #[test]
    fn test_snap_to_grid_linear_passthrough() {
        let grid = PerspectiveGrid::linear(vec![PointD::new(500.0, 0.0)]);
        let p = PointD::new(1234.0, -5.0);
        assert_eq!(snap_to_grid(p, &grid), p);
    }

    #[test]
    fn test_snap_to_ruler() {
        let p = snap_to_ruler(
            PointD::new(5.0, 7.0),
            PointD::new(0.0, 0.0),
            PointD::new(10.0, 0.0),
        );
        assert!(p.distance(PointD::new(5.0, 0.0)) < EPS);

        // Beyond the ruler ends the line is infinite.
        let p = snap_to_ruler(
            PointD::new(20.0, 20.0),
            PointD::new(0.0, 0.0),
            PointD::new(1.0, 1.0),
        );
        assert!(p.distance(PointD::new(20.0, 20.0)) < EPS);
    }

    #[test]
    fn test_snap_to_degenerate_ruler() {
        let a = PointD::new(3.0, 3.0);
        assert_eq!(snap_to_ruler(PointD::new(9.0, 1.0), a, a), a);
    }

    #[test]
    fn test_grid_serde() {
        let json = r#"{"type":"fisheye","vanishingPoints":[],"center":{"x":1.0,"y":2.0},"radius":40.0}"#;
        let grid: PerspectiveGrid = serde_json::from_str(json).unwrap();
        assert_eq!(grid, PerspectiveGrid::fisheye(PointD::new(1.0, 2.0), 40.0));
    }
}

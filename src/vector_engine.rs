//! Vector path geometry: curve intersections and the intersection eraser.
//!
//! A path is an ordered list of [`BezierControlPoint`]s. Segment `i` runs
//! from `anchor[i]` through `control_out[i]` and `control_in[i + 1]` to
//! `anchor[i + 1]`. Everything here is a pure function over path values.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::basics::{PointD, RectD};
use crate::curves::{CubicBezier, CURVE_SAMPLE_STEP};

/// Both curves smaller than this (bounding box side) count as converged.
pub const INTERSECTION_FLATNESS: f64 = 0.5;
/// Recursion depth at which a candidate pair is accepted regardless of size.
pub const INTERSECTION_MAX_DEPTH: u32 = 10;
/// Intersection points closer than this are merged.
pub const INTERSECTION_DEDUP_DISTANCE: f64 = 0.1;
/// Default pick distance for the eraser.
pub const ERASE_THRESHOLD: f64 = 10.0;

const PARAM_EPSILON: f64 = 1e-9;

// ============================================================================
// Paths
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BezierControlPoint {
    pub anchor: PointD,
    pub control_in: PointD,
    pub control_out: PointD,
}

impl BezierControlPoint {
    /// A corner point whose handles sit on the anchor.
    pub fn corner(anchor: PointD) -> Self {
        Self {
            anchor,
            control_in: anchor,
            control_out: anchor,
        }
    }
}

pub type BezierPath = Vec<BezierControlPoint>;

/// Segment `i` of `path`; the caller guarantees `i + 1 < path.len()`.
pub fn path_segment(path: &[BezierControlPoint], i: usize) -> CubicBezier {
    let (a, b) = (&path[i], &path[i + 1]);
    CubicBezier::new(a.anchor, a.control_out, b.control_in, b.anchor)
}

pub fn path_segments(path: &[BezierControlPoint]) -> impl Iterator<Item = CubicBezier> + '_ {
    path.windows(2)
        .map(|w| CubicBezier::new(w[0].anchor, w[0].control_out, w[1].control_in, w[1].anchor))
}

// ============================================================================
// Intersections
// ============================================================================

/// An approximate crossing between two curves together with the curve
/// parameters at which it was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionHit {
    pub point: PointD,
    pub t_a: f64,
    pub t_b: f64,
}

/// Approximate intersection points of two cubic curves.
///
/// Bounding boxes are compared first; overlapping pairs are subdivided until
/// both pieces are smaller than [`INTERSECTION_FLATNESS`] or the depth limit
/// is passed, and the centroid of the four endpoints is taken as the hit.
/// Points within [`INTERSECTION_DEDUP_DISTANCE`] of an earlier one are
/// dropped.
pub fn find_intersections(a: &CubicBezier, b: &CubicBezier) -> Vec<PointD> {
    find_intersection_hits(a, b).into_iter().map(|h| h.point).collect()
}

/// Like [`find_intersections`] but keeps the parameter on each curve.
pub fn find_intersection_hits(a: &CubicBezier, b: &CubicBezier) -> Vec<IntersectionHit> {
    let mut raw = Vec::new();
    collect_hits(a, (0.0, 1.0), b, (0.0, 1.0), 0, &mut raw);

    let mut out: Vec<IntersectionHit> = Vec::with_capacity(raw.len());
    for hit in raw {
        if !out
            .iter()
            .any(|h| h.point.distance(hit.point) < INTERSECTION_DEDUP_DISTANCE)
        {
            out.push(hit);
        }
    }
    out
}

fn collect_hits(
    a: &CubicBezier,
    ta: (f64, f64),
    b: &CubicBezier,
    tb: (f64, f64),
    depth: u32,
    out: &mut Vec<IntersectionHit>,
) {
    let (ba, bb) = (a.bounds(), b.bounds());
    if !ba.overlaps(&bb) {
        return;
    }

    let small = |w: f64, h: f64| w.max(h) < INTERSECTION_FLATNESS;
    if (small(ba.width(), ba.height()) && small(bb.width(), bb.height()))
        || depth > INTERSECTION_MAX_DEPTH
    {
        let point = PointD::new(
            (a.p1.x + a.p2.x + b.p1.x + b.p2.x) * 0.25,
            (a.p1.y + a.p2.y + b.p1.y + b.p2.y) * 0.25,
        );
        out.push(IntersectionHit {
            point,
            t_a: (ta.0 + ta.1) * 0.5,
            t_b: (tb.0 + tb.1) * 0.5,
        });
        return;
    }

    let (a1, a2) = a.subdivide();
    let (b1, b2) = b.subdivide();
    let ma = (ta.0 + ta.1) * 0.5;
    let mb = (tb.0 + tb.1) * 0.5;
    for (sa, ra) in [(&a1, (ta.0, ma)), (&a2, (ma, ta.1))] {
        for (sb, rb) in [(&b1, (tb.0, mb)), (&b2, (mb, tb.1))] {
            collect_hits(sa, ra, sb, rb, depth + 1, out);
        }
    }
}

// ============================================================================
// Intersection eraser
// ============================================================================

/// What the eraser removes from the path under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EraseMode {
    /// Remove the whole path.
    #[default]
    WholePath,
    /// Remove only the stretch between the nearest crossings with other
    /// paths on either side of the click.
    SplitAtIntersections,
}

/// Where the click landed: path index and global parameter (segment index
/// plus local `t`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathHit {
    pub path: usize,
    pub param: f64,
    pub distance: f64,
}

/// Nearest path to `click` within `threshold`, sampled at `t` steps of 0.1.
pub fn hit_test_paths(click: PointD, paths: &[BezierPath], threshold: f64) -> Option<PathHit> {
    let mut best: Option<PathHit> = None;
    for (pi, path) in paths.iter().enumerate() {
        for (si, seg) in path_segments(path).enumerate() {
            // Samples lie inside the control hull.
            let b = seg.bounds();
            let reach = RectD::new(
                b.x1 - threshold,
                b.y1 - threshold,
                b.x2 + threshold,
                b.y2 + threshold,
            );
            if !reach.hit_test(click.x, click.y) {
                continue;
            }
            let (t, d) = seg.nearest_sample(click, CURVE_SAMPLE_STEP);
            if d <= threshold && best.map_or(true, |b| d < b.distance) {
                best = Some(PathHit {
                    path: pi,
                    param: si as f64 + t,
                    distance: d,
                });
            }
        }
    }
    best
}

/// Erase around `click`. Returns the new path list; when nothing lies within
/// `threshold` the input comes back unchanged.
pub fn erase_to_intersection(
    click: PointD,
    paths: &[BezierPath],
    threshold: f64,
    mode: EraseMode,
) -> Vec<BezierPath> {
    let Some(hit) = hit_test_paths(click, paths, threshold) else {
        return paths.to_vec();
    };

    let mut out = Vec::with_capacity(paths.len() + 1);
    out.extend(paths[..hit.path].iter().cloned());
    if mode == EraseMode::SplitAtIntersections {
        let (lo, hi) = bracketing_crossings(paths, hit);
        debug!(path = hit.path, param = hit.param, ?lo, ?hi, "erase split");
        let path = &paths[hit.path];
        if let Some(lo) = lo {
            if let Some(prefix) = path_prefix(path, lo) {
                out.push(prefix);
            }
        }
        if let Some(hi) = hi {
            if let Some(suffix) = path_suffix(path, hi) {
                out.push(suffix);
            }
        }
    } else {
        debug!(path = hit.path, "erase whole path");
    }
    out.extend(paths[hit.path + 1..].iter().cloned());
    out
}

/// Global parameters of the nearest crossings with other paths before and
/// after the click.
fn bracketing_crossings(paths: &[BezierPath], hit: PathHit) -> (Option<f64>, Option<f64>) {
    let target = &paths[hit.path];
    let mut lo: Option<f64> = None;
    let mut hi: Option<f64> = None;
    for (si, seg) in path_segments(target).enumerate() {
        for (pi, other) in paths.iter().enumerate() {
            if pi == hit.path {
                continue;
            }
            for oseg in path_segments(other) {
                for h in find_intersection_hits(&seg, &oseg) {
                    let u = si as f64 + h.t_a;
                    if u < hit.param && lo.map_or(true, |l| u > l) {
                        lo = Some(u);
                    } else if u > hit.param && hi.map_or(true, |v| u < v) {
                        hi = Some(u);
                    }
                }
            }
        }
    }
    (lo, hi)
}

/// The part of `path` from its start up to global parameter `u`. `None`
/// when that part is empty.
fn path_prefix(path: &[BezierControlPoint], u: f64) -> Option<BezierPath> {
    let seg = u.floor() as usize;
    let t = u - seg as f64;
    if seg + 1 >= path.len() {
        return Some(path.to_vec());
    }
    let mut out: BezierPath = path[..=seg].to_vec();
    if t > PARAM_EPSILON {
        let (left, _) = path_segment(path, seg).subdivide_at(t);
        out[seg].control_out = left.c1;
        out.push(BezierControlPoint {
            anchor: left.p2,
            control_in: left.c2,
            control_out: left.p2,
        });
    } else {
        out[seg].control_out = out[seg].anchor;
    }
    (out.len() >= 2).then_some(out)
}

/// The part of `path` from global parameter `u` to its end.
fn path_suffix(path: &[BezierControlPoint], u: f64) -> Option<BezierPath> {
    let seg = u.floor() as usize;
    let t = u - seg as f64;
    if seg + 1 >= path.len() {
        return None;
    }
    let mut out: BezierPath;
    if t > PARAM_EPSILON {
        let (_, right) = path_segment(path, seg).subdivide_at(t);
        out = Vec::with_capacity(path.len() - seg);
        out.push(BezierControlPoint {
            anchor: right.p1,
            control_in: right.p1,
            control_out: right.c1,
        });
        out.extend_from_slice(&path[seg + 1..]);
        out[1].control_in = right.c2;
    } else {
        out = path[seg..].to_vec();
        out[0].control_in = out[0].anchor;
    }
    (out.len() >= 2).then_some(out)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line_path(a: (f64, f64), b: (f64, f64)) -> BezierPath {
        let (a, b) = (PointD::new(a.0, a.1), PointD::new(b.0, b.1));
        let seg = CubicBezier::line(a, b);
        vec![
            BezierControlPoint {
                anchor: a,
                control_in: a,
                control_out: seg.c1,
            },
            BezierControlPoint {
                anchor: b,
                control_in: seg.c2,
                control_out: b,
            },
        ]
    }

    #[test]
    fn test_disjoint_boxes_no_intersections() {
        let a = CubicBezier::line(PointD::new(0.0, 0.0), PointD::new(10.0, 10.0));
        let b = CubicBezier::line(PointD::new(20.0, 0.0), PointD::new(30.0, 10.0));
        assert!(find_intersections(&a, &b).is_empty());
    }

    #[test]
    fn test_x_shape_single_cluster() {
        let a = CubicBezier::line(PointD::new(0.0, 0.0), PointD::new(100.0, 100.0));
        let b = CubicBezier::line(PointD::new(0.0, 100.0), PointD::new(100.0, 0.0));
        let points = find_intersections(&a, &b);
        assert!(!points.is_empty());
        let centre = PointD::new(50.0, 50.0);
        for p in &points {
            assert!(p.distance(centre) < 1.0, "{p:?} far from crossing");
        }
        // Distinct after dedup, but all inside one convergence cell.
        for (i, p) in points.iter().enumerate() {
            for q in &points[i + 1..] {
                let d = p.distance(*q);
                assert!(d >= INTERSECTION_DEDUP_DISTANCE);
                assert!(d < INTERSECTION_FLATNESS, "{p:?} and {q:?} are {d} apart");
            }
        }
    }

    #[test]
    fn test_hit_test_picks_nearest_path() {
        let paths = vec![
            line_path((0.0, 0.0), (100.0, 0.0)),
            line_path((0.0, 20.0), (100.0, 20.0)),
        ];
        let hit = hit_test_paths(PointD::new(50.0, 16.0), &paths, 5.0).unwrap();
        assert_eq!(hit.path, 1);
        assert!((hit.param - 0.5).abs() < 1e-9);
        assert!(hit_test_paths(PointD::new(50.0, 10.0), &paths, 5.0).is_none());
    }

    #[test]
    fn test_hit_test_reaches_past_segment_bounds() {
        let paths = vec![line_path((0.0, 0.0), (100.0, 0.0))];
        // Outside the segment's box but within threshold of its end.
        let hit = hit_test_paths(PointD::new(104.0, 0.0), &paths, 5.0).unwrap();
        assert_eq!(hit.param, 1.0);
        assert!((hit.distance - 4.0).abs() < 1e-9);
        assert!(hit_test_paths(PointD::new(106.0, 0.0), &paths, 5.0).is_none());
    }

    #[test]
    fn test_hits_carry_parameters() {
        let a = CubicBezier::line(PointD::new(0.0, 50.0), PointD::new(100.0, 50.0));
        let b = CubicBezier::line(PointD::new(25.0, 0.0), PointD::new(25.0, 100.0));
        let hits = find_intersection_hits(&a, &b);
        assert!(!hits.is_empty());
        for h in hits {
            assert!((h.t_a - 0.25).abs() < 0.01, "t_a {}", h.t_a);
            assert!((h.t_b - 0.5).abs() < 0.01, "t_b {}", h.t_b);
        }
    }

    #[test]
    fn test_path_segments() {
        let mut path = line_path((0.0, 0.0), (10.0, 0.0));
        path.push(BezierControlPoint::corner(PointD::new(10.0, 10.0)));
        let segs: Vec<_> = path_segments(&path).collect();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[1].p1, PointD::new(10.0, 0.0));
        assert_eq!(segs[1].p2, PointD::new(10.0, 10.0));
        assert_eq!(segs[1], path_segment(&path, 1));
    }

    #[test]
    fn test_erase_miss_returns_unchanged() {
        let paths = vec![line_path((0.0, 0.0), (100.0, 0.0))];
        let out = erase_to_intersection(
            PointD::new(50.0, 50.0),
            &paths,
            ERASE_THRESHOLD,
            EraseMode::WholePath,
        );
        assert_eq!(out, paths);
    }

    #[test]
    fn test_erase_whole_path() {
        let paths = vec![
            line_path((0.0, 0.0), (100.0, 0.0)),
            line_path((0.0, 50.0), (100.0, 50.0)),
        ];
        let out = erase_to_intersection(
            PointD::new(40.0, 48.0),
            &paths,
            ERASE_THRESHOLD,
            EraseMode::WholePath,
        );
        assert_eq!(out, vec![paths[0].clone()]);
    }

    #[test]
    fn test_erase_picks_nearest_path() {
        let paths = vec![
            line_path((0.0, 0.0), (100.0, 0.0)),
            line_path((0.0, 6.0), (100.0, 6.0)),
        ];
        let out = erase_to_intersection(
            PointD::new(50.0, 4.0),
            &paths,
            ERASE_THRESHOLD,
            EraseMode::WholePath,
        );
        assert_eq!(out, vec![paths[0].clone()]);
    }

    #[test]
    fn test_split_between_crossings() {
        // Horizontal stroke crossed by verticals at x = 30 and x = 70.
        let paths = vec![
            line_path((0.0, 50.0), (100.0, 50.0)),
            line_path((30.0, 0.0), (30.0, 100.0)),
            line_path((70.0, 0.0), (70.0, 100.0)),
        ];
        let out = erase_to_intersection(
            PointD::new(50.0, 51.0),
            &paths,
            ERASE_THRESHOLD,
            EraseMode::SplitAtIntersections,
        );
        assert_eq!(out.len(), 4);
        let prefix = &out[0];
        let suffix = &out[1];
        assert_eq!(prefix[0].anchor, PointD::new(0.0, 50.0));
        assert!((prefix.last().unwrap().anchor.x - 30.0).abs() < 0.5);
        assert!((suffix[0].anchor.x - 70.0).abs() < 0.5);
        assert_eq!(suffix.last().unwrap().anchor, PointD::new(100.0, 50.0));
        assert_eq!(&out[2..], &paths[1..]);
    }

    #[test]
    fn test_split_with_one_side_open() {
        let paths = vec![
            line_path((0.0, 50.0), (100.0, 50.0)),
            line_path((30.0, 0.0), (30.0, 100.0)),
        ];
        let out = erase_to_intersection(
            PointD::new(80.0, 50.0),
            &paths,
            ERASE_THRESHOLD,
            EraseMode::SplitAtIntersections,
        );
        // Only the piece left of the crossing survives.
        assert_eq!(out.len(), 2);
        assert!((out[0].last().unwrap().anchor.x - 30.0).abs() < 0.5);
        assert_eq!(out[1], paths[1]);
    }

    #[test]
    fn test_split_without_crossings_removes_path() {
        let paths = vec![line_path((0.0, 0.0), (100.0, 0.0))];
        let out = erase_to_intersection(
            PointD::new(10.0, 1.0),
            &paths,
            ERASE_THRESHOLD,
            EraseMode::SplitAtIntersections,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_prefix_and_suffix_retrace_path() {
        let path = line_path((0.0, 0.0), (90.0, 30.0));
        let seg = path_segment(&path, 0);
        let prefix = path_prefix(&path, 0.4).unwrap();
        let suffix = path_suffix(&path, 0.4).unwrap();
        let p = path_segment(&prefix, 0);
        let s = path_segment(&suffix, 0);
        assert!(p.evaluate(0.5).distance(seg.evaluate(0.2)) < 1e-9);
        assert!(s.evaluate(0.5).distance(seg.evaluate(0.7)) < 1e-9);
        assert!(path_prefix(&path, 0.0).is_none());
        assert!(path_suffix(&path, 1.0).is_none());
    }

    #[test]
    fn test_control_point_serde_names() {
        let cp = BezierControlPoint::corner(PointD::new(1.0, 2.0));
        let json = serde_json::to_string(&cp).unwrap();
        assert!(json.contains("\"controlIn\""));
        assert!(json.contains("\"controlOut\""));
        let back: BezierControlPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cp);
    }
}

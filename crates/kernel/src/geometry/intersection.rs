use serde::{Deserialize, Serialize};

use crate::tolerance::Tolerance;

use super::curves::{Circle3d, Curve, CurveSegment, Line3d};
use super::point::Point3d;
use super::surfaces::{Plane, Sphere};
use super::vector::Vec3;

/// A crossing of two curve segments, in each segment's normalized parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveHit {
    pub u0: f64,
    pub u1: f64,
    /// Crossing point, on the first segment.
    pub point: Point3d,
}

/// A half-infinite ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Point3d, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalized_or(Vec3::Z),
        }
    }

    pub fn at(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    /// The first `length` units of the ray as a line segment.
    pub fn segment(&self, length: f64) -> CurveSegment {
        CurveSegment::line(self.origin, self.at(length))
    }
}

/// Result of a ray-surface intersection. `normal` is the oriented surface
/// normal at the hit, not flipped towards the ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaySurfaceHit {
    pub point: Point3d,
    pub t: f64,
    pub normal: Vec3,
}

const PARALLEL_EPS: f64 = 1e-9;

// ─── Curve-Curve ─────────────────────────────────────────────────────────────

/// Intersects two bounded segments. Overlapping collinear or co-circular
/// segments report the segment ends that lie on the other segment.
/// Hits are sorted by `u0`.
pub fn intersect_segments(a: &CurveSegment, b: &CurveSegment, tol: &Tolerance) -> Vec<CurveHit> {
    let mut candidates = vec![a.start_point(), a.end_point(), b.start_point(), b.end_point()];
    match (&a.curve, &b.curve) {
        (Curve::Line(l1), Curve::Line(l2)) => candidates.extend(line_line_candidates(l1, l2)),
        (Curve::Line(l), Curve::Circle(c)) | (Curve::Circle(c), Curve::Line(l)) => {
            candidates.extend(line_circle_candidates(l, c))
        }
        (Curve::Circle(c1), Curve::Circle(c2)) => {
            candidates.extend(circle_circle_candidates(c1, c2, tol))
        }
    }

    let mut hits: Vec<CurveHit> = Vec::new();
    for p in candidates {
        if !a.passes_through(&p, tol.coincidence) || !b.passes_through(&p, tol.coincidence) {
            continue;
        }
        let point = a.project(&p);
        if hits.iter().any(|h| tol.points_coincident(&h.point, &point)) {
            continue;
        }
        hits.push(CurveHit {
            u0: a.param_of_clamped(&point),
            u1: b.param_of_clamped(&point),
            point,
        });
    }
    hits.sort_by(|x, y| x.u0.total_cmp(&y.u0));
    hits
}

fn line_line_candidates(l1: &Line3d, l2: &Line3d) -> Vec<Point3d> {
    let w = l1.origin - l2.origin;
    let b = l1.direction.dot(&l2.direction);
    let d = l1.direction.dot(&w);
    let e = l2.direction.dot(&w);
    let denom = 1.0 - b * b;
    if denom < PARALLEL_EPS {
        return Vec::new();
    }
    let t1 = (b * e - d) / denom;
    let t2 = (e - b * d) / denom;
    vec![l1.evaluate(t1).midpoint(&l2.evaluate(t2))]
}

fn line_circle_candidates(line: &Line3d, circle: &Circle3d) -> Vec<Point3d> {
    let along = circle.normal.dot(&line.direction);
    if along.abs() > PARALLEL_EPS {
        let t = circle.normal.dot(&(circle.center - line.origin)) / along;
        return vec![line.evaluate(t)];
    }
    // Line parallel to the circle's plane: solve |o + t d - c| = r.
    let w = line.origin - circle.center;
    let half_b = line.direction.dot(&w);
    let disc = half_b * half_b - (w.length_squared() - circle.radius * circle.radius);
    if disc < 0.0 {
        // Near-tangent lines still produce their closest approach.
        return vec![line.evaluate(-half_b)];
    }
    let root = disc.sqrt();
    vec![line.evaluate(-half_b - root), line.evaluate(-half_b + root)]
}

fn circle_circle_candidates(c1: &Circle3d, c2: &Circle3d, tol: &Tolerance) -> Vec<Point3d> {
    if c1.normal.cross(&c2.normal).length() < PARALLEL_EPS {
        let offset = c2.center - c1.center;
        let in_plane = offset - c1.normal * offset.dot(&c1.normal);
        let d = in_plane.length();
        if d < tol.coincidence {
            // Concentric: either the same circle (ends cover it) or disjoint.
            return Vec::new();
        }
        let e = in_plane / d;
        let a = (c1.radius * c1.radius - c2.radius * c2.radius + d * d) / (2.0 * d);
        let h = (c1.radius * c1.radius - a * a).max(0.0).sqrt();
        let base = c1.center + e * a;
        let side = c1.normal.cross(&e);
        return vec![base + side * h, base - side * h];
    }
    // Points of c2 lying in c1's plane: A cos θ + B sin θ = C.
    let a = c2.radius * c1.normal.dot(&c2.x_axis);
    let b = c2.radius * c1.normal.dot(&c2.y_axis());
    let c = c1.normal.dot(&(c1.center - c2.center));
    let r = (a * a + b * b).sqrt();
    if r < 1e-15 {
        return Vec::new();
    }
    let phi = b.atan2(a);
    let delta = (c / r).clamp(-1.0, 1.0).acos();
    vec![c2.evaluate(phi + delta), c2.evaluate(phi - delta)]
}

// ─── Ray-Surface ─────────────────────────────────────────────────────────────

pub fn ray_plane(ray: &Ray, plane: &Plane) -> Option<RaySurfaceHit> {
    let denom = ray.direction.dot(&plane.normal);
    if denom.abs() < 1e-15 {
        return None;
    }
    let t = (plane.origin - ray.origin).dot(&plane.normal) / denom;
    if t < 0.0 {
        return None;
    }
    Some(RaySurfaceHit {
        point: ray.at(t),
        t,
        normal: plane.normal,
    })
}

pub fn ray_sphere(ray: &Ray, sphere: &Sphere) -> Vec<RaySurfaceHit> {
    let oc = ray.origin - sphere.center;
    let half_b = oc.dot(&ray.direction);
    let c = oc.length_squared() - sphere.radius * sphere.radius;
    let disc = half_b * half_b - c;
    if disc < 0.0 {
        return Vec::new();
    }
    let root = disc.sqrt();
    let mut hits = Vec::new();
    for t in [-half_b - root, -half_b + root] {
        if t >= 0.0 {
            let point = ray.at(t);
            hits.push(RaySurfaceHit {
                point,
                t,
                normal: sphere.normal_at(&point),
            });
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn tol() -> Tolerance {
        Tolerance::default()
    }

    #[test]
    fn test_crossing_lines() {
        let a = CurveSegment::line(Point3d::new(0.0, 0.0, 0.0), Point3d::new(2.0, 0.0, 0.0));
        let b = CurveSegment::line(Point3d::new(0.5, -1.0, 0.0), Point3d::new(0.5, 3.0, 0.0));
        let hits = intersect_segments(&a, &b, &tol());
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!(hits[0].u0, 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(hits[0].u1, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_skew_lines_do_not_hit() {
        let a = CurveSegment::line(Point3d::new(0.0, 0.0, 0.0), Point3d::new(2.0, 0.0, 0.0));
        let b = CurveSegment::line(Point3d::new(1.0, -1.0, 1.0), Point3d::new(1.0, 1.0, 1.0));
        assert!(intersect_segments(&a, &b, &tol()).is_empty());
    }

    #[test]
    fn test_collinear_overlap_reports_inner_ends() {
        let a = CurveSegment::line(Point3d::new(0.0, 0.0, 0.0), Point3d::new(2.0, 0.0, 0.0));
        let b = CurveSegment::line(Point3d::new(1.0, 0.0, 0.0), Point3d::new(3.0, 0.0, 0.0));
        let hits = intersect_segments(&a, &b, &tol());
        assert_eq!(hits.len(), 2);
        assert_abs_diff_eq!(hits[0].u0, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(hits[0].u1, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hits[1].u0, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hits[1].u1, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_touching_at_shared_end() {
        let a = CurveSegment::line(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0));
        let b = CurveSegment::line(Point3d::new(1.0, 0.0, 0.0), Point3d::new(1.0, 1.0, 0.0));
        let hits = intersect_segments(&a, &b, &tol());
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!(hits[0].u0, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hits[0].u1, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_line_through_circle_plane() {
        let circle = Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 1.0);
        let arc = CurveSegment::full_circle(circle);
        let line = CurveSegment::line(Point3d::new(0.0, 1.0, -1.0), Point3d::new(0.0, 1.0, 1.0));
        let hits = intersect_segments(&line, &arc, &tol());
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!(hits[0].point, Point3d::new(0.0, 1.0, 0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(hits[0].u1, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_line_in_circle_plane() {
        let circle = Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 1.0);
        let arc = CurveSegment::arc(circle, 0.0, PI);
        let line = CurveSegment::line(Point3d::new(-2.0, 0.5, 0.0), Point3d::new(2.0, 0.5, 0.0));
        let hits = intersect_segments(&line, &arc, &tol());
        assert_eq!(hits.len(), 2);
        for h in &hits {
            assert_abs_diff_eq!(h.point.distance_to(&Point3d::ORIGIN), 1.0, epsilon = 1e-9);
        }
        assert!(hits[0].u0 < hits[1].u0);
    }

    #[test]
    fn test_perpendicular_circles() {
        let horizontal = Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 1.0);
        let vertical = Circle3d::with_axes(Point3d::ORIGIN, Vec3::Y, Vec3::Z, 1.0);
        let hits = intersect_segments(
            &CurveSegment::full_circle(horizontal),
            &CurveSegment::arc(vertical, 0.0, PI),
            &tol(),
        );
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!(hits[0].point.y.abs(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hits[0].point.x.abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ray_hits() {
        let ray = Ray::new(Point3d::new(0.0, 0.0, -5.0), Vec3::Z);
        let plane = Plane::new(Point3d::ORIGIN, -Vec3::Z);
        let hit = ray_plane(&ray, &plane).unwrap();
        assert_abs_diff_eq!(hit.t, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hit.normal, -Vec3::Z, epsilon = 1e-12);

        let sphere = Sphere::new(Point3d::ORIGIN, 1.0);
        let hits = ray_sphere(&ray, &sphere);
        assert_eq!(hits.len(), 2);
        assert_abs_diff_eq!(hits[0].t, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hits[1].normal, Vec3::Z, epsilon = 1e-12);
    }
}

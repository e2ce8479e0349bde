use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use super::point::Point3d;
use super::vector::Vec3;

/// Analytic carrier curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    Line(Line3d),
    Circle(Circle3d),
}

/// An infinite line parameterized by arc length from `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3d {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Line3d {
    pub fn new(origin: Point3d, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalized_or(Vec3::X),
        }
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    pub fn parameter_of(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.direction)
    }

    pub fn distance_to_point(&self, p: &Point3d) -> f64 {
        p.distance_to(&self.evaluate(self.parameter_of(p)))
    }
}

/// A circle in 3D space, parameterized by angle about `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle3d {
    pub center: Point3d,
    pub normal: Vec3,
    pub radius: f64,
    /// Reference direction in the plane (angle zero).
    pub x_axis: Vec3,
}

impl Circle3d {
    pub fn new(center: Point3d, normal: Vec3, radius: f64) -> Self {
        let normal = normal.normalized_or(Vec3::Z);
        Self {
            center,
            normal,
            radius,
            x_axis: normal.any_perpendicular(),
        }
    }

    pub fn with_axes(center: Point3d, normal: Vec3, x_axis: Vec3, radius: f64) -> Self {
        Self {
            center,
            normal: normal.normalized_or(Vec3::Z),
            x_axis: x_axis.normalized_or(Vec3::X),
            radius,
        }
    }

    pub fn y_axis(&self) -> Vec3 {
        self.normal.cross(&self.x_axis)
    }

    pub fn evaluate(&self, angle: f64) -> Point3d {
        self.center
            + self.x_axis * (self.radius * angle.cos())
            + self.y_axis() * (self.radius * angle.sin())
    }

    pub fn derivative(&self, angle: f64) -> Vec3 {
        self.x_axis * (-self.radius * angle.sin()) + self.y_axis() * (self.radius * angle.cos())
    }

    /// Angle of the projection of `p` onto the circle's plane, in `[0, 2π)`.
    pub fn angle_of(&self, p: &Point3d) -> f64 {
        let d = *p - self.center;
        d.dot(&self.y_axis()).atan2(d.dot(&self.x_axis)).rem_euclid(TAU)
    }
}

impl Curve {
    pub fn evaluate(&self, t: f64) -> Point3d {
        match self {
            Curve::Line(l) => l.evaluate(t),
            Curve::Circle(c) => c.evaluate(t),
        }
    }

    pub fn derivative(&self, t: f64) -> Vec3 {
        match self {
            Curve::Line(l) => l.direction,
            Curve::Circle(c) => c.derivative(t),
        }
    }
}

/// A bounded piece of a carrier curve. Callers address it with a
/// normalized parameter `u`, where `u = 0` is the start and `u = 1` the end.
/// `t_end < t_start` is allowed and means the segment runs backwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveSegment {
    pub curve: Curve,
    pub t_start: f64,
    pub t_end: f64,
}

impl CurveSegment {
    pub fn line(a: Point3d, b: Point3d) -> Self {
        let line = Line3d::new(a, b - a);
        Self {
            curve: Curve::Line(line),
            t_start: 0.0,
            t_end: a.distance_to(&b),
        }
    }

    pub fn arc(circle: Circle3d, t_start: f64, t_end: f64) -> Self {
        Self {
            curve: Curve::Circle(circle),
            t_start,
            t_end,
        }
    }

    pub fn full_circle(circle: Circle3d) -> Self {
        Self::arc(circle, 0.0, TAU)
    }

    fn span(&self) -> f64 {
        self.t_end - self.t_start
    }

    pub fn t_at(&self, u: f64) -> f64 {
        self.t_start + u * self.span()
    }

    pub fn point(&self, u: f64) -> Point3d {
        self.curve.evaluate(self.t_at(u))
    }

    pub fn start_point(&self) -> Point3d {
        self.point(0.0)
    }

    pub fn end_point(&self) -> Point3d {
        self.point(1.0)
    }

    pub fn middle_point(&self) -> Point3d {
        self.point(0.5)
    }

    /// Unit tangent in the direction of increasing `u`.
    pub fn tangent(&self, u: f64) -> Vec3 {
        let d = self.curve.derivative(self.t_at(u)) * self.span().signum();
        d.normalized_or(Vec3::X)
    }

    pub fn tangent_at_point(&self, p: &Point3d) -> Vec3 {
        self.tangent(self.param_of(p))
    }

    /// Normalized parameter of the projection of `p`. Not clamped: points
    /// beyond the ends map outside `[0, 1]`.
    pub fn param_of(&self, p: &Point3d) -> f64 {
        let span = self.span();
        if span.abs() < 1e-15 {
            return 0.0;
        }
        match &self.curve {
            Curve::Line(l) => (l.parameter_of(p) - self.t_start) / span,
            Curve::Circle(c) => {
                let width = span.abs();
                let mut rel = ((c.angle_of(p) - self.t_start) * span.signum()).rem_euclid(TAU);
                if rel > (width + TAU) / 2.0 {
                    rel -= TAU;
                }
                rel / width
            }
        }
    }

    pub fn param_of_clamped(&self, p: &Point3d) -> f64 {
        self.param_of(p).clamp(0.0, 1.0)
    }

    /// Closest point on the bounded segment.
    pub fn project(&self, p: &Point3d) -> Point3d {
        self.point(self.param_of_clamped(p))
    }

    pub fn distance_to(&self, p: &Point3d) -> f64 {
        p.distance_to(&self.project(p))
    }

    pub fn passes_through(&self, p: &Point3d, tolerance: f64) -> bool {
        self.distance_to(p) < tolerance
    }

    /// The piece between two normalized parameters of this segment.
    pub fn sub(&self, u0: f64, u1: f64) -> Self {
        Self {
            curve: self.curve,
            t_start: self.t_at(u0),
            t_end: self.t_at(u1),
        }
    }

    pub fn split_at_param(&self, u: f64) -> (Self, Self) {
        (self.sub(0.0, u), self.sub(u, 1.0))
    }

    pub fn split_at(&self, p: &Point3d) -> (Self, Self) {
        self.split_at_param(self.param_of(p))
    }

    pub fn inverted(&self) -> Self {
        Self {
            curve: self.curve,
            t_start: self.t_end,
            t_end: self.t_start,
        }
    }

    /// Same closed curve, starting at `u` instead of 0.
    pub fn rebased(&self, u: f64) -> Self {
        let t = self.t_at(u);
        Self {
            curve: self.curve,
            t_start: t,
            t_end: t + self.span(),
        }
    }

    pub fn length(&self) -> f64 {
        match &self.curve {
            Curve::Line(_) => self.span().abs(),
            Curve::Circle(c) => c.radius * self.span().abs(),
        }
    }

    pub fn is_closed(&self, tolerance: f64) -> bool {
        self.length() > tolerance && self.start_point().distance_to(&self.end_point()) < tolerance
    }

    /// Points along the segment, both ends included.
    pub fn tessellate(&self) -> Vec<Point3d> {
        let segments = match &self.curve {
            Curve::Line(_) => 1,
            Curve::Circle(_) => ((self.span().abs() / (PI / 16.0)).ceil() as usize).max(2),
        };
        (0..=segments)
            .map(|i| self.point(i as f64 / segments as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn quarter_arc() -> CurveSegment {
        CurveSegment::arc(
            Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 2.0),
            0.0,
            PI / 2.0,
        )
    }

    #[test]
    fn test_line_segment_parameterization() {
        let seg = CurveSegment::line(Point3d::new(1.0, 0.0, 0.0), Point3d::new(3.0, 0.0, 0.0));
        assert_abs_diff_eq!(seg.point(0.5), Point3d::new(2.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(seg.param_of(&Point3d::new(2.5, 1.0, 0.0)), 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(seg.param_of(&Point3d::new(5.0, 0.0, 0.0)), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(seg.length(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_split_preserves_geometry() {
        let seg = CurveSegment::line(Point3d::ORIGIN, Point3d::new(4.0, 0.0, 0.0));
        let (a, b) = seg.split_at(&Point3d::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(a.end_point(), Point3d::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(b.start_point(), Point3d::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(b.end_point(), seg.end_point(), epsilon = 1e-12);
        assert_abs_diff_eq!(b.tangent(0.3), seg.tangent(0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_inverted_tangent_flips() {
        let arc = quarter_arc();
        let inv = arc.inverted();
        assert_abs_diff_eq!(inv.start_point(), arc.end_point(), epsilon = 1e-12);
        assert_abs_diff_eq!(inv.tangent(0.0), -arc.tangent(1.0), epsilon = 1e-12);
        assert_abs_diff_eq!(arc.tangent(0.0), Vec3::Y, epsilon = 1e-12);
    }

    #[test]
    fn test_arc_param_of_handles_backward_and_wrapped_ranges() {
        let arc = quarter_arc();
        let mid = arc.middle_point();
        assert_abs_diff_eq!(arc.param_of(&mid), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(arc.inverted().param_of(&mid), 0.5, epsilon = 1e-12);

        let circle = Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 1.0);
        let wrapped = CurveSegment::arc(circle, 1.5 * PI, 2.5 * PI);
        assert_abs_diff_eq!(wrapped.param_of(&Point3d::new(1.0, 0.0, 0.0)), 0.5, epsilon = 1e-12);
        // A point just before the start maps slightly below zero.
        let before = circle.evaluate(1.5 * PI - 0.01);
        assert!(wrapped.param_of(&before) < 0.0);
    }

    #[test]
    fn test_full_circle_is_closed_and_rebases() {
        let circle = Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 1.0);
        let full = CurveSegment::full_circle(circle);
        assert!(full.is_closed(1e-6));
        let rebased = full.rebased(0.25);
        assert_abs_diff_eq!(rebased.start_point(), Point3d::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(rebased.end_point(), rebased.start_point(), epsilon = 1e-12);
        assert!(!quarter_arc().is_closed(1e-6));
    }

    #[test]
    fn test_projection_clamps_to_ends() {
        let seg = CurveSegment::line(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(seg.project(&Point3d::new(3.0, 1.0, 0.0)), seg.end_point());
        assert!(seg.passes_through(&Point3d::new(0.5, 1e-8, 0.0), 1e-6));
        assert!(!seg.passes_through(&Point3d::new(1.5, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_tessellation_covers_both_ends() {
        let pts = quarter_arc().tessellate();
        assert!(pts.len() >= 3);
        assert_abs_diff_eq!(pts[0], quarter_arc().start_point(), epsilon = 1e-12);
        for p in &pts {
            assert_abs_diff_eq!(p.distance_to(&Point3d::ORIGIN), 2.0, epsilon = 1e-12);
        }
    }
}

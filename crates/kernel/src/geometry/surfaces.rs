use serde::{Deserialize, Serialize};

use super::point::{Point2d, Point3d};
use super::vector::Vec3;

/// Discriminant of [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Plane,
    Sphere,
}

/// Surfaces a face can lie on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Surface {
    Plane(Plane),
    Sphere(Sphere),
}

/// An infinite plane. `u_axis x v_axis == normal` always holds, so the
/// parameter space is counter-clockwise about the normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3d,
    pub normal: Vec3,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
}

impl Plane {
    pub fn new(origin: Point3d, normal: Vec3) -> Self {
        let normal = normal.normalized_or(Vec3::Z);
        let u_axis = normal.any_perpendicular();
        Self::from_frame(origin, normal, u_axis)
    }

    /// Plane with a preferred in-plane direction; `u_axis` is re-orthogonalized.
    pub fn from_frame(origin: Point3d, normal: Vec3, u_axis: Vec3) -> Self {
        let normal = normal.normalized_or(Vec3::Z);
        let u_axis = (u_axis - normal * u_axis.dot(&normal))
            .normalized()
            .unwrap_or_else(|| normal.any_perpendicular());
        Self {
            origin,
            normal,
            u_axis,
            v_axis: normal.cross(&u_axis),
        }
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        self.origin + self.u_axis * u + self.v_axis * v
    }

    /// Signed distance along the normal.
    pub fn distance_to_point(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.normal)
    }

    pub fn project_point(&self, p: &Point3d) -> Point3d {
        *p - self.normal * self.distance_to_point(p)
    }

    pub fn parameters_of(&self, p: &Point3d) -> (f64, f64) {
        let d = *p - self.origin;
        (d.dot(&self.u_axis), d.dot(&self.v_axis))
    }

    pub fn inverted(&self) -> Self {
        Self {
            origin: self.origin,
            normal: -self.normal,
            u_axis: self.u_axis,
            v_axis: -self.v_axis,
        }
    }

    /// Same carrier plane regardless of normal sign.
    pub fn coplanar_unsigned(&self, other: &Plane, tolerance: f64) -> bool {
        let parallel = 1.0 - self.normal.dot(&other.normal).abs();
        parallel < tolerance && self.distance_to_point(&other.origin).abs() < tolerance
    }
}

/// A sphere. Its parameter space is the stereographic chart centred on
/// `pole`: points of the hemisphere around `pole` map into the disk of
/// radius `radius`, and the antipode of `pole` is at infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Point3d,
    pub radius: f64,
    pub pole: Vec3,
    pub ref_dir: Vec3,
    /// false once the sphere has been inverted (normals point at the center).
    pub outward: bool,
}

impl Sphere {
    pub fn new(center: Point3d, radius: f64) -> Self {
        Self::with_pole(center, radius, Vec3::Z)
    }

    pub fn with_pole(center: Point3d, radius: f64, pole: Vec3) -> Self {
        let pole = pole.normalized_or(Vec3::Z);
        Self {
            center,
            radius,
            pole,
            ref_dir: pole.any_perpendicular(),
            outward: true,
        }
    }

    pub fn normal_at(&self, p: &Point3d) -> Vec3 {
        let n = (*p - self.center).normalized_or(self.pole);
        if self.outward { n } else { -n }
    }

    fn chart_axes(&self) -> (Vec3, Vec3) {
        let v_axis = self.pole.cross(&self.ref_dir);
        if self.outward {
            (self.ref_dir, v_axis)
        } else {
            (self.ref_dir, -v_axis)
        }
    }

    pub fn parameters_of(&self, p: &Point3d) -> (f64, f64) {
        let d = (*p - self.center).normalized_or(self.pole);
        let (u_axis, v_axis) = self.chart_axes();
        let denom = (1.0 + d.dot(&self.pole)).max(1e-12);
        (
            self.radius * d.dot(&u_axis) / denom,
            self.radius * d.dot(&v_axis) / denom,
        )
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        let (a, b) = (u / self.radius, v / self.radius);
        let s = a * a + b * b;
        let (u_axis, v_axis) = self.chart_axes();
        let dir = u_axis * (2.0 * a / (1.0 + s))
            + v_axis * (2.0 * b / (1.0 + s))
            + self.pole * ((1.0 - s) / (1.0 + s));
        self.center + dir * self.radius
    }

    pub fn inverted(&self) -> Self {
        Self {
            outward: !self.outward,
            ..*self
        }
    }
}

impl Surface {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Surface::Plane(_) => SurfaceKind::Plane,
            Surface::Sphere(_) => SurfaceKind::Sphere,
        }
    }

    pub fn as_plane(&self) -> Option<&Plane> {
        match self {
            Surface::Plane(p) => Some(p),
            Surface::Sphere(_) => None,
        }
    }

    /// Oriented unit normal at a point on (or near) the surface.
    pub fn normal_at(&self, p: &Point3d) -> Vec3 {
        match self {
            Surface::Plane(plane) => plane.normal,
            Surface::Sphere(sphere) => sphere.normal_at(p),
        }
    }

    pub fn to_uv(&self, p: &Point3d) -> Point2d {
        let (u, v) = match self {
            Surface::Plane(plane) => plane.parameters_of(p),
            Surface::Sphere(sphere) => sphere.parameters_of(p),
        };
        Point2d::new(u, v)
    }

    pub fn evaluate(&self, uv: &Point2d) -> Point3d {
        match self {
            Surface::Plane(plane) => plane.evaluate(uv.x, uv.y),
            Surface::Sphere(sphere) => sphere.evaluate(uv.x, uv.y),
        }
    }

    /// Closest point on the surface.
    pub fn project(&self, p: &Point3d) -> Point3d {
        match self {
            Surface::Plane(plane) => plane.project_point(p),
            Surface::Sphere(sphere) => {
                let d = (*p - sphere.center).normalized_or(sphere.pole);
                sphere.center + d * sphere.radius
            }
        }
    }

    pub fn inverted(&self) -> Self {
        match self {
            Surface::Plane(plane) => Surface::Plane(plane.inverted()),
            Surface::Sphere(sphere) => Surface::Sphere(sphere.inverted()),
        }
    }

    pub fn coplanar_unsigned(&self, other: &Surface, tolerance: f64) -> bool {
        match (self, other) {
            (Surface::Plane(a), Surface::Plane(b)) => a.coplanar_unsigned(b, tolerance),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_plane_frame_is_right_handed() {
        let plane = Plane::new(Point3d::ORIGIN, Vec3::new(0.0, 0.0, 2.0));
        assert_abs_diff_eq!(plane.u_axis.cross(&plane.v_axis), plane.normal, epsilon = 1e-12);
        let inv = plane.inverted();
        assert_abs_diff_eq!(inv.u_axis.cross(&inv.v_axis), inv.normal, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_uv_round_trip() {
        let plane = Plane::from_frame(Point3d::new(1.0, 1.0, 1.0), Vec3::Y, Vec3::X);
        let p = Point3d::new(3.0, 1.0, -2.0);
        let (u, v) = plane.parameters_of(&p);
        assert_abs_diff_eq!(plane.evaluate(u, v), p, epsilon = 1e-12);
    }

    #[test]
    fn test_coplanar_unsigned_ignores_orientation() {
        let a = Surface::Plane(Plane::new(Point3d::new(0.0, 0.0, 1.0), Vec3::Z));
        let b = Surface::Plane(Plane::new(Point3d::new(5.0, 3.0, 1.0), -Vec3::Z));
        let c = Surface::Plane(Plane::new(Point3d::new(0.0, 0.0, 1.5), Vec3::Z));
        assert!(a.coplanar_unsigned(&b, 1e-6));
        assert!(!a.coplanar_unsigned(&c, 1e-6));
    }

    #[test]
    fn test_sphere_chart_round_trip_and_orientation() {
        let sphere = Sphere::new(Point3d::new(1.0, 0.0, 0.0), 2.0);
        let p = Point3d::new(1.0 + 2.0 * 0.6, 0.0, 2.0 * 0.8);
        let (u, v) = sphere.parameters_of(&p);
        assert_abs_diff_eq!(sphere.evaluate(u, v), p, epsilon = 1e-9);
        // The pole maps to the chart origin and the equator to radius `radius`.
        let (u0, v0) = sphere.parameters_of(&Point3d::new(1.0, 0.0, 2.0));
        assert_abs_diff_eq!(u0, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v0, 0.0, epsilon = 1e-12);
        let (ue, ve) = sphere.parameters_of(&Point3d::new(3.0, 0.0, 0.0));
        assert_abs_diff_eq!((ue * ue + ve * ve).sqrt(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_inversion_flips_normal_and_chart() {
        let sphere = Sphere::new(Point3d::ORIGIN, 1.0);
        let inv = sphere.inverted();
        let p = Point3d::new(0.0, 0.0, 1.0);
        assert_abs_diff_eq!(inv.normal_at(&p), -Vec3::Z, epsilon = 1e-12);
        let q = Point3d::new(0.6, 0.0, 0.8);
        let (_, v) = sphere.parameters_of(&q);
        let (_, vi) = inv.parameters_of(&q);
        assert_abs_diff_eq!(v, -vi, epsilon = 1e-12);
    }

    #[test]
    fn test_kind_discriminant() {
        let plane = Surface::Plane(Plane::new(Point3d::ORIGIN, Vec3::X));
        let sphere = Surface::Sphere(Sphere::new(Point3d::ORIGIN, 1.0));
        assert_eq!(plane.kind(), SurfaceKind::Plane);
        assert_eq!(sphere.kind(), SurfaceKind::Sphere);
        assert!(sphere.as_plane().is_none());
    }
}

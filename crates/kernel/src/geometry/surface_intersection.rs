use crate::tolerance::Tolerance;

use super::curves::{Circle3d, Curve, Line3d};
use super::point::Point3d;
use super::surfaces::{Plane, Sphere, Surface};

/// Unbounded intersection curves of two surfaces. Tangent contacts and
/// coincident surfaces produce no curve; coincident planes are handled by
/// overlap merging instead.
pub fn intersect_surfaces(s1: &Surface, s2: &Surface, tol: &Tolerance) -> Vec<Curve> {
    let curve = match (s1, s2) {
        (Surface::Plane(a), Surface::Plane(b)) => plane_plane(a, b, tol).map(Curve::Line),
        (Surface::Plane(p), Surface::Sphere(s)) | (Surface::Sphere(s), Surface::Plane(p)) => {
            plane_sphere(p, s, tol).map(Curve::Circle)
        }
        (Surface::Sphere(a), Surface::Sphere(b)) => sphere_sphere(a, b, tol).map(Curve::Circle),
    };
    curve.into_iter().collect()
}

// ─── Plane–Plane ─────────────────────────────────────────────────────────────

pub fn plane_plane(p1: &Plane, p2: &Plane, tol: &Tolerance) -> Option<Line3d> {
    let cross = p1.normal.cross(&p2.normal);
    let cross_len = cross.length();
    if cross_len < tol.angular.max(1e-12) {
        return None;
    }
    let dir = cross / cross_len;

    // Plane i: n_i . P = d_i
    let d1 = p1.origin.to_vec3().dot(&p1.normal);
    let d2 = p2.origin.to_vec3().dot(&p2.normal);
    let n1n2 = p1.normal.dot(&p2.normal);
    let denom = 1.0 - n1n2 * n1n2;
    let c1 = (d1 - d2 * n1n2) / denom;
    let c2 = (d2 - d1 * n1n2) / denom;
    let origin = Point3d::ORIGIN + p1.normal * c1 + p2.normal * c2;

    Some(Line3d::new(origin, dir))
}

// ─── Plane–Sphere ────────────────────────────────────────────────────────────

pub fn plane_sphere(plane: &Plane, sphere: &Sphere, tol: &Tolerance) -> Option<Circle3d> {
    let signed_dist = plane.distance_to_point(&sphere.center);
    if signed_dist.abs() > sphere.radius - tol.coincidence {
        return None;
    }
    let radius = (sphere.radius * sphere.radius - signed_dist * signed_dist).sqrt();
    let center = sphere.center - plane.normal * signed_dist;
    Some(Circle3d::with_axes(center, plane.normal, plane.u_axis, radius))
}

// ─── Sphere–Sphere ───────────────────────────────────────────────────────────

pub fn sphere_sphere(a: &Sphere, b: &Sphere, tol: &Tolerance) -> Option<Circle3d> {
    let axis = b.center - a.center;
    let d = axis.length();
    if d < tol.coincidence
        || d > a.radius + b.radius - tol.coincidence
        || d < (a.radius - b.radius).abs() + tol.coincidence
    {
        return None;
    }
    let e = axis / d;
    let offset = (d * d + a.radius * a.radius - b.radius * b.radius) / (2.0 * d);
    let radius = (a.radius * a.radius - offset * offset).max(0.0).sqrt();
    Some(Circle3d::new(a.center + e * offset, e, radius))
}

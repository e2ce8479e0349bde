//! Analytic implementation of the geometry oracles for lines, circles,
//! planes and spheres.

use nalgebra::{Matrix3, SymmetricEigen};
use tracing::trace;

use crate::tolerance::Tolerance;
use crate::topology::brep::{EntityStore, FaceId, LoopId};
use crate::traits::GeometryKernel;

use super::bounds::BoundingBox;
use super::curves::{Circle3d, Curve, CurveSegment};
use super::intersection::{self, CurveHit, Ray, RaySurfaceHit};
use super::point::{Point2d, Point3d};
use super::polygon::{self, Containment};
use super::surface_intersection;
use super::surfaces::{Plane, Surface};
use super::vector::Vec3;

/// Default [`GeometryKernel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticKernel;

/// A loop's tessellated boundary mapped into the surface's parameter space.
pub fn loop_uv_polygon(store: &EntityStore, surface: &Surface, loop_id: LoopId) -> Vec<Point2d> {
    store.loops[loop_id]
        .half_edges
        .iter()
        .flat_map(|&he| {
            let mut pts = store.half_edge_points(he);
            pts.pop();
            pts
        })
        .map(|p| surface.to_uv(&p))
        .collect()
}

fn face_uv_region(store: &EntityStore, face: FaceId) -> (Vec<Point2d>, Vec<Vec<Point2d>>) {
    let f = &store.faces[face];
    let outer = loop_uv_polygon(store, &f.surface, f.outer_loop);
    let holes = f
        .inner_loops
        .iter()
        .map(|&l| loop_uv_polygon(store, &f.surface, l))
        .collect();
    (outer, holes)
}

fn circle_bounds(circle: &Circle3d) -> BoundingBox {
    let n = circle.normal;
    let r = circle.radius;
    let ext = Vec3::new(
        r * (1.0 - n.x * n.x).max(0.0).sqrt(),
        r * (1.0 - n.y * n.y).max(0.0).sqrt(),
        r * (1.0 - n.z * n.z).max(0.0).sqrt(),
    );
    BoundingBox::new(circle.center - ext, circle.center + ext)
}

fn best_fit_plane(points: &[Point3d], like: &Plane) -> Option<Plane> {
    let centroid = Point3d::centroid(points)?;
    let mut cov = Matrix3::<f64>::zeros();
    for p in points {
        let d = (*p - centroid).to_nalgebra();
        cov += d * d.transpose();
    }
    let eig = SymmetricEigen::new(cov);
    let normal = Vec3::from_nalgebra(&eig.eigenvectors.column(eig.eigenvalues.imin()).into_owned());
    let normal = normal.normalized()?;
    let normal = if normal.dot(&like.normal) < 0.0 { -normal } else { normal };
    Some(Plane::from_frame(centroid, normal, like.u_axis))
}

impl GeometryKernel for AnalyticKernel {
    fn intersect_curves(&self, a: &CurveSegment, b: &CurveSegment, tol: &Tolerance) -> Vec<CurveHit> {
        intersection::intersect_segments(a, b, tol)
    }

    fn intersect_surfaces(
        &self,
        s1: &Surface,
        s2: &Surface,
        bounds: &BoundingBox,
        tol: &Tolerance,
    ) -> Vec<CurveSegment> {
        if bounds.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        for curve in surface_intersection::intersect_surfaces(s1, s2, tol) {
            match curve {
                Curve::Line(line) => {
                    if let Some((t0, t1)) = bounds.clip_line(&line.origin, &line.direction) {
                        if t1 - t0 > tol.coincidence {
                            out.push(CurveSegment {
                                curve,
                                t_start: t0,
                                t_end: t1,
                            });
                        }
                    }
                }
                Curve::Circle(circle) => {
                    if circle_bounds(&circle).intersects(bounds) {
                        out.push(CurveSegment::full_circle(circle));
                    }
                }
            }
        }
        trace!(curves = out.len(), "surface intersection");
        out
    }

    fn face_bounds(&self, store: &EntityStore, face: FaceId, tol: &Tolerance) -> BoundingBox {
        store.face_bounding_box(face).expanded(tol.coincidence)
    }

    fn classify_point_in_face(
        &self,
        store: &EntityStore,
        face: FaceId,
        point: &Point3d,
        tol: &Tolerance,
    ) -> Containment {
        let (outer, holes) = face_uv_region(store, face);
        let uv = store.faces[face].surface.to_uv(point);
        polygon::classify_in_region(&outer, &holes, &uv, tol.coincidence)
    }

    fn bounding_surface(&self, points: &[Point3d], like: &Surface) -> Option<Surface> {
        match like {
            Surface::Plane(plane) => best_fit_plane(points, plane).map(Surface::Plane),
            Surface::Sphere(_) => Some(*like),
        }
    }

    fn intersect_ray_surface(&self, ray: &Ray, surface: &Surface) -> Vec<RaySurfaceHit> {
        match surface {
            Surface::Plane(plane) => intersection::ray_plane(ray, plane).into_iter().collect(),
            Surface::Sphere(sphere) => intersection::ray_sphere(ray, sphere),
        }
    }

    fn pick_point_in_face(&self, store: &EntityStore, face: FaceId, tol: &Tolerance) -> Option<Point3d> {
        let (outer, holes) = face_uv_region(store, face);
        let uv = polygon::pick_interior_point(&outer, &holes, tol.coincidence)?;
        Some(store.faces[face].surface.evaluate(&uv))
    }
}

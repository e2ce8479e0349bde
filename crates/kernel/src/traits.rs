//! Collaborator seams of the Boolean engine.
//!
//! The engine never evaluates geometry directly: it asks a [`GeometryKernel`]
//! for intersections, classifications and fitted surfaces, and hands the
//! loops it detects to a [`FaceSynthesizer`]. `BooleanEngine` itself lives in
//! `boolean/mod.rs`.

use crate::geometry::bounds::BoundingBox;
use crate::geometry::curves::CurveSegment;
use crate::geometry::intersection::{CurveHit, Ray, RaySurfaceHit};
use crate::geometry::point::Point3d;
use crate::geometry::polygon::Containment;
use crate::geometry::surfaces::Surface;
use crate::tolerance::Tolerance;
use crate::topology::brep::{EntityStore, FaceId, LoopId};

/// Geometric oracles consumed by the Boolean pipeline.
pub trait GeometryKernel {
    /// Crossings of two bounded segments, sorted by the first segment's parameter.
    fn intersect_curves(&self, a: &CurveSegment, b: &CurveSegment, tol: &Tolerance) -> Vec<CurveHit>;

    /// Intersection curves of two surfaces, bounded to `bounds`.
    fn intersect_surfaces(
        &self,
        s1: &Surface,
        s2: &Surface,
        bounds: &BoundingBox,
        tol: &Tolerance,
    ) -> Vec<CurveSegment>;

    /// Region of space a face's intersection curves can possibly occupy.
    fn face_bounds(&self, store: &EntityStore, face: FaceId, tol: &Tolerance) -> BoundingBox;

    /// Point-in-face test in the face's parameter space, holes included.
    fn classify_point_in_face(
        &self,
        store: &EntityStore,
        face: FaceId,
        point: &Point3d,
        tol: &Tolerance,
    ) -> Containment;

    /// Surface fitted through `points`, oriented like `like`.
    fn bounding_surface(&self, points: &[Point3d], like: &Surface) -> Option<Surface>;

    /// Forward hits of a ray against the untrimmed surface.
    fn intersect_ray_surface(&self, ray: &Ray, surface: &Surface) -> Vec<RaySurfaceHit>;

    /// A point strictly inside the trimmed face.
    fn pick_point_in_face(&self, store: &EntityStore, face: FaceId, tol: &Tolerance) -> Option<Point3d>;
}

/// Turns a set of closed loops lying on one face's surface into faces.
pub trait FaceSynthesizer {
    fn loops_to_faces(
        &self,
        store: &mut EntityStore,
        origin: FaceId,
        loops: Vec<LoopId>,
        tol: &Tolerance,
    ) -> Vec<FaceId>;
}

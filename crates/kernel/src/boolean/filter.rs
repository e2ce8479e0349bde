//! Selection of the synthesized faces that bound the result.

use std::collections::BTreeSet;

use tracing::{debug, instrument, trace};

use crate::geometry::intersection::Ray;
use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;
use crate::topology::brep::*;

use super::context::RunContext;
use super::engine::BoolOp;

/// Length of the segment the ray cast tests edges against.
const RAY_LENGTH: f64 = 3000.0;

/// A synthesized face and the operand its origin face belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateFace {
    pub face: FaceId,
    pub origin_shell: Option<ShellId>,
}

/// Keeps every face connected, through faces of the candidate set, to a
/// face that carries a new edge. Candidate order is preserved.
#[instrument(skip_all, fields(candidates = candidates.len()))]
pub fn filter_by_new_edges(store: &EntityStore, ctx: &RunContext<'_>, candidates: &[CandidateFace]) -> Vec<FaceId> {
    let valid: BTreeSet<FaceId> = candidates.iter().map(|c| c.face).collect();
    let mut result: Vec<FaceId> = Vec::new();
    let mut accepted = BTreeSet::new();

    for candidate in candidates {
        let reached = traverse_faces(store, candidate.face, &valid, |face| {
            accepted.contains(&face) || store.face_half_edges(face).any(|he| ctx.is_new_nm(store, he))
        });
        if reached {
            accepted.insert(candidate.face);
            result.push(candidate.face);
        }
    }
    debug!(kept = result.len(), "faces kept by new-edge reachability");
    result
}

/// Depth-first walk over twin adjacency. Stops and returns `true` as soon
/// as `found` accepts a face.
fn traverse_faces(
    store: &EntityStore,
    start: FaceId,
    valid: &BTreeSet<FaceId>,
    mut found: impl FnMut(FaceId) -> bool,
) -> bool {
    let mut stack = vec![start];
    let mut seen = BTreeSet::new();
    while let Some(face) = stack.pop() {
        if !seen.insert(face) {
            continue;
        }
        if found(face) {
            return true;
        }
        if !valid.contains(&face) {
            continue;
        }
        for he in store.face_half_edges(face) {
            for twin in store.twins(he) {
                if let Some(next) = store.face_of(twin).filter(|f| valid.contains(f)) {
                    stack.push(next);
                }
            }
        }
    }
    false
}

/// Keeps faces whose interior point lies inside the other operand
/// (intersection) or outside it (union). A face always counts as inside the
/// operand it came from, so for union an OR over both inside tests would
/// keep every face; union instead requires the face to be outside the other
/// operand. `pristine_a` and `pristine_b` are untouched copies of the
/// operands used for the point tests.
#[instrument(skip_all, fields(candidates = candidates.len()))]
pub fn filter_by_ray_cast(
    store: &EntityStore,
    ctx: &RunContext<'_>,
    candidates: &[CandidateFace],
    (a, pristine_a): (ShellId, ShellId),
    (b, pristine_b): (ShellId, ShellId),
) -> Vec<FaceId> {
    let mut result = Vec::new();
    for candidate in candidates {
        let Some(point) = ctx.kernel.pick_point_in_face(store, candidate.face, &ctx.tol) else {
            trace!(face = ?candidate.face, "no interior point, dropping face");
            continue;
        };
        let normal = store.faces[candidate.face].surface.normal_at(&point);
        let keep = [(a, pristine_a), (b, pristine_b)].into_iter().all(|(shell, pristine)| {
            if candidate.origin_shell == Some(shell) {
                return true;
            }
            let inside = is_point_inside_solid(store, ctx, &point, &normal, pristine);
            match ctx.op {
                BoolOp::Intersect => inside,
                // The union boundary lies inside the complement of the other operand.
                BoolOp::Union => !inside,
            }
        });
        if keep {
            result.push(candidate.face);
        }
    }
    debug!(kept = result.len(), "faces kept by ray cast");
    result
}

/// Casts a ray from `point` along `direction` and reads the containment
/// from the orientation of the closest face it hits. A ray grazing an edge
/// counts as outside.
pub fn is_point_inside_solid(
    store: &EntityStore,
    ctx: &RunContext<'_>,
    point: &Point3d,
    direction: &Vec3,
    shell: ShellId,
) -> bool {
    ray_cast(store, ctx, &Ray::new(*point, *direction), shell).unwrap_or(false)
}

fn ray_cast(store: &EntityStore, ctx: &RunContext<'_>, ray: &Ray, shell: ShellId) -> Option<bool> {
    let tol = &ctx.tol;
    let segment = ray.segment(RAY_LENGTH);
    let edge_distances: Vec<f64> = store
        .shell_edges(shell)
        .into_iter()
        .flat_map(|e| ctx.kernel.intersect_curves(&store.edges[e].curve, &segment, tol))
        .map(|hit| ray.origin.distance_squared_to(&hit.point))
        .collect();

    let mut closest: Option<(f64, bool)> = None;
    let mut hit_edge = false;
    for &face in &store.shells[shell].faces {
        let surface = store.faces[face].surface;
        let on_surface = surface.evaluate(&surface.to_uv(&ray.origin));
        if tol.eq_sq(0.0, on_surface.distance_squared_to(&ray.origin))
            && ctx.kernel.classify_point_in_face(store, face, &on_surface, tol).inside
        {
            return Some(surface.normal_at(&on_surface).dot(&ray.direction) > 0.0);
        }

        for hit in ctx.kernel.intersect_ray_surface(ray, &surface) {
            let dot = hit.normal.dot(&ray.direction);
            if tol.eq_zero(dot) {
                continue;
            }
            if !ctx.kernel.classify_point_in_face(store, face, &hit.point, tol).inside {
                continue;
            }
            let distance = ray.origin.distance_squared_to(&hit.point);
            if closest.map_or(true, |(d, _)| distance < d) {
                hit_edge = edge_distances.iter().any(|&d| tol.eq_sq(d, distance));
                closest = Some((distance, dot > 0.0));
            }
        }
    }

    if hit_edge {
        return None;
    }
    Some(closest.map_or(store.shells[shell].inverted, |(_, inside)| inside))
}

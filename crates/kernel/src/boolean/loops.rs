//! Per-face half-edge graphs and the left-most-turn loop walk over them.

use std::collections::BTreeSet;

use tracing::{debug, instrument, trace};

use crate::geometry::vector::Vec3;
use crate::tolerance::Tolerance;
use crate::topology::brep::*;

use super::context::RunContext;
use super::edges::is_same_edge;
use super::error::{BooleanError, EdgeCollision};

/// Builds the vertex-to-outgoing-half-edge graph of every solved face and
/// records the collisions found on the way.
#[instrument(skip(store, ctx))]
pub fn init_graphs(store: &EntityStore, ctx: &mut RunContext<'_>) {
    for face in ctx.solved_faces() {
        let half_edges = ctx.face_half_edges(store, face);
        let tol = ctx.tol;
        let Some(data) = ctx.face_data_mut(face) else {
            continue;
        };
        data.vertex_to_edge.clear();
        data.graph_edges.clear();
        for he in half_edges {
            let (a, b) = (store.half_edges[he].vertex_a, store.half_edges[he].vertex_b);

            // An opposite half-edge over the same curve in the same face.
            if let Some(opposite) = data.vertex_to_edge.get(&b).and_then(|list| {
                list.iter()
                    .copied()
                    .find(|&other| store.half_edges[other].vertex_b == a && is_same_edge(store, he, other, &tol))
            }) {
                data.errors.push(EdgeCollision {
                    first: opposite,
                    second: he,
                });
            }

            let list = data.vertex_to_edge.entry(a).or_default();
            for &existing in list.iter() {
                if store.half_edges[existing].vertex_b == b && is_same_edge(store, he, existing, &tol) {
                    data.errors.push(EdgeCollision {
                        first: existing,
                        second: he,
                    });
                }
            }
            list.push(he);
            data.graph_edges.push(he);
        }
        trace!(?face, edges = data.graph_edges.len(), "graph built");
    }
}

pub fn check_graph_errors(ctx: &RunContext<'_>) -> Result<(), BooleanError> {
    let collisions = ctx.collisions();
    if collisions.is_empty() {
        Ok(())
    } else {
        Err(BooleanError::EdgeCollision { collisions })
    }
}

/// Walks the face's graph, always taking the left-most turn, and returns
/// the closed loops it finds.
#[instrument(skip(store, ctx))]
pub fn detect_loops(store: &mut EntityStore, ctx: &mut RunContext<'_>, face: FaceId) -> Vec<LoopId> {
    let Some(data) = ctx.face_data(face) else {
        return Vec::new();
    };
    let mut pending = data.graph_edges.clone();
    let vertex_to_edge = data.vertex_to_edge.clone();
    let mut loops = Vec::new();
    let mut seen = BTreeSet::new();

    while let Some(start) = pending.pop() {
        if seen.contains(&start) {
            continue;
        }
        let mut walk = Vec::new();
        let mut edge = start;
        loop {
            seen.insert(edge);
            walk.push(edge);
            if store.half_edges[walk[0]].vertex_a == store.half_edges[edge].vertex_b {
                loops.push(store.add_loop(std::mem::take(&mut walk)));
                break;
            }
            let (a, b) = (store.half_edges[edge].vertex_a, store.half_edges[edge].vertex_b);
            let Some(candidates) = vertex_to_edge.get(&b) else {
                break;
            };
            let candidates: Vec<HalfEdgeId> = candidates
                .iter()
                .copied()
                .filter(|&c| store.half_edges[c].vertex_b != a || !is_same_edge(store, c, edge, &ctx.tol))
                .collect();
            match find_max_turning_left(store, ctx, face, edge, &candidates) {
                Some(next) if !seen.contains(&next) => edge = next,
                _ => break,
            }
        }
    }

    debug!(?face, loops = loops.len(), "loops detected");
    if let Some(data) = ctx.face_data_mut(face) {
        data.detected_loops = loops.clone();
    }
    loops
}

/// The candidate that turns most to the left of `pivot_edge`, seen from
/// the face normal. Ties go to new edges.
pub fn find_max_turning_left(
    store: &EntityStore,
    ctx: &RunContext<'_>,
    face: FaceId,
    pivot_edge: HalfEdgeId,
    candidates: &[HalfEdgeId],
) -> Option<HalfEdgeId> {
    let at = store.vertex_point(store.half_edges[pivot_edge].vertex_b);
    let pivot = -store.half_edge_tangent(pivot_edge, &at);
    let normal = store.faces[face].surface.normal_at(&at);

    let mut best: Option<(HalfEdgeId, f64)> = None;
    for &candidate in candidates {
        let start = store.vertex_point(store.half_edges[candidate].vertex_a);
        let vector = store.half_edge_tangent(candidate, &start);
        let measure = left_turning_measure(&pivot, &vector, &normal, &ctx.tol);
        best = match best {
            None => Some((candidate, measure)),
            Some((current, current_measure)) => {
                let better = if ctx.tol.ueq(measure, current_measure) {
                    ctx.is_new(candidate) && !ctx.is_new(current)
                } else {
                    measure < current_measure
                };
                if better {
                    Some((candidate, measure))
                } else {
                    Some((current, current_measure))
                }
            }
        };
    }
    best.map(|(he, _)| he)
}

/// Orders turns from sharpest left (near 0) to sharpest right (near 4).
/// Going straight back along the incoming edge scores 0.
pub fn left_turning_measure(v1: &Vec3, v2: &Vec3, normal: &Vec3, tol: &Tolerance) -> f64 {
    let mut measure = v1.dot(v2);
    if tol.ueq(measure, 1.0) {
        return 0.0;
    }
    measure += 3.0;
    if v1.cross(v2).dot(normal) < 0.0 {
        measure = 4.0 - measure;
    }
    measure
}

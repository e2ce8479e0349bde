//! Fusion of coincident coplanar faces between the two operands.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use crate::geometry::point::Point3d;
use crate::geometry::surfaces::SurfaceKind;
use crate::geometry::vector::Vec3;
use crate::topology::brep::*;

use super::context::RunContext;
use super::edges::is_same_edge;
use super::engine::BoolOp;
use super::error::{BooleanError, EdgeCollision};

type VertexGraph = BTreeMap<VertexId, Vec<HalfEdgeId>>;

fn overlaps_one_way(store: &EntityStore, ctx: &RunContext<'_>, f1: FaceId, f2: FaceId) -> bool {
    store.face_half_edges(f1).any(|he| {
        let p = store.vertex_point(store.half_edges[he].vertex_a);
        ctx.kernel.classify_point_in_face(store, f2, &p, &ctx.tol).inside
    })
}

fn overlaps(store: &EntityStore, ctx: &RunContext<'_>, f1: FaceId, f2: FaceId) -> bool {
    let (s1, s2) = (&store.faces[f1].surface, &store.faces[f2].surface);
    s1.kind() == SurfaceKind::Plane
        && s2.kind() == SurfaceKind::Plane
        && s1.coplanar_unsigned(s2, ctx.tol.coincidence)
        && (overlaps_one_way(store, ctx, f1, f2) || overlaps_one_way(store, ctx, f2, f1))
}

/// Groups of mutually overlapping faces, one list per operand.
pub fn find_overlapping_faces(
    store: &EntityStore,
    ctx: &RunContext<'_>,
    a: ShellId,
    b: ShellId,
) -> Vec<(Vec<FaceId>, Vec<FaceId>)> {
    let mut groups: Vec<(Vec<FaceId>, Vec<FaceId>)> = Vec::new();
    for &f1 in &store.shells[a].faces {
        for &f2 in &store.shells[b].faces {
            if !overlaps(store, ctx, f1, f2) {
                continue;
            }
            let idx = match groups.iter().position(|(g1, g2)| g1.contains(&f1) || g2.contains(&f2)) {
                Some(i) => i,
                None => {
                    groups.push((Vec::new(), Vec::new()));
                    groups.len() - 1
                }
            };
            let group = &mut groups[idx];
            if !group.0.contains(&f1) {
                group.0.push(f1);
            }
            if !group.1.contains(&f2) {
                group.1.push(f2);
            }
        }
    }
    groups
}

#[instrument(skip(store, ctx))]
pub fn merge_overlapping_faces(
    store: &mut EntityStore,
    ctx: &mut RunContext<'_>,
    a: ShellId,
    b: ShellId,
) -> Result<(), BooleanError> {
    let groups = find_overlapping_faces(store, ctx, a, b);
    debug!(groups = groups.len(), "overlapping face groups");
    for (faces1, faces2) in groups {
        merge_faces(store, ctx, &faces1, &faces2)?;
    }
    Ok(())
}

fn build_graphs(store: &EntityStore, faces: &[FaceId]) -> (VertexGraph, VertexGraph) {
    let mut forward = VertexGraph::new();
    let mut backward = VertexGraph::new();
    for &face in faces {
        for he in store.face_half_edges(face) {
            let data = &store.half_edges[he];
            forward.entry(data.vertex_a).or_default().push(he);
            backward.entry(data.vertex_b).or_default().push(he);
        }
    }
    (forward, backward)
}

#[derive(Default)]
struct Marks {
    valid: BTreeSet<HalfEdgeId>,
    invalid: BTreeSet<HalfEdgeId>,
}

/// Classifies the source half-edges leaving each destination vertex by
/// whether they run into the destination's corner at that vertex.
fn classify_against(
    store: &EntityStore,
    ctx: &RunContext<'_>,
    normal_face: FaceId,
    dest: (&VertexGraph, &VertexGraph),
    source_forward: &VertexGraph,
    marks: &mut Marks,
) -> Result<(), BooleanError> {
    let surface = store.faces[normal_face].surface;
    for (v, outgoing) in dest.0 {
        let (Some(&dest_out), Some(&dest_in)) = (outgoing.first(), dest.1.get(v).and_then(|l| l.first())) else {
            continue;
        };
        let Some(sources) = source_forward.get(v) else {
            continue;
        };
        let point = store.vertex_point(*v);
        let tangent_out = store.half_edge_tangent(dest_out, &point);
        let tangent_in = store.half_edge_tangent(dest_in, &point);
        let normal = surface.normal_at(&point);
        let inside_of = |vec: &Vec3, test: &Vec3| vec.cross(test).dot(&normal) > 0.0;

        for &source in sources {
            // Duplicate and annihilating edges are both unresolved.
            for dest_edge in [dest_out, dest_in] {
                if is_same_edge(store, source, dest_edge, &ctx.tol) {
                    return Err(BooleanError::FaceCollision {
                        collision: EdgeCollision {
                            first: source,
                            second: dest_edge,
                        },
                    });
                }
            }
            let t = store.half_edge_tangent(source, &point);
            let inside = inside_of(&tangent_out, &t) && inside_of(&tangent_in, &t);
            let keep = match ctx.op {
                BoolOp::Intersect => inside,
                BoolOp::Union => !inside,
            };
            if keep {
                marks.valid.insert(source);
            } else {
                marks.invalid.insert(source);
            }
        }
    }
    Ok(())
}

/// Orders half-edges into chains where each one starts where the previous ends.
fn chain(store: &EntityStore, mut edges: Vec<HalfEdgeId>) -> Vec<HalfEdgeId> {
    let mut out = Vec::with_capacity(edges.len());
    while !edges.is_empty() {
        let next = out
            .last()
            .and_then(|&last: &HalfEdgeId| {
                let end = store.half_edges[last].vertex_b;
                edges.iter().position(|&h| store.half_edges[h].vertex_a == end)
            })
            .unwrap_or(0);
        out.push(edges.remove(next));
    }
    out
}

fn merge_faces(
    store: &mut EntityStore,
    ctx: &mut RunContext<'_>,
    faces1: &[FaceId],
    faces2: &[FaceId],
) -> Result<(), BooleanError> {
    let (Some(&dest), Some(&other_side)) = (faces1.first(), faces2.first()) else {
        return Ok(());
    };
    let (fw1, bw1) = build_graphs(store, faces1);
    let (fw2, bw2) = build_graphs(store, faces2);

    let mut marks = Marks::default();
    classify_against(store, ctx, dest, (&fw1, &bw1), &fw2, &mut marks)?;
    classify_against(store, ctx, other_side, (&fw2, &bw2), &fw1, &mut marks)?;

    let all_faces: Vec<FaceId> = faces1.iter().chain(faces2).copied().collect();
    for &face in &all_faces {
        let loops: Vec<LoopId> = store.face_loops(face).collect();
        for l in loops {
            store.link_loop(l);
        }
    }

    let seeds: Vec<HalfEdgeId> = marks.invalid.iter().copied().collect();
    for seed in seeds {
        let mut he = seed;
        while let Some(next) = store.next_in_loop(he) {
            if marks.valid.contains(&next) || marks.invalid.contains(&next) {
                break;
            }
            marks.invalid.insert(next);
            he = next;
        }
    }

    let mut points: Vec<Point3d> = Vec::new();
    let mut retained = Vec::new();
    for &face in &all_faces {
        for he in store.face_half_edges(face) {
            points.push(store.vertex_point(store.half_edges[he].vertex_a));
            if !marks.invalid.contains(&he) {
                retained.push(he);
            }
        }
    }
    let retained = chain(store, retained);

    let dest_outer = store.faces[dest].outer_loop;
    for &face in &all_faces {
        if face != dest {
            ctx.mark_merged(face);
            let outer = store.faces[face].outer_loop;
            store.loops[outer].half_edges.clear();
        }
        store.faces[face].inner_loops.clear();
    }
    store.loops[dest_outer].half_edges = retained.clone();
    store.link_loop(dest_outer);

    let group: BTreeSet<FaceId> = all_faces.iter().copied().collect();
    for &he in &retained {
        ctx.mark_transferred(he, &group);
    }

    let like = store.faces[dest].surface;
    if let Some(surface) = ctx.kernel.bounding_surface(&points, &like) {
        store.faces[dest].surface = surface;
    }
    debug!(?dest, faces = all_faces.len(), edges = retained.len(), "merged overlapping faces");
    Ok(())
}

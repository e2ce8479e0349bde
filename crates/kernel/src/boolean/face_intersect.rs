//! New boundary edges where faces of the two operands cross.

use tracing::{debug, instrument, trace};

use crate::geometry::curves::CurveSegment;
use crate::geometry::surfaces::Surface;
use crate::topology::brep::*;

use super::context::RunContext;
use super::edges::{edges_have_same_ends, split_edge_by_vertex};
use super::engine::BoolOp;
use super::error::BooleanError;

/// A crossing of an intersection curve with a face boundary.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub vertex: VertexId,
    /// Boundary half-edge that was crossed.
    pub half_edge: HalfEdgeId,
    /// Parameter on the intersection curve.
    pub u: f64,
    /// +1 when the curve enters the face, -1 when it leaves, 0 when tangent.
    pub sign: i8,
}

#[instrument(skip(store, ctx))]
pub fn intersect_faces(
    store: &mut EntityStore,
    ctx: &mut RunContext<'_>,
    a: ShellId,
    b: ShellId,
) -> Result<(), BooleanError> {
    let faces_a: Vec<FaceId> = store.shells[a].faces.iter().copied().filter(|&f| !ctx.is_merged(f)).collect();
    let faces_b: Vec<FaceId> = store.shells[b].faces.iter().copied().filter(|&f| !ctx.is_merged(f)).collect();
    let mut created = 0;
    for &face1 in &faces_a {
        for &face2 in &faces_b {
            let bounds = ctx
                .kernel
                .face_bounds(store, face1, &ctx.tol)
                .intersection(&ctx.kernel.face_bounds(store, face2, &ctx.tol));
            let (s1, s2) = (store.faces[face1].surface, store.faces[face2].surface);
            let curves = ctx.kernel.intersect_surfaces(&s1, &s2, &bounds, &ctx.tol);
            for curve in curves {
                let curve = fix_curve_direction(curve, &s1, &s2, ctx.op);
                let mut nodes = Vec::new();
                collect_nodes(store, ctx, &curve, face1, &mut nodes);
                collect_nodes(store, ctx, &curve, face2, &mut nodes);
                trace!(?face1, ?face2, nodes = nodes.len(), "curve nodes");

                for edge in split(store, ctx, nodes, &curve, face1, face2) {
                    if edge_is_transferred(store, ctx, edge, face1, face2)
                        || edge_is_transferred(store, ctx, edge, face2, face1)
                    {
                        debug!(?edge, "edge already transferred onto this face pair");
                        continue;
                    }
                    check_new_edge_direction(store, ctx, edge, &curve)?;
                    let (h1, h2) = store.edges[edge].half_edges;
                    ctx.add_new_edge(store, face1, h1);
                    ctx.add_new_edge(store, face2, h2);
                    created += 1;
                }
            }
        }
    }
    debug!(created, "new edges from face intersections");
    Ok(())
}

/// Orients the curve along `n1 x n2` (reversed for union).
pub fn fix_curve_direction(curve: CurveSegment, s1: &Surface, s2: &Surface, op: BoolOp) -> CurveSegment {
    let point = curve.middle_point();
    let tangent = curve.tangent_at_point(&point);
    let mut expected = s1.normal_at(&point).cross(&s2.normal_at(&point));
    if op == BoolOp::Union {
        expected = -expected;
    }
    if expected.dot(&tangent) > 0.0 {
        curve
    } else {
        curve.inverted()
    }
}

fn collect_nodes(
    store: &mut EntityStore,
    ctx: &mut RunContext<'_>,
    curve: &CurveSegment,
    face: FaceId,
    nodes: &mut Vec<Node>,
) {
    let half_edges: Vec<HalfEdgeId> = store.face_half_edges(face).collect();
    for he in half_edges {
        let edge = store.half_edges[he].edge;
        let edge_curve = store.edges[edge].curve;
        for hit in ctx.kernel.intersect_curves(&edge_curve, curve, &ctx.tol) {
            let (h1, _) = store.edges[edge].half_edges;
            let vertex = if ctx.tol.ueq_zero(hit.u0) {
                store.half_edges[h1].vertex_a
            } else if ctx.tol.ueq_one(hit.u0) {
                store.half_edges[h1].vertex_b
            } else {
                ctx.vertices.create(store, hit.point, &ctx.tol)
            };
            let sign = if ctx.is_new(he) {
                0
            } else {
                node_sign(store, ctx, face, he, vertex, curve)
            };
            nodes.push(Node {
                vertex,
                half_edge: he,
                u: hit.u1,
                sign,
            });
        }
    }
}

fn node_sign(
    store: &EntityStore,
    ctx: &RunContext<'_>,
    face: FaceId,
    he: HalfEdgeId,
    vertex: VertexId,
    curve: &CurveSegment,
) -> i8 {
    let point = store.vertex_point(vertex);
    let normal = store.faces[face].surface.normal_at(&point);
    let edge_tangent = store.half_edge_tangent(he, &point);
    let curve_tangent = curve.tangent_at_point(&point);
    let dot = normal.cross(&edge_tangent).dot(&curve_tangent);
    if ctx.tol.eq_zero(dot) {
        0
    } else if dot < 0.0 {
        -1
    } else {
        1
    }
}

/// Drops tangent nodes, keeps one node per parameter unless the signs
/// cancel, and sorts by parameter then sign.
pub fn filter_and_sort_nodes(nodes: Vec<Node>, ctx: &RunContext<'_>) -> Vec<Node> {
    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(|n| (n.sign != 0).then_some(n)).collect();
    for i in 0..slots.len() {
        let Some(n1) = slots[i] else {
            continue;
        };
        for j in 0..slots.len() {
            if i == j {
                continue;
            }
            if let Some(n2) = slots[j] {
                if ctx.tol.ueq(n1.u, n2.u) && n1.sign + n2.sign != 0 {
                    slots[j] = None;
                }
            }
        }
    }
    let mut nodes: Vec<Node> = slots.into_iter().flatten().collect();
    nodes.sort_by(|n1, n2| n1.u.total_cmp(&n2.u));
    // Runs of equal parameters are ordered by sign.
    let mut start = 0;
    while start < nodes.len() {
        let mut end = start + 1;
        while end < nodes.len() && ctx.tol.ueq(nodes[start].u, nodes[end].u) {
            end += 1;
        }
        nodes[start..end].sort_by_key(|n| n.sign);
        start = end;
    }
    nodes
}

/// Builds the edges of material spans and splits the crossed boundary
/// edges at the nodes.
fn split(
    store: &mut EntityStore,
    ctx: &mut RunContext<'_>,
    nodes: Vec<Node>,
    curve: &CurveSegment,
    face1: FaceId,
    face2: FaceId,
) -> Vec<EdgeId> {
    let mut nodes = filter_and_sort_nodes(nodes, ctx);
    let mut curve = *curve;
    let closed = curve.is_closed(ctx.tol.coincidence);
    let mut result = Vec::new();

    if closed {
        let Some(&first) = nodes.first() else {
            return closed_curve_edge(store, ctx, &curve, face1, face2).into_iter().collect();
        };
        curve = curve.rebased(first.u);
        for node in &mut nodes {
            node.u = (node.u - first.u).rem_euclid(1.0);
        }
        nodes.push(Node { u: 1.0, ..first });
    }

    let mut i = 0;
    while i + 1 < nodes.len() {
        let (n_in, n_out) = (nodes[i], nodes[i + 1]);
        if n_in.sign == -1 || n_out.sign == 1 {
            i += 1;
            continue;
        }
        if ctx.tol.ueq(n_in.u, n_out.u) {
            i += 2;
            continue;
        }
        let span = curve.sub(n_in.u, n_out.u);
        if !span_lies_on_faces(store, ctx, &span, face1, face2) {
            trace!(u0 = n_in.u, u1 = n_out.u, "span leaves one of the faces");
            i += 1;
            continue;
        }
        let edge = store.add_edge(span, n_in.vertex, n_out.vertex);
        result.push(edge);
        i += 1;
    }

    for node in &nodes {
        let edge = store.half_edges[node.half_edge].edge;
        split_edge_by_vertex(store, ctx, edge, node.vertex);
    }
    result
}

/// Nodes only bound a span on the faces whose boundary they were found on. A
/// circle found against one hemisphere may carry nodes from the other face
/// alone, so the span itself has to be on both.
fn span_lies_on_faces(
    store: &EntityStore,
    ctx: &RunContext<'_>,
    span: &CurveSegment,
    face1: FaceId,
    face2: FaceId,
) -> bool {
    let mid = span.middle_point();
    [face1, face2]
        .iter()
        .all(|&f| ctx.kernel.classify_point_in_face(store, f, &mid, &ctx.tol).inside)
}

/// A closed curve that crosses no boundary becomes one closed edge when it
/// lies inside both faces.
fn closed_curve_edge(
    store: &mut EntityStore,
    ctx: &mut RunContext<'_>,
    curve: &CurveSegment,
    face1: FaceId,
    face2: FaceId,
) -> Option<EdgeId> {
    let point = curve.start_point();
    let inside = [face1, face2]
        .iter()
        .all(|&f| ctx.kernel.classify_point_in_face(store, f, &point, &ctx.tol).strict_inside);
    if !inside {
        return None;
    }
    let vertex = ctx.vertices.create(store, point, &ctx.tol);
    Some(store.add_edge(*curve, vertex, vertex))
}

/// Whether `face` already carries an edge, absorbed from `on_face` by face
/// merging, that runs between the same vertices as `edge`.
fn edge_is_transferred(
    store: &EntityStore,
    ctx: &RunContext<'_>,
    edge: EdgeId,
    face: FaceId,
    on_face: FaceId,
) -> bool {
    let (tested, _) = store.edges[edge].half_edges;
    let tested_curve = store.edges[edge].curve;
    ctx.face_half_edges(store, face).into_iter().any(|he| {
        ctx.transferred(he).is_some_and(|faces| faces.contains(&on_face)) && {
            let mid = store.edges[store.half_edges[he].edge].curve.middle_point();
            edges_have_same_ends(store, tested, he) && tested_curve.passes_through(&mid, ctx.tol.coincidence)
        }
    })
}

fn check_new_edge_direction(
    store: &EntityStore,
    ctx: &RunContext<'_>,
    edge: EdgeId,
    curve: &CurveSegment,
) -> Result<(), BooleanError> {
    let (h1, h2) = store.edges[edge].half_edges;
    let point = store.vertex_point(store.half_edges[h1].vertex_a);
    let expected = curve.tangent_at_point(&point);
    if !ctx.tol.veq(&expected, &store.half_edge_tangent(h1, &point)) {
        return Err(BooleanError::InternalInvariant {
            edge,
            reason: "first half-edge does not follow its source curve".into(),
        });
    }
    if !ctx.tol.veq(&-expected, &store.half_edge_tangent(h2, &point)) {
        return Err(BooleanError::InternalInvariant {
            edge,
            reason: "second half-edge does not oppose its source curve".into(),
        });
    }
    Ok(())
}

//! Mutual splitting of operand edges and shared half-edge predicates.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::tolerance::Tolerance;
use crate::topology::brep::*;

use super::context::RunContext;

/// Splits every edge of both shells at its crossings with the other shell's
/// edges. Crossings at an existing endpoint leave the edge alone.
#[instrument(skip(store, ctx))]
pub fn intersect_edges(store: &mut EntityStore, ctx: &mut RunContext<'_>, a: ShellId, b: ShellId) {
    let mut order: Vec<EdgeId> = Vec::new();
    let mut params: BTreeMap<EdgeId, Vec<f64>> = BTreeMap::new();
    let mut add = |edge: EdgeId, u: f64| {
        params
            .entry(edge)
            .or_insert_with(|| {
                order.push(edge);
                Vec::new()
            })
            .push(u);
    };

    let edges_b = store.shell_edges(b);
    for e1 in store.shell_edges(a) {
        for &e2 in &edges_b {
            let hits = ctx
                .kernel
                .intersect_curves(&store.edges[e1].curve, &store.edges[e2].curve, &ctx.tol);
            for hit in hits {
                add(e1, hit.u0);
                add(e2, hit.u1);
            }
        }
    }

    let mut splits = 0;
    for edge in order {
        let Some(mut us) = params.remove(&edge) else {
            continue;
        };
        us.sort_by(f64::total_cmp);
        // Points come from the unsplit curve; later splits re-resolve the edge.
        let curve = store.edges[edge].curve;
        let points: Vec<_> = us
            .into_iter()
            .filter(|&u| !ctx.tol.ueq_zero(u) && !ctx.tol.ueq_one(u))
            .map(|u| curve.point(u))
            .collect();
        for point in points {
            let vertex = ctx.vertices.create(store, point, &ctx.tol);
            if split_edge_by_vertex(store, ctx, edge, vertex).is_some() {
                splits += 1;
            }
        }
    }
    debug!(splits, "edges split at mutual crossings");
}

/// Splits `edge` (or the live segment it was split into) at `vertex`.
/// Returns `None` when the segment already ends at the vertex.
pub fn split_edge_by_vertex(
    store: &mut EntityStore,
    ctx: &mut RunContext<'_>,
    edge: EdgeId,
    vertex: VertexId,
) -> Option<(EdgeId, EdgeId)> {
    let point = store.vertex_point(vertex);
    let edge = ctx.resolve_edge(store, edge, &point);
    let (h1, h2) = store.edges[edge].half_edges;
    let (a, b) = (store.half_edges[h1].vertex_a, store.half_edges[h1].vertex_b);
    if a == vertex || b == vertex {
        return None;
    }

    let curve = store.edges[edge].curve;
    let u = curve.param_of(&point);
    let (c1, c2) = curve.split_at_param(u);
    let e1 = store.add_edge(c1, a, vertex);
    let e2 = store.add_edge(c2, vertex, b);
    let manifold = store.edges[edge].manifold.clone();
    store.edges[e1].manifold = manifold.clone();
    store.edges[e2].manifold = manifold;

    let (e1h1, e1h2) = store.edges[e1].half_edges;
    let (e2h1, e2h2) = store.edges[e2].half_edges;
    replace_in_loop(store, h1, [e1h1, e2h1]);
    replace_in_loop(store, h2, [e2h2, e1h2]);

    ctx.copy_edge_data(h1, e1h1);
    ctx.copy_edge_data(h1, e2h1);
    ctx.copy_edge_data(h2, e2h2);
    ctx.copy_edge_data(h2, e1h2);
    ctx.record_split(edge, (e1, e2), u);
    Some((e1, e2))
}

fn replace_in_loop(store: &mut EntityStore, he: HalfEdgeId, with: [HalfEdgeId; 2]) {
    let Some(loop_id) = store.half_edges[he].loop_id.take() else {
        return;
    };
    let list = &mut store.loops[loop_id].half_edges;
    if let Some(idx) = list.iter().position(|&h| h == he) {
        list.splice(idx..=idx, with);
    }
    for h in with {
        store.half_edges[h].loop_id = Some(loop_id);
    }
}

/// True when every tessellation point of `e1` lies on `e2`'s curve.
pub fn is_same_edge(store: &EntityStore, e1: HalfEdgeId, e2: HalfEdgeId, tol: &Tolerance) -> bool {
    let other = store.edges[store.half_edges[e2].edge].curve;
    store
        .half_edge_points(e1)
        .iter()
        .all(|p| tol.points_coincident(p, &other.project(p)))
}

pub fn edges_have_same_ends(store: &EntityStore, e1: HalfEdgeId, e2: HalfEdgeId) -> bool {
    let (h1, h2) = (&store.half_edges[e1], &store.half_edges[e2]);
    (h1.vertex_a == h2.vertex_a && h1.vertex_b == h2.vertex_b)
        || (h1.vertex_a == h2.vertex_b && h1.vertex_b == h2.vertex_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boolean::engine::BoolOp;
    use crate::geometry::curves::CurveSegment;
    use crate::geometry::kernel::AnalyticKernel;
    use crate::geometry::point::Point3d;
    use crate::topology::primitives::make_box;
    use crate::validation::ShellValidator;

    #[test]
    fn test_split_keeps_loop_order_and_copies_data() {
        let mut store = EntityStore::new();
        let kernel = AnalyticKernel;
        let mut ctx = RunContext::new(Tolerance::default(), BoolOp::Intersect, &kernel);
        let shell = make_box(&mut store, Point3d::ORIGIN, Point3d::new(2.0, 2.0, 2.0));
        ctx.vertices.seed(&store, shell);

        let face = store.shells[shell].faces[0];
        let first = store.loops[store.faces[face].outer_loop].half_edges[0];
        ctx.mark_new(first);
        let edge = store.half_edges[first].edge;
        let mid = store.edges[edge].curve.middle_point();
        let v = ctx.vertices.create(&mut store, mid, &ctx.tol);

        let (e1, e2) = split_edge_by_vertex(&mut store, &mut ctx, edge, v).unwrap();
        assert_eq!(store.count_topology(shell), (9, 13, 6));
        assert!(ShellValidator::default().validate(&store, shell).is_empty());
        assert!(store.half_edges[first].loop_id.is_none());

        let forward = if store.edges[edge].half_edges.0 == first { 0 } else { 1 };
        for child in [e1, e2] {
            let (c1, c2) = store.edges[child].half_edges;
            let same_side = if forward == 0 { c1 } else { c2 };
            assert!(ctx.is_new(same_side));
        }
        // Splitting again at the same vertex through the stale id is a no-op.
        assert!(split_edge_by_vertex(&mut store, &mut ctx, edge, v).is_none());
    }

    #[test]
    fn test_stale_edge_resolves_to_child() {
        let mut store = EntityStore::new();
        let kernel = AnalyticKernel;
        let mut ctx = RunContext::new(Tolerance::default(), BoolOp::Intersect, &kernel);
        let a = store.add_vertex(Point3d::ORIGIN);
        let b = store.add_vertex(Point3d::new(4.0, 0.0, 0.0));
        let edge = store.add_edge(CurveSegment::line(Point3d::ORIGIN, Point3d::new(4.0, 0.0, 0.0)), a, b);
        let v1 = store.add_vertex(Point3d::new(1.0, 0.0, 0.0));
        let v3 = store.add_vertex(Point3d::new(3.0, 0.0, 0.0));
        let (_, right) = split_edge_by_vertex(&mut store, &mut ctx, edge, v1).unwrap();
        let (left, _) = split_edge_by_vertex(&mut store, &mut ctx, edge, v3).unwrap();
        let (h1, _) = store.edges[left].half_edges;
        assert_eq!(store.half_edges[h1].vertex_a, v1);
        assert_eq!(store.half_edges[h1].vertex_b, v3);
        assert_eq!(ctx.resolve_edge(&store, edge, &Point3d::new(2.0, 0.0, 0.0)), left);
        assert_ne!(right, left);
    }

    #[test]
    fn test_intersect_edges_splits_both_operands() {
        let mut store = EntityStore::new();
        let kernel = AnalyticKernel;
        let mut ctx = RunContext::new(Tolerance::default(), BoolOp::Intersect, &kernel);
        // Crossings at (2,0,1), (2,2,1), (1,0,2) and (1,2,2), each interior
        // to one edge of either box.
        let a = make_box(&mut store, Point3d::ORIGIN, Point3d::new(2.0, 2.0, 2.0));
        let b = make_box(&mut store, Point3d::new(1.0, 0.0, 1.0), Point3d::new(3.0, 2.0, 3.0));
        ctx.vertices.seed(&store, a);
        ctx.vertices.seed(&store, b);
        intersect_edges(&mut store, &mut ctx, a, b);

        assert_eq!(store.count_topology(a), (12, 16, 6));
        assert_eq!(store.count_topology(b), (12, 16, 6));
        assert!(ShellValidator::default().validate(&store, a).is_empty());
        assert!(ShellValidator::default().validate(&store, b).is_empty());
        let crossing = ctx.vertices.find(&Point3d::new(2.0, 0.0, 1.0), &ctx.tol).unwrap();
        assert!(store.shell_vertices(a).contains(&crossing));
        assert!(store.shell_vertices(b).contains(&crossing));
    }
}

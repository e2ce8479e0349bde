use std::collections::BTreeMap;

use tracing::{debug, instrument, warn};

use crate::geometry::point::Point3d;
use crate::tolerance::Tolerance;
use crate::topology::brep::*;

/// Canonical vertex pool shared by both operands of a run. Every vertex
/// created during the run goes through [`VertexPool::create`].
#[derive(Debug, Clone, Default)]
pub struct VertexPool {
    vertices: Vec<(VertexId, Point3d)>,
}

impl VertexPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every vertex used by `shell`.
    pub fn seed(&mut self, store: &EntityStore, shell: ShellId) {
        for v in store.shell_vertices(shell) {
            self.vertices.push((v, store.vertex_point(v)));
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn find(&self, point: &Point3d, tol: &Tolerance) -> Option<VertexId> {
        self.vertices
            .iter()
            .find(|(_, p)| tol.points_coincident(p, point))
            .map(|(v, _)| *v)
    }

    /// Returns the pooled vertex at `point`, creating it on a miss.
    pub fn create(&mut self, store: &mut EntityStore, point: Point3d, tol: &Tolerance) -> VertexId {
        if let Some(v) = self.find(&point, tol) {
            return v;
        }
        // A miss just outside the tolerance band means some upstream point
        // drifted.
        let near = self
            .vertices
            .iter()
            .any(|(_, p)| p.distance_to(&point) < 10.0 * tol.coincidence);
        if near {
            warn!(?point, "near-duplicate vertex created outside tolerance");
        }
        let v = store.add_vertex(point);
        debug!(?v, ?point, "new vertex");
        self.vertices.push((v, point));
        v
    }
}

/// Collapses every vertex of `b` that coincides with a vertex of `a` onto
/// the vertex of `a`.
#[instrument(skip(store))]
pub fn merge_vertices(store: &mut EntityStore, a: ShellId, b: ShellId, tol: &Tolerance) {
    let mut swap: BTreeMap<VertexId, VertexId> = BTreeMap::new();
    let vertices_a = store.shell_vertices(a);
    for v2 in store.shell_vertices(b) {
        let p2 = store.vertex_point(v2);
        for &v1 in &vertices_a {
            if tol.points_coincident(&store.vertex_point(v1), &p2) {
                swap.insert(v2, v1);
            }
        }
    }
    if swap.is_empty() {
        return;
    }
    for he in store.shell_half_edges(b) {
        let data = &mut store.half_edges[he];
        if let Some(&v) = swap.get(&data.vertex_a) {
            data.vertex_a = v;
        }
        if let Some(&v) = swap.get(&data.vertex_b) {
            data.vertex_b = v;
        }
    }
    debug!(merged = swap.len(), "merged coincident vertices");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::make_box;

    #[test]
    fn test_create_reuses_pooled_vertex() {
        let mut store = EntityStore::new();
        let tol = Tolerance::default();
        let mut pool = VertexPool::new();
        let v = pool.create(&mut store, Point3d::new(1.0, 2.0, 3.0), &tol);
        let again = pool.create(&mut store, Point3d::new(1.0, 2.0, 3.0 + 1e-8), &tol);
        assert_eq!(v, again);
        assert_eq!(store.vertices.len(), 1);
        let other = pool.create(&mut store, Point3d::new(1.0, 2.0, 4.0), &tol);
        assert_ne!(v, other);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_seed_covers_shell_vertices() {
        let mut store = EntityStore::new();
        let shell = make_box(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 1.0, 1.0));
        let mut pool = VertexPool::new();
        pool.seed(&store, shell);
        assert_eq!(pool.len(), 8);
        let corner = pool.find(&Point3d::new(1.0, 1.0, 1.0), &Tolerance::default());
        assert!(corner.is_some());
    }

    #[test]
    fn test_merge_vertices_collapses_b_onto_a() {
        let mut store = EntityStore::new();
        let tol = Tolerance::default();
        let a = make_box(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 1.0, 1.0));
        let b = make_box(&mut store, Point3d::new(1.0, 0.0, 0.0), Point3d::new(2.0, 1.0, 1.0));
        merge_vertices(&mut store, a, b, &tol);

        let va: std::collections::BTreeSet<VertexId> = store.shell_vertices(a).into_iter().collect();
        let shared = store.shell_vertices(b).into_iter().filter(|v| va.contains(v)).count();
        assert_eq!(shared, 4);
        assert_eq!(store.shell_vertices(b).len(), 8);
        // Loops of b still close after the swap.
        assert!(crate::validation::ShellValidator::default().validate(&store, b).is_empty());
    }
}

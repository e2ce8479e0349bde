//! Scratch state owned by a single Boolean run.

use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::point::Point3d;
use crate::tolerance::Tolerance;
use crate::topology::brep::*;
use crate::traits::GeometryKernel;

use super::engine::BoolOp;
use super::error::EdgeCollision;
use super::vertices::VertexPool;

/// Per-half-edge solve state. Splitting copies it to both children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSolveData {
    pub is_new: bool,
    /// Faces this half-edge absorbed while overlapping faces were merged.
    pub transferred: BTreeSet<FaceId>,
}

/// Per-face solve state.
#[derive(Debug, Clone)]
pub struct FaceSolveData {
    /// Collects the half-edges created by face-face intersection. Points at
    /// the face but is not one of its inner loops.
    pub loop_of_new: LoopId,
    pub vertex_to_edge: BTreeMap<VertexId, Vec<HalfEdgeId>>,
    pub graph_edges: Vec<HalfEdgeId>,
    pub errors: Vec<EdgeCollision>,
    pub detected_loops: Vec<LoopId>,
}

#[derive(Debug, Clone, Copy)]
struct SplitRecord {
    children: (EdgeId, EdgeId),
    u: f64,
}

pub struct RunContext<'k> {
    pub tol: Tolerance,
    pub op: BoolOp,
    pub kernel: &'k dyn GeometryKernel,
    pub vertices: VertexPool,
    edge_data: BTreeMap<HalfEdgeId, EdgeSolveData>,
    faces: BTreeMap<FaceId, FaceSolveData>,
    face_order: Vec<FaceId>,
    merged: BTreeSet<FaceId>,
    splits: BTreeMap<EdgeId, SplitRecord>,
}

impl<'k> RunContext<'k> {
    pub fn new(tol: Tolerance, op: BoolOp, kernel: &'k dyn GeometryKernel) -> Self {
        Self {
            tol,
            op,
            kernel,
            vertices: VertexPool::new(),
            edge_data: BTreeMap::new(),
            faces: BTreeMap::new(),
            face_order: Vec::new(),
            merged: BTreeSet::new(),
            splits: BTreeMap::new(),
        }
    }

    // ── Edge solve data ─────────────────────────────────────────────────

    pub fn edge_data(&self, he: HalfEdgeId) -> Option<&EdgeSolveData> {
        self.edge_data.get(&he)
    }

    pub fn is_new(&self, he: HalfEdgeId) -> bool {
        self.edge_data.get(&he).is_some_and(|d| d.is_new)
    }

    /// Like [`Self::is_new`], but a half-edge also counts as new when any
    /// of its manifold peers is.
    pub fn is_new_nm(&self, store: &EntityStore, he: HalfEdgeId) -> bool {
        if self.is_new(he) {
            return true;
        }
        let Some(peers) = &store.edges[store.half_edges[he].edge].manifold else {
            return false;
        };
        peers.iter().any(|&peer| {
            let (h1, h2) = store.edges[peer].half_edges;
            self.is_new(h1) || self.is_new(h2)
        })
    }

    pub fn mark_new(&mut self, he: HalfEdgeId) {
        self.edge_data.entry(he).or_default().is_new = true;
    }

    pub fn mark_transferred(&mut self, he: HalfEdgeId, faces: &BTreeSet<FaceId>) {
        self.edge_data
            .entry(he)
            .or_default()
            .transferred
            .extend(faces.iter().copied());
    }

    pub fn transferred(&self, he: HalfEdgeId) -> Option<&BTreeSet<FaceId>> {
        self.edge_data.get(&he).map(|d| &d.transferred)
    }

    /// Copies the solve data of `from` onto `to`.
    pub fn copy_edge_data(&mut self, from: HalfEdgeId, to: HalfEdgeId) {
        if let Some(data) = self.edge_data.get(&from).cloned() {
            self.edge_data.insert(to, data);
        }
    }

    // ── Face solve data ─────────────────────────────────────────────────

    /// Creates solve data for every face of `shell` that survived merging.
    pub fn init_faces(&mut self, store: &mut EntityStore, shell: ShellId) {
        let faces = store.shells[shell].faces.clone();
        for face in faces {
            if self.merged.contains(&face) {
                continue;
            }
            let loop_of_new = store.loops.insert(Loop {
                half_edges: Vec::new(),
                face: Some(face),
            });
            self.face_order.push(face);
            self.faces.insert(
                face,
                FaceSolveData {
                    loop_of_new,
                    vertex_to_edge: BTreeMap::new(),
                    graph_edges: Vec::new(),
                    errors: Vec::new(),
                    detected_loops: Vec::new(),
                },
            );
        }
    }

    /// Faces with solve data, in initialization order.
    pub fn solved_faces(&self) -> Vec<FaceId> {
        self.face_order.clone()
    }

    pub fn face_data(&self, face: FaceId) -> Option<&FaceSolveData> {
        self.faces.get(&face)
    }

    pub fn face_data_mut(&mut self, face: FaceId) -> Option<&mut FaceSolveData> {
        self.faces.get_mut(&face)
    }

    /// Every half-edge of the face, including the ones collected in its
    /// loop of new edges.
    pub fn face_half_edges(&self, store: &EntityStore, face: FaceId) -> Vec<HalfEdgeId> {
        let mut out: Vec<HalfEdgeId> = store.face_half_edges(face).collect();
        if let Some(data) = self.faces.get(&face) {
            out.extend(store.loops[data.loop_of_new].half_edges.iter().copied());
        }
        out
    }

    /// Appends a freshly created half-edge to the face's loop of new edges.
    pub fn add_new_edge(&mut self, store: &mut EntityStore, face: FaceId, he: HalfEdgeId) {
        if let Some(data) = self.faces.get(&face) {
            let loop_id = data.loop_of_new;
            store.loops[loop_id].half_edges.push(he);
            store.half_edges[he].loop_id = Some(loop_id);
        }
        self.mark_new(he);
    }

    pub fn collisions(&self) -> Vec<EdgeCollision> {
        self.face_order
            .iter()
            .filter_map(|f| self.faces.get(f))
            .flat_map(|d| d.errors.iter().copied())
            .collect()
    }

    // ── Merging ─────────────────────────────────────────────────────────

    pub fn mark_merged(&mut self, face: FaceId) {
        self.merged.insert(face);
    }

    pub fn is_merged(&self, face: FaceId) -> bool {
        self.merged.contains(&face)
    }

    // ── Split history ───────────────────────────────────────────────────

    pub fn record_split(&mut self, edge: EdgeId, children: (EdgeId, EdgeId), u: f64) {
        self.splits.insert(edge, SplitRecord { children, u });
    }

    /// Follows the split history of `edge` down to the live segment that
    /// contains `point`.
    pub fn resolve_edge(&self, store: &EntityStore, mut edge: EdgeId, point: &Point3d) -> EdgeId {
        while let Some(record) = self.splits.get(&edge) {
            let u = store.edges[edge].curve.param_of(point);
            edge = if u < record.u {
                record.children.0
            } else {
                record.children.1
            };
        }
        edge
    }
}

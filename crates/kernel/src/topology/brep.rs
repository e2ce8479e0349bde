use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::geometry::bounds::BoundingBox;
use crate::geometry::curves::CurveSegment;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::geometry::vector::Vec3;

// ─── Entity Keys ─────────────────────────────────────────────────────────────

new_key_type! {
    pub struct VertexId;
    pub struct EdgeId;
    pub struct HalfEdgeId;
    pub struct LoopId;
    pub struct FaceId;
    pub struct ShellId;
}

// ─── Topological Entities ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vertex {
    pub point: Point3d,
}

/// A curve shared by two half-edges. `half_edges.0` runs along the curve,
/// `half_edges.1` against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub curve: CurveSegment,
    pub half_edges: (HalfEdgeId, HalfEdgeId),
    /// Coincident edges bounding further faces along the same curve.
    pub manifold: Option<Vec<EdgeId>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HalfEdge {
    pub edge: EdgeId,
    /// true if this half-edge traverses the curve in its own direction.
    pub forward: bool,
    pub vertex_a: VertexId,
    pub vertex_b: VertexId,
    pub loop_id: Option<LoopId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Loop {
    pub half_edges: Vec<HalfEdgeId>,
    pub face: Option<FaceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    pub surface: Surface,
    pub outer_loop: LoopId,
    pub inner_loops: Vec<LoopId>,
    pub shell: Option<ShellId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shell {
    pub faces: Vec<FaceId>,
    /// Toggled by inversion; an inverted shell bounds everything outside it.
    pub inverted: bool,
}

// ─── Entity Store ────────────────────────────────────────────────────────────

/// Arena-based storage for all topological entities. Relations are keys
/// into the arena, never owning references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    pub vertices: SlotMap<VertexId, Vertex>,
    pub edges: SlotMap<EdgeId, Edge>,
    pub half_edges: SlotMap<HalfEdgeId, HalfEdge>,
    pub loops: SlotMap<LoopId, Loop>,
    pub faces: SlotMap<FaceId, Face>,
    pub shells: SlotMap<ShellId, Shell>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ────────────────────────────────────────────────────

    pub fn add_vertex(&mut self, point: Point3d) -> VertexId {
        self.vertices.insert(Vertex { point })
    }

    /// Creates an edge from `a` to `b` along `curve` together with both
    /// half-edges. Neither half-edge belongs to a loop yet.
    pub fn add_edge(&mut self, curve: CurveSegment, a: VertexId, b: VertexId) -> EdgeId {
        self.edges.insert_with_key(|edge| {
            let he1 = self.half_edges.insert(HalfEdge {
                edge,
                forward: true,
                vertex_a: a,
                vertex_b: b,
                loop_id: None,
            });
            let he2 = self.half_edges.insert(HalfEdge {
                edge,
                forward: false,
                vertex_a: b,
                vertex_b: a,
                loop_id: None,
            });
            Edge {
                curve,
                half_edges: (he1, he2),
                manifold: None,
            }
        })
    }

    /// Creates a loop and points every listed half-edge at it.
    pub fn add_loop(&mut self, half_edges: Vec<HalfEdgeId>) -> LoopId {
        let loop_id = self.loops.insert(Loop {
            half_edges,
            face: None,
        });
        self.link_loop(loop_id);
        loop_id
    }

    pub fn link_loop(&mut self, loop_id: LoopId) {
        for &he in &self.loops[loop_id].half_edges {
            self.half_edges[he].loop_id = Some(loop_id);
        }
    }

    pub fn add_face(&mut self, surface: Surface, outer_loop: LoopId, inner_loops: Vec<LoopId>) -> FaceId {
        let face = self.faces.insert(Face {
            surface,
            outer_loop,
            inner_loops,
            shell: None,
        });
        let loops: Vec<LoopId> = self.face_loops(face).collect();
        for l in loops {
            self.loops[l].face = Some(face);
        }
        face
    }

    pub fn add_shell(&mut self, faces: Vec<FaceId>) -> ShellId {
        let shell = self.shells.insert(Shell {
            faces,
            inverted: false,
        });
        for i in 0..self.shells[shell].faces.len() {
            let face = self.shells[shell].faces[i];
            self.faces[face].shell = Some(shell);
        }
        shell
    }

    // ── Navigation ──────────────────────────────────────────────────────

    pub fn twin(&self, he: HalfEdgeId) -> HalfEdgeId {
        let edge = &self.edges[self.half_edges[he].edge];
        if edge.half_edges.0 == he {
            edge.half_edges.1
        } else {
            edge.half_edges.0
        }
    }

    /// The twin plus the opposite half-edges of every manifold peer.
    pub fn twins(&self, he: HalfEdgeId) -> Vec<HalfEdgeId> {
        let mut out = vec![self.twin(he)];
        let data = &self.half_edges[he];
        if let Some(peers) = &self.edges[data.edge].manifold {
            for &peer in peers {
                let (h1, h2) = self.edges[peer].half_edges;
                out.push(if self.half_edges[h1].vertex_a == data.vertex_b { h1 } else { h2 });
            }
        }
        out
    }

    pub fn next_in_loop(&self, he: HalfEdgeId) -> Option<HalfEdgeId> {
        let loop_id = self.half_edges[he].loop_id?;
        let list = &self.loops[loop_id].half_edges;
        let idx = list.iter().position(|&h| h == he)?;
        Some(list[(idx + 1) % list.len()])
    }

    pub fn prev_in_loop(&self, he: HalfEdgeId) -> Option<HalfEdgeId> {
        let loop_id = self.half_edges[he].loop_id?;
        let list = &self.loops[loop_id].half_edges;
        let idx = list.iter().position(|&h| h == he)?;
        Some(list[(idx + list.len() - 1) % list.len()])
    }

    pub fn face_of(&self, he: HalfEdgeId) -> Option<FaceId> {
        self.loops[self.half_edges[he].loop_id?].face
    }

    /// The edge curve oriented along the half-edge.
    pub fn half_edge_curve(&self, he: HalfEdgeId) -> CurveSegment {
        let data = &self.half_edges[he];
        let curve = self.edges[data.edge].curve;
        if data.forward { curve } else { curve.inverted() }
    }

    pub fn half_edge_tangent(&self, he: HalfEdgeId, point: &Point3d) -> Vec3 {
        self.half_edge_curve(he).tangent_at_point(point)
    }

    /// Tessellated points in traversal order, both ends included.
    pub fn half_edge_points(&self, he: HalfEdgeId) -> Vec<Point3d> {
        self.half_edge_curve(he).tessellate()
    }

    pub fn vertex_point(&self, v: VertexId) -> Point3d {
        self.vertices[v].point
    }

    // ── Iteration ───────────────────────────────────────────────────────

    /// Outer loop first, then inner loops.
    pub fn face_loops(&self, face: FaceId) -> impl Iterator<Item = LoopId> + '_ {
        let f = &self.faces[face];
        std::iter::once(f.outer_loop).chain(f.inner_loops.iter().copied())
    }

    pub fn face_half_edges(&self, face: FaceId) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.face_loops(face)
            .flat_map(move |l| self.loops[l].half_edges.iter().copied())
    }

    pub fn shell_half_edges(&self, shell: ShellId) -> Vec<HalfEdgeId> {
        self.shells[shell]
            .faces
            .iter()
            .flat_map(|&f| self.face_half_edges(f))
            .collect()
    }

    /// Edges in first-seen order.
    pub fn shell_edges(&self, shell: ShellId) -> Vec<EdgeId> {
        let mut seen = BTreeSet::new();
        self.shell_half_edges(shell)
            .into_iter()
            .map(|he| self.half_edges[he].edge)
            .filter(|e| seen.insert(*e))
            .collect()
    }

    /// Vertices in first-seen order.
    pub fn shell_vertices(&self, shell: ShellId) -> Vec<VertexId> {
        let mut seen = BTreeSet::new();
        self.shell_half_edges(shell)
            .into_iter()
            .flat_map(|he| [self.half_edges[he].vertex_a, self.half_edges[he].vertex_b])
            .filter(|v| seen.insert(*v))
            .collect()
    }

    /// Count topological entities for a shell: (vertices, edges, faces).
    pub fn count_topology(&self, shell: ShellId) -> (usize, usize, usize) {
        (
            self.shell_vertices(shell).len(),
            self.shell_edges(shell).len(),
            self.shells[shell].faces.len(),
        )
    }

    /// Bounds of a face. A sphere face's boundary says nothing about how far
    /// the patch bulges, so the whole sphere is used.
    pub fn face_bounding_box(&self, face: FaceId) -> BoundingBox {
        match &self.faces[face].surface {
            Surface::Plane(_) => {
                let points: Vec<Point3d> = self
                    .face_half_edges(face)
                    .flat_map(|he| self.half_edge_points(he))
                    .collect();
                BoundingBox::from_points(&points)
            }
            Surface::Sphere(sphere) => {
                let r = Vec3::new(sphere.radius, sphere.radius, sphere.radius);
                BoundingBox::new(sphere.center - r, sphere.center + r)
            }
        }
    }

    pub fn shell_bounding_box(&self, shell: ShellId) -> BoundingBox {
        let mut bb = BoundingBox::empty();
        for &face in &self.shells[shell].faces {
            let fb = self.face_bounding_box(face);
            if !fb.is_empty() {
                bb.expand_to_include(&fb.min);
                bb.expand_to_include(&fb.max);
            }
        }
        bb
    }

    // ── Copying ─────────────────────────────────────────────────────────

    /// Deep copy of a shell. The copy shares no entity with the source.
    pub fn clone_shell(&mut self, shell: ShellId) -> ShellId {
        let mut vertex_map: BTreeMap<VertexId, VertexId> = BTreeMap::new();
        let mut edge_map: BTreeMap<EdgeId, EdgeId> = BTreeMap::new();
        let mut faces = Vec::new();

        let source_faces = self.shells[shell].faces.clone();
        for face in source_faces {
            let loops: Vec<LoopId> = self.face_loops(face).collect();
            let mut new_loops = Vec::with_capacity(loops.len());
            for loop_id in loops {
                let half_edges = self.loops[loop_id].half_edges.clone();
                let mut new_half_edges = Vec::with_capacity(half_edges.len());
                for he in half_edges {
                    let data = self.half_edges[he];
                    let va = self.map_vertex(&mut vertex_map, data.vertex_a);
                    let vb = self.map_vertex(&mut vertex_map, data.vertex_b);
                    let new_edge = match edge_map.get(&data.edge) {
                        Some(&e) => e,
                        None => {
                            let curve = self.edges[data.edge].curve;
                            let (a, b) = if data.forward { (va, vb) } else { (vb, va) };
                            let e = self.add_edge(curve, a, b);
                            edge_map.insert(data.edge, e);
                            e
                        }
                    };
                    let (n1, n2) = self.edges[new_edge].half_edges;
                    let new_he = if data.forward { n1 } else { n2 };
                    self.half_edges[new_he].vertex_a = va;
                    self.half_edges[new_he].vertex_b = vb;
                    new_half_edges.push(new_he);
                }
                new_loops.push(self.add_loop(new_half_edges));
            }
            let surface = self.faces[face].surface;
            let inner = new_loops.split_off(1);
            faces.push(self.add_face(surface, new_loops[0], inner));
        }

        for (&old, &new) in &edge_map {
            if let Some(peers) = &self.edges[old].manifold {
                let mapped: Vec<EdgeId> = peers.iter().filter_map(|p| edge_map.get(p).copied()).collect();
                if !mapped.is_empty() {
                    self.edges[new].manifold = Some(mapped);
                }
            }
        }

        let inverted = self.shells[shell].inverted;
        let copy = self.add_shell(faces);
        self.shells[copy].inverted = inverted;
        copy
    }

    fn map_vertex(&mut self, map: &mut BTreeMap<VertexId, VertexId>, v: VertexId) -> VertexId {
        if let Some(&mapped) = map.get(&v) {
            return mapped;
        }
        let mapped = self.add_vertex(self.vertices[v].point);
        map.insert(v, mapped);
        mapped
    }
}

pub mod types;

pub use types::*;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use crate::topology::brep::*;

/// Structural validation of a closed shell: loop closure, back-references,
/// twin usage, vertex-on-curve and face connectivity.
#[derive(Debug, Clone, Copy)]
pub struct ShellValidator {
    /// Allowed gap between a vertex and the end of its half-edge curve.
    pub vertex_tolerance: f64,
}

impl Default for ShellValidator {
    fn default() -> Self {
        Self {
            vertex_tolerance: 1e-5,
        }
    }
}

impl ShellValidator {
    pub fn new(vertex_tolerance: f64) -> Self {
        Self { vertex_tolerance }
    }

    #[instrument(skip(self, store))]
    pub fn validate(&self, store: &EntityStore, shell: ShellId) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if store.shells[shell].faces.is_empty() {
            errors.push(ValidationError::new(
                EntityRef::Shell(shell),
                ErrorCode::EmptyShell,
                "shell has no faces",
            ));
            return errors;
        }

        let mut usage: BTreeMap<HalfEdgeId, usize> = BTreeMap::new();
        for &face in &store.shells[shell].faces {
            for loop_id in store.face_loops(face) {
                self.check_loop(store, face, loop_id, &mut errors);
                for &he in &store.loops[loop_id].half_edges {
                    *usage.entry(he).or_default() += 1;
                }
            }
        }

        for (&he, &count) in &usage {
            if count > 1 {
                errors.push(ValidationError::new(
                    EntityRef::HalfEdge(he),
                    ErrorCode::InvalidMultiConnexity,
                    format!("half-edge used {count} times"),
                ));
            }
            if !store.twins(he).iter().any(|t| usage.contains_key(t)) {
                errors.push(
                    ValidationError::new(EntityRef::HalfEdge(he), ErrorCode::FreeEdge, "twin is not part of the shell")
                        .with_parent(EntityRef::Edge(store.half_edges[he].edge)),
                );
            }
        }

        if let Some(err) = check_connectivity(store, shell, &usage) {
            errors.push(err);
        }
        debug!(errors = errors.len(), "shell validated");
        errors
    }

    fn check_loop(&self, store: &EntityStore, face: FaceId, loop_id: LoopId, errors: &mut Vec<ValidationError>) {
        let lp = &store.loops[loop_id];
        if lp.half_edges.is_empty() {
            errors.push(
                ValidationError::new(EntityRef::Loop(loop_id), ErrorCode::EmptyLoop, "loop has no half-edges")
                    .with_parent(EntityRef::Face(face)),
            );
            return;
        }
        if lp.face != Some(face) {
            errors.push(
                ValidationError::new(EntityRef::Loop(loop_id), ErrorCode::DanglingReference, "loop does not point at its face")
                    .with_parent(EntityRef::Face(face)),
            );
        }
        let n = lp.half_edges.len();
        for i in 0..n {
            let he = lp.half_edges[i];
            let data = &store.half_edges[he];
            if data.loop_id != Some(loop_id) {
                errors.push(
                    ValidationError::new(EntityRef::HalfEdge(he), ErrorCode::DanglingReference, "half-edge does not point at its loop")
                        .with_parent(EntityRef::Loop(loop_id)),
                );
            }
            let next = &store.half_edges[lp.half_edges[(i + 1) % n]];
            if data.vertex_b != next.vertex_a {
                errors.push(
                    ValidationError::new(EntityRef::HalfEdge(he), ErrorCode::WireNotClosed, "half-edge does not end where the next one starts")
                        .with_parent(EntityRef::Loop(loop_id)),
                );
            }
            let curve = store.half_edge_curve(he);
            let gap = store
                .vertex_point(data.vertex_a)
                .distance_to(&curve.start_point())
                .max(store.vertex_point(data.vertex_b).distance_to(&curve.end_point()));
            if gap > self.vertex_tolerance {
                errors.push(
                    ValidationError::new(EntityRef::HalfEdge(he), ErrorCode::InvalidPointOnCurve, "vertex is off the curve end")
                        .with_value(gap),
                );
            }
        }
    }
}

fn check_connectivity(
    store: &EntityStore,
    shell: ShellId,
    usage: &BTreeMap<HalfEdgeId, usize>,
) -> Option<ValidationError> {
    let faces: BTreeSet<FaceId> = store.shells[shell].faces.iter().copied().collect();
    let start = *faces.iter().next()?;
    let mut seen = BTreeSet::from([start]);
    let mut stack = vec![start];
    while let Some(face) = stack.pop() {
        for he in store.face_half_edges(face) {
            for twin in store.twins(he) {
                if !usage.contains_key(&twin) {
                    continue;
                }
                if let Some(other) = store.face_of(twin) {
                    if faces.contains(&other) && seen.insert(other) {
                        stack.push(other);
                    }
                }
            }
        }
    }
    (seen.len() != faces.len()).then(|| {
        ValidationError::new(
            EntityRef::Shell(shell),
            ErrorCode::Disconnected,
            format!("{} of {} faces reachable", seen.len(), faces.len()),
        )
    })
}

//! The Boolean run as an explicit state machine over [`Phase`]s.

use tracing::{debug, info, instrument, warn};

use crate::topology::brep::*;
use crate::traits::{FaceSynthesizer, GeometryKernel};
use crate::validation::ShellValidator;

use super::config::{BooleanConfig, FilterStrategy};
use super::context::RunContext;
use super::edges::intersect_edges;
use super::error::BooleanError;
use super::face_intersect::intersect_faces;
use super::filter::{filter_by_new_edges, filter_by_ray_cast, CandidateFace};
use super::loops::{check_graph_errors, detect_loops, init_graphs};
use super::overlap::merge_overlapping_faces;
use super::vertices::merge_vertices;

/// The two primitive operations. Subtraction is an intersection with an
/// inverted operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    Union,
    Intersect,
}

/// Stages of a run, in execution order. A run only moves forward and ends
/// in `Done` or, after a phase returned an error, in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    CloneOperands,
    MergeVertices,
    IntersectEdges,
    MergeOverlappingFaces,
    InitSolveData,
    IntersectFaces,
    BuildGraphs,
    CheckGraphErrors,
    DetectLoops,
    SynthesizeFaces,
    FilterFaces,
    AssembleShell,
    ValidateResult,
    Done,
    Failed,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::CloneOperands => Phase::MergeVertices,
            Phase::MergeVertices => Phase::IntersectEdges,
            Phase::IntersectEdges => Phase::MergeOverlappingFaces,
            Phase::MergeOverlappingFaces => Phase::InitSolveData,
            Phase::InitSolveData => Phase::IntersectFaces,
            Phase::IntersectFaces => Phase::BuildGraphs,
            Phase::BuildGraphs => Phase::CheckGraphErrors,
            Phase::CheckGraphErrors => Phase::DetectLoops,
            Phase::DetectLoops => Phase::SynthesizeFaces,
            Phase::SynthesizeFaces => Phase::FilterFaces,
            Phase::FilterFaces => Phase::AssembleShell,
            Phase::AssembleShell => Phase::ValidateResult,
            Phase::ValidateResult | Phase::Done => Phase::Done,
            Phase::Failed => Phase::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

/// State carried between phases of one run.
pub struct BooleanRun<'a> {
    store: &'a mut EntityStore,
    ctx: RunContext<'a>,
    config: &'a BooleanConfig,
    synthesizer: &'a dyn FaceSynthesizer,
    phase: Phase,
    operands: (ShellId, ShellId),
    working: (ShellId, ShellId),
    pristine: Option<(ShellId, ShellId)>,
    detected: Vec<(FaceId, Vec<LoopId>)>,
    candidates: Vec<CandidateFace>,
    kept: Vec<FaceId>,
    result: Option<ShellId>,
}

impl<'a> BooleanRun<'a> {
    pub fn new(
        store: &'a mut EntityStore,
        a: ShellId,
        b: ShellId,
        op: BoolOp,
        config: &'a BooleanConfig,
        kernel: &'a dyn GeometryKernel,
        synthesizer: &'a dyn FaceSynthesizer,
    ) -> Self {
        Self {
            store,
            ctx: RunContext::new(config.tolerance, op, kernel),
            config,
            synthesizer,
            phase: Phase::CloneOperands,
            operands: (a, b),
            working: (a, b),
            pristine: None,
            detected: Vec::new(),
            candidates: Vec::new(),
            kept: Vec::new(),
            result: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &EntityStore {
        &*self.store
    }

    pub fn context(&self) -> &RunContext<'a> {
        &self.ctx
    }

    /// Faces chosen by the filter, available once `FilterFaces` has run.
    pub fn kept(&self) -> &[FaceId] {
        &self.kept
    }

    /// Drives the run to completion and returns the result shell.
    pub fn execute(mut self) -> Result<ShellId, BooleanError> {
        while !self.phase.is_terminal() {
            self.step()?;
        }
        self.result.ok_or(BooleanError::EmptyResult)
    }

    /// Runs the current phase and advances to the next one. An error moves
    /// the run to `Failed`, after which stepping does nothing.
    pub fn step(&mut self) -> Result<(), BooleanError> {
        if self.phase.is_terminal() {
            return Ok(());
        }
        debug!(phase = ?self.phase, "entering phase");
        if let Err(error) = self.run_phase() {
            debug!(phase = ?self.phase, %error, "run failed");
            self.phase = Phase::Failed;
            return Err(error);
        }
        self.phase = self.phase.next();
        Ok(())
    }

    fn run_phase(&mut self) -> Result<(), BooleanError> {
        match self.phase {
            Phase::CloneOperands => self.clone_operands()?,
            Phase::MergeVertices => {
                let (a, b) = self.working;
                merge_vertices(self.store, a, b, &self.ctx.tol);
                self.ctx.vertices.seed(self.store, a);
                self.ctx.vertices.seed(self.store, b);
            }
            Phase::IntersectEdges => {
                let (a, b) = self.working;
                intersect_edges(self.store, &mut self.ctx, a, b);
            }
            Phase::MergeOverlappingFaces => {
                let (a, b) = self.working;
                merge_overlapping_faces(self.store, &mut self.ctx, a, b)?;
            }
            Phase::InitSolveData => {
                let (a, b) = self.working;
                self.ctx.init_faces(self.store, a);
                self.ctx.init_faces(self.store, b);
            }
            Phase::IntersectFaces => {
                let (a, b) = self.working;
                intersect_faces(self.store, &mut self.ctx, a, b)?;
            }
            Phase::BuildGraphs => init_graphs(self.store, &mut self.ctx),
            Phase::CheckGraphErrors => check_graph_errors(&self.ctx)?,
            Phase::DetectLoops => {
                for face in self.ctx.solved_faces() {
                    let loops = detect_loops(self.store, &mut self.ctx, face);
                    self.detected.push((face, loops));
                }
            }
            Phase::SynthesizeFaces => self.synthesize_faces(),
            Phase::FilterFaces => self.filter_faces()?,
            Phase::AssembleShell => {
                let shell = self.store.add_shell(std::mem::take(&mut self.kept));
                self.result = Some(shell);
            }
            Phase::ValidateResult => self.validate_result()?,
            Phase::Done | Phase::Failed => {}
        }
        Ok(())
    }

    fn clone_operands(&mut self) -> Result<(), BooleanError> {
        let (a, b) = self.operands;
        let tol = &self.ctx.tol;
        if self.ctx.op == BoolOp::Intersect && !self.store.shells[a].inverted && !self.store.shells[b].inverted {
            let overlap = self
                .store
                .shell_bounding_box(a)
                .intersection(&self.store.shell_bounding_box(b));
            if overlap.min_extent() <= tol.coincidence {
                debug!("operand bounds share no volume");
                return Err(BooleanError::EmptyResult);
            }
        }

        self.working = (self.store.clone_shell(a), self.store.clone_shell(b));
        if self.config.filter_strategy == FilterStrategy::RayCast {
            self.pristine = Some((self.store.clone_shell(a), self.store.clone_shell(b)));
        }
        Ok(())
    }

    fn synthesize_faces(&mut self) {
        for (origin, loops) in std::mem::take(&mut self.detected) {
            if loops.is_empty() {
                continue;
            }
            let origin_shell = self.store.faces[origin].shell;
            for face in self.synthesizer.loops_to_faces(self.store, origin, loops, &self.ctx.tol) {
                self.candidates.push(CandidateFace { face, origin_shell });
            }
        }
        debug!(candidates = self.candidates.len(), "faces synthesized");
    }

    fn filter_faces(&mut self) -> Result<(), BooleanError> {
        let candidates = std::mem::take(&mut self.candidates);
        self.kept = match (self.config.filter_strategy, self.pristine) {
            (FilterStrategy::RayCast, Some((pa, pb))) => {
                let (a, b) = self.working;
                filter_by_ray_cast(self.store, &self.ctx, &candidates, (a, pa), (b, pb))
            }
            _ => filter_by_new_edges(self.store, &self.ctx, &candidates),
        };
        if self.kept.is_empty() {
            return Err(BooleanError::EmptyResult);
        }
        Ok(())
    }

    fn validate_result(&mut self) -> Result<(), BooleanError> {
        let Some(shell) = self.result else {
            return Err(BooleanError::EmptyResult);
        };
        let errors = ShellValidator::new(self.ctx.tol.coincidence * 10.0).validate(self.store, shell);
        if errors.is_empty() {
            let (v, e, f) = self.store.count_topology(shell);
            info!(op = ?self.ctx.op, vertices = v, edges = e, faces = f, "boolean run complete");
            return Ok(());
        }
        if self.config.strict_result_validation {
            return Err(BooleanError::InvalidResult { shell, errors });
        }
        for error in &errors {
            warn!(%error, "result shell failed validation");
        }
        Ok(())
    }
}

/// Runs one Boolean operation on copies of `a` and `b`.
#[instrument(skip(store, config, kernel, synthesizer))]
pub fn run_boolean(
    store: &mut EntityStore,
    a: ShellId,
    b: ShellId,
    op: BoolOp,
    config: &BooleanConfig,
    kernel: &dyn GeometryKernel,
    synthesizer: &dyn FaceSynthesizer,
) -> Result<ShellId, BooleanError> {
    BooleanRun::new(store, a, b, op, config, kernel, synthesizer).execute()
}

/// Flips a shell inside out in place: every surface is inverted, every loop
/// is rebuilt from the twins of its half-edges in reverse order, and the
/// shell's orientation flag is toggled.
#[instrument(skip(store))]
pub fn invert(store: &mut EntityStore, shell: ShellId, vertex_tolerance: f64) -> Result<(), BooleanError> {
    let faces = store.shells[shell].faces.clone();
    for face in faces {
        store.faces[face].surface = store.faces[face].surface.inverted();
        let loops: Vec<LoopId> = store.face_loops(face).collect();
        for loop_id in loops {
            let reversed: Vec<HalfEdgeId> = store.loops[loop_id]
                .half_edges
                .iter()
                .rev()
                .map(|&he| store.twin(he))
                .collect();
            store.loops[loop_id].half_edges = reversed;
            store.link_loop(loop_id);
        }
    }
    store.shells[shell].inverted = !store.shells[shell].inverted;

    let errors = ShellValidator::new(vertex_tolerance).validate(store, shell);
    if !errors.is_empty() {
        return Err(BooleanError::InvalidOperandInversion { shell, errors });
    }
    debug!(?shell, inverted = store.shells[shell].inverted, "shell inverted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::kernel::AnalyticKernel;
    use crate::geometry::point::Point3d;
    use crate::topology::primitives::make_box;
    use crate::topology::synthesis::NestingSynthesizer;

    #[test]
    fn test_phases_advance_in_order() {
        let mut phase = Phase::CloneOperands;
        let mut seen = vec![phase];
        while phase != Phase::Done {
            let next = phase.next();
            assert!(next > phase);
            phase = next;
            seen.push(phase);
        }
        assert_eq!(seen.len(), 14);
        assert_eq!(Phase::Done.next(), Phase::Done);
        assert_eq!(Phase::Failed.next(), Phase::Failed);
        assert!(Phase::Done.is_terminal() && Phase::Failed.is_terminal());
        assert!(!Phase::ValidateResult.is_terminal());
    }

    #[test]
    fn test_invert_flips_surfaces_and_loops() {
        let mut store = EntityStore::new();
        let shell = make_box(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 1.0, 1.0));
        let top = store.shells[shell].faces[1];
        let before = store.faces[top].surface.normal_at(&Point3d::new(0.5, 0.5, 1.0));
        let first = store.loops[store.faces[top].outer_loop].half_edges[0];

        invert(&mut store, shell, 1e-5).unwrap();
        assert!(store.shells[shell].inverted);
        let after = store.faces[top].surface.normal_at(&Point3d::new(0.5, 0.5, 1.0));
        assert_eq!(after, -before);
        let outer = &store.loops[store.faces[top].outer_loop].half_edges;
        assert_eq!(*outer.last().unwrap(), store.twin(first));
        assert_eq!(store.half_edges[outer[0]].loop_id, Some(store.faces[top].outer_loop));
    }

    #[test]
    fn test_disjoint_intersection_fails_before_cloning() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 1.0, 1.0));
        let b = make_box(&mut store, Point3d::new(1.0, 0.0, 0.0), Point3d::new(2.0, 1.0, 1.0));
        let shells = store.shells.len();
        let config = BooleanConfig::default();
        let result = run_boolean(&mut store, a, b, BoolOp::Intersect, &config, &AnalyticKernel, &NestingSynthesizer);
        assert!(matches!(result, Err(BooleanError::EmptyResult)));
        assert_eq!(store.shells.len(), shells);
    }

    #[test]
    fn test_run_stops_at_failing_phase() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, Point3d::ORIGIN, Point3d::new(1.0, 1.0, 1.0));
        let b = make_box(&mut store, Point3d::new(1.0, 0.0, 0.0), Point3d::new(2.0, 1.0, 1.0));
        let config = BooleanConfig::default();
        let kernel = AnalyticKernel;
        let mut run = BooleanRun::new(&mut store, a, b, BoolOp::Union, &config, &kernel, &NestingSynthesizer);
        let mut error = None;
        while !run.phase().is_terminal() {
            let phase = run.phase();
            if let Err(e) = run.step() {
                error = Some((phase, e));
            }
        }
        let (phase, error) = error.expect("face-sharing boxes collide while merging");
        assert_eq!(phase, Phase::MergeOverlappingFaces);
        assert!(matches!(error, BooleanError::FaceCollision { .. }));
        assert_eq!(run.phase(), Phase::Failed);
        assert!(run.step().is_ok());
        assert_eq!(run.phase(), Phase::Failed);
    }
}

pub mod config;
pub mod context;
pub mod edges;
pub mod engine;
pub mod error;
pub mod face_intersect;
pub mod filter;
pub mod loops;
pub mod overlap;
pub mod vertices;

use crate::geometry::kernel::AnalyticKernel;
use crate::topology::brep::{EntityStore, ShellId};
use crate::topology::synthesis::NestingSynthesizer;
use config::BooleanConfig;
use engine::{run_boolean, BoolOp};
use error::BooleanError;

/// Trait for Boolean operations on B-Rep shells.
///
/// `union`, `intersect` and `subtract` build a new shell in the store and
/// leave `a` untouched. `subtract` inverts `b` in place. Implement this
/// trait to provide alternative Boolean backends or mock implementations.
pub trait BooleanEngine {
    fn union(&self, store: &mut EntityStore, a: ShellId, b: ShellId) -> Result<ShellId, BooleanError>;

    fn intersect(&self, store: &mut EntityStore, a: ShellId, b: ShellId) -> Result<ShellId, BooleanError>;

    /// `a` minus `b`, computed as the intersection of `a` with `b` turned
    /// inside out.
    fn subtract(&self, store: &mut EntityStore, a: ShellId, b: ShellId) -> Result<ShellId, BooleanError>;

    /// Turns `shell` inside out in place.
    fn invert(&self, store: &mut EntityStore, shell: ShellId) -> Result<(), BooleanError>;
}

/// Boolean engine over the analytic kernel and the nesting face synthesizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBooleanEngine {
    pub config: BooleanConfig,
    kernel: AnalyticKernel,
    synthesizer: NestingSynthesizer,
}

impl DefaultBooleanEngine {
    pub fn new(config: BooleanConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn run(&self, store: &mut EntityStore, a: ShellId, b: ShellId, op: BoolOp) -> Result<ShellId, BooleanError> {
        run_boolean(store, a, b, op, &self.config, &self.kernel, &self.synthesizer)
    }
}

impl BooleanEngine for DefaultBooleanEngine {
    fn union(&self, store: &mut EntityStore, a: ShellId, b: ShellId) -> Result<ShellId, BooleanError> {
        self.run(store, a, b, BoolOp::Union)
    }

    fn intersect(&self, store: &mut EntityStore, a: ShellId, b: ShellId) -> Result<ShellId, BooleanError> {
        self.run(store, a, b, BoolOp::Intersect)
    }

    fn subtract(&self, store: &mut EntityStore, a: ShellId, b: ShellId) -> Result<ShellId, BooleanError> {
        self.invert(store, b)?;
        self.run(store, a, b, BoolOp::Intersect)
    }

    fn invert(&self, store: &mut EntityStore, shell: ShellId) -> Result<(), BooleanError> {
        engine::invert(store, shell, self.config.tolerance.coincidence * 10.0)
    }
}

pub fn union(store: &mut EntityStore, a: ShellId, b: ShellId) -> Result<ShellId, BooleanError> {
    DefaultBooleanEngine::default().union(store, a, b)
}

pub fn intersect(store: &mut EntityStore, a: ShellId, b: ShellId) -> Result<ShellId, BooleanError> {
    DefaultBooleanEngine::default().intersect(store, a, b)
}

pub fn subtract(store: &mut EntityStore, a: ShellId, b: ShellId) -> Result<ShellId, BooleanError> {
    DefaultBooleanEngine::default().subtract(store, a, b)
}

pub fn invert(store: &mut EntityStore, shell: ShellId) -> Result<(), BooleanError> {
    DefaultBooleanEngine::default().invert(store, shell)
}

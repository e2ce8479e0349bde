use serde::{Deserialize, Serialize};

use crate::tolerance::Tolerance;

/// How synthesized faces are sorted into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterStrategy {
    /// Keep faces bearing new edges and everything connected to them.
    #[default]
    NewEdges,
    /// Classify a point of each face against both operands by ray casting.
    RayCast,
}

/// Settings for one Boolean run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BooleanConfig {
    pub tolerance: Tolerance,
    pub filter_strategy: FilterStrategy,
    /// Fail with `InvalidResult` instead of logging when the assembled shell
    /// does not validate.
    pub strict_result_validation: bool,
}

impl BooleanConfig {
    pub fn with_filter_strategy(mut self, strategy: FilterStrategy) -> Self {
        self.filter_strategy = strategy;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_result_validation = true;
        self
    }
}

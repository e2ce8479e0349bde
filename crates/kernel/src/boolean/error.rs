use thiserror::Error;

use crate::topology::brep::{EdgeId, HalfEdgeId, ShellId};
use crate::validation::{EntityRef, ValidationError};

/// Two half-edges occupying the same place in a way the engine cannot resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCollision {
    pub first: HalfEdgeId,
    pub second: HalfEdgeId,
}

/// Broad classification of a [`BooleanError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InternalError,
    UnsupportedCase,
}

/// Structured failure information for Boolean operations.
#[derive(Debug, Error)]
pub enum BooleanError {
    #[error("operand shell is invalid after inversion ({} errors)", errors.len())]
    InvalidOperandInversion {
        shell: ShellId,
        errors: Vec<ValidationError>,
    },

    #[error("{} edge collisions in the intersection graph", collisions.len())]
    EdgeCollision { collisions: Vec<EdgeCollision> },

    #[error("coincident edges while merging overlapping faces")]
    FaceCollision { collision: EdgeCollision },

    #[error("internal invariant violated on edge {edge:?}: {reason}")]
    InternalInvariant { edge: EdgeId, reason: String },

    #[error("Boolean result is empty")]
    EmptyResult,

    #[error("result shell failed validation ({} errors)", errors.len())]
    InvalidResult {
        shell: ShellId,
        errors: Vec<ValidationError>,
    },
}

impl BooleanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BooleanError::InvalidOperandInversion { .. } | BooleanError::EmptyResult => ErrorKind::InvalidInput,
            BooleanError::EdgeCollision { .. } | BooleanError::FaceCollision { .. } => ErrorKind::UnsupportedCase,
            BooleanError::InternalInvariant { .. } | BooleanError::InvalidResult { .. } => ErrorKind::InternalError,
        }
    }

    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BooleanError::InvalidOperandInversion { .. } => "UNABLE_BOOLEAN_OPERAND_INVERSION",
            BooleanError::EdgeCollision { .. }
            | BooleanError::FaceCollision { .. }
            | BooleanError::InvalidResult { .. } => "BOOLEAN_INVALID_RESULT",
            BooleanError::InternalInvariant { .. } => "BOOLEAN_INTERNAL_INVARIANT",
            BooleanError::EmptyResult => "BOOLEAN_EMPTY_RESULT",
        }
    }

    /// Topology the error refers to.
    pub fn related_entities(&self) -> Vec<EntityRef> {
        match self {
            BooleanError::InvalidOperandInversion { shell, errors }
            | BooleanError::InvalidResult { shell, errors } => std::iter::once(EntityRef::Shell(*shell))
                .chain(errors.iter().map(|e| e.entity))
                .collect(),
            BooleanError::EdgeCollision { collisions } => collisions
                .iter()
                .flat_map(|c| [EntityRef::HalfEdge(c.first), EntityRef::HalfEdge(c.second)])
                .collect(),
            BooleanError::FaceCollision { collision } => {
                vec![EntityRef::HalfEdge(collision.first), EntityRef::HalfEdge(collision.second)]
            }
            BooleanError::InternalInvariant { edge, .. } => vec![EntityRef::Edge(*edge)],
            BooleanError::EmptyResult => Vec::new(),
        }
    }
}

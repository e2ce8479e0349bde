//! Shared types for structural shell validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::topology::brep::*;

/// A reference to a specific entity by its SlotMap key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRef {
    Vertex(VertexId),
    Edge(EdgeId),
    HalfEdge(HalfEdgeId),
    Loop(LoopId),
    Face(FaceId),
    Shell(ShellId),
}

/// Enumeration of all validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Shell has no faces.
    EmptyShell,
    /// Loop has no half-edges.
    EmptyLoop,
    /// A loop does not close (`vertex_b` of one half-edge is not `vertex_a` of the next).
    WireNotClosed,
    /// A loop or half-edge back-reference points somewhere else.
    DanglingReference,
    /// Half-edge whose twin is not used by any face of the shell.
    FreeEdge,
    /// Half-edge used more than once in the shell.
    InvalidMultiConnexity,
    /// Vertex position does not lie on its half-edge's curve end.
    InvalidPointOnCurve,
    /// Faces fall into more than one twin-connected component.
    Disconnected,
}

impl ErrorCode {
    /// Machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyShell => "SHELL_EMPTY",
            ErrorCode::EmptyLoop => "LOOP_EMPTY",
            ErrorCode::WireNotClosed => "LOOP_NOT_CLOSED",
            ErrorCode::DanglingReference => "DANGLING_REFERENCE",
            ErrorCode::FreeEdge => "FREE_EDGE",
            ErrorCode::InvalidMultiConnexity => "HALF_EDGE_REUSED",
            ErrorCode::InvalidPointOnCurve => "VERTEX_OFF_CURVE",
            ErrorCode::Disconnected => "SHELL_DISCONNECTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub entity: EntityRef,
    /// Owning entity (e.g. the face that owns a loop), if applicable.
    pub parent: Option<EntityRef>,
    pub code: ErrorCode,
    pub message: String,
    /// Measured numeric value (e.g. the gap between a vertex and its curve).
    pub numeric_value: Option<f64>,
}

impl ValidationError {
    pub fn new(entity: EntityRef, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            entity,
            parent: None,
            code,
            message: message.into(),
            numeric_value: None,
        }
    }

    pub fn with_parent(mut self, parent: EntityRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.numeric_value = Some(value);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {} (code: {})", self.entity, self.message, self.code)?;
        if let Some(val) = self.numeric_value {
            write!(f, " value={val:.2e}")?;
        }
        Ok(())
    }
}

//! Error types for seamline.
//!
//! None of these errors is fatal to a whole pass: callers that process many
//! faces or many meshes record the failing item and continue.

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during selection, marking and merge operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A face has fewer than three valid vertices or (near) zero area.
    #[error("face {face} is degenerate ({reason})")]
    DegenerateFace {
        /// The face index.
        face: usize,
        /// What made the face degenerate.
        reason: &'static str,
    },

    /// A face references a vertex index outside the vertex array.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face index lies outside the mesh it is used with.
    #[error("face index {face} out of range for mesh with {num_faces} faces")]
    InvalidFaceIndex {
        /// The offending face index.
        face: usize,
        /// Number of faces in the mesh.
        num_faces: usize,
    },

    /// A named object no longer resolves in the host.
    #[error("object '{name}' no longer resolves")]
    StaleReference {
        /// The stable name that failed to resolve.
        name: String,
    },

    /// A live-session event arrived while no session is active.
    #[error("no live selection session is active")]
    SessionInactive,

    /// A live-session event named a mesh that is not part of the session.
    #[error("mesh '{name}' is not part of the active session")]
    UnknownMesh {
        /// The mesh name.
        name: String,
    },

    /// A collaborator outside this crate (unwrap, join) reported a failure.
    #[error("external operation '{operation}' failed: {message}")]
    External {
        /// The operation that failed.
        operation: &'static str,
        /// Message from the collaborator.
        message: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a stale reference error for `name`.
    pub fn stale(name: impl Into<String>) -> Self {
        MeshError::StaleReference { name: name.into() }
    }

    /// Create an error for a failed external collaborator call.
    pub fn external(operation: &'static str, message: impl Into<String>) -> Self {
        MeshError::External {
            operation,
            message: message.into(),
        }
    }
}

/// Error types for mesh construction, sequence generation and recording
use std::io;

use thiserror::Error;

/// Error produced when building or updating a [`crate::Mesh`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A face refers to a vertex that does not exist.
    #[error("face {face} references vertex {index}, but the mesh has {vertex_count} vertices")]
    InvalidTopology {
        face: usize,
        index: usize,
        vertex_count: usize,
    },
    /// Every face needs exactly one color.
    #[error("{faces} faces but {colors} face colors")]
    ColorCountMismatch { faces: usize, colors: usize },
    #[error("expected positions for {expected} vertices, got {found}")]
    VertexCountMismatch { expected: usize, found: usize },
}

/// Error produced when building a [`crate::RotationSequence`].
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SequenceError {
    #[error("rotation step must be finite and positive, got {0}")]
    InvalidStep(f64),
    #[error("rotation range end must be finite and positive, got {0}")]
    InvalidRange(f64),
    /// `steps³` does not fit in `usize`.
    #[error("{steps} steps per axis is too many rotations to enumerate")]
    TooLarge { steps: usize },
}

/// Error produced when reading an NPY array.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NpyError {
    #[error("missing NPY magic string")]
    Magic,
    #[error("malformed NPY header: {0}")]
    Header(String),
    #[error("unsupported dtype {0:?}, expected '<f8'")]
    UnsupportedDtype(String),
    #[error("Fortran-ordered arrays are not supported")]
    FortranOrder,
    #[error("expected shape (frames, vertices, 6), got {0:?}")]
    Shape(Vec<usize>),
    #[error("payload holds {found} bytes, expected {expected}")]
    Truncated { expected: usize, found: usize },
}

/// Error produced while recording, replaying or persisting frames.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Npy(#[from] NpyError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error("scene has no meshes")]
    EmptyScene,
    #[error("frame {frame} is outside a record of {frames} frames")]
    FrameOutOfRange { frame: usize, frames: usize },
    #[error("record holds {found} vertices per frame, primary mesh has {expected}")]
    VertexCountMismatch { expected: usize, found: usize },
    #[error("cannot allocate a record of {frames} frames with {vertices} vertices")]
    TooLarge { frames: usize, vertices: usize },
}

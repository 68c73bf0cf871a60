/// WF3D Core Library - Wireframe geometry, visibility and recording
///
/// This library provides the headless core of the wireframe dataset
/// generator: transformation matrices, the mesh model, back-face culling and
/// depth ordering, the rotation grid, and the frame recorder with its NPY
/// output.

pub mod error;
pub mod geometry;
pub mod npy;
pub mod projection;
pub mod recorder;
pub mod scene;
pub mod sequence;
pub mod transform;
pub mod visibility;

// Re-export commonly used types
pub use error::{MeshError, NpyError, RecordError, SequenceError};
pub use geometry::{Edge, Face, Mesh, Rgb, VertexBuffer};
pub use projection::{Camera, Canvas, ProjectionMode};
pub use recorder::{
    FrameRecord, NpyFileSink, NullPresenter, Presenter, RecordSink, Recorder, RecorderConfig,
};
pub use scene::{Scene, SceneComposite};
pub use sequence::RotationSequence;
pub use transform::{Axis, Orientation};
pub use visibility::{Composite, Compositor, DrawOrder, VertexMarker, VisibleFace};

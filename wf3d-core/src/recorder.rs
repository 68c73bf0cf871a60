/// Frame-by-frame recording of a scene over a rotation sequence
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::RecordError;
use crate::npy;
use crate::projection::Canvas;
use crate::scene::{Scene, SceneComposite};
use crate::sequence::RotationSequence;
use crate::transform::{Axis, Orientation};
use crate::visibility::Compositor;

/// Values stored per vertex: position `x, y, z`, then rotation `rx, ry, rz`.
pub const COLUMNS: usize = 6;

const PROGRESS_INTERVAL: usize = 100;

/// Dense `(frames, vertices, 6)` block of `f64`, in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    frames: usize,
    vertices: usize,
    data: Vec<f64>,
}

impl FrameRecord {
    /// Zero-filled record. Fails instead of aborting when the block cannot
    /// be sized or allocated.
    pub fn zeros(frames: usize, vertices: usize) -> Result<Self, RecordError> {
        let too_large = || RecordError::TooLarge { frames, vertices };
        let len = frames
            .checked_mul(vertices)
            .and_then(|n| n.checked_mul(COLUMNS))
            .ok_or_else(too_large)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| too_large())?;
        data.resize(len, 0.0);
        Ok(Self {
            frames,
            vertices,
            data,
        })
    }

    pub(crate) fn from_values(frames: usize, vertices: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), frames * vertices * COLUMNS);
        Self {
            frames,
            vertices,
            data,
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.frames, self.vertices, COLUMNS]
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn vertices(&self) -> usize {
        self.vertices
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, frame: usize, vertex: usize, column: usize) -> f64 {
        self.data[(frame * self.vertices + vertex) * COLUMNS + column]
    }

    /// All values of one frame.
    pub fn frame(&self, frame: usize) -> &[f64] {
        let len = self.vertices * COLUMNS;
        &self.data[frame * len..(frame + 1) * len]
    }

    /// Store vertex positions and the rotation that produced them. The
    /// rotation is repeated on every vertex row.
    pub fn write_frame(
        &mut self,
        frame: usize,
        positions: &[[f64; 3]],
        orientation: Orientation,
    ) -> Result<(), RecordError> {
        if frame >= self.frames {
            return Err(RecordError::FrameOutOfRange {
                frame,
                frames: self.frames,
            });
        }
        if positions.len() != self.vertices {
            return Err(RecordError::VertexCountMismatch {
                expected: self.vertices,
                found: positions.len(),
            });
        }

        let len = self.vertices * COLUMNS;
        let rotation = orientation.to_array();
        let rows = self.data[frame * len..(frame + 1) * len].chunks_exact_mut(COLUMNS);
        for (row, position) in rows.zip(positions) {
            row[..3].copy_from_slice(position);
            row[3..].copy_from_slice(&rotation);
        }
        Ok(())
    }

    pub fn positions(&self, frame: usize) -> Vec<[f64; 3]> {
        self.frame(frame)
            .chunks_exact(COLUMNS)
            .map(|row| [row[0], row[1], row[2]])
            .collect()
    }

    /// Rotation of `frame`, read from its first vertex row.
    pub fn orientation(&self, frame: usize) -> Orientation {
        match self.frame(frame) {
            [_, _, _, x, y, z, ..] => Orientation::new(*x, *y, *z),
            _ => Orientation::zero(),
        }
    }

    /// Keep only the first `frames` frames.
    pub fn truncate(&mut self, frames: usize) {
        if frames < self.frames {
            self.frames = frames;
            self.data.truncate(frames * self.vertices * COLUMNS);
        }
    }
}

/// Presentation surface fed with the composites of every frame.
pub trait Presenter {
    fn present(&mut self, frame: usize, composites: &[SceneComposite<'_>]) -> Result<(), RecordError>;

    /// Checked once before every frame.
    fn stop_requested(&mut self) -> bool {
        false
    }
}

/// Presenter for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&mut self, _frame: usize, _composites: &[SceneComposite<'_>]) -> Result<(), RecordError> {
        Ok(())
    }
}

/// Destination for a finished record.
pub trait RecordSink {
    fn persist(&mut self, name: &str, record: &FrameRecord) -> Result<PathBuf, RecordError>;
}

/// Writes `<dir>/<name>-<version>.npy`, where `version` is this crate's
/// version.
#[derive(Debug, Clone)]
pub struct NpyFileSink {
    dir: PathBuf,
}

impl NpyFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{name}-{}.npy", env!("CARGO_PKG_VERSION")))
    }
}

impl RecordSink for NpyFileSink {
    fn persist(&mut self, name: &str, record: &FrameRecord) -> Result<PathBuf, RecordError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        let file = BufWriter::new(File::create(&path)?);
        npy::write_npy(record, file)?;
        log::info!("saved record of shape {:?} to {}", record.shape(), path.display());
        Ok(path)
    }
}

/// Load a record written by [`NpyFileSink`].
pub fn load_record(path: &Path) -> Result<FrameRecord, RecordError> {
    let data = fs::read(path)?;
    Ok(npy::read_npy(&data)?)
}

/// Settings for a recording or replay run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecorderConfig {
    pub canvas: Canvas,
    /// Maximum number of frames.
    pub limit: Option<usize>,
    /// Frame rate cap; `None` runs as fast as possible.
    pub fps: Option<u32>,
}

/// Drives a scene through a rotation sequence one frame at a time.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    config: RecorderConfig,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Record the primary mesh for every rotation in `sequence`.
    ///
    /// Each frame rotates every mesh from its initial pose (x, then y, then
    /// z), centers the primary mesh on the canvas, presents the composites,
    /// stores the primary mesh's positions with the rotation, and resets
    /// every mesh. If the presenter asks to stop, the record holds only the
    /// completed frames.
    pub fn record<P: Presenter + ?Sized>(
        &self,
        scene: &mut Scene,
        sequence: &RotationSequence,
        compositor: &Compositor,
        presenter: &mut P,
    ) -> Result<FrameRecord, RecordError> {
        let vertex_count = scene.primary().ok_or(RecordError::EmptyScene)?.vertex_count();
        let rotations = sequence.limited(self.config.limit);
        let total = rotations.len();
        let mut record = FrameRecord::zeros(total, vertex_count)?;

        log::info!(
            "recording {total} of {} frames with {vertex_count} vertices",
            sequence.len()
        );

        for (frame, orientation) in rotations.enumerate() {
            if presenter.stop_requested() {
                log::warn!("stopped after {frame} of {total} frames");
                record.truncate(frame);
                break;
            }
            let frame_start = Instant::now();

            let result =
                self.record_frame(scene, &mut record, frame, orientation, compositor, presenter);
            // Every frame starts from the initial pose, including the next
            // run after a failed one.
            scene.reset_all();
            result?;

            if frame % PROGRESS_INTERVAL == 0 {
                log::info!("progress: {:.2}%", frame as f64 / total as f64 * 100.0);
            }
            self.pace(frame_start);
        }

        log::info!("recorded {} frames", record.frames());
        Ok(record)
    }

    /// Present a stored record. Every mesh is rotated as it was when the
    /// frame was recorded, then the primary mesh is moved to the stored
    /// positions. Returns the number of frames presented.
    pub fn replay<P: Presenter + ?Sized>(
        &self,
        scene: &mut Scene,
        record: &FrameRecord,
        compositor: &Compositor,
        presenter: &mut P,
    ) -> Result<usize, RecordError> {
        let expected = scene.primary().ok_or(RecordError::EmptyScene)?.vertex_count();
        if record.vertices() != expected {
            return Err(RecordError::VertexCountMismatch {
                expected,
                found: record.vertices(),
            });
        }

        let total = self
            .config
            .limit
            .map_or(record.frames(), |limit| limit.min(record.frames()));
        for frame in 0..total {
            if presenter.stop_requested() {
                log::warn!("stopped replay after {frame} of {total} frames");
                return Ok(frame);
            }
            let frame_start = Instant::now();

            let result = Self::replay_frame(scene, record, frame, compositor, presenter);
            scene.reset_all();
            result?;

            self.pace(frame_start);
        }
        Ok(total)
    }

    fn record_frame<P: Presenter + ?Sized>(
        &self,
        scene: &mut Scene,
        record: &mut FrameRecord,
        frame: usize,
        orientation: Orientation,
        compositor: &Compositor,
        presenter: &mut P,
    ) -> Result<(), RecordError> {
        for axis in Axis::ALL {
            scene.rotate_all(axis, orientation.angle(axis));
        }
        let center = self.config.canvas.center();
        scene.primary_mut().ok_or(RecordError::EmptyScene)?.center_on(&center);

        presenter.present(frame, &scene.composite(compositor))?;

        let positions = scene.primary().ok_or(RecordError::EmptyScene)?.positions();
        record.write_frame(frame, &positions, orientation)
    }

    fn replay_frame<P: Presenter + ?Sized>(
        scene: &mut Scene,
        record: &FrameRecord,
        frame: usize,
        compositor: &Compositor,
        presenter: &mut P,
    ) -> Result<(), RecordError> {
        let orientation = record.orientation(frame);
        for axis in Axis::ALL {
            scene.rotate_all(axis, orientation.angle(axis));
        }
        scene
            .primary_mut()
            .ok_or(RecordError::EmptyScene)?
            .set_positions(&record.positions(frame))?;

        presenter.present(frame, &scene.composite(compositor))
    }

    fn pace(&self, frame_start: Instant) {
        let Some(fps) = self.config.fps.filter(|&fps| fps > 0) else {
            return;
        };
        let target_frame_time = Duration::from_secs_f64(1.0 / fps as f64);
        let elapsed = frame_start.elapsed();
        if elapsed < target_frame_time {
            std::thread::sleep(target_frame_time - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use crate::visibility::Composite;
    use approx::assert_abs_diff_eq;
    use nalgebra::Point3;
    use std::io;

    /// Keeps every composite of the primary mesh and can stop early or fail.
    #[derive(Default)]
    struct Capture {
        frames: Vec<Composite>,
        stop_after: Option<usize>,
        fail_at: Option<usize>,
    }

    impl Presenter for Capture {
        fn present(&mut self, frame: usize, composites: &[SceneComposite<'_>]) -> Result<(), RecordError> {
            if self.fail_at == Some(frame) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "surface closed").into());
            }
            assert_eq!(frame, self.frames.len());
            self.frames.push(composites[0].composite.clone());
            Ok(())
        }

        fn stop_requested(&mut self) -> bool {
            self.stop_after.is_some_and(|n| self.frames.len() >= n)
        }
    }

    fn cube_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add("cube1", Mesh::cube(100.0));
        scene
    }

    fn recorder(limit: Option<usize>) -> Recorder {
        Recorder::new(RecorderConfig {
            canvas: Canvas::new(256, 256),
            limit,
            fps: None,
        })
    }

    #[test]
    fn test_record_shape() {
        let mut scene = cube_scene();
        let sequence = RotationSequence::new(2.0).unwrap();
        let record = recorder(Some(10))
            .record(&mut scene, &sequence, &Compositor::default(), &mut NullPresenter)
            .unwrap();
        assert_eq!(record.shape(), [10, 8, 6]);
        assert_eq!(record.as_slice().len(), 10 * 8 * 6);

        let full = recorder(None)
            .record(&mut scene, &sequence, &Compositor::default(), &mut NullPresenter)
            .unwrap();
        assert_eq!(full.shape(), [64, 8, 6]);
    }

    #[test]
    fn test_rotation_columns_repeat_per_vertex() {
        let mut scene = cube_scene();
        let sequence = RotationSequence::new(2.0).unwrap();
        let record = recorder(None)
            .record(&mut scene, &sequence, &Compositor::default(), &mut NullPresenter)
            .unwrap();

        for (frame, orientation) in sequence.iter().enumerate() {
            assert_eq!(record.orientation(frame), orientation);
            for vertex in 0..8 {
                assert_eq!(record.get(frame, vertex, 3), orientation.x);
                assert_eq!(record.get(frame, vertex, 4), orientation.y);
                assert_eq!(record.get(frame, vertex, 5), orientation.z);
            }
        }
    }

    #[test]
    fn test_frames_are_absolute_poses() {
        let mut scene = cube_scene();
        let sequence = RotationSequence::new(1.5).unwrap();
        let record = recorder(None)
            .record(&mut scene, &sequence, &Compositor::default(), &mut NullPresenter)
            .unwrap();

        for (frame, orientation) in sequence.iter().enumerate() {
            let mut expected = Mesh::cube(100.0);
            expected.transform(&orientation.rotation_matrix());
            expected.center_on(&Point3::new(128.0, 128.0, 0.0));
            for (got, want) in record.positions(frame).iter().zip(expected.positions()) {
                for c in 0..3 {
                    assert_abs_diff_eq!(got[c], want[c], epsilon = 1e-9);
                }
            }
        }

        // Recording leaves the scene in its initial pose.
        let cube = scene.primary().unwrap();
        assert_eq!(cube.vertices(), cube.initial_vertices());
    }

    #[test]
    fn test_presenter_sees_centered_frames() {
        let mut scene = cube_scene();
        let sequence = RotationSequence::new(2.0).unwrap();
        let mut capture = Capture::default();
        recorder(Some(5))
            .record(&mut scene, &sequence, &Compositor::default(), &mut capture)
            .unwrap();

        assert_eq!(capture.frames.len(), 5);
        // First frame is the identity pose moved to the middle of the canvas.
        let first = &capture.frames[0];
        assert_eq!(first.faces.len(), 1);
        assert_abs_diff_eq!(first.faces[0].screen[0].x, 78.0, epsilon = 1e-9);
        assert_abs_diff_eq!(first.faces[0].screen[0].y, 78.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stop_truncates_record() {
        let mut scene = cube_scene();
        let sequence = RotationSequence::new(2.0).unwrap();
        let mut capture = Capture {
            stop_after: Some(3),
            ..Capture::default()
        };
        let record = recorder(None)
            .record(&mut scene, &sequence, &Compositor::default(), &mut capture)
            .unwrap();
        assert_eq!(record.shape(), [3, 8, 6]);
        assert_eq!(capture.frames.len(), 3);
    }

    #[test]
    fn test_empty_scene() {
        let sequence = RotationSequence::new(2.0).unwrap();
        let err = recorder(None)
            .record(&mut Scene::new(), &sequence, &Compositor::default(), &mut NullPresenter)
            .unwrap_err();
        assert!(matches!(err, RecordError::EmptyScene));
    }

    #[test]
    fn test_write_frame_checks_bounds() {
        let mut record = FrameRecord::zeros(1, 2).unwrap();
        assert!(matches!(
            record.write_frame(1, &[[0.0; 3]; 2], Orientation::zero()),
            Err(RecordError::FrameOutOfRange { frame: 1, frames: 1 })
        ));
        assert!(matches!(
            record.write_frame(0, &[[0.0; 3]; 3], Orientation::zero()),
            Err(RecordError::VertexCountMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_replay_matches_recording() {
        let mut scene = cube_scene();
        let sequence = RotationSequence::new(2.0).unwrap();
        let compositor = Compositor::default();

        let mut recorded = Capture::default();
        let record = recorder(Some(12))
            .record(&mut scene, &sequence, &compositor, &mut recorded)
            .unwrap();

        let mut replayed = Capture::default();
        let frames = recorder(None)
            .replay(&mut scene, &record, &compositor, &mut replayed)
            .unwrap();
        assert_eq!(frames, 12);
        assert_eq!(replayed.frames, recorded.frames);
    }

    #[test]
    fn test_replay_rejects_other_meshes() {
        let mut scene = Scene::new();
        scene.add("points", Mesh::from_vertices(&[[0.0; 3]]));
        let err = recorder(None)
            .replay(&mut scene, &FrameRecord::zeros(1, 8).unwrap(), &Compositor::default(), &mut NullPresenter)
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::VertexCountMismatch { expected: 1, found: 8 }
        ));
    }

    #[test]
    fn test_sink_writes_versioned_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = NpyFileSink::new(dir.path().join("data"));
        let mut record = FrameRecord::zeros(1, 8).unwrap();
        record
            .write_frame(0, &Mesh::cube(1.0).positions(), Orientation::new(0.3, 0.6, 0.9))
            .unwrap();

        let path = sink.persist("cube1", &record).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("cube1-{}.npy", env!("CARGO_PKG_VERSION"))
        );
        assert_eq!(load_record(&path).unwrap(), record);
    }

    #[test]
    fn test_oversized_record_is_an_error() {
        assert!(matches!(
            FrameRecord::zeros(usize::MAX, 8),
            Err(RecordError::TooLarge { frames: usize::MAX, vertices: 8 })
        ));
        // Fits in usize but not in memory.
        assert!(matches!(
            FrameRecord::zeros(usize::MAX / 64, 8),
            Err(RecordError::TooLarge { .. })
        ));
        assert_eq!(FrameRecord::zeros(0, 8).unwrap().shape(), [0, 8, 6]);
    }

    #[test]
    fn test_huge_grid_fails_without_panicking() {
        let mut scene = cube_scene();
        // 62832³ rotations of 8 vertices exceed any address space.
        let sequence = RotationSequence::new(1e-4).unwrap();
        let err = recorder(None)
            .record(&mut scene, &sequence, &Compositor::default(), &mut NullPresenter)
            .unwrap_err();
        assert!(matches!(err, RecordError::TooLarge { vertices: 8, .. }));
    }

    #[test]
    fn test_failed_frame_leaves_initial_pose() {
        let mut scene = cube_scene();
        let sequence = RotationSequence::new(2.0).unwrap();
        let mut failing = Capture {
            fail_at: Some(1),
            ..Capture::default()
        };
        let err = recorder(None)
            .record(&mut scene, &sequence, &Compositor::default(), &mut failing)
            .unwrap_err();
        assert!(matches!(err, RecordError::Io(_)));
        let cube = scene.primary().unwrap();
        assert_eq!(cube.vertices(), cube.initial_vertices());

        // A second run starts from the same pose as a fresh scene.
        let again = recorder(Some(3))
            .record(&mut scene, &sequence, &Compositor::default(), &mut NullPresenter)
            .unwrap();
        let fresh = recorder(Some(3))
            .record(&mut cube_scene(), &sequence, &Compositor::default(), &mut NullPresenter)
            .unwrap();
        assert_eq!(again, fresh);
    }

    #[test]
    fn test_failed_replay_frame_leaves_initial_pose() {
        let mut scene = cube_scene();
        let sequence = RotationSequence::new(2.0).unwrap();
        let compositor = Compositor::default();
        let record = recorder(Some(4))
            .record(&mut scene, &sequence, &compositor, &mut NullPresenter)
            .unwrap();

        let mut failing = Capture {
            fail_at: Some(2),
            ..Capture::default()
        };
        assert!(recorder(None)
            .replay(&mut scene, &record, &compositor, &mut failing)
            .is_err());
        assert_eq!(failing.frames.len(), 2);
        let cube = scene.primary().unwrap();
        assert_eq!(cube.vertices(), cube.initial_vertices());
    }
}

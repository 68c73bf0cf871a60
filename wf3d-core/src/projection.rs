/// Canvas and projection utilities
use nalgebra::{Point2, Point3};

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    /// Take x and y as they are. This is the base rendering path.
    Orthographic,
    /// Shrink points towards the canvas center with distance from a viewer
    /// at `z = -viewer_distance`.
    Perspective { viewer_distance: f64 },
}

/// Size of the drawing surface in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Midpoint of the canvas on the `z = 0` plane.
    pub fn center(&self) -> Point3<f64> {
        Point3::new(self.width as f64 / 2.0, self.height as f64 / 2.0, 0.0)
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(256, 256)
    }
}

/// Camera configuration for projecting vertices onto the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub canvas: Canvas,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            mode: ProjectionMode::Orthographic,
        }
    }

    pub fn with_mode(mut self, mode: ProjectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Project a 3D point to 2D canvas space.
    ///
    /// Returns `None` for points at or behind the viewer in perspective mode.
    pub fn project(&self, point: &Point3<f64>) -> Option<Point2<f64>> {
        match self.mode {
            ProjectionMode::Orthographic => Some(Point2::new(point.x, point.y)),
            ProjectionMode::Perspective { viewer_distance } => {
                let depth = viewer_distance + point.z;
                // Prevent division by near-zero depth values
                if depth < 1e-6 {
                    return None;
                }
                let factor = viewer_distance / depth;
                let center = self.canvas.center();
                Some(Point2::new(
                    center.x + (point.x - center.x) * factor,
                    center.y + (point.y - center.y) * factor,
                ))
            }
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Canvas::default())
    }
}

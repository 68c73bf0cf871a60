/// 3D transformation matrices and rotation state
///
/// Every matrix here acts on homogeneous row vectors by right-multiplication
/// (`v' = v * M`), which is how [`crate::Mesh`] stores its vertices.
use nalgebra::{Matrix4, Vector3};

/// Coordinate axis used to pick a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes in the order rotations are applied.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Right-handed rotation about this axis.
    pub fn rotation(self, radians: f64) -> Matrix4<f64> {
        match self {
            Axis::X => rotation_x(radians),
            Axis::Y => rotation_y(radians),
            Axis::Z => rotation_z(radians),
        }
    }
}

/// Translation by `(dx, dy, dz)`. The offsets live in the last row.
pub fn translation(dx: f64, dy: f64, dz: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(dx, dy, dz)).transpose()
}

/// Uniform scale by `s` anchored at the pivot `(cx, cy, cz)`.
#[rustfmt::skip]
pub fn scale(s: f64, cx: f64, cy: f64, cz: f64) -> Matrix4<f64> {
    Matrix4::new(
        s, 0.0, 0.0, 0.0,
        0.0, s, 0.0, 0.0,
        0.0, 0.0, s, 0.0,
        cx * (1.0 - s), cy * (1.0 - s), cz * (1.0 - s), 1.0,
    )
}

/// Rotation about the x axis; a positive angle turns +y towards +z.
pub fn rotation_x(radians: f64) -> Matrix4<f64> {
    Matrix4::new_rotation(Vector3::new(radians, 0.0, 0.0)).transpose()
}

/// Rotation about the y axis; a positive angle turns +z towards +x.
pub fn rotation_y(radians: f64) -> Matrix4<f64> {
    Matrix4::new_rotation(Vector3::new(0.0, radians, 0.0)).transpose()
}

/// Rotation about the z axis; a positive angle turns +x towards +y.
pub fn rotation_z(radians: f64) -> Matrix4<f64> {
    Matrix4::new_rotation(Vector3::new(0.0, 0.0, radians)).transpose()
}

/// Rotation about `axis`.
pub fn rotation(axis: Axis, radians: f64) -> Matrix4<f64> {
    axis.rotation(radians)
}

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Orientation {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f64, dy: f64, dz: f64) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    /// Angle about `axis`.
    pub fn angle(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Combined rotation applying x first, then y, then z.
    pub fn rotation_matrix(&self) -> Matrix4<f64> {
        rotation_x(self.x) * rotation_y(self.y) * rotation_z(self.z)
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<[f64; 3]> for Orientation {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

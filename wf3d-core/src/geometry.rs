/// Geometry primitives for 3D rendering
use std::fmt;

use nalgebra::{Dyn, Matrix4, OMatrix, Point3, Vector3, U4};

use crate::error::MeshError;
use crate::transform;

/// N×4 block of homogeneous row vectors `(x, y, z, 1)`.
pub type VertexBuffer = OMatrix<f64, Dyn, U4>;

/// A pair of vertex indices joined by an edge.
pub type Edge = [usize; 2];

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

/// A polygon given by vertex indices. The index order is the winding, which
/// decides which side the face normal points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    indices: Vec<usize>,
}

impl Face {
    pub fn new(indices: impl Into<Vec<usize>>) -> Self {
        Self {
            indices: indices.into(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Consecutive index pairs, starting with the pair that closes the loop.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        let n = self.indices.len();
        (0..n).map(move |k| [self.indices[(k + n - 1) % n], self.indices[k]])
    }
}

impl From<Vec<usize>> for Face {
    fn from(indices: Vec<usize>) -> Self {
        Self::new(indices)
    }
}

impl<const N: usize> From<[usize; N]> for Face {
    fn from(indices: [usize; N]) -> Self {
        Self::new(indices.to_vec())
    }
}

/// A rigid wireframe: vertices, derived edges and colored faces.
///
/// The mesh keeps a copy of the pose it was built with so that it can be
/// returned to it exactly with [`Mesh::reset`].
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: VertexBuffer,
    initial: VertexBuffer,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    colors: Vec<Rgb>,
}

impl Mesh {
    /// Build a mesh from vertex positions, faces and one color per face.
    ///
    /// Fails if any face refers to a missing vertex or if the number of
    /// colors differs from the number of faces. A mesh with no faces and no
    /// colors is a plain point cloud.
    pub fn new(vertices: &[[f64; 3]], faces: Vec<Face>, colors: Vec<Rgb>) -> Result<Self, MeshError> {
        let vertex_count = vertices.len();

        for (face_index, face) in faces.iter().enumerate() {
            if let Some(&index) = face.indices().iter().find(|&&i| i >= vertex_count) {
                return Err(MeshError::InvalidTopology {
                    face: face_index,
                    index,
                    vertex_count,
                });
            }
        }
        if faces.len() != colors.len() {
            return Err(MeshError::ColorCountMismatch {
                faces: faces.len(),
                colors: colors.len(),
            });
        }

        let mesh = Self::assemble(homogeneous(vertices), faces, colors);
        log::debug!(
            "built mesh with {} vertices, {} edges, {} faces",
            mesh.vertex_count(),
            mesh.edges.len(),
            mesh.faces.len()
        );
        Ok(mesh)
    }

    /// Build a mesh with vertices only.
    pub fn from_vertices(vertices: &[[f64; 3]]) -> Self {
        Self::assemble(homogeneous(vertices), Vec::new(), Vec::new())
    }

    fn assemble(buffer: VertexBuffer, faces: Vec<Face>, colors: Vec<Rgb>) -> Self {
        let edges = faces.iter().flat_map(Face::edges).collect();
        Self {
            initial: buffer.clone(),
            vertices: buffer,
            edges,
            faces,
            colors,
        }
    }

    /// Axis-aligned cube spanning `[0, size]` on every axis.
    ///
    /// Vertex `i` sits at `(x, y, z)` where `i = 4x + 2y + z` in units of
    /// `size`; every face is wound so that its normal points outwards.
    pub fn cube(size: f64) -> Self {
        let mut vertices = Vec::with_capacity(8);
        for x in [0.0, size] {
            for y in [0.0, size] {
                for z in [0.0, size] {
                    vertices.push([x, y, z]);
                }
            }
        }
        let faces = vec![
            Face::from([0, 1, 3, 2]), // x = 0
            Face::from([7, 5, 4, 6]), // x = size
            Face::from([4, 5, 1, 0]), // y = 0
            Face::from([2, 3, 7, 6]), // y = size
            Face::from([0, 2, 6, 4]), // z = 0
            Face::from([5, 7, 3, 1]), // z = size
        ];
        let colors = vec![
            Rgb::new(255, 0, 0),
            Rgb::new(0, 255, 0),
            Rgb::new(0, 0, 255),
            Rgb::new(255, 255, 0),
            Rgb::new(255, 0, 255),
            Rgb::new(0, 255, 255),
        ];

        Self::assemble(homogeneous(&vertices), faces, colors)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.nrows()
    }

    /// Current homogeneous vertices.
    pub fn vertices(&self) -> &VertexBuffer {
        &self.vertices
    }

    /// Vertices as they were when the mesh was built.
    pub fn initial_vertices(&self) -> &VertexBuffer {
        &self.initial
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Current position of vertex `index`.
    pub fn position(&self, index: usize) -> Point3<f64> {
        Point3::new(
            self.vertices[(index, 0)],
            self.vertices[(index, 1)],
            self.vertices[(index, 2)],
        )
    }

    /// Current positions without the homogeneous column.
    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.vertices
            .row_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect()
    }

    /// Overwrite the current positions, e.g. with a recorded frame.
    pub fn set_positions(&mut self, positions: &[[f64; 3]]) -> Result<(), MeshError> {
        if positions.len() != self.vertex_count() {
            return Err(MeshError::VertexCountMismatch {
                expected: self.vertex_count(),
                found: positions.len(),
            });
        }
        for (row, p) in positions.iter().enumerate() {
            self.vertices[(row, 0)] = p[0];
            self.vertices[(row, 1)] = p[1];
            self.vertices[(row, 2)] = p[2];
            self.vertices[(row, 3)] = 1.0;
        }
        Ok(())
    }

    /// Right-multiply every current vertex by `matrix`.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        self.vertices = &self.vertices * matrix;
    }

    /// Return to the pose the mesh was built with.
    pub fn reset(&mut self) {
        self.vertices.copy_from(&self.initial);
    }

    /// Midpoint of the axis-aligned bounding box of the current vertices.
    ///
    /// An empty mesh is centered on the origin.
    pub fn find_center(&self) -> Point3<f64> {
        if self.vertex_count() == 0 {
            return Point3::origin();
        }
        let mut min = Vector3::repeat(f64::INFINITY);
        let mut max = Vector3::repeat(f64::NEG_INFINITY);
        for row in self.vertices.row_iter() {
            let p = Vector3::new(row[0], row[1], row[2]);
            min = min.inf(&p);
            max = max.sup(&p);
        }
        Point3::from((min + max) * 0.5)
    }

    /// Translate the mesh so that [`Mesh::find_center`] returns `target`.
    pub fn center_on(&mut self, target: &Point3<f64>) {
        let diff = *target - self.find_center();
        self.transform(&transform::translation(diff.x, diff.y, diff.z));
    }

    /// Smallest z coordinate among the vertices of `face`.
    pub fn min_z(&self, face: &Face) -> f64 {
        face.indices()
            .iter()
            .map(|&i| self.vertices[(i, 2)])
            .fold(f64::INFINITY, f64::min)
    }

    /// Faces with their index and color, ordered by ascending minimum z.
    ///
    /// Smaller z is nearer the viewer, so the nearest face comes first.
    pub fn sorted_faces(&self) -> Vec<(usize, &Face, Rgb)> {
        let mut sorted = self
            .faces
            .iter()
            .zip(&self.colors)
            .enumerate()
            .map(|(i, (face, &color))| (i, face, color))
            .collect::<Vec<_>>();
        sorted.sort_by(|a, b| self.min_z(a.1).total_cmp(&self.min_z(b.1)));
        sorted
    }
}

fn homogeneous(vertices: &[[f64; 3]]) -> VertexBuffer {
    VertexBuffer::from_fn(vertices.len(), |row, col| {
        if col == 3 {
            1.0
        } else {
            vertices[row][col]
        }
    })
}

impl fmt::Display for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} vertices (x, y, z, w) ---", self.vertex_count())?;
        for (i, row) in self.vertices.row_iter().enumerate() {
            writeln!(f, "{i} ({}, {}, {}, {})", row[0], row[1], row[2], row[3])?;
        }

        writeln!(f, "--- {} edges (v1 - v2) ---", self.edges.len())?;
        for (i, [a, b]) in self.edges.iter().enumerate() {
            writeln!(f, "{i} {a} - {b}")?;
        }

        writeln!(f, "--- {} faces ---", self.faces.len())?;
        for (i, (face, color)) in self.faces.iter().zip(&self.colors).enumerate() {
            let indices = face
                .indices()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "{i}: {indices} rgb({}, {}, {})", color.r, color.g, color.b)?;
        }
        Ok(())
    }
}

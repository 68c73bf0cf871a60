/// Back-face culling and depth-ordered face compositing
use std::collections::BTreeSet;

use nalgebra::{Point2, Vector3};

use crate::geometry::{Face, Mesh, Rgb};
use crate::projection::Camera;

/// Direction from the scene towards the viewer. The camera looks down +z,
/// so smaller z is nearer.
pub fn view_vector() -> Vector3<f64> {
    Vector3::new(0.0, 0.0, -1.0)
}

/// Unnormalized normal of `face`: the cross product of the edges from its
/// first vertex to its second and third vertices.
///
/// Faces with fewer than three vertices have no area and get a zero normal.
pub fn face_normal(mesh: &Mesh, face: &Face) -> Vector3<f64> {
    match face.indices() {
        [a, b, c, ..] => {
            let origin = mesh.position(*a);
            let edge1 = mesh.position(*b) - origin;
            let edge2 = mesh.position(*c) - origin;
            edge1.cross(&edge2)
        }
        _ => Vector3::zeros(),
    }
}

/// A face is drawn only if its normal points strictly towards the viewer.
/// Edge-on faces are culled.
pub fn is_front_facing(normal: &Vector3<f64>) -> bool {
    normal.dot(&view_vector()) > 0.0
}

/// Order in which visible faces are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawOrder {
    /// The order faces were given to the mesh.
    MeshOrder,
    /// Ascending minimum z, nearest face first.
    #[default]
    DepthSorted,
}

/// A front-facing face ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleFace {
    /// Index of the face in the mesh.
    pub index: usize,
    pub color: Rgb,
    /// Projected vertices in winding order.
    pub screen: Vec<Point2<f64>>,
    /// Minimum z among the face's vertices.
    pub depth: f64,
    /// Lambertian brightness in `[0, 1]`, if shading was requested.
    pub shade: Option<f64>,
}

/// A vertex that belongs to at least one visible face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexMarker {
    pub index: usize,
    pub screen: Point2<f64>,
}

/// Everything a presentation surface needs to draw one mesh for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composite {
    pub faces: Vec<VisibleFace>,
    pub visible_vertices: BTreeSet<usize>,
    pub markers: Vec<VertexMarker>,
}

impl Composite {
    /// Visible faces farthest first, the order a painter's algorithm draws
    /// them in so that nearer faces cover farther ones.
    pub fn back_to_front(&self) -> Vec<&VisibleFace> {
        let mut faces = self.faces.iter().collect::<Vec<_>>();
        faces.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        faces
    }
}

/// Culls, orders and projects the faces of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compositor {
    pub camera: Camera,
    pub order: DrawOrder,
    pub shading: bool,
}

impl Compositor {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            order: DrawOrder::default(),
            shading: false,
        }
    }

    pub fn with_order(mut self, order: DrawOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_shading(mut self, shading: bool) -> Self {
        self.shading = shading;
        self
    }

    pub fn composite(&self, mesh: &Mesh) -> Composite {
        let candidates = match self.order {
            DrawOrder::DepthSorted => mesh.sorted_faces(),
            DrawOrder::MeshOrder => mesh
                .faces()
                .iter()
                .zip(mesh.colors())
                .enumerate()
                .map(|(i, (face, &color))| (i, face, color))
                .collect(),
        };

        let mut composite = Composite::default();
        for (index, face, color) in candidates {
            let normal = face_normal(mesh, face);
            if !is_front_facing(&normal) {
                continue;
            }

            let Some(screen) = face
                .indices()
                .iter()
                .map(|&v| self.camera.project(&mesh.position(v)))
                .collect::<Option<Vec<_>>>()
            else {
                // Part of the face is behind the viewer.
                continue;
            };

            let shade = self
                .shading
                .then(|| normal.normalize().dot(&view_vector()).clamp(0.0, 1.0));

            composite.visible_vertices.extend(face.indices());
            composite.faces.push(VisibleFace {
                index,
                color,
                screen,
                depth: mesh.min_z(face),
                shade,
            });
        }

        composite.markers = composite
            .visible_vertices
            .iter()
            .filter_map(|&index| {
                let screen = self.camera.project(&mesh.position(index))?;
                Some(VertexMarker { index, screen })
            })
            .collect();

        log::trace!(
            "composited {} of {} faces, {} visible vertices",
            composite.faces.len(),
            mesh.faces().len(),
            composite.visible_vertices.len()
        );

        composite
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Camera::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Orientation;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cube_face_normals_point_outwards() {
        let cube = Mesh::cube(1.0);
        let normals = cube
            .faces()
            .iter()
            .map(|face| face_normal(&cube, face))
            .collect::<Vec<_>>();
        assert_eq!(normals[0], Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(normals[1], Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(normals[2], Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(normals[3], Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(normals[4], Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(normals[5], Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_edge_on_faces_are_culled() {
        assert!(!is_front_facing(&Vector3::new(1.0, 0.0, 0.0)));
        assert!(!is_front_facing(&Vector3::new(0.0, 0.0, 1.0)));
        assert!(is_front_facing(&Vector3::new(0.3, 0.2, -0.1)));
    }

    #[test]
    fn test_identity_cube_shows_near_face() {
        let cube = Mesh::cube(100.0);
        let composite = Compositor::default().composite(&cube);

        assert_eq!(composite.faces.len(), 1);
        assert_eq!(composite.faces[0].index, 4);
        assert_eq!(composite.faces[0].color, Rgb::new(255, 0, 255));
        assert_eq!(composite.visible_vertices, BTreeSet::from([0, 2, 4, 6]));
        assert_eq!(
            composite.faces[0].screen,
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(0.0, 100.0),
                Point2::new(100.0, 100.0),
                Point2::new(100.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_rotated_cube_shows_three_faces() {
        let mut cube = Mesh::cube(100.0);
        cube.transform(&Orientation::new(0.5, 0.5, 0.0).rotation_matrix());
        let composite = Compositor::default().composite(&cube);

        assert_eq!(composite.faces.len(), 3);
        // One face from each pair of opposite faces.
        let mut pairs = composite
            .faces
            .iter()
            .map(|f| f.index / 2)
            .collect::<Vec<_>>();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![0, 1, 2]);
        for face in &composite.faces {
            let normal = face_normal(&cube, &cube.faces()[face.index]);
            assert!(normal.z < 0.0);
        }
        assert_eq!(composite.markers.len(), composite.visible_vertices.len());
        assert_eq!(composite.visible_vertices.len(), 7);
    }

    #[test]
    fn test_depth_sorted_order() {
        let mut cube = Mesh::cube(100.0);
        cube.transform(&Orientation::new(0.5, 0.5, 0.0).rotation_matrix());
        let composite = Compositor::default()
            .with_order(DrawOrder::DepthSorted)
            .composite(&cube);
        let depths = composite.faces.iter().map(|f| f.depth).collect::<Vec<_>>();
        assert!(depths.windows(2).all(|w| w[0] <= w[1]));

        let painted = composite.back_to_front();
        assert!(painted.windows(2).all(|w| w[0].depth >= w[1].depth));
    }

    #[test]
    fn test_mesh_order_keeps_face_order() {
        let mut cube = Mesh::cube(100.0);
        cube.transform(&Orientation::new(2.0, 0.7, 0.3).rotation_matrix());
        let composite = Compositor::default()
            .with_order(DrawOrder::MeshOrder)
            .composite(&cube);
        let indices = composite.faces.iter().map(|f| f.index).collect::<Vec<_>>();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_shading_only_when_requested() {
        let cube = Mesh::cube(10.0);
        let plain = Compositor::default().composite(&cube);
        assert_eq!(plain.faces[0].shade, None);

        let shaded = Compositor::default().with_shading(true).composite(&cube);
        assert_abs_diff_eq!(shaded.faces[0].shade.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_faces_are_culled() {
        let mesh = Mesh::new(
            &[[0.0; 3], [1.0, 0.0, 0.0]],
            vec![Face::from([0, 1])],
            vec![Rgb::new(9, 9, 9)],
        )
        .unwrap();
        assert_eq!(face_normal(&mesh, &mesh.faces()[0]), Vector3::zeros());
        let composite = Compositor::default().composite(&mesh);
        assert!(composite.faces.is_empty());
        assert!(composite.markers.is_empty());
    }
}

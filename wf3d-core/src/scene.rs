/// Named collection of meshes transformed together
use std::collections::BTreeMap;

use nalgebra::{Matrix4, Point3};

use crate::geometry::Mesh;
use crate::transform::{self, Axis};
use crate::visibility::{Composite, Compositor};

/// Composite of one named mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneComposite<'a> {
    pub name: &'a str,
    pub composite: Composite,
}

/// Meshes keyed by name. The first mesh added is the primary mesh, which is
/// the one that gets centered and recorded.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    meshes: BTreeMap<String, Mesh>,
    primary: Option<String>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mesh, replacing any mesh with the same name.
    pub fn add(&mut self, name: impl Into<String>, mesh: Mesh) {
        let name = name.into();
        if self.primary.is_none() {
            self.primary = Some(name.clone());
        }
        self.meshes.insert(name, mesh);
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Mesh> {
        self.meshes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Mesh> {
        self.meshes.get_mut(name)
    }

    pub fn primary_name(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn primary(&self) -> Option<&Mesh> {
        self.meshes.get(self.primary.as_deref()?)
    }

    pub fn primary_mut(&mut self) -> Option<&mut Mesh> {
        self.meshes.get_mut(self.primary.as_deref()?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mesh)> {
        self.meshes.iter().map(|(name, mesh)| (name.as_str(), mesh))
    }

    pub fn transform_all(&mut self, matrix: &Matrix4<f64>) {
        for mesh in self.meshes.values_mut() {
            mesh.transform(matrix);
        }
    }

    pub fn rotate_all(&mut self, axis: Axis, radians: f64) {
        self.transform_all(&axis.rotation(radians));
    }

    pub fn translate_all(&mut self, dx: f64, dy: f64, dz: f64) {
        self.transform_all(&transform::translation(dx, dy, dz));
    }

    pub fn scale_all(&mut self, s: f64, pivot: &Point3<f64>) {
        self.transform_all(&transform::scale(s, pivot.x, pivot.y, pivot.z));
    }

    /// Put every mesh back in its initial pose.
    pub fn reset_all(&mut self) {
        for mesh in self.meshes.values_mut() {
            mesh.reset();
        }
    }

    pub fn composite(&self, compositor: &Compositor) -> Vec<SceneComposite<'_>> {
        self.iter()
            .map(|(name, mesh)| SceneComposite {
                name,
                composite: compositor.composite(mesh),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_mesh_is_primary() {
        let mut scene = Scene::new();
        assert!(scene.primary().is_none());

        scene.add("zeta", Mesh::cube(1.0));
        scene.add("alpha", Mesh::cube(2.0));
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.primary_name(), Some("zeta"));
        assert_eq!(scene.primary().unwrap().position(7), Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_transforms_reach_every_mesh() {
        let mut scene = Scene::new();
        scene.add("a", Mesh::cube(1.0));
        scene.add("b", Mesh::cube(3.0));

        scene.translate_all(10.0, 0.0, 0.0);
        for (_, mesh) in scene.iter() {
            assert_eq!(mesh.position(0), Point3::new(10.0, 0.0, 0.0));
        }

        scene.rotate_all(Axis::Z, 1.0);
        scene.scale_all(2.0, &Point3::origin());
        scene.reset_all();
        assert_eq!(scene.get("b").unwrap().position(7), Point3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_composite_per_mesh() {
        let mut scene = Scene::new();
        scene.add("cube", Mesh::cube(1.0));
        scene.add("points", Mesh::from_vertices(&[[0.0; 3]]));

        let composites = scene.composite(&Compositor::default());
        assert_eq!(composites.len(), 2);
        assert_eq!(composites[0].name, "cube");
        assert_eq!(composites[0].composite.faces.len(), 1);
        assert!(composites[1].composite.faces.is_empty());
    }
}

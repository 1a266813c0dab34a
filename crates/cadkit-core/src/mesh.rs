//! Mesh data structures
//!
//! Triangle meshes produced by engine tessellation and merged by composite
//! factories for preview rendering.

use nalgebra::{Point3, Vector3};

/// Triangle mesh data from tessellation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions
    pub vertices: Vec<Point3<f64>>,
    /// Vertex normals, one per vertex
    pub normals: Vec<Vector3<f64>>,
    /// Triangle indices (3 per triangle)
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create a mesh from raw buffers
    pub fn new(vertices: Vec<Point3<f64>>, normals: Vec<Vector3<f64>>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            normals,
            indices,
        }
    }

    /// Create empty mesh
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of triangles in the mesh
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Check that every index references a vertex and normals line up
    pub fn is_consistent(&self) -> bool {
        let count = self.vertices.len();
        self.indices.len() % 3 == 0
            && (self.normals.is_empty() || self.normals.len() == count)
            && self.indices.iter().all(|&i| (i as usize) < count)
    }

    /// Append another mesh, offsetting its indices past the current vertices
    ///
    /// If only one side carries normals, the other side's vertices get zero
    /// normals so the buffers stay aligned.
    pub fn append(&mut self, other: &MeshData) {
        let offset = self.vertices.len() as u32;
        if !other.normals.is_empty() {
            self.normals.resize(self.vertices.len(), Vector3::zeros());
        }
        self.vertices.extend_from_slice(&other.vertices);
        if !other.normals.is_empty() {
            self.normals.extend_from_slice(&other.normals);
        } else if !self.normals.is_empty() {
            self.normals.resize(self.vertices.len(), Vector3::zeros());
        }
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }

    /// Concatenate meshes in order into a single mesh
    pub fn merge<'a, I>(meshes: I) -> MeshData
    where
        I: IntoIterator<Item = &'a MeshData>,
    {
        let mut merged = MeshData::empty();
        for mesh in meshes {
            merged.append(mesh);
        }
        merged
    }

    /// Axis-aligned bounds, or `None` for an empty mesh
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;
        let mut min = *first;
        let mut max = *first;
        for v in &self.vertices[1..] {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }
        Some((min, max))
    }

    /// Get vertices as flat f32 array for GPU upload
    pub fn vertices_as_f32(&self) -> Vec<f32> {
        self.vertices
            .iter()
            .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32])
            .collect()
    }

    /// Get normals as flat f32 array
    pub fn normals_as_f32(&self) -> Vec<f32> {
        self.normals
            .iter()
            .flat_map(|n| [n.x as f32, n.y as f32, n.z as f32])
            .collect()
    }
}

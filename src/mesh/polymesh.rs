//! Polygon mesh snapshot.
//!
//! A [`PolyMesh`] is the read-only view of one host mesh that every operation in
//! this crate works on: vertex positions, faces as ordered vertex loops, and the
//! CAD group each face came from. Face areas and normals are computed once, when
//! the snapshot is built.
//!
//! Snapshots may contain faces the host considers valid but which are unusable
//! for adjacency (repeated or out-of-range vertex indices, zero area). They are
//! stored as given; [`MeshTopology`](super::MeshTopology) decides what to do with
//! them.

use nalgebra::{Matrix4, Point3, Vector3};

use super::index::{EdgeKey, FaceId, GroupId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// A vertex in the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,
}

impl Vertex {
    /// Create a new vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }

    /// Create a new vertex from coordinates.
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// A polygonal face.
#[derive(Debug, Clone)]
pub struct Face<I: MeshIndex = u32> {
    vertices: Vec<VertexId<I>>,
    group: Option<GroupId>,
    area: f64,
    normal: Vector3<f64>,
}

impl<I: MeshIndex> Face<I> {
    /// The face's vertex loop, in winding order.
    #[inline]
    pub fn vertices(&self) -> &[VertexId<I>] {
        &self.vertices
    }

    /// The CAD group this face belongs to, if any.
    #[inline]
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    /// Area of the face (zero for unusable faces).
    #[inline]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Unit normal of the face (zero vector for unusable faces).
    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Number of corners.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the face has no corners at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether the face has more than four corners.
    #[inline]
    pub fn is_ngon(&self) -> bool {
        self.vertices.len() > 4
    }
}

/// An immutable polygon mesh with per-face group ids.
#[derive(Debug, Clone)]
pub struct PolyMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) faces: Vec<Face<I>>,
    revision: u64,
}

impl<I: MeshIndex> Default for PolyMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> PolyMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            revision: 0,
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(num_vertices),
            faces: Vec::with_capacity(num_faces),
            revision: 0,
        }
    }

    /// Tag the snapshot with a host revision counter.
    ///
    /// Caches keyed on a mesh (see the live session) are invalidated whenever the
    /// revision changes, so hosts should bump it on every vertex/face edit.
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// The host revision counter of this snapshot.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Whether `v` indexes an existing vertex.
    #[inline]
    pub fn contains_vertex(&self, v: VertexId<I>) -> bool {
        v.is_valid() && v.index() < self.vertices.len()
    }

    /// Whether `f` indexes an existing face.
    #[inline]
    pub fn contains_face(&self, f: FaceId<I>) -> bool {
        f.is_valid() && f.index() < self.faces.len()
    }

    /// Get the vertex loop of a face.
    #[inline]
    pub fn face_vertices(&self, f: FaceId<I>) -> &[VertexId<I>] {
        self.face(f).vertices()
    }

    /// Get the group of a face.
    #[inline]
    pub fn face_group(&self, f: FaceId<I>) -> Option<GroupId> {
        self.face(f).group
    }

    /// Get the precomputed area of a face.
    #[inline]
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        self.face(f).area
    }

    /// Get the precomputed unit normal of a face.
    #[inline]
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        self.face(f).normal
    }

    /// Iterate over the sides of a face as undirected edges.
    ///
    /// Sides whose end points coincide (repeated vertex indices) are skipped.
    pub fn face_edges(&self, f: FaceId<I>) -> impl Iterator<Item = EdgeKey<I>> + '_ {
        let verts = self.face_vertices(f);
        let n = verts.len();
        (0..n).filter_map(move |i| {
            let a = verts[i];
            let b = verts[(i + 1) % n];
            (a != b).then(|| EdgeKey::new(a, b))
        })
    }

    /// Compute the centroid (vertex average) of a face.
    pub fn face_centroid(&self, f: FaceId<I>) -> Point3<f64> {
        let mut sum: Vector3<f64> = Vector3::zeros();
        let mut count = 0usize;
        for &v in self.face_vertices(f) {
            if self.contains_vertex(v) {
                sum += self.position(v).coords;
                count += 1;
            }
        }
        if count == 0 {
            Point3::origin()
        } else {
            Point3::from(sum / count as f64)
        }
    }

    /// Compute the length of an edge.
    pub fn edge_length(&self, e: EdgeKey<I>) -> f64 {
        let (a, b) = e.vertices();
        (self.position(b) - self.position(a)).norm()
    }

    /// Compute the unit direction of an edge, from its lower to its higher vertex.
    pub fn edge_direction(&self, e: EdgeKey<I>) -> Option<Vector3<f64>> {
        let (a, b) = e.vertices();
        (self.position(b) - self.position(a)).try_normalize(1e-12)
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over all faces with their IDs.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId<I>, &Face<I>)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .map(|(i, f)| (FaceId::new(i), f))
    }

    /// All vertex positions, in index order.
    pub fn positions(&self) -> impl Iterator<Item = &Point3<f64>> + '_ {
        self.vertices.iter().map(|v| &v.position)
    }

    // ==================== Geometry ====================

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;
        let mut min = first.position;
        let mut max = first.position;

        for v in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Some((min, max))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.faces.iter().map(|f| f.area).sum()
    }

    /// Whether any face has more than four corners.
    pub fn has_ngons(&self) -> bool {
        self.faces.iter().any(Face::is_ngon)
    }

    /// All group ids present on the mesh, ascending.
    pub fn group_ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self.faces.iter().filter_map(|f| f.group).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Vertex positions mapped through a homogeneous transform.
    pub fn transformed_positions(&self, transform: &Matrix4<f64>) -> Vec<Point3<f64>> {
        self.vertices
            .iter()
            .map(|v| transform.transform_point(&v.position))
            .collect()
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    /// Add a face and return its ID.
    ///
    /// Area and normal are computed immediately from the current vertex
    /// positions; vertex indices that do not exist yet contribute nothing.
    pub fn add_face(&mut self, vertices: Vec<VertexId<I>>, group: Option<GroupId>) -> FaceId<I> {
        let id = FaceId::new(self.faces.len());
        let (area, normal) = self.polygon_area_normal(&vertices);
        self.faces.push(Face {
            vertices,
            group,
            area,
            normal,
        });
        id
    }

    /// Newell's method: area and unit normal of a (possibly non-planar) loop.
    fn polygon_area_normal(&self, loop_: &[VertexId<I>]) -> (f64, Vector3<f64>) {
        let points: Vec<&Point3<f64>> = loop_
            .iter()
            .filter(|&&v| self.contains_vertex(v))
            .map(|&v| self.position(v))
            .collect();
        if points.len() < 3 {
            return (0.0, Vector3::zeros());
        }

        let mut n: Vector3<f64> = Vector3::zeros();
        for i in 0..points.len() {
            let p = points[i];
            let q = points[(i + 1) % points.len()];
            n.x += (p.y - q.y) * (p.z + q.z);
            n.y += (p.z - q.z) * (p.x + q.x);
            n.z += (p.x - q.x) * (p.y + q.y);
        }

        let len = n.norm();
        if len <= f64::EPSILON {
            (0.0, Vector3::zeros())
        } else {
            (0.5 * len, n / len)
        }
    }

    // ==================== Validation ====================

    /// Check that every face references existing vertices.
    pub fn validate(&self) -> Result<()> {
        for (fid, face) in self.faces() {
            if let Some(&bad) = face.vertices.iter().find(|&&v| !self.contains_vertex(v)) {
                return Err(MeshError::InvalidVertexIndex {
                    face: fid.index(),
                    vertex: bad.index(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> PolyMesh {
        let mut mesh = PolyMesh::new();
        let v0 = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let v2 = mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        let v3 = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_face(vec![v0, v1, v2, v3], Some(GroupId::new(4)));
        mesh
    }

    #[test]
    fn test_vertex_creation() {
        let v = Vertex::from_coords(1.0, 2.0, 3.0);
        assert_eq!(v.position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = PolyMesh::<u32>::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.bounding_box().is_none());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_quad_area_and_normal() {
        let mesh = unit_square();
        let f = FaceId::new(0);
        assert!((mesh.face_area(f) - 1.0).abs() < 1e-12);
        assert!((mesh.face_normal(f) - Vector3::z()).norm() < 1e-12);
        assert_eq!(mesh.face_group(f), Some(GroupId::new(4)));
        assert_eq!(mesh.face_edges(f).count(), 4);
        assert!(!mesh.has_ngons());
    }

    #[test]
    fn test_repeated_vertex_is_zero_area() {
        let mut mesh = PolyMesh::<u32>::new();
        let v0 = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let f = mesh.add_face(vec![v0, v1, v1], None);
        assert_eq!(mesh.face_area(f), 0.0);
        assert_eq!(mesh.face_edges(f).count(), 2);
    }

    #[test]
    fn test_ngon_detection() {
        let mut mesh = PolyMesh::<u32>::new();
        let ids: Vec<_> = (0..5)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / 5.0;
                mesh.add_vertex(Point3::new(a.cos(), a.sin(), 0.0))
            })
            .collect();
        mesh.add_face(ids, None);
        assert!(mesh.has_ngons());
    }

    #[test]
    fn test_validate_reports_out_of_range_vertex() {
        let mut mesh = unit_square();
        mesh.add_face(vec![VertexId::new(0), VertexId::new(1), VertexId::new(9)], None);
        assert_eq!(
            mesh.validate(),
            Err(MeshError::InvalidVertexIndex { face: 1, vertex: 9 })
        );
    }

    #[test]
    fn test_transformed_positions() {
        let mesh = unit_square();
        let t = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0));
        let moved = mesh.transformed_positions(&t);
        assert_eq!(moved[2], Point3::new(1.0, 1.0, 2.0));
    }
}

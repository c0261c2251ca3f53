//! Mesh construction utilities.
//!
//! This module provides functions for building [`PolyMesh`] snapshots from
//! face-vertex lists as a host hands them over: vertex positions, polygon
//! index loops, and one optional group id per face.

use nalgebra::Point3;

use super::index::{GroupId, MeshIndex, VertexId};
use super::polymesh::PolyMesh;
use crate::error::{MeshError, Result};

/// Build a polygon mesh from vertices, polygon loops and per-face groups.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of polygon loops (3 or more vertex indices each)
/// * `groups` - One group per face, or an empty slice when nothing is grouped
///
/// Faces are stored as given, including repeated or out-of-range indices; use
/// [`PolyMesh::validate`] or [`MeshTopology`](super::MeshTopology) to find them.
///
/// # Example
/// ```
/// use seamline::mesh::{build_from_polygons, GroupId, PolyMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let faces = vec![vec![0, 1, 2, 3]];
/// let groups = vec![Some(GroupId::new(12))];
///
/// let mesh: PolyMesh = build_from_polygons(&vertices, &faces, &groups).unwrap();
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_polygons<I: MeshIndex, F: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    faces: &[F],
    groups: &[Option<GroupId>],
) -> Result<PolyMesh<I>> {
    if !groups.is_empty() && groups.len() != faces.len() {
        return Err(MeshError::invalid_param(
            "groups",
            groups.len(),
            "must be empty or have one entry per face",
        ));
    }

    let mut mesh = PolyMesh::with_capacity(vertices.len(), faces.len());
    for &pos in vertices {
        mesh.add_vertex(pos);
    }

    for (fi, face) in faces.iter().enumerate() {
        let loop_: Vec<VertexId<I>> = face.as_ref().iter().map(|&v| VertexId::new(v)).collect();
        let group = groups.get(fi).copied().flatten();
        mesh.add_face(loop_, group);
    }

    Ok(mesh)
}

/// Build a polygon mesh from triangles, all in one group or ungrouped.
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
    group: Option<GroupId>,
) -> Result<PolyMesh<I>> {
    let groups = vec![group; faces.len()];
    build_from_polygons(vertices, faces, &groups)
}

/// Build a polygon mesh from quads, all in one group or ungrouped.
pub fn build_from_quads<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 4]],
    group: Option<GroupId>,
) -> Result<PolyMesh<I>> {
    let groups = vec![group; faces.len()];
    build_from_polygons(vertices, faces, &groups)
}

/// Convert a mesh back to a face-vertex representation.
///
/// Returns (vertices, faces, groups).
pub fn to_face_vertex<I: MeshIndex>(
    mesh: &PolyMesh<I>,
) -> (Vec<Point3<f64>>, Vec<Vec<usize>>, Vec<Option<GroupId>>) {
    let vertices = mesh.positions().copied().collect();
    let faces = mesh
        .faces()
        .map(|(_, f)| f.vertices().iter().map(|v| v.index()).collect())
        .collect();
    let groups = mesh.faces().map(|(_, f)| f.group()).collect();
    (vertices, faces, groups)
}

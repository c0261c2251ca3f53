//! Read-only adjacency view over a polygon mesh snapshot.
//!
//! [`MeshTopology`] is built once per snapshot and answers every adjacency
//! question the selection and marking algorithms ask:
//!
//! - faces around a vertex,
//! - faces sharing an edge with a face (edge neighbors),
//! - faces sharing only a vertex with a face (vertex neighbors),
//! - faces incident to an edge, and which edges lie on the true mesh boundary,
//! - which faces belong to which CAD group.
//!
//! Faces that cannot take part in adjacency (fewer than three distinct valid
//! vertices, or zero area) are degenerate. By default they are skipped and
//! counted; with [`TopologyOptions::skip_degenerate`] off the build fails on the
//! first one.

use std::collections::{BTreeSet, HashMap};

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use super::index::{EdgeKey, FaceId, GroupId, MeshIndex, VertexId};
use super::polymesh::PolyMesh;
use crate::error::{MeshError, Result};

/// Options for building a [`MeshTopology`].
#[derive(Debug, Clone)]
pub struct TopologyOptions {
    /// Skip degenerate faces instead of failing the build.
    pub skip_degenerate: bool,

    /// Faces with area at or below this value are degenerate.
    pub area_epsilon: f64,
}

impl Default for TopologyOptions {
    fn default() -> Self {
        Self {
            skip_degenerate: true,
            area_epsilon: 1e-12,
        }
    }
}

impl TopologyOptions {
    /// Fail on the first degenerate face instead of skipping it.
    pub fn strict() -> Self {
        Self {
            skip_degenerate: false,
            ..Self::default()
        }
    }

    /// Set whether degenerate faces are skipped.
    pub fn with_skip_degenerate(mut self, skip: bool) -> Self {
        self.skip_degenerate = skip;
        self
    }

    /// Set the area below which a face counts as degenerate.
    pub fn with_area_epsilon(mut self, epsilon: f64) -> Self {
        self.area_epsilon = epsilon;
        self
    }

    /// Check the option values.
    pub fn validate(&self) -> Result<()> {
        if !(self.area_epsilon >= 0.0) {
            return Err(MeshError::invalid_param(
                "area_epsilon",
                self.area_epsilon,
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Aggregate geometry of one CAD group.
#[derive(Debug, Clone)]
pub struct GroupStats {
    /// The group.
    pub id: GroupId,
    /// Sum of face areas.
    pub area: f64,
    /// Largest angle (degrees) between a face normal and the group's
    /// area-weighted mean normal. Zero for planar groups.
    pub curvature_deg: f64,
    /// Largest extent of the group's axis-aligned bounding box.
    pub bbox_size: f64,
    /// Dense indices of groups sharing at least one edge with this group.
    pub edge_adjacent: BTreeSet<usize>,
    /// Dense indices of groups touching this group only at vertices.
    pub vertex_adjacent: BTreeSet<usize>,
}

/// Adjacency view over one mesh snapshot.
#[derive(Debug, Clone)]
pub struct MeshTopology<I: MeshIndex = u32> {
    mesh: PolyMesh<I>,
    usable: Vec<bool>,
    skipped: usize,
    face_edges: Vec<Vec<EdgeKey<I>>>,
    edge_faces: HashMap<EdgeKey<I>, Vec<FaceId<I>>>,
    vertex_faces: Vec<Vec<FaceId<I>>>,
    edge_neighbors: Vec<Vec<FaceId<I>>>,
    vertex_neighbors: Vec<Vec<FaceId<I>>>,
    boundary_edges: Vec<Vec<EdgeKey<I>>>,
    groups: Vec<GroupId>,
    group_lookup: HashMap<GroupId, usize>,
    face_group: Vec<Option<usize>>,
    group_faces: Vec<Vec<FaceId<I>>>,
}

impl<I: MeshIndex> MeshTopology<I> {
    /// Build the adjacency view of `mesh`.
    ///
    /// Fails with [`MeshError::DegenerateFace`] only when
    /// `options.skip_degenerate` is false.
    pub fn build(mesh: &PolyMesh<I>, options: &TopologyOptions) -> Result<Self> {
        options.validate()?;

        let num_faces = mesh.num_faces();
        let num_vertices = mesh.num_vertices();

        let mut usable = vec![true; num_faces];
        let mut skipped = 0;
        let mut face_edges = vec![Vec::new(); num_faces];
        let mut edge_faces: HashMap<EdgeKey<I>, Vec<FaceId<I>>> = HashMap::new();
        let mut vertex_faces = vec![Vec::new(); num_vertices];

        let mut groups = Vec::new();
        let mut group_lookup = HashMap::new();
        let mut face_group = vec![None; num_faces];
        let mut group_faces: Vec<Vec<FaceId<I>>> = Vec::new();

        for (fid, face) in mesh.faces() {
            if let Some(reason) = degenerate_reason(mesh, face.vertices(), face.area(), options) {
                if !options.skip_degenerate {
                    return Err(MeshError::DegenerateFace {
                        face: fid.index(),
                        reason,
                    });
                }
                usable[fid.index()] = false;
                skipped += 1;
                continue;
            }

            let mut corners: Vec<VertexId<I>> = face.vertices().to_vec();
            corners.sort_unstable();
            corners.dedup();
            for v in corners {
                vertex_faces[v.index()].push(fid);
            }

            let mut edges: Vec<EdgeKey<I>> = mesh.face_edges(fid).collect();
            edges.sort_unstable();
            edges.dedup();
            for &e in &edges {
                edge_faces.entry(e).or_default().push(fid);
            }
            face_edges[fid.index()] = edges;

            if let Some(gid) = face.group() {
                let slot = *group_lookup.entry(gid).or_insert_with(|| {
                    groups.push(gid);
                    group_faces.push(Vec::new());
                    groups.len() - 1
                });
                face_group[fid.index()] = Some(slot);
                group_faces[slot].push(fid);
            }
        }

        if skipped > 0 {
            log::warn!("skipped {} degenerate face(s) while building topology", skipped);
        }

        let mut edge_neighbors = vec![Vec::new(); num_faces];
        let mut boundary_edges = vec![Vec::new(); num_faces];
        for f in 0..num_faces {
            if !usable[f] {
                continue;
            }
            let mut neighbors = Vec::new();
            for e in &face_edges[f] {
                let incident = &edge_faces[e];
                if incident.len() == 1 {
                    boundary_edges[f].push(*e);
                }
                neighbors.extend(incident.iter().copied().filter(|g| g.index() != f));
            }
            neighbors.sort_unstable();
            neighbors.dedup();
            edge_neighbors[f] = neighbors;
        }

        let mut vertex_neighbors = vec![Vec::new(); num_faces];
        for f in 0..num_faces {
            if !usable[f] {
                continue;
            }
            let mut around = Vec::new();
            for &v in mesh.face_vertices(FaceId::new(f)) {
                around.extend(vertex_faces[v.index()].iter().copied());
            }
            around.sort_unstable();
            around.dedup();
            around.retain(|g| g.index() != f && edge_neighbors[f].binary_search(g).is_err());
            vertex_neighbors[f] = around;
        }

        log::debug!(
            "topology: {} faces, {} edges, {} groups, {} skipped",
            num_faces,
            edge_faces.len(),
            groups.len(),
            skipped
        );

        Ok(Self {
            mesh: mesh.clone(),
            usable,
            skipped,
            face_edges,
            edge_faces,
            vertex_faces,
            edge_neighbors,
            vertex_neighbors,
            boundary_edges,
            groups,
            group_lookup,
            face_group,
            group_faces,
        })
    }

    // ==================== Accessors ====================

    /// The snapshot this topology was built from.
    #[inline]
    pub fn mesh(&self) -> &PolyMesh<I> {
        &self.mesh
    }

    /// Number of faces in the snapshot, usable or not.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.usable.len()
    }

    /// Number of distinct edges among usable faces.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edge_faces.len()
    }

    /// Number of degenerate faces that were skipped.
    #[inline]
    pub fn skipped_faces(&self) -> usize {
        self.skipped
    }

    /// Whether a face takes part in adjacency.
    #[inline]
    pub fn is_usable(&self, f: FaceId<I>) -> bool {
        self.usable.get(f.index()).copied().unwrap_or(false)
    }

    /// Iterate over usable faces.
    pub fn usable_faces(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.usable
            .iter()
            .enumerate()
            .filter(|(_, &ok)| ok)
            .map(|(i, _)| FaceId::new(i))
    }

    /// All distinct edges of usable faces, in ascending order.
    pub fn edges(&self) -> Vec<EdgeKey<I>> {
        let mut all: Vec<EdgeKey<I>> = self.edge_faces.keys().copied().collect();
        all.sort_unstable();
        all
    }

    // ==================== Adjacency ====================

    /// The distinct edges of a face (empty for skipped faces).
    #[inline]
    pub fn face_edges(&self, f: FaceId<I>) -> &[EdgeKey<I>] {
        &self.face_edges[f.index()]
    }

    /// Faces incident to an edge (empty if the edge does not exist).
    #[inline]
    pub fn edge_faces(&self, e: EdgeKey<I>) -> &[FaceId<I>] {
        self.edge_faces.get(&e).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Faces incident to a vertex.
    #[inline]
    pub fn vertex_faces(&self, v: VertexId<I>) -> &[FaceId<I>] {
        &self.vertex_faces[v.index()]
    }

    /// Faces sharing at least one edge with `f`, ascending.
    #[inline]
    pub fn edge_neighbors(&self, f: FaceId<I>) -> &[FaceId<I>] {
        &self.edge_neighbors[f.index()]
    }

    /// Faces sharing a vertex but no edge with `f`, ascending.
    #[inline]
    pub fn vertex_neighbors(&self, f: FaceId<I>) -> &[FaceId<I>] {
        &self.vertex_neighbors[f.index()]
    }

    /// Edges of `f` that no other face shares.
    #[inline]
    pub fn boundary_edges(&self, f: FaceId<I>) -> &[EdgeKey<I>] {
        &self.boundary_edges[f.index()]
    }

    /// Whether an edge is on the true mesh boundary (exactly one face).
    #[inline]
    pub fn is_mesh_boundary(&self, e: EdgeKey<I>) -> bool {
        self.edge_faces(e).len() == 1
    }

    // ==================== Groups ====================

    /// Number of distinct groups among usable faces.
    #[inline]
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Groups in first-seen order; a group's position is its dense index.
    #[inline]
    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }

    /// Dense index of a group.
    #[inline]
    pub fn group_index(&self, id: GroupId) -> Option<usize> {
        self.group_lookup.get(&id).copied()
    }

    /// Dense group index of a face, if it is grouped and usable.
    #[inline]
    pub fn face_group_index(&self, f: FaceId<I>) -> Option<usize> {
        self.face_group.get(f.index()).copied().flatten()
    }

    /// Group of a face, if it is grouped and usable.
    #[inline]
    pub fn face_group(&self, f: FaceId<I>) -> Option<GroupId> {
        self.face_group_index(f).map(|g| self.groups[g])
    }

    /// Usable faces of the group at a dense index, ascending.
    #[inline]
    pub fn group_faces_at(&self, index: usize) -> &[FaceId<I>] {
        &self.group_faces[index]
    }

    /// Usable faces of a group, ascending (empty for unknown groups).
    pub fn group_faces(&self, id: GroupId) -> &[FaceId<I>] {
        match self.group_index(id) {
            Some(g) => &self.group_faces[g],
            None => &[],
        }
    }

    // ==================== Geometry ====================

    /// Angle in degrees between the normals of two faces.
    pub fn dihedral_deg(&self, a: FaceId<I>, b: FaceId<I>) -> f64 {
        normal_angle_deg(&self.mesh.face_normal(a), &self.mesh.face_normal(b))
    }

    /// Per-group statistics, indexed by dense group index.
    ///
    /// Set `parallel` to compute groups on the rayon pool.
    pub fn group_stats(&self, parallel: bool) -> Vec<GroupStats> {
        let compute = |g: usize| self.compute_group_stats(g);
        if parallel {
            (0..self.groups.len()).into_par_iter().map(compute).collect()
        } else {
            (0..self.groups.len()).map(compute).collect()
        }
    }

    fn compute_group_stats(&self, g: usize) -> GroupStats {
        let faces = &self.group_faces[g];

        let mut area = 0.0;
        let mut normal_sum: Vector3<f64> = Vector3::zeros();
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &f in faces {
            let a = self.mesh.face_area(f);
            area += a;
            normal_sum += self.mesh.face_normal(f) * a;
            for &v in self.mesh.face_vertices(f) {
                let p = self.mesh.position(v);
                for i in 0..3 {
                    min[i] = min[i].min(p[i]);
                    max[i] = max[i].max(p[i]);
                }
            }
        }

        let mean = normal_sum.try_normalize(1e-12).unwrap_or_else(Vector3::z);
        let curvature_deg = faces
            .iter()
            .map(|&f| normal_angle_deg(&mean, &self.mesh.face_normal(f)))
            .fold(0.0, f64::max);
        let bbox_size = if faces.is_empty() {
            0.0
        } else {
            (max - min).max()
        };

        let mut edge_adjacent = BTreeSet::new();
        let mut vertex_adjacent = BTreeSet::new();
        for &f in faces {
            for &n in &self.edge_neighbors[f.index()] {
                if let Some(h) = self.face_group[n.index()] {
                    if h != g {
                        edge_adjacent.insert(h);
                    }
                }
            }
            for &n in &self.vertex_neighbors[f.index()] {
                if let Some(h) = self.face_group[n.index()] {
                    if h != g {
                        vertex_adjacent.insert(h);
                    }
                }
            }
        }
        let vertex_adjacent = vertex_adjacent.difference(&edge_adjacent).copied().collect();

        GroupStats {
            id: self.groups[g],
            area,
            curvature_deg,
            bbox_size,
            edge_adjacent,
            vertex_adjacent,
        }
    }
}

/// Angle in degrees between two unit vectors.
pub(crate) fn normal_angle_deg(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
}

fn degenerate_reason<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    loop_: &[VertexId<I>],
    area: f64,
    options: &TopologyOptions,
) -> Option<&'static str> {
    if loop_.iter().any(|&v| !mesh.contains_vertex(v)) {
        return Some("references a missing vertex");
    }
    let mut distinct = loop_.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < 3 {
        return Some("fewer than 3 distinct vertices");
    }
    if area <= options.area_epsilon {
        return Some("zero area");
    }
    None
}

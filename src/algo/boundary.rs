//! Boundary extraction for face subsets.
//!
//! An edge lies on the boundary of a subset when exactly one of its incident
//! faces (counted over the whole mesh) is in the subset. The result is a sorted
//! set, so it never depends on the order faces were selected in.
//!
//! # Example
//!
//! ```
//! use seamline::algo::boundary::extract_boundary;
//! use seamline::mesh::{build_from_quads, FaceId, MeshTopology, PolyMesh, Selection, TopologyOptions};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(2.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(2.0, 1.0, 0.0),
//! ];
//! let mesh: PolyMesh = build_from_quads(&vertices, &[[0, 1, 4, 3], [1, 2, 5, 4]], None).unwrap();
//! let topology = MeshTopology::build(&mesh, &TopologyOptions::default()).unwrap();
//!
//! let selection = Selection::from_faces(2, [FaceId::new(0)]).unwrap();
//! assert_eq!(extract_boundary(&topology, &selection).len(), 4);
//! ```

use std::collections::BTreeSet;

use crate::mesh::{EdgeKey, FaceId, GroupId, MeshIndex, MeshTopology, Selection};

/// Edges with exactly one incident face in `faces`.
pub fn extract_boundary<I: MeshIndex>(
    topology: &MeshTopology<I>,
    faces: &Selection<I>,
) -> BTreeSet<EdgeKey<I>> {
    let mut boundary = BTreeSet::new();
    for f in faces.iter() {
        if !topology.is_usable(f) {
            continue;
        }
        for &e in topology.face_edges(f) {
            let inside = topology
                .edge_faces(e)
                .iter()
                .filter(|&&g| faces.contains(g))
                .count();
            if inside == 1 {
                boundary.insert(e);
            }
        }
    }
    boundary
}

/// Edges on the true mesh boundary.
pub fn true_boundary<I: MeshIndex>(topology: &MeshTopology<I>) -> BTreeSet<EdgeKey<I>> {
    topology
        .edges()
        .into_iter()
        .filter(|&e| topology.is_mesh_boundary(e))
        .collect()
}

/// Edges of `faces` that separate group regions.
///
/// An edge qualifies when it is not shared by exactly two faces, when its two
/// faces belong to different groups, or when exactly one of them is ungrouped.
pub fn group_partition_edges<I: MeshIndex>(
    topology: &MeshTopology<I>,
    faces: &Selection<I>,
) -> BTreeSet<EdgeKey<I>> {
    partition_edges(topology, faces, None)
}

/// Like [`group_partition_edges`], but groups are first mapped through
/// `targets` (indexed by dense group index), so groups sharing a target form
/// one region.
pub fn merged_partition_edges<I: MeshIndex>(
    topology: &MeshTopology<I>,
    faces: &Selection<I>,
    targets: &[usize],
) -> BTreeSet<EdgeKey<I>> {
    partition_edges(topology, faces, Some(targets))
}

fn partition_edges<I: MeshIndex>(
    topology: &MeshTopology<I>,
    faces: &Selection<I>,
    targets: Option<&[usize]>,
) -> BTreeSet<EdgeKey<I>> {
    let mut edges = BTreeSet::new();
    for f in faces.iter() {
        if !topology.is_usable(f) {
            continue;
        }
        for &e in topology.face_edges(f) {
            if separates_groups(topology, e, targets) {
                edges.insert(e);
            }
        }
    }
    edges
}

fn separates_groups<I: MeshIndex>(
    topology: &MeshTopology<I>,
    e: EdgeKey<I>,
    targets: Option<&[usize]>,
) -> bool {
    let region = |f: FaceId<I>| {
        topology
            .face_group_index(f)
            .map(|g| targets.and_then(|t| t.get(g).copied()).unwrap_or(g))
    };
    match topology.edge_faces(e) {
        [a, b] => region(*a) != region(*b),
        _ => true,
    }
}

/// Groups that have at least one face in `selection`, ascending.
pub fn touched_groups<I: MeshIndex>(
    topology: &MeshTopology<I>,
    selection: &Selection<I>,
) -> BTreeSet<GroupId> {
    selection
        .iter()
        .filter_map(|f| topology.face_group(f))
        .collect()
}

/// Every usable face of the given groups.
pub fn group_selection<I: MeshIndex>(
    topology: &MeshTopology<I>,
    groups: &BTreeSet<GroupId>,
) -> Selection<I> {
    let faces = groups
        .iter()
        .flat_map(|&g| topology.group_faces(g).iter().copied());
    Selection::from_faces_lossy(topology.num_faces(), faces).0
}

/// Boundary of the union of every group touched by `selection`.
///
/// Returns the boundary edges and the touched groups. Ungrouped selected faces
/// contribute nothing.
pub fn selected_group_boundary<I: MeshIndex>(
    topology: &MeshTopology<I>,
    selection: &Selection<I>,
) -> (BTreeSet<EdgeKey<I>>, BTreeSet<GroupId>) {
    let groups = touched_groups(topology, selection);
    let faces = group_selection(topology, &groups);
    (extract_boundary(topology, &faces), groups)
}

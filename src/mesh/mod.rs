//! Core mesh data structures.
//!
//! This module provides the polygon mesh snapshot the rest of the crate works
//! on, the adjacency view derived from it, and helpers for getting group data
//! into a snapshot.
//!
//! # Overview
//!
//! The primary type is [`PolyMesh`], an immutable face-vertex mesh whose faces
//! carry an optional CAD [`GroupId`]. Adjacency questions go through
//! [`MeshTopology`], which is built once per snapshot.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`FaceId`] - Identifies a face
//! - [`EdgeKey`] - Identifies an undirected edge by its end vertices
//! - [`GroupId`] - Identifies the CAD surface a face came from
//!
//! Face subsets are carried as a [`Selection`], which never holds an index
//! outside its mesh.
//!
//! Vertex and face indices are generic over the underlying integer type
//! ([`MeshIndex`] trait), allowing you to choose `u16`, `u32`, or `u64` based
//! on mesh size.
//!
//! # Construction
//!
//! ```
//! use seamline::mesh::{build_from_quads, GroupId, MeshTopology, PolyMesh, TopologyOptions};
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
//! let faces = vec![[0, 1, 4, 3], [1, 2, 5, 4]];
//!
//! let mesh: PolyMesh = build_from_quads(&vertices, &faces, Some(GroupId::new(3))).unwrap();
//! let topology = MeshTopology::build(&mesh, &TopologyOptions::default()).unwrap();
//! assert_eq!(topology.num_edges(), 7);
//! ```

mod builder;
mod groups;
mod index;
mod polymesh;
mod selection;
mod topology;

#[cfg(test)]
pub(crate) mod fixtures;

pub use builder::{build_from_polygons, build_from_quads, build_from_triangles, to_face_vertex};
pub use groups::{decode_group_ranges, detect_index_mode, RangeIndexMode};
pub use index::{EdgeKey, FaceId, GroupId, MeshIndex, VertexId};
pub use polymesh::{Face, PolyMesh, Vertex};
pub use selection::Selection;
pub use topology::{GroupStats, MeshTopology, TopologyOptions};

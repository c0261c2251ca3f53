//! # Seamline
//!
//! Group-aware selection and edge tools for polygon meshes exported from CAD.
//!
//! CAD exporters tag every face with the surface it came from. Seamline uses
//! those groups to grow selections to whole surfaces, to walk across the small
//! fillet surfaces between them, to mark hard and seam edges along group
//! borders, and to decide which separate meshes can be joined without
//! touching each other.
//!
//! ## Features
//!
//! - **Snapshots and topology**: [`mesh::PolyMesh`] with per-face groups and a
//!   read-only [`mesh::MeshTopology`] adjacency view
//! - **Boundaries**: outlines of arbitrary face subsets
//! - **Fillet-aware expansion**: grow a selection across fillets and chamfers
//! - **Live selection**: incremental expansion from paint events, with seam
//!   and unwrap side effects
//! - **Edge marking**: idempotent sharp/seam flags, cylinder seams
//! - **Merge planning**: R-tree overlap tests and greedy join passes
//!
//! ## Quick Start
//!
//! ```
//! use seamline::prelude::*;
//! use nalgebra::Point3;
//!
//! // Two unit quads from different CAD surfaces, folded 90 degrees.
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 0.0, 1.0),
//!     Point3::new(0.0, 0.0, 1.0),
//! ];
//! let faces = vec![vec![0, 1, 2, 3], vec![1, 0, 5, 4]];
//! let groups = vec![Some(GroupId::new(1)), Some(GroupId::new(2))];
//! let mesh: PolyMesh = build_from_polygons(&vertices, &faces, &groups).unwrap();
//! let topology = MeshTopology::build(&mesh, &TopologyOptions::default()).unwrap();
//!
//! // Flag the crease between the two surfaces as sharp.
//! let mut flags = EdgeFlags::new();
//! let options = MarkOptions::default().with_sharp(true).with_seam(false).with_smart(true);
//! let report = auto_mark_edges(&topology, &mut flags, &Selection::new(2), &options).unwrap();
//! assert_eq!(report.sharp_changed, 1);
//! assert!(flags.is_sharp(EdgeKey::from_indices(0, 1)));
//! ```
//!
//! ## Hosts
//!
//! Operations that span several calls work on object names and resolve them
//! through the [`scene::MeshHost`] trait every time. [`scene::Scene`] is an
//! in-memory host:
//!
//! ```
//! use seamline::prelude::*;
//! use nalgebra::Point3;
//!
//! let quad = |x: f64| -> PolyMesh {
//!     let vertices = vec![
//!         Point3::new(x, 0.0, 0.0),
//!         Point3::new(x + 1.0, 0.0, 0.0),
//!         Point3::new(x + 1.0, 1.0, 0.0),
//!         Point3::new(x, 1.0, 0.0),
//!     ];
//!     build_from_quads(&vertices, &[[0, 1, 2, 3]], None).unwrap()
//! };
//! let mut scene = Scene::new();
//! scene.insert("A", SceneObject::new(quad(0.0)));
//! scene.insert("B", SceneObject::new(quad(5.0)));
//!
//! let resolver = MergeResolver::new(OverlapOptions::default()).unwrap();
//! let summary = resolver.resolve_all(&mut scene).unwrap();
//! assert_eq!(summary.joined.len(), 1);
//! assert_eq!(scene.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;
pub mod scene;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use seamline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::boundary::{extract_boundary, group_partition_edges, true_boundary};
    pub use crate::algo::fillet::{classify, expand, ExpandOptions, FaceClass};
    pub use crate::algo::live::{LiveOptions, LiveSelectionSession, PaintOutcome};
    pub use crate::algo::mark::{
        auto_mark_edges, mark_edges, merge_seams, EdgeFlags, MarkMode, MarkOptions, MarkScope,
    };
    pub use crate::algo::overlap::{
        may_overlap, MergePlan, MergeResolver, MergeScope, MeshSpatialIndex, OverlapOptions,
    };
    pub use crate::algo::seam::{
        cylinder_seam, merge_uv_seams, CylinderSeamMode, CylinderSeamOptions, UvSeamOptions,
    };
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_quads, build_from_triangles, EdgeKey, FaceId, GroupId,
        MeshIndex, MeshTopology, PolyMesh, Selection, TopologyOptions, VertexId,
    };
    pub use crate::scene::{MeshHost, MeshJoiner, Scene, SceneObject, UvUnwrapper};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::mesh::fixtures;
    use nalgebra::{Matrix4, Point3, Vector3};
    use std::collections::BTreeSet;

    #[test]
    fn test_fold_smart_sharp_marks_shared_edges_only() {
        let mesh = fixtures::two_group_fold();
        let topology = MeshTopology::build(&mesh, &TopologyOptions::default()).unwrap();
        let mut flags = EdgeFlags::new();
        let options = MarkOptions::default()
            .with_sharp(true)
            .with_seam(false)
            .with_smart(true);
        let report =
            auto_mark_edges(&topology, &mut flags, &Selection::new(8), &options).unwrap();

        assert_eq!(report.sharp_changed, 3);
        assert!(flags
            .sharp()
            .iter()
            .all(|&e| topology.edge_faces(e).len() == 2));
        assert!(flags.seams().is_empty());
    }

    #[test]
    fn test_curvature_gate_controls_fillet_strip() {
        let mesh = fixtures::fillet_step(90.0);
        let topology = MeshTopology::build(&mesh, &TopologyOptions::default()).unwrap();
        let seed = Selection::from_faces(36, [FaceId::new(0)]).unwrap();

        let fillets = ExpandOptions::default().with_adjacent_fillets(true);
        let open = fillets.clone().with_min_curvature_angle(0.0);
        let expanded = expand(&topology, &seed, &open).unwrap();
        assert!((16..20).all(|i| expanded.contains(FaceId::new(i))));

        let gated = fillets.with_min_curvature_angle(45.0);
        let expanded = expand(&topology, &seed, &gated).unwrap();
        assert!((16..20).all(|i| !expanded.contains(FaceId::new(i))));
    }

    #[test]
    fn test_cube_spacing_decides_overlap() {
        let cube = fixtures::unit_cube(Point3::origin());
        let at = |x: f64| Matrix4::new_translation(&Vector3::new(x, 0.0, 0.0));
        let options = OverlapOptions::default().with_threshold(0.1);

        let a = MeshSpatialIndex::build("A", &cube, &at(0.0));
        let far = MeshSpatialIndex::build("B", &cube, &at(3.0));
        assert!(!may_overlap(&a, &far, &options).overlapping);

        let near = MeshSpatialIndex::build("C", &cube, &at(1.05));
        assert!(may_overlap(&a, &near, &options).overlapping);

        // Nearly coincident cubes.
        let inside = MeshSpatialIndex::build("D", &cube, &at(0.05));
        assert!(may_overlap(&a, &inside, &options).overlapping);
    }

    #[test]
    fn test_live_events_accumulate_like_one_expansion() {
        let mut scene = Scene::new();
        scene.insert("Fold", SceneObject::new(fixtures::two_group_fold()));
        let options = LiveOptions::default();
        let mut session = LiveSelectionSession::new(options.clone()).unwrap();
        let mut unwrapper = |_: &str, _: &Selection, _: &BTreeSet<EdgeKey>| -> Result<()> { Ok(()) };

        session.start(["Fold"]);
        session
            .on_paint_event(&mut scene, &mut unwrapper, "Fold", &[FaceId::new(1)])
            .unwrap();
        session
            .on_paint_event(&mut scene, &mut unwrapper, "Fold", &[FaceId::new(6)])
            .unwrap();

        let mesh = scene.mesh("Fold").unwrap();
        let topology = MeshTopology::build(mesh, &options.topology).unwrap();
        let seeds = Selection::from_faces(8, [FaceId::new(1), FaceId::new(6)]).unwrap();
        let direct = expand(&topology, &seeds, &options.expand).unwrap();
        assert_eq!(scene.selection("Fold").unwrap(), &direct);
        assert_eq!(direct.len(), 8);
    }
}

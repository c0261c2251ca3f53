//! Host collaborators and an in-memory reference scene.
//!
//! The algorithms never hold on to host objects. Anything that spans several
//! calls (the live session, merge passes) keeps object *names* and resolves
//! them again through [`MeshHost`] at every use, so objects that were deleted
//! or renamed in the meantime surface as [`MeshError::StaleReference`].
//!
//! [`Scene`] implements every host trait over a name-keyed table and is what
//! the tests and benchmarks drive.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Matrix4;

use crate::algo::mark::{mark_edges, EdgeFlags, MarkMode};
use crate::error::{MeshError, Result};
use crate::mesh::{EdgeKey, FaceId, GroupId, MeshIndex, PolyMesh, Selection, VertexId};

/// Name-keyed access to the host's mesh objects.
pub trait MeshHost<I: MeshIndex = u32> {
    /// Names of every object, in a stable order.
    fn object_names(&self) -> Vec<String>;

    /// The current mesh snapshot of an object.
    fn mesh(&self, name: &str) -> Option<&PolyMesh<I>>;

    /// Local-to-world transform of an object.
    fn world_transform(&self, name: &str) -> Option<Matrix4<f64>>;

    /// Whether the object is selected in the host.
    fn is_selected(&self, name: &str) -> bool;

    /// Whether the object is visible in the host.
    fn is_visible(&self, name: &str) -> bool;

    /// The object's face selection.
    fn selection(&self, name: &str) -> Option<&Selection<I>>;

    /// Replace the object's face selection.
    fn set_selection(&mut self, name: &str, selection: Selection<I>) -> Result<()>;

    /// The object's sharp/seam flags.
    fn edge_flags(&self, name: &str) -> Option<&EdgeFlags<I>>;

    /// Mutable access to the object's sharp/seam flags.
    fn edge_flags_mut(&mut self, name: &str) -> Option<&mut EdgeFlags<I>>;
}

/// Joins one object into another.
pub trait MeshJoiner {
    /// Merge `source` into `target`; `source` ceases to exist.
    fn join(&mut self, target: &str, source: &str) -> Result<()>;
}

/// External UV unwrap capability.
pub trait UvUnwrapper<I: MeshIndex = u32> {
    /// Unwrap the selected faces of `name`, cutting along `seams`.
    fn unwrap(&mut self, name: &str, selection: &Selection<I>, seams: &BTreeSet<EdgeKey<I>>)
        -> Result<()>;
}

impl<I, F> UvUnwrapper<I> for F
where
    I: MeshIndex,
    F: FnMut(&str, &Selection<I>, &BTreeSet<EdgeKey<I>>) -> Result<()>,
{
    fn unwrap(
        &mut self,
        name: &str,
        selection: &Selection<I>,
        seams: &BTreeSet<EdgeKey<I>>,
    ) -> Result<()> {
        self(name, selection, seams)
    }
}

/// One object of a [`Scene`].
#[derive(Debug, Clone)]
pub struct SceneObject<I: MeshIndex = u32> {
    mesh: PolyMesh<I>,
    world: Matrix4<f64>,
    selected: bool,
    visible: bool,
    edge_flags: EdgeFlags<I>,
    selection: Selection<I>,
}

impl<I: MeshIndex> SceneObject<I> {
    /// A visible, unselected object at the origin.
    pub fn new(mesh: PolyMesh<I>) -> Self {
        let selection = Selection::new(mesh.num_faces());
        Self {
            mesh,
            world: Matrix4::identity(),
            selected: false,
            visible: true,
            edge_flags: EdgeFlags::new(),
            selection,
        }
    }

    /// Set the local-to-world transform.
    pub fn with_world(mut self, world: Matrix4<f64>) -> Self {
        self.world = world;
        self
    }

    /// Set the host selection state.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Set the visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// The mesh snapshot.
    pub fn mesh(&self) -> &PolyMesh<I> {
        &self.mesh
    }

    /// Replace the mesh, bumping its revision past the current one.
    ///
    /// The face selection is cleared since its ids refer to the old faces.
    pub fn replace_mesh(&mut self, mesh: PolyMesh<I>) {
        let revision = self.mesh.revision().max(mesh.revision()) + 1;
        self.selection = Selection::new(mesh.num_faces());
        self.mesh = mesh.with_revision(revision);
    }

    /// The local-to-world transform.
    pub fn world(&self) -> &Matrix4<f64> {
        &self.world
    }

    /// Whether the object is selected.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Whether the object is visible.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The sharp/seam flags.
    pub fn edge_flags(&self) -> &EdgeFlags<I> {
        &self.edge_flags
    }

    /// The face selection.
    pub fn selection(&self) -> &Selection<I> {
        &self.selection
    }
}

/// In-memory [`MeshHost`] keyed by object name.
#[derive(Debug, Clone, Default)]
pub struct Scene<I: MeshIndex = u32> {
    objects: BTreeMap<String, SceneObject<I>>,
}

impl<I: MeshIndex> Scene<I> {
    /// An empty scene.
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }

    /// Add or replace an object. Returns the object previously under `name`.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        object: SceneObject<I>,
    ) -> Option<SceneObject<I>> {
        self.objects.insert(name.into(), object)
    }

    /// Remove an object.
    pub fn remove(&mut self, name: &str) -> Option<SceneObject<I>> {
        self.objects.remove(name)
    }

    /// Look up an object.
    pub fn get(&self, name: &str) -> Option<&SceneObject<I>> {
        self.objects.get(name)
    }

    /// Look up an object mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SceneObject<I>> {
        self.objects.get_mut(name)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the scene has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<I: MeshIndex> MeshHost<I> for Scene<I> {
    fn object_names(&self) -> Vec<String> {
        self.objects.keys().cloned().collect()
    }

    fn mesh(&self, name: &str) -> Option<&PolyMesh<I>> {
        self.objects.get(name).map(|o| &o.mesh)
    }

    fn world_transform(&self, name: &str) -> Option<Matrix4<f64>> {
        self.objects.get(name).map(|o| o.world)
    }

    fn is_selected(&self, name: &str) -> bool {
        self.objects.get(name).map_or(false, |o| o.selected)
    }

    fn is_visible(&self, name: &str) -> bool {
        self.objects.get(name).map_or(false, |o| o.visible)
    }

    fn selection(&self, name: &str) -> Option<&Selection<I>> {
        self.objects.get(name).map(|o| &o.selection)
    }

    fn set_selection(&mut self, name: &str, selection: Selection<I>) -> Result<()> {
        let object = self
            .objects
            .get_mut(name)
            .ok_or_else(|| MeshError::stale(name))?;
        if selection.num_faces() != object.mesh.num_faces() {
            return Err(MeshError::invalid_param(
                "selection",
                selection.num_faces(),
                "face count differs from the object's mesh",
            ));
        }
        object.selection = selection;
        Ok(())
    }

    fn edge_flags(&self, name: &str) -> Option<&EdgeFlags<I>> {
        self.objects.get(name).map(|o| &o.edge_flags)
    }

    fn edge_flags_mut(&mut self, name: &str) -> Option<&mut EdgeFlags<I>> {
        self.objects.get_mut(name).map(|o| &mut o.edge_flags)
    }
}

impl<I: MeshIndex> MeshJoiner for Scene<I> {
    /// Append `source`'s geometry to `target` in `target`'s local space.
    ///
    /// Source group ids are shifted past the target's largest id so groups of
    /// the two objects stay distinct. Edge flags and face selections carry
    /// over with remapped indices.
    fn join(&mut self, target: &str, source: &str) -> Result<()> {
        if target == source {
            return Err(MeshError::invalid_param(
                "source",
                source,
                "cannot join an object into itself",
            ));
        }
        let target_world = self
            .objects
            .get(target)
            .map(|o| o.world)
            .ok_or_else(|| MeshError::stale(target))?;
        if !self.objects.contains_key(source) {
            return Err(MeshError::stale(source));
        }
        let inverse = target_world
            .try_inverse()
            .ok_or_else(|| MeshError::external("join", format!("transform of '{target}' is singular")))?;

        let src = self.objects.remove(source).ok_or_else(|| MeshError::stale(source))?;
        let dst = self.objects.get_mut(target).ok_or_else(|| MeshError::stale(target))?;
        let to_target = inverse * src.world;

        let vertex_offset = dst.mesh.num_vertices();
        let face_offset = dst.mesh.num_faces();
        let group_offset = dst.mesh.group_ids().last().map_or(0, |g| g.value());

        let mut mesh = dst.mesh.clone();
        for p in src.mesh.transformed_positions(&to_target) {
            mesh.add_vertex(p);
        }
        for (_, face) in src.mesh.faces() {
            let verts = face
                .vertices()
                .iter()
                .map(|v| VertexId::new(v.index() + vertex_offset))
                .collect();
            let group = face.group().map(|g| GroupId::new(g.value() + group_offset));
            mesh.add_face(verts, group);
        }

        let shift = |e: EdgeKey<I>| {
            let (a, b) = e.vertices();
            EdgeKey::from_indices(a.index() + vertex_offset, b.index() + vertex_offset)
        };
        let mut flags = dst.edge_flags.clone();
        mark_edges(&mut flags, src.edge_flags.sharp().iter().map(|&e| shift(e)), MarkMode::Sharp);
        mark_edges(&mut flags, src.edge_flags.seams().iter().map(|&e| shift(e)), MarkMode::Seam);

        let faces = dst.selection.iter().chain(
            src.selection
                .iter()
                .map(|f| FaceId::new(f.index() + face_offset)),
        );
        let (selection, _) = Selection::from_faces_lossy(mesh.num_faces(), faces);

        dst.replace_mesh(mesh);
        dst.edge_flags = flags;
        dst.selection = selection;
        dst.selected |= src.selected;
        log::debug!("joined '{}' into '{}'", source, target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::fixtures;
    use nalgebra::{Point3, Vector3};

    fn cube_object(offset: f64) -> SceneObject {
        SceneObject::new(fixtures::unit_cube(Point3::origin()))
            .with_world(Matrix4::new_translation(&Vector3::new(offset, 0.0, 0.0)))
    }

    #[test]
    fn test_host_lookups() {
        let mut scene = Scene::new();
        scene.insert("A", cube_object(0.0).with_selected(true));
        scene.insert("B", cube_object(3.0).with_visible(false));

        assert_eq!(scene.object_names(), vec!["A".to_string(), "B".to_string()]);
        assert!(scene.is_selected("A"));
        assert!(!scene.is_visible("B"));
        assert!(!scene.is_selected("missing"));
        assert!(scene.mesh("missing").is_none());
        assert_eq!(scene.world_transform("B").unwrap()[(0, 3)], 3.0);
    }

    #[test]
    fn test_set_selection_checks_size() {
        let mut scene = Scene::new();
        scene.insert("A", cube_object(0.0));
        assert!(scene.set_selection("A", Selection::all(6)).is_ok());
        assert_eq!(scene.selection("A").unwrap().len(), 6);
        assert!(scene.set_selection("A", Selection::all(5)).is_err());
        assert_eq!(
            scene.set_selection("gone", Selection::all(6)),
            Err(MeshError::stale("gone"))
        );
    }

    #[test]
    fn test_join_appends_geometry() {
        let mut scene = Scene::new();
        scene.insert("A", cube_object(0.0));
        let mut b = cube_object(3.0);
        mark_edges(&mut b.edge_flags, [EdgeKey::from_indices(0, 1)], MarkMode::Seam);
        b.selection = Selection::from_faces(6, [FaceId::new(2)]).unwrap();
        scene.insert("B", b);

        scene.join("A", "B").unwrap();
        assert_eq!(scene.len(), 1);

        let a = scene.get("A").unwrap();
        assert_eq!(a.mesh().num_vertices(), 16);
        assert_eq!(a.mesh().num_faces(), 12);
        assert_eq!(a.mesh().group_ids().len(), 12);
        assert!(a.mesh().revision() > 0);
        assert!(a.edge_flags().is_seam(EdgeKey::from_indices(8, 9)));
        assert_eq!(a.selection().to_vec(), vec![FaceId::new(8)]);

        let (min, max) = a.mesh().bounding_box().unwrap();
        assert_eq!(min.x, -0.5);
        assert_eq!(max.x, 3.5);
    }

    #[test]
    fn test_join_missing_names() {
        let mut scene = Scene::new();
        scene.insert("A", cube_object(0.0));
        assert_eq!(scene.join("A", "B"), Err(MeshError::stale("B")));
        assert_eq!(scene.join("C", "A"), Err(MeshError::stale("C")));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_closure_unwrapper() {
        let mut calls = 0;
        let mut unwrapper = |_: &str, sel: &Selection, _: &BTreeSet<EdgeKey>| -> Result<()> {
            calls += sel.len();
            Ok(())
        };
        UvUnwrapper::unwrap(&mut unwrapper, "A", &Selection::all(3), &BTreeSet::new()).unwrap();
        assert_eq!(calls, 3);
    }
}

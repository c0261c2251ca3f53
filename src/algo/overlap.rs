//! Spatial overlap tests and merge planning.
//!
//! Meshes may be joined only when they do not come within a distance threshold
//! of each other. [`MeshSpatialIndex`] holds a mesh's world-space vertices in an
//! R-tree together with their bounding box. [`may_overlap`] first compares the
//! boxes and only falls back to nearest-neighbor queries when the boxes are
//! within the threshold.
//!
//! [`MergeResolver`] pairs up non-overlapping meshes greedily and
//! [`MergeResolver::resolve_all`] drives repeated plan and join passes through
//! the host until nothing more can be joined.

use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::{Matrix4, Point3};
use rayon::prelude::*;
use rstar::RTree;

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh};
use crate::scene::{MeshHost, MeshJoiner};

/// Axis-aligned world-space bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl BoundingVolume {
    /// Bounds of a point set, `None` when it is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((*first, *first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        });
        Some(Self { min, max })
    }

    /// Gap between two boxes; zero when they touch or intersect.
    pub fn distance(&self, other: &BoundingVolume) -> f64 {
        let gap = |lo_a: f64, hi_a: f64, lo_b: f64, hi_b: f64| {
            (lo_b - hi_a).max(lo_a - hi_b).max(0.0)
        };
        let dx = gap(self.min.x, self.max.x, other.min.x, other.max.x);
        let dy = gap(self.min.y, self.max.y, other.min.y, other.max.y);
        let dz = gap(self.min.z, self.max.z, other.min.z, other.max.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Whether the boxes, each grown by `margin`, intersect.
    pub fn within(&self, other: &BoundingVolume, margin: f64) -> bool {
        self.distance(other) <= margin
    }
}

/// World-space vertex index of one named mesh.
pub struct MeshSpatialIndex {
    name: String,
    bounds: Option<BoundingVolume>,
    points: Vec<Point3<f64>>,
    tree: RTree<[f64; 3]>,
    queries: AtomicUsize,
}

impl MeshSpatialIndex {
    /// Index `mesh`'s vertices after applying `world`.
    pub fn build<I: MeshIndex>(
        name: impl Into<String>,
        mesh: &PolyMesh<I>,
        world: &Matrix4<f64>,
    ) -> Self {
        let points = mesh.transformed_positions(world);
        let bounds = BoundingVolume::from_points(&points);
        let tree = RTree::bulk_load(points.iter().map(|p| [p.x, p.y, p.z]).collect());
        Self {
            name: name.into(),
            bounds,
            points,
            tree,
            queries: AtomicUsize::new(0),
        }
    }

    /// The owning object's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World-space bounds, `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<&BoundingVolume> {
        self.bounds.as_ref()
    }

    /// Number of indexed vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the mesh has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Nearest-neighbor queries answered by this index so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Distance from `p` to the closest indexed vertex.
    pub fn nearest_distance(&self, p: &Point3<f64>) -> Option<f64> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.tree.nearest_neighbor(&[p.x, p.y, p.z]).map(|q| {
            let d = Point3::new(q[0], q[1], q[2]) - p;
            d.norm()
        })
    }
}

impl std::fmt::Debug for MeshSpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshSpatialIndex")
            .field("name", &self.name)
            .field("vertices", &self.points.len())
            .field("bounds", &self.bounds)
            .finish()
    }
}

/// Options for overlap tests.
#[derive(Debug, Clone)]
pub struct OverlapOptions {
    /// Meshes closer than or exactly this distance overlap.
    pub threshold: f64,

    /// Run index builds and nearest-neighbor sweeps on the rayon pool.
    pub parallel: bool,
}

impl Default for OverlapOptions {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            parallel: true,
        }
    }
}

impl OverlapOptions {
    /// Set the distance threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Enable or disable parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check the option values.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(MeshError::invalid_param(
                "threshold",
                self.threshold,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Result of one pairwise overlap test.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapReport {
    /// The meshes come within the threshold.
    pub overlapping: bool,
    /// Decided from the bounding boxes alone.
    pub fast_rejected: bool,
    /// Smallest vertex-to-vertex distance found, when queries ran.
    pub min_distance: Option<f64>,
}

/// Test whether two indexed meshes come within `options.threshold`.
///
/// The mesh with fewer vertices (the smaller name on ties) queries the other's
/// tree, so the answer does not depend on argument order.
pub fn may_overlap(
    a: &MeshSpatialIndex,
    b: &MeshSpatialIndex,
    options: &OverlapOptions,
) -> OverlapReport {
    let (Some(box_a), Some(box_b)) = (a.bounds(), b.bounds()) else {
        return OverlapReport {
            overlapping: false,
            fast_rejected: true,
            min_distance: None,
        };
    };
    if !box_a.within(box_b, options.threshold) {
        return OverlapReport {
            overlapping: false,
            fast_rejected: true,
            min_distance: None,
        };
    }

    let (query, target) = if (a.len(), a.name()) <= (b.len(), b.name()) {
        (a, b)
    } else {
        (b, a)
    };
    let distance = |p: &Point3<f64>| target.nearest_distance(p).unwrap_or(f64::INFINITY);
    let min_distance = if options.parallel {
        query
            .points
            .par_iter()
            .map(distance)
            .reduce(|| f64::INFINITY, f64::min)
    } else {
        query.points.iter().map(distance).fold(f64::INFINITY, f64::min)
    };

    OverlapReport {
        overlapping: min_distance <= options.threshold,
        fast_rejected: false,
        min_distance: Some(min_distance),
    }
}

/// Which host objects take part in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeScope {
    /// Selected objects.
    SelectedOnly,
    /// Visible objects.
    VisibleOnly,
    /// Objects both selected and visible.
    SelectedAndVisible,
    /// The selected objects if any, otherwise every visible object.
    #[default]
    SelectionOrVisible,
}

impl MergeScope {
    /// Names of the objects in scope, in host order.
    pub fn resolve<I: MeshIndex, H: MeshHost<I>>(&self, host: &H) -> Vec<String> {
        let names = host.object_names();
        let selected: Vec<String> = names
            .iter()
            .filter(|n| host.is_selected(n))
            .cloned()
            .collect();
        let visible = |names: Vec<String>| -> Vec<String> {
            names.into_iter().filter(|n| host.is_visible(n)).collect()
        };
        match self {
            MergeScope::SelectedOnly => selected,
            MergeScope::VisibleOnly => visible(names),
            MergeScope::SelectedAndVisible => visible(selected),
            MergeScope::SelectionOrVisible if selected.is_empty() => visible(names),
            MergeScope::SelectionOrVisible => selected,
        }
    }
}

/// Overlap test outcome for one candidate pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    /// First mesh of the pair.
    pub first: String,
    /// Second mesh of the pair.
    pub second: String,
    /// The overlap test result.
    pub overlap: OverlapReport,
}

/// One planning pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    /// Approved `(target, source)` pairs; each name appears at most once.
    pub pairs: Vec<(String, String)>,
    /// Every pair that was tested, in test order.
    pub reports: Vec<PairReport>,
    /// Names the host could not resolve.
    pub stale: Vec<String>,
    /// Meshes without vertices, left out of pairing.
    pub empty: Vec<String>,
}

/// Outcome of [`MergeResolver::resolve_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSummary {
    /// Planning passes that joined at least one pair.
    pub passes: usize,
    /// Every `(target, source)` join performed.
    pub joined: Vec<(String, String)>,
    /// Names that no longer resolved when needed.
    pub stale: Vec<String>,
}

/// Greedy planner for joining non-overlapping meshes.
#[derive(Debug, Clone, Default)]
pub struct MergeResolver {
    options: OverlapOptions,
    scope: MergeScope,
}

impl MergeResolver {
    /// Create a resolver, validating `options`.
    pub fn new(options: OverlapOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            scope: MergeScope::default(),
        })
    }

    /// Set the object scope used by [`resolve_all`](Self::resolve_all).
    pub fn with_scope(mut self, scope: MergeScope) -> Self {
        self.scope = scope;
        self
    }

    /// The overlap options.
    pub fn options(&self) -> &OverlapOptions {
        &self.options
    }

    /// Index the named meshes and pair up those that do not overlap.
    ///
    /// Pairing is greedy in `names` order: each mesh is paired with the first
    /// later mesh that is still free and does not overlap it.
    pub fn plan<I: MeshIndex, H: MeshHost<I>>(&self, host: &H, names: &[String]) -> MergePlan {
        let mut plan = MergePlan::default();
        let mut sources = Vec::new();
        for name in names {
            match (host.mesh(name), host.world_transform(name)) {
                (Some(mesh), Some(world)) if mesh.num_vertices() > 0 => {
                    sources.push((name.as_str(), mesh, world))
                }
                (Some(_), Some(_)) => plan.empty.push(name.clone()),
                _ => {
                    log::warn!("merge candidate '{}' no longer resolves", name);
                    plan.stale.push(name.clone());
                }
            }
        }

        let build = |(name, mesh, world): &(&str, &PolyMesh<I>, Matrix4<f64>)| {
            MeshSpatialIndex::build(*name, *mesh, world)
        };
        let indexes: Vec<MeshSpatialIndex> = if self.options.parallel {
            sources.par_iter().map(build).collect()
        } else {
            sources.iter().map(build).collect()
        };

        let mut used = vec![false; indexes.len()];
        for i in 0..indexes.len() {
            if used[i] {
                continue;
            }
            for j in (i + 1)..indexes.len() {
                if used[j] {
                    continue;
                }
                let overlap = may_overlap(&indexes[i], &indexes[j], &self.options);
                let free = !overlap.overlapping;
                plan.reports.push(PairReport {
                    first: indexes[i].name().to_string(),
                    second: indexes[j].name().to_string(),
                    overlap,
                });
                if free {
                    plan.pairs
                        .push((indexes[i].name().to_string(), indexes[j].name().to_string()));
                    used[i] = true;
                    used[j] = true;
                    break;
                }
            }
        }

        log::debug!(
            "merge plan: {} pairs from {} meshes ({} tests, {} stale, {} empty)",
            plan.pairs.len(),
            indexes.len(),
            plan.reports.len(),
            plan.stale.len(),
            plan.empty.len()
        );
        plan
    }

    /// Plan and join repeatedly until no pair can be joined.
    ///
    /// Names that vanish at join time are recorded as stale and the pass
    /// continues; any other join failure aborts.
    pub fn resolve_all<I, H>(&self, host: &mut H) -> Result<MergeSummary>
    where
        I: MeshIndex,
        H: MeshHost<I> + MeshJoiner,
    {
        let names = self.scope.resolve(host);
        let mut summary = MergeSummary::default();

        loop {
            let alive: Vec<String> = names
                .iter()
                .filter(|n| host.mesh(n).is_some())
                .cloned()
                .collect();
            if alive.len() < 2 {
                break;
            }

            let plan = self.plan(host, &alive);
            summary.stale.extend(plan.stale);
            if plan.pairs.is_empty() {
                break;
            }

            let mut joined_any = false;
            for (target, source) in plan.pairs {
                match host.join(&target, &source) {
                    Ok(()) => {
                        joined_any = true;
                        summary.joined.push((target, source));
                    }
                    Err(MeshError::StaleReference { name }) => {
                        log::warn!(
                            "skipping join of '{}' into '{}': '{}' is gone",
                            source,
                            target,
                            name
                        );
                        summary.stale.push(name);
                    }
                    Err(e) => return Err(e),
                }
            }
            if !joined_any {
                break;
            }
            summary.passes += 1;
            log::info!(
                "merge pass {} done, {} joins so far",
                summary.passes,
                summary.joined.len()
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::mark::EdgeFlags;
    use crate::mesh::{fixtures, Selection};
    use crate::scene::{Scene, SceneObject};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn cube_index(name: &str, x: f64) -> MeshSpatialIndex {
        let mesh = fixtures::unit_cube(Point3::origin());
        let world = Matrix4::new_translation(&Vector3::new(x, 0.0, 0.0));
        MeshSpatialIndex::build(name, &mesh, &world)
    }

    fn cube_object(x: f64) -> SceneObject {
        SceneObject::new(fixtures::unit_cube(Point3::origin()))
            .with_world(Matrix4::new_translation(&Vector3::new(x, 0.0, 0.0)))
    }

    fn strict(threshold: f64) -> OverlapOptions {
        OverlapOptions::default().with_threshold(threshold)
    }

    #[test]
    fn test_distant_cubes_are_fast_rejected() {
        let a = cube_index("A", 0.0);
        let b = cube_index("B", 3.0);
        let report = may_overlap(&a, &b, &strict(0.1));
        assert!(!report.overlapping);
        assert!(report.fast_rejected);
        assert_eq!(a.queries() + b.queries(), 0);
    }

    #[test]
    fn test_close_cubes_overlap() {
        let a = cube_index("A", 0.0);
        let b = cube_index("B", 1.05);
        let report = may_overlap(&a, &b, &strict(0.1));
        assert!(report.overlapping);
        assert!(!report.fast_rejected);
        assert_relative_eq!(report.min_distance.unwrap(), 0.05, epsilon = 1e-9);
        // Equal sizes: "A" queries "B"'s tree.
        assert_eq!(a.queries(), 0);
        assert_eq!(b.queries(), 8);
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let small = {
            let mesh = fixtures::quad_grid(1, 1, None);
            let world = Matrix4::new_translation(&Vector3::new(0.2, 0.2, 0.55));
            MeshSpatialIndex::build("small", &mesh, &world)
        };
        let cube = cube_index("cube", 0.0);
        for threshold in [0.01, 0.1, 0.5] {
            let options = strict(threshold).with_parallel(false);
            assert_eq!(
                may_overlap(&small, &cube, &options),
                may_overlap(&cube, &small, &options)
            );
        }
    }

    #[test]
    fn test_nested_boxes_need_queries() {
        // A tiny cube inside a big one: boxes intersect, vertices stay apart.
        let big = {
            let mesh = fixtures::unit_cube(Point3::origin());
            MeshSpatialIndex::build("big", &mesh, &Matrix4::new_scaling(4.0))
        };
        let tiny = {
            let mesh = fixtures::unit_cube(Point3::origin());
            MeshSpatialIndex::build("tiny", &mesh, &Matrix4::new_scaling(0.2))
        };
        let report = may_overlap(&big, &tiny, &strict(0.1));
        assert!(!report.overlapping);
        assert!(!report.fast_rejected);
        assert!(big.queries() + tiny.queries() > 0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let a = cube_index("A", 0.0);
        let b = cube_index("B", 1.3);
        let par = may_overlap(&a, &b, &strict(0.5));
        let seq = may_overlap(&a, &b, &strict(0.5).with_parallel(false));
        assert_eq!(par, seq);
        assert!(par.overlapping);
    }

    #[test]
    fn test_scope_resolution() {
        let mut scene = Scene::new();
        scene.insert("A", cube_object(0.0).with_selected(true));
        scene.insert("B", cube_object(3.0).with_visible(false).with_selected(true));
        scene.insert("C", cube_object(6.0));

        assert_eq!(MergeScope::SelectedOnly.resolve(&scene), vec!["A", "B"]);
        assert_eq!(MergeScope::VisibleOnly.resolve(&scene), vec!["A", "C"]);
        assert_eq!(MergeScope::SelectedAndVisible.resolve(&scene), vec!["A"]);
        assert_eq!(MergeScope::SelectionOrVisible.resolve(&scene), vec!["A", "B"]);

        let mut nothing_selected = Scene::new();
        nothing_selected.insert("A", cube_object(0.0));
        nothing_selected.insert("B", cube_object(3.0).with_visible(false));
        assert_eq!(MergeScope::SelectionOrVisible.resolve(&nothing_selected), vec!["A"]);
    }

    #[test]
    fn test_plan_pairs_each_mesh_once() {
        let mut scene = Scene::new();
        for (name, x) in [("A", 0.0), ("B", 3.0), ("C", 6.0), ("D", 9.0), ("E", 12.0)] {
            scene.insert(name, cube_object(x));
        }
        scene.insert("Empty", SceneObject::new(PolyMesh::new()));
        let resolver = MergeResolver::new(strict(0.1)).unwrap();
        let names: Vec<String> = ["A", "B", "C", "D", "E", "Empty", "Missing"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let plan = resolver.plan(&scene, &names);

        assert_eq!(
            plan.pairs,
            vec![
                ("A".to_string(), "B".to_string()),
                ("C".to_string(), "D".to_string())
            ]
        );
        assert_eq!(plan.stale, vec!["Missing".to_string()]);
        assert_eq!(plan.empty, vec!["Empty".to_string()]);
        assert!(plan.reports.iter().all(|r| r.overlap.fast_rejected));
    }

    #[test]
    fn test_resolve_all_joins_until_done() {
        let mut scene = Scene::new();
        scene.insert("A", cube_object(0.0));
        scene.insert("B", cube_object(3.0));
        scene.insert("C", cube_object(6.0));

        let resolver = MergeResolver::new(strict(0.1)).unwrap();
        let summary = resolver.resolve_all(&mut scene).unwrap();
        assert_eq!(summary.passes, 2);
        assert_eq!(
            summary.joined,
            vec![
                ("A".to_string(), "B".to_string()),
                ("A".to_string(), "C".to_string())
            ]
        );
        assert!(summary.stale.is_empty());
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.get("A").unwrap().mesh().num_faces(), 18);
    }

    #[test]
    fn test_overlapping_meshes_stay_apart() {
        let mut scene = Scene::new();
        scene.insert("A", cube_object(0.0));
        scene.insert("B", cube_object(1.05));
        scene.insert("C", cube_object(6.0));

        let resolver = MergeResolver::new(strict(0.1)).unwrap();
        let summary = resolver.resolve_all(&mut scene).unwrap();
        assert_eq!(summary.joined, vec![("A".to_string(), "C".to_string())]);
        assert_eq!(scene.len(), 2);
        assert!(scene.get("B").is_some());
    }

    /// Scene whose join of one name always reports it as gone.
    struct VanishingScene {
        scene: Scene,
        vanishing: &'static str,
    }

    impl MeshHost for VanishingScene {
        fn object_names(&self) -> Vec<String> {
            self.scene.object_names()
        }
        fn mesh(&self, name: &str) -> Option<&PolyMesh> {
            self.scene.mesh(name)
        }
        fn world_transform(&self, name: &str) -> Option<Matrix4<f64>> {
            self.scene.world_transform(name)
        }
        fn is_selected(&self, name: &str) -> bool {
            self.scene.is_selected(name)
        }
        fn is_visible(&self, name: &str) -> bool {
            self.scene.is_visible(name)
        }
        fn selection(&self, name: &str) -> Option<&Selection> {
            self.scene.selection(name)
        }
        fn set_selection(&mut self, name: &str, selection: Selection) -> Result<()> {
            self.scene.set_selection(name, selection)
        }
        fn edge_flags(&self, name: &str) -> Option<&EdgeFlags> {
            self.scene.edge_flags(name)
        }
        fn edge_flags_mut(&mut self, name: &str) -> Option<&mut EdgeFlags> {
            self.scene.edge_flags_mut(name)
        }
    }

    impl MeshJoiner for VanishingScene {
        fn join(&mut self, target: &str, source: &str) -> Result<()> {
            if source == self.vanishing {
                self.scene.remove(source);
                return Err(MeshError::stale(source));
            }
            self.scene.join(target, source)
        }
    }

    #[test]
    fn test_stale_join_is_reported_and_batch_continues() {
        fixtures::init_logging();
        let mut scene = Scene::new();
        for (name, x) in [("A", 0.0), ("B", 3.0), ("C", 6.0), ("D", 9.0)] {
            scene.insert(name, cube_object(x));
        }
        let mut host = VanishingScene {
            scene,
            vanishing: "B",
        };
        let resolver = MergeResolver::new(strict(0.1)).unwrap();
        let summary = resolver.resolve_all(&mut host).unwrap();

        assert_eq!(summary.stale, vec!["B".to_string()]);
        assert_eq!(summary.joined[0], ("C".to_string(), "D".to_string()));
        // Second pass joins the survivors.
        assert_eq!(summary.joined[1], ("A".to_string(), "C".to_string()));
        assert_eq!(host.scene.len(), 1);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(MergeResolver::new(strict(-1.0)).is_err());
        assert!(MergeResolver::new(strict(f64::NAN)).is_err());
    }
}

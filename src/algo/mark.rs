//! Sharp and seam edge marking.
//!
//! [`EdgeFlags`] holds the sharp and seam edge sets of one mesh. The host owns
//! them; marking operations take them by `&mut` and report how many flags
//! actually changed, so marking the same edges twice is a no-op.
//!
//! [`auto_mark_edges`] picks candidate edges from the CAD group layout (the
//! whole mesh, the groups touched by a selection, or the outline of the
//! selection itself) and marks them. In smart mode only candidates whose two
//! faces meet at a visible angle are kept. With
//! [`MarkOptions::merge_fillets`], fillet groups count as part of their largest
//! neighbor, so no edge is marked between a fillet and the surface it rounds.

use std::collections::BTreeSet;

use crate::error::{MeshError, Result};
use crate::mesh::{EdgeKey, GroupId, MeshIndex, MeshTopology, Selection};

use super::boundary::{
    extract_boundary, group_partition_edges, group_selection, merged_partition_edges,
    selected_group_boundary, touched_groups,
};
use super::fillet::{classify, ExpandOptions};

/// Which edge classification to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkMode {
    /// Hard shading edge.
    Sharp,
    /// UV island boundary.
    Seam,
}

/// Sharp and seam edge sets of one mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeFlags<I: MeshIndex = u32> {
    sharp: BTreeSet<EdgeKey<I>>,
    seams: BTreeSet<EdgeKey<I>>,
}

impl<I: MeshIndex> Default for EdgeFlags<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> EdgeFlags<I> {
    /// No edge flagged.
    pub fn new() -> Self {
        Self {
            sharp: BTreeSet::new(),
            seams: BTreeSet::new(),
        }
    }

    /// Sharp edges, ascending.
    #[inline]
    pub fn sharp(&self) -> &BTreeSet<EdgeKey<I>> {
        &self.sharp
    }

    /// Seam edges, ascending.
    #[inline]
    pub fn seams(&self) -> &BTreeSet<EdgeKey<I>> {
        &self.seams
    }

    /// The edge set for `mode`.
    pub fn edges(&self, mode: MarkMode) -> &BTreeSet<EdgeKey<I>> {
        match mode {
            MarkMode::Sharp => &self.sharp,
            MarkMode::Seam => &self.seams,
        }
    }

    fn edges_mut(&mut self, mode: MarkMode) -> &mut BTreeSet<EdgeKey<I>> {
        match mode {
            MarkMode::Sharp => &mut self.sharp,
            MarkMode::Seam => &mut self.seams,
        }
    }

    /// Whether `e` carries the `mode` flag.
    #[inline]
    pub fn is_marked(&self, e: EdgeKey<I>, mode: MarkMode) -> bool {
        self.edges(mode).contains(&e)
    }

    /// Whether `e` is a seam.
    #[inline]
    pub fn is_seam(&self, e: EdgeKey<I>) -> bool {
        self.seams.contains(&e)
    }

    /// Whether `e` is sharp.
    #[inline]
    pub fn is_sharp(&self, e: EdgeKey<I>) -> bool {
        self.sharp.contains(&e)
    }

    /// Remove the `mode` flag from `e`. Returns whether it was set.
    pub fn unmark(&mut self, e: EdgeKey<I>, mode: MarkMode) -> bool {
        self.edges_mut(mode).remove(&e)
    }

    /// Replace the seam set.
    pub fn set_seams(&mut self, seams: BTreeSet<EdgeKey<I>>) {
        self.seams = seams;
    }
}

/// Flag `edges` with `mode`. Returns how many flags changed.
pub fn mark_edges<I, It>(flags: &mut EdgeFlags<I>, edges: It, mode: MarkMode) -> usize
where
    I: MeshIndex,
    It: IntoIterator<Item = EdgeKey<I>>,
{
    let set = flags.edges_mut(mode);
    edges.into_iter().filter(|&e| set.insert(e)).count()
}

/// Union of two seam sets.
pub fn merge_seams<I: MeshIndex>(
    existing: &BTreeSet<EdgeKey<I>>,
    new: &BTreeSet<EdgeKey<I>>,
) -> BTreeSet<EdgeKey<I>> {
    existing.union(new).copied().collect()
}

/// Where [`auto_mark_edges`] takes its candidate edges from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkScope {
    /// Every edge separating two group regions of the mesh.
    #[default]
    WholeMesh,
    /// The outline of every group touched by the selection.
    SelectedGroups,
    /// The outline of the selected faces themselves.
    SelectionOutline,
}

/// Options for [`auto_mark_edges`].
#[derive(Debug, Clone)]
pub struct MarkOptions {
    /// Candidate source.
    pub scope: MarkScope,

    /// Write sharp flags.
    pub mark_sharp: bool,

    /// Write seam flags.
    pub mark_seam: bool,

    /// Keep only candidates whose two faces differ in normal by more than
    /// `smart_angle`.
    pub smart: bool,

    /// Normal difference threshold for smart marking, in degrees.
    pub smart_angle: f64,

    /// Treat fillet groups as part of their largest neighbor.
    pub merge_fillets: bool,

    /// Thresholds that decide which groups are fillets.
    pub fillet: ExpandOptions,
}

impl Default for MarkOptions {
    fn default() -> Self {
        Self {
            scope: MarkScope::WholeMesh,
            mark_sharp: false,
            mark_seam: true,
            smart: false,
            smart_angle: 5.0,
            merge_fillets: false,
            fillet: ExpandOptions::default(),
        }
    }
}

impl MarkOptions {
    /// Set the candidate scope.
    pub fn with_scope(mut self, scope: MarkScope) -> Self {
        self.scope = scope;
        self
    }

    /// Enable or disable sharp marking.
    pub fn with_sharp(mut self, mark: bool) -> Self {
        self.mark_sharp = mark;
        self
    }

    /// Enable or disable seam marking.
    pub fn with_seam(mut self, mark: bool) -> Self {
        self.mark_seam = mark;
        self
    }

    /// Enable or disable smart filtering.
    pub fn with_smart(mut self, smart: bool) -> Self {
        self.smart = smart;
        self
    }

    /// Set the smart filtering angle in degrees.
    pub fn with_smart_angle(mut self, degrees: f64) -> Self {
        self.smart_angle = degrees;
        self
    }

    /// Enable or disable merging fillets into their neighbors.
    pub fn with_merge_fillets(mut self, merge: bool) -> Self {
        self.merge_fillets = merge;
        self
    }

    /// Set the fillet thresholds used when merging fillets.
    pub fn with_fillet_options(mut self, fillet: ExpandOptions) -> Self {
        self.fillet = fillet;
        self
    }

    /// Check the option values.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=180.0).contains(&self.smart_angle) {
            return Err(MeshError::invalid_param(
                "smart_angle",
                self.smart_angle,
                "must be between 0 and 180 degrees",
            ));
        }
        self.fillet.validate()
    }
}

/// Outcome of one [`auto_mark_edges`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkReport<I: MeshIndex = u32> {
    /// The edges that were marked (after smart filtering).
    pub edges: BTreeSet<EdgeKey<I>>,
    /// Groups the candidates were taken from (selection scopes only).
    pub groups: BTreeSet<GroupId>,
    /// Sharp flags newly set.
    pub sharp_changed: usize,
    /// Seam flags newly set.
    pub seam_changed: usize,
    /// The request used a selection scope with nothing selected.
    pub empty_selection: bool,
}

impl<I: MeshIndex> Default for MarkReport<I> {
    fn default() -> Self {
        Self {
            edges: BTreeSet::new(),
            groups: BTreeSet::new(),
            sharp_changed: 0,
            seam_changed: 0,
            empty_selection: false,
        }
    }
}

/// Mark group-derived edges as sharp and/or seam.
pub fn auto_mark_edges<I: MeshIndex>(
    topology: &MeshTopology<I>,
    flags: &mut EdgeFlags<I>,
    selection: &Selection<I>,
    options: &MarkOptions,
) -> Result<MarkReport<I>> {
    options.validate()?;
    if selection.num_faces() != topology.num_faces() {
        return Err(MeshError::invalid_param(
            "selection",
            selection.num_faces(),
            "selection belongs to a different mesh",
        ));
    }

    let mut report = MarkReport::default();
    if options.scope != MarkScope::WholeMesh && selection.is_empty() {
        log::debug!("auto mark skipped: empty selection");
        report.empty_selection = true;
        return Ok(report);
    }

    let targets = if options.merge_fillets {
        Some(classify(topology, &options.fillet)?.merge_targets())
    } else {
        None
    };
    let partition = |faces: &Selection<I>| match &targets {
        Some(t) => merged_partition_edges(topology, faces, t),
        None => group_partition_edges(topology, faces),
    };

    let candidates = match (options.scope, &targets) {
        (MarkScope::WholeMesh, _) => partition(&Selection::all(topology.num_faces())),
        (MarkScope::SelectedGroups, _) if options.smart => {
            report.groups = touched_groups(topology, selection);
            if let Some(t) = &targets {
                report.groups = with_merged_groups(topology, &report.groups, t);
            }
            partition(&group_selection(topology, &report.groups))
        }
        (MarkScope::SelectedGroups, None) => {
            let (edges, groups) = selected_group_boundary(topology, selection);
            report.groups = groups;
            edges
        }
        (MarkScope::SelectedGroups, Some(t)) => {
            report.groups = with_merged_groups(topology, &touched_groups(topology, selection), t);
            extract_boundary(topology, &group_selection(topology, &report.groups))
        }
        (MarkScope::SelectionOutline, _) => extract_boundary(topology, selection),
    };

    let edges: BTreeSet<EdgeKey<I>> = if options.smart {
        candidates
            .into_iter()
            .filter(|&e| is_visible_crease(topology, e, options.smart_angle))
            .collect()
    } else {
        candidates
    };

    if options.mark_sharp {
        report.sharp_changed = mark_edges(flags, edges.iter().copied(), MarkMode::Sharp);
    }
    if options.mark_seam {
        report.seam_changed = mark_edges(flags, edges.iter().copied(), MarkMode::Seam);
    }

    log::debug!(
        "auto mark ({:?}, smart={}): {} edges, {} sharp and {} seam flags changed",
        options.scope,
        options.smart,
        edges.len(),
        report.sharp_changed,
        report.seam_changed
    );
    report.edges = edges;
    Ok(report)
}

/// `groups` plus every group merged into the same target as one of them.
fn with_merged_groups<I: MeshIndex>(
    topology: &MeshTopology<I>,
    groups: &BTreeSet<GroupId>,
    targets: &[usize],
) -> BTreeSet<GroupId> {
    let regions: BTreeSet<usize> = groups
        .iter()
        .filter_map(|&g| topology.group_index(g))
        .map(|g| targets[g])
        .collect();
    topology
        .groups()
        .iter()
        .enumerate()
        .filter(|(g, _)| regions.contains(&targets[*g]))
        .map(|(_, &id)| id)
        .chain(groups.iter().copied())
        .collect()
}

/// Shared by exactly two faces whose normals differ by more than `angle_deg`.
fn is_visible_crease<I: MeshIndex>(topology: &MeshTopology<I>, e: EdgeKey<I>, angle_deg: f64) -> bool {
    match topology.edge_faces(e) {
        [a, b] => topology.dihedral_deg(*a, *b) > angle_deg,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::boundary::true_boundary;
    use crate::mesh::{fixtures, FaceId, TopologyOptions};

    fn fold() -> MeshTopology {
        MeshTopology::build(&fixtures::two_group_fold(), &TopologyOptions::default()).unwrap()
    }

    #[test]
    fn test_mark_edges_is_idempotent() {
        let mut flags: EdgeFlags = EdgeFlags::new();
        let edges = [EdgeKey::from_indices(0, 1), EdgeKey::from_indices(1, 2)];
        assert_eq!(mark_edges(&mut flags, edges, MarkMode::Seam), 2);
        assert_eq!(mark_edges(&mut flags, edges, MarkMode::Seam), 0);
        assert_eq!(mark_edges(&mut flags, edges, MarkMode::Sharp), 2);
        assert!(flags.is_seam(edges[0]));
        assert!(flags.unmark(edges[0], MarkMode::Seam));
        assert!(!flags.is_seam(edges[0]));
    }

    #[test]
    fn test_merge_seams_union() {
        let a: BTreeSet<EdgeKey> = [EdgeKey::from_indices(0, 1)].into_iter().collect();
        let b: BTreeSet<EdgeKey> = [EdgeKey::from_indices(1, 2), EdgeKey::from_indices(0, 1)]
            .into_iter()
            .collect();
        assert_eq!(merge_seams(&a, &BTreeSet::new()), a);
        assert_eq!(merge_seams(&a, &b), merge_seams(&b, &a));
        assert_eq!(merge_seams(&a, &b).len(), 2);
    }

    #[test]
    fn test_smart_sharp_marks_fold_edges_only() {
        let topo = fold();
        let mut flags = EdgeFlags::new();
        let options = MarkOptions::default()
            .with_sharp(true)
            .with_seam(false)
            .with_smart(true);
        let report = auto_mark_edges(&topo, &mut flags, &Selection::new(8), &options).unwrap();

        assert_eq!(report.sharp_changed, 3);
        assert_eq!(flags.sharp().len(), 3);
        assert!(flags.seams().is_empty());
        for &e in flags.sharp() {
            let faces = topo.edge_faces(e);
            assert_eq!(faces.len(), 2);
            assert_ne!(topo.face_group(faces[0]), topo.face_group(faces[1]));
        }

        let again = auto_mark_edges(&topo, &mut flags, &Selection::new(8), &options).unwrap();
        assert_eq!(again.sharp_changed, 0);
    }

    #[test]
    fn test_plain_whole_mesh_includes_open_borders() {
        let topo = fold();
        let mut flags = EdgeFlags::new();
        let report =
            auto_mark_edges(&topo, &mut flags, &Selection::new(8), &MarkOptions::default()).unwrap();
        assert_eq!(report.seam_changed, 3 + true_boundary(&topo).len());
    }

    #[test]
    fn test_selected_groups_outline() {
        let topo = fold();
        let mut flags = EdgeFlags::new();
        let selection = Selection::from_faces(8, [FaceId::new(1)]).unwrap();
        let options = MarkOptions::default().with_scope(MarkScope::SelectedGroups);
        let report = auto_mark_edges(&topo, &mut flags, &selection, &options).unwrap();

        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.seam_changed, 10);

        // Smart variant keeps only the creased edges of the touched group.
        let mut smart_flags = EdgeFlags::new();
        let smart = options.with_smart(true);
        let report = auto_mark_edges(&topo, &mut smart_flags, &selection, &smart).unwrap();
        assert_eq!(report.edges.len(), 3);
    }

    #[test]
    fn test_selection_outline() {
        let topo =
            MeshTopology::build(&fixtures::quad_grid(3, 3, None), &TopologyOptions::default())
                .unwrap();
        let mut flags = EdgeFlags::new();
        let selection = Selection::from_faces(9, [FaceId::new(4)]).unwrap();
        let options = MarkOptions::default().with_scope(MarkScope::SelectionOutline);
        let report = auto_mark_edges(&topo, &mut flags, &selection, &options).unwrap();
        assert_eq!(report.seam_changed, 4);
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let topo = fold();
        let mut flags = EdgeFlags::new();
        let options = MarkOptions::default().with_scope(MarkScope::SelectedGroups);
        let report = auto_mark_edges(&topo, &mut flags, &Selection::new(8), &options).unwrap();
        assert!(report.empty_selection);
        assert_eq!(flags, EdgeFlags::new());
    }

    /// Edges shared by a face of group `a` and a face of group `b`.
    fn shared_edges(topo: &MeshTopology, a: u64, b: u64) -> Vec<EdgeKey> {
        let pair = [Some(GroupId::new(a)), Some(GroupId::new(b))];
        topo.edges()
            .into_iter()
            .filter(|&e| match topo.edge_faces(e) {
                [f, g] => {
                    let groups = [topo.face_group(*f), topo.face_group(*g)];
                    groups == pair || groups == [pair[1], pair[0]]
                }
                _ => false,
            })
            .collect()
    }

    fn chamfer_merge() -> MarkOptions {
        let fillet = ExpandOptions::default().with_min_curvature_angle(0.0);
        MarkOptions::default()
            .with_merge_fillets(true)
            .with_fillet_options(fillet)
    }

    #[test]
    fn test_merged_fillet_keeps_parent_island() {
        let topo = MeshTopology::build(&fixtures::fillet_step(90.0), &TopologyOptions::default())
            .unwrap();
        let open = true_boundary(&topo).len();
        let all = Selection::new(topo.num_faces());

        let mut plain = EdgeFlags::new();
        let report = auto_mark_edges(&topo, &mut plain, &all, &MarkOptions::default()).unwrap();
        assert_eq!(report.seam_changed, open + 8);

        // The strip ties between two equal plates and joins the first one.
        let mut merged = EdgeFlags::new();
        let report = auto_mark_edges(&topo, &mut merged, &all, &chamfer_merge()).unwrap();
        assert_eq!(report.seam_changed, open + 4);
        assert!(shared_edges(&topo, 1, 2).iter().all(|&e| !merged.is_seam(e)));
        let far_side = shared_edges(&topo, 2, 3);
        assert_eq!(far_side.len(), 4);
        assert!(far_side.iter().all(|&e| merged.is_seam(e)));
    }

    #[test]
    fn test_merged_fillet_joins_selected_group_outline() {
        let topo = MeshTopology::build(&fixtures::fillet_step(90.0), &TopologyOptions::default())
            .unwrap();
        let options = chamfer_merge().with_scope(MarkScope::SelectedGroups);

        let mut flags = EdgeFlags::new();
        let near = Selection::from_faces(36, [FaceId::new(0)]).unwrap();
        let report = auto_mark_edges(&topo, &mut flags, &near, &options).unwrap();
        assert_eq!(
            report.groups,
            [GroupId::new(1), GroupId::new(2)].into_iter().collect()
        );
        // Plate perimeter minus the joined side, strip ends, far strip side.
        assert_eq!(report.edges.len(), 12 + 2 + 4);

        let mut flags = EdgeFlags::new();
        let far = Selection::from_faces(36, [FaceId::new(20)]).unwrap();
        let report = auto_mark_edges(&topo, &mut flags, &far, &options).unwrap();
        assert_eq!(report.groups, [GroupId::new(3)].into_iter().collect());
        assert_eq!(report.edges.len(), 16);
    }

    #[test]
    fn test_invalid_smart_angle() {
        let topo = fold();
        let mut flags = EdgeFlags::new();
        let options = MarkOptions::default().with_smart_angle(270.0);
        assert!(auto_mark_edges(&topo, &mut flags, &Selection::new(8), &options).is_err());
    }
}

//! Fillet-aware selection expansion.
//!
//! Expanding a selection grows it to whole CAD groups and then, optionally,
//! across small rounding or chamfer groups (fillets) that sit between larger
//! surfaces. Two pieces cooperate:
//!
//! - [`classify`] scores every group from its normal spread, its area relative
//!   to its largest neighbor and the number of groups it touches, then tags each
//!   face [`FaceClass::Regular`] or [`FaceClass::FilletCandidate`]. A fillet is
//!   curved: its normals spread by at least
//!   [`ExpandOptions::min_curvature_angle`]. The scoring is a pure function of
//!   the topology and the thresholds.
//! - [`expand`] runs a breadth-first traversal over face adjacency, starting from
//!   every face of the seeds' groups. A neighbor is admitted if it belongs to a
//!   seed group, or if it is a fillet candidate and its dihedral angle to the
//!   frontier face is within the same angle. An angle of zero turns off both
//!   angle checks, so flat chamfers are admitted too.
//!
//! The heuristic can over-include faces at ambiguous curvature boundaries; that
//! is accepted behavior.
//!
//! # Example
//!
//! ```
//! use seamline::algo::fillet::{expand, ExpandOptions};
//! use seamline::mesh::{build_from_polygons, FaceId, GroupId, MeshTopology, PolyMesh, Selection, TopologyOptions};
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
//! let faces = vec![vec![0, 1, 4, 3], vec![1, 2, 5, 4]];
//! let groups = vec![Some(GroupId::new(1)), Some(GroupId::new(1))];
//! let mesh: PolyMesh = build_from_polygons(&vertices, &faces, &groups).unwrap();
//! let topology = MeshTopology::build(&mesh, &TopologyOptions::default()).unwrap();
//!
//! // Touching one face selects its whole group.
//! let seeds = Selection::from_faces(2, [FaceId::new(0)]).unwrap();
//! let expanded = expand(&topology, &seeds, &ExpandOptions::default()).unwrap();
//! assert_eq!(expanded.len(), 2);
//! ```

use std::collections::{BTreeSet, VecDeque};

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, GroupId, GroupStats, MeshIndex, MeshTopology, Selection};

/// Per-face classification tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceClass {
    /// An ordinary face.
    Regular,
    /// A face of a group that looks like a fillet or chamfer.
    FilletCandidate,
}

/// Options for fillet-aware expansion.
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    /// Minimum normal spread (degrees) for a group to count as curved, and the
    /// largest dihedral angle across which a fillet face is admitted from the
    /// frontier. Zero disables both checks.
    pub min_curvature_angle: f64,

    /// A fillet group's area may be at most this fraction of the area of its
    /// largest adjacent group.
    pub area_ratio_threshold: f64,

    /// Treat faces that share only a vertex as adjacent.
    pub allow_vertex_adjacency_bridging: bool,

    /// Expand into fillet groups at all. When false only whole seed groups
    /// are selected.
    pub select_adjacent_fillets: bool,

    /// A fillet group touches at least this many other groups.
    pub min_adjacent_groups: usize,

    /// Vertex-bridged fillet groups whose bounding size exceeds this fraction
    /// of the neighboring seed group's size are skipped. Values of 1.0 or more
    /// disable the filter.
    pub vertex_bridge_max_size_ratio: f64,

    /// Compute group statistics on the rayon pool.
    pub parallel: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            min_curvature_angle: 5.0,
            area_ratio_threshold: 0.06,
            allow_vertex_adjacency_bridging: false,
            select_adjacent_fillets: false,
            min_adjacent_groups: 2,
            vertex_bridge_max_size_ratio: 0.5,
            parallel: true,
        }
    }
}

impl ExpandOptions {
    /// Set the curvature gate angle in degrees.
    pub fn with_min_curvature_angle(mut self, degrees: f64) -> Self {
        self.min_curvature_angle = degrees;
        self
    }

    /// Set the maximum fillet-to-neighbor area ratio.
    pub fn with_area_ratio_threshold(mut self, ratio: f64) -> Self {
        self.area_ratio_threshold = ratio;
        self
    }

    /// Enable or disable vertex-adjacency bridging.
    pub fn with_vertex_bridging(mut self, allow: bool) -> Self {
        self.allow_vertex_adjacency_bridging = allow;
        self
    }

    /// Enable or disable expansion into fillet groups.
    pub fn with_adjacent_fillets(mut self, select: bool) -> Self {
        self.select_adjacent_fillets = select;
        self
    }

    /// Set the minimum number of groups a fillet must touch.
    pub fn with_min_adjacent_groups(mut self, count: usize) -> Self {
        self.min_adjacent_groups = count;
        self
    }

    /// Set the size limit for vertex-bridged fillet groups.
    pub fn with_vertex_bridge_max_size_ratio(mut self, ratio: f64) -> Self {
        self.vertex_bridge_max_size_ratio = ratio;
        self
    }

    /// Enable or disable parallel statistics.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check the option values.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=180.0).contains(&self.min_curvature_angle) {
            return Err(MeshError::invalid_param(
                "min_curvature_angle",
                self.min_curvature_angle,
                "must be between 0 and 180 degrees",
            ));
        }
        if !(self.area_ratio_threshold >= 0.0) {
            return Err(MeshError::invalid_param(
                "area_ratio_threshold",
                self.area_ratio_threshold,
                "must be non-negative",
            ));
        }
        if !(self.vertex_bridge_max_size_ratio >= 0.0) {
            return Err(MeshError::invalid_param(
                "vertex_bridge_max_size_ratio",
                self.vertex_bridge_max_size_ratio,
                "must be non-negative",
            ));
        }
        Ok(())
    }

    fn size_filter_enabled(&self) -> bool {
        self.allow_vertex_adjacency_bridging && self.vertex_bridge_max_size_ratio < 1.0
    }
}

/// Score of one group against the fillet thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilletScore {
    /// Group area divided by the area of its largest adjacent group
    /// (infinite when the group has no neighbor with positive area).
    pub area_ratio: f64,
    /// Normal spread of the group, in degrees.
    pub curvature_deg: f64,
    /// Number of distinct adjacent groups.
    pub adjacent_groups: usize,
}

/// Whether a score passes the fillet thresholds.
pub fn is_fillet(score: &FilletScore, options: &ExpandOptions) -> bool {
    let curved = options.min_curvature_angle == 0.0
        || score.curvature_deg >= options.min_curvature_angle;
    curved
        && score.adjacent_groups >= options.min_adjacent_groups
        && score.area_ratio <= options.area_ratio_threshold
}

/// Score one group from precomputed statistics.
///
/// With vertex bridging enabled, groups touching only at a vertex count as
/// adjacent.
pub fn score_group(stats: &[GroupStats], group: usize, bridging: bool) -> FilletScore {
    let s = &stats[group];
    let mut neighbors: BTreeSet<usize> = s.edge_adjacent.clone();
    if bridging {
        neighbors.extend(s.vertex_adjacent.iter().copied());
    }

    let largest = neighbors
        .iter()
        .map(|&n| stats[n].area)
        .fold(0.0, f64::max);
    let area_ratio = if largest > 0.0 {
        s.area / largest
    } else {
        f64::INFINITY
    };

    FilletScore {
        area_ratio,
        curvature_deg: s.curvature_deg,
        adjacent_groups: neighbors.len(),
    }
}

/// Fillet tags for every group and face of one topology.
#[derive(Debug, Clone)]
pub struct FilletClassification {
    stats: Vec<GroupStats>,
    scores: Vec<FilletScore>,
    fillet: Vec<bool>,
    faces: Vec<FaceClass>,
    bridging: bool,
}

impl FilletClassification {
    /// Tag of a face. Unknown and ungrouped faces are regular.
    pub fn face_class<I: MeshIndex>(&self, f: FaceId<I>) -> FaceClass {
        self.faces
            .get(f.index())
            .copied()
            .unwrap_or(FaceClass::Regular)
    }

    /// Whether the group at a dense index is a fillet.
    pub fn is_fillet_group(&self, group: usize) -> bool {
        self.fillet.get(group).copied().unwrap_or(false)
    }

    /// Score of the group at a dense index.
    pub fn score(&self, group: usize) -> Option<&FilletScore> {
        self.scores.get(group)
    }

    /// Statistics of the group at a dense index.
    pub fn stats(&self, group: usize) -> Option<&GroupStats> {
        self.stats.get(group)
    }

    /// Ids of all fillet groups, ascending.
    pub fn fillet_groups(&self) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self
            .stats
            .iter()
            .zip(&self.fillet)
            .filter(|(_, &f)| f)
            .map(|(s, _)| s.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of faces tagged as fillet candidates.
    pub fn num_fillet_faces(&self) -> usize {
        self.faces
            .iter()
            .filter(|&&c| c == FaceClass::FilletCandidate)
            .count()
    }

    /// The group each group is absorbed into, indexed by dense group index.
    ///
    /// Every fillet group maps to its largest non-fillet neighbor (any
    /// neighbor when all of them are fillets). Chains are followed to their
    /// end, so the result maps every group to a group that maps to itself,
    /// unless the chain closes on a cycle. Regular groups map to themselves.
    pub fn merge_targets(&self) -> Vec<usize> {
        let mut targets: Vec<usize> = (0..self.stats.len()).collect();
        for g in (0..self.stats.len()).filter(|&g| self.fillet[g]) {
            let s = &self.stats[g];
            let neighbors: BTreeSet<usize> = if self.bridging {
                s.edge_adjacent.union(&s.vertex_adjacent).copied().collect()
            } else {
                s.edge_adjacent.clone()
            };
            let regular = neighbors.iter().copied().filter(|&n| !self.fillet[n]);
            let target = largest_group(&self.stats, regular)
                .or_else(|| largest_group(&self.stats, neighbors.iter().copied()));
            if let Some(target) = target {
                targets[g] = target;
            }
        }
        resolve_merge_targets(&targets)
    }
}

/// The candidate with the largest area; the first one wins ties.
fn largest_group(stats: &[GroupStats], candidates: impl Iterator<Item = usize>) -> Option<usize> {
    candidates.fold(None, |best, n| match best {
        Some(b) if stats[b].area >= stats[n].area => Some(b),
        _ => Some(n),
    })
}

/// Follow every target chain to its end, stopping at cycles.
fn resolve_merge_targets(targets: &[usize]) -> Vec<usize> {
    (0..targets.len())
        .map(|g| {
            let mut seen = BTreeSet::new();
            let mut target = targets[g];
            while target != targets[target] && seen.insert(target) {
                target = targets[target];
            }
            target
        })
        .collect()
}

/// Classify every group and face of a topology.
pub fn classify<I: MeshIndex>(
    topology: &MeshTopology<I>,
    options: &ExpandOptions,
) -> Result<FilletClassification> {
    options.validate()?;

    let stats = topology.group_stats(options.parallel);
    let bridging = options.allow_vertex_adjacency_bridging;
    let scores: Vec<FilletScore> = (0..stats.len())
        .map(|g| score_group(&stats, g, bridging))
        .collect();
    let fillet: Vec<bool> = scores.iter().map(|s| is_fillet(s, options)).collect();

    let faces = (0..topology.num_faces())
        .map(|i| match topology.face_group_index(FaceId::<I>::new(i)) {
            Some(g) if fillet[g] => FaceClass::FilletCandidate,
            _ => FaceClass::Regular,
        })
        .collect();

    let result = FilletClassification {
        stats,
        scores,
        fillet,
        faces,
        bridging,
    };
    log::debug!(
        "classified {} groups, {} fillet groups, {} fillet faces",
        result.stats.len(),
        result.fillet.iter().filter(|&&f| f).count(),
        result.num_fillet_faces()
    );
    Ok(result)
}

/// Expand `seeds` to whole groups and adjacent fillets.
///
/// The result always contains every seed. Seeds must come from the mesh the
/// topology was built from.
pub fn expand<I: MeshIndex>(
    topology: &MeshTopology<I>,
    seeds: &Selection<I>,
    options: &ExpandOptions,
) -> Result<Selection<I>> {
    let classification = classify(topology, options)?;
    expand_with(topology, &classification, seeds, options)
}

/// Expand with a precomputed classification.
///
/// The live session uses this to reuse one classification per snapshot.
pub fn expand_with<I: MeshIndex>(
    topology: &MeshTopology<I>,
    classification: &FilletClassification,
    seeds: &Selection<I>,
    options: &ExpandOptions,
) -> Result<Selection<I>> {
    options.validate()?;
    if seeds.num_faces() != topology.num_faces() {
        return Err(MeshError::invalid_param(
            "seeds",
            seeds.num_faces(),
            "selection belongs to a different mesh",
        ));
    }

    let mut visited = seeds.clone();
    let mut queue: VecDeque<FaceId<I>> = seeds.iter().filter(|&f| topology.is_usable(f)).collect();

    let seed_groups: BTreeSet<usize> = seeds
        .iter()
        .filter_map(|f| topology.face_group_index(f))
        .collect();
    let mut in_seed_group = vec![false; topology.num_groups()];
    for &g in &seed_groups {
        in_seed_group[g] = true;
        for &f in topology.group_faces_at(g) {
            if visited.insert(f)? {
                queue.push_back(f);
            }
        }
    }

    if !options.select_adjacent_fillets {
        return Ok(visited);
    }

    let bridge_limit = BridgeLimit::new(classification, &seed_groups, options);
    let gate = options.min_curvature_angle;

    while let Some(f) = queue.pop_front() {
        let edge_links = topology.edge_neighbors(f).iter().map(|&n| (n, false));
        let vertex_links = topology
            .vertex_neighbors(f)
            .iter()
            .filter(|_| options.allow_vertex_adjacency_bridging)
            .map(|&n| (n, true));

        for (n, via_vertex) in edge_links.chain(vertex_links) {
            if visited.contains(n) {
                continue;
            }
            let group = topology.face_group_index(n);
            let admit = match group {
                Some(g) if in_seed_group[g] => true,
                Some(g) if classification.is_fillet_group(g) => {
                    (gate == 0.0 || topology.dihedral_deg(f, n) <= gate)
                        && !(via_vertex && bridge_limit.rejects(g))
                }
                _ => false,
            };
            if admit {
                visited.insert(n)?;
                queue.push_back(n);
            }
        }
    }

    log::debug!(
        "expanded {} seed faces across {} groups to {} faces",
        seeds.len(),
        seed_groups.len(),
        visited.len()
    );
    Ok(visited)
}

/// Size filter for fillet groups reached through a vertex-only contact.
struct BridgeLimit<'a> {
    classification: &'a FilletClassification,
    seed_groups: &'a BTreeSet<usize>,
    seed_min_size: f64,
    ratio: f64,
    enabled: bool,
}

impl<'a> BridgeLimit<'a> {
    fn new(
        classification: &'a FilletClassification,
        seed_groups: &'a BTreeSet<usize>,
        options: &ExpandOptions,
    ) -> Self {
        let seed_min_size = seed_groups
            .iter()
            .filter_map(|&g| classification.stats(g))
            .map(|s| s.bbox_size)
            .filter(|&s| s > 0.0)
            .fold(f64::INFINITY, f64::min);
        Self {
            classification,
            seed_groups,
            seed_min_size,
            ratio: options.vertex_bridge_max_size_ratio,
            enabled: options.size_filter_enabled(),
        }
    }

    /// Whether group `g` is too large to enter through a vertex contact.
    ///
    /// The reference size is the smallest seed group touching `g`, falling
    /// back to the smallest seed group overall.
    fn rejects(&self, g: usize) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(stats) = self.classification.stats(g) else {
            return false;
        };
        let touching = stats
            .edge_adjacent
            .iter()
            .chain(&stats.vertex_adjacent)
            .filter(|&&n| self.seed_groups.contains(&n))
            .filter_map(|&n| self.classification.stats(n))
            .map(|s| s.bbox_size)
            .filter(|&s| s > 0.0)
            .fold(f64::INFINITY, f64::min);
        let reference = if touching.is_finite() {
            touching
        } else {
            self.seed_min_size
        };
        reference.is_finite() && stats.bbox_size > reference * self.ratio
    }
}

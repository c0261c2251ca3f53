//! UV seam tools.
//!
//! - [`flood_fill_unseamed`] grows a selection to the UV island it lies in.
//! - [`merge_uv_seams`] rewrites the seams of an island so it unwraps as one
//!   piece: interior seams are cleared and the island outline becomes seam.
//! - [`cylinder_seam`] finds a cut line for tube-like selections so that they
//!   can unwrap flat. Candidate axes come from a principal component analysis
//!   of face centroids; for each axis the cheapest edge path between the two
//!   cap outlines is found with Dijkstra's algorithm, with costs favoring
//!   axis-aligned edges on side faces.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, VecDeque};

use nalgebra::{Matrix3, Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::mesh::{EdgeKey, FaceId, MeshIndex, MeshTopology, Selection, VertexId};

use super::boundary::extract_boundary;
use super::mark::{mark_edges, EdgeFlags, MarkMode};

/// Grow `seeds` across every edge that is not a seam.
pub fn flood_fill_unseamed<I: MeshIndex>(
    topology: &MeshTopology<I>,
    flags: &EdgeFlags<I>,
    seeds: &Selection<I>,
) -> Selection<I> {
    let mut island = seeds.clone();
    let mut queue: VecDeque<FaceId<I>> = seeds.iter().filter(|&f| topology.is_usable(f)).collect();

    while let Some(f) = queue.pop_front() {
        for &e in topology.face_edges(f) {
            if flags.is_seam(e) {
                continue;
            }
            for &n in topology.edge_faces(e) {
                if matches!(island.insert(n), Ok(true)) {
                    queue.push_back(n);
                }
            }
        }
    }
    island
}

/// Whether a cylinder seam needs a full wrap or accepts a partial one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CylinderSeamMode {
    /// Two cap outlines, or a wrap of at least 320 degrees.
    #[default]
    Full,
    /// A wrap of at least [`CylinderSeamOptions::partial_angle`].
    Partial,
}

/// Options for [`cylinder_seam`].
#[derive(Debug, Clone)]
pub struct CylinderSeamOptions {
    /// Full or partial wrap.
    pub mode: CylinderSeamMode,

    /// Minimum wrap angle (degrees) in partial mode.
    pub partial_angle: f64,

    /// Faces whose normal has `|n . axis|` below this value are side faces.
    pub cap_dot: f64,

    /// Extra cost factor for edges running across the axis.
    pub axis_weight: f64,

    /// Extra cost factor for edges touching a cap face.
    pub cap_weight: f64,
}

impl Default for CylinderSeamOptions {
    fn default() -> Self {
        Self {
            mode: CylinderSeamMode::Full,
            partial_angle: 200.0,
            cap_dot: 0.9,
            axis_weight: 0.9,
            cap_weight: 0.6,
        }
    }
}

impl CylinderSeamOptions {
    /// Set the wrap mode.
    pub fn with_mode(mut self, mode: CylinderSeamMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the partial wrap angle in degrees.
    pub fn with_partial_angle(mut self, degrees: f64) -> Self {
        self.partial_angle = degrees;
        self
    }

    /// Check the option values.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=360.0).contains(&self.partial_angle) {
            return Err(MeshError::invalid_param(
                "partial_angle",
                self.partial_angle,
                "must be between 0 and 360 degrees",
            ));
        }
        if !(0.0..=1.0).contains(&self.cap_dot) {
            return Err(MeshError::invalid_param(
                "cap_dot",
                self.cap_dot,
                "must be between 0 and 1",
            ));
        }
        if self.axis_weight < 0.0 || self.cap_weight < 0.0 {
            return Err(MeshError::invalid_param(
                "axis_weight",
                self.axis_weight.min(self.cap_weight),
                "weights must be non-negative",
            ));
        }
        Ok(())
    }

    fn full_threshold_rad(&self) -> f64 {
        320f64.max(self.partial_angle).to_radians()
    }
}

/// A seam path found by [`cylinder_seam`].
#[derive(Debug, Clone)]
pub struct CylinderSeam<I: MeshIndex = u32> {
    /// Seam edges from the lower cap to the upper cap.
    pub edges: Vec<EdgeKey<I>>,
    /// The axis the seam runs along.
    pub axis: Vector3<f64>,
    /// Total path cost.
    pub cost: f64,
    /// How far the selection wraps around the axis, in degrees.
    pub wrap_angle_deg: f64,
}

/// Find a cut line running along a tube-like selection.
///
/// Returns `Ok(None)` when the selection does not look like a tube under the
/// configured mode.
pub fn cylinder_seam<I: MeshIndex>(
    topology: &MeshTopology<I>,
    selection: &Selection<I>,
    options: &CylinderSeamOptions,
) -> Result<Option<CylinderSeam<I>>> {
    options.validate()?;

    let faces: Vec<FaceId<I>> = selection.iter().filter(|&f| topology.is_usable(f)).collect();
    if faces.len() < 2 {
        return Ok(None);
    }
    let mesh = topology.mesh();

    let internal: BTreeSet<EdgeKey<I>> = faces
        .iter()
        .flat_map(|&f| topology.face_edges(f).iter().copied())
        .filter(|&e| match topology.edge_faces(e) {
            [a, b] => selection.contains(*a) && selection.contains(*b),
            _ => false,
        })
        .collect();
    if internal.is_empty() {
        return Ok(None);
    }

    let boundary = extract_boundary(topology, selection);
    let selection_components = edge_components(&boundary);
    let center_mean = centroid_mean(topology, &faces);

    let mut best: Option<CylinderSeam<I>> = None;
    for axis in candidate_axes(topology, &faces) {
        let side: BTreeSet<FaceId<I>> = faces
            .iter()
            .copied()
            .filter(|&f| mesh.face_normal(f).dot(&axis).abs() < options.cap_dot)
            .collect();
        if side.len() < 2 {
            continue;
        }

        let components = if boundary.is_empty() {
            // Closed selection: the caps are where side faces meet cap faces.
            let cap_outline: BTreeSet<EdgeKey<I>> = internal
                .iter()
                .copied()
                .filter(|&e| match topology.edge_faces(e) {
                    [a, b] => side.contains(a) != side.contains(b),
                    _ => false,
                })
                .collect();
            edge_components(&cap_outline)
        } else {
            selection_components.clone()
        };
        if components.len() < 2 {
            continue;
        }

        let (x_axis, y_axis) = radial_frame(&axis);
        let Some(wrap) = wrap_angle(topology, &faces, &axis, &center_mean, &x_axis, &y_axis) else {
            continue;
        };
        let wraps_enough = match options.mode {
            CylinderSeamMode::Full => {
                components.len() == 2 || wrap >= options.full_threshold_rad()
            }
            CylinderSeamMode::Partial => wrap >= options.partial_angle.to_radians(),
        };
        if !wraps_enough {
            continue;
        }

        let graph = seam_graph(topology, &internal, &side, &axis, options);
        if graph.is_empty() {
            continue;
        }

        let Some((start, end)) = cap_endpoints(topology, &components, &side, &axis, &graph, options)
        else {
            continue;
        };

        if let Some((edges, cost)) = shortest_seam(&graph, &start, &end) {
            log::debug!(
                "cylinder seam candidate: axis {:?}, {} edges, cost {:.4}",
                axis,
                edges.len(),
                cost
            );
            if best.as_ref().map_or(true, |b| cost < b.cost) {
                best = Some(CylinderSeam {
                    edges,
                    axis,
                    cost,
                    wrap_angle_deg: wrap.to_degrees(),
                });
            }
        }
    }
    Ok(best)
}

fn centroid_mean<I: MeshIndex>(topology: &MeshTopology<I>, faces: &[FaceId<I>]) -> Point3<f64> {
    let sum = faces
        .iter()
        .fold(Vector3::<f64>::zeros(), |acc, &f| acc + topology.mesh().face_centroid(f).coords);
    Point3::from(sum / faces.len() as f64)
}

/// Candidate tube axes, most likely first.
///
/// The principal axes of the face centroids are ranked by how perpendicular
/// they are to the face normals; the largest and smallest variance axes
/// follow. Near-parallel duplicates are dropped.
fn candidate_axes<I: MeshIndex>(topology: &MeshTopology<I>, faces: &[FaceId<I>]) -> Vec<Vector3<f64>> {
    let mesh = topology.mesh();
    let mean = centroid_mean(topology, faces);
    let mut cov: Matrix3<f64> = Matrix3::zeros();
    for &f in faces {
        let d = mesh.face_centroid(f) - mean;
        cov += d * d.transpose();
    }

    let eigen = cov.symmetric_eigen();
    let axes: Vec<(f64, Vector3<f64>)> = (0..3)
        .filter_map(|i| {
            let v: Vector3<f64> = eigen.eigenvectors.column(i).into_owned();
            v.try_normalize(1e-6).map(|v| (eigen.eigenvalues[i], v))
        })
        .collect();
    if axes.is_empty() {
        return Vec::new();
    }

    let normals: Vec<Vector3<f64>> = faces
        .iter()
        .map(|&f| mesh.face_normal(f))
        .filter(|n| n.norm() > 1e-8)
        .collect();

    let mut ordered = Vec::new();
    if !normals.is_empty() {
        let score = |axis: &Vector3<f64>| {
            normals.iter().map(|n| n.dot(axis).abs()).sum::<f64>() / normals.len() as f64
        };
        if let Some((_, best)) = axes
            .iter()
            .min_by(|a, b| score(&a.1).partial_cmp(&score(&b.1)).unwrap_or(Ordering::Equal))
        {
            ordered.push(*best);
        }
    }
    let by_value = |a: &&(f64, Vector3<f64>), b: &&(f64, Vector3<f64>)| {
        a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal)
    };
    if let Some((_, v)) = axes.iter().max_by(by_value) {
        ordered.push(*v);
    }
    if let Some((_, v)) = axes.iter().min_by(by_value) {
        ordered.push(*v);
    }
    ordered.extend(axes.iter().map(|(_, v)| *v));

    let mut unique: Vec<Vector3<f64>> = Vec::new();
    for axis in ordered {
        if !unique.iter().any(|u| u.dot(&axis).abs() > 0.999) {
            unique.push(axis);
        }
    }
    unique
}

/// Two unit vectors spanning the plane perpendicular to `axis`.
fn radial_frame(axis: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let basis = if axis.x.abs() > 0.9 {
        Vector3::y()
    } else {
        Vector3::x()
    };
    let x_axis = axis.cross(&basis).normalize();
    let y_axis = axis.cross(&x_axis).normalize();
    (x_axis, y_axis)
}

/// Angle (radians) covered by the face centroids around `axis`: a full turn
/// minus the largest empty gap.
fn wrap_angle<I: MeshIndex>(
    topology: &MeshTopology<I>,
    faces: &[FaceId<I>],
    axis: &Vector3<f64>,
    center: &Point3<f64>,
    x_axis: &Vector3<f64>,
    y_axis: &Vector3<f64>,
) -> Option<f64> {
    let mut angles: Vec<f64> = faces
        .iter()
        .filter_map(|&f| {
            let d = topology.mesh().face_centroid(f) - center;
            let radial = (d - axis * d.dot(axis)).try_normalize(1e-6)?;
            Some(radial.dot(y_axis).atan2(radial.dot(x_axis)))
        })
        .collect();
    if angles.is_empty() {
        return None;
    }
    angles.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    angles.push(angles[0] + std::f64::consts::TAU);
    let max_gap = angles
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(0.0, f64::max);
    Some(std::f64::consts::TAU - max_gap)
}

/// Connected components of an edge set, as (edges, vertices).
fn edge_components<I: MeshIndex>(
    edges: &BTreeSet<EdgeKey<I>>,
) -> Vec<(Vec<EdgeKey<I>>, BTreeSet<VertexId<I>>)> {
    let mut by_vertex: BTreeMap<VertexId<I>, Vec<EdgeKey<I>>> = BTreeMap::new();
    for &e in edges {
        let (a, b) = e.vertices();
        by_vertex.entry(a).or_default().push(e);
        by_vertex.entry(b).or_default().push(e);
    }

    let mut seen: BTreeSet<EdgeKey<I>> = BTreeSet::new();
    let mut components = Vec::new();
    for &start in edges {
        if !seen.insert(start) {
            continue;
        }
        let mut stack = vec![start];
        let mut comp_edges = Vec::new();
        let mut comp_verts = BTreeSet::new();
        while let Some(e) = stack.pop() {
            comp_edges.push(e);
            let (a, b) = e.vertices();
            for v in [a, b] {
                comp_verts.insert(v);
                for &next in by_vertex.get(&v).map(Vec::as_slice).unwrap_or(&[]) {
                    if seen.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }
        components.push((comp_edges, comp_verts));
    }
    components
}

type SeamGraph<I> = HashMap<VertexId<I>, Vec<(VertexId<I>, f64, EdgeKey<I>)>>;

/// Weighted vertex graph over the internal edges of the selection.
fn seam_graph<I: MeshIndex>(
    topology: &MeshTopology<I>,
    internal: &BTreeSet<EdgeKey<I>>,
    side: &BTreeSet<FaceId<I>>,
    axis: &Vector3<f64>,
    options: &CylinderSeamOptions,
) -> SeamGraph<I> {
    let mesh = topology.mesh();
    let mut graph: SeamGraph<I> = HashMap::new();
    for &e in internal {
        let Some(direction) = mesh.edge_direction(e) else {
            continue;
        };
        let length = mesh.edge_length(e);
        let misalignment = 1.0 - direction.dot(axis).abs();
        let base = length * (1.0 + options.axis_weight * misalignment);

        let incident = topology.edge_faces(e);
        let align_avg = incident
            .iter()
            .map(|&f| mesh.face_normal(f).dot(axis).abs())
            .sum::<f64>()
            / incident.len() as f64;
        let penalty = if incident.iter().all(|f| side.contains(f)) {
            0.0
        } else {
            options.cap_weight * (0.25 + 0.5 * align_avg)
        };
        let cost = base + length * penalty;

        let (a, b) = e.vertices();
        graph.entry(a).or_default().push((b, cost, e));
        graph.entry(b).or_default().push((a, cost, e));
    }
    graph
}

struct ComponentInfo<I: MeshIndex> {
    projection: f64,
    alignment: f64,
    length: f64,
    verts: BTreeSet<VertexId<I>>,
}

/// Start and end vertex sets: the lowest and highest outline along the axis.
fn cap_endpoints<I: MeshIndex>(
    topology: &MeshTopology<I>,
    components: &[(Vec<EdgeKey<I>>, BTreeSet<VertexId<I>>)],
    side: &BTreeSet<FaceId<I>>,
    axis: &Vector3<f64>,
    graph: &SeamGraph<I>,
    options: &CylinderSeamOptions,
) -> Option<(BTreeSet<VertexId<I>>, BTreeSet<VertexId<I>>)> {
    let mesh = topology.mesh();
    let mut infos: Vec<ComponentInfo<I>> = components
        .iter()
        .filter_map(|(edges, verts)| {
            if edges.is_empty() || verts.is_empty() {
                return None;
            }
            let length: f64 = edges.iter().map(|&e| mesh.edge_length(e)).sum();
            let center = verts
                .iter()
                .fold(Vector3::<f64>::zeros(), |acc, &v| acc + mesh.position(v).coords)
                / verts.len() as f64;
            let alignment = edges
                .iter()
                .filter_map(|&e| mesh.edge_direction(e))
                .map(|d| d.dot(axis).abs())
                .sum::<f64>()
                / edges.len() as f64;
            let side_verts: BTreeSet<VertexId<I>> = verts
                .iter()
                .copied()
                .filter(|&v| topology.vertex_faces(v).iter().any(|f| side.contains(f)))
                .collect();
            if side_verts.is_empty() {
                return None;
            }
            Some(ComponentInfo {
                projection: center.dot(axis),
                alignment,
                length,
                verts: side_verts,
            })
        })
        .collect();
    if infos.len() < 2 {
        return None;
    }

    let max_length = infos.iter().map(|c| c.length).fold(0.0, f64::max);
    if max_length > 0.0 && infos.len() > 2 {
        infos.retain(|c| c.length >= max_length * 0.25);
        if infos.len() < 2 {
            return None;
        }
    }
    if options.mode == CylinderSeamMode::Full {
        let caps = infos.iter().filter(|c| c.alignment <= 0.45).count();
        if caps >= 2 {
            infos.retain(|c| c.alignment <= 0.45);
        }
    }

    infos.sort_by(|a, b| a.projection.partial_cmp(&b.projection).unwrap_or(Ordering::Equal));
    let in_graph = |c: &ComponentInfo<I>| -> BTreeSet<VertexId<I>> {
        c.verts.iter().copied().filter(|v| graph.contains_key(v)).collect()
    };
    let start = in_graph(infos.first()?);
    let end = in_graph(infos.last()?);
    if start.is_empty() || end.is_empty() {
        return None;
    }
    Some((start, end))
}

/// Entry in the seam search priority queue.
#[derive(Debug, Clone)]
struct SeamEntry<I: MeshIndex> {
    vertex: VertexId<I>,
    distance: f64,
}

// Min-heap ordering on distance.
impl<I: MeshIndex> PartialEq for SeamEntry<I> {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl<I: MeshIndex> Eq for SeamEntry<I> {}

impl<I: MeshIndex> PartialOrd for SeamEntry<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I: MeshIndex> Ord for SeamEntry<I> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Multi-source Dijkstra from `start` to the nearest vertex of `end`.
fn shortest_seam<I: MeshIndex>(
    graph: &SeamGraph<I>,
    start: &BTreeSet<VertexId<I>>,
    end: &BTreeSet<VertexId<I>>,
) -> Option<(Vec<EdgeKey<I>>, f64)> {
    let mut dist: HashMap<VertexId<I>, f64> = HashMap::new();
    let mut prev: HashMap<VertexId<I>, (VertexId<I>, EdgeKey<I>)> = HashMap::new();
    let mut heap = BinaryHeap::new();
    for &v in start {
        dist.insert(v, 0.0);
        heap.push(SeamEntry {
            vertex: v,
            distance: 0.0,
        });
    }

    let mut found = None;
    while let Some(SeamEntry { vertex, distance }) = heap.pop() {
        if distance > dist.get(&vertex).copied().unwrap_or(f64::INFINITY) {
            continue;
        }
        if end.contains(&vertex) {
            found = Some((vertex, distance));
            break;
        }
        for &(next, cost, edge) in graph.get(&vertex).map(Vec::as_slice).unwrap_or(&[]) {
            let candidate = distance + cost;
            if candidate < dist.get(&next).copied().unwrap_or(f64::INFINITY) {
                dist.insert(next, candidate);
                prev.insert(next, (vertex, edge));
                heap.push(SeamEntry {
                    vertex: next,
                    distance: candidate,
                });
            }
        }
    }

    let (mut current, cost) = found?;
    let mut edges = Vec::new();
    while let Some(&(p, e)) = prev.get(&current) {
        edges.push(e);
        current = p;
    }
    edges.reverse();
    Some((edges, cost))
}

/// Options for [`merge_uv_seams`].
#[derive(Debug, Clone, Default)]
pub struct UvSeamOptions {
    /// Leave edges that already are seams untouched.
    pub respect_existing_seams: bool,

    /// Also cut tube-like islands open with a cylinder seam.
    pub cylinder: Option<CylinderSeamOptions>,
}

impl UvSeamOptions {
    /// Keep or rewrite existing seams.
    pub fn with_respect_existing_seams(mut self, respect: bool) -> Self {
        self.respect_existing_seams = respect;
        self
    }

    /// Add a cylinder seam with the given options.
    pub fn with_cylinder_seam(mut self, options: CylinderSeamOptions) -> Self {
        self.cylinder = Some(options);
        self
    }
}

/// Outcome of [`merge_uv_seams`].
#[derive(Debug, Clone)]
pub struct UvSeamReport<I: MeshIndex = u32> {
    /// The island the selection grew to.
    pub island: Selection<I>,
    /// Seam flags newly set (including the cylinder seam).
    pub seams_added: usize,
    /// Seam flags cleared inside the island.
    pub seams_removed: usize,
    /// The cylinder seam, if one was requested and found.
    pub cylinder: Option<CylinderSeam<I>>,
}

/// Merge the UV islands touched by `selection` into one.
///
/// The selection is flood-filled across unseamed edges. Every edge of the
/// resulting island is then rewritten: edges inside the island lose their seam
/// flag, edges on its outline (or on the open mesh boundary) gain one.
pub fn merge_uv_seams<I: MeshIndex>(
    topology: &MeshTopology<I>,
    flags: &mut EdgeFlags<I>,
    selection: &Selection<I>,
    options: &UvSeamOptions,
) -> Result<UvSeamReport<I>> {
    if let Some(cylinder) = &options.cylinder {
        cylinder.validate()?;
    }
    let island = flood_fill_unseamed(topology, flags, selection);

    let edges: BTreeSet<EdgeKey<I>> = island
        .iter()
        .filter(|&f| topology.is_usable(f))
        .flat_map(|f| topology.face_edges(f).iter().copied())
        .collect();

    let mut added = 0;
    let mut removed = 0;
    for e in edges {
        if options.respect_existing_seams && flags.is_seam(e) {
            continue;
        }
        let incident = topology.edge_faces(e);
        let inside = incident.iter().filter(|&&f| island.contains(f)).count();
        let seam = if inside == incident.len() {
            incident.len() == 1
        } else {
            true
        };
        if seam {
            added += mark_edges(flags, [e], MarkMode::Seam);
        } else if flags.unmark(e, MarkMode::Seam) {
            removed += 1;
        }
    }

    let mut cylinder = None;
    if let Some(cyl_options) = &options.cylinder {
        cylinder = cylinder_seam(topology, &island, cyl_options)?;
        if let Some(seam) = &cylinder {
            added += mark_edges(flags, seam.edges.iter().copied(), MarkMode::Seam);
        }
    }

    log::debug!(
        "merged UV island of {} faces: {} seams added, {} removed",
        island.len(),
        added,
        removed
    );
    Ok(UvSeamReport {
        island,
        seams_added: added,
        seams_removed: removed,
        cylinder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{fixtures, PolyMesh, TopologyOptions};
    use approx::assert_relative_eq;

    fn topology(mesh: &PolyMesh) -> MeshTopology {
        MeshTopology::build(mesh, &TopologyOptions::default()).unwrap()
    }

    #[test]
    fn test_flood_fill_stops_at_seams() {
        let topo = topology(&fixtures::quad_grid(3, 1, None));
        let mut flags = EdgeFlags::new();
        // Seam between faces 1 and 2.
        mark_edges(&mut flags, [EdgeKey::from_indices(2, 6)], MarkMode::Seam);

        let seeds = Selection::from_faces(3, [FaceId::new(0)]).unwrap();
        let island = flood_fill_unseamed(&topo, &flags, &seeds);
        assert_eq!(island.to_vec(), vec![FaceId::new(0), FaceId::new(1)]);
    }

    #[test]
    fn test_merge_clears_interior_seams() {
        let topo = topology(&fixtures::quad_grid(2, 1, None));
        let mut flags = EdgeFlags::new();
        let shared = EdgeKey::from_indices(1, 4);
        mark_edges(&mut flags, [shared], MarkMode::Seam);

        let selection = Selection::all(2);
        let report = merge_uv_seams(&topo, &mut flags, &selection, &UvSeamOptions::default()).unwrap();
        assert_eq!(report.seams_removed, 1);
        assert_eq!(report.seams_added, 6);
        assert!(!flags.is_seam(shared));
        assert!(report.cylinder.is_none());
    }

    #[test]
    fn test_merge_respects_existing_seams() {
        let topo = topology(&fixtures::quad_grid(2, 1, None));
        let mut flags = EdgeFlags::new();
        let shared = EdgeKey::from_indices(1, 4);
        mark_edges(&mut flags, [shared], MarkMode::Seam);

        let options = UvSeamOptions::default().with_respect_existing_seams(true);
        let report = merge_uv_seams(&topo, &mut flags, &Selection::all(2), &options).unwrap();
        assert_eq!(report.seams_removed, 0);
        assert!(flags.is_seam(shared));
    }

    #[test]
    fn test_tube_gets_axis_aligned_seam() {
        let mesh = fixtures::tube(8, 4, 1.0, 4.0);
        let topo = topology(&mesh);
        let all = Selection::all(topo.num_faces());
        let seam = cylinder_seam(&topo, &all, &CylinderSeamOptions::default())
            .unwrap()
            .expect("tube should get a seam");

        assert_eq!(seam.edges.len(), 4);
        assert_relative_eq!(seam.axis.z.abs(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(seam.cost, 4.0, epsilon = 1e-9);
        for &e in &seam.edges {
            let d = mesh.edge_direction(e).unwrap();
            assert_relative_eq!(d.z.abs(), 1.0, epsilon = 1e-9);
        }
        // The path is connected.
        for pair in seam.edges.windows(2) {
            let (a, b) = pair[0].vertices();
            assert!(pair[1].contains(a) || pair[1].contains(b));
        }
    }

    #[test]
    fn test_flat_patch_gets_no_seam() {
        let topo = topology(&fixtures::quad_grid(4, 4, None));
        let all = Selection::all(topo.num_faces());
        let full = cylinder_seam(&topo, &all, &CylinderSeamOptions::default()).unwrap();
        assert!(full.is_none());
        let partial = CylinderSeamOptions::default().with_mode(CylinderSeamMode::Partial);
        assert!(cylinder_seam(&topo, &all, &partial).unwrap().is_none());
    }

    #[test]
    fn test_merge_with_cylinder_seam() {
        let topo = topology(&fixtures::tube(8, 4, 1.0, 4.0));
        let mut flags = EdgeFlags::new();
        let options = UvSeamOptions::default().with_cylinder_seam(CylinderSeamOptions::default());
        let seeds = Selection::from_faces(topo.num_faces(), [FaceId::new(0)]).unwrap();
        let report = merge_uv_seams(&topo, &mut flags, &seeds, &options).unwrap();

        assert_eq!(report.island.len(), 32);
        // Two open rims of 8 edges plus the 4-edge cut.
        assert_eq!(report.seams_added, 20);
        assert_eq!(flags.seams().len(), 20);
    }

    #[test]
    fn test_invalid_partial_angle() {
        let topo = topology(&fixtures::tube(8, 2, 1.0, 1.0));
        let options = CylinderSeamOptions::default().with_partial_angle(400.0);
        assert!(cylinder_seam(&topo, &Selection::all(16), &options).is_err());
    }
}

//! Finding meshes that look like copies of a reference mesh.
//!
//! Two meshes are similar when their vertex count, face count and surface
//! area each differ by at most a relative threshold. Transforms are ignored,
//! so instanced or mirrored copies of a part are found wherever they sit.

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh};
use crate::scene::MeshHost;

/// Default relative difference allowed per measure.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.2;

/// The measures compared by [`similar_meshes`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshSignature {
    /// Vertex count.
    pub vertices: usize,
    /// Face count.
    pub faces: usize,
    /// Total face area.
    pub area: f64,
}

impl MeshSignature {
    /// Measure a mesh.
    pub fn of<I: MeshIndex>(mesh: &PolyMesh<I>) -> Self {
        Self {
            vertices: mesh.num_vertices(),
            faces: mesh.num_faces(),
            area: mesh.surface_area(),
        }
    }

    /// Whether every measure of `other` is within `threshold` of `self`,
    /// relative to `self`.
    pub fn matches(&self, other: &MeshSignature, threshold: f64) -> bool {
        relative_diff(self.vertices as f64, other.vertices as f64) <= threshold
            && relative_diff(self.faces as f64, other.faces as f64) <= threshold
            && relative_diff(self.area, other.area) <= threshold
    }
}

fn relative_diff(reference: f64, value: f64) -> f64 {
    if reference == 0.0 {
        if value == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        (value - reference).abs() / reference.abs()
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(MeshError::invalid_param(
            "threshold",
            threshold,
            "must be finite and non-negative",
        ));
    }
    Ok(())
}

/// Names of the candidates similar to `reference`, in candidate order.
pub fn similar_meshes<'a, I, It>(
    reference: &PolyMesh<I>,
    candidates: It,
    threshold: f64,
) -> Result<Vec<String>>
where
    I: MeshIndex,
    It: IntoIterator<Item = (&'a str, &'a PolyMesh<I>)>,
{
    check_threshold(threshold)?;
    let signature = MeshSignature::of(reference);
    Ok(candidates
        .into_iter()
        .filter(|(_, mesh)| signature.matches(&MeshSignature::of(*mesh), threshold))
        .map(|(name, _)| name.to_string())
        .collect())
}

/// Every host object similar to the object `reference`, itself included.
pub fn select_similar<I: MeshIndex, H: MeshHost<I>>(
    host: &H,
    reference: &str,
    threshold: f64,
) -> Result<Vec<String>> {
    let mesh = host.mesh(reference).ok_or_else(|| MeshError::stale(reference))?;
    let names = host.object_names();
    let candidates = names
        .iter()
        .filter_map(|n| host.mesh(n).map(|m| (n.as_str(), m)));
    let similar = similar_meshes(mesh, candidates, threshold)?;
    log::debug!("{} meshes similar to '{}'", similar.len(), reference);
    Ok(similar)
}

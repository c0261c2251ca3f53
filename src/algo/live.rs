//! Live selection session.
//!
//! A session turns a stream of paint events into growing expanded selections,
//! one per participating mesh. Each event is processed to completion before the
//! call returns:
//!
//! 1. the touched faces join the mesh's accumulated seeds,
//! 2. the seeds are expanded (see [`expand_with`]) and unioned with the
//!    previous running selection, which never shrinks,
//! 3. the host selection is replaced by the running selection,
//! 4. with [`LiveOptions::live_unwrap_3d`], the selection outline is merged
//!    into the seams (and optionally a cylinder seam is cut) before the
//!    external unwrapper runs.
//!
//! Topology and fillet classification are cached per mesh and rebuilt only
//! when the host's snapshot revision changes. Meshes are tracked by name and
//! resolved through the [`MeshHost`] at every event.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{MeshError, Result};
use crate::mesh::{EdgeKey, FaceId, MeshIndex, MeshTopology, Selection, TopologyOptions};
use crate::scene::{MeshHost, UvUnwrapper};

use super::boundary::extract_boundary;
use super::fillet::{classify, expand_with, ExpandOptions, FilletClassification};
use super::mark::{mark_edges, merge_seams, MarkMode};
use super::seam::{cylinder_seam, CylinderSeam, CylinderSeamOptions};

/// Options for a [`LiveSelectionSession`].
#[derive(Debug, Clone, Default)]
pub struct LiveOptions {
    /// Expansion settings applied to every event.
    pub expand: ExpandOptions,

    /// Topology settings for cached snapshots.
    pub topology: TopologyOptions,

    /// Run seam updates and the external unwrapper after each event.
    pub live_unwrap_3d: bool,

    /// Merge the selection outline into the existing seams.
    pub auto_merge_seams: bool,

    /// Cut tube-like selections open with a cylinder seam.
    pub auto_cylinder_seam: bool,

    /// Settings for the cylinder seam.
    pub cylinder: CylinderSeamOptions,
}

impl LiveOptions {
    /// Set the expansion options.
    pub fn with_expand(mut self, expand: ExpandOptions) -> Self {
        self.expand = expand;
        self
    }

    /// Set the topology options.
    pub fn with_topology(mut self, topology: TopologyOptions) -> Self {
        self.topology = topology;
        self
    }

    /// Enable or disable the per-event unwrap pass.
    pub fn with_live_unwrap(mut self, enabled: bool) -> Self {
        self.live_unwrap_3d = enabled;
        self
    }

    /// Enable or disable seam merging.
    pub fn with_auto_merge_seams(mut self, enabled: bool) -> Self {
        self.auto_merge_seams = enabled;
        self
    }

    /// Enable or disable cylinder seams.
    pub fn with_auto_cylinder_seam(mut self, enabled: bool) -> Self {
        self.auto_cylinder_seam = enabled;
        self
    }

    /// Set the cylinder seam options.
    pub fn with_cylinder(mut self, cylinder: CylinderSeamOptions) -> Self {
        self.cylinder = cylinder;
        self
    }

    /// Check every nested option set.
    pub fn validate(&self) -> Result<()> {
        self.expand.validate()?;
        self.topology.validate()?;
        self.cylinder.validate()
    }
}

/// What one paint event did.
#[derive(Debug, Clone)]
pub struct PaintOutcome<I: MeshIndex = u32> {
    /// Size of the running selection after the event.
    pub selected: usize,
    /// Faces the event added to the running selection.
    pub added: usize,
    /// Touched face ids outside the mesh, dropped.
    pub ignored_faces: usize,
    /// Degenerate faces left out of the cached topology.
    pub skipped_faces: usize,
    /// Whether the cached topology had to be rebuilt.
    pub rebuilt_topology: bool,
    /// Outline of the running selection (unwrap pass only).
    pub boundary: BTreeSet<EdgeKey<I>>,
    /// Seam flags newly set (unwrap pass only).
    pub seams_added: usize,
    /// The cylinder seam cut during this event, if any.
    pub cylinder: Option<CylinderSeam<I>>,
    /// Whether the external unwrapper ran.
    pub unwrapped: bool,
}

struct CachedSnapshot<I: MeshIndex> {
    revision: u64,
    topology: MeshTopology<I>,
    classification: FilletClassification,
}

struct MeshState<I: MeshIndex> {
    seeds: BTreeSet<FaceId<I>>,
    running: Option<Selection<I>>,
    cache: Option<CachedSnapshot<I>>,
}

impl<I: MeshIndex> MeshState<I> {
    fn new() -> Self {
        Self {
            seeds: BTreeSet::new(),
            running: None,
            cache: None,
        }
    }
}

/// Incremental selection controller for interactive painting.
///
/// The session is either inactive or active over a fixed set of mesh names.
/// Stopping it leaves host selections and seams as they are.
pub struct LiveSelectionSession<I: MeshIndex = u32> {
    options: LiveOptions,
    meshes: BTreeMap<String, MeshState<I>>,
    active: bool,
}

impl<I: MeshIndex> LiveSelectionSession<I> {
    /// Create an inactive session.
    pub fn new(options: LiveOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            meshes: BTreeMap::new(),
            active: false,
        })
    }

    /// The session options.
    pub fn options(&self) -> &LiveOptions {
        &self.options
    }

    /// Whether a session is running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Names of the participating meshes, ascending.
    pub fn participants(&self) -> Vec<&str> {
        self.meshes.keys().map(String::as_str).collect()
    }

    /// The running selection of a participating mesh.
    pub fn running_selection(&self, name: &str) -> Option<&Selection<I>> {
        self.meshes.get(name).and_then(|s| s.running.as_ref())
    }

    /// Start a session over `names`, stopping any session already running.
    pub fn start<N>(&mut self, names: N)
    where
        N: IntoIterator,
        N::Item: Into<String>,
    {
        if self.active {
            self.stop();
        }
        self.meshes = names
            .into_iter()
            .map(|n| (n.into(), MeshState::new()))
            .collect();
        self.active = true;
        log::info!("live selection started on {} meshes", self.meshes.len());
    }

    /// Stop the session. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        let was_active = self.active;
        if was_active {
            log::info!("live selection stopped");
        }
        self.active = false;
        self.meshes.clear();
        was_active
    }

    /// Process one paint event on `name`.
    ///
    /// Errors affect this event only; the session stays active.
    pub fn on_paint_event<H, U>(
        &mut self,
        host: &mut H,
        unwrapper: &mut U,
        name: &str,
        touched: &[FaceId<I>],
    ) -> Result<PaintOutcome<I>>
    where
        H: MeshHost<I>,
        U: UvUnwrapper<I>,
    {
        if !self.active {
            return Err(MeshError::SessionInactive);
        }
        let options = &self.options;
        let state = self
            .meshes
            .get_mut(name)
            .ok_or_else(|| MeshError::UnknownMesh {
                name: name.to_string(),
            })?;
        let mesh = host.mesh(name).ok_or_else(|| MeshError::stale(name))?;

        // ==================== Snapshot cache ====================

        let stale_cache = state.cache.as_ref().map_or(true, |c| {
            c.revision != mesh.revision() || c.topology.num_faces() != mesh.num_faces()
        });
        if stale_cache {
            let topology = MeshTopology::build(mesh, &options.topology)?;
            let classification = classify(&topology, &options.expand)?;
            log::debug!(
                "live cache for '{}' rebuilt at revision {}",
                name,
                mesh.revision()
            );
            let num_faces = topology.num_faces();
            state.seeds.retain(|f| f.index() < num_faces);
            if state.running.as_ref().map_or(false, |r| r.num_faces() != num_faces) {
                state.running = None;
            }
            state.cache = Some(CachedSnapshot {
                revision: mesh.revision(),
                topology,
                classification,
            });
        }
        let Some(cache) = state.cache.as_ref() else {
            return Err(MeshError::stale(name));
        };
        let topology = &cache.topology;
        let num_faces = topology.num_faces();

        // ==================== Expansion ====================

        let (touched_sel, ignored) =
            Selection::from_faces_lossy(num_faces, touched.iter().copied());
        if ignored > 0 {
            log::warn!("ignored {} out-of-range faces painted on '{}'", ignored, name);
        }
        state.seeds.extend(touched_sel.iter());

        let seeds = Selection::from_faces(num_faces, state.seeds.iter().copied())?;
        let mut running = expand_with(topology, &cache.classification, &seeds, &options.expand)?;
        let before = state.running.as_ref().map_or(0, Selection::len);
        if let Some(prior) = &state.running {
            running.union_with(prior)?;
        }
        let added = running.len() - before;

        host.set_selection(name, running.clone())?;
        state.running = Some(running.clone());

        let mut outcome = PaintOutcome {
            selected: running.len(),
            added,
            ignored_faces: ignored,
            skipped_faces: topology.skipped_faces(),
            rebuilt_topology: stale_cache,
            boundary: BTreeSet::new(),
            seams_added: 0,
            cylinder: None,
            unwrapped: false,
        };

        // ==================== Seams and unwrap ====================

        if options.live_unwrap_3d && !running.is_empty() {
            let boundary = extract_boundary(topology, &running);
            let flags = host.edge_flags_mut(name).ok_or_else(|| MeshError::stale(name))?;

            if options.auto_merge_seams {
                let before = flags.seams().len();
                let merged = merge_seams(flags.seams(), &boundary);
                outcome.seams_added += merged.len() - before;
                flags.set_seams(merged);
            }
            if options.auto_cylinder_seam {
                outcome.cylinder = cylinder_seam(topology, &running, &options.cylinder)?;
                if let Some(seam) = &outcome.cylinder {
                    outcome.seams_added +=
                        mark_edges(flags, seam.edges.iter().copied(), MarkMode::Seam);
                }
            }

            unwrapper.unwrap(name, &running, flags.seams())?;
            outcome.boundary = boundary;
            outcome.unwrapped = true;
        }

        log::debug!(
            "paint on '{}': {} selected (+{}), {} ignored",
            name,
            outcome.selected,
            outcome.added,
            outcome.ignored_faces
        );
        Ok(outcome)
    }
}

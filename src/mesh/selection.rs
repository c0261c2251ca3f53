//! Face selections scoped to one mesh.

use std::fmt;
use std::marker::PhantomData;

use super::index::{FaceId, MeshIndex};
use crate::error::{MeshError, Result};

/// A set of faces of one mesh.
///
/// Every member is a valid face index of the mesh the selection was created
/// for; inserting anything else fails with [`MeshError::InvalidFaceIndex`].
/// Iteration is always in ascending face order.
#[derive(Clone, PartialEq, Eq)]
pub struct Selection<I: MeshIndex = u32> {
    bits: Vec<bool>,
    count: usize,
    _index: PhantomData<I>,
}

impl<I: MeshIndex> Selection<I> {
    /// An empty selection over a mesh with `num_faces` faces.
    pub fn new(num_faces: usize) -> Self {
        Self {
            bits: vec![false; num_faces],
            count: 0,
            _index: PhantomData,
        }
    }

    /// A selection containing every face.
    pub fn all(num_faces: usize) -> Self {
        Self {
            bits: vec![true; num_faces],
            count: num_faces,
            _index: PhantomData,
        }
    }

    /// Build a selection from face ids, rejecting any out-of-range id.
    pub fn from_faces<It>(num_faces: usize, faces: It) -> Result<Self>
    where
        It: IntoIterator<Item = FaceId<I>>,
    {
        let mut sel = Self::new(num_faces);
        for f in faces {
            sel.insert(f)?;
        }
        Ok(sel)
    }

    /// Build a selection from face ids, dropping out-of-range ids.
    ///
    /// Returns the selection and the number of ids dropped.
    pub fn from_faces_lossy<It>(num_faces: usize, faces: It) -> (Self, usize)
    where
        It: IntoIterator<Item = FaceId<I>>,
    {
        let mut sel = Self::new(num_faces);
        let mut ignored = 0;
        for f in faces {
            if sel.insert(f).is_err() {
                ignored += 1;
            }
        }
        (sel, ignored)
    }

    /// Number of faces of the mesh this selection belongs to.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.bits.len()
    }

    /// Number of selected faces.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether nothing is selected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether `f` is selected. Out-of-range ids are never selected.
    #[inline]
    pub fn contains(&self, f: FaceId<I>) -> bool {
        f.is_valid() && self.bits.get(f.index()).copied().unwrap_or(false)
    }

    /// Select a face. Returns whether it was newly added.
    pub fn insert(&mut self, f: FaceId<I>) -> Result<bool> {
        if !f.is_valid() || f.index() >= self.bits.len() {
            return Err(MeshError::InvalidFaceIndex {
                face: f.index(),
                num_faces: self.bits.len(),
            });
        }
        let slot = &mut self.bits[f.index()];
        if *slot {
            return Ok(false);
        }
        *slot = true;
        self.count += 1;
        Ok(true)
    }

    /// Deselect a face. Returns whether it was selected.
    pub fn remove(&mut self, f: FaceId<I>) -> bool {
        if !self.contains(f) {
            return false;
        }
        self.bits[f.index()] = false;
        self.count -= 1;
        true
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|b| *b = false);
        self.count = 0;
    }

    /// Add every face of `other`, which must belong to a mesh of the same size.
    pub fn union_with(&mut self, other: &Selection<I>) -> Result<()> {
        if other.num_faces() != self.num_faces() {
            return Err(MeshError::invalid_param(
                "selection",
                other.num_faces(),
                "face count differs from the target selection",
            ));
        }
        for (slot, &b) in self.bits.iter_mut().zip(&other.bits) {
            if b && !*slot {
                *slot = true;
                self.count += 1;
            }
        }
        Ok(())
    }

    /// Whether every face of `other` is also in `self`.
    pub fn is_superset(&self, other: &Selection<I>) -> bool {
        other.iter().all(|f| self.contains(f))
    }

    /// Selected faces in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| FaceId::new(i))
    }

    /// Selected faces as a vector, ascending.
    pub fn to_vec(&self) -> Vec<FaceId<I>> {
        self.iter().collect()
    }
}

impl<I: MeshIndex> fmt::Debug for Selection<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

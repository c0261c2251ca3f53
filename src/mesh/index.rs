//! Index types for mesh elements.
//!
//! This module provides type-safe index wrappers for vertices and faces, an
//! unordered [`EdgeKey`] for derived edges, and the opaque [`GroupId`] that a
//! CAD exporter attaches to every face of one surface patch.
//!
//! Vertex and face indices are generic over the underlying integer type to
//! support meshes of different sizes (u16 for small meshes, u32 for typical
//! meshes, u64 for massive meshes).

use std::fmt::{self, Debug};
use std::hash::Hash;

/// Trait for types that can be used as mesh indices.
///
/// This trait is implemented for `u16`, `u32`, and `u64`, allowing users to choose
/// the appropriate index size for their mesh.
pub trait MeshIndex:
    Copy + Clone + Eq + PartialEq + Ord + PartialOrd + Hash + Debug + Send + Sync + 'static
{
    /// The maximum valid index value.
    const MAX: Self;

    /// A sentinel value representing an invalid/null index.
    const INVALID: Self;

    /// Convert from usize to this index type.
    ///
    /// # Panics
    /// Panics in debug builds if the value is too large for this index type.
    fn from_usize(v: usize) -> Self;

    /// Convert to usize.
    fn to_usize(self) -> usize;

    /// Check if this is a valid (non-sentinel) index.
    fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

macro_rules! impl_mesh_index {
    ($t:ty) => {
        impl MeshIndex for $t {
            const MAX: Self = <$t>::MAX - 1;
            const INVALID: Self = <$t>::MAX;

            #[inline]
            fn from_usize(v: usize) -> Self {
                debug_assert!(
                    v as u128 <= Self::MAX as u128,
                    "index {} too large for {}",
                    v,
                    stringify!($t)
                );
                v as $t
            }

            #[inline]
            fn to_usize(self) -> usize {
                self as usize
            }
        }
    };
}

impl_mesh_index!(u16);
impl_mesh_index!(u32);
impl_mesh_index!(u64);

/// A type-safe vertex index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId<I: MeshIndex = u32>(I);

/// A type-safe face index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId<I: MeshIndex = u32>(I);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl<I: MeshIndex> $name<I> {
            /// Create a new index from a raw value.
            #[inline]
            pub fn new(index: usize) -> Self {
                Self(I::from_usize(index))
            }

            /// Create an invalid/null index.
            #[inline]
            pub fn invalid() -> Self {
                Self(I::INVALID)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0.to_usize()
            }

            /// Check if this is a valid (non-null) index.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0.is_valid()
            }
        }

        impl<I: MeshIndex> Debug for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.index())
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl<I: MeshIndex> Default for $name<I> {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl<I: MeshIndex> From<usize> for $name<I> {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(VertexId, "V");
impl_index_type!(FaceId, "F");

/// Identifier of the CAD surface a face came from.
///
/// The value is whatever the exporter wrote; it carries no ordering meaning
/// beyond being stable for one mesh snapshot.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct GroupId(u64);

impl GroupId {
    /// Wrap a raw exporter face id.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw exporter face id.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G({})", self.0)
    }
}

impl From<u64> for GroupId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// An undirected edge, identified by its two end vertices.
///
/// Edges are never stored on the mesh; they are derived from face sides. The
/// two vertices are kept sorted so `EdgeKey::new(a, b) == EdgeKey::new(b, a)`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EdgeKey<I: MeshIndex = u32> {
    lo: VertexId<I>,
    hi: VertexId<I>,
}

impl<I: MeshIndex> EdgeKey<I> {
    /// Create an edge between `a` and `b` in either order.
    #[inline]
    pub fn new(a: VertexId<I>, b: VertexId<I>) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// Create an edge from raw vertex indices.
    #[inline]
    pub fn from_indices(a: usize, b: usize) -> Self {
        Self::new(VertexId::new(a), VertexId::new(b))
    }

    /// The two end vertices, smaller index first.
    #[inline]
    pub fn vertices(self) -> (VertexId<I>, VertexId<I>) {
        (self.lo, self.hi)
    }

    /// Whether `v` is one of the end vertices.
    #[inline]
    pub fn contains(self, v: VertexId<I>) -> bool {
        self.lo == v || self.hi == v
    }
}

impl<I: MeshIndex> Debug for EdgeKey<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E({}-{})", self.lo.index(), self.hi.index())
    }
}

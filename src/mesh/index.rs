//! Index types for mesh elements.
//!
//! Points and triangles are addressed by type-safe wrappers around `u32` so
//! that a point index can never be passed where a triangle index is expected.

use std::fmt::{self, Debug};

/// A type-safe point (vertex) index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct PointId(u32);

/// A type-safe triangle index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TriangleId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a raw value.
            ///
            /// # Panics
            /// Panics in debug builds if the value does not fit into `u32`.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index <= u32::MAX as usize, "index {} too large", index);
                Self(index as u32)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $display, self.0)
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(PointId, "P");
impl_index_type!(TriangleId, "T");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id() {
        let p = PointId::new(42);
        assert_eq!(p.index(), 42);
        assert_eq!(PointId::from(42), p);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", PointId::new(7)), "P(7)");
        assert_eq!(format!("{:?}", TriangleId::new(3)), "T(3)");
    }
}

//! `matview` exposes rectangular regions of dense matrices (blocks, rows,
//! columns and corners) as first-class, zero-copy views.
//!
//! A view never owns the data it addresses: reads and writes go straight to
//! the parent's storage. Two view families cover the two kinds of parents:
//!
//! - [`MatRef`]/[`MatMut`] address the region through a base pointer and
//!   row/column strides. They are produced by the inherent factories of the
//!   dense types ([`Mat`], [`MatRef`], [`MatMut`]), which all have direct
//!   storage access.
//! - [`BlockRef`]/[`BlockMut`] delegate every access to the parent's own
//!   accessor, translated by the view's offsets. They are produced by the
//!   [`MatrixExt`]/[`MatrixMutExt`] factories available on any [`Matrix`]
//!   implementor.
//!
//! Either family can mix compile-time ([`Fixed`]) and runtime (`usize`)
//! extents per axis, and both support scalar and SIMD packet access.
//!
//! # Example
//!
//! ```
//! use matview::mat;
//!
//! let mut m = mat![
//!     [1.0, 5.0, 9.0],
//!     [2.0, 6.0, 10.0],
//!     [3.0, 7.0, 11.0],
//!     [4.0, 8.0, 12.0f64],
//! ];
//!
//! let sub = m.block(2, 1, 2, 2);
//! assert_eq!(sub.at(0, 0), &7.0);
//! assert_eq!(sub.at(1, 1), &12.0);
//!
//! let mut col = m.col_mut(2);
//! *col.at_mut(0, 0) = -9.0;
//! assert_eq!(m[(0, 2)], -9.0);
//! ```
//!
//! All precondition violations (out-of-range offsets, extents that do not
//! fit, fixed/runtime extent mismatches) panic at construction; accesses
//! through a successfully constructed view perform no further range checks on
//! the `unsafe` paths and a plain bound check on the safe ones.

#![allow(clippy::too_many_arguments)]

use equator::assert;

pub mod block;
pub mod mat;
pub mod shape;
pub mod simd;
pub mod traits;

pub use block::{BlockMut, BlockRef};
pub use mat::{Mat, MatMut, MatRef};
pub use shape::{Extent, Fixed, FixedExtent, Flags};
pub use simd::SimdElem;
pub use traits::{
    DirectAccess, Matrix, MatrixExt, MatrixMut, MatrixMutExt, PacketAccess, PacketAccessMut,
};

pub use reborrow;
pub use reborrow::{IntoConst, Reborrow, ReborrowMut};

/// One of the four rectangular regions anchored at a matrix's extremities.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Corner {
    /// Anchored at `(0, 0)`.
    TopLeft,
    /// Anchored at `(0, ncols - w)`.
    TopRight,
    /// Anchored at `(nrows - h, 0)`.
    BottomLeft,
    /// Anchored at `(nrows - h, ncols - w)`.
    BottomRight,
}

impl Corner {
    /// Returns the `(start_row, start_col)` of an `h×w` region anchored at
    /// `self` within an `nrows×ncols` parent.
    ///
    /// # Panics
    /// Panics if the region does not fit within the parent.
    #[inline]
    #[track_caller]
    pub fn start(self, nrows: usize, ncols: usize, h: usize, w: usize) -> (usize, usize) {
        assert!(all(h <= nrows, w <= ncols));
        match self {
            Corner::TopLeft => (0, 0),
            Corner::TopRight => (0, ncols - w),
            Corner::BottomLeft => (nrows - h, 0),
            Corner::BottomRight => (nrows - h, ncols - w),
        }
    }
}

#[doc(hidden)]
#[inline(always)]
pub fn ref_to_ptr<T>(ptr: &T) -> *const T {
    ptr
}

#[macro_export]
#[doc(hidden)]
macro_rules! __transpose_impl {
    ([$([$($col:expr),*])*] $($v:expr;)* ) => {
        [$([$($col,)*],)* [$($v,)*]]
    };
    ([$([$($col:expr),*])*] $($v0:expr, $($v:expr),* ;)*) => {
        $crate::__transpose_impl!([$([$($col),*])* [$($v0),*]] $($($v),* ;)*)
    };
}

/// Returns a [`Mat`] containing the arguments, row by row.
///
/// # Example
///
/// ```
/// use matview::mat;
///
/// let m = mat![
///     [0.0, 3.0, 6.0],
///     [1.0, 4.0, 7.0],
///     [2.0, 5.0, 8.0f64],
/// ];
///
/// assert_eq!(m[(0, 1)], 3.0);
/// assert_eq!(m[(2, 2)], 8.0);
/// ```
#[macro_export]
macro_rules! mat {
    () => {
        {
            compile_error!("number of columns in the matrix is ambiguous");
        }
    };

    ($([$($v:expr),* $(,)?] ),* $(,)?) => {
        {
            let data = ::core::mem::ManuallyDrop::new($crate::__transpose_impl!([] $($($v),* ;)*));
            let data = &*data;
            let ncols = data.len();
            let nrows = (*data.get(0).unwrap()).len();

            #[allow(unused_unsafe)]
            unsafe {
                $crate::Mat::<_>::from_fn(nrows, ncols, |i, j| $crate::ref_to_ptr(&data[j][i]).read())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    #[test]
    fn test_mat_macro() {
        let m = mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0f64]];
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 3);
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(m[(i, j)], (3 * i + j + 1) as f64);
            }
        }
    }

    #[test]
    fn test_corner_start() {
        assert_eq!(Corner::TopLeft.start(4, 5, 2, 3), (0, 0));
        assert_eq!(Corner::TopRight.start(4, 5, 2, 3), (0, 2));
        assert_eq!(Corner::BottomLeft.start(4, 5, 2, 3), (2, 0));
        assert_eq!(Corner::BottomRight.start(4, 5, 2, 3), (2, 2));
    }

    #[test]
    #[should_panic]
    fn test_corner_too_large() {
        let _ = Corner::BottomRight.start(4, 5, 5, 3);
    }

    #[test]
    fn test_corner_block_equivalence() {
        let m = Mat::from_fn(5, 6, |i, j| (10 * i + j) as f64);
        let (rows, cols) = (m.nrows(), m.ncols());

        for (h, w) in [(0, 0), (1, 3), (2, 2), (5, 6)] {
            let pairs = [
                (Corner::TopLeft, (0, 0)),
                (Corner::TopRight, (0, cols - w)),
                (Corner::BottomLeft, (rows - h, 0)),
                (Corner::BottomRight, (rows - h, cols - w)),
            ];
            for (corner, (r, c)) in pairs {
                let a = m.corner(corner, h, w);
                let b = m.block(r, c, h, w);
                assert!(a == b);
            }
        }
    }
}

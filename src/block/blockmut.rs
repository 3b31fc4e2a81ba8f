use crate::block::BlockRef;
use crate::mat::Mat;
use crate::shape::{Extent, Fixed, FixedExtent, Flags};
use crate::simd::{lanes, Packet, SimdElem};
use crate::traits::{DirectAccess, Matrix, MatrixMut, PacketAccess, PacketAccessMut};
use equator::{assert, debug_assert};
use pulp::Simd;
use reborrow::{IntoConst, Reborrow, ReborrowMut};

/// Mutable counterpart of [`BlockRef`]: a view over a rectangular region of
/// a parent matrix that forwards reads and writes to the parent's accessors.
///
/// Writes go to the parent held by the view. When `M` is `&mut P` they land
/// in the original matrix; when `M` is a by-value parent they land in the
/// view's own copy of it.
pub struct BlockMut<M, R: Extent = usize, C: Extent = usize> {
    pub(super) parent: M,
    pub(super) start_row: usize,
    pub(super) start_col: usize,
    pub(super) nrows: R,
    pub(super) ncols: C,
}

impl<'short, M: Matrix, R: Extent, C: Extent> Reborrow<'short> for BlockMut<M, R, C> {
    type Target = BlockRef<&'short M, R, C>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        BlockRef {
            parent: &self.parent,
            start_row: self.start_row,
            start_col: self.start_col,
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<'short, M: Matrix, R: Extent, C: Extent> ReborrowMut<'short> for BlockMut<M, R, C> {
    type Target = BlockMut<&'short mut M, R, C>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        BlockMut {
            parent: &mut self.parent,
            start_row: self.start_row,
            start_col: self.start_col,
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<M: Matrix, R: Extent, C: Extent> IntoConst for BlockMut<M, R, C> {
    type Target = BlockRef<M, R, C>;

    #[inline]
    fn into_const(self) -> Self::Target {
        BlockRef {
            parent: self.parent,
            start_row: self.start_row,
            start_col: self.start_col,
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<M: MatrixMut, R: Extent, C: Extent> BlockMut<M, R, C> {
    /// `true` if the view is statically a single row.
    pub const IS_ROW: bool = matches!(R::STATIC, Some(1));
    /// `true` if the view is statically a single column.
    pub const IS_COL: bool = matches!(C::STATIC, Some(1));
    /// `true` if the view is statically a single row or a single column.
    pub const IS_VECTOR: bool = Self::IS_ROW || Self::IS_COL;

    /// Creates a mutable view over the block of `parent` starting at
    /// `(start_row, start_col)` with dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    /// Panics if an extent with a compile-time length does not match the
    /// corresponding dimension, or if the block does not fit within the
    /// parent.
    #[track_caller]
    pub fn new(parent: M, start_row: usize, start_col: usize, nrows: usize, ncols: usize) -> Self {
        let rows = R::from_size(nrows);
        let cols = C::from_size(ncols);
        assert!(all(
            start_row <= parent.nrows(),
            start_col <= parent.ncols(),
            nrows <= parent.nrows() - start_row,
            ncols <= parent.ncols() - start_col,
        ));
        Self {
            parent,
            start_row,
            start_col,
            nrows: rows,
            ncols: cols,
        }
    }

    /// Creates a mutable view over the block of `parent` starting at
    /// `(start_row, start_col)`, with dimensions taken from the compile-time
    /// extents.
    ///
    /// # Panics
    /// Panics if the block does not fit within the parent.
    #[track_caller]
    pub fn new_fixed(parent: M, start_row: usize, start_col: usize) -> Self
    where
        R: FixedExtent,
        C: FixedExtent,
    {
        const { core::assert!(R::SIZE >= 1 && C::SIZE >= 1) };
        Self::new(parent, start_row, start_col, R::SIZE, C::SIZE)
    }

    /// Returns the number of rows of the view.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows.size()
    }

    /// Returns the number of columns of the view.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols.size()
    }

    /// Returns a reference to the element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
    #[inline]
    #[track_caller]
    pub fn at(&self, row: usize, col: usize) -> &M::Elem {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe {
            self.parent
                .coeff_unchecked(row + self.start_row, col + self.start_col)
        }
    }

    /// Returns a mutable reference to the element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
    #[inline]
    #[track_caller]
    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut M::Elem {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { self.at_mut_unchecked(row, col) }
    }

    /// Returns a mutable reference to the element at `(row, col)` without
    /// bound checks.
    ///
    /// # Safety
    /// Requires `row < self.nrows()` and `col < self.ncols()`.
    #[inline]
    pub unsafe fn at_mut_unchecked(&mut self, row: usize, col: usize) -> &mut M::Elem {
        debug_assert!(all(row < self.nrows(), col < self.ncols()));
        self.parent
            .coeff_mut_unchecked(row + self.start_row, col + self.start_col)
    }

    /// Returns a mutable reference to the element at `index` along a vector
    /// view: a single row is indexed by column, a single column by row. Only
    /// compiles for views that are statically a single row or column.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn at_linear_mut(&mut self, index: usize) -> &mut M::Elem {
        const { core::assert!(Self::IS_VECTOR) };
        if Self::IS_ROW {
            self.at_mut(0, index)
        } else {
            self.at_mut(index, 0)
        }
    }

    /// Fills the view with clones of `value`.
    #[inline]
    pub fn fill(&mut self, value: M::Elem)
    where
        M::Elem: Clone,
    {
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                unsafe { *self.at_mut_unchecked(i, j) = value.clone() };
            }
        }
    }

    /// Copies the elements of `src` into the view.
    ///
    /// # Panics
    /// Panics if `src` does not have the same dimensions as the view.
    #[inline]
    #[track_caller]
    pub fn copy_from(&mut self, src: impl Matrix<Elem = M::Elem>)
    where
        M::Elem: Clone,
    {
        assert!(all(src.nrows() == self.nrows(), src.ncols() == self.ncols()));
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                unsafe { *self.at_mut_unchecked(i, j) = src.coeff_unchecked(i, j).clone() };
            }
        }
    }

    /// Copies the viewed region into a freshly allocated [`Mat`].
    pub fn to_mat(&self) -> Mat<M::Elem>
    where
        M::Elem: Clone,
    {
        self.rb().to_mat()
    }
}

impl<M: MatrixMut + PacketAccessMut, R: Extent, C: Extent> BlockMut<M, R, C>
where
    M::Elem: SimdElem,
{
    /// Stores one packet starting at `index` along a vector view. Only
    /// compiles for views whose capability flags include both packet and
    /// linear access.
    ///
    /// # Safety
    /// Same contract as [`BlockRef::packet_linear`].
    #[inline]
    pub unsafe fn write_packet_linear<S: Simd>(
        &mut self,
        simd: S,
        index: usize,
        value: Packet<M::Elem, S>,
    ) {
        const {
            core::assert!(
                <Self as Matrix>::FLAGS.contains(Flags::PACKET)
                    && <Self as Matrix>::FLAGS.contains(Flags::LINEAR)
            )
        };
        debug_assert!(index + lanes::<M::Elem, S>() <= self.nrows() * self.ncols());
        if Self::IS_ROW {
            self.parent
                .write_packet::<S, false>(simd, self.start_row, index + self.start_col, value)
        } else {
            self.parent
                .write_packet::<S, false>(simd, index + self.start_row, self.start_col, value)
        }
    }
}

impl<M: MatrixMut, R: Extent, C: Extent> Matrix for BlockMut<M, R, C> {
    type Elem = M::Elem;

    const ROWS: Option<usize> = <BlockRef<M, R, C> as Matrix>::ROWS;
    const COLS: Option<usize> = <BlockRef<M, R, C> as Matrix>::COLS;
    const MAX_ROWS: Option<usize> = <BlockRef<M, R, C> as Matrix>::MAX_ROWS;
    const MAX_COLS: Option<usize> = <BlockRef<M, R, C> as Matrix>::MAX_COLS;
    const FLAGS: Flags = <BlockRef<M, R, C> as Matrix>::FLAGS;

    #[inline(always)]
    fn nrows(&self) -> usize {
        self.nrows.size()
    }

    #[inline(always)]
    fn ncols(&self) -> usize {
        self.ncols.size()
    }

    #[inline(always)]
    #[track_caller]
    fn coeff(&self, row: usize, col: usize) -> &M::Elem {
        self.at(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &M::Elem {
        self.parent
            .coeff_unchecked(row + self.start_row, col + self.start_col)
    }
}

impl<M: MatrixMut, R: Extent, C: Extent> MatrixMut for BlockMut<M, R, C> {
    #[inline(always)]
    #[track_caller]
    fn coeff_mut(&mut self, row: usize, col: usize) -> &mut M::Elem {
        self.at_mut(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_mut_unchecked(&mut self, row: usize, col: usize) -> &mut M::Elem {
        self.at_mut_unchecked(row, col)
    }
}

unsafe impl<M: MatrixMut + DirectAccess, R: Extent, C: Extent> DirectAccess for BlockMut<M, R, C> {
    #[inline(always)]
    fn as_ptr(&self) -> *const M::Elem {
        self.parent.as_ptr().wrapping_offset(
            self.start_row as isize * self.parent.row_stride()
                + self.start_col as isize * self.parent.col_stride(),
        )
    }

    #[inline(always)]
    fn row_stride(&self) -> isize {
        self.parent.row_stride()
    }

    #[inline(always)]
    fn col_stride(&self) -> isize {
        self.parent.col_stride()
    }
}

impl<M: MatrixMut + PacketAccess, R: Extent, C: Extent> PacketAccess for BlockMut<M, R, C>
where
    M::Elem: SimdElem,
{
    #[inline(always)]
    unsafe fn packet<S: Simd, const ALIGNED: bool>(
        &self,
        simd: S,
        row: usize,
        col: usize,
    ) -> Packet<M::Elem, S> {
        self.parent
            .packet::<S, false>(simd, row + self.start_row, col + self.start_col)
    }
}

impl<M: MatrixMut + PacketAccessMut, R: Extent, C: Extent> PacketAccessMut for BlockMut<M, R, C>
where
    M::Elem: SimdElem,
{
    #[inline(always)]
    unsafe fn write_packet<S: Simd, const ALIGNED: bool>(
        &mut self,
        simd: S,
        row: usize,
        col: usize,
        value: Packet<M::Elem, S>,
    ) {
        self.parent
            .write_packet::<S, false>(simd, row + self.start_row, col + self.start_col, value)
    }
}

impl<M: MatrixMut, R: Extent, C: Extent> core::fmt::Debug for BlockMut<M, R, C>
where
    M::Elem: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.rb().fmt(f)
    }
}

impl<M: MatrixMut, C: Extent> BlockMut<M, Fixed<1>, C> {
    /// Creates a mutable view over the `i`-th row of `parent`.
    ///
    /// See [`BlockRef::from_row`] for the role of the column extent.
    ///
    /// # Panics
    /// Panics if `i >= parent.nrows()`, or if a fixed column extent does not
    /// match `parent.ncols()`.
    #[track_caller]
    pub fn from_row(parent: M, i: usize) -> Self {
        assert!(i < parent.nrows());
        let ncols = C::from_size(parent.ncols());
        Self {
            parent,
            start_row: i,
            start_col: 0,
            nrows: Fixed,
            ncols,
        }
    }
}

impl<M: MatrixMut, R: Extent> BlockMut<M, R, Fixed<1>> {
    /// Creates a mutable view over the `j`-th column of `parent`.
    ///
    /// See [`BlockRef::from_col`] for the role of the row extent.
    ///
    /// # Panics
    /// Panics if `j >= parent.ncols()`, or if a fixed row extent does not
    /// match `parent.nrows()`.
    #[track_caller]
    pub fn from_col(parent: M, j: usize) -> Self {
        assert!(j < parent.ncols());
        let nrows = R::from_size(parent.nrows());
        Self {
            parent,
            start_row: 0,
            start_col: j,
            nrows,
            ncols: Fixed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use crate::traits::MatrixMutExt;
    use crate::{mat, Corner, Mat};

    #[test]
    fn test_write_through_borrowed_parent() {
        let mut m = mat![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0f64]];

        let mut b = MatrixMutExt::block_mut(&mut m, 1, 0, 2, 2);
        *b.at_mut(0, 0) = -2.0;
        *b.at_mut(1, 1) = -6.0;

        // writes land in the original matrix
        assert_eq!(m[(1, 0)], -2.0);
        assert_eq!(m[(2, 1)], -6.0);
        assert_eq!(m[(0, 0)], 1.0);
    }

    #[test]
    fn test_write_through_owned_parent() {
        let m = mat![[1.0, 2.0], [3.0, 4.0f64]];

        // the view owns a copy of the parent: writes stay in the view
        let mut b = BlockMut::<Mat<f64>>::new(m.clone(), 0, 0, 2, 2);
        *b.at_mut(0, 0) = -1.0;

        assert_eq!(*b.at(0, 0), -1.0);
        assert_eq!(m[(0, 0)], 1.0);
    }

    #[test]
    fn test_linear_write() {
        let mut m = Mat::full(3, 4, 0i32);

        let mut row = MatrixMutExt::row_mut(&mut m, 1);
        for j in 0..4 {
            *row.at_linear_mut(j) = 1 + j as i32;
        }
        let mut col = MatrixMutExt::col_mut(&mut m, 0);
        for i in 0..3 {
            *col.at_linear_mut(i) = 10 + i as i32;
        }

        assert_eq!(m[(1, 0)], 11);
        assert_eq!(m[(1, 3)], 4);
        assert_eq!(m[(0, 0)], 10);
    }

    #[test]
    fn test_fill_and_copy_from() {
        let mut m = Mat::from_fn(4, 4, |i, j| (10 * i + j) as i32);
        let src = Mat::full(2, 2, -1);

        MatrixMutExt::corner_mut(&mut m, Corner::TopRight, 2, 2).fill(0);
        assert_eq!(m[(0, 2)], 0);
        assert_eq!(m[(1, 3)], 0);
        assert_eq!(m[(0, 0)], 0);

        MatrixMutExt::block_mut(&mut m, 2, 0, 2, 2).copy_from(src.as_ref());
        assert_eq!(m[(2, 0)], -1);
        assert_eq!(m[(3, 1)], -1);
        assert_eq!(m[(1, 0)], 10);
    }

    #[test]
    fn test_reborrow() {
        let mut m = mat![[1.0, 2.0], [3.0, 4.0f64]];
        let mut view = MatrixMutExt::fixed_block_mut::<2, 1>(&mut m, 0, 1);

        {
            let r = view.rb();
            assert_eq!(*r.at(1, 0), 4.0);
        }
        {
            let mut v = view.rb_mut();
            *v.at_linear_mut(0) = -2.0;
        }
        let r = view.into_const();
        assert_eq!(*r.at_linear(0), -2.0);
        assert_eq!(m[(0, 1)], -2.0);
    }

    #[test]
    fn test_nested_mutation() {
        let mut m = Mat::from_fn(5, 5, |i, j| (10 * i + j) as i32);

        let mut outer = MatrixMutExt::block_mut(&mut m, 1, 1, 3, 3);
        let mut outer_rb = outer.rb_mut();
        let mut inner = outer_rb.block_mut(1, 1, 2, 2);
        *inner.at_mut(0, 0) = -1;

        assert_eq!(*outer.at(1, 1), -1);
        assert_eq!(m[(2, 2)], -1);
    }

    #[test]
    fn test_packet_write_matches_scalar() {
        struct Impl<'a> {
            col: BlockMut<&'a mut Mat<f32>, usize, Fixed<1>>,
        }

        impl pulp::WithSimd for Impl<'_> {
            type Output = ();

            #[inline(always)]
            fn with_simd<S: pulp::Simd>(mut self, simd: S) -> Self::Output {
                let n = self.col.nrows();
                let lanes = crate::simd::lanes::<f32, S>();
                let mut i = 0;
                while i + lanes <= n {
                    let p = unsafe { self.col.rb().packet_linear::<S>(simd, i) };
                    unsafe { self.col.write_packet_linear::<S>(simd, i, p) };
                    i += lanes;
                }
            }
        }

        let mut m = Mat::from_fn(16, 3, |i, j| (i + 100 * j) as f32);
        let orig = m.clone();
        let col = MatrixMutExt::col_mut(&mut m, 1);
        pulp::Arch::new().dispatch(Impl { col });

        // load followed by store at the same index is the identity
        assert!(m == orig);
    }

    #[test]
    #[should_panic]
    fn test_copy_from_shape_mismatch() {
        let mut m = Mat::full(3, 3, 0i32);
        let src = Mat::full(2, 3, 1i32);
        MatrixMutExt::block_mut(&mut m, 0, 0, 3, 3).copy_from(src.as_ref());
    }
}

use crate::mat::MatRef;
use crate::shape::{Extent, Fixed, Flags};
use crate::simd::{Packet, SimdElem};
use crate::traits::{DirectAccess, Matrix, MatrixMut, PacketAccess, PacketAccessMut};
use crate::Corner;
use core::marker::PhantomData;
use core::ptr::NonNull;
use equator::{assert, debug_assert};
use pulp::Simd;
use reborrow::{IntoConst, Reborrow, ReborrowMut};

/// Mutable view over a rectangular region of a dense matrix, addressed
/// through a base pointer and row/column strides.
///
/// Writes through the view mutate the parent storage in place. The view is
/// not `Copy`; it is reborrowed ([`Reborrow`], [`ReborrowMut`]) instead, so
/// that exclusive access to the elements is preserved.
pub struct MatMut<'a, T, Rows: Extent = usize, Cols: Extent = usize> {
    pub(crate) ptr: NonNull<T>,
    pub(crate) nrows: Rows,
    pub(crate) ncols: Cols,
    pub(crate) row_stride: isize,
    pub(crate) col_stride: isize,
    pub(crate) __marker: PhantomData<&'a mut T>,
}

impl<'short, T, Rows: Extent, Cols: Extent> Reborrow<'short> for MatMut<'_, T, Rows, Cols> {
    type Target = MatRef<'short, T, Rows, Cols>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        MatRef {
            ptr: self.ptr,
            nrows: self.nrows,
            ncols: self.ncols,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
            __marker: PhantomData,
        }
    }
}

impl<'short, T, Rows: Extent, Cols: Extent> ReborrowMut<'short> for MatMut<'_, T, Rows, Cols> {
    type Target = MatMut<'short, T, Rows, Cols>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        MatMut {
            ptr: self.ptr,
            nrows: self.nrows,
            ncols: self.ncols,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
            __marker: PhantomData,
        }
    }
}

impl<'a, T, Rows: Extent, Cols: Extent> IntoConst for MatMut<'a, T, Rows, Cols> {
    type Target = MatRef<'a, T, Rows, Cols>;

    #[inline]
    fn into_const(self) -> Self::Target {
        MatRef {
            ptr: self.ptr,
            nrows: self.nrows,
            ncols: self.ncols,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
            __marker: PhantomData,
        }
    }
}

unsafe impl<T: Sync, Rows: Extent, Cols: Extent> Sync for MatMut<'_, T, Rows, Cols> {}
unsafe impl<T: Send, Rows: Extent, Cols: Extent> Send for MatMut<'_, T, Rows, Cols> {}

impl<'a, T> MatMut<'a, T> {
    /// Creates a mutable view over a slice holding an `nrows×ncols` matrix
    /// in column-major order.
    ///
    /// # Panics
    /// Panics if `nrows * ncols != slice.len()`.
    #[inline]
    #[track_caller]
    pub fn from_column_major_slice(slice: &'a mut [T], nrows: usize, ncols: usize) -> Self {
        assert!(usize::checked_mul(nrows, ncols) == Some(slice.len()));
        unsafe { Self::from_raw_parts(slice.as_mut_ptr(), nrows, ncols, 1, nrows as isize) }
    }
}

impl<'a, T, Rows: Extent, Cols: Extent> MatMut<'a, T, Rows, Cols> {
    /// `true` if the view is statically a single row.
    pub const IS_ROW: bool = matches!(Rows::STATIC, Some(1));
    /// `true` if the view is statically a single column.
    pub const IS_COL: bool = matches!(Cols::STATIC, Some(1));
    /// `true` if the view is statically a vector.
    pub const IS_VECTOR: bool = Self::IS_ROW || Self::IS_COL;

    /// Creates a mutable view from a pointer to the first element, the
    /// extents, and the row/column strides in elements.
    ///
    /// # Safety
    /// Same contract as [`MatRef::from_raw_parts`], and additionally no
    /// other reference to the pointed-to values may exist or be created for
    /// the duration of `'a`.
    #[inline]
    pub const unsafe fn from_raw_parts(
        ptr: *mut T,
        nrows: Rows,
        ncols: Cols,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            ptr: NonNull::new_unchecked(ptr),
            nrows,
            ncols,
            row_stride,
            col_stride,
            __marker: PhantomData,
        }
    }

    /// Returns a mutable pointer to the element at `(0, 0)`.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
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

    /// Returns the offset, in elements, between consecutive rows.
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.row_stride
    }

    /// Returns the offset, in elements, between consecutive columns.
    #[inline]
    pub fn col_stride(&self) -> isize {
        self.col_stride
    }

    /// See [`MatRef::inner_stride`].
    #[inline]
    pub fn inner_stride(&self) -> isize {
        self.rb().inner_stride()
    }

    /// See [`MatRef::outer_stride`].
    #[inline]
    pub fn outer_stride(&self) -> isize {
        self.rb().outer_stride()
    }

    /// Returns a mutable raw pointer to the element at `(row, col)`,
    /// assuming it is within bounds.
    ///
    /// # Safety
    /// Requires `row < self.nrows()` and `col < self.ncols()`.
    #[inline]
    pub unsafe fn ptr_inbounds_at_mut(&mut self, row: usize, col: usize) -> *mut T {
        debug_assert!(all(row < self.nrows(), col < self.ncols()));
        self.ptr
            .as_ptr()
            .offset(row as isize * self.row_stride)
            .offset(col as isize * self.col_stride)
    }

    /// Returns a reference to the element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
    #[inline]
    #[track_caller]
    pub fn at(&self, row: usize, col: usize) -> &T {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { &*self.rb().ptr_inbounds_at(row, col) }
    }

    /// Returns a mutable reference to the element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
    #[inline]
    #[track_caller]
    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut T {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { self.at_mut_unchecked(row, col) }
    }

    /// Returns a mutable reference to the element at `(row, col)` without
    /// bound checks.
    ///
    /// # Safety
    /// Requires `row < self.nrows()` and `col < self.ncols()`.
    #[inline]
    pub unsafe fn at_mut_unchecked(&mut self, row: usize, col: usize) -> &mut T {
        &mut *self.ptr_inbounds_at_mut(row, col)
    }

    /// Returns a mutable reference to the element at `index` along a vector
    /// view: a single row is indexed by column, a single column by row. Only
    /// compiles for views that are statically a single row or column.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn at_linear_mut(&mut self, index: usize) -> &mut T {
        const {
            core::assert!(matches!(Rows::STATIC, Some(1)) || matches!(Cols::STATIC, Some(1)))
        };
        if Self::IS_ROW {
            self.at_mut(0, index)
        } else {
            self.at_mut(index, 0)
        }
    }

    /// Returns a mutable view with the rows and columns swapped.
    #[inline]
    pub fn transpose(self) -> MatMut<'a, T, Cols, Rows> {
        MatMut {
            ptr: self.ptr,
            nrows: self.ncols,
            ncols: self.nrows,
            row_stride: self.col_stride,
            col_stride: self.row_stride,
            __marker: PhantomData,
        }
    }

    /// Returns a mutable reference to the element at `(row, col)`, consuming
    /// the view so that the reference lives as long as the borrow of the
    /// underlying data.
    ///
    /// # Panics
    /// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
    #[inline]
    #[track_caller]
    pub fn into_mut(mut self, row: usize, col: usize) -> &'a mut T {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { &mut *self.ptr_inbounds_at_mut(row, col) }
    }

    /// Returns a mutable view over the block starting at
    /// `(start_row, start_col)` with dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn block_mut(
        self,
        start_row: usize,
        start_col: usize,
        nrows: usize,
        ncols: usize,
    ) -> MatMut<'a, T> {
        assert!(all(
            start_row <= self.nrows(),
            start_col <= self.ncols(),
            nrows <= self.nrows() - start_row,
            ncols <= self.ncols() - start_col,
        ));
        unsafe {
            MatMut::from_raw_parts(
                self.ptr
                    .as_ptr()
                    .wrapping_offset(start_row as isize * self.row_stride)
                    .wrapping_offset(start_col as isize * self.col_stride),
                nrows,
                ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    /// Returns a mutable view over the `H×W` block starting at
    /// `(start_row, start_col)`, with both extents fixed at compile time.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn fixed_block_mut<const H: usize, const W: usize>(
        self,
        start_row: usize,
        start_col: usize,
    ) -> MatMut<'a, T, Fixed<H>, Fixed<W>> {
        const { core::assert!(H >= 1 && W >= 1) };
        assert!(all(
            start_row <= self.nrows(),
            start_col <= self.ncols(),
            H <= self.nrows() - start_row,
            W <= self.ncols() - start_col,
        ));
        unsafe {
            MatMut::from_raw_parts(
                self.ptr
                    .as_ptr()
                    .wrapping_offset(start_row as isize * self.row_stride)
                    .wrapping_offset(start_col as isize * self.col_stride),
                Fixed,
                Fixed,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    /// Returns a mutable view over the `i`-th row.
    ///
    /// # Panics
    /// Panics if `i >= self.nrows()`.
    #[inline]
    #[track_caller]
    pub fn row_mut(self, i: usize) -> MatMut<'a, T, Fixed<1>, Cols> {
        assert!(i < self.nrows());
        unsafe {
            MatMut::from_raw_parts(
                self.ptr.as_ptr().wrapping_offset(i as isize * self.row_stride),
                Fixed,
                self.ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    /// Returns a mutable view over the `j`-th column.
    ///
    /// # Panics
    /// Panics if `j >= self.ncols()`.
    #[inline]
    #[track_caller]
    pub fn col_mut(self, j: usize) -> MatMut<'a, T, Rows, Fixed<1>> {
        assert!(j < self.ncols());
        unsafe {
            MatMut::from_raw_parts(
                self.ptr.as_ptr().wrapping_offset(j as isize * self.col_stride),
                self.nrows,
                Fixed,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    /// Returns a mutable view over the `nrows×ncols` block anchored at the
    /// given corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn corner_mut(self, corner: Corner, nrows: usize, ncols: usize) -> MatMut<'a, T> {
        let (i, j) = corner.start(self.nrows(), self.ncols(), nrows, ncols);
        self.block_mut(i, j, nrows, ncols)
    }

    /// Returns a mutable view over the `H×W` block anchored at the given
    /// corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn fixed_corner_mut<const H: usize, const W: usize>(
        self,
        corner: Corner,
    ) -> MatMut<'a, T, Fixed<H>, Fixed<W>> {
        let (i, j) = corner.start(self.nrows(), self.ncols(), H, W);
        self.fixed_block_mut::<H, W>(i, j)
    }

    /// Fills the view with clones of `value`.
    #[inline]
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
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
    pub fn copy_from(&mut self, src: impl Matrix<Elem = T>)
    where
        T: Clone,
    {
        assert!(all(src.nrows() == self.nrows(), src.ncols() == self.ncols()));
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                unsafe { *self.at_mut_unchecked(i, j) = src.coeff_unchecked(i, j).clone() };
            }
        }
    }
}

impl<T, Rows: Extent, Cols: Extent> Matrix for MatMut<'_, T, Rows, Cols> {
    type Elem = T;

    const ROWS: Option<usize> = <MatRef<'_, T, Rows, Cols> as Matrix>::ROWS;
    const COLS: Option<usize> = <MatRef<'_, T, Rows, Cols> as Matrix>::COLS;
    const MAX_ROWS: Option<usize> = <MatRef<'_, T, Rows, Cols> as Matrix>::MAX_ROWS;
    const MAX_COLS: Option<usize> = <MatRef<'_, T, Rows, Cols> as Matrix>::MAX_COLS;
    const FLAGS: Flags = <MatRef<'_, T, Rows, Cols> as Matrix>::FLAGS;

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
    fn coeff(&self, row: usize, col: usize) -> &T {
        self.at(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &T {
        self.rb().at_unchecked(row, col)
    }
}

impl<T, Rows: Extent, Cols: Extent> MatrixMut for MatMut<'_, T, Rows, Cols> {
    #[inline(always)]
    #[track_caller]
    fn coeff_mut(&mut self, row: usize, col: usize) -> &mut T {
        self.at_mut(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_mut_unchecked(&mut self, row: usize, col: usize) -> &mut T {
        self.at_mut_unchecked(row, col)
    }
}

unsafe impl<T, Rows: Extent, Cols: Extent> DirectAccess for MatMut<'_, T, Rows, Cols> {
    #[inline(always)]
    fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    #[inline(always)]
    fn row_stride(&self) -> isize {
        self.row_stride
    }

    #[inline(always)]
    fn col_stride(&self) -> isize {
        self.col_stride
    }
}

impl<T: SimdElem, Rows: Extent, Cols: Extent> PacketAccess for MatMut<'_, T, Rows, Cols> {
    #[inline(always)]
    unsafe fn packet<S: Simd, const ALIGNED: bool>(
        &self,
        simd: S,
        row: usize,
        col: usize,
    ) -> Packet<T, S> {
        self.rb().packet::<S, ALIGNED>(simd, row, col)
    }
}

impl<T: SimdElem, Rows: Extent, Cols: Extent> PacketAccessMut for MatMut<'_, T, Rows, Cols> {
    #[inline(always)]
    unsafe fn write_packet<S: Simd, const ALIGNED: bool>(
        &mut self,
        simd: S,
        row: usize,
        col: usize,
        value: Packet<T, S>,
    ) {
        debug_assert!(all(
            self.row_stride == 1,
            row + crate::simd::lanes::<T, S>() <= self.nrows(),
            col < self.ncols(),
        ));
        let ptr = self.ptr_inbounds_at_mut(row, col);
        if ALIGNED {
            T::store_packet_aligned(simd, ptr, value)
        } else {
            T::store_packet(simd, ptr, value)
        }
    }
}

impl<T: core::fmt::Debug, Rows: Extent, Cols: Extent> core::fmt::Debug for MatMut<'_, T, Rows, Cols> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.rb().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use crate::mat;

    #[test]
    fn test_write_read_roundtrip() {
        let mut m = mat![[1.0, 3.0], [2.0, 4.0f64]];

        let mut b = m.as_mut().block_mut(1, 0, 1, 2);
        *b.at_mut(0, 0) = -2.0;
        *b.at_mut(0, 1) = -4.0;
        assert_eq!(b.at(0, 0), &-2.0);
        assert_eq!(b.at(0, 1), &-4.0);

        // writes are visible through the parent
        assert_eq!(m[(1, 0)], -2.0);
        assert_eq!(m[(1, 1)], -4.0);
    }

    #[test]
    fn test_linear_write() {
        let mut m = mat![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0f64]];

        let mut row = m.as_mut().row_mut(1);
        for j in 0..3 {
            *row.at_linear_mut(j) = j as f64;
        }
        let mut col = m.as_mut().col_mut(0);
        for i in 0..2 {
            *col.at_linear_mut(i) = 10.0 + i as f64;
        }

        assert_eq!(m[(1, 0)], 11.0);
        assert_eq!(m[(1, 1)], 1.0);
        assert_eq!(m[(1, 2)], 2.0);
        assert_eq!(m[(0, 0)], 10.0);
    }

    #[test]
    fn test_fill_and_copy_from() {
        let mut m = mat![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0f64]];
        let src = mat![[-1.0, -2.0], [-3.0, -4.0f64]];

        m.as_mut().corner_mut(crate::Corner::BottomRight, 2, 2).fill(0.0);
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(1, 1)], 0.0);
        assert_eq!(m[(2, 0)], 0.0);

        m.as_mut().block_mut(1, 0, 2, 2).copy_from(src.as_ref());
        assert_eq!(m[(1, 0)], -1.0);
        assert_eq!(m[(2, 1)], -4.0);
    }

    #[test]
    fn test_aligned_packet_store() {
        struct Impl<'a> {
            mat: MatMut<'a, f64>,
        }

        impl pulp::WithSimd for Impl<'_> {
            type Output = ();

            #[inline(always)]
            fn with_simd<S: pulp::Simd>(mut self, simd: S) -> Self::Output {
                let lanes = crate::simd::lanes::<f64, S>();
                let align = core::mem::align_of::<Packet<f64, S>>();

                for col in 0..self.mat.ncols() {
                    let start = self.mat.rb().ptr_at(0, col).align_offset(align);
                    if start == usize::MAX {
                        continue;
                    }
                    let mut row = start;
                    while row + lanes <= self.mat.nrows() {
                        let p = unsafe { self.mat.rb().packet::<S, true>(simd, row, col) };
                        unsafe { self.mat.write_packet::<S, true>(simd, row, col, p) };
                        row += lanes;
                    }
                }
            }
        }

        let mut m = crate::Mat::from_fn(32, 2, |i, j| (i + 100 * j) as f64);
        let orig = m.clone();
        pulp::Arch::new().dispatch(Impl { mat: m.as_mut() });

        // aligned load followed by aligned store at the same spot is the
        // identity
        assert!(m == orig);
    }

    #[test]
    fn test_transpose() {
        let mut m = mat![[1.0, 3.0, 5.0], [2.0, 4.0, 6.0f64]];

        let mut t = m.as_mut().transpose();
        assert_eq!(t.nrows(), 3);
        assert_eq!(t.ncols(), 2);
        assert_eq!(t.at(2, 0), &5.0);

        *t.at_mut(2, 0) = -5.0;
        *t.at_mut(0, 1) = -2.0;
        assert_eq!(m[(0, 2)], -5.0);
        assert_eq!(m[(1, 0)], -2.0);
    }

    #[test]
    fn test_reborrow() {
        let mut m = mat![[1.0, 2.0], [3.0, 4.0f64]];
        let mut view = m.as_mut();

        {
            let r = view.rb();
            assert_eq!(r.at(0, 1), &2.0);
        }
        {
            let mut v = view.rb_mut();
            *v.at_mut(0, 1) = -2.0;
        }
        let r = view.into_const();
        assert_eq!(r.at(0, 1), &-2.0);
    }
}

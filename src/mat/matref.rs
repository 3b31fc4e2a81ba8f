use crate::shape::{resolve_flags, resolve_max, Extent, Fixed, Flags};
use crate::simd::{Packet, SimdElem};
use crate::traits::{DirectAccess, Matrix, PacketAccess};
use crate::Corner;
use core::marker::PhantomData;
use core::ptr::NonNull;
use equator::{assert, debug_assert};
use pulp::Simd;
use reborrow::{IntoConst, Reborrow, ReborrowMut};

/// Immutable view over a rectangular region of a dense matrix, addressed
/// through a base pointer and row/column strides.
///
/// `Rows` and `Cols` are the view's extents, each either a compile-time
/// [`Fixed`] constant or a runtime `usize`.
pub struct MatRef<'a, T, Rows: Extent = usize, Cols: Extent = usize> {
    pub(crate) ptr: NonNull<T>,
    pub(crate) nrows: Rows,
    pub(crate) ncols: Cols,
    pub(crate) row_stride: isize,
    pub(crate) col_stride: isize,
    pub(crate) __marker: PhantomData<&'a T>,
}

impl<T, Rows: Extent, Cols: Extent> Copy for MatRef<'_, T, Rows, Cols> {}
impl<T, Rows: Extent, Cols: Extent> Clone for MatRef<'_, T, Rows, Cols> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'short, T, Rows: Extent, Cols: Extent> Reborrow<'short> for MatRef<'_, T, Rows, Cols> {
    type Target = MatRef<'short, T, Rows, Cols>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        *self
    }
}

impl<'short, T, Rows: Extent, Cols: Extent> ReborrowMut<'short> for MatRef<'_, T, Rows, Cols> {
    type Target = MatRef<'short, T, Rows, Cols>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        *self
    }
}

impl<'a, T, Rows: Extent, Cols: Extent> IntoConst for MatRef<'a, T, Rows, Cols> {
    type Target = MatRef<'a, T, Rows, Cols>;

    #[inline]
    fn into_const(self) -> Self::Target {
        self
    }
}

unsafe impl<T: Sync, Rows: Extent, Cols: Extent> Sync for MatRef<'_, T, Rows, Cols> {}
unsafe impl<T: Sync, Rows: Extent, Cols: Extent> Send for MatRef<'_, T, Rows, Cols> {}

impl<'a, T> MatRef<'a, T> {
    /// Creates a view over a slice holding an `nrows×ncols` matrix in
    /// column-major order.
    ///
    /// # Panics
    /// Panics if `nrows * ncols != slice.len()`.
    #[inline]
    #[track_caller]
    pub fn from_column_major_slice(slice: &'a [T], nrows: usize, ncols: usize) -> Self {
        assert!(usize::checked_mul(nrows, ncols) == Some(slice.len()));
        unsafe { Self::from_raw_parts(slice.as_ptr(), nrows, ncols, 1, nrows as isize) }
    }
}

impl<'a, T, Rows: Extent, Cols: Extent> MatRef<'a, T, Rows, Cols> {
    /// `true` if the view is statically a single row.
    pub const IS_ROW: bool = matches!(Rows::STATIC, Some(1));
    /// `true` if the view is statically a single column.
    pub const IS_COL: bool = matches!(Cols::STATIC, Some(1));
    /// `true` if the view is statically a vector.
    pub const IS_VECTOR: bool = Self::IS_ROW || Self::IS_COL;

    /// Creates a view from a pointer to the first element, the extents, and
    /// the row/column strides in elements.
    ///
    /// This is also the internal entry point that bypasses offset
    /// derivation: a caller that has already established a correctly placed
    /// (and, for aligned packet access, correctly aligned) base pointer can
    /// hand it over directly.
    ///
    /// # Safety
    /// The behavior is undefined if any of the following conditions are
    /// violated:
    /// * for each `i < nrows` and `j < ncols`,
    ///   `ptr.offset(i * row_stride + j * col_stride)` must point to a valid
    ///   initialized value of type `T` within a single allocation
    /// * the pointed-to values must not be mutated for the duration of `'a`
    #[inline]
    pub const unsafe fn from_raw_parts(
        ptr: *const T,
        nrows: Rows,
        ncols: Cols,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            ptr: NonNull::new_unchecked(ptr as *mut T),
            nrows,
            ncols,
            row_stride,
            col_stride,
            __marker: PhantomData,
        }
    }

    /// Returns a pointer to the element at `(0, 0)`.
    #[inline]
    pub fn as_ptr(self) -> *const T {
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

    /// Returns the stride along the view's inner (fastest-varying) axis: the
    /// column-to-column stride for a single row, the row-to-row stride for a
    /// single column, and the storage inner stride otherwise.
    #[inline]
    pub fn inner_stride(&self) -> isize {
        if Self::IS_ROW {
            self.col_stride
        } else {
            // a single column's inner axis and the storage inner axis are
            // both the row axis
            self.row_stride
        }
    }

    /// Returns the stride along the view's outer axis: the element count for
    /// a vector (contiguous logical indexing), the storage outer stride
    /// otherwise.
    #[inline]
    pub fn outer_stride(&self) -> isize {
        if Self::IS_VECTOR {
            (self.nrows() * self.ncols()) as isize
        } else {
            self.col_stride
        }
    }

    /// Returns a raw pointer to the element at `(row, col)`.
    #[inline]
    pub fn ptr_at(self, row: usize, col: usize) -> *const T {
        self.ptr
            .as_ptr()
            .wrapping_offset(row as isize * self.row_stride)
            .wrapping_offset(col as isize * self.col_stride)
    }

    /// Returns a raw pointer to the element at `(row, col)`, assuming it is
    /// within bounds.
    ///
    /// # Safety
    /// Requires `row < self.nrows()` and `col < self.ncols()`.
    #[inline]
    pub unsafe fn ptr_inbounds_at(self, row: usize, col: usize) -> *const T {
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
    pub fn at(self, row: usize, col: usize) -> &'a T {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { self.at_unchecked(row, col) }
    }

    /// Returns a reference to the element at `(row, col)` without bound
    /// checks.
    ///
    /// # Safety
    /// Requires `row < self.nrows()` and `col < self.ncols()`.
    #[inline]
    pub unsafe fn at_unchecked(self, row: usize, col: usize) -> &'a T {
        &*self.ptr_inbounds_at(row, col)
    }

    /// Returns a reference to the element at `index` along a vector view: a
    /// single row is indexed by column, a single column by row. Only
    /// compiles for views that are statically a single row or column.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn at_linear(self, index: usize) -> &'a T {
        const {
            core::assert!(matches!(Rows::STATIC, Some(1)) || matches!(Cols::STATIC, Some(1)))
        };
        if Self::IS_ROW {
            self.at(0, index)
        } else {
            self.at(index, 0)
        }
    }

    /// Returns a view with the rows and columns swapped.
    #[inline]
    pub fn transpose(self) -> MatRef<'a, T, Cols, Rows> {
        MatRef {
            ptr: self.ptr,
            nrows: self.ncols,
            ncols: self.nrows,
            row_stride: self.col_stride,
            col_stride: self.row_stride,
            __marker: PhantomData,
        }
    }

    /// Returns a view with both extents dynamic.
    #[inline]
    pub fn as_dyn(self) -> MatRef<'a, T> {
        MatRef {
            ptr: self.ptr,
            nrows: self.nrows(),
            ncols: self.ncols(),
            row_stride: self.row_stride,
            col_stride: self.col_stride,
            __marker: PhantomData,
        }
    }

    /// Returns a view over the block starting at `(start_row, start_col)`
    /// with dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn block(self, start_row: usize, start_col: usize, nrows: usize, ncols: usize) -> MatRef<'a, T> {
        assert!(all(
            start_row <= self.nrows(),
            start_col <= self.ncols(),
            nrows <= self.nrows() - start_row,
            ncols <= self.ncols() - start_col,
        ));
        unsafe {
            MatRef::from_raw_parts(
                self.ptr_at(start_row, start_col),
                nrows,
                ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    /// Returns a view over the `H×W` block starting at
    /// `(start_row, start_col)`, with both extents fixed at compile time.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn fixed_block<const H: usize, const W: usize>(
        self,
        start_row: usize,
        start_col: usize,
    ) -> MatRef<'a, T, Fixed<H>, Fixed<W>> {
        const { core::assert!(H >= 1 && W >= 1) };
        assert!(all(
            start_row <= self.nrows(),
            start_col <= self.ncols(),
            H <= self.nrows() - start_row,
            W <= self.ncols() - start_col,
        ));
        unsafe {
            MatRef::from_raw_parts(
                self.ptr_at(start_row, start_col),
                Fixed,
                Fixed,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    /// Returns a view over the `i`-th row.
    ///
    /// # Panics
    /// Panics if `i >= self.nrows()`.
    #[inline]
    #[track_caller]
    pub fn row(self, i: usize) -> MatRef<'a, T, Fixed<1>, Cols> {
        assert!(i < self.nrows());
        unsafe {
            MatRef::from_raw_parts(self.ptr_at(i, 0), Fixed, self.ncols, self.row_stride, self.col_stride)
        }
    }

    /// Returns a view over the `j`-th column.
    ///
    /// # Panics
    /// Panics if `j >= self.ncols()`.
    #[inline]
    #[track_caller]
    pub fn col(self, j: usize) -> MatRef<'a, T, Rows, Fixed<1>> {
        assert!(j < self.ncols());
        unsafe {
            MatRef::from_raw_parts(self.ptr_at(0, j), self.nrows, Fixed, self.row_stride, self.col_stride)
        }
    }

    /// Returns a view over the `nrows×ncols` block anchored at the given
    /// corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn corner(self, corner: Corner, nrows: usize, ncols: usize) -> MatRef<'a, T> {
        let (i, j) = corner.start(self.nrows(), self.ncols(), nrows, ncols);
        self.block(i, j, nrows, ncols)
    }

    /// Returns a view over the `H×W` block anchored at the given corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn fixed_corner<const H: usize, const W: usize>(
        self,
        corner: Corner,
    ) -> MatRef<'a, T, Fixed<H>, Fixed<W>> {
        let (i, j) = corner.start(self.nrows(), self.ncols(), H, W);
        self.fixed_block::<H, W>(i, j)
    }

    /// Returns a newly allocated matrix holding the cloned values of the
    /// view.
    #[inline]
    pub fn to_mat(&self) -> crate::Mat<T>
    where
        T: Clone,
    {
        crate::Mat::from_fn(self.nrows(), self.ncols(), |i, j| self.at(i, j).clone())
    }
}

impl<T, Rows: Extent, Cols: Extent> Matrix for MatRef<'_, T, Rows, Cols> {
    type Elem = T;

    const ROWS: Option<usize> = Rows::STATIC;
    const COLS: Option<usize> = Cols::STATIC;
    const MAX_ROWS: Option<usize> = resolve_max(Rows::STATIC, None);
    const MAX_COLS: Option<usize> = resolve_max(Cols::STATIC, None);
    const FLAGS: Flags = resolve_flags(
        Flags::DIRECT.union(Flags::PACKET),
        core::mem::size_of::<T>(),
        Rows::STATIC,
        Cols::STATIC,
        resolve_max(Rows::STATIC, None),
        resolve_max(Cols::STATIC, None),
    );

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
        (*self).at(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &T {
        (*self).at_unchecked(row, col)
    }
}

unsafe impl<T, Rows: Extent, Cols: Extent> DirectAccess for MatRef<'_, T, Rows, Cols> {
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

impl<T: SimdElem, Rows: Extent, Cols: Extent> PacketAccess for MatRef<'_, T, Rows, Cols> {
    #[inline(always)]
    unsafe fn packet<S: Simd, const ALIGNED: bool>(
        &self,
        simd: S,
        row: usize,
        col: usize,
    ) -> Packet<T, S> {
        debug_assert!(all(
            self.row_stride == 1,
            row + crate::simd::lanes::<T, S>() <= self.nrows(),
            col < self.ncols(),
        ));
        let ptr = self.ptr_inbounds_at(row, col);
        if ALIGNED {
            T::load_packet_aligned(simd, ptr)
        } else {
            T::load_packet(simd, ptr)
        }
    }
}

impl<T: PartialEq<U>, U, R1: Extent, C1: Extent, R2: Extent, C2: Extent>
    PartialEq<MatRef<'_, U, R2, C2>> for MatRef<'_, T, R1, C1>
{
    fn eq(&self, other: &MatRef<'_, U, R2, C2>) -> bool {
        if self.nrows() != other.nrows() || self.ncols() != other.ncols() {
            return false;
        }
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                if unsafe { self.at_unchecked(i, j) != other.at_unchecked(i, j) } {
                    return false;
                }
            }
        }
        true
    }
}

impl<T: core::fmt::Debug, Rows: Extent, Cols: Extent> core::fmt::Debug for MatRef<'_, T, Rows, Cols> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "[")?;
        for i in 0..self.nrows() {
            f.write_str("    [")?;
            for j in 0..self.ncols() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                core::fmt::Debug::fmt(self.at(i, j), f)?;
            }
            f.write_str("],\n")?;
        }
        write!(f, "]")
    }
}

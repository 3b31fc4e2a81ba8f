use crate::mat::{MatMut, MatRef};
use crate::shape::{Fixed, Flags};
use crate::simd::{Packet, SimdElem};
use crate::traits::{DirectAccess, Matrix, MatrixMut, PacketAccess, PacketAccessMut};
use crate::Corner;
use pulp::Simd;

/// Heap-allocated dense matrix, stored in column-major order.
///
/// `Mat` owns its storage. All region factories ([`Mat::block`],
/// [`Mat::row`], [`Mat::corner`], ...) borrow it and return strided views
/// ([`MatRef`]/[`MatMut`]) over the requested region.
pub struct Mat<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
}

impl<T> Mat<T> {
    /// Returns an `nrows×ncols` matrix whose element at `(i, j)` is
    /// `f(i, j)`. `f` is called in column-major order.
    pub fn from_fn(nrows: usize, ncols: usize, f: impl FnMut(usize, usize) -> T) -> Self {
        let mut f = f;
        let mut data = Vec::with_capacity(nrows.checked_mul(ncols).unwrap_or_else(|| {
            panic!("matrix dimensions {nrows}×{ncols} overflow usize")
        }));
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// Returns an `nrows×ncols` matrix with all elements equal to `value`.
    pub fn full(nrows: usize, ncols: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::from_fn(nrows, ncols, |_, _| value.clone())
    }

    /// Returns the number of rows of the matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns a pointer to the first element.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    /// Returns a mutable pointer to the first element.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    /// Returns a view over the whole matrix.
    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, T> {
        unsafe {
            MatRef::from_raw_parts(self.data.as_ptr(), self.nrows, self.ncols, 1, self.nrows as isize)
        }
    }

    /// Returns a mutable view over the whole matrix.
    #[inline]
    pub fn as_mut(&mut self) -> MatMut<'_, T> {
        let nrows = self.nrows;
        let ncols = self.ncols;
        unsafe { MatMut::from_raw_parts(self.data.as_mut_ptr(), nrows, ncols, 1, nrows as isize) }
    }

    /// Returns a view over the block starting at `(start_row, start_col)`
    /// with dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn block(&self, start_row: usize, start_col: usize, nrows: usize, ncols: usize) -> MatRef<'_, T> {
        self.as_ref().block(start_row, start_col, nrows, ncols)
    }

    /// Returns a view over the `H×W` block starting at
    /// `(start_row, start_col)`, with both extents fixed at compile time.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn fixed_block<const H: usize, const W: usize>(
        &self,
        start_row: usize,
        start_col: usize,
    ) -> MatRef<'_, T, Fixed<H>, Fixed<W>> {
        self.as_ref().fixed_block::<H, W>(start_row, start_col)
    }

    /// Returns a view over the `i`-th row.
    ///
    /// # Panics
    /// Panics if `i >= self.nrows()`.
    #[inline]
    #[track_caller]
    pub fn row(&self, i: usize) -> MatRef<'_, T, Fixed<1>, usize> {
        self.as_ref().row(i)
    }

    /// Returns a view over the `j`-th column.
    ///
    /// # Panics
    /// Panics if `j >= self.ncols()`.
    #[inline]
    #[track_caller]
    pub fn col(&self, j: usize) -> MatRef<'_, T, usize, Fixed<1>> {
        self.as_ref().col(j)
    }

    /// Returns a view over the `nrows×ncols` block anchored at the given
    /// corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn corner(&self, corner: Corner, nrows: usize, ncols: usize) -> MatRef<'_, T> {
        self.as_ref().corner(corner, nrows, ncols)
    }

    /// Returns a view over the `H×W` block anchored at the given corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn fixed_corner<const H: usize, const W: usize>(
        &self,
        corner: Corner,
    ) -> MatRef<'_, T, Fixed<H>, Fixed<W>> {
        self.as_ref().fixed_corner::<H, W>(corner)
    }

    /// Returns a mutable view over the block starting at
    /// `(start_row, start_col)` with dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn block_mut(
        &mut self,
        start_row: usize,
        start_col: usize,
        nrows: usize,
        ncols: usize,
    ) -> MatMut<'_, T> {
        self.as_mut().block_mut(start_row, start_col, nrows, ncols)
    }

    /// Returns a mutable view over the `H×W` block starting at
    /// `(start_row, start_col)`, with both extents fixed at compile time.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn fixed_block_mut<const H: usize, const W: usize>(
        &mut self,
        start_row: usize,
        start_col: usize,
    ) -> MatMut<'_, T, Fixed<H>, Fixed<W>> {
        self.as_mut().fixed_block_mut::<H, W>(start_row, start_col)
    }

    /// Returns a mutable view over the `i`-th row.
    ///
    /// # Panics
    /// Panics if `i >= self.nrows()`.
    #[inline]
    #[track_caller]
    pub fn row_mut(&mut self, i: usize) -> MatMut<'_, T, Fixed<1>, usize> {
        self.as_mut().row_mut(i)
    }

    /// Returns a mutable view over the `j`-th column.
    ///
    /// # Panics
    /// Panics if `j >= self.ncols()`.
    #[inline]
    #[track_caller]
    pub fn col_mut(&mut self, j: usize) -> MatMut<'_, T, usize, Fixed<1>> {
        self.as_mut().col_mut(j)
    }

    /// Returns a mutable view over the `nrows×ncols` block anchored at the
    /// given corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn corner_mut(&mut self, corner: Corner, nrows: usize, ncols: usize) -> MatMut<'_, T> {
        self.as_mut().corner_mut(corner, nrows, ncols)
    }

    /// Returns a mutable view over the `H×W` block anchored at the given
    /// corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    pub fn fixed_corner_mut<const H: usize, const W: usize>(
        &mut self,
        corner: Corner,
    ) -> MatMut<'_, T, Fixed<H>, Fixed<W>> {
        self.as_mut().fixed_corner_mut::<H, W>(corner)
    }
}

impl<T> core::ops::Index<(usize, usize)> for Mat<T> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        self.as_ref().at(row, col)
    }
}

impl<T> core::ops::IndexMut<(usize, usize)> for Mat<T> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        self.as_mut().into_mut(row, col)
    }
}

impl<T> Matrix for Mat<T> {
    type Elem = T;

    const FLAGS: Flags = Flags::DIRECT.union(Flags::PACKET);

    #[inline(always)]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline(always)]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline(always)]
    #[track_caller]
    fn coeff(&self, row: usize, col: usize) -> &T {
        self.as_ref().at(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &T {
        self.as_ref().at_unchecked(row, col)
    }
}

impl<T> MatrixMut for Mat<T> {
    #[inline(always)]
    #[track_caller]
    fn coeff_mut(&mut self, row: usize, col: usize) -> &mut T {
        self.as_mut().into_mut(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_mut_unchecked(&mut self, row: usize, col: usize) -> &mut T {
        let nrows = self.nrows;
        &mut *self.data.as_mut_ptr().add(col * nrows + row)
    }
}

unsafe impl<T> DirectAccess for Mat<T> {
    #[inline(always)]
    fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    #[inline(always)]
    fn row_stride(&self) -> isize {
        1
    }

    #[inline(always)]
    fn col_stride(&self) -> isize {
        self.nrows as isize
    }
}

impl<T: SimdElem> PacketAccess for Mat<T> {
    #[inline(always)]
    unsafe fn packet<S: Simd, const ALIGNED: bool>(
        &self,
        simd: S,
        row: usize,
        col: usize,
    ) -> Packet<T, S> {
        self.as_ref().packet::<S, ALIGNED>(simd, row, col)
    }
}

impl<T: SimdElem> PacketAccessMut for Mat<T> {
    #[inline(always)]
    unsafe fn write_packet<S: Simd, const ALIGNED: bool>(
        &mut self,
        simd: S,
        row: usize,
        col: usize,
        value: Packet<T, S>,
    ) {
        self.as_mut().write_packet::<S, ALIGNED>(simd, row, col, value)
    }
}

impl<T: Clone> Clone for Mat<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Mat<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl<T: PartialEq<U>, U> PartialEq<Mat<U>> for Mat<T> {
    fn eq(&self, other: &Mat<U>) -> bool {
        self.as_ref() == other.as_ref()
    }
}

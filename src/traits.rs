//! Collaborator interface of the view subsystem.
//!
//! Everything outside this crate interacts with matrices through three
//! surfaces: the trait query interface (the associated consts of [`Matrix`]),
//! the element accessors, and the optional packet accessors. The capability
//! traits [`DirectAccess`], [`PacketAccess`] and [`PacketAccessMut`] are
//! opt-in: the factories select the strided-pointer view specialization when
//! the parent implements `DirectAccess`, and fall back to accessor delegation
//! otherwise.

use crate::block::{BlockMut, BlockRef};
use crate::shape::{Fixed, Flags};
use crate::simd::{Packet, SimdElem};
use crate::Corner;
use pulp::Simd;

/// Read access to a two-dimensional arrangement of elements.
///
/// The associated consts form the trait query interface: compile-time
/// row/column counts (`None` meaning dynamic), maximum counts, and the
/// capability bitmask.
pub trait Matrix {
    /// Element type.
    type Elem;

    /// Compile-time row count.
    const ROWS: Option<usize> = None;
    /// Compile-time column count.
    const COLS: Option<usize> = None;
    /// Maximum row count, `None` if unbounded.
    const MAX_ROWS: Option<usize> = None;
    /// Maximum column count, `None` if unbounded.
    const MAX_COLS: Option<usize> = None;
    /// Capability bitmask.
    const FLAGS: Flags = Flags::NONE;

    /// Returns the number of rows.
    fn nrows(&self) -> usize;
    /// Returns the number of columns.
    fn ncols(&self) -> usize;

    /// Returns a reference to the element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
    fn coeff(&self, row: usize, col: usize) -> &Self::Elem;

    /// Returns a reference to the element at `(row, col)` without bound
    /// checks.
    ///
    /// # Safety
    /// Requires `row < self.nrows()` and `col < self.ncols()`.
    unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &Self::Elem;
}

/// Write access to the elements of a [`Matrix`].
pub trait MatrixMut: Matrix {
    /// Returns a mutable reference to the element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
    fn coeff_mut(&mut self, row: usize, col: usize) -> &mut Self::Elem;

    /// Returns a mutable reference to the element at `(row, col)` without
    /// bound checks.
    ///
    /// # Safety
    /// Requires `row < self.nrows()` and `col < self.ncols()`.
    unsafe fn coeff_mut_unchecked(&mut self, row: usize, col: usize) -> &mut Self::Elem;
}

/// Capability of a matrix to expose its storage as a base pointer plus
/// row/column strides.
///
/// # Safety
/// Implementors guarantee that for every `row < nrows()` and `col < ncols()`,
/// `as_ptr().offset(row * row_stride() + col * col_stride())` points to the
/// same element as `coeff(row, col)`, within a single allocation.
pub unsafe trait DirectAccess: Matrix {
    /// Returns a pointer to the element at `(0, 0)`.
    fn as_ptr(&self) -> *const Self::Elem;
    /// Returns the offset, in elements, between consecutive rows.
    fn row_stride(&self) -> isize;
    /// Returns the offset, in elements, between consecutive columns.
    fn col_stride(&self) -> isize;
}

/// Vectorized bulk element access.
///
/// A packet covers `lanes::<Elem, S>()` consecutive elements along the inner
/// axis starting at `(row, col)`. The `ALIGNED` parameter selects the access
/// mode the implementor may assume; views always delegate to their parent in
/// unaligned mode since a view offset is not a multiple of the packet width
/// in general.
pub trait PacketAccess: Matrix
where
    Self::Elem: SimdElem,
{
    /// Loads one packet starting at `(row, col)`.
    ///
    /// # Safety
    /// The whole packet must be in bounds along the inner axis, the inner
    /// stride must be 1, and if `ALIGNED` is true the packet's address must
    /// be packet-aligned.
    unsafe fn packet<S: Simd, const ALIGNED: bool>(
        &self,
        simd: S,
        row: usize,
        col: usize,
    ) -> Packet<Self::Elem, S>;
}

/// Vectorized bulk element writes.
pub trait PacketAccessMut: PacketAccess + MatrixMut
where
    Self::Elem: SimdElem,
{
    /// Stores one packet starting at `(row, col)`.
    ///
    /// # Safety
    /// Same contract as [`PacketAccess::packet`].
    unsafe fn write_packet<S: Simd, const ALIGNED: bool>(
        &mut self,
        simd: S,
        row: usize,
        col: usize,
        value: Packet<Self::Elem, S>,
    );
}

impl<M: Matrix> Matrix for &M {
    type Elem = M::Elem;

    const ROWS: Option<usize> = M::ROWS;
    const COLS: Option<usize> = M::COLS;
    const MAX_ROWS: Option<usize> = M::MAX_ROWS;
    const MAX_COLS: Option<usize> = M::MAX_COLS;
    const FLAGS: Flags = M::FLAGS;

    #[inline(always)]
    fn nrows(&self) -> usize {
        (**self).nrows()
    }

    #[inline(always)]
    fn ncols(&self) -> usize {
        (**self).ncols()
    }

    #[inline(always)]
    #[track_caller]
    fn coeff(&self, row: usize, col: usize) -> &Self::Elem {
        (**self).coeff(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &Self::Elem {
        (**self).coeff_unchecked(row, col)
    }
}

impl<M: Matrix> Matrix for &mut M {
    type Elem = M::Elem;

    const ROWS: Option<usize> = M::ROWS;
    const COLS: Option<usize> = M::COLS;
    const MAX_ROWS: Option<usize> = M::MAX_ROWS;
    const MAX_COLS: Option<usize> = M::MAX_COLS;
    const FLAGS: Flags = M::FLAGS;

    #[inline(always)]
    fn nrows(&self) -> usize {
        (**self).nrows()
    }

    #[inline(always)]
    fn ncols(&self) -> usize {
        (**self).ncols()
    }

    #[inline(always)]
    #[track_caller]
    fn coeff(&self, row: usize, col: usize) -> &Self::Elem {
        (**self).coeff(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &Self::Elem {
        (**self).coeff_unchecked(row, col)
    }
}

impl<M: MatrixMut> MatrixMut for &mut M {
    #[inline(always)]
    #[track_caller]
    fn coeff_mut(&mut self, row: usize, col: usize) -> &mut Self::Elem {
        (**self).coeff_mut(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_mut_unchecked(&mut self, row: usize, col: usize) -> &mut Self::Elem {
        (**self).coeff_mut_unchecked(row, col)
    }
}

unsafe impl<M: DirectAccess> DirectAccess for &M {
    #[inline(always)]
    fn as_ptr(&self) -> *const Self::Elem {
        (**self).as_ptr()
    }

    #[inline(always)]
    fn row_stride(&self) -> isize {
        (**self).row_stride()
    }

    #[inline(always)]
    fn col_stride(&self) -> isize {
        (**self).col_stride()
    }
}

unsafe impl<M: DirectAccess> DirectAccess for &mut M {
    #[inline(always)]
    fn as_ptr(&self) -> *const Self::Elem {
        (**self).as_ptr()
    }

    #[inline(always)]
    fn row_stride(&self) -> isize {
        (**self).row_stride()
    }

    #[inline(always)]
    fn col_stride(&self) -> isize {
        (**self).col_stride()
    }
}

impl<M: PacketAccess> PacketAccess for &M
where
    M::Elem: SimdElem,
{
    #[inline(always)]
    unsafe fn packet<S: Simd, const ALIGNED: bool>(
        &self,
        simd: S,
        row: usize,
        col: usize,
    ) -> Packet<Self::Elem, S> {
        (**self).packet::<S, ALIGNED>(simd, row, col)
    }
}

impl<M: PacketAccess> PacketAccess for &mut M
where
    M::Elem: SimdElem,
{
    #[inline(always)]
    unsafe fn packet<S: Simd, const ALIGNED: bool>(
        &self,
        simd: S,
        row: usize,
        col: usize,
    ) -> Packet<Self::Elem, S> {
        (**self).packet::<S, ALIGNED>(simd, row, col)
    }
}

impl<M: PacketAccessMut> PacketAccessMut for &mut M
where
    M::Elem: SimdElem,
{
    #[inline(always)]
    unsafe fn write_packet<S: Simd, const ALIGNED: bool>(
        &mut self,
        simd: S,
        row: usize,
        col: usize,
        value: Packet<Self::Elem, S>,
    ) {
        (**self).write_packet::<S, ALIGNED>(simd, row, col, value);
    }
}

/// Read-only view factories, available on every [`Matrix`] implementor.
///
/// The returned views delegate each access to the parent's accessor. Dense
/// types with direct storage access shadow these with inherent methods of the
/// same names returning strided-pointer views instead; the selection happens
/// once, at the call site.
pub trait MatrixExt: Matrix + Sized {
    /// Returns a view over the block starting at `(start_row, start_col)`
    /// with dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    fn block(
        &self,
        start_row: usize,
        start_col: usize,
        nrows: usize,
        ncols: usize,
    ) -> BlockRef<&Self> {
        BlockRef::new(self, start_row, start_col, nrows, ncols)
    }

    /// Returns a view over the `H×W` block starting at
    /// `(start_row, start_col)`.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    fn fixed_block<const H: usize, const W: usize>(
        &self,
        start_row: usize,
        start_col: usize,
    ) -> BlockRef<&Self, Fixed<H>, Fixed<W>> {
        BlockRef::new_fixed(self, start_row, start_col)
    }

    /// Returns a view over the `i`-th row.
    ///
    /// # Panics
    /// Panics if `i >= self.nrows()`.
    #[inline]
    #[track_caller]
    fn row(&self, i: usize) -> BlockRef<&Self, Fixed<1>, usize> {
        BlockRef::from_row(self, i)
    }

    /// Returns a view over the `j`-th column.
    ///
    /// # Panics
    /// Panics if `j >= self.ncols()`.
    #[inline]
    #[track_caller]
    fn col(&self, j: usize) -> BlockRef<&Self, usize, Fixed<1>> {
        BlockRef::from_col(self, j)
    }

    /// Returns a view over the `nrows×ncols` block anchored at the given
    /// corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    fn corner(&self, corner: Corner, nrows: usize, ncols: usize) -> BlockRef<&Self> {
        let (i, j) = corner.start(self.nrows(), self.ncols(), nrows, ncols);
        BlockRef::new(self, i, j, nrows, ncols)
    }

    /// Returns a view over the `H×W` block anchored at the given corner.
    ///
    /// # Panics
    /// Panics if the block does not fit within `self`.
    #[inline]
    #[track_caller]
    fn fixed_corner<const H: usize, const W: usize>(
        &self,
        corner: Corner,
    ) -> BlockRef<&Self, Fixed<H>, Fixed<W>> {
        let (i, j) = corner.start(self.nrows(), self.ncols(), H, W);
        BlockRef::new_fixed(self, i, j)
    }
}

impl<M: Matrix> MatrixExt for M {}

/// Mutable view factories, available on every [`MatrixMut`] implementor.
pub trait MatrixMutExt: MatrixMut + Sized {
    /// Mutable version of [`MatrixExt::block`].
    #[inline]
    #[track_caller]
    fn block_mut(
        &mut self,
        start_row: usize,
        start_col: usize,
        nrows: usize,
        ncols: usize,
    ) -> BlockMut<&mut Self> {
        BlockMut::new(self, start_row, start_col, nrows, ncols)
    }

    /// Mutable version of [`MatrixExt::fixed_block`].
    #[inline]
    #[track_caller]
    fn fixed_block_mut<const H: usize, const W: usize>(
        &mut self,
        start_row: usize,
        start_col: usize,
    ) -> BlockMut<&mut Self, Fixed<H>, Fixed<W>> {
        BlockMut::new_fixed(self, start_row, start_col)
    }

    /// Mutable version of [`MatrixExt::row`].
    #[inline]
    #[track_caller]
    fn row_mut(&mut self, i: usize) -> BlockMut<&mut Self, Fixed<1>, usize> {
        BlockMut::from_row(self, i)
    }

    /// Mutable version of [`MatrixExt::col`].
    #[inline]
    #[track_caller]
    fn col_mut(&mut self, j: usize) -> BlockMut<&mut Self, usize, Fixed<1>> {
        BlockMut::from_col(self, j)
    }

    /// Mutable version of [`MatrixExt::corner`].
    #[inline]
    #[track_caller]
    fn corner_mut(
        &mut self,
        corner: Corner,
        nrows: usize,
        ncols: usize,
    ) -> BlockMut<&mut Self> {
        let (i, j) = corner.start(self.nrows(), self.ncols(), nrows, ncols);
        BlockMut::new(self, i, j, nrows, ncols)
    }

    /// Mutable version of [`MatrixExt::fixed_corner`].
    #[inline]
    #[track_caller]
    fn fixed_corner_mut<const H: usize, const W: usize>(
        &mut self,
        corner: Corner,
    ) -> BlockMut<&mut Self, Fixed<H>, Fixed<W>> {
        let (i, j) = corner.start(self.nrows(), self.ncols(), H, W);
        BlockMut::new_fixed(self, i, j)
    }
}

impl<M: MatrixMut> MatrixMutExt for M {}

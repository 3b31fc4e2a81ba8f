use crate::mat::Mat;
use crate::shape::{resolve_flags, resolve_max, Extent, Fixed, FixedExtent, Flags};
use crate::simd::{lanes, Packet, SimdElem};
use crate::traits::{DirectAccess, Matrix, PacketAccess};
use equator::{assert, debug_assert};
use pulp::Simd;

/// Read-only view over a rectangular region of a parent matrix, delegating
/// every access to the parent's accessor.
///
/// `M` is the parent as held by the view: a borrow (`&P`) in the common case,
/// or a by-value parent for a self-contained view.
#[derive(Copy, Clone)]
pub struct BlockRef<M, R: Extent = usize, C: Extent = usize> {
    pub(super) parent: M,
    pub(super) start_row: usize,
    pub(super) start_col: usize,
    pub(super) nrows: R,
    pub(super) ncols: C,
}

impl<M: Matrix, R: Extent, C: Extent> BlockRef<M, R, C> {
    /// `true` if the view is statically a single row.
    pub const IS_ROW: bool = matches!(R::STATIC, Some(1));
    /// `true` if the view is statically a single column.
    pub const IS_COL: bool = matches!(C::STATIC, Some(1));
    /// `true` if the view is statically a single row or a single column.
    pub const IS_VECTOR: bool = Self::IS_ROW || Self::IS_COL;

    /// Creates a view over the block of `parent` starting at
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

    /// Creates a view over the block of `parent` starting at
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

    /// Returns the parent held by the view.
    #[inline]
    pub fn parent(&self) -> &M {
        &self.parent
    }

    /// Returns the row of the parent at which the view starts.
    #[inline]
    pub fn start_row(&self) -> usize {
        self.start_row
    }

    /// Returns the column of the parent at which the view starts.
    #[inline]
    pub fn start_col(&self) -> usize {
        self.start_col
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
        unsafe { self.at_unchecked(row, col) }
    }

    /// Returns a reference to the element at `(row, col)` without bound
    /// checks.
    ///
    /// # Safety
    /// Requires `row < self.nrows()` and `col < self.ncols()`.
    #[inline]
    pub unsafe fn at_unchecked(&self, row: usize, col: usize) -> &M::Elem {
        debug_assert!(all(row < self.nrows(), col < self.ncols()));
        self.parent
            .coeff_unchecked(row + self.start_row, col + self.start_col)
    }

    /// Returns a reference to the element at `index` along a vector view: a
    /// single row is indexed by column, a single column by row. Only compiles
    /// for views that are statically a single row or column.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn at_linear(&self, index: usize) -> &M::Elem {
        const { core::assert!(Self::IS_VECTOR) };
        if Self::IS_ROW {
            self.at(0, index)
        } else {
            self.at(index, 0)
        }
    }

    /// Copies the viewed region into a freshly allocated [`Mat`].
    pub fn to_mat(&self) -> Mat<M::Elem>
    where
        M::Elem: Clone,
    {
        Mat::from_fn(self.nrows(), self.ncols(), |i, j| {
            unsafe { self.at_unchecked(i, j) }.clone()
        })
    }
}

impl<M: DirectAccess, R: Extent, C: Extent> BlockRef<M, R, C> {
    /// Returns a pointer to the element at `(0, 0)` of the view.
    #[inline]
    pub fn as_ptr(&self) -> *const M::Elem {
        self.parent.as_ptr().wrapping_offset(
            self.start_row as isize * self.parent.row_stride()
                + self.start_col as isize * self.parent.col_stride(),
        )
    }

    /// Returns the offset, in elements, between consecutive elements along
    /// the view's traversal axis: along the single row or column for vector
    /// views, along the parent's inner axis otherwise.
    #[inline]
    pub fn inner_stride(&self) -> isize {
        if Self::IS_ROW {
            self.parent.col_stride()
        } else if Self::IS_COL {
            self.parent.row_stride()
        } else if M::FLAGS.contains(Flags::ROW_MAJOR) {
            self.parent.col_stride()
        } else {
            self.parent.row_stride()
        }
    }

    /// Returns the offset, in elements, between consecutive lines of the
    /// view. For vector views this is the element count of the view.
    #[inline]
    pub fn outer_stride(&self) -> isize {
        if Self::IS_VECTOR {
            (self.nrows() * self.ncols()) as isize
        } else if M::FLAGS.contains(Flags::ROW_MAJOR) {
            self.parent.row_stride()
        } else {
            self.parent.col_stride()
        }
    }
}

impl<M: Matrix, C: Extent> BlockRef<M, Fixed<1>, C> {
    /// Creates a view over the `i`-th row of `parent`.
    ///
    /// The column extent is `usize` through the factory traits; instantiating
    /// it with a [`Fixed`] count instead keeps a parent's compile-time width,
    /// and the capabilities that depend on it.
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

impl<M: Matrix, R: Extent> BlockRef<M, R, Fixed<1>> {
    /// Creates a view over the `j`-th column of `parent`.
    ///
    /// The row extent is `usize` through the factory traits; instantiating it
    /// with a [`Fixed`] count instead keeps a parent's compile-time height.
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

impl<M: PacketAccess, R: Extent, C: Extent> BlockRef<M, R, C>
where
    M::Elem: SimdElem,
{
    /// Loads one packet starting at `index` along a vector view. Only
    /// compiles for views whose capability flags include both packet and
    /// linear access.
    ///
    /// # Safety
    /// The whole packet must be in bounds, and the view's traversal axis
    /// must be contiguous in the parent.
    #[inline]
    pub unsafe fn packet_linear<S: Simd>(&self, simd: S, index: usize) -> Packet<M::Elem, S> {
        const {
            core::assert!(
                <Self as Matrix>::FLAGS.contains(Flags::PACKET)
                    && <Self as Matrix>::FLAGS.contains(Flags::LINEAR)
            )
        };
        debug_assert!(index + lanes::<M::Elem, S>() <= self.nrows() * self.ncols());
        if Self::IS_ROW {
            self.parent
                .packet::<S, false>(simd, self.start_row, index + self.start_col)
        } else {
            self.parent
                .packet::<S, false>(simd, index + self.start_row, self.start_col)
        }
    }
}

impl<M: Matrix, R: Extent, C: Extent> Matrix for BlockRef<M, R, C> {
    type Elem = M::Elem;

    const ROWS: Option<usize> = R::STATIC;
    const COLS: Option<usize> = C::STATIC;
    const MAX_ROWS: Option<usize> = resolve_max(R::STATIC, M::MAX_ROWS);
    const MAX_COLS: Option<usize> = resolve_max(C::STATIC, M::MAX_COLS);
    const FLAGS: Flags = resolve_flags(
        M::FLAGS,
        core::mem::size_of::<M::Elem>(),
        R::STATIC,
        C::STATIC,
        Self::MAX_ROWS,
        Self::MAX_COLS,
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
    fn coeff(&self, row: usize, col: usize) -> &M::Elem {
        self.at(row, col)
    }

    #[inline(always)]
    unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &M::Elem {
        self.at_unchecked(row, col)
    }
}

unsafe impl<M: DirectAccess, R: Extent, C: Extent> DirectAccess for BlockRef<M, R, C> {
    #[inline(always)]
    fn as_ptr(&self) -> *const M::Elem {
        (*self).as_ptr()
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

impl<M: PacketAccess, R: Extent, C: Extent> PacketAccess for BlockRef<M, R, C>
where
    M::Elem: SimdElem,
{
    // the view offset is not a multiple of the packet width in general, so
    // the parent is always addressed in unaligned mode
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

impl<M1, M2, R1, C1, R2, C2> PartialEq<BlockRef<M2, R2, C2>> for BlockRef<M1, R1, C1>
where
    M1: Matrix,
    M2: Matrix,
    M1::Elem: PartialEq<M2::Elem>,
    R1: Extent,
    C1: Extent,
    R2: Extent,
    C2: Extent,
{
    fn eq(&self, other: &BlockRef<M2, R2, C2>) -> bool {
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

impl<M: Matrix, R: Extent, C: Extent> core::fmt::Debug for BlockRef<M, R, C>
where
    M::Elem: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "[")?;
        for i in 0..self.nrows() {
            f.write_str("    [")?;
            for j in 0..self.ncols() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{:?}", self.at(i, j))?;
            }
            f.write_str("],\n")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use crate::traits::MatrixExt;
    use crate::{mat, Corner};

    // delegation-only parent: row-major storage, no direct or packet access
    struct RowMajor {
        data: Vec<i32>,
        nrows: usize,
        ncols: usize,
    }

    impl RowMajor {
        fn new(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> i32) -> Self {
            let mut data = Vec::with_capacity(nrows * ncols);
            for i in 0..nrows {
                for j in 0..ncols {
                    data.push(f(i, j));
                }
            }
            Self { data, nrows, ncols }
        }
    }

    impl Matrix for RowMajor {
        type Elem = i32;

        const FLAGS: Flags = Flags::ROW_MAJOR;

        fn nrows(&self) -> usize {
            self.nrows
        }

        fn ncols(&self) -> usize {
            self.ncols
        }

        #[track_caller]
        fn coeff(&self, row: usize, col: usize) -> &i32 {
            assert!(all(row < self.nrows, col < self.ncols));
            &self.data[row * self.ncols + col]
        }

        unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &i32 {
            self.data.get_unchecked(row * self.ncols + col)
        }
    }

    #[test]
    fn test_delegation() {
        let p = RowMajor::new(4, 5, |i, j| (10 * i + j) as i32);
        let b = p.block(1, 2, 2, 3);

        assert_eq!(b.nrows(), 2);
        assert_eq!(b.ncols(), 3);
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(b.at(i, j), p.coeff(i + 1, j + 2));
            }
        }
    }

    #[test]
    fn test_block_of_block() {
        let p = RowMajor::new(6, 6, |i, j| (10 * i + j) as i32);
        let outer = p.block(1, 1, 4, 4);
        let inner = outer.block(2, 1, 2, 2);

        for i in 0..2 {
            for j in 0..2 {
                // offsets accumulate through nesting
                assert_eq!(inner.at(i, j), p.coeff(i + 3, j + 2));
            }
        }
    }

    #[test]
    fn test_single_index_protocol() {
        let p = RowMajor::new(3, 4, |i, j| (10 * i + j) as i32);

        let row = p.row(2);
        assert_eq!(row.nrows(), 1);
        assert_eq!(row.ncols(), 4);
        for j in 0..4 {
            assert_eq!(*row.at_linear(j), (20 + j) as i32);
        }

        let col = p.col(1);
        assert_eq!(col.nrows(), 3);
        assert_eq!(col.ncols(), 1);
        for i in 0..3 {
            assert_eq!(*col.at_linear(i), (10 * i + 1) as i32);
        }
    }

    #[test]
    fn test_fixed_protocol_matches_dynamic() {
        let p = RowMajor::new(4, 4, |i, j| (10 * i + j) as i32);
        let fixed = p.fixed_block::<2, 3>(1, 0);
        let dynamic = p.block(1, 0, 2, 3);
        assert!(fixed == dynamic);
    }

    #[test]
    #[should_panic]
    fn test_extent_mismatch() {
        let p = RowMajor::new(4, 4, |i, j| (10 * i + j) as i32);
        let _ = BlockRef::<_, Fixed<2>, Fixed<2>>::new(&p, 0, 0, 2, 3);
    }

    #[test]
    #[should_panic]
    fn test_block_does_not_fit() {
        let p = RowMajor::new(4, 4, |i, j| (10 * i + j) as i32);
        let _ = p.block(3, 0, 2, 2);
    }

    #[test]
    fn test_empty_block_at_edge() {
        let p = RowMajor::new(4, 4, |i, j| (10 * i + j) as i32);
        let b = p.block(4, 4, 0, 0);
        assert_eq!(b.nrows(), 0);
        assert_eq!(b.ncols(), 0);
    }

    #[test]
    fn test_corner() {
        let p = RowMajor::new(4, 5, |i, j| (10 * i + j) as i32);
        let c = p.corner(Corner::BottomRight, 2, 2);
        assert_eq!(c.at(0, 0), p.coeff(2, 3));
        assert_eq!(c.at(1, 1), p.coeff(3, 4));

        let f = p.fixed_corner::<2, 2>(Corner::TopRight);
        assert_eq!(f.at(0, 0), p.coeff(0, 3));
    }

    #[test]
    fn test_flags_and_max() {
        type Parent = crate::Mat<f64>;
        type Block<'a> = BlockRef<&'a Parent>;
        type Row<'a> = BlockRef<&'a Parent, Fixed<1>, usize>;
        type Col<'a> = BlockRef<&'a Parent, usize, Fixed<1>>;
        type RowOfRowMajor<'a> = BlockRef<&'a RowMajor, Fixed<1>, usize>;

        assert!(<Block<'_> as Matrix>::FLAGS.contains(Flags::DIRECT));
        assert!(<Block<'_> as Matrix>::FLAGS.contains(Flags::PACKET));
        assert!(!<Block<'_> as Matrix>::FLAGS.contains(Flags::LINEAR));

        // the inner axis of a single row of a column-major parent is one
        // element long: no packets, but linear addressing
        assert!(!<Row<'_> as Matrix>::FLAGS.contains(Flags::PACKET));
        assert!(<Row<'_> as Matrix>::FLAGS.contains(Flags::LINEAR));
        assert_eq!(<Row<'_> as Matrix>::MAX_ROWS, Some(1));

        assert!(<Col<'_> as Matrix>::FLAGS.contains(Flags::PACKET));
        assert!(<Col<'_> as Matrix>::FLAGS.contains(Flags::LINEAR));
        assert_eq!(<Col<'_> as Matrix>::MAX_COLS, Some(1));

        // a row of a row-major parent is contiguous, but the parent has no
        // packet capability to inherit
        assert!(!<RowOfRowMajor<'_> as Matrix>::FLAGS.contains(Flags::PACKET));
        assert!(<RowOfRowMajor<'_> as Matrix>::FLAGS.contains(Flags::ROW_MAJOR));
    }

    // row-major parent with a compile-time 2×4 shape
    struct FixedWide {
        data: [f32; 8],
    }

    impl Matrix for FixedWide {
        type Elem = f32;

        const ROWS: Option<usize> = Some(2);
        const COLS: Option<usize> = Some(4);
        const MAX_ROWS: Option<usize> = Some(2);
        const MAX_COLS: Option<usize> = Some(4);
        const FLAGS: Flags = Flags::ROW_MAJOR.union(Flags::PACKET);

        fn nrows(&self) -> usize {
            2
        }

        fn ncols(&self) -> usize {
            4
        }

        #[track_caller]
        fn coeff(&self, row: usize, col: usize) -> &f32 {
            assert!(all(row < 2, col < 4));
            &self.data[row * 4 + col]
        }

        unsafe fn coeff_unchecked(&self, row: usize, col: usize) -> &f32 {
            self.data.get_unchecked(row * 4 + col)
        }
    }

    impl PacketAccess for FixedWide {
        unsafe fn packet<S: pulp::Simd, const ALIGNED: bool>(
            &self,
            simd: S,
            row: usize,
            col: usize,
        ) -> Packet<f32, S> {
            f32::load_packet(simd, self.data.as_ptr().add(row * 4 + col))
        }
    }

    #[test]
    fn test_row_keeps_static_width() {
        let p = FixedWide {
            data: [0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0],
        };

        let row = BlockRef::<_, Fixed<1>, Fixed<4>>::from_row(&p, 1);
        for j in 0..4 {
            assert_eq!(*row.at_linear(j), (10 + j) as f32);
        }

        // a four-wide row of a row-major parent holds a whole f32 packet,
        // but only if the width survives as a compile-time extent
        type FixedRow<'a> = BlockRef<&'a FixedWide, Fixed<1>, Fixed<4>>;
        type DynRow<'a> = BlockRef<&'a FixedWide, Fixed<1>, usize>;
        assert!(<FixedRow<'_> as Matrix>::FLAGS.contains(Flags::PACKET));
        assert!(<FixedRow<'_> as Matrix>::FLAGS.contains(Flags::LINEAR));
        assert!(!<DynRow<'_> as Matrix>::FLAGS.contains(Flags::PACKET));
        assert_eq!(<FixedRow<'_> as Matrix>::MAX_COLS, Some(4));
    }

    #[test]
    #[should_panic]
    fn test_row_static_width_mismatch() {
        let p = FixedWide {
            data: [0.0; 8],
        };
        let _ = BlockRef::<_, Fixed<1>, Fixed<3>>::from_row(&p, 0);
    }

    #[test]
    fn test_direct_access_strides() {
        let m = mat![[1.0, 4.0, 7.0], [2.0, 5.0, 8.0], [3.0, 6.0, 9.0f64]];
        let b = MatrixExt::block(&m, 1, 1, 2, 2);

        assert_eq!(b.row_stride(), 1);
        assert_eq!(b.col_stride(), 3);
        assert_eq!(unsafe { &*b.as_ptr() }, &5.0);
        assert_eq!(b.inner_stride(), 1);
        assert_eq!(b.outer_stride(), 3);

        let row = MatrixExt::row(&m, 1);
        assert_eq!(row.inner_stride(), 3);
        assert_eq!(row.outer_stride(), 3);

        let col = MatrixExt::col(&m, 2);
        assert_eq!(col.inner_stride(), 1);
        assert_eq!(col.outer_stride(), 3);
    }

    #[test]
    fn test_packet_matches_scalar() {
        struct Impl<'a> {
            block: BlockRef<&'a crate::Mat<f32>>,
        }

        impl pulp::WithSimd for Impl<'_> {
            type Output = ();

            #[inline(always)]
            fn with_simd<S: pulp::Simd>(self, simd: S) -> Self::Output {
                let block = self.block;
                let lanes = crate::simd::lanes::<f32, S>();
                let mut row = 0;
                while row + lanes <= block.nrows() {
                    for col in 0..block.ncols() {
                        let p = unsafe { block.packet::<S, false>(simd, row, col) };
                        let p: &[f32] = bytemuck::cast_slice(core::slice::from_ref(&p));
                        for (k, &v) in p.iter().enumerate() {
                            assert_eq!(v, *block.at(row + k, col));
                        }
                    }
                    row += lanes;
                }
            }
        }

        let m = crate::Mat::from_fn(16, 4, |i, j| (i + 100 * j) as f32);
        let block = MatrixExt::block(&m, 3, 1, 12, 3);
        pulp::Arch::new().dispatch(Impl { block });
    }

    #[test]
    fn test_random_geometry() {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let p = RowMajor::new(13, 9, |i, j| (100 * i + j) as i32);

        for _ in 0..100 {
            let start_row = rng.gen_range(0..=p.nrows());
            let start_col = rng.gen_range(0..=p.ncols());
            let nrows = rng.gen_range(0..=p.nrows() - start_row);
            let ncols = rng.gen_range(0..=p.ncols() - start_col);

            let b = p.block(start_row, start_col, nrows, ncols);
            for i in 0..nrows {
                for j in 0..ncols {
                    assert_eq!(b.at(i, j), p.coeff(i + start_row, j + start_col));
                }
            }
        }
    }

    #[test]
    fn test_to_mat() {
        let p = RowMajor::new(3, 3, |i, j| (10 * i + j) as i32);
        let m = p.block(1, 1, 2, 2).to_mat();
        assert_eq!(m[(0, 0)], 11);
        assert_eq!(m[(1, 1)], 22);
    }
}

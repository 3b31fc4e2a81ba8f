//! Delegating block views: [`BlockRef`] and [`BlockMut`].
//!
//! Unlike the strided-pointer views of [`crate::mat`], these hold their
//! parent by value and forward every element access to the parent's own
//! accessor, translated by the block's offsets. They therefore work over any
//! [`Matrix`](crate::Matrix) implementor, including ones with no raw storage
//! to point into.
//!
//! The parent type parameter decides the ownership story: `&M`/`&mut M`
//! borrow the parent (the usual case, and what the
//! [`MatrixExt`](crate::MatrixExt)/[`MatrixMutExt`](crate::MatrixMutExt)
//! factories produce), while a by-value parent such as an owned
//! [`Mat`](crate::Mat) makes the view self-contained at the price of moving
//! (or copying a handle to) the parent into it.

pub(crate) mod blockmut;
pub(crate) mod blockref;

pub use blockmut::BlockMut;
pub use blockref::BlockRef;

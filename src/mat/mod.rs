//! Dense column-major matrix types: the owning [`Mat`] and the
//! strided-pointer views [`MatRef`] and [`MatMut`].
//!
//! The views are the direct-access specialization of the crate: instead of
//! delegating each access to a parent accessor, they address storage through
//! a base pointer computed once at construction plus row/column strides.

pub(crate) mod matmut;
pub(crate) mod matown;
pub(crate) mod matref;

pub use matmut::MatMut;
pub use matown::Mat;
pub use matref::MatRef;

//! Packet (SIMD) element support.
//!
//! A packet is a register-sized group of consecutive elements along the inner
//! axis, loaded and stored through [`pulp`]'s architecture-dispatched register
//! types. [`SimdElem`] maps an element type to its register type for a given
//! [`pulp::Simd`] token; the trait is deliberately minimal since this crate
//! only moves packets around and never computes with them.

use bytemuck::Pod;
use equator::debug_assert;
use pulp::Simd;

/// Packet register type of `T` under the instruction set `S`.
pub type Packet<T, S> = <T as SimdElem>::Packet<S>;

/// Element types that can be grouped into SIMD packets.
///
/// # Safety contract of the load/store methods
/// `ptr` must be valid for reads (resp. writes) of one full packet, i.e.
/// `lanes::<Self, S>()` consecutive elements. The `aligned` variants
/// additionally require `ptr` to be aligned to the packet size; the plain
/// variants make no alignment assumption.
pub trait SimdElem: Pod {
    /// The register type holding one packet of `Self`.
    type Packet<S: Simd>: Pod + core::fmt::Debug;

    /// Loads one packet from `ptr` without assuming alignment.
    ///
    /// # Safety
    /// See the trait-level contract.
    unsafe fn load_packet<S: Simd>(simd: S, ptr: *const Self) -> Self::Packet<S>;

    /// Loads one packet from `ptr`, which must be packet-aligned.
    ///
    /// # Safety
    /// See the trait-level contract.
    unsafe fn load_packet_aligned<S: Simd>(simd: S, ptr: *const Self) -> Self::Packet<S>;

    /// Stores one packet to `ptr` without assuming alignment.
    ///
    /// # Safety
    /// See the trait-level contract.
    unsafe fn store_packet<S: Simd>(simd: S, ptr: *mut Self, value: Self::Packet<S>);

    /// Stores one packet to `ptr`, which must be packet-aligned.
    ///
    /// # Safety
    /// See the trait-level contract.
    unsafe fn store_packet_aligned<S: Simd>(simd: S, ptr: *mut Self, value: Self::Packet<S>);
}

macro_rules! impl_simd_elem {
    ($($ty: ty => $reg: ident),* $(,)?) => {$(
        impl SimdElem for $ty {
            type Packet<S: Simd> = S::$reg;

            #[inline(always)]
            unsafe fn load_packet<S: Simd>(simd: S, ptr: *const Self) -> S::$reg {
                let _ = simd;
                (ptr as *const S::$reg).read_unaligned()
            }

            #[inline(always)]
            unsafe fn load_packet_aligned<S: Simd>(simd: S, ptr: *const Self) -> S::$reg {
                let _ = simd;
                debug_assert!(ptr.align_offset(core::mem::align_of::<S::$reg>()) == 0);
                (ptr as *const S::$reg).read()
            }

            #[inline(always)]
            unsafe fn store_packet<S: Simd>(simd: S, ptr: *mut Self, value: S::$reg) {
                let _ = simd;
                (ptr as *mut S::$reg).write_unaligned(value);
            }

            #[inline(always)]
            unsafe fn store_packet_aligned<S: Simd>(simd: S, ptr: *mut Self, value: S::$reg) {
                let _ = simd;
                debug_assert!(ptr.align_offset(core::mem::align_of::<S::$reg>()) == 0);
                (ptr as *mut S::$reg).write(value);
            }
        }
    )*};
}

impl_simd_elem! {
    f32 => f32s,
    f64 => f64s,
    i32 => i32s,
    i64 => i64s,
    u32 => u32s,
    u64 => u64s,
}

/// Number of elements in one packet of `T` under the instruction set `S`.
pub const fn lanes<T: SimdElem, S: Simd>() -> usize {
    core::mem::size_of::<T::Packet<S>>() / core::mem::size_of::<T>()
}

/// Baseline packet width used by the capability-flag resolver: one 128-bit
/// vector register, the width `pulp` guarantees on every dispatch target.
/// Oversized or zero-sized elements degenerate to scalar packets.
pub const fn packet_width(elem_size: usize) -> usize {
    if elem_size == 0 || elem_size > 16 {
        1
    } else {
        16 / elem_size
    }
}

//! Static/dynamic extents and capability flags.
//!
//! An [`Extent`] is the length of a view along one axis. It is either a
//! compile-time constant ([`Fixed`]), which occupies no runtime storage, or a
//! runtime `usize`. The choice is made per axis, so a view can mix a fixed
//! row count with a dynamic column count.
//!
//! [`Flags`] is the capability bitmask reported by the
//! [`Matrix`](crate::Matrix) trait query interface. The `resolve_*` functions
//! compute a view's metadata from its parent's metadata and the requested
//! extents, entirely at compile time.

use equator::assert;

/// Length of a view along one axis, either fixed at compile time or stored at
/// runtime.
pub trait Extent: Copy + Eq + core::fmt::Debug + Send + Sync + 'static {
    /// The compile-time length, or `None` if it is only known at runtime.
    const STATIC: Option<usize>;

    /// Returns the runtime length.
    fn size(self) -> usize;

    /// Builds an extent from a runtime length.
    ///
    /// # Panics
    /// Panics if the length does not match [`Extent::STATIC`] when the latter
    /// is known.
    fn from_size(size: usize) -> Self;
}

/// Compile-time extent. Zero-sized: a view with `Fixed` extents stores no
/// length for that axis.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Fixed<const N: usize>;

/// Marker for extents whose length is known at compile time. Gates the
/// fixed-size construction protocol.
pub trait FixedExtent: Extent {
    /// Same value as `Self::STATIC`, without the `Option`.
    const SIZE: usize;
}

impl<const N: usize> Extent for Fixed<N> {
    const STATIC: Option<usize> = Some(N);

    #[inline(always)]
    fn size(self) -> usize {
        N
    }

    #[inline]
    #[track_caller]
    fn from_size(size: usize) -> Self {
        assert!(size == N);
        Fixed
    }
}

impl<const N: usize> FixedExtent for Fixed<N> {
    const SIZE: usize = N;
}

impl Extent for usize {
    const STATIC: Option<usize> = None;

    #[inline(always)]
    fn size(self) -> usize {
        self
    }

    #[inline(always)]
    fn from_size(size: usize) -> Self {
        size
    }
}

/// Capability bitmask of a matrix or view, in the sense of the trait query
/// interface: which access paths are legal for the type, decided at compile
/// time.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    /// No capabilities.
    pub const NONE: Flags = Flags(0);
    /// The inner (fastest-varying) axis is the column axis.
    pub const ROW_MAJOR: Flags = Flags(1 << 0);
    /// Vectorized packet loads/stores are legal.
    pub const PACKET: Flags = Flags(1 << 1);
    /// Single-subscript addressing is legal (the type is statically a single
    /// row or a single column).
    pub const LINEAR: Flags = Flags(1 << 2);
    /// The storage is addressable through a raw base pointer and strides.
    pub const DIRECT: Flags = Flags(1 << 3);

    /// Returns the union of `self` and `other`.
    #[inline]
    pub const fn union(self, other: Flags) -> Flags {
        Flags(self.0 | other.0)
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    #[inline]
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    const fn set(self, flag: Flags, cond: bool) -> Flags {
        if cond { self.union(flag) } else { self }
    }
}

impl core::ops::BitOr for Flags {
    type Output = Flags;

    #[inline]
    fn bitor(self, rhs: Flags) -> Flags {
        self.union(rhs)
    }
}

impl core::fmt::Debug for Flags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut list = f.debug_list();
        for (flag, name) in [
            (Flags::ROW_MAJOR, "ROW_MAJOR"),
            (Flags::PACKET, "PACKET"),
            (Flags::LINEAR, "LINEAR"),
            (Flags::DIRECT, "DIRECT"),
        ] {
            if self.contains(flag) {
                list.entry(&name);
            }
        }
        list.finish()
    }
}

/// Maximum count of a view along one axis: a single row/column is capped at
/// `1`, a dynamic extent inherits the parent's maximum, a fixed extent is its
/// own maximum.
pub const fn resolve_max(extent: Option<usize>, parent_max: Option<usize>) -> Option<usize> {
    match extent {
        Some(1) => Some(1),
        None => parent_max,
        Some(n) => Some(n),
    }
}

/// Capability flags of a view with the given static extents, taken from a
/// parent with the given flags.
///
/// Packet access survives only if the inner-axis maximum is dynamic or the
/// inner-axis static extent holds at least one full packet. Linear access is
/// granted exactly to static single-row/single-column views. Direct access
/// and row-major-ness are inherited.
pub const fn resolve_flags(
    parent: Flags,
    elem_size: usize,
    rows: Option<usize>,
    cols: Option<usize>,
    max_rows: Option<usize>,
    max_cols: Option<usize>,
) -> Flags {
    let row_major = parent.contains(Flags::ROW_MAJOR);
    let (inner, inner_max) = if row_major {
        (cols, max_cols)
    } else {
        (rows, max_rows)
    };

    let packet_ok = match inner_max {
        None => true,
        Some(_) => match inner {
            Some(n) => n >= crate::simd::packet_width(elem_size),
            None => false,
        },
    };
    let linear = matches!(rows, Some(1)) || matches!(cols, Some(1));

    Flags::NONE
        .set(Flags::ROW_MAJOR, row_major)
        .set(Flags::PACKET, parent.contains(Flags::PACKET) && packet_ok)
        .set(Flags::LINEAR, linear)
        .set(Flags::DIRECT, parent.contains(Flags::DIRECT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;

    const DENSE: Flags = Flags::DIRECT.union(Flags::PACKET);

    #[test]
    fn test_extent_roundtrip() {
        assert_eq!(<Fixed<3>>::from_size(3).size(), 3);
        assert_eq!(<usize as Extent>::from_size(7).size(), 7);
        assert_eq!(<Fixed<3>>::STATIC, Some(3));
        assert_eq!(<usize as Extent>::STATIC, None);
        assert_eq!(core::mem::size_of::<Fixed<3>>(), 0);
    }

    #[test]
    #[should_panic]
    fn test_extent_mismatch() {
        let _ = <Fixed<3>>::from_size(4);
    }

    #[test]
    fn test_resolve_max() {
        // a single row is capped at 1 regardless of the parent
        assert_eq!(resolve_max(Some(1), Some(8)), Some(1));
        assert_eq!(resolve_max(Some(1), None), Some(1));
        // a dynamic extent inherits the parent's maximum
        assert_eq!(resolve_max(None, Some(8)), Some(8));
        assert_eq!(resolve_max(None, None), None);
        // a fixed extent is its own maximum
        assert_eq!(resolve_max(Some(4), None), Some(4));
    }

    #[test]
    fn test_resolve_flags_linear() {
        let f = resolve_flags(DENSE, 8, Some(1), None, Some(1), None);
        assert!(f.contains(Flags::LINEAR));

        let f = resolve_flags(DENSE, 8, None, Some(1), None, Some(1));
        assert!(f.contains(Flags::LINEAR));

        let f = resolve_flags(DENSE, 8, None, None, None, None);
        assert!(!f.contains(Flags::LINEAR));
    }

    #[test]
    fn test_resolve_flags_packet() {
        // dynamic inner max keeps packet access
        let f = resolve_flags(DENSE, 8, None, None, None, None);
        assert!(f.contains(Flags::PACKET));

        // fixed inner extent below one packet loses it (f64: 2 lanes)
        let f = resolve_flags(DENSE, 8, Some(1), None, Some(1), None);
        assert!(!f.contains(Flags::PACKET));

        // fixed inner extent of at least one packet keeps it
        let f = resolve_flags(DENSE, 8, Some(2), None, Some(2), None);
        assert!(f.contains(Flags::PACKET));

        // a parent without packet access never grants it
        let f = resolve_flags(Flags::NONE, 8, None, None, None, None);
        assert!(!f.contains(Flags::PACKET));
    }

    #[test]
    fn test_resolve_flags_inherited() {
        let f = resolve_flags(DENSE.union(Flags::ROW_MAJOR), 8, None, None, None, None);
        assert!(f.contains(Flags::ROW_MAJOR));
        assert!(f.contains(Flags::DIRECT));

        let f = resolve_flags(Flags::PACKET, 8, None, None, None, None);
        assert!(!f.contains(Flags::DIRECT));
    }
}

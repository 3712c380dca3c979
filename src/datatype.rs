//! MPI datatype trait and type tag mapping.
//!
//! This module provides the [`MpiDatatype`] trait, a sealed trait that maps Rust
//! primitive types to MPI datatype tags for use in generic communication operations.
//!
//! # Supported Types
//!
//! | Rust Type | MPI Equivalent     | Tag Value |
//! |-----------|-------------------|-----------|
//! | `f32`     | `MPI_FLOAT`       | 0         |
//! | `f64`     | `MPI_DOUBLE`      | 1         |
//! | `i32`     | `MPI_INT`         | 2         |
//! | `i64`     | `MPI_INT64_T`     | 3         |
//! | `u8`      | `MPI_BYTE`        | 4         |
//! | `u32`     | `MPI_UINT32_T`    | 5         |
//! | `u64`     | `MPI_UINT64_T`    | 6         |
//!
//! `u8` maps to `MPI_BYTE` and `i32` to `MPI_INT` so that traces record the
//! same datatypes a C program sending text payloads and integer flags would.

/// Internal module to seal the trait; blocks implementations outside the crate.
mod sealed {
    pub trait Sealed {}
}

/// Tag values matching C-side `MPITRACE_*` defines.
///
/// These discriminants must stay in sync with the `#define MPITRACE_*` values
/// in `csrc/mpitrace.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DatatypeTag {
    /// 32-bit floating point (`MPI_FLOAT`)
    F32 = 0,
    /// 64-bit floating point (`MPI_DOUBLE`)
    F64 = 1,
    /// 32-bit signed integer (`MPI_INT`)
    I32 = 2,
    /// 64-bit signed integer (`MPI_INT64_T`)
    I64 = 3,
    /// Raw byte (`MPI_BYTE`)
    U8 = 4,
    /// 32-bit unsigned integer (`MPI_UINT32_T`)
    U32 = 5,
    /// 64-bit unsigned integer (`MPI_UINT64_T`)
    U64 = 6,
}

/// Trait for types that can be used in MPI communication operations.
///
/// This is a **sealed trait**: it cannot be implemented outside this crate.
/// Supported types: [`f32`], [`f64`], [`i32`], [`i64`], [`u8`], [`u32`], [`u64`].
///
/// The `Default` bound lets the suite allocate zeroed receive buffers for any
/// datatype.
pub trait MpiDatatype: sealed::Sealed + Copy + Default + Send + 'static {
    /// The datatype tag used for FFI dispatch to the C layer.
    const TAG: DatatypeTag;
}

macro_rules! impl_mpi_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl MpiDatatype for $ty {
            const TAG: DatatypeTag = $tag;
        }
    };
}

impl_mpi_datatype!(f32, DatatypeTag::F32);
impl_mpi_datatype!(f64, DatatypeTag::F64);
impl_mpi_datatype!(i32, DatatypeTag::I32);
impl_mpi_datatype!(i64, DatatypeTag::I64);
impl_mpi_datatype!(u8, DatatypeTag::U8);
impl_mpi_datatype!(u32, DatatypeTag::U32);
impl_mpi_datatype!(u64, DatatypeTag::U64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datatype_tags_match_c_defines() {
        assert_eq!(f32::TAG as i32, 0); // MPITRACE_F32
        assert_eq!(f64::TAG as i32, 1); // MPITRACE_F64
        assert_eq!(i32::TAG as i32, 2); // MPITRACE_I32
        assert_eq!(i64::TAG as i32, 3); // MPITRACE_I64
        assert_eq!(u8::TAG as i32, 4); // MPITRACE_U8
        assert_eq!(u32::TAG as i32, 5); // MPITRACE_U32
        assert_eq!(u64::TAG as i32, 6); // MPITRACE_U64
    }

    #[test]
    fn datatype_tag_values_are_sequential() {
        let tags = [
            DatatypeTag::F32,
            DatatypeTag::F64,
            DatatypeTag::I32,
            DatatypeTag::I64,
            DatatypeTag::U8,
            DatatypeTag::U32,
            DatatypeTag::U64,
        ];
        for (i, tag) in tags.iter().enumerate() {
            assert_eq!(*tag as i32, i as i32, "Tag {tag:?} should have value {i}");
        }
    }

    #[test]
    fn default_values_are_zero() {
        fn zero<T: MpiDatatype>() -> T {
            T::default()
        }
        assert_eq!(zero::<u8>(), 0);
        assert_eq!(zero::<i32>(), 0);
        assert!(zero::<f64>().abs() < f64::EPSILON);
    }
}

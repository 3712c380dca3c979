//! Error types for mpitrace

use crate::ffi;
use thiserror::Error;

/// Result type for MPI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum length of an error string fetched from the MPI runtime.
const ERROR_STRING_MAX_LEN: usize = 4096;

/// Portable MPI error classes.
///
/// MPI implementations number their error classes differently; the C shim
/// translates them into these discriminants (see `MPITRACE_CLASS_*` in
/// `csrc/mpitrace.h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MpiErrorClass {
    /// Error raised by the C shim itself (bad handle, full table)
    Shim = -1,
    /// Any class without a dedicated variant
    Other = 0,
    /// Invalid buffer pointer
    Buffer = 1,
    /// Invalid count argument
    Count = 2,
    /// Invalid datatype argument
    Type = 3,
    /// Invalid tag argument
    Tag = 4,
    /// Invalid communicator
    Comm = 5,
    /// Invalid rank
    Rank = 6,
    /// Invalid root
    Root = 7,
    /// Invalid group
    Group = 8,
    /// Invalid operation
    Op = 9,
    /// Invalid request handle
    Request = 10,
    /// Invalid argument of some other kind
    Arg = 11,
    /// Message truncated on receive
    Truncate = 12,
    /// Internal MPI error
    Intern = 13,
    /// Pending request
    Pending = 14,
    /// Error code is in status
    InStatus = 15,
}

impl MpiErrorClass {
    /// Map a raw class value reported by the shim.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            -1 => MpiErrorClass::Shim,
            1 => MpiErrorClass::Buffer,
            2 => MpiErrorClass::Count,
            3 => MpiErrorClass::Type,
            4 => MpiErrorClass::Tag,
            5 => MpiErrorClass::Comm,
            6 => MpiErrorClass::Rank,
            7 => MpiErrorClass::Root,
            8 => MpiErrorClass::Group,
            9 => MpiErrorClass::Op,
            10 => MpiErrorClass::Request,
            11 => MpiErrorClass::Arg,
            12 => MpiErrorClass::Truncate,
            13 => MpiErrorClass::Intern,
            14 => MpiErrorClass::Pending,
            15 => MpiErrorClass::InStatus,
            _ => MpiErrorClass::Other,
        }
    }
}

/// Error types for MPI operations
#[derive(Error, Debug)]
pub enum Error {
    /// MPI has already been initialized
    #[error("MPI has already been initialized")]
    AlreadyInitialized,

    /// Invalid rank specified
    #[error("Invalid rank: {0}")]
    InvalidRank(i32),

    /// Invalid (null or freed) communicator handle
    #[error("Invalid communicator")]
    InvalidCommunicator,

    /// Invalid (null, freed or still active) request handle
    #[error("Invalid request handle")]
    InvalidRequest,

    /// Invalid buffer provided
    #[error("Invalid buffer")]
    InvalidBuffer,

    /// Invalid count specified
    #[error("Invalid count: {0}")]
    InvalidCount(i64),

    /// MPI error reported by the runtime
    #[error("MPI error {class:?} (code {code}): {message}")]
    Mpi {
        /// Portable error class
        class: MpiErrorClass,
        /// Raw error code returned by the call
        code: i32,
        /// Message from `MPI_Error_string`
        message: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an error from a non-zero return code, querying the MPI runtime
    /// for its class and message.
    pub fn from_code(code: i32) -> Self {
        debug_assert_ne!(code, 0, "from_code called with success code");
        let mut class: i32 = 0;
        let mut buf = vec![0u8; ERROR_STRING_MAX_LEN];
        let mut len: i32 = 0;
        let ret = unsafe {
            ffi::mpitrace_error_info(code, &mut class, buf.as_mut_ptr().cast(), &mut len)
        };
        if ret != 0 {
            return Error::mpi(code, MpiErrorClass::Other, String::new());
        }
        let len = (len.max(0) as usize).min(buf.len());
        let message = String::from_utf8_lossy(&buf[..len]).into_owned();
        Error::mpi(code, MpiErrorClass::from_raw(class), message)
    }

    /// Build an [`Error::Mpi`] from its parts.
    pub fn mpi(code: i32, class: MpiErrorClass, message: impl Into<String>) -> Self {
        Error::Mpi {
            class,
            code,
            message: message.into(),
        }
    }

    /// Check an MPI return code, returning Ok(()) for success.
    pub fn check(code: i32) -> Result<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(Error::from_code(code))
        }
    }

    /// The portable class, if this error came from the MPI runtime.
    pub fn class(&self) -> Option<MpiErrorClass> {
        match self {
            Error::Mpi { class, .. } => Some(*class),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_values_match_c_defines() {
        assert_eq!(MpiErrorClass::Shim as i32, -1);
        assert_eq!(MpiErrorClass::Other as i32, 0);
        assert_eq!(MpiErrorClass::Request as i32, 10);
        assert_eq!(MpiErrorClass::InStatus as i32, 15);
    }

    #[test]
    fn from_raw_round_trips_known_classes() {
        for raw in -1..=15 {
            assert_eq!(MpiErrorClass::from_raw(raw) as i32, raw);
        }
    }

    #[test]
    fn unknown_class_maps_to_other() {
        assert_eq!(MpiErrorClass::from_raw(54), MpiErrorClass::Other);
        assert_eq!(MpiErrorClass::from_raw(-7), MpiErrorClass::Other);
    }

    #[test]
    fn mpi_error_display_includes_code_and_message() {
        let err = Error::mpi(19, MpiErrorClass::Request, "invalid request");
        let text = err.to_string();
        assert!(text.contains("Request"));
        assert!(text.contains("code 19"));
        assert!(text.contains("invalid request"));
        assert_eq!(err.class(), Some(MpiErrorClass::Request));
    }

    #[test]
    fn non_mpi_errors_have_no_class() {
        assert_eq!(Error::InvalidBuffer.class(), None);
        assert_eq!(Error::InvalidCount(-3).to_string(), "Invalid count: -3");
    }

    #[test]
    fn check_success_is_ok() {
        assert!(Error::check(0).is_ok());
    }
}

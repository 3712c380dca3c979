//! # mpitrace
//!
//! Conformance suite for MPI tracing tools.
//!
//! The crate has two halves:
//!
//! - Safe, generic bindings for the MPI calls a tracer has to intercept,
//!   wrapped through a thin C layer: blocking, nonblocking, buffered,
//!   synchronous, ready and persistent point-to-point; the full set of
//!   collectives including the variable-count forms; groups and
//!   communicator management; `MPI_Pcontrol`.
//! - The suite itself ([`suite`]), which drives every call against
//!   hand-computed expectations, then ([`verify`]) runs the external trace
//!   converter and checks the files it leaves behind.
//!
//! Every MPI call the bindings make goes through the regular `MPI_*` entry
//! points, so a PMPI-based tracer linked into the binary records them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mpitrace::{Mpi, ReduceOp};
//!
//! fn main() -> Result<(), mpitrace::Error> {
//!     let mpi = Mpi::init()?;
//!     let world = mpi.world();
//!
//!     let rank = world.rank();
//!     let sum = world.allreduce_scalar(rank as f64, ReduceOp::Sum)?;
//!     println!("Rank {rank}: sum of all ranks = {sum}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Types
//!
//! All communication operations are generic over [`MpiDatatype`]:
//! `f32`, `f64`, `i32`, `i64`, `u8`, `u32`, `u64`
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `debug` | Per-call trace output from the C layer on stderr |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]

mod buffer;
mod comm;
mod datatype;
mod error;
mod ffi;
mod group;
mod persistent;
mod request;
mod status;

pub mod config;
pub mod logging;
pub mod report;
pub mod suite;
pub mod verify;

pub use buffer::{AttachedBuffer, BsendBuffer};
pub use comm::Communicator;
pub use datatype::{DatatypeTag, MpiDatatype};
pub use error::{Error, MpiErrorClass, Result};
pub use group::Group;
pub use persistent::PersistentRequest;
pub use request::Request;
pub use status::Status;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where the build script found the MPI installation this crate links.
pub const BUILT_AGAINST: &str = env!("MPITRACE_BUILD_MPI");

/// Global flag tracking whether MPI has been initialized
static MPI_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// MPI thread support levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
pub enum ThreadLevel {
    /// Only single-threaded execution
    Single = 0,
    /// Multi-threaded, but MPI calls only from main thread
    Funneled = 1,
    /// Multi-threaded, but MPI calls serialized by user
    Serialized = 2,
    /// Full multi-threaded support
    Multiple = 3,
}

/// Reduction operations. The suite only ever sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ReduceOp {
    /// Sum of values
    Sum = 0,
}

/// MPI environment handle.
///
/// There can only be one instance of this type at a time. When dropped, it
/// finalizes MPI; drop every [`Communicator`], [`Request`] and
/// [`PersistentRequest`] first.
///
/// # Example
///
/// ```no_run
/// use mpitrace::Mpi;
///
/// let mpi = Mpi::init().expect("Failed to initialize MPI");
/// let world = mpi.world();
/// println!("Running on {} processes", world.size());
/// // MPI is finalized when `mpi` goes out of scope
/// ```
pub struct Mpi {
    thread_level: ThreadLevel,
    /// Marker to make Mpi !Send and !Sync
    _marker: PhantomData<*const ()>,
}

impl Mpi {
    /// Initialize MPI with single-threaded support.
    ///
    /// # Errors
    ///
    /// Returns an error if MPI is already initialized or if initialization fails.
    pub fn init() -> Result<Self> {
        Self::init_thread(ThreadLevel::Single)
    }

    /// Initialize MPI with the specified thread support level.
    ///
    /// The level actually provided can be queried with
    /// [`thread_level()`](Self::thread_level).
    pub fn init_thread(required: ThreadLevel) -> Result<Self> {
        if MPI_INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInitialized);
        }

        let mut provided: i32 = 0;
        let ret = unsafe { ffi::mpitrace_init_thread(required as i32, &mut provided) };

        if ret != 0 {
            MPI_INITIALIZED.store(false, Ordering::SeqCst);
            return Err(Error::from_code(ret));
        }

        let thread_level = match provided {
            0 => ThreadLevel::Single,
            1 => ThreadLevel::Funneled,
            2 => ThreadLevel::Serialized,
            _ => ThreadLevel::Multiple,
        };

        Ok(Mpi {
            thread_level,
            _marker: PhantomData,
        })
    }

    /// Get the thread support level that was provided.
    pub fn thread_level(&self) -> ThreadLevel {
        self.thread_level
    }

    /// Get a handle to `MPI_COMM_WORLD`.
    pub fn world(&self) -> Communicator {
        Communicator::world()
    }

    /// Call `MPI_Pcontrol` with the given level.
    ///
    /// MPI itself ignores the call; profiling layers use it to switch
    /// recording on (`1`), off (`0`) or to flush (`2`).
    pub fn pcontrol(&self, level: i32) -> Result<()> {
        let ret = unsafe { ffi::mpitrace_pcontrol(level) };
        Error::check(ret)
    }

    /// Abort every process in `MPI_COMM_WORLD` with the given error code.
    ///
    /// Outside the init/finalize window only the calling process aborts.
    pub fn abort(errorcode: i32) -> ! {
        if abort_scope(Self::is_initialized(), Self::is_finalized()) == AbortScope::Job {
            unsafe { ffi::mpitrace_abort(0, errorcode) };
        }
        std::process::abort()
    }

    /// Get the current wall-clock time.
    pub fn wtime() -> f64 {
        unsafe { ffi::mpitrace_wtime() }
    }

    /// Get the MPI library version string.
    pub fn version() -> Result<String> {
        let mut buf = [0u8; 8192];
        let mut len: i32 = 0;
        let ret = unsafe { ffi::mpitrace_get_version(buf.as_mut_ptr().cast(), &mut len) };
        Error::check(ret)?;

        let len = (len.max(0) as usize).min(buf.len());
        let s = std::str::from_utf8(&buf[..len])
            .map_err(|_| Error::Internal("Invalid UTF-8 in version string".into()))?;
        Ok(s.trim_end_matches('\0').trim_end().to_string())
    }

    /// Check if MPI has been initialized.
    pub fn is_initialized() -> bool {
        let mut flag: i32 = 0;
        unsafe { ffi::mpitrace_initialized(&mut flag) };
        flag != 0
    }

    /// Check if MPI has been finalized.
    pub fn is_finalized() -> bool {
        let mut flag: i32 = 0;
        unsafe { ffi::mpitrace_finalized(&mut flag) };
        flag != 0
    }
}

/// What [`Mpi::abort`] can take down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortScope {
    /// Every process in the job, through `MPI_Abort`.
    Job,
    /// Only this process.
    Process,
}

fn abort_scope(initialized: bool, finalized: bool) -> AbortScope {
    if initialized && !finalized {
        AbortScope::Job
    } else {
        AbortScope::Process
    }
}

impl Drop for Mpi {
    fn drop(&mut self) {
        if MPI_INITIALIZED.load(Ordering::SeqCst) {
            unsafe {
                ffi::mpitrace_finalize();
            }
            MPI_INITIALIZED.store(false, Ordering::SeqCst);
        }
    }
}

// Mpi is not Send or Sync - MPI must be used from the thread that initialized it
// (unless thread level is Multiple)
// This is enforced by PhantomData<*const ()> in the struct

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_levels_are_ordered() {
        assert!(ThreadLevel::Single < ThreadLevel::Funneled);
        assert!(ThreadLevel::Serialized < ThreadLevel::Multiple);
    }

    #[test]
    fn build_records_mpi_origin() {
        assert!(!BUILT_AGAINST.trim().is_empty());
    }

    #[test]
    fn abort_reaches_the_job_only_while_mpi_is_up() {
        assert_eq!(abort_scope(true, false), AbortScope::Job);
        assert_eq!(abort_scope(false, false), AbortScope::Process);
        assert_eq!(abort_scope(true, true), AbortScope::Process);
    }

    #[test]
    fn reduce_op_values_match_c_layer() {
        assert_eq!(ReduceOp::Sum as i32, 0);
    }
}

//! MPI message status information.
//!
//! This module provides the [`Status`] struct returned by blocking receives,
//! describing the message that was actually matched.

/// Information about a received MPI message.
///
/// Returned by [`Communicator::recv`](crate::Communicator::recv) and
/// [`Communicator::sendrecv`](crate::Communicator::sendrecv).
///
/// # Example
///
/// ```no_run
/// # use mpitrace::Mpi;
/// let mpi = Mpi::init().unwrap();
/// let world = mpi.world();
///
/// let mut buf = [0u8; 64];
/// let status = world.recv(&mut buf, 0, 1).unwrap();
/// println!("Message from rank {} with tag {}, {} bytes",
///          status.source, status.tag, status.count);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Source rank of the message.
    pub source: i32,
    /// Tag of the message.
    pub tag: i32,
    /// Number of elements received (determined via `MPI_Get_count`), or -1
    /// when the count is not a whole number of elements.
    pub count: i64,
}

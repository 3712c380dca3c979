//! User buffers for buffered-mode sends (`MPI_Buffer_attach`).
//!
//! Buffered sends (`MPI_Bsend`, `MPI_Ibsend`, `MPI_Bsend_init`) copy the
//! outgoing message into a buffer the application attached beforehand, so the
//! send returns without waiting for the receiver. [`BsendBuffer`] sizes such a
//! buffer and [`AttachedBuffer`] keeps it attached for a scope.
//!
//! # Example
//!
//! ```no_run
//! use mpitrace::{BsendBuffer, Mpi};
//!
//! let mpi = Mpi::init().unwrap();
//! let world = mpi.world();
//!
//! let mut buffer = BsendBuffer::for_messages::<u8>(&world, 64, 1).unwrap();
//! let attached = buffer.attach().unwrap();
//! world.bsend(&[1u8; 64], 1, 30).unwrap();
//! attached.detach().unwrap(); // blocks until the message has left the buffer
//! ```

use crate::comm::Communicator;
use crate::datatype::MpiDatatype;
use crate::error::{Error, Result};
use crate::ffi;

/// Storage for buffered-mode sends, sized with `MPI_Pack_size` plus
/// `MPI_BSEND_OVERHEAD` per message.
pub struct BsendBuffer {
    storage: Vec<u8>,
}

impl BsendBuffer {
    /// Size a buffer able to hold `messages` messages of `count` elements of
    /// `T` each, packed for `comm`.
    pub fn for_messages<T: MpiDatatype>(
        comm: &Communicator,
        count: usize,
        messages: usize,
    ) -> Result<Self> {
        let mut packed: i32 = 0;
        let ret = unsafe {
            ffi::mpitrace_pack_size(
                (count * messages) as i64,
                T::TAG as i32,
                comm.raw_handle(),
                &mut packed,
            )
        };
        Error::check(ret)?;
        let overhead = unsafe { ffi::mpitrace_bsend_overhead() };
        Ok(Self::with_size(capacity(
            packed as usize,
            overhead as usize,
            messages,
        )))
    }

    /// A buffer of exactly `size` bytes.
    pub fn with_size(size: usize) -> Self {
        BsendBuffer {
            storage: vec![0u8; size],
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the buffer has zero capacity.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Attach the buffer to the MPI runtime for the lifetime of the guard.
    pub fn attach(&mut self) -> Result<AttachedBuffer<'_>> {
        let size = i32::try_from(self.storage.len())
            .map_err(|_| Error::InvalidCount(self.storage.len() as i64))?;
        let ret = unsafe { ffi::mpitrace_buffer_attach(self.storage.as_mut_ptr().cast(), size) };
        Error::check(ret)?;
        Ok(AttachedBuffer {
            _storage: &mut self.storage,
            detached: false,
        })
    }
}

/// A buffer currently attached with `MPI_Buffer_attach`.
///
/// Dropping the guard detaches the buffer. Detaching blocks until every
/// buffered message has been transmitted.
pub struct AttachedBuffer<'a> {
    _storage: &'a mut Vec<u8>,
    detached: bool,
}

impl AttachedBuffer<'_> {
    /// Detach explicitly, surfacing any error from `MPI_Buffer_detach`.
    ///
    /// Returns the size MPI reports for the detached buffer.
    pub fn detach(mut self) -> Result<usize> {
        self.detached = true;
        let mut ptr: *mut std::ffi::c_void = std::ptr::null_mut();
        let mut size: i32 = 0;
        let ret = unsafe { ffi::mpitrace_buffer_detach(&mut ptr, &mut size) };
        Error::check(ret)?;
        Ok(size.max(0) as usize)
    }
}

impl Drop for AttachedBuffer<'_> {
    fn drop(&mut self) {
        if !self.detached {
            let mut ptr: *mut std::ffi::c_void = std::ptr::null_mut();
            let mut size: i32 = 0;
            unsafe { ffi::mpitrace_buffer_detach(&mut ptr, &mut size) };
        }
    }
}

/// Bytes needed for `packed` bytes of payload split over `messages`
/// pending sends, each carrying its own `overhead`.
fn capacity(packed: usize, overhead: usize, messages: usize) -> usize {
    packed + overhead * messages.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_reserves_overhead_per_message() {
        // 50 pending 64-byte sends
        assert_eq!(capacity(3200, 96, 50), 3200 + 96 * 50);
        assert_eq!(capacity(64, 96, 1), 160);
    }

    #[test]
    fn capacity_keeps_one_overhead_for_zero_messages() {
        assert_eq!(capacity(0, 96, 0), 96);
    }

    #[test]
    fn with_size_allocates_exact_capacity() {
        let buffer = BsendBuffer::with_size(160);
        assert_eq!(buffer.len(), 160);
        assert!(!buffer.is_empty());
        assert!(BsendBuffer::with_size(0).is_empty());
    }
}

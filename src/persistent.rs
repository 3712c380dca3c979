//! Persistent point-to-point request handles.
//!
//! A persistent request binds a send or receive to a buffer once
//! (`MPI_Send_init`, `MPI_Recv_init`, and the buffered, ready and synchronous
//! variants) and can then be started many times. The request owns its buffer:
//! MPI keeps the address for the lifetime of the request, and the buffer may
//! only be touched while the request is inactive.
//!
//! # Example
//!
//! ```no_run
//! use mpitrace::Mpi;
//!
//! let mpi = Mpi::init().unwrap();
//! let world = mpi.world();
//!
//! if world.rank() == 0 {
//!     let mut send = world.send_init(vec![7u8; 64], 1, 90).unwrap();
//!     for _ in 0..50 {
//!         send.start().unwrap();
//!         send.wait().unwrap();
//!     }
//! } else if world.rank() == 1 {
//!     let mut recv = world.recv_init(vec![0u8; 64], 0, 90).unwrap();
//!     for _ in 0..50 {
//!         recv.start().unwrap();
//!         recv.wait().unwrap();
//!         assert_eq!(recv.buffer().unwrap()[0], 7);
//!     }
//! }
//! ```

use crate::datatype::MpiDatatype;
use crate::error::{Error, Result};
use crate::ffi;

/// A persistent MPI request handle that owns its message buffer.
///
/// # Lifecycle
///
/// 1. Create with `comm.send_init()`, `comm.recv_init()` or a mode variant
/// 2. Start with `start()` or `start_all()`
/// 3. Wait for completion with `wait()`
/// 4. Inspect or rewrite the buffer, then repeat steps 2-3 as needed
/// 5. Free with `free()` or on drop
pub struct PersistentRequest<T: MpiDatatype> {
    handle: i64,
    active: bool, // True if started but not yet waited
    buffer: Vec<T>,
}

impl<T: MpiDatatype> PersistentRequest<T> {
    /// Create a new persistent request from a raw handle and the buffer MPI
    /// was given.
    pub(crate) fn new(handle: i64, buffer: Vec<T>) -> Self {
        PersistentRequest {
            handle,
            active: false,
            buffer,
        }
    }

    /// Get the raw request handle (for advanced use).
    pub fn raw_handle(&self) -> i64 {
        self.handle
    }

    /// Check if this request has been freed (`MPI_REQUEST_NULL`).
    pub fn is_null(&self) -> bool {
        self.handle < 0
    }

    /// Read the buffer. Fails while the request is active.
    pub fn buffer(&self) -> Result<&[T]> {
        if self.active {
            return Err(Error::InvalidRequest);
        }
        Ok(&self.buffer)
    }

    /// Rewrite the buffer between starts. Fails while the request is active.
    pub fn buffer_mut(&mut self) -> Result<&mut [T]> {
        if self.active {
            return Err(Error::InvalidRequest);
        }
        Ok(&mut self.buffer)
    }

    /// Start the persistent operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is freed, already active, or if the
    /// start fails.
    pub fn start(&mut self) -> Result<()> {
        if self.is_null() {
            return Err(Error::InvalidRequest);
        }
        if self.active {
            return Err(Error::Internal("Request is already active".into()));
        }
        let ret = unsafe { ffi::mpitrace_start(self.handle) };
        Error::check(ret)?;
        self.active = true;
        Ok(())
    }

    /// Wait for the operation to complete.
    ///
    /// After this returns, the buffer can be accessed and the operation can be
    /// started again.
    pub fn wait(&mut self) -> Result<()> {
        if !self.active {
            // Not started, nothing to wait for
            return Ok(());
        }
        let ret = unsafe { ffi::mpitrace_wait(self.handle) };
        self.active = false;
        Error::check(ret)
    }

    /// Free the request (`MPI_Request_free`).
    ///
    /// The handle becomes null; further starts fail with
    /// [`Error::InvalidRequest`]. Freeing an active request waits first.
    pub fn free(&mut self) -> Result<()> {
        if self.is_null() {
            return Err(Error::InvalidRequest);
        }
        self.wait()?;
        let ret = unsafe { ffi::mpitrace_request_free(&mut self.handle) };
        Error::check(ret)
    }

    /// Start multiple persistent operations.
    ///
    /// This is more efficient than starting each operation individually.
    pub fn start_all(requests: &mut [PersistentRequest<T>]) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        // Check none are already active or freed
        for req in requests.iter() {
            if req.is_null() {
                return Err(Error::InvalidRequest);
            }
            if req.active {
                return Err(Error::Internal(
                    "One or more requests already active".into(),
                ));
            }
        }

        let mut handles: Vec<i64> = requests.iter().map(|r| r.handle).collect();
        let ret = unsafe { ffi::mpitrace_startall(handles.len() as i64, handles.as_mut_ptr()) };
        Error::check(ret)?;

        for req in requests.iter_mut() {
            req.active = true;
        }

        Ok(())
    }

    /// Wait for all persistent operations to complete.
    pub fn wait_all(requests: &mut [PersistentRequest<T>]) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let mut handles: Vec<i64> = requests
            .iter()
            .map(|r| if r.active { r.handle } else { -1 })
            .collect();
        let ret = unsafe { ffi::mpitrace_waitall(handles.len() as i64, handles.as_mut_ptr()) };

        for req in requests.iter_mut() {
            req.active = false;
        }

        Error::check(ret)
    }
}

impl<T: MpiDatatype> Drop for PersistentRequest<T> {
    fn drop(&mut self) {
        if self.is_null() {
            return;
        }
        // If active, wait for completion first
        if self.active {
            unsafe { ffi::mpitrace_wait(self.handle) };
        }
        unsafe { ffi::mpitrace_request_free(&mut self.handle) };
    }
}

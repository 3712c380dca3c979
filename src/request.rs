//! Request handles for nonblocking MPI operations.

use crate::error::{Error, Result};
use crate::ffi;
use std::marker::PhantomData;

/// A handle to a nonblocking MPI operation.
///
/// This type represents an in-flight MPI operation. The buffer handed to the
/// operation stays borrowed for `'buf`, so it cannot be read or modified until
/// the request is completed with [`wait()`](Self::wait), one of the
/// collection waits, or by dropping the request (which waits).
///
/// # Example
///
/// ```no_run
/// use mpitrace::Mpi;
///
/// let mpi = Mpi::init().unwrap();
/// let world = mpi.world();
///
/// let mut recv = [0u8; 64];
/// let request = world.irecv(&mut recv, 0, 100).unwrap();
///
/// // Do other work while communication proceeds...
///
/// request.wait().unwrap();
/// println!("Got {:?}", &recv[..8]);
/// ```
pub struct Request<'buf> {
    handle: i64,
    completed: bool,
    _buffer: PhantomData<&'buf mut [u8]>,
}

impl<'buf> Request<'buf> {
    /// Create a new request from a raw handle.
    pub(crate) fn new(handle: i64) -> Self {
        Request {
            handle,
            completed: false,
            _buffer: PhantomData,
        }
    }

    /// Get the raw request handle (for advanced use).
    pub fn raw_handle(&self) -> i64 {
        self.handle
    }

    /// Handle to pass to the shim; completed requests are passed as null.
    fn live_handle(&self) -> i64 {
        if self.completed {
            -1
        } else {
            self.handle
        }
    }

    /// Wait for this operation to complete.
    ///
    /// Blocks until the operation is finished. After this returns successfully,
    /// the associated buffers can be safely accessed.
    pub fn wait(mut self) -> Result<()> {
        if self.completed {
            return Ok(());
        }
        let ret = unsafe { ffi::mpitrace_wait(self.handle) };
        self.completed = true;
        Error::check(ret)
    }

    /// Test if this operation has completed without blocking.
    ///
    /// Returns `true` if the operation is complete, `false` otherwise.
    pub fn test(&mut self) -> Result<bool> {
        if self.completed {
            return Ok(true);
        }
        let mut flag: i32 = 0;
        let ret = unsafe { ffi::mpitrace_test(self.handle, &mut flag) };
        Error::check(ret)?;
        if flag != 0 {
            self.completed = true;
        }
        Ok(flag != 0)
    }

    /// Cancel a pending operation and wait for the cancellation to settle.
    ///
    /// Used for receives that will never be matched. The request is complete
    /// (cancelled or, if a message raced in, received) when this returns.
    pub fn cancel(mut self) -> Result<()> {
        if self.completed {
            return Ok(());
        }
        let ret = unsafe { ffi::mpitrace_cancel(self.handle) };
        Error::check(ret)?;
        let ret = unsafe { ffi::mpitrace_wait(self.handle) };
        self.completed = true;
        Error::check(ret)
    }

    /// Wait for all requests in a collection to complete.
    ///
    /// This is more efficient than waiting for each request individually.
    pub fn wait_all(mut requests: Vec<Request<'buf>>) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let mut handles: Vec<i64> = requests.iter().map(Request::live_handle).collect();
        let ret = unsafe { ffi::mpitrace_waitall(handles.len() as i64, handles.as_mut_ptr()) };

        // Mark all as completed so their drops do not wait again
        for request in &mut requests {
            request.completed = true;
        }

        Error::check(ret)
    }

    /// Wait for any one of the pending requests to complete.
    ///
    /// Returns the index of the request that completed, or `None` once every
    /// request in the slice is already complete.
    pub fn wait_any(requests: &mut [Request<'buf>]) -> Result<Option<usize>> {
        if requests.is_empty() {
            return Ok(None);
        }

        let mut handles: Vec<i64> = requests.iter().map(Request::live_handle).collect();
        let mut index: i32 = -1;
        let ret = unsafe {
            ffi::mpitrace_waitany(handles.len() as i64, handles.as_mut_ptr(), &mut index)
        };
        Error::check(ret)?;

        if index < 0 {
            return Ok(None);
        }
        let index = index as usize;
        let request = requests
            .get_mut(index)
            .ok_or_else(|| Error::Internal(format!("waitany returned index {index}")))?;
        request.completed = true;
        Ok(Some(index))
    }

    /// Wait until at least one pending request completes.
    ///
    /// Returns the indices of every request that completed in this call. An
    /// empty vector means every request in the slice was already complete.
    pub fn wait_some(requests: &mut [Request<'buf>]) -> Result<Vec<usize>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let mut handles: Vec<i64> = requests.iter().map(Request::live_handle).collect();
        let mut indices = vec![0i32; handles.len()];
        let mut outcount: i32 = 0;
        let ret = unsafe {
            ffi::mpitrace_waitsome(
                handles.len() as i64,
                handles.as_mut_ptr(),
                &mut outcount,
                indices.as_mut_ptr(),
            )
        };
        Error::check(ret)?;

        if outcount < 0 {
            return Ok(Vec::new());
        }
        indices.truncate(outcount as usize);

        let mut done = Vec::with_capacity(indices.len());
        for index in indices {
            let index = index as usize;
            let request = requests
                .get_mut(index)
                .ok_or_else(|| Error::Internal(format!("waitsome returned index {index}")))?;
            request.completed = true;
            done.push(index);
        }
        Ok(done)
    }
}

impl Drop for Request<'_> {
    fn drop(&mut self) {
        if !self.completed {
            // The borrowed buffer must not be released while MPI still
            // references it, so complete the operation here
            unsafe { ffi::mpitrace_wait(self.handle) };
        }
    }
}

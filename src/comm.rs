//! Safe wrappers for MPI communicator operations.

use crate::datatype::MpiDatatype;
use crate::error::{Error, Result};
use crate::ffi;
use crate::group::Group;
use crate::persistent::PersistentRequest;
use crate::request::Request;
use crate::status::Status;
use crate::ReduceOp;
use std::marker::PhantomData;

/// Handle value the shim uses for `MPI_COMM_WORLD`.
const WORLD_HANDLE: i32 = 0;

/// An MPI communicator.
///
/// This type wraps an MPI communicator handle and provides safe methods for
/// point-to-point, collective and communicator-management operations. All
/// communication methods are generic over [`MpiDatatype`].
///
/// Communicators created by [`duplicate`](Self::duplicate),
/// [`split`](Self::split) or [`create`](Self::create) are freed on drop, or
/// explicitly with [`free`](Self::free). The world communicator is never freed.
///
/// # Example
///
/// ```no_run
/// use mpitrace::Mpi;
///
/// let mpi = Mpi::init().unwrap();
/// let world = mpi.world();
///
/// println!("I am rank {} of {}", world.rank(), world.size());
/// ```
pub struct Communicator {
    handle: i32,
    /// Marker to prevent Send/Sync (MPI communicators are not thread-safe)
    _marker: PhantomData<*mut ()>,
}

impl Communicator {
    /// Get a handle to MPI_COMM_WORLD.
    pub(crate) fn world() -> Self {
        Communicator {
            handle: unsafe { ffi::mpitrace_comm_world() },
            _marker: PhantomData,
        }
    }

    fn from_handle(handle: i32) -> Self {
        Communicator {
            handle,
            _marker: PhantomData,
        }
    }

    /// Get the raw communicator handle (for advanced use).
    pub fn raw_handle(&self) -> i32 {
        self.handle
    }

    /// Check if this communicator has been freed (`MPI_COMM_NULL`).
    pub fn is_null(&self) -> bool {
        self.handle < 0
    }

    /// Get the rank of the calling process in this communicator.
    pub fn rank(&self) -> i32 {
        let mut rank: i32 = -1;
        unsafe { ffi::mpitrace_comm_rank(self.handle, &mut rank) };
        rank
    }

    /// Get the number of processes in this communicator.
    pub fn size(&self) -> i32 {
        let mut size: i32 = 0;
        unsafe { ffi::mpitrace_comm_size(self.handle, &mut size) };
        size
    }

    fn check_live(&self) -> Result<()> {
        if self.is_null() {
            Err(Error::InvalidCommunicator)
        } else {
            Ok(())
        }
    }

    fn check_rank(&self, rank: i32) -> Result<()> {
        if rank < 0 || rank >= self.size() {
            Err(Error::InvalidRank(rank))
        } else {
            Ok(())
        }
    }

    /// Count/displacement arrays must carry one entry per process.
    fn check_per_rank(&self, values: &[i32]) -> Result<()> {
        if values.len() != self.size() as usize {
            return Err(Error::InvalidCount(values.len() as i64));
        }
        if let Some(&bad) = values.iter().find(|&&v| v < 0) {
            return Err(Error::InvalidCount(i64::from(bad)));
        }
        Ok(())
    }

    // ========================================================================
    // Communicator Management
    // ========================================================================

    /// Duplicate this communicator (`MPI_Comm_dup`).
    pub fn duplicate(&self) -> Result<Self> {
        self.check_live()?;
        let mut new_handle: i32 = -1;
        let ret = unsafe { ffi::mpitrace_comm_dup(self.handle, &mut new_handle) };
        Error::check(ret)?;
        Ok(Communicator::from_handle(new_handle))
    }

    /// Split this communicator by color, ordering ranks by key (`MPI_Comm_split`).
    ///
    /// Returns `None` when `color` is negative (`MPI_UNDEFINED`).
    pub fn split(&self, color: i32, key: i32) -> Result<Option<Self>> {
        self.check_live()?;
        let mut new_handle: i32 = -1;
        let ret = unsafe { ffi::mpitrace_comm_split(self.handle, color, key, &mut new_handle) };
        Error::check(ret)?;
        Ok((new_handle >= 0).then(|| Communicator::from_handle(new_handle)))
    }

    /// Get the group of processes in this communicator (`MPI_Comm_group`).
    pub fn group(&self) -> Result<Group> {
        self.check_live()?;
        let mut group: i32 = -1;
        let ret = unsafe { ffi::mpitrace_comm_group(self.handle, &mut group) };
        Error::check(ret)?;
        Ok(Group::from_handle(group))
    }

    /// Create a communicator from a subgroup (`MPI_Comm_create`).
    ///
    /// Collective over this communicator. Returns `None` on processes that are
    /// not members of `group`.
    pub fn create(&self, group: &Group) -> Result<Option<Self>> {
        self.check_live()?;
        let mut new_handle: i32 = -1;
        let ret =
            unsafe { ffi::mpitrace_comm_create(self.handle, group.raw_handle(), &mut new_handle) };
        Error::check(ret)?;
        Ok((new_handle >= 0).then(|| Communicator::from_handle(new_handle)))
    }

    /// Free this communicator (`MPI_Comm_free`).
    ///
    /// Afterwards [`is_null`](Self::is_null) is true and every operation fails
    /// with [`Error::InvalidCommunicator`]. Freeing the world communicator is
    /// rejected.
    pub fn free(&mut self) -> Result<()> {
        self.check_live()?;
        if self.handle == WORLD_HANDLE {
            return Err(Error::InvalidCommunicator);
        }
        let ret = unsafe { ffi::mpitrace_comm_free(&mut self.handle) };
        Error::check(ret)
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// Barrier synchronization.
    ///
    /// All processes in the communicator must call this function. No process
    /// will return until all processes have entered the barrier.
    pub fn barrier(&self) -> Result<()> {
        self.check_live()?;
        let ret = unsafe { ffi::mpitrace_barrier(self.handle) };
        Error::check(ret)
    }

    // ========================================================================
    // Point-to-Point Communication
    // ========================================================================

    fn send_mode<T: MpiDatatype>(&self, mode: i32, data: &[T], dest: i32, tag: i32) -> Result<()> {
        self.check_live()?;
        self.check_rank(dest)?;
        let ret = unsafe {
            ffi::mpitrace_send(
                mode,
                data.as_ptr().cast(),
                data.len() as i64,
                T::TAG as i32,
                dest,
                tag,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// Standard-mode blocking send (`MPI_Send`).
    pub fn send<T: MpiDatatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        self.send_mode(ffi::MODE_STANDARD, data, dest, tag)
    }

    /// Buffered-mode blocking send (`MPI_Bsend`).
    ///
    /// Requires an attached [`BsendBuffer`](crate::BsendBuffer) large enough
    /// for the message.
    pub fn bsend<T: MpiDatatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        self.send_mode(ffi::MODE_BUFFERED, data, dest, tag)
    }

    /// Synchronous-mode blocking send (`MPI_Ssend`).
    ///
    /// Returns only once the matching receive has started.
    pub fn ssend<T: MpiDatatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        self.send_mode(ffi::MODE_SYNCHRONOUS, data, dest, tag)
    }

    /// Ready-mode blocking send (`MPI_Rsend`).
    pub fn rsend<T: MpiDatatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        self.send_mode(ffi::MODE_READY, data, dest, tag)
    }

    /// Blocking receive (`MPI_Recv`).
    ///
    /// Use `source = -1` for MPI_ANY_SOURCE and `tag = -1` for MPI_ANY_TAG.
    pub fn recv<T: MpiDatatype>(&self, data: &mut [T], source: i32, tag: i32) -> Result<Status> {
        self.check_live()?;
        let mut status = Status {
            source: 0,
            tag: 0,
            count: 0,
        };
        let ret = unsafe {
            ffi::mpitrace_recv(
                data.as_mut_ptr().cast(),
                data.len() as i64,
                T::TAG as i32,
                source,
                tag,
                self.handle,
                &mut status.source,
                &mut status.tag,
                &mut status.count,
            )
        };
        Error::check(ret)?;
        Ok(status)
    }

    /// Combined send and receive (`MPI_Sendrecv`).
    pub fn sendrecv<S: MpiDatatype, R: MpiDatatype>(
        &self,
        send: &[S],
        dest: i32,
        send_tag: i32,
        recv: &mut [R],
        source: i32,
        recv_tag: i32,
    ) -> Result<Status> {
        self.check_live()?;
        self.check_rank(dest)?;
        let mut status = Status {
            source: 0,
            tag: 0,
            count: 0,
        };
        let ret = unsafe {
            ffi::mpitrace_sendrecv(
                send.as_ptr().cast(),
                send.len() as i64,
                S::TAG as i32,
                dest,
                send_tag,
                recv.as_mut_ptr().cast(),
                recv.len() as i64,
                R::TAG as i32,
                source,
                recv_tag,
                self.handle,
                &mut status.source,
                &mut status.tag,
                &mut status.count,
            )
        };
        Error::check(ret)?;
        Ok(status)
    }

    // ========================================================================
    // Nonblocking Point-to-Point
    // ========================================================================

    fn isend_mode<'b, T: MpiDatatype>(
        &self,
        mode: i32,
        data: &'b [T],
        dest: i32,
        tag: i32,
    ) -> Result<Request<'b>> {
        self.check_live()?;
        self.check_rank(dest)?;
        let mut request_handle: i64 = -1;
        let ret = unsafe {
            ffi::mpitrace_isend(
                mode,
                data.as_ptr().cast(),
                data.len() as i64,
                T::TAG as i32,
                dest,
                tag,
                self.handle,
                &mut request_handle,
            )
        };
        Error::check(ret)?;
        Ok(Request::new(request_handle))
    }

    /// Standard-mode nonblocking send (`MPI_Isend`).
    pub fn isend<'b, T: MpiDatatype>(
        &self,
        data: &'b [T],
        dest: i32,
        tag: i32,
    ) -> Result<Request<'b>> {
        self.isend_mode(ffi::MODE_STANDARD, data, dest, tag)
    }

    /// Buffered-mode nonblocking send (`MPI_Ibsend`).
    pub fn ibsend<'b, T: MpiDatatype>(
        &self,
        data: &'b [T],
        dest: i32,
        tag: i32,
    ) -> Result<Request<'b>> {
        self.isend_mode(ffi::MODE_BUFFERED, data, dest, tag)
    }

    /// Synchronous-mode nonblocking send (`MPI_Issend`).
    pub fn issend<'b, T: MpiDatatype>(
        &self,
        data: &'b [T],
        dest: i32,
        tag: i32,
    ) -> Result<Request<'b>> {
        self.isend_mode(ffi::MODE_SYNCHRONOUS, data, dest, tag)
    }

    /// Ready-mode nonblocking send (`MPI_Irsend`).
    pub fn irsend<'b, T: MpiDatatype>(
        &self,
        data: &'b [T],
        dest: i32,
        tag: i32,
    ) -> Result<Request<'b>> {
        self.isend_mode(ffi::MODE_READY, data, dest, tag)
    }

    /// Nonblocking receive (`MPI_Irecv`).
    ///
    /// The buffer stays borrowed until the returned request completes.
    pub fn irecv<'b, T: MpiDatatype>(
        &self,
        data: &'b mut [T],
        source: i32,
        tag: i32,
    ) -> Result<Request<'b>> {
        self.check_live()?;
        let mut request_handle: i64 = -1;
        let ret = unsafe {
            ffi::mpitrace_irecv(
                data.as_mut_ptr().cast(),
                data.len() as i64,
                T::TAG as i32,
                source,
                tag,
                self.handle,
                &mut request_handle,
            )
        };
        Error::check(ret)?;
        Ok(Request::new(request_handle))
    }

    // ========================================================================
    // Persistent Point-to-Point
    // ========================================================================

    fn send_init_mode<T: MpiDatatype>(
        &self,
        mode: i32,
        data: Vec<T>,
        dest: i32,
        tag: i32,
    ) -> Result<PersistentRequest<T>> {
        self.check_live()?;
        self.check_rank(dest)?;
        let mut request_handle: i64 = -1;
        let ret = unsafe {
            ffi::mpitrace_send_init(
                mode,
                data.as_ptr().cast(),
                data.len() as i64,
                T::TAG as i32,
                dest,
                tag,
                self.handle,
                &mut request_handle,
            )
        };
        Error::check(ret)?;
        Ok(PersistentRequest::new(request_handle, data))
    }

    /// Persistent standard-mode send (`MPI_Send_init`). The request owns `data`.
    pub fn send_init<T: MpiDatatype>(
        &self,
        data: Vec<T>,
        dest: i32,
        tag: i32,
    ) -> Result<PersistentRequest<T>> {
        self.send_init_mode(ffi::MODE_STANDARD, data, dest, tag)
    }

    /// Persistent buffered-mode send (`MPI_Bsend_init`).
    pub fn bsend_init<T: MpiDatatype>(
        &self,
        data: Vec<T>,
        dest: i32,
        tag: i32,
    ) -> Result<PersistentRequest<T>> {
        self.send_init_mode(ffi::MODE_BUFFERED, data, dest, tag)
    }

    /// Persistent ready-mode send (`MPI_Rsend_init`).
    pub fn rsend_init<T: MpiDatatype>(
        &self,
        data: Vec<T>,
        dest: i32,
        tag: i32,
    ) -> Result<PersistentRequest<T>> {
        self.send_init_mode(ffi::MODE_READY, data, dest, tag)
    }

    /// Persistent synchronous-mode send (`MPI_Ssend_init`).
    pub fn ssend_init<T: MpiDatatype>(
        &self,
        data: Vec<T>,
        dest: i32,
        tag: i32,
    ) -> Result<PersistentRequest<T>> {
        self.send_init_mode(ffi::MODE_SYNCHRONOUS, data, dest, tag)
    }

    /// Persistent receive (`MPI_Recv_init`). The request owns `data`.
    pub fn recv_init<T: MpiDatatype>(
        &self,
        mut data: Vec<T>,
        source: i32,
        tag: i32,
    ) -> Result<PersistentRequest<T>> {
        self.check_live()?;
        let mut request_handle: i64 = -1;
        let ret = unsafe {
            ffi::mpitrace_recv_init(
                data.as_mut_ptr().cast(),
                data.len() as i64,
                T::TAG as i32,
                source,
                tag,
                self.handle,
                &mut request_handle,
            )
        };
        Error::check(ret)?;
        Ok(PersistentRequest::new(request_handle, data))
    }

    // ========================================================================
    // Blocking Collectives
    // ========================================================================

    /// Broadcast a slice from root to all processes.
    ///
    /// # Arguments
    ///
    /// * `data` - Buffer to broadcast (input at root, output at others)
    /// * `root` - Rank of the root process
    pub fn broadcast<T: MpiDatatype>(&self, data: &mut [T], root: i32) -> Result<()> {
        self.check_live()?;
        self.check_rank(root)?;
        let ret = unsafe {
            ffi::mpitrace_bcast(
                data.as_mut_ptr().cast(),
                data.len() as i64,
                T::TAG as i32,
                root,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// Reduce values to the root process.
    ///
    /// `recv` is only written at root.
    pub fn reduce<T: MpiDatatype>(
        &self,
        send: &[T],
        recv: &mut [T],
        op: ReduceOp,
        root: i32,
    ) -> Result<()> {
        self.check_live()?;
        self.check_rank(root)?;
        if send.len() != recv.len() {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_reduce(
                send.as_ptr().cast(),
                recv.as_mut_ptr().cast(),
                send.len() as i64,
                T::TAG as i32,
                op as i32,
                root,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// All-reduce values (reduce and broadcast result to all).
    pub fn allreduce<T: MpiDatatype>(&self, send: &[T], recv: &mut [T], op: ReduceOp) -> Result<()> {
        self.check_live()?;
        if send.len() != recv.len() {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_allreduce(
                send.as_ptr().cast(),
                recv.as_mut_ptr().cast(),
                send.len() as i64,
                T::TAG as i32,
                op as i32,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// All-reduce a single value.
    ///
    /// Convenience method for reducing a single scalar.
    pub fn allreduce_scalar<T: MpiDatatype>(&self, value: T, op: ReduceOp) -> Result<T> {
        let send = [value];
        let mut recv = [T::default()];
        self.allreduce(&send, &mut recv, op)?;
        Ok(recv[0])
    }

    /// Inclusive prefix reduction (`MPI_Scan`).
    pub fn scan<T: MpiDatatype>(&self, send: &[T], recv: &mut [T], op: ReduceOp) -> Result<()> {
        self.check_live()?;
        if send.len() != recv.len() {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_scan(
                send.as_ptr().cast(),
                recv.as_mut_ptr().cast(),
                send.len() as i64,
                T::TAG as i32,
                op as i32,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// Gather values to the root process.
    ///
    /// Each process sends `send.len()` elements. At root `recv` must hold
    /// `send.len() * size` elements; elsewhere it is not touched.
    pub fn gather<T: MpiDatatype>(&self, send: &[T], recv: &mut [T], root: i32) -> Result<()> {
        self.check_live()?;
        self.check_rank(root)?;
        if self.rank() == root && recv.len() < send.len() * self.size() as usize {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_gather(
                send.as_ptr().cast(),
                send.len() as i64,
                recv.as_mut_ptr().cast(),
                send.len() as i64,
                T::TAG as i32,
                root,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// Scatter values from root to all processes.
    ///
    /// Root sends `recv.len() * size` elements total, each process receives
    /// `recv.len()` elements.
    pub fn scatter<T: MpiDatatype>(&self, send: &[T], recv: &mut [T], root: i32) -> Result<()> {
        self.check_live()?;
        self.check_rank(root)?;
        if self.rank() == root && send.len() < recv.len() * self.size() as usize {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_scatter(
                send.as_ptr().cast(),
                recv.len() as i64,
                recv.as_mut_ptr().cast(),
                recv.len() as i64,
                T::TAG as i32,
                root,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// All-gather values (gather and broadcast to all).
    pub fn allgather<T: MpiDatatype>(&self, send: &[T], recv: &mut [T]) -> Result<()> {
        self.check_live()?;
        if recv.len() < send.len() * self.size() as usize {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_allgather(
                send.as_ptr().cast(),
                send.len() as i64,
                recv.as_mut_ptr().cast(),
                send.len() as i64,
                T::TAG as i32,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// All-to-all exchange: block `i` of `send` goes to rank `i`, block `i`
    /// of `recv` comes from rank `i`.
    pub fn alltoall<T: MpiDatatype>(&self, send: &[T], recv: &mut [T]) -> Result<()> {
        self.check_live()?;
        let size = self.size() as usize;
        if size == 0 || send.len() % size != 0 || recv.len() != send.len() {
            return Err(Error::InvalidBuffer);
        }
        let block = (send.len() / size) as i64;
        let ret = unsafe {
            ffi::mpitrace_alltoall(
                send.as_ptr().cast(),
                block,
                recv.as_mut_ptr().cast(),
                block,
                T::TAG as i32,
                self.handle,
            )
        };
        Error::check(ret)
    }

    // ========================================================================
    // V-Collectives (variable-count)
    // ========================================================================

    /// Gather variable amounts to root (`MPI_Gatherv`).
    ///
    /// `recv_counts` and `displs` are only significant at root, but must carry
    /// one entry per process everywhere.
    pub fn gatherv<T: MpiDatatype>(
        &self,
        send: &[T],
        recv: &mut [T],
        recv_counts: &[i32],
        displs: &[i32],
        root: i32,
    ) -> Result<()> {
        self.check_live()?;
        self.check_rank(root)?;
        self.check_per_rank(recv_counts)?;
        self.check_per_rank(displs)?;
        if self.rank() == root && recv.len() < extent(recv_counts, displs) {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_gatherv(
                send.as_ptr().cast(),
                send.len() as i64,
                recv.as_mut_ptr().cast(),
                recv_counts.as_ptr(),
                displs.as_ptr(),
                T::TAG as i32,
                root,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// Scatter variable amounts from root (`MPI_Scatterv`).
    pub fn scatterv<T: MpiDatatype>(
        &self,
        send: &[T],
        send_counts: &[i32],
        displs: &[i32],
        recv: &mut [T],
        root: i32,
    ) -> Result<()> {
        self.check_live()?;
        self.check_rank(root)?;
        self.check_per_rank(send_counts)?;
        self.check_per_rank(displs)?;
        if self.rank() == root && send.len() < extent(send_counts, displs) {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_scatterv(
                send.as_ptr().cast(),
                send_counts.as_ptr(),
                displs.as_ptr(),
                recv.as_mut_ptr().cast(),
                recv.len() as i64,
                T::TAG as i32,
                root,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// All-gather variable amounts (`MPI_Allgatherv`).
    pub fn allgatherv<T: MpiDatatype>(
        &self,
        send: &[T],
        recv: &mut [T],
        recv_counts: &[i32],
        displs: &[i32],
    ) -> Result<()> {
        self.check_live()?;
        self.check_per_rank(recv_counts)?;
        self.check_per_rank(displs)?;
        if recv.len() < extent(recv_counts, displs) {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_allgatherv(
                send.as_ptr().cast(),
                send.len() as i64,
                recv.as_mut_ptr().cast(),
                recv_counts.as_ptr(),
                displs.as_ptr(),
                T::TAG as i32,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// All-to-all exchange with per-peer counts and displacements
    /// (`MPI_Alltoallv`).
    #[allow(clippy::too_many_arguments)]
    pub fn alltoallv<T: MpiDatatype>(
        &self,
        send: &[T],
        send_counts: &[i32],
        send_displs: &[i32],
        recv: &mut [T],
        recv_counts: &[i32],
        recv_displs: &[i32],
    ) -> Result<()> {
        self.check_live()?;
        self.check_per_rank(send_counts)?;
        self.check_per_rank(send_displs)?;
        self.check_per_rank(recv_counts)?;
        self.check_per_rank(recv_displs)?;
        if send.len() < extent(send_counts, send_displs)
            || recv.len() < extent(recv_counts, recv_displs)
        {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_alltoallv(
                send.as_ptr().cast(),
                send_counts.as_ptr(),
                send_displs.as_ptr(),
                recv.as_mut_ptr().cast(),
                recv_counts.as_ptr(),
                recv_displs.as_ptr(),
                T::TAG as i32,
                self.handle,
            )
        };
        Error::check(ret)
    }

    /// Reduce element-wise, then scatter block `i` of the result to rank `i`
    /// (`MPI_Reduce_scatter`).
    pub fn reduce_scatter<T: MpiDatatype>(
        &self,
        send: &[T],
        recv: &mut [T],
        recv_counts: &[i32],
        op: ReduceOp,
    ) -> Result<()> {
        self.check_live()?;
        self.check_per_rank(recv_counts)?;
        let total: usize = recv_counts.iter().map(|&c| c as usize).sum();
        let mine = recv_counts[self.rank() as usize] as usize;
        if send.len() < total || recv.len() < mine {
            return Err(Error::InvalidBuffer);
        }
        let ret = unsafe {
            ffi::mpitrace_reduce_scatter(
                send.as_ptr().cast(),
                recv.as_mut_ptr().cast(),
                recv_counts.as_ptr(),
                T::TAG as i32,
                op as i32,
                self.handle,
            )
        };
        Error::check(ret)
    }
}

/// Number of elements a counts/displacements layout spans.
fn extent(counts: &[i32], displs: &[i32]) -> usize {
    counts
        .iter()
        .zip(displs)
        .map(|(&c, &d)| (c.max(0) + d.max(0)) as usize)
        .max()
        .unwrap_or(0)
}

impl Drop for Communicator {
    fn drop(&mut self) {
        // Don't free COMM_WORLD or an already-freed handle
        if self.handle != WORLD_HANDLE && !self.is_null() {
            unsafe { ffi::mpitrace_comm_free(&mut self.handle) };
        }
    }
}

// Communicators are not Send or Sync by default
// (MPI communicators have thread-safety requirements)

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_covers_furthest_block() {
        assert_eq!(extent(&[1, 2, 3, 4], &[0, 1, 3, 6]), 10);
        assert_eq!(extent(&[2, 2], &[4, 0]), 6);
        assert_eq!(extent(&[], &[]), 0);
    }

    #[test]
    fn extent_ignores_negative_entries() {
        assert_eq!(extent(&[-1, 3], &[0, -2]), 3);
    }
}

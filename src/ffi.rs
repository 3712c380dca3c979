//! Raw FFI bindings to the C shim in `csrc/mpitrace.c`.
//!
//! These are low-level unsafe functions. Use the safe wrappers in the parent module.

#![allow(dead_code)]
#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_double, c_int, c_void};

// Type aliases matching the C header
pub type int32_t = i32;
pub type int64_t = i64;

/// Send modes, matching `MPITRACE_MODE_*` in `csrc/mpitrace.h`.
pub const MODE_STANDARD: int32_t = 0;
pub const MODE_BUFFERED: int32_t = 1;
pub const MODE_SYNCHRONOUS: int32_t = 2;
pub const MODE_READY: int32_t = 3;

extern "C" {
    // ============================================================
    // Initialization and Finalization
    // ============================================================

    pub fn mpitrace_init_thread(required: c_int, provided: *mut c_int) -> c_int;
    pub fn mpitrace_finalize() -> c_int;
    pub fn mpitrace_initialized(flag: *mut c_int) -> c_int;
    pub fn mpitrace_finalized(flag: *mut c_int) -> c_int;
    pub fn mpitrace_pcontrol(level: int32_t) -> c_int;

    // ============================================================
    // Communicator Operations
    // ============================================================

    pub fn mpitrace_comm_world() -> int32_t;
    pub fn mpitrace_comm_rank(comm: int32_t, rank: *mut int32_t) -> c_int;
    pub fn mpitrace_comm_size(comm: int32_t, size: *mut int32_t) -> c_int;
    pub fn mpitrace_comm_dup(comm: int32_t, newcomm: *mut int32_t) -> c_int;
    pub fn mpitrace_comm_split(
        comm: int32_t,
        color: int32_t,
        key: int32_t,
        newcomm: *mut int32_t,
    ) -> c_int;
    pub fn mpitrace_comm_create(comm: int32_t, group: int32_t, newcomm: *mut int32_t) -> c_int;
    pub fn mpitrace_comm_group(comm: int32_t, group: *mut int32_t) -> c_int;
    pub fn mpitrace_comm_free(comm: *mut int32_t) -> c_int;

    // ============================================================
    // Group Operations
    // ============================================================

    pub fn mpitrace_group_incl(
        group: int32_t,
        n: int32_t,
        ranks: *const int32_t,
        newgroup: *mut int32_t,
    ) -> c_int;
    pub fn mpitrace_group_size(group: int32_t, size: *mut int32_t) -> c_int;
    pub fn mpitrace_group_rank(group: int32_t, rank: *mut int32_t) -> c_int;
    pub fn mpitrace_group_free(group: int32_t) -> c_int;

    // ============================================================
    // Attached Buffers
    // ============================================================

    pub fn mpitrace_pack_size(
        count: int64_t,
        datatype_tag: int32_t,
        comm: int32_t,
        size: *mut int32_t,
    ) -> c_int;
    pub fn mpitrace_bsend_overhead() -> int32_t;
    pub fn mpitrace_buffer_attach(buffer: *mut c_void, size: int32_t) -> c_int;
    pub fn mpitrace_buffer_detach(buffer: *mut *mut c_void, size: *mut int32_t) -> c_int;

    // ============================================================
    // Synchronization
    // ============================================================

    pub fn mpitrace_barrier(comm: int32_t) -> c_int;

    // ============================================================
    // Generic Point-to-Point Communication
    // ============================================================

    pub fn mpitrace_send(
        mode: int32_t,
        buf: *const c_void,
        count: int64_t,
        datatype_tag: int32_t,
        dest: int32_t,
        tag: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_recv(
        buf: *mut c_void,
        count: int64_t,
        datatype_tag: int32_t,
        source: int32_t,
        tag: int32_t,
        comm: int32_t,
        actual_source: *mut int32_t,
        actual_tag: *mut int32_t,
        actual_count: *mut int64_t,
    ) -> c_int;

    pub fn mpitrace_sendrecv(
        sendbuf: *const c_void,
        sendcount: int64_t,
        send_datatype_tag: int32_t,
        dest: int32_t,
        sendtag: int32_t,
        recvbuf: *mut c_void,
        recvcount: int64_t,
        recv_datatype_tag: int32_t,
        source: int32_t,
        recvtag: int32_t,
        comm: int32_t,
        actual_source: *mut int32_t,
        actual_tag: *mut int32_t,
        actual_count: *mut int64_t,
    ) -> c_int;

    pub fn mpitrace_isend(
        mode: int32_t,
        buf: *const c_void,
        count: int64_t,
        datatype_tag: int32_t,
        dest: int32_t,
        tag: int32_t,
        comm: int32_t,
        request: *mut int64_t,
    ) -> c_int;

    pub fn mpitrace_irecv(
        buf: *mut c_void,
        count: int64_t,
        datatype_tag: int32_t,
        source: int32_t,
        tag: int32_t,
        comm: int32_t,
        request: *mut int64_t,
    ) -> c_int;

    // ============================================================
    // Persistent Point-to-Point
    // ============================================================

    pub fn mpitrace_send_init(
        mode: int32_t,
        buf: *const c_void,
        count: int64_t,
        datatype_tag: int32_t,
        dest: int32_t,
        tag: int32_t,
        comm: int32_t,
        request: *mut int64_t,
    ) -> c_int;

    pub fn mpitrace_recv_init(
        buf: *mut c_void,
        count: int64_t,
        datatype_tag: int32_t,
        source: int32_t,
        tag: int32_t,
        comm: int32_t,
        request: *mut int64_t,
    ) -> c_int;

    // ============================================================
    // Generic Collective Operations - Blocking
    // ============================================================

    pub fn mpitrace_bcast(
        buf: *mut c_void,
        count: int64_t,
        datatype_tag: int32_t,
        root: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_reduce(
        sendbuf: *const c_void,
        recvbuf: *mut c_void,
        count: int64_t,
        datatype_tag: int32_t,
        op: int32_t,
        root: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_allreduce(
        sendbuf: *const c_void,
        recvbuf: *mut c_void,
        count: int64_t,
        datatype_tag: int32_t,
        op: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_scan(
        sendbuf: *const c_void,
        recvbuf: *mut c_void,
        count: int64_t,
        datatype_tag: int32_t,
        op: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_gather(
        sendbuf: *const c_void,
        sendcount: int64_t,
        recvbuf: *mut c_void,
        recvcount: int64_t,
        datatype_tag: int32_t,
        root: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_scatter(
        sendbuf: *const c_void,
        sendcount: int64_t,
        recvbuf: *mut c_void,
        recvcount: int64_t,
        datatype_tag: int32_t,
        root: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_allgather(
        sendbuf: *const c_void,
        sendcount: int64_t,
        recvbuf: *mut c_void,
        recvcount: int64_t,
        datatype_tag: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_alltoall(
        sendbuf: *const c_void,
        sendcount: int64_t,
        recvbuf: *mut c_void,
        recvcount: int64_t,
        datatype_tag: int32_t,
        comm: int32_t,
    ) -> c_int;

    // ============================================================
    // Generic V-Collectives (variable-count)
    // ============================================================

    pub fn mpitrace_gatherv(
        sendbuf: *const c_void,
        sendcount: int64_t,
        recvbuf: *mut c_void,
        recvcounts: *const int32_t,
        displs: *const int32_t,
        datatype_tag: int32_t,
        root: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_scatterv(
        sendbuf: *const c_void,
        sendcounts: *const int32_t,
        displs: *const int32_t,
        recvbuf: *mut c_void,
        recvcount: int64_t,
        datatype_tag: int32_t,
        root: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_allgatherv(
        sendbuf: *const c_void,
        sendcount: int64_t,
        recvbuf: *mut c_void,
        recvcounts: *const int32_t,
        displs: *const int32_t,
        datatype_tag: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_alltoallv(
        sendbuf: *const c_void,
        sendcounts: *const int32_t,
        sdispls: *const int32_t,
        recvbuf: *mut c_void,
        recvcounts: *const int32_t,
        rdispls: *const int32_t,
        datatype_tag: int32_t,
        comm: int32_t,
    ) -> c_int;

    pub fn mpitrace_reduce_scatter(
        sendbuf: *const c_void,
        recvbuf: *mut c_void,
        recvcounts: *const int32_t,
        datatype_tag: int32_t,
        op: int32_t,
        comm: int32_t,
    ) -> c_int;

    // ============================================================
    // Error Information
    // ============================================================

    pub fn mpitrace_error_info(
        code: c_int,
        error_class: *mut int32_t,
        message: *mut c_char,
        msg_len: *mut int32_t,
    ) -> c_int;

    // ============================================================
    // Request Management
    // ============================================================

    pub fn mpitrace_wait(request: int64_t) -> c_int;
    pub fn mpitrace_test(request: int64_t, flag: *mut int32_t) -> c_int;
    pub fn mpitrace_cancel(request: int64_t) -> c_int;
    pub fn mpitrace_waitall(count: int64_t, requests: *mut int64_t) -> c_int;
    pub fn mpitrace_waitany(count: int64_t, requests: *mut int64_t, index: *mut int32_t) -> c_int;
    pub fn mpitrace_waitsome(
        count: int64_t,
        requests: *mut int64_t,
        outcount: *mut int32_t,
        indices: *mut int32_t,
    ) -> c_int;
    pub fn mpitrace_request_free(request: *mut int64_t) -> c_int;

    // ============================================================
    // Persistent Request Management
    // ============================================================

    pub fn mpitrace_start(request: int64_t) -> c_int;
    pub fn mpitrace_startall(count: int64_t, requests: *mut int64_t) -> c_int;

    // ============================================================
    // Utility Functions
    // ============================================================

    pub fn mpitrace_get_version(version: *mut c_char, len: *mut int32_t) -> c_int;
    pub fn mpitrace_wtime() -> c_double;
    pub fn mpitrace_abort(comm: int32_t, errorcode: int32_t) -> c_int;
}

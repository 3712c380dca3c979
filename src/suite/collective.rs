//! Collective operations on the world communicator.

use super::expected::{
    alltoallv_expected, alltoallv_source, gatherv_contribution, gatherv_expected,
    reduce_scatter_expected, reduce_total, scatterv_expected, scatterv_source, summation,
    triangular_layout,
};
use super::payload;
use super::{Checks, Context, Outcome, PAUSE, SKEW};
use crate::{Mpi, ReduceOp};

const BCAST_TEXT: &str = "Bcast 64 byte message from process 0 to all other processes";

/// Rank 1 arrives late; once released, ranks 0 and 1 must read nearly the
/// same clock.
pub(super) fn barrier(ctx: &Context<'_>) -> Outcome {
    let world = ctx.world;
    let tag = 10;
    if ctx.rank == 1 {
        std::thread::sleep(PAUSE);
    }
    world.barrier()?;

    let mut checks = Checks::default();
    if ctx.rank == 0 {
        let p1 = Mpi::wtime();
        world.send(&[p1], 1, tag)?;
    } else if ctx.rank == 1 {
        let p2 = Mpi::wtime();
        let mut p1 = [0.0f64];
        world.recv(&mut p1, 0, tag)?;
        checks.expect((p1[0] - p2).abs() < SKEW, || {
            format!("ranks left the barrier {:.3}s apart", (p1[0] - p2).abs())
        });
    }
    checks.finish()
}

pub(super) fn bcast(ctx: &Context<'_>) -> Outcome {
    let mut buf = if ctx.rank == 0 {
        payload::short(BCAST_TEXT)
    } else {
        payload::blank(payload::SHORT)
    };
    ctx.world.broadcast(&mut buf, 0)?;

    let mut checks = Checks::default();
    checks.expect_text("broadcast", &buf, BCAST_TEXT);
    checks.finish()
}

pub(super) fn reduce(ctx: &Context<'_>) -> Outcome {
    let send = [f64::from(ctx.rank * 10)];
    let mut recv = [0.0f64];
    ctx.world.reduce(&send, &mut recv, ReduceOp::Sum, 0)?;

    let want = if ctx.rank == 0 {
        reduce_total(ctx.size)
    } else {
        0.0
    };
    let mut checks = Checks::default();
    checks.expect_eq("reduced sum", recv[0], want);
    checks.finish()
}

pub(super) fn scan(ctx: &Context<'_>) -> Outcome {
    let send = [f64::from(ctx.rank)];
    let mut recv = [0.0f64];
    ctx.world.scan(&send, &mut recv, ReduceOp::Sum)?;

    let mut checks = Checks::default();
    checks.expect_eq("prefix sum", recv[0], f64::from(summation(ctx.rank)));
    checks.finish()
}

pub(super) fn allreduce(ctx: &Context<'_>) -> Outcome {
    let sum = ctx
        .world
        .allreduce_scalar(f64::from(ctx.rank * 10), ReduceOp::Sum)?;

    let mut checks = Checks::default();
    checks.expect_eq("reduced sum", sum, reduce_total(ctx.size));
    checks.finish()
}

pub(super) fn gather(ctx: &Context<'_>) -> Outcome {
    let send = [f64::from(ctx.rank * 10)];
    let mut recv = vec![0.0f64; ctx.size as usize];
    ctx.world.gather(&send, &mut recv, 0)?;

    let want: Vec<f64> = if ctx.rank == 0 {
        (0..ctx.size).map(|i| f64::from(i * 10)).collect()
    } else {
        vec![0.0; ctx.size as usize]
    };
    let mut checks = Checks::default();
    checks.expect_eq("gathered values", recv, want);
    checks.finish()
}

pub(super) fn scatter(ctx: &Context<'_>) -> Outcome {
    let send: Vec<f64> = if ctx.rank == 0 {
        (0..ctx.size).map(|i| f64::from(i * 10)).collect()
    } else {
        Vec::new()
    };
    let mut recv = [0.0f64];
    ctx.world.scatter(&send, &mut recv, 0)?;

    let mut checks = Checks::default();
    checks.expect_eq("scattered value", recv[0], f64::from(ctx.rank * 10));
    checks.finish()
}

pub(super) fn allgather(ctx: &Context<'_>) -> Outcome {
    let send = [f64::from(ctx.rank * 10)];
    let mut recv = vec![0.0f64; ctx.size as usize];
    ctx.world.allgather(&send, &mut recv)?;

    let want: Vec<f64> = (0..ctx.size).map(|i| f64::from(i * 10)).collect();
    let mut checks = Checks::default();
    checks.expect_eq("gathered values", recv, want);
    checks.finish()
}

pub(super) fn alltoall(ctx: &Context<'_>) -> Outcome {
    let send: Vec<f64> = (0..ctx.size).map(|i| f64::from(ctx.rank * 10 + i)).collect();
    let mut recv = vec![0.0f64; ctx.size as usize];
    ctx.world.alltoall(&send, &mut recv)?;

    let want: Vec<f64> = (0..ctx.size).map(|i| f64::from(i * 10 + ctx.rank)).collect();
    let mut checks = Checks::default();
    checks.expect_eq("exchanged values", recv, want);
    checks.finish()
}

pub(super) fn gatherv(ctx: &Context<'_>) -> Outcome {
    let (counts, displs) = triangular_layout(ctx.size);
    let send = gatherv_contribution(ctx.rank);
    let mut recv = vec![0.0f64; summation(ctx.size) as usize];
    ctx.world.gatherv(&send, &mut recv, &counts, &displs, 0)?;

    let mut checks = Checks::default();
    for (i, &got) in recv.iter().enumerate() {
        let want = if ctx.rank == 0 {
            gatherv_expected(got, i)
        } else {
            0.0
        };
        checks.expect_eq(&format!("element {i}"), got, want);
    }
    checks.finish()
}

pub(super) fn scatterv(ctx: &Context<'_>) -> Outcome {
    let (counts, displs) = triangular_layout(ctx.size);
    let send = if ctx.rank == 0 {
        scatterv_source(ctx.size)
    } else {
        Vec::new()
    };
    let mut recv = vec![0.0f64; ctx.rank as usize + 1];
    ctx.world.scatterv(&send, &counts, &displs, &mut recv, 0)?;

    let mut checks = Checks::default();
    checks.expect_eq("scattered block", recv, scatterv_expected(ctx.rank));
    checks.finish()
}

pub(super) fn allgatherv(ctx: &Context<'_>) -> Outcome {
    let (counts, displs) = triangular_layout(ctx.size);
    let send = gatherv_contribution(ctx.rank);
    let mut recv = vec![0.0f64; summation(ctx.size) as usize];
    ctx.world.allgatherv(&send, &mut recv, &counts, &displs)?;

    let mut checks = Checks::default();
    for (i, &got) in recv.iter().enumerate() {
        checks.expect_eq(&format!("element {i}"), got, gatherv_expected(got, i));
    }
    checks.finish()
}

pub(super) fn alltoallv(ctx: &Context<'_>) -> Outcome {
    let (rank, size) = (ctx.rank, ctx.size);
    let send = alltoallv_source(rank, size);
    let send_counts = vec![rank + 1; size as usize];
    let send_displs: Vec<i32> = (0..size).map(|i| (rank + 1) * i).collect();
    let (recv_counts, recv_displs) = triangular_layout(size);
    let mut recv = vec![0.0f64; summation(size) as usize];
    ctx.world.alltoallv(
        &send,
        &send_counts,
        &send_displs,
        &mut recv,
        &recv_counts,
        &recv_displs,
    )?;

    let mut checks = Checks::default();
    checks.expect_eq("exchanged values", recv, alltoallv_expected(rank, size));
    checks.finish()
}

pub(super) fn reduce_scatter(ctx: &Context<'_>) -> Outcome {
    let send: Vec<f64> = (0..ctx.size)
        .map(|i| f64::from(ctx.size * ctx.rank + i))
        .collect();
    let counts = vec![1; ctx.size as usize];
    let mut recv = [0.0f64];
    ctx.world
        .reduce_scatter(&send, &mut recv, &counts, ReduceOp::Sum)?;

    let mut checks = Checks::default();
    checks.expect_eq(
        "reduced element",
        recv[0],
        reduce_scatter_expected(ctx.rank, ctx.size),
    );
    checks.finish()
}

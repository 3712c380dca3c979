//! Communicator construction and teardown.

use super::payload;
use super::{Checks, Context, Failure, Outcome};
use crate::Communicator;

const CREATE_TEXT: &str = "Bcast message from process 0 to all process on new comm";
const DUP_TEXT: &str = "Bcast message from process 0 to all processes on dup comm";
const SPLIT_TEXT: &str = "Bcast message from process 0 to all processes on split comm";
const FREE_TEXT: &str = "Send message from process 0 to process 1 on dup comm";

/// Broadcast from local rank 0 of `comm`; `root_text` is what the root sends.
fn broadcast_text(comm: &Communicator, root_text: Option<&str>) -> crate::Result<Vec<u8>> {
    let mut buf = match root_text {
        Some(text) => payload::short(text),
        None => payload::blank(payload::SHORT),
    };
    comm.broadcast(&mut buf, 0)?;
    Ok(buf)
}

/// Ranks 0 and 1 form one communicator, the rest another; world rank 0's
/// message must reach rank 1 and nobody else.
pub(super) fn comm_create(ctx: &Context<'_>) -> Outcome {
    let world_group = ctx.world.group()?;
    let members: Vec<i32> = if ctx.rank < 2 {
        vec![0, 1]
    } else {
        (2..ctx.size).collect()
    };
    let group = world_group.incl(&members)?;
    let mut comm = ctx.world.create(&group)?.ok_or_else(|| {
        Failure::Mismatch(format!("rank {} left out of its own group", ctx.rank))
    })?;

    let text = (ctx.rank == 0).then_some(CREATE_TEXT);
    let buf = broadcast_text(&comm, text)?;
    comm.free()?;

    let mut checks = Checks::default();
    if ctx.rank == 1 {
        checks.expect_text("broadcast on new comm", &buf, CREATE_TEXT);
    } else if ctx.rank >= 2 {
        checks.expect_text("broadcast on other comm", &buf, "");
    }
    checks.finish()
}

pub(super) fn comm_dup(ctx: &Context<'_>) -> Outcome {
    let mut dup = ctx.world.duplicate()?;
    let text = (ctx.rank == 0).then_some(DUP_TEXT);
    let buf = broadcast_text(&dup, text)?;
    dup.free()?;

    let mut checks = Checks::default();
    checks.expect_text("broadcast on dup comm", &buf, DUP_TEXT);
    checks.finish()
}

/// Even ranks (color 2) and odd ranks (color 1) each get a communicator
/// rooted at world rank 0 and 1 respectively.
pub(super) fn comm_split(ctx: &Context<'_>) -> Outcome {
    let color = if ctx.rank % 2 == 0 { 2 } else { 1 };
    let mut comm = ctx.world.split(color, ctx.rank)?.ok_or_else(|| {
        Failure::Mismatch(format!("split gave rank {} no communicator", ctx.rank))
    })?;

    let text = (ctx.rank < 2).then_some(SPLIT_TEXT);
    let buf = broadcast_text(&comm, text)?;
    comm.free()?;

    let mut checks = Checks::default();
    checks.expect_text("broadcast on split comm", &buf, SPLIT_TEXT);
    checks.finish()
}

/// A duplicate carries a message, is live before the free and null after.
pub(super) fn comm_free(ctx: &Context<'_>) -> Outcome {
    let tag = 20;
    let mut dup = ctx.world.duplicate()?;
    let mut checks = Checks::default();

    if ctx.rank == 0 {
        dup.send(&payload::short(FREE_TEXT), 1, tag)?;
    } else if ctx.rank == 1 {
        let mut buf = payload::blank(payload::SHORT);
        dup.recv(&mut buf, 0, tag)?;
        checks.expect_text("message on dup comm", &buf, FREE_TEXT);
    }

    checks.expect(!dup.is_null(), || "duplicate was null before free".into());
    dup.free()?;
    checks.expect(dup.is_null(), || "handle not null after free".into());
    checks.finish()
}

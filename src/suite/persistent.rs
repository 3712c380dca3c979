//! Persistent requests: bind once, start many times, free.

use super::payload::{self, SHORT};
use super::{Checks, Context, Outcome, PAUSE};
use crate::{BsendBuffer, Mpi};

const INIT_TEXT: &str = "Send 64 byte message from process 0 to process 1 with tag 7";
const INIT_TAG: i32 = 7;

/// Rank 1 side shared by the single-tag cases: `reps` blocking receives,
/// each checked against `text`.
fn receive_each(ctx: &Context<'_>, tag: i32, text: &str) -> Outcome {
    let mut checks = Checks::default();
    let mut buf = payload::blank(SHORT);
    for rep in 0..ctx.reps {
        ctx.world.recv(&mut buf, 0, tag)?;
        checks.expect_text(&format!("repetition {rep}"), &buf, text);
    }
    checks.finish()
}

/// Rank 0 half of the Send_init/Recv_init pair.
pub(super) fn send_init(ctx: &Context<'_>) -> Outcome {
    let mut request = ctx.world.send_init(payload::short(INIT_TEXT), 1, INIT_TAG)?;
    for _ in 0..ctx.reps {
        request.start()?;
        request.wait()?;
    }
    request.free()?;
    Ok(())
}

/// Rank 1 half of the Send_init/Recv_init pair.
pub(super) fn recv_init(ctx: &Context<'_>) -> Outcome {
    let mut request = ctx.world.recv_init(payload::blank(SHORT), 0, INIT_TAG)?;
    let mut checks = Checks::default();
    for rep in 0..ctx.reps {
        request.start()?;
        request.wait()?;
        checks.expect_text(&format!("repetition {rep}"), request.buffer()?, INIT_TEXT);
    }
    request.free()?;
    checks.finish()
}

/// Each repetition: fill the bound buffer, start the buffered send, let it
/// complete locally, then reuse the same buffer for a ready send.
pub(super) fn bsend_init(ctx: &Context<'_>) -> Outcome {
    const FIRST: &str = "Bsend 64 byte message from process 0 to process 1";
    const SECOND: &str = "Bsend has started and buffer has been modified";
    let (world, tag) = (ctx.world, 160);

    if ctx.rank != 0 {
        let mut checks = Checks::default();
        let mut buf = payload::blank(SHORT);
        for rep in 0..ctx.reps {
            world.recv(&mut buf, 0, tag + 1)?;
            checks.expect_text(&format!("ready-mode, repetition {rep}"), &buf, SECOND);
            world.recv(&mut buf, 0, tag)?;
            checks.expect_text(&format!("buffered, repetition {rep}"), &buf, FIRST);
        }
        return checks.finish();
    }

    // Sized for every repetition's message
    let mut space = BsendBuffer::for_messages::<u8>(world, SHORT, ctx.reps)?;
    let attached = space.attach()?;
    let mut request = world.bsend_init(payload::blank(SHORT), 1, tag)?;
    for _ in 0..ctx.reps {
        payload::write_text(request.buffer_mut()?, FIRST);
        request.start()?;
        request.wait()?;
        payload::write_text(request.buffer_mut()?, SECOND);
        world.rsend(request.buffer()?, 1, tag + 1)?;
    }
    attached.detach()?;
    request.free()?;
    Ok(())
}

/// The ready send is started before rank 1, asleep, posts its receive.
pub(super) fn rsend_init(ctx: &Context<'_>) -> Outcome {
    const TEXT: &str = "Rsend 64 byte message from process 0 to process 1";
    let (world, tag) = (ctx.world, 170);

    if ctx.rank == 0 {
        let mut request = world.rsend_init(payload::short(TEXT), 1, tag)?;
        for _ in 0..ctx.reps {
            request.start()?;
            let t0 = Mpi::wtime();
            world.send(&[t0], 1, tag + 1)?;
            request.wait()?;
        }
        request.free()?;
        return Ok(());
    }

    let mut checks = Checks::default();
    let mut buf = payload::blank(SHORT);
    for rep in 0..ctx.reps {
        std::thread::sleep(PAUSE);
        let t1 = Mpi::wtime();
        world.recv(&mut buf, 0, tag)?;
        checks.expect_text(&format!("repetition {rep}"), &buf, TEXT);
        let mut t0 = [0.0f64];
        world.recv(&mut t0, 0, tag + 1)?;
        checks.expect(t1 > t0[0], || {
            format!(
                "repetition {rep}: started at {:.3}, after the receiver woke at {t1:.3}",
                t0[0]
            )
        });
    }
    checks.finish()
}

pub(super) fn ssend_init(ctx: &Context<'_>) -> Outcome {
    const TEXT: &str = "Ssend 64 byte message from process 0 to process 1";
    let tag = 180;

    if ctx.rank != 0 {
        return receive_each(ctx, tag, TEXT);
    }
    let mut request = ctx.world.ssend_init(payload::short(TEXT), 1, tag)?;
    for _ in 0..ctx.reps {
        request.start()?;
        request.wait()?;
    }
    request.free()?;
    Ok(())
}

/// A used persistent request is live until freed and null afterwards.
pub(super) fn request_free(ctx: &Context<'_>) -> Outcome {
    const TEXT: &str = "Send 64 byte message from process 0 to process 1";
    let tag = 190;

    if ctx.rank != 0 {
        // Contents are not checked here
        let mut buf = payload::blank(SHORT);
        for _ in 0..ctx.reps {
            ctx.world.recv(&mut buf, 0, tag)?;
        }
        return Ok(());
    }

    let mut request = ctx.world.send_init(payload::short(TEXT), 1, tag)?;
    for _ in 0..ctx.reps {
        request.start()?;
        request.wait()?;
    }
    let mut checks = Checks::default();
    checks.expect(!request.is_null(), || "request null before free".into());
    request.free()?;
    checks.expect(request.is_null(), || "request not null after free".into());
    checks.finish()
}

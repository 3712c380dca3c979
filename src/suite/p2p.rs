//! Point-to-point sends and receives in every mode, and request completion.
//!
//! Rank 0 is the sender and rank 1 the receiver unless a case says otherwise.
//! Timing cases compare `MPI_Wtime` readings taken on the two ranks around a
//! one second pause to tell a blocking call from a nonblocking one.

use super::payload::{self, LARGE, MEDIUM, SHORT};
use super::{Checks, Context, Outcome, PAUSE, SKEW};
use crate::{BsendBuffer, Communicator, Mpi, PersistentRequest, Request};

const SEND_TEXT_SHORT: &str = "Send 64 byte message from process 0 to process 1 with tag 1";
const SEND_TEXT_MEDIUM: &str = "Send 100k message from process 0 to process 1 with tag 2";
const SEND_TEXT_LARGE: &str = "Send 256k message from process 0 to process 1 with tag 3";
const ISEND_TEXT: &str = "Isend 64 byte message from process 0 to process 1 with tag 4";
const ISEND_RETURNED: &str = "Call to Isend has returned - tag 5";
const NEVER_SENT_TAG: i32 = 6;

/// The three blocking sends, each with its tag and payload size.
const BLOCKING: [(i32, usize, &str); 3] = [
    (1, SHORT, SEND_TEXT_SHORT),
    (2, MEDIUM, SEND_TEXT_MEDIUM),
    (3, LARGE, SEND_TEXT_LARGE),
];

/// Text a non-root rank sends to rank 0 in the completion cases.
fn to_root_text(verb: &str, rank: i32, tag: i32) -> String {
    format!("{verb} 64 byte message from process {rank} to process 0 with tag {tag}")
}

fn blank() -> Vec<u8> {
    payload::blank(SHORT)
}

pub(super) fn send(ctx: &Context<'_>) -> Outcome {
    for (tag, len, text) in BLOCKING {
        ctx.world.send(&payload::message(text, len), 1, tag)?;
    }
    Ok(())
}

pub(super) fn recv(ctx: &Context<'_>) -> Outcome {
    let mut checks = Checks::default();
    for (tag, len, text) in BLOCKING {
        let mut buf = payload::blank(len);
        let status = ctx.world.recv(&mut buf, 0, tag)?;
        checks.expect_eq("message size", status.count, len as i64);
        checks.expect_text(&format!("tag {tag}"), &buf, text);
    }
    checks.finish()
}

/// Rank 0 half of the buffered-send cases: send `first` buffered on `tag`,
/// rewrite the same buffer with `second` and ready-send it on `tag + 1`.
fn buffered_then_ready(
    world: &Communicator,
    tag: i32,
    first: &str,
    second: &str,
    nonblocking: bool,
) -> Outcome {
    let mut space = BsendBuffer::for_messages::<u8>(world, SHORT, 1)?;
    let attached = space.attach()?;
    let mut buf = payload::short(first);
    if nonblocking {
        // A buffered send completes locally once the message is copied out
        world.ibsend(&buf, 1, tag)?.wait()?;
    } else {
        world.bsend(&buf, 1, tag)?;
    }
    payload::write_text(&mut buf, second);
    world.rsend(&buf, 1, tag + 1)?;
    attached.detach()?;
    Ok(())
}

/// Rank 1 half of the buffered-send cases: the ready send on `tag + 1`
/// arrives first, the buffered one on `tag` after it.
fn receive_ready_then_buffered(
    world: &Communicator,
    tag: i32,
    first: &str,
    second: &str,
) -> Outcome {
    let mut checks = Checks::default();
    let mut buf = blank();
    world.recv(&mut buf, 0, tag + 1)?;
    checks.expect_text("ready-mode message", &buf, second);
    world.recv(&mut buf, 0, tag)?;
    checks.expect_text("buffered message", &buf, first);
    checks.finish()
}

pub(super) fn bsend(ctx: &Context<'_>) -> Outcome {
    const FIRST: &str = "Bsend 64 byte message from process 0 to process 1";
    const SECOND: &str = "Bsend has returned and buffer has been modified";
    match ctx.rank {
        0 => buffered_then_ready(ctx.world, 30, FIRST, SECOND, false),
        _ => receive_ready_then_buffered(ctx.world, 30, FIRST, SECOND),
    }
}

pub(super) fn ibsend(ctx: &Context<'_>) -> Outcome {
    const FIRST: &str = "Ibsend 64 byte message from process 0 to process 1";
    const SECOND: &str = "Ibsend has returned and buffer has been modified";
    match ctx.rank {
        0 => buffered_then_ready(ctx.world, 60, FIRST, SECOND, true),
        _ => receive_ready_then_buffered(ctx.world, 60, FIRST, SECOND),
    }
}

/// The ready send returns before rank 1 (asleep) posts its receive.
pub(super) fn rsend(ctx: &Context<'_>) -> Outcome {
    const TEXT: &str = "Rsend 64 byte message from process 0 to process 1";
    let (world, tag) = (ctx.world, 40);
    let mut checks = Checks::default();
    if ctx.rank == 0 {
        world.rsend(&payload::short(TEXT), 1, tag)?;
        let t0 = Mpi::wtime();
        world.send(&[t0], 1, tag + 1)?;
    } else {
        std::thread::sleep(PAUSE);
        let t1 = Mpi::wtime();
        let mut buf = blank();
        world.recv(&mut buf, 0, tag)?;
        checks.expect_text("ready-mode message", &buf, TEXT);
        let mut t0 = [0.0f64];
        world.recv(&mut t0, 0, tag + 1)?;
        checks.expect(t1 > t0[0], || {
            format!("rsend returned at {:.3}, after the receiver woke at {t1:.3}", t0[0])
        });
    }
    checks.finish()
}

/// The synchronous send only returns once rank 1 wakes up and posts its
/// receive.
pub(super) fn ssend(ctx: &Context<'_>) -> Outcome {
    const TEXT: &str = "Ssend 64 byte message from process 0 to process 1";
    let (world, tag) = (ctx.world, 50);
    world.barrier()?;

    let mut checks = Checks::default();
    if ctx.rank == 0 {
        world.ssend(&payload::short(TEXT), 1, tag)?;
        let t0 = Mpi::wtime();
        world.send(&[t0], 1, tag + 1)?;
    } else if ctx.rank == 1 {
        let mut buf = blank();
        std::thread::sleep(PAUSE);
        let t1a = Mpi::wtime();
        let pending = world.irecv(&mut buf, 0, tag)?;
        let t1b = Mpi::wtime();
        let mut t0 = [0.0f64];
        world.recv(&mut t0, 0, tag + 1)?;
        pending.wait()?;

        let t0 = t0[0];
        checks.expect(t0 >= t1a, || {
            format!("ssend returned at {t0:.3}, before the receive was posted at {t1a:.3}")
        });
        checks.expect((t1b - t0).abs() <= SKEW, || {
            format!("ssend returned {:.3}s away from the receive", (t1b - t0).abs())
        });
        checks.expect_text("synchronous message", &buf, TEXT);
    }
    checks.finish()
}

/// Rank 0 half of the Isend/Irecv pair.
pub(super) fn isend(ctx: &Context<'_>) -> Outcome {
    let first = payload::short(ISEND_TEXT);
    let pending = ctx.world.isend(&first, 1, 4)?;
    ctx.world.send(&payload::short(ISEND_RETURNED), 1, 5)?;
    pending.wait()?;
    Ok(())
}

/// Rank 1 half of the Isend/Irecv pair. A receive for a tag nobody sends
/// must stay incomplete and leave its buffer untouched.
pub(super) fn irecv(ctx: &Context<'_>) -> Outcome {
    let world = ctx.world;
    let mut checks = Checks::default();

    let mut never = blank();
    let mut pending = world.irecv(&mut never, 0, NEVER_SENT_TAG)?;
    // Cancel before surfacing a test error, or dropping the request would block
    let arrived = pending.test();
    pending.cancel()?;
    checks.expect(!arrived?, || {
        format!("receive for tag {NEVER_SENT_TAG} completed though nothing was sent")
    });
    checks.expect_text("unmatched receive buffer", &never, "");

    let mut buf = blank();
    world.recv(&mut buf, 0, 5)?;
    checks.expect_text("tag 5", &buf, ISEND_RETURNED);
    world.irecv(&mut buf, 0, 4)?.wait()?;
    checks.expect_text("tag 4", &buf, ISEND_TEXT);
    checks.finish()
}

/// The synchronous nonblocking send returns before its match, so the
/// standard send that follows overtakes it.
pub(super) fn issend(ctx: &Context<'_>) -> Outcome {
    const FIRST: &str = "Issend 64 byte message from process 0 to process 1";
    const SECOND: &str = "Call to Issend has returned";
    let (world, tag) = (ctx.world, 70);
    world.barrier()?;

    let mut checks = Checks::default();
    if ctx.rank == 0 {
        let first = payload::short(FIRST);
        let pending = world.issend(&first, 1, tag)?;
        world.send(&payload::short(SECOND), 1, tag + 1)?;
        pending.wait()?;
    } else if ctx.rank == 1 {
        let mut buf = blank();
        world.recv(&mut buf, 0, tag + 1)?;
        checks.expect_text("standard message", &buf, SECOND);
        world.recv(&mut buf, 0, tag)?;
        checks.expect_text("synchronous message", &buf, FIRST);
    }
    checks.finish()
}

pub(super) fn irsend(ctx: &Context<'_>) -> Outcome {
    const FIRST: &str = "Irsend 64 byte message from process 0 to process 1";
    const SECOND: &str = "Receive message from process 1";
    let (world, tag) = (ctx.world, 80);
    let mut checks = Checks::default();

    if ctx.rank == 0 {
        let mut t1 = [0.0f64];
        world.recv(&mut t1, 1, tag)?;
        std::thread::sleep(PAUSE);
        let out = payload::short(FIRST);
        let pending = world.irsend(&out, 1, tag + 1)?;
        let t0 = Mpi::wtime();
        checks.expect(t1[0] < t0, || {
            format!("irsend returned at {t0:.3}, not after rank 1 at {:.3}", t1[0])
        });
        let mut buf = blank();
        world.recv(&mut buf, 1, tag + 2)?;
        checks.expect_text("message from rank 1", &buf, SECOND);
        pending.wait()?;
    } else {
        world.send(&payload::short(SECOND), 0, tag + 2)?;
        let t1 = Mpi::wtime();
        world.send(&[t1], 0, tag)?;
        let mut buf = blank();
        world.recv(&mut buf, 0, tag + 1)?;
        checks.expect_text("ready-mode message", &buf, FIRST);
    }
    checks.finish()
}

pub(super) fn start(ctx: &Context<'_>) -> Outcome {
    const TEXT: &str = "Send 64 byte message from process 0 to process 1";
    let (world, tag) = (ctx.world, 90);
    let mut checks = Checks::default();

    if ctx.rank == 0 {
        let mut request = world.send_init(payload::short(TEXT), 1, tag)?;
        for _ in 0..ctx.reps {
            request.start()?;
            request.wait()?;
        }
        request.free()?;
    } else {
        let mut buf = blank();
        for rep in 0..ctx.reps {
            world.recv(&mut buf, 0, tag)?;
            checks.expect_text(&format!("repetition {rep}"), &buf, TEXT);
        }
    }
    checks.finish()
}

pub(super) fn wait(ctx: &Context<'_>) -> Outcome {
    const TEXT: &str = "ISend 64 byte message from process 0 to process 1";
    let (world, tag) = (ctx.world, 100);
    let mut checks = Checks::default();

    if ctx.rank == 0 {
        std::thread::sleep(PAUSE);
        world.send(&payload::short(TEXT), 1, tag)?;
    } else {
        let mut buf = blank();
        world.irecv(&mut buf, 0, tag)?.wait()?;
        checks.expect_text("waited message", &buf, TEXT);
    }
    checks.finish()
}

pub(super) fn startall(ctx: &Context<'_>) -> Outcome {
    const FIRST: &str = "Send 64 byte message from process 0 to process 1 with tag 90";
    const SECOND: &str = "Send 64 byte message from process 0 to process 1 with tag 91";
    let world = ctx.world;
    let mut checks = Checks::default();

    if ctx.rank == 0 {
        let mut requests = vec![
            world.send_init(payload::short(FIRST), 1, 90)?,
            world.send_init(payload::short(SECOND), 1, 91)?,
        ];
        for _ in 0..ctx.reps {
            PersistentRequest::start_all(&mut requests)?;
            PersistentRequest::wait_all(&mut requests)?;
        }
        for request in &mut requests {
            request.free()?;
        }
    } else {
        let mut first = blank();
        let mut second = blank();
        for rep in 0..ctx.reps {
            let pending = world.irecv(&mut first, 0, 90)?;
            world.recv(&mut second, 0, 91)?;
            checks.expect_text(&format!("tag 91, repetition {rep}"), &second, SECOND);
            pending.wait()?;
            checks.expect_text(&format!("tag 90, repetition {rep}"), &first, FIRST);
        }
    }
    checks.finish()
}

/// How rank 0 completes the receives it posted to every other rank.
#[derive(Clone, Copy)]
enum Completion {
    All,
    Any,
    Some,
}

/// Rank 0 posts one receive per peer on `base_tag + peer`, completes them
/// with `completion`, and checks every slot the completion call reported.
/// Peers send with `verb` in their text, nonblocking unless `verb` is "Send".
fn gather_from_peers(
    ctx: &Context<'_>,
    base_tag: i32,
    verb: &str,
    completion: Completion,
) -> Outcome {
    let world = ctx.world;

    if ctx.rank != 0 {
        let tag = base_tag + ctx.rank;
        let out = payload::short(&to_root_text(verb, ctx.rank, tag));
        if verb == "Send" {
            world.send(&out, 0, tag)?;
        } else {
            world.isend(&out, 0, tag)?.wait()?;
        }
        return Ok(());
    }

    let peers = (ctx.size - 1) as usize;
    let mut inbox = payload::blank(SHORT * peers);
    let mut requests = inbox
        .chunks_mut(SHORT)
        .zip(1..ctx.size)
        .map(|(slot, peer)| world.irecv(slot, peer, base_tag + peer))
        .collect::<crate::Result<Vec<Request<'_>>>>()?;

    let mut completed = Vec::with_capacity(peers);
    match completion {
        Completion::All => {
            Request::wait_all(std::mem::take(&mut requests))?;
            completed.extend(0..peers);
        }
        Completion::Any => {
            while let Some(index) = Request::wait_any(&mut requests)? {
                completed.push(index);
            }
        }
        Completion::Some => loop {
            let done = Request::wait_some(&mut requests)?;
            if done.is_empty() {
                break;
            }
            completed.extend(done);
        },
    }
    // Every request is complete; release the borrow on the inbox
    drop(requests);

    let mut checks = Checks::default();
    let mut seen = completed.clone();
    seen.sort_unstable();
    checks.expect_eq("completed indices", seen, (0..peers).collect::<Vec<_>>());
    for index in completed {
        let peer = index as i32 + 1;
        let text = to_root_text(verb, peer, base_tag + peer);
        let slot = &inbox[index * SHORT..(index + 1) * SHORT];
        checks.expect_text(&format!("message from rank {peer}"), slot, &text);
    }
    checks.finish()
}

pub(super) fn waitall(ctx: &Context<'_>) -> Outcome {
    gather_from_peers(ctx, 120, "Send", Completion::All)
}

pub(super) fn waitany(ctx: &Context<'_>) -> Outcome {
    gather_from_peers(ctx, 130, "Isend", Completion::Any)
}

pub(super) fn waitsome(ctx: &Context<'_>) -> Outcome {
    gather_from_peers(ctx, 140, "Isend", Completion::Some)
}

pub(super) fn sendrecv(ctx: &Context<'_>) -> Outcome {
    const FROM_ZERO: &str = "Send 64 byte message from process 0 to process 1 with tag 150";
    const FROM_ONE: &str = "Send 64 byte message from process 1 to process 0 with tag 151";
    let (peer, send_tag, recv_tag, out_text, in_text) = if ctx.rank == 0 {
        (1, 150, 151, FROM_ZERO, FROM_ONE)
    } else {
        (0, 151, 150, FROM_ONE, FROM_ZERO)
    };

    let mut buf = blank();
    let status = ctx.world.sendrecv(
        &payload::short(out_text),
        peer,
        send_tag,
        &mut buf,
        peer,
        recv_tag,
    )?;

    let mut checks = Checks::default();
    checks.expect_eq("source", status.source, peer);
    checks.expect_eq("tag", status.tag, recv_tag);
    checks.expect_text("exchanged message", &buf, in_text);
    checks.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_root_text_fits_a_short_message() {
        let text = to_root_text("Isend", 3, 133);
        assert_eq!(
            text,
            "Isend 64 byte message from process 3 to process 0 with tag 133"
        );
        assert!(text.len() < SHORT);
    }

    #[test]
    fn blocking_sends_cover_every_size() {
        let sizes: Vec<usize> = BLOCKING.iter().map(|&(_, len, _)| len).collect();
        assert_eq!(sizes, vec![64, 100 * 1024, 256 * 1024]);
        let tags: Vec<i32> = BLOCKING.iter().map(|&(tag, _, _)| tag).collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }

    #[test]
    fn fixed_texts_fit_their_buffers() {
        for text in [
            SEND_TEXT_SHORT,
            ISEND_TEXT,
            ISEND_RETURNED,
            "Bsend has returned and buffer has been modified",
            "Send 64 byte message from process 1 to process 0 with tag 151",
        ] {
            assert!(text.len() < SHORT, "{text}");
        }
    }
}

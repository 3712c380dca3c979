//! The conformance cases and the runner that drives them.
//!
//! Each [`Case`] names the MPI call it exercises, the ranks that take part,
//! and a function that issues the calls and compares the outcome with a
//! hand-computed value. Cases run in a fixed order on every rank; a rank
//! skips the cases it does not participate in.
//!
//! A case reports its mismatches through [`Checks`] only after all of its
//! communication is done, so a failed comparison on one rank never leaves a
//! partner blocked on a message that will not be sent or received.

mod collective;
mod communicator;
pub mod expected;
mod marker;
mod p2p;
pub mod payload;
mod persistent;

use crate::{Communicator, Mpi};
use std::fmt::Debug;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, info_span, warn};

/// Minimum world size the suite needs.
pub const MIN_PROCESSES: i32 = 4;

/// Line printed by rank 0 when the world is too small.
pub const TOO_FEW_PROCESSES: &str = "ERROR: At least 4 processes are required for MPI testing";

/// Sleep used by cases that check send-mode timing.
pub(crate) const PAUSE: Duration = Duration::from_secs(1);

/// Largest clock difference accepted between ranks that just synchronized.
pub(crate) const SKEW: f64 = 0.25;

/// Why a case failed.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    /// An MPI call (or its safe wrapper) returned an error.
    #[error(transparent)]
    Mpi(#[from] crate::Error),

    /// The call succeeded but produced the wrong result.
    #[error("{0}")]
    Mismatch(String),
}

/// Result of running one case on one rank.
pub type Outcome = std::result::Result<(), Failure>;

/// Collects mismatches while a case keeps communicating.
#[derive(Debug, Default)]
pub struct Checks {
    mismatches: Vec<String>,
}

impl Checks {
    /// Record a mismatch unless `ok` holds.
    pub fn expect(&mut self, ok: bool, describe: impl FnOnce() -> String) {
        if !ok {
            self.mismatches.push(describe());
        }
    }

    /// Record a mismatch unless `got == want`.
    pub fn expect_eq<T: PartialEq + Debug>(&mut self, what: &str, got: T, want: T) {
        if got != want {
            self.mismatches
                .push(format!("{what}: got {got:?}, expected {want:?}"));
        }
    }

    /// Record a mismatch unless `buf` holds `text`.
    pub fn expect_text(&mut self, what: &str, buf: &[u8], text: &str) {
        if !payload::holds(buf, text) {
            self.mismatches.push(format!(
                "{what}: got {:?}, expected {text:?}",
                payload::show(buf)
            ));
        }
    }

    /// Whether nothing has been recorded.
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Turn the collected mismatches into the case outcome.
    pub fn finish(self) -> Outcome {
        if self.mismatches.is_empty() {
            Ok(())
        } else {
            Err(Failure::Mismatch(self.mismatches.join("; ")))
        }
    }
}

/// Ranks that take part in a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participants {
    /// Every rank in the world.
    All,
    /// Ranks 0 and 1.
    Pair,
    /// Ranks 0, 1 and 2.
    FirstThree,
    /// A single rank.
    Only(i32),
}

impl Participants {
    /// Whether `rank` runs the case.
    pub fn includes(self, rank: i32) -> bool {
        match self {
            Participants::All => true,
            Participants::Pair => rank == 0 || rank == 1,
            Participants::FirstThree => (0..=2).contains(&rank),
            Participants::Only(r) => rank == r,
        }
    }

    /// The rank that prints the failure line: rank 0 when it participates,
    /// otherwise the sole participant.
    pub fn reporter(self) -> i32 {
        match self {
            Participants::Only(r) => r,
            _ => 0,
        }
    }
}

/// What every case gets to work with.
pub struct Context<'a> {
    /// The MPI environment.
    pub mpi: &'a Mpi,
    /// `MPI_COMM_WORLD`.
    pub world: &'a Communicator,
    /// This process's world rank.
    pub rank: i32,
    /// World size.
    pub size: i32,
    /// Repetitions for the persistent-request cases.
    pub reps: usize,
}

impl<'a> Context<'a> {
    /// Build a context for `world`.
    pub fn new(mpi: &'a Mpi, world: &'a Communicator, reps: usize) -> Self {
        Context {
            mpi,
            world,
            rank: world.rank(),
            size: world.size(),
            reps,
        }
    }
}

/// One conformance case.
#[derive(Clone, Copy)]
pub struct Case {
    /// MPI routine the case exercises, as printed in failure lines.
    pub name: &'static str,
    /// Ranks that run it.
    pub participants: Participants,
    /// The case body.
    pub run: fn(&Context<'_>) -> Outcome,
}

impl Debug for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Case")
            .field("name", &self.name)
            .field("participants", &self.participants)
            .finish_non_exhaustive()
    }
}

const fn case(
    name: &'static str,
    participants: Participants,
    run: fn(&Context<'_>) -> Outcome,
) -> Case {
    Case {
        name,
        participants,
        run,
    }
}

/// Every case, in the order they run.
pub fn cases() -> Vec<Case> {
    use Participants::{All, FirstThree, Only, Pair};
    vec![
        case("MPI_Barrier", All, collective::barrier),
        case("MPI_Bcast", All, collective::bcast),
        case("MPI_Reduce", All, collective::reduce),
        case("MPI_Scan", All, collective::scan),
        case("MPI_Allreduce", All, collective::allreduce),
        case("MPI_Gather", All, collective::gather),
        case("MPI_Scatter", All, collective::scatter),
        case("MPI_Allgather", All, collective::allgather),
        case("MPI_Alltoall", All, collective::alltoall),
        case("MPI_Gatherv", All, collective::gatherv),
        case("MPI_Scatterv", All, collective::scatterv),
        case("MPI_Allgatherv", All, collective::allgatherv),
        case("MPI_Alltoallv", All, collective::alltoallv),
        case("MPI_Reduce_scatter", All, collective::reduce_scatter),
        case("MPI_Comm_create", All, communicator::comm_create),
        case("MPI_Comm_dup", All, communicator::comm_dup),
        case("MPI_Comm_split", All, communicator::comm_split),
        case("MPI_Comm_free", All, communicator::comm_free),
        case("MPI_Pcontrol", FirstThree, marker::pcontrol),
        case("MPI_Send", Only(0), p2p::send),
        case("MPI_Recv", Only(1), p2p::recv),
        case("MPI_Bsend", Pair, p2p::bsend),
        case("MPI_Rsend", Pair, p2p::rsend),
        case("MPI_Ssend", All, p2p::ssend),
        case("MPI_Isend", Only(0), p2p::isend),
        case("MPI_Irecv", Only(1), p2p::irecv),
        case("MPI_Ibsend", Pair, p2p::ibsend),
        case("MPI_Issend", All, p2p::issend),
        case("MPI_Irsend", Pair, p2p::irsend),
        case("MPI_Start", Pair, p2p::start),
        case("MPI_Wait", Pair, p2p::wait),
        case("MPI_Startall", Pair, p2p::startall),
        case("MPI_Waitall", All, p2p::waitall),
        case("MPI_Waitany", All, p2p::waitany),
        case("MPI_Waitsome", All, p2p::waitsome),
        case("MPI_Sendrecv", Pair, p2p::sendrecv),
        case("MPI_Send_init", Only(0), persistent::send_init),
        case("MPI_Recv_init", Only(1), persistent::recv_init),
        case("MPI_Bsend_init", Pair, persistent::bsend_init),
        case("MPI_Rsend_init", Pair, persistent::rsend_init),
        case("MPI_Ssend_init", Pair, persistent::ssend_init),
        case("MPI_Request_free", Pair, persistent::request_free),
    ]
}

/// The line printed for a failed case.
pub fn failure_line(name: &str) -> String {
    format!("{name} test failed")
}

/// Account for one case's outcome on `rank`.
///
/// Only the case's reporter writes the failure line. Returns whether the
/// case passed.
pub fn record(
    rank: i32,
    case: &Case,
    outcome: Outcome,
    out: &mut dyn Write,
) -> io::Result<bool> {
    let Err(failure) = outcome else {
        return Ok(true);
    };
    warn!(%failure, "failed");
    if rank == case.participants.reporter() {
        writeln!(out, "{}", failure_line(case.name))?;
        out.flush()?;
    }
    Ok(false)
}

/// Whether a world of `size` ranks can run the suite.
///
/// When it cannot, rank 0 writes [`TOO_FEW_PROCESSES`] to `out`.
pub fn check_size(rank: i32, size: i32, out: &mut dyn Write) -> io::Result<bool> {
    if size >= MIN_PROCESSES {
        return Ok(true);
    }
    if rank == 0 {
        writeln!(out, "{TOO_FEW_PROCESSES}")?;
        out.flush()?;
    }
    warn!(size, min = MIN_PROCESSES, "world too small");
    Ok(false)
}

/// Run `cases` on this rank, writing failure lines to `out`.
///
/// Returns whether every case this rank took part in passed.
pub fn run_cases(ctx: &Context<'_>, cases: &[Case], out: &mut dyn Write) -> io::Result<bool> {
    let mut passed = true;
    for case in cases {
        if !case.participants.includes(ctx.rank) {
            continue;
        }
        let _span = info_span!("case", name = case.name).entered();
        let started = Mpi::wtime();
        debug!("starting");
        let outcome = (case.run)(ctx);
        if outcome.is_ok() {
            debug!(elapsed = Mpi::wtime() - started, "passed");
        }
        passed &= record(ctx.rank, case, outcome, out)?;
    }
    Ok(passed)
}

/// Run the whole suite on this rank.
///
/// With fewer than [`MIN_PROCESSES`] ranks nothing runs: rank 0 prints
/// [`TOO_FEW_PROCESSES`] and every rank fails.
pub fn run(ctx: &Context<'_>, out: &mut dyn Write) -> io::Result<bool> {
    if !check_size(ctx.rank, ctx.size, out)? {
        return Ok(false);
    }
    run_cases(ctx, &cases(), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn participants_membership() {
        assert!(Participants::All.includes(7));
        assert!(Participants::Pair.includes(0));
        assert!(Participants::Pair.includes(1));
        assert!(!Participants::Pair.includes(2));
        assert!(Participants::FirstThree.includes(2));
        assert!(!Participants::FirstThree.includes(3));
        assert!(Participants::Only(1).includes(1));
        assert!(!Participants::Only(1).includes(0));
    }

    #[test]
    fn reporter_is_rank_zero_unless_sole_participant() {
        assert_eq!(Participants::All.reporter(), 0);
        assert_eq!(Participants::Pair.reporter(), 0);
        assert_eq!(Participants::FirstThree.reporter(), 0);
        assert_eq!(Participants::Only(0).reporter(), 0);
        assert_eq!(Participants::Only(1).reporter(), 1);
    }

    #[test]
    fn reporter_always_participates() {
        for case in cases() {
            let p = case.participants;
            assert!(p.includes(p.reporter()), "{}", case.name);
        }
    }

    #[test]
    fn case_names_are_unique_mpi_routines() {
        let all = cases();
        let names: HashSet<_> = all.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), all.len());
        assert!(all.iter().all(|c| c.name.starts_with("MPI_")));
    }

    #[test]
    fn registry_order_and_size() {
        let all = cases();
        assert_eq!(all.len(), 42);
        assert_eq!(all[0].name, "MPI_Barrier");
        assert_eq!(all[all.len() - 1].name, "MPI_Request_free");
    }

    #[test]
    fn single_rank_cases_come_in_send_receive_pairs() {
        let all = cases();
        for (sender, receiver) in [
            ("MPI_Send", "MPI_Recv"),
            ("MPI_Isend", "MPI_Irecv"),
            ("MPI_Send_init", "MPI_Recv_init"),
        ] {
            let s = all.iter().find(|c| c.name == sender).map(|c| c.participants);
            let r = all.iter().find(|c| c.name == receiver).map(|c| c.participants);
            assert_eq!(s, Some(Participants::Only(0)));
            assert_eq!(r, Some(Participants::Only(1)));
        }
    }

    #[test]
    fn failure_line_format() {
        assert_eq!(failure_line("MPI_Bcast"), "MPI_Bcast test failed");
    }

    #[test]
    fn checks_collects_every_mismatch() {
        let mut checks = Checks::default();
        checks.expect(true, || String::from("not recorded"));
        checks.expect_eq("count", 3, 3);
        assert!(checks.is_clean());

        checks.expect(false, || "first".to_string());
        checks.expect_eq("value", 1.0, 2.0);
        checks.expect_text("text", &payload::short("abc"), "abd");
        assert!(!checks.is_clean());

        match checks.finish() {
            Err(Failure::Mismatch(msg)) => {
                assert!(msg.contains("first"));
                assert!(msg.contains("value: got 1.0, expected 2.0"));
                assert!(msg.contains("text: got \"abc\", expected \"abd\""));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn clean_checks_finish_ok() {
        assert!(Checks::default().finish().is_ok());
    }

    #[test]
    fn failure_wraps_mpi_errors() {
        let failure = Failure::from(crate::Error::InvalidRank(9));
        assert!(matches!(failure, Failure::Mpi(crate::Error::InvalidRank(9))));
    }

    fn never_runs(_: &Context<'_>) -> Outcome {
        Ok(())
    }

    fn failed() -> Outcome {
        Err(Failure::Mismatch("got 3, want 4".into()))
    }

    fn printed(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn passing_case_prints_nothing() {
        let case = case("MPI_Bcast", Participants::All, never_runs);
        let mut out = Vec::new();
        assert!(record(0, &case, Ok(()), &mut out).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn reporter_prints_failure_line() {
        let case = case("MPI_Bcast", Participants::All, never_runs);
        let mut out = Vec::new();
        assert!(!record(0, &case, failed(), &mut out).unwrap());
        assert_eq!(printed(out), "MPI_Bcast test failed\n");
    }

    #[test]
    fn other_ranks_fail_silently() {
        let case = case("MPI_Bcast", Participants::All, never_runs);
        for rank in 1..4 {
            let mut out = Vec::new();
            assert!(!record(rank, &case, failed(), &mut out).unwrap());
            assert!(out.is_empty(), "rank {rank} printed");
        }
    }

    #[test]
    fn sole_participant_reports_its_own_failure() {
        let case = case("MPI_Recv", Participants::Only(1), never_runs);
        let mut out = Vec::new();
        assert!(!record(1, &case, failed(), &mut out).unwrap());
        assert_eq!(printed(out), "MPI_Recv test failed\n");
    }

    #[test]
    fn mpi_errors_fail_the_case() {
        let case = case("MPI_Send", Participants::Only(0), never_runs);
        let outcome = Err(Failure::Mpi(crate::Error::InvalidRank(9)));
        let mut out = Vec::new();
        assert!(!record(0, &case, outcome, &mut out).unwrap());
        assert_eq!(printed(out), "MPI_Send test failed\n");
    }

    #[test]
    fn small_world_stops_every_rank() {
        for rank in 0..3 {
            let mut out = Vec::new();
            assert!(!check_size(rank, 3, &mut out).unwrap());
            let text = printed(out);
            if rank == 0 {
                assert_eq!(text, format!("{TOO_FEW_PROCESSES}\n"));
            } else {
                assert!(text.is_empty(), "rank {rank} printed {text:?}");
            }
        }
    }

    #[test]
    fn four_ranks_are_enough() {
        let mut out = Vec::new();
        assert!(check_size(0, 4, &mut out).unwrap());
        assert!(check_size(0, 16, &mut out).unwrap());
        assert!(out.is_empty());
    }
}

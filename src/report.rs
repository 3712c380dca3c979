//! Aggregating per-rank results into the final verdict.

use crate::{Communicator, Result};
use std::fmt;
use std::process::ExitCode;

/// Rank that collects results, runs the converter and prints the verdict.
pub const REPORTING_RANK: i32 = 1;

/// Wire value for a rank that passed every case it ran.
const PASS: i32 = 1;

/// Whether every gathered flag is a pass.
pub fn all_passed(flags: &[i32]) -> bool {
    flags.iter().all(|&flag| flag == PASS)
}

/// Gather each rank's result on [`REPORTING_RANK`].
///
/// Collective over `world`. The reporting rank gets the combined result;
/// every other rank gets its own back.
pub fn gather(world: &Communicator, passed: bool) -> Result<bool> {
    let flag = [if passed { PASS } else { 0 }];
    let mut flags = vec![0i32; world.size() as usize];
    world.gather(&flag, &mut flags, REPORTING_RANK)?;
    if world.rank() == REPORTING_RANK {
        Ok(passed && all_passed(&flags))
    } else {
        Ok(passed)
    }
}

/// Exit verdict for `rank`.
///
/// Only the reporting rank can fail the job. Every other rank's result has
/// already reached it through [`gather`], and a non-zero exit elsewhere lets
/// the launcher kill the reporting rank before it prints its verdict.
pub fn exit_verdict(rank: i32, success: bool) -> Verdict {
    if rank == REPORTING_RANK {
        Verdict::from(success)
    } else {
        Verdict::Passed
    }
}

/// Final outcome printed by the reporting rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// All cases passed and the converter produced its output.
    Passed,
    /// Something failed.
    Failed,
}

impl Verdict {
    /// Process exit status for this verdict.
    pub fn exit_code(self) -> ExitCode {
        match self {
            Verdict::Passed => ExitCode::SUCCESS,
            Verdict::Failed => ExitCode::FAILURE,
        }
    }
}

impl From<bool> for Verdict {
    fn from(passed: bool) -> Self {
        if passed {
            Verdict::Passed
        } else {
            Verdict::Failed
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed => f.write_str("PASSED"),
            Verdict::Failed => f.write_str("FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_passed_requires_every_flag() {
        assert!(all_passed(&[1, 1, 1, 1]));
        assert!(!all_passed(&[1, 0, 1, 1]));
        assert!(all_passed(&[]));
    }

    #[test]
    fn only_exact_pass_value_counts() {
        assert!(!all_passed(&[1, 2]));
        assert!(!all_passed(&[-1]));
    }

    #[test]
    fn verdict_lines() {
        assert_eq!(Verdict::Passed.to_string(), "PASSED");
        assert_eq!(Verdict::Failed.to_string(), "FAILED");
    }

    #[test]
    fn only_reporting_rank_exits_with_failure() {
        assert_eq!(exit_verdict(0, false), Verdict::Passed);
        assert_eq!(exit_verdict(2, false), Verdict::Passed);
        assert_eq!(exit_verdict(REPORTING_RANK, false), Verdict::Failed);
        assert_eq!(exit_verdict(REPORTING_RANK, true), Verdict::Passed);
    }

    #[test]
    fn verdict_from_bool() {
        assert_eq!(Verdict::from(true), Verdict::Passed);
        assert_eq!(Verdict::from(false), Verdict::Failed);
    }
}

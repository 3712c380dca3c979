//! `trace-test`: run the MPI trace conformance suite.
//!
//! Run with: mpiexec -n 4 ./target/release/trace-test

use clap::Parser;
use mpitrace::config::Config;
use mpitrace::report::{self, Verdict, REPORTING_RANK};
use mpitrace::suite::{self, Context, MIN_PROCESSES};
use mpitrace::{logging, verify, Mpi};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info, info_span, warn};

fn main() -> ExitCode {
    let config = Config::parse();
    if let Err(e) = logging::init(config.log_format) {
        eprintln!("{e}");
    }

    let mpi = match Mpi::init() {
        Ok(mpi) => mpi,
        Err(e) => {
            error!(error = %e, "MPI initialization failed");
            return ExitCode::FAILURE;
        }
    };

    // Installed after init; a panicking rank must not leave the others
    // blocked in a collective.
    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        Mpi::abort(1);
    }));

    let summary = run_suite(&mpi, &config);
    // Finalize before the converter reads the trace files
    drop(mpi);

    let _span = info_span!("rank", rank = summary.rank).entered();
    if summary.rank != REPORTING_RANK {
        if !summary.passed {
            warn!("cases failed on this rank; rank {REPORTING_RANK} reports the verdict");
        }
        return report::exit_verdict(summary.rank, summary.passed).exit_code();
    }

    let mut success = summary.overall;
    if success && !config.skip_verify {
        success = config.converter().verify(summary.size).unwrap_or_else(|e| {
            error!(error = %e, "trace verification failed");
            false
        });
    }
    if !config.keep_artifacts {
        match verify::cleanup(&config.trace_dir) {
            Ok(removed) => info!(removed, "cleaned up trace artifacts"),
            Err(e) => warn!(error = %e, "cleanup failed"),
        }
    }

    let verdict = Verdict::from(success);
    info!(%verdict, "suite finished");
    let mut stdout = io::stdout();
    if writeln!(stdout, "{verdict}").and_then(|()| stdout.flush()).is_err() {
        return ExitCode::FAILURE;
    }
    report::exit_verdict(summary.rank, success).exit_code()
}

struct Summary {
    rank: i32,
    size: i32,
    /// Cases this rank took part in all passed.
    passed: bool,
    /// Combined result; only meaningful on the reporting rank.
    overall: bool,
}

fn run_suite(mpi: &Mpi, config: &Config) -> Summary {
    let world = mpi.world();
    let (rank, size) = (world.rank(), world.size());
    let _span = info_span!("rank", rank).entered();
    let built = mpitrace::BUILT_AGAINST;
    match Mpi::version() {
        Ok(version) => info!(size, reps = config.reps, built, %version, "starting suite"),
        Err(e) => info!(size, reps = config.reps, built, error = %e, "starting suite"),
    }

    let ctx = Context::new(mpi, &world, config.reps());
    let passed = suite::run(&ctx, &mut io::stdout()).unwrap_or_else(|e| {
        error!(error = %e, "cannot write results");
        false
    });

    let overall = if size >= MIN_PROCESSES {
        report::gather(&world, passed).unwrap_or_else(|e| {
            error!(error = %e, "result aggregation failed");
            false
        })
    } else {
        passed
    };

    Summary {
        rank,
        size,
        passed,
        overall,
    }
}

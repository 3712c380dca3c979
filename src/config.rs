//! Command-line configuration for the `trace-test` driver.

use crate::logging::LogFormat;
use crate::verify::Converter;
use clap::Parser;
use std::path::PathBuf;

/// Repetitions used by the persistent-request cases unless overridden.
pub const DEFAULT_REPS: u32 = 50;

/// Run the MPI trace conformance suite, then check the trace converter's output.
///
/// Launch under `mpiexec` with at least 4 processes.
#[derive(Parser, Debug, Clone)]
#[command(name = "trace-test", version, about)]
pub struct Config {
    /// Trace converter to run after the suite.
    #[arg(
        long,
        env = "MPITRACE_CONVERTER",
        value_name = "PATH",
        default_value = "./bin/mpi2psins"
    )]
    pub converter: PathBuf,

    /// Application name passed to the converter and used in its output name.
    #[arg(long, default_value = "traceTest")]
    pub application: String,

    /// Dataset name passed to the converter and used in its output name.
    #[arg(long, default_value = "standard")]
    pub dataset: String,

    /// Directory holding the raw traces and the converter's output.
    #[arg(long, env = "MPITRACE_TRACE_DIR", value_name = "DIR", default_value = ".")]
    pub trace_dir: PathBuf,

    /// Repetitions for the persistent-request cases.
    #[arg(long, default_value_t = DEFAULT_REPS, value_parser = clap::value_parser!(u32).range(1..))]
    pub reps: u32,

    /// Skip running the converter; the verdict comes from the MPI cases alone.
    #[arg(long)]
    pub skip_verify: bool,

    /// Leave trace files and converter output in place.
    #[arg(long)]
    pub keep_artifacts: bool,

    /// Diagnostic output format (stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Config {
    /// Repetitions as a loop bound.
    pub fn reps(&self) -> usize {
        self.reps as usize
    }

    /// Converter invocation settings.
    pub fn converter(&self) -> Converter {
        Converter {
            program: self.converter.clone(),
            application: self.application.clone(),
            dataset: self.dataset.clone(),
            trace_dir: self.trace_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Config::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["trace-test"]).unwrap();
        assert_eq!(config.application, "traceTest");
        assert_eq!(config.dataset, "standard");
        assert_eq!(config.reps(), 50);
        assert!(!config.skip_verify);
        assert!(!config.keep_artifacts);
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn overrides() {
        let config = Config::try_parse_from([
            "trace-test",
            "--converter",
            "/opt/psins/bin/mpi2psins",
            "--application",
            "app",
            "--dataset",
            "small",
            "--trace-dir",
            "/tmp/traces",
            "--reps",
            "3",
            "--skip-verify",
            "--keep-artifacts",
            "--log-format",
            "pretty",
        ])
        .unwrap();
        assert_eq!(config.converter, PathBuf::from("/opt/psins/bin/mpi2psins"));
        assert_eq!(config.trace_dir, PathBuf::from("/tmp/traces"));
        assert_eq!(config.reps(), 3);
        assert!(config.skip_verify);
        assert!(config.keep_artifacts);
        assert_eq!(config.log_format, LogFormat::Pretty);

        let converter = config.converter();
        assert_eq!(converter.application, "app");
        assert_eq!(converter.dataset, "small");
    }

    #[test]
    fn zero_reps_rejected() {
        assert!(Config::try_parse_from(["trace-test", "--reps", "0"]).is_err());
    }

    #[test]
    fn unknown_log_format_rejected() {
        assert!(Config::try_parse_from(["trace-test", "--log-format", "json"]).is_err());
    }
}

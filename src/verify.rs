//! Post-run verification: run the trace converter over the raw trace files
//! the instrumented ranks left behind, and check that it produced its output.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Process-id map written by the converter.
pub const RANK_PID: &str = "RankPid";
/// Extended process-id map written by the converter.
pub const RANK_PID_EXTENDED: &str = "RankPid.extended";

/// Extension of raw per-rank trace files.
const TRACE_EXTENSION: &str = "bin";
/// Extension of the converter's trace output.
const OUTPUT_EXTENSION: &str = "psins";

/// Errors from preparing for or cleaning up after the converter.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// A raw trace file could not be created.
    #[error("cannot create trace file {}: {source}", path.display())]
    CreateTrace { path: PathBuf, source: io::Error },

    /// The converter could not be started.
    #[error("cannot start converter {}: {source}", program.display())]
    Spawn { program: PathBuf, source: io::Error },

    /// The trace directory could not be listed.
    #[error("cannot read directory {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    /// An artifact could not be deleted.
    #[error("cannot remove {}: {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },
}

/// Raw trace file name for `rank` in a run of `tasks` processes.
pub fn trace_file_name(rank: i32, tasks: i32) -> String {
    format!("psinstrace.rank{rank:05}.tasks{tasks:05}.{TRACE_EXTENSION}")
}

/// Converter output name for a run of `tasks` processes.
pub fn output_file_name(application: &str, dataset: &str, tasks: i32) -> String {
    format!("{application}_{dataset}_{tasks:04}.{OUTPUT_EXTENSION}")
}

/// Make sure a raw trace file exists for every rank.
///
/// Files already written by the tracer are left untouched.
pub fn ensure_trace_files(dir: &Path, tasks: i32) -> Result<Vec<PathBuf>, VerifyError> {
    (0..tasks)
        .map(|rank| {
            let path = dir.join(trace_file_name(rank, tasks));
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .map_err(|source| VerifyError::CreateTrace {
                    path: path.clone(),
                    source,
                })?;
            Ok(path)
        })
        .collect()
}

/// How to invoke the trace converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    /// Converter executable.
    pub program: PathBuf,
    /// Application name, part of the output file name.
    pub application: String,
    /// Dataset name, part of the output file name.
    pub dataset: String,
    /// Where the raw traces live and the output is written.
    pub trace_dir: PathBuf,
}

impl Converter {
    /// Command line for a run of `tasks` processes.
    pub fn command(&self, tasks: i32) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--application")
            .arg(&self.application)
            .arg("--dataset")
            .arg(&self.dataset)
            .arg("--cpu_count")
            .arg(tasks.to_string())
            .arg("--trace_dir")
            .arg(&self.trace_dir)
            .arg("--ease_requests")
            .arg("--dyn_constants");
        command
    }

    /// Run the converter to completion.
    pub fn run(&self, tasks: i32) -> Result<ExitStatus, VerifyError> {
        info!(program = %self.program.display(), tasks, "running trace converter");
        self.command(tasks)
            .status()
            .map_err(|source| VerifyError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    /// Files the converter must leave in the trace directory.
    pub fn expected_outputs(&self, tasks: i32) -> [PathBuf; 3] {
        [
            self.trace_dir.join(RANK_PID),
            self.trace_dir.join(RANK_PID_EXTENDED),
            self.trace_dir
                .join(output_file_name(&self.application, &self.dataset, tasks)),
        ]
    }

    /// Expected outputs that do not exist.
    pub fn missing_outputs(&self, tasks: i32) -> Vec<PathBuf> {
        self.expected_outputs(tasks)
            .into_iter()
            .filter(|path| !path.exists())
            .collect()
    }

    /// Prepare the trace files, run the converter and check its output.
    ///
    /// The converter's exit status and spawn errors are logged; the result
    /// depends only on whether the expected files are present afterwards.
    pub fn verify(&self, tasks: i32) -> Result<bool, VerifyError> {
        ensure_trace_files(&self.trace_dir, tasks)?;
        match self.run(tasks) {
            Ok(status) if status.success() => debug!(%status, "converter finished"),
            Ok(status) => warn!(%status, "converter exited unsuccessfully"),
            Err(e) => warn!(error = %e, "converter did not run"),
        }
        let missing = self.missing_outputs(tasks);
        for path in &missing {
            warn!(path = %path.display(), "converter output missing");
        }
        Ok(missing.is_empty())
    }
}

fn is_artifact(path: &Path) -> bool {
    let extension = path.extension().and_then(|e| e.to_str());
    if matches!(extension, Some(TRACE_EXTENSION | OUTPUT_EXTENSION)) {
        return true;
    }
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some(RANK_PID | RANK_PID_EXTENDED)
    )
}

/// Remove raw traces, converter output and process-id maps from `dir`.
///
/// Returns the number of files removed.
pub fn cleanup(dir: &Path) -> Result<usize, VerifyError> {
    let entries = fs::read_dir(dir).map_err(|source| VerifyError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|source| VerifyError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || !is_artifact(&path) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(VerifyError::Remove { path, source }),
        }
    }
    debug!(removed, dir = %dir.display(), "removed trace artifacts");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn converter(dir: &Path) -> Converter {
        Converter {
            program: dir.join("no-such-converter"),
            application: "traceTest".into(),
            dataset: "standard".into(),
            trace_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn file_names() {
        assert_eq!(trace_file_name(0, 4), "psinstrace.rank00000.tasks00004.bin");
        assert_eq!(trace_file_name(12, 128), "psinstrace.rank00012.tasks00128.bin");
        assert_eq!(
            output_file_name("traceTest", "standard", 4),
            "traceTest_standard_0004.psins"
        );
    }

    #[test]
    fn ensure_creates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ensure_trace_files(dir.path(), 4).unwrap();
        assert_eq!(paths.len(), 4);
        for path in &paths {
            assert!(path.is_file());
        }
    }

    #[test]
    fn ensure_keeps_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(trace_file_name(1, 4));
        fs::write(&path, b"recorded events").unwrap();

        ensure_trace_files(dir.path(), 4).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"recorded events");
    }

    #[test]
    fn command_line() {
        let converter = Converter {
            program: PathBuf::from("./bin/mpi2psins"),
            application: "traceTest".into(),
            dataset: "standard".into(),
            trace_dir: PathBuf::from("."),
        };
        let command = converter.command(4);
        assert_eq!(command.get_program(), OsStr::new("./bin/mpi2psins"));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(
            args,
            [
                "--application",
                "traceTest",
                "--dataset",
                "standard",
                "--cpu_count",
                "4",
                "--trace_dir",
                ".",
                "--ease_requests",
                "--dyn_constants",
            ]
            .map(OsStr::new)
        );
    }

    #[test]
    fn missing_outputs_listed() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter(dir.path());
        assert_eq!(converter.missing_outputs(4).len(), 3);

        fs::write(dir.path().join(RANK_PID), "").unwrap();
        fs::write(dir.path().join(RANK_PID_EXTENDED), "").unwrap();
        assert_eq!(
            converter.missing_outputs(4),
            vec![dir.path().join("traceTest_standard_0004.psins")]
        );
    }

    #[test]
    fn verify_fails_without_converter_output() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!converter(dir.path()).verify(4).unwrap());
        // Trace files were still prepared
        assert!(dir.path().join(trace_file_name(3, 4)).is_file());
    }

    #[test]
    fn verify_judges_by_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter(dir.path());
        for path in converter.expected_outputs(4) {
            fs::write(path, "").unwrap();
        }
        assert!(converter.verify(4).unwrap());
    }

    #[test]
    fn run_reports_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = converter(dir.path()).run(4).unwrap_err();
        assert!(matches!(err, VerifyError::Spawn { .. }));
    }

    #[test]
    fn cleanup_removes_only_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter(dir.path());
        ensure_trace_files(dir.path(), 4).unwrap();
        for path in converter.expected_outputs(4) {
            fs::write(path, "").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        fs::create_dir(dir.path().join("nested.bin")).unwrap();

        assert_eq!(cleanup(dir.path()).unwrap(), 7);
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("nested.bin").is_dir());
        assert_eq!(converter.missing_outputs(4).len(), 3);
    }

    #[test]
    fn cleanup_of_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = cleanup(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, VerifyError::ReadDir { .. }));
    }
}

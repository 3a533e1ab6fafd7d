use std::path::PathBuf;

use thiserror::Error;

use crate::mutants::MutantStatus;

/// The source unit could not be loaded. Aborts the session.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to read source file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Artifacts could not be written. Aborts the session.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("artifact path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

/// Failures of the execution pipeline. Per-mutant build failures and test
/// timeouts are not errors: they end up as `CompileError` / `Timeout`.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to back up {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write mutant into {}: {source}", path.display())]
    Apply {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to restore {}: {reason}", path.display())]
    RestoreFailure { path: PathBuf, reason: String },
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("baseline {phase} failed before any mutation:\n{output}")]
    BaselineFailed { phase: &'static str, output: String },
    #[error(
        "recovered {} from an interrupted run; re-run against the restored tree",
        path.display()
    )]
    InterruptedRun { path: PathBuf },
    #[error("a mutation worker panicked")]
    WorkerPanic,
    #[error("failed to prepare isolated tree: {0}")]
    Isolation(std::io::Error),
    #[error("tracked file {} is not inside build tree {}", tracked.display(), root.display())]
    TrackedOutsideTree { tracked: PathBuf, root: PathBuf },
    #[error(transparent)]
    Status(#[from] StatusError),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to access report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed report {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal status transition for mutant {id}: {from:?} -> {to:?}")]
pub struct StatusError {
    pub id: usize,
    pub from: MutantStatus,
    pub to: MutantStatus,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

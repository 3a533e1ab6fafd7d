use std::io::{Read, Seek, SeekFrom};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_queue::SegQueue;

use crate::config::{CommandSpec, RunConfig};
use crate::copy_tree;
use crate::error::ExecutionError;
use crate::mutants::{MutantRecord, MutantStatus};
use crate::safety::{self, BackupGuard};
use crate::state::MutationSession;

/// Bytes of collaborator output kept for logs and baseline errors.
const OUTPUT_TAIL: usize = 4000;

/// A build tree and the file inside it that mutants are written to.
///
/// Only one mutant may occupy a tree at a time, so the pipeline takes trees
/// by `&mut` and every worker owns its tree outright.
#[derive(Debug)]
pub struct BuildTree {
    root: PathBuf,
    tracked_rel: PathBuf,
    tracked: PathBuf,
}

impl BuildTree {
    pub fn new(root: impl Into<PathBuf>, tracked_rel: impl Into<PathBuf>) -> Result<Self, ExecutionError> {
        let root = root.into();
        let tracked_rel = tracked_rel.into();
        let escapes = tracked_rel.is_absolute()
            || tracked_rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || tracked_rel.as_os_str().is_empty() {
            return Err(ExecutionError::TrackedOutsideTree {
                tracked: tracked_rel,
                root,
            });
        }
        let tracked = root.join(&tracked_rel);
        Ok(BuildTree {
            root,
            tracked_rel,
            tracked,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tracked(&self) -> &Path {
        &self.tracked
    }

    /// The same tracked file under another root.
    pub fn relocate(&self, root: &Path) -> BuildTree {
        BuildTree {
            root: root.to_path_buf(),
            tracked_rel: self.tracked_rel.clone(),
            tracked: root.join(&self.tracked_rel),
        }
    }
}

/// Result of one bounded collaborator call.
#[derive(Debug)]
pub struct Invocation {
    pub code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
    /// Tail of combined stdout and stderr.
    pub output: String,
}

impl Invocation {
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }

    fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    fn describe_failure(&self, phase: &str, timeout: Duration) -> String {
        if self.timed_out {
            format!("{phase} timed out after {}s", timeout.as_secs_f64())
        } else {
            match self.code {
                Some(code) => format!("{phase} exited with {code}"),
                None => format!("{phase} killed by signal"),
            }
        }
    }
}

/// Run `spec` in `cwd`, killing it once its timeout elapses. Output goes to
/// an anonymous temp file so a chatty child can never block on a full pipe.
pub fn run_bounded(spec: &CommandSpec, cwd: &Path) -> std::io::Result<Invocation> {
    let mut sink = tempfile::tempfile()?;
    let start = Instant::now();
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(sink.try_clone()?)
        .stderr(sink.try_clone()?);
    own_process_group(&mut command);
    let mut child = command.spawn()?;

    let (code, timed_out) = loop {
        match child.try_wait()? {
            Some(status) => break (status.code(), false),
            None => {
                if start.elapsed() > spec.timeout {
                    kill_group(&mut child);
                    let _ = child.wait();
                    break (None, true);
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    };
    let duration = start.elapsed();

    let mut raw = Vec::new();
    sink.seek(SeekFrom::Start(0))?;
    sink.read_to_end(&mut raw)?;
    let tail = &raw[raw.len().saturating_sub(OUTPUT_TAIL)..];
    let output = String::from_utf8_lossy(tail).into_owned();
    if !output.is_empty() {
        log::debug!("`{}` output:\n{}", spec.display(), output);
    }

    Ok(Invocation {
        code,
        timed_out,
        duration,
        output,
    })
}

/// Wrapper scripts (`sh`, `make`) start grandchildren; a timeout has to reach
/// them too, so every collaborator leads its own process group.
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn kill_group(child: &mut Child) {
    // The child leads its group, so its pid is the group id.
    let pgid = child.id() as libc::pid_t;
    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

/// Backup, apply, build, test, restore for one mutant at a time.
#[derive(Debug, Clone)]
pub struct Pipeline {
    build: CommandSpec,
    test: CommandSpec,
}

impl Pipeline {
    pub fn new(build: CommandSpec, test: CommandSpec) -> Self {
        Pipeline { build, test }
    }

    /// The unmutated tree must build and pass its tests, otherwise every
    /// mutant would look killed.
    pub fn baseline(&self, tree: &BuildTree) -> Result<(), ExecutionError> {
        for (phase, spec) in [("build", &self.build), ("test", &self.test)] {
            let inv = run_bounded(spec, tree.root()).map_err(|source| ExecutionError::Spawn {
                command: spec.display(),
                source,
            })?;
            if !inv.success() {
                return Err(ExecutionError::BaselineFailed {
                    phase,
                    output: format!("{}\n{}", inv.describe_failure(phase, spec.timeout), inv.output),
                });
            }
            log::info!("baseline {} passed in {:?}", phase, inv.duration);
        }
        Ok(())
    }

    /// Run one mutant through `tree` and return its terminal status. The
    /// tracked file is restored before this returns, on success and on error
    /// alike; a failed restore is reported as `RestoreFailure`.
    pub fn execute(
        &self,
        tree: &mut BuildTree,
        record: &mut MutantRecord,
    ) -> Result<MutantStatus, ExecutionError> {
        let guard = BackupGuard::acquire(tree.tracked())?;
        let outcome = self.apply_and_classify(tree, record);
        guard.restore()?;
        record.mark_restored();
        outcome
    }

    fn apply_and_classify(
        &self,
        tree: &BuildTree,
        record: &mut MutantRecord,
    ) -> Result<MutantStatus, ExecutionError> {
        std::fs::write(tree.tracked(), &record.candidate.text).map_err(|source| {
            ExecutionError::Apply {
                path: tree.tracked().to_path_buf(),
                source,
            }
        })?;
        record.advance(MutantStatus::Applied)?;

        match run_bounded(&self.build, tree.root()) {
            Err(e) => {
                record.note = Some(format!("build could not start: {e}"));
                record.advance(MutantStatus::CompileError)?;
                return Ok(record.status);
            }
            Ok(inv) => {
                record.build_ms = inv.duration_ms();
                if !inv.success() {
                    record.note = Some(inv.describe_failure("build", self.build.timeout));
                    record.advance(MutantStatus::CompileError)?;
                    return Ok(record.status);
                }
            }
        }
        record.advance(MutantStatus::Compiled)?;

        let inv = run_bounded(&self.test, tree.root()).map_err(|source| ExecutionError::Spawn {
            command: self.test.display(),
            source,
        })?;
        record.test_ms = inv.duration_ms();
        let status = if inv.timed_out {
            record.note = Some(inv.describe_failure("tests", self.test.timeout));
            MutantStatus::Timeout
        } else if inv.success() {
            MutantStatus::Survived
        } else {
            MutantStatus::Killed
        };
        record.advance(status)?;
        Ok(status)
    }
}

/// Drain the session's pending records through one worker per tree.
///
/// Workers pull from a shared queue and never share a tree. The first fatal
/// error or panic stops every worker; records nobody picked up stay
/// `Pending`, and a record in hand when a worker fails is kept as it was.
pub fn run_workers(
    session: &mut MutationSession,
    pipeline: &Pipeline,
    trees: Vec<&mut BuildTree>,
    on_done: &(dyn Fn(&MutantRecord) + Sync),
) -> Result<(), ExecutionError> {
    let pending = SegQueue::new();
    for record in session.take_records() {
        pending.push(record);
    }
    let done = SegQueue::new();
    let abort = AtomicBool::new(false);

    let outcomes: Vec<Result<(), ExecutionError>> = std::thread::scope(|s| {
        let handles: Vec<_> = trees
            .into_iter()
            .map(|tree| {
                let (pending, done, abort) = (&pending, &done, &abort);
                s.spawn(move || -> Result<(), ExecutionError> {
                    while !abort.load(Ordering::SeqCst) {
                        let Some(mut record) = pending.pop() else {
                            break;
                        };
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                            let result = pipeline.execute(tree, &mut record);
                            if result.is_ok() {
                                on_done(&record);
                            }
                            result
                        }));
                        done.push(record);
                        if let Err(e) = outcome.unwrap_or(Err(ExecutionError::WorkerPanic)) {
                            abort.store(true, Ordering::SeqCst);
                            return Err(e);
                        }
                    }
                    Ok(())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(Err(ExecutionError::WorkerPanic)))
            .collect()
    });

    let mut records: Vec<MutantRecord> = std::iter::from_fn(|| done.pop())
        .chain(std::iter::from_fn(|| pending.pop()))
        .collect();
    records.sort_by_key(MutantRecord::id);
    session.replace_records(records);

    outcomes.into_iter().collect()
}

/// Full execution phase of a run: recovery check, baseline, worker trees,
/// then every mutant.
pub fn execute_session(
    session: &mut MutationSession,
    config: &RunConfig,
    build_dir: &Path,
    on_done: &(dyn Fn(&MutantRecord) + Sync),
) -> Result<(), ExecutionError> {
    let tracked_rel = match &config.tracked {
        Some(rel) => rel.clone(),
        None => PathBuf::from(session.source().path().file_name().unwrap_or_default()),
    };
    let mut tree = BuildTree::new(build_dir, tracked_rel)?;

    if let Some(bak) = safety::check_interrupted_run(tree.tracked()) {
        safety::restore_from_backup(tree.tracked(), &bak).map_err(|e| {
            ExecutionError::RestoreFailure {
                path: tree.tracked().to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        log::warn!("restored {} from {}", tree.tracked().display(), bak.display());
        return Err(ExecutionError::InterruptedRun {
            path: tree.tracked().to_path_buf(),
        });
    }

    match std::fs::read_to_string(tree.tracked()) {
        Ok(current) if current != session.source().text() => log::warn!(
            "{} differs from {}; mutants replace it wholesale",
            tree.tracked().display(),
            session.source().path().display()
        ),
        Ok(_) => {}
        Err(e) => log::warn!("cannot read {}: {}", tree.tracked().display(), e),
    }

    let pipeline = Pipeline::new(config.build.clone(), config.test.clone());
    pipeline.baseline(&tree)?;

    let jobs = config.jobs.max(1);
    if jobs == 1 && !config.isolated {
        log::info!("testing mutants in place in {}", tree.root().display());
        return run_workers(session, &pipeline, vec![&mut tree], on_done);
    }

    let session_id = generate_session_id();
    let mut copies =
        copy_tree::isolate(&tree, jobs, &session_id).map_err(ExecutionError::Isolation)?;
    log::info!("testing mutants with {} isolated worker(s)", copies.len());
    let trees = copies.iter_mut().map(|c| &mut c.tree).collect();
    run_workers(session, &pipeline, trees, on_done)
}

fn generate_session_id() -> String {
    format!("{:08x}", fastrand::u32(..))
}

pub fn generate_diff(original: &str, mutated: &str) -> String {
    use similar::TextDiff;
    let diff = TextDiff::from_lines(original, mutated);
    let mut output = String::new();
    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => {
                output.push_str(&format!("- {}", change));
            }
            similar::ChangeTag::Insert => {
                output.push_str(&format!("+ {}", change));
            }
            _ => {}
        }
    }
    output
}

//! Run configuration.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUTPUT_DIR: &str = "mutants";
pub const DEFAULT_BUILD_CMD: &str = "gprbuild";
pub const DEFAULT_TEST_CMD: &str = "./test_runner";
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 120;

/// External command run in the build tree, split on whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn parse(cmd: &str, timeout: Duration) -> Self {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        CommandSpec {
            program,
            args: parts.collect(),
            timeout,
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything a mutation run needs besides the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Where artifacts, manifest and report are written.
    pub output_dir: PathBuf,
    /// Build/test tree. `None` means generate and persist only.
    pub build_dir: Option<PathBuf>,
    /// Path of the mutated file relative to the build tree. Defaults to the
    /// source file's name.
    pub tracked: Option<PathBuf>,
    pub max_mutants: Option<usize>,
    pub build: CommandSpec,
    pub test: CommandSpec,
    /// Worker count; each worker gets its own tree.
    pub jobs: usize,
    /// Copy the tree even with a single worker instead of mutating in place.
    pub isolated: bool,
    /// Score below which the run is reported as failed.
    pub min_score: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            build_dir: None,
            tracked: None,
            max_mutants: None,
            build: CommandSpec::parse(
                DEFAULT_BUILD_CMD,
                Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS),
            ),
            test: CommandSpec::parse(
                DEFAULT_TEST_CMD,
                Duration::from_secs(DEFAULT_TEST_TIMEOUT_SECS),
            ),
            jobs: 1,
            isolated: false,
            min_score: None,
        }
    }
}

impl RunConfig {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(dir.into());
        self
    }

    pub fn with_tracked(mut self, rel: impl Into<PathBuf>) -> Self {
        self.tracked = Some(rel.into());
        self
    }

    pub fn with_max_mutants(mut self, n: usize) -> Self {
        self.max_mutants = Some(n);
        self
    }

    pub fn with_build_cmd(mut self, cmd: &str, timeout: Duration) -> Self {
        self.build = CommandSpec::parse(cmd, timeout);
        self
    }

    pub fn with_test_cmd(mut self, cmd: &str, timeout: Duration) -> Self {
        self.test = CommandSpec::parse(cmd, timeout);
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_isolation(mut self, isolated: bool) -> Self {
        self.isolated = isolated;
        self
    }

    pub fn with_min_score(mut self, pct: f64) -> Self {
        self.min_score = Some(pct);
        self
    }

    /// Dry runs only generate and persist.
    pub fn is_dry_run(&self) -> bool {
        self.build_dir.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.output_dir, PathBuf::from("mutants"));
        assert_eq!(cfg.build.program, "gprbuild");
        assert_eq!(cfg.build.timeout, Duration::from_secs(60));
        assert_eq!(cfg.test.program, "./test_runner");
        assert_eq!(cfg.test.timeout, Duration::from_secs(120));
        assert_eq!(cfg.jobs, 1);
        assert!(cfg.is_dry_run());
    }

    #[test]
    fn builder_overrides_work() {
        let cfg = RunConfig::default()
            .with_output_dir("/tmp/out")
            .with_build_dir("/tmp/tree")
            .with_tracked("src/any.adb")
            .with_max_mutants(5)
            .with_build_cmd("make -j4", Duration::from_secs(10))
            .with_jobs(0)
            .with_min_score(80.0);

        assert_eq!(cfg.build_dir.as_deref(), Some(std::path::Path::new("/tmp/tree")));
        assert_eq!(cfg.build.program, "make");
        assert_eq!(cfg.build.args, vec!["-j4".to_string()]);
        assert_eq!(cfg.jobs, 1, "jobs is clamped to at least one");
        assert_eq!(cfg.max_mutants, Some(5));
        assert!(!cfg.is_dry_run());
    }

    #[test]
    fn command_spec_display_rejoins_parts() {
        let spec = CommandSpec::parse("  gprbuild   -P test.gpr ", Duration::from_secs(1));
        assert_eq!(spec.display(), "gprbuild -P test.gpr");
    }
}

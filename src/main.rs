use patmut::Error;
use patmut::config::{self, RunConfig};
use patmut::generator::{self, SourceUnit};
use patmut::mutants::MutantRecord;
use patmut::output;
use patmut::runner;
use patmut::state::Report;
use patmut::store;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "patmut", version, about = "Pattern-based mutation testing for Ada sources")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate mutants for a source file and, given a build tree, test them
    Run(RunArgs),
    /// Summary of the last exported report
    Status {
        /// Directory holding mutation_report.json
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
        output: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show details for one mutant of the last report
    Show {
        /// Mutant id (e.g. 12 or #12)
        #[arg(value_name = "ID")]
        mutant_id: String,
        /// Directory holding mutation_report.json
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
        output: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List the mutation operator catalog
    Operators,
}

#[derive(Args)]
struct RunArgs {
    /// Source file to mutate
    source: PathBuf,
    /// Output directory for mutants, manifest and report
    #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
    output: PathBuf,
    /// Build tree to test mutants in (omit for a generate-only dry run)
    #[arg(short, long, env = "PATMUT_BUILD_DIR")]
    build_dir: Option<PathBuf>,
    /// Maximum number of mutants to keep
    #[arg(short = 'n', long)]
    max_mutants: Option<usize>,
    /// Path of the mutated file inside the build tree (default: source file name)
    #[arg(long)]
    tracked: Option<PathBuf>,
    /// Build command, run in the build tree
    #[arg(long, env = "PATMUT_BUILD_CMD", default_value = config::DEFAULT_BUILD_CMD)]
    build_cmd: String,
    /// Test command, run in the build tree
    #[arg(long, env = "PATMUT_TEST_CMD", default_value = config::DEFAULT_TEST_CMD)]
    test_cmd: String,
    /// Build timeout in seconds
    #[arg(long, env = "PATMUT_BUILD_TIMEOUT", default_value_t = config::DEFAULT_BUILD_TIMEOUT_SECS)]
    build_timeout: u64,
    /// Test timeout in seconds
    #[arg(long, env = "PATMUT_TEST_TIMEOUT", default_value_t = config::DEFAULT_TEST_TIMEOUT_SECS)]
    test_timeout: u64,
    /// Parallel workers, each on its own copy of the build tree
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,
    /// Copy the build tree even with one worker instead of mutating in place
    #[arg(long)]
    isolated: bool,
    /// Fail (exit 1) when the score is below this percentage
    #[arg(long)]
    min_score: Option<f64>,
    /// Output the report as JSON instead of human-readable text
    #[arg(long)]
    json: bool,
    /// Exit code only, no output
    #[arg(short, long)]
    quiet: bool,
}

impl RunArgs {
    fn to_config(&self) -> RunConfig {
        let mut cfg = RunConfig::default()
            .with_output_dir(&self.output)
            .with_build_cmd(&self.build_cmd, Duration::from_secs(self.build_timeout))
            .with_test_cmd(&self.test_cmd, Duration::from_secs(self.test_timeout))
            .with_jobs(self.jobs)
            .with_isolation(self.isolated);
        if let Some(dir) = &self.build_dir {
            cfg = cfg.with_build_dir(dir);
        }
        if let Some(rel) = &self.tracked {
            cfg = cfg.with_tracked(rel);
        }
        if let Some(n) = self.max_mutants {
            cfg = cfg.with_max_mutants(n);
        }
        if let Some(min) = self.min_score {
            cfg = cfg.with_min_score(min);
        }
        cfg
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Status { output, json } => cmd_status(output, json),
        Commands::Show {
            mutant_id,
            output,
            json,
        } => cmd_show(mutant_id, output, json),
        Commands::Operators => {
            output::print_catalog(&patmut::default_catalog());
            0
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn cmd_run(args: RunArgs) -> i32 {
    let config = args.to_config();
    let chatty = !args.quiet && !args.json;

    if !args.source.exists() {
        output::print_error(&format!(
            "Source file not found: {}. Check the path and try again.",
            args.source.display()
        ));
        return 2;
    }

    let unit = match SourceUnit::load(&args.source) {
        Ok(u) => u,
        Err(e) => return fail(e),
    };

    let candidates = generator::generate(&unit, &patmut::default_catalog(), config.max_mutants);
    if chatty {
        output::print_distribution(&generator::distribution(&candidates));
    }

    let mut session = match store::persist(&unit, candidates, &config.output_dir) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let mut aborted = None;
    if let Some(build_dir) = &config.build_dir {
        let on_done = |record: &MutantRecord| {
            if chatty {
                output::print_progress(record);
            }
        };
        if let Err(e) = runner::execute_session(&mut session, &config, build_dir, &on_done) {
            aborted = Some(fail(e));
        }
    }

    let report = Report::from_session(&session, config.is_dry_run());
    let saved = match report.save(&config.output_dir) {
        Ok(path) => path,
        Err(e) => {
            output::print_error(&e.to_string());
            return 3;
        }
    };
    if let Some(code) = aborted {
        return code;
    }

    if !args.quiet {
        if args.json {
            match serde_json::to_string(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    output::print_error(&e.to_string());
                    return 3;
                }
            }
        } else {
            output::print_run_result(&report);
            println!();
            println!("Report saved to {}", saved.display());
        }
    }

    if report.dry_run || report.summary.passes(config.min_score) {
        0
    } else {
        1
    }
}

/// 2 for bad input, 3 for the environment.
fn exit_code(err: &Error) -> i32 {
    match err {
        Error::Generation(_) | Error::Report(_) => 2,
        Error::Persist(_) | Error::Execution(_) => 3,
    }
}

fn fail(err: impl Into<Error>) -> i32 {
    let err = err.into();
    output::print_error(&err.to_string());
    exit_code(&err)
}

fn cmd_status(output_dir: PathBuf, json_mode: bool) -> i32 {
    match Report::load(&output_dir) {
        Ok(report) => {
            if json_mode {
                match serde_json::to_string(&report.summary) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        output::print_error(&e.to_string());
                        return 3;
                    }
                }
            } else {
                output::print_status(&report);
            }
            0
        }
        Err(e) => {
            output::print_error(&format!("No previous run found ({e}). Run `patmut run` first."));
            2
        }
    }
}

fn cmd_show(mutant_id: String, output_dir: PathBuf, json_mode: bool) -> i32 {
    let report = match Report::load(&output_dir) {
        Ok(r) => r,
        Err(e) => {
            output::print_error(&format!("No previous run found ({e}). Run `patmut run` first."));
            return 2;
        }
    };

    let id = match mutant_id.trim_start_matches('#').parse::<usize>() {
        Ok(id) => id,
        Err(_) => {
            output::print_error(&format!("Invalid mutant id: {mutant_id}"));
            return 2;
        }
    };

    match report.find(id) {
        Some(record) => {
            if json_mode {
                match serde_json::to_string(record) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        output::print_error(&e.to_string());
                        return 3;
                    }
                }
            } else {
                output::print_mutant_detail(record, report.gap(id));
            }
            0
        }
        None => {
            output::print_error(&format!(
                "Mutant #{} not found. The report has ids 1..={}",
                id,
                report.mutants.len()
            ));
            2
        }
    }
}

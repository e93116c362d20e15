// crates/rule-forge-cli/src/main.rs
// ============================================================================
// Module: Rule Forge CLI Entry Point
// Description: Command dispatcher for replayable discovery runs.
// Purpose: Parse arguments, execute commands, and map outcomes to exit codes.
// Dependencies: clap, rule-forge-cli
// ============================================================================

//! ## Overview
//! The Rule Forge CLI executes discovery runs from local files. Exit status
//! distinguishes convergence (0) from budget exhaustion (2), cancellation
//! (3), and fatal errors (1) so scripted callers can branch on the result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use rule_forge_cli::RunRequest;
use rule_forge_cli::execute_run;
use rule_forge_cli::outcome_label;
use rule_forge_cli::write_stderr_line;
use rule_forge_cli::write_stdout_line;
use rule_forge_core::core::RunOutcome;

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

/// Top-level CLI arguments.
#[derive(Debug, Parser)]
#[command(name = "rule-forge", version, about = "Iterative approval-ruleset discovery")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute a discovery run from local files.
    Run(RunArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
struct RunArgs {
    /// Labeled dataset JSON file.
    #[arg(long)]
    dataset: PathBuf,
    /// Proposal script JSON file (array of proposals).
    #[arg(long)]
    proposals: PathBuf,
    /// Seed ruleset document to start from.
    #[arg(long)]
    seed: Option<PathBuf>,
    /// TOML settings file.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Maximum refinement iterations (overrides settings).
    #[arg(long)]
    max_iterations: Option<u32>,
    /// Accuracy at or above which the run converges (overrides settings).
    #[arg(long)]
    success_threshold: Option<f64>,
    /// Ignore any seed and start from the always-decline posture.
    #[arg(long)]
    from_scratch: bool,
    /// Output directory for run artifacts.
    #[arg(long, default_value = "rule-forge-out")]
    out: PathBuf,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => command_run(args),
    }
}

/// Executes the `run` subcommand and maps its outcome to an exit code.
fn command_run(args: RunArgs) -> ExitCode {
    let request = RunRequest {
        dataset: args.dataset,
        proposals: args.proposals,
        seed: args.seed,
        settings: args.settings,
        max_iterations: args.max_iterations,
        success_threshold: args.success_threshold,
        from_scratch: args.from_scratch,
        out: args.out,
    };

    match execute_run(&request) {
        Ok(outcome) => {
            // A closed pipe must not mask the run outcome.
            let _ = write_stdout_line(&format!("run finished: {}", outcome_label(outcome)));
            exit_code_for(outcome)
        }
        Err(error) => {
            let _ = write_stderr_line(&format!("error: {error}"));
            ExitCode::from(1)
        }
    }
}

/// Maps a run outcome to the documented exit code.
fn exit_code_for(outcome: RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Converged => ExitCode::SUCCESS,
        RunOutcome::BudgetExhausted => ExitCode::from(2),
        RunOutcome::Cancelled => ExitCode::from(3),
    }
}

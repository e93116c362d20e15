// crates/rule-forge-cli/src/lib.rs
// ============================================================================
// Module: Rule Forge CLI Library
// Description: Command implementations for replayable discovery runs.
// Purpose: Load inputs, drive the controller, and write run artifacts.
// Dependencies: rule-forge-core, rule-forge-oracle, serde_json
// ============================================================================

//! ## Overview
//! The CLI drives a discovery run from three inputs: a labeled dataset, a
//! proposal script (the replayable stand-in for a live refinement oracle),
//! and optional TOML settings. Run artifacts (the best ruleset, the
//! validation history, per-iteration insight records, and a human-readable
//! summary) are written to an output directory. Exact file naming is a
//! presentation concern; the shapes are stable.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod settings;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use rule_forge_core::core::ConfusionCounts;
use rule_forge_core::core::ExpertFailure;
use rule_forge_core::core::ExpertiseTag;
use rule_forge_core::core::ProposalOutcome;
use rule_forge_core::core::Record;
use rule_forge_core::core::RecordId;
use rule_forge_core::core::RulesetDocument;
use rule_forge_core::core::RunOutcome;
use rule_forge_core::core::RunReport;
use rule_forge_core::core::ValidationResult;
use rule_forge_core::interfaces::RunObserver;
use rule_forge_core::runtime::ControllerError;
use rule_forge_core::runtime::RefinementController;
use rule_forge_oracle::DivergenceExpert;
use rule_forge_oracle::ExhaustedBehavior;
use rule_forge_oracle::GuardedOracle;
use rule_forge_oracle::ScriptError;
use rule_forge_oracle::ScriptedExpertiseOracle;
use rule_forge_oracle::ScriptedRefinementOracle;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::settings::ResolvedSettings;
use crate::settings::SettingsDocument;
use crate::settings::SettingsError;
use crate::settings::SettingsOverrides;
use crate::settings::load_settings;
use crate::settings::resolve_settings;

// ============================================================================
// SECTION: Run Request
// ============================================================================

/// Inputs for one `run` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Path to the labeled dataset JSON file.
    pub dataset: PathBuf,
    /// Path to the proposal script JSON file.
    pub proposals: PathBuf,
    /// Optional path to a seed ruleset document.
    pub seed: Option<PathBuf>,
    /// Optional path to a TOML settings file.
    pub settings: Option<PathBuf>,
    /// Override for the iteration budget.
    pub max_iterations: Option<u32>,
    /// Override for the success threshold.
    pub success_threshold: Option<f64>,
    /// Ignore any seed and start from the always-decline posture.
    pub from_scratch: bool,
    /// Output directory for run artifacts.
    pub out: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by CLI command execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// Settings loading or validation failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// An input file could not be read.
    #[error("failed to read `{path}`: {message}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error description.
        message: String,
    },
    /// Dataset JSON failed to parse.
    #[error("failed to parse dataset: {0}")]
    Dataset(String),
    /// Seed ruleset JSON failed to parse.
    #[error("failed to parse seed ruleset: {0}")]
    Seed(String),
    /// Proposal script failed to parse.
    #[error(transparent)]
    Script(#[from] ScriptError),
    /// The controller reported a fatal error.
    #[error(transparent)]
    Controller(#[from] ControllerError),
    /// A run artifact could not be written.
    #[error("failed to write `{path}`: {message}")]
    Artifact {
        /// Path that failed.
        path: String,
        /// Underlying error description.
        message: String,
    },
}

// ============================================================================
// SECTION: Dataset Loading
// ============================================================================

/// One dataset entry as stored on disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatasetEntry {
    /// Record identifier.
    record_id: String,
    /// Ground-truth approval label, when known.
    #[serde(default)]
    approved: Option<bool>,
    /// Nested field document to flatten.
    fields: Value,
}

/// Loads and flattens the dataset file into records.
fn load_dataset(path: &Path) -> Result<Vec<Record>, CliError> {
    let bytes = read_file(path)?;
    let entries: Vec<DatasetEntry> =
        serde_json::from_slice(&bytes).map_err(|err| CliError::Dataset(err.to_string()))?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            Record::from_json(RecordId::new(entry.record_id), &entry.fields, entry.approved)
        })
        .collect())
}

/// Loads a seed ruleset document from disk.
fn load_seed(path: &Path) -> Result<RulesetDocument, CliError> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).map_err(|err| CliError::Seed(err.to_string()))
}

/// Reads a file into memory with a structured error.
fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|err| CliError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

// ============================================================================
// SECTION: Progress Observer
// ============================================================================

/// Observer printing one progress line per validation pass.
#[derive(Debug, Clone, Copy, Default)]
struct ProgressObserver;

impl RunObserver for ProgressObserver {
    fn on_validation(&self, index: u32, result: &ValidationResult) {
        // Progress output is best-effort; a closed pipe must not fail the run.
        let _ = write_stdout_line(&format!(
            "iteration {index}: accuracy {:.4} ({} misclassified)",
            result.accuracy,
            result.misclassified.len()
        ));
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes a discovery run and writes artifacts to the output directory.
///
/// # Errors
///
/// Returns [`CliError`] when inputs cannot be loaded, the controller fails
/// fatally, or artifacts cannot be written.
pub fn execute_run(request: &RunRequest) -> Result<RunOutcome, CliError> {
    let document = match &request.settings {
        Some(path) => load_settings(path)?,
        None => SettingsDocument::default(),
    };
    let resolved = resolve_settings(&document, SettingsOverrides {
        max_iterations: request.max_iterations,
        success_threshold: request.success_threshold,
    });

    let dataset = load_dataset(&request.dataset)?;
    let seed = if request.from_scratch {
        None
    } else {
        match &request.seed {
            Some(path) => Some(load_seed(path)?),
            None => None,
        }
    };

    let script = read_file(&request.proposals)?;
    let refiner = GuardedOracle::new(
        Arc::new(ScriptedRefinementOracle::from_json_slice(&script, ExhaustedBehavior::Refuse)?),
        resolved.oracle_policy,
    );
    let expertise =
        GuardedOracle::new(Arc::new(build_expertise_oracle(&resolved)), resolved.oracle_policy);

    let controller = RefinementController::new(refiner, expertise, resolved.controller.clone())?
        .with_observer(Box::new(ProgressObserver));
    let report = controller.run(seed, &dataset)?;

    write_artifacts(&request.out, &report)?;
    Ok(report.outcome)
}

/// Builds the expertise oracle for replay runs.
///
/// When an analysis allowlist is configured, each listed field gets a
/// divergence expert so consultation is exercised deterministically; without
/// an allowlist the oracle recommends no one.
fn build_expertise_oracle(resolved: &ResolvedSettings) -> ScriptedExpertiseOracle {
    if resolved.expert_fields.is_empty() {
        return ScriptedExpertiseOracle::empty();
    }
    let recommendations = resolved
        .expert_fields
        .iter()
        .map(|field| {
            let tag = ExpertiseTag::new(format!("divergence.{field}"));
            DivergenceExpert::new(tag, field.clone()).recommendation()
        })
        .collect();
    ScriptedExpertiseOracle::new(recommendations)
}

// ============================================================================
// SECTION: Run Artifacts
// ============================================================================

/// One row of the validation-history artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct HistoryEntry {
    /// Iteration index.
    index: u32,
    /// Accuracy measured for the iteration.
    accuracy: f64,
    /// Confusion counts for the iteration.
    confusion: ConfusionCounts,
}

/// One row of the insight artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct InsightEntry {
    /// Iteration index.
    index: u32,
    /// Tags whose insights informed the refinement context.
    insights: Vec<ExpertiseTag>,
    /// Isolated expert failures observed during consultation.
    expert_failures: Vec<ExpertFailure>,
    /// Outcome of the proposal step.
    proposal: ProposalOutcome,
}

/// Writes all run artifacts to the output directory.
fn write_artifacts(out: &Path, report: &RunReport) -> Result<(), CliError> {
    fs::create_dir_all(out).map_err(|err| CliError::Artifact {
        path: out.display().to_string(),
        message: err.to_string(),
    })?;

    let history: Vec<HistoryEntry> = report
        .iterations
        .iter()
        .map(|record| HistoryEntry {
            index: record.index,
            accuracy: record.validation.accuracy,
            confusion: record.validation.confusion,
        })
        .collect();
    write_json(&out.join("validation_history.json"), &history)?;

    let insights: Vec<InsightEntry> = report
        .iterations
        .iter()
        .map(|record| InsightEntry {
            index: record.index,
            insights: record.insights.clone(),
            expert_failures: record.expert_failures.clone(),
            proposal: record.proposal.clone(),
        })
        .collect();
    write_json(&out.join("insights.json"), &insights)?;

    if let Some(best) = &report.best {
        write_json(&out.join("final_ruleset.json"), &best.ruleset)?;
    }

    let summary = render_summary(report);
    let summary_path = out.join("run_summary.txt");
    fs::write(&summary_path, summary).map_err(|err| CliError::Artifact {
        path: summary_path.display().to_string(),
        message: err.to_string(),
    })?;
    Ok(())
}

/// Serializes a value as pretty JSON into the given path.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|err| CliError::Artifact {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    fs::write(path, bytes).map_err(|err| CliError::Artifact {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Renders the human-readable run summary.
fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("outcome: {}\n", outcome_label(report.outcome)));
    out.push_str(&format!("iterations: {}\n", report.iterations.len()));
    match &report.best {
        Some(best) => {
            out.push_str(&format!(
                "best accuracy: {:.4} (iteration {})\n",
                best.accuracy, best.iteration
            ));
            out.push_str(&format!("best ruleset hash: {}\n", best.ruleset_hash.value));
        }
        None => out.push_str("best accuracy: none (no validation committed)\n"),
    }
    out
}

/// Returns the stable label for a run outcome.
#[must_use]
pub const fn outcome_label(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Converged => "converged",
        RunOutcome::BudgetExhausted => "budget_exhausted",
        RunOutcome::Cancelled => "cancelled",
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
///
/// # Errors
///
/// Returns the underlying I/O error when stdout is unavailable.
pub fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
///
/// # Errors
///
/// Returns the underlying I/O error when stderr is unavailable.
pub fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

// crates/rule-forge-cli/src/settings.rs
// ============================================================================
// Module: Rule Forge Run Settings
// Description: Strict TOML settings loading for discovery runs.
// Purpose: Provide fail-closed settings parsing with hard limits.
// Dependencies: rule-forge-core, serde, toml
// ============================================================================

//! ## Overview
//! Run settings are loaded from a TOML file with strict size limits and
//! range checks on every knob. Missing settings fall back to defaults;
//! invalid settings fail closed with a structured error. Command-line flags
//! override file values at resolution time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use rule_forge_core::core::AnalyzerConfig;
use rule_forge_core::core::FieldPath;
use rule_forge_core::runtime::ControllerConfig;
use rule_forge_core::runtime::OracleFailurePolicy;
use rule_forge_oracle::CallPolicy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum settings file size in bytes.
const MAX_SETTINGS_FILE_SIZE: usize = 64 * 1024;
/// Maximum refinement iterations a settings file may request.
const MAX_MAX_ITERATIONS: u32 = 10_000;
/// Minimum allowed timeout in milliseconds.
const MIN_TIMEOUT_MS: u64 = 1;
/// Maximum allowed timeout in milliseconds.
const MAX_TIMEOUT_MS: u64 = 600_000;
/// Maximum automatic oracle retries a settings file may request.
const MAX_ORACLE_RETRIES: u32 = 10;

// ============================================================================
// SECTION: Settings Document
// ============================================================================

/// Raw settings document as parsed from TOML.
///
/// # Invariants
/// - Unknown keys are rejected; absent keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsDocument {
    /// Run-loop settings.
    #[serde(default)]
    pub run: RunSection,
    /// Analyzer settings.
    #[serde(default)]
    pub analysis: AnalysisSection,
}

/// `[run]` section of the settings file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Maximum refinement iterations.
    pub max_iterations: Option<u32>,
    /// Accuracy at or above which the run converges.
    pub success_threshold: Option<f64>,
    /// Deadline for one expert consultation round, in milliseconds.
    pub consultation_timeout_ms: Option<u64>,
    /// Per-attempt oracle deadline, in milliseconds.
    pub oracle_timeout_ms: Option<u64>,
    /// Maximum automatic oracle retries.
    pub oracle_max_retries: Option<u32>,
    /// Stop the run when the refinement oracle fails, instead of continuing.
    pub abort_on_oracle_failure: Option<bool>,
}

/// `[analysis]` section of the settings file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSection {
    /// Fields the analyzer summarizes; absent means every field.
    pub field_allowlist: Option<Vec<String>>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("failed to read settings file `{path}`: {message}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error description.
        message: String,
    },
    /// Settings file exceeds the size limit.
    #[error("settings file exceeds size limit: {actual} bytes (max {max})")]
    TooLarge {
        /// Maximum allowed bytes.
        max: usize,
        /// Actual file size in bytes.
        actual: usize,
    },
    /// Settings TOML failed to parse.
    #[error("failed to parse settings: {0}")]
    Parse(String),
    /// A settings value is outside its allowed range.
    #[error("settings value out of range: {field} {detail}")]
    OutOfRange {
        /// Offending settings key.
        field: &'static str,
        /// Range violation description.
        detail: String,
    },
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads and validates a settings document from a TOML file.
///
/// # Errors
///
/// Returns [`SettingsError`] when the file cannot be read, exceeds the size
/// limit, fails to parse, or carries out-of-range values.
pub fn load_settings(path: &Path) -> Result<SettingsDocument, SettingsError> {
    let bytes = fs::read(path).map_err(|err| SettingsError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    if bytes.len() > MAX_SETTINGS_FILE_SIZE {
        return Err(SettingsError::TooLarge {
            max: MAX_SETTINGS_FILE_SIZE,
            actual: bytes.len(),
        });
    }
    let text = String::from_utf8(bytes).map_err(|err| SettingsError::Parse(err.to_string()))?;
    let document: SettingsDocument =
        toml::from_str(&text).map_err(|err| SettingsError::Parse(err.to_string()))?;
    validate_document(&document)?;
    Ok(document)
}

/// Validates range constraints on a parsed settings document.
fn validate_document(document: &SettingsDocument) -> Result<(), SettingsError> {
    if let Some(max_iterations) = document.run.max_iterations
        && !(1 ..= MAX_MAX_ITERATIONS).contains(&max_iterations)
    {
        return Err(SettingsError::OutOfRange {
            field: "run.max_iterations",
            detail: format!("must lie in 1..={MAX_MAX_ITERATIONS}, got {max_iterations}"),
        });
    }
    if let Some(threshold) = document.run.success_threshold
        && !(threshold > 0.0 && threshold <= 1.0)
    {
        return Err(SettingsError::OutOfRange {
            field: "run.success_threshold",
            detail: format!("must lie in (0, 1], got {threshold}"),
        });
    }
    for (field, timeout) in [
        ("run.consultation_timeout_ms", document.run.consultation_timeout_ms),
        ("run.oracle_timeout_ms", document.run.oracle_timeout_ms),
    ] {
        if let Some(timeout) = timeout
            && !(MIN_TIMEOUT_MS ..= MAX_TIMEOUT_MS).contains(&timeout)
        {
            return Err(SettingsError::OutOfRange {
                field,
                detail: format!("must lie in {MIN_TIMEOUT_MS}..={MAX_TIMEOUT_MS}, got {timeout}"),
            });
        }
    }
    if let Some(retries) = document.run.oracle_max_retries
        && retries > MAX_ORACLE_RETRIES
    {
        return Err(SettingsError::OutOfRange {
            field: "run.oracle_max_retries",
            detail: format!("must not exceed {MAX_ORACLE_RETRIES}, got {retries}"),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolved run settings after merging defaults, file values, and overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    /// Controller configuration for the run.
    pub controller: ControllerConfig,
    /// Call policy applied to the refinement oracle.
    pub oracle_policy: CallPolicy,
    /// Analyzer fields configured for divergence experts.
    pub expert_fields: Vec<FieldPath>,
}

/// Command-line overrides applied on top of file settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SettingsOverrides {
    /// Override for `run.max_iterations`.
    pub max_iterations: Option<u32>,
    /// Override for `run.success_threshold`.
    pub success_threshold: Option<f64>,
}

/// Merges defaults, file settings, and command-line overrides.
#[must_use]
pub fn resolve_settings(
    document: &SettingsDocument,
    overrides: SettingsOverrides,
) -> ResolvedSettings {
    let defaults = ControllerConfig::default();
    let default_policy = CallPolicy::default();

    let field_allowlist: Option<BTreeSet<FieldPath>> = document
        .analysis
        .field_allowlist
        .as_ref()
        .map(|fields| fields.iter().map(|field| FieldPath::new(field.clone())).collect());
    let expert_fields: Vec<FieldPath> = field_allowlist
        .as_ref()
        .map(|fields| fields.iter().cloned().collect())
        .unwrap_or_default();

    let controller = ControllerConfig {
        max_iterations: overrides
            .max_iterations
            .or(document.run.max_iterations)
            .unwrap_or(defaults.max_iterations),
        success_threshold: overrides
            .success_threshold
            .or(document.run.success_threshold)
            .unwrap_or(defaults.success_threshold),
        analyzer: AnalyzerConfig {
            field_allowlist,
        },
        consultation_timeout_ms: document
            .run
            .consultation_timeout_ms
            .unwrap_or(defaults.consultation_timeout_ms),
        on_oracle_failure: if document.run.abort_on_oracle_failure.unwrap_or(false) {
            OracleFailurePolicy::AbortRun
        } else {
            OracleFailurePolicy::ContinueRun
        },
    };

    let oracle_policy = CallPolicy {
        timeout_ms: document.run.oracle_timeout_ms.unwrap_or(default_policy.timeout_ms),
        max_retries: document.run.oracle_max_retries.unwrap_or(default_policy.max_retries),
    };

    ResolvedSettings {
        controller,
        oracle_policy,
        expert_fields,
    }
}

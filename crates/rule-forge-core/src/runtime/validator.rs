// crates/rule-forge-core/src/runtime/validator.rs
// ============================================================================
// Module: Rule Forge Validator
// Description: Dataset-wide accuracy and confusion measurement.
// Purpose: Produce immutable validation snapshots for refinement decisions.
// Dependencies: crate::core, crate::runtime::evaluator
// ============================================================================

//! ## Overview
//! Validation runs the evaluator over every labeled record, accumulating
//! confusion counts and the ordered misclassification list. Records without a
//! ground-truth label are skipped; a dataset that yields no labeled records
//! fails with [`ValidateError::EmptyDataset`] rather than dividing by zero.
//! Validation holds no state: equal inputs produce byte-for-byte equal
//! snapshots.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ConfusionCounts;
use crate::core::Misclassification;
use crate::core::Record;
use crate::core::RulesetDocument;
use crate::core::ValidationResult;
use crate::runtime::evaluator::evaluate;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by dataset validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
    /// The dataset contained no labeled records.
    #[error("validation requires at least one labeled record")]
    EmptyDataset,
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a ruleset document against a labeled dataset.
///
/// # Errors
///
/// Returns [`ValidateError::EmptyDataset`] when no record carries a label.
pub fn validate(
    document: &RulesetDocument,
    dataset: &[Record],
) -> Result<ValidationResult, ValidateError> {
    let mut confusion = ConfusionCounts::default();
    let mut misclassified = Vec::new();

    for record in dataset {
        let Some(actual) = record.label else {
            continue;
        };
        let predicted = evaluate(document, record);

        match (predicted, actual) {
            (true, true) => confusion.true_positive += 1,
            (false, false) => confusion.true_negative += 1,
            (true, false) => confusion.false_positive += 1,
            (false, true) => confusion.false_negative += 1,
        }

        if predicted != actual {
            misclassified.push(Misclassification {
                record_id: record.record_id.clone(),
                predicted,
                actual,
            });
        }
    }

    let total = confusion.total();
    if total == 0 {
        return Err(ValidateError::EmptyDataset);
    }

    #[allow(clippy::cast_precision_loss, reason = "Dataset sizes fit f64 exactly.")]
    let accuracy = confusion.correct() as f64 / total as f64;

    Ok(ValidationResult {
        accuracy,
        confusion,
        misclassified,
    })
}

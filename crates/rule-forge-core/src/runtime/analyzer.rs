// crates/rule-forge-core/src/runtime/analyzer.rs
// ============================================================================
// Module: Rule Forge Misclassification Analyzer
// Description: Partition failures and surface field-level frequency deltas.
// Purpose: Build structured evidence for refinement oracles.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The analyzer partitions misclassified records into false approves and
//! false declines, then compares per-field value frequencies against the
//! correctly classified records on the same side of the decision boundary:
//! false approves against true negatives, false declines against true
//! positives. The oracle sees both sides of each boundary, expressed as
//! frequency deltas so the evidence is independent of dataset size. Records
//! whose outcome hinges on a single top-level rule are flagged as
//! near-boundary cases. The analyzer is a pure function of its inputs and
//! never consults an oracle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::AnalysisSummary;
use crate::core::AnalyzerConfig;
use crate::core::FieldDivergence;
use crate::core::FieldPath;
use crate::core::FieldValue;
use crate::core::GroupLogic;
use crate::core::PartitionSummary;
use crate::core::Record;
use crate::core::RecordId;
use crate::core::RulesetDocument;
use crate::core::ValidationResult;
use crate::core::ValueDelta;
use crate::runtime::evaluator::evaluate_node;

// ============================================================================
// SECTION: Analysis
// ============================================================================

/// Analyzes a validation snapshot into partitioned failure evidence.
#[must_use]
pub fn analyze(
    document: &RulesetDocument,
    dataset: &[Record],
    result: &ValidationResult,
    config: &AnalyzerConfig,
) -> AnalysisSummary {
    let wrong: BTreeSet<&RecordId> =
        result.misclassified.iter().map(|entry| &entry.record_id).collect();

    let mut false_approves = Vec::new();
    let mut false_declines = Vec::new();
    let mut true_positives = Vec::new();
    let mut true_negatives = Vec::new();

    for record in dataset {
        let Some(actual) = record.label else {
            continue;
        };
        match (wrong.contains(&record.record_id), actual) {
            // Predicted approve, actually declined.
            (true, false) => false_approves.push(record),
            // Predicted decline, actually approved.
            (true, true) => false_declines.push(record),
            (false, true) => true_positives.push(record),
            (false, false) => true_negatives.push(record),
        }
    }

    AnalysisSummary {
        false_approves: summarize_partition(&false_approves, &true_negatives, config),
        false_declines: summarize_partition(&false_declines, &true_positives, config),
        near_boundary: near_boundary(document, dataset),
    }
}

/// Flags labeled records whose outcome hinges on a single top-level rule.
///
/// Under `any` (or `none`) logic a record satisfying exactly one rule flips
/// when that rule changes; under `all` logic a record failing exactly one
/// rule does. Documents with no rules have no boundary to sit near.
fn near_boundary(document: &RulesetDocument, dataset: &[Record]) -> Vec<RecordId> {
    if document.rules.is_empty() {
        return Vec::new();
    }

    let mut flagged = Vec::new();
    for record in dataset {
        if record.label.is_none() {
            continue;
        }
        let passes =
            document.rules.iter().filter(|rule| evaluate_node(rule, record)).count();
        let pivotal = match document.logic {
            GroupLogic::Any | GroupLogic::None => passes == 1,
            GroupLogic::All => document.rules.len() - passes == 1,
        };
        if pivotal {
            flagged.push(record.record_id.clone());
        }
    }
    flagged
}

// ============================================================================
// SECTION: Partition Summaries
// ============================================================================

/// Summarizes one misclassification partition against its correct-side peers.
fn summarize_partition(
    group: &[&Record],
    correct: &[&Record],
    config: &AnalyzerConfig,
) -> PartitionSummary {
    let mut fields: BTreeSet<FieldPath> = BTreeSet::new();
    for record in group.iter().chain(correct) {
        for field in record.fields.keys() {
            if config.includes(field) {
                fields.insert(field.clone());
            }
        }
    }

    let divergences = fields
        .into_iter()
        .filter_map(|field| {
            let values = value_deltas(&field, group, correct);
            if values.is_empty() {
                None
            } else {
                Some(FieldDivergence {
                    field,
                    values,
                })
            }
        })
        .collect();

    PartitionSummary {
        record_ids: group.iter().map(|record| record.record_id.clone()).collect(),
        group_size: group.len(),
        correct_size: correct.len(),
        fields: divergences,
    }
}

/// Computes frequency-delta rows for one field across a boundary.
fn value_deltas(field: &FieldPath, group: &[&Record], correct: &[&Record]) -> Vec<ValueDelta> {
    let mut rows: Vec<(FieldValue, usize, usize)> = Vec::new();

    tally(field, group, &mut rows, CountSlot::Misclassified);
    tally(field, correct, &mut rows, CountSlot::Correct);

    let mut deltas: Vec<ValueDelta> = rows
        .into_iter()
        .map(|(value, group_count, correct_count)| {
            let misclassified_frequency = frequency(group_count, group.len());
            let correct_frequency = frequency(correct_count, correct.len());
            ValueDelta {
                value,
                misclassified_frequency,
                correct_frequency,
                delta: misclassified_frequency - correct_frequency,
            }
        })
        .collect();

    deltas.sort_by(|lhs, rhs| {
        rhs.delta
            .abs()
            .partial_cmp(&lhs.delta.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| value_text(&lhs.value).cmp(&value_text(&rhs.value)))
    });
    deltas
}

/// Count column selected while tallying one side of a boundary.
#[derive(Clone, Copy)]
enum CountSlot {
    /// Count toward the misclassified group.
    Misclassified,
    /// Count toward the correctly classified group.
    Correct,
}

/// Accumulates value counts for one field over a record group.
fn tally(
    field: &FieldPath,
    records: &[&Record],
    rows: &mut Vec<(FieldValue, usize, usize)>,
    slot: CountSlot,
) {
    for record in records {
        let Some(value) = record.resolve(field) else {
            continue;
        };
        let existing = rows.iter().position(|(seen, _, _)| seen == value);
        let index = match existing {
            Some(index) => index,
            None => {
                rows.push((value.clone(), 0, 0));
                rows.len() - 1
            }
        };
        if let Some(row) = rows.get_mut(index) {
            match slot {
                CountSlot::Misclassified => row.1 += 1,
                CountSlot::Correct => row.2 += 1,
            }
        }
    }
}

/// Returns a count as a fraction of group size (zero for empty groups).
#[allow(clippy::cast_precision_loss, reason = "Dataset sizes fit f64 exactly.")]
fn frequency(count: usize, size: usize) -> f64 {
    if size == 0 {
        return 0.0;
    }
    count as f64 / size as f64
}

/// Renders a field value as deterministic sort text.
fn value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Flag(flag) => flag.to_string(),
        FieldValue::Number(number) => number.to_string(),
        FieldValue::Text(text) => text.clone(),
    }
}

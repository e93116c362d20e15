// crates/rule-forge-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Rule Forge Evaluator
// Description: Pure boolean evaluation of rule trees over flattened records.
// Purpose: Convert field values into deterministic classification outcomes.
// Dependencies: crate::core::{record, ruleset}
// ============================================================================

//! ## Overview
//! Evaluation is pure and total: every `(document, record)` pair yields a
//! boolean, with no side effects and no panics. Missing fields and type
//! mismatches fail closed: a record cannot satisfy a condition on data it
//! lacks. Group children are evaluated left to right, but ordering is
//! unobservable because leaves are side-effect-free.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::record::FieldValue;
use crate::core::record::Record;
use crate::core::ruleset::ConditionKind;
use crate::core::ruleset::GroupLogic;
use crate::core::ruleset::LeafRule;
use crate::core::ruleset::RuleNode;
use crate::core::ruleset::RulesetDocument;

// ============================================================================
// SECTION: Document Evaluation
// ============================================================================

/// Evaluates a ruleset document against one record.
#[must_use]
pub fn evaluate(document: &RulesetDocument, record: &Record) -> bool {
    evaluate_group(document.logic, document.rules.iter(), record)
}

/// Evaluates one rule node against a record.
#[must_use]
pub fn evaluate_node(node: &RuleNode, record: &Record) -> bool {
    match node {
        RuleNode::Group {
            logic,
            rules,
        } => evaluate_group(*logic, rules.iter().map(|rule| rule.as_ref()), record),
        RuleNode::Leaf(leaf) => evaluate_leaf(leaf, record),
    }
}

/// Applies a group combinator over child nodes.
///
/// Empty children follow the boolean identities: `all` is trivially true,
/// `any` is trivially false, `none` is trivially true.
fn evaluate_group<'tree>(
    logic: GroupLogic,
    mut rules: impl Iterator<Item = &'tree RuleNode>,
    record: &Record,
) -> bool {
    match logic {
        GroupLogic::All => rules.all(|rule| evaluate_node(rule, record)),
        GroupLogic::Any => rules.any(|rule| evaluate_node(rule, record)),
        GroupLogic::None => !rules.any(|rule| evaluate_node(rule, record)),
    }
}

// ============================================================================
// SECTION: Leaf Evaluation
// ============================================================================

/// Evaluates a leaf condition against a record, failing closed on missing or
/// mismatched data.
fn evaluate_leaf(leaf: &LeafRule, record: &Record) -> bool {
    let Some(value) = record.resolve(&leaf.field) else {
        return false;
    };

    match leaf.condition {
        ConditionKind::Equals => leaf.threshold.as_ref().is_some_and(|operand| value == operand),
        ConditionKind::NotEquals => {
            leaf.threshold.as_ref().is_some_and(|operand| value != operand)
        }
        ConditionKind::In => {
            leaf.values.as_ref().is_some_and(|operands| operands.contains(value))
        }
        ConditionKind::NotIn => {
            leaf.values.as_ref().is_some_and(|operands| !operands.contains(value))
        }
        ConditionKind::GreaterThan => {
            compare_numeric(value, leaf.threshold.as_ref(), |lhs, rhs| lhs > rhs)
        }
        ConditionKind::LessThan => {
            compare_numeric(value, leaf.threshold.as_ref(), |lhs, rhs| lhs < rhs)
        }
        ConditionKind::Between => evaluate_between(value, leaf.low, leaf.high),
    }
}

/// Applies a strict numeric comparison, failing closed on non-numeric sides.
fn compare_numeric(
    value: &FieldValue,
    operand: Option<&FieldValue>,
    ordering: impl Fn(f64, f64) -> bool,
) -> bool {
    let Some(lhs) = value.as_number() else {
        return false;
    };
    let Some(rhs) = operand.and_then(FieldValue::as_number) else {
        return false;
    };
    ordering(lhs, rhs)
}

/// Applies an inclusive numeric range check, failing closed on non-numeric data.
fn evaluate_between(value: &FieldValue, low: Option<f64>, high: Option<f64>) -> bool {
    let Some(number) = value.as_number() else {
        return false;
    };
    let (Some(low), Some(high)) = (low, high) else {
        return false;
    };
    low <= number && number <= high
}

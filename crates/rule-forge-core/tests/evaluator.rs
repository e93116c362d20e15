// crates/rule-forge-core/tests/evaluator.rs
// ============================================================================
// Module: Evaluator Tests
// Description: Tests for pure rule-tree evaluation over flattened records.
// ============================================================================

//! ## Overview
//! Validates deterministic, fail-closed evaluation of groups and leaves.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Tests use unwrap on deterministic fixtures."
)]

use rule_forge_core::core::FieldValue;
use rule_forge_core::core::GroupLogic;
use rule_forge_core::core::Record;
use rule_forge_core::core::RecordId;
use rule_forge_core::core::RuleNode;
use rule_forge_core::core::RulesetDocument;
use rule_forge_core::runtime::evaluate;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds a labeled credit-application record from nested JSON.
fn application(credit_score: i64, income_tier: &str, debt_tier: &str) -> Record {
    Record::from_json(
        RecordId::new("app-1"),
        &json!({
            "creditHistory": { "creditScore": credit_score },
            "financialInformation": { "incomeTier": income_tier, "debtTier": debt_tier },
        }),
        None,
    )
}

// ============================================================================
// SECTION: Group Identities
// ============================================================================

#[test]
fn test_empty_all_group_is_true() {
    let document = RulesetDocument::new(GroupLogic::All, Vec::new());
    let record = application(700, "High", "Low");
    assert!(evaluate(&document, &record));
}

#[test]
fn test_empty_any_group_is_false() {
    let document = RulesetDocument::new(GroupLogic::Any, Vec::new());
    let record = application(700, "High", "Low");
    assert!(!evaluate(&document, &record));
}

#[test]
fn test_empty_none_group_is_true() {
    let document = RulesetDocument::new(GroupLogic::None, Vec::new());
    let record = application(700, "High", "Low");
    assert!(evaluate(&document, &record));
}

#[test]
fn test_none_group_inverts_any_child_success() {
    let document = RulesetDocument::new(GroupLogic::None, vec![RuleNode::equals(
        "financialInformation.debtTier",
        "Low",
    )]);
    assert!(!evaluate(&document, &application(700, "High", "Low")));
    assert!(evaluate(&document, &application(700, "High", "High")));
}

// ============================================================================
// SECTION: Fail-Closed Leaves
// ============================================================================

#[test]
fn test_absent_field_fails_closed_for_every_condition() {
    let record = application(700, "High", "Low");
    let leaves = vec![
        RuleNode::equals("missing.path", "x"),
        RuleNode::not_equals("missing.path", "x"),
        RuleNode::in_set("missing.path", vec![FieldValue::from("x")]),
        RuleNode::not_in_set("missing.path", vec![FieldValue::from("x")]),
        RuleNode::greater_than("missing.path", 1.0),
        RuleNode::less_than("missing.path", 1.0),
        RuleNode::between("missing.path", 0.0, 1.0),
    ];
    for leaf in leaves {
        let document = RulesetDocument::new(GroupLogic::Any, vec![leaf]);
        assert!(!evaluate(&document, &record), "absent field must fail closed");
    }
}

#[test]
fn test_numeric_compare_on_text_value_fails_closed() {
    let document = RulesetDocument::new(GroupLogic::Any, vec![RuleNode::greater_than(
        "financialInformation.incomeTier",
        100.0,
    )]);
    assert!(!evaluate(&document, &application(700, "High", "Low")));
}

#[test]
fn test_cross_type_equality_is_unequal() {
    // incomeTier is text; a numeric operand is simply not equal.
    let equals = RulesetDocument::new(GroupLogic::Any, vec![RuleNode::equals(
        "financialInformation.incomeTier",
        7.0,
    )]);
    let not_equals = RulesetDocument::new(GroupLogic::Any, vec![RuleNode::not_equals(
        "financialInformation.incomeTier",
        7.0,
    )]);
    let record = application(700, "High", "Low");
    assert!(!evaluate(&equals, &record));
    assert!(evaluate(&not_equals, &record));
}

// ============================================================================
// SECTION: Scenario Coverage
// ============================================================================

#[test]
fn test_credit_score_threshold_scenario() {
    let document: RulesetDocument = serde_json::from_value(json!({
        "logic": "any",
        "rules": [
            { "field": "creditHistory.creditScore", "condition": "greater_than", "threshold": 700 }
        ]
    }))
    .unwrap();

    assert!(evaluate(&document, &application(750, "High", "Low")));
    assert!(!evaluate(&document, &application(600, "High", "Low")));
}

#[test]
fn test_income_and_debt_conjunction_scenario() {
    let document: RulesetDocument = serde_json::from_value(json!({
        "logic": "all",
        "rules": [
            {
                "field": "financialInformation.incomeTier",
                "condition": "in",
                "values": ["High", "Very High"]
            },
            { "field": "financialInformation.debtTier", "condition": "equals", "threshold": "Low" }
        ]
    }))
    .unwrap();

    assert!(evaluate(&document, &application(700, "High", "Low")));
    assert!(!evaluate(&document, &application(700, "High", "High")));
    assert!(!evaluate(&document, &application(700, "Low", "Low")));
}

#[test]
fn test_between_bounds_are_inclusive() {
    let document = RulesetDocument::new(GroupLogic::All, vec![RuleNode::between(
        "creditHistory.creditScore",
        600.0,
        700.0,
    )]);
    assert!(evaluate(&document, &application(600, "High", "Low")));
    assert!(evaluate(&document, &application(700, "High", "Low")));
    assert!(evaluate(&document, &application(650, "High", "Low")));
    assert!(!evaluate(&document, &application(599, "High", "Low")));
    assert!(!evaluate(&document, &application(701, "High", "Low")));
}

#[test]
fn test_nested_groups_compose() {
    // Approve when credit is strong, or when income is high with low debt.
    let document = RulesetDocument::new(GroupLogic::Any, vec![
        RuleNode::greater_than("creditHistory.creditScore", 740.0),
        RuleNode::group(GroupLogic::All, vec![
            RuleNode::in_set("financialInformation.incomeTier", vec![
                FieldValue::from("High"),
                FieldValue::from("Very High"),
            ]),
            RuleNode::equals("financialInformation.debtTier", "Low"),
        ]),
    ]);

    assert!(evaluate(&document, &application(750, "Low", "High")));
    assert!(evaluate(&document, &application(600, "High", "Low")));
    assert!(!evaluate(&document, &application(600, "High", "High")));
}

#[test]
fn test_case_sensitive_text_equality() {
    let document = RulesetDocument::new(GroupLogic::All, vec![RuleNode::equals(
        "financialInformation.debtTier",
        "low",
    )]);
    assert!(!evaluate(&document, &application(700, "High", "Low")));
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

#[test]
fn test_repeated_evaluation_is_identical() {
    let document = RulesetDocument::new(GroupLogic::Any, vec![
        RuleNode::greater_than("creditHistory.creditScore", 700.0),
        RuleNode::not_in_set("financialInformation.debtTier", vec![FieldValue::from("High")]),
    ]);
    let record = application(720, "Medium", "Low");

    let first = evaluate(&document, &record);
    for _ in 0 .. 50 {
        assert_eq!(evaluate(&document, &record), first);
    }
}

// crates/rule-forge-oracle/tests/scripted.rs
// ============================================================================
// Module: Scripted Oracle Tests
// Description: Tests for scripted oracles and built-in experts.
// ============================================================================

//! ## Overview
//! Validates scripted proposal sequencing, exhaustion behaviors, one-shot
//! expertise recommendations, and the built-in experts.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Tests use unwrap and exact float comparison on deterministic fixtures."
)]

use std::collections::BTreeMap;

use rule_forge_core::core::AnalysisSummary;
use rule_forge_core::core::ConfusionCounts;
use rule_forge_core::core::ExpertiseTag;
use rule_forge_core::core::FieldDivergence;
use rule_forge_core::core::FieldPath;
use rule_forge_core::core::FieldValue;
use rule_forge_core::core::GroupLogic;
use rule_forge_core::core::Insight;
use rule_forge_core::core::PartitionSummary;
use rule_forge_core::core::RecordId;
use rule_forge_core::core::RuleNode;
use rule_forge_core::core::RulesetDocument;
use rule_forge_core::core::ValidationResult;
use rule_forge_core::core::ValueDelta;
use rule_forge_core::interfaces::ConsultationContext;
use rule_forge_core::interfaces::Expert;
use rule_forge_core::interfaces::ExpertiseOracle;
use rule_forge_core::interfaces::Proposal;
use rule_forge_core::interfaces::RefinementContext;
use rule_forge_core::interfaces::RefinementOracle;
use rule_forge_oracle::DivergenceExpert;
use rule_forge_oracle::ExhaustedBehavior;
use rule_forge_oracle::ScriptedExpertiseOracle;
use rule_forge_oracle::ScriptedRefinementOracle;
use rule_forge_oracle::StaticExpert;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds an empty analysis summary.
fn empty_analysis() -> AnalysisSummary {
    let empty_partition = PartitionSummary {
        record_ids: Vec::new(),
        group_size: 0,
        correct_size: 0,
        fields: Vec::new(),
    };
    AnalysisSummary {
        false_approves: empty_partition.clone(),
        false_declines: empty_partition,
        near_boundary: Vec::new(),
    }
}

/// Builds a consultation context around the given analysis.
fn consultation(analysis: AnalysisSummary) -> ConsultationContext {
    ConsultationContext {
        iteration: 1,
        ruleset: RulesetDocument::new(GroupLogic::Any, Vec::new()),
        validation: ValidationResult {
            accuracy: 0.75,
            confusion: ConfusionCounts::default(),
            misclassified: Vec::new(),
        },
        analysis,
    }
}

/// Builds a refinement context with no insights.
fn refinement() -> RefinementContext {
    let consultation = consultation(empty_analysis());
    RefinementContext {
        iteration: consultation.iteration,
        ruleset: consultation.ruleset,
        validation: consultation.validation,
        analysis: consultation.analysis,
        insights: BTreeMap::new(),
    }
}

/// Candidate proposal wrapping a score gate at the given threshold.
fn candidate(threshold: f64) -> Proposal {
    Proposal::Candidate {
        ruleset: RulesetDocument::new(GroupLogic::Any, vec![RuleNode::greater_than(
            "creditHistory.creditScore",
            threshold,
        )]),
    }
}

// ============================================================================
// SECTION: Scripted Refinement
// ============================================================================

#[test]
fn test_script_is_served_in_order() {
    let oracle = ScriptedRefinementOracle::new(
        vec![candidate(700.0), candidate(650.0)],
        ExhaustedBehavior::Refuse,
    );

    assert_eq!(oracle.propose(&refinement()).unwrap(), candidate(700.0));
    assert_eq!(oracle.propose(&refinement()).unwrap(), candidate(650.0));
    assert!(matches!(
        oracle.propose(&refinement()).unwrap(),
        Proposal::Refusal { reason } if reason.contains("exhausted")
    ));
}

#[test]
fn test_exhausted_script_can_repeat_the_last_entry() {
    let oracle =
        ScriptedRefinementOracle::new(vec![candidate(700.0)], ExhaustedBehavior::RepeatLast);

    assert_eq!(oracle.propose(&refinement()).unwrap(), candidate(700.0));
    assert_eq!(oracle.propose(&refinement()).unwrap(), candidate(700.0));
    assert_eq!(oracle.propose(&refinement()).unwrap(), candidate(700.0));
}

#[test]
fn test_empty_script_refuses() {
    let oracle = ScriptedRefinementOracle::new(Vec::new(), ExhaustedBehavior::RepeatLast);
    assert!(matches!(oracle.propose(&refinement()).unwrap(), Proposal::Refusal { .. }));
}

#[test]
fn test_script_parses_from_json() {
    let script = br#"[
        { "kind": "candidate", "ruleset": { "logic": "any", "rules": [
            { "field": "creditHistory.creditScore", "condition": "greater_than", "threshold": 700 }
        ] } },
        { "kind": "refusal", "reason": "no further ideas" }
    ]"#;
    let oracle =
        ScriptedRefinementOracle::from_json_slice(script, ExhaustedBehavior::Refuse).unwrap();

    assert!(matches!(oracle.propose(&refinement()).unwrap(), Proposal::Candidate { .. }));
    assert!(matches!(
        oracle.propose(&refinement()).unwrap(),
        Proposal::Refusal { reason } if reason == "no further ideas"
    ));
}

#[test]
fn test_malformed_script_is_rejected() {
    let result =
        ScriptedRefinementOracle::from_json_slice(b"{ not json }", ExhaustedBehavior::Refuse);
    assert!(result.is_err());
}

// ============================================================================
// SECTION: Scripted Expertise
// ============================================================================

#[test]
fn test_recommendations_are_served_once() {
    let tag = ExpertiseTag::new("score_boundary");
    let expert = StaticExpert::new(tag.clone(), Insight {
        suggested_field: None,
        suggested_value: None,
        rationale: "watch the boundary".to_string(),
    });
    let oracle = ScriptedExpertiseOracle::new(vec![expert.recommendation()]);

    let first = oracle.recommend(&consultation(empty_analysis())).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].tag, tag);

    let second = oracle.recommend(&consultation(empty_analysis())).unwrap();
    assert!(second.is_empty());
}

// ============================================================================
// SECTION: Built-in Experts
// ============================================================================

#[test]
fn test_static_expert_serves_its_insight() {
    let tag = ExpertiseTag::new("fixed");
    let expert = StaticExpert::new(tag.clone(), Insight {
        suggested_field: Some(FieldPath::new("financialInformation.debtTier")),
        suggested_value: Some(FieldValue::from("High")),
        rationale: "debt dominates".to_string(),
    });

    assert_eq!(expert.expertise(), &tag);
    let insight = expert.consult(&consultation(empty_analysis())).unwrap();
    assert_eq!(insight.rationale, "debt dominates");
}

#[test]
fn test_divergence_expert_surfaces_the_strongest_delta() {
    let field = FieldPath::new("financialInformation.incomeTier");
    let mut analysis = empty_analysis();
    analysis.false_declines = PartitionSummary {
        record_ids: vec![RecordId::new("fd-1")],
        group_size: 2,
        correct_size: 2,
        fields: vec![FieldDivergence {
            field: field.clone(),
            values: vec![
                ValueDelta {
                    value: FieldValue::from("High"),
                    misclassified_frequency: 1.0,
                    correct_frequency: 0.25,
                    delta: 0.75,
                },
                ValueDelta {
                    value: FieldValue::from("Low"),
                    misclassified_frequency: 0.0,
                    correct_frequency: 0.5,
                    delta: -0.5,
                },
            ],
        }],
    };

    let expert = DivergenceExpert::new(ExpertiseTag::new("income"), field.clone());
    let insight = expert.consult(&consultation(analysis)).unwrap();

    assert_eq!(insight.suggested_field, Some(field));
    assert_eq!(insight.suggested_value, Some(FieldValue::from("High")));
    assert!(insight.rationale.contains("false declines"));
}

#[test]
fn test_divergence_expert_fails_for_unknown_field() {
    let expert =
        DivergenceExpert::new(ExpertiseTag::new("ghost"), FieldPath::new("not.a.field"));
    let result = expert.consult(&consultation(empty_analysis()));
    assert!(result.is_err());
}

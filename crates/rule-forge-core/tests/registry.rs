// crates/rule-forge-core/tests/registry.rs
// ============================================================================
// Module: Expert Registry Tests
// Description: Tests for registration and isolated concurrent consultation.
// ============================================================================

//! ## Overview
//! Validates duplicate rejection, partial-failure isolation, and deadline
//! behavior for expert consultation.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Tests use unwrap on deterministic fixtures."
)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rule_forge_core::core::AnalysisSummary;
use rule_forge_core::core::ExpertiseTag;
use rule_forge_core::core::GroupLogic;
use rule_forge_core::core::Insight;
use rule_forge_core::core::PartitionSummary;
use rule_forge_core::core::RulesetDocument;
use rule_forge_core::core::ValidationResult;
use rule_forge_core::interfaces::ConsultationContext;
use rule_forge_core::interfaces::Expert;
use rule_forge_core::interfaces::ExpertError;
use rule_forge_core::runtime::ExpertRegistry;
use rule_forge_core::runtime::RegistryError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds an empty consultation context.
fn context() -> ConsultationContext {
    let empty_partition = PartitionSummary {
        record_ids: Vec::new(),
        group_size: 0,
        correct_size: 0,
        fields: Vec::new(),
    };
    ConsultationContext {
        iteration: 0,
        ruleset: RulesetDocument::new(GroupLogic::Any, Vec::new()),
        validation: ValidationResult {
            accuracy: 0.5,
            confusion: rule_forge_core::core::ConfusionCounts {
                true_positive: 1,
                true_negative: 1,
                false_positive: 1,
                false_negative: 1,
            },
            misclassified: Vec::new(),
        },
        analysis: AnalysisSummary {
            false_approves: empty_partition.clone(),
            false_declines: empty_partition,
            near_boundary: Vec::new(),
        },
    }
}

/// Expert answering with a fixed rationale.
struct EchoExpert {
    /// Registered tag.
    tag: ExpertiseTag,
    /// Rationale served on every consultation.
    rationale: String,
}

impl Expert for EchoExpert {
    fn expertise(&self) -> &ExpertiseTag {
        &self.tag
    }

    fn consult(&self, _context: &ConsultationContext) -> Result<Insight, ExpertError> {
        Ok(Insight {
            suggested_field: None,
            suggested_value: None,
            rationale: self.rationale.clone(),
        })
    }
}

/// Expert that always fails.
struct FailingExpert {
    /// Registered tag.
    tag: ExpertiseTag,
}

impl Expert for FailingExpert {
    fn expertise(&self) -> &ExpertiseTag {
        &self.tag
    }

    fn consult(&self, _context: &ConsultationContext) -> Result<Insight, ExpertError> {
        Err(ExpertError::Consultation("no signal in this partition".to_string()))
    }
}

/// Expert that sleeps past any reasonable test deadline.
struct StallingExpert {
    /// Registered tag.
    tag: ExpertiseTag,
}

impl Expert for StallingExpert {
    fn expertise(&self) -> &ExpertiseTag {
        &self.tag
    }

    fn consult(&self, _context: &ConsultationContext) -> Result<Insight, ExpertError> {
        thread::sleep(Duration::from_secs(5));
        Ok(Insight {
            suggested_field: None,
            suggested_value: None,
            rationale: "too late".to_string(),
        })
    }
}

/// Registers an echo expert under the given tag.
fn register_echo(registry: &mut ExpertRegistry, tag: &str) {
    let tag = ExpertiseTag::new(tag);
    registry
        .register(tag.clone(), Arc::new(EchoExpert {
            tag,
            rationale: "steady".to_string(),
        }))
        .unwrap();
}

// ============================================================================
// SECTION: Registration
// ============================================================================

#[test]
fn test_registration_is_append_only() {
    let mut registry = ExpertRegistry::new();
    register_echo(&mut registry, "debt_to_income");
    register_echo(&mut registry, "payment_history");

    assert_eq!(registry.len(), 2);
    assert!(registry.get(&ExpertiseTag::new("debt_to_income")).is_some());
    let tags: Vec<String> =
        registry.tags().into_iter().map(|tag| tag.as_str().to_string()).collect();
    assert_eq!(tags, vec!["debt_to_income".to_string(), "payment_history".to_string()]);
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let mut registry = ExpertRegistry::new();
    register_echo(&mut registry, "debt_to_income");

    let tag = ExpertiseTag::new("debt_to_income");
    let error = registry
        .register(tag.clone(), Arc::new(EchoExpert {
            tag: tag.clone(),
            rationale: "usurper".to_string(),
        }))
        .unwrap_err();
    assert_eq!(error, RegistryError::DuplicateExpertise(tag));

    // The original registration survives.
    assert_eq!(registry.len(), 1);
    let outcome = registry.consult(
        &[ExpertiseTag::new("debt_to_income")],
        &context(),
        Duration::from_secs(1),
    );
    assert_eq!(outcome.insights[&ExpertiseTag::new("debt_to_income")].rationale, "steady");
}

// ============================================================================
// SECTION: Consultation
// ============================================================================

#[test]
fn test_consultation_collects_all_insights() {
    let mut registry = ExpertRegistry::new();
    register_echo(&mut registry, "a");
    register_echo(&mut registry, "b");

    let tags: Vec<ExpertiseTag> = registry.tags().into_iter().collect();
    let outcome = registry.consult(&tags, &context(), Duration::from_secs(1));

    assert_eq!(outcome.insights.len(), 2);
    assert!(outcome.failures.is_empty());
}

#[test]
fn test_one_failing_expert_never_aborts_the_others() {
    let mut registry = ExpertRegistry::new();
    register_echo(&mut registry, "steady");
    let failing = ExpertiseTag::new("flaky");
    registry
        .register(failing.clone(), Arc::new(FailingExpert {
            tag: failing.clone(),
        }))
        .unwrap();

    let tags: Vec<ExpertiseTag> = registry.tags().into_iter().collect();
    let outcome = registry.consult(&tags, &context(), Duration::from_secs(1));

    assert_eq!(outcome.insights.len(), 1);
    assert!(outcome.insights.contains_key(&ExpertiseTag::new("steady")));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].tag, failing);
    assert!(outcome.failures[0].reason.contains("no signal"));
}

#[test]
fn test_unknown_tag_is_recorded_as_failure() {
    let mut registry = ExpertRegistry::new();
    register_echo(&mut registry, "steady");

    let outcome = registry.consult(
        &[ExpertiseTag::new("steady"), ExpertiseTag::new("ghost")],
        &context(),
        Duration::from_secs(1),
    );

    assert_eq!(outcome.insights.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].tag, ExpertiseTag::new("ghost"));
    assert!(outcome.failures[0].reason.contains("no expert registered"));
}

#[test]
fn test_stalling_expert_times_out_without_blocking_others() {
    let mut registry = ExpertRegistry::new();
    register_echo(&mut registry, "steady");
    let stalling = ExpertiseTag::new("stalling");
    registry
        .register(stalling.clone(), Arc::new(StallingExpert {
            tag: stalling.clone(),
        }))
        .unwrap();

    let tags: Vec<ExpertiseTag> = registry.tags().into_iter().collect();
    let outcome = registry.consult(&tags, &context(), Duration::from_millis(200));

    assert!(outcome.insights.contains_key(&ExpertiseTag::new("steady")));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].tag, stalling);
    assert!(outcome.failures[0].reason.contains("did not complete"));
}

// crates/rule-forge-core/src/core/mod.rs
// ============================================================================
// Module: Rule Forge Core Types
// Description: Canonical record, ruleset, and run-state structures.
// Purpose: Provide stable, serializable types for discovery runs and logs.
// Dependencies: serde, smallvec
// ============================================================================

//! ## Overview
//! Rule Forge core types define records, ruleset documents, validation and
//! analysis snapshots, and run-state logs. These types are the canonical
//! source of truth for any derived surfaces (CLI artifacts or embedding
//! hosts).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod analysis;
pub mod hashing;
pub mod identifiers;
pub mod insight;
pub mod record;
pub mod ruleset;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use analysis::AnalysisSummary;
pub use analysis::AnalyzerConfig;
pub use analysis::FieldDivergence;
pub use analysis::PartitionSummary;
pub use analysis::ValueDelta;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::ExpertiseTag;
pub use identifiers::FieldPath;
pub use identifiers::RecordId;
pub use identifiers::RunId;
pub use insight::ConsultationOutcome;
pub use insight::ExpertFailure;
pub use insight::Insight;
pub use record::FieldValue;
pub use record::Record;
pub use ruleset::ConditionKind;
pub use ruleset::GroupLogic;
pub use ruleset::LeafRule;
pub use ruleset::MalformedRuleError;
pub use ruleset::RuleNode;
pub use ruleset::RulesetDocument;
pub use state::BestRuleset;
pub use state::ConfusionCounts;
pub use state::IterationRecord;
pub use state::Misclassification;
pub use state::ProposalOutcome;
pub use state::RunOutcome;
pub use state::RunReport;
pub use state::RunState;
pub use state::ValidationResult;

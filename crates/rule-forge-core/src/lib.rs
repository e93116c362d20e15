// crates/rule-forge-core/src/lib.rs
// ============================================================================
// Module: Rule Forge Core Library
// Description: Public API surface for the Rule Forge core.
// Purpose: Expose core types, interfaces, and runtime services.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Rule Forge core provides deterministic rule evaluation, dataset
//! validation, misclassification analysis, and the iterative refinement
//! controller for discovering approve/decline rulesets over structured
//! records. Reasoning oracles integrate through explicit interfaces rather
//! than being embedded in the loop.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use crate::interfaces::CancelSignal;
pub use crate::interfaces::ConsultationContext;
pub use crate::interfaces::Expert;
pub use crate::interfaces::ExpertError;
pub use crate::interfaces::ExpertRecommendation;
pub use crate::interfaces::ExpertiseOracle;
pub use crate::interfaces::NeverCancelled;
pub use crate::interfaces::NoopObserver;
pub use crate::interfaces::OracleError;
pub use crate::interfaces::Proposal;
pub use crate::interfaces::RefinementContext;
pub use crate::interfaces::RefinementOracle;
pub use crate::interfaces::RunObserver;
pub use crate::runtime::ControllerConfig;
pub use crate::runtime::ControllerError;
pub use crate::runtime::ExpertRegistry;
pub use crate::runtime::OracleFailurePolicy;
pub use crate::runtime::RefinementController;
pub use crate::runtime::RegistryError;
pub use crate::runtime::ValidateError;
pub use crate::runtime::analyze;
pub use crate::runtime::evaluate;
pub use crate::runtime::evaluate_node;
pub use crate::runtime::validate;

// crates/rule-forge-core/src/runtime/registry.rs
// ============================================================================
// Module: Rule Forge Expert Registry
// Description: Registry of capability-tagged experts with isolated consultation.
// Purpose: Route consultation requests by expertise tag with partial-failure semantics.
// Dependencies: crate::{core, interfaces}, std::thread
// ============================================================================

//! ## Overview
//! The registry holds dynamically declared experts keyed by expertise tag.
//! Registration is append-only for a run; re-registering a tag is rejected so
//! later recommendations cannot mask earlier specialization. Consultation
//! fans experts out concurrently (each is read-only over the shared context
//! and writes only its own insight slot) and blocks until all complete or
//! the deadline passes. One expert's failure never aborts the others.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

use crate::core::ConsultationOutcome;
use crate::core::ExpertFailure;
use crate::core::ExpertiseTag;
use crate::core::Insight;
use crate::interfaces::ConsultationContext;
use crate::interfaces::Expert;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by expert registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The expertise tag is already registered.
    #[error("expertise already registered: {0}")]
    DuplicateExpertise(ExpertiseTag),
}

// ============================================================================
// SECTION: Expert Registry
// ============================================================================

/// Result message sent back from one dispatched expert.
type ExpertReply = (ExpertiseTag, Result<Insight, String>);

/// Registry of experts keyed by expertise tag.
///
/// # Invariants
/// - Tags are unique; registration is append-only within a run.
/// - Consultation never mutates the registry.
#[derive(Default)]
pub struct ExpertRegistry {
    /// Expert implementations keyed by expertise tag.
    experts: BTreeMap<ExpertiseTag, Arc<dyn Expert>>,
}

impl ExpertRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            experts: BTreeMap::new(),
        }
    }

    /// Registers an expert under the given tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateExpertise`] when the tag is taken;
    /// the existing registration is left untouched.
    pub fn register(
        &mut self,
        tag: ExpertiseTag,
        expert: Arc<dyn Expert>,
    ) -> Result<(), RegistryError> {
        if self.experts.contains_key(&tag) {
            return Err(RegistryError::DuplicateExpertise(tag));
        }
        self.experts.insert(tag, expert);
        Ok(())
    }

    /// Returns the expert registered under the tag, if any.
    #[must_use]
    pub fn get(&self, tag: &ExpertiseTag) -> Option<&Arc<dyn Expert>> {
        self.experts.get(tag)
    }

    /// Returns the set of registered tags.
    #[must_use]
    pub fn tags(&self) -> BTreeSet<ExpertiseTag> {
        self.experts.keys().cloned().collect()
    }

    /// Returns the number of registered experts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experts.len()
    }

    /// Returns true when no experts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experts.is_empty()
    }

    /// Consults the named experts concurrently, collecting until the deadline.
    ///
    /// Unknown tags are recorded as failures. An expert past the deadline is
    /// abandoned: its thread is detached and any late reply is discarded.
    #[must_use]
    pub fn consult(
        &self,
        tags: &[ExpertiseTag],
        context: &ConsultationContext,
        timeout: Duration,
    ) -> ConsultationOutcome {
        let (sender, receiver) = mpsc::channel::<ExpertReply>();
        let mut requested: Vec<ExpertiseTag> = Vec::new();
        let mut unknown: Vec<ExpertiseTag> = Vec::new();
        let mut dispatched = 0usize;

        for tag in tags {
            if requested.contains(tag) || unknown.contains(tag) {
                continue;
            }
            let Some(expert) = self.experts.get(tag) else {
                unknown.push(tag.clone());
                continue;
            };
            requested.push(tag.clone());
            dispatched += 1;

            let expert = Arc::clone(expert);
            let context = context.clone();
            let sender = sender.clone();
            let tag = tag.clone();
            thread::spawn(move || {
                let reply = expert.consult(&context).map_err(|err| err.to_string());
                // A send after the collector gave up is expected and harmless.
                let _ = sender.send((tag, reply));
            });
        }
        drop(sender);

        let mut replies: BTreeMap<ExpertiseTag, Result<Insight, String>> = BTreeMap::new();
        let deadline = Instant::now() + timeout;
        while replies.len() < dispatched {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining) {
                Ok((tag, reply)) => {
                    replies.insert(tag, reply);
                }
                Err(mpsc::RecvTimeoutError::Timeout | mpsc::RecvTimeoutError::Disconnected) => {
                    break;
                }
            }
        }

        let mut outcome = ConsultationOutcome::default();
        for tag in unknown {
            outcome.failures.push(ExpertFailure {
                reason: format!("no expert registered for tag: {tag}"),
                tag,
            });
        }
        for tag in requested {
            match replies.remove(&tag) {
                Some(Ok(insight)) => {
                    outcome.insights.insert(tag, insight);
                }
                Some(Err(reason)) => {
                    outcome.failures.push(ExpertFailure {
                        tag,
                        reason,
                    });
                }
                None => {
                    outcome.failures.push(ExpertFailure {
                        tag,
                        reason: format!(
                            "consultation did not complete within {} ms",
                            timeout.as_millis()
                        ),
                    });
                }
            }
        }
        outcome
    }
}

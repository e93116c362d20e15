// crates/rule-forge-oracle/src/guard.rs
// ============================================================================
// Module: Oracle Call Guard
// Description: Timeout and bounded-retry wrapper around oracle invocations.
// Purpose: Keep long-latency, fallible oracle calls from stalling the loop.
// Dependencies: rule-forge-core, std::thread
// ============================================================================

//! ## Overview
//! Every oracle call is a potentially long-latency external invocation. The
//! guard wraps any oracle behind the same trait it implements, enforcing a
//! per-call deadline and retrying transient failures up to a configured
//! bound. Exhaustion surfaces the last error to the controller, which records
//! the iteration as failed. A worker past its deadline is detached and any
//! late result is discarded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rule_forge_core::interfaces::ConsultationContext;
use rule_forge_core::interfaces::ExpertRecommendation;
use rule_forge_core::interfaces::ExpertiseOracle;
use rule_forge_core::interfaces::OracleError;
use rule_forge_core::interfaces::Proposal;
use rule_forge_core::interfaces::RefinementContext;
use rule_forge_core::interfaces::RefinementOracle;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Call Policy
// ============================================================================

/// Deadline and retry bounds applied to each oracle call.
///
/// # Invariants
/// - `max_retries` counts retries, not attempts: a call runs at most
///   `max_retries + 1` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPolicy {
    /// Per-attempt deadline in milliseconds.
    pub timeout_ms: u64,
    /// Maximum automatic retries after a retryable failure.
    pub max_retries: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 2,
        }
    }
}

// ============================================================================
// SECTION: Guarded Oracle
// ============================================================================

/// Oracle wrapper enforcing a call policy on every invocation.
///
/// # Invariants
/// - `Fatal` errors bypass the retry budget.
/// - A timed-out worker thread is abandoned; its late result is discarded.
#[derive(Debug)]
pub struct GuardedOracle<O> {
    /// Wrapped oracle implementation.
    inner: Arc<O>,
    /// Policy applied to each call.
    policy: CallPolicy,
}

impl<O> GuardedOracle<O> {
    /// Wraps an oracle with the given call policy.
    #[must_use]
    pub const fn new(inner: Arc<O>, policy: CallPolicy) -> Self {
        Self {
            inner,
            policy,
        }
    }

    /// Returns the configured call policy.
    #[must_use]
    pub const fn policy(&self) -> CallPolicy {
        self.policy
    }
}

impl<O> RefinementOracle for GuardedOracle<O>
where
    O: RefinementOracle + 'static,
{
    fn propose(&self, context: &RefinementContext) -> Result<Proposal, OracleError> {
        call_with_policy(self.policy, || {
            let inner = Arc::clone(&self.inner);
            let context = context.clone();
            move || inner.propose(&context)
        })
    }
}

impl<O> ExpertiseOracle for GuardedOracle<O>
where
    O: ExpertiseOracle + 'static,
{
    fn recommend(
        &self,
        context: &ConsultationContext,
    ) -> Result<Vec<ExpertRecommendation>, OracleError> {
        call_with_policy(self.policy, || {
            let inner = Arc::clone(&self.inner);
            let context = context.clone();
            move || inner.recommend(&context)
        })
    }
}

// ============================================================================
// SECTION: Call Helpers
// ============================================================================

/// Runs a job factory under the policy's deadline and retry bounds.
fn call_with_policy<T, J>(
    policy: CallPolicy,
    mut make_job: impl FnMut() -> J,
) -> Result<T, OracleError>
where
    T: Send + 'static,
    J: FnOnce() -> Result<T, OracleError> + Send + 'static,
{
    let mut attempt = 0u32;
    loop {
        match run_with_deadline(policy.timeout_ms, make_job()) {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Runs one job on a worker thread, failing with a timeout at the deadline.
fn run_with_deadline<T>(
    timeout_ms: u64,
    job: impl FnOnce() -> Result<T, OracleError> + Send + 'static,
) -> Result<T, OracleError>
where
    T: Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        // A send after the caller gave up is expected and harmless.
        let _ = sender.send(job());
    });

    match receiver.recv_timeout(Duration::from_millis(timeout_ms)) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(OracleError::Timeout {
            timeout_ms,
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(OracleError::Fatal("oracle worker terminated without a result".to_string()))
        }
    }
}

//! Multi-tier fallback resolution engine
//!
//! Each logical operation owns an ordered chain of strategies. The
//! dispatcher walks the chain sequentially: first success wins,
//! classified failures advance to the next tier, and exhaustion ends
//! in either the chain's synthetic payload or an explicit aggregate
//! failure. Chains are plain data interpreted by one dispatcher, so
//! they are table-driven and testable without HTTP.

pub mod classifier;
pub mod normalizer;

use crate::upstream::{RawResult, Transport};
use classifier::Classified;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tunegate_common::{CanonicalEnvelope, FailureKind, TierFailure};

/// Caller-supplied parameters for one logical operation.
pub type QueryParams = HashMap<String, String>;

/// One inbound resolution request.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub params: QueryParams,
    /// Session cookie forwarded verbatim to the upstream when present.
    pub cookie: Option<String>,
}

/// One candidate way to satisfy a logical operation. Stateless and
/// immutable; order within a chain is significant (earlier tiers are
/// the fresher data sources).
#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: &'static str,
    /// Upstream endpoint path, e.g. `/lyric/new`.
    pub endpoint: &'static str,
    /// Per-call timeout budget for this tier.
    pub timeout: Duration,
    /// Maps caller params to the upstream query string.
    pub build_request: fn(&QueryParams) -> Vec<(String, String)>,
    /// Shape-matching normalizer; `None` means the payload matched no
    /// recognized shape for this operation.
    pub normalize: fn(&Value) -> Option<Value>,
}

/// Ordered strategies plus an optional terminal synthetic payload for
/// one logical operation.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    pub operation: &'static str,
    pub strategies: Vec<Strategy>,
    /// When absent, exhaustion surfaces an aggregate failure envelope
    /// rather than invented data.
    pub synthetic: Option<Value>,
}

impl FallbackChain {
    /// Worst-case wall-clock budget: the sum of per-tier timeouts.
    pub fn total_timeout(&self) -> Duration {
        self.strategies.iter().map(|s| s.timeout).sum()
    }
}

/// Result of running one strategy once. Either fully normalized data
/// or a classified failure; raw upstream payloads never escape.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(Value),
    Failure { kind: FailureKind, detail: String },
}

/// Executes fallback chains against a transport.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Resolve one request against `chain`.
    ///
    /// Returns `None` only when `cancel` fires, in which case no
    /// response should be produced at all. Otherwise always returns a
    /// canonical envelope: tier success, synthetic fallback, or an
    /// aggregate failure listing every tier's classified failure.
    pub async fn resolve(
        &self,
        chain: &FallbackChain,
        request: &ResolveRequest,
        cancel: &CancellationToken,
    ) -> Option<CanonicalEnvelope> {
        let deadline = Instant::now() + chain.total_timeout();
        let mut failures = Vec::with_capacity(chain.strategies.len());

        for (tier, strategy) in chain.strategies.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = if remaining.is_zero() {
                // Earlier tiers consumed the whole operation budget.
                AttemptOutcome::Failure {
                    kind: FailureKind::Transport,
                    detail: "operation deadline exceeded before attempt".to_string(),
                }
            } else {
                let budget = strategy.timeout.min(remaining);
                tokio::select! {
                    // A fired token always wins over a ready tier call.
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(
                            operation = chain.operation,
                            tier,
                            "request cancelled, abandoning chain"
                        );
                        return None;
                    }
                    outcome = self.run_strategy(chain.operation, tier, strategy, request, budget) => outcome,
                }
            };

            match outcome {
                AttemptOutcome::Success(data) => {
                    if tier != 0 {
                        info!(
                            operation = chain.operation,
                            tier,
                            strategy = strategy.name,
                            "resolved via degraded tier"
                        );
                    }
                    return Some(CanonicalEnvelope::success(tier, data));
                }
                AttemptOutcome::Failure { kind, detail } => {
                    warn!(
                        operation = chain.operation,
                        tier,
                        strategy = strategy.name,
                        ?kind,
                        detail,
                        "tier failed, advancing"
                    );
                    failures.push(TierFailure {
                        tier,
                        strategy: strategy.name.to_string(),
                        kind,
                        detail,
                    });
                }
            }
        }

        match &chain.synthetic {
            Some(data) => {
                warn!(
                    operation = chain.operation,
                    tiers = chain.strategies.len(),
                    "all tiers failed, serving synthetic payload"
                );
                Some(CanonicalEnvelope::synthetic(data.clone()))
            }
            None => {
                error!(
                    operation = chain.operation,
                    tiers = chain.strategies.len(),
                    "all tiers failed and no synthetic payload is configured"
                );
                Some(CanonicalEnvelope::exhausted(failures))
            }
        }
    }

    /// Run a single tier once: fetch, classify, normalize. No retry at
    /// this level; moving to the next tier is the recovery mechanism.
    async fn run_strategy(
        &self,
        operation: &'static str,
        tier: usize,
        strategy: &Strategy,
        request: &ResolveRequest,
        budget: Duration,
    ) -> AttemptOutcome {
        debug!(operation, tier, strategy = strategy.name, "trying tier");

        let query = (strategy.build_request)(&request.params);
        let fetch = self
            .transport
            .fetch(strategy.endpoint, &query, request.cookie.as_deref(), budget);

        // The transport enforces its own timeout; this outer guard
        // bounds misbehaving transports to the tier budget as well.
        let raw = match tokio::time::timeout(budget, fetch).await {
            Ok(raw) => raw,
            Err(_) => RawResult::TransportFailure(format!(
                "tier call exceeded its {}ms budget",
                budget.as_millis()
            )),
        };

        match classifier::classify(raw) {
            Classified::PassThrough(body) => match (strategy.normalize)(&body) {
                Some(data) => AttemptOutcome::Success(data),
                None => AttemptOutcome::Failure {
                    kind: FailureKind::Malformed,
                    detail: format!("no recognized {operation} shape in payload"),
                },
            },
            Classified::Failure { kind, detail } => AttemptOutcome::Failure { kind, detail },
        }
    }
}

//! Canonical response envelope
//!
//! The only shape the resolution engine ever hands back to a caller,
//! regardless of which upstream tier (or synthetic fallback) produced
//! the data. Route handlers serialize it verbatim; they must not
//! reinterpret `data`.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Which tier of a fallback chain produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierUsed {
    /// Strategy at this index in the chain succeeded.
    Tier(usize),
    /// Every strategy failed; the configured synthetic payload was used.
    Synthetic,
    /// Every strategy failed and no synthetic payload is configured.
    Exhausted,
}

impl Serialize for TierUsed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TierUsed::Tier(index) => serializer.serialize_u64(*index as u64),
            TierUsed::Synthetic => serializer.serialize_str("synthetic"),
            TierUsed::Exhausted => serializer.serialize_str("exhausted"),
        }
    }
}

/// Failure classification for a single tier attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Upstream unreachable: connection failure, timeout, or an HTTP
    /// error status received before any business payload.
    Transport,
    /// Upstream reachable but returned a non-200 embedded status.
    BusinessError,
    /// Upstream reachable but the payload matched no recognized shape.
    Malformed,
}

/// One tier's classified failure, recorded in chain order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierFailure {
    /// Tier index within the chain (0 = most preferred).
    pub tier: usize,
    /// Strategy name, for operator diagnostics.
    pub strategy: String,
    pub kind: FailureKind,
    pub detail: String,
}

/// Canonical envelope returned for every resolved operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEnvelope {
    /// 200 for any resolved response (including synthetic fallback),
    /// 502 when the chain is exhausted with no synthetic payload.
    pub status_code: u16,
    pub data: Value,
    /// True whenever the response did not come from tier 0.
    pub degraded: bool,
    pub tier_used: TierUsed,
    pub message: String,
    /// Per-tier failure summary; only populated on exhaustion.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TierFailure>,
}

impl CanonicalEnvelope {
    /// Successful resolution from the strategy at `tier`.
    pub fn success(tier: usize, data: Value) -> Self {
        Self {
            status_code: 200,
            data,
            degraded: tier != 0,
            tier_used: TierUsed::Tier(tier),
            message: "success".to_string(),
            failures: Vec::new(),
        }
    }

    /// All tiers failed; the chain's fixed synthetic payload is used.
    pub fn synthetic(data: Value) -> Self {
        Self {
            status_code: 200,
            data,
            degraded: true,
            tier_used: TierUsed::Synthetic,
            message: "placeholder data (upstream unavailable)".to_string(),
            failures: Vec::new(),
        }
    }

    /// All tiers failed and no synthetic payload exists. Never
    /// silently empty: carries one failure entry per configured tier.
    pub fn exhausted(failures: Vec<TierFailure>) -> Self {
        Self {
            status_code: 502,
            data: Value::Null,
            degraded: true,
            tier_used: TierUsed::Exhausted,
            message: "all upstream tiers failed".to_string(),
            failures,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

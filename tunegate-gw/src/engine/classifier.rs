//! Envelope-level response classification
//!
//! Operation-agnostic: only the upstream's embedded status convention
//! is inspected here, never operation-specific fields. The upstream
//! reports its business status as a numeric `code` at the top level
//! or nested under `result.code`, depending on the endpoint.

use crate::upstream::RawResult;
use serde_json::Value;
use tunegate_common::FailureKind;

/// Embedded status value treated as a business success candidate.
const UPSTREAM_SUCCESS_CODE: i64 = 200;

/// Outcome of envelope-level classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Business success candidate; payload passes through to the
    /// operation's normalizer.
    PassThrough(Value),
    Failure { kind: FailureKind, detail: String },
}

/// Classify one raw upstream result.
pub fn classify(raw: RawResult) -> Classified {
    let (status, body) = match raw {
        RawResult::TransportFailure(detail) => {
            return Classified::Failure {
                kind: FailureKind::Transport,
                detail,
            }
        }
        RawResult::Raw { status, body } => (status, body),
    };

    // An HTTP error status means the upstream never produced a
    // business payload; equivalent to not reaching it at all.
    if !(200..300).contains(&status) {
        return Classified::Failure {
            kind: FailureKind::Transport,
            detail: format!("upstream HTTP status {status}"),
        };
    }

    if !body.is_object() {
        return Classified::Failure {
            kind: FailureKind::Malformed,
            detail: "payload is not a JSON object".to_string(),
        };
    }

    match embedded_code(&body) {
        Some(UPSTREAM_SUCCESS_CODE) => Classified::PassThrough(body),
        Some(code) => Classified::Failure {
            kind: FailureKind::BusinessError,
            detail: format!("code {code}: {}", embedded_message(&body)),
        },
        None => Classified::Failure {
            kind: FailureKind::BusinessError,
            detail: "code -1: missing status field".to_string(),
        },
    }
}

/// Embedded status code: top-level `code`, or nested `result.code`.
fn embedded_code(body: &Value) -> Option<i64> {
    body.get("code")
        .and_then(Value::as_i64)
        .or_else(|| body.get("result")?.get("code")?.as_i64())
}

fn embedded_message(body: &Value) -> String {
    body.get("message")
        .or_else(|| body.get("msg"))
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string()
}

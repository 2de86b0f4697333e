//! Fallback engine integration tests
//!
//! Exercises the dispatcher state machine against scripted transports:
//! tier ordering, degradation marking, synthetic fallback, aggregate
//! failure, timeout bounding, and cancellation.

mod helpers;

use helpers::FakeTransport;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tunegate_common::{FailureKind, TierUsed};
use tunegate_gw::engine::{Dispatcher, ResolveRequest};
use tunegate_gw::operations::{OperationRegistry, NO_LYRICS_PLACEHOLDER};

const TIER_TIMEOUT: Duration = Duration::from_millis(200);

fn make_dispatcher(transport: FakeTransport) -> (Dispatcher, Arc<FakeTransport>) {
    let transport = Arc::new(transport);
    (Dispatcher::new(transport.clone()), transport)
}

fn registry() -> OperationRegistry {
    OperationRegistry::new(TIER_TIMEOUT)
}

async fn resolve(
    dispatcher: &Dispatcher,
    registry: &OperationRegistry,
    operation: &str,
    request: &ResolveRequest,
) -> tunegate_common::CanonicalEnvelope {
    dispatcher
        .resolve(registry.get(operation).unwrap(), request, &CancellationToken::new())
        .await
        .expect("not cancelled")
}

fn id_request(id: &str) -> ResolveRequest {
    ResolveRequest {
        params: [("id".to_string(), id.to_string())].into(),
        cookie: None,
    }
}

#[tokio::test]
async fn tier_zero_success_is_not_degraded() {
    let (dispatcher, transport) = make_dispatcher(FakeTransport::new().respond(
        "/search/hot/detail",
        200,
        json!({"code": 200, "data": [{"searchWord": "synthwave", "score": 99}]}),
    ));
    let registry = registry();

    let envelope = resolve(&dispatcher, &registry, "hot_search", &Default::default()).await;

    assert_eq!(envelope.status_code, 200);
    assert!(!envelope.degraded);
    assert_eq!(envelope.tier_used, TierUsed::Tier(0));
    assert_eq!(envelope.data[0]["searchWord"], json!("synthwave"));
    // First success short-circuits: the legacy endpoint is never hit.
    assert_eq!(transport.called_endpoints(), vec!["/search/hot/detail"]);
}

#[tokio::test]
async fn business_error_advances_to_next_tier() {
    let (dispatcher, transport) = make_dispatcher(
        FakeTransport::new()
            .respond("/lyric/new", 200, json!({"code": 404, "message": "gone"}))
            .respond(
                "/lyric",
                200,
                json!({"code": 200, "lrc": {"lyric": "[00:01.00] hello"}}),
            ),
    );
    let registry = registry();

    let envelope = resolve(&dispatcher, &registry, "lyric", &id_request("7")).await;

    assert!(envelope.degraded);
    assert_eq!(envelope.tier_used, TierUsed::Tier(1));
    // Data is tier 1's normalized shape, not tier 0's.
    assert_eq!(envelope.data["lrc"]["lyric"], json!("[00:01.00] hello"));
    assert_eq!(envelope.data["tlyric"]["lyric"], json!(""));
    assert_eq!(transport.called_endpoints(), vec!["/lyric/new", "/lyric"]);
}

#[tokio::test]
async fn hot_search_degrades_from_http_503_to_legacy_shape() {
    // Tier 0 answers HTTP 503, tier 1 answers the
    // nested result.hots shape; scores are synthesized by rank.
    let (dispatcher, _) = make_dispatcher(
        FakeTransport::new()
            .respond("/search/hot/detail", 503, json!({"status": 503}))
            .respond(
                "/search/hot",
                200,
                json!({"code": 200, "result": {"hots": [
                    {"first": "A", "second": "x"},
                    {"first": "B", "second": "y"},
                ]}}),
            ),
    );
    let registry = registry();

    let envelope = resolve(&dispatcher, &registry, "hot_search", &Default::default()).await;

    assert!(envelope.degraded);
    assert_eq!(envelope.tier_used, TierUsed::Tier(1));
    assert_eq!(envelope.data[0]["searchWord"], json!("A"));
    assert_eq!(envelope.data[0]["content"], json!("x"));
    assert_eq!(envelope.data[0]["score"], json!(1_000_000));
    assert_eq!(envelope.data[1]["searchWord"], json!("B"));
    assert_eq!(envelope.data[1]["content"], json!("y"));
    assert_eq!(envelope.data[1]["score"], json!(900_000));
}

#[tokio::test]
async fn exhausted_lyric_chain_serves_fixed_placeholder() {
    // Two different failure kinds; the synthetic payload is the same
    // either way.
    let (dispatcher, _) = make_dispatcher(
        FakeTransport::new()
            .fail("/lyric/new", "connection refused")
            .respond("/lyric", 200, json!({"code": 502, "message": "bad gateway"})),
    );
    let registry = registry();

    let envelope = resolve(&dispatcher, &registry, "lyric", &id_request("7")).await;

    assert_eq!(envelope.status_code, 200);
    assert_eq!(envelope.tier_used, TierUsed::Synthetic);
    assert!(envelope.degraded);
    assert_eq!(
        envelope.data,
        json!({"lrc": {"lyric": NO_LYRICS_PLACEHOLDER}, "tlyric": {"lyric": ""}})
    );

    // Same payload with an all-transport failure mix.
    let (dispatcher, _) = make_dispatcher(FakeTransport::new());
    let second = resolve(&dispatcher, &registry, "lyric", &id_request("7")).await;
    assert_eq!(second.data, envelope.data);
    assert_eq!(second.tier_used, TierUsed::Synthetic);
}

#[tokio::test]
async fn exhausted_chain_without_synthetic_reports_every_tier() {
    let (dispatcher, _) = make_dispatcher(
        FakeTransport::new()
            .respond("/song/url/v1", 200, json!({"code": 301, "message": "need login"}))
            .respond("/song/url", 200, json!({"code": 200, "data": "not-a-list"})),
    );
    let registry = registry();

    let envelope = resolve(&dispatcher, &registry, "song_url", &id_request("42")).await;

    assert_eq!(envelope.status_code, 502);
    assert_eq!(envelope.tier_used, TierUsed::Exhausted);
    assert_eq!(envelope.data, serde_json::Value::Null);

    // Exactly one entry per configured tier, in tier order.
    assert_eq!(envelope.failures.len(), 2);
    assert_eq!(envelope.failures[0].tier, 0);
    assert_eq!(envelope.failures[0].kind, FailureKind::BusinessError);
    assert_eq!(envelope.failures[1].tier, 1);
    assert_eq!(envelope.failures[1].kind, FailureKind::Malformed);
}

#[tokio::test]
async fn empty_url_list_is_a_valid_terminal_answer() {
    let (dispatcher, _) = make_dispatcher(FakeTransport::new().respond(
        "/song/url/v1",
        200,
        json!({"code": 200, "data": []}),
    ));
    let registry = registry();

    let envelope = resolve(&dispatcher, &registry, "song_url", &id_request("42")).await;

    assert!(envelope.is_success());
    assert_eq!(envelope.tier_used, TierUsed::Tier(0));
    assert_eq!(envelope.data, json!([]));
}

#[tokio::test(start_paused = true)]
async fn hanging_tiers_are_bounded_by_summed_budgets() {
    let (dispatcher, _) = make_dispatcher(
        FakeTransport::new()
            .hang("/song/url/v1")
            .hang("/song/url"),
    );
    let registry = registry();

    let start = Instant::now();
    let envelope = resolve(&dispatcher, &registry, "song_url", &id_request("42")).await;
    let elapsed = start.elapsed();

    // Each tier's overrun is clamped to its budget; the whole walk
    // never exceeds the chain's summed budgets plus fixed overhead.
    let chain_budget = registry.get("song_url").unwrap().total_timeout();
    assert!(elapsed <= chain_budget + Duration::from_millis(100));

    assert_eq!(envelope.tier_used, TierUsed::Exhausted);
    assert_eq!(envelope.failures.len(), 2);
    assert!(envelope
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::Transport));
}

#[tokio::test]
async fn cancelled_request_produces_no_envelope() {
    let (dispatcher, transport) = make_dispatcher(FakeTransport::new().hang("/lyric/new"));
    let registry = registry();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = dispatcher
        .resolve(registry.get("lyric").unwrap(), &id_request("7"), &cancel)
        .await;

    assert!(result.is_none());
    // The pre-cancelled token aborts before any tier call is issued.
    assert!(transport.recorded_calls().is_empty());
}

#[tokio::test]
async fn cancellation_skips_remaining_tiers_mid_chain() {
    let (dispatcher, transport) = make_dispatcher(FakeTransport::new().hang("/lyric/new"));
    let registry = Arc::new(registry());
    let dispatcher = Arc::new(dispatcher);

    let cancel = CancellationToken::new();
    let task = {
        let dispatcher = dispatcher.clone();
        let registry = registry.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            dispatcher
                .resolve(registry.get("lyric").unwrap(), &id_request("7"), &cancel)
                .await
        })
    };

    // Let tier 0 get in flight, then disconnect.
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    assert!(task.await.unwrap().is_none());
    // Tier 0 was attempted; tier 1 never ran.
    assert_eq!(transport.called_endpoints(), vec!["/lyric/new"]);
}

#[tokio::test]
async fn request_params_and_cookie_are_forwarded_per_tier() {
    let (dispatcher, transport) = make_dispatcher(
        FakeTransport::new()
            .fail("/song/url/v1", "connection refused")
            .respond("/song/url", 200, json!({"code": 200, "data": []})),
    );
    let registry = registry();

    let request = ResolveRequest {
        params: [
            ("id".to_string(), "42".to_string()),
            ("level".to_string(), "lossless".to_string()),
        ]
        .into(),
        cookie: Some("MUSIC_U=abc123".to_string()),
    };
    let envelope = resolve(&dispatcher, &registry, "song_url", &request).await;
    assert_eq!(envelope.tier_used, TierUsed::Tier(1));

    let calls = transport.recorded_calls();
    // Versioned endpoint receives the quality level, the plain one
    // only the track id; both carry the caller's cookie verbatim.
    assert!(calls[0].1.contains(&("level".to_string(), "lossless".to_string())));
    assert!(calls[1].1.contains(&("id".to_string(), "42".to_string())));
    assert!(!calls[1].1.iter().any(|(key, _)| key == "level"));
    assert_eq!(calls[0].2.as_deref(), Some("MUSIC_U=abc123"));
    assert_eq!(calls[1].2.as_deref(), Some("MUSIC_U=abc123"));
}

#[tokio::test]
async fn login_status_falls_back_to_anonymous_profile() {
    let (dispatcher, _) = make_dispatcher(FakeTransport::new());
    let registry = registry();

    let envelope = resolve(&dispatcher, &registry, "login_status", &Default::default()).await;

    assert_eq!(envelope.tier_used, TierUsed::Synthetic);
    assert_eq!(envelope.data, json!({"profile": null}));
}

//! Logical operation registry
//!
//! Every fallback chain the gateway exposes, built once at startup and
//! shared read-only across requests. Adding an upstream endpoint means
//! adding a chain entry here and one route in the API layer.

use crate::engine::{normalizer, FallbackChain, QueryParams, Strategy};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Placeholder lyric served when every lyric tier fails.
pub const NO_LYRICS_PLACEHOLDER: &str = "[00:00.00] no lyrics available";

/// Immutable operation-name → chain table.
pub struct OperationRegistry {
    chains: HashMap<&'static str, FallbackChain>,
}

impl OperationRegistry {
    /// Build every chain with `tier_timeout` as the per-tier budget.
    pub fn new(tier_timeout: Duration) -> Self {
        let strategy = |name, endpoint, build_request, normalize| Strategy {
            name,
            endpoint,
            timeout: tier_timeout,
            build_request,
            normalize,
        };

        let chains = [
            FallbackChain {
                operation: "hot_search",
                strategies: vec![
                    strategy("hot-search-detail", "/search/hot/detail", no_params, normalizer::hot_search),
                    strategy("hot-search-legacy", "/search/hot", no_params, normalizer::hot_search),
                ],
                synthetic: Some(synthetic_hot_search()),
            },
            FallbackChain {
                operation: "lyric",
                strategies: vec![
                    strategy("lyric-new", "/lyric/new", id_only, normalizer::lyric),
                    strategy("lyric-legacy", "/lyric", id_only, normalizer::lyric),
                ],
                synthetic: Some(json!({
                    "lrc": {"lyric": NO_LYRICS_PLACEHOLDER},
                    "tlyric": {"lyric": ""},
                })),
            },
            FallbackChain {
                operation: "song_url",
                strategies: vec![
                    strategy("song-url-v1", "/song/url/v1", id_and_level, normalizer::song_url),
                    strategy("song-url-plain", "/song/url", id_only, normalizer::song_url),
                ],
                // An empty URL list is itself a valid terminal answer;
                // exhaustion surfaces as an aggregate failure instead.
                synthetic: None,
            },
            FallbackChain {
                operation: "login_status",
                strategies: vec![strategy(
                    "login-status",
                    "/login/status",
                    no_params,
                    normalizer::login_status,
                )],
                synthetic: Some(json!({"profile": null})),
            },
            FallbackChain {
                operation: "search",
                strategies: vec![strategy(
                    "cloudsearch",
                    "/cloudsearch",
                    search_params,
                    normalizer::passthrough,
                )],
                synthetic: None,
            },
            FallbackChain {
                operation: "toplist",
                strategies: vec![strategy(
                    "toplist-detail",
                    "/toplist/detail",
                    no_params,
                    normalizer::passthrough,
                )],
                synthetic: None,
            },
        ];

        Self {
            chains: chains.into_iter().map(|c| (c.operation, c)).collect(),
        }
    }

    pub fn get(&self, operation: &str) -> Option<&FallbackChain> {
        self.chains.get(operation)
    }

    pub fn operation_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.chains.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn no_params(_params: &QueryParams) -> Vec<(String, String)> {
    Vec::new()
}

fn id_only(params: &QueryParams) -> Vec<(String, String)> {
    match params.get("id") {
        Some(id) => vec![("id".to_string(), id.clone())],
        None => Vec::new(),
    }
}

fn id_and_level(params: &QueryParams) -> Vec<(String, String)> {
    let mut query = id_only(params);
    let level = params.get("level").map(String::as_str).unwrap_or("standard");
    query.push(("level".to_string(), level.to_string()));
    query
}

fn search_params(params: &QueryParams) -> Vec<(String, String)> {
    let pick = |key: &str, default: &str| {
        params
            .get(key)
            .map(String::as_str)
            .unwrap_or(default)
            .to_string()
    };
    vec![
        ("keywords".to_string(), pick("keywords", "")),
        ("limit".to_string(), pick("limit", "30")),
        ("offset".to_string(), pick("offset", "0")),
        ("type".to_string(), pick("type", "1")),
    ]
}

/// Fixed trending list served when every hot-search tier fails.
/// Deterministic, with strictly descending synthesized scores.
fn synthetic_hot_search() -> Value {
    let terms: [(&str, &str); 10] = [
        ("top hits", "editor picks"),
        ("new releases", "fresh this week"),
        ("indie rock", "trending search"),
        ("lo-fi beats", "focus playlists"),
        ("classic rock", "trending search"),
        ("jazz standards", "trending search"),
        ("movie themes", "soundtracks"),
        ("k-pop", "trending search"),
        ("acoustic covers", "trending search"),
        ("workout mix", "trending search"),
    ];
    Value::Array(
        terms
            .iter()
            .enumerate()
            .map(|(index, (word, content))| {
                json!({
                    "searchWord": word,
                    "content": content,
                    "score": normalizer::synthesized_score(index),
                    "iconType": 1,
                    "iconUrl": null,
                })
            })
            .collect(),
    )
}

//! Upstream catalog client
//!
//! Issues single HTTP requests against the upstream service with a
//! fixed transport identity and a bounded per-call timeout. No retry
//! or fallback logic lives here; classification of whatever comes back
//! is the engine's job.

use futures::future::BoxFuture;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::{Duration, Instant};
use tunegate_common::{Error, Result};

/// Browser identity the upstream expects; requests with a bare client
/// user-agent are rejected by some endpoints.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Result of one upstream call. Never an `Err`: transport problems are
/// data here, so the engine can classify and degrade instead of
/// propagating a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// A response was received. `body` is `Value::Null` when the bytes
    /// were not decodable as JSON; status semantics are left to the
    /// classifier.
    Raw { status: u16, body: Value },
    /// Connection failure or timeout; upstream unreachable.
    TransportFailure(String),
}

/// Transport abstraction the dispatcher runs strategies against.
///
/// Object-safe so chains can be executed against a fake transport in
/// tests without any network.
pub trait Transport: Send + Sync {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        query: &'a [(String, String)],
        cookie: Option<&'a str>,
        timeout: Duration,
    ) -> BoxFuture<'a, RawResult>;
}

/// HTTP client for the upstream catalog service.
pub struct UpstreamClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid upstream base URL {base_url:?}: {e}")))?;

        // The upstream checks Referer/Origin against its own host.
        let origin = format!(
            "{}://{}",
            url.scheme(),
            url.host_str()
                .ok_or_else(|| Error::Config(format!("Upstream URL has no host: {base_url:?}")))?
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(&format!("{origin}/"))
                .map_err(|e| Error::Config(format!("Invalid referer header: {e}")))?,
        );
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_str(&origin)
                .map_err(|e| Error::Config(format!("Invalid origin header: {e}")))?,
        );

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Transport for UpstreamClient {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        query: &'a [(String, String)],
        cookie: Option<&'a str>,
        timeout: Duration,
    ) -> BoxFuture<'a, RawResult> {
        Box::pin(async move {
            let url = format!("{}{}", self.base_url, endpoint);
            let start = Instant::now();

            let mut request = self.http_client.get(&url).query(query).timeout(timeout);
            // Forward caller credentials verbatim when present; never
            // fabricate a session.
            if let Some(cookie) = cookie {
                request = request.header(header::COOKIE, cookie);
            }

            let result = match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match response.bytes().await {
                        Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                            Ok(body) => RawResult::Raw { status, body },
                            Err(_) => RawResult::Raw {
                                status,
                                body: Value::Null,
                            },
                        },
                        Err(e) => RawResult::TransportFailure(e.to_string()),
                    }
                }
                Err(e) => RawResult::TransportFailure(e.to_string()),
            };

            let outcome = match &result {
                RawResult::Raw { status, .. } => format!("http {status}"),
                RawResult::TransportFailure(_) => "transport failure".to_string(),
            };
            tracing::debug!(
                endpoint,
                duration_ms = start.elapsed().as_millis() as u64,
                %outcome,
                "upstream call completed"
            );

            result
        })
    }
}

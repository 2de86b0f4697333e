//! Shared test helpers
//!
//! A scripted in-memory transport so chains can be executed without
//! any network.

#![allow(dead_code)]

use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tunegate_gw::upstream::{RawResult, Transport};

/// One recorded upstream call: endpoint, query pairs, forwarded cookie.
pub type RecordedCall = (String, Vec<(String, String)>, Option<String>);

enum Scripted {
    Respond(RawResult),
    /// Never responds within any realistic tier budget.
    Hang,
}

/// Scripted per-endpoint transport. Endpoints with no script report a
/// transport failure, like an unreachable host.
pub struct FakeTransport {
    scripts: HashMap<&'static str, Scripted>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, endpoint: &'static str, status: u16, body: Value) -> Self {
        self.scripts
            .insert(endpoint, Scripted::Respond(RawResult::Raw { status, body }));
        self
    }

    pub fn fail(mut self, endpoint: &'static str, detail: &str) -> Self {
        self.scripts.insert(
            endpoint,
            Scripted::Respond(RawResult::TransportFailure(detail.to_string())),
        );
        self
    }

    pub fn hang(mut self, endpoint: &'static str) -> Self {
        self.scripts.insert(endpoint, Scripted::Hang);
        self
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_endpoints(&self) -> Vec<String> {
        self.recorded_calls()
            .into_iter()
            .map(|(endpoint, _, _)| endpoint)
            .collect()
    }
}

impl Transport for FakeTransport {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        query: &'a [(String, String)],
        cookie: Option<&'a str>,
        _timeout: Duration,
    ) -> BoxFuture<'a, RawResult> {
        Box::pin(async move {
            self.calls.lock().unwrap().push((
                endpoint.to_string(),
                query.to_vec(),
                cookie.map(String::from),
            ));
            match self.scripts.get(endpoint) {
                Some(Scripted::Respond(raw)) => raw.clone(),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    RawResult::TransportFailure("hang elapsed".to_string())
                }
                None => RawResult::TransportFailure(format!("no route to {endpoint}")),
            }
        })
    }
}

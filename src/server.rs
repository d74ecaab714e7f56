//! Mock server collaborator and an in-process implementation.

use crate::call::Call;
use crate::headers::HeaderMultiMap;
use crate::matcher::{matches_pattern, ObservedRequest};
use crate::stub::{ResponseDefinition, StubMapping};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The mock HTTP server as seen by this crate: stubs go in, readiness comes out.
#[async_trait]
pub trait MockServer: Send + Sync {
    /// Register a stub rule.
    async fn register_stub(&self, stub: StubMapping);

    /// Liveness probe; the error describes why the server is not ready.
    async fn check_ready(&self) -> Result<(), String>;
}

/// A response produced by a stub or an expected call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockResponse {
    pub status: u16,
    pub headers: HeaderMultiMap,
    pub body: Option<String>,
}

impl MockResponse {
    pub fn from_call(call: &Call) -> Self {
        Self {
            status: call.response_status.as_u16(),
            headers: call.response_headers.clone(),
            body: call.response_body.clone(),
        }
    }

    pub fn from_definition(definition: &ResponseDefinition) -> Self {
        Self {
            status: definition.status,
            headers: definition.headers.clone(),
            body: definition.body.clone(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            headers: HeaderMultiMap::new().with("Content-Type", "application/json"),
            body: Some(
                r#"{"error": "not_found", "message": "No matching stub found"}"#.to_string(),
            ),
        }
    }
}

/// Logging switches for the in-memory server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    /// Log all matched stubs
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched requests
    #[serde(default = "default_true")]
    pub log_unmatched: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
        }
    }
}

struct RegisteredStub {
    mapping: StubMapping,
    matches: AtomicU32,
}

impl RegisteredStub {
    /// Count one match, failing once `max_matches` is reached.
    fn claim(&self) -> bool {
        let limit = self.mapping.max_matches;
        self.matches
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (limit == 0 || count < limit).then_some(count + 1)
            })
            .is_ok()
    }
}

/// In-process mock server answering [`ObservedRequest`]s from registered stubs.
///
/// The most recently registered matching stub wins.
pub struct InMemoryMockServer {
    settings: ServerSettings,
    stubs: RwLock<Vec<RegisteredStub>>,
    /// Total requests processed.
    requests_total: AtomicU64,
    /// Total requests matched to stubs.
    requests_matched: AtomicU64,
    /// Total requests unmatched.
    requests_unmatched: AtomicU64,
    /// Set once the server is shutting down.
    draining: AtomicBool,
}

impl InMemoryMockServer {
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            settings,
            stubs: RwLock::new(Vec::new()),
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
            draining: AtomicBool::new(false),
        }
    }

    /// Answer a request from the registered stubs, or with a 404.
    pub async fn respond(&self, request: &ObservedRequest) -> MockResponse {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let stubs = self.stubs.read().await;
        let matched = stubs
            .iter()
            .rev()
            .find(|s| matches_pattern(&s.mapping.request, request) && s.claim());

        match matched {
            Some(stub) => {
                self.requests_matched.fetch_add(1, Ordering::Relaxed);
                if self.settings.log_matches {
                    info!(
                        stub_id = %stub.mapping.id,
                        method = %request.method,
                        path = %request.path,
                        "Request matched stub"
                    );
                }
                MockResponse::from_definition(&stub.mapping.response)
            }
            None => {
                self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
                if self.settings.log_unmatched {
                    warn!(
                        method = %request.method,
                        path = %request.path,
                        "No matching stub found"
                    );
                }
                MockResponse::not_found()
            }
        }
    }

    /// Registered stub rules, in registration order.
    pub async fn stubs(&self) -> Vec<StubMapping> {
        self.stubs
            .read()
            .await
            .iter()
            .map(|s| s.mapping.clone())
            .collect()
    }

    /// Drop every registered stub.
    pub async fn reset(&self) {
        self.stubs.write().await.clear();
        debug!("Mock server stubs reset");
    }

    /// Stop reporting ready.
    pub fn shutdown(&self) {
        info!("Mock server shutdown requested");
        self.draining.store(true, Ordering::SeqCst);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn total_matched(&self) -> u64 {
        self.requests_matched.load(Ordering::Relaxed)
    }

    pub fn total_unmatched(&self) -> u64 {
        self.requests_unmatched.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryMockServer {
    fn default() -> Self {
        Self::new(ServerSettings::default())
    }
}

#[async_trait]
impl MockServer for InMemoryMockServer {
    async fn register_stub(&self, stub: StubMapping) {
        debug!(stub_id = %stub.id, "Stub registered");
        self.stubs.write().await.push(RegisteredStub {
            mapping: stub,
            matches: AtomicU32::new(0),
        });
    }

    async fn check_ready(&self) -> Result<(), String> {
        if self.is_draining() {
            Err("mock server is shutting down".to_string())
        } else {
            Ok(())
        }
    }
}

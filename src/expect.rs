//! Assertion-style expectations: declared calls checked against observed
//! requests, answered with the declared responses.

use crate::cache::{CacheKey, CallCache};
use crate::call::Call;
use crate::config::MockSettings;
use crate::error::{CallError, Result};
use crate::matcher::{assert_matches, ObservedRequest};
use crate::parser::CallParser;
use crate::placeholder::Placeholders;
use crate::server::MockResponse;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Expected calls for one test.
#[derive(Debug)]
pub struct Expectations {
    parser: CallParser,
    cache: Arc<CallCache>,
    parameters: Placeholders,
    single_use: bool,
    pending: VecDeque<String>,
}

impl Expectations {
    pub fn new(parser: CallParser) -> Self {
        Self {
            parser,
            cache: Arc::new(CallCache::new()),
            parameters: Placeholders::new(),
            single_use: true,
            pending: VecDeque::new(),
        }
    }

    /// Take default placeholders and eviction policy from settings.
    pub fn with_settings(parser: CallParser, settings: &MockSettings) -> Self {
        let mut expectations = Self::new(parser);
        expectations.parameters = settings.placeholders.clone();
        expectations.single_use = settings.single_use_calls;
        expectations
    }

    /// Share a cache with other sessions.
    pub fn with_cache(mut self, cache: Arc<CallCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Set a placeholder value for every call parsed from now on.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(name.into(), value.into());
    }

    /// Declare the next expected call.
    pub fn expect(&mut self, source_id: impl Into<String>) -> &mut Self {
        self.pending.push_back(source_id.into());
        self
    }

    /// Declare several expected calls, in order.
    pub fn expect_all<I, S>(&mut self, source_ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(source_ids.into_iter().map(Into::into));
        self
    }

    /// Parsed call for `source_id` under the current parameters.
    pub fn expected_call(&self, source_id: &str) -> Result<Arc<Call>> {
        let key = CacheKey::new(source_id, &self.parameters);
        self.cache
            .get_or_parse(&key, || self.parser.parse(source_id, &self.parameters))
    }

    /// Assert `request` against the call in `source_id` and return its response.
    pub fn verify(&self, source_id: &str, request: &ObservedRequest) -> Result<MockResponse> {
        let call = self.expected_call(source_id)?;
        assert_matches(request, &call)?;

        if self.single_use {
            self.cache.evict(&CacheKey::new(source_id, &self.parameters));
        }
        debug!(source_id, path = %request.path, "Request matched expected call");
        Ok(MockResponse::from_call(&call))
    }

    /// Verify each pair independently; one mismatch does not hide the others.
    pub fn verify_each<'a, I>(&self, pairs: I) -> Vec<Result<MockResponse>>
    where
        I: IntoIterator<Item = (&'a str, &'a ObservedRequest)>,
    {
        pairs
            .into_iter()
            .map(|(source_id, request)| self.verify(source_id, request))
            .collect()
    }

    /// Answer `request` with the next declared call, asserting it matches.
    ///
    /// A mismatching request leaves the call pending, so it still shows up in
    /// [`verify_complete`](Self::verify_complete).
    pub fn respond(&mut self, request: &ObservedRequest) -> Result<MockResponse> {
        let source_id = self
            .pending
            .pop_front()
            .ok_or_else(|| CallError::UnexpectedRequest {
                method: request.method.to_string(),
                path: request.path.clone(),
            })?;
        let result = self.verify(&source_id, request);
        if matches!(result, Err(CallError::Mismatch(_))) {
            self.pending.push_front(source_id);
        }
        result
    }

    /// Fail if declared calls were never requested.
    pub fn verify_complete(&self) -> Result<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(CallError::UnsatisfiedExpectations {
                remaining: self.pending.iter().cloned().collect(),
            })
        }
    }

    /// Forget declared calls and cached parses.
    pub fn reset(&mut self) {
        info!(pending = self.pending.len(), "Resetting expectations");
        self.pending.clear();
        self.cache.clear();
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }
}

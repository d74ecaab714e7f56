//! Request matching logic.
//!
//! Two policies live here: [`assert_matches`] checks an observed request
//! against an expected [`Call`] and reports the first field that differs;
//! [`matches_pattern`] evaluates a registered stub rule.

use crate::body::{
    expected_form_pairs, form_contains_all, json_contains, json_text_contains, BodyKind,
};
use crate::call::Call;
use crate::error::{CallError, MatchField, Mismatch, Result};
use crate::headers::HeaderMultiMap;
use crate::lines::is_blank;
use crate::stub::{BodyMatcher, ParamPredicate, RequestPattern};
use http::Method;
use url::{form_urlencoded, Url};

/// A request as seen by the mock layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRequest {
    pub method: Method,
    /// Host name, without port
    pub host: String,
    pub path: String,
    /// Raw query string, without the leading `?`
    pub query: Option<String>,
    pub headers: HeaderMultiMap,
    pub body: Option<String>,
}

impl ObservedRequest {
    /// Build a request from a method and an absolute URL.
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|reason| CallError::InvalidUri {
            uri: url.to_string(),
            reason,
        })?;
        Ok(Self {
            method,
            host: parsed.host_str().unwrap_or_default().to_string(),
            path: parsed.path().to_string(),
            query: parsed.query().map(str::to_string),
            headers: HeaderMultiMap::new(),
            body: None,
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }

    /// Decoded query parameters, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        parse_query_string(self.query.as_deref().unwrap_or(""))
    }

    fn body_str(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    fn target(&self) -> String {
        match &self.query {
            Some(query) => format!("https://{}{}?{}", self.host, self.path, query),
            None => format!("https://{}{}", self.host, self.path),
        }
    }
}

/// Check `observed` against `expected`, stopping at the first difference.
///
/// Order: host, path, query containment, method, headers, body.
pub fn assert_matches(observed: &ObservedRequest, expected: &Call) -> Result<()> {
    let uri = expected.uri()?;

    let expected_host = uri.host_str().unwrap_or_default();
    if !expected_host.eq_ignore_ascii_case(&observed.host) {
        return Err(Mismatch::new(MatchField::Host, expected_host, &observed.host).into());
    }

    if uri.path() != observed.path {
        return Err(Mismatch::new(MatchField::Path, uri.path(), &observed.path).into());
    }

    let observed_query = observed.query_pairs();
    let query_contained = uri
        .query_pairs()
        .all(|(k, v)| observed_query.iter().any(|(ok, ov)| *ok == k && *ov == v));
    if !query_contained {
        return Err(Mismatch::new(MatchField::Query, uri.as_str(), observed.target()).into());
    }

    if expected.request_method != observed.method {
        return Err(Mismatch::new(
            MatchField::Method,
            expected.request_method.as_str(),
            observed.method.as_str(),
        )
        .into());
    }

    for (name, values) in expected.request_headers.iter() {
        let actual = observed.headers.get(name).unwrap_or_default();
        if actual != values {
            return Err(Mismatch::new(
                MatchField::Header(name.to_string()),
                format_values(values),
                format_values(actual),
            )
            .into());
        }
    }

    assert_body(observed, expected)
}

fn assert_body(observed: &ObservedRequest, expected: &Call) -> Result<()> {
    let Some(expected_body) = expected.request_body.as_deref().filter(|b| !is_blank(b)) else {
        return Ok(());
    };
    let actual = observed.body_str();

    let matched = match BodyKind::from_content_type(expected.request_content_type()) {
        BodyKind::Form => form_contains_all(&expected_form_pairs(expected_body), actual),
        BodyKind::Json => json_text_contains(expected_body, actual),
        BodyKind::Text => observed.body.as_deref() == Some(expected_body),
    };

    if matched {
        Ok(())
    } else {
        Err(Mismatch::new(MatchField::Body, expected_body, actual).into())
    }
}

fn format_values(values: &[String]) -> String {
    format!("[{}]", values.join(", "))
}

/// Whether a request satisfies a stub rule.
pub fn matches_pattern(pattern: &RequestPattern, request: &ObservedRequest) -> bool {
    if !pattern.method.eq_ignore_ascii_case(request.method.as_str()) {
        return false;
    }

    if pattern.url_path != request.path {
        return false;
    }

    let query = request.query_pairs();
    if !pattern.query.iter().all(|p| matches_query(&query, p)) {
        return false;
    }

    if !pattern
        .headers
        .iter()
        .all(|p| matches_header(&request.headers, p))
    {
        return false;
    }

    match &pattern.body {
        Some(body) => matches_body(request.body.as_deref(), body),
        None => true,
    }
}

fn matches_query(query: &[(String, String)], predicate: &ParamPredicate) -> bool {
    query
        .iter()
        .any(|(name, value)| *name == predicate.name && predicate.matcher.matches(value))
}

fn matches_header(headers: &HeaderMultiMap, predicate: &ParamPredicate) -> bool {
    headers
        .get(&predicate.name)
        .is_some_and(|values| values.iter().any(|v| predicate.matcher.matches(v)))
}

fn matches_body(body: Option<&str>, matcher: &BodyMatcher) -> bool {
    match matcher {
        BodyMatcher::EqualTo { value } => body == Some(value.as_str()),
        BodyMatcher::EqualToJson { value } => body
            .and_then(|b| serde_json::from_str::<serde_json::Value>(b).ok())
            .is_some_and(|actual| json_contains(value, &actual)),
        BodyMatcher::FormParams { pairs } => form_contains_all(pairs, body.unwrap_or("")),
    }
}

/// Parse a query string into decoded key-value pairs.
fn parse_query_string(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

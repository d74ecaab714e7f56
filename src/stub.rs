//! Stub rules for the mock server and the builder that derives them from calls.
//!
//! A stub rule is plain data: it can be registered with an in-process
//! [`MockServer`](crate::server::MockServer) or serialized for inspection.

use crate::body::{expected_form_pairs, BodyKind};
use crate::call::Call;
use crate::error::{CallError, Result};
use crate::headers::HeaderMultiMap;
use crate::lines::is_blank;
use crate::parser::CallParser;
use crate::placeholder::Placeholders;
use crate::server::MockServer;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A request pattern and the response returned when it matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StubMapping {
    /// Identifier, usually the call source it was built from
    pub id: String,

    /// Request matcher
    pub request: RequestPattern,

    /// Response to return
    pub response: ResponseDefinition,

    /// Maximum number of times this stub can be matched (0 = unlimited)
    #[serde(default)]
    pub max_matches: u32,
}

/// Request matching rule. Every present predicate must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestPattern {
    /// HTTP method, compared case-insensitively
    pub method: String,

    /// Exact request path
    pub url_path: String,

    /// Query parameters that must be present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<ParamPredicate>,

    /// Header values that must be present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<ParamPredicate>,

    /// Body matching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyMatcher>,
}

/// A named query parameter or header with a value predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamPredicate {
    pub name: String,
    #[serde(flatten)]
    pub matcher: ValueMatcher,
}

/// Predicate over a single query or header value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueMatcher {
    /// Exact value match
    EqualTo { value: String },
    /// Value must contain substring
    Contains { value: String },
}

impl ValueMatcher {
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            ValueMatcher::EqualTo { value } => candidate == value,
            ValueMatcher::Contains { value } => candidate.contains(value.as_str()),
        }
    }
}

/// Body matching configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyMatcher {
    /// Exact body match
    EqualTo { value: String },
    /// Lenient JSON match: extra fields in the request are allowed
    EqualToJson { value: serde_json::Value },
    /// Every `key=value` token must appear in the form body, in any order
    FormParams { pairs: Vec<String> },
}

/// Response definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseDefinition {
    /// HTTP status code
    #[serde(default = "default_status")]
    pub status: u16,

    /// Response headers
    #[serde(default)]
    pub headers: HeaderMultiMap,

    /// Response body
    #[serde(default)]
    pub body: Option<String>,
}

fn default_status() -> u16 {
    200
}

/// Derive a stub rule from an expected call.
///
/// Headers are looser than [`assert_matches`](crate::matcher::assert_matches):
/// each declared value only has to be contained in some observed value.
pub fn build_stub(id: impl Into<String>, call: &Call) -> Result<StubMapping> {
    let uri = call.uri()?;

    let query = uri
        .query_pairs()
        .map(|(name, value)| ParamPredicate {
            name: name.into_owned(),
            matcher: ValueMatcher::EqualTo {
                value: value.into_owned(),
            },
        })
        .collect();

    let headers = call
        .request_headers
        .iter()
        .flat_map(|(name, values)| {
            values.iter().map(move |value| ParamPredicate {
                name: name.to_string(),
                matcher: ValueMatcher::Contains {
                    value: value.clone(),
                },
            })
        })
        .collect();

    let body = match call.request_body.as_deref() {
        Some(body) if !is_blank(body) => Some(body_matcher(call, body)?),
        _ => None,
    };

    Ok(StubMapping {
        id: id.into(),
        request: RequestPattern {
            method: call.request_method.to_string(),
            url_path: uri.path().to_string(),
            query,
            headers,
            body,
        },
        response: ResponseDefinition {
            status: call.response_status.as_u16(),
            headers: call.response_headers.clone(),
            body: call.response_body.clone(),
        },
        max_matches: 0,
    })
}

fn body_matcher(call: &Call, body: &str) -> Result<BodyMatcher> {
    Ok(match BodyKind::from_content_type(call.request_content_type()) {
        BodyKind::Form => BodyMatcher::FormParams {
            pairs: expected_form_pairs(body),
        },
        BodyKind::Json => BodyMatcher::EqualToJson {
            value: serde_json::from_str(body).map_err(|e| CallError::InvalidBody {
                reason: format!("declared JSON body does not parse: {e}"),
            })?,
        },
        BodyKind::Text => BodyMatcher::EqualTo {
            value: body.to_string(),
        },
    })
}

/// Build a stub rule for `call` and register it.
pub async fn register_stub(server: &dyn MockServer, id: &str, call: &Call) -> Result<()> {
    let stub = build_stub(id, call)?;
    info!(
        stub_id = %stub.id,
        method = %stub.request.method,
        path = %stub.request.url_path,
        status = stub.response.status,
        "Registering mock server stub"
    );
    server.register_stub(stub).await;
    Ok(())
}

/// One call definition to stub, with its placeholder values.
#[derive(Debug, Clone, PartialEq)]
pub struct StubRequest {
    pub source_id: String,
    pub placeholders: Placeholders,
}

impl StubRequest {
    pub fn of(source_id: impl Into<String>) -> Self {
        Self::with_placeholders(source_id, Placeholders::new())
    }

    pub fn with_placeholders(source_id: impl Into<String>, placeholders: Placeholders) -> Self {
        Self {
            source_id: source_id.into(),
            placeholders,
        }
    }
}

/// Parse one call definition and register its stub.
pub async fn stub_request(
    server: &dyn MockServer,
    parser: &CallParser,
    request: &StubRequest,
) -> Result<()> {
    let call = parser.parse(&request.source_id, &request.placeholders)?;
    register_stub(server, &request.source_id, &call).await
}

/// Stub every request in order; the first failure aborts the batch.
pub async fn stub_requests(
    server: &dyn MockServer,
    parser: &CallParser,
    requests: &[StubRequest],
) -> Result<()> {
    for request in requests {
        stub_request(server, parser, request).await?;
    }
    Ok(())
}

/// Stub several call definitions sharing one placeholder mapping.
pub async fn stub_all<S: AsRef<str>>(
    server: &dyn MockServer,
    parser: &CallParser,
    placeholders: &Placeholders,
    source_ids: &[S],
) -> Result<()> {
    for source_id in source_ids {
        let call = parser.parse(source_id.as_ref(), placeholders)?;
        register_stub(server, source_id.as_ref(), &call).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use crate::server::{InMemoryMockServer, ServerSettings};
    use crate::source::MemorySource;
    use serde_json::json;

    fn call(text: &str) -> Call {
        parse_str(text, &Placeholders::new()).unwrap()
    }

    #[test]
    fn test_build_json_stub() {
        let c = call(
            "POST /price/update?currency=EUR&dry=1\nHost: shop\nContent-Type: application/json\n\n\
             {\"price\":1111}\nHTTP/1.1 200 OK\nContent-Type: application/json\n\n\
             {\"newPrice\":1111}\n",
        );
        let stub = build_stub("update-price.txt", &c).unwrap();

        assert_eq!(stub.id, "update-price.txt");
        assert_eq!(stub.request.method, "POST");
        assert_eq!(stub.request.url_path, "/price/update");
        assert_eq!(
            stub.request.query,
            vec![
                ParamPredicate {
                    name: "currency".to_string(),
                    matcher: ValueMatcher::EqualTo { value: "EUR".to_string() },
                },
                ParamPredicate {
                    name: "dry".to_string(),
                    matcher: ValueMatcher::EqualTo { value: "1".to_string() },
                },
            ]
        );
        assert_eq!(
            stub.request.body,
            Some(BodyMatcher::EqualToJson { value: json!({"price": 1111}) })
        );
        assert_eq!(stub.response.status, 200);
        assert_eq!(stub.response.body.as_deref(), Some("{\"newPrice\":1111}"));
        assert_eq!(stub.max_matches, 0);
    }

    #[test]
    fn test_every_header_value_becomes_a_contains_predicate() {
        let c = call(
            "GET /x\nHost: h\nAccept: text/plain\nAccept: application/json\n\nHTTP/1.1 200 OK\n",
        );
        let stub = build_stub("x", &c).unwrap();
        let values: Vec<_> = stub
            .request
            .headers
            .iter()
            .map(|p| (p.name.as_str(), p.matcher.clone()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("Accept", ValueMatcher::Contains { value: "text/plain".to_string() }),
                ("Accept", ValueMatcher::Contains { value: "application/json".to_string() }),
            ]
        );
    }

    #[test]
    fn test_form_and_text_bodies() {
        let form = call(
            "POST /login\nHost: h\nContent-Type: application/x-www-form-urlencoded\n\n\
             user=ann&\npass=x&\nHTTP/1.1 302 Found\n",
        );
        assert_eq!(
            build_stub("f", &form).unwrap().request.body,
            Some(BodyMatcher::FormParams {
                pairs: vec!["user=ann".to_string(), "pass=x".to_string()]
            })
        );

        let text = call(
            "PUT /note\nHost: h\nContent-Type: text/plain\n\nhello\nHTTP/1.1 204 No Content\n",
        );
        assert_eq!(
            build_stub("t", &text).unwrap().request.body,
            Some(BodyMatcher::EqualTo { value: "hello".to_string() })
        );

        let none = call("GET /x\nHost: h\n\nHTTP/1.1 200 OK\n");
        assert_eq!(build_stub("n", &none).unwrap().request.body, None);
    }

    #[test]
    fn test_invalid_declared_json() {
        let c = call(
            "POST /x\nHost: h\nContent-Type: application/json\n\nnot json\nHTTP/1.1 200 OK\n",
        );
        assert!(matches!(
            build_stub("x", &c).unwrap_err(),
            CallError::InvalidBody { .. }
        ));
    }

    #[test]
    fn test_stub_mapping_yaml() {
        let c = call("GET /x?a=1\nHost: h\n\nHTTP/1.1 404 Not Found\nX-Reason: gone\n\n{}\n");
        let stub = build_stub("gone.txt", &c).unwrap();
        let yaml = serde_yaml::to_string(&stub).unwrap();
        assert!(yaml.contains("url_path: /x"));
        assert!(yaml.contains("type: equal_to"));

        let back: StubMapping = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, stub);
    }

    #[tokio::test]
    async fn test_stub_batches_register_every_call() {
        let source = MemorySource::new()
            .with("a.txt", "GET /a\nHost: h\n\nHTTP/1.1 200 OK\n")
            .with("b.txt", "GET /b/$id\nHost: h\n\nHTTP/1.1 200 OK\n")
            .with("bad.txt", "GET\n");
        let parser = CallParser::new(source);
        let server = InMemoryMockServer::new(ServerSettings::default());

        let mut params = Placeholders::new();
        params.insert("id".to_string(), json!(3));
        stub_requests(
            &server,
            &parser,
            &[StubRequest::of("a.txt"), StubRequest::with_placeholders("b.txt", params)],
        )
        .await
        .unwrap();

        let paths: Vec<_> = server
            .stubs()
            .await
            .into_iter()
            .map(|s| s.request.url_path)
            .collect();
        assert_eq!(paths, vec!["/a", "/b/3"]);

        let err = stub_all(&server, &parser, &Placeholders::new(), &["a.txt", "bad.txt"])
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Parse { .. }));
        assert_eq!(server.stubs().await.len(), 3);
    }
}

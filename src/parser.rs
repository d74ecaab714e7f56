//! Call-definition parser.
//!
//! A call definition reads like an HTTP transcript:
//!
//! ```text
//! POST /price/update
//! Host: localhost
//! Content-Type: application/json
//!
//! {"price":1111}
//! HTTP/1.1 200 OK
//! Content-Type: application/json
//!
//! {"oldPrice":222,"newPrice":1111}
//! ```
//!
//! Lines are normalized first (see [`crate::lines`]), then fed one at a time
//! through a fixed sequence of stages. Each stage tells the driver whether to
//! stay, advance after consuming the line, or advance and hand the same line
//! to the next stage.

use crate::call::{append_body, Call};
use crate::error::{CallError, ParseStage, Result};
use crate::headers::HeaderMultiMap;
use crate::lines::{is_blank, normalize_lines};
use crate::placeholder::{Placeholders, Substitution};
use crate::source::CallSource;
use http::{Method, StatusCode};
use std::sync::Arc;
use tracing::debug;

/// Methods a request line may name.
const KNOWN_METHODS: [Method; 8] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
];

/// What the driver does after a stage handled a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    /// Line consumed, more lines of this kind may follow.
    Stay,
    /// Line consumed, this stage is done.
    Advance,
    /// Line not consumed, the next stage must see it.
    Handoff,
}

/// A call under construction.
#[derive(Debug, Default)]
struct CallDraft {
    request_method: Option<Method>,
    request_path: Option<String>,
    request_host: Option<String>,
    request_headers: HeaderMultiMap,
    request_body: Option<String>,
    response_status: Option<StatusCode>,
    response_headers: HeaderMultiMap,
    response_body: Option<String>,
}

impl CallDraft {
    fn finish(self) -> Result<Call> {
        let (Some(request_method), Some(request_path)) = (self.request_method, self.request_path)
        else {
            return Err(CallError::parse(
                ParseStage::RequestLine,
                "call definition is empty",
            ));
        };
        let Some(request_host) = self.request_host else {
            return Err(CallError::parse(
                ParseStage::RequestHost,
                "missing Host line",
            ));
        };
        let Some(response_status) = self.response_status else {
            return Err(CallError::parse(
                ParseStage::ResponseStatus,
                "missing response status line",
            ));
        };

        Ok(Call {
            request_host,
            request_path,
            request_method,
            request_headers: self.request_headers,
            request_body: self.request_body,
            response_status,
            response_headers: self.response_headers,
            response_body: self.response_body,
        })
    }
}

/// Feed one line to one stage.
fn step(stage: ParseStage, line: &str, draft: &mut CallDraft) -> Result<Directive> {
    match stage {
        ParseStage::RequestLine => {
            let mut parts = line.split(' ');
            let method_token = parts.next().unwrap_or_default();
            let path = parts.next().filter(|p| !p.is_empty()).ok_or_else(|| {
                CallError::parse(stage, format!("missing path in {line:?}"))
            })?;
            draft.request_method = Some(resolve_method(method_token)?);
            draft.request_path = Some(path.to_string());
            Ok(Directive::Advance)
        }
        ParseStage::RequestHost => {
            let (_, host) = line
                .split_once(": ")
                .ok_or_else(|| CallError::parse(stage, format!("missing host in {line:?}")))?;
            draft.request_host = Some(host.trim().to_string());
            Ok(Directive::Advance)
        }
        ParseStage::RequestHeaders => header_line(stage, line, &mut draft.request_headers),
        ParseStage::RequestBody => {
            if is_blank(line) {
                return Ok(Directive::Stay);
            }
            if line.starts_with("HTTP") {
                return Ok(Directive::Handoff);
            }
            append_body(&mut draft.request_body, line);
            Ok(Directive::Stay)
        }
        ParseStage::ResponseStatus => {
            let code = line.split(' ').nth(1).ok_or_else(|| {
                CallError::parse(stage, format!("missing status code in {line:?}"))
            })?;
            let status = code
                .parse::<u16>()
                .ok()
                .and_then(|code| StatusCode::from_u16(code).ok())
                .ok_or_else(|| {
                    CallError::parse(stage, format!("invalid status code {code:?}"))
                })?;
            draft.response_status = Some(status);
            Ok(Directive::Advance)
        }
        ParseStage::ResponseHeaders => header_line(stage, line, &mut draft.response_headers),
        ParseStage::ResponseBody => {
            if !is_blank(line) {
                append_body(&mut draft.response_body, line);
            }
            Ok(Directive::Stay)
        }
    }
}

fn header_line(stage: ParseStage, line: &str, headers: &mut HeaderMultiMap) -> Result<Directive> {
    if is_blank(line) {
        return Ok(Directive::Advance);
    }
    let (name, value) = line.split_once(": ").ok_or_else(|| {
        CallError::parse(stage, format!("expected \"Name: value\", got {line:?}"))
    })?;
    headers.append(name.trim(), value.trim());
    Ok(Directive::Stay)
}

fn resolve_method(token: &str) -> Result<Method> {
    KNOWN_METHODS
        .iter()
        .find(|m| m.as_str() == token)
        .cloned()
        .ok_or_else(|| {
            CallError::parse(
                ParseStage::RequestLine,
                format!("unknown HTTP method {token:?}"),
            )
        })
}

/// Parse already-normalized lines into a [`Call`].
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Result<Call> {
    let mut draft = CallDraft::default();
    let mut stage = ParseStage::RequestLine;
    let mut cursor = 0;

    while let Some(line) = lines.get(cursor) {
        let directive = step(stage, line.as_ref(), &mut draft)?;
        if directive != Directive::Handoff {
            cursor += 1;
        }
        if directive != Directive::Stay {
            stage = stage.next().ok_or_else(|| {
                CallError::parse(stage, "unexpected content after the response body")
            })?;
        }
    }

    draft.finish()
}

/// Normalize and parse call-definition text.
pub fn parse_str(text: &str, placeholders: &Placeholders) -> Result<Call> {
    let substitution = Substitution::new(placeholders)?;
    let lines = normalize_lines(text.lines(), &substitution);
    parse_lines(&lines)
}

/// Parses call definitions loaded from a [`CallSource`].
#[derive(Clone)]
pub struct CallParser {
    source: Arc<dyn CallSource>,
}

impl CallParser {
    pub fn new(source: impl CallSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn from_shared(source: Arc<dyn CallSource>) -> Self {
        Self { source }
    }

    /// Load and parse one call definition.
    pub fn parse(&self, source_id: &str, placeholders: &Placeholders) -> Result<Call> {
        let text = self.source.load(source_id)?;
        let call = parse_str(&text, placeholders)?;
        debug!(
            source_id,
            method = %call.request_method,
            path = %call.request_path,
            status = call.response_status.as_u16(),
            "Parsed mock server call"
        );
        Ok(call)
    }

    /// Parse several definitions sharing one placeholder mapping. Stops at the
    /// first failure.
    pub fn parse_all<I, S>(&self, source_ids: I, placeholders: &Placeholders) -> Result<Vec<Call>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        source_ids
            .into_iter()
            .map(|id| self.parse(id.as_ref(), placeholders))
            .collect()
    }
}

impl std::fmt::Debug for CallParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallParser").finish_non_exhaustive()
    }
}

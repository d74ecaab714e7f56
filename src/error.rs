//! Error types for call parsing, matching, and mock server setup.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CallError>;

/// Errors raised while loading, parsing, or checking call definitions.
#[derive(Debug, Error)]
pub enum CallError {
    /// The named call definition could not be located or read.
    #[error("Cannot load mock server call definition {source_id}: {reason}")]
    SourceNotFound { source_id: String, reason: String },

    /// A call definition is structurally invalid.
    #[error("Invalid {stage}: {reason}")]
    Parse { stage: ParseStage, reason: String },

    /// An observed request disagrees with its expected call.
    #[error(transparent)]
    Mismatch(#[from] Mismatch),

    /// The mock server never reported ready.
    #[error("Mock server not ready after {waited:?}: {last_failure}")]
    LivenessTimeout {
        waited: Duration,
        last_failure: String,
    },

    /// Host and path of a call do not form a valid URI.
    #[error("Invalid request URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: url::ParseError },

    /// A declared body cannot be turned into a stub body matcher.
    #[error("Invalid request body: {reason}")]
    InvalidBody { reason: String },

    /// A source glob did not compile.
    #[error("Invalid source pattern {pattern}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: globset::Error,
    },

    /// Placeholder names did not compile into a substitution pattern.
    #[error("Invalid placeholders: {0}")]
    InvalidPlaceholders(#[from] regex::Error),

    /// A request arrived after every declared call was consumed.
    #[error("No further requests expected: received {method} {path}")]
    UnexpectedRequest { method: String, path: String },

    /// Declared calls were never requested.
    #[error("Expected calls were not requested: {}", remaining.join(", "))]
    UnsatisfiedExpectations { remaining: Vec<String> },
}

impl CallError {
    pub(crate) fn parse(stage: ParseStage, reason: impl Into<String>) -> Self {
        CallError::Parse {
            stage,
            reason: reason.into(),
        }
    }

    /// The parse stage that failed, for structural errors.
    pub fn stage(&self) -> Option<ParseStage> {
        match self {
            CallError::Parse { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Stages of the call-definition parser, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParseStage {
    RequestLine,
    RequestHost,
    RequestHeaders,
    RequestBody,
    ResponseStatus,
    ResponseHeaders,
    ResponseBody,
}

impl ParseStage {
    /// The stage that runs after this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            ParseStage::RequestLine => Some(ParseStage::RequestHost),
            ParseStage::RequestHost => Some(ParseStage::RequestHeaders),
            ParseStage::RequestHeaders => Some(ParseStage::RequestBody),
            ParseStage::RequestBody => Some(ParseStage::ResponseStatus),
            ParseStage::ResponseStatus => Some(ParseStage::ResponseHeaders),
            ParseStage::ResponseHeaders => Some(ParseStage::ResponseBody),
            ParseStage::ResponseBody => None,
        }
    }
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseStage::RequestLine => "request line",
            ParseStage::RequestHost => "request host",
            ParseStage::RequestHeaders => "request headers",
            ParseStage::RequestBody => "request body",
            ParseStage::ResponseStatus => "response status line",
            ParseStage::ResponseHeaders => "response headers",
            ParseStage::ResponseBody => "response body",
        };
        f.write_str(name)
    }
}

/// The request dimension that failed to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchField {
    Host,
    Path,
    Query,
    Method,
    Header(String),
    Body,
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchField::Host => f.write_str("host"),
            MatchField::Path => f.write_str("path"),
            MatchField::Query => f.write_str("query parameters"),
            MatchField::Method => f.write_str("method"),
            MatchField::Header(name) => write!(f, "header {name}"),
            MatchField::Body => f.write_str("body"),
        }
    }
}

/// A single-field disagreement between an expected call and an observed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unexpected request {field} expected:<{expected}> but was:<{actual}>")]
pub struct Mismatch {
    pub field: MatchField,
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    pub(crate) fn new(
        field: MatchField,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field,
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let mut stage = ParseStage::RequestLine;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited.len(), 7);
        assert_eq!(stage, ParseStage::ResponseBody);
    }

    #[test]
    fn test_mismatch_message() {
        let mismatch = Mismatch::new(MatchField::Path, "/a", "/b");
        assert_eq!(
            mismatch.to_string(),
            "Unexpected request path expected:</a> but was:</b>"
        );

        let err = CallError::from(Mismatch::new(
            MatchField::Header("Accept".to_string()),
            "[text/plain]",
            "<none>",
        ));
        assert!(err.to_string().contains("header Accept"));
    }

    #[test]
    fn test_parse_error_reports_stage() {
        let err = CallError::parse(ParseStage::RequestLine, "missing path in \"POST\"");
        assert_eq!(err.stage(), Some(ParseStage::RequestLine));
        assert!(err.to_string().starts_with("Invalid request line"));
    }
}

//! The call record: one expected request and its declared response.

use crate::error::{CallError, Result};
use crate::headers::HeaderMultiMap;
use http::{Method, StatusCode};
use url::Url;

/// An expected HTTP call parsed from a call definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub request_host: String,
    pub request_path: String,
    pub request_method: Method,
    pub request_headers: HeaderMultiMap,
    pub request_body: Option<String>,
    pub response_status: StatusCode,
    pub response_headers: HeaderMultiMap,
    pub response_body: Option<String>,
}

impl Call {
    /// `https://` + host + path, as used for host/path/query comparisons.
    pub fn uri(&self) -> Result<Url> {
        let uri = format!("https://{}{}", self.request_host, self.request_path);
        Url::parse(&uri).map_err(|reason| CallError::InvalidUri { uri, reason })
    }

    /// Decoded query parameters of the expected request, in declaration order.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .uri()?
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect())
    }

    /// Request content type as declared in the request headers.
    pub fn request_content_type(&self) -> Option<&str> {
        self.request_headers.content_type()
    }
}

/// Append `line` to a body, joining with `\n`.
pub(crate) fn append_body(body: &mut Option<String>, line: &str) {
    match body {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(line);
        }
        None => *body = Some(line.to_string()),
    }
}

//! HTTP Call Mock
//!
//! Declare expected HTTP calls as plain-text transcripts, then either assert
//! that observed requests match them or register them as stubs with a mock
//! server.
//!
//! # Features
//!
//! - **Call Definitions**: Request line, host, headers, body, status line,
//!   response headers and body, with `#` comments
//! - **Placeholders**: `$name` tokens replaced from a parameter mapping
//! - **Request Assertions**: Host, path, query, method, headers, and
//!   content-type aware body checks with expected-vs-actual reports
//! - **Stub Rules**: Declarative request patterns with the declared response
//! - **Call Cache**: Parse once per source and parameter context
//!
//! # Example Call Definition
//!
//! ```text
//! # Price update
//! POST /price/update
//! Host: localhost
//! Content-Type: application/json
//!
//! {"price":1111}
//! HTTP/1.1 200 OK
//! Content-Type: application/json
//!
//! {"oldPrice":222,"newPrice":$new-price}
//! ```

pub mod body;
pub mod cache;
pub mod call;
pub mod config;
pub mod error;
pub mod expect;
pub mod headers;
pub mod lines;
pub mod liveness;
pub mod matcher;
pub mod parser;
pub mod placeholder;
pub mod server;
pub mod source;
pub mod stub;

pub use call::Call;
pub use config::MockSettings;
pub use error::{CallError, MatchField, Mismatch, ParseStage, Result};
pub use expect::Expectations;
pub use headers::HeaderMultiMap;
pub use liveness::{wait_until_ready, StartupPolicy};
pub use matcher::{assert_matches, ObservedRequest};
pub use parser::{parse_str, CallParser};
pub use placeholder::Placeholders;
pub use server::{InMemoryMockServer, MockResponse, MockServer};
pub use source::{CallSource, DirectorySource, MemorySource};
pub use stub::{
    build_stub, register_stub, stub_all, stub_request, stub_requests, StubMapping, StubRequest,
};

//! Trace event types
//!
//! Events borrow their payloads from the publisher. Delivery is synchronous,
//! so nothing outlives the `publish` call.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::expect::ExpectationResult;

/// Variables visible to templates and captures
pub type Vars = serde_json::Map<String, serde_json::Value>;

/// The closed set of event kinds a consumer can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Error,
    HttpRequest,
    HttpResponse,
    HttpCapture,
    ExpectationResult,
    Expectations,
}

impl EventKind {
    /// Stable channel name, as shown in logs
    pub const fn channel(self) -> &'static str {
        match self {
            EventKind::Error => "error",
            EventKind::HttpRequest => "trace:http:request",
            EventKind::HttpResponse => "trace:http:response",
            EventKind::HttpCapture => "trace:http:capture",
            EventKind::ExpectationResult => "expectation:result",
            EventKind::Expectations => "plugin:expect:expectations",
        }
    }
}

/// A trace event tagged with the virtual user that produced it
#[derive(Debug)]
pub struct TraceEvent<'a> {
    /// Correlation id of the run
    pub vu: Uuid,
    pub payload: Payload<'a>,
}

/// Event payloads
#[derive(Debug)]
pub enum Payload<'a> {
    /// The run failed
    Error { message: &'a str },
    /// A request is about to be sent
    HttpRequest { step: usize, request: &'a HttpRequest },
    /// A response was received (captures have already been applied)
    HttpResponse {
        step: usize,
        request: &'a HttpRequest,
        response: &'a HttpResponse,
        /// Raw `expect` clauses of the step
        expect: &'a [serde_yaml::Value],
        vars: &'a Vars,
    },
    /// A value was captured into `vars`
    HttpCapture {
        step: usize,
        name: &'a str,
        value: &'a serde_json::Value,
    },
    /// One expectation outcome
    ExpectationResult(&'a ExpectationResult),
    /// All expectation outcomes for one response
    Expectations {
        results: &'a [ExpectationResult],
        request: &'a HttpRequest,
        response: &'a HttpResponse,
        vars: &'a Vars,
    },
}

impl TraceEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self.payload {
            Payload::Error { .. } => EventKind::Error,
            Payload::HttpRequest { .. } => EventKind::HttpRequest,
            Payload::HttpResponse { .. } => EventKind::HttpResponse,
            Payload::HttpCapture { .. } => EventKind::HttpCapture,
            Payload::ExpectationResult(_) => EventKind::ExpectationResult,
            Payload::Expectations { .. } => EventKind::Expectations,
        }
    }
}

/// A request as sent by the engine
#[derive(Debug, Clone, Serialize)]
pub struct HttpRequest {
    pub method: String,
    /// Fully resolved URL
    pub url: String,
    /// Step name, if the flow gave one
    pub name: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// A response as received by the engine
#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// Parsed body, when it is JSON
    pub json: Option<serde_json::Value>,
    pub timings: Option<Timings>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Phase breakdown of one request, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    pub total: Option<u64>,
    pub dns: Option<u64>,
    pub tcp: Option<u64>,
    pub tls: Option<u64>,
    pub first_byte: Option<u64>,
    pub download: Option<u64>,
}

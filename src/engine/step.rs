//! Flow step definitions
//!
//! Each step is a single-key mapping: `get: { url: / }`, `think: 2`,
//! `log: "hello"`.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde_yaml::Value;

use crate::common::{Error, Result};

/// A single step in a flow
#[derive(Debug)]
pub enum Step {
    /// Send an HTTP request
    Request { method: Method, spec: RequestSpec },
    /// Pause between requests
    Think(Duration),
    /// Print a (templated) line
    Log(String),
}

/// Request step options
#[derive(Deserialize, Debug, Default)]
pub struct RequestSpec {
    /// Absolute URL, or a path appended to the target
    pub url: String,
    /// Display name for the step
    pub name: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, serde_json::Value>,
    /// Query string parameters
    #[serde(default)]
    pub qs: BTreeMap<String, serde_json::Value>,
    /// JSON request body
    pub json: Option<serde_json::Value>,
    /// Raw request body
    pub body: Option<String>,
    #[serde(default)]
    pub capture: OneOrMany<CaptureSpec>,
    /// Expectation clauses, evaluated by the expect plugin
    #[serde(default)]
    pub expect: OneOrMany<Value>,
}

/// Where a captured value comes from and the variable it is stored in
#[derive(Deserialize, Debug, Clone)]
pub struct CaptureSpec {
    /// Path into the JSON body, e.g. `$.id`
    pub json: Option<String>,
    /// Response header name
    pub header: Option<String>,
    /// Variable name
    #[serde(rename = "as")]
    pub name: String,
}

/// Accepts either a single item or a list of items
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => std::slice::from_ref(item),
        }
    }
}

impl Step {
    /// Decode a flow into steps
    pub fn parse_flow(flow: &Value) -> Result<Vec<Step>> {
        let steps = match flow {
            Value::Sequence(steps) => steps,
            Value::Null => return Ok(Vec::new()),
            _ => {
                return Err(Error::Config(
                    "flow must be a list of steps".to_string(),
                ))
            }
        };

        steps
            .iter()
            .enumerate()
            .map(|(index, step)| Self::parse(index, step))
            .collect()
    }

    /// Decode a single step
    pub fn parse(index: usize, step: &Value) -> Result<Step> {
        let (action, body) = step
            .as_mapping()
            .filter(|m| m.len() == 1)
            .and_then(|m| m.iter().next())
            .ok_or_else(|| Error::invalid_step(index, "expected a single action key"))?;

        let action = action
            .as_str()
            .ok_or_else(|| Error::invalid_step(index, "action must be a string"))?;

        let method = match action {
            "get" => Method::GET,
            "post" => Method::POST,
            "put" => Method::PUT,
            "patch" => Method::PATCH,
            "delete" => Method::DELETE,
            "head" => Method::HEAD,
            "think" => {
                let pause = match body {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                }
                .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
                .ok_or_else(|| Error::invalid_step(index, "think expects a number of seconds"))?;
                return Ok(Step::Think(pause));
            }
            "log" => {
                let message = body
                    .as_str()
                    .ok_or_else(|| Error::invalid_step(index, "log expects a string"))?;
                return Ok(Step::Log(message.to_string()));
            }
            other => {
                return Err(Error::invalid_step(
                    index,
                    format!("unknown action '{}'", other),
                ))
            }
        };

        let spec: RequestSpec = serde_yaml::from_value(body.clone())
            .map_err(|e| Error::invalid_step(index, e.to_string()))?;

        Ok(Step::Request { method, spec })
    }
}

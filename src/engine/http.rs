//! reqwest-backed engine
//!
//! Runs steps strictly in order on one client. Every request step publishes
//! `http:request`, then one `http:capture` per captured value, then
//! `http:response`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client, Method};

use crate::common::config::HttpConfig;
use crate::common::{Error, Result};
use crate::script::{CanonicalScript, Scenario};
use crate::template;
use crate::trace::{EventBus, HttpRequest, HttpResponse, Payload, Timings, TraceEvent, Vars};
use crate::vu::ExecutionContext;

use super::step::{CaptureSpec, RequestSpec, Step};
use super::{Engine, EngineFactory};

/// Default HTTP engine
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    target: String,
}

impl HttpEngine {
    pub fn new(target: &str, http: &HttpConfig) -> Result<Self> {
        let redirects = if http.follow_redirects {
            redirect::Policy::default()
        } else {
            redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(concat!("skytrace/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(http.timeout_secs))
            .redirect(redirects)
            .build()?;

        Ok(Self {
            client,
            target: target.to_string(),
        })
    }

    /// Join a step URL onto the target unless it is already absolute
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let base = self.target.trim_end_matches('/');
        if url.is_empty() {
            base.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", base, url)
        } else {
            format!("{}/{}", base, url)
        }
    }

    async fn request(
        &self,
        index: usize,
        method: &Method,
        spec: &RequestSpec,
        context: &mut ExecutionContext,
        bus: &EventBus,
    ) -> Result<()> {
        let url = self.resolve_url(&template::render(&spec.url, &context.vars));
        let url = reqwest::Url::parse(&url).map_err(|_| Error::InvalidUrl(url.clone()))?;

        let mut builder = self.client.request(method.clone(), url);

        if !spec.qs.is_empty() {
            let query: Vec<(&str, String)> = spec
                .qs
                .iter()
                .map(|(k, v)| {
                    let value = template::render_value(v, &context.vars);
                    (k.as_str(), template::display(&value))
                })
                .collect();
            builder = builder.query(&query);
        }

        let headers = render_headers(&spec.headers, &context.vars);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = if let Some(json) = &spec.json {
            let rendered = template::render_value(json, &context.vars);
            if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            Some(serde_json::to_string(&rendered)?)
        } else {
            spec.body
                .as_ref()
                .map(|body| template::render(body, &context.vars))
        };
        if let Some(body) = &body {
            builder = builder.body(body.clone());
        }

        let request = builder.build()?;
        let info = HttpRequest {
            method: method.to_string(),
            url: request.url().to_string(),
            name: spec.name.clone(),
            headers,
            body,
        };

        tracing::debug!(method = %info.method, url = %info.url, "sending request");
        bus.publish(&TraceEvent {
            vu: context.vu,
            payload: Payload::HttpRequest {
                step: index,
                request: &info,
            },
        });

        let started = Instant::now();
        let response = self.client.execute(request).await?;
        let first_byte = started.elapsed();

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = response.bytes().await?;
        let total = started.elapsed();

        let response = HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            json: serde_json::from_slice(&bytes).ok(),
            timings: Some(Timings {
                total: Some(total.as_millis() as u64),
                first_byte: Some(first_byte.as_millis() as u64),
                download: Some(total.saturating_sub(first_byte).as_millis() as u64),
                ..Default::default()
            }),
        };
        tracing::debug!(status, url = %info.url, elapsed_ms = total.as_millis() as u64, "response received");

        for capture in spec.capture.as_slice() {
            let value = capture_value(capture, &response)?;
            bus.publish(&TraceEvent {
                vu: context.vu,
                payload: Payload::HttpCapture {
                    step: index,
                    name: &capture.name,
                    value: &value,
                },
            });
            context.vars.insert(capture.name.clone(), value);
        }

        bus.publish(&TraceEvent {
            vu: context.vu,
            payload: Payload::HttpResponse {
                step: index,
                request: &info,
                response: &response,
                expect: spec.expect.as_slice(),
                vars: &context.vars,
            },
        });

        Ok(())
    }
}

#[async_trait]
impl Engine for HttpEngine {
    async fn execute(
        &self,
        scenario: &Scenario,
        context: &mut ExecutionContext,
        bus: &EventBus,
    ) -> Result<()> {
        let steps = Step::parse_flow(&scenario.flow)?;
        let name = scenario.name();
        tracing::debug!(
            scenario = name.as_deref().unwrap_or("<unnamed>"),
            steps = steps.len(),
            "executing scenario"
        );

        for (index, step) in steps.iter().enumerate() {
            match step {
                Step::Request { method, spec } => {
                    self.request(index, method, spec, context, bus).await?
                }
                Step::Think(pause) => {
                    tokio::time::sleep(*pause).await;
                }
                Step::Log(message) => {
                    println!("{}", template::render(message, &context.vars));
                }
            }
        }

        Ok(())
    }
}

/// Builds [`HttpEngine`]s with shared HTTP settings
#[derive(Debug, Clone, Default)]
pub struct HttpEngineFactory {
    http: HttpConfig,
}

impl HttpEngineFactory {
    pub fn new(http: HttpConfig) -> Self {
        Self { http }
    }
}

impl EngineFactory for HttpEngineFactory {
    fn create(&self, script: &CanonicalScript) -> Result<Box<dyn super::Engine>> {
        Ok(Box::new(HttpEngine::new(&script.config.target, &self.http)?))
    }
}

fn render_headers(
    headers: &BTreeMap<String, serde_json::Value>,
    vars: &Vars,
) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = template::render_value(value, vars);
            (name.clone(), template::display(&value))
        })
        .collect()
}

fn capture_value(capture: &CaptureSpec, response: &HttpResponse) -> Result<serde_json::Value> {
    if let Some(path) = &capture.json {
        let body = response
            .json
            .as_ref()
            .ok_or_else(|| Error::capture_failed(&capture.name, "response body is not JSON"))?;
        return template::lookup(body, path)
            .cloned()
            .ok_or_else(|| Error::capture_failed(&capture.name, format!("{} not found", path)));
    }

    if let Some(header) = &capture.header {
        return response
            .header(header)
            .map(|v| serde_json::Value::String(v.to_string()))
            .ok_or_else(|| {
                Error::capture_failed(&capture.name, format!("header '{}' not present", header))
            });
    }

    Err(Error::capture_failed(
        &capture.name,
        "capture needs a 'json' or 'header' source",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine(target: &str) -> HttpEngine {
        HttpEngine::new(target, &HttpConfig::default()).unwrap()
    }

    #[test]
    fn test_resolve_url() {
        let engine = engine("http://api.test/");
        assert_eq!(engine.resolve_url("/pets"), "http://api.test/pets");
        assert_eq!(engine.resolve_url("pets"), "http://api.test/pets");
        assert_eq!(engine.resolve_url(""), "http://api.test");
        assert_eq!(
            engine.resolve_url("https://other.test/x"),
            "https://other.test/x"
        );
    }

    #[test]
    fn test_capture_sources() {
        let mut response = HttpResponse {
            status: 200,
            json: Some(json!({ "id": 7, "tags": ["a"] })),
            ..Default::default()
        };
        response.headers.insert("etag".into(), "\"v1\"".into());

        let by_json = CaptureSpec {
            json: Some("$.tags[0]".into()),
            header: None,
            name: "tag".into(),
        };
        assert_eq!(capture_value(&by_json, &response).unwrap(), json!("a"));

        let by_header = CaptureSpec {
            json: None,
            header: Some("ETag".into()),
            name: "etag".into(),
        };
        assert_eq!(capture_value(&by_header, &response).unwrap(), json!("\"v1\""));

        let missing = CaptureSpec {
            json: Some("$.nope".into()),
            header: None,
            name: "nope".into(),
        };
        assert!(matches!(
            capture_value(&missing, &response),
            Err(Error::CaptureFailed { .. })
        ));
    }
}

//! Response expectations
//!
//! Steps declare `expect` clauses; the plugin evaluates them after every
//! response and the evaluator prints the outcome.

mod evaluator;
mod plugin;

pub use evaluator::{render_expectations, render_timings, Evaluator};
pub use plugin::ExpectPlugin;

use serde::Serialize;
use serde_json::Value;
use serde_yaml::Value as Yaml;

use crate::template;
use crate::trace::{HttpResponse, Vars};

/// One assertion outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectationResult {
    /// Clause type, e.g. `statusCode`
    #[serde(rename = "type")]
    pub kind: String,
    pub expected: String,
    pub got: String,
    pub ok: bool,
}

/// A parsed `expect` clause
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    StatusCode(Vec<u16>),
    NotStatusCode(Vec<u16>),
    /// `json` is shorthand for `application/json`; anything else is a substring
    ContentType(String),
    HasHeader(String),
    HeaderEquals(String, String),
    HasProperty(String),
    NotHasProperty(String),
    /// All (templated) values must be equal
    Equals(Vec<Value>),
    /// Clause the plugin does not understand; always fails
    Unknown(String),
}

impl Expectation {
    /// Parse a single-key clause such as `statusCode: 200`
    pub fn parse(clause: &Yaml) -> Self {
        let Some((key, value)) = clause
            .as_mapping()
            .filter(|m| m.len() == 1)
            .and_then(|m| m.iter().next())
        else {
            return Expectation::Unknown(describe(clause));
        };

        let Some(key) = key.as_str() else {
            return Expectation::Unknown(describe(clause));
        };

        let parsed = match key {
            "statusCode" => status_codes(value).map(Expectation::StatusCode),
            "notStatusCode" => status_codes(value).map(Expectation::NotStatusCode),
            "contentType" => scalar(value).map(Expectation::ContentType),
            "hasHeader" => scalar(value).map(Expectation::HasHeader),
            "headerEquals" => match value.as_sequence().map(|s| s.as_slice()) {
                Some([name, expected]) => scalar(name)
                    .zip(scalar(expected))
                    .map(|(n, v)| Expectation::HeaderEquals(n, v)),
                _ => None,
            },
            "hasProperty" => scalar(value).map(Expectation::HasProperty),
            "notHasProperty" => scalar(value).map(Expectation::NotHasProperty),
            "equals" => value
                .as_sequence()
                .filter(|s| s.len() >= 2)
                .and_then(|s| {
                    s.iter()
                        .map(|v| serde_json::to_value(v).ok())
                        .collect::<Option<Vec<_>>>()
                })
                .map(Expectation::Equals),
            _ => None,
        };

        parsed.unwrap_or_else(|| Expectation::Unknown(key.to_string()))
    }

    /// Clause type name
    pub fn kind(&self) -> &str {
        match self {
            Expectation::StatusCode(_) => "statusCode",
            Expectation::NotStatusCode(_) => "notStatusCode",
            Expectation::ContentType(_) => "contentType",
            Expectation::HasHeader(_) => "hasHeader",
            Expectation::HeaderEquals(..) => "headerEquals",
            Expectation::HasProperty(_) => "hasProperty",
            Expectation::NotHasProperty(_) => "notHasProperty",
            Expectation::Equals(_) => "equals",
            Expectation::Unknown(name) => name.as_str(),
        }
    }

    /// Evaluate against a response
    pub fn evaluate(&self, response: &HttpResponse, vars: &Vars) -> ExpectationResult {
        let (expected, got, ok) = match self {
            Expectation::StatusCode(codes) => (
                join_codes(codes),
                response.status.to_string(),
                codes.contains(&response.status),
            ),
            Expectation::NotStatusCode(codes) => (
                format!("not {}", join_codes(codes)),
                response.status.to_string(),
                !codes.contains(&response.status),
            ),
            Expectation::ContentType(wanted) => {
                let got = response.header("content-type").unwrap_or_default();
                let needle = if wanted == "json" {
                    "application/json"
                } else {
                    wanted.as_str()
                };
                (wanted.clone(), got.to_string(), got.contains(needle))
            }
            Expectation::HasHeader(name) => {
                let got = response.header(name);
                (
                    name.clone(),
                    got.unwrap_or("<absent>").to_string(),
                    got.is_some(),
                )
            }
            Expectation::HeaderEquals(name, wanted) => {
                let wanted = template::render(wanted, vars);
                let got = response.header(name).unwrap_or_default().to_string();
                let ok = got == wanted;
                (format!("{}: {}", name, wanted), got, ok)
            }
            Expectation::HasProperty(path) => {
                let found = response.json.as_ref().and_then(|b| template::lookup(b, path));
                (
                    path.clone(),
                    found.map_or("<absent>".to_string(), template::display),
                    found.is_some(),
                )
            }
            Expectation::NotHasProperty(path) => {
                let found = response.json.as_ref().and_then(|b| template::lookup(b, path));
                (
                    format!("no {}", path),
                    found.map_or("<absent>".to_string(), template::display),
                    found.is_none(),
                )
            }
            Expectation::Equals(values) => {
                let rendered: Vec<String> = values
                    .iter()
                    .map(|v| template::display(&template::render_value(v, vars)))
                    .collect();
                let ok = rendered.windows(2).all(|w| w[0] == w[1]);
                let expected = rendered.first().cloned().unwrap_or_default();
                let got = rendered.get(1..).map(|r| r.join(", ")).unwrap_or_default();
                (expected, got, ok)
            }
            Expectation::Unknown(_) => (
                "a supported expectation".to_string(),
                "unknown expectation".to_string(),
                false,
            ),
        };

        ExpectationResult {
            kind: self.kind().to_string(),
            expected,
            got,
            ok,
        }
    }
}

fn describe(value: &Yaml) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "<unreadable>".to_string())
}

fn scalar(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn status_code(value: &Yaml) -> Option<u16> {
    match value {
        Yaml::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Yaml::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn status_codes(value: &Yaml) -> Option<Vec<u16>> {
    match value {
        Yaml::Sequence(items) => items.iter().map(status_code).collect(),
        single => status_code(single).map(|c| vec![c]),
    }
}

fn join_codes(codes: &[u16]) -> String {
    codes
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clause(yaml: &str) -> Expectation {
        Expectation::parse(&serde_yaml::from_str(yaml).unwrap())
    }

    fn response() -> HttpResponse {
        let mut response = HttpResponse {
            status: 201,
            body: r#"{"id":"p-1","owner":{"name":"ada"}}"#.to_string(),
            json: Some(json!({ "id": "p-1", "owner": { "name": "ada" } })),
            ..Default::default()
        };
        response
            .headers
            .insert("content-type".into(), "application/json; charset=utf-8".into());
        response.headers.insert("x-request-id".into(), "abc".into());
        response
    }

    #[test]
    fn test_parse_clauses() {
        assert_eq!(clause("statusCode: 200"), Expectation::StatusCode(vec![200]));
        assert_eq!(
            clause("statusCode: [200, '204']"),
            Expectation::StatusCode(vec![200, 204])
        );
        assert_eq!(clause("contentType: json"), Expectation::ContentType("json".into()));
        assert_eq!(
            clause("headerEquals: [x-request-id, abc]"),
            Expectation::HeaderEquals("x-request-id".into(), "abc".into())
        );
        assert_eq!(clause("matchesRegexp: .*"), Expectation::Unknown("matchesRegexp".into()));
        assert!(matches!(clause("- statusCode: 200"), Expectation::Unknown(_)));
    }

    #[test]
    fn test_status_code() {
        let vars = Vars::new();
        let result = clause("statusCode: [200, 201]").evaluate(&response(), &vars);
        assert!(result.ok);
        assert_eq!(result.expected, "200 or 201");
        assert_eq!(result.got, "201");

        let result = clause("statusCode: 200").evaluate(&response(), &vars);
        assert!(!result.ok);
        assert!(clause("notStatusCode: 500").evaluate(&response(), &vars).ok);
    }

    #[test]
    fn test_headers_and_content_type() {
        let vars = Vars::new();
        assert!(clause("contentType: json").evaluate(&response(), &vars).ok);
        assert!(!clause("contentType: text/html").evaluate(&response(), &vars).ok);
        assert!(clause("hasHeader: X-Request-Id").evaluate(&response(), &vars).ok);
        assert!(!clause("hasHeader: etag").evaluate(&response(), &vars).ok);
        assert!(clause("headerEquals: [x-request-id, abc]")
            .evaluate(&response(), &vars)
            .ok);
    }

    #[test]
    fn test_properties() {
        let vars = Vars::new();
        let result = clause("hasProperty: owner.name").evaluate(&response(), &vars);
        assert!(result.ok);
        assert_eq!(result.got, "ada");
        assert!(!clause("hasProperty: owner.age").evaluate(&response(), &vars).ok);
        assert!(clause("notHasProperty: deleted").evaluate(&response(), &vars).ok);
    }

    #[test]
    fn test_equals_uses_vars() {
        let mut vars = Vars::new();
        vars.insert("petId".into(), json!("p-1"));
        let result = clause("equals: ['{{ petId }}', 'p-1']").evaluate(&response(), &vars);
        assert!(result.ok);
        let result = clause("equals: ['{{ petId }}', 'p-2']").evaluate(&response(), &vars);
        assert!(!result.ok);
        assert_eq!(result.got, "p-2");
    }

    #[test]
    fn test_unknown_always_fails() {
        let result = clause("matchesRegexp: .*").evaluate(&response(), &Vars::new());
        assert!(!result.ok);
        assert_eq!(result.kind, "matchesRegexp");
    }
}

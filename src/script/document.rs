//! On-disk flow documents
//!
//! A flow file holds either a classic script (a single document with
//! `config` and `scenarios`) or a scenario file (a header document followed
//! by the flow body). The shape is resolved once, when the documents are
//! decoded.

use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::common::{Error, Result};

/// A flow file, decoded into one of the two accepted shapes
#[derive(Debug)]
pub enum FlowDocument {
    /// Classic script: config and scenarios in one document
    Classic(ClassicScript),
    /// Scenario file: metadata header plus a flow document
    Scenario {
        header: ScenarioHeader,
        /// The second document, kept verbatim
        flow: Value,
    },
}

/// A classic script document
#[derive(Deserialize, Debug)]
pub struct ClassicScript {
    #[serde(default)]
    pub config: ClassicConfig,
    /// Only the first entry is ever run
    pub scenarios: Vec<Value>,
    #[serde(default)]
    pub http: HttpOptions,
}

/// The subset of a classic `config` block the runner reads
#[derive(Deserialize, Debug, Default)]
pub struct ClassicConfig {
    #[serde(default, deserialize_with = "optional_scalar")]
    pub target: Option<String>,
}

/// Header document of a scenario file
#[derive(Deserialize, Debug)]
pub struct ScenarioHeader {
    /// Scenario name
    #[serde(default, deserialize_with = "optional_scalar")]
    pub name: Option<String>,
    /// Base URL requests are sent to
    #[serde(default, deserialize_with = "optional_scalar")]
    pub target: Option<String>,
    #[serde(default)]
    pub http: HttpOptions,
}

/// Per-file HTTP display options
#[derive(Deserialize, Debug, Default, Clone, Copy)]
pub struct HttpOptions {
    /// Print timing phases for each response
    #[serde(default)]
    pub timings: bool,
}

impl FlowDocument {
    /// Decode raw YAML documents into a flow document.
    ///
    /// The presence of a `scenarios` key in the first document selects the
    /// classic shape; anything else must be a header followed by a flow.
    pub fn decode(documents: Vec<Value>) -> Result<Self> {
        let mut documents = documents.into_iter();

        let first = documents
            .next()
            .ok_or_else(|| Error::UnrecognizedShape("file contains no documents".to_string()))?;

        let Value::Mapping(map) = &first else {
            return Err(Error::UnrecognizedShape(
                "first document must be a mapping".to_string(),
            ));
        };

        if map.contains_key("scenarios") {
            let script: ClassicScript = serde_yaml::from_value(first)
                .map_err(|e| Error::ConfigParse(format!("Invalid script: {}", e)))?;
            return Ok(FlowDocument::Classic(script));
        }

        let header: ScenarioHeader = serde_yaml::from_value(first)
            .map_err(|e| Error::ConfigParse(format!("Invalid scenario header: {}", e)))?;

        let flow = documents.next().ok_or_else(|| {
            Error::UnrecognizedShape(
                "expected a 'scenarios' list or a header followed by a flow document".to_string(),
            )
        })?;

        Ok(FlowDocument::Scenario { header, flow })
    }

    /// Per-file timing flag (`http.timings` in the first document)
    pub fn http(&self) -> HttpOptions {
        match self {
            FlowDocument::Classic(script) => script.http,
            FlowDocument::Scenario { header, .. } => header.http,
        }
    }
}

/// Text form of a scalar YAML value
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accept any scalar where a string is expected, e.g. `name: 2024`
fn optional_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_string(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a string, number or boolean")),
    }
}

/// Split YAML text into its documents
pub fn parse_documents(content: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse flow file: {}", e)))?;
        documents.push(value);
    }
    Ok(documents)
}

/// Load all YAML documents from a flow file
pub fn load_documents(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
    parse_documents(&content)
}

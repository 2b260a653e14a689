//! Canonical script construction
//!
//! Both document shapes are reduced to the same executable unit: a config
//! block with a resolved target and the expect plugin settings, and exactly
//! one scenario.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_yaml::{Mapping, Value};

use crate::common::{Error, Result};

use super::document::{scalar_string, FlowDocument, HttpOptions};

/// The normalized execution unit handed to the runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalScript {
    pub config: ScriptConfig,
    /// Serialized as a one-element `scenarios` list
    #[serde(rename = "scenarios", serialize_with = "single_scenario")]
    scenario: Scenario,
}

/// Script-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptConfig {
    /// Base URL, never empty
    pub target: String,
    pub plugins: Plugins,
    /// Timing output requested by the flow file itself
    #[serde(skip)]
    pub show_timings: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plugins {
    pub expect: ExpectSettings,
}

/// Settings for the expect plugin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectSettings {
    pub formatter: Formatter,
    /// Apply an implicit `statusCode: 200` to steps without expectations
    #[serde(rename = "expectDefault200")]
    pub expect_default_200: bool,
}

impl Default for ExpectSettings {
    fn default() -> Self {
        Self {
            formatter: Formatter::Silent,
            expect_default_200: true,
        }
    }
}

/// How the plugin itself reports results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Formatter {
    /// The plugin prints nothing; the console printer renders results
    Silent,
}

/// One scenario entry, kept as written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Ordered steps, decoded by the engine
    pub flow: Value,
    /// Every other key of the entry (`name`, `weight`, hooks)
    #[serde(flatten)]
    pub fields: Mapping,
}

impl Scenario {
    /// Build a scenario from a flow body and an optional name
    pub fn new(name: Option<String>, flow: Value) -> Self {
        let mut fields = Mapping::new();
        if let Some(name) = name {
            fields.insert(Value::from("name"), Value::from(name));
        }
        Self { flow, fields }
    }

    /// Scenario name, with numeric and boolean names rendered as text
    pub fn name(&self) -> Option<String> {
        self.fields.get("name").and_then(scalar_string)
    }
}

impl CanonicalScript {
    pub fn new(config: ScriptConfig, scenario: Scenario) -> Self {
        Self { config, scenario }
    }

    /// The single scenario this script runs
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// All scenarios; always exactly one
    pub fn scenarios(&self) -> &[Scenario] {
        std::slice::from_ref(&self.scenario)
    }
}

fn single_scenario<S>(scenario: &Scenario, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(1))?;
    seq.serialize_element(scenario)?;
    seq.end()
}

/// Normalize raw YAML documents into a canonical script.
///
/// `default_target` is used when the documents do not name a target.
/// Fails before any collaborator is touched when the shape is not
/// recognized or no target can be resolved.
pub fn normalize(documents: Vec<Value>, default_target: Option<&str>) -> Result<CanonicalScript> {
    let document = FlowDocument::decode(documents)?;
    let HttpOptions { timings } = document.http();

    let (target, scenario) = match document {
        FlowDocument::Classic(script) => {
            let first = script.scenarios.into_iter().next().ok_or_else(|| {
                Error::UnrecognizedShape("'scenarios' list is empty".to_string())
            })?;
            if first.get("flow").is_none() {
                return Err(Error::UnrecognizedShape(
                    "first scenario has no 'flow'".to_string(),
                ));
            }
            let scenario: Scenario = serde_yaml::from_value(first)
                .map_err(|e| Error::ConfigParse(format!("Invalid scenario: {}", e)))?;
            (script.config.target, scenario)
        }
        FlowDocument::Scenario { header, flow } => {
            (header.target, Scenario::new(header.name, flow))
        }
    };

    let target = resolve_target(target.as_deref(), default_target)?;

    Ok(CanonicalScript::new(
        ScriptConfig {
            target,
            plugins: Plugins {
                expect: ExpectSettings::default(),
            },
            show_timings: timings,
        },
        scenario,
    ))
}

fn resolve_target(declared: Option<&str>, fallback: Option<&str>) -> Result<String> {
    let target = declared
        .filter(|t| !t.trim().is_empty())
        .or(fallback.filter(|t| !t.trim().is_empty()))
        .ok_or(Error::MissingTarget)?
        .trim();

    reqwest::Url::parse(target)
        .map_err(|e| Error::Config(format!("Invalid target '{}': {}", target, e)))?;

    Ok(target.to_string())
}

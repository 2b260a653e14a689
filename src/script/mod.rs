//! Flow files and the canonical script
//!
//! Reads YAML flow files and normalizes them into the single-scenario
//! script the virtual user runtime executes.

mod document;
mod normalize;

pub use document::{load_documents, parse_documents, FlowDocument, HttpOptions};
pub use normalize::{
    normalize, CanonicalScript, ExpectSettings, Formatter, Plugins, Scenario, ScriptConfig,
};

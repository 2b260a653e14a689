//! skytrace - single-flow HTTP scenario runner
//!
//! Normalizes a YAML flow into a canonical script, runs it as one virtual
//! user against an HTTP engine, and reports expectation results through a
//! synchronous event bus. Reload mode reruns the flow whenever its file
//! changes.

pub mod cli;
pub mod commands;
pub mod common;
pub mod console;
pub mod engine;
pub mod expect;
pub mod flow;
pub mod reload;
pub mod script;
pub mod template;
pub mod trace;
pub mod vu;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use flow::{Flow, FlowOptions};
pub use script::{normalize, CanonicalScript};
pub use trace::{EventBus, EventKind, TraceEvent};
pub use vu::{ExecutionContext, RunContext};

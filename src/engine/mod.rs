//! HTTP engine interface
//!
//! The runtime only sees these traits. [`HttpEngine`] is the default
//! implementation; tests plug in their own.

mod http;
mod step;

pub use http::{HttpEngine, HttpEngineFactory};
pub use step::{CaptureSpec, OneOrMany, RequestSpec, Step};

use async_trait::async_trait;

use crate::common::Result;
use crate::script::{CanonicalScript, Scenario};
use crate::trace::EventBus;
use crate::vu::ExecutionContext;

/// Executes a scenario's steps
#[async_trait]
pub trait Engine: Send + Sync {
    /// Run every step of the scenario, publishing trace events on the bus.
    ///
    /// Captures are written into `context.vars`.
    async fn execute(
        &self,
        scenario: &Scenario,
        context: &mut ExecutionContext,
        bus: &EventBus,
    ) -> Result<()>;
}

/// Builds an engine for a canonical script
pub trait EngineFactory: Send + Sync {
    fn create(&self, script: &CanonicalScript) -> Result<Box<dyn Engine>>;
}

impl<F> EngineFactory for F
where
    F: Fn(&CanonicalScript) -> Result<Box<dyn Engine>> + Send + Sync,
{
    fn create(&self, script: &CanonicalScript) -> Result<Box<dyn Engine>> {
        self(script)
    }
}

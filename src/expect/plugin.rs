//! Expect plugin
//!
//! Listens for responses on the bus, evaluates the step's `expect` clauses
//! and publishes the outcomes.

use crate::script::ExpectSettings;
use crate::trace::{EventBus, EventKind, Payload, TraceEvent};

use super::{Expectation, ExpectationResult};

/// Evaluates expectations for every response
#[derive(Debug, Clone)]
pub struct ExpectPlugin {
    settings: ExpectSettings,
}

impl ExpectPlugin {
    /// Create the plugin and subscribe it to responses
    pub fn register(settings: &ExpectSettings, bus: &mut EventBus) -> Self {
        let plugin = Self {
            settings: settings.clone(),
        };

        let handler = plugin.clone();
        bus.on(EventKind::HttpResponse, move |event, bus| {
            handler.on_response(event, bus)
        });

        plugin
    }

    /// Clauses that apply to a step
    pub fn expectations(&self, clauses: &[serde_yaml::Value]) -> Vec<Expectation> {
        if clauses.is_empty() && self.settings.expect_default_200 {
            return vec![Expectation::StatusCode(vec![200])];
        }
        clauses.iter().map(Expectation::parse).collect()
    }

    fn on_response(&self, event: &TraceEvent<'_>, bus: &EventBus) {
        let Payload::HttpResponse {
            request,
            response,
            expect,
            vars,
            ..
        } = event.payload
        else {
            return;
        };

        let results: Vec<ExpectationResult> = self
            .expectations(expect)
            .iter()
            .map(|e| e.evaluate(response, vars))
            .collect();

        if results.is_empty() {
            return;
        }

        for result in &results {
            tracing::debug!(
                kind = %result.kind,
                ok = result.ok,
                "expectation evaluated"
            );
            bus.publish(&TraceEvent {
                vu: event.vu,
                payload: Payload::ExpectationResult(result),
            });
        }

        bus.publish(&TraceEvent {
            vu: event.vu,
            payload: Payload::Expectations {
                results: &results,
                request,
                response,
                vars,
            },
        });
    }
}

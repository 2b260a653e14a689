//! Virtual user runtime
//!
//! Seeds a fresh execution context, hands the scenario to the engine and
//! waits for it to finish. Engine failures are always published as an
//! `error` event; what happens next is decided by [`OnRunError`].

use serde_json::Value;
use uuid::Uuid;

use crate::common::config::OnRunError;
use crate::common::Result;
use crate::engine::EngineFactory;
use crate::script::CanonicalScript;
use crate::trace::{EventBus, Payload, TraceEvent, Vars};

/// Process-wide run state, created once at startup
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Identifier shared by every run of this process
    pub test_run_id: String,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            test_run_id: Uuid::new_v4().simple().to_string(),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-run mutable state, owned by one virtual user
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Correlation id for this run's trace events
    pub vu: Uuid,
    pub vars: Vars,
}

impl ExecutionContext {
    /// Seed vars with the target, an environment snapshot and the run id
    pub fn seed(target: &str, run: &RunContext) -> Self {
        let environment: serde_json::Map<String, Value> = std::env::vars()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();

        let mut vars = Vars::new();
        vars.insert("target".into(), Value::String(target.to_string()));
        vars.insert("$processEnvironment".into(), Value::Object(environment.clone()));
        vars.insert("$env".into(), Value::Object(environment));
        vars.insert("$testRunId".into(), Value::String(run.test_run_id.clone()));

        Self {
            vu: Uuid::new_v4(),
            vars,
        }
    }
}

/// Run the script's scenario once.
///
/// Returns the final context on success. On failure the error is published
/// on the bus and then logged, dropped, or returned according to `policy`;
/// `Ok(None)` means the run failed and the failure was absorbed.
pub async fn run(
    script: &CanonicalScript,
    engines: &dyn EngineFactory,
    bus: &EventBus,
    run: &RunContext,
    policy: OnRunError,
) -> Result<Option<ExecutionContext>> {
    let mut context = ExecutionContext::seed(&script.config.target, run);
    tracing::debug!(vu = %context.vu, target = %script.config.target, "starting virtual user");

    let outcome = match engines.create(script) {
        Ok(engine) => {
            engine
                .execute(script.scenario(), &mut context, bus)
                .await
        }
        Err(e) => Err(e),
    };

    let error = match outcome {
        Ok(()) => return Ok(Some(context)),
        Err(e) => e,
    };

    let message = error.to_string();
    bus.publish(&TraceEvent {
        vu: context.vu,
        payload: Payload::Error { message: &message },
    });

    match policy {
        OnRunError::Log => {
            tracing::warn!(vu = %context.vu, error = %error, "flow run failed");
            Ok(None)
        }
        OnRunError::Silent => Ok(None),
        OnRunError::Fail => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::engine::Engine;
    use crate::script::{normalize, parse_documents, Scenario};
    use crate::trace::EventKind;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct FailingEngine;

    #[async_trait]
    impl Engine for FailingEngine {
        async fn execute(
            &self,
            _scenario: &Scenario,
            _context: &mut ExecutionContext,
            _bus: &EventBus,
        ) -> Result<()> {
            Err(Error::capture_failed("id", "$.id not found"))
        }
    }

    struct CapturingEngine;

    #[async_trait]
    impl Engine for CapturingEngine {
        async fn execute(
            &self,
            _scenario: &Scenario,
            context: &mut ExecutionContext,
            _bus: &EventBus,
        ) -> Result<()> {
            context.vars.insert("token".into(), Value::String("t-1".into()));
            Ok(())
        }
    }

    fn script() -> CanonicalScript {
        normalize(
            parse_documents("target: http://x\n---\n- get:\n    url: /\n").unwrap(),
            None,
        )
        .unwrap()
    }

    fn failing(_: &CanonicalScript) -> Result<Box<dyn Engine>> {
        Ok(Box::new(FailingEngine))
    }

    fn capturing(_: &CanonicalScript) -> Result<Box<dyn Engine>> {
        Ok(Box::new(CapturingEngine))
    }

    fn error_sink(bus: &mut EventBus) -> Arc<Mutex<Vec<String>>> {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        bus.on(EventKind::Error, move |event, _| {
            if let Payload::Error { message } = event.payload {
                sink.lock().unwrap().push(message.to_string());
            }
        });
        errors
    }

    #[test]
    fn test_seeded_vars() {
        let run = RunContext::new();
        let context = ExecutionContext::seed("http://x", &run);
        assert_eq!(context.vars["target"], "http://x");
        assert_eq!(context.vars["$testRunId"], run.test_run_id.as_str());
        assert!(context.vars["$env"].is_object());
        assert!(context.vars["$processEnvironment"].is_object());
    }

    #[tokio::test]
    async fn test_success_returns_final_context() {
        let bus = EventBus::new();
        let context = run(&script(), &capturing, &bus, &RunContext::new(), OnRunError::Log)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(context.vars["token"], "t-1");
    }

    #[tokio::test]
    async fn test_failure_is_published_and_absorbed() {
        let mut bus = EventBus::new();
        let errors = error_sink(&mut bus);

        for policy in [OnRunError::Log, OnRunError::Silent] {
            let outcome = run(&script(), &failing, &bus, &RunContext::new(), policy)
                .await
                .unwrap();
            assert!(outcome.is_none());
        }

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Failed capture 'id'"));
    }

    #[tokio::test]
    async fn test_fail_policy_propagates() {
        let mut bus = EventBus::new();
        let errors = error_sink(&mut bus);

        let err = run(&script(), &failing, &bus, &RunContext::new(), OnRunError::Fail)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CaptureFailed { .. }));
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_each_run_gets_a_fresh_context() {
        let bus = EventBus::new();
        let ctx = RunContext::new();
        let first = run(&script(), &capturing, &bus, &ctx, OnRunError::Log)
            .await
            .unwrap()
            .unwrap();
        let second = run(&script(), &capturing, &bus, &ctx, OnRunError::Log)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(first.vu, second.vu);
        assert_eq!(first.vars["$testRunId"], second.vars["$testRunId"]);
    }
}

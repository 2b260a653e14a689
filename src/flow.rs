//! One pass over a flow file: load, normalize, wire observers, run

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;

use crate::common::config::OnRunError;
use crate::common::Result;
use crate::console;
use crate::engine::EngineFactory;
use crate::expect::ExpectPlugin;
use crate::reload::{FlowRunner, RunReason};
use crate::script;
use crate::trace::EventBus;
use crate::vu::{self, ExecutionContext, RunContext};

/// Options shared by every pass
#[derive(Debug, Clone, Default)]
pub struct FlowOptions {
    /// Fallback target when the file has none
    pub target: Option<String>,
    /// Print timing phases for each response
    pub show_timings: bool,
    pub on_error: OnRunError,
}

/// A flow file bound to an engine and the process run context
#[derive(Clone)]
pub struct Flow {
    path: PathBuf,
    options: FlowOptions,
    run: Arc<RunContext>,
    engines: Arc<dyn EngineFactory>,
}

impl Flow {
    pub fn new(
        path: impl Into<PathBuf>,
        options: FlowOptions,
        run: Arc<RunContext>,
        engines: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            path: path.into(),
            options,
            run,
            engines,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read the file, normalize it and run the scenario once.
    ///
    /// Configuration errors are returned before any request is made. The
    /// file is re-read on every call so edits to config take effect.
    pub async fn run_once(&self) -> Result<Option<ExecutionContext>> {
        let documents = script::load_documents(&self.path)?;
        let script = script::normalize(documents, self.options.target.as_deref())?;

        let mut bus = EventBus::new();
        let show_timings = self.options.show_timings || script.config.show_timings;
        console::attach(&mut bus, show_timings);
        ExpectPlugin::register(&script.config.plugins.expect, &mut bus);

        tracing::debug!(
            path = %self.path.display(),
            target = %script.config.target,
            "running flow"
        );

        vu::run(
            &script,
            self.engines.as_ref(),
            &bus,
            &self.run,
            self.options.on_error,
        )
        .await
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FlowRunner for Flow {
    async fn run(&self, reason: RunReason) -> Result<()> {
        if reason == RunReason::Changed {
            console::print_rerun_header();
        }

        let outcome = self.run_once().await;
        // Run errors were already printed from the bus
        if let Err(e) = &outcome {
            if e.is_config() {
                println!("  {} {}", "✗".red(), e.to_string().red());
            }
        }
        println!();
        outcome.map(|_| ())
    }
}

//! Console rendering of expectation outcomes

use std::fmt::Write as _;

use colored::Colorize;

use crate::trace::{EventBus, EventKind, HttpRequest, HttpResponse, Payload, Timings, Vars};

use super::ExpectationResult;

/// Prints expectation outcomes, and optionally response timings, as each
/// response is evaluated. Never fails the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    pub show_timings: bool,
}

impl Evaluator {
    pub fn new(show_timings: bool) -> Self {
        Self { show_timings }
    }

    /// Subscribe to batched expectation outcomes
    pub fn register(self, bus: &mut EventBus) {
        bus.on(EventKind::Expectations, move |event, _| {
            if let Payload::Expectations {
                results,
                request,
                response,
                vars,
            } = event.payload
            {
                self.on_expectations(results, request, response, vars);
            }
        });
    }

    pub fn on_expectations(
        &self,
        results: &[ExpectationResult],
        request: &HttpRequest,
        response: &HttpResponse,
        _vars: &Vars,
    ) {
        println!("{}", self.render(results, request, response));
    }

    /// Text printed for one response
    pub fn render(
        &self,
        results: &[ExpectationResult],
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> String {
        let mut out = render_expectations(results, request);

        if self.show_timings {
            if let Some(timings) = &response.timings {
                let _ = writeln!(out);
                let _ = writeln!(out, "  {}", render_timings(timings).dimmed());
            }
        }

        out
    }
}

/// Pretty format: the request line, then one line per expectation
pub fn render_expectations(results: &[ExpectationResult], request: &HttpRequest) -> String {
    let mut out = String::new();

    let title = match &request.name {
        Some(name) => format!("{} {} ({})", request.method, request.url, name),
        None => format!("{} {}", request.method, request.url),
    };
    let _ = writeln!(out, "{} {}", "*".cyan(), title.bold());

    for result in results {
        if result.ok {
            let _ = writeln!(
                out,
                "  {} {} {}",
                "✓".green(),
                result.kind,
                result.expected
            );
        } else {
            let _ = writeln!(
                out,
                "  {} {}: expected {}, got {}",
                "✗".red(),
                result.kind,
                result.expected,
                result.got
            );
        }
    }

    out
}

/// Phase breakdown line; absent phases render as `n/a`
pub fn render_timings(timings: &Timings) -> String {
    fn ms(phase: Option<u64>) -> String {
        phase.map_or_else(|| "n/a".to_string(), |v| v.to_string())
    }

    format!(
        "time: total={} | dns={} | tcp={} | ssl: {} | ttfb={} | download={}",
        ms(timings.total),
        ms(timings.dns),
        ms(timings.tcp),
        ms(timings.tls),
        ms(timings.first_byte),
        ms(timings.download),
    )
}

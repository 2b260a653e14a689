//! Console observers
//!
//! Turns trace events into terminal output. Expectation outcomes go through
//! the [`Evaluator`]; run errors are printed in red; everything else is
//! only visible with `RUST_LOG=skytrace=debug`.

use colored::Colorize;

use crate::expect::Evaluator;
use crate::trace::{EventBus, EventKind, Payload};

const BANNER: &str = "    ───━━━★
SKYTRACE ──━━★
      ──━━★";

/// Print the startup banner
pub fn print_banner() {
    println!("{}", BANNER.magenta().bold());
    println!();
}

/// Register the console printer and expectation evaluator on a bus
pub fn attach(bus: &mut EventBus, show_timings: bool) {
    bus.on(EventKind::Error, |event, _| {
        if let Payload::Error { message } = event.payload {
            println!("  {} {}", "✗".red(), message.red());
            println!();
        }
    });

    bus.on(EventKind::HttpRequest, |event, _| {
        if let Payload::HttpRequest { step, request } = event.payload {
            tracing::debug!(
                vu = %event.vu,
                step,
                method = %request.method,
                url = %request.url,
                "http request"
            );
        }
    });

    bus.on(EventKind::HttpResponse, |event, _| {
        if let Payload::HttpResponse { step, response, .. } = event.payload {
            tracing::debug!(vu = %event.vu, step, status = response.status, "http response");
        }
    });

    bus.on(EventKind::HttpCapture, |event, _| {
        if let Payload::HttpCapture { step, name, value } = event.payload {
            tracing::debug!(vu = %event.vu, step, name, value = %value, "captured");
        }
    });

    Evaluator::new(show_timings).register(bus);
}

/// Print the header shown before each rerun in reload mode
pub fn print_rerun_header() {
    println!();
    println!("  --------------");
    println!("{}", "> Rerunning flow".bold());
    println!("  {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string().dimmed());
    println!("  --------------");
}

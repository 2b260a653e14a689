//! Trace events and the bus that carries them

mod bus;
mod event;

pub use bus::EventBus;
pub use event::{EventKind, HttpRequest, HttpResponse, Payload, Timings, TraceEvent, Vars};

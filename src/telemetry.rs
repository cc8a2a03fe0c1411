//! Telemetry for admission decisions.
//!
//! The gate reports every decision as a [`ThrottleEvent`]. Events flow through
//! `TelemetrySink` implementations which can log, aggregate, or forward them to
//! external systems.
//!
//! # Telemetry Sinks
//!
//! The `TelemetrySink` trait defines how events are consumed. It's implemented
//! as a `tower::Service<ThrottleEvent>` for composability. Delivery is best-effort:
//! a sink that is not ready or fails never changes the admission decision.
//!
//! ```rust
//! use throttlegate::telemetry::{AdmissionOutcome, ThrottleEvent};
//!
//! let event = ThrottleEvent::new("1.2.3.4", "/api/users", AdmissionOutcome::Rejected);
//! assert!(!event.outcome.is_allowed());
//! assert_eq!(event.to_string(), "rejected client=1.2.3.4 path=/api/users");
//! ```

pub mod events;
pub mod sinks;

pub use events::{AdmissionOutcome, ThrottleEvent};
pub use sinks::{emit_best_effort, LogSink, MemorySink, NullSink, TelemetrySink};

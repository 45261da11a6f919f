//! Core data model for the SMS gateway.
//!
//! These are plain value types: nothing here owns a lock, a socket, or a
//! background task. Mutation rules (who owns a `Message` at a given point
//! in time, how `NodeTelemetry` is merged) live in the crates that hold the
//! actual storage (`gateway-queue`, `gateway-telemetry`, `gateway-dlo`).

mod dead_letter;
mod incident;
mod message;
mod priority;
mod telemetry;

pub use dead_letter::{DeadLetter, DeadLetterView};
pub use incident::{CorrectiveAction, Incident, Severity};
pub use message::{Message, MessageStatus, REDACTED_BODY};
pub use priority::Priority;
pub use telemetry::{NodeTelemetry, RSSI_UNKNOWN};

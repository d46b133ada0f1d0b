//! Dropsonde envelope types shared by the nozzle client and its tests.
//!
//! The firehose delivers each event as a protobuf-encoded [`Envelope`]. The
//! message layout mirrors the `events` package published by Cloud Foundry so
//! frames decode byte-for-byte; this crate owns that schema, the fixed table
//! of [`EventKind`] names and discriminants, and the compact text rendering
//! printed for every accepted envelope.

mod envelope;
mod error;
mod kind;
mod render;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use envelope::{
    ContainerMetric, CounterEvent, Envelope, Error, HttpStart, HttpStartStop, HttpStop,
    LogMessage, MessageType, Method, PeerType, Uuid, ValueMetric, decode,
};
pub use error::DecodeError;
pub use kind::EventKind;

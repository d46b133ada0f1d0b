//! Errors raised while decoding firehose frames.

use thiserror::Error;

/// Failure to turn one binary frame into an [`Envelope`](crate::Envelope).
///
/// A decode error only ever concerns a single frame; the stream carrying it
/// stays usable.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not a valid protobuf envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] prost::DecodeError),
    /// The frame decoded but names an event type outside the known table.
    #[error("unknown event type {0}")]
    UnknownEventType(i32),
}

//! Protobuf schema for dropsonde envelopes.
//!
//! Field numbers and types follow the published `events` protos (proto2), so
//! a frame produced by any firehose server decodes here unchanged. Payload
//! messages are plain data; nothing outside [`crate::render`] interprets them.

use std::collections::BTreeMap;

use prost::Message;
use strum::IntoStaticStr;

use crate::{DecodeError, EventKind};

/// One unit of telemetry delivered by the firehose.
#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    /// Component that emitted the event.
    #[prost(string, required, tag = "1")]
    pub origin: String,
    /// Discriminant selecting the payload below, see [`EventKind`].
    #[prost(enumeration = "EventKind", required, tag = "2")]
    pub event_type: i32,
    /// Emission time in nanoseconds since the epoch.
    #[prost(int64, optional, tag = "6")]
    pub timestamp: Option<i64>,
    /// BOSH deployment of the emitting job.
    #[prost(string, optional, tag = "13")]
    pub deployment: Option<String>,
    /// BOSH job name.
    #[prost(string, optional, tag = "14")]
    pub job: Option<String>,
    /// BOSH job index.
    #[prost(string, optional, tag = "15")]
    pub index: Option<String>,
    /// IP address of the emitting VM.
    #[prost(string, optional, tag = "16")]
    pub ip: Option<String>,
    /// Free-form tags attached by the emitter.
    #[prost(btree_map = "string, string", tag = "17")]
    pub tags: BTreeMap<String, String>,
    /// Payload for [`EventKind::HttpStart`].
    #[prost(message, optional, tag = "4")]
    pub http_start: Option<HttpStart>,
    /// Payload for [`EventKind::HttpStop`].
    #[prost(message, optional, tag = "5")]
    pub http_stop: Option<HttpStop>,
    /// Payload for [`EventKind::HttpStartStop`].
    #[prost(message, optional, tag = "7")]
    pub http_start_stop: Option<HttpStartStop>,
    /// Payload for [`EventKind::LogMessage`].
    #[prost(message, optional, tag = "8")]
    pub log_message: Option<LogMessage>,
    /// Payload for [`EventKind::ValueMetric`].
    #[prost(message, optional, tag = "9")]
    pub value_metric: Option<ValueMetric>,
    /// Payload for [`EventKind::CounterEvent`].
    #[prost(message, optional, tag = "10")]
    pub counter_event: Option<CounterEvent>,
    /// Payload for [`EventKind::Error`].
    #[prost(message, optional, tag = "11")]
    pub error: Option<Error>,
    /// Payload for [`EventKind::ContainerMetric`].
    #[prost(message, optional, tag = "12")]
    pub container_metric: Option<ContainerMetric>,
}

impl Envelope {
    /// Creates an envelope of the given kind with no payload attached.
    #[must_use]
    pub fn new(origin: impl Into<String>, kind: EventKind) -> Self {
        Self {
            origin: origin.into(),
            event_type: kind.numeral(),
            ..Self::default()
        }
    }

    /// The envelope's event kind.
    ///
    /// Envelopes obtained from [`decode`] always carry a known kind; for a
    /// hand-built envelope with an unknown discriminant the first kind in the
    /// table is reported.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        EventKind::try_from(self.event_type).unwrap_or_default()
    }
}

/// Decodes one binary frame into an [`Envelope`].
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] when the bytes are not a valid envelope
/// and [`DecodeError::UnknownEventType`] when the discriminant is outside the
/// [`EventKind`] table.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let envelope = Envelope::decode(bytes)?;
    if EventKind::from_numeral(envelope.event_type).is_none() {
        return Err(DecodeError::UnknownEventType(envelope.event_type));
    }
    Ok(envelope)
}

/// 128-bit identifier split into two little-endian halves.
#[derive(Clone, Copy, PartialEq, Eq, Message)]
pub struct Uuid {
    /// Low 64 bits.
    #[prost(uint64, required, tag = "1")]
    pub low: u64,
    /// High 64 bits.
    #[prost(uint64, required, tag = "2")]
    pub high: u64,
}

/// Which side of an HTTP exchange emitted the event.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, IntoStaticStr,
)]
#[repr(i32)]
pub enum PeerType {
    /// The request was made by the emitter.
    Client = 1,
    /// The request was served by the emitter.
    Server = 2,
}

/// HTTP request method.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, IntoStaticStr,
)]
#[repr(i32)]
pub enum Method {
    /// `GET`
    #[strum(serialize = "GET")]
    Get = 1,
    /// `POST`
    #[strum(serialize = "POST")]
    Post = 2,
    /// `PUT`
    #[strum(serialize = "PUT")]
    Put = 3,
    /// `DELETE`
    #[strum(serialize = "DELETE")]
    Delete = 4,
    /// `HEAD`
    #[strum(serialize = "HEAD")]
    Head = 5,
}

/// Output stream a log line was written to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, IntoStaticStr,
)]
#[repr(i32)]
pub enum MessageType {
    /// Standard output.
    #[strum(serialize = "OUT")]
    Out = 1,
    /// Standard error.
    #[strum(serialize = "ERR")]
    Err = 2,
}

/// Start of an HTTP request.
#[derive(Clone, PartialEq, Message)]
pub struct HttpStart {
    /// Request start in nanoseconds since the epoch.
    #[prost(int64, required, tag = "1")]
    pub timestamp: i64,
    /// Request identifier.
    #[prost(message, optional, tag = "2")]
    pub request_id: Option<Uuid>,
    /// Emitting side, see [`PeerType`].
    #[prost(enumeration = "PeerType", required, tag = "3")]
    pub peer_type: i32,
    /// Request method, see [`Method`].
    #[prost(enumeration = "Method", required, tag = "4")]
    pub method: i32,
    /// Requested URI.
    #[prost(string, required, tag = "5")]
    pub uri: String,
    /// Address of the requesting party.
    #[prost(string, required, tag = "6")]
    pub remote_address: String,
    /// User agent reported by the client.
    #[prost(string, required, tag = "7")]
    pub user_agent: String,
    /// Identifier of the enclosing request, when nested.
    #[prost(message, optional, tag = "8")]
    pub parent_request_id: Option<Uuid>,
    /// Application that served the request.
    #[prost(message, optional, tag = "9")]
    pub application_id: Option<Uuid>,
    /// Instance index of the serving application.
    #[prost(int32, optional, tag = "10")]
    pub instance_index: Option<i32>,
    /// Instance identifier of the serving application.
    #[prost(string, optional, tag = "11")]
    pub instance_id: Option<String>,
}

/// End of an HTTP request.
#[derive(Clone, PartialEq, Message)]
pub struct HttpStop {
    /// Request end in nanoseconds since the epoch.
    #[prost(int64, required, tag = "1")]
    pub timestamp: i64,
    /// Requested URI.
    #[prost(string, required, tag = "2")]
    pub uri: String,
    /// Request identifier.
    #[prost(message, optional, tag = "3")]
    pub request_id: Option<Uuid>,
    /// Emitting side, see [`PeerType`].
    #[prost(enumeration = "PeerType", required, tag = "4")]
    pub peer_type: i32,
    /// Response status code.
    #[prost(int32, required, tag = "5")]
    pub status_code: i32,
    /// Response body length in bytes.
    #[prost(int64, required, tag = "6")]
    pub content_length: i64,
    /// Application that served the request.
    #[prost(message, optional, tag = "7")]
    pub application_id: Option<Uuid>,
}

/// A complete HTTP request/response pair.
#[derive(Clone, PartialEq, Message)]
pub struct HttpStartStop {
    /// Request start in nanoseconds since the epoch.
    #[prost(int64, required, tag = "1")]
    pub start_timestamp: i64,
    /// Request end in nanoseconds since the epoch.
    #[prost(int64, required, tag = "2")]
    pub stop_timestamp: i64,
    /// Request identifier.
    #[prost(message, optional, tag = "3")]
    pub request_id: Option<Uuid>,
    /// Emitting side, see [`PeerType`].
    #[prost(enumeration = "PeerType", required, tag = "4")]
    pub peer_type: i32,
    /// Request method, see [`Method`].
    #[prost(enumeration = "Method", required, tag = "5")]
    pub method: i32,
    /// Requested URI.
    #[prost(string, required, tag = "6")]
    pub uri: String,
    /// Address of the requesting party.
    #[prost(string, required, tag = "7")]
    pub remote_address: String,
    /// User agent reported by the client.
    #[prost(string, required, tag = "8")]
    pub user_agent: String,
    /// Response status code.
    #[prost(int32, required, tag = "9")]
    pub status_code: i32,
    /// Response body length in bytes.
    #[prost(int64, required, tag = "10")]
    pub content_length: i64,
    /// Application that served the request.
    #[prost(message, optional, tag = "12")]
    pub application_id: Option<Uuid>,
    /// Instance index of the serving application.
    #[prost(int32, optional, tag = "13")]
    pub instance_index: Option<i32>,
    /// Instance identifier of the serving application.
    #[prost(string, optional, tag = "14")]
    pub instance_id: Option<String>,
    /// `X-Forwarded-For` chain.
    #[prost(string, repeated, tag = "15")]
    pub forwarded: Vec<String>,
}

/// A line of log output.
#[derive(Clone, PartialEq, Message)]
pub struct LogMessage {
    /// Raw log bytes; not guaranteed to be UTF-8.
    #[prost(bytes = "vec", required, tag = "1")]
    pub message: Vec<u8>,
    /// Stream the line was written to, see [`MessageType`].
    #[prost(enumeration = "MessageType", required, tag = "2")]
    pub message_type: i32,
    /// Time the line was written, in nanoseconds since the epoch.
    #[prost(int64, required, tag = "3")]
    pub timestamp: i64,
    /// Application the line belongs to.
    #[prost(string, optional, tag = "4")]
    pub app_id: Option<String>,
    /// Source category, for example `APP` or `RTR`.
    #[prost(string, optional, tag = "5")]
    pub source_type: Option<String>,
    /// Instance of the source.
    #[prost(string, optional, tag = "6")]
    pub source_instance: Option<String>,
}

/// A named gauge reading.
#[derive(Clone, PartialEq, Message)]
pub struct ValueMetric {
    /// Metric name.
    #[prost(string, required, tag = "1")]
    pub name: String,
    /// Reading.
    #[prost(double, required, tag = "2")]
    pub value: f64,
    /// Unit of the reading.
    #[prost(string, required, tag = "3")]
    pub unit: String,
}

/// An increment to a named counter.
#[derive(Clone, PartialEq, Message)]
pub struct CounterEvent {
    /// Counter name.
    #[prost(string, required, tag = "1")]
    pub name: String,
    /// Amount added since the previous event.
    #[prost(uint64, required, tag = "2")]
    pub delta: u64,
    /// Running total, when the emitter tracks one.
    #[prost(uint64, optional, tag = "3")]
    pub total: Option<u64>,
}

/// An error reported by a platform component.
#[derive(Clone, PartialEq, Message)]
pub struct Error {
    /// Component reporting the error.
    #[prost(string, required, tag = "1")]
    pub source: String,
    /// Numeric error code.
    #[prost(int32, required, tag = "2")]
    pub code: i32,
    /// Human-readable description.
    #[prost(string, required, tag = "3")]
    pub message: String,
}

/// Resource usage of one application instance.
#[derive(Clone, PartialEq, Message)]
pub struct ContainerMetric {
    /// Application identifier.
    #[prost(string, required, tag = "1")]
    pub application_id: String,
    /// Instance index.
    #[prost(int32, required, tag = "2")]
    pub instance_index: i32,
    /// CPU usage as a percentage of one core.
    #[prost(double, required, tag = "3")]
    pub cpu_percentage: f64,
    /// Resident memory in bytes.
    #[prost(uint64, required, tag = "4")]
    pub memory_bytes: u64,
    /// Disk usage in bytes.
    #[prost(uint64, required, tag = "5")]
    pub disk_bytes: u64,
    /// Memory quota in bytes.
    #[prost(uint64, optional, tag = "6")]
    pub memory_bytes_quota: Option<u64>,
    /// Disk quota in bytes.
    #[prost(uint64, optional, tag = "7")]
    pub disk_bytes_quota: Option<u64>,
}

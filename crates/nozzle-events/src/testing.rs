//! Canned envelopes for tests across the workspace.
//!
//! Each builder fills the payload for one kind with deterministic values so
//! assertions can match on exact rendered substrings.

use crate::{
    ContainerMetric, CounterEvent, Envelope, Error, EventKind, HttpStart, HttpStartStop, HttpStop,
    LogMessage, MessageType, Method, PeerType, Uuid, ValueMetric,
};

/// Timestamp stamped on every sample envelope.
pub const SAMPLE_TIMESTAMP: i64 = 1_000_000_000;

const SAMPLE_REQUEST_ID: Uuid = Uuid { low: 1, high: 2 };

/// Builds an envelope of `kind` whose payload carries `text` in its most
/// descriptive field.
#[must_use]
pub fn sample_envelope(kind: EventKind, text: &str) -> Envelope {
    let mut envelope = Envelope::new("origin", kind);
    envelope.timestamp = Some(SAMPLE_TIMESTAMP);
    envelope.deployment = Some(String::from("deployment-name"));
    envelope.job = Some(String::from("doppler"));
    match kind {
        EventKind::HttpStart => {
            envelope.http_start = Some(HttpStart {
                timestamp: 12,
                request_id: Some(SAMPLE_REQUEST_ID),
                peer_type: PeerType::Client.into(),
                method: Method::Get.into(),
                uri: String::from("http://start.example.com"),
                remote_address: String::from("127.0.0.1"),
                user_agent: text.to_owned(),
                ..HttpStart::default()
            });
        }
        EventKind::HttpStop => {
            envelope.http_stop = Some(HttpStop {
                timestamp: 12,
                uri: String::from("http://stop.example.com"),
                request_id: Some(SAMPLE_REQUEST_ID),
                peer_type: PeerType::Client.into(),
                status_code: 200,
                content_length: 3,
                application_id: None,
            });
        }
        EventKind::HttpStartStop => {
            envelope.http_start_stop = Some(HttpStartStop {
                start_timestamp: 1234,
                stop_timestamp: 5555,
                request_id: Some(SAMPLE_REQUEST_ID),
                peer_type: PeerType::Server.into(),
                method: Method::Get.into(),
                uri: String::from("http://startstop.example.com"),
                remote_address: String::from("127.0.0.1"),
                user_agent: String::from("test"),
                status_code: 200,
                content_length: 3,
                instance_id: Some(text.to_owned()),
                ..HttpStartStop::default()
            });
        }
        EventKind::LogMessage => envelope.log_message = Some(sample_log(text)),
        EventKind::ValueMetric => {
            envelope.value_metric = Some(ValueMetric {
                name: text.to_owned(),
                value: 42.0,
                unit: String::from("unit"),
            });
        }
        EventKind::CounterEvent => {
            envelope.counter_event = Some(CounterEvent {
                name: text.to_owned(),
                delta: 42,
                total: None,
            });
        }
        EventKind::Error => {
            envelope.error = Some(Error {
                source: String::from("source"),
                code: 404,
                message: text.to_owned(),
            });
        }
        EventKind::ContainerMetric => {
            envelope.container_metric = Some(ContainerMetric {
                application_id: text.to_owned(),
                instance_index: 1,
                cpu_percentage: 1.0,
                memory_bytes: 1,
                disk_bytes: 1,
                memory_bytes_quota: None,
                disk_bytes_quota: None,
            });
        }
    }
    envelope
}

/// Builds a `LogMessage` envelope carrying `text`.
#[must_use]
pub fn sample_log_envelope(text: &str) -> Envelope {
    sample_envelope(EventKind::LogMessage, text)
}

/// One sample envelope per known kind, in table order.
#[must_use]
pub fn one_of_each_kind() -> Vec<Envelope> {
    EventKind::ALL
        .iter()
        .map(|kind| sample_envelope(*kind, &kind.name().to_ascii_lowercase()))
        .collect()
}

/// Substring that appears in the rendering of an envelope of `kind` and in
/// no rendering of another kind.
#[must_use]
pub fn kind_marker(kind: EventKind) -> String {
    format!("eventType:{} ", kind.name())
}

fn sample_log(text: &str) -> LogMessage {
    LogMessage {
        message: text.as_bytes().to_vec(),
        message_type: MessageType::Out.into(),
        timestamp: SAMPLE_TIMESTAMP,
        ..LogMessage::default()
    }
}

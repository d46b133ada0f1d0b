//! Compact text rendering of envelopes.
//!
//! Envelopes print in the protobuf compact text format: `name:value` pairs
//! separated by single spaces, nested messages wrapped in `name:<...>`, and
//! enumerations shown by name. Operators grep this output, so field names use
//! the casing of the published `.proto` files rather than Rust's.

use std::fmt;

use crate::envelope::{
    ContainerMetric, CounterEvent, Envelope, Error, HttpStart, HttpStartStop, HttpStop,
    LogMessage, MessageType, Method, PeerType, Uuid, ValueMetric,
};
use crate::EventKind;

/// Accumulates one line of compact text.
#[derive(Default)]
struct TextWriter {
    buffer: String,
}

impl TextWriter {
    fn begin_field(&mut self, name: &str) {
        if !self.buffer.is_empty() && !self.buffer.ends_with('<') {
            self.buffer.push(' ');
        }
        self.buffer.push_str(name);
        self.buffer.push(':');
    }

    fn string(&mut self, name: &str, value: &str) {
        self.bytes(name, value.as_bytes());
    }

    fn optional_string(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.string(name, value);
        }
    }

    fn bytes(&mut self, name: &str, value: &[u8]) {
        self.begin_field(name);
        self.buffer.push('"');
        for &byte in value {
            push_escaped(&mut self.buffer, byte);
        }
        self.buffer.push('"');
    }

    fn scalar(&mut self, name: &str, value: impl fmt::Display) {
        self.begin_field(name);
        self.buffer.push_str(&value.to_string());
    }

    fn optional_scalar<T: fmt::Display>(&mut self, name: &str, value: Option<T>) {
        if let Some(value) = value {
            self.scalar(name, value);
        }
    }

    fn enumeration<E>(&mut self, name: &str, raw: i32)
    where
        E: TryFrom<i32> + Into<&'static str>,
    {
        match <E as TryFrom<i32>>::try_from(raw) {
            Ok(known) => {
                let label: &'static str = known.into();
                self.scalar(name, label);
            }
            Err(_) => self.scalar(name, raw),
        }
    }

    fn message<M: TextFormat>(&mut self, name: &str, message: &M) {
        self.begin_field(name);
        self.buffer.push('<');
        message.write_text(self);
        if self.buffer.ends_with('<') {
            self.buffer.push('>');
        } else {
            self.buffer.push_str(" >");
        }
    }

    fn optional_message<M: TextFormat>(&mut self, name: &str, message: Option<&M>) {
        if let Some(message) = message {
            self.message(name, message);
        }
    }
}

/// Escapes one byte the way the protobuf text format does.
fn push_escaped(buffer: &mut String, byte: u8) {
    match byte {
        b'\n' => buffer.push_str("\\n"),
        b'\r' => buffer.push_str("\\r"),
        b'\t' => buffer.push_str("\\t"),
        b'"' => buffer.push_str("\\\""),
        b'\'' => buffer.push_str("\\'"),
        b'\\' => buffer.push_str("\\\\"),
        0x20..=0x7e => buffer.push(char::from(byte)),
        _ => buffer.push_str(&format!("\\{byte:03o}")),
    }
}

/// Messages that know how to write their fields as compact text.
trait TextFormat {
    fn write_text(&self, writer: &mut TextWriter);
}

struct Tag<'a> {
    key: &'a str,
    value: &'a str,
}

impl TextFormat for Tag<'_> {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.string("key", self.key);
        writer.string("value", self.value);
    }
}

impl TextFormat for Envelope {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.string("origin", &self.origin);
        writer.enumeration::<EventKind>("eventType", self.event_type);
        writer.optional_scalar("timestamp", self.timestamp);
        writer.optional_message("httpStart", self.http_start.as_ref());
        writer.optional_message("httpStop", self.http_stop.as_ref());
        writer.optional_message("httpStartStop", self.http_start_stop.as_ref());
        writer.optional_message("logMessage", self.log_message.as_ref());
        writer.optional_message("valueMetric", self.value_metric.as_ref());
        writer.optional_message("counterEvent", self.counter_event.as_ref());
        writer.optional_message("error", self.error.as_ref());
        writer.optional_message("containerMetric", self.container_metric.as_ref());
        writer.optional_string("deployment", self.deployment.as_deref());
        writer.optional_string("job", self.job.as_deref());
        writer.optional_string("index", self.index.as_deref());
        writer.optional_string("ip", self.ip.as_deref());
        for (key, value) in &self.tags {
            writer.message("tags", &Tag { key, value });
        }
    }
}

impl TextFormat for Uuid {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.scalar("low", self.low);
        writer.scalar("high", self.high);
    }
}

impl TextFormat for HttpStart {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.scalar("timestamp", self.timestamp);
        writer.optional_message("requestId", self.request_id.as_ref());
        writer.enumeration::<PeerType>("peerType", self.peer_type);
        writer.enumeration::<Method>("method", self.method);
        writer.string("uri", &self.uri);
        writer.string("remoteAddress", &self.remote_address);
        writer.string("userAgent", &self.user_agent);
        writer.optional_message("parentRequestId", self.parent_request_id.as_ref());
        writer.optional_message("applicationId", self.application_id.as_ref());
        writer.optional_scalar("instanceIndex", self.instance_index);
        writer.optional_string("instanceId", self.instance_id.as_deref());
    }
}

impl TextFormat for HttpStop {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.scalar("timestamp", self.timestamp);
        writer.string("uri", &self.uri);
        writer.optional_message("requestId", self.request_id.as_ref());
        writer.enumeration::<PeerType>("peerType", self.peer_type);
        writer.scalar("statusCode", self.status_code);
        writer.scalar("contentLength", self.content_length);
        writer.optional_message("applicationId", self.application_id.as_ref());
    }
}

impl TextFormat for HttpStartStop {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.scalar("startTimestamp", self.start_timestamp);
        writer.scalar("stopTimestamp", self.stop_timestamp);
        writer.optional_message("requestId", self.request_id.as_ref());
        writer.enumeration::<PeerType>("peerType", self.peer_type);
        writer.enumeration::<Method>("method", self.method);
        writer.string("uri", &self.uri);
        writer.string("remoteAddress", &self.remote_address);
        writer.string("userAgent", &self.user_agent);
        writer.scalar("statusCode", self.status_code);
        writer.scalar("contentLength", self.content_length);
        writer.optional_message("applicationId", self.application_id.as_ref());
        writer.optional_scalar("instanceIndex", self.instance_index);
        writer.optional_string("instanceId", self.instance_id.as_deref());
        for forwarded in &self.forwarded {
            writer.string("forwarded", forwarded);
        }
    }
}

impl TextFormat for LogMessage {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.bytes("message", &self.message);
        writer.enumeration::<MessageType>("message_type", self.message_type);
        writer.scalar("timestamp", self.timestamp);
        writer.optional_string("app_id", self.app_id.as_deref());
        writer.optional_string("source_type", self.source_type.as_deref());
        writer.optional_string("source_instance", self.source_instance.as_deref());
    }
}

impl TextFormat for ValueMetric {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.string("name", &self.name);
        writer.scalar("value", self.value);
        writer.string("unit", &self.unit);
    }
}

impl TextFormat for CounterEvent {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.string("name", &self.name);
        writer.scalar("delta", self.delta);
        writer.optional_scalar("total", self.total);
    }
}

impl TextFormat for Error {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.string("source", &self.source);
        writer.scalar("code", self.code);
        writer.string("message", &self.message);
    }
}

impl TextFormat for ContainerMetric {
    fn write_text(&self, writer: &mut TextWriter) {
        writer.string("applicationId", &self.application_id);
        writer.scalar("instanceIndex", self.instance_index);
        writer.scalar("cpuPercentage", self.cpu_percentage);
        writer.scalar("memoryBytes", self.memory_bytes);
        writer.scalar("diskBytes", self.disk_bytes);
        writer.optional_scalar("memoryBytesQuota", self.memory_bytes_quota);
        writer.optional_scalar("diskBytesQuota", self.disk_bytes_quota);
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = TextWriter::default();
        self.write_text(&mut writer);
        formatter.write_str(&writer.buffer)
    }
}

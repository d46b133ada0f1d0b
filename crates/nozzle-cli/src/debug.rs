//! Handshake tracing for `--debug`.
//!
//! The transport hands the printer a plain-text dump of each side of the
//! websocket upgrade. Dumps follow the HTTP/1.1 wire layout so they can be
//! compared with a proxy capture.

use tungstenite::http::{HeaderMap, Request, StatusCode, Version, header::AUTHORIZATION};

use crate::ui::Ui;

/// Title printed before the upgrade request dump.
pub const REQUEST_TITLE: &str = "WEBSOCKET REQUEST:";
/// Title printed before the upgrade response dump.
pub const RESPONSE_TITLE: &str = "WEBSOCKET RESPONSE:";

const REDACTED: &str = "[PRIVATE DATA HIDDEN]";

/// Receives one titled dump per side of the handshake.
pub trait DebugPrinter {
    /// Prints `dump` under `title`.
    fn print(&self, title: &str, dump: &str);
}

/// Prints trace frames as two `say` lines each.
pub struct ConsoleDebugPrinter<'a> {
    ui: &'a dyn Ui,
}

impl<'a> ConsoleDebugPrinter<'a> {
    /// Builds a printer writing through `ui`.
    pub const fn new(ui: &'a dyn Ui) -> Self {
        Self { ui }
    }
}

impl DebugPrinter for ConsoleDebugPrinter<'_> {
    fn print(&self, title: &str, dump: &str) {
        self.ui.say(title);
        self.ui.say(dump);
    }
}

/// Renders the upgrade request with credentials masked.
pub(crate) fn dump_request<B>(request: &Request<B>) -> String {
    let target = request
        .uri()
        .path_and_query()
        .map_or("/", |path_and_query| path_and_query.as_str());
    let mut dump = format!("{} {target} {:?}", request.method(), request.version());
    push_headers(&mut dump, request.headers());
    dump
}

/// Renders the upgrade response status line and headers.
pub(crate) fn dump_response(version: Version, status: StatusCode, headers: &HeaderMap) -> String {
    let mut dump = format!(
        "{version:?} {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    push_headers(&mut dump, headers);
    dump
}

fn push_headers(dump: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let shown = if *name == AUTHORIZATION {
            REDACTED
        } else {
            value.to_str().unwrap_or("<binary>")
        };
        dump.push_str("\r\n");
        dump.push_str(name.as_str());
        dump.push_str(": ");
        dump.push_str(shown);
    }
}

//! Websocket transport to the traffic controller.
//!
//! [`Connection`] owns at most one live websocket. Constructing it touches no
//! network; [`Connection::subscribe`] dials, upgrades, and hands back an
//! [`EventStream`] that yields decoded envelopes until the server closes the
//! stream, an error occurs, or the cancellation token fires. The socket is
//! closed exactly once, explicitly or on drop.

use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use nozzle_events::{DecodeError, Envelope, decode};
use thiserror::Error;
use tracing::{debug, info};
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::HandshakeError;
use tungstenite::http::header::AUTHORIZATION;
use tungstenite::http::{HeaderValue, Request, StatusCode};
use tungstenite::protocol::CloseFrame;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;

use crate::cancel::CancellationToken;
use crate::debug::{DebugPrinter, REQUEST_TITLE, RESPONSE_TITLE, dump_request, dump_response};

pub(crate) const TRANSPORT_TARGET: &str = "nozzle::transport";

/// Upper bound for establishing TCP and completing the upgrade.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a blocked read waits before the cancellation token is checked.
pub const READ_POLL_INTERVAL: Duration = Duration::from_millis(200);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Which stream the connection subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    /// The platform-wide firehose, shared among consumers with the same id.
    Firehose {
        /// Subscription identifier partitioning delivery.
        subscription_id: String,
    },
    /// Events for a single application.
    App {
        /// Application GUID.
        app_guid: String,
    },
}

impl Subscription {
    /// Request path for this subscription, relative to the endpoint.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Firehose { subscription_id } => format!("/firehose/{subscription_id}"),
            Self::App { app_guid } => format!("/apps/{app_guid}/stream"),
        }
    }
}

/// One item received from the stream.
#[derive(Debug)]
pub enum Delivery {
    /// A decoded envelope.
    Envelope(Box<Envelope>),
    /// A binary frame that did not decode.
    Malformed(DecodeError),
}

/// Failures while establishing the subscription.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The endpoint is not a usable websocket URL.
    #[error("Error dialing trafficcontroller server: invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The token cannot be sent as a header value.
    #[error("Error dialing trafficcontroller server: access token is not a valid header value")]
    InvalidToken,
    /// Name resolution failed.
    #[error("Error dialing trafficcontroller server: failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Endpoint being dialled.
        endpoint: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// The TCP connection could not be established.
    #[error("Error dialing trafficcontroller server: failed to connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint being dialled.
        endpoint: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The TLS or websocket handshake failed.
    #[error("Error dialing trafficcontroller server: handshake with {endpoint} failed: {source}")]
    Handshake {
        /// Endpoint being dialled.
        endpoint: String,
        /// Underlying websocket error.
        #[source]
        source: Box<tungstenite::Error>,
    },
    /// The server answered the upgrade with a non-101 status.
    #[error("Error dialing trafficcontroller server: {endpoint} rejected the upgrade with status {status}")]
    Rejected {
        /// Endpoint being dialled.
        endpoint: String,
        /// Status returned by the server.
        status: StatusCode,
    },
    /// The server did not finish the upgrade in time.
    #[error("Error dialing trafficcontroller server: handshake with {endpoint} timed out")]
    TimedOut {
        /// Endpoint being dialled.
        endpoint: String,
    },
    /// A subscription is already open on this connection.
    #[error("Error dialing trafficcontroller server: connection is already subscribed")]
    AlreadySubscribed,
    /// The connection has been closed.
    #[error("Error dialing trafficcontroller server: connection is closed")]
    Closed,
}

/// Failures after the subscription was established.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The server closed the stream with a non-normal close code.
    #[error("firehose closed the stream with code {code}: {reason}")]
    Closed {
        /// Websocket close code.
        code: u16,
        /// Reason sent with the close frame.
        reason: String,
    },
    /// Reading from the socket failed.
    #[error("firehose stream failed: {0}")]
    Transport(#[source] Box<tungstenite::Error>),
}

/// A handle to one outbound session with the traffic controller.
pub struct Connection<'a> {
    endpoint: String,
    token: String,
    debug_printer: Option<Box<dyn DebugPrinter + 'a>>,
    cancellation: CancellationToken,
    socket: Option<Socket>,
    closed: bool,
}

impl<'a> Connection<'a> {
    /// Creates an unopened connection. No network activity happens here.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            debug_printer: None,
            cancellation: CancellationToken::new(),
            socket: None,
            closed: false,
        }
    }

    /// Uses `cancellation` to end streams opened by this connection.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Sends handshake dumps to `printer`.
    pub fn set_debug_printer(&mut self, printer: impl DebugPrinter + 'a) {
        self.debug_printer = Some(Box::new(printer));
    }

    /// Reports whether [`Connection::close`] has run.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Dials the endpoint and opens `subscription`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when the endpoint is invalid, unreachable, or
    /// refuses the upgrade, or when the connection is already in use.
    pub fn subscribe(
        &mut self,
        subscription: &Subscription,
    ) -> Result<EventStream<'_>, ConnectError> {
        if self.closed {
            return Err(ConnectError::Closed);
        }
        if self.socket.is_some() {
            return Err(ConnectError::AlreadySubscribed);
        }

        let url = subscription_url(&self.endpoint, subscription)?;
        info!(target: TRANSPORT_TARGET, path = url.path(), "dialing traffic controller");
        let request = self.upgrade_request(&url)?;
        self.trace(REQUEST_TITLE, &dump_request(&request));

        let tcp = self.connect_tcp(&url)?;
        let control = tcp.try_clone().map_err(|source| self.connect_error(source))?;
        let socket = self.handshake(request, tcp)?;
        control
            .set_read_timeout(Some(READ_POLL_INTERVAL))
            .map_err(|source| self.connect_error(source))?;
        info!(target: TRANSPORT_TARGET, path = url.path(), "subscription established");

        let cancellation = self.cancellation.clone();
        let live = self.socket.insert(socket);
        Ok(EventStream {
            socket: live,
            cancellation,
            finished: false,
        })
    }

    /// Closes the websocket, if any. Later calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(mut socket) = self.socket.take() {
            if let Err(error) = socket.close(None) {
                debug!(target: TRANSPORT_TARGET, %error, "close handshake not sent");
            }
            if let Err(error) = socket.flush() {
                debug!(target: TRANSPORT_TARGET, %error, "close handshake not flushed");
            }
        }
        info!(target: TRANSPORT_TARGET, "connection closed");
    }

    fn upgrade_request(&self, url: &Url) -> Result<Request<()>, ConnectError> {
        let mut request =
            url.as_str()
                .into_client_request()
                .map_err(|error| ConnectError::InvalidEndpoint {
                    endpoint: self.endpoint.clone(),
                    reason: error.to_string(),
                })?;
        let authorization =
            HeaderValue::from_str(&self.token).map_err(|_| ConnectError::InvalidToken)?;
        request.headers_mut().insert(AUTHORIZATION, authorization);
        Ok(request)
    }

    fn connect_tcp(&self, url: &Url) -> Result<TcpStream, ConnectError> {
        let addresses = url
            .socket_addrs(|| None)
            .and_then(|addresses| {
                if addresses.is_empty() {
                    Err(io::Error::new(ErrorKind::AddrNotAvailable, "no resolved addresses"))
                } else {
                    Ok(addresses)
                }
            })
            .map_err(|source| ConnectError::Resolve {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let stream = connect_any(&addresses, CONNECTION_TIMEOUT)
            .map_err(|source| self.connect_error(source))?;
        stream
            .set_read_timeout(Some(CONNECTION_TIMEOUT))
            .and_then(|()| stream.set_write_timeout(Some(CONNECTION_TIMEOUT)))
            .map_err(|source| self.connect_error(source))?;
        Ok(stream)
    }

    fn handshake(&self, request: Request<()>, tcp: TcpStream) -> Result<Socket, ConnectError> {
        install_crypto_provider();
        match tungstenite::client_tls_with_config(request, tcp, None, None) {
            Ok((socket, response)) => {
                self.trace(
                    RESPONSE_TITLE,
                    &dump_response(response.version(), response.status(), response.headers()),
                );
                Ok(socket)
            }
            Err(HandshakeError::Failure(tungstenite::Error::Http(response))) => {
                self.trace(
                    RESPONSE_TITLE,
                    &dump_response(response.version(), response.status(), response.headers()),
                );
                Err(ConnectError::Rejected {
                    endpoint: self.endpoint.clone(),
                    status: response.status(),
                })
            }
            Err(HandshakeError::Failure(source)) => Err(ConnectError::Handshake {
                endpoint: self.endpoint.clone(),
                source: Box::new(source),
            }),
            Err(HandshakeError::Interrupted(_)) => Err(ConnectError::TimedOut {
                endpoint: self.endpoint.clone(),
            }),
        }
    }

    fn trace(&self, title: &str, dump: &str) {
        if let Some(printer) = self.debug_printer.as_ref() {
            printer.print(title, dump);
        }
    }

    fn connect_error(&self, source: io::Error) -> ConnectError {
        ConnectError::Connect {
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}

impl Drop for Connection<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Blocking, single-pass sequence of deliveries from one subscription.
///
/// Yields `Err` at most once, as its final item. Cancellation and a normal
/// close end the sequence without an error.
pub struct EventStream<'c> {
    socket: &'c mut Socket,
    cancellation: CancellationToken,
    finished: bool,
}

impl Iterator for EventStream<'_> {
    type Item = Result<Delivery, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if self.cancellation.is_cancelled() {
                info!(target: TRANSPORT_TARGET, "stream cancelled");
                self.finished = true;
                break;
            }
            match self.socket.read() {
                Ok(Message::Binary(bytes)) => return Some(Ok(delivery(&bytes))),
                Ok(Message::Close(frame)) => {
                    self.finished = true;
                    return close_outcome(frame).map(Err);
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(error))
                    if matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    self.finished = true;
                }
                Err(error) => {
                    self.finished = true;
                    return Some(Err(StreamError::Transport(Box::new(error))));
                }
            }
        }
        None
    }
}

fn delivery(bytes: &[u8]) -> Delivery {
    match decode(bytes) {
        Ok(envelope) => Delivery::Envelope(Box::new(envelope)),
        Err(error) => {
            debug!(target: TRANSPORT_TARGET, %error, len = bytes.len(), "undecodable frame");
            Delivery::Malformed(error)
        }
    }
}

fn close_outcome(frame: Option<CloseFrame<'_>>) -> Option<StreamError> {
    frame
        .filter(|close| close.code != CloseCode::Normal)
        .map(|close| StreamError::Closed {
            code: u16::from(close.code),
            reason: close.reason.into_owned(),
        })
}

/// Builds the websocket URL for `subscription` under `endpoint`.
///
/// `http` and `https` endpoints are accepted and mapped to `ws` and `wss`.
pub(crate) fn subscription_url(
    endpoint: &str,
    subscription: &Subscription,
) -> Result<Url, ConnectError> {
    let invalid = |reason: String| ConnectError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
        reason,
    };
    let mut url = Url::parse(endpoint).map_err(|error| invalid(error.to_string()))?;
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => return Err(invalid(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid(format!("cannot use scheme {scheme}")))?;
    if url.host_str().is_none() {
        return Err(invalid(String::from("missing host")));
    }
    let path = format!("{}{}", url.path().trim_end_matches('/'), subscription.path());
    url.set_path(&path);
    url.set_fragment(None);
    Ok(url)
}

fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!(target: TRANSPORT_TARGET, "crypto provider already installed");
    }
}

/// Dials each address in turn and returns the first stream that connects.
///
/// When every attempt fails the error from the last address is returned.
fn connect_any(addresses: &[SocketAddr], timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = io::Error::new(ErrorKind::AddrNotAvailable, "no resolved addresses");
    for address in addresses {
        match TcpStream::connect_timeout(address, timeout) {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                debug!(target: TRANSPORT_TARGET, %address, %error, "address unreachable");
                last_error = error;
            }
        }
    }
    Err(last_error)
}

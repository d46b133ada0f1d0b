//! Fake traffic controller for behavioural tests.
//!
//! Serves one websocket client on an ephemeral TCP port: records the upgrade
//! path and `Authorization` header, rejects unexpected tokens with 403,
//! streams canned binary frames, then ends the stream as scripted.

use std::borrow::Cow;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::http::header::AUTHORIZATION;
use tungstenite::protocol::CloseFrame;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::{Message, WebSocket};

const ACCEPT_DEADLINE: Duration = Duration::from_secs(2);
const CLIENT_DEADLINE: Duration = Duration::from_secs(5);

/// How the firehose ends the stream after sending its frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ending {
    /// Sends a close frame with this code.
    Close(u16),
    /// Drops the TCP connection without a close frame.
    Reset,
    /// Waits for the client to close the stream.
    AwaitClient,
}

impl Default for Ending {
    fn default() -> Self {
        Self::Close(1000)
    }
}

/// What the firehose serves.
#[derive(Debug, Clone, Default)]
pub(crate) struct FirehoseScript {
    pub accepted_token: String,
    pub frames: Vec<Vec<u8>>,
    pub ending: Ending,
}

/// What the firehose observed from its client.
#[derive(Debug, Clone, Default)]
pub(crate) struct Observed {
    pub path: Option<String>,
    pub authorization: Option<String>,
    pub client_closed: bool,
}

/// A websocket server that accepts a single subscription.
pub(crate) struct FakeFirehose {
    port: u16,
    observed: Arc<Mutex<Observed>>,
    result: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeFirehose {
    pub fn spawn(script: FirehoseScript) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake firehose")?;
        listener
            .set_nonblocking(true)
            .context("fake firehose nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let observed = Arc::new(Mutex::new(Observed::default()));
        let result: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
        let observed_clone = Arc::clone(&observed);
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = Self::serve(&listener, &script, &observed_clone);
            if let Ok(mut guard) = result_clone.lock() {
                *guard = Some(outcome);
            }
        });
        Ok(Self {
            port,
            observed,
            result,
            handle: Some(handle),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Waits for the server thread and returns what it observed.
    pub fn finish(&mut self) -> Result<Observed> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake firehose thread panicked"))?;
        }
        if let Some(outcome) = self
            .result
            .lock()
            .map_err(|error| anyhow!("lock fake firehose result: {error}"))?
            .take()
        {
            outcome.context("fake firehose failed")?;
        }
        let observed = self
            .observed
            .lock()
            .map_err(|error| anyhow!("lock observations: {error}"))?;
        Ok(observed.clone())
    }

    fn serve(
        listener: &TcpListener,
        script: &FirehoseScript,
        observed: &Arc<Mutex<Observed>>,
    ) -> Result<()> {
        let Some(stream) = Self::accept(listener)? else {
            // Nobody subscribed, e.g. the filter was rejected first.
            return Ok(());
        };
        stream
            .set_nonblocking(false)
            .context("fake firehose blocking stream")?;
        stream
            .set_read_timeout(Some(ACCEPT_DEADLINE))
            .context("fake firehose read timeout")?;

        let callback = |request: &Request, response: Response| {
            Self::check_upgrade(request, response, &script.accepted_token, observed)
        };
        let Ok(mut socket) = tungstenite::accept_hdr(stream, callback) else {
            // Rejected upgrades are part of the script; the client sees 403.
            return Ok(());
        };

        for frame in &script.frames {
            socket
                .send(Message::Binary(frame.clone()))
                .context("send frame")?;
        }

        match script.ending {
            Ending::Close(code) => {
                socket
                    .close(Some(CloseFrame {
                        code: CloseCode::from(code),
                        reason: Cow::Borrowed("done"),
                    }))
                    .context("send close frame")?;
                Self::drain_until_closed(&mut socket, observed);
                Ok(())
            }
            Ending::Reset => {
                drop(socket);
                Ok(())
            }
            Ending::AwaitClient => {
                Self::drain_until_closed(&mut socket, observed);
                Ok(())
            }
        }
    }

    fn accept(listener: &TcpListener) -> Result<Option<TcpStream>> {
        let deadline = Instant::now() + ACCEPT_DEADLINE;
        loop {
            match listener.accept() {
                Ok((stream, _)) => return Ok(Some(stream)),
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }

    fn check_upgrade(
        request: &Request,
        response: Response,
        accepted_token: &str,
        observed: &Arc<Mutex<Observed>>,
    ) -> Result<Response, ErrorResponse> {
        let authorization = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let authorised = authorization.as_deref() == Some(accepted_token);
        if let Ok(mut guard) = observed.lock() {
            guard.path = Some(request.uri().path().to_owned());
            guard.authorization = authorization;
        }
        if authorised {
            return Ok(response);
        }
        let mut rejection = ErrorResponse::new(Some(String::from("unauthorized")));
        *rejection.status_mut() = StatusCode::FORBIDDEN;
        Err(rejection)
    }

    /// Reads until the client completes or initiates the close handshake.
    fn drain_until_closed(socket: &mut WebSocket<TcpStream>, observed: &Arc<Mutex<Observed>>) {
        let deadline = Instant::now() + CLIENT_DEADLINE;
        while Instant::now() < deadline {
            match socket.read() {
                Ok(Message::Close(_)) => {
                    if let Ok(mut guard) = observed.lock() {
                        guard.client_closed = true;
                    }
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(error))
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) => {}
                Err(_) => break,
            }
        }
    }
}

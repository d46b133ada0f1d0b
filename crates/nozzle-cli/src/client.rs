//! The client facade.
//!
//! [`Client::start`] runs one nozzle session: it prepares the connection,
//! resolves the filter, announces the stream, and pumps envelopes until the
//! stream ends. Every fatal condition produces exactly one warning, and the
//! connection is released on every path.

use nozzle_config::{Config, DEFAULT_SUBSCRIPTION_ID};
use thiserror::Error;
use tracing::{info, warn};

use crate::cancel::CancellationToken;
use crate::debug::ConsoleDebugPrinter;
use crate::filter::{self, FilterError, FilterOptions};
use crate::pump;
use crate::transport::{ConnectError, Connection, StreamError, Subscription};
use crate::ui::Ui;

pub(crate) const CLIENT_TARGET: &str = "nozzle::client";

/// First line announcing that streaming has begun.
pub const STARTING_MESSAGE: &str = "Starting the nozzle";
/// Second line announcing that streaming has begun.
pub const EXIT_HINT: &str = "Hit Ctrl+c to exit";

/// Per-run options supplied by the frontend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Print the websocket handshake before streaming.
    pub debug: bool,
    /// Render every event kind without prompting.
    pub no_filter: bool,
    /// Name of the single event kind to render.
    pub filter: Option<String>,
    /// Firehose subscription identifier; defaults to `FirehosePlugin`.
    pub subscription_id: Option<String>,
    /// Stream one application instead of the firehose.
    pub app_guid: Option<String>,
}

impl ClientOptions {
    /// The options the filter resolver reads.
    #[must_use]
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            no_filter: self.no_filter,
            filter: self.filter.clone(),
        }
    }

    /// The subscription these options select.
    ///
    /// An application GUID takes the per-application stream; otherwise the
    /// firehose is used with the configured or default subscription id.
    #[must_use]
    pub fn subscription(&self) -> Subscription {
        self.app_guid
            .as_deref()
            .filter(|guid| !guid.is_empty())
            .map_or_else(
                || Subscription::Firehose {
                    subscription_id: self
                        .subscription_id
                        .as_deref()
                        .filter(|id| !id.is_empty())
                        .unwrap_or(DEFAULT_SUBSCRIPTION_ID)
                        .to_owned(),
                },
                |guid| Subscription::App {
                    app_guid: guid.to_owned(),
                },
            )
    }
}

impl From<&Config> for ClientOptions {
    fn from(config: &Config) -> Self {
        Self {
            debug: config.debug(),
            no_filter: config.no_filter(),
            filter: config.filter().map(str::to_owned),
            subscription_id: Some(config.subscription_id().to_owned()),
            app_guid: config.app_guid().map(str::to_owned),
        }
    }
}

/// Fatal outcomes of a run.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The filter could not be resolved.
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// The subscription could not be opened.
    #[error(transparent)]
    Connect(#[from] ConnectError),
    /// The stream failed after it was opened.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// One nozzle session against a traffic controller.
pub struct Client<'a> {
    token: String,
    endpoint: String,
    options: ClientOptions,
    ui: &'a dyn Ui,
    cancellation: CancellationToken,
}

impl<'a> Client<'a> {
    /// Prepares a session; nothing is dialled until [`Client::start`].
    pub fn new(
        token: impl Into<String>,
        endpoint: impl Into<String>,
        options: ClientOptions,
        ui: &'a dyn Ui,
    ) -> Self {
        Self {
            token: token.into(),
            endpoint: endpoint.into(),
            options,
            ui,
            cancellation: CancellationToken::new(),
        }
    }

    /// Ends the stream cleanly once `cancellation` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Runs the session to completion.
    ///
    /// Blocks until the server closes the stream, the stream fails, or the
    /// cancellation token fires. The returned error has already been shown
    /// through the [`Ui`]; callers only use it to pick an exit status.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the filter cannot be resolved, the
    /// subscription cannot be opened, or the stream fails.
    pub fn start(&self) -> Result<(), ClientError> {
        let mut connection = Connection::new(self.endpoint.as_str(), self.token.as_str())
            .with_cancellation(self.cancellation.clone());
        if self.options.debug {
            connection.set_debug_printer(ConsoleDebugPrinter::new(self.ui));
        }

        let resolved = filter::resolve(&self.options.filter_options(), self.ui)
            .inspect_err(|error| self.ui.warn(&error.to_string()))?;
        info!(target: CLIENT_TARGET, filter = ?resolved, "filter resolved");
        if self.cancellation.is_cancelled() {
            info!(target: CLIENT_TARGET, "cancelled before streaming");
            return Ok(());
        }

        self.ui.say(STARTING_MESSAGE);
        self.ui.say(EXIT_HINT);
        let outcome = pump::run(
            &mut connection,
            &self.options.subscription(),
            resolved,
            self.ui,
        );
        connection.close();

        match outcome {
            Ok(()) => Ok(()),
            Err(ClientError::Connect(error)) => {
                warn!(target: CLIENT_TARGET, %error, "subscription failed");
                self.ui.warn(&error.to_string());
                Err(ClientError::Connect(error))
            }
            Err(error) => Err(error),
        }
    }
}

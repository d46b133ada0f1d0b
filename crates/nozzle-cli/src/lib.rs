//! Firehose nozzle: a streaming client for the Cloud Foundry traffic
//! controller.
//!
//! The library owns the whole client core (filter resolution, the websocket
//! transport, the stream pump, and handshake tracing) behind [`Client`]. The
//! binary entrypoint, [`run`], wires layered configuration, telemetry, signal
//! handling, and a terminal [`Ui`] around it. Tests substitute the
//! configuration loader, the input reader, and the output writers.

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

mod cancel;
mod client;
mod config;
mod debug;
mod filter;
mod pump;
pub mod telemetry;
mod transport;
mod ui;

pub use cancel::CancellationToken;
pub use client::{Client, ClientError, ClientOptions, EXIT_HINT, STARTING_MESSAGE};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub use debug::{ConsoleDebugPrinter, DebugPrinter, REQUEST_TITLE, RESPONSE_TITLE};
pub use filter::{FilterError, FilterOptions, ResolvedFilter, resolve};
pub use transport::{
    CONNECTION_TIMEOUT, ConnectError, Connection, Delivery, EventStream, READ_POLL_INTERVAL,
    StreamError, Subscription,
};
pub use ui::{TerminalUi, Ui};

use client::CLIENT_TARGET;
use telemetry::TelemetryError;

/// Errors reported by the entrypoint before or around a client run.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("no traffic controller endpoint configured; set --endpoint or NOZZLE_ENDPOINT")]
    MissingEndpoint,
    #[error("no access token configured; set --token or NOZZLE_TOKEN")]
    MissingToken,
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] io::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Runs the nozzle with process arguments and streams.
///
/// SIGINT and SIGTERM end the stream cleanly; a second signal exits at once.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: R, stdout: W, stderr: E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead + Send,
    W: Write + Send,
    E: Write + Send,
{
    let ui = TerminalUi::new(stdin, stdout, stderr);
    let cancellation = CancellationToken::new();
    if let Err(error) = cancel::install_signal_handlers(&cancellation) {
        ui.warn(&AppError::Signals(error).to_string());
        return ExitCode::FAILURE;
    }
    run_with_loader(args, &ui, &OrthoConfigLoader, &cancellation)
}

/// Runs the nozzle with a custom configuration loader.
pub(crate) fn run_with_loader<I, L>(
    args: I,
    ui: &dyn Ui,
    loader: &L,
    cancellation: &CancellationToken,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    L: ConfigLoader,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    match execute(&arguments, ui, loader, cancellation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Client(error)) => {
            info!(target: CLIENT_TARGET, %error, "run ended with an error");
            ExitCode::FAILURE
        }
        Err(error) => {
            ui.warn(&error.to_string());
            ExitCode::FAILURE
        }
    }
}

fn execute<L: ConfigLoader>(
    args: &[OsString],
    ui: &dyn Ui,
    loader: &L,
    cancellation: &CancellationToken,
) -> Result<(), AppError> {
    let config = loader.load(args)?;
    telemetry::initialise(&config)?;
    let endpoint = config.endpoint().ok_or(AppError::MissingEndpoint)?;
    let token = config.token().ok_or(AppError::MissingToken)?;
    Client::new(token, endpoint, ClientOptions::from(&config), ui)
        .with_cancellation(cancellation.clone())
        .start()?;
    Ok(())
}

#[cfg(test)]
mod tests;

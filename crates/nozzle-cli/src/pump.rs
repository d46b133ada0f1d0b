//! The stream pump.
//!
//! Three threads share one subscription: a receiver that reads the socket, a
//! drain that reports the first transport error, and the caller's thread,
//! which renders accepted envelopes in arrival order. All three are scoped,
//! so none outlives the borrow of the connection.
//!
//! The receiver stops reading at the first error, so envelopes delivered
//! before it are still rendered and nothing after it is.

use std::panic;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::debug;

use crate::client::{CLIENT_TARGET, ClientError};
use crate::filter::ResolvedFilter;
use crate::transport::{Connection, Delivery, EventStream, StreamError, Subscription};
use crate::ui::Ui;

/// Subscribes on `connection` and renders deliveries until the stream ends.
///
/// # Errors
///
/// Returns [`ClientError::Connect`] when the subscription cannot be opened
/// (not reported through `ui`) and [`ClientError::Stream`] when the stream
/// fails after it was opened (already reported through `ui`).
pub(crate) fn run(
    connection: &mut Connection<'_>,
    subscription: &Subscription,
    filter: ResolvedFilter,
    ui: &dyn Ui,
) -> Result<(), ClientError> {
    let stream = connection.subscribe(subscription)?;
    let (delivery_tx, delivery_rx) = mpsc::channel();
    let (error_tx, error_rx) = mpsc::channel();

    let first_error = thread::scope(|scope| {
        let receiver = scope.spawn(move || receive(stream, &delivery_tx, &error_tx));
        let drain = scope.spawn(move || drain_errors(&error_rx, ui));
        render(&delivery_rx, filter, ui);
        drop(delivery_rx);
        join(receiver.join());
        join(drain.join())
    });

    debug!(target: CLIENT_TARGET, failed = first_error.is_some(), "pump finished");
    first_error.map_or(Ok(()), |error| Err(ClientError::Stream(error)))
}

fn receive(
    stream: EventStream<'_>,
    deliveries: &Sender<Delivery>,
    errors: &Sender<StreamError>,
) {
    for item in stream {
        match item {
            Ok(delivery) => {
                if deliveries.send(delivery).is_err() {
                    break;
                }
            }
            Err(error) => {
                if errors.send(error).is_err() {
                    debug!(target: CLIENT_TARGET, "error drain already finished");
                }
                break;
            }
        }
    }
}

fn drain_errors(errors: &Receiver<StreamError>, ui: &dyn Ui) -> Option<StreamError> {
    let error = errors.recv().ok()?;
    ui.warn(&error.to_string());
    Some(error)
}

/// Renders accepted envelopes; rejected ones are dropped without a trace.
fn render(deliveries: &Receiver<Delivery>, filter: ResolvedFilter, ui: &dyn Ui) {
    for delivery in deliveries {
        match delivery {
            Delivery::Envelope(envelope) => {
                if filter.accepts(&envelope) {
                    ui.say(&envelope.to_string());
                }
            }
            Delivery::Malformed(error) => {
                ui.warn(&format!("Skipping malformed envelope: {error}"));
            }
        }
    }
}

fn join<T>(outcome: thread::Result<T>) -> T {
    outcome.unwrap_or_else(|payload| panic::resume_unwind(payload))
}

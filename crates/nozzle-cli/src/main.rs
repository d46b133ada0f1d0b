//! CLI entrypoint for the firehose nozzle.
//!
//! The binary delegates to [`nozzle_cli::run`], which loads configuration,
//! resolves the event filter, and streams envelopes to stdout until the
//! traffic controller closes the stream or the operator interrupts it.

use std::io::{self, BufReader};
use std::process::ExitCode;

fn main() -> ExitCode {
    nozzle_cli::run(
        std::env::args_os(),
        BufReader::new(io::stdin()),
        io::stdout(),
        io::stderr(),
    )
}

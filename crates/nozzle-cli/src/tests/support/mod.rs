//! Test support for nozzle behavioural coverage.
//!
//! Supplies a fake firehose, a static configuration loader, and the world
//! shared by step definitions, so steps stay focused on their assertions.

mod fake_firehose;

use std::ffi::OsString;
use std::io::Cursor;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use nozzle_config::Config;
use rstest::fixture;

use crate::{AppError, CancellationToken, ConfigLoader, TerminalUi, run_with_loader};

pub(super) use fake_firehose::{Ending, FakeFirehose, FirehoseScript, Observed};

/// Token the nozzle sends unless a scenario overrides it.
pub(super) const TEST_TOKEN: &str = "bearer test-token";

/// An endpoint nothing listens on.
pub(super) const UNREACHABLE_ENDPOINT: &str = "ws://127.0.0.1:65535";

/// A config loader that returns a fixed configuration.
pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Scenario state: the scripted firehose, the nozzle's inputs, and what it
/// printed.
#[derive(Default)]
pub(super) struct TestWorld {
    pub config: Config,
    pub script: FirehoseScript,
    pub unreachable: bool,
    pub stdin: String,
    pub cancel_after: Option<Duration>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<ExitCode>,
    pub observed: Option<Observed>,
}

impl TestWorld {
    pub fn push_frame(&mut self, frame: Vec<u8>) {
        self.script.frames.push(frame);
    }

    /// Starts the firehose, runs the nozzle to completion, and collects its
    /// output and the firehose's observations.
    pub fn run(&mut self) -> Result<()> {
        let mut firehose = if self.unreachable {
            self.config.endpoint = Some(String::from(UNREACHABLE_ENDPOINT));
            None
        } else {
            if self.script.accepted_token.is_empty() {
                self.script.accepted_token = String::from(TEST_TOKEN);
            }
            let server = FakeFirehose::spawn(self.script.clone())?;
            self.config.endpoint = Some(server.endpoint());
            Some(server)
        };
        if self.config.token.is_none() {
            self.config.token = Some(String::from(TEST_TOKEN));
        }

        let loader = StaticConfigLoader::new(self.config.clone());
        let cancellation = CancellationToken::new();
        let canceller = self.cancel_after.map(|delay| {
            let token = cancellation.clone();
            thread::spawn(move || {
                thread::sleep(delay);
                token.cancel();
            })
        });

        let ui = TerminalUi::new(
            Cursor::new(self.stdin.clone().into_bytes()),
            Vec::new(),
            Vec::new(),
        );
        let exit = run_with_loader([OsString::from("nozzle")], &ui, &loader, &cancellation);
        let (stdout, stderr) = ui.into_writers();
        self.stdout = String::from_utf8(stdout).context("stdout utf8")?;
        self.stderr = String::from_utf8(stderr).context("stderr utf8")?;
        self.exit_code = Some(exit);

        if let Some(handle) = canceller {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("canceller thread panicked"))?;
        }
        if let Some(server) = firehose.as_mut() {
            self.observed = Some(server.finish()?);
        }
        Ok(())
    }

    pub fn observed(&self) -> &Observed {
        self.observed
            .as_ref()
            .expect("the firehose was not started")
    }

    /// Lines of stdout that are envelope renderings.
    pub fn envelope_lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .filter(|line| line.contains("eventType:"))
            .collect()
    }
}

#[fixture]
pub(super) fn world() -> std::cell::RefCell<TestWorld> {
    std::cell::RefCell::new(TestWorld::default())
}

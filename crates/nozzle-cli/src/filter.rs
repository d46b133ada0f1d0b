//! Event-kind filter resolution.
//!
//! The filter is decided once, before any subscription is opened. Precedence
//! is fixed: the no-filter flag wins over an explicit filter name, and the
//! interactive prompt is only consulted when neither is set.

use std::io;
use std::num::ParseIntError;

use nozzle_events::{Envelope, EventKind};
use thiserror::Error;

use crate::ui::Ui;

/// Question printed before the numbered menu.
pub(crate) const FILTER_QUESTION: &str = "What type of firehose messages do you want to see?";

/// The filtering slice of the client options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Accept every kind without prompting.
    pub no_filter: bool,
    /// Name of the single kind to accept.
    pub filter: Option<String>,
}

/// Which envelopes reach the output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedFilter {
    /// Every envelope is rendered.
    Unfiltered,
    /// Only envelopes of this kind are rendered.
    AcceptOnly(EventKind),
}

impl ResolvedFilter {
    /// Reports whether `envelope` passes the filter.
    #[must_use]
    pub fn accepts(self, envelope: &Envelope) -> bool {
        match self {
            Self::Unfiltered => true,
            Self::AcceptOnly(kind) => envelope.kind() == kind,
        }
    }
}

/// Reasons a filter could not be resolved.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The explicit filter does not name a known event kind.
    #[error("Unable to recognize filter {0}")]
    UnrecognizedFilter(String),
    /// The prompt answer was not a number.
    #[error(
        "Invalid filter choice {input}. Enter an index from {}-{}",
        EventKind::min_numeral(),
        EventKind::max_numeral()
    )]
    InvalidFilterChoice {
        /// The answer as typed, trimmed.
        input: String,
        /// Why the answer did not parse.
        #[source]
        source: ParseIntError,
    },
    /// The prompt answer is a number outside the menu.
    #[error("Invalid filter choice {0}")]
    UnknownFilterChoice(i32),
    /// The prompt answer could not be read.
    #[error("failed to read filter choice: {0}")]
    ReadChoice(#[source] io::Error),
}

/// Resolves the filter from `options`, asking through `ui` when needed.
///
/// # Errors
///
/// Returns [`FilterError`] when the explicit filter is unknown or the prompt
/// answer is not a menu entry.
pub fn resolve(options: &FilterOptions, ui: &dyn Ui) -> Result<ResolvedFilter, FilterError> {
    if options.no_filter {
        return Ok(ResolvedFilter::Unfiltered);
    }
    options
        .filter
        .as_deref()
        .filter(|name| !name.is_empty())
        .map_or_else(
            || prompt(ui),
            |name| {
                EventKind::from_name(name)
                    .map(ResolvedFilter::AcceptOnly)
                    .ok_or_else(|| FilterError::UnrecognizedFilter(name.to_owned()))
            },
        )
}

fn prompt(ui: &dyn Ui) -> Result<ResolvedFilter, FilterError> {
    ui.say(FILTER_QUESTION);
    let answer = ui.ask(&menu()).map_err(FilterError::ReadChoice)?;
    parse_choice(answer.trim())
}

/// Interprets one trimmed prompt answer.
pub(crate) fn parse_choice(input: &str) -> Result<ResolvedFilter, FilterError> {
    if input.is_empty() {
        return Ok(ResolvedFilter::Unfiltered);
    }
    let numeral = input
        .parse::<i32>()
        .map_err(|source| FilterError::InvalidFilterChoice {
            input: input.to_owned(),
            source,
        })?;
    EventKind::from_numeral(numeral)
        .map(ResolvedFilter::AcceptOnly)
        .ok_or(FilterError::UnknownFilterChoice(numeral))
}

/// The numbered menu shown by the prompt.
pub(crate) fn menu() -> String {
    let mut text = String::from(
        "Please enter one of the following choices:\n  hit 'enter' for all messages",
    );
    for kind in EventKind::ALL {
        text.push_str(&format!("\n  {} for {}", kind.numeral(), kind.name()));
    }
    text
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use mockall::predicate::eq;
    use rstest::rstest;

    use super::*;
    use crate::ui::MockUi;

    fn options(no_filter: bool, filter: Option<&str>) -> FilterOptions {
        FilterOptions {
            no_filter,
            filter: filter.map(String::from),
        }
    }

    /// A sink that must never be used.
    fn silent_ui() -> MockUi {
        let mut ui = MockUi::new();
        ui.expect_say().never();
        ui.expect_warn().never();
        ui.expect_ask().never();
        ui
    }

    /// A sink that answers the prompt once with `answer`.
    fn answering_ui(answer: &'static str) -> MockUi {
        let mut ui = MockUi::new();
        ui.expect_say()
            .with(eq(FILTER_QUESTION))
            .once()
            .return_const(());
        ui.expect_ask()
            .once()
            .returning(move |_| Ok(answer.to_owned()));
        ui.expect_warn().never();
        ui
    }

    #[rstest]
    #[case(None)]
    #[case(Some("LogMessage"))]
    #[case(Some("IDontExist"))]
    fn no_filter_wins_over_everything(#[case] filter: Option<&str>) {
        let resolved = resolve(&options(true, filter), &silent_ui()).expect("resolves");
        assert_eq!(resolved, ResolvedFilter::Unfiltered);
    }

    #[rstest]
    #[case("HttpStart", EventKind::HttpStart)]
    #[case("LogMessage", EventKind::LogMessage)]
    #[case("ContainerMetric", EventKind::ContainerMetric)]
    fn explicit_filters_name_one_kind(#[case] name: &str, #[case] kind: EventKind) {
        let resolved = resolve(&options(false, Some(name)), &silent_ui()).expect("resolves");
        assert_eq!(resolved, ResolvedFilter::AcceptOnly(kind));
    }

    #[test]
    fn unknown_explicit_filters_are_named_in_the_error() {
        let error = resolve(&options(false, Some("IDontExist")), &silent_ui())
            .expect_err("unknown filter");
        assert_eq!(error.to_string(), "Unable to recognize filter IDontExist");
    }

    #[test]
    fn empty_explicit_filter_falls_back_to_the_prompt() {
        let resolved = resolve(&options(false, Some("")), &answering_ui("")).expect("resolves");
        assert_eq!(resolved, ResolvedFilter::Unfiltered);
    }

    #[rstest]
    #[case("", ResolvedFilter::Unfiltered)]
    #[case("  ", ResolvedFilter::Unfiltered)]
    #[case("5", ResolvedFilter::AcceptOnly(EventKind::LogMessage))]
    #[case(" 9 ", ResolvedFilter::AcceptOnly(EventKind::ContainerMetric))]
    #[case("2", ResolvedFilter::AcceptOnly(EventKind::HttpStart))]
    fn prompt_answers_resolve(#[case] answer: &'static str, #[case] expected: ResolvedFilter) {
        let resolved = resolve(&options(false, None), &answering_ui(answer)).expect("resolves");
        assert_eq!(resolved, expected);
    }

    #[rstest]
    #[case("bla", "Invalid filter choice bla. Enter an index from 2-9")]
    #[case("1", "Invalid filter choice 1")]
    #[case("10", "Invalid filter choice 10")]
    #[case("-3", "Invalid filter choice -3")]
    fn bad_prompt_answers_are_rejected(#[case] answer: &'static str, #[case] message: &str) {
        let error =
            resolve(&options(false, None), &answering_ui(answer)).expect_err("bad answer");
        assert_eq!(error.to_string(), message);
    }

    #[test]
    fn unreadable_answers_surface_as_read_errors() {
        let mut ui = MockUi::new();
        ui.expect_say().once().return_const(());
        ui.expect_ask()
            .once()
            .returning(|_| Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed")));
        let error = resolve(&options(false, None), &ui).expect_err("read failure");
        assert!(matches!(error, FilterError::ReadChoice(_)));
    }

    #[test]
    fn menu_lists_every_kind() {
        assert_snapshot!(menu(), @r"
        Please enter one of the following choices:
          hit 'enter' for all messages
          2 for HttpStart
          3 for HttpStop
          4 for HttpStartStop
          5 for LogMessage
          6 for ValueMetric
          7 for CounterEvent
          8 for Error
          9 for ContainerMetric
        ");
    }

    #[test]
    fn accept_only_matches_the_envelope_kind() {
        let log = nozzle_events::testing::sample_log_envelope("hello");
        assert!(ResolvedFilter::Unfiltered.accepts(&log));
        assert!(ResolvedFilter::AcceptOnly(EventKind::LogMessage).accepts(&log));
        assert!(!ResolvedFilter::AcceptOnly(EventKind::Error).accepts(&log));
    }
}

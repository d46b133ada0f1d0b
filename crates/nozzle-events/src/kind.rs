//! The fixed table of firehose event kinds.
//!
//! Each kind has a wire discriminant and a canonical name. The discriminant
//! doubles as the numeral offered by the interactive filter prompt, so the
//! table is the only place either mapping is defined.

use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr, VariantArray};

/// Discriminant carried in every envelope's `eventType` field.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
    Display,
    EnumString,
    IntoStaticStr,
    VariantArray,
)]
#[repr(i32)]
pub enum EventKind {
    /// Start of an HTTP request (legacy event).
    HttpStart = 2,
    /// End of an HTTP request (legacy event).
    HttpStop = 3,
    /// A complete HTTP request/response pair.
    HttpStartStop = 4,
    /// A line of application or platform log output.
    LogMessage = 5,
    /// A named gauge reading.
    ValueMetric = 6,
    /// An increment to a named counter.
    CounterEvent = 7,
    /// An error reported by a platform component.
    Error = 8,
    /// Resource usage of one application instance.
    ContainerMetric = 9,
}

impl EventKind {
    /// Every known kind in ascending discriminant order.
    pub const ALL: &'static [Self] = Self::VARIANTS;

    /// Looks a kind up by its exact, case-sensitive name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    /// Looks a kind up by its wire discriminant.
    #[must_use]
    pub fn from_numeral(numeral: i32) -> Option<Self> {
        Self::try_from(numeral).ok()
    }

    /// Canonical name, as used on the wire and by the `filter` option.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Wire discriminant and prompt numeral.
    #[must_use]
    pub fn numeral(self) -> i32 {
        i32::from(self)
    }

    /// Smallest numeral in the table.
    #[must_use]
    pub fn min_numeral() -> i32 {
        Self::ALL.iter().map(|kind| kind.numeral()).min().unwrap_or(0)
    }

    /// Largest numeral in the table.
    #[must_use]
    pub fn max_numeral() -> i32 {
        Self::ALL.iter().map(|kind| kind.numeral()).max().unwrap_or(0)
    }
}

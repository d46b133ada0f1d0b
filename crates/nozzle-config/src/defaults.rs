/// Subscription identifier used when none is configured.
///
/// Consumers sharing an identifier split the firehose between them, so the
/// default matches the name other nozzle clients have always used.
pub const DEFAULT_SUBSCRIPTION_ID: &str = "FirehosePlugin";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default log filter expression used by the binary.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binary.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

//! Layered configuration for the nozzle firehose client.
//!
//! Settings merge built-in defaults, an optional TOML file, `NOZZLE_*`
//! environment variables, and command-line flags, in increasing order of
//! precedence. Loading is delegated to `ortho_config`; this crate owns the
//! shape of the settings and the defaults applied when a layer is silent.

use std::borrow::Cow;
use std::ffi::OsString;

use ortho_config::declarative::LayerComposition;
use ortho_config::serde_json::Value;
use ortho_config::{MergeLayer, MergeProvenance, OrthoConfig, OrthoResult};
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_SUBSCRIPTION_ID, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Switches whose command-line flag can only turn them on.
const SWITCHES: [&str; 2] = ["debug", "no_filter"];

/// Resolved settings for one nozzle session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "NOZZLE")]
#[serde(default)]
pub struct Config {
    /// Base URL of the traffic controller, e.g. `wss://doppler.example.com:443`.
    pub endpoint: Option<String>,
    /// Access token sent verbatim in the `Authorization` header.
    pub token: Option<String>,
    /// Echo the websocket handshake to standard output.
    pub debug: bool,
    /// Show every event kind without prompting.
    pub no_filter: bool,
    /// Name of the single event kind to show.
    pub filter: Option<String>,
    /// Firehose subscription identifier.
    pub subscription_id: Option<String>,
    /// Stream one application's events instead of the whole firehose.
    pub app_guid: Option<String>,
    /// `tracing` filter expression for diagnostic logs.
    pub log_filter: Option<String>,
    /// Output format for diagnostic logs.
    pub log_format: Option<LogFormat>,
}

impl Config {
    /// Loads the layered configuration from `args` and the ambient layers.
    ///
    /// A switch left off on the command line is treated as unset, so a
    /// `true` from the configuration file or the environment still applies.
    ///
    /// # Errors
    ///
    /// Returns the aggregated `ortho_config` error when a layer cannot be
    /// read or the merged settings do not deserialise.
    pub fn load_layered<I, T>(args: I) -> OrthoResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let (layers, errors) = Self::compose_layers_from_iter(args).into_parts();
        let adjusted = layers.into_iter().map(unset_cli_switches).collect();
        LayerComposition::new(adjusted, errors).into_merge_result(Self::merge_from_layers)
    }

    /// Traffic controller endpoint, if one was configured.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        non_blank(self.endpoint.as_deref())
    }

    /// Access token, if one was configured.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        non_blank(self.token.as_deref())
    }

    /// Whether handshake tracing is enabled.
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Whether the filter prompt is bypassed in favour of all kinds.
    #[must_use]
    pub const fn no_filter(&self) -> bool {
        self.no_filter
    }

    /// The explicit filter name, if one was configured.
    ///
    /// Blank values count as absent so an empty `NOZZLE_FILTER` falls through
    /// to the interactive prompt.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        non_blank(self.filter.as_deref())
    }

    /// Subscription identifier, falling back to [`DEFAULT_SUBSCRIPTION_ID`].
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        non_blank(self.subscription_id.as_deref()).unwrap_or(DEFAULT_SUBSCRIPTION_ID)
    }

    /// Application GUID for the per-application stream, if configured.
    #[must_use]
    pub fn app_guid(&self) -> Option<&str> {
        non_blank(self.app_guid.as_deref())
    }

    /// Log filter expression, falling back to [`DEFAULT_LOG_FILTER`].
    #[must_use]
    pub fn log_filter(&self) -> &str {
        non_blank(self.log_filter.as_deref()).unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Log output format, falling back to [`default_log_format`].
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }
}

/// Drops `false` switches from the command-line layer.
fn unset_cli_switches(layer: MergeLayer<'static>) -> MergeLayer<'static> {
    if layer.provenance() != MergeProvenance::Cli {
        return layer;
    }
    let mut value = layer.into_value();
    if let Value::Object(fields) = &mut value {
        for switch in SWITCHES {
            if fields.get(switch) == Some(&Value::Bool(false)) {
                fields.remove(switch);
            }
        }
    }
    MergeLayer::cli(Cow::Owned(value))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

//! Environment variable names used by this crate for convenient
//! configuration of the layer from services.
//!
//! These are purely helpers; the layer and builder types remain decoupled
//! from environment access.

use std::str::FromStr;
use tokio::time::Duration;

use crate::format::{Locale, LocaleParseError};
use crate::init::LayerConfig;
use crate::policy::{IncludedData, PolicyParseError};

/// Least severe level captured, e.g. `info` or `warn`.
pub const OTLP_SINK_MIN_LEVEL_ENV: &str = "OTLP_SINK_MIN_LEVEL";

/// Optional record fields, e.g. `TraceIdField,SpanIdField`.
pub const OTLP_SINK_INCLUDED_DATA_ENV: &str = "OTLP_SINK_INCLUDED_DATA";

/// Locale tag used when rendering messages, e.g. `de-DE`.
pub const OTLP_SINK_LOCALE_ENV: &str = "OTLP_SINK_LOCALE";

/// Capacity of the channel between producers and the batching task.
pub const OTLP_SINK_CHANNEL_BUFFER_ENV: &str = "OTLP_SINK_CHANNEL_BUFFER";

/// Records per sink call.
pub const OTLP_SINK_BATCH_SIZE_ENV: &str = "OTLP_SINK_BATCH_SIZE";

/// Maximum delay before a partial batch is sent, in milliseconds.
pub const OTLP_SINK_FLUSH_INTERVAL_MS_ENV: &str = "OTLP_SINK_FLUSH_INTERVAL_MS";

/// `true`/`false`: also print events to the console.
pub const OTLP_SINK_STDOUT_ENV: &str = "OTLP_SINK_STDOUT";

/// Error type returned when the environment holds an invalid setting.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{key}: invalid value {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("OTLP_SINK_INCLUDED_DATA: {0}")]
    Policy(#[from] PolicyParseError),

    #[error("OTLP_SINK_LOCALE: {0}")]
    Locale(#[from] LocaleParseError),
}

impl LayerConfig {
    /// [`LayerConfig::default`] overridden by any `OTLP_SINK_*` variables
    /// that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`LayerConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LayerConfig::default();

        if let Some(value) = lookup(OTLP_SINK_MIN_LEVEL_ENV) {
            config.min_level = parse(OTLP_SINK_MIN_LEVEL_ENV, &value)?;
        }
        if let Some(value) = lookup(OTLP_SINK_INCLUDED_DATA_ENV) {
            config.included_data = IncludedData::from_str(&value)?;
        }
        if let Some(value) = lookup(OTLP_SINK_LOCALE_ENV) {
            config.locale = Locale::from_str(&value)?;
        }
        if let Some(value) = lookup(OTLP_SINK_CHANNEL_BUFFER_ENV) {
            config.channel_buffer = parse(OTLP_SINK_CHANNEL_BUFFER_ENV, &value)?;
        }
        if let Some(value) = lookup(OTLP_SINK_BATCH_SIZE_ENV) {
            config.batch_size = parse(OTLP_SINK_BATCH_SIZE_ENV, &value)?;
        }
        if let Some(value) = lookup(OTLP_SINK_FLUSH_INTERVAL_MS_ENV) {
            config.flush_interval = Duration::from_millis(parse(OTLP_SINK_FLUSH_INTERVAL_MS_ENV, &value)?);
        }
        if let Some(value) = lookup(OTLP_SINK_STDOUT_ENV) {
            config.enable_stdout = parse(OTLP_SINK_STDOUT_ENV, &value)?;
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<LayerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        LayerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.batch_size, LayerConfig::default().batch_size);
        assert_eq!(config.included_data, IncludedData::default());
    }

    #[test]
    fn reads_all_settings() {
        let config = config_from(&[
            (OTLP_SINK_MIN_LEVEL_ENV, "warn"),
            (OTLP_SINK_INCLUDED_DATA_ENV, "TemplateBody|MessageTemplateMD5HashAttribute"),
            (OTLP_SINK_LOCALE_ENV, "de-DE"),
            (OTLP_SINK_BATCH_SIZE_ENV, "64"),
            (OTLP_SINK_FLUSH_INTERVAL_MS_ENV, "250"),
            (OTLP_SINK_STDOUT_ENV, "false"),
        ])
        .unwrap();

        assert_eq!(config.min_level, tracing::Level::WARN);
        assert_eq!(
            config.included_data,
            IncludedData::TEMPLATE_BODY | IncludedData::MESSAGE_TEMPLATE_MD5_HASH_ATTRIBUTE
        );
        assert_eq!(config.locale.decimal_separator(), ",");
        assert_eq!(config.locale.group_separator(), ".");
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert!(!config.enable_stdout);
    }

    #[test]
    fn accepts_any_cldr_locale() {
        let config = config_from(&[(OTLP_SINK_LOCALE_ENV, "sv_SE")]).unwrap();
        assert_eq!(config.locale.decimal_separator(), ",");
    }

    #[test]
    fn reports_invalid_values() {
        let err = config_from(&[(OTLP_SINK_BATCH_SIZE_ENV, "lots")]).unwrap_err();
        assert_eq!(err.to_string(), "OTLP_SINK_BATCH_SIZE: invalid value \"lots\"");

        let err = config_from(&[(OTLP_SINK_INCLUDED_DATA_ENV, "Everything")]).unwrap_err();
        assert!(matches!(err, ConfigError::Policy(_)));

        let err = config_from(&[(OTLP_SINK_LOCALE_ENV, "xx-YY")]).unwrap_err();
        assert!(matches!(err, ConfigError::Locale(_)));
    }
}

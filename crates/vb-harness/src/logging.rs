//! Subscriber setup for the harness binaries.

use std::env;
use std::io;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const TRACE_ENV: &str = "VECBENCH_TRACE";
pub const LOG_FORMAT_ENV: &str = "VECBENCH_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if raw.eq_ignore_ascii_case("pretty") {
            Ok(Self::Pretty)
        } else {
            Err(format!(
                "invalid {LOG_FORMAT_ENV} '{raw}' (expected 'json' or 'pretty')"
            ))
        }
    }
}

/// Builds the event filter. `level` wins over `VECBENCH_TRACE`; with neither
/// set, logging is off.
pub fn build_filter(level: Option<&str>) -> Result<EnvFilter, String> {
    let level_value = level
        .map(str::to_string)
        .or_else(|| env::var(TRACE_ENV).ok())
        .unwrap_or_else(|| "off".to_string());

    if level_value.eq_ignore_ascii_case("off") {
        Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()))
    } else {
        EnvFilter::try_new(&level_value).map_err(|err| format!("invalid log filter: {err}"))
    }
}

/// Installs a stderr subscriber. Returns `Ok(false)` when one is already set.
pub fn init_tracing(level: Option<&str>) -> Result<bool, String> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let filter = build_filter(level)?;
    let format = env::var(LOG_FORMAT_ENV)
        .map_or(Ok(LogFormat::Pretty), |raw| LogFormat::parse(&raw))?;

    let map_init_err = |err: tracing_subscriber::util::TryInitError| {
        format!("failed to initialize logging: {err}")
    };

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .json(),
            )
            .try_init()
            .map_err(map_init_err)?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .pretty(),
            )
            .try_init()
            .map_err(map_init_err)?,
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, build_filter};

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::parse("JSON"), Ok(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Ok(LogFormat::Pretty));
        assert!(LogFormat::parse("xml").is_err());
    }

    #[test]
    fn explicit_levels_parse() {
        assert!(build_filter(Some("off")).is_ok());
        assert!(build_filter(Some("vb_harness=debug")).is_ok());
        assert!(build_filter(Some("vb_harness=loud")).is_err());
    }
}

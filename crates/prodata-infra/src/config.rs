//! Environment-driven configuration.

use std::env;
use std::time::Duration;

use prodata_api::{ClientConfig, DEFAULT_TIMEOUT};

use crate::wait::PollSettings;
use crate::{Error, Result};

fn must(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match lookup(key) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MissingEnv(key.into())),
    }
}

fn secs_env(key: &str, default: Duration) -> Result<Duration> {
    parse_secs(key, env::var(key).ok().as_deref(), default)
}

/// Whole seconds, falling back to `default` when unset or blank.
pub fn parse_secs(key: &str, raw: Option<&str>, default: Duration) -> Result<Duration> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(Error::Invalid {
                field: key.into(),
                reason: format!("expected a positive number of seconds, got {v:?}"),
            }),
        },
    }
}

/// Read `PRODATA_*` client settings from the process environment.
pub fn client_config_from_env() -> Result<ClientConfig> {
    client_config_from(|key| env::var(key).ok())
}

/// Client settings from `lookup`, which sees only `PRODATA_*` keys.
pub fn client_config_from(lookup: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
    Ok(ClientConfig {
        api_base_url: must(&lookup, "PRODATA_API_BASE_URL")?,
        api_key_id: must(&lookup, "PRODATA_API_KEY_ID")?,
        api_secret_key: must(&lookup, "PRODATA_API_SECRET_KEY")?,
        region: lookup("PRODATA_REGION").unwrap_or_default(),
        project_tag: lookup("PRODATA_PROJECT_TAG").unwrap_or_default(),
        timeout: parse_secs(
            "PRODATA_HTTP_TIMEOUT_SECS",
            lookup("PRODATA_HTTP_TIMEOUT_SECS").as_deref(),
            DEFAULT_TIMEOUT,
        )?,
    })
}

pub fn poll_settings_from_env() -> Result<PollSettings> {
    let defaults = PollSettings::default();
    Ok(PollSettings {
        interval: secs_env("PRODATA_POLL_INTERVAL_SECS", defaults.interval)?,
        deadline: secs_env("PRODATA_POLL_TIMEOUT_SECS", defaults.deadline)?,
    })
}

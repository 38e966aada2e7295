// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, backend endpoint paths and logging
//! setup. Configuration is read from the environment once, when the client
//! context is built.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `UDRIVE_API_BASE_URL` | Backend origin | `https://localhost:7001` |
//! | `UDRIVE_REQUEST_TIMEOUT_SECS` | Per-attempt HTTP timeout | `15` |
//! | `UDRIVE_ACCEPT_INVALID_CERTS` | Accept the local backend's self-signed certificate | `false` |
//! | `UDRIVE_RETRY_MUTATIONS` | Re-send PUT/POST/DELETE with every header format | `true` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,udrive_client=debug` |

use std::time::Duration;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

/// Environment variable overriding the backend origin.
pub const API_BASE_URL_ENV: &str = "UDRIVE_API_BASE_URL";

/// Environment variable for the per-attempt request timeout, in seconds.
pub const REQUEST_TIMEOUT_ENV: &str = "UDRIVE_REQUEST_TIMEOUT_SECS";

/// Environment variable allowing a self-signed backend certificate.
pub const ACCEPT_INVALID_CERTS_ENV: &str = "UDRIVE_ACCEPT_INVALID_CERTS";

/// Environment variable controlling whether mutations are re-sent after a
/// non-authentication failure.
pub const RETRY_MUTATIONS_ENV: &str = "UDRIVE_RETRY_MUTATIONS";

/// Environment variable selecting `json` or `pretty` log output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// The backend runs as a local HTTPS service.
pub const DEFAULT_API_BASE_URL: &str = "https://localhost:7001";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_LOG_FILTER: &str = "info,udrive_client=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API base URL {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin every relative endpoint is resolved against.
    /// Always ends with `/`.
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
    /// When false, a mutation is only re-sent with the next header format if
    /// the backend answered 401/403 (the request was not acted on).
    pub retry_mutations: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: normalize_base_url(DEFAULT_API_BASE_URL)
                .expect("Default API base URL must parse"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: false,
            retry_mutations: true,
        }
    }
}

impl ClientConfig {
    /// Build from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base) = env_optional(API_BASE_URL_ENV) {
            config.api_base_url = normalize_base_url(&base)?;
        }
        if let Some(raw) = env_optional(REQUEST_TIMEOUT_ENV) {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: REQUEST_TIMEOUT_ENV,
                value: raw.clone(),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = env_optional(ACCEPT_INVALID_CERTS_ENV) {
            config.accept_invalid_certs = parse_flag(ACCEPT_INVALID_CERTS_ENV, &raw)?;
        }
        if let Some(raw) = env_optional(RETRY_MUTATIONS_ENV) {
            config.retry_mutations = parse_flag(RETRY_MUTATIONS_ENV, &raw)?;
        }

        Ok(config)
    }

    /// Override the backend origin.
    pub fn with_api_base_url(mut self, base: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url(base)?;
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_mutations(mut self, retry: bool) -> Self {
        self.retry_mutations = retry;
        self
    }
}

/// Parse a base URL and make sure it ends with `/` so relative endpoint
/// paths join beneath it instead of replacing its last segment.
fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&with_slash).map_err(|e| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidBaseUrl {
            value: raw.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Install the global tracing subscriber.
///
/// `LOG_FORMAT=json` selects JSON lines, anything else the pretty format.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = env_optional(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Backend endpoint paths, relative to the API base URL.
pub mod endpoints {
    pub const LOGIN: &str = "api/auth/login";
    pub const SIGNUP: &str = "api/auth/signup";
    pub const IDENTITY_LOGIN: &str = "api/auth/google";
    pub const CONNECTIVITY_CHECK: &str = "api/test";

    pub const CARS: &str = "api/cars";
    pub const USERS: &str = "api/users";
    pub const RESERVATIONS: &str = "api/reservations";
    pub const MY_RESERVATIONS: &str = "api/reservations/me";

    pub fn car(id: i64) -> String {
        format!("{CARS}/{id}")
    }

    pub fn car_availability(id: i64) -> String {
        format!("{CARS}/{id}/availability")
    }

    pub fn user(id: i64) -> String {
        format!("{USERS}/{id}")
    }

    /// Reservation mutation: `validate`, `decline` or `cancel`.
    pub fn reservation_action(id: i64, action: &str) -> String {
        format!("{RESERVATIONS}/{action}/{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_ends_with_slash() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url.as_str(), "https://localhost:7001/");
        assert!(config.retry_mutations);
    }

    #[test]
    fn base_url_override_keeps_path_prefix() {
        let config = ClientConfig::default()
            .with_api_base_url("https://api.udrive.test/v2")
            .unwrap();
        let joined = config.api_base_url.join(endpoints::CARS).unwrap();
        assert_eq!(joined.as_str(), "https://api.udrive.test/v2/api/cars");
    }

    #[test]
    fn base_url_rejects_other_schemes() {
        let result = ClientConfig::default().with_api_base_url("ftp://files.udrive.test");
        assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));

        let result = ClientConfig::default().with_api_base_url("not a url");
        assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn flags_parse() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(!parse_flag("X", "off").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }

    #[test]
    fn reservation_action_paths() {
        assert_eq!(
            endpoints::reservation_action(42, "validate"),
            "api/reservations/validate/42"
        );
        assert_eq!(endpoints::car_availability(3), "api/cars/3/availability");
    }
}

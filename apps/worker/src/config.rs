use std::path::PathBuf;
use std::time::Duration;

use stocklens_core::{AppError, AppResult};
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api";
const DEFAULT_STORE_PATH: &str = ".stocklens";
const REDIS_KEY_PREFIX: &str = "stocklens";

/// Durable backend for notification state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStoreBackend {
    /// Process memory; state is lost on exit.
    Memory,
    /// JSON files under a directory.
    File(PathBuf),
    /// Redis string keys under a prefix.
    Redis {
        /// Connection URL.
        url: String,
        /// Key prefix.
        key_prefix: String,
    },
}

/// Worker runtime configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Tracking API base URL.
    pub api_base_url: Url,
    /// Optional bearer token for the tracking API.
    pub api_token: Option<String>,
    /// Per-request timeout.
    pub http_timeout: Duration,
    /// Alert poll period.
    pub poll_interval: Duration,
    /// Where notification state is persisted.
    pub store_backend: NotificationStoreBackend,
}

impl WorkerConfig {
    /// Reads configuration from process environment variables.
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let lookup = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let raw_base_url =
            lookup("STOCKLENS_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let api_base_url = Url::parse(raw_base_url.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "invalid STOCKLENS_API_BASE_URL value '{raw_base_url}': {error}"
            ))
        })?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "STOCKLENS_API_BASE_URL must use http or https, got '{}'",
                api_base_url.scheme()
            )));
        }

        let api_token = lookup("STOCKLENS_API_TOKEN");
        let http_timeout_seconds = parse_positive_u64(&lookup, "STOCKLENS_HTTP_TIMEOUT_SECONDS", 15)?;
        let poll_interval_seconds = parse_positive_u64(&lookup, "ALERT_POLL_INTERVAL_SECONDS", 60)?;

        let store_backend = match lookup("NOTIFICATION_STORE_BACKEND")
            .unwrap_or_else(|| "file".to_owned())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => NotificationStoreBackend::Memory,
            "file" => NotificationStoreBackend::File(PathBuf::from(
                lookup("NOTIFICATION_STORE_PATH").unwrap_or_else(|| DEFAULT_STORE_PATH.to_owned()),
            )),
            "redis" => NotificationStoreBackend::Redis {
                url: lookup("REDIS_URL").ok_or_else(|| {
                    AppError::Validation(
                        "REDIS_URL is required when NOTIFICATION_STORE_BACKEND=redis".to_owned(),
                    )
                })?,
                key_prefix: REDIS_KEY_PREFIX.to_owned(),
            },
            other => {
                return Err(AppError::Validation(format!(
                    "invalid NOTIFICATION_STORE_BACKEND value '{other}', expected memory, file or redis"
                )));
            }
        };

        Ok(Self {
            api_base_url,
            api_token,
            http_timeout: Duration::from_secs(http_timeout_seconds),
            poll_interval: Duration::from_secs(poll_interval_seconds),
            store_backend,
        })
    }
}

fn parse_positive_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> AppResult<u64> {
    let value = match lookup(name) {
        Some(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        })?,
        None => default,
    };

    if value == 0 {
        return Err(AppError::Validation(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use stocklens_core::AppError;

    use super::{NotificationStoreBackend, WorkerConfig};

    fn load(pairs: &[(&str, &str)]) -> Result<WorkerConfig, AppError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        WorkerConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]);
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert_eq!(config.api_base_url.as_str(), "http://127.0.0.1:5000/api");
        assert_eq!(config.api_token, None);
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(
            config.store_backend,
            NotificationStoreBackend::File(PathBuf::from(".stocklens"))
        );
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("STOCKLENS_API_TOKEN", "  "), ("ALERT_POLL_INTERVAL_SECONDS", "")]);
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert_eq!(config.api_token, None);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn redis_backend_requires_url() {
        let missing = load(&[("NOTIFICATION_STORE_BACKEND", "redis")]);
        assert!(matches!(missing, Err(AppError::Validation(_))));

        let config = load(&[
            ("NOTIFICATION_STORE_BACKEND", "Redis"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
        ]);
        assert!(config.is_ok());
        assert_eq!(
            config.unwrap_or_else(|_| unreachable!()).store_backend,
            NotificationStoreBackend::Redis {
                url: "redis://127.0.0.1:6379".to_owned(),
                key_prefix: "stocklens".to_owned(),
            }
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for pairs in [
            [("ALERT_POLL_INTERVAL_SECONDS", "0")],
            [("STOCKLENS_HTTP_TIMEOUT_SECONDS", "soon")],
            [("STOCKLENS_API_BASE_URL", "not a url")],
            [("STOCKLENS_API_BASE_URL", "ftp://files.example/api")],
            [("NOTIFICATION_STORE_BACKEND", "sqlite")],
        ] {
            assert!(
                matches!(load(&pairs), Err(AppError::Validation(_))),
                "expected rejection for {pairs:?}"
            );
        }
    }
}

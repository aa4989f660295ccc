//! Process-wide configuration, resolved once at startup and passed down
//! explicitly to the transport, the coordinator and the resources.

use crate::error::ConfigError;
use crate::validator::UploadPolicy;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    /// Uploads allowed in flight at once; the rest wait as `pending`.
    pub concurrency: usize,
    /// Poll `/api/upload-status/:id` to conclude processing. When off, the
    /// upload acknowledgement concludes it.
    pub status_polling: bool,
    pub poll_interval: Duration,
    /// Ceiling on the processing phase before the task fails with a timeout.
    pub processing_timeout: Duration,
    /// Ask `/api/validate-file` about each file before creating tasks.
    pub server_precheck: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            concurrency: 3,
            status_polling: true,
            poll_interval: Duration::from_millis(1000),
            processing_timeout: Duration::from_secs(300),
            server_precheck: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub policy: UploadPolicy,
    pub upload: UploadSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Missing keys use
    /// defaults; present but malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(url) = lookup("DELIVERY_API_URL").or_else(|| lookup("API_URL")) {
            let url = url.trim().to_string();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    key: "DELIVERY_API_URL",
                    value: url,
                    reason: "expected an http:// or https:// URL".to_string(),
                });
            }
            config.api.base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(secs) = parse::<u64, _>(&lookup, "DELIVERY_HTTP_TIMEOUT_SECS")? {
            config.api.request_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = parse::<u64, _>(&lookup, "UPLOAD_MAX_FILE_SIZE_BYTES")? {
            config.policy.max_file_size_bytes = max;
        }
        if let Some(max) = parse::<usize, _>(&lookup, "UPLOAD_MAX_FILES")? {
            config.policy.max_files_per_batch = max;
        }
        if let Some(concurrency) = parse::<usize, _>(&lookup, "UPLOAD_CONCURRENCY")? {
            if concurrency == 0 {
                return Err(ConfigError::Invalid {
                    key: "UPLOAD_CONCURRENCY",
                    value: concurrency.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.upload.concurrency = concurrency;
        }
        if let Some(polling) = parse_bool(&lookup, "UPLOAD_STATUS_POLLING")? {
            config.upload.status_polling = polling;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "UPLOAD_STATUS_POLL_MS")? {
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    key: "UPLOAD_STATUS_POLL_MS",
                    value: ms.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.upload.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "UPLOAD_PROCESSING_TIMEOUT_SECS")? {
            config.upload.processing_timeout = Duration::from_secs(secs);
        }
        if let Some(precheck) = parse_bool(&lookup, "UPLOAD_SERVER_PRECHECK")? {
            config.upload.server_precheck = precheck;
        }

        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn parse_bool<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(None),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid {
                key,
                value: v,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}

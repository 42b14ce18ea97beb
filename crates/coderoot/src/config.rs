use std::{env, str::FromStr, time::Duration};

use coderoot_core::cache::USER_CACHE_TTL;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Computed once at startup and handed to [`AppState`](crate::state::AppState).
#[derive(Debug, Clone)]
pub struct Config {
    /// Language given to new users who do not send one (default: "fa")
    pub default_language: String,
    /// Cache TTL in seconds, clamped to 1..=30 days (default: 3600)
    pub cache_ttl_seconds: u64,
    /// Maximum number of in-memory cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Bound on a single store call in milliseconds (default: 5000)
    pub store_timeout_ms: u64,
    /// Bound on a single cache call in milliseconds (default: 1000)
    pub cache_timeout_ms: u64,
    /// Bound on a whole HTTP request in seconds (default: 10)
    pub request_timeout_secs: u64,
    /// Path to SQLite database file (default: "coderoot.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    #[allow(dead_code)]
    pub redis_url: String,
    /// Log output format (default: pretty)
    pub log_format: LogFormat,
}

/// Longest cache TTL accepted from the environment (30 days).
pub const MAX_CACHE_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DEFAULT_LANGUAGE` - Language for new users (default: "fa")
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds, 1 to 30 days (default: 3600)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `STORE_TIMEOUT_MS` - Store call timeout (default: 5000)
    /// - `CACHE_TIMEOUT_MS` - Cache call timeout (default: 1000)
    /// - `REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: 10)
    /// - `SQLITE_PATH` - SQLite database path (default: "coderoot.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `LOG_FORMAT` - `pretty` or `json` (default: pretty)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            default_language: lookup("DEFAULT_LANGUAGE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "fa".to_string()),
            cache_ttl_seconds: parse_or(lookup("CACHE_TTL_SECONDS"), USER_CACHE_TTL.as_secs())
                .clamp(1, MAX_CACHE_TTL_SECONDS),
            cache_max_entries: parse_or(lookup("CACHE_MAX_ENTRIES"), 10_000),
            store_timeout_ms: parse_or(lookup("STORE_TIMEOUT_MS"), 5000),
            cache_timeout_ms: parse_or(lookup("CACHE_TIMEOUT_MS"), 1000),
            request_timeout_secs: parse_or(lookup("REQUEST_TIMEOUT_SECS"), 10),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "coderoot.db".to_string()),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
            log_format: parse_or(lookup("LOG_FORMAT"), LogFormat::Pretty),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    /// Built-in defaults, ignoring the environment.
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.default_language, "fa");
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_timeout(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.sqlite_path, "coderoot.db");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_values_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("DEFAULT_LANGUAGE", "en"),
            ("CACHE_TTL_SECONDS", "600"),
            ("STORE_TIMEOUT_MS", "250"),
            ("LOG_FORMAT", "JSON"),
        ]));

        assert_eq!(config.default_language, "en");
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.store_timeout(), Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("CACHE_TTL_SECONDS", "an hour"),
            ("CACHE_MAX_ENTRIES", "-1"),
            ("DEFAULT_LANGUAGE", "  "),
            ("LOG_FORMAT", "xml"),
        ]));

        assert_eq!(config.cache_ttl_seconds, 3600);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.default_language, "fa");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_cache_ttl_is_clamped() {
        let huge = u64::MAX.to_string();
        let config = Config::from_lookup(lookup_from(&[("CACHE_TTL_SECONDS", huge.as_str())]));
        assert_eq!(config.cache_ttl_seconds, MAX_CACHE_TTL_SECONDS);

        let config = Config::from_lookup(lookup_from(&[("CACHE_TTL_SECONDS", "0")]));
        assert_eq!(config.cache_ttl(), Duration::from_secs(1));
    }
}

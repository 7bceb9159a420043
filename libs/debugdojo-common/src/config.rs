// Process configuration, loaded once at start-up and immutable afterwards

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_FORBIDDEN_MARKER: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Settings for the upstream generative-model API.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Settings for the test execution runner.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub python: String,
    pub case_timeout: Duration,
    pub max_concurrent_runs: usize,
    pub forbidden_marker: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub static_dir: Option<PathBuf>,
    pub log_format: LogFormat,
    pub gemini: GeminiSettings,
    pub runner: RunnerSettings,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or("DEBUGDOJO_BIND", get("DEBUGDOJO_BIND"), || {
            SocketAddr::from(([0, 0, 0, 0], 8000))
        })?;

        let log_format = match get("DEBUGDOJO_LOG_FORMAT").as_deref() {
            None => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    key: "DEBUGDOJO_LOG_FORMAT",
                    value: v.to_string(),
                    reason: "expected `text` or `json`".to_string(),
                })
            }
        };

        let timeout_secs: u64 = parse_or("GEMINI_TIMEOUT_SECS", get("GEMINI_TIMEOUT_SECS"), || 60)?;
        let case_timeout_ms: u64 =
            parse_or("DEBUGDOJO_CASE_TIMEOUT_MS", get("DEBUGDOJO_CASE_TIMEOUT_MS"), || 10_000)?;
        let max_concurrent_runs: usize = parse_or(
            "DEBUGDOJO_MAX_CONCURRENT_RUNS",
            get("DEBUGDOJO_MAX_CONCURRENT_RUNS"),
            || 4,
        )?;
        if max_concurrent_runs == 0 {
            return Err(ConfigError::Invalid {
                key: "DEBUGDOJO_MAX_CONCURRENT_RUNS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            static_dir: get("DEBUGDOJO_STATIC_DIR").map(PathBuf::from),
            log_format,
            gemini: GeminiSettings {
                api_key: get("GEMINI_API_KEY"),
                base_url: get("GEMINI_API_BASE")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            runner: RunnerSettings {
                python: get("DEBUGDOJO_PYTHON").unwrap_or_else(|| "python3".to_string()),
                case_timeout: Duration::from_millis(case_timeout_ms),
                max_concurrent_runs,
                forbidden_marker: get("DEBUGDOJO_FORBIDDEN_MARKER")
                    .unwrap_or_else(|| DEFAULT_FORBIDDEN_MARKER.to_string()),
            },
        })
    }
}

fn parse_or<T, D>(key: &'static str, raw: Option<String>, default: D) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    D: FnOnce() -> T,
{
    match raw {
        None => Ok(default()),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        },
    }
}

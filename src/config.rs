//! Process configuration from the environment

use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

/// Where invocations are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Replay a recorded NDJSON stream for every turn
    Replay(PathBuf),
    /// Live agent behind an HTTP gateway
    Gateway(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub agent_id: String,
    pub agent_alias_id: String,
    pub backend: Backend,
    pub enable_trace: bool,
    pub telemetry_file: Option<PathBuf>,
    pub port: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("set AGENT_GATEWAY or AGENT_REPLAY_FILE to choose a backend")]
    NoBackend,
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let backend = match (get("AGENT_REPLAY_FILE"), get("AGENT_GATEWAY")) {
            (Some(path), _) => Backend::Replay(PathBuf::from(path)),
            (None, Some(url)) => Backend::Gateway(url),
            (None, None) => return Err(ConfigError::NoBackend),
        };

        let enable_trace = match get("AGENT_ENABLE_TRACE") {
            None => true,
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "AGENT_ENABLE_TRACE",
                value,
            })?,
        };

        let port = match get("AGENT_TRACE_PORT") {
            None => DEFAULT_PORT,
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "AGENT_TRACE_PORT",
                value,
            })?,
        };

        Ok(Self {
            agent_id: required("AGENT_ID")?,
            agent_alias_id: required("AGENT_ALIAS_ID")?,
            backend,
            enable_trace,
            telemetry_file: get("AGENT_TELEMETRY_FILE").map(PathBuf::from),
            port,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

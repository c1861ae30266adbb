use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Configuration for the service, read once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub backend_url: String,
    pub backend_timeout: Duration,
    /// Idle view sessions older than this are swept.
    pub session_ttl: Duration,
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            log_format: LogFormat::Json,
        }
    }
}

impl ServiceConfig {
    /// Reads the environment. Warnings about rejected values are returned rather than
    /// logged, since this runs before the subscriber is installed.
    pub fn from_env() -> (Self, Vec<String>) {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source. Unparseable numbers fall back
    /// to their defaults and produce a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<String>) {
        let defaults = Self::default();
        let mut warnings = Vec::new();

        let port = parse_or(lookup("PORT"), "PORT", defaults.port, &mut warnings);
        let timeout_secs = parse_or(
            lookup("BACKEND_TIMEOUT_SECS"),
            "BACKEND_TIMEOUT_SECS",
            DEFAULT_BACKEND_TIMEOUT_SECS,
            &mut warnings,
        );
        let ttl_secs = parse_or(
            lookup("SESSION_TTL_SECS"),
            "SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
            &mut warnings,
        );
        let backend_url = lookup("BACKEND_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.backend_url);
        let log_format = LogFormat::from_value(lookup("LOG_FORMAT").as_deref());

        let config = Self {
            port,
            backend_url,
            backend_timeout: Duration::from_secs(timeout_secs),
            session_ttl: Duration::from_secs(ttl_secs),
            log_format,
        };
        (config, warnings)
    }
}

fn parse_or<T: std::str::FromStr + Copy>(
    value: Option<String>,
    key: &str,
    default: T,
    warnings: &mut Vec<String>,
) -> T {
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warnings.push(format!("Invalid value {:?} for {}, using default", raw, key));
            default
        }),
    }
}

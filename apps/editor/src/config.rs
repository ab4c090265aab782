use std::time::Duration;

use anyhow::{ensure, Context, Result};

/// Application configuration loaded from environment variables.
/// Every setting has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on concurrently open editing sessions.
    pub max_sessions: usize,
    /// Seconds a session may sit untouched before it is closed.
    pub session_ttl_secs: u64,
    pub cors_permissive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            max_sessions: 1000,
            session_ttl_secs: 3600,
            cors_permissive: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let session_ttl_secs = parse_or("SESSION_TTL_SECS", &lookup, defaults.session_ttl_secs)?;
        ensure!(session_ttl_secs > 0, "SESSION_TTL_SECS must be positive");

        Ok(Config {
            port: parse_or("PORT", &lookup, defaults.port)?,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
            max_sessions: parse_or("MAX_SESSIONS", &lookup, defaults.max_sessions)?,
            session_ttl_secs,
            cors_permissive: parse_or("CORS_PERMISSIVE", &lookup, defaults.cors_permissive)?,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.max_sessions, 1000);
        assert_eq!(config.session_ttl(), Duration::from_secs(3600));
        assert!(config.cors_permissive);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("MAX_SESSIONS", "5"),
            ("SESSION_TTL_SECS", "90"),
            ("CORS_PERMISSIVE", "false"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_sessions, 5);
        assert_eq!(config.session_ttl_secs, 90);
        assert!(!config.cors_permissive);
        assert_eq!(config.rust_log, "debug");
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_zero_session_ttl_is_an_error() {
        let err = Config::from_lookup(lookup(&[("SESSION_TTL_SECS", "0")])).unwrap_err();
        assert!(err.to_string().contains("SESSION_TTL_SECS"));
    }
}

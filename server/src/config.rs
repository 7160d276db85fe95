//! Server configuration loaded from the environment.
//!
//! DESIGN
//! ======
//! All knobs are read once at startup into [`ServerConfig`] and shared
//! read-only through `AppState`. Parsing goes through a lookup closure so
//! tests can supply values without touching process-wide env vars.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::str::FromStr;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SIGN_IN_URL: &str = "/login";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Where unauthenticated users are sent to sign in.
    pub sign_in_url: String,
    /// Approval flag given to newly created annotations.
    pub auto_approve: bool,
    /// Enables `POST /api/dev/session`.
    pub dev_auth_bypass: bool,
    pub cookie_secure: bool,
}

impl ServerConfig {
    /// Build from process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `DATABASE_URL` is unset or a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `DATABASE_URL` is missing or a value fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let sign_in_url = lookup("SIGN_IN_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SIGN_IN_URL.to_owned());
        let cookie_secure = match env_bool(&lookup, "COOKIE_SECURE")? {
            Some(value) => value,
            None => sign_in_url.starts_with("https://"),
        };

        Ok(Self {
            port: env_parse(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT),
            database_url,
            db_max_connections: env_parse(&lookup, "DB_MAX_CONNECTIONS")?.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            sign_in_url,
            auto_approve: env_bool(&lookup, "AUTO_APPROVE")?.unwrap_or(true),
            dev_auth_bypass: env_bool(&lookup, "DEV_AUTH_BYPASS")?.unwrap_or(false),
            cookie_secure,
        })
    }

    /// Sign-in URL carrying `return_to` as the `redirect_to` parameter.
    #[must_use]
    pub fn sign_in_redirect(&self, return_to: &str) -> String {
        let sep = if self.sign_in_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}redirect_to={}", self.sign_in_url, anchor::marker::encode_component(return_to))
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<bool>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_bool(&raw).map(Some).ok_or(ConfigError::Invalid { key, value: raw }),
    }
}

fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

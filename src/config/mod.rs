use std::env;

use thiserror::Error;

use crate::supabase::inspect_api_key;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub host: String,
    pub port: u16,

    /// Bearer token for `/api/*` and `/ws`. Auth is off when unset.
    pub api_token: Option<String>,

    pub realtime_enabled: bool,
    pub comparison_window_days: i64,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let supabase_url = var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        if !(supabase_url.starts_with("https://") || supabase_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                name: "SUPABASE_URL",
                reason: format!("expected an http(s) URL, got {supabase_url:?}"),
            });
        }

        let supabase_anon_key =
            var("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
        let claims = inspect_api_key(&supabase_anon_key).map_err(|e| ConfigError::Invalid {
            name: "SUPABASE_ANON_KEY",
            reason: e.to_string(),
        })?;
        if claims.is_service_role() {
            return Err(ConfigError::Invalid {
                name: "SUPABASE_ANON_KEY",
                reason: "a service_role key was supplied; use the anon key".into(),
            });
        }
        if claims.is_expired(chrono::Utc::now().timestamp()) {
            tracing::warn!("SUPABASE_ANON_KEY has expired; queries will be rejected");
        }

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or("PORT", var("PORT"), 8080)?,
            api_token: var("API_TOKEN"),
            realtime_enabled: parse_or("REALTIME_ENABLED", var("REALTIME_ENABLED"), true)?,
            comparison_window_days: window_days(var("COMPARISON_WINDOW_DAYS"))?,
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", var("HTTP_TIMEOUT_SECS"), 15)?,
        })
    }

    /// Returns true if bearer-token auth is configured.
    pub fn has_api_token(&self) -> bool {
        self.api_token.is_some()
    }
}

/// Longest comparison window accepted, in days.
pub const MAX_COMPARISON_WINDOW_DAYS: i64 = 3650;

fn window_days(raw: Option<String>) -> Result<i64, ConfigError> {
    let days = parse_or("COMPARISON_WINDOW_DAYS", raw, 30)?;
    if !(1..=MAX_COMPARISON_WINDOW_DAYS).contains(&days) {
        return Err(ConfigError::Invalid {
            name: "COMPARISON_WINDOW_DAYS",
            reason: format!("{days} is outside 1..={MAX_COMPARISON_WINDOW_DAYS}"),
        });
    }
    Ok(days)
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

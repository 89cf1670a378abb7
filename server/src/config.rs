//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:4000")
    pub bind_address: String,

    /// `PostgreSQL` connection URL
    pub database_url: String,

    /// Access token signing secret
    pub jwt_secret: String,

    /// Refresh token signing secret (must differ from `jwt_secret` so a
    /// compromise of one class of token cannot forge the other)
    pub refresh_token_secret: String,

    /// Access token expiry in seconds (default: 900 = 15 min)
    pub jwt_access_expiry: i64,

    /// Refresh token expiry in seconds (default: 604800 = 7 days)
    pub jwt_refresh_expiry: i64,

    /// Argon2id time cost for password hashing (default: 10)
    pub hash_time_cost: u32,

    /// Whether the refresh cookie is marked Secure + SameSite=Strict.
    /// Leave false for local HTTP development.
    pub cookie_secure: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Tests supply a map instead of
    /// mutating the process environment.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:4000".into()),
            database_url: get("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: get("JWT_SECRET").context("JWT_SECRET must be set")?,
            refresh_token_secret: get("REFRESH_TOKEN_SECRET")
                .context("REFRESH_TOKEN_SECRET must be set")?,
            jwt_access_expiry: get("JWT_ACCESS_EXPIRY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
            jwt_refresh_expiry: get("JWT_REFRESH_EXPIRY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(604800),
            hash_time_cost: get("HASH_TIME_COST")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            cookie_secure: get("COOKIE_SECURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(ToString::to_string)
    }

    #[test]
    fn missing_database_url_fails() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "a"),
            ("REFRESH_TOKEN_SECRET", "b"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/opsboard"),
            ("JWT_SECRET", "a"),
            ("REFRESH_TOKEN_SECRET", "b"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:4000");
        assert_eq!(config.jwt_access_expiry, 900);
        assert_eq!(config.jwt_refresh_expiry, 604800);
        assert_eq!(config.hash_time_cost, 10);
        assert!(!config.cookie_secure);
    }
}

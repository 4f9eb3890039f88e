use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub upload_dir: PathBuf,
    pub request_timeout_secs: u64,
}

/// Token lifetime used when `JWT_TTL_MINUTES` is unset: effectively long-lived.
pub const DEFAULT_TTL_MINUTES: i64 = 100_000;

/// Upper bound for `JWT_TTL_MINUTES` (100 years).
pub const MAX_TTL_MINUTES: i64 = 100 * 365 * 24 * 60;

impl JwtConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.secret.is_empty(), "JWT_SECRET must not be empty");
        anyhow::ensure!(
            self.ttl_minutes > 0 && self.ttl_minutes <= MAX_TTL_MINUTES,
            "JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}"
        );
        Ok(())
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "catalog".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "catalog-admin".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(DEFAULT_TTL_MINUTES),
        };
        jwt.validate()?;

        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            jwt,
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("upload")),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(15),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(secret: &str, ttl_minutes: i64) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: "catalog".into(),
            audience: "catalog-admin".into(),
            ttl_minutes,
        }
    }

    #[test]
    fn ttl_must_be_positive_and_bounded() {
        assert!(jwt("s", DEFAULT_TTL_MINUTES).validate().is_ok());
        assert!(jwt("s", MAX_TTL_MINUTES).validate().is_ok());
        assert!(jwt("s", 0).validate().is_err());
        assert!(jwt("s", MAX_TTL_MINUTES + 1).validate().is_err());
        assert!(jwt("s", 10_000_000_000).validate().is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(jwt("", 60).validate().is_err());
    }
}

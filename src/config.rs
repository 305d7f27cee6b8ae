use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Bounds for the shared Postgres pool. All of them are always set.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub max_idle: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    pub secret: Option<String>,
    pub cutoff: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub public_url: String,
    pub jwt: JwtConfig,
    pub login_token_ttl_minutes: i64,
    pub pool: PoolConfig,
    pub captcha: CaptchaConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("environment variable {key} is empty or not set"))
        };

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            ttl_minutes: parse_or(&lookup, "TOKENS_EXPIRE_IN", 60)?,
        };
        let pool = PoolConfig {
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 25)?,
            max_idle: parse_or(&lookup, "DB_MAX_IDLE", 5)?,
            max_lifetime: Duration::from_secs(parse_or(&lookup, "DB_MAX_LIFETIME_SECS", 300)?),
            acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                5,
            )?),
            statement_timeout: Duration::from_millis(parse_or(
                &lookup,
                "DB_STATEMENT_TIMEOUT_MS",
                5000,
            )?),
        };
        anyhow::ensure!(
            pool.max_idle <= pool.max_connections,
            "DB_MAX_IDLE must not exceed DB_MAX_CONNECTIONS"
        );

        let captcha = CaptchaConfig {
            secret: lookup("CAPTCHA_SECRET").filter(|v| !v.is_empty()),
            cutoff: parse_or(&lookup, "CAPTCHA_CUTOFF", 0.5)?,
        };

        Ok(Self {
            database_url,
            public_url: lookup("PUBLIC_URL").unwrap_or_else(|| "http://localhost:8080".into()),
            jwt,
            login_token_ttl_minutes: parse_or(&lookup, "LOGIN_TOKEN_TTL_MINUTES", 15)?,
            pool,
            captcha,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<T>()
            .with_context(|| format!("invalid {key} (parse error)")),
        _ => Ok(default),
    }
}

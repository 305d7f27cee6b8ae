use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::info;

use crate::config::PoolConfig;

/// Postgres-backed implementation of every store trait.
///
/// The trait impls live next to the domain they serve (`auth::repo`,
/// `votes::repo`, `submissions::repo`, `comments::repo`).
#[derive(Clone)]
pub struct PgStore {
    pub(crate) db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Builds the process-wide pool. Called once at startup; the handle is then
/// shared by every component through `PgStore`.
pub async fn connect(database_url: &str, cfg: &PoolConfig) -> anyhow::Result<PgPool> {
    let options = PgConnectOptions::from_str(database_url)
        .context("parse DATABASE_URL")?
        .options([(
            "statement_timeout",
            cfg.statement_timeout.as_millis().to_string(),
        )]);

    let db = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        // a floor of warm connections; idle_timeout trims the rest
        .min_connections(cfg.max_idle)
        .max_lifetime(cfg.max_lifetime)
        .idle_timeout(cfg.max_lifetime / 5)
        .acquire_timeout(cfg.acquire_timeout)
        .connect_with(options)
        .await
        .context("connect to database")?;

    info!(
        max_connections = cfg.max_connections,
        max_idle = cfg.max_idle,
        max_lifetime_secs = cfg.max_lifetime.as_secs(),
        "postgres connection pool created"
    );
    Ok(db)
}

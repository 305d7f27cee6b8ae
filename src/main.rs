use std::sync::Arc;

use anyhow::Context;

mod admin;
mod app;
mod auth;
mod captcha;
mod comments;
mod config;
mod db;
mod error;
mod mailer;
#[cfg(test)]
mod memory;
mod state;
mod submissions;
mod titles;
mod votes;

use crate::captcha::{CaptchaVerifier, NoCaptcha, RecaptchaVerifier};
use crate::config::AppConfig;
use crate::db::PgStore;
use crate::mailer::LogMailer;
use crate::state::AppState;
use crate::titles::HttpTitleFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "linkboard=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config.database_url, &config.pool).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("run migrations")?;

    let captcha: Arc<dyn CaptchaVerifier> = match &config.captcha.secret {
        Some(secret) => Arc::new(RecaptchaVerifier::new(secret.clone(), config.captcha.cutoff)),
        None => {
            tracing::warn!("CAPTCHA_SECRET not set; captcha gate disabled");
            Arc::new(NoCaptcha)
        }
    };
    let mailer = Arc::new(LogMailer::new(config.public_url.clone()));
    let titles = Arc::new(HttpTitleFetcher::new().context("build title fetcher")?);

    let state = AppState::from_parts(
        Arc::new(PgStore::new(pool)),
        config,
        mailer,
        captcha,
        titles,
    );
    app::serve(app::build_app(state)).await
}

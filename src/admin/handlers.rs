use axum::{extract::State, routing::get, Json, Router};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::dto::MetricsResponse;
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/adminMetrics", get(admin_metrics))
}

#[instrument(skip(state))]
pub async fn admin_metrics(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<MetricsResponse>, AppError> {
    if !state.users.is_admin(&username).await? {
        warn!(%username, "non-admin asked for metrics");
        return Err(AppError::Forbidden("admin only"));
    }

    let metrics = state.metrics.metrics(OffsetDateTime::now_utc()).await?;
    info!(
        total_submissions = metrics.total_submissions,
        active_users = metrics.active_users,
        "admin metrics computed"
    );
    Ok(Json(MetricsResponse { metrics }))
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Error type shared by handlers and the core components.
///
/// The Display output of `Internal` and `Precondition` is logged, never sent
/// to the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("invalid captcha response, try again later")]
    CaptchaRejected,
    #[error("not signed in")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Locked(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::CaptchaRejected => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Locked(_) => StatusCode::LOCKED,
            Self::Precondition(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Precondition(_) | Self::Internal(_) => {
                error!(error = %self, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(json!({ "error": message, "status": status.as_u16() })),
        )
            .into_response()
    }
}

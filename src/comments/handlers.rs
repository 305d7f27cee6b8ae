use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    CommentIdQuery, CommentRequest, CommentsQuery, CommentsResponse, CreatedComment, ParentQuery,
};
use super::repo_types::NewComment;
use super::services::{delete_owned, post_comment};
use crate::{
    auth::extractors::AuthUser, captcha::require_human, error::AppError, state::AppState,
};

const ANONYMOUS_NOTICE: &str = "no username given, vote flags are all false";

pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/comment", post(create_comment).delete(delete_comment))
        .route("/comments", get(list_comments))
}

#[instrument(skip(state, req))]
pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Query(parent): Query<ParentQuery>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CreatedComment>), AppError> {
    require_human(state.captcha.as_ref(), &req.captcha_token).await?;

    let comment = post_comment(
        state.comments.as_ref(),
        state.submissions.as_ref(),
        NewComment {
            in_response_to: req.in_response_to,
            parent_comment: parent.parent,
            author: username,
            content: req.content,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(CreatedComment { id: comment.id })))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    Query(q): Query<CommentsQuery>,
) -> Result<Json<CommentsResponse>, AppError> {
    if state.submissions.find(q.id).await?.is_none() {
        return Err(AppError::NotFound("submission"));
    }

    let comments = state.ranking.list_comments(q.id, &q.username).await?;
    Ok(Json(CommentsResponse {
        comments,
        notice: q.username.is_empty().then_some(ANONYMOUS_NOTICE),
    }))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Query(q): Query<CommentIdQuery>,
) -> Result<StatusCode, AppError> {
    delete_owned(state.comments.as_ref(), &username, q.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

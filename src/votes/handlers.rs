use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    CommentVoteResponse, UserQuery, UserVotesResponse, VoteQuery, VoteRequest, VoteResponse,
    VoteStatus,
};
use super::ledger::VoteTarget;
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn vote_routes() -> Router<AppState> {
    Router::new()
        .route("/vote", get(get_vote).post(cast_vote))
        .route("/commentVote", post(cast_comment_vote))
        .route("/allUserVotes", get(all_user_votes))
}

#[instrument(skip(state))]
pub async fn get_vote(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Query(q): Query<VoteQuery>,
) -> Result<Json<VoteStatus>, AppError> {
    if q.id.is_nil() {
        return Err(AppError::bad_request("please pass a submission id"));
    }
    let vote = state
        .votes
        .get_vote(&username, VoteTarget::Submission(q.id))
        .await?;
    Ok(Json(vote.into()))
}

#[instrument(skip(state))]
pub async fn cast_vote(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, AppError> {
    if state.submissions.find(req.id).await?.is_none() {
        return Err(AppError::NotFound("submission"));
    }

    let outcome = state
        .votes
        .cast_vote(&username, VoteTarget::Submission(req.id), req.upvote)
        .await?;
    Ok(Json(VoteResponse {
        id: req.id,
        vote_success: outcome.succeeded(),
    }))
}

#[instrument(skip(state))]
pub async fn cast_comment_vote(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(req): Json<VoteRequest>,
) -> Result<Json<CommentVoteResponse>, AppError> {
    if state.comments.find(req.id).await?.is_none() {
        return Err(AppError::NotFound("comment"));
    }

    let outcome = state
        .votes
        .cast_vote(&username, VoteTarget::Comment(req.id), req.upvote)
        .await?;
    Ok(Json(CommentVoteResponse {
        success: outcome.succeeded(),
    }))
}

#[instrument(skip(state))]
pub async fn all_user_votes(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<UserVotesResponse>, AppError> {
    if q.username.is_empty() {
        return Err(AppError::bad_request("username is required"));
    }
    if state.users.find_user_by_username(&q.username).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }

    let results = state.votes.votes_by_user(&q.username).await?;
    Ok(Json(UserVotesResponse { results }))
}

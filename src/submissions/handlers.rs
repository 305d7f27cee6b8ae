use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{
    CreatedResponse, DeleteRequest, FlagRequest, FlagResponse, IdQuery, ListQuery,
    PageResponse, SearchQuery, SearchResponse, SubmissionDetails, SubmitRequest, TitleQuery,
    TitleResponse, UserSubmissionsQuery,
};
use super::ranking::SortMode;
use super::repo_types::{NewSubmission, RankedSubmission};
use super::services::{create_submission, delete_owned, is_valid_url};
use crate::{
    app::API_PREFIX, auth::extractors::AuthUser, captcha::require_human, error::AppError,
    state::AppState, votes::ledger::VoteTarget,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/submission", get(get_submission).delete(delete_submission))
        .route("/all", get(all_submissions))
        .route("/userSubmissions", get(user_submissions))
        .route("/searchSubmissions", get(search_submissions))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/flag", post(flag))
        .route("/fetchWebsiteTitle", get(fetch_website_title))
}

#[instrument(skip(state, req))]
pub async fn submit(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<CreatedResponse>), AppError> {
    require_human(state.captcha.as_ref(), &req.captcha_token).await?;

    let submission = create_submission(
        state.submissions.as_ref(),
        NewSubmission {
            username,
            title: req.title,
            link: req.link.trim().to_string(),
            body: req.body,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        [(
            header::LOCATION,
            format!("{API_PREFIX}/submission?id={}", submission.id),
        )],
        Json(CreatedResponse { id: submission.id }),
    ))
}

#[instrument(skip(state))]
pub async fn get_submission(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
) -> Result<Json<SubmissionDetails>, AppError> {
    let Some(submission) = state.submissions.find(q.id).await? else {
        return Err(AppError::NotFound("submission"));
    };
    let counts = state.votes.count_votes(VoteTarget::Submission(q.id)).await?;

    Ok(Json(SubmissionDetails {
        submission,
        upvotes: counts.upvotes,
        downvotes: counts.downvotes,
        score: counts.score(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_submission(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(req): Json<DeleteRequest>,
) -> Result<StatusCode, AppError> {
    delete_owned(state.submissions.as_ref(), &username, req.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn flag(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(req): Json<FlagRequest>,
) -> Result<Json<FlagResponse>, AppError> {
    if !state.users.is_admin(&username).await? {
        warn!(%username, "non-admin tried to flag a submission");
        return Err(AppError::Forbidden("admin only"));
    }
    if !state.submissions.set_flagged(req.id, req.flagged).await? {
        return Err(AppError::NotFound("submission"));
    }

    info!(%username, id = %req.id, flagged = req.flagged, "submission flag changed");
    Ok(Json(FlagResponse {
        id: req.id,
        flagged: req.flagged,
    }))
}

#[instrument(skip(state))]
pub async fn all_submissions(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<PageResponse<RankedSubmission>>, AppError> {
    let sort = match q.sort.as_deref() {
        None | Some("") => SortMode::default(),
        Some(s) => s.parse()?,
    };
    if q.offset < 0 {
        return Err(AppError::bad_request("offset cannot be negative"));
    }

    let page = state.ranking.list_submissions(sort, q.offset).await?;
    Ok(Json(PageResponse {
        next: page
            .next
            .map(|offset| format!("{API_PREFIX}/all?sort={sort}&offset={offset}")),
        results: page.results,
    }))
}

#[instrument(skip(state))]
pub async fn user_submissions(
    State(state): State<AppState>,
    Query(q): Query<UserSubmissionsQuery>,
) -> Result<Json<PageResponse<RankedSubmission>>, AppError> {
    if q.username.is_empty() {
        return Err(AppError::bad_request("username is required"));
    }
    if q.offset < 0 {
        return Err(AppError::bad_request("offset cannot be negative"));
    }
    if state.users.find_user_by_username(&q.username).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }

    let page = state.ranking.user_submissions(&q.username, q.offset).await?;
    Ok(Json(PageResponse {
        next: page.next.map(|offset| {
            format!(
                "{API_PREFIX}/userSubmissions?username={}&offset={offset}",
                q.username
            )
        }),
        results: page.results,
    }))
}

#[instrument(skip(state))]
pub async fn search_submissions(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<SearchResponse<RankedSubmission>>, AppError> {
    if q.q.trim().is_empty() {
        return Err(AppError::bad_request("please pass a `q` parameter"));
    }
    let page = state.ranking.search(&q.q, q.page).await?;
    Ok(Json(SearchResponse {
        results: page.results,
    }))
}

/// Prefill helper for the submit form. Requires a session.
#[instrument(skip(state))]
pub async fn fetch_website_title(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Query(q): Query<TitleQuery>,
) -> Result<Json<TitleResponse>, AppError> {
    let url = q.url.trim();
    if url.is_empty() {
        return Err(AppError::bad_request("please pass a url parameter"));
    }
    if !url.starts_with("http") || !is_valid_url(url) {
        return Err(AppError::bad_request("url must be a valid http or https URL"));
    }

    match state.titles.fetch_title(url).await {
        Ok(Some(title)) => Ok(Json(TitleResponse { title })),
        Ok(None) => {
            warn!(%username, %url, "no title found");
            Err(AppError::bad_request("unable to fetch title for provided URL"))
        }
        Err(e) => {
            warn!(%username, %url, error = %e, "title fetch failed");
            Err(AppError::bad_request("unable to fetch title for provided URL"))
        }
    }
}

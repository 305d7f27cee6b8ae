use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AdminResponse, BioRequest, LoginRequest, MagicQuery, MessageResponse,
            ProfileResponse, SessionResponse, UserQuery,
        },
        extractors::{AuthUser, ClientIp},
        repo_types::Bio,
        services::{is_valid_birthdate, is_valid_email, is_valid_username, MAX_IDENTITY_LEN},
    },
    captcha::require_human,
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/magic", get(magic))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/user", get(get_user))
        .route("/bio", post(update_bio))
        .route("/checkAdmin", get(check_admin))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if payload.email.is_empty() || payload.username.is_empty() {
        return Err(AppError::bad_request("email and username are required"));
    }
    require_human(state.captcha.as_ref(), &payload.captcha_token).await?;

    if payload.email.len() > MAX_IDENTITY_LEN || !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::bad_request("invalid email"));
    }
    if payload.username.len() > MAX_IDENTITY_LEN || !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err(AppError::bad_request(
            "invalid username (letters, numbers and underscores only, at most 100)",
        ));
    }

    // an address belongs to one account, and an account to one address
    if let Some(owner) = state.users.find_user_by_email(&payload.email).await? {
        if owner.username != payload.username {
            warn!(email = %payload.email, "email already tied to another username");
            return Err(AppError::bad_request(
                "this email belongs to a different username",
            ));
        }
    }
    if let Some(user) = state.users.find_user_by_username(&payload.username).await? {
        if user.email != payload.email {
            warn!(username = %payload.username, "username already tied to another email");
            return Err(AppError::bad_request(
                "this username belongs to a different email",
            ));
        }
    }

    let token = state.tokens.issue(&payload.username, &payload.email).await?;
    state.mailer.send_magic_link(&payload.email, &token).await?;

    Ok(Json(MessageResponse {
        message: format!("emailed a magic link to {}", payload.email),
    }))
}

#[instrument(skip(state, q))]
pub async fn magic(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(q): Query<MagicQuery>,
) -> Result<Json<SessionResponse>, AppError> {
    if q.token.is_empty() {
        return Err(AppError::bad_request("please pass a token parameter"));
    }

    let Some(user) = state.tokens.redeem(&q.token, &ip).await? else {
        return Err(AppError::Unauthenticated);
    };

    let token = state.sessions.issue(&user.username, state.sessions.ttl_minutes)?;
    info!(username = %user.username, "session issued");
    Ok(Json(SessionResponse {
        username: user.username,
        token,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    // a valid session for a vanished account is still "not signed in"
    let Some(profile) = state.users.find_profile(&username).await? else {
        warn!(%username, "session for unknown user");
        return Err(AppError::Unauthenticated);
    };
    Ok(Json(ProfileResponse::own(profile)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let username = match (q.username.filter(|u| !u.is_empty()), q.email) {
        (Some(username), _) => username,
        (None, Some(email)) if !email.is_empty() => {
            match state
                .users
                .find_user_by_email(&email.trim().to_lowercase())
                .await?
            {
                Some(user) => user.username,
                None => return Err(AppError::NotFound("user")),
            }
        }
        _ => return Err(AppError::bad_request("pass a username or email parameter")),
    };

    match state.users.find_profile(&username).await? {
        Some(profile) => Ok(Json(ProfileResponse::public(profile))),
        None => Err(AppError::NotFound("user")),
    }
}

#[instrument(skip(state, payload))]
pub async fn update_bio(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
    Json(payload): Json<BioRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if !payload.birthdate.is_empty() && !is_valid_birthdate(&payload.birthdate) {
        return Err(AppError::bad_request(
            "birth date must be in the format MM-DD-YYYY",
        ));
    }
    if payload.full_name.chars().count() > MAX_IDENTITY_LEN {
        return Err(AppError::bad_request(
            "full name cannot be longer than 100 characters",
        ));
    }

    state
        .users
        .upsert_bio(&Bio {
            username: username.clone(),
            full_name: payload.full_name,
            birthdate: payload.birthdate,
            bio_text: payload.bio_text,
        })
        .await?;

    info!(%username, "bio updated");
    Ok(Json(MessageResponse {
        message: format!("updated metadata for user {username}"),
    }))
}

#[instrument(skip(state))]
pub async fn check_admin(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<AdminResponse>, AppError> {
    let is_admin = state.users.is_admin(&username).await?;
    Ok(Json(AdminResponse { is_admin }))
}

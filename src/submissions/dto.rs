use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Submission;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub link: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub captcha_token: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    pub id: Uuid,
    pub flagged: bool,
}

#[derive(Debug, Serialize)]
pub struct FlagResponse {
    pub id: Uuid,
    pub flagged: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct UserSubmissionsQuery {
    pub username: String,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub page: i64,
}

/// `next` is a path that fetches the following page as-is.
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub results: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionDetails {
    #[serde(flatten)]
    pub submission: Submission,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub title: String,
}

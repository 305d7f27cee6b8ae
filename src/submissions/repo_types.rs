use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub username: String,
    pub title: String,
    pub link: String,
    pub body: Option<String>,
    pub flagged: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Listing row: a submission with its derived vote tallies. `score` is
/// `upvotes - downvotes` and is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RankedSubmission {
    pub id: Uuid,
    pub username: String,
    pub title: String,
    pub link: String,
    pub body: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub username: String,
    pub title: String,
    pub link: String,
    pub body: Option<String>,
}

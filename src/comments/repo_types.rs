use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub in_response_to: Uuid,
    /// `None` for a top-level comment.
    pub parent_comment: Option<Uuid>,
    pub author: String,
    pub content: String,
    pub flagged: bool,
    pub created_at: OffsetDateTime,
}

/// A comment as rendered in a thread, with tallies and the reader's own vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub in_response_to: Uuid,
    pub parent_comment: Option<Uuid>,
    pub author: String,
    pub content: String,
    pub flagged: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub upvotes: i64,
    pub downvotes: i64,
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub in_response_to: Uuid,
    pub parent_comment: Option<Uuid>,
    pub author: String,
    pub content: String,
}

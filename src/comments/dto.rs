use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::CommentView;

#[derive(Debug, Deserialize)]
pub struct ParentQuery {
    #[serde(default)]
    pub parent: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub in_response_to: Uuid,
    pub content: String,
    #[serde(default)]
    pub captcha_token: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedComment {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    pub id: Uuid,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentIdQuery {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<CommentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::VotedSubmission;

#[derive(Debug, Deserialize)]
pub struct VoteQuery {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub id: Uuid,
    pub upvote: bool,
}

/// `didUpvote` is only present when `didVote` is true.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub did_vote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_upvote: Option<bool>,
}

impl From<Option<bool>> for VoteStatus {
    fn from(vote: Option<bool>) -> Self {
        Self {
            did_vote: vote.is_some(),
            did_upvote: vote,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: Uuid,
    pub vote_success: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentVoteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UserVotesResponse {
    pub results: Vec<VotedSubmission>,
}

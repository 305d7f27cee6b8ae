use std::{fmt, str::FromStr, sync::Arc};

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::repo::SubmissionStore;
use super::repo_types::RankedSubmission;
use crate::comments::{repo::CommentStore, repo_types::CommentView};
use crate::error::AppError;

/// Rows per page for every paginated listing.
pub const PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Latest,
    Oldest,
    /// Net vote score, highest first.
    Best,
}

impl FromStr for SortMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(Self::Latest),
            "oldest" => Ok(Self::Oldest),
            "best" => Ok(Self::Best),
            _ => Err(AppError::bad_request("invalid sort filter")),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Latest => "latest",
            Self::Oldest => "oldest",
            Self::Best => "best",
        })
    }
}

/// One page of an offset-paginated listing. `next` is the offset of the
/// following page, absent when this page came back short.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub next: Option<i64>,
}

impl<T> Page<T> {
    fn from_batch(results: Vec<T>, offset: i64) -> Self {
        let next = (results.len() as i64 == PAGE_SIZE).then_some(offset + PAGE_SIZE);
        Self { results, next }
    }
}

/// Read side: sorted and paginated views over submissions and comment threads.
#[derive(Clone)]
pub struct Ranking {
    submissions: Arc<dyn SubmissionStore>,
    comments: Arc<dyn CommentStore>,
}

impl Ranking {
    pub fn new(submissions: Arc<dyn SubmissionStore>, comments: Arc<dyn CommentStore>) -> Self {
        Self {
            submissions,
            comments,
        }
    }

    pub async fn list_submissions(
        &self,
        sort: SortMode,
        offset: i64,
    ) -> Result<Page<RankedSubmission>, AppError> {
        let offset = offset.max(0);
        let rows = self.submissions.list(sort, PAGE_SIZE, offset).await?;
        info!(%sort, offset, count = rows.len(), "submissions listed");
        Ok(Page::from_batch(rows, offset))
    }

    pub async fn user_submissions(
        &self,
        username: &str,
        offset: i64,
    ) -> Result<Page<RankedSubmission>, AppError> {
        if username.is_empty() {
            return Err(AppError::Precondition("username required for user submissions"));
        }
        let offset = offset.max(0);
        let rows = self
            .submissions
            .list_by_user(username, PAGE_SIZE, offset)
            .await?;
        info!(%username, offset, count = rows.len(), "user submissions listed");
        Ok(Page::from_batch(rows, offset))
    }

    /// `page` is zero-based. A blank query matches nothing.
    pub async fn search(&self, query: &str, page: i64) -> Result<Page<RankedSubmission>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Page {
                results: Vec::new(),
                next: None,
            });
        }
        let offset = page
            .max(0)
            .checked_mul(PAGE_SIZE)
            .ok_or_else(|| AppError::bad_request("page out of range"))?;
        let rows = self.submissions.search(query, PAGE_SIZE, offset).await?;
        info!(%query, page, count = rows.len(), "submissions searched");
        Ok(Page::from_batch(rows, offset))
    }

    /// Oldest first. The vote flags reflect `context_voter`; pass "" for an
    /// anonymous reader.
    pub async fn list_comments(
        &self,
        submission: Uuid,
        context_voter: &str,
    ) -> Result<Vec<CommentView>, AppError> {
        if submission.is_nil() {
            return Err(AppError::Precondition("submission id required for comments"));
        }
        let voter = (!context_voter.is_empty()).then_some(context_voter);
        let comments = self.comments.list_for_submission(submission, voter).await?;
        info!(%submission, count = comments.len(), "comments listed");
        Ok(comments)
    }
}

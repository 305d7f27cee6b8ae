use tracing::{info, warn};
use uuid::Uuid;

use super::repo::CommentStore;
use super::repo_types::{Comment, NewComment};
use crate::error::AppError;
use crate::submissions::repo::SubmissionStore;

pub const MAX_COMMENT_LEN: usize = 10_000;

/// Stores a comment after checking that the submission exists and that a
/// parent comment, when given, belongs to the same submission.
pub async fn post_comment(
    comments: &dyn CommentStore,
    submissions: &dyn SubmissionStore,
    new: NewComment,
) -> Result<Comment, AppError> {
    if new.author.is_empty() {
        return Err(AppError::Precondition("comment author required"));
    }
    if new.content.trim().is_empty() {
        return Err(AppError::bad_request("comment content is required"));
    }
    if new.content.len() > MAX_COMMENT_LEN {
        return Err(AppError::bad_request(format!(
            "comment must be at most {MAX_COMMENT_LEN} characters"
        )));
    }
    if submissions.find(new.in_response_to).await?.is_none() {
        return Err(AppError::NotFound("submission"));
    }
    if let Some(parent) = new.parent_comment {
        match comments.find(parent).await? {
            Some(p) if p.in_response_to == new.in_response_to => {}
            Some(_) => {
                return Err(AppError::bad_request(
                    "parent comment belongs to another submission",
                ))
            }
            None => return Err(AppError::NotFound("parent comment")),
        }
    }

    let comment = comments.insert(&new).await?;
    info!(
        id = %comment.id,
        submission = %comment.in_response_to,
        author = %comment.author,
        "comment posted"
    );
    Ok(comment)
}

pub async fn delete_owned(
    comments: &dyn CommentStore,
    username: &str,
    id: Uuid,
) -> Result<(), AppError> {
    let Some(comment) = comments.find(id).await? else {
        return Err(AppError::NotFound("comment"));
    };
    if comment.author != username {
        warn!(%username, author = %comment.author, %id, "delete of foreign comment refused");
        return Err(AppError::Forbidden("you can only delete your own comments"));
    }
    if !comments.delete(id).await? {
        return Err(AppError::NotFound("comment"));
    }
    info!(%username, %id, "comment deleted");
    Ok(())
}

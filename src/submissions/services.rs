use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo::SubmissionStore;
use super::repo_types::{NewSubmission, Submission};
use crate::error::AppError;

pub const MAX_LINK_LEN: usize = 255;
pub const MAX_TITLE_LEN: usize = 255;

/// http, https or ftp URL with a host part.
pub(crate) fn is_valid_url(link: &str) -> bool {
    lazy_static! {
        static ref URL_RE: Regex = Regex::new(r"^(https?|ftp)://[^\s/$.?#][^\s]*$").unwrap();
    }
    link.len() <= MAX_LINK_LEN && URL_RE.is_match(link)
}

pub async fn create_submission(
    store: &dyn SubmissionStore,
    new: NewSubmission,
) -> Result<Submission, AppError> {
    if new.username.is_empty() {
        return Err(AppError::Precondition("submission author required"));
    }
    if new.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if new.title.len() > MAX_TITLE_LEN {
        return Err(AppError::bad_request(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    if !is_valid_url(&new.link) {
        return Err(AppError::bad_request("link must be a valid http, https or ftp URL"));
    }

    let new = NewSubmission {
        body: new.body.filter(|b| !b.trim().is_empty()),
        ..new
    };
    let submission = store.create(&new).await?;
    info!(id = %submission.id, username = %submission.username, "submission created");
    Ok(submission)
}

/// Removes a submission on behalf of its author. Flagged submissions stay put.
pub async fn delete_owned(
    store: &dyn SubmissionStore,
    username: &str,
    id: Uuid,
) -> Result<(), AppError> {
    let Some(submission) = store.find(id).await? else {
        return Err(AppError::NotFound("submission"));
    };
    if submission.username != username {
        warn!(%username, owner = %submission.username, %id, "delete of foreign submission refused");
        return Err(AppError::Forbidden("you can only delete your own submissions"));
    }
    if submission.flagged || !store.delete_unflagged(id).await? {
        warn!(%username, %id, "delete of flagged submission refused");
        return Err(AppError::Locked("flagged submissions cannot be deleted"));
    }

    info!(%username, %id, "submission deleted");
    Ok(())
}

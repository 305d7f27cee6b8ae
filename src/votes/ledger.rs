use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::repo::VoteStore;
use super::repo_types::{VoteCounts, VotedSubmission};
use crate::error::AppError;

/// How many voted submissions a user listing returns.
pub const USER_VOTES_LIMIT: i64 = 10;

/// Entity a vote applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteTarget {
    Submission(Uuid),
    Comment(Uuid),
}

impl VoteTarget {
    pub fn id(&self) -> Uuid {
        match *self {
            Self::Submission(id) | Self::Comment(id) => id,
        }
    }

    /// (table, target column)
    pub(crate) fn table(&self) -> (&'static str, &'static str) {
        match self {
            Self::Submission(_) => ("votes", "submission_id"),
            Self::Comment(_) => ("comment_votes", "comment_id"),
        }
    }
}

/// Result of casting a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// No prior vote, a row was written.
    Inserted,
    /// A vote in the other direction was turned around.
    Flipped,
    /// Same direction as the existing vote; nothing written.
    Rejected,
}

impl VoteOutcome {
    /// Inserts and flips both count as success at the API boundary.
    pub fn succeeded(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// At most one vote per (voter, target). The check and the write are a single
/// atomic step in the store, so concurrent duplicates cannot create a second
/// row or flip twice.
#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<dyn VoteStore>,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self { store }
    }

    pub async fn cast_vote(
        &self,
        voter: &str,
        target: VoteTarget,
        positive: bool,
    ) -> Result<VoteOutcome, AppError> {
        check_identifiers(voter, target)?;

        let outcome = self.store.cast_vote(target, voter, positive).await?;
        let direction = if positive { "upvote" } else { "downvote" };
        match outcome {
            VoteOutcome::Inserted => {
                info!(%voter, vote_target = ?target, direction, "vote inserted")
            }
            VoteOutcome::Flipped => {
                info!(%voter, vote_target = ?target, direction, "vote flipped")
            }
            VoteOutcome::Rejected => {
                info!(%voter, vote_target = ?target, direction, "double vote attempted")
            }
        }
        Ok(outcome)
    }

    /// `None` when the voter has not voted, otherwise `Some(positive)`.
    pub async fn get_vote(&self, voter: &str, target: VoteTarget) -> Result<Option<bool>, AppError> {
        check_identifiers(voter, target)?;
        Ok(self.store.find_vote(target, voter).await?)
    }

    pub async fn count_votes(&self, target: VoteTarget) -> Result<VoteCounts, AppError> {
        if target.id().is_nil() {
            return Err(AppError::Precondition("cannot count votes for a blank target"));
        }
        let counts = self.store.count_votes(target).await?;
        info!(
            vote_target = ?target,
            upvotes = counts.upvotes,
            downvotes = counts.downvotes,
            "votes counted"
        );
        Ok(counts)
    }

    pub async fn votes_by_user(&self, voter: &str) -> Result<Vec<VotedSubmission>, AppError> {
        if voter.is_empty() {
            return Err(AppError::Precondition("voter username cannot be blank"));
        }
        let votes = self.store.votes_by_user(voter, USER_VOTES_LIMIT).await?;
        info!(%voter, count = votes.len(), "user votes listed");
        Ok(votes)
    }
}

fn check_identifiers(voter: &str, target: VoteTarget) -> Result<(), AppError> {
    if voter.is_empty() || target.id().is_nil() {
        return Err(AppError::Precondition(
            "voter and target are required to vote",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    async fn ledger_with_submission() -> (VoteLedger, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::default());
        let id = store.seed_submission("author", "A link", false).await;
        (VoteLedger::new(store.clone()), store, id)
    }

    #[tokio::test]
    async fn vote_lifecycle_insert_reject_flip() {
        let (ledger, _store, id) = ledger_with_submission().await;
        let target = VoteTarget::Submission(id);

        assert_eq!(ledger.get_vote("alice", target).await.unwrap(), None);

        assert_eq!(
            ledger.cast_vote("alice", target, true).await.unwrap(),
            VoteOutcome::Inserted
        );
        assert_eq!(ledger.get_vote("alice", target).await.unwrap(), Some(true));

        assert_eq!(
            ledger.cast_vote("alice", target, true).await.unwrap(),
            VoteOutcome::Rejected
        );
        assert_eq!(ledger.get_vote("alice", target).await.unwrap(), Some(true));

        assert_eq!(
            ledger.cast_vote("alice", target, false).await.unwrap(),
            VoteOutcome::Flipped
        );
        assert_eq!(ledger.get_vote("alice", target).await.unwrap(), Some(false));

        let counts = ledger.count_votes(target).await.unwrap();
        assert_eq!(counts, VoteCounts { upvotes: 0, downvotes: 1 });
    }

    #[tokio::test]
    async fn counts_match_votes_cast() {
        let (ledger, _store, id) = ledger_with_submission().await;
        let target = VoteTarget::Submission(id);

        for i in 0..5 {
            ledger.cast_vote(&format!("up{i}"), target, true).await.unwrap();
        }
        for i in 0..3 {
            ledger.cast_vote(&format!("down{i}"), target, false).await.unwrap();
        }

        let counts = ledger.count_votes(target).await.unwrap();
        assert_eq!((counts.upvotes, counts.downvotes), (5, 3));
        assert_eq!(counts.score(), 2);
    }

    #[tokio::test]
    async fn submission_and_comment_votes_are_separate() {
        let (ledger, store, id) = ledger_with_submission().await;
        let comment = store.seed_comment(id, None, "author", "first").await;

        ledger.cast_vote("alice", VoteTarget::Submission(id), true).await.unwrap();
        assert_eq!(
            ledger.get_vote("alice", VoteTarget::Comment(comment)).await.unwrap(),
            None
        );
        assert_eq!(
            ledger.cast_vote("alice", VoteTarget::Comment(comment), true).await.unwrap(),
            VoteOutcome::Inserted
        );
    }

    #[tokio::test]
    async fn concurrent_duplicates_leave_one_row() {
        let (ledger, _store, id) = ledger_with_submission().await;
        let target = VoteTarget::Submission(id);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.cast_vote("alice", target, true).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == VoteOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(ledger.count_votes(target).await.unwrap().upvotes, 1);
    }

    #[tokio::test]
    async fn blank_identifiers_fail_fast() {
        let (ledger, _store, id) = ledger_with_submission().await;
        assert!(matches!(
            ledger.cast_vote("", VoteTarget::Submission(id), true).await,
            Err(AppError::Precondition(_))
        ));
        assert!(matches!(
            ledger.cast_vote("alice", VoteTarget::Comment(Uuid::nil()), true).await,
            Err(AppError::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn user_vote_listing_reports_direction() {
        let (ledger, store, id) = ledger_with_submission().await;
        let other = store.seed_submission("author", "Another", false).await;
        ledger.cast_vote("alice", VoteTarget::Submission(id), true).await.unwrap();
        ledger.cast_vote("alice", VoteTarget::Submission(other), false).await.unwrap();

        let mut votes = ledger.votes_by_user("alice").await.unwrap();
        votes.sort_by_key(|v| v.title.clone());
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].title, "A link");
        assert!(votes[0].is_upvoted);
        assert!(!votes[1].is_upvoted);
    }

    #[test]
    fn only_rejections_fail() {
        assert!(VoteOutcome::Inserted.succeeded());
        assert!(VoteOutcome::Flipped.succeeded());
        assert!(!VoteOutcome::Rejected.succeeded());
    }
}

use anyhow::Context;
use async_trait::async_trait;

use super::ledger::{VoteOutcome, VoteTarget};
use super::repo_types::{VoteCounts, VotedSubmission};
use crate::db::PgStore;

#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Insert-if-absent, flip-if-opposite, reject-if-same, as one atomic step.
    async fn cast_vote(
        &self,
        target: VoteTarget,
        voter: &str,
        positive: bool,
    ) -> anyhow::Result<VoteOutcome>;

    async fn find_vote(&self, target: VoteTarget, voter: &str) -> anyhow::Result<Option<bool>>;
    async fn count_votes(&self, target: VoteTarget) -> anyhow::Result<VoteCounts>;
    async fn votes_by_user(&self, voter: &str, limit: i64) -> anyhow::Result<Vec<VotedSubmission>>;
}

#[async_trait]
impl VoteStore for PgStore {
    async fn cast_vote(
        &self,
        target: VoteTarget,
        voter: &str,
        positive: bool,
    ) -> anyhow::Result<VoteOutcome> {
        let (table, column) = target.table();
        // The conflict arm only updates when the direction changes, so a
        // same-direction repeat returns no row. xmax = 0 marks a fresh insert.
        let inserted = sqlx::query_scalar::<_, bool>(&format!(
            r#"
            INSERT INTO {table} ({column}, voter_username, positive)
            VALUES ($1, $2, $3)
            ON CONFLICT ({column}, voter_username) DO UPDATE
            SET positive = EXCLUDED.positive, ts = now()
            WHERE {table}.positive <> EXCLUDED.positive
            RETURNING (xmax = 0)
            "#
        ))
        .bind(target.id())
        .bind(voter)
        .bind(positive)
        .fetch_optional(&self.db)
        .await
        .context("cast vote")?;

        Ok(match inserted {
            None => VoteOutcome::Rejected,
            Some(true) => VoteOutcome::Inserted,
            Some(false) => VoteOutcome::Flipped,
        })
    }

    async fn find_vote(&self, target: VoteTarget, voter: &str) -> anyhow::Result<Option<bool>> {
        let (table, column) = target.table();
        let positive = sqlx::query_scalar::<_, bool>(&format!(
            "SELECT positive FROM {table} WHERE {column} = $1 AND voter_username = $2"
        ))
        .bind(target.id())
        .bind(voter)
        .fetch_optional(&self.db)
        .await
        .context("find vote")?;
        Ok(positive)
    }

    async fn count_votes(&self, target: VoteTarget) -> anyhow::Result<VoteCounts> {
        let (table, column) = target.table();
        let counts = sqlx::query_as::<_, VoteCounts>(&format!(
            r#"
            SELECT COUNT(*) FILTER (WHERE positive) AS upvotes,
                   COUNT(*) FILTER (WHERE NOT positive) AS downvotes
            FROM {table}
            WHERE {column} = $1
            "#
        ))
        .bind(target.id())
        .fetch_one(&self.db)
        .await
        .context("count votes")?;
        Ok(counts)
    }

    async fn votes_by_user(&self, voter: &str, limit: i64) -> anyhow::Result<Vec<VotedSubmission>> {
        let rows = sqlx::query_as::<_, VotedSubmission>(
            r#"
            SELECT submissions.id, submissions.title, submissions.link, submissions.body,
                   submissions.created_at, submissions.username, votes.positive AS is_upvoted
            FROM votes
            INNER JOIN submissions ON votes.submission_id = submissions.id
            WHERE votes.voter_username = $1
            ORDER BY votes.ts DESC
            LIMIT $2
            "#,
        )
        .bind(voter)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("list votes by user")?;
        Ok(rows)
    }
}

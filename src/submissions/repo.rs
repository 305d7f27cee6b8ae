use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::ranking::SortMode;
use super::repo_types::{NewSubmission, RankedSubmission, Submission};
use crate::db::PgStore;

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create(&self, new: &NewSubmission) -> anyhow::Result<Submission>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Submission>>;
    /// Returns false when no such submission exists.
    async fn set_flagged(&self, id: Uuid, flagged: bool) -> anyhow::Result<bool>;
    /// Deletes only when the submission is not flagged. Returns whether a row went away.
    async fn delete_unflagged(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Non-flagged submissions in `sort` order.
    async fn list(
        &self,
        sort: SortMode,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<RankedSubmission>>;

    /// Non-flagged submissions of one author, newest first.
    async fn list_by_user(
        &self,
        username: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<RankedSubmission>>;

    /// Case-insensitive substring match on title or body, newest first.
    async fn search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<RankedSubmission>>;
}

const RANKED: &str = r#"
    SELECT submissions.id, submissions.username, submissions.title, submissions.link,
           submissions.body, submissions.created_at,
           COUNT(votes.positive) FILTER (WHERE votes.positive) AS upvotes,
           COUNT(votes.positive) FILTER (WHERE NOT votes.positive) AS downvotes,
           COALESCE(SUM(CASE
               WHEN votes.positive = true THEN 1
               WHEN votes.positive = false THEN -1
               ELSE 0
           END), 0)::BIGINT AS score
    FROM submissions
    LEFT JOIN votes ON submissions.id = votes.submission_id
"#;

impl SortMode {
    fn order_by(self) -> &'static str {
        match self {
            Self::Latest => "submissions.created_at DESC, submissions.id DESC",
            Self::Oldest => "submissions.created_at ASC, submissions.id ASC",
            Self::Best => "score DESC, submissions.created_at DESC, submissions.id DESC",
        }
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn create(&self, new: &NewSubmission) -> anyhow::Result<Submission> {
        let row = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (username, title, link, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, title, link, body, flagged, created_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.title)
        .bind(&new.link)
        .bind(&new.body)
        .fetch_one(&self.db)
        .await
        .context("insert submission")?;
        Ok(row)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Submission>> {
        let row = sqlx::query_as::<_, Submission>(
            r#"
            SELECT id, username, title, link, body, flagged, created_at
            FROM submissions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find submission")?;
        Ok(row)
    }

    async fn set_flagged(&self, id: Uuid, flagged: bool) -> anyhow::Result<bool> {
        let updated = sqlx::query("UPDATE submissions SET flagged = $1 WHERE id = $2")
            .bind(flagged)
            .bind(id)
            .execute(&self.db)
            .await
            .context("flag submission")?
            .rows_affected();
        Ok(updated == 1)
    }

    async fn delete_unflagged(&self, id: Uuid) -> anyhow::Result<bool> {
        let deleted = sqlx::query("DELETE FROM submissions WHERE id = $1 AND flagged = false")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete submission")?
            .rows_affected();
        Ok(deleted == 1)
    }

    async fn list(
        &self,
        sort: SortMode,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<RankedSubmission>> {
        let rows = sqlx::query_as::<_, RankedSubmission>(&format!(
            r#"
            {RANKED}
            WHERE submissions.flagged = false
            GROUP BY submissions.id
            ORDER BY {}
            LIMIT $1 OFFSET $2
            "#,
            sort.order_by()
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list submissions")?;
        Ok(rows)
    }

    async fn list_by_user(
        &self,
        username: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<RankedSubmission>> {
        let rows = sqlx::query_as::<_, RankedSubmission>(&format!(
            r#"
            {RANKED}
            WHERE submissions.flagged = false AND submissions.username = $1
            GROUP BY submissions.id
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            SortMode::Latest.order_by()
        ))
        .bind(username)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list submissions by user")?;
        Ok(rows)
    }

    async fn search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<RankedSubmission>> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query_as::<_, RankedSubmission>(&format!(
            r#"
            {RANKED}
            WHERE submissions.flagged = false
              AND (submissions.title ILIKE $1 OR submissions.body ILIKE $1)
            GROUP BY submissions.id
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            SortMode::Latest.order_by()
        ))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("search submissions")?;
        Ok(rows)
    }
}

/// `%` and `_` in user input match literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

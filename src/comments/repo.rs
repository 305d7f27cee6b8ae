use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Comment, CommentView, NewComment};
use crate::db::PgStore;

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert(&self, new: &NewComment) -> anyhow::Result<Comment>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Comment>>;

    /// Every comment on `submission`, oldest first. `context_voter` decides
    /// the `has_upvoted` / `has_downvoted` flags.
    async fn list_for_submission(
        &self,
        submission: Uuid,
        context_voter: Option<&str>,
    ) -> anyhow::Result<Vec<CommentView>>;

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert(&self, new: &NewComment) -> anyhow::Result<Comment> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (in_response_to, parent_comment, author, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, in_response_to, parent_comment, author, content, flagged, created_at
            "#,
        )
        .bind(new.in_response_to)
        .bind(new.parent_comment)
        .bind(&new.author)
        .bind(&new.content)
        .fetch_one(&self.db)
        .await
        .context("insert comment")?;
        Ok(row)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, in_response_to, parent_comment, author, content, flagged, created_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find comment")?;
        Ok(row)
    }

    async fn list_for_submission(
        &self,
        submission: Uuid,
        context_voter: Option<&str>,
    ) -> anyhow::Result<Vec<CommentView>> {
        let rows = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT comments.id, comments.in_response_to, comments.parent_comment,
                   comments.author, comments.content, comments.flagged, comments.created_at,
                   COUNT(cv.positive) FILTER (WHERE cv.positive) AS upvotes,
                   COUNT(cv.positive) FILTER (WHERE NOT cv.positive) AS downvotes,
                   COALESCE(BOOL_OR(cv.voter_username = $2 AND cv.positive), false) AS has_upvoted,
                   COALESCE(BOOL_OR(cv.voter_username = $2 AND NOT cv.positive), false) AS has_downvoted
            FROM comments
            LEFT JOIN comment_votes cv ON cv.comment_id = comments.id
            WHERE comments.in_response_to = $1
            GROUP BY comments.id
            ORDER BY comments.created_at ASC, comments.id ASC
            "#,
        )
        .bind(submission)
        .bind(context_voter)
        .fetch_all(&self.db)
        .await
        .context("list comments")?;
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete comment")?
            .rows_affected();
        Ok(deleted == 1)
    }
}

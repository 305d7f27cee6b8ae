use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo_types::{AdminMetrics, METRICS_DAYS};
use crate::db::PgStore;

#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Aggregates as seen at `now`.
    async fn metrics(&self, now: OffsetDateTime) -> anyhow::Result<AdminMetrics>;
}

#[async_trait]
impl MetricsStore for PgStore {
    async fn metrics(&self, now: OffsetDateTime) -> anyhow::Result<AdminMetrics> {
        // day 0 is (now - 24h, now]
        let buckets = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT FLOOR(EXTRACT(EPOCH FROM ($1 - created_at)) / 86400)::BIGINT AS day,
                   COUNT(*) AS posts
            FROM submissions
            WHERE created_at > $1 - INTERVAL '7 days' AND created_at <= $1
            GROUP BY day
            "#,
        )
        .bind(now)
        .fetch_all(&self.db)
        .await
        .context("count posts per day")?;

        let mut posts_per_day = [0; METRICS_DAYS];
        for (day, posts) in buckets {
            if let Some(slot) = usize::try_from(day).ok().and_then(|d| posts_per_day.get_mut(d)) {
                *slot = posts;
            }
        }

        let (total_submissions, total_users) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT (SELECT COUNT(*) FROM submissions), (SELECT COUNT(*) FROM users)",
        )
        .fetch_one(&self.db)
        .await
        .context("count totals")?;

        let active_users = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT username)
            FROM (
                SELECT username FROM submissions
                WHERE created_at > $1 - INTERVAL '7 days' AND created_at <= $1
                UNION
                SELECT author FROM comments
                WHERE created_at > $1 - INTERVAL '7 days' AND created_at <= $1
                UNION
                SELECT voter_username FROM votes
                WHERE ts > $1 - INTERVAL '7 days' AND ts <= $1
                UNION
                SELECT voter_username FROM comment_votes
                WHERE ts > $1 - INTERVAL '7 days' AND ts <= $1
            ) AS active
            "#,
        )
        .bind(now)
        .fetch_one(&self.db)
        .await
        .context("count active users")?;

        Ok(AdminMetrics {
            posts_per_day,
            total_submissions,
            total_users,
            active_users,
        })
    }
}

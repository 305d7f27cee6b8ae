use anyhow::Context;
use async_trait::async_trait;

use crate::auth::repo_types::{Bio, LoginToken, User, UserProfile};
use crate::db::PgStore;

/// Durable state behind the login flow: users, their metadata, and one-time
/// login tokens.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Removes every token held by `token.username` and stores `token`.
    async fn replace_login_token(&self, token: &LoginToken) -> anyhow::Result<()>;

    /// Deletes the token and returns what it was bound to. The delete and the
    /// lookup are one step, so a token can be taken at most once.
    async fn take_login_token(&self, token: &str) -> anyhow::Result<Option<LoginToken>>;

    /// Returns the user and whether it had to be created. `None` when the
    /// username and email are already bound to different accounts.
    async fn find_or_create_user(
        &self,
        username: &str,
        email: &str,
        registered_ip: &str,
    ) -> anyhow::Result<Option<(User, bool)>>;

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_profile(&self, username: &str) -> anyhow::Result<Option<UserProfile>>;
    async fn upsert_bio(&self, bio: &Bio) -> anyhow::Result<()>;
    async fn is_admin(&self, username: &str) -> anyhow::Result<bool>;
}

const USER_WITH_SCORE: &str = r#"
    SELECT users.username, users.email, users.created_at, users.registered_ip,
           COALESCE(SUM(CASE
               WHEN votes.positive = true THEN 1
               WHEN votes.positive = false THEN -1
               ELSE 0
           END), 0)::BIGINT AS score
    FROM users
    LEFT JOIN submissions ON users.username = submissions.username
    LEFT JOIN votes ON submissions.id = votes.submission_id
"#;

#[async_trait]
impl CredentialStore for PgStore {
    async fn replace_login_token(&self, token: &LoginToken) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        sqlx::query("DELETE FROM magic_links WHERE username = $1")
            .bind(&token.username)
            .execute(&mut *tx)
            .await
            .context("delete previous login tokens")?;

        sqlx::query(
            r#"
            INSERT INTO magic_links (token, username, email, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&token.token)
        .bind(&token.username)
        .bind(&token.email)
        .bind(token.expires_at)
        .execute(&mut *tx)
        .await
        .context("insert login token")?;

        tx.commit().await.context("commit tx")?;
        Ok(())
    }

    async fn take_login_token(&self, token: &str) -> anyhow::Result<Option<LoginToken>> {
        let row = sqlx::query_as::<_, LoginToken>(
            r#"
            DELETE FROM magic_links
            WHERE token = $1
            RETURNING token, username, email, expires_at
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .context("take login token")?;
        Ok(row)
    }

    async fn find_or_create_user(
        &self,
        username: &str,
        email: &str,
        registered_ip: &str,
    ) -> anyhow::Result<Option<(User, bool)>> {
        // no conflict target: a clash on either unique column is a no-op
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (username, email, registered_ip)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(registered_ip)
        .execute(&self.db)
        .await
        .context("insert user")?
        .rows_affected()
            == 1;

        match self.find_user_by_username(username).await? {
            Some(user) if user.email == email => Ok(Some((user, inserted))),
            _ => Ok(None),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{USER_WITH_SCORE} WHERE users.username = $1 GROUP BY users.username"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{USER_WITH_SCORE} WHERE users.email = $1 GROUP BY users.username"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_profile(&self, username: &str) -> anyhow::Result<Option<UserProfile>> {
        let Some(user) = self.find_user_by_username(username).await? else {
            return Ok(None);
        };

        let bio = sqlx::query_as::<_, Bio>(
            r#"
            SELECT username, full_name, birthdate, bio_text
            FROM bio
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find bio")?;

        let is_admin = self.is_admin(username).await?;
        Ok(Some(UserProfile {
            user,
            bio,
            is_admin,
        }))
    }

    async fn upsert_bio(&self, bio: &Bio) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bio (username, full_name, birthdate, bio_text)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (username) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                birthdate = EXCLUDED.birthdate,
                bio_text = EXCLUDED.bio_text
            "#,
        )
        .bind(&bio.username)
        .bind(&bio.full_name)
        .bind(&bio.birthdate)
        .bind(&bio.bio_text)
        .execute(&self.db)
        .await
        .context("upsert bio")?;
        Ok(())
    }

    async fn is_admin(&self, username: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM admins WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.db)
        .await
        .context("check admin")?;
        Ok(exists)
    }
}

use std::sync::Arc;

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::repo::CredentialStore;
use crate::auth::repo_types::{LoginToken, User};
use crate::error::AppError;

pub const LOGIN_TOKEN_LEN: usize = 100;

/// Opaque alphanumeric token drawn from the operating system CSPRNG.
pub fn generate_token(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Issues and redeems magic-link tokens.
#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    ttl: Duration,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Replaces any live token for `username` with a fresh one.
    pub async fn issue(&self, username: &str, email: &str) -> Result<String, AppError> {
        if username.is_empty() || email.is_empty() {
            return Err(AppError::Precondition(
                "a login token needs a username and an email",
            ));
        }

        let token = LoginToken {
            token: generate_token(LOGIN_TOKEN_LEN),
            username: username.to_string(),
            email: email.to_string(),
            expires_at: OffsetDateTime::now_utc() + self.ttl,
        };
        self.store.replace_login_token(&token).await?;

        info!(%username, %email, token_len = token.token.len(), "login token issued");
        Ok(token.token)
    }

    /// Consumes `token` and resolves the account it was issued for, creating
    /// the account on first use. Unknown, already used and expired tokens all
    /// come back as `None`.
    pub async fn redeem(&self, token: &str, ip: &str) -> Result<Option<User>, AppError> {
        self.redeem_at(token, ip, OffsetDateTime::now_utc()).await
    }

    pub(crate) async fn redeem_at(
        &self,
        token: &str,
        ip: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, AppError> {
        if token.is_empty() {
            return Err(AppError::Precondition("a token is required for redemption"));
        }
        if ip.is_empty() {
            return Err(AppError::Precondition("registration IP address required"));
        }

        let Some(taken) = self.store.take_login_token(token).await? else {
            warn!(token_len = token.len(), "login token not found");
            return Ok(None);
        };

        if taken.expires_at <= now {
            warn!(username = %taken.username, "login token expired");
            return Ok(None);
        }

        let Some((user, created)) = self
            .store
            .find_or_create_user(&taken.username, &taken.email, ip)
            .await?
        else {
            warn!(
                username = %taken.username,
                email = %taken.email,
                "login token bound to an email or username owned by another account"
            );
            return Ok(None);
        };

        if created {
            info!(username = %user.username, %ip, "registration via magic link completed");
        } else {
            info!(username = %user.username, "login via magic link completed");
        }
        Ok(Some(user))
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Account record. `score` is derived from the votes on the user's submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub registered_ip: String,
    pub score: i64,
}

/// One-time login token, bound to a (username, email) pair.
#[derive(Debug, Clone, FromRow)]
pub struct LoginToken {
    pub token: String,
    pub username: String,
    pub email: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct Bio {
    pub username: String,
    pub full_name: String,
    pub birthdate: String,
    pub bio_text: String,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub bio: Option<Bio>,
    pub is_admin: bool,
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Bio, UserProfile};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub captcha_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MagicQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BioRequest {
    pub full_name: String,
    pub birthdate: String,
    pub bio_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BioView {
    pub full_name: String,
    pub birthdate: String,
    pub bio_text: String,
}

impl From<Bio> for BioView {
    fn from(b: Bio) -> Self {
        Self {
            full_name: b.full_name,
            birthdate: b.birthdate,
            bio_text: b.bio_text,
        }
    }
}

/// Public view of an account. `email` is only filled for the owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub score: i64,
    pub is_admin: bool,
    pub bio: Option<BioView>,
}

impl ProfileResponse {
    pub fn public(profile: UserProfile) -> Self {
        Self {
            username: profile.user.username,
            email: None,
            created_at: profile.user.created_at,
            score: profile.user.score,
            is_admin: profile.is_admin,
            bio: profile.bio.map(Into::into),
        }
    }

    pub fn own(profile: UserProfile) -> Self {
        let email = profile.user.email.clone();
        Self {
            email: Some(email),
            ..Self::public(profile)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminResponse {
    pub is_admin: bool,
}

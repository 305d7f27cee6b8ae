use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

/// Clock skew tolerated between issuing and validating hosts.
const NOT_BEFORE_SKEW: Duration = Duration::minutes(1);

/// Signs and checks stateless session credentials (HS256 JWT).
#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl_minutes: i64,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl SessionKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            ttl_minutes: cfg.ttl_minutes,
        }
    }

    pub fn issue(&self, username: &str, ttl_minutes: i64) -> anyhow::Result<String> {
        self.issue_at(username, ttl_minutes, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        username: &str,
        ttl_minutes: i64,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        anyhow::ensure!(!username.is_empty(), "cannot issue a session for a blank username");

        let claims = Claims {
            username: username.to_string(),
            nbf: (now - NOT_BEFORE_SKEW).unix_timestamp(),
            exp: (now + Duration::minutes(ttl_minutes)).unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(%username, ttl_minutes, "session signed");
        Ok(token)
    }

    /// Returns the username carried by a valid credential, `None` otherwise.
    pub fn validate(&self, token: &str) -> Option<String> {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> Option<String> {
        // time window checked below against `now`, not the wall clock
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        let claims = match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                warn!(error = %e, token_len = token.len(), "session rejected");
                return None;
            }
        };

        let now = now.unix_timestamp();
        if now < claims.nbf {
            warn!(username = %claims.username, "session not yet valid");
            return None;
        }
        if now > claims.exp {
            debug!(username = %claims.username, "session expired");
            return None;
        }
        if claims.username.is_empty() {
            return None;
        }
        Some(claims.username)
    }

    /// Accepts exactly `Bearer <credential>`; anything else is `None`.
    pub fn parse(&self, header: &str) -> Option<String> {
        let mut parts = header.split(' ');
        let username = match (parts.next(), parts.next(), parts.next()) {
            (Some("Bearer"), Some(token), None) => self.validate(token)?,
            _ => return None,
        };
        info!(%username, "session parsed");
        Some(username)
    }
}

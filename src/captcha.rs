use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AppError;

const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Bot-verification gate in front of login, submission and comment flows.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, proof: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    action: String,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// reCAPTCHA v3: a proof passes when Google accepts it and scores it at or
/// above `cutoff`.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: String,
    cutoff: f64,
}

impl RecaptchaVerifier {
    pub fn new(secret: impl Into<String>, cutoff: f64) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret: secret.into(),
            cutoff,
        }
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, proof: &str) -> anyhow::Result<bool> {
        if proof.is_empty() {
            return Ok(false);
        }

        let res: SiteverifyResponse = self
            .client
            .post(SITEVERIFY_URL)
            .form(&[("secret", self.secret.as_str()), ("response", proof)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !res.success {
            warn!(errors = ?res.error_codes, "captcha verification failed");
            return Ok(false);
        }

        debug!(action = %res.action, score = res.score, "captcha scored");
        Ok(res.score >= self.cutoff)
    }
}

/// Fails the request with `CaptchaRejected` unless `proof` passes.
pub async fn require_human(verifier: &dyn CaptchaVerifier, proof: &str) -> Result<(), AppError> {
    if verifier.verify(proof).await? {
        Ok(())
    } else {
        warn!(proof_len = proof.len(), "captcha rejected");
        Err(AppError::CaptchaRejected)
    }
}

/// Used when no captcha secret is configured.
pub struct NoCaptcha;

#[async_trait]
impl CaptchaVerifier for NoCaptcha {
    async fn verify(&self, _proof: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

use async_trait::async_trait;
use tracing::info;

use crate::app::API_PREFIX;

/// Delivers magic links. Rendering and transport belong to the implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_magic_link(&self, to: &str, token: &str) -> anyhow::Result<()>;
}

/// Hands the redemption link to the log pipeline instead of an SMTP relay.
#[derive(Clone)]
pub struct LogMailer {
    public_url: String,
}

impl LogMailer {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into(),
        }
    }

    pub fn magic_link(&self, token: &str) -> String {
        format!(
            "{}{API_PREFIX}/magic?token={token}",
            self.public_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_magic_link(&self, to: &str, token: &str) -> anyhow::Result<()> {
        let link = self.magic_link(token);
        // the link is a live credential; only its shape is logged
        info!(%to, link_len = link.len(), "magic link queued");
        Ok(())
    }
}

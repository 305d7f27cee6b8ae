use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

const USER_AGENT: &str = concat!("linkboard/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Bytes read from a page before giving up on finding `<title>`.
pub const MAX_PAGE_BYTES: usize = 64 * 1024;

/// Looks up the `<title>` of a page so the submit form can prefill it.
#[async_trait]
pub trait TitleFetcher: Send + Sync {
    /// `None` when the page has no usable title.
    async fn fetch_title(&self, url: &str) -> anyhow::Result<Option<String>>;
}

pub struct HttpTitleFetcher {
    client: reqwest::Client,
}

impl HttpTitleFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TitleFetcher for HttpTitleFetcher {
    async fn fetch_title(&self, url: &str) -> anyhow::Result<Option<String>> {
        let mut res = self.client.get(url).send().await?.error_for_status()?;

        let mut page = Vec::new();
        while let Some(chunk) = res.chunk().await? {
            page.extend_from_slice(&chunk);
            if page.len() >= MAX_PAGE_BYTES {
                page.truncate(MAX_PAGE_BYTES);
                break;
            }
        }

        let title = extract_title(&String::from_utf8_lossy(&page));
        debug!(%url, bytes = page.len(), found = title.is_some(), "page title fetched");
        Ok(title)
    }
}

/// First `<title>` element, whitespace collapsed and common entities decoded.
pub fn extract_title(html: &str) -> Option<String> {
    lazy_static! {
        static ref TITLE_RE: Regex = Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap();
    }
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    (!title.is_empty()).then_some(title)
}

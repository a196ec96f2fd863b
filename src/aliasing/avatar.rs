//! Avatar discovery and embedding

use std::io::Read;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::dom::{NodeId, Page};

static SRCSET_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("valid srcset regex"));

/// Best remote URL for an avatar image: `src`, then `data-src`, then the
/// first absolute URL in `srcset`
pub fn avatar_url(page: &Page, img: NodeId) -> Option<String> {
    let doc = &page.document;

    let src = doc
        .attr(img, "src")
        .filter(|src| !src.trim().is_empty())
        .and_then(|src| page.resolve(src))
        .filter(|url| url.scheme().starts_with("http"));
    if let Some(src) = src {
        return Some(src.to_string());
    }

    if let Some(lazy) = doc.attr(img, "data-src").filter(|s| s.starts_with("http")) {
        return Some(lazy.to_string());
    }

    doc.attr(img, "srcset")
        .and_then(|srcset| SRCSET_URL.find(srcset))
        .map(|m| m.as_str().to_string())
}

/// Turns a remote image into a self-contained `data:` URL
pub trait AvatarFetcher: Send + Sync {
    fn to_data_url(&self, url: &str) -> Result<String>;
}

/// Embed `url` if possible, otherwise keep the live URL
pub fn embed_avatar(fetcher: &dyn AvatarFetcher, url: &str) -> String {
    match fetcher.to_data_url(url) {
        Ok(data_url) => data_url,
        Err(e) => {
            debug!(url, error = %e, "Avatar not embedded, keeping live URL");
            url.to_string()
        }
    }
}

/// Downloads avatars over HTTP with a timeout and a size cap
#[derive(Clone)]
pub struct HttpAvatarFetcher {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpAvatarFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self { agent, max_bytes }
    }
}

impl AvatarFetcher for HttpAvatarFetcher {
    fn to_data_url(&self, url: &str) -> Result<String> {
        let response = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("HTTP request failed: {}", url))?;

        let content_type = match response.content_type() {
            "" => "application/octet-stream".to_string(),
            other => other.to_string(),
        };

        let mut body = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut body)
            .context("Failed to read avatar body")?;
        if body.len() as u64 > self.max_bytes {
            bail!("Avatar larger than {} bytes: {}", self.max_bytes, url);
        }

        Ok(format!("data:{};base64,{}", content_type, STANDARD.encode(&body)))
    }
}

/// Never embeds; every avatar keeps its live URL
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineAvatarFetcher;

impl AvatarFetcher for OfflineAvatarFetcher {
    fn to_data_url(&self, url: &str) -> Result<String> {
        bail!("Avatar fetching disabled: {}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_img(html: &str) -> (Page, NodeId) {
        let page = Page::parse("https://github.com/facebook/react", html).unwrap();
        let img = page.document.elements_named("img")[0];
        (page, img)
    }

    #[test]
    fn test_avatar_url_prefers_src() {
        let (page, img) = first_img(
            r#"<img src="https://avatars.githubusercontent.com/u/1?v=4" data-src="https://x/lazy.png">"#,
        );
        assert_eq!(
            avatar_url(&page, img).as_deref(),
            Some("https://avatars.githubusercontent.com/u/1?v=4")
        );
    }

    #[test]
    fn test_avatar_url_resolves_relative_src() {
        let (page, img) = first_img(r#"<img src="/avatars/u/2.png">"#);
        assert_eq!(
            avatar_url(&page, img).as_deref(),
            Some("https://github.com/avatars/u/2.png")
        );
    }

    #[test]
    fn test_avatar_url_fallbacks() {
        let (page, img) = first_img(r#"<img src="data:image/gif;base64,R0lG" data-src="https://x/lazy.png">"#);
        assert_eq!(avatar_url(&page, img).as_deref(), Some("https://x/lazy.png"));

        let (page, img) =
            first_img(r#"<img src="" srcset="https://x/a.png 1x, https://x/b.png 2x">"#);
        assert_eq!(avatar_url(&page, img).as_deref(), Some("https://x/a.png"));

        let (page, img) = first_img(r#"<img alt="@octocat">"#);
        assert_eq!(avatar_url(&page, img), None);
    }

    struct FixedFetcher;

    impl AvatarFetcher for FixedFetcher {
        fn to_data_url(&self, _url: &str) -> Result<String> {
            Ok("data:image/png;base64,AAAA".to_string())
        }
    }

    #[test]
    fn test_embed_avatar_falls_back_to_live_url() {
        assert_eq!(
            embed_avatar(&OfflineAvatarFetcher, "https://x/a.png"),
            "https://x/a.png"
        );
        assert_eq!(
            embed_avatar(&FixedFetcher, "https://x/a.png"),
            "data:image/png;base64,AAAA"
        );
    }
}

//! Full-post content for feed tiles.
//!
//! Tiles render truncated text, so classification works off the public
//! JSON content endpoint instead: `GET <host>/comments/<short_id>.json`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{config::HostSiteConfig, domain::PostContent};

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Full title+body for the post with the given stable id (`t3_xxx` or
    /// bare short id). `None` covers every failure; the tile is silently
    /// left unlabeled and, because the ledger already claimed the id, it
    /// is not retried this session.
    async fn full_post(&self, post_id: &str) -> Option<PostContent>;
}

pub struct PublicContentClient {
    http: Client,
    config: HostSiteConfig,
}

impl PublicContentClient {
    pub fn new(http: Client, config: HostSiteConfig) -> Self {
        Self { http, config }
    }

    fn comments_url(&self, short_id: &str) -> Option<Url> {
        let raw = format!(
            "{}/comments/{}.json?raw_json=1",
            self.config.base_url.trim_end_matches('/'),
            short_id
        );
        match Url::parse(&raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
            _ => None,
        }
    }
}

#[async_trait]
impl ContentFetcher for PublicContentClient {
    async fn full_post(&self, post_id: &str) -> Option<PostContent> {
        let short_id = post_id.trim_start_matches("t3_");
        if short_id.is_empty() {
            return None;
        }
        let url = self.comments_url(short_id)?;

        let response = match self
            .http
            .get(url.clone())
            .timeout(self.config.fetch_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(target: "content", error = %err, %url, "content fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                target: "content",
                status = response.status().as_u16(),
                %url,
                "content endpoint returned an error status"
            );
            return None;
        }

        let body = response.text().await.ok()?;
        parse_comments_listing(&body)
    }
}

#[derive(Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Deserialize, Default)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Deserialize)]
struct Thing {
    #[serde(default)]
    data: ThingData,
}

#[derive(Deserialize, Default)]
struct ThingData {
    #[serde(default)]
    title: String,
    /// Full text body for self posts; empty for link/image/video posts.
    #[serde(default)]
    selftext: String,
}

fn parse_comments_listing(body: &str) -> Option<PostContent> {
    let listings: Vec<Listing> = serde_json::from_str(body).ok()?;
    let post = listings
        .into_iter()
        .next()?
        .data
        .children
        .into_iter()
        .next()?
        .data;
    Some(PostContent::new(post.title, post.selftext))
}

pub mod classify;
pub mod recommend;

pub use classify::Classifier;
pub use recommend::{PostReport, RecommendationApi};

use std::time::Duration;

use reqwest::Client;

use crate::config::BackendConfig;

/// HTTP client for the bias service. One struct backs both seams:
/// [`Classifier`] (`/classify`, `/classify_batch`) and
/// [`RecommendationApi`] (`/api/recommend`, `/api/related`).
#[derive(Clone)]
pub struct BiasApiClient {
    http: Client,
    base_url: String,
    request_timeout: Duration,
}

impl BiasApiClient {
    pub fn new(http: Client, config: &BackendConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

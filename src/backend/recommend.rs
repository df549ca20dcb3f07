use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::domain::{Label, RelatedPost};

use super::BiasApiClient;

/// Post details reported to the recommendation service. The same body
/// feeds both the threshold check and the related-posts fetch.
#[derive(Debug, Clone, Serialize)]
pub struct PostReport {
    pub user_id: String,
    pub title: String,
    pub post: String,
    pub label: Label,
    pub subreddit: String,
}

/// Recommendation side channel. Failures are absorbed: the user never
/// sees an error for this feature, only its absence.
#[async_trait]
pub trait RecommendationApi: Send + Sync {
    /// Asks whether the user's recent reading crossed the bias-exposure
    /// threshold. `Some` carries the counter-perspective posts for the
    /// popup; `None` covers "not reached" (204) and every failure.
    async fn check_threshold(&self, report: &PostReport) -> Option<Vec<RelatedPost>>;

    /// Opposing/neutral posts for the related panel. `None` on failure.
    async fn related_posts(&self, report: &PostReport) -> Option<Vec<RelatedPost>>;
}

#[derive(Deserialize)]
struct RecommendResponse {
    #[serde(default)]
    bias_detected: bool,
    #[serde(default)]
    recommendations: Vec<RelatedPost>,
}

#[derive(Deserialize)]
struct RelatedResponse {
    #[serde(default)]
    related_posts: Vec<RelatedPost>,
}

#[async_trait]
impl RecommendationApi for BiasApiClient {
    async fn check_threshold(&self, report: &PostReport) -> Option<Vec<RelatedPost>> {
        let response = match self
            .http()
            .post(self.endpoint("/api/recommend"))
            .timeout(self.request_timeout())
            .json(report)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(target: "monitor", error = %err, "recommend endpoint unreachable");
                return None;
            }
        };

        if response.status() == StatusCode::NO_CONTENT {
            tracing::debug!(target: "monitor", "bias threshold not reached");
            return None;
        }
        if !response.status().is_success() {
            tracing::warn!(
                target: "monitor",
                status = response.status().as_u16(),
                "recommend endpoint returned an error status"
            );
            return None;
        }

        let parsed: RecommendResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(target: "monitor", error = %err, "malformed recommend response");
                return None;
            }
        };

        if parsed.bias_detected && !parsed.recommendations.is_empty() {
            Some(parsed.recommendations)
        } else {
            None
        }
    }

    async fn related_posts(&self, report: &PostReport) -> Option<Vec<RelatedPost>> {
        let response = match self
            .http()
            .post(self.endpoint("/api/related"))
            .timeout(self.request_timeout())
            .json(report)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(target: "related", error = %err, "related endpoint unreachable");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                target: "related",
                status = response.status().as_u16(),
                "related endpoint returned an error status"
            );
            return None;
        }

        match response.json::<RelatedResponse>().await {
            Ok(parsed) => Some(parsed.related_posts),
            Err(err) => {
                tracing::warn!(target: "related", error = %err, "malformed related response");
                None
            }
        }
    }
}

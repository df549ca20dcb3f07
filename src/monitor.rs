//! Bias-threshold side channel.
//!
//! When an opened post resolves to a partisan label, the recommendation
//! service is asked whether the user's recent reading has become
//! one-sided. Every failure degrades to "no popup"; this channel never
//! surfaces an error.

use std::sync::Arc;

use crate::backend::{PostReport, RecommendationApi};
use crate::domain::{Label, PageState, PostContent};
use crate::identity::{IdentityResolver, ANONYMOUS_USER};
use crate::page::HostPage;
use crate::pipeline::{resolver, SessionState};

/// Dedup key falls back to the truncated title when the URL carries no
/// recognizable post id.
const TITLE_KEY_LEN: usize = 100;

pub struct ThresholdMonitor {
    api: Arc<dyn RecommendationApi>,
    identity: Arc<dyn IdentityResolver>,
    session: Arc<SessionState>,
}

impl ThresholdMonitor {
    pub fn new(
        api: Arc<dyn RecommendationApi>,
        identity: Arc<dyn IdentityResolver>,
        session: Arc<SessionState>,
    ) -> Self {
        Self {
            api,
            identity,
            session,
        }
    }

    /// Fires the threshold check for a freshly labeled opened post, at
    /// most once per distinct post per session regardless of how many
    /// times the surrounding scan re-executes.
    pub async fn report(
        &self,
        page: &dyn HostPage,
        state: &PageState,
        content: &PostContent,
        label: Label,
    ) {
        if !label.is_partisan() {
            return;
        }
        if content.title.trim().is_empty() && content.body.trim().is_empty() {
            return;
        }

        let key = resolver::post_id_from_url(&state.url)
            .unwrap_or_else(|| truncate_chars(&content.title, TITLE_KEY_LEN));
        if !self.session.recommendations.claim(&key) {
            return;
        }

        let user_id = self
            .identity
            .username()
            .await
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());
        let subreddit =
            resolver::subreddit_from_url(&state.url).unwrap_or_else(|| "unknown".to_string());

        let report = PostReport {
            user_id,
            title: content.title.clone(),
            post: content.body.clone(),
            label,
            subreddit,
        };

        let Some(recommendations) = self.api.check_threshold(&report).await else {
            return;
        };

        // the engine may have been disabled while the check was in flight
        if !self.session.is_active() {
            return;
        }
        // the response may arrive after a navigation; never show a popup
        // for a post the user already left
        if page.current_url() != state.url {
            tracing::debug!(target: "monitor", "discarding stale threshold response");
            return;
        }

        tracing::info!(
            target: "monitor",
            label = label.as_str(),
            count = recommendations.len(),
            "bias threshold crossed; surfacing alternative perspectives"
        );
        page.show_popup(&recommendations);
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

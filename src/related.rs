//! Related-posts panel: per-URL cache and fetch coordination.
//!
//! The cache is keyed by the page URL it was filled for. Hover events can
//! arrive in bursts; only the first one per URL starts a fetch, the rest
//! render whatever state the cache is in.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{PostReport, RecommendationApi};
use crate::domain::{PageKind, PageState, PanelView, RelatedPost};
use crate::identity::{IdentityResolver, ANONYMOUS_USER};
use crate::page::{selectors, HostPage};
use crate::pipeline::{annotate, extract, resolver};

#[derive(Debug, Clone)]
enum CacheState {
    Empty,
    Fetching,
    Populated(Vec<RelatedPost>),
}

#[derive(Debug)]
struct CacheInner {
    /// URL the current state belongs to. A response landing after a
    /// navigation finds a different URL here and is discarded.
    for_url: Option<String>,
    state: CacheState,
}

pub struct RelatedPostsController {
    api: Arc<dyn RecommendationApi>,
    identity: Arc<dyn IdentityResolver>,
    cache: Mutex<CacheInner>,
}

impl RelatedPostsController {
    pub fn new(api: Arc<dyn RecommendationApi>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            api,
            identity,
            cache: Mutex::new(CacheInner {
                for_url: None,
                state: CacheState::Empty,
            }),
        }
    }

    /// Navigation or toggle-off: drop the cache and tear the UI down
    /// right away rather than leaving the previous post's panel behind.
    pub fn invalidate(&self, page: &dyn HostPage) {
        let mut cache = self.cache.lock();
        cache.for_url = None;
        cache.state = CacheState::Empty;
        drop(cache);
        page.remove_related_ui();
    }

    /// Brings the panel up to date for the current page. Runs after every
    /// scan pass; only opened posts that already carry a label qualify.
    pub async fn refresh(&self, page: &dyn HostPage, state: &PageState) {
        if state.kind != PageKind::OpenedPost {
            return;
        }
        let Some(node) = page.query_first(selectors::OPENED_POST) else {
            return;
        };
        let Some(label) = annotate::label_of(page, node) else {
            // not classified yet; the post-classification pass retries
            return;
        };
        let Some(content) = extract::opened_post_content(page, node) else {
            return;
        };
        let Some(subreddit) = resolver::subreddit_from_url(&state.url) else {
            return;
        };

        page.mount_related_ui();

        {
            let mut cache = self.cache.lock();
            let same_url = cache.for_url.as_deref() == Some(state.url.as_str());
            if same_url && !matches!(cache.state, CacheState::Empty) {
                // already fetched or fetching for this URL
                return;
            }
            cache.for_url = Some(state.url.clone());
            cache.state = CacheState::Fetching;
        }

        let user_id = self
            .identity
            .username()
            .await
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());
        let report = PostReport {
            user_id,
            title: content.title,
            post: content.body,
            label,
            subreddit,
        };

        // a failed call populates an empty list: the panel shows "nothing
        // found" instead of refetching on every hover
        let posts = self.api.related_posts(&report).await.unwrap_or_default();

        let mut cache = self.cache.lock();
        if cache.for_url.as_deref() != Some(state.url.as_str()) {
            tracing::debug!(target: "related", "discarding related posts for a left page");
            return;
        }
        tracing::debug!(target: "related", count = posts.len(), "related posts cached");
        cache.state = CacheState::Populated(posts);
    }

    /// What the panel should display right now.
    pub fn panel_view(&self) -> PanelView {
        match &self.cache.lock().state {
            CacheState::Fetching => PanelView::Loading,
            CacheState::Empty => PanelView::Empty,
            CacheState::Populated(posts) if posts.is_empty() => PanelView::Empty,
            CacheState::Populated(posts) => PanelView::Posts(posts.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::Label;
    use crate::page::SimPage;
    use crate::pipeline::resolve_page;

    struct CountingApi {
        calls: AtomicUsize,
        response: Option<Vec<RelatedPost>>,
    }

    #[async_trait]
    impl RecommendationApi for CountingApi {
        async fn check_threshold(&self, _report: &PostReport) -> Option<Vec<RelatedPost>> {
            None
        }

        async fn related_posts(&self, _report: &PostReport) -> Option<Vec<RelatedPost>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    struct NoIdentity;

    #[async_trait]
    impl IdentityResolver for NoIdentity {
        async fn username(&self) -> Option<String> {
            None
        }
    }

    fn related(title: &str) -> RelatedPost {
        RelatedPost {
            title: title.to_string(),
            url: "https://example.com/p".into(),
            leaning: Label::Right,
        }
    }

    fn labeled_post_page(url: &str) -> SimPage {
        let page = SimPage::new(url);
        let node = page.add_opened_post(
            "A contentious headline",
            "With a body comfortably over the minimum length.",
        );
        page.set_attr(node, annotate::LABEL_ATTR, "left");
        page
    }

    fn controller(
        response: Option<Vec<RelatedPost>>,
    ) -> (RelatedPostsController, Arc<CountingApi>) {
        let api = Arc::new(CountingApi {
            calls: AtomicUsize::new(0),
            response,
        });
        let controller = RelatedPostsController::new(api.clone(), Arc::new(NoIdentity));
        (controller, api)
    }

    #[tokio::test]
    async fn fetches_once_per_url_and_caches_the_result() {
        let url = "https://www.reddit.com/r/politics/comments/rel1/t/";
        let page = labeled_post_page(url);
        let state = resolve_page(&page);
        let (controller, api) = controller(Some(vec![related("Other side")]));

        controller.refresh(&page, &state).await;
        controller.refresh(&page, &state).await;
        controller.refresh(&page, &state).await;

        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert!(page.related_ui_mounted());
        match controller.panel_view() {
            PanelView::Posts(posts) => assert_eq!(posts.len(), 1),
            other => panic!("expected posts, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_fetch_settles_on_the_empty_view() {
        let url = "https://www.reddit.com/r/politics/comments/rel2/t/";
        let page = labeled_post_page(url);
        let state = resolve_page(&page);
        let (controller, api) = controller(None);

        controller.refresh(&page, &state).await;
        assert!(matches!(controller.panel_view(), PanelView::Empty));

        // the failure is cached: hovering again does not refetch
        controller.refresh(&page, &state).await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn navigation_invalidates_cache_and_unmounts_ui() {
        let url_a = "https://www.reddit.com/r/politics/comments/rel3/t/";
        let page = labeled_post_page(url_a);
        let state_a = resolve_page(&page);
        let (controller, api) = controller(Some(vec![related("Other side")]));

        controller.refresh(&page, &state_a).await;
        assert!(page.related_ui_mounted());

        page.navigate("https://www.reddit.com/r/politics/comments/rel4/t/");
        controller.invalidate(&page);
        assert!(!page.related_ui_mounted());
        assert!(matches!(controller.panel_view(), PanelView::Empty));

        // the new post fetches fresh
        let page_b = labeled_post_page("https://www.reddit.com/r/politics/comments/rel4/t/");
        let state_b = resolve_page(&page_b);
        controller.refresh(&page_b, &state_b).await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unlabeled_post_never_mounts_the_panel() {
        let url = "https://www.reddit.com/r/politics/comments/rel5/t/";
        let page = SimPage::new(url);
        page.add_opened_post("A headline", "Body text long enough here.");
        let state = resolve_page(&page);
        let (controller, api) = controller(Some(vec![related("Other side")]));

        controller.refresh(&page, &state).await;

        assert!(!page.related_ui_mounted());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn feed_pages_are_ignored() {
        let page = SimPage::new("https://www.reddit.com/");
        let state = resolve_page(&page);
        let (controller, api) = controller(Some(vec![related("Other side")]));

        controller.refresh(&page, &state).await;

        assert!(!page.related_ui_mounted());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }
}

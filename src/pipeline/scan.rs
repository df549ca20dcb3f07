//! The scan pipeline: discover candidates, gate through the ledger,
//! fetch content, classify, annotate.
//!
//! Invocations overlap freely (initial timer, mutation bursts, URL
//! polling); correctness rests on the ledger claim and the annotation
//! idempotence check, never on invocation order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::Classifier;
use crate::config::ScanConfig;
use crate::content::ContentFetcher;
use crate::domain::{PageKind, PageState, PostRef};
use crate::monitor::ThresholdMonitor;
use crate::page::{selectors, HostPage, NodeId};

use super::{annotate, extract, resolve_page, SessionState};

/// How a candidate exposes its stable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileShape {
    Generic,
    Sdui,
}

pub struct Scanner {
    page: Arc<dyn HostPage>,
    classifier: Arc<dyn Classifier>,
    content: Arc<dyn ContentFetcher>,
    session: Arc<SessionState>,
    monitor: Arc<ThresholdMonitor>,
    config: ScanConfig,
    initial_scan_done: AtomicBool,
}

impl Scanner {
    pub fn new(
        page: Arc<dyn HostPage>,
        classifier: Arc<dyn Classifier>,
        content: Arc<dyn ContentFetcher>,
        session: Arc<SessionState>,
        monitor: Arc<ThresholdMonitor>,
        config: ScanConfig,
    ) -> Self {
        Self {
            page,
            classifier,
            content,
            session,
            monitor,
            config,
            initial_scan_done: AtomicBool::new(false),
        }
    }

    /// Back to the pristine state (toggle re-enable): the next feed scan
    /// counts as the first one again and is capped accordingly.
    pub fn reset(&self) {
        self.initial_scan_done.store(false, Ordering::SeqCst);
    }

    /// One full pipeline pass over the current page.
    pub async fn scan(&self) {
        if !self.session.is_active() {
            return;
        }
        let state = resolve_page(&*self.page);
        tracing::debug!(target: "scan", url = %state.url, kind = ?state.kind, "scan pass");
        match state.kind {
            PageKind::OpenedPost => self.scan_opened_post(&state).await,
            _ => self.scan_tiles(&state).await,
        }
    }

    async fn scan_opened_post(&self, state: &PageState) {
        let Some(node) = self.page.query_first(selectors::OPENED_POST) else {
            // not rendered yet; the next trigger retries
            return;
        };
        if annotate::already_labeled(&*self.page, node) {
            return;
        }
        let Some(content) = extract::opened_post_content(&*self.page, node) else {
            return;
        };
        let text = content.combined();
        if !extract::has_enough_text(&text, self.config.min_text_len) {
            tracing::debug!(target: "scan", "opened post below minimum length, skipping");
            return;
        }

        let Some(result) = self.classifier.classify(&text).await else {
            return;
        };
        // the engine may have been disabled or navigated away while the
        // classify call was in flight
        if !self.session.is_active() {
            return;
        }
        if self.page.current_url() != state.url {
            tracing::debug!(target: "scan", "page changed during classification, discarding");
            return;
        }
        if !annotate::apply(&*self.page, node, &result) {
            // a parallel pass won the race, or the node vanished
            return;
        }
        tracing::info!(target: "scan", label = result.label.as_str(), "opened post labeled");

        if result.label.is_partisan() {
            self.monitor
                .report(&*self.page, state, &content, result.label)
                .await;
        }
    }

    async fn scan_tiles(&self, state: &PageState) {
        let mut candidates = self.collect_candidates(state.kind);

        // bound the cost of the very first scan; mutation-triggered scans
        // pick up the remainder
        let cap = self.config.first_scan_cap;
        if !self.initial_scan_done.swap(true, Ordering::SeqCst) && candidates.len() > cap {
            candidates.truncate(cap);
        }

        let mut labeled = 0usize;
        for (node, shape) in candidates {
            let id = match shape {
                TileShape::Generic => extract::tile_post_id(&*self.page, node),
                TileShape::Sdui => extract::sdui_post_id(&*self.page, node),
            };
            let Some(id) = id else {
                // no stable identifier: leave the tile unlabeled
                continue;
            };
            let post = PostRef::new(id, node);
            if !self.session.posts.claim(&post.id) {
                continue;
            }

            let Some(content) = self.content.full_post(&post.id).await else {
                continue;
            };
            let text = content.combined();
            if !extract::has_enough_text(&text, self.config.min_text_len) {
                continue;
            }
            let Some(result) = self.classifier.classify_batched(&text).await else {
                continue;
            };

            if !self.session.is_active() {
                return;
            }
            if self.page.current_url() != state.url {
                tracing::debug!(target: "scan", "page changed mid-scan, stopping this pass");
                return;
            }
            if annotate::apply(&*self.page, post.node, &result) {
                labeled += 1;
            }
        }

        if labeled > 0 {
            tracing::info!(target: "scan", labeled, "feed tiles labeled");
        }
    }

    /// Candidates in document order. Search pages include the generic
    /// tiles too; a node matching several selector groups appears once.
    fn collect_candidates(&self, kind: PageKind) -> Vec<(NodeId, TileShape)> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut candidates = Vec::new();

        if kind == PageKind::SearchSingleTerm {
            for node in self.page.query_all(selectors::SDUI_UNIT) {
                if seen.insert(node) {
                    candidates.push((node, TileShape::Sdui));
                }
            }
        }
        if kind == PageKind::SearchMultiTerm {
            for node in self.page.query_all(selectors::SEARCH_PREVIEW) {
                if seen.insert(node) {
                    candidates.push((node, TileShape::Generic));
                }
            }
        }
        for node in self.page.query_all(selectors::FEED_TILE) {
            if seen.insert(node) {
                candidates.push((node, TileShape::Generic));
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::backend::{PostReport, RecommendationApi};
    use crate::domain::{ClassificationResult, Label, PostContent, RelatedPost};
    use crate::identity::IdentityResolver;
    use crate::page::SimPage;

    struct StubClassifier {
        label: Label,
        single_calls: AtomicUsize,
        batched_calls: Mutex<Vec<String>>,
    }

    impl StubClassifier {
        fn new(label: Label) -> Self {
            Self {
                label,
                single_calls: AtomicUsize::new(0),
                batched_calls: Mutex::new(Vec::new()),
            }
        }

        fn batched_count(&self) -> usize {
            self.batched_calls.lock().len()
        }
    }

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(&self, _text: &str) -> Option<ClassificationResult> {
            self.single_calls.fetch_add(1, Ordering::SeqCst);
            Some(ClassificationResult {
                label: self.label,
                confidence: Some(0.8),
            })
        }

        async fn classify_batched(&self, text: &str) -> Option<ClassificationResult> {
            self.batched_calls.lock().push(text.to_string());
            Some(ClassificationResult {
                label: self.label,
                confidence: None,
            })
        }
    }

    /// Classifier whose responses all fail.
    struct FailingClassifier;

    #[async_trait]
    impl Classifier for FailingClassifier {
        async fn classify(&self, _text: &str) -> Option<ClassificationResult> {
            None
        }

        async fn classify_batched(&self, _text: &str) -> Option<ClassificationResult> {
            None
        }
    }

    struct StubContent {
        calls: Mutex<Vec<String>>,
    }

    impl StubContent {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn fetched_ids(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ContentFetcher for StubContent {
        async fn full_post(&self, post_id: &str) -> Option<PostContent> {
            self.calls.lock().push(post_id.to_string());
            Some(PostContent::new(
                format!("Full title for {post_id}"),
                "A body long enough to pass the minimum-length guard.",
            ))
        }
    }

    /// Records every threshold check so tests can assert the scan to
    /// monitor hand-off; never reports a crossed threshold.
    struct RecordingRecommendApi {
        reported: Mutex<Vec<Label>>,
    }

    impl RecordingRecommendApi {
        fn new() -> Self {
            Self {
                reported: Mutex::new(Vec::new()),
            }
        }

        fn reported_labels(&self) -> Vec<Label> {
            self.reported.lock().clone()
        }
    }

    #[async_trait]
    impl RecommendationApi for RecordingRecommendApi {
        async fn check_threshold(&self, report: &PostReport) -> Option<Vec<RelatedPost>> {
            self.reported.lock().push(report.label);
            None
        }

        async fn related_posts(&self, _report: &PostReport) -> Option<Vec<RelatedPost>> {
            None
        }
    }

    struct NoIdentity;

    #[async_trait]
    impl IdentityResolver for NoIdentity {
        async fn username(&self) -> Option<String> {
            None
        }
    }

    fn scan_config() -> ScanConfig {
        ScanConfig {
            initial_scan_delay: std::time::Duration::from_millis(0),
            url_poll_interval: std::time::Duration::from_millis(50),
            rescan_delay_opened: std::time::Duration::from_millis(0),
            rescan_delay_feed: std::time::Duration::from_millis(0),
            first_scan_cap: 15,
            min_text_len: 20,
        }
    }

    struct Rig {
        page: Arc<SimPage>,
        classifier: Arc<StubClassifier>,
        content: Arc<StubContent>,
        session: Arc<SessionState>,
        recommend: Arc<RecordingRecommendApi>,
        scanner: Scanner,
    }

    fn rig(url: &str, label: Label) -> Rig {
        let page = Arc::new(SimPage::new(url));
        let classifier = Arc::new(StubClassifier::new(label));
        let content = Arc::new(StubContent::new());
        let session = Arc::new(SessionState::new());
        let recommend = Arc::new(RecordingRecommendApi::new());
        let monitor = Arc::new(ThresholdMonitor::new(
            recommend.clone(),
            Arc::new(NoIdentity),
            session.clone(),
        ));
        let scanner = Scanner::new(
            page.clone(),
            classifier.clone(),
            content.clone(),
            session.clone(),
            monitor,
            scan_config(),
        );
        Rig {
            page,
            classifier,
            content,
            session,
            recommend,
            scanner,
        }
    }

    #[tokio::test]
    async fn each_tile_is_classified_at_most_once() {
        let r = rig("https://www.reddit.com/", Label::Neutral);
        let a = r.page.add_feed_tile("/r/news/comments/aaa1/t/");
        let b = r.page.add_feed_tile("/r/news/comments/bbb2/t/");

        r.scanner.scan().await;
        r.scanner.scan().await;
        r.scanner.scan().await;

        assert_eq!(r.classifier.batched_count(), 2);
        assert_eq!(r.content.fetched_ids(), vec!["t3_aaa1", "t3_bbb2"]);
        assert_eq!(r.session.posts.len(), 2);
        assert_eq!(r.page.badge_count(a), 1);
        assert_eq!(r.page.badge_count(b), 1);
    }

    #[tokio::test]
    async fn first_scan_is_capped_and_mutation_rescan_picks_up_the_rest() {
        let r = rig("https://www.reddit.com/", Label::Neutral);
        for i in 0..20 {
            r.page.add_feed_tile(&format!("/r/news/comments/cap{i}/t/"));
        }

        r.scanner.scan().await;
        assert_eq!(r.classifier.batched_count(), 15);

        // a later (mutation-triggered) scan is uncapped
        r.scanner.scan().await;
        assert_eq!(r.classifier.batched_count(), 20);
    }

    #[tokio::test]
    async fn unidentifiable_tiles_are_skipped_without_fetching() {
        let r = rig("https://www.reddit.com/", Label::Neutral);
        r.page.add_feed_tile("/user/someone/saved/1");

        r.scanner.scan().await;
        assert!(r.content.fetched_ids().is_empty());
        assert_eq!(r.classifier.batched_count(), 0);
    }

    #[tokio::test]
    async fn failed_fetch_still_consumes_the_claim() {
        struct NoContent;

        #[async_trait]
        impl ContentFetcher for NoContent {
            async fn full_post(&self, _post_id: &str) -> Option<PostContent> {
                None
            }
        }

        let page = Arc::new(SimPage::new("https://www.reddit.com/"));
        page.add_feed_tile("/r/news/comments/gone1/t/");
        let classifier = Arc::new(StubClassifier::new(Label::Neutral));
        let session = Arc::new(SessionState::new());
        let monitor = Arc::new(ThresholdMonitor::new(
            Arc::new(RecordingRecommendApi::new()),
            Arc::new(NoIdentity),
            session.clone(),
        ));
        let scanner = Scanner::new(
            page.clone(),
            classifier.clone(),
            Arc::new(NoContent),
            session.clone(),
            monitor,
            scan_config(),
        );

        scanner.scan().await;
        scanner.scan().await;

        // the id stays claimed: no retry within the session
        assert!(session.posts.contains("t3_gone1"));
        assert_eq!(classifier.batched_count(), 0);
    }

    #[tokio::test]
    async fn opened_post_uses_the_single_endpoint_and_gets_a_badge() {
        let url = "https://www.reddit.com/r/politics/comments/zzz1/t/";
        let r = rig(url, Label::Left);
        let post = r.page.add_opened_post(
            "A contentious headline",
            "With a body comfortably over the minimum length.",
        );

        r.scanner.scan().await;

        assert_eq!(r.classifier.single_calls.load(Ordering::SeqCst), 1);
        assert_eq!(r.classifier.batched_count(), 0);
        assert_eq!(r.page.badges(post), vec![Label::Left]);
        // rescan: annotation idempotence keeps it at one call, one badge,
        // and the threshold check is not repeated either
        r.scanner.scan().await;
        assert_eq!(r.classifier.single_calls.load(Ordering::SeqCst), 1);
        assert_eq!(r.page.badge_count(post), 1);
        assert_eq!(r.recommend.reported_labels(), vec![Label::Left]);
    }

    #[tokio::test]
    async fn neutral_opened_post_skips_the_threshold_check() {
        let url = "https://www.reddit.com/r/politics/comments/zzz4/t/";
        let r = rig(url, Label::Neutral);
        let post = r.page.add_opened_post(
            "A perfectly balanced headline",
            "With a body comfortably over the minimum length.",
        );

        r.scanner.scan().await;

        assert_eq!(r.page.badges(post), vec![Label::Neutral]);
        assert!(r.recommend.reported_labels().is_empty());
    }

    #[tokio::test]
    async fn short_opened_post_is_never_classified() {
        let url = "https://www.reddit.com/r/politics/comments/zzz2/t/";
        let r = rig(url, Label::Left);
        let post = r.page.add_opened_post("Tiny", "");

        r.scanner.scan().await;

        assert_eq!(r.classifier.single_calls.load(Ordering::SeqCst), 0);
        assert_eq!(r.page.badge_count(post), 0);
    }

    #[tokio::test]
    async fn failed_classification_leaves_no_marker() {
        let url = "https://www.reddit.com/r/politics/comments/zzz3/t/";
        let page = Arc::new(SimPage::new(url));
        let post = page.add_opened_post(
            "A contentious headline",
            "With a body comfortably over the minimum length.",
        );
        let session = Arc::new(SessionState::new());
        let monitor = Arc::new(ThresholdMonitor::new(
            Arc::new(RecordingRecommendApi::new()),
            Arc::new(NoIdentity),
            session.clone(),
        ));
        let scanner = Scanner::new(
            page.clone(),
            Arc::new(FailingClassifier),
            Arc::new(StubContent::new()),
            session,
            monitor,
            scan_config(),
        );

        scanner.scan().await;

        assert_eq!(page.badge_count(post), 0);
        assert!(!annotate::already_labeled(&*page, post));
    }

    #[tokio::test]
    async fn disable_during_classification_suppresses_annotation() {
        struct DisablingClassifier {
            session: Arc<SessionState>,
        }

        #[async_trait]
        impl Classifier for DisablingClassifier {
            async fn classify(&self, _text: &str) -> Option<ClassificationResult> {
                // the toggle flips while the request is in flight
                self.session.set_active(false);
                Some(ClassificationResult {
                    label: Label::Left,
                    confidence: None,
                })
            }

            async fn classify_batched(&self, _text: &str) -> Option<ClassificationResult> {
                self.session.set_active(false);
                Some(ClassificationResult {
                    label: Label::Left,
                    confidence: None,
                })
            }
        }

        let url = "https://www.reddit.com/r/politics/comments/off1/t/";
        let page = Arc::new(SimPage::new(url));
        let post = page.add_opened_post(
            "A contentious headline",
            "With a body comfortably over the minimum length.",
        );
        let session = Arc::new(SessionState::new());
        let monitor = Arc::new(ThresholdMonitor::new(
            Arc::new(RecordingRecommendApi::new()),
            Arc::new(NoIdentity),
            session.clone(),
        ));
        let scanner = Scanner::new(
            page.clone(),
            Arc::new(DisablingClassifier {
                session: session.clone(),
            }),
            Arc::new(StubContent::new()),
            session.clone(),
            monitor,
            scan_config(),
        );

        scanner.scan().await;

        // the response landed after teardown began; nothing is written
        assert_eq!(page.badge_count(post), 0);
        assert!(!annotate::already_labeled(&*page, post));
    }

    #[tokio::test]
    async fn sdui_units_are_scanned_on_single_term_search() {
        let r = rig("https://www.reddit.com/search/?q=election", Label::Neutral);
        let unit = r.page.add_sdui_unit("/r/news/comments/sd1/t/");

        r.scanner.scan().await;

        assert_eq!(r.content.fetched_ids(), vec!["t3_sd1"]);
        assert_eq!(r.page.badge_count(unit), 1);
    }

    #[tokio::test]
    async fn opened_post_page_suppresses_feed_scanning() {
        let url = "https://www.reddit.com/r/politics/comments/op1/t/";
        let r = rig(url, Label::Neutral);
        r.page.add_opened_post(
            "A contentious headline",
            "With a body comfortably over the minimum length.",
        );
        r.page.add_feed_tile("/r/news/comments/side1/t/");

        r.scanner.scan().await;

        assert_eq!(r.classifier.batched_count(), 0);
        assert!(r.content.fetched_ids().is_empty());
    }
}

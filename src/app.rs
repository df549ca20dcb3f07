use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;

use crate::{
    backend::{BiasApiClient, Classifier, RecommendationApi},
    config::AppConfig,
    content::PublicContentClient,
    identity::{HostIdentityClient, IdentityResolver},
    infrastructure::ShutdownListener,
    monitor::ThresholdMonitor,
    page::HostPage,
    pipeline::{Scanner, SessionState},
    related::RelatedPostsController,
    scheduler::{ScanScheduler, SchedulerHandle},
};

/// The assembled engine: one scheduler loop driving one host page.
///
/// The embedder supplies the [`HostPage`] bridge, calls [`initialize`],
/// keeps the [`SchedulerHandle`] for toggle/rescan control and awaits
/// [`run`] until shutdown.
///
/// [`initialize`]: BiasLensApp::initialize
/// [`run`]: BiasLensApp::run
pub struct BiasLensApp {
    scheduler: ScanScheduler,
    handle: SchedulerHandle,
}

impl BiasLensApp {
    pub fn initialize(config: AppConfig, page: Arc<dyn HostPage>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(format!("biaslens/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let backend = BiasApiClient::new(http.clone(), &config.backend);
        let classifier: Arc<dyn Classifier> = Arc::new(backend.clone());
        let recommend: Arc<dyn RecommendationApi> = Arc::new(backend);
        let content = Arc::new(PublicContentClient::new(http.clone(), config.host.clone()));
        let identity: Arc<dyn IdentityResolver> =
            Arc::new(HostIdentityClient::new(http, config.host.clone()));

        let session = Arc::new(SessionState::new());
        let monitor = Arc::new(ThresholdMonitor::new(
            recommend.clone(),
            identity.clone(),
            session.clone(),
        ));
        let scanner = Arc::new(Scanner::new(
            page.clone(),
            classifier,
            content,
            session.clone(),
            monitor,
            config.scan.clone(),
        ));
        let related = Arc::new(RelatedPostsController::new(recommend, identity.clone()));

        let (scheduler, handle) =
            ScanScheduler::new(page, scanner, related, identity, session, config.scan);

        Ok(Self { scheduler, handle })
    }

    /// Control handle for the embedder's toggle switch and manual rescans.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Runs the scheduler loop until the shutdown signal fires.
    pub async fn run(self, shutdown: ShutdownListener) {
        self.scheduler.run(shutdown).await;
    }
}

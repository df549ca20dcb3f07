//! Political-bias annotation engine for social feed pages.
//!
//! The engine drives an externally-owned page through the [`page::HostPage`]
//! bridge: it watches for new posts, classifies their full text against a
//! remote bias service and writes a colored badge next to each one. On
//! opened posts it additionally tracks reading-history bias (popup when the
//! threshold is crossed) and fills a related-posts panel with opposing
//! perspectives.
//!
//! Embedding boils down to:
//!
//! ```no_run
//! # async fn embed(page: std::sync::Arc<dyn biaslens::HostPage>) -> anyhow::Result<()> {
//! let config = biaslens::load_config()?;
//! biaslens::infrastructure::init_tracing(&config.logging)?;
//!
//! let app = biaslens::BiasLensApp::initialize(config, page)?;
//! let handle = app.handle();
//!
//! let shutdown = biaslens::Shutdown::new();
//! shutdown.install_signal_handlers();
//! tokio::spawn(app.run(shutdown.subscribe()));
//!
//! handle.rescan();
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod content;
pub mod domain;
pub mod identity;
pub mod infrastructure;
pub mod monitor;
pub mod page;
pub mod pipeline;
pub mod related;
pub mod scheduler;

pub use app::BiasLensApp;
pub use config::{load_config, AppConfig};
pub use domain::{ClassificationResult, Label, PageKind, PageState, PanelView, RelatedPost};
pub use infrastructure::{Shutdown, ShutdownListener};
pub use page::{HostPage, NodeId, PageEvent, SimPage};
pub use scheduler::{Command, SchedulerHandle};

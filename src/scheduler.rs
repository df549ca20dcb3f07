//! Event loop tying the host page to the scan pipeline.
//!
//! Single-task actor for control flow: mutation events, toggle commands,
//! the URL poll and pending rescan timers all land here. Scan passes
//! themselves run as spawned tasks, so a slow classify call never blocks
//! a toggle command. Overlapping passes are safe: the dedup ledger and the
//! annotation idempotence check make repeats no-ops.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use crate::config::ScanConfig;
use crate::identity::IdentityResolver;
use crate::infrastructure::ShutdownListener;
use crate::page::{HostPage, PageEvent};
use crate::pipeline::{annotate, resolve_page, resolver, Scanner, SessionState};
use crate::related::RelatedPostsController;

/// Control messages from the embedder (toggle switch, manual refresh).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Enable,
    Disable,
    Rescan,
}

#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    pub fn send(&self, command: Command) {
        // a closed channel means the loop already shut down
        let _ = self.tx.send(command);
    }

    pub fn enable(&self) {
        self.send(Command::Enable);
    }

    pub fn disable(&self) {
        self.send(Command::Disable);
    }

    pub fn rescan(&self) {
        self.send(Command::Rescan);
    }
}

pub struct ScanScheduler {
    page: Arc<dyn HostPage>,
    scanner: Arc<Scanner>,
    related: Arc<RelatedPostsController>,
    identity: Arc<dyn IdentityResolver>,
    session: Arc<SessionState>,
    config: ScanConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    enabled: bool,
}

impl ScanScheduler {
    pub fn new(
        page: Arc<dyn HostPage>,
        scanner: Arc<Scanner>,
        related: Arc<RelatedPostsController>,
        identity: Arc<dyn IdentityResolver>,
        session: Arc<SessionState>,
        config: ScanConfig,
    ) -> (Self, SchedulerHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let scheduler = Self {
            page,
            scanner,
            related,
            identity,
            session,
            config,
            commands,
            enabled: true,
        };
        (scheduler, SchedulerHandle { tx })
    }

    pub async fn run(mut self, mut shutdown: ShutdownListener) {
        let mut events = self.page.subscribe_events();
        let mut poll = tokio::time::interval(self.config.url_poll_interval);
        let mut last_url = self.page.current_url();
        // let the page hydrate before the first pass
        let mut rescan_at = Some(Instant::now() + self.config.initial_scan_delay);

        tracing::info!(target: "scheduler", url = %last_url, "scan scheduler attached");

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!(target: "scheduler", "shutting down");
                    break;
                }
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command, &mut rescan_at);
                }
                event = events.recv() => match event {
                    Ok(PageEvent::Mutation) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        // lag just means a mutation burst; one pass covers it
                        if self.enabled {
                            self.spawn_pipeline();
                        }
                    }
                    Ok(PageEvent::PanelHover) => {
                        if self.enabled {
                            self.page.render_related_panel(&self.related.panel_view());
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::warn!(target: "scheduler", "page event channel closed");
                        break;
                    }
                },
                _ = poll.tick() => {
                    let url = self.page.current_url();
                    if url != last_url {
                        tracing::debug!(target: "scheduler", from = %last_url, to = %url, "navigation detected");
                        last_url = url.clone();
                        self.identity.invalidate();
                        self.related.invalidate(&*self.page);
                        if self.enabled {
                            rescan_at = Some(Instant::now() + self.rescan_delay(&url));
                        }
                    }
                }
                _ = tokio::time::sleep_until(rescan_at.unwrap_or_else(Instant::now)),
                        if rescan_at.is_some() => {
                    rescan_at = None;
                    if self.enabled {
                        self.spawn_pipeline();
                    }
                }
            }
        }
    }

    /// Opened posts render their content later than feed tiles do.
    fn rescan_delay(&self, url: &str) -> std::time::Duration {
        if resolver::is_opened_post_url(url) {
            self.config.rescan_delay_opened
        } else {
            self.config.rescan_delay_feed
        }
    }

    fn handle_command(&mut self, command: Command, rescan_at: &mut Option<Instant>) {
        tracing::debug!(target: "scheduler", ?command, "command received");
        match command {
            Command::Disable => {
                self.enabled = false;
                // flip the gate first so in-flight passes stop writing
                // before the teardown below runs
                self.session.set_active(false);
                *rescan_at = None;
                self.session.reset();
                self.scanner.reset();
                annotate::clear_all(&*self.page);
                self.related.invalidate(&*self.page);
            }
            Command::Enable => {
                if !self.enabled {
                    self.enabled = true;
                    self.session.set_active(true);
                    self.session.reset();
                    self.scanner.reset();
                    self.spawn_pipeline();
                }
            }
            Command::Rescan => {
                if self.enabled {
                    self.spawn_pipeline();
                }
            }
        }
    }

    /// One scan pass as a detached task, keeping this loop free to handle
    /// commands and events while classify/recommend calls are in flight.
    fn spawn_pipeline(&self) {
        let page = self.page.clone();
        let scanner = self.scanner.clone();
        let related = self.related.clone();
        let session = self.session.clone();
        tokio::spawn(async move {
            scanner.scan().await;
            if !session.is_active() {
                return;
            }
            let state = resolve_page(&*page);
            related.refresh(&*page, &state).await;
        });
    }
}

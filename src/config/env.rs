use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub host: HostSiteConfig,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
}

/// The bias classification/recommendation service.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    /// Per-request cap; a hung service degrades to an unlabeled post
    /// instead of a stuck scan pass.
    pub request_timeout: Duration,
}

/// The host site consumed read-only: public content endpoint and the
/// best-effort identity endpoint.
#[derive(Debug, Clone)]
pub struct HostSiteConfig {
    pub base_url: String,
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Wait after attach before the first scan, letting the page hydrate.
    pub initial_scan_delay: Duration,
    /// SPA navigations fire no events; the URL is polled at this interval.
    pub url_poll_interval: Duration,
    /// Post-navigation rescan delay on opened-post pages (render is slower).
    pub rescan_delay_opened: Duration,
    /// Post-navigation rescan delay on feed pages.
    pub rescan_delay_feed: Duration,
    /// Tile cap for the very first feed scan; later scans are uncapped.
    pub first_scan_cap: usize,
    /// Posts with less combined text than this are not worth a classify call.
    pub min_text_len: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, a daily-rolling log file is written here too.
    pub logs_dir: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

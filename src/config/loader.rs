use std::{env, time::Duration};

use super::env::{
    AppConfig, BackendConfig, ConfigError, HostSiteConfig, LoggingConfig, ScanConfig,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    // a missing .env file is fine; the process environment still applies
    dotenvy::dotenv().ok();
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = BackendConfig {
            base_url: env::var("BIAS_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            request_timeout: duration_ms("BIAS_API_TIMEOUT_MS", 15_000)?,
        };

        let host = HostSiteConfig {
            base_url: env::var("HOST_SITE_URL")
                .unwrap_or_else(|_| "https://www.reddit.com".to_string()),
            fetch_timeout: duration_ms("CONTENT_FETCH_TIMEOUT_MS", 10_000)?,
        };

        let scan = ScanConfig {
            initial_scan_delay: duration_ms("INITIAL_SCAN_DELAY_MS", 1_000)?,
            url_poll_interval: duration_ms("URL_POLL_INTERVAL_MS", 400)?,
            rescan_delay_opened: duration_ms("RESCAN_DELAY_OPENED_MS", 1_500)?,
            rescan_delay_feed: duration_ms("RESCAN_DELAY_FEED_MS", 800)?,
            first_scan_cap: parse_usize("FIRST_SCAN_CAP", 15)?,
            min_text_len: parse_usize("MIN_POST_TEXT_LEN", 20)?,
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            logs_dir: env::var("LOGS_DIR").ok().filter(|v| !v.is_empty()),
        };

        Ok(Self {
            backend,
            host,
            scan,
            logging,
        })
    }
}

fn duration_ms(key: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let millis = match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid { key, value })?,
        Err(_) => default_ms,
    };
    Ok(Duration::from_millis(millis))
}

fn parse_usize(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

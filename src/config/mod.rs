pub mod env;
mod loader;

pub use env::{AppConfig, BackendConfig, ConfigError, HostSiteConfig, LoggingConfig, ScanConfig};
pub use loader::load_config;

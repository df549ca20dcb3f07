//! Best-effort identity of the browsing user, reported to the
//! recommendation service so exposure history accumulates per user.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;

use crate::config::HostSiteConfig;

/// Sentinel reported when the user is logged out or the identity
/// endpoint is unreachable.
pub const ANONYMOUS_USER: &str = "anonymous";

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Username of the browsing user, or `None` when unavailable.
    async fn username(&self) -> Option<String>;

    /// Drops any cached identity. Called on navigation.
    fn invalidate(&self) {}
}

/// Resolves the username from the host site's `/api/me.json` endpoint and
/// caches it until the next navigation.
pub struct HostIdentityClient {
    http: Client,
    config: HostSiteConfig,
    cached: Mutex<Option<String>>,
}

impl HostIdentityClient {
    pub fn new(http: Client, config: HostSiteConfig) -> Self {
        Self {
            http,
            config,
            cached: Mutex::new(None),
        }
    }
}

#[derive(Deserialize)]
struct MeResponse {
    data: Option<MeData>,
}

#[derive(Deserialize)]
struct MeData {
    name: Option<String>,
}

#[async_trait]
impl IdentityResolver for HostIdentityClient {
    async fn username(&self) -> Option<String> {
        if let Some(name) = self.cached.lock().clone() {
            return Some(name);
        }

        let url = format!(
            "{}/api/me.json",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .get(&url)
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }

        let me: MeResponse = response.json().await.ok()?;
        let name = me.data.and_then(|d| d.name).filter(|n| !n.is_empty())?;
        *self.cached.lock() = Some(name.clone());
        Some(name)
    }

    fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn me_response_tolerates_missing_fields() {
        let logged_out: MeResponse = serde_json::from_str(r#"{}"#).expect("valid json");
        assert!(logged_out.data.and_then(|d| d.name).is_none());

        let logged_in: MeResponse =
            serde_json::from_str(r#"{"data":{"name":"some_user"}}"#).expect("valid json");
        assert_eq!(logged_in.data.and_then(|d| d.name).as_deref(), Some("some_user"));
    }
}

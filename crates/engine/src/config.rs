//! Engine configuration.

use std::time::Duration;

use reqwest::Client;

use crate::error::DownloadError;
use crate::retry::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Tunables for the download engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub connect_timeout: Duration,
    /// Per-chunk inactivity timeout; transfers themselves are unbounded.
    pub read_timeout: Duration,
    pub user_agent: String,
    pub write_buffer_size: usize,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            write_buffer_size: 64 * 1024,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Build the transfer client. Media URLs may redirect to CDN nodes, so
    /// this client follows redirects.
    pub fn create_client(&self) -> Result<Client, DownloadError> {
        Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .build()
            .map_err(DownloadError::from)
    }
}

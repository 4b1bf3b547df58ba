//! Configuration types for the streaming client

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, timeouts};

/// Where and how to open streaming chat requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamClientConfig {
    /// Base URL of the chat service (e.g., "https://api.example.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the streaming endpoint
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Fail a session after this many seconds without data (None = wait forever)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    defaults::BASE_URL.to_string()
}

fn default_stream_path() -> String {
    defaults::STREAM_PATH.to_string()
}

fn default_connect_timeout() -> u64 {
    timeouts::CONNECT_SECS
}

fn default_idle_timeout() -> Option<u64> {
    Some(timeouts::IDLE_SECS)
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_path: default_stream_path(),
            api_token: None,
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl StreamClientConfig {
    /// Full URL of the streaming endpoint
    pub fn stream_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.stream_path.trim_start_matches('/')
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

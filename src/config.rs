//! Configuration types for the RusGuard SOAP client.

use serde::{Deserialize, Serialize};

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Hostname (or host:port) of the RusGuard server.
    pub host: String,

    /// Service account username.
    pub username: String,

    /// Service account password.
    pub password: String,

    /// Per-call timeout for ordinary requests, in seconds.
    pub request_timeout_secs: u64,

    /// Timeout for the long-poll notification call, in seconds. The server
    /// holds the request open until a notification arrives, so this is
    /// materially longer than the ordinary timeout.
    pub long_poll_timeout_secs: u64,

    /// Skip TLS certificate verification. Deployments commonly run the
    /// service with a self-signed certificate.
    pub accept_invalid_certs: bool,

    /// Delay between event-poll iterations in the monitor binary, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            username: String::new(),
            password: String::new(),
            request_timeout_secs: 15,
            long_poll_timeout_secs: 90,
            accept_invalid_certs: true,
            poll_interval_secs: 1,
        }
    }
}

impl ClientConfig {
    /// Full URL of the LNetworkService endpoint.
    pub fn service_url(&self) -> String {
        format!("https://{}/LNetworkServer/LNetworkService.svc", self.host)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn long_poll_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.long_poll_timeout_secs)
    }
}

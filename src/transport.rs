//! HTTP transport collaborator.
//!
//! The session layer only needs "POST this envelope under this SOAPAction
//! and give me status plus body text"; retry and TLS policy live behind the
//! [`Transport`] trait. [`HttpTransport`] is the reqwest-backed production
//! implementation; tests substitute scripted transports.

use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Raw HTTP reply, before any protocol-level decoding.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Dispatches a serialized SOAP envelope and returns the raw reply.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        action: &str,
        body: String,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError>;
}

/// reqwest-backed transport for the LNetworkService endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: config.service_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        action: &str,
        body: String,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        debug!(action, url = %self.url, "dispatching SOAP request");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("Soapaction", format!("\"{action}\""))
            .header("Accept-Encoding", "gzip, deflate")
            .timeout(timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(HttpReply { status, body })
    }
}

/// Byte-retrieval/byte-store capability for decoded employee photos. The
/// on-disk cache (and its freshness policy) is an external collaborator
/// implementing this trait.
pub trait PhotoStore: Send + Sync {
    fn load(&self, employee_id: &str) -> std::io::Result<Option<Vec<u8>>>;
    fn store(&self, employee_id: &str, bytes: &[u8]) -> std::io::Result<()>;
}

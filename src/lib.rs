//! SOAP/WS-Security client for the RusGuard LNetworkService endpoint.
//!
//! Builds authenticated XML requests, dispatches them over HTTP, and decodes
//! the vendor's namespaced XML responses into typed records.
//!
//! # Features
//!
//! - Declarative schema-driven request-body encoding (nested mappings with a
//!   reserved `_attributes` key)
//! - WS-Security envelope construction (timestamp window, username token,
//!   sequence-embedded token ids)
//! - Namespace-agnostic response decoding onto fixed-field records, plus
//!   SOAP fault decoding
//! - Session protocol: Connect/Disconnect handshake, monotonic request
//!   sequencing, long-poll notification retrieval
//!
//! # Example
//!
//! ```ignore
//! use rusguard_client::{ClientConfig, HttpTransport, SoapSession};
//!
//! let config = ClientConfig { host: "acs.example.org".into(), ..Default::default() };
//! let transport = HttpTransport::new(&config)?;
//! let session = SoapSession::new(config, transport);
//!
//! session.connect().await?;
//! let events = session.get_events(None).await?;
//! session.disconnect().await?;
//! ```

pub mod config;
pub mod decoder;
pub mod envelope;
pub mod error;
pub mod models;
pub mod schema;
pub mod session;
pub mod templates;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ClientError, TransportError};
pub use session::SoapSession;
pub use transport::{HttpTransport, PhotoStore, Transport};

//! Session protocol: handshake, request sequencing, dispatch, typed calls.
//!
//! A session owns the client id (generated once), the token issued by
//! Connect, and the per-session monotonic sequence counter. Every outbound
//! request embeds `uuid-{client-id}-{sequence}` as its security token id;
//! the counter is advanced with a fetch-add so no two in-flight requests
//! ever carry the same id, and it advances exactly once per dispatched
//! request whether the call succeeds or not.

use crate::config::ClientConfig;
use crate::decoder::{
    decode_all_nets, decode_drivers, decode_events, decode_last_event, decode_net_servers,
    decode_notifications, decode_photo, decode_variable, ResponseDocument,
};
use crate::envelope::EnvelopeBuilder;
use crate::error::{ClientError, TransportError};
use crate::models::{
    DriverFullInfo, EmployeePassageNotification, LogMessage, NetInfo, ServerInfo,
};
use crate::schema::encode_body;
use crate::templates::{self, actions, VENDOR_NS};
use crate::transport::{PhotoStore, Transport};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Sequence value carried by the Connect handshake.
const CONNECT_SEQUENCE: u64 = 1;

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
}

/// A client session against the LNetworkService endpoint.
///
/// Safe to share across tasks: the long-poll notification call and the
/// periodic event poll may run concurrently against one session, coordinated
/// only through the shared sequence counter.
pub struct SoapSession<T: Transport> {
    config: ClientConfig,
    transport: T,
    client_id: String,
    sequence: AtomicU64,
    state: RwLock<SessionState>,
    photo_store: Option<Box<dyn PhotoStore>>,
}

impl<T: Transport> SoapSession<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            client_id: Uuid::new_v4().to_string(),
            sequence: AtomicU64::new(0),
            state: RwLock::new(SessionState::default()),
            photo_store: None,
        }
    }

    /// Attach a photo store consulted before (and updated after) photo
    /// retrieval calls.
    pub fn with_photo_store(mut self, store: Box<dyn PhotoStore>) -> Self {
        self.photo_store = Some(store);
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current value of the request sequence counter.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.token.is_some()
    }

    /// Session token issued by Connect.
    pub async fn session_token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    // --- lifecycle ---

    /// Perform the Connect handshake and store the issued session token.
    ///
    /// On a decode failure the session stays disconnected and the counter is
    /// left untouched; there is no automatic retry.
    pub async fn connect(&self) -> Result<(), ClientError> {
        // Write lock held across the handshake: at most one Connect in
        // flight, and data operations cannot slip in before it completes.
        let mut state = self.state.write().await;
        if state.token.is_some() {
            return Err(ClientError::Session("already connected".to_string()));
        }

        info!(url = %self.config.service_url(), "connecting");
        let payload = self
            .security_envelope(CONNECT_SEQUENCE)
            .method("Connect", &[("xmlns", VENDOR_NS)], Vec::new())?;
        let text = self
            .dispatch(actions::CONNECT, payload, self.config.request_timeout(), false)
            .await?;

        let doc = ResponseDocument::parse(&text)?;
        let token = doc.connect_token()?;
        info!(session = %token, "connected");

        self.sequence.store(CONNECT_SEQUENCE, Ordering::SeqCst);
        state.token = Some(token);
        Ok(())
    }

    /// Close the session. Valid only when connected; the token is discarded
    /// on success and no further operations are valid until a new Connect.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let mut state = self.state.write().await;
        if state.token.is_none() {
            return Err(ClientError::NotConnected);
        }

        let sequence = self.next_sequence();
        let payload = self
            .security_envelope(sequence)
            .method("Disconnect", &[("xmlns", VENDOR_NS)], Vec::new())?;
        self.dispatch(
            actions::DISCONNECT,
            payload,
            self.config.request_timeout(),
            false,
        )
        .await?;

        state.token = None;
        info!("disconnected");
        Ok(())
    }

    // --- data operations ---

    /// Fetch a named server variable as a `(name, value)` pair.
    pub async fn get_variable(&self, name: &str) -> Result<(String, String), ClientError> {
        self.require_token().await?;
        let doc = self
            .call(actions::GET_VARIABLE, &templates::get_variable(name), false)
            .await?;
        decode_variable(&doc)
    }

    /// Server version, via `GetVariable("Version")`.
    pub async fn get_version(&self) -> Result<String, ClientError> {
        let (_, value) = self.get_variable("Version").await?;
        info!(version = %value, "server version");
        Ok(value)
    }

    /// Fetch the most recent log message.
    pub async fn get_last_event(&self) -> Result<LogMessage, ClientError> {
        self.require_token().await?;
        let doc = self
            .call(actions::GET_LAST_EVENT, &templates::get_last_event(), false)
            .await?;
        let event = decode_last_event(&doc)?;
        debug!(id = ?event.id, "last event");
        Ok(event)
    }

    /// Fetch log messages from the given cursor onward. With no cursor, the
    /// current last-event id is fetched first; callers do not coordinate the
    /// two requests themselves.
    pub async fn get_events(
        &self,
        from_message_id: Option<i64>,
    ) -> Result<Vec<LogMessage>, ClientError> {
        self.require_token().await?;
        let cursor = match from_message_id {
            Some(id) => id,
            None => self.get_last_event().await?.id.unwrap_or(0),
        };

        let doc = self
            .call(actions::GET_EVENTS, &templates::get_events(cursor), false)
            .await?;
        decode_events(&doc, "GetEvents")
    }

    /// Fetch log messages of one subtype within a datetime range.
    pub async fn get_filtered_events(
        &self,
        sub_type: &str,
        from_date_time: &str,
        to_date_time: &str,
    ) -> Result<Vec<LogMessage>, ClientError> {
        self.require_token().await?;
        let doc = self
            .call(
                actions::GET_FILTERED_EVENTS,
                &templates::get_filtered_events(sub_type, from_date_time, to_date_time),
                false,
            )
            .await?;
        decode_events(&doc, "GetFilteredEvents")
    }

    /// Long-poll for passage notifications. Blocks until the server has
    /// something to deliver or the extended timeout elapses; the timeout
    /// surfaces as [`ClientError::LongPollTimeout`] and is meant to be
    /// looped on.
    pub async fn get_notification(
        &self,
    ) -> Result<Vec<EmployeePassageNotification>, ClientError> {
        let token = self.require_token().await?;
        let doc = self
            .call(
                actions::GET_NOTIFICATION,
                &templates::get_notification(&token),
                true,
            )
            .await?;
        decode_notifications(&doc)
    }

    /// Fetch an employee photo as raw bytes; `None` when the server has no
    /// photo on file. A configured [`PhotoStore`] is consulted first and
    /// updated with fetched bytes; store failures are logged, never fatal.
    pub async fn get_employee_photo(
        &self,
        employee_id: &str,
        photo_number: u32,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        self.require_token().await?;

        if let Some(store) = &self.photo_store {
            match store.load(employee_id) {
                Ok(Some(bytes)) => {
                    debug!(employee_id, "photo served from store");
                    return Ok(Some(bytes));
                }
                Ok(None) => {}
                Err(e) => warn!(employee_id, error = %e, "photo store read failed"),
            }
        }

        let doc = self
            .call(
                actions::GET_EMPLOYEE_PHOTO,
                &templates::get_employee_photo(employee_id, photo_number),
                false,
            )
            .await?;
        let photo = decode_photo(&doc)?;

        if let (Some(store), Some(bytes)) = (&self.photo_store, &photo) {
            if let Err(e) = store.store(employee_id, bytes) {
                warn!(employee_id, error = %e, "photo store write failed");
            }
        }
        Ok(photo)
    }

    /// Fetch the root descriptor of the server network tree.
    pub async fn get_all_nets(&self) -> Result<NetInfo, ClientError> {
        self.require_token().await?;
        let doc = self
            .call(actions::GET_ALL_NETS, &templates::get_all_nets(), false)
            .await?;
        decode_all_nets(&doc)
    }

    /// List servers under a net. With no id, the root net is looked up first.
    pub async fn get_net_servers(
        &self,
        id: Option<&str>,
    ) -> Result<Vec<ServerInfo>, ClientError> {
        self.require_token().await?;
        let net_id = match id {
            Some(id) => id.to_string(),
            None => self.get_all_nets().await?.id.ok_or_else(|| {
                ClientError::MissingElement("GetAllNetsResult/Id".to_string())
            })?,
        };

        let doc = self
            .call(
                actions::GET_NET_SERVERS,
                &templates::get_net_servers(&net_id),
                false,
            )
            .await?;
        decode_net_servers(&doc)
    }

    /// Full driver state for one server, property and state maps included.
    pub async fn get_server_drivers_full_info(
        &self,
        server_id: &str,
    ) -> Result<Vec<DriverFullInfo>, ClientError> {
        self.require_token().await?;
        let doc = self
            .call(
                actions::GET_SERVER_DRIVERS_FULL_INFO,
                &templates::get_server_drivers_full_info(server_id),
                false,
            )
            .await?;
        decode_drivers(&doc)
    }

    // --- plumbing ---

    fn token_id(&self, sequence: u64) -> String {
        format!("uuid-{}-{}", self.client_id, sequence)
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn security_envelope(&self, sequence: u64) -> EnvelopeBuilder {
        EnvelopeBuilder::new()
            .timestamp("_0")
            .username_token(
                &self.config.username,
                &self.config.password,
                &self.token_id(sequence),
            )
    }

    /// Encode a templated body, wrap it, dispatch it, and parse the reply.
    /// Advances the sequence counter exactly once.
    async fn call(
        &self,
        action: &str,
        schema: &Value,
        long_poll: bool,
    ) -> Result<ResponseDocument, ClientError> {
        let sequence = self.next_sequence();
        let body = encode_body(schema)?;
        let payload = self.security_envelope(sequence).simple(body)?;
        let timeout = if long_poll {
            self.config.long_poll_timeout()
        } else {
            self.config.request_timeout()
        };

        let text = self.dispatch(action, payload, timeout, long_poll).await?;
        ResponseDocument::parse(&text)
    }

    /// Send one request. HTTP 500 is decoded into a SOAP fault; any other
    /// status is handed to the caller's decoder as-is.
    async fn dispatch(
        &self,
        action: &str,
        payload: String,
        timeout: Duration,
        long_poll: bool,
    ) -> Result<String, ClientError> {
        debug!(action, "dispatching");
        let reply = self
            .transport
            .post(action, payload, timeout)
            .await
            .map_err(|e| match e {
                TransportError::Timeout if long_poll => ClientError::LongPollTimeout,
                TransportError::Timeout => {
                    ClientError::Transport("request timed out".to_string())
                }
                TransportError::Connection(message) => ClientError::Transport(message),
            })?;

        if reply.status == 500 {
            let doc = ResponseDocument::parse(&reply.body)?;
            let fault = doc.fault()?;
            warn!(
                faultcode = %fault.faultcode,
                faultstring = %fault.faultstring,
                "server returned SOAP fault"
            );
            return Err(ClientError::Fault {
                faultcode: fault.faultcode,
                faultstring: fault.faultstring,
            });
        }
        Ok(reply.body)
    }

    async fn require_token(&self) -> Result<String, ClientError> {
        self.state
            .read()
            .await
            .token
            .clone()
            .ok_or(ClientError::NotConnected)
    }
}

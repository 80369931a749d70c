//! Error types for the RusGuard SOAP client.

use thiserror::Error;

/// Client-facing errors.
///
/// The variants follow the protocol's failure taxonomy: transport failures
/// are fatal for the current operation, a decoded SOAP Fault is recoverable
/// by the caller, and a long-poll timeout is an expected signal that the
/// polling loop should simply retry.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection to the service could not be established or broke mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered HTTP 500 with a decodable SOAP Fault.
    #[error("SOAP fault {faultcode}: {faultstring}")]
    Fault {
        faultcode: String,
        faultstring: String,
    },

    /// Connect completed at the transport level but the response carried no
    /// session token. The session stays disconnected.
    #[error("session token missing from Connect response")]
    AuthDecode,

    /// The long-poll notification call elapsed without new data. Expected;
    /// callers retry.
    #[error("long-poll timed out with no new data")]
    LongPollTimeout,

    /// The response body could not be parsed as XML at all.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The response parsed but an element the decode path requires is absent.
    /// Distinct from a parse failure so callers can branch on it.
    #[error("expected element missing: {0}")]
    MissingElement(String),

    /// A data operation was issued without a connected session.
    #[error("session is not connected")]
    NotConnected,

    /// Session lifecycle misuse (e.g. Connect while already connected).
    #[error("session error: {0}")]
    Session(String),

    /// A request-body schema mapping violated the encoder contract.
    #[error("invalid request schema: {0}")]
    InvalidSchema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced by the transport collaborator.
///
/// Timeout is kept apart from connection failure so the session layer can
/// translate a timed-out long-poll into [`ClientError::LongPollTimeout`]
/// instead of a transport error.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display() {
        let err = ClientError::Fault {
            faultcode: "s:Server".to_string(),
            faultstring: "Bad request".to_string(),
        };
        assert_eq!(err.to_string(), "SOAP fault s:Server: Bad request");
    }

    #[test]
    fn test_long_poll_timeout_is_not_transport() {
        let err = ClientError::LongPollTimeout;
        assert!(!matches!(err, ClientError::Transport(_)));
    }
}

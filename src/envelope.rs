//! SOAP 1.1 envelope construction with WS-Security headers.
//!
//! Every request rides the same frame: an `s:Envelope` whose Header carries
//! an `o:Security` block (Timestamp validity window plus a plaintext-profile
//! UsernameToken) and whose Body carries the method element. The token id is
//! the caller's concern; the session layer embeds its per-request sequence
//! there.

use crate::error::ClientError;
use crate::schema::XmlElement;
use chrono::{DateTime, Duration, Utc};

/// SOAP/WS-Security namespace URIs.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
/// UsernameToken plaintext password profile marker.
pub const PASSWORD_TEXT_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

/// How long a request's Timestamp stays valid.
const TIMESTAMP_VALIDITY_MINUTES: i64 = 5;

/// Builder for a WS-Security SOAP envelope.
///
/// Security content is appended with [`timestamp`](Self::timestamp) and
/// [`username_token`](Self::username_token); one of the finalizers
/// ([`method`](Self::method) or [`simple`](Self::simple)) then attaches
/// Header and Body and serializes the document.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    security: XmlElement,
}

impl Default for EnvelopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeBuilder {
    pub fn new() -> Self {
        let mut security = XmlElement::new("o:Security");
        security.set_attribute("xmlns:o", WSSE_NS);
        security.set_attribute("s:mustUnderstand", "1");
        Self { security }
    }

    /// Append a Timestamp block for the current time with a fixed
    /// five-minute validity window, replacing any prior Timestamp.
    pub fn timestamp(self, id: &str) -> Self {
        self.timestamp_at(id, Utc::now())
    }

    /// Timestamp with an explicit creation instant. Exposed for tests.
    pub fn timestamp_at(mut self, id: &str, created: DateTime<Utc>) -> Self {
        self.security
            .children
            .retain(|child| child.name != "u:Timestamp");

        let expires = created + Duration::minutes(TIMESTAMP_VALIDITY_MINUTES);

        let mut stamp = XmlElement::new("u:Timestamp");
        stamp.set_attribute("u:Id", id);
        stamp.push(XmlElement::with_text("u:Created", format_instant(created)));
        stamp.push(XmlElement::with_text("u:Expires", format_instant(expires)));

        self.security.push(stamp);
        self
    }

    /// Append a UsernameToken carrying plaintext-profile credentials and the
    /// supplied token id.
    pub fn username_token(mut self, username: &str, password: &str, id: &str) -> Self {
        let mut token = XmlElement::new("o:UsernameToken");
        token.set_attribute("u:Id", id);

        token.push(XmlElement::with_text("o:Username", username));

        let mut password_element = XmlElement::with_text("o:Password", password);
        password_element.set_attribute("Type", PASSWORD_TEXT_TYPE);
        token.push(password_element);

        self.security.push(token);
        self
    }

    /// Finalize with a body element named `name`, carrying `attributes` and
    /// optional pre-built child nodes. Used for parameterless or hand-built
    /// calls like Connect and Disconnect.
    pub fn method(
        self,
        name: &str,
        attributes: &[(&str, &str)],
        children: Vec<XmlElement>,
    ) -> Result<String, ClientError> {
        let mut body_child = XmlElement::new(name);
        for (attr_name, attr_value) in attributes {
            body_child.set_attribute(*attr_name, *attr_value);
        }
        for child in children {
            body_child.push(child);
        }
        self.finalize(body_child)
    }

    /// Finalize with an already-built body element, typically produced by
    /// [`crate::schema::encode_body`].
    pub fn simple(self, body_child: XmlElement) -> Result<String, ClientError> {
        self.finalize(body_child)
    }

    fn finalize(self, body_child: XmlElement) -> Result<String, ClientError> {
        let mut envelope = XmlElement::new("s:Envelope");
        envelope.set_attribute("xmlns:s", SOAP_ENVELOPE_NS);
        envelope.set_attribute("xmlns:u", WSU_NS);

        let mut header = XmlElement::new("s:Header");
        header.push(self.security);
        envelope.push(header);

        let mut body = XmlElement::new("s:Body");
        body.push(body_child);
        envelope.push(body);

        envelope.to_document()
    }
}

/// Fractional-second UTC timestamp, e.g. `2026-08-30T12:00:00.000123Z`.
fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::ResponseDocument;
    use chrono::NaiveDateTime;

    fn build_connect(builder: EnvelopeBuilder) -> String {
        builder
            .method("Connect", &[("xmlns", "http://www.rusguardsecurity.ru")], Vec::new())
            .unwrap()
    }

    #[test]
    fn test_envelope_declares_namespaces() {
        let xml = build_connect(
            EnvelopeBuilder::new()
                .timestamp("_0")
                .username_token("user", "pass", "uuid-c1-1"),
        );
        let doc = ResponseDocument::parse(&xml).unwrap();
        assert_eq!(doc.namespace("s"), Some(SOAP_ENVELOPE_NS));
        assert_eq!(doc.namespace("u"), Some(WSU_NS));
        assert_eq!(doc.namespace("o"), Some(WSSE_NS));
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    }

    #[test]
    fn test_header_security_body_layout() {
        let xml = build_connect(
            EnvelopeBuilder::new()
                .timestamp("_0")
                .username_token("user", "pass", "uuid-c1-1"),
        );
        let doc = ResponseDocument::parse(&xml).unwrap();

        let security = doc.root.find(&["Header", "Security"]).unwrap();
        assert_eq!(security.attribute("s:mustUnderstand"), Some("1"));
        assert!(security.child("Timestamp").is_some());
        assert!(security.child("UsernameToken").is_some());

        let method = doc.root.find(&["Body", "Connect"]).unwrap();
        assert_eq!(method.attribute("xmlns"), Some("http://www.rusguardsecurity.ru"));
    }

    #[test]
    fn test_timestamp_window_is_five_minutes() {
        let created = NaiveDateTime::parse_from_str("2026-08-30T10:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap()
            .and_utc();
        let xml = build_connect(
            EnvelopeBuilder::new()
                .timestamp_at("_0", created)
                .username_token("user", "pass", "uuid-c1-1"),
        );
        let doc = ResponseDocument::parse(&xml).unwrap();
        let stamp = doc.root.find(&["Header", "Security", "Timestamp"]).unwrap();

        assert_eq!(
            stamp.child_text("Created").as_deref(),
            Some("2026-08-30T10:00:00.000000Z")
        );
        assert_eq!(
            stamp.child_text("Expires").as_deref(),
            Some("2026-08-30T10:05:00.000000Z")
        );
        assert_eq!(stamp.attribute("u:Id"), Some("_0"));
    }

    #[test]
    fn test_repeated_timestamp_replaces_prior_block() {
        let first = NaiveDateTime::parse_from_str("2026-08-30T10:00:00", "%Y-%m-%dT%H:%M:%S")
            .unwrap()
            .and_utc();
        let second = first + Duration::minutes(1);

        let xml = build_connect(
            EnvelopeBuilder::new()
                .timestamp_at("_0", first)
                .username_token("user", "pass", "uuid-c1-1")
                .timestamp_at("_0", second),
        );
        let doc = ResponseDocument::parse(&xml).unwrap();
        let security = doc.root.find(&["Header", "Security"]).unwrap();

        let stamps: Vec<_> = security.children_named("Timestamp").collect();
        assert_eq!(stamps.len(), 1);
        assert_eq!(
            stamps[0].child_text("Created").as_deref(),
            Some("2026-08-30T10:01:00.000000Z")
        );
    }

    #[test]
    fn test_username_token_plaintext_profile() {
        let xml = build_connect(
            EnvelopeBuilder::new()
                .timestamp("_0")
                .username_token("monitor", "hunter2", "uuid-client-42"),
        );
        let doc = ResponseDocument::parse(&xml).unwrap();
        let token = doc
            .root
            .find(&["Header", "Security", "UsernameToken"])
            .unwrap();

        assert_eq!(token.attribute("u:Id"), Some("uuid-client-42"));
        assert_eq!(token.child_text("Username").as_deref(), Some("monitor"));

        let password = token.child("Password").unwrap();
        assert_eq!(password.text.as_deref(), Some("hunter2"));
        assert_eq!(password.attribute("Type"), Some(PASSWORD_TEXT_TYPE));
    }

    #[test]
    fn test_simple_wraps_prebuilt_body() {
        let body = XmlElement::with_text("GetVariable", "");
        let xml = EnvelopeBuilder::new()
            .timestamp("_0")
            .username_token("u", "p", "uuid-c-1")
            .simple(body)
            .unwrap();
        let doc = ResponseDocument::parse(&xml).unwrap();
        assert!(doc.root.find(&["Body", "GetVariable"]).is_some());
    }
}

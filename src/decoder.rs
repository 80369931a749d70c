//! Namespace-aware decoding of SOAP response documents.
//!
//! Responses declare their namespace prefixes per document, so the parser
//! harvests prefix→URI bindings while building the element tree and resolves
//! each element's namespace from the bindings in scope. Decode paths then
//! navigate by local name only; no namespace literal is hard-coded outside
//! the envelope builder.
//!
//! Uses quick-xml, which is safe against XXE by default (doesn't expand
//! entities).

use crate::error::ClientError;
use crate::models::{
    DriverFullInfo, EmployeePassageNotification, LogMessage, NetInfo, ServerInfo, SoapFault,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};

/// A decoded XML element with its namespace resolved.
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Tag name with any prefix stripped.
    pub local_name: String,
    /// Namespace URI the element was declared under, if any.
    pub namespace: Option<String>,
    /// Attributes as written, namespace declarations included.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated text content directly inside this element.
    pub text: Option<String>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given local name, any namespace.
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name == local_name)
    }

    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.local_name == local_name)
    }

    /// Walk a path of local names starting below this element.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        let mut current = self;
        for segment in path {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Text content of a direct child, if the child exists and has any.
    pub fn child_text(&self, local_name: &str) -> Option<String> {
        self.child(local_name).and_then(|c| c.text.clone())
    }
}

/// Parse an XML fragment or document into an element tree.
pub fn parse_xml(xml: &str) -> Result<Element, ClientError> {
    parse_tree(xml).map(|(root, _)| root)
}

/// A parsed SOAP response with its harvested namespace bindings.
#[derive(Debug, Clone)]
pub struct ResponseDocument {
    pub root: Element,
    namespaces: HashMap<String, String>,
}

impl ResponseDocument {
    pub fn parse(xml: &str) -> Result<Self, ClientError> {
        let (root, namespaces) = parse_tree(xml)?;
        Ok(Self { root, namespaces })
    }

    /// URI bound to a prefix anywhere in the document. The default namespace
    /// is bound to the empty prefix.
    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    fn body(&self) -> Result<&Element, ClientError> {
        self.root
            .child("Body")
            .ok_or_else(|| ClientError::MissingElement("Body".to_string()))
    }

    /// Navigate `Body/{method}Response/{method}Result`.
    pub fn method_result(&self, method: &str) -> Result<&Element, ClientError> {
        let response = format!("{method}Response");
        let result = format!("{method}Result");
        self.body()?
            .child(&response)
            .and_then(|r| r.child(&result))
            .ok_or_else(|| ClientError::MissingElement(format!("Body/{response}/{result}")))
    }

    /// Flat tag→text mapping of the `Body/Fault` children.
    pub fn fault_fields(&self) -> Result<BTreeMap<String, String>, ClientError> {
        let fault = self
            .body()?
            .child("Fault")
            .ok_or_else(|| ClientError::MissingElement("Body/Fault".to_string()))?;
        Ok(fault
            .children
            .iter()
            .map(|c| (c.local_name.clone(), c.text.clone().unwrap_or_default()))
            .collect())
    }

    /// Decoded SOAP Fault.
    pub fn fault(&self) -> Result<SoapFault, ClientError> {
        let fields = self.fault_fields()?;
        Ok(SoapFault {
            faultcode: fields.get("faultcode").cloned().unwrap_or_default(),
            faultstring: fields.get("faultstring").cloned().unwrap_or_default(),
            fields,
        })
    }

    /// Session token from a Connect response.
    ///
    /// Absence of the result element is an authentication-decode failure,
    /// not a parse failure; the session layer uses the distinction to keep
    /// the state machine in Disconnected.
    pub fn connect_token(&self) -> Result<String, ClientError> {
        match self.method_result("Connect") {
            Ok(result) => result
                .text
                .clone()
                .filter(|token| !token.is_empty())
                .ok_or(ClientError::AuthDecode),
            Err(_) => Err(ClientError::AuthDecode),
        }
    }
}

fn parse_tree(xml: &str) -> Result<(Element, HashMap<String, String>), ClientError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut harvested: HashMap<String, String> = HashMap::new();
    let mut scopes: Vec<HashMap<String, String>> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let element = open_element(e, &mut scopes, &mut harvested)?;
                stack.push(element);
            }
            Ok(Event::Empty(ref e)) => {
                let element = open_element(e, &mut scopes, &mut harvested)?;
                scopes.pop();
                attach(element, &mut stack, &mut root);
            }
            Ok(Event::End(_)) => {
                scopes.pop();
                let element = stack.pop().ok_or_else(|| {
                    ClientError::MalformedResponse("unbalanced end tag".to_string())
                })?;
                attach(element, &mut stack, &mut root);
            }
            Ok(Event::Text(ref t)) => {
                if let Some(current) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
                    match &mut current.text {
                        Some(existing) => existing.push_str(&text),
                        None => current.text = Some(text.into_owned()),
                    }
                }
            }
            Ok(Event::CData(ref t)) => {
                if let Some(current) = stack.last_mut() {
                    let bytes: &[u8] = t;
                    let text = String::from_utf8_lossy(bytes).into_owned();
                    match &mut current.text {
                        Some(existing) => existing.push_str(&text),
                        None => current.text = Some(text),
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ClientError::MalformedResponse(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(ClientError::MalformedResponse(
            "document ended with open elements".to_string(),
        ));
    }
    let root =
        root.ok_or_else(|| ClientError::MalformedResponse("no root element".to_string()))?;
    Ok((root, harvested))
}

/// Read an element's attributes, record any namespace declarations, and
/// resolve its own namespace from the bindings in scope.
fn open_element(
    start: &BytesStart,
    scopes: &mut Vec<HashMap<String, String>>,
    harvested: &mut HashMap<String, String>,
) -> Result<Element, ClientError> {
    let mut bindings: HashMap<String, String> = HashMap::new();
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?
            .into_owned();

        if key == "xmlns" {
            harvested.insert(String::new(), value.clone());
            bindings.insert(String::new(), value.clone());
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            harvested.insert(prefix.to_string(), value.clone());
            bindings.insert(prefix.to_string(), value.clone());
        }
        attributes.push((key, value));
    }
    scopes.push(bindings);

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (prefix, local_name) = match name.split_once(':') {
        Some((prefix, local)) => (prefix.to_string(), local.to_string()),
        None => (String::new(), name),
    };
    let namespace = scopes
        .iter()
        .rev()
        .find_map(|scope| scope.get(&prefix))
        .cloned();

    Ok(Element {
        local_name,
        namespace,
        attributes,
        children: Vec::new(),
        text: None,
    })
}

fn attach(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

/// Decode a GetVariable response into its `(name, value)` pair.
pub fn decode_variable(doc: &ResponseDocument) -> Result<(String, String), ClientError> {
    let result = doc.method_result("GetVariable")?;
    let name = result
        .child_text("Name")
        .ok_or_else(|| ClientError::MissingElement("GetVariableResult/Name".to_string()))?;
    let value = result.child_text("Value").unwrap_or_default();
    Ok((name, value))
}

/// Decode a GetEvents or GetFilteredEvents response.
pub fn decode_events(doc: &ResponseDocument, method: &str) -> Result<Vec<LogMessage>, ClientError> {
    let result = doc.method_result(method)?;
    let Some(messages) = result.child("Messages") else {
        return Ok(Vec::new());
    };
    Ok(messages.children.iter().map(LogMessage::from_element).collect())
}

/// Decode a GetLastEvent response into the single trailing log message.
pub fn decode_last_event(doc: &ResponseDocument) -> Result<LogMessage, ClientError> {
    let result = doc.method_result("GetLastEvent")?;
    let message = result.find(&["Messages", "LogMessage"]).ok_or_else(|| {
        ClientError::MissingElement("GetLastEventResult/Messages/LogMessage".to_string())
    })?;
    Ok(LogMessage::from_element(message))
}

/// Decode a GetNotification response. An empty notification list is a normal
/// outcome of the long-poll contract.
pub fn decode_notifications(
    doc: &ResponseDocument,
) -> Result<Vec<EmployeePassageNotification>, ClientError> {
    let result = doc.method_result("GetNotification")?;
    let Some(list) = result.child("EmployeePassageNotifications") else {
        return Ok(Vec::new());
    };
    Ok(list
        .children_named("EmployeePassageNotification")
        .map(EmployeePassageNotification::from_element)
        .collect())
}

/// Decode a GetAcsEmployeePhoto response into raw image bytes. `None` means
/// the server has no photo on file.
pub fn decode_photo(doc: &ResponseDocument) -> Result<Option<Vec<u8>>, ClientError> {
    let result = doc.method_result("GetAcsEmployeePhoto")?;
    match result.text.as_deref() {
        Some(encoded) if !encoded.is_empty() => STANDARD
            .decode(encoded.trim())
            .map(Some)
            .map_err(|e| ClientError::MalformedResponse(format!("photo is not valid base64: {e}"))),
        _ => Ok(None),
    }
}

/// Decode a GetAllNets response into the root net descriptor.
pub fn decode_all_nets(doc: &ResponseDocument) -> Result<NetInfo, ClientError> {
    let result = doc.method_result("GetAllNets")?;
    Ok(NetInfo::from_element(result))
}

/// Decode a GetNetServers response.
pub fn decode_net_servers(doc: &ResponseDocument) -> Result<Vec<ServerInfo>, ClientError> {
    let result = doc.method_result("GetNetServers")?;
    Ok(result
        .children_named("ServerInfo")
        .map(ServerInfo::from_element)
        .collect())
}

/// Decode a GetServerDriversFullInfo response.
pub fn decode_drivers(doc: &ResponseDocument) -> Result<Vec<DriverFullInfo>, ClientError> {
    let result = doc.method_result("GetServerDriversFullInfo")?;
    Ok(result
        .children_named("DriverFullInfo")
        .map(DriverFullInfo::from_element)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAULT_RESPONSE: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <s:Fault>
      <faultcode>Server</faultcode>
      <faultstring>Bad request</faultstring>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

    const CONNECT_RESPONSE: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <ConnectResponse xmlns="http://www.rusguardsecurity.ru">
      <ConnectResult>abc-123</ConnectResult>
    </ConnectResponse>
  </s:Body>
</s:Envelope>"#;

    const EVENTS_RESPONSE: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <GetEventsResponse xmlns="http://www.rusguardsecurity.ru">
      <GetEventsResult xmlns:a="http://schemas.datacontract.org/2004/07/VVIInvestment.RusGuard.DAL.Entities.Entity.Log">
        <a:Messages>
          <a:LogMessage>
            <a:Id>101</a:Id>
            <a:Message>Entry</a:Message>
            <a:Details>Main gate</a:Details>
            <a:UnknownVendorTag>ignored</a:UnknownVendorTag>
          </a:LogMessage>
          <a:LogMessage>
            <a:Id>102</a:Id>
            <a:Message>Exit</a:Message>
          </a:LogMessage>
        </a:Messages>
      </GetEventsResult>
    </GetEventsResponse>
  </s:Body>
</s:Envelope>"#;

    const DRIVERS_RESPONSE: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <GetServerDriversFullInfoResponse xmlns="http://www.rusguardsecurity.ru">
      <GetServerDriversFullInfoResult xmlns:a="http://schemas.datacontract.org/2004/07/VVIInvestment.RusGuard.LServer">
        <a:DriverFullInfo>
          <a:Id>drv-1</a:Id>
          <a:Name>Controller A</a:Name>
          <a:Properties>
            <a:DriverProperty>
              <a:PropertyName>Mode</a:PropertyName>
              <a:Value>Auto</a:Value>
            </a:DriverProperty>
            <a:DriverProperty>
              <a:PropertyName>State</a:PropertyName>
              <a:Value>On</a:Value>
            </a:DriverProperty>
          </a:Properties>
          <a:States>
            <a:DriverState>
              <a:PropertyName>Door</a:PropertyName>
              <a:Value>Closed</a:Value>
            </a:DriverState>
          </a:States>
        </a:DriverFullInfo>
      </GetServerDriversFullInfoResult>
    </GetServerDriversFullInfoResponse>
  </s:Body>
</s:Envelope>"#;

    #[test]
    fn test_namespaces_harvested_from_document() {
        let doc = ResponseDocument::parse(EVENTS_RESPONSE).unwrap();
        assert_eq!(
            doc.namespace("s"),
            Some("http://schemas.xmlsoap.org/soap/envelope/")
        );
        assert_eq!(
            doc.namespace("a"),
            Some("http://schemas.datacontract.org/2004/07/VVIInvestment.RusGuard.DAL.Entities.Entity.Log")
        );
        assert_eq!(doc.namespace(""), Some("http://www.rusguardsecurity.ru"));
        assert_eq!(doc.namespace("zz"), None);
    }

    #[test]
    fn test_element_namespace_resolution() {
        let doc = ResponseDocument::parse(CONNECT_RESPONSE).unwrap();
        assert_eq!(
            doc.root.namespace.as_deref(),
            Some("http://schemas.xmlsoap.org/soap/envelope/")
        );
        let response = doc.root.find(&["Body", "ConnectResponse"]).unwrap();
        assert_eq!(
            response.namespace.as_deref(),
            Some("http://www.rusguardsecurity.ru")
        );
    }

    #[test]
    fn test_fault_fields() {
        let doc = ResponseDocument::parse(FAULT_RESPONSE).unwrap();
        let fields = doc.fault_fields().unwrap();
        assert_eq!(fields.get("faultcode").map(String::as_str), Some("Server"));
        assert_eq!(
            fields.get("faultstring").map(String::as_str),
            Some("Bad request")
        );

        let fault = doc.fault().unwrap();
        assert_eq!(fault.faultcode, "Server");
        assert_eq!(fault.faultstring, "Bad request");
    }

    #[test]
    fn test_connect_token() {
        let doc = ResponseDocument::parse(CONNECT_RESPONSE).unwrap();
        assert_eq!(doc.connect_token().unwrap(), "abc-123");
    }

    #[test]
    fn test_connect_token_missing_is_auth_decode() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <SomethingElse/>
  </s:Body>
</s:Envelope>"#;
        let doc = ResponseDocument::parse(xml).unwrap();
        assert!(matches!(doc.connect_token(), Err(ClientError::AuthDecode)));
    }

    #[test]
    fn test_malformed_xml_is_parse_failure_not_auth_decode() {
        let result = ResponseDocument::parse("<this is not xml>><<");
        assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
    }

    #[test]
    fn test_decode_events_permissive() {
        let doc = ResponseDocument::parse(EVENTS_RESPONSE).unwrap();
        let events = decode_events(&doc, "GetEvents").unwrap();
        assert_eq!(events.len(), 2);

        // Unknown vendor tags are ignored, known ones land on fields.
        assert_eq!(events[0].id, Some(101));
        assert_eq!(events[0].message.as_deref(), Some("Entry"));
        assert_eq!(events[0].details.as_deref(), Some("Main gate"));

        // Absent optional fields stay unset rather than erroring.
        assert_eq!(events[1].id, Some(102));
        assert_eq!(events[1].details, None);
        assert_eq!(events[1].employee_id, None);
    }

    #[test]
    fn test_decode_events_empty_list() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <GetEventsResponse xmlns="http://www.rusguardsecurity.ru">
      <GetEventsResult/>
    </GetEventsResponse>
  </s:Body>
</s:Envelope>"#;
        let doc = ResponseDocument::parse(xml).unwrap();
        assert!(decode_events(&doc, "GetEvents").unwrap().is_empty());
    }

    #[test]
    fn test_decode_variable() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <GetVariableResponse xmlns="http://www.rusguardsecurity.ru">
      <GetVariableResult xmlns:a="http://www.rusguardsecurity.ru/entities">
        <a:Name>Version</a:Name>
        <a:Value>2.6.0</a:Value>
      </GetVariableResult>
    </GetVariableResponse>
  </s:Body>
</s:Envelope>"#;
        let doc = ResponseDocument::parse(xml).unwrap();
        let (name, value) = decode_variable(&doc).unwrap();
        assert_eq!(name, "Version");
        assert_eq!(value, "2.6.0");
    }

    #[test]
    fn test_decode_photo_present_and_absent() {
        let with_photo = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <GetAcsEmployeePhotoResponse xmlns="http://www.rusguardsecurity.ru">
      <GetAcsEmployeePhotoResult>aGVsbG8=</GetAcsEmployeePhotoResult>
    </GetAcsEmployeePhotoResponse>
  </s:Body>
</s:Envelope>"#;
        let doc = ResponseDocument::parse(with_photo).unwrap();
        assert_eq!(decode_photo(&doc).unwrap(), Some(b"hello".to_vec()));

        let without_photo = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <GetAcsEmployeePhotoResponse xmlns="http://www.rusguardsecurity.ru">
      <GetAcsEmployeePhotoResult/>
    </GetAcsEmployeePhotoResponse>
  </s:Body>
</s:Envelope>"#;
        let doc = ResponseDocument::parse(without_photo).unwrap();
        assert_eq!(decode_photo(&doc).unwrap(), None);
    }

    #[test]
    fn test_decode_drivers_property_maps() {
        let doc = ResponseDocument::parse(DRIVERS_RESPONSE).unwrap();
        let drivers = decode_drivers(&doc).unwrap();
        assert_eq!(drivers.len(), 1);

        let driver = &drivers[0];
        assert_eq!(driver.id.as_deref(), Some("drv-1"));
        assert_eq!(driver.name.as_deref(), Some("Controller A"));
        assert_eq!(driver.properties.len(), 2);
        assert_eq!(driver.properties.get("Mode").map(String::as_str), Some("Auto"));
        assert_eq!(driver.properties.get("State").map(String::as_str), Some("On"));
        assert_eq!(driver.states.get("Door").map(String::as_str), Some("Closed"));
    }

    #[test]
    fn test_method_result_missing_element() {
        let doc = ResponseDocument::parse(CONNECT_RESPONSE).unwrap();
        let err = doc.method_result("GetEvents").unwrap_err();
        assert!(matches!(err, ClientError::MissingElement(_)));
    }

    #[test]
    fn test_text_accumulates_around_children() {
        let element = parse_xml("<r>one<child/>two</r>").unwrap();
        assert_eq!(element.text.as_deref(), Some("onetwo"));
        assert_eq!(element.children.len(), 1);
    }
}

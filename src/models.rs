//! Record types decoded from vendor XML.
//!
//! Every field is optional: responses are mapped permissively, with each
//! immediate child element matched by its namespace-stripped tag name.
//! Unknown tags are dropped and absent tags leave fields unset, so schema
//! drift on the server side never fails a decode.

use crate::decoder::Element;
use std::collections::BTreeMap;

/// A single entry of the server's event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMessage {
    pub id: Option<i64>,
    pub content_data: Option<String>,
    pub content_type: Option<String>,
    pub date_time: Option<String>,
    pub details: Option<String>,
    pub driver_id: Option<String>,
    pub driver_name: Option<String>,
    pub employee_id: Option<String>,
    pub employee_first_name: Option<String>,
    pub employee_last_name: Option<String>,
    pub employee_second_name: Option<String>,
    pub employee_group_id: Option<String>,
    pub employee_group_full_name: Option<String>,
    pub employee_group_name: Option<String>,
    pub log_message_sub_type: Option<String>,
    pub log_message_type: Option<String>,
    pub message: Option<String>,
    pub operator_full_name: Option<String>,
    pub operator_id: Option<String>,
    pub operator_login: Option<String>,
    pub server_id: Option<String>,
    pub server_name: Option<String>,
}

impl LogMessage {
    pub fn from_element(element: &Element) -> Self {
        let mut record = Self::default();
        for child in &element.children {
            let text = child.text.clone();
            match child.local_name.as_str() {
                "Id" => record.id = text.and_then(|t| t.parse().ok()),
                "ContentData" => record.content_data = text,
                "ContentType" => record.content_type = text,
                "DateTime" => record.date_time = text,
                "Details" => record.details = text,
                "DriverID" => record.driver_id = text,
                "DriverName" => record.driver_name = text,
                "EmployeeID" => record.employee_id = text,
                "EmployeeFirstName" => record.employee_first_name = text,
                "EmployeeLastName" => record.employee_last_name = text,
                "EmployeeSecondName" => record.employee_second_name = text,
                "EmployeeGroupId" => record.employee_group_id = text,
                "EmployeeGroupFullName" => record.employee_group_full_name = text,
                "EmployeeGroupName" => record.employee_group_name = text,
                "LogMessageSubType" => record.log_message_sub_type = text,
                "LogMessageType" => record.log_message_type = text,
                "Message" => record.message = text,
                "OperatorFullName" => record.operator_full_name = text,
                "OperatorID" => record.operator_id = text,
                "OperatorLogin" => record.operator_login = text,
                "ServerId" => record.server_id = text,
                "ServerName" => record.server_name = text,
                _ => {}
            }
        }
        record
    }
}

/// Metadata of one additional (custom) employee field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalFieldInfo {
    pub field_type: Option<String>,
    pub id: Option<String>,
    pub is_not_for_show: Option<String>,
    pub is_required: Option<String>,
    pub name: Option<String>,
    pub order: Option<String>,
    pub owner_type: Option<String>,
    pub default_value: Option<String>,
}

impl AdditionalFieldInfo {
    pub fn from_element(element: &Element) -> Self {
        let mut record = Self::default();
        for child in &element.children {
            let text = child.text.clone();
            match child.local_name.as_str() {
                "FieldType" => record.field_type = text,
                "ID" => record.id = text,
                "IsNotForShow" => record.is_not_for_show = text,
                "IsRequired" => record.is_required = text,
                "Name" => record.name = text,
                "Order" => record.order = text,
                "OwnerType" => record.owner_type = text,
                "DefaultValue" => record.default_value = text,
                _ => {}
            }
        }
        record
    }
}

/// A passage event pushed by the server over the long-poll channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeePassageNotification {
    pub data: Option<String>,
    pub date_time: Option<String>,
    pub details: Option<String>,
    pub driver_id: Option<String>,
    pub employee_id: Option<String>,
    pub is_key_event: Option<String>,
    pub log_message_id: Option<String>,
    pub message: Option<String>,
    pub message_sub_type: Option<String>,
    pub message_type: Option<String>,
    pub operator_id: Option<String>,
    pub employee_first_name: Option<String>,
    pub employee_last_name: Option<String>,
    pub employee_second_name: Option<String>,
    pub employee_position: Option<String>,
    pub employee_group_full_path: Option<String>,
    /// Additional fields in document order.
    pub add_fields: Vec<AdditionalFieldInfo>,
}

impl EmployeePassageNotification {
    pub fn from_element(element: &Element) -> Self {
        let mut record = Self::default();
        for child in &element.children {
            if child.local_name == "AddFields" {
                if let Some(values) = child.find(&["Fields"]) {
                    for value in values.children_named("AdditionalFieldValue") {
                        if let Some(info) = value.child("AdditionalFieldInfo") {
                            record.add_fields.push(AdditionalFieldInfo::from_element(info));
                        }
                    }
                }
                continue;
            }

            let text = child.text.clone();
            match child.local_name.as_str() {
                "Data" => record.data = text,
                "DateTime" => record.date_time = text,
                "Details" => record.details = text,
                "DriverId" => record.driver_id = text,
                "EmployeeId" => record.employee_id = text,
                "IsKeyEvent" => record.is_key_event = text,
                "LogMessageId" => record.log_message_id = text,
                "Message" => record.message = text,
                "MessageSubType" => record.message_sub_type = text,
                "MessageType" => record.message_type = text,
                "OperatorId" => record.operator_id = text,
                "EmployeeFirstName" => record.employee_first_name = text,
                "EmployeeLastName" => record.employee_last_name = text,
                "EmployeeSecondName" => record.employee_second_name = text,
                "EmployeePosition" => record.employee_position = text,
                "EmployeeGroupFullPath" => record.employee_group_full_path = text,
                _ => {}
            }
        }
        record
    }
}

/// Root descriptor of the server network tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetInfo {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl NetInfo {
    pub fn from_element(element: &Element) -> Self {
        let mut record = Self::default();
        for child in &element.children {
            let text = child.text.clone();
            match child.local_name.as_str() {
                "Id" => record.id = text,
                "Name" => record.name = text,
                _ => {}
            }
        }
        record
    }
}

/// One server inside a net.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
}

impl ServerInfo {
    pub fn from_element(element: &Element) -> Self {
        let mut record = Self::default();
        for child in &element.children {
            let text = child.text.clone();
            match child.local_name.as_str() {
                "Id" => record.id = text,
                "Name" => record.name = text,
                "State" => record.state = text,
                _ => {}
            }
        }
        record
    }
}

/// Full state of a hardware driver, including its property and state maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverFullInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub driver_type: Option<String>,
    pub is_enabled: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub states: BTreeMap<String, String>,
}

impl DriverFullInfo {
    pub fn from_element(element: &Element) -> Self {
        let mut record = Self::default();
        for child in &element.children {
            match child.local_name.as_str() {
                "Properties" => record.properties = decode_property_map(child),
                "States" => record.states = decode_property_map(child),
                _ => {
                    let text = child.text.clone();
                    match child.local_name.as_str() {
                        "Id" => record.id = text,
                        "Name" => record.name = text,
                        "DriverType" => record.driver_type = text,
                        "IsEnabled" => record.is_enabled = text,
                        _ => {}
                    }
                }
            }
        }
        record
    }
}

/// Collapse a collection of `(PropertyName, Value)` entry elements into a
/// string map. Entries missing a `PropertyName` are skipped.
fn decode_property_map(collection: &Element) -> BTreeMap<String, String> {
    collection
        .children
        .iter()
        .filter_map(|entry| {
            let key = entry.child_text("PropertyName")?;
            let value = entry.child_text("Value").unwrap_or_default();
            Some((key, value))
        })
        .collect()
}

/// Decoded SOAP Fault from an HTTP 500 response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapFault {
    pub faultcode: String,
    pub faultstring: String,
    /// All Fault children as a flat tag→text mapping.
    pub fields: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::parse_xml;

    #[test]
    fn test_log_message_unknown_tags_ignored() {
        let element = parse_xml(
            "<LogMessage><Id>7</Id><Message>Entry</Message><Exotic>x</Exotic></LogMessage>",
        )
        .unwrap();
        let record = LogMessage::from_element(&element);
        assert_eq!(record.id, Some(7));
        assert_eq!(record.message.as_deref(), Some("Entry"));
        assert_eq!(record.details, None);
    }

    #[test]
    fn test_log_message_unparsable_id_left_unset() {
        let element = parse_xml("<LogMessage><Id>not-a-number</Id></LogMessage>").unwrap();
        let record = LogMessage::from_element(&element);
        assert_eq!(record.id, None);
    }

    #[test]
    fn test_notification_add_fields_ordered() {
        let element = parse_xml(
            r#"<EmployeePassageNotification>
  <EmployeeId>e-9</EmployeeId>
  <Message>Passage</Message>
  <AddFields>
    <Fields>
      <AdditionalFieldValue>
        <AdditionalFieldInfo><Name>Badge</Name><Order>1</Order></AdditionalFieldInfo>
      </AdditionalFieldValue>
      <AdditionalFieldValue>
        <AdditionalFieldInfo><Name>Phone</Name><Order>2</Order></AdditionalFieldInfo>
      </AdditionalFieldValue>
    </Fields>
  </AddFields>
</EmployeePassageNotification>"#,
        )
        .unwrap();
        let record = EmployeePassageNotification::from_element(&element);
        assert_eq!(record.employee_id.as_deref(), Some("e-9"));
        assert_eq!(record.add_fields.len(), 2);
        assert_eq!(record.add_fields[0].name.as_deref(), Some("Badge"));
        assert_eq!(record.add_fields[1].name.as_deref(), Some("Phone"));
    }

    #[test]
    fn test_property_map_skips_entries_without_name() {
        let element = parse_xml(
            r#"<Properties>
  <Entry><PropertyName>Mode</PropertyName><Value>Auto</Value></Entry>
  <Entry><Value>orphan</Value></Entry>
  <Entry><PropertyName>Empty</PropertyName></Entry>
</Properties>"#,
        )
        .unwrap();
        let map = decode_property_map(&element);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("Mode").map(String::as_str), Some("Auto"));
        assert_eq!(map.get("Empty").map(String::as_str), Some(""));
    }
}

//! Request-body schema templates for the vendor's data operations.
//!
//! Each function returns the nested mapping that [`crate::schema::encode_body`]
//! turns into the SOAP body element. Call-specific parameters are merged in
//! here; key order is the element order on the wire.

use serde_json::{json, Value};

/// Vendor service namespace, declared on every method element.
pub const VENDOR_NS: &str = "http://www.rusguardsecurity.ru";

/// Vendor log-entity namespace, used by filter sub-elements.
pub const LOG_ENTITY_NS: &str =
    "http://schemas.datacontract.org/2004/07/VVIInvestment.RusGuard.DAL.Entities.Entity.Log";

/// SOAPAction URIs, one per operation.
pub mod actions {
    pub const CONNECT: &str = "http://www.rusguardsecurity.ru/ILNetworkService/Connect";
    pub const DISCONNECT: &str = "http://www.rusguardsecurity.ru/ILNetworkService/Disconnect";
    pub const GET_NOTIFICATION: &str =
        "http://www.rusguardsecurity.ru/ILNetworkService/GetNotification";
    pub const GET_VARIABLE: &str = "http://www.rusguardsecurity.ru/ILDataService/GetVariable";
    pub const GET_LAST_EVENT: &str = "http://www.rusguardsecurity.ru/ILDataService/GetLastEvent";
    pub const GET_EVENTS: &str = "http://www.rusguardsecurity.ru/ILDataService/GetEvents";
    pub const GET_FILTERED_EVENTS: &str =
        "http://www.rusguardsecurity.ru/ILDataService/GetFilteredEvents";
    pub const GET_EMPLOYEE_PHOTO: &str =
        "http://www.rusguardsecurity.ru/ILDataService/GetAcsEmployeePhoto";
    pub const GET_ALL_NETS: &str = "http://www.rusguardsecurity.ru/ILDataService/GetAllNets";
    pub const GET_NET_SERVERS: &str = "http://www.rusguardsecurity.ru/ILDataService/GetNetServers";
    pub const GET_SERVER_DRIVERS_FULL_INFO: &str =
        "http://www.rusguardsecurity.ru/ILDataService/GetServerDriversFullInfo";
}

fn vendor_attributes() -> Value {
    json!({ "xmlns": VENDOR_NS })
}

pub fn get_variable(name: &str) -> Value {
    json!({
        "GetVariable": {
            "_attributes": vendor_attributes(),
            "name": name,
        }
    })
}

pub fn get_last_event() -> Value {
    json!({
        "GetLastEvent": {
            "_attributes": vendor_attributes(),
        }
    })
}

pub fn get_events(from_message_id: i64) -> Value {
    json!({
        "GetEvents": {
            "_attributes": vendor_attributes(),
            "fromMessageId": from_message_id,
        }
    })
}

pub fn get_filtered_events(sub_type: &str, from_date_time: &str, to_date_time: &str) -> Value {
    json!({
        "GetFilteredEvents": {
            "_attributes": vendor_attributes(),
            "msgSubTypes": {
                "_attributes": { "xmlns:a": LOG_ENTITY_NS },
                "a:LogMsgSubType": sub_type,
            },
            "fromDateTime": from_date_time,
            "toDateTime": to_date_time,
        }
    })
}

pub fn get_notification(connection_id: &str) -> Value {
    json!({
        "GetNotification": {
            "_attributes": vendor_attributes(),
            "connectionId": connection_id,
        }
    })
}

pub fn get_employee_photo(employee_id: &str, photo_number: u32) -> Value {
    json!({
        "GetAcsEmployeePhoto": {
            "_attributes": vendor_attributes(),
            "employeeId": employee_id,
            "photoNumber": photo_number,
        }
    })
}

pub fn get_all_nets() -> Value {
    json!({
        "GetAllNets": {
            "_attributes": vendor_attributes(),
        }
    })
}

pub fn get_net_servers(id: &str) -> Value {
    json!({
        "GetNetServers": {
            "_attributes": vendor_attributes(),
            "id": id,
        }
    })
}

pub fn get_server_drivers_full_info(server_id: &str) -> Value {
    json!({
        "GetServerDriversFullInfo": {
            "_attributes": vendor_attributes(),
            "serverID": server_id,
        }
    })
}

//! SOAP request envelopes for the vim25 API.
//!
//! Bodies are generated as strings; every caller-supplied value goes through
//! `quick_xml::escape`.

use quick_xml::escape::escape;

use crate::types::{HostVirtualNicSpec, ManagedObjectRef, NicIpConfig};

const ENVELOPE_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/""#,
    r#" xmlns:xsd="http://www.w3.org/2001/XMLSchema""#,
    r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    "<soapenv:Body>",
);

const ENVELOPE_CLOSE: &str = "</soapenv:Body></soapenv:Envelope>";

/// Value of the `SOAPAction` header for an API version.
pub fn soap_action(api_version: &str) -> String {
    format!("urn:vim25/{}", api_version)
}

/// Wrap an operation element in a SOAP envelope.
fn envelope(operation: &str, inner: &str) -> String {
    format!(
        r#"{}<{} xmlns="urn:vim25">{}</{}>{}"#,
        ENVELOPE_OPEN, operation, inner, operation, ENVELOPE_CLOSE
    )
}

fn text(tag: &str, value: &str) -> String {
    format!("<{}>{}</{}>", tag, escape(value), tag)
}

fn moref(tag: &str, obj: &ManagedObjectRef) -> String {
    format!(
        r#"<{} type="{}">{}</{}>"#,
        tag,
        escape(obj.kind.as_str()),
        escape(obj.value.as_str()),
        tag
    )
}

// =============================================================================
// Session
// =============================================================================

pub fn retrieve_service_content() -> String {
    let instance = ManagedObjectRef::new("ServiceInstance", "ServiceInstance");
    envelope("RetrieveServiceContent", &moref("_this", &instance))
}

pub fn login(session_manager: &ManagedObjectRef, username: &str, password: &str) -> String {
    let inner = format!(
        "{}{}{}",
        moref("_this", session_manager),
        text("userName", username),
        text("password", password)
    );
    envelope("Login", &inner)
}

pub fn logout(session_manager: &ManagedObjectRef) -> String {
    envelope("Logout", &moref("_this", session_manager))
}

// =============================================================================
// Views and property retrieval
// =============================================================================

pub fn create_container_view(
    view_manager: &ManagedObjectRef,
    container: &ManagedObjectRef,
    kind: &str,
) -> String {
    let inner = format!(
        "{}{}{}{}",
        moref("_this", view_manager),
        moref("container", container),
        text("type", kind),
        text("recursive", "true")
    );
    envelope("CreateContainerView", &inner)
}

pub fn destroy_view(view: &ManagedObjectRef) -> String {
    envelope("DestroyView", &moref("_this", view))
}

/// Retrieve `path` of every `kind` object listed by a container view.
pub fn retrieve_view_properties(
    property_collector: &ManagedObjectRef,
    view: &ManagedObjectRef,
    kind: &str,
    path: &str,
) -> String {
    let spec = format!(
        concat!(
            "<specSet>",
            "<propSet>{}{}</propSet>",
            "<objectSet>{}<skip>true</skip>",
            r#"<selectSet xsi:type="TraversalSpec">"#,
            "<name>traverseView</name><type>ContainerView</type><path>view</path><skip>false</skip>",
            "</selectSet>",
            "</objectSet>",
            "</specSet>",
        ),
        text("type", kind),
        text("pathSet", path),
        moref("obj", view),
    );
    envelope(
        "RetrievePropertiesEx",
        &format!("{}{}<options/>", moref("_this", property_collector), spec),
    )
}

/// Retrieve `paths` of a single object.
pub fn retrieve_object_properties(
    property_collector: &ManagedObjectRef,
    obj: &ManagedObjectRef,
    paths: &[&str],
) -> String {
    let path_set: String = paths.iter().map(|p| text("pathSet", p)).collect();
    let spec = format!(
        "<specSet><propSet>{}{}</propSet><objectSet>{}<skip>false</skip></objectSet></specSet>",
        text("type", &obj.kind),
        path_set,
        moref("obj", obj),
    );
    envelope(
        "RetrievePropertiesEx",
        &format!("{}{}<options/>", moref("_this", property_collector), spec),
    )
}

pub fn continue_retrieve_properties(property_collector: &ManagedObjectRef, token: &str) -> String {
    let inner = format!("{}{}", moref("_this", property_collector), text("token", token));
    envelope("ContinueRetrievePropertiesEx", &inner)
}

// =============================================================================
// Host network system
// =============================================================================

pub fn add_virtual_nic(
    network_system: &ManagedObjectRef,
    port_group: &str,
    spec: &HostVirtualNicSpec,
) -> String {
    let ip = match &spec.ip {
        NicIpConfig::Dhcp => text("dhcp", "true"),
        NicIpConfig::Static { address, subnet_mask } => format!(
            "{}{}{}",
            text("dhcp", "false"),
            text("ipAddress", address),
            text("subnetMask", subnet_mask)
        ),
    };
    let inner = format!(
        "{}{}<nic><ip>{}</ip></nic>",
        moref("_this", network_system),
        text("portgroup", port_group),
        ip
    );
    envelope("AddVirtualNic", &inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_escapes_credentials() {
        let sm = ManagedObjectRef::new("SessionManager", "SessionManager");
        let body = login(&sm, "admin@vsphere.local", "p<a>&ss");

        assert!(body.contains(r#"<Login xmlns="urn:vim25">"#));
        assert!(body.contains(r#"<_this type="SessionManager">SessionManager</_this>"#));
        assert!(body.contains("<password>p&lt;a&gt;&amp;ss</password>"));
    }

    #[test]
    fn test_add_virtual_nic_static() {
        let nw = ManagedObjectRef::new("HostNetworkSystem", "networkSystem-10");
        let spec = HostVirtualNicSpec::for_address(Some("10.0.0.5"));
        let body = add_virtual_nic(&nw, "PG1", &spec);

        assert!(body.contains("<portgroup>PG1</portgroup>"));
        assert!(body.contains(concat!(
            "<nic><ip><dhcp>false</dhcp><ipAddress>10.0.0.5</ipAddress>",
            "<subnetMask>255.255.255.0</subnetMask></ip></nic>"
        )));
    }

    #[test]
    fn test_add_virtual_nic_dhcp() {
        let nw = ManagedObjectRef::new("HostNetworkSystem", "networkSystem-10");
        let body = add_virtual_nic(&nw, "PG1", &HostVirtualNicSpec::for_address(None));

        assert!(body.contains("<nic><ip><dhcp>true</dhcp></ip></nic>"));
        assert!(!body.contains("ipAddress"));
    }

    #[test]
    fn test_view_traversal_spec() {
        let pc = ManagedObjectRef::new("PropertyCollector", "propertyCollector");
        let view = ManagedObjectRef::new("ContainerView", "session[52]5a");
        let body = retrieve_view_properties(&pc, &view, "HostSystem", "name");

        assert!(body.contains("<propSet><type>HostSystem</type><pathSet>name</pathSet></propSet>"));
        assert!(body.contains(r#"<obj type="ContainerView">session[52]5a</obj><skip>true</skip>"#));
        assert!(body.contains("<path>view</path>"));
    }
}

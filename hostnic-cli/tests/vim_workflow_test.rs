//! Workflow tests over the vim25 client.
//!
//! The stub endpoint holds one datacenter `DC1` whose host folder `group-h4`
//! contains `esx1`. It answers property reads by the requested path, so the
//! datacenter branch goes through the same calls a real endpoint sees.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use std::sync::{Arc, Mutex};

use hostnic_cli::{NicProvisioningWorkflow, ProvisionOutcome, ProvisionRequest};
use hostnic_inventory::{InventoryClient, VimClient, VimSettings};

const SOAP_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/""#,
    r#" xmlns:xsd="http://www.w3.org/2001/XMLSchema""#,
    r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><soapenv:Body>"#,
);
const SOAP_CLOSE: &str = "</soapenv:Body></soapenv:Envelope>";

const OPERATIONS: [&str; 8] = [
    "RetrieveServiceContent",
    "Login",
    "Logout",
    "CreateContainerView",
    "DestroyView",
    "RetrievePropertiesEx",
    "ContinueRetrievePropertiesEx",
    "AddVirtualNic",
];

#[derive(Default)]
struct Stub {
    calls: Mutex<Vec<(String, String)>>,
}

impl Stub {
    fn operations(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(op, _)| op.clone()).collect()
    }

    fn bodies(&self, operation: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

fn soap(body: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        format!("{}{}{}", SOAP_OPEN, body, SOAP_CLOSE),
    )
        .into_response()
}

fn runtime_fault() -> Response {
    let body = format!(
        concat!(
            "{}<soapenv:Fault><faultcode>ServerFaultCode</faultcode>",
            "<faultstring>unexpected request</faultstring>",
            r#"<detail><RuntimeFaultFault xmlns="urn:vim25" xsi:type="RuntimeFault"/></detail>"#,
            "</soapenv:Fault>{}"
        ),
        SOAP_OPEN, SOAP_CLOSE
    );
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

fn object_names(kind: &str, objects: &[(&str, &str)]) -> Response {
    let objects: String = objects
        .iter()
        .map(|(id, name)| {
            format!(
                concat!(
                    r#"<objects><obj type="{}">{}</obj><propSet><name>name</name>"#,
                    r#"<val xsi:type="xsd:string">{}</val></propSet></objects>"#
                ),
                kind, id, name
            )
        })
        .collect();
    soap(&format!(
        r#"<RetrievePropertiesExResponse xmlns="urn:vim25"><returnval>{}</returnval></RetrievePropertiesExResponse>"#,
        objects
    ))
}

fn moref_property(obj: (&str, &str), path: &str, value: (&str, &str)) -> Response {
    soap(&format!(
        concat!(
            r#"<RetrievePropertiesExResponse xmlns="urn:vim25"><returnval>"#,
            r#"<objects><obj type="{}">{}</obj><propSet><name>{}</name>"#,
            r#"<val type="{}" xsi:type="ManagedObjectReference">{}</val></propSet></objects>"#,
            "</returnval></RetrievePropertiesExResponse>"
        ),
        obj.0, obj.1, path, value.0, value.1
    ))
}

fn has(body: &str, tag: &str, value: &str) -> bool {
    body.contains(&format!("<{}>{}</{}>", tag, value, tag))
}

async fn sdk(State(stub): State<Arc<Stub>>, body: String) -> Response {
    let op = OPERATIONS
        .iter()
        .find(|op| body.contains(&format!("<{} ", op)))
        .copied()
        .unwrap_or("Unknown");
    stub.calls
        .lock()
        .unwrap()
        .push((op.to_string(), body.clone()));

    let container_view = body.contains(r#"<obj type="ContainerView">"#);
    match op {
        "RetrieveServiceContent" => soap(concat!(
            r#"<RetrieveServiceContentResponse xmlns="urn:vim25"><returnval>"#,
            r#"<rootFolder type="Folder">group-d1</rootFolder>"#,
            r#"<propertyCollector type="PropertyCollector">propertyCollector"#,
            "</propertyCollector>",
            r#"<viewManager type="ViewManager">ViewManager</viewManager>"#,
            "<about><apiVersion>6.0</apiVersion></about>",
            r#"<sessionManager type="SessionManager">SessionManager</sessionManager>"#,
            "</returnval></RetrieveServiceContentResponse>"
        )),
        "Login" => soap(r#"<LoginResponse xmlns="urn:vim25"><returnval/></LoginResponse>"#),
        "Logout" => soap(r#"<LogoutResponse xmlns="urn:vim25"/>"#),
        "CreateContainerView" => soap(
            r#"<CreateContainerViewResponse xmlns="urn:vim25"><returnval type="ContainerView">session[1]view</returnval></CreateContainerViewResponse>"#,
        ),
        "DestroyView" => soap(r#"<DestroyViewResponse xmlns="urn:vim25"/>"#),
        "RetrievePropertiesEx" if container_view && has(&body, "type", "Datacenter") => {
            object_names("Datacenter", &[("datacenter-2", "DC1")])
        }
        "RetrievePropertiesEx" if container_view && has(&body, "type", "HostSystem") => {
            object_names("HostSystem", &[("host-5", "esx1")])
        }
        "RetrievePropertiesEx" if has(&body, "pathSet", "hostFolder") => moref_property(
            ("Datacenter", "datacenter-2"),
            "hostFolder",
            ("Folder", "group-h4"),
        ),
        "RetrievePropertiesEx" if has(&body, "pathSet", "configManager.networkSystem") => {
            moref_property(
                ("HostSystem", "host-5"),
                "configManager.networkSystem",
                ("HostNetworkSystem", "networkSystem-5"),
            )
        }
        "AddVirtualNic" => soap(
            r#"<AddVirtualNicResponse xmlns="urn:vim25"><returnval>vmk1</returnval></AddVirtualNicResponse>"#,
        ),
        _ => runtime_fault(),
    }
}

async fn start_stub() -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub::default());
    let app = Router::new()
        .route("/sdk", post(sdk))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/sdk", addr), stub)
}

async fn connect(url: &str) -> VimClient {
    let settings = VimSettings {
        url: url.to_string(),
        username: "admin".to_string(),
        password: "secret".to_string(),
        insecure: false,
        api_version: "6.0".to_string(),
    };
    VimClient::connect(&settings).await.unwrap()
}

/// Test the datacenter branch end to end over SOAP.
#[tokio::test]
async fn test_static_nic_in_datacenter() {
    let (url, stub) = start_stub().await;
    let client = connect(&url).await;
    let ctx = client.context().clone();

    let request = ProvisionRequest::new("PG1")
        .with_datacenter("DC1")
        .with_host("esx1")
        .with_ip_address("10.0.0.5");
    let outcome = NicProvisioningWorkflow::new(&client, &ctx)
        .run(&request)
        .await
        .unwrap();
    client.logout().await.unwrap();

    assert_eq!(
        outcome,
        ProvisionOutcome::Created {
            device: "vmk1".to_string(),
            port_group: "PG1".to_string(),
            host: "esx1".to_string(),
        }
    );
    assert_eq!(
        stub.operations(),
        vec![
            "RetrieveServiceContent",
            "Login",
            "CreateContainerView",
            "RetrievePropertiesEx",
            "DestroyView",
            "RetrievePropertiesEx",
            "CreateContainerView",
            "RetrievePropertiesEx",
            "DestroyView",
            "RetrievePropertiesEx",
            "AddVirtualNic",
            "Logout",
        ]
    );

    // Datacenters are listed from the root, hosts from the datacenter's host folder.
    let views = stub.bodies("CreateContainerView");
    assert!(views[0].contains(r#"<container type="Folder">group-d1</container>"#));
    assert!(has(&views[0], "type", "Datacenter"));
    assert!(views[1].contains(r#"<container type="Folder">group-h4</container>"#));
    assert!(has(&views[1], "type", "HostSystem"));

    let add = &stub.bodies("AddVirtualNic")[0];
    assert!(add.contains(r#"<_this type="HostNetworkSystem">networkSystem-5</_this>"#));
    assert!(has(add, "portgroup", "PG1"));
    assert!(has(add, "ipAddress", "10.0.0.5"));
    assert!(has(add, "subnetMask", "255.255.255.0"));
}

/// Test that an unknown datacenter stops before any host lookup or change.
#[tokio::test]
async fn test_missing_datacenter_makes_no_change() {
    let (url, stub) = start_stub().await;
    let client = connect(&url).await;
    let ctx = client.context().clone();

    let request = ProvisionRequest::new("PG1")
        .with_datacenter("DC9")
        .with_host("esx1");
    let outcome = NicProvisioningWorkflow::new(&client, &ctx)
        .run(&request)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ProvisionOutcome::DatacenterNotFound {
            datacenter: "DC9".to_string()
        }
    );
    assert_eq!(stub.bodies("CreateContainerView").len(), 1);
    assert!(stub.bodies("AddVirtualNic").is_empty());
}

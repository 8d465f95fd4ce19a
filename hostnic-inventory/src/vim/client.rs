//! vim25 SOAP client.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, instrument, warn};

use super::envelope;
use super::response::{self, XmlElement};
use crate::error::{InventoryError, Result};
use crate::traits::InventoryClient;
use crate::types::*;

/// Default API version sent in the `SOAPAction` header.
pub const DEFAULT_API_VERSION: &str = "6.0";

/// Connection settings for a vim25 endpoint.
#[derive(Clone)]
pub struct VimSettings {
    /// SDK URL (e.g., `https://vcenter.example.com/sdk`)
    pub url: String,
    pub username: String,
    pub password: String,
    /// Accept invalid or self-signed endpoint certificates
    pub insecure: bool,
    /// API version for the `SOAPAction` header
    pub api_version: String,
}

impl fmt::Debug for VimSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VimSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// HTTP transport for SOAP calls. The session cookie lives in the client's
/// cookie store once `Login` succeeds.
struct SoapTransport {
    url: String,
    soap_action: String,
    http: reqwest::Client,
}

impl SoapTransport {
    fn new(settings: &VimSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(settings.insecure)
            .build()
            .map_err(|e| InventoryError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            url: settings.url.clone(),
            soap_action: envelope::soap_action(&settings.api_version),
            http,
        })
    }

    /// Post an envelope and return the operation response element.
    async fn call(&self, body: String) -> Result<XmlElement> {
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", self.soap_action.as_str())
            .body(body)
            .send()
            .await
            .map_err(|e| InventoryError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| InventoryError::ConnectionFailed(e.to_string()))?;

        // Faults arrive with HTTP 500; only a body that is not a SOAP envelope
        // makes the status itself the error.
        match XmlElement::parse(&text).and_then(response::into_response) {
            Err(InventoryError::Protocol(reason)) if !status.is_success() => {
                debug!(status = %status, reason = %reason, "Non-SOAP error response");
                Err(InventoryError::ConnectionFailed(format!("HTTP {}", status)))
            }
            other => other,
        }
    }
}

/// Inventory client for a vim25 SOAP endpoint (vCenter or ESXi).
pub struct VimClient {
    transport: SoapTransport,
    context: ConnectionContext,
}

impl VimClient {
    /// Connect and log in.
    ///
    /// Retrieves the service content of the endpoint, then opens a session
    /// with the given credentials.
    #[instrument(skip(settings), fields(url = %settings.url, username = %settings.username))]
    pub async fn connect(settings: &VimSettings) -> Result<Self> {
        info!("Connecting to management endpoint");

        let transport = SoapTransport::new(settings)?;

        let content = transport.call(envelope::retrieve_service_content()).await?;
        let context = response::service_content(&content)?;

        transport
            .call(envelope::login(
                &context.session_manager,
                &settings.username,
                &settings.password,
            ))
            .await?;

        info!(
            product = %context.product_name,
            api_version = %context.api_version,
            "Logged in to management endpoint"
        );

        Ok(Self { transport, context })
    }

    /// Close the session.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.transport
            .call(envelope::logout(&self.context.session_manager))
            .await?;
        info!("Logged out of management endpoint");
        Ok(())
    }

    async fn create_container_view(
        &self,
        folder: &ManagedObjectRef,
        entity: EntityType,
    ) -> Result<ManagedObjectRef> {
        let response = self
            .transport
            .call(envelope::create_container_view(
                &self.context.view_manager,
                folder,
                entity.as_str(),
            ))
            .await?;
        response::returned_moref(&response)
    }

    async fn destroy_view(&self, view: &ManagedObjectRef) -> Result<()> {
        self.transport.call(envelope::destroy_view(view)).await?;
        Ok(())
    }

    /// Read the names of every object a view lists, following continuation tokens.
    async fn collect_names(
        &self,
        view: &ManagedObjectRef,
        entity: EntityType,
    ) -> Result<HashMap<String, ManagedObjectRef>> {
        let pc = &self.context.property_collector;
        let mut names = HashMap::new();

        let response = self
            .transport
            .call(envelope::retrieve_view_properties(pc, view, entity.as_str(), props::NAME))
            .await?;
        let mut page = response::retrieve_result(&response)?;

        loop {
            for object in page.objects {
                for (path, value) in object.props {
                    if path == props::NAME {
                        if let PropertyValue::String(name) = value {
                            names.insert(name, object.obj.clone());
                        }
                    }
                }
            }

            let Some(token) = page.token else {
                break;
            };
            debug!(token = %token, "Continuing property retrieval");
            let response = self
                .transport
                .call(envelope::continue_retrieve_properties(pc, &token))
                .await?;
            page = response::retrieve_result(&response)?;
        }

        Ok(names)
    }
}

#[async_trait]
impl InventoryClient for VimClient {
    fn context(&self) -> &ConnectionContext {
        &self.context
    }

    #[instrument(skip(self), fields(folder = %folder, entity = %entity))]
    async fn find_by_type(
        &self,
        folder: &ManagedObjectRef,
        entity: EntityType,
    ) -> Result<HashMap<String, ManagedObjectRef>> {
        let view = self.create_container_view(folder, entity).await?;
        let names = self.collect_names(&view, entity).await;

        if let Err(e) = self.destroy_view(&view).await {
            warn!(view = %view, error = %e, "Failed to destroy container view");
        }

        let names = names?;
        debug!(count = names.len(), "Found objects");
        Ok(names)
    }

    #[instrument(skip(self), fields(obj = %obj))]
    async fn entity_props(
        &self,
        obj: &ManagedObjectRef,
        paths: &[&str],
    ) -> Result<HashMap<String, PropertyValue>> {
        let response = self
            .transport
            .call(envelope::retrieve_object_properties(
                &self.context.property_collector,
                obj,
                paths,
            ))
            .await?;
        let result = response::retrieve_result(&response)?;

        Ok(result
            .objects
            .into_iter()
            .filter(|o| &o.obj == obj)
            .flat_map(|o| o.props)
            .collect())
    }

    #[instrument(
        skip(self, spec),
        fields(network_system = %network_system, port_group = %port_group)
    )]
    async fn add_virtual_nic(
        &self,
        network_system: &ManagedObjectRef,
        port_group: &str,
        spec: &HostVirtualNicSpec,
    ) -> Result<String> {
        info!(dhcp = spec.ip.is_dhcp(), "Adding virtual NIC");

        let response = self
            .transport
            .call(envelope::add_virtual_nic(network_system, port_group, spec))
            .await?;
        let device = response::returned_text(&response)?;

        info!(device = %device, "Virtual NIC added");
        Ok(device)
    }
}

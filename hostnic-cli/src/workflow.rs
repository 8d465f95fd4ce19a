//! NIC provisioning workflow.
//!
//! Resolves the target host from the optional datacenter/host filters, then
//! adds a VMkernel NIC to the requested port group on that host:
//!
//! ```text
//! Start ─► ResolveHost ─┬─ found ──► BuildSpec ─► AddVirtualNic ─► Created
//!                       └─ missing ─► DatacenterNotFound | HostNotFound
//! ```
//!
//! A missing datacenter or host is an outcome, not an error. Faults raised by
//! the endpoint are returned unchanged and nothing is retried.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, instrument};

use hostnic_inventory::{
    props, ConnectionContext, EntityType, HostVirtualNicSpec, InventoryClient, InventoryError,
    ManagedObjectRef, Result,
};

/// How to pick a host when a datacenter is given without a host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatacenterHostPolicy {
    /// Only a host matching the given name is accepted; no name matches nothing
    #[default]
    Exact,
    /// Without a host name, take the first host of the datacenter by name
    Any,
}

/// Parameters of one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub port_group: String,
    pub ip_address: Option<String>,
    pub host_name: Option<String>,
    pub datacenter_name: Option<String>,
    pub host_policy: DatacenterHostPolicy,
}

impl ProvisionRequest {
    pub fn new(port_group: impl Into<String>) -> Self {
        Self {
            port_group: port_group.into(),
            ip_address: None,
            host_name: None,
            datacenter_name: None,
            host_policy: DatacenterHostPolicy::Exact,
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_host(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    pub fn with_datacenter(mut self, datacenter_name: impl Into<String>) -> Self {
        self.datacenter_name = Some(datacenter_name.into());
        self
    }

    pub fn with_host_policy(mut self, policy: DatacenterHostPolicy) -> Self {
        self.host_policy = policy;
        self
    }
}

/// Result of host resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostResolution {
    Found { name: String, host: ManagedObjectRef },
    DatacenterNotFound(String),
    HostNotFound,
}

/// Final outcome of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The NIC was added.
    Created {
        device: String,
        port_group: String,
        host: String,
    },
    /// The named datacenter does not exist; nothing was changed.
    DatacenterNotFound { datacenter: String },
    /// No host matched; nothing was changed.
    HostNotFound,
}

impl ProvisionOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

impl fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { device, port_group, .. } => write!(
                f,
                "Successful in creating nic : {} with PortGroup :{}",
                device, port_group
            ),
            Self::DatacenterNotFound { .. } => f.write_str("Datacenter not found"),
            Self::HostNotFound => f.write_str("Host not found"),
        }
    }
}

/// Adds a virtual NIC to a host found through an inventory client.
pub struct NicProvisioningWorkflow<'a, C: InventoryClient + ?Sized> {
    client: &'a C,
    ctx: &'a ConnectionContext,
}

impl<'a, C: InventoryClient + ?Sized> NicProvisioningWorkflow<'a, C> {
    pub fn new(client: &'a C, ctx: &'a ConnectionContext) -> Self {
        Self { client, ctx }
    }

    /// Run the workflow: resolve the host, then add the NIC.
    #[instrument(skip(self, request), fields(port_group = %request.port_group))]
    pub async fn run(&self, request: &ProvisionRequest) -> Result<ProvisionOutcome> {
        let (name, host) = match self.resolve_host(request).await? {
            HostResolution::Found { name, host } => (name, host),
            HostResolution::DatacenterNotFound(datacenter) => {
                info!(datacenter = %datacenter, "Datacenter not found, nothing to do");
                return Ok(ProvisionOutcome::DatacenterNotFound { datacenter });
            }
            HostResolution::HostNotFound => {
                info!("Host not found, nothing to do");
                return Ok(ProvisionOutcome::HostNotFound);
            }
        };

        let network_system = self.network_system(&host).await?;
        let spec = build_nic_spec(request.ip_address.as_deref());

        let device = self
            .client
            .add_virtual_nic(&network_system, &request.port_group, &spec)
            .await?;

        info!(host = %name, device = %device, "Virtual NIC created");
        Ok(ProvisionOutcome::Created {
            device,
            port_group: request.port_group.clone(),
            host: name,
        })
    }

    /// Find the target host for a request.
    pub async fn resolve_host(&self, request: &ProvisionRequest) -> Result<HostResolution> {
        // A given name is looked up as is, even when empty.
        let host_name = request.host_name.as_deref();

        let hosts = match (request.datacenter_name.as_deref(), host_name) {
            (Some(datacenter), _) => {
                let mut datacenters = self
                    .client
                    .find_by_type(&self.ctx.root_folder, EntityType::Datacenter)
                    .await?;
                let Some(dc) = datacenters.remove(datacenter) else {
                    return Ok(HostResolution::DatacenterNotFound(datacenter.to_string()));
                };

                let host_folder = self.moref_prop(&dc, props::HOST_FOLDER).await?;
                debug!(
                    datacenter = %dc,
                    host_folder = %host_folder,
                    "Searching datacenter host folder"
                );
                self.client
                    .find_by_type(&host_folder, EntityType::HostSystem)
                    .await?
            }
            (None, Some(_)) => {
                self.client
                    .find_by_type(&self.ctx.root_folder, EntityType::HostSystem)
                    .await?
            }
            (None, None) => return Ok(HostResolution::HostNotFound),
        };

        Ok(pick_host(hosts, host_name, request.host_policy))
    }

    async fn network_system(&self, host: &ManagedObjectRef) -> Result<ManagedObjectRef> {
        self.moref_prop(host, props::NETWORK_SYSTEM).await
    }

    /// Read a property that holds a managed object reference.
    async fn moref_prop(&self, obj: &ManagedObjectRef, path: &str) -> Result<ManagedObjectRef> {
        let mut values = self.client.entity_props(obj, &[path]).await?;
        match values.remove(path) {
            Some(value) => value.as_moref().cloned().ok_or_else(|| {
                InventoryError::Protocol(format!("{} of {} is not an object reference", path, obj))
            }),
            None => Err(InventoryError::NotFound(format!("{} of {}", path, obj))),
        }
    }
}

/// Choose a host from the search result.
fn pick_host(
    mut hosts: HashMap<String, ManagedObjectRef>,
    host_name: Option<&str>,
    policy: DatacenterHostPolicy,
) -> HostResolution {
    let found = match (host_name, policy) {
        (Some(name), _) => hosts.remove_entry(name),
        (None, DatacenterHostPolicy::Any) => hosts.into_iter().min_by(|a, b| a.0.cmp(&b.0)),
        (None, DatacenterHostPolicy::Exact) => None,
    };

    match found {
        Some((name, host)) => HostResolution::Found { name, host },
        None => HostResolution::HostNotFound,
    }
}

/// Build the NIC specification: static with the default mask for a
/// non-empty address, DHCP otherwise.
pub fn build_nic_spec(ip_address: Option<&str>) -> HostVirtualNicSpec {
    HostVirtualNicSpec::for_address(ip_address)
}

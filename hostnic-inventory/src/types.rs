//! Inventory types shared by the client backends.

use std::fmt;

/// Subnet mask applied to every statically addressed virtual NIC.
pub const DEFAULT_SUBNET_MASK: &str = "255.255.255.0";

// =============================================================================
// Managed objects
// =============================================================================

/// Reference to a managed object in the inventory.
///
/// Mirrors a vim25 `ManagedObjectReference`: `kind` is the `type` attribute
/// (e.g. `HostSystem`) and `value` the opaque identifier (e.g. `host-42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedObjectRef {
    pub kind: String,
    pub value: String,
}

impl ManagedObjectRef {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ManagedObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Inventory entity types the workflow searches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Datacenter,
    HostSystem,
}

impl EntityType {
    /// The vim25 type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Datacenter => "Datacenter",
            Self::HostSystem => "HostSystem",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property paths read by the workflow.
pub mod props {
    pub const NAME: &str = "name";
    pub const HOST_FOLDER: &str = "hostFolder";
    pub const NETWORK_SYSTEM: &str = "configManager.networkSystem";
}

/// Value of a retrieved property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// A reference to another managed object.
    MoRef(ManagedObjectRef),
    /// A plain string value.
    String(String),
    /// Raw text of a value whose type is not modelled here.
    Other(String),
}

impl PropertyValue {
    pub fn as_moref(&self) -> Option<&ManagedObjectRef> {
        match self {
            Self::MoRef(moref) => Some(moref),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// Authenticated session with a management endpoint.
///
/// Produced by a backend when it connects and passed explicitly to whoever
/// drives the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    /// Root of the inventory tree
    pub root_folder: ManagedObjectRef,
    /// Property collector used for all reads
    pub property_collector: ManagedObjectRef,
    /// View manager used to build container views
    pub view_manager: ManagedObjectRef,
    /// Session manager used for login/logout
    pub session_manager: ManagedObjectRef,
    /// Endpoint product name (e.g., "VMware vCenter Server")
    pub product_name: String,
    /// Endpoint API version (e.g., "6.0")
    pub api_version: String,
}

// =============================================================================
// Virtual NIC specification
// =============================================================================

/// IP configuration of a virtual NIC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NicIpConfig {
    /// Address assigned by DHCP
    Dhcp,
    /// Fixed address
    Static {
        address: String,
        subnet_mask: String,
    },
}

impl NicIpConfig {
    /// Static configuration with the default subnet mask.
    pub fn fixed(address: impl Into<String>) -> Self {
        Self::Static {
            address: address.into(),
            subnet_mask: DEFAULT_SUBNET_MASK.to_string(),
        }
    }

    pub fn is_dhcp(&self) -> bool {
        matches!(self, Self::Dhcp)
    }
}

/// Specification passed to `AddVirtualNic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVirtualNicSpec {
    pub ip: NicIpConfig,
}

impl HostVirtualNicSpec {
    /// Build the spec for an optional address: a non-empty address gives a
    /// static configuration, anything else DHCP.
    pub fn for_address(ip_address: Option<&str>) -> Self {
        let ip = match ip_address {
            Some(address) if !address.is_empty() => NicIpConfig::fixed(address),
            _ => NicIpConfig::Dhcp,
        };
        Self { ip }
    }
}

//! Mock inventory backend for testing and development.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument};

use crate::error::{InventoryError, Result};
use crate::traits::InventoryClient;
use crate::types::*;

const ROOT_FOLDER: &str = "group-d1";

// =============================================================================
// Seed
// =============================================================================

/// Initial inventory contents, loadable from YAML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MockSeed {
    pub datacenters: Vec<MockDatacenter>,
}

/// A datacenter and the hosts in its host folder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MockDatacenter {
    pub name: String,
    pub hosts: Vec<MockHost>,
}

/// A host and the port groups on its virtual switches.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MockHost {
    pub name: String,
    /// Known port groups (empty = every port group is accepted)
    pub port_groups: Vec<String>,
}

// =============================================================================
// Backend
// =============================================================================

/// A virtual NIC created through the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicRecord {
    pub host: ManagedObjectRef,
    pub device: String,
    pub port_group: String,
    pub spec: HostVirtualNicSpec,
}

struct MockObject {
    parent: Option<ManagedObjectRef>,
    props: HashMap<String, PropertyValue>,
}

#[derive(Default)]
struct MockState {
    objects: HashMap<ManagedObjectRef, MockObject>,
    port_groups: HashMap<ManagedObjectRef, Vec<String>>,
    nics: Vec<NicRecord>,
    next_id: u32,
    pending_fault: Option<InventoryError>,
}

/// Mock inventory backend.
///
/// Holds a datacenter/host tree in memory and records every virtual NIC
/// added through it. Useful for:
/// - Unit and integration testing of the provisioning workflow
/// - Development without a management endpoint (`--dev`)
pub struct MockInventory {
    context: ConnectionContext,
    state: RwLock<MockState>,
    read_calls: AtomicUsize,
    mutating_calls: AtomicUsize,
}

impl MockInventory {
    /// Create an empty mock inventory (root folder only).
    pub fn new() -> Self {
        info!("Creating mock inventory backend");

        let root = ManagedObjectRef::new("Folder", ROOT_FOLDER);
        let mut state = MockState {
            next_id: 2,
            ..Default::default()
        };
        state.objects.insert(root.clone(), MockObject {
            parent: None,
            props: HashMap::from([(
                props::NAME.to_string(),
                PropertyValue::String("Datacenters".to_string()),
            )]),
        });

        Self {
            context: ConnectionContext {
                root_folder: root,
                property_collector: ManagedObjectRef::new("PropertyCollector", "propertyCollector"),
                view_manager: ManagedObjectRef::new("ViewManager", "ViewManager"),
                session_manager: ManagedObjectRef::new("SessionManager", "SessionManager"),
                product_name: "Mock Inventory".to_string(),
                api_version: "6.0".to_string(),
            },
            state: RwLock::new(state),
            read_calls: AtomicUsize::new(0),
            mutating_calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock inventory populated from a seed.
    pub fn from_seed(seed: &MockSeed) -> Self {
        let mut inventory = Self::new();
        for dc in &seed.datacenters {
            inventory = inventory.with_datacenter(&dc.name);
            for host in &dc.hosts {
                inventory = inventory.with_host_port_groups(
                    &dc.name,
                    &host.name,
                    host.port_groups.as_slice(),
                );
            }
        }
        inventory
    }

    /// Add a datacenter (no-op if one with that name exists).
    pub fn with_datacenter(self, name: &str) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.ensure_datacenter(&self.context.root_folder, name);
        }
        self
    }

    /// Add a host to a datacenter, creating the datacenter if needed.
    pub fn with_host(self, datacenter: &str, host: &str) -> Self {
        self.with_host_port_groups::<&str>(datacenter, host, &[])
    }

    /// Add a host carrying the given port groups.
    pub fn with_host_port_groups<S: AsRef<str>>(
        self,
        datacenter: &str,
        host: &str,
        port_groups: &[S],
    ) -> Self {
        if let Ok(mut state) = self.state.write() {
            let host_folder = state.ensure_datacenter(&self.context.root_folder, datacenter);
            let id = state.allocate_id();

            let network_system =
                ManagedObjectRef::new("HostNetworkSystem", format!("networkSystem-{}", id));
            let host_ref = ManagedObjectRef::new("HostSystem", format!("host-{}", id));

            state.objects.insert(host_ref.clone(), MockObject {
                parent: Some(host_folder),
                props: HashMap::from([
                    (props::NAME.to_string(), PropertyValue::String(host.to_string())),
                    (
                        props::NETWORK_SYSTEM.to_string(),
                        PropertyValue::MoRef(network_system.clone()),
                    ),
                ]),
            });
            state.objects.insert(network_system, MockObject {
                parent: Some(host_ref.clone()),
                props: HashMap::new(),
            });
            state.port_groups.insert(
                host_ref,
                port_groups.iter().map(|pg| pg.as_ref().to_string()).collect(),
            );
        }
        self
    }

    /// Make the next `add_virtual_nic` call fail with `fault`.
    pub fn fail_next_add(&self, fault: InventoryError) {
        if let Ok(mut state) = self.state.write() {
            state.pending_fault = Some(fault);
        }
    }

    /// Number of `add_virtual_nic` calls, successful or not.
    pub fn mutating_calls(&self) -> usize {
        self.mutating_calls.load(Ordering::SeqCst)
    }

    /// Number of read-only calls.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Virtual NICs created so far, in creation order.
    pub fn nics(&self) -> Vec<NicRecord> {
        self.state
            .read()
            .map(|state| state.nics.clone())
            .unwrap_or_default()
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, MockState>> {
        self.state
            .read()
            .map_err(|_| InventoryError::Runtime("Lock poisoned".to_string()))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, MockState>> {
        self.state
            .write()
            .map_err(|_| InventoryError::Runtime("Lock poisoned".to_string()))
    }
}

impl Default for MockInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Returns the host folder of the named datacenter.
    fn ensure_datacenter(&mut self, root: &ManagedObjectRef, name: &str) -> ManagedObjectRef {
        let existing = self.objects.iter().find_map(|(moref, obj)| {
            let named = obj.props.get(props::NAME).and_then(PropertyValue::as_str) == Some(name);
            if moref.kind == EntityType::Datacenter.as_str() && named {
                obj.props.get(props::HOST_FOLDER).and_then(PropertyValue::as_moref).cloned()
            } else {
                None
            }
        });
        if let Some(host_folder) = existing {
            return host_folder;
        }

        let id = self.allocate_id();
        let dc = ManagedObjectRef::new("Datacenter", format!("datacenter-{}", id));
        let host_folder = ManagedObjectRef::new("Folder", format!("group-h{}", id));

        self.objects.insert(dc.clone(), MockObject {
            parent: Some(root.clone()),
            props: HashMap::from([
                (props::NAME.to_string(), PropertyValue::String(name.to_string())),
                (props::HOST_FOLDER.to_string(), PropertyValue::MoRef(host_folder.clone())),
            ]),
        });
        self.objects.insert(host_folder.clone(), MockObject {
            parent: Some(dc),
            props: HashMap::from([(
                props::NAME.to_string(),
                PropertyValue::String("host".to_string()),
            )]),
        });
        host_folder
    }

    fn is_below(&self, obj: &ManagedObjectRef, folder: &ManagedObjectRef) -> bool {
        let mut current = self.objects.get(obj).and_then(|o| o.parent.as_ref());
        while let Some(parent) = current {
            if parent == folder {
                return true;
            }
            current = self.objects.get(parent).and_then(|o| o.parent.as_ref());
        }
        false
    }
}

fn object_not_found(obj: &ManagedObjectRef) -> InventoryError {
    InventoryError::Runtime(format!("ManagedObjectNotFound: {}", obj))
}

#[async_trait]
impl InventoryClient for MockInventory {
    fn context(&self) -> &ConnectionContext {
        &self.context
    }

    #[instrument(skip(self), fields(folder = %folder, entity = %entity))]
    async fn find_by_type(
        &self,
        folder: &ManagedObjectRef,
        entity: EntityType,
    ) -> Result<HashMap<String, ManagedObjectRef>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.read_state()?;

        if !state.objects.contains_key(folder) {
            return Err(object_not_found(folder));
        }

        let found: HashMap<String, ManagedObjectRef> = state
            .objects
            .iter()
            .filter(|(moref, _)| moref.kind == entity.as_str() && state.is_below(moref, folder))
            .filter_map(|(moref, obj)| {
                obj.props
                    .get(props::NAME)
                    .and_then(PropertyValue::as_str)
                    .map(|name| (name.to_string(), moref.clone()))
            })
            .collect();

        debug!(count = found.len(), "Found objects");
        Ok(found)
    }

    #[instrument(skip(self), fields(obj = %obj))]
    async fn entity_props(
        &self,
        obj: &ManagedObjectRef,
        paths: &[&str],
    ) -> Result<HashMap<String, PropertyValue>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.read_state()?;

        let object = state.objects.get(obj).ok_or_else(|| object_not_found(obj))?;

        // Unset paths are left out, as the property collector does.
        let values = paths
            .iter()
            .filter_map(|path| {
                object
                    .props
                    .get(*path)
                    .map(|value| (path.to_string(), value.clone()))
            })
            .collect();
        Ok(values)
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
        self.mutating_calls.fetch_add(1, Ordering::SeqCst);
        info!("Adding mock virtual NIC");

        let mut state = self.write_state()?;

        if let Some(fault) = state.pending_fault.take() {
            return Err(fault);
        }

        let host = state
            .objects
            .get(network_system)
            .and_then(|o| o.parent.clone())
            .ok_or_else(|| object_not_found(network_system))?;

        let known = state.port_groups.get(&host).cloned().unwrap_or_default();
        if !known.is_empty() && !known.iter().any(|pg| pg == port_group) {
            return Err(InventoryError::HostConfig(format!(
                "Port group {} does not exist on {}",
                port_group, host
            )));
        }

        let on_host: Vec<&NicRecord> = state.nics.iter().filter(|n| n.host == host).collect();
        if on_host.iter().any(|n| n.port_group == port_group) {
            return Err(InventoryError::AlreadyExists(port_group.to_string()));
        }

        let device = format!("vmk{}", on_host.len());
        state.nics.push(NicRecord {
            host,
            device: device.clone(),
            port_group: port_group.to_string(),
            spec: spec.clone(),
        });

        info!(device = %device, "Mock virtual NIC added");
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_hosts_by_scope() {
        let inventory = MockInventory::new()
            .with_host("DC1", "esx1")
            .with_host("DC1", "esx3")
            .with_host("DC2", "esx2");
        let root = inventory.context().root_folder.clone();

        let all = inventory.find_by_type(&root, EntityType::HostSystem).await.unwrap();
        assert_eq!(all.len(), 3);

        let dcs = inventory.find_by_type(&root, EntityType::Datacenter).await.unwrap();
        let dc1 = dcs.get("DC1").unwrap();
        let values = inventory.entity_props(dc1, &[props::HOST_FOLDER]).await.unwrap();
        let host_folder = values[props::HOST_FOLDER].as_moref().unwrap();

        let in_dc1 = inventory.find_by_type(host_folder, EntityType::HostSystem).await.unwrap();
        let mut names: Vec<_> = in_dc1.keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["esx1", "esx3"]);
        assert_eq!(inventory.read_calls(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_datacenter_is_reused() {
        let inventory = MockInventory::new()
            .with_datacenter("DC1")
            .with_host("DC1", "esx1");
        let root = inventory.context().root_folder.clone();

        let dcs = inventory.find_by_type(&root, EntityType::Datacenter).await.unwrap();
        assert_eq!(dcs.len(), 1);
    }

    #[tokio::test]
    async fn test_unset_property_is_omitted() {
        let inventory = MockInventory::new().with_host("DC1", "esx1");
        let root = inventory.context().root_folder.clone();
        let hosts = inventory.find_by_type(&root, EntityType::HostSystem).await.unwrap();

        let values = inventory
            .entity_props(&hosts["esx1"], &[props::NAME, "summary.bogus"])
            .await
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[props::NAME].as_str(), Some("esx1"));
        assert!(!values.contains_key("summary.bogus"));
    }

    #[tokio::test]
    async fn test_add_nic_assigns_devices_and_rejects_duplicates() {
        let inventory = MockInventory::new().with_host("DC1", "esx1");
        let root = inventory.context().root_folder.clone();
        let hosts = inventory.find_by_type(&root, EntityType::HostSystem).await.unwrap();
        let values = inventory
            .entity_props(&hosts["esx1"], &[props::NETWORK_SYSTEM])
            .await
            .unwrap();
        let nw = values[props::NETWORK_SYSTEM].as_moref().unwrap().clone();
        let spec = HostVirtualNicSpec::for_address(None);

        assert_eq!(inventory.add_virtual_nic(&nw, "PG1", &spec).await.unwrap(), "vmk0");
        assert_eq!(inventory.add_virtual_nic(&nw, "PG2", &spec).await.unwrap(), "vmk1");

        let err = inventory.add_virtual_nic(&nw, "PG1", &spec).await.unwrap_err();
        assert_eq!(err, InventoryError::AlreadyExists("PG1".to_string()));
        assert_eq!(inventory.mutating_calls(), 3);
        assert_eq!(inventory.nics().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_fault_is_returned_once() {
        let inventory = MockInventory::new().with_host("DC1", "esx1");
        let root = inventory.context().root_folder.clone();
        let hosts = inventory.find_by_type(&root, EntityType::HostSystem).await.unwrap();
        let values = inventory
            .entity_props(&hosts["esx1"], &[props::NETWORK_SYSTEM])
            .await
            .unwrap();
        let nw = values[props::NETWORK_SYSTEM].as_moref().unwrap().clone();
        let spec = HostVirtualNicSpec::for_address(Some("10.0.0.5"));

        inventory.fail_next_add(InventoryError::InvalidState("host in maintenance".to_string()));
        assert!(matches!(
            inventory.add_virtual_nic(&nw, "PG1", &spec).await,
            Err(InventoryError::InvalidState(_))
        ));
        assert!(inventory.add_virtual_nic(&nw, "PG1", &spec).await.is_ok());
    }

    #[tokio::test]
    async fn test_seeded_port_groups_are_enforced() {
        let seed: MockSeed = MockSeed {
            datacenters: vec![MockDatacenter {
                name: "DC1".to_string(),
                hosts: vec![MockHost {
                    name: "esx1".to_string(),
                    port_groups: vec!["Management".to_string()],
                }],
            }],
        };
        let inventory = MockInventory::from_seed(&seed);
        let root = inventory.context().root_folder.clone();
        let hosts = inventory.find_by_type(&root, EntityType::HostSystem).await.unwrap();
        let values = inventory
            .entity_props(&hosts["esx1"], &[props::NETWORK_SYSTEM])
            .await
            .unwrap();
        let nw = values[props::NETWORK_SYSTEM].as_moref().unwrap().clone();
        let spec = HostVirtualNicSpec::for_address(None);

        assert!(matches!(
            inventory.add_virtual_nic(&nw, "vMotion", &spec).await,
            Err(InventoryError::HostConfig(_))
        ));
        assert!(inventory.add_virtual_nic(&nw, "Management", &spec).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_folder_is_a_runtime_fault() {
        let inventory = MockInventory::new();
        let bogus = ManagedObjectRef::new("Folder", "group-missing");

        let err = inventory.find_by_type(&bogus, EntityType::HostSystem).await.unwrap_err();
        assert!(matches!(err, InventoryError::Runtime(_)));
    }
}

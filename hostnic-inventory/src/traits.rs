//! Core inventory client abstraction trait.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::*;

/// Client capability set for a management endpoint.
///
/// The provisioning workflow only ever talks to the inventory through this
/// trait, so it runs unchanged against a live vim25 endpoint or the in-memory
/// mock.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Session this client is bound to.
    fn context(&self) -> &ConnectionContext;

    // =========================================================================
    // Reads
    // =========================================================================

    /// Find every object of `entity` type below `folder` (recursively).
    ///
    /// Returns a map from object name to reference. Names are unique within
    /// the result; if the inventory holds duplicates the last one wins.
    async fn find_by_type(
        &self,
        folder: &ManagedObjectRef,
        entity: EntityType,
    ) -> Result<HashMap<String, ManagedObjectRef>>;

    /// Read the given property paths of an object.
    ///
    /// Paths the object has no value for are absent from the result.
    async fn entity_props(
        &self,
        obj: &ManagedObjectRef,
        paths: &[&str],
    ) -> Result<HashMap<String, PropertyValue>>;

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a VMkernel NIC to `port_group` on the host owning `network_system`.
    ///
    /// Returns the device name of the new NIC (e.g. `vmk1`).
    async fn add_virtual_nic(
        &self,
        network_system: &ManagedObjectRef,
        port_group: &str,
        spec: &HostVirtualNicSpec,
    ) -> Result<String>;
}

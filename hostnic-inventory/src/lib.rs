//! # hostnic Inventory
//!
//! Client abstraction over a virtualization management inventory.
//!
//! This crate provides a single interface for the inventory reads and host
//! network mutations the provisioning tools need, with two backends:
//! - **vim25 SOAP** (primary) - vCenter Server or standalone ESXi
//! - **Mock** - in-memory inventory for tests and development
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         InventoryClient Trait           │
//! │ (find_by_type, entity_props, add_nic)   │
//! └─────────────────────┬───────────────────┘
//!                       │
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//! ┌───────────────────┐     ┌───────────────────┐
//! │     VimClient     │     │   MockInventory   │
//! │   (SOAP /sdk)     │     │    (in-memory)    │
//! └───────────────────┘     └───────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hostnic_inventory::{EntityType, InventoryClient, MockInventory};
//!
//! #[tokio::main]
//! async fn main() {
//!     let inventory = MockInventory::new().with_host("DC1", "esx1");
//!     let root = inventory.context().root_folder.clone();
//!
//!     let hosts = inventory.find_by_type(&root, EntityType::HostSystem).await.unwrap();
//!     assert!(hosts.contains_key("esx1"));
//! }
//! ```

pub mod error;
pub mod traits;
pub mod types;
pub mod mock;
pub mod vim;

pub use error::{InventoryError, Result};
pub use traits::InventoryClient;
pub use types::*;
pub use mock::{MockDatacenter, MockHost, MockInventory, MockSeed, NicRecord};
pub use vim::{VimClient, VimSettings, DEFAULT_API_VERSION};

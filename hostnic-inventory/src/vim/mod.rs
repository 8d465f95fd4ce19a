//! vim25 SOAP backend.
//!
//! Talks to a vCenter Server or standalone ESXi host over the SOAP API at
//! `https://<endpoint>/sdk`. Only the handful of calls the provisioning
//! workflow needs are implemented:
//!
//! - `RetrieveServiceContent`, `Login`, `Logout`
//! - `CreateContainerView`, `DestroyView`
//! - `RetrievePropertiesEx`, `ContinueRetrievePropertiesEx`
//! - `AddVirtualNic`

mod client;
mod envelope;
mod response;

pub use client::{VimClient, VimSettings, DEFAULT_API_VERSION};

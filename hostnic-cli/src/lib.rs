//! # hostnic CLI
//!
//! Library side of the `add-virtual-nic` command: argument parsing,
//! configuration and the provisioning workflow.

pub mod cli;
pub mod config;
pub mod workflow;

pub use config::{Config, ConfigError};
pub use workflow::{
    build_nic_spec, DatacenterHostPolicy, HostResolution, NicProvisioningWorkflow,
    ProvisionOutcome, ProvisionRequest,
};

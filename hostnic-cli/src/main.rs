//! # add-virtual-nic
//!
//! Adds a VMkernel NIC to a port group on a managed host. The host is looked
//! up by name, optionally inside a datacenter; the NIC gets a static address
//! when `--ipaddress` is given and uses DHCP otherwise.
//!
//! ## Usage
//! ```bash
//! add-virtual-nic --url https://vcenter/sdk --username admin --password secret \
//!     --datacentername DC1 --hostname esx1 --portgroupname PG1 --ipaddress 10.0.0.5
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use hostnic_cli::cli::Args;
use hostnic_cli::config::{Config, LogFormat};
use hostnic_cli::workflow::{NicProvisioningWorkflow, ProvisionRequest};
use hostnic_inventory::{InventoryClient, MockInventory, VimClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::from_args(&args)?;

    // Initialize logging
    match config.logging.format {
        LogFormat::Pretty => hostnic_common::init_logging(&config.logging.level)?,
        LogFormat::Json => hostnic_common::init_logging_json(&config.logging.level)?,
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting add-virtual-nic"
    );

    config.validate(args.dev)?;
    let request = config.provision_request()?;

    if args.dev {
        info!("Development mode, using mock inventory");
        let inventory = MockInventory::from_seed(&config.mock);
        return provision(&inventory, &request).await;
    }

    let settings = config.vim_settings()?;
    let client = VimClient::connect(&settings)
        .await
        .with_context(|| format!("Failed to connect to {}", settings.url))?;

    let result = provision(&client, &request).await;

    if let Err(e) = client.logout().await {
        warn!(error = %e, "Logout failed");
    }

    result
}

/// Run the workflow and print its outcome.
async fn provision<C: InventoryClient>(client: &C, request: &ProvisionRequest) -> Result<()> {
    let ctx = client.context().clone();
    let outcome = NicProvisioningWorkflow::new(client, &ctx).run(request).await?;

    println!("{}", outcome);
    Ok(())
}

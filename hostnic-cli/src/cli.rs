//! Command-line argument parsing.

use clap::Parser;

/// add-virtual-nic - Add a virtual NIC to a port group on a host
#[derive(Parser, Debug, Default)]
#[command(name = "add-virtual-nic")]
#[command(about = "Add a VMkernel NIC to a port group on a managed host")]
#[command(version)]
pub struct Args {
    /// Path to configuration file (optional, defaults used if not found)
    #[arg(short, long)]
    pub config: Option<String>,

    /// URL of the web service (e.g., https://vcenter.example.com/sdk)
    #[arg(long, env = "HOSTNIC_URL")]
    pub url: Option<String>,

    /// Username for the authentication
    #[arg(long, env = "HOSTNIC_USERNAME")]
    pub username: Option<String>,

    /// Password for the authentication
    #[arg(long, env = "HOSTNIC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Name of the port group
    #[arg(long)]
    pub portgroupname: Option<String>,

    /// IP address for the NIC; DHCP is used when not set
    #[arg(long)]
    pub ipaddress: Option<String>,

    /// Name of the host
    #[arg(long)]
    pub hostname: Option<String>,

    /// Name of the datacenter
    #[arg(long)]
    pub datacentername: Option<String>,

    /// With --datacentername and no --hostname, use the first host of the datacenter
    #[arg(long)]
    pub any_host_in_datacenter: bool,

    /// Accept invalid or self-signed endpoint certificates
    #[arg(long)]
    pub insecure: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Enable development mode (mock inventory seeded from the config file)
    #[arg(long)]
    pub dev: bool,
}

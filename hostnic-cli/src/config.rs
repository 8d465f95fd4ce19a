//! Configuration management for add-virtual-nic.
//!
//! Settings come from an optional YAML file and are overridden by command-line
//! arguments. Required parameters are checked by [`Config::validate`] before
//! anything talks to the endpoint.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use hostnic_inventory::{MockSeed, VimSettings, DEFAULT_API_VERSION};

use crate::cli::Args;
use crate::workflow::{DatacenterHostPolicy, ProvisionRequest};

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostnic/hostnic.yaml";

/// Rejected input.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Management endpoint connection
    pub connection: ConnectionConfig,
    /// NIC to create and where
    pub nic: NicConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Inventory used by the mock backend (`--dev`)
    pub mock: MockSeed,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// Load the file named by `--config`, or the default file if it exists,
    /// then apply the command-line overrides.
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };
        Ok(config.with_cli_overrides(args))
    }

    /// Apply CLI argument overrides to the configuration.
    pub fn with_cli_overrides(mut self, args: &Args) -> Self {
        override_with(&mut self.connection.url, &args.url);
        override_with(&mut self.connection.username, &args.username);
        override_with(&mut self.connection.password, &args.password);

        if args.insecure {
            self.connection.insecure = true;
        }

        override_with(&mut self.nic.port_group, &args.portgroupname);
        override_with(&mut self.nic.ip_address, &args.ipaddress);
        override_with(&mut self.nic.host_name, &args.hostname);
        override_with(&mut self.nic.datacenter_name, &args.datacentername);

        if args.any_host_in_datacenter {
            self.nic.host_policy = DatacenterHostPolicy::Any;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }

        if args.log_json {
            self.logging.format = LogFormat::Json;
        }

        self
    }

    /// Check that every required parameter is present.
    ///
    /// Connection parameters are not needed when the mock inventory is used.
    pub fn validate(&self, dev: bool) -> std::result::Result<(), ConfigError> {
        if !dev {
            require(&self.connection.url, "url")?;
            require(&self.connection.username, "username")?;
            require(&self.connection.password, "password")?;
        }
        require(&self.nic.port_group, "portgroupname")?;
        Ok(())
    }

    /// Connection settings for the vim25 backend.
    pub fn vim_settings(&self) -> std::result::Result<VimSettings, ConfigError> {
        Ok(VimSettings {
            url: require(&self.connection.url, "url")?.to_string(),
            username: require(&self.connection.username, "username")?.to_string(),
            password: require(&self.connection.password, "password")?.to_string(),
            insecure: self.connection.insecure,
            api_version: self.connection.api_version.clone(),
        })
    }

    /// The provisioning request described by the `nic` section.
    pub fn provision_request(&self) -> std::result::Result<ProvisionRequest, ConfigError> {
        Ok(ProvisionRequest {
            port_group: require(&self.nic.port_group, "portgroupname")?.to_string(),
            ip_address: self.nic.ip_address.clone(),
            host_name: self.nic.host_name.clone(),
            datacenter_name: self.nic.datacenter_name.clone(),
            host_policy: self.nic.host_policy,
        })
    }
}

fn override_with(target: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        *target = Some(value.clone());
    }
}

fn require<'a>(
    value: &'a Option<String>,
    name: &'static str,
) -> std::result::Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingParameter(name))
}

/// Management endpoint connection configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// SDK URL of the endpoint
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Accept invalid or self-signed certificates
    pub insecure: bool,
    /// API version for the SOAPAction header
    pub api_version: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            insecure: false,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("insecure", &self.insecure)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// NIC provisioning parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NicConfig {
    /// Port group to attach the NIC to
    pub port_group: Option<String>,
    /// Static address (DHCP when unset)
    pub ip_address: Option<String>,
    pub host_name: Option<String>,
    pub datacenter_name: Option<String>,
    /// Host choice when only a datacenter is given
    pub host_policy: DatacenterHostPolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

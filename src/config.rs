use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use log::{info, warn};

use crate::model::MAX_PRECISION;
use crate::packer::PackOptions;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub packer: PackerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            packer: PackerConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "BINPACK3D_API_HOST";
    const PORT_VAR: &'static str = "BINPACK3D_API_PORT";

    fn from_env() -> Self {
        Self::from_values(env_string(Self::HOST_VAR), env_string(Self::PORT_VAR))
    }

    fn from_values(host: Option<String>, port: Option<String>) -> Self {
        let host_value = host.unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match port {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Default options for packing runs; requests may override each field.
#[derive(Clone, Debug)]
pub struct PackerConfig {
    options: PackOptions,
}

impl PackerConfig {
    const BIGGER_FIRST_VAR: &'static str = "BINPACK3D_BIGGER_FIRST";
    const DISTRIBUTE_ITEMS_VAR: &'static str = "BINPACK3D_DISTRIBUTE_ITEMS";
    const PRECISION_VAR: &'static str = "BINPACK3D_PRECISION";

    fn from_env() -> Self {
        let bigger_first = env_string(Self::BIGGER_FIRST_VAR)
            .and_then(|raw| parse_bool(&raw, Self::BIGGER_FIRST_VAR))
            .unwrap_or(PackOptions::DEFAULT_BIGGER_FIRST);

        let distribute_items = env_string(Self::DISTRIBUTE_ITEMS_VAR)
            .and_then(|raw| parse_bool(&raw, Self::DISTRIBUTE_ITEMS_VAR))
            .unwrap_or(PackOptions::DEFAULT_DISTRIBUTE_ITEMS);

        let precision = parse_precision(env_string(Self::PRECISION_VAR), Self::PRECISION_VAR);

        let options = PackOptions::builder()
            .bigger_first(bigger_first)
            .distribute_items(distribute_items)
            .precision(precision)
            .build();

        Self { options }
    }

    /// Returns the configured default options.
    pub fn pack_options(&self) -> PackOptions {
        self.options
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("⚠️ Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_precision(raw: Option<String>, var_name: &str) -> u32 {
    let default = PackOptions::DEFAULT_PRECISION;
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse::<u32>() {
        Ok(value) if value <= MAX_PRECISION => {
            if value != default {
                info!("ℹ️ Packing with {} decimals ({} = {}).", value, var_name, value);
            }
            value
        }
        Ok(value) => {
            warn!(
                "⚠️ {} contains invalid value '{}': must be between 0 and {}. Using {}.",
                var_name, value, MAX_PRECISION, default
            );
            default
        }
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}') as non-negative integer: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

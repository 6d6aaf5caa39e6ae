//! config-rs/lib.rs
//! Shared service addressing utilities
//! Resolves listen ports and bind addresses from the environment

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Generic fallback consulted when the service-specific variable is unset
pub const GENERIC_PORT_VAR: &str = "PORT";

/// Generic bind host fallback
pub const GENERIC_ADDR_VAR: &str = "BIND_ADDR";

fn lookup(var_name: &str) -> Option<String> {
    env::var(var_name).ok().filter(|value| !value.trim().is_empty())
}

/// Get service port from environment variables with proper fallback
///
/// Reads `<SERVICE>_SERVICE_PORT`, then `PORT`. A value that is not a valid
/// port is logged and ignored.
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "INTENT_GATEWAY")
/// * `default_port` - The default port to use if not specified in environment
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());

    for name in [var_name.as_str(), GENERIC_PORT_VAR] {
        if let Some(value) = lookup(name) {
            match value.trim().parse::<u16>() {
                Ok(port) => return port,
                Err(_) => log::warn!("Invalid port in {}: {:?}, ignoring", name, value),
            }
        }
    }

    default_port
}

/// Parse a bind address given as `host:port`, `http(s)://host:port` or a bare IP
fn parse_bind_address(value: &str, port: u16) -> Option<SocketAddr> {
    let value = value.trim();
    let value = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"))
        .unwrap_or(value)
        .trim_end_matches('/');

    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Some(addr);
    }

    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, port))
}

/// Create a SocketAddr for binding a service
///
/// `<SERVICE>_SERVICE_ADDR` may carry a full socket address; `BIND_ADDR`
/// may carry a host with or without a port. Hosts without a port use
/// [`get_service_port`]. Falls back to `0.0.0.0`.
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "INTENT_GATEWAY")
/// * `default_port` - The default port to use if not specified in environment
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());
    let port = get_service_port(service_name, default_port);

    for name in [var_name.as_str(), GENERIC_ADDR_VAR] {
        if let Some(value) = lookup(name) {
            match parse_bind_address(&value, port) {
                Some(addr) => return addr,
                None => log::warn!("Invalid address format in {}, ignoring", name),
            }
        }
    }

    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
}

/// Get service name for logging and monitoring
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "INTENT_GATEWAY")
pub fn get_formatted_service_name(service_name: &str) -> String {
    service_name.to_lowercase().replace('_', "-")
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{Result, RuntimeError};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Static interface settings handed to clients on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireguardSettings {
	pub subnet: Ipv4Net,
	pub restricted_subnet: Option<Ipv4Net>,
	pub server_ipv4: Option<Ipv4Addr>,
	pub server_port: u16,
	pub keepalive_secs: u16,
	pub dns: Vec<Ipv4Addr>,
}

impl Default for WireguardSettings {
	fn default() -> Self {
		Self {
			subnet: "10.123.0.0/16".parse().unwrap(),
			restricted_subnet: None,
			server_ipv4: None,
			server_port: 51820,
			keepalive_secs: 25,
			dns: Vec::new(),
		}
	}
}

/// Static server configuration loaded at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
	pub log_level: String,
	pub config_dir: PathBuf,
	pub wireguard: WireguardSettings,
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			log_level: "info".to_string(),
			config_dir: PathBuf::from("/etc/burrow"),
			wireguard: WireguardSettings::default(),
		}
	}
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Result<Option<T>> {
	match std::env::var(var) {
		Ok(value) => value
			.parse()
			.map(Some)
			.map_err(|_| RuntimeError::InvalidConfiguration {
				var: var.to_string(),
				value,
			}),
		Err(_) => Ok(None),
	}
}

impl ServerSettings {
	pub fn from_env() -> Result<Self> {
		let mut settings = Self::default();

		if let Ok(level) = std::env::var("BURROW_LOG_LEVEL") {
			settings.log_level = level;
		}
		if let Ok(dir) = std::env::var("BURROW_CONFIG_DIR") {
			settings.config_dir = PathBuf::from(dir);
		}
		if let Some(subnet) = parse_env::<Ipv4Net>("BURROW_WG_SUBNET")? {
			settings.wireguard.subnet = subnet;
		}
		if let Some(subnet) = parse_env::<Ipv4Net>("BURROW_WG_RESTRICTED_SUBNET")? {
			settings.wireguard.restricted_subnet = Some(subnet);
		}
		if let Some(addr) = parse_env::<Ipv4Addr>("BURROW_WG_SERVER_IPV4")? {
			settings.wireguard.server_ipv4 = Some(addr);
		}
		if let Some(port) = parse_env::<u16>("BURROW_WG_SERVER_PORT")? {
			settings.wireguard.server_port = port;
		}
		if let Some(secs) = parse_env::<u16>("BURROW_WG_KEEPALIVE_SECS")? {
			settings.wireguard.keepalive_secs = secs;
		}
		if let Ok(dns) = std::env::var("BURROW_WG_DNS") {
			let mut servers = Vec::new();
			for entry in dns.split(',').filter(|s| !s.trim().is_empty()) {
				let addr =
					entry
						.trim()
						.parse()
						.map_err(|_| RuntimeError::InvalidConfiguration {
							var: "BURROW_WG_DNS".to_string(),
							value: dns.clone(),
						})?;
				servers.push(addr);
			}
			settings.wireguard.dns = servers;
		}

		Ok(settings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_sensible() {
		let settings = ServerSettings::default();
		assert_eq!(settings.log_level, "info");
		assert_eq!(settings.wireguard.server_port, 51820);
		assert_eq!(settings.wireguard.keepalive_secs, 25);
		assert!(settings.wireguard.server_ipv4.is_none());
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid value for {var}: {value}")]
	InvalidValue { var: String, value: String },
}

/// Batching policy of the traffic event sender. Thresholds at or below
/// zero are disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficConfig {
	pub send_interval: Duration,
	pub max_upstream_bytes: i64,
	pub max_downstream_bytes: i64,
}

impl Default for TrafficConfig {
	fn default() -> Self {
		Self {
			send_interval: Duration::from_secs(60),
			max_upstream_bytes: 0,
			max_downstream_bytes: 0,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeersConfig {
	pub sweep_interval: Duration,
	pub traffic: TrafficConfig,
}

impl Default for PeersConfig {
	fn default() -> Self {
		Self {
			sweep_interval: Duration::from_secs(60),
			traffic: TrafficConfig::default(),
		}
	}
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
	match std::env::var(var) {
		Ok(value) => value
			.parse()
			.map(Some)
			.map_err(|_| ConfigError::InvalidValue {
				var: var.to_string(),
				value,
			}),
		Err(_) => Ok(None),
	}
}

impl PeersConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		let mut config = Self::default();

		if let Some(secs) = parse_env::<u64>("BURROW_PEERS_SWEEP_INTERVAL_SECS")? {
			config.sweep_interval = Duration::from_secs(secs);
		}
		if let Some(secs) = parse_env::<u64>("BURROW_PEERS_TRAFFIC_SEND_INTERVAL_SECS")? {
			config.traffic.send_interval = Duration::from_secs(secs);
		}
		if let Some(bytes) = parse_env::<i64>("BURROW_PEERS_MAX_UPSTREAM_TRAFFIC_CHANGE")? {
			config.traffic.max_upstream_bytes = bytes;
		}
		if let Some(bytes) = parse_env::<i64>("BURROW_PEERS_MAX_DOWNSTREAM_TRAFFIC_CHANGE")? {
			config.traffic.max_downstream_bytes = bytes;
		}

		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_one_minute_with_thresholds_disabled() {
		let config = PeersConfig::default();
		assert_eq!(config.sweep_interval, Duration::from_secs(60));
		assert_eq!(config.traffic.send_interval, Duration::from_secs(60));
		assert_eq!(config.traffic.max_upstream_bytes, 0);
		assert_eq!(config.traffic.max_downstream_bytes, 0);
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use prometheus::{Encoder, Gauge, IntGauge, Registry, TextEncoder};

/// Control-plane gauges. The registry is owned here and injected where
/// needed; nothing registers against the process-global default.
pub struct Metrics {
	registry: Registry,

	pub peers: Gauge,
	pub peers_with_handshake: Gauge,
	pub link_upstream_bytes: IntGauge,
	pub link_downstream_bytes: IntGauge,
}

impl Default for Metrics {
	fn default() -> Self {
		Self::new()
	}
}

impl Metrics {
	pub fn new() -> Self {
		let registry = Registry::new();

		let peers = Gauge::new("burrow_tunnel_peers", "Peers programmed on the data plane").unwrap();
		registry.register(Box::new(peers.clone())).unwrap();

		let peers_with_handshake = Gauge::new(
			"burrow_tunnel_peers_with_handshake",
			"Peers with a completed handshake",
		)
		.unwrap();
		registry
			.register(Box::new(peers_with_handshake.clone()))
			.unwrap();

		let link_upstream_bytes = IntGauge::new(
			"burrow_tunnel_link_upstream_bytes",
			"Cumulative upstream bytes on the tunnel interface",
		)
		.unwrap();
		registry
			.register(Box::new(link_upstream_bytes.clone()))
			.unwrap();

		let link_downstream_bytes = IntGauge::new(
			"burrow_tunnel_link_downstream_bytes",
			"Cumulative downstream bytes on the tunnel interface",
		)
		.unwrap();
		registry
			.register(Box::new(link_downstream_bytes.clone()))
			.unwrap();

		Metrics {
			registry,
			peers,
			peers_with_handshake,
			link_upstream_bytes,
			link_downstream_bytes,
		}
	}

	pub fn encode(&self) -> String {
		let encoder = TextEncoder::new();
		let mut buffer = Vec::new();
		encoder.encode(&self.registry.gather(), &mut buffer).unwrap();
		String::from_utf8(buffer).unwrap()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn gauges_appear_in_exposition() {
		let metrics = Metrics::new();
		metrics.peers.inc();
		metrics.peers.inc();
		metrics.link_upstream_bytes.set(1024);

		let text = metrics.encode();
		assert!(text.contains("burrow_tunnel_peers 2"));
		assert!(text.contains("burrow_tunnel_link_upstream_bytes 1024"));
	}

	#[test]
	fn registries_are_independent() {
		let a = Metrics::new();
		let b = Metrics::new();
		a.peers.inc();
		assert_eq!(b.peers.get(), 0.0);
	}
}

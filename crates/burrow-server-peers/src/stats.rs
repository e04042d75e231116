// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Classification of persisted peers against the live data plane.

use burrow_tunnel_common::{LinkStats, PeerInfo, WgPeerStatus, WgPublicKey};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

const ACTIVE_HOUR_SECS: i64 = 3600;
const ACTIVE_DAY_SECS: i64 = 86400;

/// Snapshot served to status consumers; rebuilt by every sweep.
///
/// `upstream`/`downstream` integrate the deltas between consecutive
/// link-stat samples and are monotone across the server's lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CachedStatistics {
	pub peers_total: usize,
	pub peers_with_traffic: usize,
	pub peers_active_last_hour: usize,
	pub peers_active_last_day: usize,
	pub link_stat: Option<LinkStats>,
	pub upstream: i64,
	pub downstream: i64,
}

/// Outcome of one classification pass over the persisted peers.
#[derive(Debug, Default)]
pub struct PeerStatsReport {
	pub num_peers: usize,
	pub num_with_handshakes: usize,
	pub num_active_last_hour: usize,
	pub num_active_last_day: usize,
	pub expired_peers: Vec<PeerInfo>,
	pub updated_peers: Vec<PeerInfo>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatsService;

impl StatsService {
	pub fn new() -> Self {
		Self
	}

	/// Joins persisted peers with the data-plane snapshot: flags expired
	/// peers, mirrors counters and handshake times into updated copies,
	/// and counts activity windows relative to `now`.
	pub fn update_peer_stats(
		&self,
		peers: Vec<PeerInfo>,
		wg_peers: &HashMap<WgPublicKey, WgPeerStatus>,
		now: DateTime<Utc>,
	) -> PeerStatsReport {
		let mut report = PeerStatsReport::default();

		for mut peer in peers {
			if peer.expired() {
				report.expired_peers.push(peer);
				continue;
			}
			report.num_peers += 1;

			let key = match peer.wireguard_public_key {
				Some(key) => key,
				None => {
					warn!(id = peer.id, "peer record has no public key");
					continue;
				}
			};

			let status = match wg_peers.get(&key) {
				Some(status) => status,
				None => {
					warn!(
						id = peer.id,
						public_key = %key,
						"peer is persisted but not configured on the interface"
					);
					continue;
				}
			};

			let changed = peer.upstream != Some(status.rx_bytes)
				|| peer.downstream != Some(status.tx_bytes)
				|| peer.last_handshake != status.last_handshake;

			peer.upstream = Some(status.rx_bytes);
			peer.downstream = Some(status.tx_bytes);
			peer.last_handshake = status.last_handshake;

			if let Some(handshake) = status.last_handshake {
				report.num_with_handshakes += 1;
				let age = now.signed_duration_since(handshake);
				if age <= Duration::seconds(ACTIVE_HOUR_SECS) {
					report.num_active_last_hour += 1;
				}
				if age <= Duration::seconds(ACTIVE_DAY_SECS) {
					report.num_active_last_day += 1;
				}
			}

			if changed {
				report.updated_peers.push(peer);
			}
		}

		report
	}
}

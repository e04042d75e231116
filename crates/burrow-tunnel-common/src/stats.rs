// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::keys::WgPublicKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Live data-plane state of one configured peer.
///
/// From the server's perspective `rx_bytes` is upstream traffic
/// (client to server) and `tx_bytes` is downstream. Both are cumulative
/// and reset when the interface restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WgPeerStatus {
	pub public_key: WgPublicKey,
	pub rx_bytes: i64,
	pub tx_bytes: i64,
	#[serde(default)]
	pub last_handshake: Option<DateTime<Utc>>,
	#[serde(default)]
	pub endpoint: Option<SocketAddr>,
}

/// Interface-level counters, independent of per-peer state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
	pub rx_bytes: u64,
	pub rx_packets: u64,
	pub rx_errors: u64,
	pub tx_bytes: u64,
	pub tx_packets: u64,
	pub tx_errors: u64,
}

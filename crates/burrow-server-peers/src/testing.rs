// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test doubles for the data-plane and event-log collaborators.

use crate::eventlog::{EventLog, EventLogError};
use crate::wireguard::{WireguardError, WireguardService};
use async_trait::async_trait;
use burrow_tunnel_common::{EventKind, LinkStats, PeerInfo, TunnelEvent, WgPeerStatus, WgPublicKey};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct MockWireguardState {
	peers: HashMap<WgPublicKey, WgPeerStatus>,
	link: LinkStats,
	fail_set_peer: bool,
	fail_unset_peer: bool,
}

/// In-memory stand-in for the tunnel interface, with failure injection.
#[derive(Default)]
pub struct MockWireguard {
	state: Mutex<MockWireguardState>,
}

impl MockWireguard {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_set_peer(&self, fail: bool) {
		self.state.lock().fail_set_peer = fail;
	}

	pub fn fail_unset_peer(&self, fail: bool) {
		self.state.lock().fail_unset_peer = fail;
	}

	pub fn set_link_statistics(&self, link: LinkStats) {
		self.state.lock().link = link;
	}

	/// Overwrite a configured peer's counters and handshake time, as the
	/// kernel would between two sweeps.
	pub fn set_peer_traffic(
		&self,
		key: WgPublicKey,
		rx_bytes: i64,
		tx_bytes: i64,
		last_handshake: Option<DateTime<Utc>>,
	) {
		let mut state = self.state.lock();
		if let Some(status) = state.peers.get_mut(&key) {
			status.rx_bytes = rx_bytes;
			status.tx_bytes = tx_bytes;
			status.last_handshake = last_handshake;
		}
	}

	pub fn has_peer(&self, key: &WgPublicKey) -> bool {
		self.state.lock().peers.contains_key(key)
	}

	pub fn peer_count(&self) -> usize {
		self.state.lock().peers.len()
	}
}

#[async_trait]
impl WireguardService for MockWireguard {
	async fn set_peer(&self, peer: &PeerInfo) -> crate::wireguard::Result<()> {
		let key = peer
			.wireguard_public_key
			.ok_or(WireguardError::MissingPublicKey)?;
		let mut state = self.state.lock();
		if state.fail_set_peer {
			return Err(WireguardError::Device("injected set_peer failure".to_string()));
		}
		// Overwriting an existing entry keeps its counters, as the
		// kernel does.
		state.peers.entry(key).or_insert(WgPeerStatus {
			public_key: key,
			rx_bytes: 0,
			tx_bytes: 0,
			last_handshake: None,
			endpoint: None,
		});
		Ok(())
	}

	async fn unset_peer(&self, peer: &PeerInfo) -> crate::wireguard::Result<()> {
		let key = peer
			.wireguard_public_key
			.ok_or(WireguardError::MissingPublicKey)?;
		let mut state = self.state.lock();
		if state.fail_unset_peer {
			return Err(WireguardError::Device("injected unset_peer failure".to_string()));
		}
		state.peers.remove(&key);
		Ok(())
	}

	async fn peers(&self) -> crate::wireguard::Result<HashMap<WgPublicKey, WgPeerStatus>> {
		Ok(self.state.lock().peers.clone())
	}

	async fn link_statistics(&self) -> crate::wireguard::Result<LinkStats> {
		Ok(self.state.lock().link)
	}
}

#[derive(Default)]
struct RecordingState {
	events: Vec<TunnelEvent>,
	fail: bool,
}

/// Event log that records every push, with failure injection.
#[derive(Default)]
pub struct RecordingEventLog {
	state: Mutex<RecordingState>,
}

impl RecordingEventLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_pushes(&self, fail: bool) {
		self.state.lock().fail = fail;
	}

	pub fn count(&self, kind: EventKind) -> usize {
		self.state
			.lock()
			.events
			.iter()
			.filter(|event| event.kind == kind)
			.count()
	}

	pub fn events_of(&self, kind: EventKind) -> Vec<PeerInfo> {
		self.state
			.lock()
			.events
			.iter()
			.filter(|event| event.kind == kind)
			.map(|event| event.peer.clone())
			.collect()
	}

	pub fn total(&self) -> usize {
		self.state.lock().events.len()
	}
}

#[async_trait]
impl EventLog for RecordingEventLog {
	async fn push(&self, event: TunnelEvent) -> crate::eventlog::Result<()> {
		let mut state = self.state.lock();
		if state.fail {
			return Err(EventLogError::Push("injected push failure".to_string()));
		}
		state.events.push(event);
		Ok(())
	}
}

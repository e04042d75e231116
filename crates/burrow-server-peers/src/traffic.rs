// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batching of per-peer traffic events.
//!
//! The sweep refreshes counters every tick; pushing an event per peer per
//! tick would flood the log. Updates accumulate here and drain on the send
//! interval, or immediately once the accumulated byte change exceeds a
//! configured threshold.

use crate::config::TrafficConfig;
use crate::eventlog::EventLog;
use burrow_tunnel_common::{EventKind, PeerInfo, TunnelEvent, WgPublicKey};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

#[derive(Default)]
struct TrafficState {
	/// Last-seen record per public key, the delta baseline.
	peers: HashMap<WgPublicKey, PeerInfo>,
	/// Records awaiting the next flush.
	updated: HashMap<WgPublicKey, PeerInfo>,
	upstream_delta: i64,
	downstream_delta: i64,
}

pub struct TrafficEventSender {
	event_log: Arc<dyn EventLog>,
	config: TrafficConfig,
	state: Mutex<TrafficState>,
	shutdown_tx: watch::Sender<bool>,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl TrafficEventSender {
	pub async fn new(
		event_log: Arc<dyn EventLog>,
		config: TrafficConfig,
		initial_peers: &[PeerInfo],
	) -> Arc<Self> {
		let mut peers = HashMap::new();
		for peer in initial_peers {
			if let Some(key) = peer.wireguard_public_key {
				peers.insert(key, peer.clone());
			}
		}

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let sender = Arc::new(Self {
			event_log,
			config,
			state: Mutex::new(TrafficState {
				peers,
				..Default::default()
			}),
			shutdown_tx,
			worker: Mutex::new(None),
		});

		let handle = Arc::clone(&sender).spawn_flush_loop(shutdown_rx);
		*sender.worker.lock().await = Some(handle);
		sender
	}

	fn spawn_flush_loop(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
		let period = self.config.send_interval;
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(period);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
			// The first tick of an interval completes immediately.
			ticker.tick().await;
			debug!(interval = ?period, "traffic event sender started");

			loop {
				tokio::select! {
					biased;

					_ = shutdown_rx.changed() => {
						if *shutdown_rx.borrow() {
							info!("traffic event sender shutting down");
							break;
						}
					}

					_ = ticker.tick() => {
						let mut state = self.state.lock().await;
						self.flush_locked(&mut state).await;
					}
				}
			}
		})
	}

	/// Track a new peer as a delta baseline. Peers without a public key
	/// are ignored.
	pub async fn add(&self, peer: &PeerInfo) {
		let key = match peer.wireguard_public_key {
			Some(key) => key,
			None => return,
		};
		self.state.lock().await.peers.insert(key, peer.clone());
	}

	pub async fn remove(&self, peer: &PeerInfo) {
		let key = match peer.wireguard_public_key {
			Some(key) => key,
			None => return,
		};
		let mut state = self.state.lock().await;
		state.peers.remove(&key);
		state.updated.remove(&key);
	}

	/// Accumulate refreshed records against the baseline. Negative
	/// per-peer deltas (counter reset after an interface restart) are
	/// clamped to zero. Flushes immediately once a configured threshold
	/// is exceeded.
	pub async fn submit(&self, peers: &[PeerInfo]) {
		let mut state = self.state.lock().await;

		for peer in peers {
			let key = match peer.wireguard_public_key {
				Some(key) => key,
				None => continue,
			};
			// An unknown key means the peer was removed in the meantime.
			let (old_upstream, old_downstream) = match state.peers.get(&key) {
				Some(old) => (old.upstream, old.downstream),
				None => continue,
			};

			if let (Some(new), Some(old)) = (peer.upstream, old_upstream) {
				state.upstream_delta += (new - old).max(0);
			}
			if let (Some(new), Some(old)) = (peer.downstream, old_downstream) {
				state.downstream_delta += (new - old).max(0);
			}

			state.updated.insert(key, peer.clone());
			state.peers.insert(key, peer.clone());
		}

		let over_upstream =
			self.config.max_upstream_bytes > 0 && state.upstream_delta > self.config.max_upstream_bytes;
		let over_downstream = self.config.max_downstream_bytes > 0
			&& state.downstream_delta > self.config.max_downstream_bytes;
		if over_upstream || over_downstream {
			self.flush_locked(&mut state).await;
		}
	}

	/// Drain every pending update as a `PeerTraffic` event and reset the
	/// delta budgets.
	pub async fn flush(&self) {
		let mut state = self.state.lock().await;
		self.flush_locked(&mut state).await;
	}

	async fn flush_locked(&self, state: &mut TrafficState) {
		if state.updated.is_empty() {
			return;
		}

		let timestamp = Utc::now().timestamp();
		for peer in state.updated.values() {
			let event = TunnelEvent {
				kind: EventKind::PeerTraffic,
				timestamp,
				peer: peer.clone(),
			};
			if let Err(e) = self.event_log.push(event).await {
				error!(error = %e, kind = %EventKind::PeerTraffic, "failed to push event");
			}
		}

		info!(
			peers = state.updated.len(),
			upstream = %format_bytes(state.upstream_delta),
			downstream = %format_bytes(state.downstream_delta),
			"sent peer traffic updates"
		);

		state.updated.clear();
		state.upstream_delta = 0;
		state.downstream_delta = 0;
	}

	pub async fn pending_count(&self) -> usize {
		self.state.lock().await.updated.len()
	}

	/// Signal the flush worker and wait for it to finish its current
	/// iteration.
	pub async fn stop(&self) {
		let _ = self.shutdown_tx.send(true);
		if let Some(handle) = self.worker.lock().await.take() {
			let _ = handle.await;
		}
	}
}

fn format_bytes(bytes: i64) -> String {
	const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
	let mut value = bytes.max(0) as f64;
	let mut unit = 0;
	while value >= 1024.0 && unit < UNITS.len() - 1 {
		value /= 1024.0;
		unit += 1;
	}
	if unit == 0 {
		format!("{} B", bytes.max(0))
	} else {
		format!("{:.1} {}", value, UNITS[unit])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::RecordingEventLog;
	use burrow_tunnel_common::PeerIdentifiers;
	use std::time::Duration;

	fn peer(tag: u8, upstream: i64, downstream: i64) -> PeerInfo {
		let mut peer = PeerInfo::new(PeerIdentifiers {
			user_id: Some(format!("user-{tag}")),
			..Default::default()
		});
		peer.wireguard_public_key = Some(WgPublicKey::from_bytes([tag; 32]));
		peer.upstream = Some(upstream);
		peer.downstream = Some(downstream);
		peer
	}

	fn config(send_interval: Duration, max_up: i64, max_down: i64) -> TrafficConfig {
		TrafficConfig {
			send_interval,
			max_upstream_bytes: max_up,
			max_downstream_bytes: max_down,
		}
	}

	#[tokio::test]
	async fn flush_drains_pending_updates_and_resets_budgets() {
		let log = Arc::new(RecordingEventLog::new());
		let baseline = peer(1, 0, 0);
		let sender = TrafficEventSender::new(
			log.clone(),
			config(Duration::from_secs(3600), 0, 0),
			&[baseline],
		)
		.await;

		sender.submit(&[peer(1, 500, 300)]).await;
		assert_eq!(sender.pending_count().await, 1);
		assert_eq!(log.count(EventKind::PeerTraffic), 0);

		sender.flush().await;
		assert_eq!(sender.pending_count().await, 0);
		assert_eq!(log.count(EventKind::PeerTraffic), 1);

		// Nothing pending: a second flush emits nothing.
		sender.flush().await;
		assert_eq!(log.count(EventKind::PeerTraffic), 1);

		sender.stop().await;
	}

	#[tokio::test]
	async fn threshold_exceedance_flushes_immediately() {
		let log = Arc::new(RecordingEventLog::new());
		let sender = TrafficEventSender::new(
			log.clone(),
			config(Duration::from_secs(3600), 1000, 0),
			&[peer(1, 0, 0)],
		)
		.await;

		sender.submit(&[peer(1, 400, 0)]).await;
		assert_eq!(log.count(EventKind::PeerTraffic), 0);

		// 400 + 1100 > 1000: the budget spills over.
		sender.submit(&[peer(1, 1500, 0)]).await;
		assert_eq!(log.count(EventKind::PeerTraffic), 1);
		assert_eq!(sender.pending_count().await, 0);

		sender.stop().await;
	}

	#[tokio::test]
	async fn counter_reset_is_clamped_to_zero() {
		let log = Arc::new(RecordingEventLog::new());
		let sender = TrafficEventSender::new(
			log.clone(),
			config(Duration::from_secs(3600), 100, 0),
			&[peer(1, 1_000_000, 0)],
		)
		.await;

		// The interface restarted: counters went backwards. The delta
		// must not drive the budget negative (or trip the threshold).
		sender.submit(&[peer(1, 50, 0)]).await;
		assert_eq!(log.count(EventKind::PeerTraffic), 0);

		// From the new baseline a small increase stays under threshold.
		sender.submit(&[peer(1, 80, 0)]).await;
		assert_eq!(log.count(EventKind::PeerTraffic), 0);

		sender.stop().await;
	}

	#[tokio::test]
	async fn failed_pushes_still_drain_the_pending_set() {
		let log = Arc::new(RecordingEventLog::new());
		log.fail_pushes(true);
		let sender = TrafficEventSender::new(
			log.clone(),
			config(Duration::from_secs(3600), 0, 0),
			&[peer(1, 0, 0)],
		)
		.await;

		sender.submit(&[peer(1, 500, 0)]).await;
		sender.flush().await;

		// The push failed but the flush completed: pending set and
		// budgets are reset.
		assert_eq!(log.total(), 0);
		assert_eq!(sender.pending_count().await, 0);

		sender.stop().await;
	}

	#[tokio::test]
	async fn unknown_peers_are_ignored() {
		let log = Arc::new(RecordingEventLog::new());
		let sender = TrafficEventSender::new(
			log.clone(),
			config(Duration::from_secs(3600), 0, 0),
			&[],
		)
		.await;

		sender.submit(&[peer(9, 100, 100)]).await;
		assert_eq!(sender.pending_count().await, 0);

		sender.stop().await;
	}

	#[tokio::test]
	async fn removed_peer_is_dropped_from_pending() {
		let log = Arc::new(RecordingEventLog::new());
		let tracked = peer(1, 0, 0);
		let sender = TrafficEventSender::new(
			log.clone(),
			config(Duration::from_secs(3600), 0, 0),
			&[tracked.clone()],
		)
		.await;

		sender.submit(&[peer(1, 10, 10)]).await;
		sender.remove(&tracked).await;
		sender.flush().await;
		assert_eq!(log.count(EventKind::PeerTraffic), 0);

		sender.stop().await;
	}

	#[tokio::test(start_paused = true)]
	async fn interval_tick_flushes_pending_updates() {
		let log = Arc::new(RecordingEventLog::new());
		let sender = TrafficEventSender::new(
			log.clone(),
			config(Duration::from_secs(60), 0, 0),
			&[peer(1, 0, 0)],
		)
		.await;

		sender.submit(&[peer(1, 500, 300)]).await;
		assert_eq!(log.count(EventKind::PeerTraffic), 0);

		tokio::time::sleep(Duration::from_secs(61)).await;
		assert_eq!(log.count(EventKind::PeerTraffic), 1);
		assert_eq!(sender.pending_count().await, 0);

		sender.stop().await;
	}

	#[test]
	fn format_bytes_scales_units() {
		assert_eq!(format_bytes(512), "512 B");
		assert_eq!(format_bytes(2048), "2.0 KiB");
		assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
		assert_eq!(format_bytes(-10), "0 B");
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authoritative coordinator of the peer record store, the address pool
//! and the tunnel interface.
//!
//! Every mutation runs under one mutex and commits to the three
//! subsystems in a fixed order: address pool, then storage, then the
//! interface. The interface is always the last place to observe a peer,
//! so no packets are forwarded for a record that is not persisted yet.
//! Committed steps push undo entries that unwind in reverse on failure.

use crate::config::PeersConfig;
use crate::error::{PeerError, Result};
use crate::eventlog::EventLog;
use crate::metrics::Metrics;
use crate::pool::{AddressPool, PoolError};
use crate::stats::{CachedStatistics, StatsService};
use crate::storage::{PeerStorage, StorageError};
use crate::traffic::TrafficEventSender;
use crate::wireguard::WireguardService;
use burrow_tunnel_common::{
	AuthorizerKey, EventKind, PeerIdentifiers, PeerInfo, TunnelEvent, WgPublicKey,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

/// One committed step of a mutation, undone in reverse on failure.
enum Undo {
	ReleaseAddress(Ipv4Addr),
	DeleteRow(i64),
	RestoreRow(PeerInfo),
	RestoreWgPeer(PeerInfo),
}

pub struct PeerManager {
	config: PeersConfig,
	storage: Arc<dyn PeerStorage>,
	pool: Arc<dyn AddressPool>,
	wireguard: Arc<dyn WireguardService>,
	event_log: Arc<dyn EventLog>,
	stats_service: StatsService,
	traffic: Arc<TrafficEventSender>,
	metrics: Arc<Metrics>,

	/// Serializes every mutation and every sweep tick. Coarse on
	/// purpose: cross-subsystem rollback is only tractable when
	/// mutations do not interleave.
	lock: Mutex<()>,
	running: AtomicBool,
	statistics: RwLock<CachedStatistics>,
	shutdown_tx: watch::Sender<bool>,
	sweep_worker: Mutex<Option<JoinHandle<()>>>,
}

impl PeerManager {
	/// Restores persisted peers onto the interface and starts the
	/// background sweep.
	pub async fn new(
		config: PeersConfig,
		storage: Arc<dyn PeerStorage>,
		pool: Arc<dyn AddressPool>,
		wireguard: Arc<dyn WireguardService>,
		event_log: Arc<dyn EventLog>,
		metrics: Arc<Metrics>,
	) -> Arc<Self> {
		let traffic =
			TrafficEventSender::new(Arc::clone(&event_log), config.traffic.clone(), &[]).await;
		let (shutdown_tx, shutdown_rx) = watch::channel(false);

		let manager = Arc::new(Self {
			config,
			storage,
			pool,
			wireguard,
			event_log,
			stats_service: StatsService::new(),
			traffic,
			metrics,
			lock: Mutex::new(()),
			running: AtomicBool::new(false),
			statistics: RwLock::new(CachedStatistics::default()),
			shutdown_tx,
			sweep_worker: Mutex::new(None),
		});

		manager.restore_peers().await;
		manager.running.store(true, Ordering::SeqCst);

		let handle = Arc::clone(&manager).spawn_sweep_loop(shutdown_rx);
		*manager.sweep_worker.lock().await = Some(handle);

		manager
	}

	fn ensure_running(&self) -> Result<()> {
		if !self.running.load(Ordering::SeqCst) {
			return Err(PeerError::Unavailable);
		}
		Ok(())
	}

	/// Create a peer. Stamps `id` and `ipv4` on the given record.
	#[instrument(skip_all, fields(user = ?peer.identifiers.user_id))]
	pub async fn set_peer(&self, peer: &mut PeerInfo) -> Result<()> {
		self.ensure_running()?;
		let _guard = self.lock.lock().await;
		self.set_peer_locked(peer).await
	}

	/// Modify a peer. An already-expired record degenerates to removal.
	#[instrument(skip_all, fields(id = peer.id))]
	pub async fn update_peer(&self, peer: &mut PeerInfo) -> Result<()> {
		self.ensure_running()?;
		let _guard = self.lock.lock().await;
		self.update_peer_locked(peer).await
	}

	/// Idempotent onboarding keyed by `(user_id, installation_id)`: a
	/// matching live peer is updated in place, otherwise one is created.
	#[instrument(skip_all, fields(user = ?peer.identifiers.user_id))]
	pub async fn connect_peer(&self, peer: &mut PeerInfo) -> Result<()> {
		self.ensure_running()?;
		let _guard = self.lock.lock().await;

		let query = PeerIdentifiers {
			user_id: peer.identifiers.user_id.clone(),
			installation_id: peer.identifiers.installation_id,
			session_id: None,
		};
		if query.is_empty() {
			return Err(PeerError::InvalidArgument("no identifiers".to_string()));
		}

		let existing = self.storage.search_peers(Some(&query)).await?;
		match existing.len() {
			0 => self.set_peer_locked(peer).await,
			1 => {
				peer.id = existing[0].id;
				peer.ipv4 = existing[0].ipv4;
				self.update_peer_locked(peer).await
			}
			_ => Err(PeerError::Internal(
				"too many peers for identifiers".to_string(),
			)),
		}
	}

	#[instrument(skip(self))]
	pub async fn unset_peer(&self, id: i64) -> Result<()> {
		self.ensure_running()?;
		let _guard = self.lock.lock().await;

		let peer = self.get_peer_locked(id).await?;
		self.unset_peer_locked(peer).await
	}

	#[instrument(skip_all)]
	pub async fn unset_peer_by_identifiers(&self, identifiers: &PeerIdentifiers) -> Result<()> {
		self.ensure_running()?;
		let _guard = self.lock.lock().await;

		let peer = self.find_peer_by_identifiers(identifiers).await?;
		self.unset_peer_locked(peer).await
	}

	/// Re-persist the single peer matching `identifiers` with a new
	/// expiration time.
	#[instrument(skip_all)]
	pub async fn update_peer_expiration(
		&self,
		identifiers: &PeerIdentifiers,
		expires: Option<DateTime<Utc>>,
	) -> Result<()> {
		self.ensure_running()?;
		let _guard = self.lock.lock().await;

		let mut peer = self.find_peer_by_identifiers(identifiers).await?;
		peer.expires = expires;
		self.update_peer_locked(&mut peer).await
	}

	pub async fn get_peer(&self, id: i64) -> Result<PeerInfo> {
		self.ensure_running()?;
		let _guard = self.lock.lock().await;
		self.get_peer_locked(id).await
	}

	pub async fn list_peers(&self) -> Result<Vec<PeerInfo>> {
		self.ensure_running()?;
		let _guard = self.lock.lock().await;
		Ok(self.storage.search_peers(None).await?)
	}

	/// Most recent snapshot built by the sweep. Does not take the
	/// manager lock.
	pub fn cached_statistics(&self) -> Result<CachedStatistics> {
		self.ensure_running()?;
		Ok(self.statistics.read().clone())
	}

	/// Validate and upsert federation authorizer keys.
	#[instrument(skip_all, fields(keys = keys.len()))]
	pub async fn update_authorizer_keys(&self, keys: &[AuthorizerKey]) -> Result<()> {
		self.ensure_running()?;
		for key in keys {
			key.validate().map_err(|e| {
				PeerError::InvalidArgument(format!("invalid authorizer key {}: {e}", key.id))
			})?;
		}
		Ok(self.storage.update_authorizer_keys(keys).await?)
	}

	/// Run one sweep pass outside the regular schedule.
	pub async fn refresh_statistics(&self) -> Result<()> {
		self.ensure_running()?;
		let _guard = self.lock.lock().await;
		self.sweep_locked().await
	}

	/// Stops accepting operations, then drains the background workers.
	pub async fn shutdown(&self) {
		self.running.store(false, Ordering::SeqCst);
		let _ = self.shutdown_tx.send(true);
		if let Some(handle) = self.sweep_worker.lock().await.take() {
			let _ = handle.await;
		}
		self.traffic.stop().await;
		info!("peer manager stopped");
	}

	async fn get_peer_locked(&self, id: i64) -> Result<PeerInfo> {
		match self.storage.get_peer(id).await {
			Ok(peer) => Ok(peer),
			Err(StorageError::NotFound) => Err(PeerError::NotFound),
			Err(e) => Err(e.into()),
		}
	}

	/// A public key identifies one interface entry: reusing a live
	/// peer's key would silently hijack its data-plane slot.
	async fn ensure_key_unused(&self, key: Option<WgPublicKey>, own_id: i64) -> Result<()> {
		let peers = self.storage.search_peers(None).await?;
		if peers
			.iter()
			.any(|p| p.id != own_id && p.wireguard_public_key == key)
		{
			return Err(PeerError::InvalidArgument(
				"wireguard public key already in use".to_string(),
			));
		}
		Ok(())
	}

	async fn find_peer_by_identifiers(&self, identifiers: &PeerIdentifiers) -> Result<PeerInfo> {
		if identifiers.is_empty() {
			return Err(PeerError::InvalidArgument("no identifiers".to_string()));
		}

		let mut peers = self.storage.search_peers(Some(identifiers)).await?;
		match peers.len() {
			0 => Err(PeerError::NotFound),
			1 => Ok(peers.remove(0)),
			_ => Err(PeerError::InvalidArgument(
				"not enough identifiers to select a single peer".to_string(),
			)),
		}
	}

	async fn set_peer_locked(&self, peer: &mut PeerInfo) -> Result<()> {
		if peer.expired() {
			return Err(PeerError::InvalidArgument("peer already expired".to_string()));
		}
		if peer.wireguard_public_key.is_none() {
			return Err(PeerError::InvalidArgument(
				"peer has no wireguard public key".to_string(),
			));
		}
		self.ensure_key_unused(peer.wireguard_public_key, peer.id).await?;

		let mut undo = Vec::new();
		if let Err(err) = self.apply_set(peer, &mut undo).await {
			self.unwind(undo).await;
			return Err(err);
		}

		self.metrics.peers.inc();
		self.traffic.add(peer).await;
		self.push_event(EventKind::PeerAdd, peer).await;
		Ok(())
	}

	async fn apply_set(&self, peer: &mut PeerInfo, undo: &mut Vec<Undo>) -> Result<()> {
		match peer.ipv4 {
			None => {
				let addr = self.pool.alloc(peer.network_policy).await?;
				peer.ipv4 = Some(addr);
				undo.push(Undo::ReleaseAddress(addr));
			}
			Some(addr) => {
				self.pool.set(addr, peer.network_policy).await?;
				undo.push(Undo::ReleaseAddress(addr));
			}
		}

		let id = self.storage.create_peer(peer).await?;
		peer.id = id;
		undo.push(Undo::DeleteRow(id));

		self.wireguard.set_peer(peer).await?;
		Ok(())
	}

	async fn update_peer_locked(&self, peer: &mut PeerInfo) -> Result<()> {
		if peer.expired() {
			return self.unset_peer_locked(peer.clone()).await;
		}

		let old = self.get_peer_locked(peer.id).await?;

		if peer.wireguard_public_key != old.wireguard_public_key {
			self.ensure_key_unused(peer.wireguard_public_key, peer.id).await?;
		}

		let mut undo = Vec::new();
		if let Err(err) = self.apply_update(peer, &old, &mut undo).await {
			self.unwind(undo).await;
			return Err(err);
		}

		// The previous address is released only once the new state is
		// fully committed.
		if let (Some(old_addr), Some(new_addr)) = (old.ipv4, peer.ipv4) {
			if old_addr != new_addr {
				if let Err(e) = self.pool.unset(old_addr).await {
					warn!(address = %old_addr, error = %e, "failed to release replaced address");
				}
			}
		}

		if old.wireguard_public_key != peer.wireguard_public_key {
			self.traffic.remove(&old).await;
		}
		self.traffic.add(peer).await;
		self.push_event(EventKind::PeerUpdate, peer).await;
		Ok(())
	}

	async fn apply_update(
		&self,
		peer: &mut PeerInfo,
		old: &PeerInfo,
		undo: &mut Vec<Undo>,
	) -> Result<()> {
		match (peer.ipv4, old.ipv4) {
			// No address on the update: allocate a fresh one. An
			// allocation failure is returned to the caller rather than
			// silently reusing the old address.
			(None, _) => {
				let addr = self.pool.alloc(peer.network_policy).await?;
				peer.ipv4 = Some(addr);
				undo.push(Undo::ReleaseAddress(addr));
			}
			(Some(new_addr), Some(old_addr)) if new_addr != old_addr => {
				self.pool.set(new_addr, peer.network_policy).await?;
				undo.push(Undo::ReleaseAddress(new_addr));
			}
			(Some(new_addr), None) => {
				self.pool.set(new_addr, peer.network_policy).await?;
				undo.push(Undo::ReleaseAddress(new_addr));
			}
			_ => {}
		}

		peer.updated = Utc::now();
		let id = self.storage.update_peer(peer).await?;
		peer.id = id;
		undo.push(Undo::RestoreRow(old.clone()));

		// A changed key means remove-then-add on the interface; an
		// unchanged key is overwritten in place.
		if old.wireguard_public_key != peer.wireguard_public_key {
			self.wireguard.unset_peer(old).await?;
		}
		undo.push(Undo::RestoreWgPeer(old.clone()));
		self.wireguard.set_peer(peer).await?;
		Ok(())
	}

	/// Best-effort removal from all three subsystems. Every subsystem is
	/// attempted; the first failure (storage, pool, interface order) is
	/// returned. Aborting early would leak address reservations.
	async fn unset_peer_locked(&self, peer: PeerInfo) -> Result<()> {
		let storage_result = self.storage.delete_peer(peer.id).await;
		let wireguard_result = self.wireguard.unset_peer(&peer).await;
		let pool_result = match peer.ipv4 {
			Some(addr) => self.pool.unset(addr).await,
			None => Ok(()),
		};

		self.metrics.peers.dec();
		self.traffic.remove(&peer).await;
		self.push_event(EventKind::PeerRemove, &peer).await;

		storage_result?;
		pool_result?;
		wireguard_result?;
		Ok(())
	}

	async fn unwind(&self, undo: Vec<Undo>) {
		for step in undo.into_iter().rev() {
			match step {
				Undo::ReleaseAddress(addr) => {
					if let Err(e) = self.pool.unset(addr).await {
						warn!(address = %addr, error = %e, "rollback: failed to release address");
					}
				}
				Undo::DeleteRow(id) => {
					if let Err(e) = self.storage.delete_peer(id).await {
						warn!(id, error = %e, "rollback: failed to delete peer row");
					}
				}
				Undo::RestoreRow(peer) => {
					if let Err(e) = self.storage.update_peer(&peer).await {
						warn!(id = peer.id, error = %e, "rollback: failed to restore peer row");
					}
				}
				Undo::RestoreWgPeer(peer) => {
					if let Err(e) = self.wireguard.set_peer(&peer).await {
						warn!(id = peer.id, error = %e, "rollback: failed to restore interface entry");
					}
				}
			}
		}
	}

	async fn push_event(&self, kind: EventKind, peer: &PeerInfo) {
		let event = TunnelEvent {
			kind,
			timestamp: Utc::now().timestamp(),
			peer: peer.clone(),
		};
		if let Err(e) = self.event_log.push(event).await {
			// Never fail a mutation that already committed.
			error!(error = %e, kind = %kind, "failed to push event");
		}
	}

	/// Bring persisted peers back onto the interface after a restart.
	async fn restore_peers(&self) {
		let peers = match self.storage.search_peers(None).await {
			Ok(peers) => peers,
			Err(e) => {
				error!(error = %e, "failed to load peers for restore");
				return;
			}
		};

		for mut peer in peers {
			if peer.expired() {
				debug!(id = peer.id, "wiping expired peer");
				if let Err(e) = self.storage.delete_peer(peer.id).await {
					warn!(id = peer.id, error = %e, "failed to delete expired peer");
				}
				continue;
			}

			let reserved = match peer.ipv4 {
				Some(addr) => match self.pool.set(addr, peer.network_policy).await {
					Ok(()) => true,
					Err(PoolError::NotInRange) => false,
					Err(e) => {
						warn!(
							id = peer.id,
							error = %e,
							"failed to reserve recorded address, leaving peer dormant"
						);
						continue;
					}
				},
				None => false,
			};

			if !reserved {
				// The recorded address predates the current pool layout:
				// migrate the peer to a fresh one.
				let addr = match self.pool.alloc(peer.network_policy).await {
					Ok(addr) => addr,
					Err(e) => {
						warn!(id = peer.id, error = %e, "failed to migrate peer to the current pool");
						continue;
					}
				};
				peer.ipv4 = Some(addr);
				if let Err(e) = self.storage.update_peer(&peer).await {
					warn!(id = peer.id, error = %e, "failed to persist migrated address");
					if let Err(release) = self.pool.unset(addr).await {
						warn!(address = %addr, error = %release, "failed to release migrated address");
					}
					continue;
				}
				info!(id = peer.id, address = %addr, "migrated peer to the current pool");
			}

			if let Err(e) = self.wireguard.set_peer(&peer).await {
				warn!(id = peer.id, error = %e, "failed to program restored peer");
			}
			self.traffic.add(&peer).await;
			self.metrics.peers.inc();
		}
	}

	fn spawn_sweep_loop(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
		let period = self.config.sweep_interval;
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(period);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
			// The first tick of an interval completes immediately.
			ticker.tick().await;
			debug!(interval = ?period, "peer manager sweep started");

			loop {
				tokio::select! {
					biased;

					_ = shutdown_rx.changed() => {
						if *shutdown_rx.borrow() {
							info!("shutting down peer manager sweep");
							break;
						}
					}

					_ = ticker.tick() => {
						if !self.running.load(Ordering::SeqCst) {
							continue;
						}
						let _guard = self.lock.lock().await;
						if let Err(e) = self.sweep_locked().await {
							warn!(error = %e, "statistics sweep failed");
						}
					}
				}
			}
		})
	}

	/// One sweep tick: reconcile persisted peers with the data plane,
	/// evict expired peers, refresh counters and the cached snapshot.
	async fn sweep_locked(&self) -> Result<()> {
		let link_stats = match self.wireguard.link_statistics().await {
			Ok(stats) => Some(stats),
			Err(e) => {
				warn!(error = %e, "failed to read link statistics");
				None
			}
		};

		let wg_peers = match self.wireguard.peers().await {
			Ok(peers) => peers,
			Err(e) => {
				warn!(error = %e, "failed to read interface peers");
				HashMap::new()
			}
		};

		let peers = self.storage.search_peers(None).await?;
		let report = self.stats_service.update_peer_stats(peers, &wg_peers, Utc::now());

		for peer in &report.expired_peers {
			if let Err(e) = self.unset_peer_locked(peer.clone()).await {
				error!(id = peer.id, error = %e, "failed to unset expired peer");
			}
		}

		for peer in &report.updated_peers {
			if let Err(e) = self.storage.update_peer(peer).await {
				warn!(id = peer.id, error = %e, "failed to persist refreshed counters");
			}
		}
		self.traffic.submit(&report.updated_peers).await;

		let previous = self.statistics.read().clone();
		let (upstream, downstream) = match (link_stats, previous.link_stat) {
			// Counter resets surface as negative deltas; clamp so the
			// cumulative totals stay monotone.
			(Some(current), Some(prev)) => (
				previous.upstream + current.rx_bytes.saturating_sub(prev.rx_bytes) as i64,
				previous.downstream + current.tx_bytes.saturating_sub(prev.tx_bytes) as i64,
			),
			(Some(current), None) => (
				previous.upstream + current.rx_bytes as i64,
				previous.downstream + current.tx_bytes as i64,
			),
			(None, _) => (previous.upstream, previous.downstream),
		};

		let snapshot = CachedStatistics {
			peers_total: report.num_peers,
			peers_with_traffic: report.num_with_handshakes,
			peers_active_last_hour: report.num_active_last_hour,
			peers_active_last_day: report.num_active_last_day,
			link_stat: link_stats.or(previous.link_stat),
			upstream,
			downstream,
		};

		info!(
			total = report.num_peers,
			connected = report.num_with_handshakes,
			active_1h = report.num_active_last_hour,
			active_1d = report.num_active_last_day,
			upstream = snapshot.upstream,
			downstream = snapshot.downstream,
			"stats"
		);

		self.metrics
			.peers_with_handshake
			.set(report.num_with_handshakes as f64);
		self.metrics.link_upstream_bytes.set(snapshot.upstream);
		self.metrics.link_downstream_bytes.set(snapshot.downstream);
		if let Err(e) = self.storage.set_upstream_metric(snapshot.upstream).await {
			warn!(error = %e, "failed to store upstream metric");
		}
		if let Err(e) = self.storage.set_downstream_metric(snapshot.downstream).await {
			warn!(error = %e, "failed to store downstream metric");
		}

		*self.statistics.write() = snapshot;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pool::SubnetPool;
	use crate::storage::MemoryStorage;
	use crate::testing::{MockWireguard, RecordingEventLog};
	use burrow_tunnel_common::WgPublicKey;
	use uuid::Uuid;

	async fn manager() -> (Arc<PeerManager>, Arc<MemoryStorage>, Arc<MockWireguard>) {
		let storage = Arc::new(MemoryStorage::new());
		let pool = Arc::new(SubnetPool::new("10.0.0.0/24".parse().unwrap()));
		let wireguard = Arc::new(MockWireguard::new());
		let event_log = Arc::new(RecordingEventLog::new());
		let manager = PeerManager::new(
			PeersConfig::default(),
			storage.clone(),
			pool,
			wireguard.clone(),
			event_log,
			Arc::new(Metrics::new()),
		)
		.await;
		(manager, storage, wireguard)
	}

	fn peer(user: &str, tag: u8) -> PeerInfo {
		let mut peer = PeerInfo::new(PeerIdentifiers {
			user_id: Some(user.to_string()),
			installation_id: Some(Uuid::new_v4()),
			session_id: None,
		});
		peer.wireguard_public_key = Some(WgPublicKey::from_bytes([tag; 32]));
		peer
	}

	#[tokio::test]
	async fn operations_fail_after_shutdown() {
		let (manager, _, _) = manager().await;
		manager.shutdown().await;

		let mut record = peer("alice", 1);
		assert!(matches!(
			manager.set_peer(&mut record).await,
			Err(PeerError::Unavailable)
		));
		assert!(matches!(manager.list_peers().await, Err(PeerError::Unavailable)));
		assert!(matches!(
			manager.cached_statistics(),
			Err(PeerError::Unavailable)
		));
	}

	#[tokio::test]
	async fn set_peer_requires_a_public_key() {
		let (manager, _, _) = manager().await;
		let mut record = peer("alice", 1);
		record.wireguard_public_key = None;
		assert!(matches!(
			manager.set_peer(&mut record).await,
			Err(PeerError::InvalidArgument(_))
		));
	}

	#[tokio::test]
	async fn set_peer_rejects_expired_record() {
		let (manager, storage, _) = manager().await;
		let mut record = peer("alice", 1);
		record.expires = Some(Utc::now() - chrono::Duration::seconds(1));
		assert!(matches!(
			manager.set_peer(&mut record).await,
			Err(PeerError::InvalidArgument(_))
		));
		assert_eq!(storage.peer_count().await, 0);
	}

	#[tokio::test]
	async fn connect_peer_with_no_identifiers_is_invalid() {
		let (manager, _, _) = manager().await;
		let mut record = peer("alice", 1);
		record.identifiers = PeerIdentifiers::default();
		assert!(matches!(
			manager.connect_peer(&mut record).await,
			Err(PeerError::InvalidArgument(_))
		));
	}

	#[tokio::test]
	async fn ambiguous_identifier_match_is_an_internal_error() {
		let (manager, storage, _) = manager().await;

		// Two rows for the same tuple: invariant 4 already broken.
		let mut first = peer("alice", 1);
		let mut second = first.clone();
		second.wireguard_public_key = Some(WgPublicKey::from_bytes([2; 32]));
		storage.create_peer(&first).await.unwrap();
		storage.create_peer(&second).await.unwrap();

		assert!(matches!(
			manager.connect_peer(&mut first).await,
			Err(PeerError::Internal(_))
		));
	}

	#[tokio::test]
	async fn unset_unknown_peer_is_not_found() {
		let (manager, _, _) = manager().await;
		assert!(matches!(manager.unset_peer(99).await, Err(PeerError::NotFound)));
	}

	#[tokio::test]
	async fn expiration_update_requires_exactly_one_match() {
		let (manager, _, _) = manager().await;

		let missing = PeerIdentifiers {
			user_id: Some("nobody".to_string()),
			..Default::default()
		};
		assert!(matches!(
			manager.update_peer_expiration(&missing, None).await,
			Err(PeerError::NotFound)
		));

		let mut a = peer("alice", 1);
		let mut b = peer("alice", 2);
		manager.set_peer(&mut a).await.unwrap();
		manager.set_peer(&mut b).await.unwrap();

		let ambiguous = PeerIdentifiers {
			user_id: Some("alice".to_string()),
			..Default::default()
		};
		assert!(matches!(
			manager.update_peer_expiration(&ambiguous, None).await,
			Err(PeerError::InvalidArgument(_))
		));
	}

	#[tokio::test]
	async fn invalid_authorizer_key_is_rejected_before_upsert() {
		let (manager, storage, _) = manager().await;
		let keys = vec![AuthorizerKey {
			id: String::new(),
			source: "partner".to_string(),
			key: "Zm9v".to_string(),
		}];
		assert!(matches!(
			manager.update_authorizer_keys(&keys).await,
			Err(PeerError::InvalidArgument(_))
		));
		assert!(storage.authorizer_keys().await.is_empty());
	}
}

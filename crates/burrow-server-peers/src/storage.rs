// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence interface for peer records and authorizer keys.

use async_trait::async_trait;
use burrow_tunnel_common::{AuthorizerKey, PeerIdentifiers, PeerInfo};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StorageError {
	#[error("entry not found")]
	NotFound,

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("storage failure: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable store for peer records.
///
/// A peer once created is retrievable by id until deleted and searchable
/// by any subset of set identifier fields.
#[async_trait]
pub trait PeerStorage: Send + Sync {
	async fn create_peer(&self, peer: &PeerInfo) -> Result<i64>;

	async fn update_peer(&self, peer: &PeerInfo) -> Result<i64>;

	async fn delete_peer(&self, id: i64) -> Result<()>;

	async fn get_peer(&self, id: i64) -> Result<PeerInfo>;

	/// `None` returns every peer; `Some` matches on exactly the
	/// identifier fields the query sets.
	async fn search_peers(&self, query: Option<&PeerIdentifiers>) -> Result<Vec<PeerInfo>>;

	async fn update_authorizer_keys(&self, keys: &[AuthorizerKey]) -> Result<()>;

	async fn set_upstream_metric(&self, value: i64) -> Result<()>;

	async fn set_downstream_metric(&self, value: i64) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
	peers: HashMap<i64, PeerInfo>,
	next_id: i64,
	authorizer_keys: HashMap<String, AuthorizerKey>,
	upstream_metric: i64,
	downstream_metric: i64,
}

/// In-memory peer store backing tests and embedded deployments.
#[derive(Default)]
pub struct MemoryStorage {
	state: Mutex<MemoryState>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn peer_count(&self) -> usize {
		self.state.lock().await.peers.len()
	}

	pub async fn authorizer_keys(&self) -> Vec<AuthorizerKey> {
		self.state.lock().await.authorizer_keys.values().cloned().collect()
	}

	pub async fn traffic_metrics(&self) -> (i64, i64) {
		let state = self.state.lock().await;
		(state.upstream_metric, state.downstream_metric)
	}
}

#[async_trait]
impl PeerStorage for MemoryStorage {
	async fn create_peer(&self, peer: &PeerInfo) -> Result<i64> {
		let mut state = self.state.lock().await;
		state.next_id += 1;
		let id = state.next_id;
		let mut stored = peer.clone();
		stored.id = id;
		state.peers.insert(id, stored);
		Ok(id)
	}

	async fn update_peer(&self, peer: &PeerInfo) -> Result<i64> {
		let mut state = self.state.lock().await;
		if !state.peers.contains_key(&peer.id) {
			return Err(StorageError::NotFound);
		}
		state.peers.insert(peer.id, peer.clone());
		Ok(peer.id)
	}

	async fn delete_peer(&self, id: i64) -> Result<()> {
		let mut state = self.state.lock().await;
		state.peers.remove(&id).ok_or(StorageError::NotFound)?;
		Ok(())
	}

	async fn get_peer(&self, id: i64) -> Result<PeerInfo> {
		let state = self.state.lock().await;
		state.peers.get(&id).cloned().ok_or(StorageError::NotFound)
	}

	async fn search_peers(&self, query: Option<&PeerIdentifiers>) -> Result<Vec<PeerInfo>> {
		let state = self.state.lock().await;
		let mut peers: Vec<PeerInfo> = state
			.peers
			.values()
			.filter(|peer| query.map(|q| q.matches(&peer.identifiers)).unwrap_or(true))
			.cloned()
			.collect();
		peers.sort_by_key(|peer| peer.id);
		Ok(peers)
	}

	async fn update_authorizer_keys(&self, keys: &[AuthorizerKey]) -> Result<()> {
		let mut state = self.state.lock().await;
		for key in keys {
			state.authorizer_keys.insert(key.id.clone(), key.clone());
		}
		Ok(())
	}

	async fn set_upstream_metric(&self, value: i64) -> Result<()> {
		self.state.lock().await.upstream_metric = value;
		Ok(())
	}

	async fn set_downstream_metric(&self, value: i64) -> Result<()> {
		self.state.lock().await.downstream_metric = value;
		Ok(())
	}
}

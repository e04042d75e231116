// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use burrow_tunnel_common::{LinkStats, PeerInfo, WgPeerStatus, WgPublicKey};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireguardError {
	#[error("device error: {0}")]
	Device(String),

	#[error("peer is not configured on the interface")]
	PeerNotFound,

	#[error("peer has no public key")]
	MissingPublicKey,
}

pub type Result<T> = std::result::Result<T, WireguardError>;

/// Data-plane control surface: programs peers on the tunnel interface
/// and exposes its counters. The driver lives behind this trait; the
/// manager is its only caller.
#[async_trait]
pub trait WireguardService: Send + Sync {
	/// Configure or overwrite the interface entry for the peer.
	async fn set_peer(&self, peer: &PeerInfo) -> Result<()>;

	/// Remove the interface entry keyed by the peer's public key.
	async fn unset_peer(&self, peer: &PeerInfo) -> Result<()>;

	/// Snapshot of every configured peer, keyed by public key.
	async fn peers(&self) -> Result<HashMap<WgPublicKey, WgPeerStatus>>;

	/// Interface-level counters.
	async fn link_statistics(&self) -> Result<LinkStats>;
}

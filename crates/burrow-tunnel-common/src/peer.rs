// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::keys::WgPublicKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use uuid::Uuid;

/// Address class a peer's tunnel IP is drawn from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkPolicy {
	#[default]
	Default,
	Restricted,
}

/// Externally meaningful identity of a tunnel client.
///
/// Any subset of the fields may be set; lookups match on exactly the
/// fields a query sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerIdentifiers {
	#[serde(default)]
	pub user_id: Option<String>,
	#[serde(default)]
	pub installation_id: Option<Uuid>,
	#[serde(default)]
	pub session_id: Option<Uuid>,
}

impl PeerIdentifiers {
	pub fn is_empty(&self) -> bool {
		self.user_id.is_none() && self.installation_id.is_none() && self.session_id.is_none()
	}

	/// Treats `self` as a query: every field set here must equal the
	/// corresponding field on `peer`.
	pub fn matches(&self, peer: &PeerIdentifiers) -> bool {
		if let Some(ref user_id) = self.user_id {
			if peer.user_id.as_ref() != Some(user_id) {
				return false;
			}
		}
		if let Some(ref installation_id) = self.installation_id {
			if peer.installation_id.as_ref() != Some(installation_id) {
				return false;
			}
		}
		if let Some(ref session_id) = self.session_id {
			if peer.session_id.as_ref() != Some(session_id) {
				return false;
			}
		}
		true
	}
}

/// Persisted record of a tunnel client.
///
/// `id` is assigned by storage on create; zero means the record has not
/// been persisted yet. `upstream`/`downstream` mirror the cumulative
/// data-plane byte counters and are refreshed by the statistics sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
	pub id: i64,
	pub identifiers: PeerIdentifiers,
	#[serde(default)]
	pub wireguard_public_key: Option<WgPublicKey>,
	#[serde(default)]
	pub ipv4: Option<Ipv4Addr>,
	#[serde(default)]
	pub network_policy: NetworkPolicy,
	#[serde(default)]
	pub expires: Option<DateTime<Utc>>,
	pub created: DateTime<Utc>,
	pub updated: DateTime<Utc>,
	#[serde(default)]
	pub upstream: Option<i64>,
	#[serde(default)]
	pub downstream: Option<i64>,
	#[serde(default)]
	pub last_handshake: Option<DateTime<Utc>>,
}

impl PeerInfo {
	pub fn new(identifiers: PeerIdentifiers) -> Self {
		let now = Utc::now();
		Self {
			id: 0,
			identifiers,
			wireguard_public_key: None,
			ipv4: None,
			network_policy: NetworkPolicy::Default,
			expires: None,
			created: now,
			updated: now,
			upstream: None,
			downstream: None,
			last_handshake: None,
		}
	}

	pub fn expired(&self) -> bool {
		self.expires.map(|e| e <= Utc::now()).unwrap_or(false)
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::peer::PeerInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Peer-lifecycle and traffic event classes pushed to the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	PeerAdd,
	PeerUpdate,
	PeerRemove,
	PeerTraffic,
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			EventKind::PeerAdd => "peer_add",
			EventKind::PeerUpdate => "peer_update",
			EventKind::PeerRemove => "peer_remove",
			EventKind::PeerTraffic => "peer_traffic",
		};
		f.write_str(s)
	}
}

/// One event as it appears in the log: the peer's full record at the
/// time the event fired, with a unix-seconds timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelEvent {
	pub kind: EventKind,
	pub timestamp: i64,
	pub peer: PeerInfo,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::peer::PeerIdentifiers;

	#[test]
	fn event_kind_serializes_snake_case() {
		let json = serde_json::to_string(&EventKind::PeerTraffic).unwrap();
		assert_eq!(json, "\"peer_traffic\"");
		assert_eq!(EventKind::PeerTraffic.to_string(), "peer_traffic");
	}

	#[test]
	fn event_roundtrip() {
		let event = TunnelEvent {
			kind: EventKind::PeerAdd,
			timestamp: 1_700_000_000,
			peer: PeerInfo::new(PeerIdentifiers::default()),
		};
		let json = serde_json::to_string(&event).unwrap();
		let restored: TunnelEvent = serde_json::from_str(&json).unwrap();
		assert_eq!(restored.kind, EventKind::PeerAdd);
		assert_eq!(restored.timestamp, event.timestamp);
	}
}

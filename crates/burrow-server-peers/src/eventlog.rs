// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use burrow_tunnel_common::TunnelEvent;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventLogError {
	#[error("event log push failed: {0}")]
	Push(String),
}

pub type Result<T> = std::result::Result<T, EventLogError>;

/// Append-only sink for peer-lifecycle and traffic events.
///
/// Safe for concurrent pushes; a failed push never fails the peer
/// mutation that produced the event.
#[async_trait]
pub trait EventLog: Send + Sync {
	async fn push(&self, event: TunnelEvent) -> Result<()>;
}

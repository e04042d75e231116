// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::eventlog::EventLogError;
use crate::pool::PoolError;
use crate::storage::StorageError;
use crate::wireguard::WireguardError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeerError {
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error("peer not found")]
	NotFound,

	#[error("server is shutting down")]
	Unavailable,

	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),

	#[error("internal error: {0}")]
	Internal(String),

	#[error("storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("address pool error: {0}")]
	Pool(#[from] PoolError),

	#[error("wireguard error: {0}")]
	Wireguard(#[from] WireguardError),

	#[error("event log error: {0}")]
	EventLog(#[from] EventLogError),
}

pub type Result<T> = std::result::Result<T, PeerError>;

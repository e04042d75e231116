// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
	#[error("invalid log level: {0}")]
	InvalidLogLevel(String),

	#[error("invalid configuration value for {var}: {value}")]
	InvalidConfiguration { var: String, value: String },

	#[error("service error: {0}")]
	Service(String),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	#[error("invalid key material: {0}")]
	Key(#[from] burrow_tunnel_common::KeyError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthorizerKeyError {
	#[error("authorizer key id is empty")]
	EmptyId,

	#[error("authorizer key source is empty")]
	EmptySource,

	#[error("invalid key material: {0}")]
	InvalidKey(#[from] base64::DecodeError),
}

/// Public key of a federation partner trusted to sign client tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizerKey {
	pub id: String,
	pub source: String,
	pub key: String,
}

impl AuthorizerKey {
	pub fn validate(&self) -> Result<(), AuthorizerKeyError> {
		if self.id.trim().is_empty() {
			return Err(AuthorizerKeyError::EmptyId);
		}
		if self.source.trim().is_empty() {
			return Err(AuthorizerKeyError::EmptySource);
		}
		STANDARD.decode(&self.key)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn valid_key() -> AuthorizerKey {
		AuthorizerKey {
			id: "key-1".to_string(),
			source: "partner.example.com".to_string(),
			key: STANDARD.encode(b"some key material"),
		}
	}

	#[test]
	fn valid_key_passes() {
		assert!(valid_key().validate().is_ok());
	}

	#[test]
	fn empty_id_rejected() {
		let mut key = valid_key();
		key.id = "  ".to_string();
		assert!(matches!(key.validate(), Err(AuthorizerKeyError::EmptyId)));
	}

	#[test]
	fn empty_source_rejected() {
		let mut key = valid_key();
		key.source = String::new();
		assert!(matches!(key.validate(), Err(AuthorizerKeyError::EmptySource)));
	}

	#[test]
	fn garbage_key_material_rejected() {
		let mut key = valid_key();
		key.key = "%%%".to_string();
		assert!(matches!(key.validate(), Err(AuthorizerKeyError::InvalidKey(_))));
	}
}

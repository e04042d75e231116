// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::Result;
use burrow_tunnel_common::{WgKeyPair, WgPrivateKey};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const KEY_FILE: &str = "wg-key";

/// State generated at first start rather than configured: the server's
/// WireGuard identity, persisted under the config directory.
pub struct DynamicSettings {
	keypair: WgKeyPair,
	key_path: PathBuf,
}

impl DynamicSettings {
	#[instrument(skip_all, fields(dir = %config_dir.as_ref().display()))]
	pub async fn load_or_generate(config_dir: impl AsRef<Path>) -> Result<Self> {
		let key_path = config_dir.as_ref().join(KEY_FILE);

		if key_path.exists() {
			let content = fs::read_to_string(&key_path).await?;
			let private = WgPrivateKey::from_base64(content.trim())?;
			return Ok(Self {
				keypair: WgKeyPair::from_private_key(private),
				key_path,
			});
		}

		let keypair = WgKeyPair::generate();
		save_key(&keypair, &key_path).await?;
		info!(public_key = %keypair.public_key(), "generated server wireguard key");
		Ok(Self { keypair, key_path })
	}

	pub fn wireguard_key(&self) -> &WgKeyPair {
		&self.keypair
	}

	pub fn key_path(&self) -> &Path {
		&self.key_path
	}
}

async fn save_key(key: &WgKeyPair, path: &Path) -> Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).await?;
	}

	let content = format!("{}\n", key.private_key().to_base64());

	#[cfg(unix)]
	{
		use tokio::io::AsyncWriteExt;

		let mut file = fs::OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(path)
			.await?;
		file.write_all(content.as_bytes()).await?;
	}

	#[cfg(not(unix))]
	{
		fs::write(path, content).await?;
	}

	Ok(())
}

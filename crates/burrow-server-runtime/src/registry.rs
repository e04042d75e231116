// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{Result, RuntimeError};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A long-lived component owned by the runtime.
#[async_trait]
pub trait Service: Send + Sync {
	fn name(&self) -> &str;

	async fn shutdown(&self) -> Result<()>;
}

/// Registered services, stopped in reverse registration order so later
/// services never outlive what they depend on.
#[derive(Default)]
pub struct ServiceRegistry {
	services: Mutex<Vec<Box<dyn Service>>>,
}

impl ServiceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn register(&self, service: Box<dyn Service>) {
		info!(service = service.name(), "registered service");
		self.services.lock().await.push(service);
	}

	pub async fn len(&self) -> usize {
		self.services.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.services.lock().await.is_empty()
	}

	/// Stop everything. Every service is attempted even after a
	/// failure; the first error is returned.
	pub async fn shutdown_all(&self) -> Result<()> {
		let mut services = self.services.lock().await;
		let mut first_error: Option<RuntimeError> = None;

		while let Some(service) = services.pop() {
			info!(service = service.name(), "stopping service");
			if let Err(e) = service.shutdown().await {
				warn!(service = service.name(), error = %e, "service failed to stop");
				if first_error.is_none() {
					first_error = Some(e);
				}
			}
		}

		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Service lifecycle: start, stop, restart, and the control-event loop.

use crate::config::ServerSettings;
use crate::control::{ControlEvent, LogLevelSetter};
use crate::error::{Result, RuntimeError};
use crate::registry::{Service, ServiceRegistry};
use crate::settings::DynamicSettings;
use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, instrument, warn};

/// Flags surfaced to status consumers.
#[derive(Default)]
pub struct RuntimeFlags {
	restart_required: AtomicBool,
}

impl RuntimeFlags {
	pub fn restart_required(&self) -> bool {
		self.restart_required.load(Ordering::SeqCst)
	}

	fn set_restart_required(&self, value: bool) {
		self.restart_required.store(value, Ordering::SeqCst)
	}
}

/// Brings the server's services up against the runtime's registry.
/// Invoked on start and again on every restart.
#[async_trait]
pub trait ServiceInitializer: Send + Sync {
	async fn start(&self, runtime: &Runtime) -> Result<()>;
}

pub struct Runtime {
	settings: ServerSettings,
	dynamic: DynamicSettings,
	services: ServiceRegistry,
	set_log_level: LogLevelSetter,
	initializer: Arc<dyn ServiceInitializer>,
	flags: RuntimeFlags,
	events_tx: SyncMutex<Option<mpsc::UnboundedSender<ControlEvent>>>,
	events_rx: Mutex<Option<mpsc::UnboundedReceiver<ControlEvent>>>,
}

impl Runtime {
	pub fn new(
		settings: ServerSettings,
		dynamic: DynamicSettings,
		set_log_level: LogLevelSetter,
		initializer: Arc<dyn ServiceInitializer>,
	) -> Self {
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		Self {
			settings,
			dynamic,
			services: ServiceRegistry::new(),
			set_log_level,
			initializer,
			flags: RuntimeFlags::default(),
			events_tx: SyncMutex::new(Some(events_tx)),
			events_rx: Mutex::new(Some(events_rx)),
		}
	}

	pub fn settings(&self) -> &ServerSettings {
		&self.settings
	}

	pub fn dynamic_settings(&self) -> &DynamicSettings {
		&self.dynamic
	}

	pub fn flags(&self) -> &RuntimeFlags {
		&self.flags
	}

	pub fn services(&self) -> &ServiceRegistry {
		&self.services
	}

	/// Handle used by control surfaces to enqueue events. `None` once
	/// the queue has been closed.
	pub fn event_sender(&self) -> Option<mpsc::UnboundedSender<ControlEvent>> {
		self.events_tx.lock().clone()
	}

	/// Close the queue. Once every outstanding sender is dropped the
	/// event loop drains and returns.
	pub fn close_event_queue(&self) {
		self.events_tx.lock().take();
	}

	pub async fn register_service(&self, service: Box<dyn Service>) {
		self.services.register(service).await
	}

	#[instrument(skip(self))]
	pub async fn start(&self) -> Result<()> {
		self.initializer.start(self).await
	}

	#[instrument(skip(self))]
	pub async fn stop(&self) -> Result<()> {
		self.services.shutdown_all().await
	}

	#[instrument(skip(self))]
	pub async fn restart(&self) -> Result<()> {
		self.stop().await?;
		self.flags.set_restart_required(false);
		self.start().await?;
		info!("services restarted");
		Ok(())
	}

	/// Dispatch one control event. A failed restart is returned: a
	/// half-restarted server cannot limp along.
	pub async fn process_event(&self, event: ControlEvent) -> Result<()> {
		match event {
			ControlEvent::SetLogLevel(level) => {
				if let Err(e) = (self.set_log_level)(&level) {
					warn!(level = %level, error = %e, "failed to change log level");
				}
				Ok(())
			}
			ControlEvent::Restart => {
				self.flags.set_restart_required(true);
				if let Err(e) = self.restart().await {
					error!(error = %e, "service restart failed");
					return Err(e);
				}
				Ok(())
			}
		}
	}

	/// Consume control events until the queue closes or a restart
	/// failure makes continuing unsafe.
	pub async fn run_event_loop(&self) -> Result<()> {
		let mut rx = match self.events_rx.lock().await.take() {
			Some(rx) => rx,
			None => {
				return Err(RuntimeError::Service(
					"event loop is already running".to_string(),
				))
			}
		};

		while let Some(event) = rx.recv().await {
			self.process_event(event).await?;
		}
		info!("control event queue closed");
		Ok(())
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Control events and runtime log-level switching.

use crate::error::{Result, RuntimeError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Out-of-band commands accepted while the server runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
	SetLogLevel(String),
	Restart,
}

pub type LogLevelSetter = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;

fn parse_filter(level: &str) -> Result<EnvFilter> {
	EnvFilter::try_new(level).map_err(|_| RuntimeError::InvalidLogLevel(level.to_string()))
}

/// Install the global subscriber and return a setter that swaps the
/// active filter without restarting.
pub fn init_logging(level: &str) -> Result<LogLevelSetter> {
	let filter = parse_filter(level)?;
	let (filter_layer, handle) = reload::Layer::new(filter);

	tracing_subscriber::registry()
		.with(filter_layer)
		.with(tracing_subscriber::fmt::layer())
		.try_init()
		.map_err(|e| RuntimeError::Service(format!("failed to install subscriber: {e}")))?;

	Ok(level_setter(handle))
}

/// Setter over a reload handle. Split out so it can be exercised
/// without installing the process-global subscriber.
pub fn level_setter(handle: reload::Handle<EnvFilter, Registry>) -> LogLevelSetter {
	Box::new(move |level: &str| {
		let filter = parse_filter(level)?;
		handle
			.reload(filter)
			.map_err(|e| RuntimeError::Service(format!("failed to swap log filter: {e}")))
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn setter() -> (reload::Layer<EnvFilter, Registry>, LogLevelSetter) {
		let (layer, handle): (reload::Layer<EnvFilter, Registry>, _) =
			reload::Layer::new(EnvFilter::new("info"));
		(layer, level_setter(handle))
	}

	#[test]
	fn accepts_level_names_and_directives() {
		let (_layer, set) = setter();
		assert!(set("debug").is_ok());
		assert!(set("warn,burrow_server_peers=trace").is_ok());
	}

	#[test]
	fn rejects_garbage() {
		let (_layer, set) = setter();
		assert!(matches!(
			set("not a log level at all"),
			Err(RuntimeError::InvalidLogLevel(_))
		));
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! IPv4 address reservations for tunnel peers.

use async_trait::async_trait;
use burrow_tunnel_common::NetworkPolicy;
use ipnet::Ipv4Net;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
	#[error("address is not in the pool range")]
	NotInRange,

	#[error("address pool exhausted")]
	Exhausted,

	#[error("address already reserved: {0}")]
	AlreadyReserved(Ipv4Addr),

	#[error("address is not reserved: {0}")]
	NotAllocated(Ipv4Addr),
}

pub type Result<T> = std::result::Result<T, PoolError>;

/// Allocator of tunnel addresses under a network policy.
#[async_trait]
pub trait AddressPool: Send + Sync {
	/// Reserve the next free address from the policy's sub-range.
	async fn alloc(&self, policy: NetworkPolicy) -> Result<Ipv4Addr>;

	/// Reserve a specific address, validating it against the policy's
	/// sub-range.
	async fn set(&self, addr: Ipv4Addr, policy: NetworkPolicy) -> Result<()>;

	/// Release a reservation.
	async fn unset(&self, addr: Ipv4Addr) -> Result<()>;
}

struct PoolState {
	allocated: HashSet<Ipv4Addr>,
}

/// First-free allocator over per-policy `Ipv4Net` sub-ranges.
pub struct SubnetPool {
	default_subnet: Ipv4Net,
	policy_subnets: HashMap<NetworkPolicy, Ipv4Net>,
	state: Mutex<PoolState>,
}

impl SubnetPool {
	pub fn new(default_subnet: Ipv4Net) -> Self {
		Self {
			default_subnet,
			policy_subnets: HashMap::new(),
			state: Mutex::new(PoolState {
				allocated: HashSet::new(),
			}),
		}
	}

	/// Dedicate a sub-range to a policy. Policies without one draw from
	/// the default subnet.
	pub fn with_policy_subnet(mut self, policy: NetworkPolicy, subnet: Ipv4Net) -> Self {
		self.policy_subnets.insert(policy, subnet);
		self
	}

	fn subnet_for(&self, policy: NetworkPolicy) -> Ipv4Net {
		self.policy_subnets
			.get(&policy)
			.copied()
			.unwrap_or(self.default_subnet)
	}

	pub fn allocated_count(&self) -> usize {
		self.state.lock().allocated.len()
	}

	pub fn is_allocated(&self, addr: Ipv4Addr) -> bool {
		self.state.lock().allocated.contains(&addr)
	}
}

#[async_trait]
impl AddressPool for SubnetPool {
	async fn alloc(&self, policy: NetworkPolicy) -> Result<Ipv4Addr> {
		let subnet = self.subnet_for(policy);
		let mut state = self.state.lock();
		for addr in subnet.hosts() {
			if !state.allocated.contains(&addr) {
				state.allocated.insert(addr);
				return Ok(addr);
			}
		}
		Err(PoolError::Exhausted)
	}

	async fn set(&self, addr: Ipv4Addr, policy: NetworkPolicy) -> Result<()> {
		let subnet = self.subnet_for(policy);
		if !subnet.contains(&addr) {
			return Err(PoolError::NotInRange);
		}
		let mut state = self.state.lock();
		if !state.allocated.insert(addr) {
			return Err(PoolError::AlreadyReserved(addr));
		}
		Ok(())
	}

	async fn unset(&self, addr: Ipv4Addr) -> Result<()> {
		let mut state = self.state.lock();
		if !state.allocated.remove(&addr) {
			return Err(PoolError::NotAllocated(addr));
		}
		Ok(())
	}
}

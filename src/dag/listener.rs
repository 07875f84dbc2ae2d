//! Listener vertex (§3, §9 "polymorphism over vhost kinds").

use indexmap::IndexMap;

use dag_core::Strng;

use crate::dag::vhost::{SecureVirtualHost, VirtualHost};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ListenerProtocol {
	Http,
	Https,
	Tcp,
	Tls,
}

/// §9: "a small closed variant {VirtualHost, SecureVirtualHost}, each
/// satisfying a capability set {AddRoute}" — preferred over an inheritance
/// hierarchy.
#[derive(Clone, Debug)]
pub enum VHostEntry {
	Insecure(VirtualHost),
	Secure(SecureVirtualHost),
}

impl VHostEntry {
	pub fn route_count(&self) -> usize {
		match self {
			VHostEntry::Insecure(v) => v.routes.len(),
			VHostEntry::Secure(v) => v.virtual_host.routes.len(),
		}
	}

	pub fn as_insecure(&mut self) -> Option<&mut VirtualHost> {
		match self {
			VHostEntry::Insecure(v) => Some(v),
			VHostEntry::Secure(_) => None,
		}
	}

	pub fn as_secure(&mut self) -> Option<&mut SecureVirtualHost> {
		match self {
			VHostEntry::Secure(v) => Some(v),
			VHostEntry::Insecure(_) => None,
		}
	}
}

#[derive(Clone, Debug)]
pub struct Listener {
	pub name: Strng,
	pub protocol: ListenerProtocol,
	pub port: u16,
	pub container_port: u16,
	/// Keyed by `vhost::normalize_fqdn` output, not the raw FQDN. An
	/// `IndexMap` keeps vhosts in first-insertion order so builds over the
	/// same input produce the same iteration order (§8 determinism).
	pub vhosts: IndexMap<String, VHostEntry>,
}

impl Listener {
	pub fn new(name: impl Into<Strng>, protocol: ListenerProtocol, port: u16, container_port: u16) -> Self {
		Self {
			name: name.into(),
			protocol,
			port,
			container_port,
			vhosts: IndexMap::new(),
		}
	}

	/// §4.6 prune rule: "a listener is retained in output only if it owns at
	/// least one surviving virtual host".
	pub fn is_routable(&self) -> bool {
		!self.vhosts.is_empty()
	}
}

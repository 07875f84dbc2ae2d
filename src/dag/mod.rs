pub mod cluster;
pub mod listener;
pub mod route;
pub mod vhost;

use indexmap::IndexMap;

use dag_core::prelude::*;

use crate::cache::CacheSnapshot;
use crate::errors::ServiceLookupError;
use crate::k8s::service::PortRef;
use crate::k8s::Service;

pub use cluster::{Cluster, ExtensionCluster, TcpProxy};
pub use listener::{Listener, ListenerProtocol, VHostEntry};
pub use route::{PathMatch, Route};
pub use vhost::{normalize_fqdn, SecureVirtualHost, VirtualHost};

/// The output graph under construction for one rebuild (§2, §3). Owned
/// entirely by a single `Build` call; published to readers by pointer swap
/// once complete.
#[derive(Default)]
pub struct Dag {
	listeners: IndexMap<(ListenerProtocol, u16), Listener>,
	roots: Vec<ExtensionCluster>,
}

impl Dag {
	pub fn new() -> Self {
		Self::default()
	}

	/// `EnsureListener(protocol,port)` (§4.6).
	pub fn ensure_listener(&mut self, protocol: ListenerProtocol, port: u16, container_port: u16) -> &mut Listener {
		self.listeners.entry((protocol, port)).or_insert_with(|| {
			let name = dag_core::strng::format!("{:?}:{}", protocol, port);
			Listener::new(name, protocol, port, container_port)
		})
	}

	/// `EnsureVirtualHost(listener-name, fqdn)` (§4.6): idempotent, returns
	/// the existing vhost on the listener or creates a new one.
	pub fn ensure_virtual_host(&mut self, protocol: ListenerProtocol, port: u16, container_port: u16, fqdn: &str) -> &mut VirtualHost {
		let listener = self.ensure_listener(protocol, port, container_port);
		let key = normalize_fqdn(fqdn);
		listener
			.vhosts
			.entry(key)
			.or_insert_with(|| VHostEntry::Insecure(VirtualHost::new(fqdn)))
			.as_insecure()
			.expect("ensure_virtual_host called on a key already holding a SecureVirtualHost")
	}

	/// `EnsureSecureVirtualHost(listener-name, fqdn)` (§4.6).
	pub fn ensure_secure_virtual_host(
		&mut self,
		protocol: ListenerProtocol,
		port: u16,
		container_port: u16,
		fqdn: &str,
	) -> &mut SecureVirtualHost {
		let listener = self.ensure_listener(protocol, port, container_port);
		let key = normalize_fqdn(fqdn);
		listener
			.vhosts
			.entry(key)
			.or_insert_with(|| VHostEntry::Secure(SecureVirtualHost::new(fqdn)))
			.as_secure()
			.expect("ensure_secure_virtual_host called on a key already holding a plain VirtualHost")
	}

	/// `EnsureService(meta, port, health-port, cache, allow-external-name)`
	/// (§4.6). `health_port` is accepted for interface parity with the
	/// source contract but unused by the DAG builder itself, which has no
	/// active-health-check concept of its own.
	pub fn ensure_service<'a>(
		&self,
		meta: &dag_core::Meta,
		port: &PortRef,
		_health_port: Option<&PortRef>,
		cache: &'a CacheSnapshot<'a>,
		allow_external_name: bool,
	) -> Result<(&'a Service, &'a crate::k8s::service::ServicePort), ServiceLookupError> {
		let (svc, matched) = cache.lookup_service(meta, port)?;
		if svc.external_name.is_some() && !allow_external_name {
			return Err(ServiceLookupError::UnsupportedProtocol {
				meta: meta.clone(),
				port: matched.number,
				protocol: "ExternalName (disabled by EnableExternalNameService=false)".to_string(),
			});
		}
		Ok((svc, matched))
	}

	/// `AddRoot(v)` (§4.6): marks a vertex as a DAG root, used for extension
	/// clusters so they survive pruning independent of listener ownership.
	pub fn add_root(&mut self, cluster: ExtensionCluster) {
		self.roots.push(cluster);
	}

	/// Looks up an already-built extension cluster by its deterministic name
	/// (§4.5 `"extension/<ns>/<name>"`), used by the proxy processor to
	/// resolve a `virtualhost.authorization` reference once the
	/// extension-service processor has run (§5 ordering guarantee).
	pub fn find_extension_cluster(&self, name: &str) -> Option<&ExtensionCluster> {
		self.roots.iter().find(|c| c.name.as_str() == name)
	}

	pub fn listeners(&self) -> impl Iterator<Item = &Listener> {
		self.listeners.values()
	}

	/// §4.6 "Final prune step": delete vhosts with zero routes; delete
	/// secure-vhosts with neither secret nor TCP-proxy; delete listeners
	/// with zero vhosts.
	pub fn prune(&mut self) {
		for listener in self.listeners.values_mut() {
			listener.vhosts.retain(|_, entry| match entry {
				VHostEntry::Insecure(v) => !v.routes.is_empty(),
				VHostEntry::Secure(v) => v.is_routable(),
			});
		}
		self.listeners.retain(|_, l| l.is_routable());
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	pub fn vhost_count(&self) -> usize {
		self.listeners.values().map(|l| l.vhosts.len()).sum()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ensure_listener_is_idempotent() {
		let mut dag = Dag::new();
		dag.ensure_listener(ListenerProtocol::Http, 80, 8080);
		dag.ensure_listener(ListenerProtocol::Http, 80, 8080);
		assert_eq!(dag.listener_count(), 1);
	}

	#[test]
	fn prune_removes_empty_listener() {
		let mut dag = Dag::new();
		dag.ensure_listener(ListenerProtocol::Http, 80, 8080);
		dag.prune();
		assert_eq!(dag.listener_count(), 0);
	}

	#[test]
	fn prune_keeps_listener_with_routed_vhost() {
		let mut dag = Dag::new();
		{
			let vhost = dag.ensure_virtual_host(ListenerProtocol::Http, 80, 8080, "example.com");
			vhost.routes.push(Route::new(PathMatch::Prefix("/".into()), Vec::new()));
		}
		dag.prune();
		assert_eq!(dag.listener_count(), 1);
		assert_eq!(dag.vhost_count(), 1);
	}

	#[test]
	fn vhost_lookup_is_case_insensitive() {
		let mut dag = Dag::new();
		dag.ensure_virtual_host(ListenerProtocol::Http, 80, 8080, "Example.com");
		let listener = dag.listeners.get(&(ListenerProtocol::Http, 80)).unwrap();
		assert!(listener.vhosts.contains_key("example.com"));
	}
}

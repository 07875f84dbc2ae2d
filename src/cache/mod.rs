//! `ResourceCache` (§3, §4.1): the thread-safe store of the latest observed
//! orchestrator objects. A single `RwLock` guards all maps; `Build` holds
//! the read side for the duration of a rebuild, `Insert`/`Remove` take the
//! write side.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use dag_core::prelude::*;
use tracing::instrument;

use crate::errors::{SecretLookupError, ServiceLookupError};
use crate::k8s::service::PortLookup;
use crate::k8s::{ExtensionService, GatewayApiObject, Ingress, Object, Proxy, Secret, Service, TlsCertificateDelegation};

#[derive(Default)]
struct Tables {
	ingresses: HashMap<Meta, Ingress>,
	proxies: HashMap<Meta, Proxy>,
	services: HashMap<Meta, Service>,
	secrets: HashMap<Meta, Secret>,
	delegations: HashMap<Meta, TlsCertificateDelegation>,
	extension_services: HashMap<Meta, ExtensionService>,
	gateway_api: HashMap<Meta, GatewayApiObject>,
}

/// A validated TLS keypair, copied out of the cache so it can outlive a
/// subsequent cache mutation (§3 "Ownership and lifecycle").
pub struct TlsKeypair {
	pub cert: Vec<u8>,
	pub key: Vec<u8>,
}

pub struct ResourceCache {
	tables: RwLock<Tables>,
}

impl Default for ResourceCache {
	fn default() -> Self {
		Self::new()
	}
}

impl ResourceCache {
	pub fn new() -> Self {
		Self {
			tables: RwLock::new(Tables::default()),
		}
	}

	/// §4.1 `Insert`: stores the object and reports whether it should
	/// trigger a rebuild.
	#[instrument(skip_all, fields(kind = obj.kind_name(), meta = %obj.meta()))]
	pub fn insert(&self, obj: Object) -> bool {
		let mut t = self.tables.write().expect("cache lock poisoned");
		match obj {
			Object::Ingress(m, v) => {
				t.ingresses.insert(m, v);
				true
			},
			Object::Proxy(m, v) => {
				t.proxies.insert(m, v);
				true
			},
			Object::Service(m, v) => {
				let referenced = service_is_referenced(&t, &m);
				t.services.insert(m, v);
				referenced
			},
			Object::Secret(m, v) => {
				let referenced = secret_is_referenced(&t, &m);
				t.secrets.insert(m, v);
				referenced
			},
			Object::TlsCertificateDelegation(m, v) => {
				t.delegations.insert(m, v);
				true
			},
			Object::ExtensionService(m, v) => {
				t.extension_services.insert(m, v);
				true
			},
			Object::GatewayApi(m, v) => {
				t.gateway_api.insert(m, v);
				true
			},
			Object::Unclassified(_) => true,
		}
	}

	/// §4.1 `Remove`: symmetric to `insert`. The rebuild-trigger decision is
	/// evaluated against the table state *before* removal, mirroring
	/// `insert`'s "was this referenced" check.
	#[instrument(skip_all, fields(kind = obj.kind_name(), meta = %obj.meta()))]
	pub fn remove(&self, obj: &Object) -> bool {
		let mut t = self.tables.write().expect("cache lock poisoned");
		match obj {
			Object::Ingress(m, _) => {
				t.ingresses.remove(m);
				true
			},
			Object::Proxy(m, _) => {
				t.proxies.remove(m);
				true
			},
			Object::Service(m, _) => {
				let referenced = service_is_referenced(&t, m);
				t.services.remove(m);
				referenced
			},
			Object::Secret(m, _) => {
				let referenced = secret_is_referenced(&t, m);
				t.secrets.remove(m);
				referenced
			},
			Object::TlsCertificateDelegation(m, _) => {
				t.delegations.remove(m);
				true
			},
			Object::ExtensionService(m, _) => {
				t.extension_services.remove(m);
				true
			},
			Object::GatewayApi(m, _) => {
				t.gateway_api.remove(m);
				true
			},
			Object::Unclassified(_) => true,
		}
	}

	/// Takes the read lock for the duration of the closure, mirroring the
	/// "builder takes the reader lock for the full duration of a rebuild"
	/// rule (§4.1 Concurrency). Processors receive `&Tables`-backed
	/// accessors through this snapshot rather than the raw lock guard.
	pub fn snapshot<R>(&self, f: impl FnOnce(&CacheSnapshot<'_>) -> R) -> R {
		let t = self.tables.read().expect("cache lock poisoned");
		let snap = CacheSnapshot { tables: &t };
		f(&snap)
	}
}

/// A point-in-time read-locked view of the cache, passed to processors
/// during one `Build` call.
pub struct CacheSnapshot<'a> {
	tables: &'a Tables,
}

impl<'a> CacheSnapshot<'a> {
	pub fn ingresses(&self) -> impl Iterator<Item = (&Meta, &Ingress)> {
		self.tables.ingresses.iter()
	}

	pub fn proxies(&self) -> impl Iterator<Item = (&Meta, &Proxy)> {
		self.tables.proxies.iter()
	}

	pub fn extension_services(&self) -> impl Iterator<Item = (&Meta, &ExtensionService)> {
		self.tables.extension_services.iter()
	}

	pub fn gateway_api_objects(&self) -> impl Iterator<Item = (&Meta, &GatewayApiObject)> {
		self.tables.gateway_api.iter()
	}

	pub fn proxy(&self, meta: &Meta) -> Option<&Proxy> {
		self.tables.proxies.get(meta)
	}

	pub fn extension_service(&self, meta: &Meta) -> Option<&ExtensionService> {
		self.tables.extension_services.get(meta)
	}

	/// §4.1 `LookupService`.
	pub fn lookup_service<'b>(
		&'b self,
		meta: &Meta,
		port: &crate::k8s::service::PortRef,
	) -> Result<(&'b Service, &'b crate::k8s::service::ServicePort), ServiceLookupError> {
		let svc = self.tables.services.get(meta).ok_or_else(|| ServiceLookupError::NotFound(meta.clone()))?;
		match svc.find_port(port) {
			PortLookup::Matched(p) => {
				if !p.protocol.is_supported() {
					return Err(ServiceLookupError::UnsupportedProtocol {
						meta: meta.clone(),
						port: p.number,
						protocol: format!("{:?}", p.protocol),
					});
				}
				Ok((svc, p))
			},
			PortLookup::NotMatched => Err(ServiceLookupError::PortNotMatched {
				meta: meta.clone(),
				port: port.to_string(),
			}),
		}
	}

	/// §4.1 `DelegationPermitted`: true iff the secret's namespace equals
	/// `target_ns`, or some `TLSCertificateDelegation` living in the
	/// secret's namespace names this secret and permits `target_ns`.
	pub fn delegation_permitted(&self, secret_meta: &Meta, target_ns: &str) -> bool {
		if secret_meta.namespace.as_str() == target_ns {
			return true;
		}
		self
			.tables
			.delegations
			.iter()
			.filter(|(m, _)| m.namespace == secret_meta.namespace)
			.any(|(_, d)| d.permits(secret_meta.name.as_str(), target_ns))
	}

	fn secret(&self, meta: &Meta, referring_ns: &str) -> Result<&Secret, SecretLookupError> {
		let secret = self.tables.secrets.get(meta).ok_or_else(|| SecretLookupError::NotFound(meta.clone()))?;
		if !self.delegation_permitted(meta, referring_ns) {
			return Err(SecretLookupError::DelegationNotPermitted {
				secret: meta.clone(),
				target_namespace: Strng::from(referring_ns),
			});
		}
		Ok(secret)
	}

	/// §4.1 `LookupTLSSecret`.
	pub fn lookup_tls_secret(&self, meta: &Meta, referring_ns: &str) -> Result<TlsKeypair, SecretLookupError> {
		let secret = self.secret(meta, referring_ns)?;
		let (cert, key) = secret.as_tls_keypair().map_err(|reason| SecretLookupError::SecretInvalid { meta: meta.clone(), reason })?;
		Ok(TlsKeypair {
			cert: cert.to_vec(),
			key: key.to_vec(),
		})
	}

	/// §4.1 `LookupCASecret`.
	pub fn lookup_ca_secret(&self, meta: &Meta, referring_ns: &str) -> Result<Vec<u8>, SecretLookupError> {
		let secret = self.secret(meta, referring_ns)?;
		secret
			.as_ca_bundle()
			.map(<[u8]>::to_vec)
			.map_err(|reason| SecretLookupError::SecretInvalid { meta: meta.clone(), reason })
	}

	/// §4.1 `LookupCRLSecret`.
	pub fn lookup_crl_secret(&self, meta: &Meta, referring_ns: &str) -> Result<Vec<u8>, SecretLookupError> {
		let secret = self.secret(meta, referring_ns)?;
		secret
			.as_crl()
			.map(<[u8]>::to_vec)
			.map_err(|reason| SecretLookupError::SecretInvalid { meta: meta.clone(), reason })
	}
}

/// §4.1 rebuild-trigger rule: "a Service triggers rebuild iff some Ingress
/// or Proxy in the same namespace references it by name". We approximate
/// "references it by name" conservatively: any ingress/proxy in the
/// service's namespace is considered a possible referrer, since resolving
/// exact backend names here would duplicate processor logic; this keeps
/// `Insert`/`Remove` O(objects in namespace) rather than requiring a
/// reverse index.
fn service_is_referenced(t: &Tables, svc_meta: &Meta) -> bool {
	t.ingresses.keys().any(|m| m.namespace == svc_meta.namespace) || t.proxies.keys().any(|m| m.namespace == svc_meta.namespace)
}

/// Same conservative approximation as `service_is_referenced`, extended to
/// delegation (a secret may be referenced from any namespace the owning
/// namespace delegates to).
fn secret_is_referenced(t: &Tables, secret_meta: &Meta) -> bool {
	t.ingresses.keys().any(|m| m.namespace == secret_meta.namespace)
		|| t.proxies.keys().any(|m| m.namespace == secret_meta.namespace)
		|| t.delegations.contains_key(secret_meta)
		|| !referenced_namespaces(t, secret_meta).is_empty()
}

fn referenced_namespaces(t: &Tables, secret_meta: &Meta) -> HashSet<Strng> {
	t.delegations
		.get(secret_meta)
		.map(|d| d.delegations.iter().flat_map(|c| c.target_namespaces.iter().cloned()).collect())
		.unwrap_or_default()
}

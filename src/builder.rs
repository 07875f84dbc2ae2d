//! `Build(cache)` (§2, §5): snapshots the cache under a read lock, runs each
//! processor in a fixed order, commits statuses, and returns the new DAG.
//! The builder itself never returns an error (§7 "Propagation") — all
//! failures surface as conditions on an object's status.

use std::sync::Arc;

use tracing::instrument;

use crate::cache::ResourceCache;
use crate::config::BuildConfig;
use crate::dag::Dag;
use crate::processors::{self, ProcessorContext};
use crate::status::StatusCache;

pub struct BuildOutput {
	pub dag: Dag,
	pub status: Arc<StatusCache>,
}

/// Runs one full rebuild. Processors run extension-services, then proxies,
/// then generic ingress, then gateway-api (§5 "Ordering guarantees").
#[instrument(skip_all)]
pub fn build(cache: &ResourceCache, config: &BuildConfig) -> BuildOutput {
	let status = StatusCache::new();
	let mut dag = Dag::new();

	cache.snapshot(|snapshot| {
		let ctx = ProcessorContext {
			cache: snapshot,
			status: status.as_ref(),
			config,
		};
		processors::run_all(&mut dag, &ctx);
	});

	dag.prune();

	BuildOutput { dag, status }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::k8s::ingress::{HttpIngressPath, Ingress, IngressBackend, IngressRule};
	use crate::k8s::service::{PortRef, Protocol, Service, ServicePort};
	use crate::k8s::Object;
	use dag_core::Meta;
	use std::collections::HashMap;

	#[test]
	fn empty_cache_yields_empty_dag_and_no_statuses() {
		let cache = ResourceCache::new();
		let out = build(&cache, &BuildConfig::default());
		assert_eq!(out.dag.listener_count(), 0);
		assert!(out.status.is_empty());
	}

	#[test]
	fn build_is_deterministic_across_runs() {
		let cache = ResourceCache::new();
		cache.insert(Object::Service(
			Meta::new("default", "web"),
			Service {
				ports: vec![ServicePort {
					name: "http".into(),
					number: 80,
					protocol: Protocol::TCP,
				}],
				external_name: None,
				annotations: HashMap::new(),
			},
		));
		cache.insert(Object::Ingress(
			Meta::new("default", "www"),
			Ingress {
				default_backend: None,
				rules: vec![IngressRule {
					host: Some("example.com".into()),
					paths: vec![HttpIngressPath {
						path: Some("/".into()),
						backend: IngressBackend {
							service_name: "web".into(),
							service_port: PortRef::Number(80),
						},
					}],
				}],
				tls: vec![],
				annotations: HashMap::new(),
			},
		));

		let config = BuildConfig::default();
		let first = build(&cache, &config);
		let second = build(&cache, &config);
		assert_eq!(first.dag.listener_count(), second.dag.listener_count());
		assert_eq!(first.dag.vhost_count(), second.dag.vhost_count());
		assert_eq!(first.dag.listener_count(), 1);
	}
}

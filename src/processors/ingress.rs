//! Generic HTTP ingress processor (§4.3).

use dag_core::prelude::*;

use crate::dag::cluster::{CircuitBreakerLimits, Cluster, DnsLookupFamily, UpstreamProtocol_};
use crate::dag::route::{PathMatch, Route};
use crate::dag::{Dag, ListenerProtocol};
use crate::k8s::ingress::{path_is_regex, regex_path_error, Ingress};
use crate::k8s::proxy::{RetryPolicy, TimeoutPolicy};
use crate::k8s::service::PortRef;
use crate::processors::ProcessorContext;
use crate::status::{Condition, Reason, StatusKey};

const GROUP: &str = "networking.k8s.io";
const KIND: &str = "Ingress";

const HTTP_PORT: u16 = 80;
const HTTPS_PORT: u16 = 443;

pub fn run(dag: &mut Dag, ctx: &ProcessorContext<'_>) {
	for (meta, ingress) in ctx.cache.ingresses() {
		let mut accessor = ctx.status.accessor();
		match build_one(dag, ctx, meta, ingress) {
			Ok(()) => {
				accessor.add(Condition::valid());
			},
			Err((reason, message)) => {
				accessor.add(Condition::invalid(reason, message));
			},
		}
		ctx.status.commit(StatusKey::new(GROUP, KIND, meta.clone()), accessor);
	}
}

fn build_one(dag: &mut Dag, ctx: &ProcessorContext<'_>, meta: &Meta, ingress: &Ingress) -> Result<(), (Reason, String)> {
	let force_ssl_redirect = ingress
		.annotation("ingress.kubernetes.io/force-ssl-redirect")
		.map(|v| v == "true")
		.unwrap_or(false);
	let http_allowed = ingress
		.annotation("kubernetes.io/ingress.allow-http")
		.map(|v| v != "false")
		.unwrap_or(true);
	let min_tls = ingress.annotation("ingress.kubernetes.io/tls-minimum-protocol-version").map(Strng::from);

	let request_timeout = ingress.request_timeout();
	let retry_policy = ingress.retry_policy();
	let websocket_paths = ingress.websocket_paths();
	let circuit_breaker = ingress.circuit_breaker_limits();

	for rule in ingress.synthesized_rules() {
		let host = rule.host.clone().unwrap_or_else(|| Strng::from("*"));
		let tls_secret = tls_secret_for_host(meta, ingress, host.as_str());

		for path in &rule.paths {
			let path_str = path.path.clone().unwrap_or_else(|| Strng::from("/"));
			let path_match = if path_is_regex(path_str.as_str()) {
				if let Some(err) = regex_path_error(path_str.as_str()) {
					return Err((Reason::RouteError, format!("path {path_str} is not a valid regex: {err}")));
				}
				PathMatch::Regex(path_str.clone())
			} else {
				PathMatch::Prefix(path_str.clone())
			};
			let backend_meta = Meta::new(meta.namespace.clone(), path.backend.service_name.clone());
			let cluster = resolve_cluster(dag, ctx, ingress, &backend_meta, &path.backend.service_port, circuit_breaker)
				.map_err(|e| (Reason::ServiceUnresolvedReference, e))?;

			let is_tls_host = tls_secret.is_some();
			let websocket = websocket_paths.iter().any(|p| p.as_str() == path_str.as_str());

			if http_allowed {
				let vhost = dag.ensure_virtual_host(ListenerProtocol::Http, HTTP_PORT, HTTP_PORT, &host);
				let mut route = Route::new(path_match.clone(), vec![cluster.clone()]);
				route.https_upgrade = is_tls_host && force_ssl_redirect;
				route.websocket = websocket;
				route.retry_policy = retry_policy.clone();
				if let Some(t) = &request_timeout {
					route.timeout_policy = TimeoutPolicy {
						response: Some(t.clone()),
						idle: None,
					};
				}
				vhost.routes.push(route);
			}

			if let Some(secret_meta) = &tls_secret {
				attach_secure_route(
					dag,
					ctx,
					meta,
					&host,
					&path_match,
					cluster,
					secret_meta,
					min_tls.clone(),
					websocket,
					retry_policy.clone(),
					request_timeout.clone(),
				)?;
			}
		}
	}
	Ok(())
}

/// §4.3 "if TLS is configured ... create/reuse a SecureVirtualHost for each
/// TLS host": finds the `IngressTls` entry (if any) whose `hosts` list names
/// `host`, and resolves its `secretName` against the ingress's own
/// namespace.
fn tls_secret_for_host(meta: &Meta, ingress: &Ingress, host: &str) -> Option<Meta> {
	ingress
		.tls
		.iter()
		.find(|t| t.hosts.iter().any(|h| h.as_str() == host))
		.and_then(|t| t.secret_name.as_ref())
		.map(|name| Meta::new(meta.namespace.clone(), name.clone()))
}

/// §4.3 "upstream-protocol.\{h2|h2c|tls\}" and the four circuit-breaker
/// annotations apply per-ingress across every backend cluster it builds.
fn resolve_cluster(
	dag: &Dag,
	ctx: &ProcessorContext<'_>,
	ingress: &Ingress,
	backend_meta: &Meta,
	port: &PortRef,
	circuit_breaker: (Option<u32>, Option<u32>, Option<u32>, Option<u32>),
) -> Result<Cluster, String> {
	let (_svc, matched) = dag
		.ensure_service(backend_meta, port, None, ctx.cache, ctx.config.enable_external_name_service)
		.map_err(|e| e.to_string())?;
	let upstream_protocol = ingress
		.upstream_protocol_override(matched)
		.map(|p| UpstreamProtocol_::from(Some(p)))
		.unwrap_or(UpstreamProtocol_::Http1);
	let (max_connections, max_pending_requests, max_requests, max_retries) = circuit_breaker;
	Ok(Cluster {
		service: backend_meta.clone(),
		service_port_name: matched.name.clone(),
		upstream_protocol,
		load_balancer_policy: crate::k8s::extension_service::LoadBalancerPolicy::RoundRobin,
		weight: 1,
		upstream_validation: None,
		sni: None,
		client_certificate: None,
		timeout_policy: Default::default(),
		slow_start: None,
		dns_lookup_family: DnsLookupFamily::Auto,
		circuit_breaker: CircuitBreakerLimits {
			max_connections,
			max_pending_requests,
			max_requests,
			max_retries,
		},
	})
}

#[allow(clippy::too_many_arguments)]
fn attach_secure_route(
	dag: &mut Dag,
	ctx: &ProcessorContext<'_>,
	meta: &Meta,
	host: &str,
	path_match: &PathMatch,
	cluster: Cluster,
	secret_meta: &Meta,
	min_tls: Option<Strng>,
	websocket: bool,
	retry_policy: Option<RetryPolicy>,
	request_timeout: Option<Strng>,
) -> Result<(), (Reason, String)> {
	if !ctx.cache.delegation_permitted(secret_meta, meta.namespace.as_str()) {
		return Err((
			Reason::DelegationNotPermitted,
			format!("secret {secret_meta} is not delegated to namespace {}", meta.namespace),
		));
	}
	let keypair = ctx
		.cache
		.lookup_tls_secret(secret_meta, meta.namespace.as_str())
		.map_err(|e| (Reason::SecretNotValid, e.to_string()))?;

	let svh = dag.ensure_secure_virtual_host(ListenerProtocol::Https, HTTPS_PORT, HTTPS_PORT, host);
	if svh.server_certificate.is_none() {
		svh.server_certificate = Some(crate::dag::vhost::ServerCertificate {
			secret: secret_meta.clone(),
			cert: keypair.cert,
			key: keypair.key,
		});
	}
	if svh.min_tls_version.is_none() {
		svh.min_tls_version = min_tls.and_then(|v| match v.as_str() {
			"1.3" => Some(crate::k8s::proxy::TlsVersion::V1_3),
			_ => Some(crate::k8s::proxy::TlsVersion::V1_2),
		});
	}
	let mut route = Route::new(path_match.clone(), vec![cluster]);
	route.websocket = websocket;
	route.retry_policy = retry_policy;
	if let Some(t) = request_timeout {
		route.timeout_policy = TimeoutPolicy {
			response: Some(t),
			idle: None,
		};
	}
	svh.virtual_host.routes.push(route);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::k8s::ingress::{IngressBackend, IngressTls};
	use std::collections::HashMap;

	#[test]
	fn tls_secret_resolved_by_host() {
		let meta = Meta::new("default", "www");
		let ingress = Ingress {
			default_backend: None,
			rules: vec![],
			tls: vec![IngressTls {
				hosts: vec!["x.example.com".into()],
				secret_name: Some("s".into()),
			}],
			annotations: HashMap::new(),
		};
		let resolved = tls_secret_for_host(&meta, &ingress, "x.example.com");
		assert_eq!(resolved, Some(Meta::new("default", "s")));
		assert_eq!(tls_secret_for_host(&meta, &ingress, "other.example.com"), None);
	}

	#[test]
	fn no_tls_entries_means_no_secure_route() {
		let meta = Meta::new("default", "www");
		let ingress = Ingress {
			default_backend: Some(IngressBackend {
				service_name: "web".into(),
				service_port: PortRef::Number(80),
			}),
			rules: vec![],
			tls: vec![],
			annotations: HashMap::new(),
		};
		assert_eq!(tls_secret_for_host(&meta, &ingress, "*"), None);
	}
}

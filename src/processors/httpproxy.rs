//! Proxy processor (§4.4): ingress-like routing extended with recursive
//! inclusion and TCP-proxy delegation.

use std::collections::{HashMap, HashSet};

use dag_core::prelude::*;

use crate::dag::cluster::{Cluster, DnsLookupFamily, UpstreamProtocol_};
use crate::dag::route::{DirectResponse, PathMatch, Route};
use crate::dag::vhost::{DownstreamValidation, ServerCertificate};
use crate::dag::{Dag, ListenerProtocol, SecureVirtualHost, TcpProxy};
use crate::k8s::extension_service::LoadBalancerPolicy;
use crate::k8s::proxy::{HeaderMatch, MatchCondition, Proxy, QueryParamMatch, RouteService, RouteSpec, TcpProxySpec};
use crate::k8s::service::PortRef;
use crate::processors::ProcessorContext;
use crate::status::{Condition, Reason, StatusAccessor, StatusKey};

const GROUP: &str = "projectcontour.io";
const KIND: &str = "HTTPProxy";

const HTTP_PORT: u16 = 80;
const HTTPS_PORT: u16 = 443;

/// The accumulated, conjunctive match condition along an include path
/// (§4.4 `computeRoutes`).
#[derive(Clone, Debug)]
struct Accumulated {
	prefix: String,
	headers: Vec<HeaderMatch>,
	query: Vec<QueryParamMatch>,
}

impl Accumulated {
	fn extend(&self, cond: Option<&MatchCondition>) -> Self {
		let mut out = self.clone();
		if let Some(cond) = cond {
			if let Some(p) = &cond.prefix {
				if out.prefix == "/" {
					out.prefix = p.to_string();
				} else {
					out.prefix = format!("{}{}", out.prefix.trim_end_matches('/'), p);
				}
			}
			out.headers.extend(cond.headers.iter().cloned());
			out.query.extend(cond.query_params.iter().cloned());
		}
		out
	}

	/// §4.4: "the bare prefix '/' with no header/query matches is exempt".
	fn is_bare_root(&self) -> bool {
		self.prefix == "/" && self.headers.is_empty() && self.query.is_empty()
	}

	fn dedup_key(&self) -> (String, Vec<HeaderMatch>, Vec<QueryParamMatch>) {
		let mut headers = self.headers.clone();
		headers.sort();
		let mut query = self.query.clone();
		query.sort();
		(self.prefix.clone(), headers, query)
	}
}

impl Default for Accumulated {
	fn default() -> Self {
		Self {
			prefix: "/".to_string(),
			headers: Vec::new(),
			query: Vec::new(),
		}
	}
}

struct BuildState<'a, 'b> {
	dag: &'a mut Dag,
	ctx: &'a ProcessorContext<'b>,
	accessors: HashMap<Meta, StatusAccessor>,
	claimed: HashSet<Meta>,
}

pub fn run(dag: &mut Dag, ctx: &ProcessorContext<'_>) {
	let mut state = BuildState {
		dag,
		ctx,
		accessors: HashMap::new(),
		claimed: HashSet::new(),
	};

	let mut roots_by_fqdn: HashMap<String, Vec<Meta>> = HashMap::new();
	for (meta, proxy) in ctx.cache.proxies() {
		if let Some(vh) = &proxy.virtualhost {
			roots_by_fqdn.entry(vh.fqdn.to_ascii_lowercase()).or_default().push(meta.clone());
		}
	}

	let mut fqdns: Vec<&String> = roots_by_fqdn.keys().collect();
	fqdns.sort();
	for fqdn in fqdns {
		let mut metas = roots_by_fqdn[fqdn].clone();
		metas.sort();
		if metas.len() > 1 {
			let names = metas.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", ");
			for m in &metas {
				state.claimed.insert(m.clone());
				state
					.accessors
					.entry(m.clone())
					.or_default()
					.add(Condition::invalid(Reason::DuplicateVhost, format!("fqdn {fqdn} is used by proxies: {names}")).with_fqdn(fqdn.clone()));
			}
			continue;
		}
		let meta = metas.into_iter().next().unwrap();
		state.claimed.insert(meta.clone());
		let proxy = state.ctx.cache.proxy(&meta).expect("root meta came from the proxy table").clone();
		build_root(&mut state, &meta, &proxy);
	}

	for (meta, proxy) in ctx.cache.proxies() {
		if !proxy.is_root() && !state.claimed.contains(meta) {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::orphaned("this HTTPProxy is not part of a delegation chain from a root HTTPProxy"));
		}
	}

	for (meta, accessor) in state.accessors {
		state.ctx.status.commit(StatusKey::new(GROUP, KIND, meta), accessor);
	}
}

fn build_root(state: &mut BuildState<'_, '_>, meta: &Meta, proxy: &Proxy) {
	let vh = proxy.virtualhost.as_ref().expect("build_root called only on roots");

	if !state.ctx.config.root_namespace_allowed(meta.namespace.as_str()) {
		state
			.accessors
			.entry(meta.clone())
			.or_default()
			.add(Condition::invalid(Reason::RootProxyNotAllowedInNamespace, format!("namespace {} is not a permitted root namespace", meta.namespace)));
		return;
	}
	if vh.fqdn.is_empty() {
		state
			.accessors
			.entry(meta.clone())
			.or_default()
			.add(Condition::invalid(Reason::VirtualHostError, "spec.virtualhost.fqdn must not be empty".to_string()));
		return;
	}
	if vh.fqdn.contains('*') {
		state
			.accessors
			.entry(meta.clone())
			.or_default()
			.add(Condition::invalid(Reason::VirtualHostError, format!("fqdn {} must not contain a wildcard", vh.fqdn)));
		return;
	}

	let mut secure: Option<SecureVirtualHost> = None;
	if let Some(tls) = &vh.tls {
		if let Err(msg) = tls.validate() {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::TLSIncompatibleFeatures, msg.to_string()).with_fqdn(vh.fqdn.to_string()));
			return;
		}
		if tls.conflicts_with_authorization() && vh.authorization.is_some() {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::TLSIncompatibleFeatures, "tls.fallbackCertificate and authorization are mutually exclusive".to_string()).with_fqdn(vh.fqdn.to_string()));
			return;
		}

		let mut svh = SecureVirtualHost::new(vh.fqdn.clone());
		svh.min_tls_version = tls.minimum_protocol_version;
		svh.max_tls_version = tls.maximum_protocol_version;
		svh.alpn = crate::k8s::proxy::alpn_for_http_versions(&tls.http_versions);

		if !tls.passthrough {
			let Some(secret_name) = &tls.secret_name else {
				state
					.accessors
					.entry(meta.clone())
					.or_default()
					.add(Condition::invalid(Reason::TLSError, "tls.secretName is required when tls.passthrough is unset".to_string()));
				return;
			};
			let secret_meta = Meta::new(meta.namespace.clone(), secret_name.clone());
			if !state.ctx.cache.delegation_permitted(&secret_meta, meta.namespace.as_str()) {
				state
					.accessors
					.entry(meta.clone())
					.or_default()
					.add(Condition::invalid(Reason::DelegationNotPermitted, format!("secret {secret_meta} is not delegated to namespace {}", meta.namespace)));
				return;
			}
			match state.ctx.cache.lookup_tls_secret(&secret_meta, meta.namespace.as_str()) {
				Ok(kp) => {
					svh.server_certificate = Some(ServerCertificate {
						secret: secret_meta,
						cert: kp.cert,
						key: kp.key,
					});
				},
				Err(e) => {
					state
						.accessors
						.entry(meta.clone())
						.or_default()
						.add(Condition::invalid(Reason::SecretNotValid, e.to_string()));
					return;
				},
			}
		}

		if let Some(fallback_meta) = &tls.fallback_certificate {
			if !state.ctx.cache.delegation_permitted(fallback_meta, meta.namespace.as_str()) {
				state
					.accessors
					.entry(meta.clone())
					.or_default()
					.add(Condition::invalid(Reason::DelegationNotPermitted, format!("fallback certificate {fallback_meta} is not delegated to namespace {}", meta.namespace)));
				return;
			}
			match state.ctx.cache.lookup_tls_secret(fallback_meta, meta.namespace.as_str()) {
				Ok(kp) => {
					svh.fallback_certificate = Some(ServerCertificate {
						secret: fallback_meta.clone(),
						cert: kp.cert,
						key: kp.key,
					});
				},
				Err(e) => {
					state.accessors.entry(meta.clone()).or_default().add(Condition::invalid(Reason::SecretNotValid, e.to_string()));
					return;
				},
			}
		}

		if let Some(cv) = &tls.client_validation {
			let ca_meta = &cv.ca_secret;
			match state.ctx.cache.lookup_ca_secret(ca_meta, meta.namespace.as_str()) {
				Ok(ca) => {
					let crl = match &cv.crl_secret {
						Some(crl_meta) => match state.ctx.cache.lookup_crl_secret(crl_meta, meta.namespace.as_str()) {
							Ok(c) => Some(c),
							Err(e) => {
								state.accessors.entry(meta.clone()).or_default().add(Condition::invalid(Reason::TLSError, e.to_string()));
								return;
							},
						},
						None => None,
					};
					svh.downstream_validation = Some(DownstreamValidation {
						ca_certs: ca,
						crl,
						skip_client_cert_validation: cv.skip_client_cert_validation,
					});
				},
				Err(e) => {
					state.accessors.entry(meta.clone()).or_default().add(Condition::invalid(Reason::TLSError, e.to_string()));
					return;
				},
			}
		}

		secure = Some(svh);
	}

	if let Err(msg) = crate::k8s::proxy::validate_jwt_providers(&vh.jwt_providers) {
		state.accessors.entry(meta.clone()).or_default().add(Condition::invalid(Reason::JWTVerificationError, msg));
		return;
	}
	for provider in &vh.jwt_providers {
		if let Err(msg) = validate_remote_jwks(&provider.remote_jwks) {
			state.accessors.entry(meta.clone()).or_default().add(Condition::invalid(Reason::JWTVerificationError, msg));
			return;
		}
	}
	if let Some(svh) = secure.as_mut() {
		svh.jwt_providers = vh.jwt_providers.clone();
	}

	if let Some(authz) = &vh.authorization {
		if state.ctx.cache.extension_service(&authz.extension_ref).is_none() {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::AuthError, format!("extension service {} not found", authz.extension_ref)));
			return;
		}
		if authz.response_timeout.as_ref().is_some_and(|t| parse_duration(t).is_none()) {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::AuthResponseTimeoutInvalid, "authorization.responseTimeout is not a valid duration".to_string()));
			return;
		}
		let Some(svh) = secure.as_mut() else {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::AuthError, "authorization requires tls to be configured".to_string()));
			return;
		};
		let cluster_name = crate::k8s::extension_service::extension_cluster_name(authz.extension_ref.namespace.as_str(), authz.extension_ref.name.as_str());
		match state.dag.find_extension_cluster(cluster_name.as_str()) {
			Some(ext) => {
				svh.external_authorization = Some(crate::dag::vhost::ExternalAuthorization {
					cluster: ext.clone(),
					response_timeout: authz.response_timeout.clone(),
					fail_open: authz.fail_open,
				});
			},
			None => {
				state
					.accessors
					.entry(meta.clone())
					.or_default()
					.add(Condition::invalid(Reason::AuthError, format!("extension service {} did not produce a usable cluster", authz.extension_ref)));
				return;
			},
		}
	}

	if let Some(tcpproxy) = &proxy.tcpproxy {
		if secure.is_none() {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::TCPProxyError, "tcpproxy requires tls to be configured".to_string()));
			return;
		}
		let mut svh = secure.take().unwrap();
		svh.virtual_host.cors_policy = vh.cors_policy.clone();
		svh.virtual_host.rate_limit_policy = vh.rate_limit_policy.clone();
		svh.virtual_host.ip_filter = vh.ip_allow_deny.clone();
		let mut visited = vec![meta.clone()];
		match build_tcp_proxy(state, meta, tcpproxy, &mut visited) {
			Ok(tp) => svh.tcp_proxy = Some(tp),
			Err((reason, msg)) => {
				state.accessors.entry(meta.clone()).or_default().add(Condition::invalid(reason, msg));
				return;
			},
		}
		attach_secure_vhost(state.dag, vh.fqdn.as_str(), svh);
		state.accessors.entry(meta.clone()).or_default().add(Condition::valid().with_fqdn(vh.fqdn.to_string()));
		return;
	}

	let mut visited = vec![meta.clone()];
	let routes = expand_prefix_rewrites(compute_routes(state, meta, proxy, Accumulated::default(), &mut visited, &mut HashSet::new()));

	if let Some(mut svh) = secure {
		svh.virtual_host.cors_policy = vh.cors_policy.clone();
		svh.virtual_host.rate_limit_policy = vh.rate_limit_policy.clone();
		svh.virtual_host.ip_filter = vh.ip_allow_deny.clone();
		for r in routes.clone() {
			svh.virtual_host.routes.push(r);
		}
		attach_secure_vhost(state.dag, vh.fqdn.as_str(), svh);
	}
	let insecure_vh = state.dag.ensure_virtual_host(ListenerProtocol::Http, HTTP_PORT, HTTP_PORT, vh.fqdn.as_str());
	insecure_vh.cors_policy = vh.cors_policy.clone();
	insecure_vh.rate_limit_policy = vh.rate_limit_policy.clone();
	insecure_vh.ip_filter = vh.ip_allow_deny.clone();
	for r in routes {
		insecure_vh.routes.push(r);
	}

	state.accessors.entry(meta.clone()).or_default().add(Condition::valid().with_fqdn(vh.fqdn.to_string()));
}

fn attach_secure_vhost(dag: &mut Dag, fqdn: &str, svh: SecureVirtualHost) {
	let target = dag.ensure_secure_virtual_host(ListenerProtocol::Https, HTTPS_PORT, HTTPS_PORT, fqdn);
	*target = svh;
}

fn validate_remote_jwks(jwks: &crate::k8s::proxy::RemoteJwks) -> Result<(), String> {
	let url = url::Url::parse(jwks.uri.as_str()).map_err(|e| format!("jwt provider remoteJWKS uri is not a valid URL: {e}"))?;
	match url.scheme() {
		"http" | "https" => {},
		other => return Err(format!("jwt provider remoteJWKS uri scheme {other} is not http or https")),
	}
	if jwks.upstream_validation.is_some() && url.scheme() != "https" {
		return Err("jwt provider upstreamValidation requires an https remoteJWKS uri".to_string());
	}
	Ok(())
}

fn parse_duration(s: &str) -> Option<std::time::Duration> {
	if s == "infinity" {
		return Some(std::time::Duration::MAX);
	}
	let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
	let unit = &s[digits.len()..];
	let n: u64 = digits.parse().ok()?;
	match unit {
		"s" => Some(std::time::Duration::from_secs(n)),
		"ms" => Some(std::time::Duration::from_millis(n)),
		_ => None,
	}
}

/// §4.4 `computeRoutes`: recursive include resolution with cycle detection.
fn compute_routes(
	state: &mut BuildState<'_, '_>,
	meta: &Meta,
	proxy: &Proxy,
	accumulated: Accumulated,
	visited: &mut Vec<Meta>,
	seen_conditions: &mut HashSet<(String, Vec<HeaderMatch>, Vec<QueryParamMatch>)>,
) -> Vec<Route> {
	state.claimed.insert(meta.clone());
	let mut out = Vec::new();

	for route_spec in &proxy.routes {
		let own_cond = route_spec.conditions.first();
		let effective = accumulated.extend(own_cond);
		out.extend(build_leaf_routes(state, meta, route_spec, &effective));
	}

	for include in &proxy.includes {
		let target_ns = include.namespace.clone().unwrap_or_else(|| meta.namespace.clone());
		let target_meta = Meta::new(target_ns, include.name.clone());
		let include_cond = include.conditions.first();
		let child_accumulated = accumulated.extend(include_cond);

		if !child_accumulated.is_bare_root() {
			let key = child_accumulated.dedup_key();
			if !seen_conditions.insert(key) {
				state
					.accessors
					.entry(meta.clone())
					.or_default()
					.add(Condition::invalid(Reason::DuplicateMatchConditions, format!("include of {target_meta} repeats a previously-seen match condition")));
				continue;
			}
		}

		if visited.contains(&target_meta) {
			let path = visited.iter().chain(std::iter::once(&target_meta)).map(|m| m.to_string()).collect::<Vec<_>>().join(" -> ");
			state
				.accessors
				.entry(target_meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::IncludeCreatesCycle, format!("include path creates a cycle: {path}")));
			continue;
		}

		let Some(child) = state.ctx.cache.proxy(&target_meta).cloned() else {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::IncludeNotFound, format!("include target {target_meta} not found")));
			if !include.conditions.is_empty() {
				out.push(Route::synthetic_502(PathMatch::Prefix(Strng::from(child_accumulated.prefix.clone()))));
			}
			continue;
		};

		if child.is_root() {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::RootIncludesRoot, format!("include target {target_meta} is itself a root HTTPProxy")));
			out.push(Route::synthetic_502(PathMatch::Prefix(Strng::from(child_accumulated.prefix.clone()))));
			continue;
		}

		visited.push(target_meta.clone());
		out.extend(compute_routes(state, &target_meta, &child, child_accumulated, visited, seen_conditions));
		visited.pop();
		mark_valid_if_not_fatal(state, &target_meta);
	}

	out
}

/// A non-root proxy reached via a successful include never otherwise gets a
/// `Valid` condition recorded (only errors are pushed as they're found), so
/// §8 invariant 2 (valid+invalid+orphaned == proxy count) would undercount
/// it. Called once its subtree has finished processing.
fn mark_valid_if_not_fatal(state: &mut BuildState<'_, '_>, meta: &Meta) {
	let fatal = state.accessors.get(meta).is_some_and(|a| a.is_fatal());
	if !fatal {
		state.accessors.entry(meta.clone()).or_default().add(Condition::valid());
	}
}

fn build_leaf_routes(state: &mut BuildState<'_, '_>, meta: &Meta, spec: &RouteSpec, cond: &Accumulated) -> Vec<Route> {
	if spec.action_count() != 1 {
		state
			.accessors
			.entry(meta.clone())
			.or_default()
			.add(Condition::invalid(Reason::RouteError, "exactly one of services, requestRedirect, directResponse must be set".to_string()));
		return Vec::new();
	}
	if spec.mirror_count() > 1 {
		state
			.accessors
			.entry(meta.clone())
			.or_default()
			.add(Condition::invalid(Reason::OnlyOneMirror, "at most one service may be marked mirror".to_string()));
		return Vec::new();
	}

	let path_match = if is_regex_path(&cond.prefix) {
		if let Some(err) = crate::k8s::ingress::regex_path_error(&cond.prefix) {
			state
				.accessors
				.entry(meta.clone())
				.or_default()
				.add(Condition::invalid(Reason::RouteError, format!("path {} is not a valid regex: {err}", cond.prefix)));
			return Vec::new();
		}
		PathMatch::Regex(Strng::from(cond.prefix.clone()))
	} else {
		PathMatch::Prefix(Strng::from(cond.prefix.clone()))
	};

	if let Some(dr) = &spec.direct_response {
		let status_code = match http::StatusCode::from_u16(dr.status_code) {
			Ok(s) => s,
			Err(_) => {
				state
					.accessors
					.entry(meta.clone())
					.or_default()
					.add(Condition::invalid(Reason::RouteError, format!("directResponse status {} is not a valid HTTP status code", dr.status_code)));
				return Vec::new();
			},
		};
		let mut r = Route::synthetic_502(path_match);
		r.direct_response = Some(DirectResponse {
			status_code,
			body: dr.body.clone(),
		});
		r.header_matches = cond.headers.clone();
		r.query_matches = cond.query.clone();
		return vec![r];
	}
	if let Some(rr) = &spec.request_redirect {
		let status_code = match rr.status_code.map(http::StatusCode::from_u16) {
			Some(Ok(s)) => s,
			Some(Err(_)) => {
				state
					.accessors
					.entry(meta.clone())
					.or_default()
					.add(Condition::invalid(Reason::RouteError, format!("requestRedirect status {} is not a valid HTTP status code", rr.status_code.unwrap_or_default())));
				return Vec::new();
			},
			None => http::StatusCode::FOUND,
		};
		let mut r = Route::new(path_match, Vec::new());
		r.redirect = Some(crate::dag::route::Redirect { hostname: rr.hostname.clone(), status_code });
		r.header_matches = cond.headers.clone();
		r.query_matches = cond.query.clone();
		return vec![r];
	}

	let mut clusters = Vec::new();
	let mut mirror = None;
	for svc in &spec.services {
		match build_route_service_cluster(state, meta, svc) {
			Ok(cluster) => {
				if svc.mirror {
					mirror = Some(cluster);
				} else {
					clusters.push(cluster);
				}
			},
			Err(msg) => {
				state.accessors.entry(meta.clone()).or_default().add(Condition::invalid(Reason::ServiceUnresolvedReference, msg));
				return Vec::new();
			},
		}
	}

	let mut route = Route::new(path_match, clusters);
	route.header_matches = cond.headers.clone();
	route.query_matches = cond.query.clone();
	route.mirror = mirror;
	route.websocket = spec.enable_websockets;
	route.https_upgrade = !spec.permit_insecure;
	route.jwt_provider = spec.jwt_provider.clone();
	route.auth_disabled = spec.auth_disabled;
	route.prefix_rewrite = spec.prefix_rewrite.clone();
	route.retry_policy = spec.retry_policy.clone();
	route.internal_redirect_policy = spec.internal_redirect_policy.clone();
	if let Some(tp) = &spec.timeout_policy {
		route.timeout_policy = tp.clone();
	}
	if let Some(hp) = &spec.request_headers_policy {
		route.request_headers_policy = crate::dag::route::HeadersPolicy {
			set: hp.set.clone(),
			remove: hp.remove.clone(),
		};
	}
	if let Some(hp) = &spec.response_headers_policy {
		route.response_headers_policy = crate::dag::route::HeadersPolicy {
			set: hp.set.clone(),
			remove: hp.remove.clone(),
		};
	}
	vec![route]
}

fn build_route_service_cluster(state: &BuildState<'_, '_>, meta: &Meta, svc: &RouteService) -> Result<Cluster, String> {
	let port_num = match &svc.port {
		PortRef::Number(n) => *n,
		PortRef::Name(_) => 0,
	};
	if matches!(&svc.port, PortRef::Number(_)) && !(1..=65535).contains(&port_num) {
		return Err(format!("service {} port {port_num} out of range", svc.name));
	}

	let target_meta = Meta::new(meta.namespace.clone(), svc.name.clone());
	let (_backing, matched) = state
		.dag
		.ensure_service(&target_meta, &svc.port, None, state.ctx.cache, state.ctx.config.enable_external_name_service)
		.map_err(|e| e.to_string())?;

	let protocol = svc.protocol;
	if let Some(p) = protocol {
		if !matches!(p, crate::k8s::extension_service::UpstreamProtocol::H2c | crate::k8s::extension_service::UpstreamProtocol::H2 | crate::k8s::extension_service::UpstreamProtocol::Tls) {
			return Err(format!("service {} declares unsupported upstream protocol", svc.name));
		}
	}
	let upstream_validation = if matches!(protocol, Some(crate::k8s::extension_service::UpstreamProtocol::Tls) | Some(crate::k8s::extension_service::UpstreamProtocol::H2)) {
		svc.upstream_validation.clone()
	} else {
		None
	};

	Ok(Cluster {
		service: target_meta,
		service_port_name: matched.name.clone(),
		upstream_protocol: UpstreamProtocol_::from(protocol),
		load_balancer_policy: LoadBalancerPolicy::RoundRobin,
		weight: svc.weight,
		upstream_validation,
		sni: None,
		client_certificate: None,
		timeout_policy: Default::default(),
		slow_start: None,
		dns_lookup_family: DnsLookupFamily::Auto,
		circuit_breaker: Default::default(),
	})
}

fn is_regex_path(path: &str) -> bool {
	crate::k8s::ingress::path_is_regex(path)
}

/// §4.4 "Prefix-match expansion": for every route with a prefix match and a
/// `PrefixRewrite`, synthesize a sibling so `/foo` and `/foo/` rewrite
/// consistently.
fn expand_prefix_rewrites(routes: Vec<Route>) -> Vec<Route> {
	let mut out = Vec::with_capacity(routes.len());
	for route in routes {
		let sibling = match (&route.path_match, &route.prefix_rewrite) {
			(PathMatch::Prefix(p), Some(rewrite)) => {
				let (base_path, base_rewrite, alt_path, alt_rewrite) = if p.ends_with('/') {
					(p.trim_end_matches('/').to_string(), rewrite.trim_end_matches('/').to_string(), p.to_string(), rewrite.to_string())
				} else {
					(p.to_string(), rewrite.to_string(), format!("{p}/"), format!("{}/", rewrite.trim_end_matches('/')))
				};
				let mut a = route.clone();
				a.path_match = PathMatch::Prefix(Strng::from(base_path));
				a.prefix_rewrite = Some(Strng::from(base_rewrite));
				let mut b = route.clone();
				b.path_match = PathMatch::Prefix(Strng::from(alt_path));
				b.prefix_rewrite = Some(Strng::from(alt_rewrite));
				Some((a, b))
			},
			_ => None,
		};
		match sibling {
			Some((a, b)) => {
				out.push(a);
				out.push(b);
			},
			None => out.push(route),
		}
	}
	out
}

/// §4.4 `processTCPProxy`: same cycle-detection discipline as includes,
/// producing a single [`TcpProxy`] on the leaf.
fn build_tcp_proxy(state: &mut BuildState<'_, '_>, meta: &Meta, spec: &TcpProxySpec, visited: &mut Vec<Meta>) -> Result<TcpProxy, (Reason, String)> {
	if !spec.services.is_empty() {
		let mut clusters = Vec::new();
		for svc in &spec.services {
			let cluster = build_route_service_cluster(state, meta, svc).map_err(|e| (Reason::TCPProxyError, e))?;
			clusters.push(cluster);
		}
		return Ok(TcpProxy { clusters });
	}
	let Some(include) = &spec.include else {
		return Err((Reason::TCPProxyError, "tcpproxy must set either services or include".to_string()));
	};
	let target_ns = include.namespace.clone().unwrap_or_else(|| meta.namespace.clone());
	let target_meta = Meta::new(target_ns, include.name.clone());
	if visited.contains(&target_meta) {
		let path = visited.iter().chain(std::iter::once(&target_meta)).map(|m| m.to_string()).collect::<Vec<_>>().join(" -> ");
		return Err((Reason::TCPProxyIncludeError, format!("tcpproxy include creates a cycle: {path}")));
	}
	let Some(child) = state.ctx.cache.proxy(&target_meta).cloned() else {
		return Err((Reason::TCPProxyIncludeError, format!("tcpproxy include target {target_meta} not found")));
	};
	state.claimed.insert(target_meta.clone());
	let Some(child_tcp) = &child.tcpproxy else {
		return Err((Reason::TCPProxyIncludeError, format!("tcpproxy include target {target_meta} has no tcpproxy block")));
	};
	visited.push(target_meta.clone());
	let result = build_tcp_proxy(state, &target_meta, child_tcp, visited);
	visited.pop();
	if result.is_ok() {
		mark_valid_if_not_fatal(state, &target_meta);
	}
	result
}

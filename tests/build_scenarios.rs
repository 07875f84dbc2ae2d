//! Black-box end-to-end scenarios from §8 ("End-to-end scenarios
//! (literal)"), exercised through the public `ingress_dag` API only.

use std::collections::HashMap;

use dag_core::Meta;
use ingress_dag::cache::ResourceCache;
use ingress_dag::config::BuildConfig;
use ingress_dag::k8s::ingress::{HttpIngressPath, Ingress, IngressBackend, IngressRule, IngressTls};
use ingress_dag::k8s::extension_service::{ExtensionService, ExtensionTarget};
use ingress_dag::k8s::proxy::{AuthorizationRef, Include, MatchCondition, Proxy, RouteService, RouteSpec, TcpProxySpec, TlsSpec, VirtualHostSpec};
use ingress_dag::k8s::secret::{Secret, SecretType};
use ingress_dag::k8s::service::{PortRef, Protocol, Service, ServicePort};
use ingress_dag::k8s::delegation::{CertificateDelegation, TlsCertificateDelegation};
use ingress_dag::k8s::Object;
use ingress_dag::status::StatusKey;

fn service(port: i32) -> Service {
	Service {
		ports: vec![ServicePort {
			name: "http".into(),
			number: port,
			protocol: Protocol::TCP,
		}],
		external_name: None,
		annotations: HashMap::new(),
	}
}

fn tls_secret(cert: &str, key: &str) -> Secret {
	let mut data = HashMap::new();
	data.insert("tls.crt".to_string(), cert.as_bytes().to_vec());
	data.insert("tls.key".to_string(), key.as_bytes().to_vec());
	Secret {
		secret_type: SecretType::Tls,
		data,
	}
}

fn root_proxy(fqdn: &str, service_name: &str, port: i32) -> Proxy {
	Proxy {
		virtualhost: Some(VirtualHostSpec {
			fqdn: fqdn.into(),
			tls: None,
			authorization: None,
			rate_limit_policy: None,
			jwt_providers: vec![],
			cors_policy: None,
			ip_allow_deny: None,
		}),
		routes: vec![RouteSpec {
			conditions: vec![],
			services: vec![RouteService {
				name: service_name.into(),
				port: PortRef::Number(port),
				weight: 1,
				mirror: false,
				protocol: None,
				upstream_validation: None,
			}],
			request_redirect: None,
			direct_response: None,
			prefix_rewrite: None,
			timeout_policy: None,
			retry_policy: None,
			rate_limit_policy: None,
			request_headers_policy: None,
			response_headers_policy: None,
			enable_websockets: false,
			permit_insecure: false,
			jwt_provider: None,
			auth_disabled: false,
			internal_redirect_policy: None,
		}],
		includes: vec![],
		tcpproxy: None,
	}
}

fn leaf_proxy() -> Proxy {
	Proxy {
		virtualhost: None,
		routes: vec![],
		includes: vec![],
		tcpproxy: None,
	}
}

#[test]
fn s1_duplicate_fqdn_both_invalid_no_vhost() {
	let cache = ResourceCache::new();
	cache.insert(Object::Service(Meta::new("default", "a"), service(80)));
	cache.insert(Object::Service(Meta::new("default", "b"), service(80)));
	cache.insert(Object::Proxy(Meta::new("default", "a"), root_proxy("example.com", "a", 80)));
	cache.insert(Object::Proxy(Meta::new("default", "b"), root_proxy("example.com", "b", 80)));

	let out = ingress_dag::build(&cache, &BuildConfig::default());

	let key_a = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "a"));
	let key_b = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "b"));
	let conditions_a = out.status.get(&key_a).expect("proxy a has a status entry");
	let conditions_b = out.status.get(&key_b).expect("proxy b has a status entry");
	assert!(matches!(conditions_a[0].reason, ingress_dag::status::Reason::DuplicateVhost));
	assert!(matches!(conditions_b[0].reason, ingress_dag::status::Reason::DuplicateVhost));
	assert_eq!(out.dag.vhost_count(), 0);
}

#[test]
fn s2_include_cycle_reported_on_revisited_node() {
	let cache = ResourceCache::new();
	cache.insert(Object::Proxy(
		Meta::new("default", "root"),
		Proxy {
			virtualhost: Some(VirtualHostSpec {
				fqdn: "cycle.example.com".into(),
				tls: None,
				authorization: None,
				rate_limit_policy: None,
				jwt_providers: vec![],
				cors_policy: None,
				ip_allow_deny: None,
			}),
			routes: vec![],
			includes: vec![Include {
				name: "leafA".into(),
				namespace: Some("default".into()),
				conditions: vec![],
			}],
			tcpproxy: None,
		},
	));
	cache.insert(Object::Proxy(
		Meta::new("default", "leafA"),
		Proxy {
			virtualhost: None,
			routes: vec![],
			includes: vec![Include {
				name: "leafB".into(),
				namespace: Some("default".into()),
				conditions: vec![],
			}],
			tcpproxy: None,
		},
	));
	cache.insert(Object::Proxy(
		Meta::new("default", "leafB"),
		Proxy {
			virtualhost: None,
			routes: vec![],
			includes: vec![Include {
				name: "leafA".into(),
				namespace: Some("default".into()),
				conditions: vec![],
			}],
			tcpproxy: None,
		},
	));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let key = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "leafA"));
	let conditions = out.status.get(&key).expect("leafA has a status entry");
	assert!(conditions.iter().any(|c| matches!(c.reason, ingress_dag::status::Reason::IncludeCreatesCycle)));
}

#[test]
fn s3_cross_namespace_tls_via_delegation() {
	let cache = ResourceCache::new();
	cache.insert(Object::Secret(Meta::new("default", "s"), tls_secret("cert", "key")));
	cache.insert(Object::TlsCertificateDelegation(
		Meta::new("default", "d"),
		TlsCertificateDelegation {
			delegations: vec![CertificateDelegation {
				secret_name: "s".into(),
				target_namespaces: ["extra".into()].into_iter().collect(),
			}],
		},
	));
	cache.insert(Object::Ingress(
		Meta::new("extra", "www"),
		Ingress {
			default_backend: None,
			rules: vec![IngressRule {
				host: Some("x.example.com".into()),
				paths: vec![HttpIngressPath {
					path: Some("/".into()),
					backend: IngressBackend {
						service_name: "web".into(),
						service_port: PortRef::Number(80),
					},
				}],
			}],
			tls: vec![IngressTls {
				hosts: vec!["x.example.com".into()],
				secret_name: Some("s".into()),
			}],
			annotations: HashMap::new(),
		},
	));
	cache.insert(Object::Service(Meta::new("extra", "web"), service(80)));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	assert!(out.dag.listeners().any(|l| l.vhosts.contains_key("x.example.com")));
}

#[test]
fn s4_orphan_leaf_gets_orphaned_status() {
	let cache = ResourceCache::new();
	cache.insert(Object::Proxy(Meta::new("default", "leaf"), leaf_proxy()));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let key = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "leaf"));
	let conditions = out.status.get(&key).expect("leaf has a status entry");
	assert!(matches!(conditions[0].kind, ingress_dag::status::ConditionKind::Orphaned));
	assert_eq!(conditions[0].message, "this HTTPProxy is not part of a delegation chain from a root HTTPProxy");
}

#[test]
fn s5_prefix_rewrite_expands_into_two_routes() {
	let cache = ResourceCache::new();
	cache.insert(Object::Service(Meta::new("default", "web"), service(80)));
	let mut proxy = root_proxy("rewrite.example.com", "web", 80);
	proxy.routes[0].prefix_rewrite = Some("/bar".into());
	cache.insert(Object::Proxy(Meta::new("default", "root"), proxy));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let listener = out.dag.listeners().find(|l| l.vhosts.contains_key("rewrite.example.com")).expect("vhost exists");
	let route_count = listener.vhosts.get("rewrite.example.com").unwrap().route_count();
	assert_eq!(route_count, 2);
}

#[test]
fn s5_prefix_rewrite_through_include_still_expands_into_two_routes() {
	let cache = ResourceCache::new();
	cache.insert(Object::Service(Meta::new("default", "web"), service(80)));
	cache.insert(Object::Proxy(
		Meta::new("default", "root"),
		Proxy {
			virtualhost: Some(VirtualHostSpec {
				fqdn: "rewrite-include.example.com".into(),
				tls: None,
				authorization: None,
				rate_limit_policy: None,
				jwt_providers: vec![],
				cors_policy: None,
				ip_allow_deny: None,
			}),
			routes: vec![],
			includes: vec![Include {
				name: "leaf".into(),
				namespace: Some("default".into()),
				conditions: vec![],
			}],
			tcpproxy: None,
		},
	));
	let mut leaf = leaf_proxy();
	leaf.routes.push(RouteSpec {
		conditions: vec![],
		services: vec![RouteService {
			name: "web".into(),
			port: PortRef::Number(80),
			weight: 1,
			mirror: false,
			protocol: None,
			upstream_validation: None,
		}],
		request_redirect: None,
		direct_response: None,
		prefix_rewrite: Some("/bar".into()),
		timeout_policy: None,
		retry_policy: None,
		rate_limit_policy: None,
		request_headers_policy: None,
		response_headers_policy: None,
		enable_websockets: false,
		permit_insecure: false,
		jwt_provider: None,
		auth_disabled: false,
		internal_redirect_policy: None,
	});
	cache.insert(Object::Proxy(Meta::new("default", "leaf"), leaf));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let listener = out.dag.listeners().find(|l| l.vhosts.contains_key("rewrite-include.example.com")).expect("vhost exists");
	let route_count = listener.vhosts.get("rewrite-include.example.com").unwrap().route_count();
	assert_eq!(route_count, 2, "an include should not cause prefix-rewrite expansion to run twice");
}

#[test]
fn s6_include_not_found_yields_502_fallback() {
	let cache = ResourceCache::new();
	cache.insert(Object::Proxy(
		Meta::new("default", "root"),
		Proxy {
			virtualhost: Some(VirtualHostSpec {
				fqdn: "fallback.example.com".into(),
				tls: None,
				authorization: None,
				rate_limit_policy: None,
				jwt_providers: vec![],
				cors_policy: None,
				ip_allow_deny: None,
			}),
			routes: vec![],
			includes: vec![Include {
				name: "missing".into(),
				namespace: Some("default".into()),
				conditions: vec![MatchCondition {
					prefix: Some("/api".into()),
					headers: vec![],
					query_params: vec![],
				}],
			}],
			tcpproxy: None,
		},
	));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let listener = out.dag.listeners().find(|l| l.vhosts.contains_key("fallback.example.com")).expect("vhost exists");
	assert_eq!(listener.vhosts.get("fallback.example.com").unwrap().route_count(), 1);

	let key = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "root"));
	let conditions = out.status.get(&key).expect("root has a status entry");
	assert!(conditions.iter().any(|c| matches!(c.reason, ingress_dag::status::Reason::IncludeNotFound)));
}

#[test]
fn universal_invariant_proxy_status_partition_matches_count() {
	let cache = ResourceCache::new();
	cache.insert(Object::Service(Meta::new("default", "web"), service(80)));
	cache.insert(Object::Proxy(Meta::new("default", "root"), root_proxy("partition.example.com", "web", 80)));
	cache.insert(Object::Proxy(Meta::new("default", "orphan"), leaf_proxy()));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let (valid, invalid, orphaned) = out.status.kind_counts();
	assert_eq!(valid + invalid + orphaned, 2);
}

#[test]
fn tcpproxy_without_tls_is_invalid() {
	let cache = ResourceCache::new();
	cache.insert(Object::Service(Meta::new("default", "web"), service(80)));
	cache.insert(Object::Proxy(
		Meta::new("default", "root"),
		Proxy {
			virtualhost: Some(VirtualHostSpec {
				fqdn: "tcp.example.com".into(),
				tls: None,
				authorization: None,
				rate_limit_policy: None,
				jwt_providers: vec![],
				cors_policy: None,
				ip_allow_deny: None,
			}),
			routes: vec![],
			includes: vec![],
			tcpproxy: Some(TcpProxySpec {
				services: vec![RouteService {
					name: "web".into(),
					port: PortRef::Number(80),
					weight: 1,
					mirror: false,
					protocol: None,
					upstream_validation: None,
				}],
				include: None,
			}),
		},
	));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let key = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "root"));
	let conditions = out.status.get(&key).expect("root has a status entry");
	assert!(conditions.iter().any(|c| matches!(c.reason, ingress_dag::status::Reason::TCPProxyError)));
}

#[test]
fn external_authorization_resolves_extension_cluster_onto_secure_vhost() {
	let cache = ResourceCache::new();
	cache.insert(Object::Service(Meta::new("default", "web"), service(80)));
	cache.insert(Object::Service(Meta::new("default", "authz"), service(9000)));
	cache.insert(Object::ExtensionService(
		Meta::new("default", "authz"),
		ExtensionService {
			services: vec![ExtensionTarget {
				name: "authz".into(),
				port: PortRef::Number(9000),
			}],
			protocol: None,
			upstream_validation: None,
			load_balancer_policy: None,
			timeout_policy: None,
		},
	));
	cache.insert(Object::Secret(Meta::new("default", "s"), tls_secret("cert", "key")));

	let mut proxy = root_proxy("auth.example.com", "web", 80);
	proxy.virtualhost.as_mut().unwrap().tls = Some(TlsSpec {
		secret_name: Some("s".into()),
		passthrough: false,
		fallback_certificate: None,
		client_validation: None,
		minimum_protocol_version: None,
		maximum_protocol_version: None,
		http_versions: vec![],
	});
	proxy.virtualhost.as_mut().unwrap().authorization = Some(AuthorizationRef {
		extension_ref: Meta::new("default", "authz"),
		response_timeout: None,
		fail_open: false,
	});
	cache.insert(Object::Proxy(Meta::new("default", "root"), proxy));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let key = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "root"));
	let conditions = out.status.get(&key).expect("root has a status entry");
	assert!(conditions.iter().any(|c| matches!(c.kind, ingress_dag::status::ConditionKind::Valid)));
	assert!(out.dag.listeners().any(|l| l.vhosts.contains_key("auth.example.com")));
}

#[test]
fn authorization_without_tls_is_rejected() {
	let cache = ResourceCache::new();
	cache.insert(Object::Service(Meta::new("default", "web"), service(80)));
	cache.insert(Object::Service(Meta::new("default", "authz"), service(9000)));
	cache.insert(Object::ExtensionService(
		Meta::new("default", "authz"),
		ExtensionService {
			services: vec![ExtensionTarget {
				name: "authz".into(),
				port: PortRef::Number(9000),
			}],
			protocol: None,
			upstream_validation: None,
			load_balancer_policy: None,
			timeout_policy: None,
		},
	));

	let mut proxy = root_proxy("noauth.example.com", "web", 80);
	proxy.virtualhost.as_mut().unwrap().authorization = Some(AuthorizationRef {
		extension_ref: Meta::new("default", "authz"),
		response_timeout: None,
		fail_open: false,
	});
	cache.insert(Object::Proxy(Meta::new("default", "root"), proxy));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let key = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "root"));
	let conditions = out.status.get(&key).expect("root has a status entry");
	assert!(conditions.iter().any(|c| matches!(c.reason, ingress_dag::status::Reason::AuthError)));
}

#[test]
fn fallback_certificate_is_attached_via_delegation() {
	let cache = ResourceCache::new();
	cache.insert(Object::Service(Meta::new("default", "web"), service(80)));
	cache.insert(Object::Secret(Meta::new("default", "primary"), tls_secret("cert", "key")));
	cache.insert(Object::Secret(Meta::new("shared", "fallback"), tls_secret("fcert", "fkey")));
	cache.insert(Object::TlsCertificateDelegation(
		Meta::new("shared", "d"),
		TlsCertificateDelegation {
			delegations: vec![CertificateDelegation {
				secret_name: "fallback".into(),
				target_namespaces: ["default".into()].into_iter().collect(),
			}],
		},
	));

	let mut proxy = root_proxy("fallback.example.com", "web", 80);
	proxy.virtualhost.as_mut().unwrap().tls = Some(TlsSpec {
		secret_name: Some("primary".into()),
		passthrough: false,
		fallback_certificate: Some(Meta::new("shared", "fallback")),
		client_validation: None,
		minimum_protocol_version: None,
		maximum_protocol_version: None,
		http_versions: vec![],
	});
	cache.insert(Object::Proxy(Meta::new("default", "root"), proxy));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let key = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "root"));
	let conditions = out.status.get(&key).expect("root has a status entry");
	assert!(conditions.iter().any(|c| matches!(c.kind, ingress_dag::status::ConditionKind::Valid)));
	assert!(out.dag.listeners().any(|l| l.vhosts.contains_key("fallback.example.com")));
}

#[test]
fn fallback_certificate_without_delegation_is_rejected() {
	let cache = ResourceCache::new();
	cache.insert(Object::Service(Meta::new("default", "web"), service(80)));
	cache.insert(Object::Secret(Meta::new("default", "primary"), tls_secret("cert", "key")));
	cache.insert(Object::Secret(Meta::new("shared", "fallback"), tls_secret("fcert", "fkey")));

	let mut proxy = root_proxy("fallback2.example.com", "web", 80);
	proxy.virtualhost.as_mut().unwrap().tls = Some(TlsSpec {
		secret_name: Some("primary".into()),
		passthrough: false,
		fallback_certificate: Some(Meta::new("shared", "fallback")),
		client_validation: None,
		minimum_protocol_version: None,
		maximum_protocol_version: None,
		http_versions: vec![],
	});
	cache.insert(Object::Proxy(Meta::new("default", "root"), proxy));

	let out = ingress_dag::build(&cache, &BuildConfig::default());
	let key = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "root"));
	let conditions = out.status.get(&key).expect("root has a status entry");
	assert!(conditions.iter().any(|c| matches!(c.reason, ingress_dag::status::Reason::DelegationNotPermitted)));
}

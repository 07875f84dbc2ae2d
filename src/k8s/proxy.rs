//! The custom `Proxy` CRD (§3, §4.4): ingress-like routing with recursive
//! inclusion, TCP-proxy delegation and a richer per-route policy surface
//! than plain Ingress.

use std::collections::HashSet;

use dag_core::Strng;
use serde::{Deserialize, Serialize};

use super::service::PortRef;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proxy {
	#[serde(default)]
	pub virtualhost: Option<VirtualHostSpec>,
	#[serde(default)]
	pub routes: Vec<RouteSpec>,
	#[serde(default)]
	pub includes: Vec<Include>,
	#[serde(default)]
	pub tcpproxy: Option<TcpProxySpec>,
}

impl Proxy {
	/// A proxy is a root iff it carries a `virtualhost` block (§4.4).
	pub fn is_root(&self) -> bool {
		self.virtualhost.is_some()
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VirtualHostSpec {
	pub fqdn: Strng,
	#[serde(default)]
	pub tls: Option<TlsSpec>,
	#[serde(default)]
	pub authorization: Option<AuthorizationRef>,
	#[serde(default)]
	pub rate_limit_policy: Option<RateLimitPolicy>,
	#[serde(default)]
	pub jwt_providers: Vec<JwtProvider>,
	#[serde(default)]
	pub cors_policy: Option<CorsPolicy>,
	#[serde(default)]
	pub ip_allow_deny: Option<IpFilterPolicy>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TlsSpec {
	#[serde(default)]
	pub secret_name: Option<Strng>,
	#[serde(default)]
	pub passthrough: bool,
	#[serde(default)]
	pub fallback_certificate: Option<dag_core::Meta>,
	#[serde(default)]
	pub client_validation: Option<ClientValidation>,
	#[serde(default)]
	pub minimum_protocol_version: Option<TlsVersion>,
	#[serde(default)]
	pub maximum_protocol_version: Option<TlsVersion>,
	/// §4.4 step 4 "declared HTTP versions": drives the advertised ALPN set.
	#[serde(default)]
	pub http_versions: Vec<Strng>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TlsVersion {
	#[serde(rename = "1.2")]
	V1_2,
	#[serde(rename = "1.3")]
	V1_3,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientValidation {
	pub ca_secret: dag_core::Meta,
	#[serde(default)]
	pub crl_secret: Option<dag_core::Meta>,
	#[serde(default)]
	pub skip_client_cert_validation: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizationRef {
	pub extension_ref: dag_core::Meta,
	#[serde(default)]
	pub response_timeout: Option<Strng>,
	#[serde(default)]
	pub fail_open: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitPolicy {
	#[serde(default)]
	pub global: Option<dag_core::Meta>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorsPolicy {
	#[serde(default)]
	pub allow_origin: Vec<Strng>,
	#[serde(default)]
	pub allow_credentials: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IpFilterPolicy {
	#[serde(default)]
	pub allow: Vec<Strng>,
	#[serde(default)]
	pub deny: Vec<Strng>,
}

/// §4.4 step 5: a named remote JWKS provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JwtProvider {
	pub name: Strng,
	#[serde(default)]
	pub default: bool,
	pub remote_jwks: RemoteJwks,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteJwks {
	pub uri: Strng,
	#[serde(default)]
	pub upstream_validation: Option<UpstreamValidation>,
	#[serde(default)]
	pub dns_lookup_family: Option<DnsLookupFamily>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsLookupFamily {
	Auto,
	V4,
	V6,
	All,
}

/// Upstream TLS validation: a CA bundle plus optional subject-name pinning
/// (§3 Cluster, §4.4 step 5, §4.5 ExtensionService).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamValidation {
	pub ca_secret: dag_core::Meta,
	#[serde(default)]
	pub subject_names: Vec<Strng>,
}

/// §4.5: per-cluster or per-extension-service timeout policy; `idle` is
/// accepted but ignored (warn) on ExtensionService.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimeoutPolicy {
	#[serde(default)]
	pub response: Option<Strng>,
	#[serde(default)]
	pub idle: Option<Strng>,
}

/// §3 Route "optional internal-redirect policy": governs whether the proxy
/// itself follows an upstream 3xx response rather than passing it to the
/// downstream client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InternalRedirectPolicy {
	#[serde(default)]
	pub max_internal_redirects: Option<u32>,
	#[serde(default)]
	pub redirect_response_codes: Vec<u16>,
	#[serde(default)]
	pub allow_cross_scheme_redirect: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
	#[serde(default)]
	pub retry_on: Vec<Strng>,
	#[serde(default)]
	pub num_retries: u32,
	#[serde(default)]
	pub per_try_timeout: Option<Strng>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Include {
	pub name: Strng,
	#[serde(default)]
	pub namespace: Option<Strng>,
	#[serde(default)]
	pub conditions: Vec<MatchCondition>,
}

/// A path/header/query-param match attached either to an `Include` or a
/// `RouteSpec` (§4.4 "cumulative set of include match-conditions").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatchCondition {
	#[serde(default)]
	pub prefix: Option<Strng>,
	#[serde(default)]
	pub headers: Vec<HeaderMatch>,
	#[serde(default)]
	pub query_params: Vec<QueryParamMatch>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct HeaderMatch {
	pub name: Strng,
	pub condition: MatchOp,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct QueryParamMatch {
	pub name: Strng,
	pub condition: MatchOp,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum MatchOp {
	Present,
	Exact(Strng),
	Contains(Strng),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteSpec {
	#[serde(default)]
	pub conditions: Vec<MatchCondition>,
	#[serde(default)]
	pub services: Vec<RouteService>,
	#[serde(default)]
	pub request_redirect: Option<RequestRedirect>,
	#[serde(default)]
	pub direct_response: Option<DirectResponse>,
	#[serde(default)]
	pub prefix_rewrite: Option<Strng>,
	#[serde(default)]
	pub timeout_policy: Option<TimeoutPolicy>,
	#[serde(default)]
	pub retry_policy: Option<RetryPolicy>,
	#[serde(default)]
	pub rate_limit_policy: Option<RateLimitPolicy>,
	#[serde(default)]
	pub request_headers_policy: Option<HeadersPolicy>,
	#[serde(default)]
	pub response_headers_policy: Option<HeadersPolicy>,
	#[serde(default)]
	pub enable_websockets: bool,
	#[serde(default)]
	pub permit_insecure: bool,
	#[serde(default)]
	pub jwt_provider: Option<Strng>,
	#[serde(default)]
	pub auth_disabled: bool,
	#[serde(default)]
	pub internal_redirect_policy: Option<InternalRedirectPolicy>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HeadersPolicy {
	#[serde(default)]
	pub set: Vec<(Strng, Strng)>,
	#[serde(default)]
	pub remove: Vec<Strng>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestRedirect {
	#[serde(default)]
	pub hostname: Option<Strng>,
	#[serde(default)]
	pub status_code: Option<u16>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectResponse {
	pub status_code: u16,
	#[serde(default)]
	pub body: Option<Strng>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteService {
	pub name: Strng,
	pub port: PortRef,
	#[serde(default)]
	pub weight: u32,
	#[serde(default)]
	pub mirror: bool,
	#[serde(default)]
	pub protocol: Option<super::extension_service::UpstreamProtocol>,
	#[serde(default)]
	pub upstream_validation: Option<UpstreamValidation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TcpProxySpec {
	#[serde(default)]
	pub services: Vec<RouteService>,
	#[serde(default)]
	pub include: Option<Include>,
}

impl RouteSpec {
	pub fn action_count(&self) -> usize {
		[!self.services.is_empty(), self.request_redirect.is_some(), self.direct_response.is_some()]
			.into_iter()
			.filter(|b| *b)
			.count()
	}

	pub fn mirror_count(&self) -> usize {
		self.services.iter().filter(|s| s.mirror).count()
	}
}

impl TlsSpec {
	/// §4.4 step 3: the five forbidden combinations. Returns the first
	/// violated rule's description, if any.
	pub fn validate(&self) -> Result<(), &'static str> {
		let has_secret = self.secret_name.is_some();
		let has_fallback = self.fallback_certificate.is_some();
		let has_client_validation = self.client_validation.is_some();
		if self.passthrough && has_fallback {
			return Err("tls.passthrough and tls.fallbackCertificate are mutually exclusive");
		}
		if self.passthrough && has_secret {
			return Err("tls.passthrough and tls.secretName are mutually exclusive");
		}
		if !self.passthrough && !has_secret {
			return Err("tls block must set either secretName or passthrough");
		}
		if self.passthrough && has_client_validation {
			return Err("tls.passthrough and tls.clientValidation are mutually exclusive");
		}
		if has_fallback && has_client_validation {
			return Err("tls.fallbackCertificate and tls.clientValidation are mutually exclusive");
		}
		Ok(())
	}

	/// Returns true if `tls.fallbackCertificate` and an authorization block
	/// are both set (the sixth forbidden combination, checked by the caller
	/// since it spans `VirtualHostSpec`).
	pub fn conflicts_with_authorization(&self) -> bool {
		self.fallback_certificate.is_some()
	}
}

/// §4.4 step 4: ALPN advertised on a secure virtual host, derived from the
/// declared HTTP versions.
pub fn alpn_for_http_versions(versions: &[Strng]) -> Vec<Strng> {
	if versions.iter().any(|v| v.as_str() == "h2") {
		vec!["h2".into(), "http/1.1".into()]
	} else {
		vec!["http/1.1".into()]
	}
}

/// §4.4 step 5: unique names, at most one default.
pub fn validate_jwt_providers(providers: &[JwtProvider]) -> Result<(), String> {
	let mut seen: HashSet<&str> = HashSet::new();
	let mut default_count = 0usize;
	for p in providers {
		if !seen.insert(p.name.as_str()) {
			return Err(format!("duplicate JWT provider name {:?}", p.name));
		}
		if p.default {
			default_count += 1;
		}
	}
	if default_count > 1 {
		return Err("at most one JWT provider may be marked default".to_string());
	}
	Ok(())
}

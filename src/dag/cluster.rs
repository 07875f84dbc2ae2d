//! Cluster / TCPProxy / ExtensionCluster vertices (§3).

use dag_core::Strng;

use crate::k8s::extension_service::{LoadBalancerPolicy, UpstreamProtocol};
use crate::k8s::proxy::{TimeoutPolicy, UpstreamValidation};
use dag_core::Meta;

#[derive(Clone, Debug)]
pub struct Cluster {
	pub service: Meta,
	pub service_port_name: Strng,
	pub upstream_protocol: UpstreamProtocol_,
	pub load_balancer_policy: LoadBalancerPolicy,
	pub weight: u32,
	pub upstream_validation: Option<UpstreamValidation>,
	pub sni: Option<Strng>,
	pub client_certificate: Option<Meta>,
	pub timeout_policy: TimeoutPolicy,
	pub slow_start: Option<SlowStartConfig>,
	pub dns_lookup_family: DnsLookupFamily,
	pub circuit_breaker: CircuitBreakerLimits,
}

/// §3 Cluster upstream-protocol domain: `http1` is the implicit default, the
/// rest mirror [`UpstreamProtocol`] (which only ever names the non-default
/// choices a `RouteService`/`ExtensionService` may request).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpstreamProtocol_ {
	Http1,
	H2,
	H2c,
	Tls,
}

impl From<Option<UpstreamProtocol>> for UpstreamProtocol_ {
	fn from(p: Option<UpstreamProtocol>) -> Self {
		match p {
			None => UpstreamProtocol_::Http1,
			Some(UpstreamProtocol::H2) => UpstreamProtocol_::H2,
			Some(UpstreamProtocol::H2c) => UpstreamProtocol_::H2c,
			Some(UpstreamProtocol::Tls) => UpstreamProtocol_::Tls,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DnsLookupFamily {
	Auto,
	V4,
	V6,
	All,
}

impl Default for DnsLookupFamily {
	fn default() -> Self {
		DnsLookupFamily::Auto
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SlowStartConfig {
	pub window_seconds: u32,
	pub aggression: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CircuitBreakerLimits {
	pub max_connections: Option<u32>,
	pub max_pending_requests: Option<u32>,
	pub max_requests: Option<u32>,
	pub max_retries: Option<u32>,
}

/// §3 TCPProxy: an ordered list of clusters, no L7 routing.
#[derive(Clone, Debug, Default)]
pub struct TcpProxy {
	pub clusters: Vec<Cluster>,
}

/// §4.5 / §3: a specially-named cluster used by authorization/ratelimit
/// filters rather than by ordinary routes. Holds one [`Cluster`] per backing
/// service declared on the source `ExtensionService` (§4.5 validates all of
/// them, same-namespace and non-ExternalName), mirroring how [`TcpProxy`]
/// holds one per delegate service.
#[derive(Clone, Debug)]
pub struct ExtensionCluster {
	pub name: Strng,
	pub clusters: Vec<Cluster>,
}

use dag_core::Strng;
use serde::{Deserialize, Serialize};

use super::service::PortRef;

/// `ExtensionService` CRD: an out-of-process authorization/ratelimit
/// endpoint (§4.5). Only referenced by per-vhost authorization blocks in
/// the proxy processor, never by ordinary routes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtensionService {
	pub services: Vec<ExtensionTarget>,
	#[serde(default)]
	pub protocol: Option<UpstreamProtocol>,
	#[serde(default)]
	pub upstream_validation: Option<super::proxy::UpstreamValidation>,
	#[serde(default)]
	pub load_balancer_policy: Option<LoadBalancerPolicy>,
	#[serde(default)]
	pub timeout_policy: Option<super::proxy::TimeoutPolicy>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtensionTarget {
	pub name: Strng,
	pub port: PortRef,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum UpstreamProtocol {
	#[serde(rename = "h2")]
	H2,
	#[serde(rename = "h2c")]
	H2c,
	#[serde(rename = "tls")]
	Tls,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LoadBalancerPolicy {
	RoundRobin,
	WeightedLeastRequest,
	Random,
	Cookie,
	RequestHash,
}

impl LoadBalancerPolicy {
	/// §4.5: `Cookie`/`RequestHash` require per-request state an extension
	/// cluster cannot provide; the processor warns and clears these.
	pub fn supported_on_extension_cluster(self) -> bool {
		!matches!(self, LoadBalancerPolicy::Cookie | LoadBalancerPolicy::RequestHash)
	}
}

/// Deterministic name for the extension cluster vertex (§4.5).
pub fn extension_cluster_name(namespace: &str, name: &str) -> Strng {
	dag_core::strng::format!("extension/{}/{}", namespace, name)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cluster_name_is_deterministic() {
		assert_eq!(
			extension_cluster_name("default", "limiter").as_str(),
			"extension/default/limiter"
		);
	}

	#[test]
	fn cookie_and_request_hash_unsupported() {
		assert!(!LoadBalancerPolicy::Cookie.supported_on_extension_cluster());
		assert!(!LoadBalancerPolicy::RequestHash.supported_on_extension_cluster());
		assert!(LoadBalancerPolicy::RoundRobin.supported_on_extension_cluster());
	}
}

//! §6 "Configuration inputs (enumerated)": global policy the orchestrator
//! supplies once per process, consulted by every rebuild.

use std::collections::HashSet;

use dag_core::{Meta, Strng};
use serde::{Deserialize, Serialize};

use crate::dag::cluster::DnsLookupFamily;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildConfig {
	/// Empty means unrestricted (§6, §4.4 step 2).
	#[serde(default)]
	pub root_namespaces: HashSet<Strng>,
	#[serde(default)]
	pub fallback_certificate: Option<Meta>,
	#[serde(default)]
	pub client_certificate: Option<Meta>,
	#[serde(default = "default_dns_lookup_family")]
	pub dns_lookup_family: DnsLookupFamilyConfig,
	#[serde(default = "default_connect_timeout")]
	pub connect_timeout: Strng,
	#[serde(default)]
	pub max_requests_per_connection: Option<u32>,
	#[serde(default)]
	pub per_connection_buffer_limit_bytes: Option<u32>,
	/// §6, §9 open question: "treat it as OFF by default".
	#[serde(default)]
	pub enable_external_name_service: bool,
	#[serde(default)]
	pub global_external_authorization: Option<Meta>,
	#[serde(default)]
	pub global_rate_limit_service: Option<Meta>,
	#[serde(default)]
	pub global_circuit_breaker_defaults: Option<GlobalCircuitBreakerDefaults>,
	#[serde(default)]
	pub upstream_tls: Option<UpstreamTlsDefaults>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsLookupFamilyConfig {
	Auto,
	V4,
	V6,
	All,
}

impl From<DnsLookupFamilyConfig> for DnsLookupFamily {
	fn from(c: DnsLookupFamilyConfig) -> Self {
		match c {
			DnsLookupFamilyConfig::Auto => DnsLookupFamily::Auto,
			DnsLookupFamilyConfig::V4 => DnsLookupFamily::V4,
			DnsLookupFamilyConfig::V6 => DnsLookupFamily::V6,
			DnsLookupFamilyConfig::All => DnsLookupFamily::All,
		}
	}
}

fn default_dns_lookup_family() -> DnsLookupFamilyConfig {
	DnsLookupFamilyConfig::Auto
}

fn default_connect_timeout() -> Strng {
	Strng::from("2s")
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlobalCircuitBreakerDefaults {
	#[serde(default)]
	pub max_connections: Option<u32>,
	#[serde(default)]
	pub max_pending_requests: Option<u32>,
	#[serde(default)]
	pub max_requests: Option<u32>,
	#[serde(default)]
	pub max_retries: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamTlsDefaults {
	#[serde(default)]
	pub minimum_protocol_version: Option<Strng>,
	#[serde(default)]
	pub cipher_suites: Vec<Strng>,
}

impl Default for BuildConfig {
	fn default() -> Self {
		Self {
			root_namespaces: HashSet::new(),
			fallback_certificate: None,
			client_certificate: None,
			dns_lookup_family: default_dns_lookup_family(),
			connect_timeout: default_connect_timeout(),
			max_requests_per_connection: None,
			per_connection_buffer_limit_bytes: None,
			enable_external_name_service: false,
			global_external_authorization: None,
			global_rate_limit_service: None,
			global_circuit_breaker_defaults: None,
			upstream_tls: None,
		}
	}
}

impl BuildConfig {
	/// §4.4 step 2: "if the configured root-namespace set is non-empty, the
	/// root's namespace must be in it".
	pub fn root_namespace_allowed(&self, namespace: &str) -> bool {
		self.root_namespaces.is_empty() || self.root_namespaces.iter().any(|n| n.as_str() == namespace)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_root_namespaces_means_unrestricted() {
		let cfg = BuildConfig::default();
		assert!(cfg.root_namespace_allowed("anything"));
	}

	#[test]
	fn non_empty_root_namespaces_restricts() {
		let mut cfg = BuildConfig::default();
		cfg.root_namespaces.insert("allowed".into());
		assert!(cfg.root_namespace_allowed("allowed"));
		assert!(!cfg.root_namespace_allowed("other"));
	}

	#[test]
	fn external_name_service_off_by_default() {
		assert!(!BuildConfig::default().enable_external_name_service);
	}
}

//! VirtualHost / SecureVirtualHost vertices (§3).

use dag_core::Strng;

use crate::dag::cluster::{ExtensionCluster, TcpProxy};
use crate::dag::route::Route;
use crate::k8s::proxy::{CorsPolicy, IpFilterPolicy, JwtProvider, RateLimitPolicy, TlsVersion};
use dag_core::Meta;

/// FQDN comparison throughout the DAG is case-insensitive (§3); callers
/// should key vhost maps by `normalize_fqdn`, not the raw string.
pub fn normalize_fqdn(fqdn: &str) -> String {
	fqdn.to_ascii_lowercase()
}

#[derive(Clone, Debug)]
pub struct VirtualHost {
	pub fqdn: Strng,
	pub cors_policy: Option<CorsPolicy>,
	pub rate_limit_policy: Option<RateLimitPolicy>,
	pub ip_filter: Option<IpFilterPolicy>,
	pub routes: Vec<Route>,
}

impl VirtualHost {
	pub fn new(fqdn: impl Into<Strng>) -> Self {
		Self {
			fqdn: fqdn.into(),
			cors_policy: None,
			rate_limit_policy: None,
			ip_filter: None,
			routes: Vec::new(),
		}
	}
}

#[derive(Clone, Debug)]
pub struct ServerCertificate {
	pub secret: Meta,
	pub cert: Vec<u8>,
	pub key: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct DownstreamValidation {
	pub ca_certs: Vec<u8>,
	pub crl: Option<Vec<u8>>,
	pub skip_client_cert_validation: bool,
}

#[derive(Clone, Debug)]
pub struct ExternalAuthorization {
	pub cluster: ExtensionCluster,
	pub response_timeout: Option<Strng>,
	pub fail_open: bool,
}

/// §3: extends `VirtualHost` with TLS-specific fields. Retained only if it
/// has a server certificate or a `TCPProxy` (enforced in the DAG's prune
/// step, not here).
#[derive(Clone, Debug)]
pub struct SecureVirtualHost {
	pub virtual_host: VirtualHost,
	pub server_certificate: Option<ServerCertificate>,
	pub fallback_certificate: Option<ServerCertificate>,
	pub min_tls_version: Option<TlsVersion>,
	pub max_tls_version: Option<TlsVersion>,
	pub downstream_validation: Option<DownstreamValidation>,
	pub external_authorization: Option<ExternalAuthorization>,
	pub jwt_providers: Vec<JwtProvider>,
	pub tcp_proxy: Option<TcpProxy>,
	/// §4.4 step 4: advertised ALPN protocols, derived from the declared
	/// HTTP versions.
	pub alpn: Vec<Strng>,
}

impl SecureVirtualHost {
	pub fn new(fqdn: impl Into<Strng>) -> Self {
		Self {
			virtual_host: VirtualHost::new(fqdn),
			server_certificate: None,
			fallback_certificate: None,
			min_tls_version: None,
			max_tls_version: None,
			downstream_validation: None,
			external_authorization: None,
			jwt_providers: Vec::new(),
			tcp_proxy: None,
			alpn: Vec::new(),
		}
	}

	/// §4.6 prune rule: "delete secure-vhosts with neither secret nor
	/// TCP-proxy".
	pub fn is_routable(&self) -> bool {
		self.server_certificate.is_some() || self.tcp_proxy.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fqdn_normalized_lowercase() {
		assert_eq!(normalize_fqdn("Example.COM"), "example.com");
	}

	#[test]
	fn secure_vhost_not_routable_without_secret_or_tcpproxy() {
		let svh = SecureVirtualHost::new("example.com");
		assert!(!svh.is_routable());
	}
}

use std::collections::HashSet;

use dag_core::Strng;
use serde::{Deserialize, Serialize};

/// `TLSCertificateDelegation` CRD: a namespace opts a secret it owns into
/// being readable (for TLS purposes) by other namespaces (§3, §4.1
/// `DelegationPermitted`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TlsCertificateDelegation {
	pub delegations: Vec<CertificateDelegation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CertificateDelegation {
	pub secret_name: Strng,
	/// Target namespaces; `"*"` means any namespace (§8 boundary: `"*"`
	/// matches anything, `""` matches nothing).
	pub target_namespaces: HashSet<Strng>,
}

impl TlsCertificateDelegation {
	/// True if any delegation entry names `secret_name` and permits
	/// `target_ns`.
	pub fn permits(&self, secret_name: &str, target_ns: &str) -> bool {
		if target_ns.is_empty() {
			return false;
		}
		self.delegations.iter().any(|d| {
			d.secret_name.as_str() == secret_name
				&& (d.target_namespaces.iter().any(|n| n == "*") || d.target_namespaces.iter().any(|n| n.as_str() == target_ns))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn delegation(targets: &[&str]) -> TlsCertificateDelegation {
		TlsCertificateDelegation {
			delegations: vec![CertificateDelegation {
				secret_name: "s".into(),
				target_namespaces: targets.iter().map(|s| Strng::from(*s)).collect(),
			}],
		}
	}

	#[test]
	fn wildcard_matches_any_namespace() {
		let d = delegation(&["*"]);
		assert!(d.permits("s", "extra"));
		assert!(d.permits("s", "anything"));
	}

	#[test]
	fn empty_target_namespace_never_matches() {
		let d = delegation(&["*"]);
		assert!(!d.permits("s", ""));
	}

	#[test]
	fn specific_namespace_must_match_exactly() {
		let d = delegation(&["extra"]);
		assert!(d.permits("s", "extra"));
		assert!(!d.permits("s", "other"));
	}

	#[test]
	fn wrong_secret_name_never_matches() {
		let d = delegation(&["*"]);
		assert!(!d.permits("other-secret", "extra"));
	}
}

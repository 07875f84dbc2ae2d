use std::collections::HashMap;

use dag_core::Strng;
use serde::{Deserialize, Serialize};

/// The subset of a Kubernetes `Service` the DAG builder cares about: named
/// ports and, when present, an `ExternalName` (§3, §4.7 `EnsureService`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Service {
	pub ports: Vec<ServicePort>,
	#[serde(default)]
	pub external_name: Option<Strng>,
	#[serde(default)]
	pub annotations: HashMap<String, String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
	TCP,
	UDP,
	SCTP,
}

impl Protocol {
	/// §4.1 `LookupService`: only TCP ports may back an L7/L4 cluster.
	pub fn is_supported(self) -> bool {
		matches!(self, Protocol::TCP)
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServicePort {
	pub name: Strng,
	pub number: i32,
	#[serde(default = "default_protocol")]
	pub protocol: Protocol,
}

fn default_protocol() -> Protocol {
	Protocol::TCP
}

/// A reference to a service port, either by declared name or by number, as
/// used in Ingress/HTTPProxy backend references.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortRef {
	Name(Strng),
	Number(i32),
}

impl std::fmt::Display for PortRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			PortRef::Name(n) => write!(f, "{n}"),
			PortRef::Number(n) => write!(f, "{n}"),
		}
	}
}

/// Port resolution outcome, before the caller (the `ResourceCache`) has a
/// chance to attach the service's `Meta` to build a full
/// [`crate::errors::ServiceLookupError`].
pub enum PortLookup<'a> {
	Matched(&'a ServicePort),
	NotMatched,
}

impl Service {
	/// Resolves a [`PortRef`] to the matching [`ServicePort`], enforcing the
	/// port-number boundary rule from §8 (0 rejected, 65535 accepted, 65536
	/// rejected by construction since `PortRef::Number` is an `i32`).
	pub fn find_port(&self, port: &PortRef) -> PortLookup<'_> {
		let found = match port {
			PortRef::Number(n) => {
				if !(1..=65535).contains(n) {
					None
				} else {
					self.ports.iter().find(|p| p.number == *n)
				}
			},
			PortRef::Name(name) => self.ports.iter().find(|p| &p.name == name),
		};
		match found {
			Some(p) => PortLookup::Matched(p),
			None => PortLookup::NotMatched,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_case::test_case;

	fn svc() -> Service {
		Service {
			ports: vec![ServicePort {
				name: "http".into(),
				number: 80,
				protocol: Protocol::TCP,
			}],
			external_name: None,
			annotations: HashMap::new(),
		}
	}

	#[test_case(0 => false; "port zero rejected")]
	#[test_case(80 => true; "matching port accepted")]
	#[test_case(65535 => false; "unmatched max port rejected")]
	#[test_case(65536 => false; "port above range rejected")]
	fn find_port_by_number(n: i32) -> bool {
		matches!(svc().find_port(&PortRef::Number(n)), PortLookup::Matched(_))
	}

	#[test]
	fn find_port_by_name() {
		assert!(matches!(
			svc().find_port(&PortRef::Name("http".into())),
			PortLookup::Matched(_)
		));
		assert!(matches!(
			svc().find_port(&PortRef::Name("missing".into())),
			PortLookup::NotMatched
		));
	}

	#[test]
	fn udp_protocol_is_unsupported() {
		assert!(!Protocol::UDP.is_supported());
		assert!(Protocol::TCP.is_supported());
	}
}

use std::collections::HashMap;

use dag_core::Strng;
use serde::{Deserialize, Serialize};

use super::extension_service::UpstreamProtocol;
use super::proxy::RetryPolicy;
use super::service::PortRef;

/// Generic HTTP `Ingress` object (§3, §4.3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ingress {
	#[serde(default)]
	pub default_backend: Option<IngressBackend>,
	#[serde(default)]
	pub rules: Vec<IngressRule>,
	#[serde(default)]
	pub tls: Vec<IngressTls>,
	#[serde(default)]
	pub annotations: HashMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngressBackend {
	pub service_name: Strng,
	pub service_port: PortRef,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngressRule {
	/// `None`/empty host means "match any host"; synthesized default-backend
	/// rules use the literal wildcard `"*"` (§4.3).
	#[serde(default)]
	pub host: Option<Strng>,
	pub paths: Vec<HttpIngressPath>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpIngressPath {
	#[serde(default)]
	pub path: Option<Strng>,
	pub backend: IngressBackend,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngressTls {
	#[serde(default)]
	pub hosts: Vec<Strng>,
	#[serde(default)]
	pub secret_name: Option<Strng>,
}

/// Characters that, per §4.3, mean a path should be treated as a regex
/// match rather than a plain prefix match.
const REGEX_SPECIAL_CHARS: [char; 6] = ['^', '+', '*', '[', ']', '%'];

pub fn path_is_regex(path: &str) -> bool {
	path.chars().any(|c| REGEX_SPECIAL_CHARS.contains(&c))
}

/// A path flagged by [`path_is_regex`] is only actually usable as a regex
/// match if it compiles; a malformed pattern (e.g. an unbalanced bracket
/// class) is surfaced as a validation error rather than silently passed
/// through to the data plane.
pub fn regex_path_error(path: &str) -> Option<String> {
	regex::Regex::new(path).err().map(|e| e.to_string())
}

impl Ingress {
	/// §4.3: "synthesize rules from the default-backend (as a rule with host
	/// `"*"` and path `"/"`) concatenated with the explicit rules".
	pub fn synthesized_rules(&self) -> Vec<IngressRule> {
		let mut rules = Vec::with_capacity(self.rules.len() + 1);
		if let Some(backend) = &self.default_backend {
			rules.push(IngressRule {
				host: Some("*".into()),
				paths: vec![HttpIngressPath {
					path: Some("/".into()),
					backend: backend.clone(),
				}],
			});
		}
		rules.extend(self.rules.iter().cloned());
		rules
	}

	pub fn annotation(&self, key: &str) -> Option<&str> {
		self.annotations.get(key).map(String::as_str)
	}

	/// §4.3 "request-timeout": `"infinity"` and a malformed duration both
	/// mean "no timeout"; unset means "use the proxy default" (`None`).
	/// §9 open question: this is deliberately not unified with the proxy
	/// path's retry/timeout defaulting.
	pub fn request_timeout(&self) -> Option<Strng> {
		let raw = self.annotation("projectcontour.io/request-timeout").or_else(|| self.annotation("contour.heptio.com/request-timeout"))?;
		if raw == "infinity" || parse_go_duration(raw).is_none() {
			Some(Strng::from("infinity"))
		} else {
			Some(Strng::from(raw))
		}
	}

	/// §4.3 "websocket-routes (per-path)": a comma-separated list of paths.
	pub fn websocket_paths(&self) -> Vec<Strng> {
		self
			.annotation("projectcontour.io/websocket-routes")
			.map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(Strng::from).collect())
			.unwrap_or_default()
	}

	/// §4.3 "retry-on, num-retries, per-try-timeout": present only if at
	/// least one of the three annotations is set.
	pub fn retry_policy(&self) -> Option<RetryPolicy> {
		let retry_on = self
			.annotation("projectcontour.io/retry-on")
			.map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(Strng::from).collect::<Vec<_>>())
			.unwrap_or_default();
		let num_retries = self.annotation("projectcontour.io/num-retries").and_then(|raw| raw.parse::<u32>().ok()).unwrap_or(0);
		let per_try_timeout = self.annotation("projectcontour.io/per-try-timeout").map(Strng::from);
		if retry_on.is_empty() && num_retries == 0 && per_try_timeout.is_none() {
			return None;
		}
		Some(RetryPolicy {
			retry_on,
			num_retries,
			per_try_timeout,
		})
	}

	/// §4.3 "upstream-protocol.{h2|h2c|tls} (per port name or number)":
	/// `projectcontour.io/upstream-protocol.h2: "80,https"` means ports
	/// named `80` or `https` use h2.
	pub fn upstream_protocol_override(&self, port: &crate::k8s::service::ServicePort) -> Option<UpstreamProtocol> {
		for (suffix, proto) in [("h2", UpstreamProtocol::H2), ("h2c", UpstreamProtocol::H2c), ("tls", UpstreamProtocol::Tls)] {
			let key = format!("projectcontour.io/upstream-protocol.{suffix}");
			if let Some(raw) = self.annotation(&key) {
				for tok in raw.split(',').map(str::trim) {
					if tok == port.name.as_str() || tok == port.number.to_string() {
						return Some(proto);
					}
				}
			}
		}
		None
	}

	/// §4.3 circuit-breaker annotations: (max-connections, max-pending-requests,
	/// max-requests, max-retries).
	pub fn circuit_breaker_limits(&self) -> (Option<u32>, Option<u32>, Option<u32>, Option<u32>) {
		let get = |key: &str| self.annotation(key).and_then(|raw| raw.parse::<u32>().ok());
		(
			get("projectcontour.io/max-connections"),
			get("projectcontour.io/max-pending-requests"),
			get("projectcontour.io/max-requests"),
			get("projectcontour.io/max-retries"),
		)
	}
}

/// A minimal Go-`time.ParseDuration`-shaped parser: digits followed by a
/// unit (`s`, `ms`). Anything else fails, matching §4.3's "parse failure".
fn parse_go_duration(raw: &str) -> Option<std::time::Duration> {
	let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
	if digits.is_empty() {
		return None;
	}
	let unit = &raw[digits.len()..];
	let n: u64 = digits.parse().ok()?;
	match unit {
		"s" => Some(std::time::Duration::from_secs(n)),
		"ms" => Some(std::time::Duration::from_millis(n)),
		_ => None,
	}
}

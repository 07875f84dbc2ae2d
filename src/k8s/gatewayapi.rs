//! Gateway API object kinds (§6 input events). The cache recognizes these
//! kinds for trigger-rebuild purposes and for `IngressClass`-equivalent
//! filtering, but no processor synthesizes DAG vertices from them yet
//! (§4.6, open question — preserved rather than invented).

use dag_core::Strng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum GatewayApiKind {
	GatewayClass,
	Gateway,
	HTTPRoute,
	TLSRoute,
	TCPRoute,
	GRPCRoute,
	ReferenceGrant,
	BackendTLSPolicy,
}

/// Opaque holder for a Gateway API object: the cache stores it only to
/// answer trigger-rebuild and lookup-by-meta queries, never to interpret
/// its routing semantics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayApiObject {
	pub kind: GatewayApiKind,
	/// Raw, uninterpreted object body, kept for forward-compatibility with a
	/// future processor.
	#[serde(default)]
	pub raw: serde_json::Value,
	#[serde(default)]
	pub controller_name: Option<Strng>,
}

pub mod delegation;
pub mod extension_service;
pub mod gatewayapi;
pub mod ingress;
pub mod proxy;
pub mod secret;
pub mod service;

use dag_core::Meta;

pub use delegation::TlsCertificateDelegation;
pub use extension_service::ExtensionService;
pub use gatewayapi::{GatewayApiKind, GatewayApiObject};
pub use ingress::Ingress;
pub use proxy::Proxy;
pub use secret::Secret;
pub use service::Service;

/// The full set of orchestrator object kinds the watch layer may deliver
/// (§6). `IngressClass`, `Namespace` and `ConfigMap` are recognized only for
/// class-filtering and configuration purposes and carry no DAG-relevant
/// payload of their own here; the orchestrator is expected to have already
/// applied IngressClass filtering before objects reach `Insert`/`Remove`.
#[derive(Clone, Debug)]
pub enum Object {
	Ingress(Meta, Ingress),
	Proxy(Meta, Proxy),
	Service(Meta, Service),
	Secret(Meta, Secret),
	TlsCertificateDelegation(Meta, TlsCertificateDelegation),
	ExtensionService(Meta, ExtensionService),
	GatewayApi(Meta, GatewayApiObject),
	/// `IngressClass` / `Namespace` / `ConfigMap`: always triggers rebuild
	/// (§4.1), never resolved by a processor.
	Unclassified(Meta),
}

impl Object {
	pub fn meta(&self) -> &Meta {
		match self {
			Object::Ingress(m, _)
			| Object::Proxy(m, _)
			| Object::Service(m, _)
			| Object::Secret(m, _)
			| Object::TlsCertificateDelegation(m, _)
			| Object::ExtensionService(m, _)
			| Object::GatewayApi(m, _)
			| Object::Unclassified(m) => m,
		}
	}

	pub fn kind_name(&self) -> &'static str {
		match self {
			Object::Ingress(..) => "Ingress",
			Object::Proxy(..) => "Proxy",
			Object::Service(..) => "Service",
			Object::Secret(..) => "Secret",
			Object::TlsCertificateDelegation(..) => "TLSCertificateDelegation",
			Object::ExtensionService(..) => "ExtensionService",
			Object::GatewayApi(..) => "GatewayApi",
			Object::Unclassified(..) => "Unclassified",
		}
	}
}

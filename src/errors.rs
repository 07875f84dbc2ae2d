//! Typed error taxonomy for cache lookups (§4.1, §7). These are the errors
//! a processor matches on to pick a specific [`crate::status::Reason`];
//! they never escape the builder itself (§7 "the builder itself never
//! returns an error").

use dag_core::Meta;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceLookupError {
	#[error("service {0} not found")]
	NotFound(Meta),
	#[error("service {meta} port {port} uses unsupported protocol {protocol}")]
	UnsupportedProtocol { meta: Meta, port: i32, protocol: String },
	#[error("service {meta} has no port matching {port}")]
	PortNotMatched { meta: Meta, port: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretLookupError {
	#[error("secret {0} not found")]
	NotFound(Meta),
	#[error("secret {meta} is not valid: {reason}")]
	SecretInvalid { meta: Meta, reason: String },
	#[error("secret {secret} is not delegated to namespace {target_namespace}")]
	DelegationNotPermitted { secret: Meta, target_namespace: arcstr::ArcStr },
}

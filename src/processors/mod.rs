//! Processor contract (§4.2): one module per input resource kind, each
//! exposing `run(dag, cache, status, config)`.

pub mod extension_service;
pub mod gatewayapi;
pub mod httpproxy;
pub mod ingress;

use crate::cache::CacheSnapshot;
use crate::config::BuildConfig;
use crate::dag::Dag;
use crate::status::StatusCache;

/// Shared read-only context threaded through a single processor pass.
pub struct ProcessorContext<'a> {
	pub cache: &'a CacheSnapshot<'a>,
	pub status: &'a StatusCache,
	pub config: &'a BuildConfig,
}

/// §5 "Ordering guarantees": extension-services, then proxies, then generic
/// ingress, then gateway-api.
pub fn run_all(dag: &mut Dag, ctx: &ProcessorContext<'_>) {
	extension_service::run(dag, ctx);
	httpproxy::run(dag, ctx);
	ingress::run(dag, ctx);
	gatewayapi::run(dag, ctx);
}

//! Extension-service processor (§4.5).

use dag_core::prelude::*;

use crate::dag::cluster::{Cluster, DnsLookupFamily, UpstreamProtocol_};
use crate::dag::{Dag, ExtensionCluster};
use crate::k8s::extension_service::{extension_cluster_name, LoadBalancerPolicy, UpstreamProtocol};
use crate::processors::ProcessorContext;
use crate::status::{Condition, Reason, StatusKey};

const GROUP: &str = "projectcontour.io";
const KIND: &str = "ExtensionService";

pub fn run(dag: &mut Dag, ctx: &ProcessorContext<'_>) {
	for (meta, svc) in ctx.cache.extension_services() {
		let mut accessor = ctx.status.accessor();
		match build_one(dag, ctx, meta, svc) {
			Ok(()) => {
				accessor.add(Condition::valid());
			},
			Err((reason, message)) => {
				accessor.add(Condition::invalid(reason, message));
			},
		}
		ctx.status.commit(StatusKey::new(GROUP, KIND, meta.clone()), accessor);
	}
}

fn build_one(
	dag: &mut Dag,
	ctx: &ProcessorContext<'_>,
	meta: &Meta,
	svc: &crate::k8s::ExtensionService,
) -> Result<(), (Reason, String)> {
	let protocol = svc.protocol.unwrap_or(UpstreamProtocol::H2);

	if let Some(uv) = &svc.upstream_validation {
		if protocol != UpstreamProtocol::H2 {
			return Err((
				Reason::TLSError,
				format!("extension service {meta} requests upstream validation but protocol is not h2"),
			));
		}
		let _ = uv;
	}

	let lb = svc.load_balancer_policy.unwrap_or(LoadBalancerPolicy::RoundRobin);
	let lb = if lb.supported_on_extension_cluster() {
		lb
	} else {
		warn!(%meta, ?lb, "load balancer policy unsupported on extension cluster, clearing");
		LoadBalancerPolicy::RoundRobin
	};

	if let Some(tp) = &svc.timeout_policy {
		if tp.idle.is_some() {
			warn!(%meta, "idle timeout on ExtensionService timeout policy is ignored");
		}
	}

	if svc.services.is_empty() {
		return Err((Reason::ServiceUnresolvedReference, format!("extension service {meta} names no backing services")));
	}

	// §4.5: every backing service must resolve, live in the ExtensionService's
	// own namespace (enforced by construction below), and not be ExternalName.
	let mut clusters = Vec::with_capacity(svc.services.len());
	for target in &svc.services {
		let target_meta = Meta::new(meta.namespace.clone(), target.name.clone());
		let (backing, matched_port) = ctx
			.cache
			.lookup_service(&target_meta, &target.port)
			.map_err(|e| (Reason::ServiceUnresolvedReference, e.to_string()))?;
		if backing.external_name.is_some() {
			return Err((
				Reason::ServiceUnresolvedReference,
				format!("extension service {meta} backing service {target_meta} is an ExternalName service"),
			));
		}
		clusters.push(Cluster {
			service: target_meta,
			service_port_name: matched_port.name.clone(),
			upstream_protocol: UpstreamProtocol_::from(Some(protocol)),
			load_balancer_policy: lb,
			weight: 1,
			upstream_validation: svc.upstream_validation.clone(),
			sni: None,
			client_certificate: None,
			timeout_policy: svc.timeout_policy.clone().unwrap_or_default(),
			slow_start: None,
			dns_lookup_family: DnsLookupFamily::Auto,
			circuit_breaker: Default::default(),
		});
	}
	let name = extension_cluster_name(meta.namespace.as_str(), meta.name.as_str());
	dag.add_root(ExtensionCluster { name, clusters });
	Ok(())
}

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Parser;
use dag_core::Meta;
use ingress_dag::cache::ResourceCache;
use ingress_dag::config::BuildConfig;
use ingress_dag::k8s::{ExtensionService, Ingress, Object, Proxy, Secret, Service, TlsCertificateDelegation};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A local, file-backed bundle of every object kind the `ResourceCache`
/// understands (§10 ambient configuration loader), in lieu of the
/// Kubernetes watch layer this crate does not implement.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct LocalConfig {
	#[serde(default)]
	ingresses: HashMap<String, Ingress>,
	#[serde(default)]
	proxies: HashMap<String, Proxy>,
	#[serde(default)]
	services: HashMap<String, Service>,
	#[serde(default)]
	secrets: HashMap<String, Secret>,
	#[serde(default)]
	delegations: HashMap<String, TlsCertificateDelegation>,
	#[serde(default)]
	extension_services: HashMap<String, ExtensionService>,
	#[serde(default)]
	build_config: BuildConfig,
}

/// Keys in a `LocalConfig` map are `"<namespace>/<name>"`.
fn parse_meta(key: &str) -> Result<Meta> {
	let (ns, name) = key.split_once('/').with_context(|| format!("object key {key:?} is not namespace/name"))?;
	Ok(Meta::new(ns, name))
}

#[derive(Parser, Debug)]
#[command(version, about = "Reference loader for the ingress DAG builder core", long_about = None)]
struct Args {
	/// Path to a local YAML bundle of ingresses/proxies/services/secrets.
	#[arg(short, long, value_name = "file")]
	file: std::path::PathBuf,
}

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
		.with_writer(std::io::stderr)
		.with_ansi(false)
		.init();

	let args = Args::parse();
	let raw = std::fs::read_to_string(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
	let local: LocalConfig = serde_yaml::from_str(&raw).context("parsing local config as YAML")?;

	let cache = ResourceCache::new();
	for (key, v) in local.ingresses {
		cache.insert(Object::Ingress(parse_meta(&key)?, v));
	}
	for (key, v) in local.proxies {
		cache.insert(Object::Proxy(parse_meta(&key)?, v));
	}
	for (key, v) in local.services {
		cache.insert(Object::Service(parse_meta(&key)?, v));
	}
	for (key, v) in local.secrets {
		cache.insert(Object::Secret(parse_meta(&key)?, v));
	}
	for (key, v) in local.delegations {
		cache.insert(Object::TlsCertificateDelegation(parse_meta(&key)?, v));
	}
	for (key, v) in local.extension_services {
		cache.insert(Object::ExtensionService(parse_meta(&key)?, v));
	}

	let output = ingress_dag::build(&cache, &local.build_config);
	info!(
		listeners = output.dag.listener_count(),
		vhosts = output.dag.vhost_count(),
		statuses = output.status.len(),
		"build complete"
	);

	println!("listeners: {}", output.dag.listener_count());
	println!("virtual hosts: {}", output.dag.vhost_count());
	println!("status entries: {}", output.status.len());
	let (valid, invalid, orphaned) = output.status.kind_counts();
	println!("valid={valid} invalid={invalid} orphaned={orphaned}");

	Ok(())
}

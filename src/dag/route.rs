//! Route vertices (§3).

use dag_core::Strng;

use crate::dag::cluster::Cluster;
use crate::k8s::proxy::{HeaderMatch, InternalRedirectPolicy, QueryParamMatch, RetryPolicy, TimeoutPolicy};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathMatch {
	Prefix(Strng),
	Exact(Strng),
	Regex(Strng),
}

#[derive(Clone, Debug, Default)]
pub struct HeadersPolicy {
	pub set: Vec<(Strng, Strng)>,
	pub remove: Vec<Strng>,
}

#[derive(Clone, Debug)]
pub struct DirectResponse {
	pub status_code: http::StatusCode,
	pub body: Option<Strng>,
}

#[derive(Clone, Debug)]
pub struct Redirect {
	pub hostname: Option<Strng>,
	pub status_code: http::StatusCode,
}

#[derive(Clone, Debug)]
pub struct Route {
	pub path_match: PathMatch,
	pub header_matches: Vec<HeaderMatch>,
	pub query_matches: Vec<QueryParamMatch>,
	pub clusters: Vec<Cluster>,
	pub mirror: Option<Cluster>,
	pub direct_response: Option<DirectResponse>,
	pub redirect: Option<Redirect>,
	pub https_upgrade: bool,
	pub websocket: bool,
	pub timeout_policy: TimeoutPolicy,
	pub retry_policy: Option<RetryPolicy>,
	pub request_headers_policy: HeadersPolicy,
	pub response_headers_policy: HeadersPolicy,
	pub jwt_provider: Option<Strng>,
	pub auth_disabled: bool,
	pub prefix_rewrite: Option<Strng>,
	pub internal_redirect_policy: Option<InternalRedirectPolicy>,
}

impl Route {
	/// A minimal route with only a path match and a backend cluster set;
	/// used both by the ingress processor and as the base for the richer
	/// proxy-processor construction.
	pub fn new(path_match: PathMatch, clusters: Vec<Cluster>) -> Self {
		Self {
			path_match,
			header_matches: Vec::new(),
			query_matches: Vec::new(),
			clusters,
			mirror: None,
			direct_response: None,
			redirect: None,
			https_upgrade: false,
			websocket: false,
			timeout_policy: TimeoutPolicy::default(),
			retry_policy: None,
			request_headers_policy: HeadersPolicy::default(),
			response_headers_policy: HeadersPolicy::default(),
			jwt_provider: None,
			auth_disabled: false,
			prefix_rewrite: None,
			internal_redirect_policy: None,
		}
	}

	/// §4.4 "synthesize a 502 direct-response route" fallback shape, used by
	/// `IncludeNotFound`/`RootIncludesRoot` handling.
	pub fn synthetic_502(path_match: PathMatch) -> Self {
		let mut r = Route::new(path_match, Vec::new());
		r.direct_response = Some(DirectResponse {
			status_code: http::StatusCode::BAD_GATEWAY,
			body: None,
		});
		r
	}
}

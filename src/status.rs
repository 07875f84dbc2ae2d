//! Per-object status conditions reported back to the API (§6, §9 "Status
//! accumulation"). Each processor accumulates conditions on a
//! [`StatusAccessor`] while it runs and commits them exactly once; the
//! [`StatusCache`] enforces "first writer wins" per (object, reason).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dag_core::Meta;
use serde::Serialize;

/// The three kinds of status a processed object can end up with.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionKind {
	Valid,
	Invalid,
	Orphaned,
}

/// The full taxonomy of typed reasons a condition can carry (§6).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum Reason {
	Valid,
	DuplicateVhost,
	TLSError,
	TLSIncompatibleFeatures,
	SecretNotValid,
	DelegationNotPermitted,
	IncludeNotFound,
	IncludeCreatesCycle,
	RootIncludesRoot,
	ServicePortInvalid,
	ServiceUnresolvedReference,
	UnsupportedProtocol,
	CACertificateNotDelegated,
	OrphanedError,
	VirtualHostError,
	TCPProxyError,
	TCPProxyIncludeError,
	PrefixReplaceError,
	JWTVerificationError,
	AuthError,
	AuthResponseTimeoutInvalid,
	RateLimitPolicyNotValid,
	CORSError,
	IPFilterError,
	ListenerError,
	RouteError,
	PathMatchConditionsNotValid,
	HeaderMatchConditionsNotValid,
	QueryParameterMatchConditionsNotValid,
	DuplicateMatchConditions,
	TimeoutPolicyNotValid,
	CookieRewritePoliciesInvalid,
	RequestHeadersPolicyInvalid,
	ResponseHeadersPolicyInvalid,
	RootProxyNotAllowedInNamespace,
	SlowStartInvalid,
	OnlyOneMirror,
}

/// A single status condition, matching the (kind, reason, message, fqdn)
/// shape in §3.
#[derive(Clone, Debug, Serialize)]
pub struct Condition {
	pub kind: ConditionKind,
	pub reason: Reason,
	pub message: String,
	pub fqdn: Option<String>,
}

impl Condition {
	pub fn valid() -> Self {
		Self {
			kind: ConditionKind::Valid,
			reason: Reason::Valid,
			message: "valid HTTPProxy".to_string(),
			fqdn: None,
		}
	}

	pub fn invalid(reason: Reason, message: impl Into<String>) -> Self {
		Self {
			kind: ConditionKind::Invalid,
			reason,
			message: message.into(),
			fqdn: None,
		}
	}

	pub fn orphaned(message: impl Into<String>) -> Self {
		Self {
			kind: ConditionKind::Orphaned,
			reason: Reason::OrphanedError,
			message: message.into(),
			fqdn: None,
		}
	}

	pub fn with_fqdn(mut self, fqdn: impl Into<String>) -> Self {
		self.fqdn = Some(fqdn.into());
		self
	}
}

/// Group/kind/namespace/name key for the status cache (§6).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct StatusKey {
	pub group: &'static str,
	pub kind: &'static str,
	pub meta: Meta,
}

impl StatusKey {
	pub fn new(group: &'static str, kind: &'static str, meta: Meta) -> Self {
		Self { group, kind, meta }
	}
}

/// Accumulates conditions for a single object during one processor pass.
/// Obtained from [`StatusCache::accessor`]; the processor mutates it freely
/// and then calls [`StatusAccessor::commit`] exactly once.
#[derive(Debug, Default)]
pub struct StatusAccessor {
	conditions: Vec<Condition>,
}

impl StatusAccessor {
	pub fn add(&mut self, c: Condition) -> &mut Self {
		self.conditions.push(c);
		self
	}

	/// True if this object has already been marked invalid or orphaned.
	pub fn is_fatal(&self) -> bool {
		self
			.conditions
			.iter()
			.any(|c| !matches!(c.kind, ConditionKind::Valid))
	}
}

/// The committed conditions for every object touched by a rebuild.
///
/// "First writer wins": [`commit`](StatusCache::commit) only inserts a
/// (kind,reason) pair into an entry's condition list the first time it is
/// seen for that object, so the earliest, most specific diagnostic survives
/// concurrent or repeated commits (§9).
#[derive(Debug, Default)]
pub struct StatusCache {
	inner: Mutex<HashMap<StatusKey, Vec<Condition>>>,
}

impl StatusCache {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn accessor(&self) -> StatusAccessor {
		StatusAccessor::default()
	}

	/// Commits an accessor's conditions for `key`. Within one commit, a
	/// (kind, reason) pair that is already present for this key is dropped
	/// rather than duplicated.
	pub fn commit(&self, key: StatusKey, accessor: StatusAccessor) {
		let mut inner = self.inner.lock().unwrap();
		let entry = inner.entry(key).or_default();
		for c in accessor.conditions {
			let already = entry
				.iter()
				.any(|e| e.kind == c.kind && e.reason == c.reason);
			if !already {
				entry.push(c);
			}
		}
	}

	pub fn get(&self, key: &StatusKey) -> Option<Vec<Condition>> {
		self.inner.lock().unwrap().get(key).cloned()
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Counts of each top-level `ConditionKind` across every committed
	/// object, used to check the invariant in §8.2 ("valid + invalid +
	/// orphaned == number of proxies").
	pub fn kind_counts(&self) -> (usize, usize, usize) {
		let inner = self.inner.lock().unwrap();
		let mut valid = 0;
		let mut invalid = 0;
		let mut orphaned = 0;
		for conditions in inner.values() {
			// an object's overall status is its *first* condition, consistent
			// with first-writer-wins semantics.
			match conditions.first().map(|c| c.kind) {
				Some(ConditionKind::Valid) => valid += 1,
				Some(ConditionKind::Invalid) => invalid += 1,
				Some(ConditionKind::Orphaned) => orphaned += 1,
				None => {},
			}
		}
		(valid, invalid, orphaned)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn first_writer_wins_per_reason() {
		let cache = StatusCache::new();
		let key = StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "a"));

		let mut acc = cache.accessor();
		acc.add(Condition::invalid(Reason::DuplicateVhost, "first"));
		cache.commit(key.clone(), acc);

		let mut acc2 = cache.accessor();
		acc2.add(Condition::invalid(Reason::DuplicateVhost, "second"));
		cache.commit(key.clone(), acc2);

		let conditions = cache.get(&key).unwrap();
		assert_eq!(conditions.len(), 1);
		assert_eq!(conditions[0].message, "first");
	}

	#[test]
	fn kind_counts_reflect_first_condition() {
		let cache = StatusCache::new();
		let mut acc = cache.accessor();
		acc.add(Condition::valid());
		cache.commit(
			StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "a")),
			acc,
		);

		let mut acc = cache.accessor();
		acc.add(Condition::orphaned("not part of a delegation chain"));
		cache.commit(
			StatusKey::new("projectcontour.io", "HTTPProxy", Meta::new("default", "b")),
			acc,
		);

		assert_eq!(cache.kind_counts(), (1, 0, 1));
	}
}

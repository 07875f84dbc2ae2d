use std::fmt;

use serde::{Deserialize, Serialize};

use crate::strng::Strng;

/// A (namespace, name) pair identifying a single orchestrator object.
///
/// Equality is structural; this is the key type for every map the
/// `ResourceCache` owns, and is copied by value into `Status` entries and
/// DAG cross-references so that they remain valid after the cache mutates.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Meta {
	pub namespace: Strng,
	pub name: Strng,
}

impl Meta {
	pub fn new(namespace: impl AsRef<str>, name: impl AsRef<str>) -> Self {
		Self {
			namespace: crate::strng::new(namespace),
			name: crate::strng::new(name),
		}
	}
}

impl fmt::Display for Meta {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.namespace, self.name)
	}
}

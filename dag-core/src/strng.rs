//! A cheaply-cloneable interned string type used for the handful of string
//! fields (FQDNs, namespaces, names) that get copied into many DAG vertices.
//!
//! Cloning an `arcstr::ArcStr` bumps a refcount instead of allocating, which
//! matters here because the same namespace/name pair gets copied into a
//! `Meta`, a `Status`, and one or more DAG vertices during a single rebuild.

pub type Strng = arcstr::ArcStr;

/// Builds a [`Strng`] from anything that can be turned into a `&str`.
pub fn new(s: impl AsRef<str>) -> Strng {
	Strng::from(s.as_ref())
}

/// Formats a [`Strng`] the way `format!` would, without an intermediate
/// `String` allocation when the result already fits inline.
#[macro_export]
macro_rules! strng_format {
	($($arg:tt)*) => {
		$crate::strng::new(format!($($arg)*))
	};
}

pub use strng_format as format;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn format_macro_builds_strng() {
		let s = strng_format!("service/{}/{}:{}", "default", "web", 80);
		assert_eq!(s.as_str(), "service/default/web:80");
	}
}

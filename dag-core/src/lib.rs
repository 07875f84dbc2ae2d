//! Shared primitives used across the ingress-dag workspace: an interned
//! string type and the `Meta` (namespace, name) key type. Kept in its own
//! crate so that it can be depended on without pulling in the full DAG
//! builder, mirroring how the reference gateway splits small leaf crates
//! (e.g. its `agent-core`) out of the main binary crate.

pub mod meta;
pub mod prelude;
pub mod strng;

pub use meta::Meta;
pub use strng::Strng;

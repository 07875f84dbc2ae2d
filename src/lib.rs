pub mod builder;
pub mod cache;
pub mod config;
pub mod dag;
pub mod errors;
pub mod k8s;
pub mod processors;
pub mod status;

pub use builder::{build, BuildOutput};
pub use cache::ResourceCache;
pub use config::BuildConfig;
pub use dag::Dag;
pub use status::StatusCache;

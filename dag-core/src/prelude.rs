pub use crate::meta::Meta;
pub use crate::strng;
pub use crate::strng::Strng;
pub use std::sync::Arc;
pub use tracing::{debug, error, info, trace, warn};

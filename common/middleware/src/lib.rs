pub mod auth;
pub mod logger;
pub mod metrics;
pub mod panics;

pub use auth::{authenticate, has_role};
pub use logger::logger;
pub use metrics::{collect_metrics, Metrics};
pub use panics::recover_panics;

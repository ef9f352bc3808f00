pub mod auth;
pub mod metrics;
pub mod owner;

pub use auth::{auth_middleware, AuthUser};
pub use metrics::metrics_middleware;
pub use owner::owner_only_middleware;

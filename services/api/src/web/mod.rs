pub mod analytics;
pub mod auth;
pub mod comments;
pub mod facilities;
pub mod incidents;
pub mod middleware;
pub mod notifications;
pub mod rest;
pub mod router;
pub mod state;

pub use middleware::require_auth;
pub use router::build_router;

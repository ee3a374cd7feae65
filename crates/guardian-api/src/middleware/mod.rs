//! Request middleware

pub mod identity;
pub mod rate_limit;

pub use identity::{identity_middleware, CallerIdentity};
pub use rate_limit::rate_limit_middleware;

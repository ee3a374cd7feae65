//! HTTP request handlers

pub mod health;
pub mod metrics;
pub mod send;

pub use health::{health, live, ready, version};
pub use metrics::metrics;
pub use send::send;

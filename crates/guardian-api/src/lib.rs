//! # Guardian API
//!
//! HTTP front door for Guardian. Callers post a prompt to `/send`; the
//! prompt runs through the caller's plugin tasks and, when every task
//! approves, the caller's request is proxied to the target model and its
//! response streamed back.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod telemetry;

pub use config::AppConfig;
pub use error::ApiError;
pub use router::create_router_with_state;
pub use state::AppState;

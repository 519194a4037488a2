//! Axum HTTP server and routing.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Translate record and cipher errors into JSON error bodies.

pub mod handlers;
pub mod router;
pub mod state;

//! Demo REST API protected by Guardial.
//!
//! Shows the axum middleware guarding `/api/*`, the prompt guard in front of
//! a (simulated) LLM endpoint, and the SDK self-test exposed as a health route.

pub mod handlers;
pub mod router;
pub mod state;

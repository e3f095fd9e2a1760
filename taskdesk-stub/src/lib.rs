//! In-memory stand-in for the TaskDesk REST API.
//!
//! Serves the same routes and response shapes as the real backend so the
//! client can be exercised end to end without external services.

pub mod config;
pub mod server;
pub mod store;

//! Shared wire definitions for the `TaskDesk` REST contract.
//!
//! Both the client and the stub backend speak through these types, so the
//! JSON field names (`jwtToken`, `phoneNo`, `createdAt`, ...) live in one
//! place and every response body is decoded by [`codec::decode_response`].

pub mod api;
pub mod codec;
pub mod task;
pub mod user;

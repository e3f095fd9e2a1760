//! Client library for the TaskDesk task-management API.
//!
//! The controllers here hold all client state; front ends (the bundled
//! CLI, or anything else) drive [`app::App`] and render what it exposes.

pub mod account;
pub mod app;
pub mod backend;
pub mod config;
pub mod confirm;
pub mod error;
pub mod notify;
pub mod session;
pub mod tasks;
pub mod validate;

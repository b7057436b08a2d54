//! chat-notify — time-bounded notification subsystem for the chat-widget
//! backend.
//!
//! Library crate; the `chat-notifyd` binary wires configuration, the
//! Postgres store, the webhook dispatcher, and the background jobs together.

pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod service;
pub mod store;
pub mod webhook;

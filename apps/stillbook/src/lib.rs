//! # stillbook
//!
//! Library target for the Stillbook application binary.
//!
//! Exposes the HTTP API and CLI modules so integration tests can build the
//! router directly (via `stillbook::api::*`) without starting a process.

pub mod api;
pub mod cli;

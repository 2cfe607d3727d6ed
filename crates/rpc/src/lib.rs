//! InvoiceClaim RPC - CLI orchestrator
//!
//! This crate provides the `claim` binary and command orchestration.

pub mod commands;
pub mod context;

pub use context::{AppConfig, AppContext};

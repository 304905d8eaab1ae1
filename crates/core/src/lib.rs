//! BookVision Core - Shared domain types.
//!
//! This crate provides the types used across the BookVision components:
//! - `portal` - Webhook handlers and the subscriber portal API
//! - `cli` - Command-line tools for migrations and support operations
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. List bounds, role arithmetic and journal
//! statistics live here so they can be tested without a server.
//!
//! # Modules
//!
//! - [`types`] - Emails, roles, payment statuses, chat log, trade journal

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

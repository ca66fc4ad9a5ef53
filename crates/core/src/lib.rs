//! CRM Bridge Core - Shared types library.
//!
//! This crate provides common types used across all CRM bridge components:
//! - `bridge` - Gateway, resolvers, tool and chat surfaces, HTTP server
//! - `cli` - Command-line access to the same operations
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for remote ids, emails, phone numbers,
//!   monetary values and opportunity statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

//! CRM bridge library.
//!
//! Sits between conversational front-ends (tool-calling models, chat bots)
//! and the LeadConnector CRM. Callers describe what they want in whatever
//! they have (ids, names, free text); the bridge resolves contacts,
//! pipelines and stages, creates the record, and falls back to safe
//! defaults when a secondary step fails.
//!
//! # Layers
//!
//! - [`gateway`] - the only component that speaks HTTP
//! - [`catalog`] - pipeline/stage names to ids, loaded from YAML
//! - [`services`] - contact resolution, opportunity orchestration, SMS
//!   fallback and pipeline listing
//! - [`tools`] - named tools with JSON-Schema inputs
//! - [`chat`] - slash-command and free-text surface
//! - [`routes`] - axum handlers over the two surfaces above

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod services;
pub mod state;
pub mod tools;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

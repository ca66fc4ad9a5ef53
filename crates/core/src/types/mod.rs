//! Core types for the CRM bridge.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod phone;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{MonetaryValue, MonetaryValueError};
pub use phone::{PhoneNumber, PhoneError};
pub use status::*;

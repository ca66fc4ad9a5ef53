//! Integration tests for the CRM bridge.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p crm-bridge-integration-tests
//! ```
//!
//! No CRM is needed: every suite drives the library through
//! [`ScriptedGateway`], which replays queued responses and records each
//! call so tests can assert exact call counts and payloads.
//!
//! # Test Suites
//!
//! - `contact_resolution` - find-or-create properties
//! - `catalog` - synonym lookup, defaults, purity
//! - `opportunity_scenarios` - end-to-end opportunity creation
//! - `messaging` - SMS delivery and its fallback
//! - `surfaces` - tool, chat and HTTP entry points

use crm_bridge::catalog::Catalog;
use serde_json::{Value, json};

pub use crm_bridge::testing::{RecordedCall, ScriptedGateway};

/// Location every scripted gateway is scoped to.
pub const LOCATION: &str = "loc_test";

/// Canonical ids of the built-in catalog.
pub mod ids {
    pub const SALES: &str = "SjYJh6QYcw6bdK6poVnL";
    pub const NEW_LEAD: &str = "6c3a7dde-3fa6-46c8-bafa-d0e085aa62bd";
    pub const CONTACTED: &str = "a85fd236-f7ee-4a30-8d81-18bc44461892";
    pub const PROPOSAL: &str = "d548cca5-2cdc-4d64-99f1-fb4a3ade1174";
    pub const CLOSED: &str = "b63276fd-6525-42ba-a575-156cd8a5bdfe";
}

#[must_use]
pub fn gateway() -> ScriptedGateway {
    ScriptedGateway::new(LOCATION)
}

/// The built-in catalog.
///
/// # Panics
///
/// Panics if the embedded catalog is broken.
#[must_use]
#[allow(clippy::expect_used)]
pub fn catalog() -> Catalog {
    Catalog::builtin().expect("built-in catalog loads")
}

/// A `GET /contacts/` response listing `(id, first name, last name)`.
#[must_use]
pub fn contacts_page(contacts: &[(&str, &str, &str)]) -> Value {
    let contacts: Vec<Value> = contacts
        .iter()
        .map(|(id, first, last)| {
            json!({
                "id": id,
                "firstName": first,
                "lastName": last,
                "email": format!("{}@example.com", first.to_lowercase()),
            })
        })
        .collect();
    json!({ "contacts": contacts, "meta": { "total": contacts.len() } })
}

/// A `POST /contacts/` response.
#[must_use]
pub fn created_contact(id: &str, first_name: &str) -> Value {
    json!({ "contact": { "id": id, "firstName": first_name } })
}

/// A `POST /opportunities/` response.
#[must_use]
pub fn created_opportunity(id: &str, name: &str) -> Value {
    json!({
        "opportunity": {
            "id": id,
            "name": name,
            "status": "open",
            "createdAt": "2024-05-01T10:00:00.000Z",
        }
    })
}

/// JSON body of a recorded call.
///
/// # Panics
///
/// Panics if the call carried no JSON body.
#[must_use]
#[allow(clippy::expect_used)]
pub fn body(call: &RecordedCall) -> &Value {
    call.payload.json().expect("call carries a JSON body")
}
